/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Compiler and linker values for one target, already aggregated across the
//! target's own declaration and every config that applies to it. The
//! front-end does the aggregation; by the time a target reaches resolution
//! these vectors are flat and in composition order.

use gen2_core::source_file::SourceDir;
use gen2_core::source_file::SourceFile;

/// A library reference from a config: either a file in the source tree
/// (depended upon and passed by path) or a bare name for the linker's search
/// path (`-l<name>`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LibFile {
    Source(SourceFile),
    Name(String),
}

impl LibFile {
    pub fn source_file(&self) -> Option<&SourceFile> {
        match self {
            LibFile::Source(f) => Some(f),
            LibFile::Name(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigValues {
    cflags: Vec<String>,
    cflags_c: Vec<String>,
    cflags_cc: Vec<String>,
    defines: Vec<String>,
    include_dirs: Vec<SourceDir>,
    inputs: Vec<SourceFile>,
    ldflags: Vec<String>,
    lib_dirs: Vec<SourceDir>,
    libs: Vec<LibFile>,
    externs: Vec<(String, LibFile)>,
    rustflags: Vec<String>,
    rustenv: Vec<String>,
}

macro_rules! value_accessors {
    ($($field:ident, $field_mut:ident: $ty:ty;)*) => {
        $(
            pub fn $field(&self) -> &$ty {
                &self.$field
            }

            pub fn $field_mut(&mut self) -> &mut $ty {
                &mut self.$field
            }
        )*
    };
}

impl ConfigValues {
    value_accessors! {
        cflags, cflags_mut: Vec<String>;
        cflags_c, cflags_c_mut: Vec<String>;
        cflags_cc, cflags_cc_mut: Vec<String>;
        defines, defines_mut: Vec<String>;
        include_dirs, include_dirs_mut: Vec<SourceDir>;
        inputs, inputs_mut: Vec<SourceFile>;
        ldflags, ldflags_mut: Vec<String>;
        lib_dirs, lib_dirs_mut: Vec<SourceDir>;
        libs, libs_mut: Vec<LibFile>;
        externs, externs_mut: Vec<(String, LibFile)>;
        rustflags, rustflags_mut: Vec<String>;
        rustenv, rustenv_mut: Vec<String>;
    }
}
