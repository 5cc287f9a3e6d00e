/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Rust-specific values of a target: the crate root, the crate name, an
//! optional crate-type override, and per-dependency renames.

use gen2_core::label::Label;
use gen2_core::source_file::SourceFile;
use indexmap::IndexMap;

use crate::target::OutputType;
use crate::toolchain::ToolKind;

/// One of the six shapes rustc can produce.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RustCrateType {
    Bin,
    Rlib,
    Dylib,
    Cdylib,
    ProcMacro,
    Staticlib,
}

impl RustCrateType {
    pub fn as_str(self) -> &'static str {
        match self {
            RustCrateType::Bin => "bin",
            RustCrateType::Rlib => "rlib",
            RustCrateType::Dylib => "dylib",
            RustCrateType::Cdylib => "cdylib",
            RustCrateType::ProcMacro => "proc-macro",
            RustCrateType::Staticlib => "staticlib",
        }
    }

    pub fn tool_kind(self) -> ToolKind {
        match self {
            RustCrateType::Bin => ToolKind::RustBin,
            RustCrateType::Rlib => ToolKind::RustRlib,
            RustCrateType::Dylib => ToolKind::RustDylib,
            RustCrateType::Cdylib => ToolKind::RustCdylib,
            RustCrateType::ProcMacro => ToolKind::RustMacro,
            RustCrateType::Staticlib => ToolKind::RustStaticlib,
        }
    }

    /// Crate artifacts that other crates can name with `--extern`. A cdylib
    /// or staticlib is a C-shaped artifact and routes like a native library;
    /// a bin is not consumable at all.
    pub fn is_crate_artifact(self) -> bool {
        matches!(
            self,
            RustCrateType::Rlib | RustCrateType::Dylib | RustCrateType::ProcMacro
        )
    }
}

#[derive(Clone, Debug, Default)]
pub struct RustValues {
    crate_root: Option<SourceFile>,
    crate_name: String,
    crate_type: Option<RustCrateType>,
    aliased_deps: IndexMap<Label, String>,
}

impl RustValues {
    pub fn crate_root(&self) -> Option<&SourceFile> {
        self.crate_root.as_ref()
    }

    pub fn set_crate_root(&mut self, f: SourceFile) {
        self.crate_root = Some(f);
    }

    pub fn crate_name(&self) -> &str {
        &self.crate_name
    }

    pub fn set_crate_name(&mut self, name: impl Into<String>) {
        self.crate_name = name.into();
    }

    pub fn crate_type(&self) -> Option<RustCrateType> {
        self.crate_type
    }

    pub fn set_crate_type(&mut self, t: RustCrateType) {
        self.crate_type = Some(t);
    }

    /// Renames requested by this target: dependency label to the name the
    /// crate is referred to by in this target's sources.
    pub fn aliased_deps(&self) -> &IndexMap<Label, String> {
        &self.aliased_deps
    }

    pub fn aliased_deps_mut(&mut self) -> &mut IndexMap<Label, String> {
        &mut self.aliased_deps
    }

    /// The crate type this target compiles to, from the override if set and
    /// the target kind otherwise.
    pub fn inferred_crate_type(&self, output_type: OutputType) -> Option<RustCrateType> {
        if let Some(t) = self.crate_type {
            return Some(t);
        }
        match output_type {
            OutputType::Executable => Some(RustCrateType::Bin),
            OutputType::RustLibrary => Some(RustCrateType::Rlib),
            OutputType::RustProcMacro => Some(RustCrateType::ProcMacro),
            OutputType::StaticLibrary => Some(RustCrateType::Staticlib),
            OutputType::SharedLibrary | OutputType::LoadableModule => Some(RustCrateType::Cdylib),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inferred_types_follow_the_target_kind() {
        let v = RustValues::default();
        assert_eq!(
            v.inferred_crate_type(OutputType::Executable),
            Some(RustCrateType::Bin)
        );
        assert_eq!(
            v.inferred_crate_type(OutputType::RustLibrary),
            Some(RustCrateType::Rlib)
        );
        assert_eq!(
            v.inferred_crate_type(OutputType::SharedLibrary),
            Some(RustCrateType::Cdylib)
        );
        assert_eq!(v.inferred_crate_type(OutputType::Group), None);
    }

    #[test]
    fn override_wins() {
        let mut v = RustValues::default();
        v.set_crate_type(RustCrateType::Dylib);
        assert_eq!(
            v.inferred_crate_type(OutputType::SharedLibrary),
            Some(RustCrateType::Dylib)
        );
    }
}
