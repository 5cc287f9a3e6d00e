/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Path emission into rules: source paths are rebased against the build
//! directory, output paths are already build-relative, everything is
//! escaped.

use gen2_core::build_settings::BuildSettings;
use gen2_core::escape::escape_ninja;
use gen2_core::output_file::OutputFile;
use gen2_core::source_file::SourceFile;

pub struct PathOutput<'a> {
    settings: &'a BuildSettings,
}

impl<'a> PathOutput<'a> {
    pub fn new(settings: &'a BuildSettings) -> PathOutput<'a> {
        PathOutput { settings }
    }

    pub fn file(&self, out: &mut String, f: &OutputFile) {
        out.push_str(&escape_ninja(f.as_str()));
    }

    /// Each file preceded by a space, for appending to a build line.
    pub fn files<'b>(&self, out: &mut String, files: impl IntoIterator<Item = &'b OutputFile>) {
        for f in files {
            out.push(' ');
            self.file(out, f);
        }
    }

    pub fn source(&self, out: &mut String, f: &SourceFile) {
        self.file(out, &self.settings.output_file_for_source(f));
    }

    pub fn sources<'b>(&self, out: &mut String, files: impl IntoIterator<Item = &'b SourceFile>) {
        for f in files {
            out.push(' ');
            self.source(out, f);
        }
    }
}
