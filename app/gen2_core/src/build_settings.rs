/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Per-invocation settings: where the source tree lives on disk and which
//! directory inside it receives the generated files.

use std::path::PathBuf;

use crate::label::Label;
use crate::output_file::OutputFile;
use crate::path_utils::rebase_source_dir;
use crate::path_utils::rebase_source_path;
use crate::source_file::SourceDir;
use crate::source_file::SourceFile;

#[derive(Clone, Debug)]
pub struct BuildSettings {
    /// Absolute filesystem path of the source root (what `//` refers to).
    root_path: PathBuf,
    /// The build directory, source-absolute (e.g. `//out/Debug/`).
    build_dir: SourceDir,
}

impl BuildSettings {
    pub fn new(root_path: PathBuf, build_dir: SourceDir) -> BuildSettings {
        BuildSettings {
            root_path,
            build_dir,
        }
    }

    pub fn root_path(&self) -> &PathBuf {
        &self.root_path
    }

    pub fn build_dir(&self) -> &SourceDir {
        &self.build_dir
    }

    /// A source file as seen from the build directory, for use in emitted
    /// rules.
    pub fn output_file_for_source(&self, f: &SourceFile) -> OutputFile {
        OutputFile::new(rebase_source_path(f.as_str(), self.build_dir.as_str()))
    }

    /// A source directory as seen from the build directory, without a
    /// trailing slash.
    pub fn rebased_dir(&self, d: &SourceDir) -> String {
        rebase_source_dir(d.as_str(), self.build_dir.as_str())
    }

    /// `obj/<dir>` for the target's object/stamp files.
    pub fn target_out_dir(&self, label: &Label) -> String {
        let rel = label.dir().source_relative();
        if rel.is_empty() {
            "obj".to_owned()
        } else {
            format!("obj/{}", rel)
        }
    }

    /// `gen/<dir>` for generated sources.
    pub fn target_gen_dir(&self, label: &Label) -> String {
        let rel = label.dir().source_relative();
        if rel.is_empty() {
            "gen".to_owned()
        } else {
            format!("gen/{}", rel)
        }
    }

    pub fn root_out_dir(&self) -> &'static str {
        "."
    }

    pub fn root_gen_dir(&self) -> &'static str {
        "gen"
    }

    /// The sub-ninja file a binary target's rules are written into.
    pub fn ninja_file_for_target(&self, label: &Label) -> OutputFile {
        OutputFile::new(format!(
            "{}/{}.ninja",
            self.target_out_dir(label),
            label.name()
        ))
    }

    /// Absolute on-disk path for a generated file.
    pub fn full_path_for_output(&self, f: &OutputFile) -> PathBuf {
        let mut p = self.root_path.clone();
        for comp in self.build_dir.as_str().trim_matches('/').split('/') {
            if !comp.is_empty() {
                p.push(comp);
            }
        }
        for comp in f.as_str().split('/') {
            match comp {
                "" | "." => {}
                comp => p.push(comp),
            }
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> BuildSettings {
        BuildSettings::new(
            PathBuf::from("/src"),
            SourceDir::unchecked_new("//out/Debug/"),
        )
    }

    #[test]
    fn source_rebasing() {
        let s = settings();
        assert_eq!(
            s.output_file_for_source(&SourceFile::unchecked_new("//foo/main.rs"))
                .as_str(),
            "../../foo/main.rs"
        );
        assert_eq!(s.rebased_dir(&SourceDir::unchecked_new("//baz/")), "../../baz");
    }

    #[test]
    fn target_dirs() {
        let s = settings();
        let label = Label::parse("//foo:bar").unwrap();
        assert_eq!(s.target_out_dir(&label), "obj/foo");
        assert_eq!(s.target_gen_dir(&label), "gen/foo");
        assert_eq!(
            s.ninja_file_for_target(&label).as_str(),
            "obj/foo/bar.ninja"
        );
    }

    #[test]
    fn full_output_paths() {
        let s = settings();
        assert_eq!(
            s.full_path_for_output(&OutputFile::new("obj/foo/bar.ninja")),
            PathBuf::from("/src/out/Debug/obj/foo/bar.ninja")
        );
        assert_eq!(
            s.full_path_for_output(&OutputFile::new("./foo_bar")),
            PathBuf::from("/src/out/Debug/foo_bar")
        );
    }
}
