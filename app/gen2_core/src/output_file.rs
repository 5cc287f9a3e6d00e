/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! A simple wrapper around a string that indicates the string is a path
//! relative to the output directory.

use std::collections::BTreeSet;

use derive_more::Display;

/// See the module documentation.
#[derive(Clone, Debug, Display, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OutputFile(String);

impl OutputFile {
    pub fn new(value: impl Into<String>) -> OutputFile {
        OutputFile(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn value_mut(&mut self) -> &mut String {
        &mut self.0
    }

    /// The directory part, without a trailing slash. Files at the build root
    /// (including the `./name` form) yield `.`.
    pub fn dir(&self) -> &str {
        match self.0.rfind('/') {
            Some(0) => "/",
            Some(i) => {
                let d = &self.0[..i];
                if d == "." {
                    "."
                } else {
                    d
                }
            }
            None => ".",
        }
    }
}

/// A sorted, deduplicated set of output files with vector conversions, for
/// call sites that accumulate from several unordered places but must emit
/// deterministically.
#[derive(Clone, Debug, Default)]
pub struct OutputFileSet(BTreeSet<OutputFile>);

impl OutputFileSet {
    pub fn new() -> OutputFileSet {
        OutputFileSet::default()
    }

    pub fn insert(&mut self, f: OutputFile) {
        self.0.insert(f);
    }

    pub fn insert_all(&mut self, files: impl IntoIterator<Item = OutputFile>) {
        self.0.extend(files);
    }

    pub fn contains(&self, f: &OutputFile) -> bool {
        self.0.contains(f)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_sorted_vec(self) -> Vec<OutputFile> {
        self.0.into_iter().collect()
    }
}
