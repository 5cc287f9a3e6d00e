/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! A 'Label' uniquely identifies one target in the graph: the directory that
//! declared it, the target name, and the toolchain it is built with
//! (`//dir:name(//toolchain:name)`). Labels are total-ordered; two labels are
//! equal iff all fields match.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use gazebo::dupe::Dupe;
use serde::Serialize;
use serde::Serializer;

use crate::error::BuildError;
use crate::source_file::SourceDir;

#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct LabelData {
    dir: SourceDir,
    name: String,
    /// Empty dir/name means "no toolchain annotation".
    toolchain_dir: SourceDir,
    toolchain_name: String,
}

/// See the module documentation.
#[derive(Clone, Dupe, Eq, PartialEq, Hash)]
pub struct Label(Arc<LabelData>);

impl Label {
    pub fn new(dir: SourceDir, name: impl Into<String>) -> Label {
        Label(Arc::new(LabelData {
            dir,
            name: name.into(),
            toolchain_dir: SourceDir::unchecked_new(""),
            toolchain_name: String::new(),
        }))
    }

    pub fn with_toolchain(
        dir: SourceDir,
        name: impl Into<String>,
        toolchain_dir: SourceDir,
        toolchain_name: impl Into<String>,
    ) -> Label {
        Label(Arc::new(LabelData {
            dir,
            name: name.into(),
            toolchain_dir,
            toolchain_name: toolchain_name.into(),
        }))
    }

    /// Parses `//dir:name` or `//dir:name(//tc_dir:tc_name)`.
    ///
    /// ```
    /// use gen2_core::label::Label;
    ///
    /// let l = Label::parse("//foo/bar:baz").unwrap();
    /// assert_eq!(l.dir().as_str(), "//foo/bar/");
    /// assert_eq!(l.name(), "baz");
    /// ```
    pub fn parse(s: &str) -> Result<Label, BuildError> {
        let (target, toolchain) = match s.split_once('(') {
            Some((t, rest)) => {
                let tc = rest.strip_suffix(')').ok_or_else(|| {
                    BuildError::user(format!("label `{}` has an unterminated toolchain", s))
                })?;
                (t, Some(tc))
            }
            None => (s, None),
        };
        let (dir, name) = split_target(target)?;
        match toolchain {
            None => Ok(Label::new(dir, name)),
            Some(tc) => {
                let (tc_dir, tc_name) = split_target(tc)?;
                Ok(Label::with_toolchain(dir, name, tc_dir, tc_name))
            }
        }
    }

    pub fn dir(&self) -> &SourceDir {
        &self.0.dir
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn has_toolchain(&self) -> bool {
        !self.0.toolchain_name.is_empty()
    }

    pub fn toolchain_dir(&self) -> &SourceDir {
        &self.0.toolchain_dir
    }

    pub fn toolchain_name(&self) -> &str {
        &self.0.toolchain_name
    }

    /// The `//dir:name` part without the toolchain annotation.
    pub fn no_toolchain(&self) -> String {
        format!("{}:{}", trim_dir(self.0.dir.as_str()), self.0.name)
    }

    /// The name a user sees in diagnostics and emitted comments.
    pub fn user_visible_name(&self, include_toolchain: bool) -> String {
        if include_toolchain && self.has_toolchain() {
            format!(
                "{}:{}({}:{})",
                trim_dir(self.0.dir.as_str()),
                self.0.name,
                trim_dir(self.0.toolchain_dir.as_str()),
                self.0.toolchain_name
            )
        } else {
            self.no_toolchain()
        }
    }
}

/// A directory plus a trailing `:name`, with the dir's trailing slash folded
/// away (`//foo/:bar` and `//foo:bar` are the same label).
fn trim_dir(dir: &str) -> &str {
    if dir.len() > 2 {
        dir.strip_suffix('/').unwrap_or(dir)
    } else {
        dir
    }
}

fn split_target(s: &str) -> Result<(SourceDir, String), BuildError> {
    let (dir, name) = s
        .split_once(':')
        .ok_or_else(|| BuildError::user(format!("label `{}` is missing `:name`", s)))?;
    if name.is_empty() {
        return Err(BuildError::user(format!("label `{}` has an empty name", s)));
    }
    Ok((SourceDir::new(dir)?, name.to_owned()))
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_visible_name(true))
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self)
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
