/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The error type for graph resolution and file emission.
//!
//! There are four kinds, with different propagation policies:
//! user errors and cycle errors exclude the offending target but let the run
//! continue so one invocation surfaces as many diagnostics as possible;
//! I/O errors and internal invariant violations abort immediately.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::label::Label;

/// Where in a declarative input a user error originated, when known.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid declarative input. The target is excluded from emission and
    /// resolution of other targets continues.
    #[error("{message}")]
    User {
        message: String,
        location: Option<Location>,
        snippet: Option<String>,
    },

    /// A cycle in the dependency graph, with the full cycle path.
    #[error("dependency cycle: {}", format_cycle(.path))]
    Cycle { path: Vec<Label> },

    /// Filesystem failure while emitting. Fatal.
    #[error("I/O error writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invariant violation. Fatal.
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_cycle(path: &[Label]) -> String {
    path.iter()
        .map(|l| l.user_visible_name(false))
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl BuildError {
    pub fn user(message: impl Into<String>) -> BuildError {
        BuildError::User {
            message: message.into(),
            location: None,
            snippet: None,
        }
    }

    pub fn user_at(
        message: impl Into<String>,
        location: Location,
        snippet: Option<String>,
    ) -> BuildError {
        BuildError::User {
            message: message.into(),
            location: Some(location),
            snippet,
        }
    }

    pub fn internal(message: impl Into<String>) -> BuildError {
        BuildError::Internal(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> BuildError {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    /// Fatal errors drain the worker pool and abort the run; the rest are
    /// queued for reporting while other targets proceed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BuildError::Io { .. } | BuildError::Internal(_))
    }

    /// The user-facing rendering:
    ///
    /// ```text
    /// ERROR at <path>:<line>:<col>
    /// <message>
    /// <snippet>
    /// <caret>
    /// ```
    pub fn render(&self) -> String {
        match self {
            BuildError::User {
                message,
                location,
                snippet,
            } => {
                let mut out = String::new();
                match location {
                    Some(loc) => out.push_str(&format!("ERROR at {}\n{}\n", loc, message)),
                    None => out.push_str(&format!("ERROR: {}\n", message)),
                }
                if let (Some(snippet), Some(loc)) = (snippet, location) {
                    out.push_str(snippet);
                    out.push('\n');
                    for _ in 1..loc.column {
                        out.push(' ');
                    }
                    out.push_str("^\n");
                }
                out
            }
            other => format!("ERROR: {}\n", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_location_and_caret() {
        let err = BuildError::user_at(
            "may not contain Rust sources",
            Location {
                file: "//foo/BUILD".to_owned(),
                line: 4,
                column: 3,
            },
            Some("  sources = [ \"main.rs\" ]".to_owned()),
        );
        let rendered = err.render();
        assert!(rendered.starts_with("ERROR at //foo/BUILD:4:3\n"));
        assert!(rendered.contains("may not contain Rust sources\n"));
        assert!(rendered.ends_with("  ^\n"));
    }

    #[test]
    fn cycle_lists_the_path() {
        let err = BuildError::Cycle {
            path: vec![
                Label::parse("//a:a").unwrap(),
                Label::parse("//b:b").unwrap(),
                Label::parse("//a:a").unwrap(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle: //a:a -> //b:b -> //a:a"
        );
        assert!(!err.is_fatal());
    }
}
