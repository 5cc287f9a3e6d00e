/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Wrappers for paths in the source tree.
//!
//! A 'SourceFile' is either source-absolute (`//foo/bar.rs`, relative to the
//! source root) or system-absolute (`/usr/include/x.h`). A 'SourceDir' is the
//! same thing for directories and always ends in a slash. Both are kept in
//! their source form while they act as build-graph keys; they are only
//! rebased against the build directory at emission time.

use std::fmt;

use derive_more::Display;

use crate::error::BuildError;

/// A single file in the source tree.
#[derive(Clone, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SourceFile(String);

impl SourceFile {
    /// Creates a 'SourceFile', checking that the value is source-absolute or
    /// system-absolute.
    ///
    /// ```
    /// use gen2_core::source_file::SourceFile;
    ///
    /// assert!(SourceFile::new("//foo/main.rs").is_ok());
    /// assert!(SourceFile::new("/abs/main.rs").is_ok());
    /// assert!(SourceFile::new("relative.rs").is_err());
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, BuildError> {
        let value = value.into();
        if !value.starts_with('/') {
            return Err(BuildError::user(format!(
                "source file `{}` is not source-absolute (`//...`) or absolute",
                value
            )));
        }
        Ok(SourceFile(value))
    }

    pub fn unchecked_new(value: impl Into<String>) -> Self {
        SourceFile(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_source_absolute(&self) -> bool {
        self.0.starts_with("//")
    }

    /// The file name, without any directory.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(i) => &self.0[i + 1..],
            None => &self.0,
        }
    }

    /// The file name with the extension (and its dot) removed.
    pub fn name_part(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(i) if i > 0 => &name[..i],
            _ => name,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(i) if i > 0 => Some(&name[i + 1..]),
            _ => None,
        }
    }

    /// The directory containing this file, with a trailing slash.
    pub fn dir(&self) -> SourceDir {
        match self.0.rfind('/') {
            Some(i) => SourceDir::unchecked_new(&self.0[..=i]),
            None => SourceDir::unchecked_new("//"),
        }
    }

    pub fn source_type(&self) -> SourceType {
        SourceType::from_extension(self.extension().unwrap_or(""))
    }
}

/// A directory in the source tree. The value always ends in a slash.
#[derive(Clone, Debug, Default, Display, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SourceDir(String);

impl SourceDir {
    /// Creates a 'SourceDir', appending the trailing slash if missing.
    ///
    /// ```
    /// use gen2_core::source_file::SourceDir;
    ///
    /// assert_eq!(SourceDir::new("//foo").unwrap().as_str(), "//foo/");
    /// assert_eq!(SourceDir::new("//foo/").unwrap().as_str(), "//foo/");
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, BuildError> {
        let mut value = value.into();
        if !value.starts_with('/') {
            return Err(BuildError::user(format!(
                "source dir `{}` is not source-absolute (`//...`) or absolute",
                value
            )));
        }
        if !value.ends_with('/') {
            value.push('/');
        }
        Ok(SourceDir(value))
    }

    pub fn unchecked_new(value: impl Into<String>) -> Self {
        SourceDir(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_source_absolute(&self) -> bool {
        self.0.starts_with("//")
    }

    /// Joins a file name onto this directory.
    pub fn join_file(&self, name: &str) -> SourceFile {
        SourceFile(format!("{}{}", self.0, name))
    }

    /// The directory path relative to the source root, without the leading
    /// `//` and without the trailing slash. `//` itself maps to the empty
    /// string.
    pub fn source_relative(&self) -> &str {
        let s = self.0.trim_start_matches('/');
        s.strip_suffix('/').unwrap_or(s)
    }
}

/// The language family of a source file, as far as tool selection cares.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SourceType {
    Rust,
    Cpp,
    C,
    Asm,
    Other,
}

impl SourceType {
    pub fn from_extension(ext: &str) -> SourceType {
        match ext {
            "rs" => SourceType::Rust,
            "cc" | "cpp" | "cxx" => SourceType::Cpp,
            "c" => SourceType::C,
            "s" | "S" | "asm" => SourceType::Asm,
            _ => SourceType::Other,
        }
    }
}

/// Which source types a target actually contains. Filled in by the front-end
/// while populating the target, consulted during resolution to validate the
/// target kind and pick tools.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SourceTypes {
    rust: bool,
    c: bool,
    cpp: bool,
    asm: bool,
}

impl SourceTypes {
    pub fn set(&mut self, t: SourceType) {
        match t {
            SourceType::Rust => self.rust = true,
            SourceType::C => self.c = true,
            SourceType::Cpp => self.cpp = true,
            SourceType::Asm => self.asm = true,
            SourceType::Other => {}
        }
    }

    pub fn rust_used(&self) -> bool {
        self.rust
    }

    pub fn c_used(&self) -> bool {
        self.c
    }

    pub fn cpp_used(&self) -> bool {
        self.cpp
    }

    pub fn any_used(&self) -> bool {
        self.rust || self.c || self.cpp || self.asm
    }

    /// True if any non-Rust compiled language is present.
    pub fn native_used(&self) -> bool {
        self.c || self.cpp || self.asm
    }
}

impl fmt::Display for SourceTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.rust {
            names.push("rust");
        }
        if self.c {
            names.push("c");
        }
        if self.cpp {
            names.push("c++");
        }
        if self.asm {
            names.push("asm");
        }
        write!(f, "{}", names.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_parts() {
        let f = SourceFile::new("//baz/csourceset.cpp").unwrap();
        assert_eq!(f.file_name(), "csourceset.cpp");
        assert_eq!(f.name_part(), "csourceset");
        assert_eq!(f.extension(), Some("cpp"));
        assert_eq!(f.dir().as_str(), "//baz/");
        assert_eq!(f.source_type(), SourceType::Cpp);
    }

    #[test]
    fn dir_source_relative() {
        assert_eq!(SourceDir::unchecked_new("//foo/").source_relative(), "foo");
        assert_eq!(
            SourceDir::unchecked_new("//foo/bar/").source_relative(),
            "foo/bar"
        );
        assert_eq!(SourceDir::unchecked_new("//").source_relative(), "");
    }

    #[test]
    fn dotfile_has_no_extension() {
        let f = SourceFile::unchecked_new("//foo/.gitignore");
        assert_eq!(f.name_part(), ".gitignore");
        assert_eq!(f.extension(), None);
    }
}
