/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! An in-memory byte accumulator with change-detecting flush.
//!
//! Generated files are only rewritten when their bytes differ from what is
//! on disk, so the downstream executor's incremental state survives a no-op
//! regeneration. Writes are not atomic: a torn write is acceptable because
//! the executor re-reads and self-corrects on the next run. Concurrent
//! invocations in the same build directory are unsupported.

use std::fmt;
use std::fs;
use std::path::Path;

use gen2_core::error::BuildError;

#[derive(Debug, Default)]
pub struct StringOutputBuffer {
    data: String,
}

impl StringOutputBuffer {
    pub fn new() -> StringOutputBuffer {
        StringOutputBuffer::default()
    }

    pub fn from_string(data: String) -> StringOutputBuffer {
        StringOutputBuffer { data }
    }

    pub fn push_str(&mut self, s: &str) {
        self.data.push_str(s);
    }

    pub fn push(&mut self, c: char) {
        self.data.push(c);
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn into_string(self) -> String {
        self.data
    }

    /// True when the file already holds exactly these bytes.
    pub fn contents_equal(&self, path: &Path) -> bool {
        match fs::read(path) {
            Ok(existing) => existing == self.data.as_bytes(),
            Err(_) => false,
        }
    }

    /// Writes the buffer to `path` unless the on-disk content already
    /// matches, creating parent directories as needed. Returns whether a
    /// write happened.
    pub fn write_to_file_if_changed(&self, path: &Path) -> Result<bool, BuildError> {
        if self.contents_equal(path) {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::write(path, self.data.as_bytes()).map_err(|e| BuildError::io(path, e))?;
        Ok(true)
    }
}

impl fmt::Write for StringOutputBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.data.push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_once_then_skips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("build.ninja");

        let mut buffer = StringOutputBuffer::new();
        buffer.push_str("rule cc\n");

        assert!(buffer.write_to_file_if_changed(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "rule cc\n");

        // Identical bytes: second flush is a no-op.
        assert!(!buffer.write_to_file_if_changed(&path).unwrap());

        // Changed bytes are written again.
        let mut buffer = StringOutputBuffer::new();
        buffer.push_str("rule cxx\n");
        assert!(buffer.write_to_file_if_changed(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "rule cxx\n");
    }
}
