/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Escaping for the emitted ninja dialect. `$` introduces variable
//! references, so a literal `$`, space, or `:` is written `$$`, `$ `, `$:`.

use std::fmt;
use std::fmt::Write;

/// Escapes `s` for a path or value position in a ninja file.
///
/// ```
/// use gen2_core::escape::escape_ninja;
///
/// assert_eq!(escape_ninja("obj/foo bar/a$b:c"), "obj/foo$ bar/a$$b$:c");
/// assert_eq!(escape_ninja("plain"), "plain");
/// ```
pub fn escape_ninja(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // Unwrap is fine: writing to a String cannot fail.
    escape_ninja_to(&mut out, s).unwrap();
    out
}

/// Streaming variant of [`escape_ninja`].
pub fn escape_ninja_to(out: &mut dyn Write, s: &str) -> fmt::Result {
    for c in s.chars() {
        match c {
            '$' => out.write_str("$$")?,
            ' ' => out.write_str("$ ")?,
            ':' => out.write_str("$:")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::escape_ninja;

    #[test]
    fn nothing_to_escape() {
        assert_eq!(escape_ninja("../../foo/main.rs"), "../../foo/main.rs");
    }

    #[test]
    fn all_specials() {
        assert_eq!(escape_ninja("a b"), "a$ b");
        assert_eq!(escape_ninja("c:d"), "c$:d");
        assert_eq!(escape_ninja("$"), "$$");
    }
}
