/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Path rebasing between the source tree and the build directory.
//!
//! Graph keys stay in source form (`//a/b/c.rs`); every path that appears in
//! an emitted rule is rebased against the build directory first. The output
//! is always the textually shortest relative path.

/// Rebases a source-absolute file path against `base_dir` (also
/// source-absolute, with a trailing slash). System-absolute paths are
/// returned unchanged.
///
/// ```
/// use gen2_core::path_utils::rebase_source_path;
///
/// assert_eq!(
///     rebase_source_path("//foo/main.rs", "//out/Debug/"),
///     "../../foo/main.rs"
/// );
/// assert_eq!(
///     rebase_source_path("//out/Debug/obj/foo/x.o", "//out/Debug/"),
///     "obj/foo/x.o"
/// );
/// assert_eq!(rebase_source_path("/usr/lib/z.a", "//out/Debug/"), "/usr/lib/z.a");
/// ```
pub fn rebase_source_path(path: &str, base_dir: &str) -> String {
    if !path.starts_with("//") {
        return path.to_owned();
    }
    let path = &path[2..];
    let base = base_dir.trim_start_matches('/');

    let path_comps: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let base_comps: Vec<&str> = base.split('/').filter(|c| !c.is_empty()).collect();

    // The last path component is the file name; only directories participate
    // in the common-prefix computation.
    let (dirs, file) = match path_comps.split_last() {
        Some((file, dirs)) => (dirs, *file),
        None => (&[][..], ""),
    };

    let common = dirs
        .iter()
        .zip(base_comps.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = String::new();
    for _ in common..base_comps.len() {
        out.push_str("../");
    }
    for dir in &dirs[common..] {
        out.push_str(dir);
        out.push('/');
    }
    out.push_str(file);
    out
}

/// Rebases a source-absolute directory against `base_dir`. The result has no
/// trailing slash; rebasing a directory against itself yields `.`.
///
/// ```
/// use gen2_core::path_utils::rebase_source_dir;
///
/// assert_eq!(rebase_source_dir("//baz/", "//out/Debug/"), "../../baz");
/// assert_eq!(rebase_source_dir("//out/Debug/", "//out/Debug/"), ".");
/// assert_eq!(rebase_source_dir("//out/Debug/foo/", "//out/Debug/"), "foo");
/// ```
pub fn rebase_source_dir(dir: &str, base_dir: &str) -> String {
    if !dir.starts_with("//") {
        return dir.strip_suffix('/').unwrap_or(dir).to_owned();
    }
    let dir_comps: Vec<&str> = dir[2..].split('/').filter(|c| !c.is_empty()).collect();
    let base_comps: Vec<&str> = base_dir
        .trim_start_matches('/')
        .split('/')
        .filter(|c| !c.is_empty())
        .collect();

    let common = dir_comps
        .iter()
        .zip(base_comps.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..base_comps.len() {
        parts.push("..");
    }
    parts.extend(&dir_comps[common..]);
    if parts.is_empty() {
        ".".to_owned()
    } else {
        parts.join("/")
    }
}

/// Joins `rel` onto a source-absolute directory and collapses `.` and `..`
/// segments, staying within the source root.
pub fn join_and_normalize(base_dir: &str, rel: &str) -> String {
    let mut comps: Vec<&str> = base_dir
        .trim_start_matches('/')
        .split('/')
        .filter(|c| !c.is_empty())
        .collect();
    for comp in rel.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                comps.pop();
            }
            c => comps.push(c),
        }
    }
    format!("//{}", comps.join("/"))
}
