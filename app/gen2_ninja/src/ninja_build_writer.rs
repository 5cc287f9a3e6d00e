/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The top-level driver.
//!
//! Phase 1 resolves every target in dependency order on the calling thread.
//! Phase 2 fans the per-target writers out over a worker pool; each job
//! reads the immutable graph and writes into a private buffer (binary
//! targets flush their own sub-file). Phase 3, back on one thread, stitches
//! the per-toolchain aggregate files together in label order and finally
//! the master `build.ninja`, which is only written when no error occurred,
//! so a failed run never leaves a fresh entry point behind.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use gen2_core::build_settings::BuildSettings;
use gen2_core::error::BuildError;
use gen2_core::escape::escape_ninja;
use gen2_core::output_file::OutputFile;
use gen2_node::graph::TargetGraph;
use gen2_node::graph::TargetIndex;
use gen2_node::graph::ToolchainIndex;
use gen2_node::toolchain::Toolchain;
use indexmap::IndexMap;
use parking_lot::Mutex;
use threadpool::ThreadPool;

use crate::string_output_buffer::StringOutputBuffer;
use crate::target_writer::run_and_write_target;
use crate::trace::TraceCollector;
use crate::trace::TraceKind;

/// Resolves the graph and writes every build file under the build
/// directory. On failure the collected errors are returned and no master
/// `build.ninja` is written.
pub fn run_and_write_files(
    graph: TargetGraph,
    settings: &BuildSettings,
) -> Result<(), Vec<BuildError>> {
    let trace = Arc::new(TraceCollector::new());
    let mut graph = graph;

    let mut errors = {
        let _resolve = trace.scoped(TraceKind::Resolve, "graph");
        graph.resolve_all(settings)
    };
    if errors.iter().any(BuildError::is_fatal) {
        return Err(errors);
    }

    let graph = Arc::new(graph);
    let settings = Arc::new(settings.clone());
    let resolved: Vec<TargetIndex> = graph
        .targets()
        .filter(|(_, t)| t.is_resolved())
        .map(|(i, _)| i)
        .collect();

    // Phase 2: one write job per target. Workers check the shared
    // first-error flag before picking up the next job so a fatal error
    // drains the pool cooperatively.
    let results: Arc<Mutex<Vec<Option<String>>>> =
        Arc::new(Mutex::new(vec![None; graph.target_count()]));
    let job_errors: Arc<Mutex<Vec<BuildError>>> = Arc::new(Mutex::new(Vec::new()));
    let fatal = Arc::new(AtomicBool::new(false));

    let pool = ThreadPool::new(num_cpus::get());
    for idx in &resolved {
        let idx = *idx;
        let graph = graph.clone();
        let settings = settings.clone();
        let results = results.clone();
        let job_errors = job_errors.clone();
        let fatal = fatal.clone();
        let trace = trace.clone();
        pool.execute(move || {
            if fatal.load(Ordering::SeqCst) {
                return;
            }
            match run_and_write_target(&graph, &settings, idx, &trace) {
                Ok(rules) => results.lock()[idx.0 as usize] = Some(rules),
                Err(e) => {
                    if e.is_fatal() {
                        fatal.store(true, Ordering::SeqCst);
                    }
                    job_errors.lock().push(e);
                }
            }
        });
    }
    pool.join();

    errors.append(&mut *job_errors.lock());
    if fatal.load(Ordering::SeqCst) {
        return Err(errors);
    }

    // Phase 3: aggregate files, single-threaded and label-sorted.
    let mut by_toolchain: IndexMap<ToolchainIndex, Vec<TargetIndex>> = IndexMap::new();
    for idx in &resolved {
        if let Some(tc) = graph.target(*idx).toolchain() {
            by_toolchain.entry(tc).or_default().push(*idx);
        }
    }

    let results = results.lock();
    let mut toolchain_files: Vec<OutputFile> = Vec::new();
    for (tc_idx, toolchain) in graph.toolchains() {
        let Some(mut targets) = by_toolchain.get(&tc_idx).cloned() else {
            continue;
        };
        targets.sort_by(|a, b| graph.target(*a).label().cmp(graph.target(*b).label()));

        let mut buffer = StringOutputBuffer::new();
        write_tool_rules(&graph, tc_idx, toolchain, &mut buffer);
        for idx in targets {
            if let Some(rules) = &results[idx.0 as usize] {
                buffer.push_str(rules);
            }
        }

        let out_file = match graph.default_toolchain() {
            Some(default) if default == tc_idx => OutputFile::new("toolchain.ninja"),
            _ => OutputFile::new(format!("{}/toolchain.ninja", toolchain.label().name())),
        };
        let _write = trace.scoped(TraceKind::FileWrite, out_file.as_str().to_owned());
        if let Err(e) = buffer.write_to_file_if_changed(&settings.full_path_for_output(&out_file)) {
            errors.push(e);
            return Err(errors);
        }
        toolchain_files.push(out_file);
    }

    // Any queued user error means the command fails and the master file
    // must not appear.
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut master = StringOutputBuffer::new();
    master.push_str("ninja_required_version = 1.7.2\n\n");
    for file in &toolchain_files {
        master.push_str("subninja ");
        master.push_str(&escape_ninja(file.as_str()));
        master.push('\n');
    }

    let mut default_targets: Vec<TargetIndex> = resolved.clone();
    default_targets.sort_by(|a, b| graph.target(*a).label().cmp(graph.target(*b).label()));
    master.push_str("\nbuild all: phony");
    for idx in default_targets {
        if let Some(dep) = graph.target(idx).dependency_output_file_or_phony() {
            master.push(' ');
            master.push_str(&escape_ninja(dep.as_str()));
        }
    }
    master.push_str("\ndefault all\n");

    let build_ninja = OutputFile::new("build.ninja");
    if let Err(e) = master.write_to_file_if_changed(&settings.full_path_for_output(&build_ninja)) {
        errors.push(e);
        return Err(errors);
    }

    tracing::debug!("\n{}", trace.summarize());
    Ok(())
}

fn write_tool_rules(
    graph: &TargetGraph,
    tc_idx: ToolchainIndex,
    toolchain: &Toolchain,
    buffer: &mut StringOutputBuffer,
) {
    let prefix = match graph.default_toolchain() {
        Some(default) if default == tc_idx => String::new(),
        _ => format!("{}_", toolchain.label().name()),
    };
    for tool in toolchain.tools() {
        buffer.push_str("rule ");
        buffer.push_str(&prefix);
        buffer.push_str(tool.kind().name());
        buffer.push_str("\n  command = ");
        buffer.push_str(&tool.command().as_ninja_command());
        buffer.push_str("\n");
        if let Some(description) = tool.description() {
            buffer.push_str("  description = ");
            buffer.push_str(description);
            buffer.push_str("\n");
        }
        if let Some(depfile) = tool.depfile() {
            buffer.push_str("  depfile = ");
            buffer.push_str(&depfile.as_ninja_command());
            buffer.push_str("\n");
        }
        if let Some(pool) = tool.pool() {
            buffer.push_str("  pool = ");
            buffer.push_str(pool);
            buffer.push_str("\n");
        }
    }
    buffer.push_str("\n");
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use gen2_core::build_settings::BuildSettings;
    use gen2_core::source_file::SourceDir;
    use gen2_core::source_file::SourceFile;
    use gen2_core::source_file::SourceType;
    use gen2_node::graph::LabelTargetPair;
    use gen2_node::target::OutputType;
    use gen2_node::testing::TestSetup;

    use super::run_and_write_files;

    fn test_settings(dir: &std::path::Path) -> BuildSettings {
        BuildSettings::new(
            PathBuf::from(dir),
            SourceDir::unchecked_new("//out/Debug/"),
        )
    }

    /// Builds bin -> group -> rlib and runs the whole driver twice.
    #[test]
    fn writes_everything_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut setup = TestSetup::new();
        setup.settings = test_settings(dir.path());

        let mut rlib = setup.target("//bar:mylib", OutputType::RustLibrary);
        let root = SourceFile::unchecked_new("//bar/lib.rs");
        rlib.sources_mut().push(root.clone());
        rlib.source_types_used_mut().set(SourceType::Rust);
        rlib.rust_values_mut().set_crate_root(root);
        rlib.rust_values_mut().set_crate_name("mylib");
        let rlib = setup.add_target(rlib);

        let mut group = setup.target("//baz:group", OutputType::Group);
        group.public_deps_mut().push(LabelTargetPair::new(
            setup.graph.target(rlib).label().clone(),
            rlib,
        ));
        let group = setup.add_target(group);

        let mut bin = setup.target("//foo:bar", OutputType::Executable);
        let main = SourceFile::unchecked_new("//foo/main.rs");
        bin.sources_mut().push(main.clone());
        bin.source_types_used_mut().set(SourceType::Rust);
        bin.rust_values_mut().set_crate_root(main);
        bin.rust_values_mut().set_crate_name("foo_bar");
        bin.private_deps_mut().push(LabelTargetPair::new(
            setup.graph.target(group).label().clone(),
            group,
        ));
        setup.add_target(bin);

        let settings = setup.settings.clone();
        run_and_write_files(setup.graph, &settings).unwrap();

        let out_root = dir.path().join("out").join("Debug");
        let master = std::fs::read_to_string(out_root.join("build.ninja")).unwrap();
        assert!(master.starts_with("ninja_required_version = 1.7.2\n"));
        assert!(master.contains("subninja toolchain.ninja\n"));
        // Sorted by label: //bar:mylib, //baz:group, //foo:bar.
        assert!(master.contains(
            "build all: phony obj/bar/libmylib.rlib obj/baz/group.stamp ./foo_bar\ndefault all\n"
        ));

        let toolchain = std::fs::read_to_string(out_root.join("toolchain.ninja")).unwrap();
        assert!(toolchain.contains("rule rust_bin\n"));
        assert!(toolchain.contains(
            "command = ${rustenv} rustc --crate-name ${crate_name} $in --crate-type \
             ${crate_type} ${rustflags} -o $out ${rustdeps} ${externs}\n"
        ));
        // The group's rules coalesce into the aggregate file; the binary
        // targets land in sub-files.
        assert!(toolchain.contains("build obj/baz/group.stamp: phony obj/bar/libmylib.rlib\n"));
        assert!(toolchain.contains("subninja obj/bar/mylib.ninja\n"));
        assert!(toolchain.contains("subninja obj/foo/bar.ninja\n"));

        let sub = std::fs::read_to_string(out_root.join("obj").join("foo").join("bar.ninja"))
            .unwrap();
        assert!(sub.contains("build ./foo_bar: rust_bin ../../foo/main.rs"));

        // A second run over the same input reproduces the same bytes and
        // rewrites nothing.
        let mtime_before = std::fs::metadata(out_root.join("build.ninja"))
            .unwrap()
            .modified()
            .unwrap();
        let mut setup2 = TestSetup::new();
        setup2.settings = test_settings(dir.path());
        let mut rlib = setup2.target("//bar:mylib", OutputType::RustLibrary);
        let root = SourceFile::unchecked_new("//bar/lib.rs");
        rlib.sources_mut().push(root.clone());
        rlib.source_types_used_mut().set(SourceType::Rust);
        rlib.rust_values_mut().set_crate_root(root);
        rlib.rust_values_mut().set_crate_name("mylib");
        let rlib = setup2.add_target(rlib);
        let mut group = setup2.target("//baz:group", OutputType::Group);
        group.public_deps_mut().push(LabelTargetPair::new(
            setup2.graph.target(rlib).label().clone(),
            rlib,
        ));
        let group = setup2.add_target(group);
        let mut bin = setup2.target("//foo:bar", OutputType::Executable);
        let main = SourceFile::unchecked_new("//foo/main.rs");
        bin.sources_mut().push(main.clone());
        bin.source_types_used_mut().set(SourceType::Rust);
        bin.rust_values_mut().set_crate_root(main);
        bin.rust_values_mut().set_crate_name("foo_bar");
        bin.private_deps_mut().push(LabelTargetPair::new(
            setup2.graph.target(group).label().clone(),
            group,
        ));
        setup2.add_target(bin);

        let settings = setup2.settings.clone();
        run_and_write_files(setup2.graph, &settings).unwrap();
        let mtime_after = std::fs::metadata(out_root.join("build.ninja"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(mtime_before, mtime_after);
    }

    #[test]
    fn a_user_error_suppresses_the_master_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut setup = TestSetup::new();
        setup.settings = test_settings(dir.path());

        // Invalid: a Rust source set.
        let mut bad = setup.target("//foo:bad", OutputType::SourceSet);
        bad.sources_mut().push(SourceFile::unchecked_new("//foo/lib.rs"));
        bad.source_types_used_mut().set(SourceType::Rust);
        setup.add_target(bad);

        // A healthy sibling still resolves and emits.
        let mut ok = setup.target("//bar:mylib", OutputType::RustLibrary);
        let root = SourceFile::unchecked_new("//bar/lib.rs");
        ok.sources_mut().push(root.clone());
        ok.source_types_used_mut().set(SourceType::Rust);
        ok.rust_values_mut().set_crate_root(root);
        ok.rust_values_mut().set_crate_name("mylib");
        setup.add_target(ok);

        let settings = setup.settings.clone();
        let errors = run_and_write_files(setup.graph, &settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("may not contain Rust sources"));

        let out_root = dir.path().join("out").join("Debug");
        assert!(!out_root.join("build.ninja").exists());
        // The healthy target's sub-file was still produced, maximizing the
        // diagnostics from one run.
        assert!(out_root.join("obj").join("bar").join("mylib.ninja").exists());
    }
}
