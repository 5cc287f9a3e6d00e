/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Per-target resolution: validation, output file computation, and the
//! transitive closures every writer consumes. Runs once per target, after
//! all of the target's dependencies have resolved.

use std::collections::VecDeque;

use gen2_core::build_settings::BuildSettings;
use gen2_core::error::BuildError;
use gen2_core::output_file::OutputFile;
use indexmap::IndexSet;

use crate::graph::TargetGraph;
use crate::graph::TargetIndex;
use crate::inherited_libraries::InheritedLibraries;
use crate::substitution::expand_for_source;
use crate::substitution::expand_for_target;
use crate::substitution::TargetSubstitutionCtx;
use crate::target::DependencyOutput;
use crate::target::OutputType;
use crate::target::ResolvedState;
use crate::target::RustTransitiveLibs;
use crate::target::Target;
use crate::toolchain::Toolchain;

pub(crate) fn compute(
    graph: &TargetGraph,
    idx: TargetIndex,
    settings: &BuildSettings,
) -> Result<ResolvedState, BuildError> {
    let target = graph.target(idx);
    let toolchain = validate(graph, target)?;

    let mut state = ResolvedState::default();
    fill_output_files(target, toolchain, settings, &mut state)?;
    fill_recursive_hard_deps(graph, target, &mut state);
    fill_inherited_libraries(graph, target, &mut state);
    if target.is_rust_target() {
        state.rust_libs = compute_rust_transitive_libs(graph, target);
    }
    Ok(state)
}

fn validate<'a>(graph: &'a TargetGraph, target: &Target) -> Result<&'a Toolchain, BuildError> {
    let toolchain = target.toolchain().ok_or_else(|| {
        BuildError::user(format!("target {} has no toolchain", target.label()))
    })?;
    let toolchain = graph.toolchain(toolchain);

    if target.output_type() == OutputType::SourceSet && target.source_types_used().rust_used() {
        return Err(BuildError::user(format!(
            "source_set {} may not contain Rust sources",
            target.label()
        )));
    }

    if target.is_rust_target() {
        let root = target.rust_values().crate_root().ok_or_else(|| {
            BuildError::user(format!(
                "Rust target {} does not designate a crate root",
                target.label()
            ))
        })?;
        if !target.sources().contains(root) {
            return Err(BuildError::user(format!(
                "crate root {} of {} is not among its sources",
                root,
                target.label()
            )));
        }
        // Verifies a rust tool exists for the crate type up front, so the
        // writer never has to.
        toolchain.tool_for_target(target)?;
    } else if matches!(
        target.output_type(),
        OutputType::Executable
            | OutputType::StaticLibrary
            | OutputType::SharedLibrary
            | OutputType::LoadableModule
    ) {
        toolchain.tool_for_target(target)?;
    }

    Ok(toolchain)
}

fn stamp_file(settings: &BuildSettings, target: &Target, suffix: &str) -> OutputFile {
    OutputFile::new(format!(
        "{}/{}{}",
        settings.target_out_dir(target.label()),
        target.label().name(),
        suffix
    ))
}

fn fill_output_files(
    target: &Target,
    toolchain: &Toolchain,
    settings: &BuildSettings,
    state: &mut ResolvedState,
) -> Result<(), BuildError> {
    match target.output_type() {
        OutputType::Group => {
            let has_members = !target.public_deps().is_empty()
                || !target.private_deps().is_empty()
                || !target.data_deps().is_empty();
            // A memberless group contributes nothing; consumers see `None`
            // and simply skip it.
            state.dependency_output =
                has_members.then(|| DependencyOutput::Phony(stamp_file(settings, target, ".stamp")));
        }
        OutputType::SourceSet => {
            for source in target.sources() {
                let source_type = source.source_type();
                let Some(tool) = toolchain.compiler_for_source(source_type) else {
                    continue;
                };
                let ctx = TargetSubstitutionCtx {
                    settings,
                    target,
                    tool: Some(tool),
                };
                for pattern in tool.outputs() {
                    let out = expand_for_source(pattern, &ctx, source)?;
                    state.computed_outputs.push(OutputFile::new(out));
                }
            }
            let has_anything = !state.computed_outputs.is_empty()
                || target.linked_deps().next().is_some()
                || !target.data_deps().is_empty();
            state.dependency_output =
                has_anything.then(|| DependencyOutput::Phony(stamp_file(settings, target, ".stamp")));
        }
        OutputType::Copy => {
            let pattern = target.action_values().outputs().first().ok_or_else(|| {
                BuildError::user(format!("copy target {} declares no outputs", target.label()))
            })?;
            for source in target.sources() {
                let ctx = TargetSubstitutionCtx {
                    settings,
                    target,
                    tool: None,
                };
                let out = expand_for_source(pattern, &ctx, source)?;
                state
                    .computed_outputs
                    .push(settings.output_file_for_source(
                        &gen2_core::source_file::SourceFile::unchecked_new(out),
                    ));
            }
            state.dependency_output = match state.computed_outputs.as_slice() {
                [] => None,
                [single] => Some(DependencyOutput::File(single.clone())),
                _ => Some(DependencyOutput::Phony(stamp_file(settings, target, ".stamp"))),
            };
        }
        OutputType::Action | OutputType::ActionForeach | OutputType::GeneratedFile => {
            let ctx = TargetSubstitutionCtx {
                settings,
                target,
                tool: None,
            };
            if target.output_type() == OutputType::ActionForeach {
                for source in target.sources() {
                    for pattern in target.action_values().outputs() {
                        let out = expand_for_source(pattern, &ctx, source)?;
                        state
                            .computed_outputs
                            .push(settings.output_file_for_source(
                                &gen2_core::source_file::SourceFile::unchecked_new(out),
                            ));
                    }
                }
            } else {
                for pattern in target.action_values().outputs() {
                    let out = expand_for_target(pattern, &ctx)?;
                    state
                        .computed_outputs
                        .push(settings.output_file_for_source(
                            &gen2_core::source_file::SourceFile::unchecked_new(out),
                        ));
                }
            }
            if target.output_type() == OutputType::GeneratedFile
                && state.computed_outputs.len() != 1
            {
                return Err(BuildError::user(format!(
                    "generated_file {} must have exactly one output",
                    target.label()
                )));
            }
            state.dependency_output = match state.computed_outputs.as_slice() {
                [] => {
                    return Err(BuildError::user(format!(
                        "{} {} declares no outputs",
                        target.output_type().as_str(),
                        target.label()
                    )));
                }
                [single] if target.output_type() == OutputType::Action => {
                    Some(DependencyOutput::File(single.clone()))
                }
                _ => Some(DependencyOutput::Phony(stamp_file(settings, target, ".stamp"))),
            };
        }
        OutputType::BundleData | OutputType::CreateBundle => {
            state.dependency_output =
                Some(DependencyOutput::Phony(stamp_file(settings, target, ".stamp")));
        }
        OutputType::StaticLibrary
        | OutputType::SharedLibrary
        | OutputType::LoadableModule
        | OutputType::Executable
        | OutputType::RustLibrary
        | OutputType::RustProcMacro => {
            let tool = toolchain.tool_for_target(target)?;
            let ctx = TargetSubstitutionCtx {
                settings,
                target,
                tool: Some(tool),
            };
            for pattern in tool.outputs() {
                let out = expand_for_target(pattern, &ctx)?;
                state.computed_outputs.push(OutputFile::new(out));
            }
            if state.computed_outputs.is_empty() {
                return Err(BuildError::internal(format!(
                    "tool {} produces no outputs for {}",
                    tool.kind().name(),
                    target.label()
                )));
            }
            let link = match tool.link_output() {
                Some(p) => OutputFile::new(expand_for_target(p, &ctx)?),
                None => state.computed_outputs[0].clone(),
            };
            let depend = match tool.depend_output() {
                Some(p) => OutputFile::new(expand_for_target(p, &ctx)?),
                None => state.computed_outputs[0].clone(),
            };
            state.link_output = Some(link);
            state.dependency_output = Some(DependencyOutput::File(depend));
        }
    }
    Ok(())
}

fn fill_recursive_hard_deps(graph: &TargetGraph, target: &Target, state: &mut ResolvedState) {
    for (pair, _is_public) in target.linked_deps() {
        let child = graph.target(pair.target);
        // Bundle data is data-only unless the consumer actually assembles a
        // bundle; it still reaches future create_bundle ancestors through
        // their own dep chains.
        if child.output_type() == OutputType::BundleData
            && target.output_type() != OutputType::CreateBundle
        {
            continue;
        }
        state.recursive_hard_deps.insert(pair.target);
        state
            .recursive_hard_deps
            .extend(child.recursive_hard_deps().iter().copied());
    }
}

fn fill_inherited_libraries(graph: &TargetGraph, target: &Target, state: &mut ResolvedState) {
    let libs = &mut state.inherited_libraries;
    for (pair, is_public) in target.linked_deps() {
        let child = graph.target(pair.target);
        match child.output_type() {
            OutputType::Group => {
                // Groups are transparent: their list flows through, the
                // group itself is not a library.
                libs.append_inherited(child.inherited_libraries(), is_public);
            }
            OutputType::SourceSet
            | OutputType::StaticLibrary
            | OutputType::SharedLibrary
            | OutputType::LoadableModule
            | OutputType::RustLibrary
            | OutputType::RustProcMacro => {
                libs.append(pair.target, is_public);
                // A proc macro is loaded by the compiler, not linked into
                // the consumer, so nothing behind it propagates.
                if !is_proc_macro(child) {
                    libs.append_inherited(child.inherited_libraries(), is_public);
                }
            }
            _ => {}
        }
    }
}

fn is_rust_crate_artifact(target: &Target) -> bool {
    target.is_rust_target()
        && target
            .rust_values()
            .inferred_crate_type(target.output_type())
            .map(|t| t.is_crate_artifact())
            .unwrap_or(false)
}

/// Proc-macro detection has to look at the crate type, not the target kind:
/// a rust_library with a `proc-macro` crate-type override is one too.
fn is_proc_macro(target: &Target) -> bool {
    target
        .rust_values()
        .inferred_crate_type(target.output_type())
        == Some(crate::rust_values::RustCrateType::ProcMacro)
}

/// Breadth-first closure for the Rust writer: direct crate dependencies
/// (with groups expanded transparently) seed the accessible set, then
/// `public_deps` edges of Rust crates extend it. Proc macros join the set
/// but are barriers. Groups walked along the way are recorded so the writer
/// can order-only depend on their phonies.
fn compute_rust_transitive_libs(graph: &TargetGraph, target: &Target) -> RustTransitiveLibs {
    let mut libs = RustTransitiveLibs::default();
    let mut seen: IndexSet<TargetIndex> = IndexSet::new();
    let mut groups_seen: IndexSet<TargetIndex> = IndexSet::new();
    let mut queue: VecDeque<TargetIndex> = VecDeque::new();

    for (pair, _is_public) in target.linked_deps() {
        expand_direct(
            graph,
            pair.target,
            &mut libs,
            &mut seen,
            &mut groups_seen,
            &mut queue,
        );
    }

    while let Some(idx) = queue.pop_front() {
        let crate_target = graph.target(idx);
        for pair in crate_target.public_deps() {
            expand_public(
                graph,
                pair.target,
                &mut libs,
                &mut seen,
                &mut groups_seen,
                &mut queue,
            );
        }
    }
    libs
}

fn expand_direct(
    graph: &TargetGraph,
    idx: TargetIndex,
    libs: &mut RustTransitiveLibs,
    seen: &mut IndexSet<TargetIndex>,
    groups_seen: &mut IndexSet<TargetIndex>,
    queue: &mut VecDeque<TargetIndex>,
) {
    let child = graph.target(idx);
    if child.output_type() == OutputType::Group {
        if groups_seen.insert(idx) {
            libs.walked_groups.push(idx);
            for (pair, _is_public) in child.linked_deps() {
                expand_direct(graph, pair.target, libs, seen, groups_seen, queue);
            }
        }
        return;
    }
    if is_rust_crate_artifact(child) && seen.insert(idx) {
        libs.direct.push(idx);
        libs.accessible.push(idx);
        if !is_proc_macro(child) {
            queue.push_back(idx);
        }
    }
}

fn expand_public(
    graph: &TargetGraph,
    idx: TargetIndex,
    libs: &mut RustTransitiveLibs,
    seen: &mut IndexSet<TargetIndex>,
    groups_seen: &mut IndexSet<TargetIndex>,
    queue: &mut VecDeque<TargetIndex>,
) {
    let child = graph.target(idx);
    if child.output_type() == OutputType::Group {
        if groups_seen.insert(idx) {
            libs.walked_groups.push(idx);
            for pair in child.public_deps() {
                expand_public(graph, pair.target, libs, seen, groups_seen, queue);
            }
        }
        return;
    }
    if is_rust_crate_artifact(child) && seen.insert(idx) {
        libs.accessible.push(idx);
        if !is_proc_macro(child) {
            queue.push_back(idx);
        }
    }
}
