/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The writer front door and the pieces every per-kind writer shares:
//! the shared variable block, input-dep collapsing (with single-user phony
//! elision), and the per-target phony.

use gen2_core::build_settings::BuildSettings;
use gen2_core::error::BuildError;
use gen2_core::escape::escape_ninja;
use gen2_core::output_file::OutputFile;
use gen2_core::source_file::SourceFile;
use gen2_node::graph::TargetGraph;
use gen2_node::graph::TargetIndex;
use gen2_node::graph::ToolchainIndex;
use gen2_node::substitution::target_substitution;
use gen2_node::substitution::TargetSubstitutionCtx;
use gen2_node::substitution::SHARED_VAR_ORDER;
use gen2_node::target::OutputType;
use gen2_node::target::Target;
use gen2_node::toolchain::Tool;
use gen2_node::toolchain::ToolKind;
use gen2_node::toolchain::Toolchain;
use gen2_node::toolchain::PHONY_RULE;

use crate::action_writer;
use crate::bundle_writer;
use crate::c_writer;
use crate::copy_writer;
use crate::generated_file_writer;
use crate::group_writer;
use crate::path_output::PathOutput;
use crate::rust_writer;
use crate::string_output_buffer::StringOutputBuffer;
use crate::trace::TraceCollector;
use crate::trace::TraceKind;

pub struct WriterCtx<'a> {
    pub graph: &'a TargetGraph,
    pub settings: &'a BuildSettings,
    pub target_idx: TargetIndex,
    toolchain_idx: ToolchainIndex,
}

impl<'a> WriterCtx<'a> {
    pub fn new(
        graph: &'a TargetGraph,
        settings: &'a BuildSettings,
        target_idx: TargetIndex,
    ) -> Result<WriterCtx<'a>, BuildError> {
        let target = graph.target(target_idx);
        let toolchain_idx = target.toolchain().ok_or_else(|| {
            BuildError::internal(format!(
                "target {} reached emission without a toolchain",
                target.label()
            ))
        })?;
        Ok(WriterCtx {
            graph,
            settings,
            target_idx,
            toolchain_idx,
        })
    }

    pub fn target(&self) -> &'a Target {
        self.graph.target(self.target_idx)
    }

    pub fn toolchain(&self) -> &'a Toolchain {
        self.graph.toolchain(self.toolchain_idx)
    }

    pub fn path(&self) -> PathOutput<'a> {
        PathOutput::new(self.settings)
    }

    /// Rule names are global to the whole build, so non-default toolchains
    /// prefix theirs.
    pub fn rule_prefix(&self) -> String {
        match self.graph.default_toolchain() {
            Some(default) if default == self.toolchain_idx => String::new(),
            _ => format!("{}_", self.toolchain().label().name()),
        }
    }

    pub fn rule_name(&self, kind: ToolKind) -> String {
        format!("{}{}", self.rule_prefix(), kind.name())
    }
}

/// Produces the rules for one resolved target. Binary targets are written to
/// their own sub-file (through write-if-changed) and a `subninja` directive
/// is returned; for the rest the rules themselves are returned, to be
/// coalesced into the toolchain's aggregate file.
pub fn run_and_write_target(
    graph: &TargetGraph,
    settings: &BuildSettings,
    idx: TargetIndex,
    trace: &TraceCollector,
) -> Result<String, BuildError> {
    let ctx = WriterCtx::new(graph, settings, idx)?;
    let target = ctx.target();
    let _trace = trace.scoped(TraceKind::TargetWrite, target.label().user_visible_name(true));
    tracing::debug!(label = %target.label(), "computing rules");

    let mut rules = String::new();
    match target.output_type() {
        OutputType::BundleData => bundle_writer::write_bundle_data(&ctx, &mut rules)?,
        OutputType::CreateBundle => bundle_writer::write_create_bundle(&ctx, &mut rules)?,
        OutputType::Copy => copy_writer::write_copy(&ctx, &mut rules)?,
        OutputType::Action | OutputType::ActionForeach => {
            action_writer::write_action(&ctx, &mut rules)?
        }
        OutputType::Group => group_writer::write_group(&ctx, &mut rules)?,
        OutputType::GeneratedFile => generated_file_writer::write_generated_file(&ctx, &mut rules)?,
        _ => {
            if target.is_rust_target() {
                rust_writer::write_rust_target(&ctx, &mut rules)?;
            } else {
                c_writer::write_c_target(&ctx, &mut rules)?;
            }
            let ninja_file = settings.ninja_file_for_target(target.label());
            let full_path = settings.full_path_for_output(&ninja_file);
            let buffer = StringOutputBuffer::from_string(rules);
            {
                let _write = trace.scoped(TraceKind::FileWrite, ninja_file.as_str().to_owned());
                buffer.write_to_file_if_changed(&full_path)?;
            }
            return Ok(format!("subninja {}\n", escape_ninja(ninja_file.as_str())));
        }
    }
    Ok(rules)
}

/// `name = value`, with the value escaped. An empty value leaves the
/// trailing space after `=`.
pub(crate) fn write_var(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(" = ");
    out.push_str(&escape_ninja(value));
    out.push('\n');
}

/// `name =` followed by one ` item` per entry; flag items are emitted
/// verbatim, separators are what distinguish them.
pub(crate) fn write_list_var<'b>(
    out: &mut String,
    name: &str,
    items: impl IntoIterator<Item = &'b String>,
) {
    out.push_str(name);
    out.push_str(" =");
    for item in items {
        out.push(' ');
        out.push_str(item);
    }
    out.push('\n');
}

/// The block of shared variables a target's rules reference, restricted to
/// the ones this toolchain's tools actually use, followed by a blank line
/// when anything was written.
pub(crate) fn write_shared_vars(ctx: &WriterCtx<'_>, tool: Option<&Tool>, out: &mut String) {
    let bits = ctx.toolchain().substitution_bits();
    let subctx = TargetSubstitutionCtx {
        settings: ctx.settings,
        target: ctx.target(),
        tool,
    };
    let mut written_anything = false;
    for sub in SHARED_VAR_ORDER {
        if !bits.contains(*sub) {
            continue;
        }
        if let Some(value) = target_substitution(&subctx, *sub) {
            write_var(out, sub.canonical_name(), &value);
            written_anything = true;
        }
    }
    if written_anything {
        out.push('\n');
    }
}

/// For binary targets: collapses declared `inputs` into a single dependency.
/// No inputs yields nothing, one input is used directly, several get a
/// `.inputs.stamp` emitted before the main build line.
pub(crate) fn write_inputs_stamp_and_get_dep(
    ctx: &WriterCtx<'_>,
    out: &mut String,
) -> Option<OutputFile> {
    let target = ctx.target();
    let inputs = target.config_values().inputs().as_slice();
    match inputs {
        [] => None,
        [single] => Some(ctx.settings.output_file_for_source(single)),
        inputs => {
            let stamp = OutputFile::new(format!(
                "{}/{}.inputs.stamp",
                ctx.settings.target_out_dir(target.label()),
                target.label().name()
            ));
            out.push_str("build ");
            ctx.path().file(out, &stamp);
            out.push_str(": ");
            out.push_str(&ctx.rule_name(ToolKind::Stamp));
            ctx.path().sources(out, inputs);
            out.push('\n');
            Some(stamp)
        }
    }
}

/// For non-binary targets: collapses input files and hard target deps into
/// the dependency list for a build line. With zero entries nothing is
/// written; a single entry is returned directly; several entries get a
/// `.inputdeps` phony, unless the caller uses the result only once, in
/// which case the phony would have a single user and is elided.
pub(crate) fn write_input_deps_phony_and_get_dep(
    ctx: &WriterCtx<'_>,
    out: &mut String,
    num_output_uses: usize,
) -> Vec<OutputFile> {
    let target = ctx.target();

    let mut input_deps_sources: Vec<&SourceFile> = Vec::new();
    if matches!(
        target.output_type(),
        OutputType::Action | OutputType::ActionForeach
    ) {
        if let Some(script) = target.action_values().script() {
            input_deps_sources.push(script);
        }
    }
    if !target.output_type().is_binary() {
        input_deps_sources.extend(target.config_values().inputs());
    }
    // For a plain action the sources are inputs too; action_foreach handles
    // its sources one build line at a time instead.
    if target.output_type() == OutputType::Action {
        input_deps_sources.extend(target.sources());
    }

    let mut input_deps_targets: Vec<TargetIndex> = Vec::new();
    for dep in target.recursive_hard_deps() {
        let dep_target = ctx.graph.target(*dep);
        if dep_target.output_type() != OutputType::BundleData
            || target.output_type() == OutputType::CreateBundle
        {
            input_deps_targets.push(*dep);
        }
    }
    for pair in ctx.toolchain().deps() {
        input_deps_targets.push(pair.target);
    }

    if input_deps_sources.is_empty() && input_deps_targets.is_empty() {
        return Vec::new();
    }
    if input_deps_sources.len() == 1 && input_deps_targets.is_empty() {
        return vec![ctx.settings.output_file_for_source(input_deps_sources[0])];
    }
    if input_deps_sources.is_empty() && input_deps_targets.len() == 1 {
        return match ctx
            .graph
            .target(input_deps_targets[0])
            .dependency_output_file_or_phony()
        {
            Some(dep) => vec![dep.clone()],
            None => Vec::new(),
        };
    }

    let mut outs: Vec<OutputFile> = input_deps_sources
        .iter()
        .map(|s| ctx.settings.output_file_for_source(s))
        .collect();
    // Sort by label so the output is deterministic regardless of how the
    // hard-dep set was accumulated.
    input_deps_targets.sort_by(|a, b| {
        ctx.graph
            .target(*a)
            .label()
            .cmp(ctx.graph.target(*b).label())
    });
    input_deps_targets.dedup();
    for dep in input_deps_targets {
        if let Some(out_file) = ctx.graph.target(dep).dependency_output_file_or_phony() {
            outs.push(out_file.clone());
        }
    }

    // A phony referenced once would only add a line; depend directly.
    if num_output_uses == 1 {
        return outs;
    }

    let phony = OutputFile::new(format!(
        "{}/{}.inputdeps",
        ctx.settings.target_out_dir(target.label()),
        target.label().name()
    ));
    out.push_str("build ");
    ctx.path().file(out, &phony);
    out.push_str(": ");
    out.push_str(PHONY_RULE);
    ctx.path().files(out, &outs);
    out.push('\n');
    vec![phony]
}

/// The phony collapsing a multi-output target into the single name
/// dependents use. Nothing is emitted for targets whose dependency output
/// is a real file (or `None`).
pub(crate) fn write_phony_for_target(
    ctx: &WriterCtx<'_>,
    files: &[OutputFile],
    order_only: &[OutputFile],
    out: &mut String,
) {
    let target = ctx.target();
    let phony = match target.dependency_output() {
        Some(dep) if dep.is_phony() => dep.file(),
        _ => return,
    };
    out.push_str("build ");
    ctx.path().file(out, phony);
    out.push_str(": ");
    out.push_str(PHONY_RULE);
    ctx.path().files(out, files);
    if !order_only.is_empty() {
        out.push_str(" ||");
        ctx.path().files(out, order_only);
    }
    out.push('\n');
}
