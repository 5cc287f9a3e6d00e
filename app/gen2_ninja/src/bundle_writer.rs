/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Bundle assembly. A bundle_data target is only a plan: its phony names
//! the files that will land in a bundle. The consuming create_bundle target
//! turns every reachable plan into copy steps under its bundle directory
//! and collapses them behind its own phony.

use gen2_core::error::BuildError;
use gen2_core::output_file::OutputFile;
use gen2_node::graph::TargetIndex;
use gen2_node::target::OutputType;
use gen2_node::toolchain::ToolKind;

use crate::target_writer::write_phony_for_target;
use crate::target_writer::WriterCtx;

pub(crate) fn write_bundle_data(ctx: &WriterCtx<'_>, out: &mut String) -> Result<(), BuildError> {
    let target = ctx.target();
    let mut files: Vec<OutputFile> = target
        .sources()
        .iter()
        .map(|s| ctx.settings.output_file_for_source(s))
        .collect();
    for (pair, _is_public) in target.linked_deps() {
        if let Some(dep) = ctx.graph.target(pair.target).dependency_output_file_or_phony() {
            files.push(dep.clone());
        }
    }
    write_phony_for_target(ctx, &files, &[], out);
    Ok(())
}

pub(crate) fn write_create_bundle(ctx: &WriterCtx<'_>, out: &mut String) -> Result<(), BuildError> {
    let target = ctx.target();
    let path = ctx.path();
    let bundle_dir = format!(
        "{}/{}.bundle",
        ctx.settings.target_out_dir(target.label()),
        target.label().name()
    );

    // Every transitively reachable bundle_data contributes its files, in
    // label order for determinism.
    let mut data_targets: Vec<TargetIndex> = target
        .recursive_hard_deps()
        .iter()
        .copied()
        .filter(|idx| ctx.graph.target(*idx).output_type() == OutputType::BundleData)
        .collect();
    data_targets.sort_by(|a, b| {
        ctx.graph
            .target(*a)
            .label()
            .cmp(ctx.graph.target(*b).label())
    });

    let mut copies: Vec<OutputFile> = Vec::new();
    for idx in data_targets {
        let data = ctx.graph.target(idx);
        for source in data.sources() {
            let dest = OutputFile::new(format!("{}/{}", bundle_dir, source.file_name()));
            out.push_str("build ");
            path.file(out, &dest);
            out.push_str(": ");
            out.push_str(&ctx.rule_name(ToolKind::Copy));
            out.push(' ');
            path.source(out, source);
            out.push('\n');
            copies.push(dest);
        }
    }

    // Non-bundle deps only order the phony; they contribute no files.
    let mut order_only: Vec<OutputFile> = Vec::new();
    for (pair, _is_public) in target.linked_deps() {
        let child = ctx.graph.target(pair.target);
        if child.output_type() == OutputType::BundleData {
            continue;
        }
        if let Some(dep) = child.dependency_output_file_or_phony() {
            order_only.push(dep.clone());
        }
    }

    write_phony_for_target(ctx, &copies, &order_only, out);
    Ok(())
}
