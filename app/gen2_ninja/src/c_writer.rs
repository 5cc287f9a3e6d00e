/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The writer for C/C++ targets: shared compile variables, one build line
//! per translation unit, then the link (or the collapsing stamp for a
//! source set). The structure mirrors the Rust writer; the difference is
//! that every object file gets its own build line against the compiler
//! tools instead of one line against rustc.

use gen2_core::error::BuildError;
use gen2_core::output_file::OutputFile;
use gen2_node::config_values::LibFile;
use gen2_node::substitution::expand_for_source;
use gen2_node::substitution::TargetSubstitutionCtx;
use gen2_node::target::OutputType;
use indexmap::IndexSet;

use crate::target_writer::write_inputs_stamp_and_get_dep;
use crate::target_writer::write_list_var;
use crate::target_writer::write_phony_for_target;
use crate::target_writer::write_shared_vars;
use crate::target_writer::WriterCtx;

pub(crate) fn write_c_target(ctx: &WriterCtx<'_>, out: &mut String) -> Result<(), BuildError> {
    let target = ctx.target();
    let graph = ctx.graph;
    let path = ctx.path();
    let toolchain = ctx.toolchain();
    let is_source_set = target.output_type() == OutputType::SourceSet;
    let final_tool = if is_source_set {
        None
    } else {
        Some(toolchain.tool_for_target(target)?)
    };

    let inputs_dep = write_inputs_stamp_and_get_dep(ctx, out);

    // Shared compile variables; the compile rules reference these from the
    // enclosing file, which is exactly why each binary target gets a file
    // of its own.
    let cfg = target.config_values();
    let defines: Vec<String> = cfg.defines().iter().map(|d| format!("-D{}", d)).collect();
    write_list_var(out, "defines", &defines);
    let include_dirs: Vec<String> = cfg
        .include_dirs()
        .iter()
        .map(|d| format!("-I{}", ctx.settings.rebased_dir(d)))
        .collect();
    write_list_var(out, "include_dirs", &include_dirs);
    write_list_var(out, "cflags", cfg.cflags());
    if target.source_types_used().c_used() {
        write_list_var(out, "cflags_c", cfg.cflags_c());
    }
    if target.source_types_used().cpp_used() {
        write_list_var(out, "cflags_cc", cfg.cflags_cc());
    }
    write_shared_vars(ctx, final_tool, out);

    // One compile per translation unit.
    let mut objects: Vec<OutputFile> = Vec::new();
    for source in target.sources() {
        let Some(compiler) = toolchain.compiler_for_source(source.source_type()) else {
            continue;
        };
        let subctx = TargetSubstitutionCtx {
            settings: ctx.settings,
            target,
            tool: final_tool,
        };
        let mut source_objects: Vec<OutputFile> = Vec::new();
        for pattern in compiler.outputs() {
            source_objects.push(OutputFile::new(expand_for_source(pattern, &subctx, source)?));
        }
        out.push_str("build");
        path.files(out, &source_objects);
        out.push_str(": ");
        out.push_str(&ctx.rule_name(compiler.kind()));
        out.push(' ');
        path.source(out, source);
        if let Some(dep) = &inputs_dep {
            out.push_str(" || ");
            path.file(out, dep);
        }
        out.push('\n');
        objects.extend(source_objects);
    }

    if is_source_set {
        write_phony_for_target(ctx, &objects, &[], out);
        return Ok(());
    }

    let tool = final_tool.ok_or_else(|| {
        BuildError::internal(format!("{} has no final tool", target.label()))
    })?;

    // The link line: own objects, then objects from source sets, with
    // library dependencies implicit and groups order-only.
    let mut link_inputs = objects;
    let mut implicit: Vec<OutputFile> = Vec::new();
    let mut lib_paths: Vec<OutputFile> = Vec::new();
    let mut order_only: IndexSet<OutputFile> = IndexSet::new();
    if let Some(dep) = &inputs_dep {
        order_only.insert(dep.clone());
    }
    for (lib_idx, _is_public) in target.inherited_libraries().ordered() {
        let child = graph.target(lib_idx);
        match child.output_type() {
            OutputType::SourceSet => {
                link_inputs.extend(child.computed_outputs().iter().cloned());
                if let Some(stamp) = child.dependency_output_file_or_phony() {
                    order_only.insert(stamp.clone());
                }
            }
            OutputType::StaticLibrary
            | OutputType::SharedLibrary
            | OutputType::LoadableModule
            | OutputType::RustLibrary => {
                if let (Some(dep), Some(link)) =
                    (child.dependency_output_file_or_phony(), child.link_output())
                {
                    implicit.push(dep.clone());
                    lib_paths.push(link.clone());
                }
            }
            _ => {}
        }
    }
    for (pair, _is_public) in target.linked_deps() {
        let child = graph.target(pair.target);
        match child.output_type() {
            OutputType::Group
            | OutputType::Action
            | OutputType::ActionForeach
            | OutputType::Copy
            | OutputType::CreateBundle
            | OutputType::GeneratedFile
            | OutputType::Executable => {
                if let Some(dep) = child.dependency_output_file_or_phony() {
                    order_only.insert(dep.clone());
                }
            }
            _ => {}
        }
    }
    for pair in target.data_deps() {
        if let Some(dep) = graph.target(pair.target).dependency_output_file_or_phony() {
            order_only.insert(dep.clone());
        }
    }

    let output = target.link_output().ok_or_else(|| {
        BuildError::internal(format!("{} has no link output", target.label()))
    })?;
    out.push_str("build ");
    path.file(out, output);
    if let Some(toc) = target
        .computed_outputs()
        .iter()
        .find(|o| o.as_str() != output.as_str())
    {
        // Extra outputs of the link tool (the .TOC companion) share the
        // build line.
        out.push(' ');
        path.file(out, toc);
    }
    out.push_str(": ");
    out.push_str(&ctx.rule_name(tool.kind()));
    path.files(out, &link_inputs);
    if !implicit.is_empty() {
        out.push_str(" |");
        path.files(out, &implicit);
    }
    if !order_only.is_empty() {
        out.push_str(" ||");
        path.files(out, order_only.iter());
    }
    out.push('\n');

    out.push_str("  ");
    write_list_var(out, "ldflags", cfg.ldflags());

    out.push_str("  libs =");
    for lib in &lib_paths {
        out.push(' ');
        path.file(out, lib);
    }
    for dir in cfg.lib_dirs() {
        out.push_str(" -L");
        out.push_str(&gen2_core::escape::escape_ninja(&ctx.settings.rebased_dir(dir)));
    }
    for lib in cfg.libs() {
        match lib {
            LibFile::Name(name) => {
                out.push_str(" -l");
                out.push_str(name);
            }
            LibFile::Source(file) => {
                out.push(' ');
                path.source(out, file);
            }
        }
    }
    out.push('\n');

    Ok(())
}
