/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! generated_file targets are evaluated at generation time: the declared
//! contents, or a metadata walk over the dependencies, are serialized and
//! written through write-if-changed. What remains for the build file is a
//! group-like phony so dependents order correctly.

use gen2_core::error::BuildError;
use gen2_core::output_file::OutputFile;
use gen2_node::metadata::walk_metadata;
use gen2_node::metadata::Value;
use gen2_node::target::OutputConversion;
use itertools::Itertools;

use crate::string_output_buffer::StringOutputBuffer;
use crate::target_writer::write_phony_for_target;
use crate::target_writer::WriterCtx;

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
    }
}

fn value_to_line(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::List(_) => value_to_json(value).to_string(),
    }
}

fn render(values: &[Value], conversion: OutputConversion) -> String {
    match conversion {
        OutputConversion::ListLines => {
            let mut out = values.iter().map(value_to_line).join("\n");
            if !out.is_empty() {
                out.push('\n');
            }
            out
        }
        OutputConversion::Json => {
            let json = serde_json::Value::Array(values.iter().map(value_to_json).collect());
            let mut out = serde_json::to_string_pretty(&json).unwrap_or_default();
            out.push('\n');
            out
        }
    }
}

pub(crate) fn write_generated_file(
    ctx: &WriterCtx<'_>,
    out: &mut String,
) -> Result<(), BuildError> {
    let target = ctx.target();
    let graph = ctx.graph;

    let values: Vec<Value> = if !target.data_keys().is_empty() {
        let roots: Vec<_> = target.linked_deps().map(|(pair, _)| pair.target).collect();
        let (values, _walked) = walk_metadata(
            graph,
            &roots,
            target.data_keys(),
            target.walk_keys(),
            target.rebase(),
        )?;
        values
    } else {
        match target.contents() {
            Some(Value::List(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => {
                return Err(BuildError::user(format!(
                    "generated_file {} needs either contents or data_keys",
                    target.label()
                )));
            }
        }
    };

    let output = target.computed_outputs().first().ok_or_else(|| {
        BuildError::internal(format!("generated_file {} has no output", target.label()))
    })?;
    let buffer = StringOutputBuffer::from_string(render(&values, target.output_conversion()));
    buffer.write_to_file_if_changed(&ctx.settings.full_path_for_output(output))?;

    let mut files: Vec<OutputFile> = Vec::new();
    for (pair, _is_public) in target.linked_deps() {
        if let Some(dep) = graph.target(pair.target).dependency_output_file_or_phony() {
            files.push(dep.clone());
        }
    }
    write_phony_for_target(ctx, &files, &[], out);
    Ok(())
}
