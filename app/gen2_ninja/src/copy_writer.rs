/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! One `copy` build line per source/output pair, plus the collapsing phony
//! when there is more than one pair.

use gen2_core::error::BuildError;
use gen2_node::toolchain::ToolKind;

use crate::target_writer::write_input_deps_phony_and_get_dep;
use crate::target_writer::write_phony_for_target;
use crate::target_writer::WriterCtx;

pub(crate) fn write_copy(ctx: &WriterCtx<'_>, out: &mut String) -> Result<(), BuildError> {
    let target = ctx.target();
    let path = ctx.path();

    let input_deps = write_input_deps_phony_and_get_dep(ctx, out, target.sources().len());

    let outputs = target.computed_outputs();
    for (source, output) in target.sources().iter().zip(outputs) {
        out.push_str("build ");
        path.file(out, output);
        out.push_str(": ");
        out.push_str(&ctx.rule_name(ToolKind::Copy));
        out.push(' ');
        path.source(out, source);
        if !input_deps.is_empty() {
            out.push_str(" ||");
            path.files(out, &input_deps);
        }
        out.push('\n');
    }

    write_phony_for_target(ctx, outputs, &[], out);
    Ok(())
}
