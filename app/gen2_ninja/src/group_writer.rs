/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Groups emit one phony collapsing their members; users depend on it
//! order-only. A memberless group emits nothing at all.

use gen2_core::error::BuildError;
use gen2_core::output_file::OutputFile;

use crate::target_writer::write_phony_for_target;
use crate::target_writer::WriterCtx;

pub(crate) fn write_group(ctx: &WriterCtx<'_>, out: &mut String) -> Result<(), BuildError> {
    let target = ctx.target();
    if target.dependency_output().is_none() {
        return Ok(());
    }

    let mut files: Vec<OutputFile> = Vec::new();
    for (pair, _is_public) in target.linked_deps() {
        if let Some(dep) = ctx.graph.target(pair.target).dependency_output_file_or_phony() {
            files.push(dep.clone());
        }
    }
    let mut order_only: Vec<OutputFile> = Vec::new();
    for pair in target.data_deps() {
        if let Some(dep) = ctx.graph.target(pair.target).dependency_output_file_or_phony() {
            order_only.push(dep.clone());
        }
    }
    write_phony_for_target(ctx, &files, &order_only, out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use gen2_core::source_file::SourceFile;
    use gen2_core::source_file::SourceType;
    use gen2_node::graph::LabelTargetPair;
    use gen2_node::target::OutputType;
    use gen2_node::testing::TestSetup;

    use super::write_group;
    use crate::target_writer::WriterCtx;

    #[test]
    fn group_collapses_members_into_one_phony() {
        let mut setup = TestSetup::new();

        let mut lib = setup.target("//bar:mylib", OutputType::RustLibrary);
        let root = SourceFile::unchecked_new("//bar/lib.rs");
        lib.sources_mut().push(root.clone());
        lib.source_types_used_mut().set(SourceType::Rust);
        lib.rust_values_mut().set_crate_root(root);
        lib.rust_values_mut().set_crate_name("mylib");
        let lib = setup.add_target(lib);

        let mut group = setup.target("//baz:group", OutputType::Group);
        group
            .public_deps_mut()
            .push(LabelTargetPair::new(setup.graph.target(lib).label().clone(), lib));
        let group = setup.add_target(group);
        setup.resolve_ok();

        let ctx = WriterCtx::new(&setup.graph, &setup.settings, group).unwrap();
        let mut out = String::new();
        write_group(&ctx, &mut out).unwrap();
        assert_eq!(out, "build obj/baz/group.stamp: phony obj/bar/libmylib.rlib\n");
    }

    #[test]
    fn empty_group_emits_nothing() {
        let mut setup = TestSetup::new();
        let group = setup.target("//baz:empty", OutputType::Group);
        let group = setup.add_target(group);
        setup.resolve_ok();

        let ctx = WriterCtx::new(&setup.graph, &setup.settings, group).unwrap();
        let mut out = String::new();
        write_group(&ctx, &mut out).unwrap();
        assert_eq!(out, "");
    }
}
