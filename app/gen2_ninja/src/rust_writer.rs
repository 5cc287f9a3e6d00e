/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The writer for Rust binaries and libraries.
//!
//! Everything rustc needs flows through four rule-local variables:
//! `externs` names the crates the target crate may reference in source,
//! `rustdeps` carries the library search paths and the link-time arguments
//! for native code, `ldflags` and `sources` are verbatim pass-throughs.
//! The routing rules live in the resolution-phase closures; this writer
//! only turns them into switches.

use gen2_core::error::BuildError;
use gen2_core::output_file::OutputFile;
use gen2_node::config_values::LibFile;
use gen2_node::substitution::target_substitution;
use gen2_node::substitution::Substitution;
use gen2_node::substitution::TargetSubstitutionCtx;
use gen2_node::target::OutputType;
use gen2_node::target::Target;
use indexmap::IndexSet;

use crate::target_writer::write_inputs_stamp_and_get_dep;
use crate::target_writer::write_list_var;
use crate::target_writer::write_shared_vars;
use crate::target_writer::write_var;
use crate::target_writer::WriterCtx;

fn is_crate_artifact(target: &Target) -> bool {
    target
        .rust_crate_type()
        .map(|t| t.is_crate_artifact())
        .unwrap_or(false)
}

pub(crate) fn write_rust_target(ctx: &WriterCtx<'_>, out: &mut String) -> Result<(), BuildError> {
    let target = ctx.target();
    let graph = ctx.graph;
    let path = ctx.path();
    let tool = ctx.toolchain().tool_for_target(target)?;
    let rust_tool = tool.as_rust().ok_or_else(|| {
        BuildError::internal(format!("{} selected a non-Rust tool", target.label()))
    })?;
    let crate_type = target.rust_crate_type().ok_or_else(|| {
        BuildError::internal(format!("{} reached the Rust writer without a crate type", target.label()))
    })?;
    let crate_root = target.rust_values().crate_root().ok_or_else(|| {
        BuildError::internal(format!("{} reached the Rust writer without a crate root", target.label()))
    })?;

    // The inputs stamp precedes everything else in the block.
    let inputs_dep = write_inputs_stamp_and_get_dep(ctx, out);

    let subctx = TargetSubstitutionCtx {
        settings: ctx.settings,
        target,
        tool: Some(tool),
    };
    write_var(out, "crate_name", &target.crate_name());
    write_var(out, "crate_type", crate_type.as_str());
    write_var(out, "output_extension", &target.resolved_output_extension(Some(tool)));
    write_var(
        out,
        "output_dir",
        &target_substitution(&subctx, Substitution::OutputDir).unwrap_or_default(),
    );
    write_list_var(out, "rustflags", target.config_values().rustflags());
    write_list_var(out, "rustenv", target.config_values().rustenv());
    write_shared_vars(ctx, Some(tool), out);

    let rust_libs = target.rust_transitive_libs();

    // Order-only inputs: the inputs stamp, phonies of groups the dependency
    // walk passed through, and outputs of non-linkable deps.
    let mut order_only: IndexSet<OutputFile> = IndexSet::new();
    if let Some(dep) = inputs_dep {
        order_only.insert(dep);
    }
    for group in &rust_libs.walked_groups {
        if let Some(stamp) = graph.target(*group).dependency_output_file_or_phony() {
            order_only.insert(stamp.clone());
        }
    }
    for (pair, _is_public) in target.linked_deps() {
        let child = graph.target(pair.target);
        match child.output_type() {
            OutputType::Action
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

    // Walk the inherited libraries: Rust crates contribute search
    // directories, source sets contribute their object files, native
    // libraries are linked by path.
    let mut ldep_dirs: IndexSet<String> = IndexSet::new();
    let mut extra_objects: Vec<OutputFile> = Vec::new();
    let mut native_libs: Vec<(OutputFile, OutputFile)> = Vec::new();
    for (lib_idx, _is_public) in target.inherited_libraries().ordered() {
        let child = graph.target(lib_idx);
        if is_crate_artifact(child) {
            if let Some(link) = child.link_output() {
                ldep_dirs.insert(link.dir().to_owned());
            }
            continue;
        }
        match child.output_type() {
            OutputType::SourceSet => {
                extra_objects.extend(child.computed_outputs().iter().cloned());
                if let Some(stamp) = child.dependency_output_file_or_phony() {
                    order_only.insert(stamp.clone());
                }
            }
            OutputType::StaticLibrary
            | OutputType::SharedLibrary
            | OutputType::LoadableModule => {
                if let (Some(dep), Some(link)) =
                    (child.dependency_output_file_or_phony(), child.link_output())
                {
                    native_libs.push((dep.clone(), link.clone()));
                }
            }
            _ => {}
        }
    }

    let mut lnative_dirs: IndexSet<String> = IndexSet::new();
    for obj in &extra_objects {
        lnative_dirs.insert(obj.dir().to_owned());
    }
    for (_dep, link) in &native_libs {
        lnative_dirs.insert(link.dir().to_owned());
    }

    // The build line. Implicit inputs are the sources, declared inputs,
    // source-set objects, direct crate outputs, file externs from configs,
    // then the native libraries a link will consume.
    let mut implicit: Vec<OutputFile> = Vec::new();
    for source in target.sources() {
        implicit.push(ctx.settings.output_file_for_source(source));
    }
    for input in target.config_values().inputs() {
        implicit.push(ctx.settings.output_file_for_source(input));
    }
    implicit.extend(extra_objects.iter().cloned());
    for dep in &rust_libs.direct {
        if let Some(out_file) = graph.target(*dep).dependency_output_file_or_phony() {
            implicit.push(out_file.clone());
        }
    }
    for (_name, lib) in target.config_values().externs() {
        if let Some(file) = lib.source_file() {
            implicit.push(ctx.settings.output_file_for_source(file));
        }
    }
    for (dep, _link) in &native_libs {
        implicit.push(dep.clone());
    }

    let output = target.link_output().ok_or_else(|| {
        BuildError::internal(format!("{} has no link output", target.label()))
    })?;
    out.push_str("build ");
    path.file(out, output);
    out.push_str(": ");
    out.push_str(&ctx.rule_name(rust_tool.rust_kind().tool_kind()));
    out.push(' ');
    path.source(out, crate_root);
    if !implicit.is_empty() {
        out.push_str(" |");
        path.files(out, &implicit);
    }
    if !order_only.is_empty() {
        out.push_str(" ||");
        path.files(out, order_only.iter());
    }
    out.push('\n');

    // externs: one `--extern name=path` per accessible crate, renames from
    // this target's alias map, then the file externs from configs.
    out.push_str("  externs =");
    for dep in &rust_libs.accessible {
        let child = graph.target(*dep);
        let name = match target.rust_values().aliased_deps().get(child.label()) {
            Some(renamed) => renamed.clone(),
            None => child.crate_name(),
        };
        if let Some(link) = child.link_output() {
            out.push_str(" --extern ");
            out.push_str(&name);
            out.push('=');
            path.file(out, link);
        }
    }
    for (name, lib) in target.config_values().externs() {
        out.push_str(" --extern ");
        out.push_str(name);
        out.push('=');
        match lib {
            LibFile::Source(file) => path.source(out, file),
            LibFile::Name(value) => out.push_str(&gen2_core::escape::escape_ninja(value)),
        }
    }
    out.push('\n');

    // rustdeps: `-Ldependency` per rust lib directory, `-Lnative` per
    // native directory and configured lib_dir, `-l`/path switches for
    // configured libs, then the explicit link arguments.
    out.push_str("  rustdeps =");
    for dir in &ldep_dirs {
        out.push_str(" -Ldependency=");
        out.push_str(&gen2_core::escape::escape_ninja(dir));
    }
    for dir in &lnative_dirs {
        out.push_str(" -Lnative=");
        out.push_str(&gen2_core::escape::escape_ninja(dir));
    }
    for dir in target.config_values().lib_dirs() {
        out.push_str(" -Lnative=");
        out.push_str(&gen2_core::escape::escape_ninja(&ctx.settings.rebased_dir(dir)));
    }
    for lib in target.config_values().libs() {
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
    if !extra_objects.is_empty() || !native_libs.is_empty() {
        // Bare library paths after this point; make sure the linker is back
        // in its default mode first.
        out.push_str(" -Clink-arg=-Bdynamic");
        for obj in &extra_objects {
            out.push_str(" -Clink-arg=");
            path.file(out, obj);
        }
        for (_dep, link) in &native_libs {
            out.push_str(" -Clink-arg=");
            path.file(out, link);
        }
    }
    out.push('\n');

    write_rule_list(out, "ldflags", target.config_values().ldflags());

    out.push_str("  sources =");
    path.sources(out, target.sources());
    path.sources(out, target.config_values().inputs());
    out.push('\n');

    Ok(())
}

fn write_rule_list(out: &mut String, name: &str, items: &[String]) {
    out.push_str("  ");
    write_list_var(out, name, items);
}

#[cfg(test)]
mod tests {
    use gen2_core::source_file::SourceDir;
    use gen2_core::source_file::SourceFile;
    use gen2_core::source_file::SourceType;
    use gen2_node::config_values::LibFile;
    use gen2_node::graph::LabelTargetPair;
    use gen2_node::graph::TargetIndex;
    use gen2_node::rust_values::RustCrateType;
    use gen2_node::target::OutputType;
    use gen2_node::target::Target;
    use gen2_node::testing::TestSetup;

    use super::write_rust_target;
    use crate::target_writer::WriterCtx;

    fn run_writer(setup: &TestSetup, idx: TargetIndex) -> String {
        let ctx = WriterCtx::new(&setup.graph, &setup.settings, idx).unwrap();
        let mut out = String::new();
        write_rust_target(&ctx, &mut out).unwrap();
        out
    }

    fn pair(setup: &TestSetup, idx: TargetIndex) -> LabelTargetPair {
        LabelTargetPair::new(setup.graph.target(idx).label().clone(), idx)
    }

    /// A Rust library whose crate root is `<dir>/lib.rs` and whose other
    /// source is `<dir>/<extra>`.
    fn rust_lib(setup: &TestSetup, label: &str, crate_name: &str, extra: &str) -> Target {
        let mut t = setup.target(label, OutputType::RustLibrary);
        let root = t.label().dir().join_file("lib.rs");
        let extra_file = t.label().dir().join_file(extra);
        t.sources_mut().push(extra_file);
        t.sources_mut().push(root.clone());
        t.source_types_used_mut().set(SourceType::Rust);
        t.rust_values_mut().set_crate_root(root);
        t.rust_values_mut().set_crate_name(crate_name);
        t
    }

    fn rust_bin(setup: &TestSetup, label: &str, crate_name: &str, extra: &str) -> Target {
        let mut t = setup.target(label, OutputType::Executable);
        let main = t.label().dir().join_file("main.rs");
        let extra_file = t.label().dir().join_file(extra);
        t.sources_mut().push(extra_file);
        t.sources_mut().push(main.clone());
        t.source_types_used_mut().set(SourceType::Rust);
        t.rust_values_mut().set_crate_root(main);
        t.rust_values_mut().set_crate_name(crate_name);
        t
    }

    #[test]
    fn rust_executable() {
        let mut setup = TestSetup::new();
        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "input3.rs");
        target
            .config_values_mut()
            .ldflags_mut()
            .push("-fsanitize=address".to_owned());
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/input3.rs \
             ../../foo/main.rs\n\
             \x20 externs =\n\
             \x20 rustdeps =\n\
             \x20 ldflags = -fsanitize=address\n\
             \x20 sources = ../../foo/input3.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    // Accessible dependencies appear as --extern switches so the target
    // crate can use them; everything else the compiler may need to load is
    // reachable through -Ldependency.
    #[test]
    fn rlib_deps() {
        let mut setup = TestSetup::new();

        let private_rlib =
            setup.add_target(rust_lib(&setup, "//baz:privatelib", "privatecrate", "privatelib.rs"));
        let far_public_rlib =
            setup.add_target(rust_lib(&setup, "//far:farlib", "farcrate", "farlib.rs"));
        let mut public_rlib = rust_lib(&setup, "//bar:publiclib", "publiccrate", "publiclib.rs");
        public_rlib.public_deps_mut().push(pair(&setup, far_public_rlib));
        let public_rlib = setup.add_target(public_rlib);

        let mut rlib = rust_lib(&setup, "//foo:direct", "direct", "direct.rs");
        // This library's crate root is //foo/main.rs, not the usual lib.rs.
        *rlib.sources_mut() = vec![
            SourceFile::unchecked_new("//foo/direct.rs"),
            SourceFile::unchecked_new("//foo/main.rs"),
        ];
        rlib.rust_values_mut()
            .set_crate_root(SourceFile::unchecked_new("//foo/main.rs"));
        rlib.public_deps_mut().push(pair(&setup, public_rlib));
        rlib.private_deps_mut().push(pair(&setup, private_rlib));
        let rlib = setup.add_target(rlib);

        let mut target = rust_bin(&setup, "//main:main", "main_crate", "source.rs");
        target.private_deps_mut().push(pair(&setup, rlib));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = publiccrate\n\
             crate_type = rlib\n\
             output_extension = .rlib\n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/bar\n\
             target_output_name = libpubliclib\n\
             \n\
             build obj/bar/libpubliclib.rlib: rust_rlib ../../bar/lib.rs | \
             ../../bar/publiclib.rs ../../bar/lib.rs obj/far/libfarlib.rlib\n\
             \x20 externs = --extern farcrate=obj/far/libfarlib.rlib\n\
             \x20 rustdeps = -Ldependency=obj/far\n\
             \x20 ldflags =\n\
             \x20 sources = ../../bar/publiclib.rs ../../bar/lib.rs\n";
        assert_eq!(expected, run_writer(&setup, public_rlib));

        let expected = "crate_name = main_crate\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/main\n\
             target_output_name = main\n\
             \n\
             build ./main_crate: rust_bin ../../main/main.rs | \
             ../../main/source.rs ../../main/main.rs obj/foo/libdirect.rlib\n\
             \x20 externs = --extern direct=obj/foo/libdirect.rlib \
             --extern publiccrate=obj/bar/libpubliclib.rlib \
             --extern farcrate=obj/far/libfarlib.rlib\n\
             \x20 rustdeps = -Ldependency=obj/foo -Ldependency=obj/bar \
             -Ldependency=obj/far -Ldependency=obj/baz\n\
             \x20 ldflags =\n\
             \x20 sources = ../../main/source.rs ../../main/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn dylib_deps() {
        let mut setup = TestSetup::new();

        let private_inside = setup.add_target(rust_lib(
            &setup,
            "//faz:private_inside",
            "private_inside",
            "private_inside.rs",
        ));
        let inside = setup.add_target(rust_lib(&setup, "//baz:inside", "inside", "inside.rs"));

        let mut dylib = setup.target("//bar:mylib", OutputType::SharedLibrary);
        let barlib = SourceFile::unchecked_new("//bar/lib.rs");
        dylib.sources_mut().push(SourceFile::unchecked_new("//bar/mylib.rs"));
        dylib.sources_mut().push(barlib.clone());
        dylib.source_types_used_mut().set(SourceType::Rust);
        dylib.rust_values_mut().set_crate_type(RustCrateType::Dylib);
        dylib.rust_values_mut().set_crate_root(barlib);
        dylib.rust_values_mut().set_crate_name("mylib");
        dylib.public_deps_mut().push(pair(&setup, inside));
        dylib.private_deps_mut().push(pair(&setup, private_inside));
        let dylib = setup.add_target(dylib);

        let mut another_dylib = setup.target("//foo:direct", OutputType::SharedLibrary);
        let lib = SourceFile::unchecked_new("//foo/main.rs");
        another_dylib
            .sources_mut()
            .push(SourceFile::unchecked_new("//foo/direct.rs"));
        another_dylib.sources_mut().push(lib.clone());
        another_dylib.source_types_used_mut().set(SourceType::Rust);
        another_dylib.rust_values_mut().set_crate_type(RustCrateType::Dylib);
        another_dylib.rust_values_mut().set_crate_root(lib);
        another_dylib.rust_values_mut().set_crate_name("direct");
        another_dylib.public_deps_mut().push(pair(&setup, dylib));
        let another_dylib = setup.add_target(another_dylib);

        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        target.private_deps_mut().push(pair(&setup, another_dylib));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = mylib\n\
             crate_type = dylib\n\
             output_extension = .so\n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/bar\n\
             target_output_name = libmylib\n\
             \n\
             build obj/bar/libmylib.so: rust_dylib ../../bar/lib.rs | \
             ../../bar/mylib.rs ../../bar/lib.rs \
             obj/baz/libinside.rlib obj/faz/libprivate_inside.rlib\n\
             \x20 externs = --extern inside=obj/baz/libinside.rlib \
             --extern private_inside=obj/faz/libprivate_inside.rlib\n\
             \x20 rustdeps = -Ldependency=obj/baz -Ldependency=obj/faz\n\
             \x20 ldflags =\n\
             \x20 sources = ../../bar/mylib.rs ../../bar/lib.rs\n";
        assert_eq!(expected, run_writer(&setup, dylib));

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/source.rs \
             ../../foo/main.rs obj/foo/libdirect.so\n\
             \x20 externs = --extern direct=obj/foo/libdirect.so \
             --extern mylib=obj/bar/libmylib.so \
             --extern inside=obj/baz/libinside.rlib\n\
             \x20 rustdeps = -Ldependency=obj/foo -Ldependency=obj/bar \
             -Ldependency=obj/baz -Ldependency=obj/faz\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn rlib_deps_across_groups() {
        let mut setup = TestSetup::new();

        let mut procmacro = setup.target("//bar:mymacro", OutputType::RustProcMacro);
        let barproc = SourceFile::unchecked_new("//bar/lib.rs");
        procmacro.sources_mut().push(SourceFile::unchecked_new("//bar/mylib.rs"));
        procmacro.sources_mut().push(barproc.clone());
        procmacro.source_types_used_mut().set(SourceType::Rust);
        procmacro.rust_values_mut().set_crate_root(barproc);
        procmacro.rust_values_mut().set_crate_name("mymacro");
        procmacro.rust_values_mut().set_crate_type(RustCrateType::ProcMacro);
        let procmacro = setup.add_target(procmacro);

        let mut group = setup.target("//baz:group", OutputType::Group);
        group.public_deps_mut().push(pair(&setup, procmacro));
        let group = setup.add_target(group);

        let mut rlib = rust_lib(&setup, "//bar:mylib", "mylib", "mylib.rs");
        rlib.public_deps_mut().push(pair(&setup, group));
        let rlib = setup.add_target(rlib);

        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        target.private_deps_mut().push(pair(&setup, rlib));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = mymacro\n\
             crate_type = proc-macro\n\
             output_extension = .so\n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/bar\n\
             target_output_name = libmymacro\n\
             \n\
             build obj/bar/libmymacro.so: rust_macro ../../bar/lib.rs | \
             ../../bar/mylib.rs ../../bar/lib.rs\n\
             \x20 externs =\n\
             \x20 rustdeps =\n\
             \x20 ldflags =\n\
             \x20 sources = ../../bar/mylib.rs ../../bar/lib.rs\n";
        assert_eq!(expected, run_writer(&setup, procmacro));

        let expected = "crate_name = mylib\n\
             crate_type = rlib\n\
             output_extension = .rlib\n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/bar\n\
             target_output_name = libmylib\n\
             \n\
             build obj/bar/libmylib.rlib: rust_rlib ../../bar/lib.rs | \
             ../../bar/mylib.rs ../../bar/lib.rs obj/bar/libmymacro.so || \
             obj/baz/group.stamp\n\
             \x20 externs = --extern mymacro=obj/bar/libmymacro.so\n\
             \x20 rustdeps = -Ldependency=obj/bar\n\
             \x20 ldflags =\n\
             \x20 sources = ../../bar/mylib.rs ../../bar/lib.rs\n";
        assert_eq!(expected, run_writer(&setup, rlib));

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | \
             ../../foo/source.rs ../../foo/main.rs obj/bar/libmylib.rlib || \
             obj/baz/group.stamp\n\
             \x20 externs = --extern mylib=obj/bar/libmylib.rlib \
             --extern mymacro=obj/bar/libmymacro.so\n\
             \x20 rustdeps = -Ldependency=obj/bar\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn renamed_deps() {
        let mut setup = TestSetup::new();

        let mut transitive = setup.target("//faz:transitive", OutputType::RustLibrary);
        let transitive_lib = SourceFile::unchecked_new("//faz/transitive/lib.rs");
        transitive
            .sources_mut()
            .push(SourceFile::unchecked_new("//faz/transitive/transitive.rs"));
        transitive.sources_mut().push(transitive_lib.clone());
        transitive.source_types_used_mut().set(SourceType::Rust);
        transitive.rust_values_mut().set_crate_root(transitive_lib);
        transitive.rust_values_mut().set_crate_name("transitive");
        let transitive = setup.add_target(transitive);

        let mut rlib = setup.target("//baz:mylib", OutputType::RustLibrary);
        let barlib = SourceFile::unchecked_new("//baz/bar/lib.rs");
        rlib.sources_mut()
            .push(SourceFile::unchecked_new("//baz/bar/mylib.rs"));
        rlib.sources_mut().push(barlib.clone());
        rlib.source_types_used_mut().set(SourceType::Rust);
        rlib.rust_values_mut().set_crate_root(barlib);
        rlib.rust_values_mut().set_crate_name("mylib");
        rlib.public_deps_mut().push(pair(&setup, transitive));
        let rlib = setup.add_target(rlib);

        let mut direct = setup.target("//bar:direct", OutputType::RustLibrary);
        let direct_lib = SourceFile::unchecked_new("//bar/direct/lib.rs");
        direct
            .sources_mut()
            .push(SourceFile::unchecked_new("//bar/direct/direct.rs"));
        direct.sources_mut().push(direct_lib.clone());
        direct.source_types_used_mut().set(SourceType::Rust);
        direct.rust_values_mut().set_crate_root(direct_lib);
        direct.rust_values_mut().set_crate_name("direct");
        let direct = setup.add_target(direct);

        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        let direct_label = setup.graph.target(direct).label().clone();
        let transitive_label = setup.graph.target(transitive).label().clone();
        target
            .rust_values_mut()
            .aliased_deps_mut()
            .insert(direct_label, "direct_renamed".to_owned());
        target
            .rust_values_mut()
            .aliased_deps_mut()
            .insert(transitive_label, "transitive_renamed".to_owned());
        target.private_deps_mut().push(pair(&setup, direct));
        target.private_deps_mut().push(pair(&setup, rlib));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/source.rs \
             ../../foo/main.rs obj/bar/libdirect.rlib obj/baz/libmylib.rlib\n\
             \x20 externs = --extern direct_renamed=obj/bar/libdirect.rlib \
             --extern mylib=obj/baz/libmylib.rlib \
             --extern transitive_renamed=obj/faz/libtransitive.rlib\n\
             \x20 rustdeps = -Ldependency=obj/bar -Ldependency=obj/baz \
             -Ldependency=obj/faz\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn non_rust_deps() {
        let mut setup = TestSetup::new();

        let mut staticlib = setup.target("//foo:static", OutputType::StaticLibrary);
        staticlib
            .sources_mut()
            .push(SourceFile::unchecked_new("//foo/static.cpp"));
        staticlib.source_types_used_mut().set(SourceType::Cpp);
        let staticlib = setup.add_target(staticlib);

        let rlib = setup.add_target(rust_lib(&setup, "//bar:mylib", "mylib", "mylib.rs"));

        let mut sharedlib = setup.target("//foo:shared", OutputType::SharedLibrary);
        sharedlib
            .sources_mut()
            .push(SourceFile::unchecked_new("//foo/static.cpp"));
        sharedlib.source_types_used_mut().set(SourceType::Cpp);
        let sharedlib = setup.add_target(sharedlib);

        let mut csourceset = setup.target("//baz:sourceset", OutputType::SourceSet);
        csourceset
            .sources_mut()
            .push(SourceFile::unchecked_new("//baz/csourceset.cpp"));
        csourceset.source_types_used_mut().set(SourceType::Cpp);
        let csourceset = setup.add_target(csourceset);

        let toc_toolchain = setup.add_toolchain_with_toc();
        let mut sharedlib_with_toc = setup.target("//foo:shared_with_toc", OutputType::SharedLibrary);
        sharedlib_with_toc.set_toolchain(toc_toolchain);
        sharedlib_with_toc
            .sources_mut()
            .push(SourceFile::unchecked_new("//foo/static.cpp"));
        sharedlib_with_toc.source_types_used_mut().set(SourceType::Cpp);
        let sharedlib_with_toc = setup.add_target(sharedlib_with_toc);

        let mut nonrust = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        nonrust.private_deps_mut().push(pair(&setup, rlib));
        nonrust.private_deps_mut().push(pair(&setup, staticlib));
        nonrust.private_deps_mut().push(pair(&setup, sharedlib));
        nonrust.private_deps_mut().push(pair(&setup, csourceset));
        nonrust.private_deps_mut().push(pair(&setup, sharedlib_with_toc));
        let nonrust = setup.add_target(nonrust);

        let mut rstaticlib = setup.target("//baz:baz", OutputType::StaticLibrary);
        let bazlib = SourceFile::unchecked_new("//baz/lib.rs");
        rstaticlib.sources_mut().push(bazlib.clone());
        rstaticlib.source_types_used_mut().set(SourceType::Rust);
        rstaticlib.rust_values_mut().set_crate_root(bazlib);
        rstaticlib.rust_values_mut().set_crate_name("baz");
        rstaticlib.private_deps_mut().push(pair(&setup, staticlib));
        let rstaticlib = setup.add_target(rstaticlib);

        setup.resolve_ok();

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/source.rs \
             ../../foo/main.rs obj/baz/sourceset.csourceset.o \
             obj/bar/libmylib.rlib \
             obj/foo/libstatic.a ./libshared.so ./libshared_with_toc.so.TOC \
             || obj/baz/sourceset.stamp\n\
             \x20 externs = --extern mylib=obj/bar/libmylib.rlib\n\
             \x20 rustdeps = -Ldependency=obj/bar \
             -Lnative=obj/baz -Lnative=obj/foo -Lnative=. \
             -Clink-arg=-Bdynamic -Clink-arg=obj/baz/sourceset.csourceset.o \
             -Clink-arg=obj/foo/libstatic.a -Clink-arg=./libshared.so \
             -Clink-arg=./libshared_with_toc.so\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, nonrust));

        let expected = "crate_name = baz\n\
             crate_type = staticlib\n\
             output_extension = .a\n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/baz\n\
             target_output_name = libbaz\n\
             \n\
             build obj/baz/libbaz.a: rust_staticlib ../../baz/lib.rs | \
             ../../baz/lib.rs \
             obj/foo/libstatic.a\n\
             \x20 externs =\n\
             \x20 rustdeps = -Lnative=obj/foo -Clink-arg=-Bdynamic \
             -Clink-arg=obj/foo/libstatic.a\n\
             \x20 ldflags =\n\
             \x20 sources = ../../baz/lib.rs\n";
        assert_eq!(expected, run_writer(&setup, rstaticlib));
    }

    // The same binary with only a bare static library behind it: nothing is
    // accessible as an extern, the library arrives purely through the
    // native search path and link arguments.
    #[test]
    fn non_rust_deps_only() {
        let mut setup = TestSetup::new();

        let mut staticlib = setup.target("//foo:static", OutputType::StaticLibrary);
        staticlib
            .sources_mut()
            .push(SourceFile::unchecked_new("//foo/static.cpp"));
        staticlib.source_types_used_mut().set(SourceType::Cpp);
        let staticlib = setup.add_target(staticlib);

        let mut nonrust_only = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        nonrust_only.private_deps_mut().push(pair(&setup, staticlib));
        let nonrust_only = setup.add_target(nonrust_only);
        setup.resolve_ok();

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/source.rs \
             ../../foo/main.rs obj/foo/libstatic.a\n\
             \x20 externs =\n\
             \x20 rustdeps = -Lnative=obj/foo -Clink-arg=-Bdynamic \
             -Clink-arg=obj/foo/libstatic.a\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, nonrust_only));
    }

    #[test]
    fn rust_output_extension_and_dir() {
        let mut setup = TestSetup::new();
        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "input3.rs");
        target.set_output_extension("exe");
        target.set_output_dir(SourceDir::unchecked_new("//out/Debug/foo/"));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = .exe\n\
             output_dir = foo\n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar.exe: rust_bin ../../foo/main.rs | ../../foo/input3.rs \
             ../../foo/main.rs\n\
             \x20 externs =\n\
             \x20 rustdeps =\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/input3.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn libs_and_lib_dirs() {
        let mut setup = TestSetup::new();
        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "input.rs");
        target.set_output_dir(SourceDir::unchecked_new("//out/Debug/foo/"));
        target
            .config_values_mut()
            .libs_mut()
            .push(LibFile::Name("quux".to_owned()));
        target
            .config_values_mut()
            .lib_dirs_mut()
            .push(SourceDir::unchecked_new("//baz/"));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = foo\n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/input.rs \
             ../../foo/main.rs\n\
             \x20 externs =\n\
             \x20 rustdeps = -Lnative=../../baz -lquux\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/input.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    // Neither public nor private rust dependencies of a proc macro are
    // acquired by its users; the macro itself still is.
    #[test]
    fn rust_proc_macro() {
        let mut setup = TestSetup::new();

        let publicdep = setup.add_target(rust_lib(
            &setup,
            "//baz/public:mymacropublicdep",
            "publicdep",
            "mylib.rs",
        ));
        let privatedep = setup.add_target(rust_lib(
            &setup,
            "//baz/private:mymacroprivatedep",
            "privatedep",
            "mylib.rs",
        ));

        let mut procmacro = setup.target("//bar:mymacro", OutputType::RustProcMacro);
        let barlib = SourceFile::unchecked_new("//bar/lib.rs");
        procmacro.sources_mut().push(SourceFile::unchecked_new("//bar/mylib.rs"));
        procmacro.sources_mut().push(barlib.clone());
        procmacro.source_types_used_mut().set(SourceType::Rust);
        procmacro.rust_values_mut().set_crate_root(barlib);
        procmacro.rust_values_mut().set_crate_name("mymacro");
        procmacro.rust_values_mut().set_crate_type(RustCrateType::ProcMacro);
        procmacro.public_deps_mut().push(pair(&setup, publicdep));
        procmacro.private_deps_mut().push(pair(&setup, privatedep));
        let procmacro = setup.add_target(procmacro);

        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        target.private_deps_mut().push(pair(&setup, procmacro));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = mymacro\n\
             crate_type = proc-macro\n\
             output_extension = .so\n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/bar\n\
             target_output_name = libmymacro\n\
             \n\
             build obj/bar/libmymacro.so: rust_macro ../../bar/lib.rs | \
             ../../bar/mylib.rs ../../bar/lib.rs \
             obj/baz/public/libmymacropublicdep.rlib \
             obj/baz/private/libmymacroprivatedep.rlib\n\
             \x20 externs = \
             --extern publicdep=obj/baz/public/libmymacropublicdep.rlib \
             --extern privatedep=obj/baz/private/libmymacroprivatedep.rlib\n\
             \x20 rustdeps = -Ldependency=obj/baz/public \
             -Ldependency=obj/baz/private\n\
             \x20 ldflags =\n\
             \x20 sources = ../../bar/mylib.rs ../../bar/lib.rs\n";
        assert_eq!(expected, run_writer(&setup, procmacro));

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/source.rs \
             ../../foo/main.rs obj/bar/libmymacro.so\n\
             \x20 externs = --extern mymacro=obj/bar/libmymacro.so\n\
             \x20 rustdeps = -Ldependency=obj/bar\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn group_deps() {
        let mut setup = TestSetup::new();

        let rlib = setup.add_target(rust_lib(&setup, "//bar:mylib", "mylib", "mylib.rs"));
        let mut group = setup.target("//baz:group", OutputType::Group);
        group.public_deps_mut().push(pair(&setup, rlib));
        let group = setup.add_target(group);

        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        target.private_deps_mut().push(pair(&setup, group));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/source.rs \
             ../../foo/main.rs obj/bar/libmylib.rlib || obj/baz/group.stamp\n\
             \x20 externs = --extern mylib=obj/bar/libmylib.rlib\n\
             \x20 rustdeps = -Ldependency=obj/bar\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn config_externs() {
        let mut setup = TestSetup::new();
        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        target.config_values_mut().externs_mut().push((
            "lib1".to_owned(),
            LibFile::Source(SourceFile::unchecked_new("//foo/lib1.rlib")),
        ));
        target
            .config_values_mut()
            .externs_mut()
            .push(("lib2".to_owned(), LibFile::Name("lib2.rlib".to_owned())));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/source.rs \
             ../../foo/main.rs ../../foo/lib1.rlib\n\
             \x20 externs = --extern lib1=../../foo/lib1.rlib --extern \
             lib2=lib2.rlib\n\
             \x20 rustdeps =\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn inputs_make_a_stamp() {
        let mut setup = TestSetup::new();
        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        target
            .config_values_mut()
            .inputs_mut()
            .push(SourceFile::unchecked_new("//foo/config.json"));
        target
            .config_values_mut()
            .inputs_mut()
            .push(SourceFile::unchecked_new("//foo/template.h"));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "build obj/foo/bar.inputs.stamp: stamp ../../foo/config.json \
             ../../foo/template.h\n\
             crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/source.rs \
             ../../foo/main.rs ../../foo/config.json ../../foo/template.h \
             || obj/foo/bar.inputs.stamp\n\
             \x20 externs =\n\
             \x20 rustdeps =\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs \
             ../../foo/config.json ../../foo/template.h\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn cdylib_deps() {
        let mut setup = TestSetup::new();

        let mut cdylib = setup.target("//bar:mylib", OutputType::SharedLibrary);
        let barlib = SourceFile::unchecked_new("//bar/lib.rs");
        cdylib.sources_mut().push(barlib.clone());
        cdylib.source_types_used_mut().set(SourceType::Rust);
        cdylib.rust_values_mut().set_crate_type(RustCrateType::Cdylib);
        cdylib.rust_values_mut().set_crate_root(barlib);
        cdylib.rust_values_mut().set_crate_name("mylib");
        let cdylib = setup.add_target(cdylib);

        let mut target = rust_bin(&setup, "//foo:bar", "foo_bar", "source.rs");
        target.private_deps_mut().push(pair(&setup, cdylib));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = mylib\n\
             crate_type = cdylib\n\
             output_extension = .so\n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/bar\n\
             target_output_name = libmylib\n\
             \n\
             build obj/bar/libmylib.so: rust_cdylib ../../bar/lib.rs | \
             ../../bar/lib.rs\n\
             \x20 externs =\n\
             \x20 rustdeps =\n\
             \x20 ldflags =\n\
             \x20 sources = ../../bar/lib.rs\n";
        assert_eq!(expected, run_writer(&setup, cdylib));

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/source.rs \
             ../../foo/main.rs obj/bar/libmylib.so\n\
             \x20 externs =\n\
             \x20 rustdeps = -Lnative=obj/bar -Clink-arg=-Bdynamic \
             -Clink-arg=obj/bar/libmylib.so\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/source.rs ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }

    #[test]
    fn transitive_public_non_rust_deps() {
        let mut setup = TestSetup::new();

        let mut implicitlib = setup.target("//foo:implicit", OutputType::SharedLibrary);
        implicitlib
            .sources_mut()
            .push(SourceFile::unchecked_new("//foo/implicit.cpp"));
        implicitlib.source_types_used_mut().set(SourceType::Cpp);
        let implicitlib = setup.add_target(implicitlib);

        let mut sharedlib = setup.target("//foo:shared", OutputType::SharedLibrary);
        sharedlib
            .sources_mut()
            .push(SourceFile::unchecked_new("//foo/shared.cpp"));
        sharedlib.source_types_used_mut().set(SourceType::Cpp);
        sharedlib.public_deps_mut().push(pair(&setup, implicitlib));
        let sharedlib = setup.add_target(sharedlib);

        let mut rlib = rust_lib(&setup, "//bar:mylib", "mylib", "mylib.rs");
        rlib.private_deps_mut().push(pair(&setup, sharedlib));
        let rlib = setup.add_target(rlib);

        let mut target = setup.target("//foo:bar", OutputType::Executable);
        let main = SourceFile::unchecked_new("//foo/main.rs");
        target.sources_mut().push(main.clone());
        target.source_types_used_mut().set(SourceType::Rust);
        target.rust_values_mut().set_crate_root(main);
        target.rust_values_mut().set_crate_name("foo_bar");
        target.private_deps_mut().push(pair(&setup, rlib));
        let target = setup.add_target(target);
        setup.resolve_ok();

        let expected = "crate_name = foo_bar\n\
             crate_type = bin\n\
             output_extension = \n\
             output_dir = \n\
             rustflags =\n\
             rustenv =\n\
             root_out_dir = .\n\
             target_out_dir = obj/foo\n\
             target_output_name = bar\n\
             \n\
             build ./foo_bar: rust_bin ../../foo/main.rs | ../../foo/main.rs \
             obj/bar/libmylib.rlib ./libshared.so ./libimplicit.so\n\
             \x20 externs = --extern mylib=obj/bar/libmylib.rlib\n\
             \x20 rustdeps = -Ldependency=obj/bar -Lnative=. -Clink-arg=-Bdynamic \
             -Clink-arg=./libshared.so -Clink-arg=./libimplicit.so\n\
             \x20 ldflags =\n\
             \x20 sources = ../../foo/main.rs\n";
        assert_eq!(expected, run_writer(&setup, target));
    }
}
