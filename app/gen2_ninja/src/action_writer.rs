/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Actions get a target-unique rule whose command is the script plus its
//! arguments. A plain action runs once; action_foreach runs the rule per
//! source, with the per-source placeholders left as rule variables and
//! bound on each build line.

use gen2_core::error::BuildError;
use gen2_core::output_file::OutputFile;
use gen2_core::source_file::SourceFile;
use gen2_node::substitution::expand_for_source;
use gen2_node::substitution::target_substitution;
use gen2_node::substitution::Segment;
use gen2_node::substitution::Substitution;
use gen2_node::substitution::SubstitutionPattern;
use gen2_node::substitution::TargetSubstitutionCtx;
use gen2_node::target::OutputType;
use indexmap::IndexSet;

use crate::target_writer::write_input_deps_phony_and_get_dep;
use crate::target_writer::write_phony_for_target;
use crate::target_writer::WriterCtx;

/// Build-wide unique rule name for one action target.
fn action_rule_name(ctx: &WriterCtx<'_>) -> String {
    let mangled = ctx
        .target()
        .label()
        .no_toolchain()
        .trim_start_matches('/')
        .replace(['/', ':'], "_");
    format!("{}__{}___rule", ctx.rule_prefix(), mangled)
}

/// Renders one argument into the rule command: target-scope placeholders are
/// expanded now, per-source placeholders become rule variables bound on each
/// build line.
fn render_arg(
    pattern: &SubstitutionPattern,
    subctx: &TargetSubstitutionCtx<'_>,
    per_source: &mut IndexSet<Substitution>,
) -> Result<String, BuildError> {
    let mut out = String::new();
    for seg in pattern.segments() {
        match seg {
            Segment::Literal(l) => out.push_str(l),
            Segment::Placeholder(p) if p.is_per_source() => {
                per_source.insert(*p);
                match p {
                    Substitution::Source => out.push_str("$in"),
                    p => {
                        out.push_str("${");
                        out.push_str(p.ninja_name());
                        out.push('}');
                    }
                }
            }
            Segment::Placeholder(p) => match target_substitution(subctx, *p) {
                Some(v) => out.push_str(&v),
                None => {
                    return Err(BuildError::user(format!(
                        "substitution {{{{{}}}}} is not valid in action arguments",
                        p.canonical_name()
                    )));
                }
            },
        }
    }
    Ok(out)
}

fn per_source_value(
    ctx: &WriterCtx<'_>,
    sub: Substitution,
    source: &SourceFile,
) -> Result<String, BuildError> {
    // Reuses the pattern expander on a single-placeholder pattern so the
    // values stay in one place.
    let pattern = SubstitutionPattern::parse(&format!("{{{{{}}}}}", sub.canonical_name()))?;
    let subctx = TargetSubstitutionCtx {
        settings: ctx.settings,
        target: ctx.target(),
        tool: None,
    };
    expand_for_source(&pattern, &subctx, source)
}

pub(crate) fn write_action(ctx: &WriterCtx<'_>, out: &mut String) -> Result<(), BuildError> {
    let target = ctx.target();
    let path = ctx.path();
    let values = target.action_values();
    let script = values.script().ok_or_else(|| {
        BuildError::user(format!("action {} has no script", target.label()))
    })?;
    let is_foreach = target.output_type() == OutputType::ActionForeach;

    let subctx = TargetSubstitutionCtx {
        settings: ctx.settings,
        target,
        tool: None,
    };

    // Rule definition.
    let rule_name = action_rule_name(ctx);
    let mut per_source: IndexSet<Substitution> = IndexSet::new();
    out.push_str("rule ");
    out.push_str(&rule_name);
    out.push_str("\n  command = python3 ");
    path.source(out, script);
    for arg in values.args() {
        out.push(' ');
        out.push_str(&render_arg(arg, &subctx, &mut per_source)?);
    }
    out.push('\n');

    let num_output_uses = if is_foreach { target.sources().len() } else { 1 };
    let input_deps = write_input_deps_phony_and_get_dep(ctx, out, num_output_uses);

    if is_foreach {
        for source in target.sources() {
            let mut outputs: Vec<OutputFile> = Vec::new();
            for pattern in values.outputs() {
                let expanded = expand_for_source(pattern, &subctx, source)?;
                outputs.push(
                    ctx.settings
                        .output_file_for_source(&SourceFile::unchecked_new(expanded)),
                );
            }
            out.push_str("build");
            path.files(out, &outputs);
            out.push_str(": ");
            out.push_str(&rule_name);
            out.push(' ');
            path.source(out, source);
            if !input_deps.is_empty() {
                out.push_str(" |");
                path.files(out, &input_deps);
            }
            out.push('\n');
            for sub in &per_source {
                if *sub == Substitution::Source {
                    continue;
                }
                out.push_str("  ");
                out.push_str(sub.ninja_name());
                out.push_str(" = ");
                out.push_str(&per_source_value(ctx, *sub, source)?);
                out.push('\n');
            }
            if let Some(depfile) = values.depfile() {
                out.push_str("  depfile = ");
                out.push_str(&expand_for_source(depfile, &subctx, source)?);
                out.push('\n');
            }
        }
    } else {
        out.push_str("build");
        path.files(out, target.computed_outputs());
        out.push_str(": ");
        out.push_str(&rule_name);
        if !input_deps.is_empty() {
            out.push_str(" |");
            path.files(out, &input_deps);
        }
        out.push('\n');
        if let Some(depfile) = values.depfile() {
            out.push_str("  depfile = ");
            out.push_str(&gen2_node::substitution::expand_for_target(depfile, &subctx)?);
            out.push('\n');
        }
    }

    write_phony_for_target(ctx, target.computed_outputs(), &[], out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use gen2_core::source_file::SourceFile;
    use gen2_node::substitution::SubstitutionPattern;
    use gen2_node::target::OutputType;
    use gen2_node::testing::TestSetup;

    use super::write_action;
    use crate::target_writer::WriterCtx;

    fn run(setup: &TestSetup, idx: gen2_node::graph::TargetIndex) -> String {
        let ctx = WriterCtx::new(&setup.graph, &setup.settings, idx).unwrap();
        let mut out = String::new();
        write_action(&ctx, &mut out).unwrap();
        out
    }

    #[test]
    fn plain_action_runs_once() {
        let mut setup = TestSetup::new();
        let mut target = setup.target("//foo:bar", OutputType::Action);
        target
            .action_values_mut()
            .set_script(SourceFile::unchecked_new("//foo/script.py"));
        target.sources_mut().push(SourceFile::unchecked_new("//foo/input.txt"));
        target.action_values_mut().set_args(vec![
            SubstitutionPattern::parse("--out={{target_out_dir}}").unwrap(),
        ]);
        target.action_values_mut().set_outputs(vec![
            SubstitutionPattern::parse("//out/Debug/gen/bar.h").unwrap(),
        ]);
        let target = setup.add_target(target);
        setup.resolve_ok();

        assert_eq!(
            run(&setup, target),
            "rule __foo_bar___rule\n\
             \x20 command = python3 ../../foo/script.py --out=obj/foo\n\
             build gen/bar.h: __foo_bar___rule | ../../foo/script.py \
             ../../foo/input.txt\n"
        );
    }

    #[test]
    fn foreach_binds_per_source_variables() {
        let mut setup = TestSetup::new();
        let mut target = setup.target("//foo:bar", OutputType::ActionForeach);
        target
            .action_values_mut()
            .set_script(SourceFile::unchecked_new("//foo/script.py"));
        target.sources_mut().push(SourceFile::unchecked_new("//foo/a.proto"));
        target.sources_mut().push(SourceFile::unchecked_new("//foo/b.proto"));
        target.action_values_mut().set_args(vec![
            SubstitutionPattern::parse("{{source}}").unwrap(),
            SubstitutionPattern::parse("--name={{source_name_part}}").unwrap(),
        ]);
        target.action_values_mut().set_outputs(vec![
            SubstitutionPattern::parse("//out/Debug/gen/{{source_name_part}}.rs").unwrap(),
        ]);
        let target = setup.add_target(target);
        setup.resolve_ok();

        assert_eq!(
            run(&setup, target),
            "rule __foo_bar___rule\n\
             \x20 command = python3 ../../foo/script.py $in --name=${source_name_part}\n\
             build gen/a.rs: __foo_bar___rule ../../foo/a.proto | \
             ../../foo/script.py\n\
             \x20 source_name_part = a\n\
             build gen/b.rs: __foo_bar___rule ../../foo/b.proto | \
             ../../foo/script.py\n\
             \x20 source_name_part = b\n\
             build obj/foo/bar.stamp: phony gen/a.rs gen/b.rs\n"
        );
    }
}
