/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The substitution engine.
//!
//! Tool command templates and output patterns contain placeholders written
//! `{{name}}`. The set of placeholders is closed; each one has a stable
//! textual form used in patterns, a ninja variable name used when a rule
//! template is emitted, and a resolver producing the concrete string for a
//! given target (or target+source pair for the per-source placeholders).

use gen2_core::build_settings::BuildSettings;
use gen2_core::error::BuildError;
use gen2_core::source_file::SourceFile;
use indexmap::IndexSet;

use crate::target::Target;
use crate::toolchain::Tool;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Substitution {
    // Shared target scope, writable as file-level variables.
    Label,
    LabelName,
    LabelNoToolchain,
    RootGenDir,
    RootOutDir,
    TargetGenDir,
    TargetOutDir,
    TargetOutputName,

    // Target scope, written by the per-kind writers themselves.
    Output,
    OutputDir,
    OutputExtension,
    CrateName,
    CrateType,
    RustFlags,
    RustEnv,
    Externs,
    RustDeps,
    CFlags,
    CFlagsC,
    CFlagsCc,
    Defines,
    IncludeDirs,
    LdFlags,
    Libs,

    // Per-source scope.
    Source,
    SourceNamePart,
    SourceFilePart,
    SourceOutDir,
}

impl Substitution {
    /// The name inside `{{...}}` in patterns.
    pub fn canonical_name(self) -> &'static str {
        match self {
            Substitution::Label => "label",
            Substitution::LabelName => "label_name",
            Substitution::LabelNoToolchain => "label_no_toolchain",
            Substitution::RootGenDir => "root_gen_dir",
            Substitution::RootOutDir => "root_out_dir",
            Substitution::TargetGenDir => "target_gen_dir",
            Substitution::TargetOutDir => "target_out_dir",
            Substitution::TargetOutputName => "target_output_name",
            Substitution::Output => "output",
            Substitution::OutputDir => "output_dir",
            Substitution::OutputExtension => "output_extension",
            Substitution::CrateName => "crate_name",
            Substitution::CrateType => "crate_type",
            Substitution::RustFlags => "rustflags",
            Substitution::RustEnv => "rustenv",
            Substitution::Externs => "externs",
            Substitution::RustDeps => "rustdeps",
            Substitution::CFlags => "cflags",
            Substitution::CFlagsC => "cflags_c",
            Substitution::CFlagsCc => "cflags_cc",
            Substitution::Defines => "defines",
            Substitution::IncludeDirs => "include_dirs",
            Substitution::LdFlags => "ldflags",
            Substitution::Libs => "libs",
            Substitution::Source => "source",
            Substitution::SourceNamePart => "source_name_part",
            Substitution::SourceFilePart => "source_file_part",
            Substitution::SourceOutDir => "source_out_dir",
        }
    }

    /// The variable referenced from an emitted rule. `{{source}}` and
    /// `{{output}}` map onto ninja's own `$in`/`$out`.
    pub fn ninja_name(self) -> &'static str {
        match self {
            Substitution::Source => "in",
            Substitution::Output => "out",
            other => other.canonical_name(),
        }
    }

    pub fn parse(name: &str) -> Option<Substitution> {
        ALL.iter().copied().find(|s| s.canonical_name() == name)
    }

    /// Expanded per source rather than per target.
    pub fn is_per_source(self) -> bool {
        matches!(
            self,
            Substitution::Source
                | Substitution::SourceNamePart
                | Substitution::SourceFilePart
                | Substitution::SourceOutDir
        )
    }
}

const ALL: &[Substitution] = &[
    Substitution::Label,
    Substitution::LabelName,
    Substitution::LabelNoToolchain,
    Substitution::RootGenDir,
    Substitution::RootOutDir,
    Substitution::TargetGenDir,
    Substitution::TargetOutDir,
    Substitution::TargetOutputName,
    Substitution::Output,
    Substitution::OutputDir,
    Substitution::OutputExtension,
    Substitution::CrateName,
    Substitution::CrateType,
    Substitution::RustFlags,
    Substitution::RustEnv,
    Substitution::Externs,
    Substitution::RustDeps,
    Substitution::CFlags,
    Substitution::CFlagsC,
    Substitution::CFlagsCc,
    Substitution::Defines,
    Substitution::IncludeDirs,
    Substitution::LdFlags,
    Substitution::Libs,
    Substitution::Source,
    Substitution::SourceNamePart,
    Substitution::SourceFilePart,
    Substitution::SourceOutDir,
];

/// The variables every writer may hoist to the top of a target's block, in
/// the fixed order they are written.
pub const SHARED_VAR_ORDER: &[Substitution] = &[
    Substitution::Label,
    Substitution::LabelName,
    Substitution::LabelNoToolchain,
    Substitution::RootGenDir,
    Substitution::RootOutDir,
    Substitution::TargetGenDir,
    Substitution::TargetOutDir,
    Substitution::TargetOutputName,
];

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    Literal(String),
    Placeholder(Substitution),
}

/// A parsed template mixing literal text and placeholders.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubstitutionPattern {
    segments: Vec<Segment>,
}

impl SubstitutionPattern {
    /// ```
    /// use gen2_node::substitution::SubstitutionPattern;
    ///
    /// assert!(SubstitutionPattern::parse("{{target_out_dir}}/{{target_output_name}}.a").is_ok());
    /// assert!(SubstitutionPattern::parse("{{no_such_thing}}").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<SubstitutionPattern, BuildError> {
        let mut segments = Vec::new();
        let mut rest = s;
        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_owned()));
            }
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| {
                BuildError::user(format!("unterminated substitution in `{}`", s))
            })?;
            let name = &after[..close];
            let sub = Substitution::parse(name).ok_or_else(|| {
                BuildError::user(format!("unknown substitution `{{{{{}}}}}`", name))
            })?;
            segments.push(Segment::Placeholder(sub));
            rest = &after[close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_owned()));
        }
        Ok(SubstitutionPattern { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn placeholders(&self) -> impl Iterator<Item = Substitution> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(p) => Some(*p),
            Segment::Literal(_) => None,
        })
    }

    /// Renders the pattern as a ninja command template: placeholders become
    /// `$in`/`$out`/`${name}` references that pick up the surrounding file's
    /// variables at execution time.
    pub fn as_ninja_command(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(l) => out.push_str(l),
                Segment::Placeholder(Substitution::Source) => out.push_str("$in"),
                Segment::Placeholder(Substitution::Output) => out.push_str("$out"),
                Segment::Placeholder(p) => {
                    out.push_str("${");
                    out.push_str(p.ninja_name());
                    out.push('}');
                }
            }
        }
        out
    }
}

/// Which placeholders any tool of a toolchain uses. Decides which shared
/// variables get written at the top of each target block.
#[derive(Clone, Debug, Default)]
pub struct SubstitutionBits {
    used: IndexSet<Substitution>,
}

impl SubstitutionBits {
    pub fn add_pattern(&mut self, pattern: &SubstitutionPattern) {
        self.used.extend(pattern.placeholders());
    }

    pub fn contains(&self, sub: Substitution) -> bool {
        self.used.contains(&sub)
    }

    pub fn merge(&mut self, other: &SubstitutionBits) {
        self.used.extend(other.used.iter().copied());
    }
}

/// Everything needed to resolve target-scope placeholders.
pub struct TargetSubstitutionCtx<'a> {
    pub settings: &'a BuildSettings,
    pub target: &'a Target,
    /// The tool producing the target's output, when the kind has one.
    pub tool: Option<&'a Tool>,
}

/// Resolves one target-scope placeholder to its concrete string, or `None`
/// for placeholders that are per-source or filled in by the writer itself.
pub fn target_substitution(ctx: &TargetSubstitutionCtx<'_>, sub: Substitution) -> Option<String> {
    let target = ctx.target;
    let label = target.label();
    match sub {
        Substitution::Label => Some(label.user_visible_name(true)),
        Substitution::LabelName => Some(label.name().to_owned()),
        Substitution::LabelNoToolchain => Some(label.no_toolchain()),
        Substitution::RootGenDir => Some(ctx.settings.root_gen_dir().to_owned()),
        Substitution::RootOutDir => Some(ctx.settings.root_out_dir().to_owned()),
        Substitution::TargetGenDir => Some(ctx.settings.target_gen_dir(label)),
        Substitution::TargetOutDir => Some(ctx.settings.target_out_dir(label)),
        Substitution::TargetOutputName => Some(target.output_name_with_prefix(ctx.tool)),
        Substitution::OutputExtension => Some(target.resolved_output_extension(ctx.tool)),
        Substitution::OutputDir => Some(
            target
                .output_dir()
                .map(|d| ctx.settings.rebased_dir(d))
                .unwrap_or_default(),
        ),
        Substitution::CrateName => Some(target.crate_name()),
        Substitution::CrateType => target
            .rust_values()
            .inferred_crate_type(target.output_type())
            .map(|t| t.as_str().to_owned()),
        _ => None,
    }
}

/// Expands a pattern in target scope. Per-source placeholders are an error
/// here.
pub fn expand_for_target(
    pattern: &SubstitutionPattern,
    ctx: &TargetSubstitutionCtx<'_>,
) -> Result<String, BuildError> {
    let mut out = String::new();
    for seg in pattern.segments() {
        match seg {
            Segment::Literal(l) => out.push_str(l),
            Segment::Placeholder(p) => match target_substitution(ctx, *p) {
                Some(v) => out.push_str(&v),
                None => {
                    return Err(BuildError::internal(format!(
                        "substitution {{{{{}}}}} is not valid when expanding for target {}",
                        p.canonical_name(),
                        ctx.target.label()
                    )));
                }
            },
        }
    }
    Ok(out)
}

/// Expands a pattern for one source of a target.
pub fn expand_for_source(
    pattern: &SubstitutionPattern,
    ctx: &TargetSubstitutionCtx<'_>,
    source: &SourceFile,
) -> Result<String, BuildError> {
    let mut out = String::new();
    for seg in pattern.segments() {
        match seg {
            Segment::Literal(l) => out.push_str(l),
            Segment::Placeholder(p) => {
                let v = match p {
                    Substitution::Source => {
                        Some(ctx.settings.output_file_for_source(source).as_str().to_owned())
                    }
                    Substitution::SourceFilePart => Some(source.file_name().to_owned()),
                    Substitution::SourceNamePart => Some(source.name_part().to_owned()),
                    Substitution::SourceOutDir => {
                        let rel = source.dir();
                        let rel = rel.source_relative();
                        Some(if rel.is_empty() {
                            "obj".to_owned()
                        } else {
                            format!("obj/{}", rel)
                        })
                    }
                    other => target_substitution(ctx, *other),
                };
                match v {
                    Some(v) => out.push_str(&v),
                    None => {
                        return Err(BuildError::internal(format!(
                            "substitution {{{{{}}}}} is not valid when expanding for source {}",
                            p.canonical_name(),
                            source
                        )));
                    }
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render() {
        let p = SubstitutionPattern::parse(
            "{{rustenv}} rustc --crate-name {{crate_name}} {{source}} -o {{output}}",
        )
        .unwrap();
        assert_eq!(
            p.as_ninja_command(),
            "${rustenv} rustc --crate-name ${crate_name} $in -o $out"
        );
    }

    #[test]
    fn placeholders_are_collected_into_bits() {
        let p = SubstitutionPattern::parse("{{root_out_dir}}/{{crate_name}}{{output_extension}}")
            .unwrap();
        let mut bits = SubstitutionBits::default();
        bits.add_pattern(&p);
        assert!(bits.contains(Substitution::RootOutDir));
        assert!(bits.contains(Substitution::CrateName));
        assert!(!bits.contains(Substitution::TargetOutDir));
    }

    #[test]
    fn literal_only_pattern() {
        let p = SubstitutionPattern::parse("touch out.stamp").unwrap();
        assert_eq!(p.as_ninja_command(), "touch out.stamp");
        assert_eq!(p.placeholders().count(), 0);
    }
}
