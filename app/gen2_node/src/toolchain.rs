/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Toolchains and tools.
//!
//! A toolchain is a named collection of tools, one per language or linking
//! step, plus a dependency list that must be built before anything using the
//! toolchain. Tools used to be distinguished with virtual downcasts in the
//! ancestry of this code; here [`Tool`] is a tagged enum, the Rust compiler
//! family is its own [`RustTool`] payload, and callers match on the variant
//! (or go through [`Tool::as_rust`]).

use gen2_core::error::BuildError;
use gen2_core::label::Label;
use indexmap::IndexMap;

use crate::graph::LabelTargetPair;
use crate::substitution::SubstitutionBits;
use crate::substitution::SubstitutionPattern;
use crate::target::OutputType;
use crate::target::Target;

/// The rule name ninja reserves for collapsing nodes; it never needs a
/// definition in the emitted file and is not a [`Tool`].
pub const PHONY_RULE: &str = "phony";

/// Names for every tool slot a toolchain can fill. Used as the lookup key
/// and as the emitted rule name.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    Cc,
    Cxx,
    Alink,
    Solink,
    Link,
    Stamp,
    Copy,
    RustBin,
    RustRlib,
    RustDylib,
    RustCdylib,
    RustMacro,
    RustStaticlib,
}

impl ToolKind {
    /// The rule name emitted for this tool (in the default toolchain).
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Cc => "cc",
            ToolKind::Cxx => "cxx",
            ToolKind::Alink => "alink",
            ToolKind::Solink => "solink",
            ToolKind::Link => "link",
            ToolKind::Stamp => "stamp",
            ToolKind::Copy => "copy",
            ToolKind::RustBin => "rust_bin",
            ToolKind::RustRlib => "rust_rlib",
            ToolKind::RustDylib => "rust_dylib",
            ToolKind::RustCdylib => "rust_cdylib",
            ToolKind::RustMacro => "rust_macro",
            ToolKind::RustStaticlib => "rust_staticlib",
        }
    }

    pub fn is_rust(self) -> bool {
        matches!(
            self,
            ToolKind::RustBin
                | ToolKind::RustRlib
                | ToolKind::RustDylib
                | ToolKind::RustCdylib
                | ToolKind::RustMacro
                | ToolKind::RustStaticlib
        )
    }
}

/// The values every tool carries regardless of language: the command
/// template, output patterns, and output naming defaults. Constructed only
/// through [`Tool::new`] and mutated through the [`Tool`] setters.
#[derive(Clone, Debug)]
pub struct ToolValues {
    command: SubstitutionPattern,
    description: Option<String>,
    outputs: Vec<SubstitutionPattern>,
    /// For tools with several outputs: the file handed to a linker.
    link_output: Option<SubstitutionPattern>,
    /// The file dependents should depend on (e.g. a `.TOC` beside a shared
    /// library, so relinks only happen when the interface changes).
    depend_output: Option<SubstitutionPattern>,
    output_prefix: String,
    default_output_extension: String,
    depfile: Option<SubstitutionPattern>,
    pool: Option<String>,
}

impl ToolValues {
    fn new(command: &str) -> Result<ToolValues, BuildError> {
        Ok(ToolValues {
            command: SubstitutionPattern::parse(command)?,
            description: None,
            outputs: Vec::new(),
            link_output: None,
            depend_output: None,
            output_prefix: String::new(),
            default_output_extension: String::new(),
            depfile: None,
            pool: None,
        })
    }
}

/// The six shapes the Rust compiler tool comes in, one per crate type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RustToolKind {
    Bin,
    Rlib,
    Dylib,
    Cdylib,
    ProcMacro,
    Staticlib,
}

impl RustToolKind {
    pub fn tool_kind(self) -> ToolKind {
        match self {
            RustToolKind::Bin => ToolKind::RustBin,
            RustToolKind::Rlib => ToolKind::RustRlib,
            RustToolKind::Dylib => ToolKind::RustDylib,
            RustToolKind::Cdylib => ToolKind::RustCdylib,
            RustToolKind::ProcMacro => ToolKind::RustMacro,
            RustToolKind::Staticlib => ToolKind::RustStaticlib,
        }
    }
}

/// A tool of the Rust family.
#[derive(Clone, Debug)]
pub struct RustTool {
    kind: RustToolKind,
    values: ToolValues,
}

impl RustTool {
    pub fn rust_kind(&self) -> RustToolKind {
        self.kind
    }
}

/// One tool of a toolchain. The variant is the language family; everything
/// a writer asks a tool for goes through the accessors below, which
/// dispatch on the variant.
#[derive(Clone, Debug)]
pub enum Tool {
    Cc(ToolValues),
    Cxx(ToolValues),
    Alink(ToolValues),
    Solink(ToolValues),
    Link(ToolValues),
    Stamp(ToolValues),
    Copy(ToolValues),
    Rust(RustTool),
}

impl Tool {
    pub fn new(kind: ToolKind, command: &str) -> Result<Tool, BuildError> {
        let values = ToolValues::new(command)?;
        Ok(match kind {
            ToolKind::Cc => Tool::Cc(values),
            ToolKind::Cxx => Tool::Cxx(values),
            ToolKind::Alink => Tool::Alink(values),
            ToolKind::Solink => Tool::Solink(values),
            ToolKind::Link => Tool::Link(values),
            ToolKind::Stamp => Tool::Stamp(values),
            ToolKind::Copy => Tool::Copy(values),
            ToolKind::RustBin => Tool::Rust(RustTool {
                kind: RustToolKind::Bin,
                values,
            }),
            ToolKind::RustRlib => Tool::Rust(RustTool {
                kind: RustToolKind::Rlib,
                values,
            }),
            ToolKind::RustDylib => Tool::Rust(RustTool {
                kind: RustToolKind::Dylib,
                values,
            }),
            ToolKind::RustCdylib => Tool::Rust(RustTool {
                kind: RustToolKind::Cdylib,
                values,
            }),
            ToolKind::RustMacro => Tool::Rust(RustTool {
                kind: RustToolKind::ProcMacro,
                values,
            }),
            ToolKind::RustStaticlib => Tool::Rust(RustTool {
                kind: RustToolKind::Staticlib,
                values,
            }),
        })
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Tool::Cc(_) => ToolKind::Cc,
            Tool::Cxx(_) => ToolKind::Cxx,
            Tool::Alink(_) => ToolKind::Alink,
            Tool::Solink(_) => ToolKind::Solink,
            Tool::Link(_) => ToolKind::Link,
            Tool::Stamp(_) => ToolKind::Stamp,
            Tool::Copy(_) => ToolKind::Copy,
            Tool::Rust(rust) => rust.kind.tool_kind(),
        }
    }

    /// The Rust payload, for callers that need the crate shape.
    pub fn as_rust(&self) -> Option<&RustTool> {
        match self {
            Tool::Rust(rust) => Some(rust),
            _ => None,
        }
    }

    fn values(&self) -> &ToolValues {
        match self {
            Tool::Cc(values)
            | Tool::Cxx(values)
            | Tool::Alink(values)
            | Tool::Solink(values)
            | Tool::Link(values)
            | Tool::Stamp(values)
            | Tool::Copy(values) => values,
            Tool::Rust(rust) => &rust.values,
        }
    }

    fn values_mut(&mut self) -> &mut ToolValues {
        match self {
            Tool::Cc(values)
            | Tool::Cxx(values)
            | Tool::Alink(values)
            | Tool::Solink(values)
            | Tool::Link(values)
            | Tool::Stamp(values)
            | Tool::Copy(values) => values,
            Tool::Rust(rust) => &mut rust.values,
        }
    }

    pub fn command(&self) -> &SubstitutionPattern {
        &self.values().command
    }

    pub fn description(&self) -> Option<&str> {
        self.values().description.as_deref()
    }

    pub fn set_description(&mut self, d: impl Into<String>) {
        self.values_mut().description = Some(d.into());
    }

    pub fn outputs(&self) -> &[SubstitutionPattern] {
        &self.values().outputs
    }

    pub fn set_outputs(&mut self, patterns: &[&str]) -> Result<(), BuildError> {
        self.values_mut().outputs = patterns
            .iter()
            .map(|p| SubstitutionPattern::parse(p))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    pub fn link_output(&self) -> Option<&SubstitutionPattern> {
        self.values().link_output.as_ref()
    }

    pub fn set_link_output(&mut self, pattern: &str) -> Result<(), BuildError> {
        self.values_mut().link_output = Some(SubstitutionPattern::parse(pattern)?);
        Ok(())
    }

    pub fn depend_output(&self) -> Option<&SubstitutionPattern> {
        self.values().depend_output.as_ref()
    }

    pub fn set_depend_output(&mut self, pattern: &str) -> Result<(), BuildError> {
        self.values_mut().depend_output = Some(SubstitutionPattern::parse(pattern)?);
        Ok(())
    }

    pub fn output_prefix(&self) -> &str {
        &self.values().output_prefix
    }

    pub fn set_output_prefix(&mut self, prefix: impl Into<String>) {
        self.values_mut().output_prefix = prefix.into();
    }

    /// Includes the leading dot (`.rlib`), or empty for none.
    pub fn default_output_extension(&self) -> &str {
        &self.values().default_output_extension
    }

    pub fn set_default_output_extension(&mut self, ext: impl Into<String>) {
        self.values_mut().default_output_extension = ext.into();
    }

    pub fn depfile(&self) -> Option<&SubstitutionPattern> {
        self.values().depfile.as_ref()
    }

    pub fn set_depfile(&mut self, pattern: &str) -> Result<(), BuildError> {
        self.values_mut().depfile = Some(SubstitutionPattern::parse(pattern)?);
        Ok(())
    }

    pub fn pool(&self) -> Option<&str> {
        self.values().pool.as_deref()
    }

    pub fn set_pool(&mut self, pool: impl Into<String>) {
        self.values_mut().pool = Some(pool.into());
    }
}

#[derive(Clone, Debug)]
pub struct Toolchain {
    label: Label,
    tools: IndexMap<ToolKind, Tool>,
    deps: Vec<LabelTargetPair>,
    bits: SubstitutionBits,
}

impl Toolchain {
    pub fn new(label: Label) -> Toolchain {
        Toolchain {
            label,
            tools: IndexMap::new(),
            deps: Vec::new(),
            bits: SubstitutionBits::default(),
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn add_tool(&mut self, tool: Tool) {
        self.bits.add_pattern(tool.command());
        for out in tool.outputs() {
            self.bits.add_pattern(out);
        }
        self.tools.insert(tool.kind(), tool);
    }

    pub fn tool(&self, kind: ToolKind) -> Option<&Tool> {
        self.tools.get(&kind)
    }

    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    pub fn deps(&self) -> &[LabelTargetPair] {
        &self.deps
    }

    pub fn deps_mut(&mut self) -> &mut Vec<LabelTargetPair> {
        &mut self.deps
    }

    /// Placeholders any of this toolchain's tools reference; writers hoist
    /// the shared subset as file-level variables.
    pub fn substitution_bits(&self) -> &SubstitutionBits {
        &self.bits
    }

    /// The tool producing a binary target's final output. Rust-sourced
    /// targets pick the rust tool for their crate type; native targets pick
    /// by target kind.
    pub fn tool_for_target(&self, target: &Target) -> Result<&Tool, BuildError> {
        let kind = if target.source_types_used().rust_used() {
            match target.rust_values().inferred_crate_type(target.output_type()) {
                Some(ct) => ct.tool_kind(),
                None => {
                    return Err(BuildError::user(format!(
                        "target {} has Rust sources but no Rust output kind",
                        target.label()
                    )));
                }
            }
        } else {
            match target.output_type() {
                OutputType::Executable => ToolKind::Link,
                OutputType::StaticLibrary => ToolKind::Alink,
                OutputType::SharedLibrary | OutputType::LoadableModule => ToolKind::Solink,
                other => {
                    return Err(BuildError::internal(format!(
                        "target {} of kind {} has no final tool",
                        target.label(),
                        other.as_str()
                    )));
                }
            }
        };
        self.tool(kind).ok_or_else(|| {
            BuildError::user(format!(
                "toolchain {} has no `{}` tool, needed by {}",
                self.label,
                kind.name(),
                target.label()
            ))
        })
    }

    /// The tool compiling one translation unit of the given source.
    pub fn compiler_for_source(&self, source_type: gen2_core::source_file::SourceType) -> Option<&Tool> {
        use gen2_core::source_file::SourceType;
        match source_type {
            SourceType::C => self.tool(ToolKind::Cc),
            SourceType::Cpp => self.tool(ToolKind::Cxx),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_tools_carry_their_shape() {
        let tool = Tool::new(ToolKind::RustMacro, "rustc {{source}} -o {{output}}").unwrap();
        assert_eq!(tool.kind(), ToolKind::RustMacro);
        let rust = tool.as_rust().unwrap();
        assert_eq!(rust.rust_kind(), RustToolKind::ProcMacro);
        assert_eq!(rust.rust_kind().tool_kind(), ToolKind::RustMacro);
    }

    #[test]
    fn native_tools_are_not_rust() {
        let mut tool = Tool::new(ToolKind::Solink, "ld -shared -o {{output}}").unwrap();
        tool.set_output_prefix("lib");
        tool.set_default_output_extension(".so");
        assert!(tool.as_rust().is_none());
        assert_eq!(tool.kind(), ToolKind::Solink);
        assert_eq!(tool.output_prefix(), "lib");
        assert_eq!(tool.default_output_extension(), ".so");
    }
}
