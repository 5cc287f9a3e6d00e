/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The central entity of the graph. A target is constructed by the
//! front-end, populated field by field, resolved exactly once, and immutable
//! from then on.

use gen2_core::label::Label;
use gen2_core::output_file::OutputFile;
use gen2_core::source_file::SourceDir;
use gen2_core::source_file::SourceFile;
use gen2_core::source_file::SourceTypes;
use indexmap::IndexSet;

use crate::config_values::ConfigValues;
use crate::graph::LabelTargetPair;
use crate::graph::TargetIndex;
use crate::graph::ToolchainIndex;
use crate::inherited_libraries::InheritedLibraries;
use crate::metadata::Metadata;
use crate::metadata::Value;
use crate::rust_values::RustValues;
use crate::substitution::SubstitutionPattern;
use crate::toolchain::Tool;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OutputType {
    Group,
    Copy,
    Action,
    ActionForeach,
    BundleData,
    CreateBundle,
    GeneratedFile,
    SourceSet,
    StaticLibrary,
    SharedLibrary,
    LoadableModule,
    Executable,
    RustLibrary,
    RustProcMacro,
}

impl OutputType {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputType::Group => "group",
            OutputType::Copy => "copy",
            OutputType::Action => "action",
            OutputType::ActionForeach => "action_foreach",
            OutputType::BundleData => "bundle_data",
            OutputType::CreateBundle => "create_bundle",
            OutputType::GeneratedFile => "generated_file",
            OutputType::SourceSet => "source_set",
            OutputType::StaticLibrary => "static_library",
            OutputType::SharedLibrary => "shared_library",
            OutputType::LoadableModule => "loadable_module",
            OutputType::Executable => "executable",
            OutputType::RustLibrary => "rust_library",
            OutputType::RustProcMacro => "rust_proc_macro",
        }
    }

    /// Compiled targets. These get their own sub-ninja file so the compile
    /// flag variables scope to the file instead of leaking between targets.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            OutputType::SourceSet
                | OutputType::StaticLibrary
                | OutputType::SharedLibrary
                | OutputType::LoadableModule
                | OutputType::Executable
                | OutputType::RustLibrary
                | OutputType::RustProcMacro
        )
    }

    /// Kinds that produce something a linker (or rustc) consumes.
    pub fn is_linkable(self) -> bool {
        matches!(
            self,
            OutputType::StaticLibrary
                | OutputType::SharedLibrary
                | OutputType::LoadableModule
                | OutputType::RustLibrary
                | OutputType::RustProcMacro
        )
    }
}

/// The single output downstream consumers depend on: a real produced file,
/// or a synthesized phony collapsing several producers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DependencyOutput {
    File(OutputFile),
    Phony(OutputFile),
}

impl DependencyOutput {
    pub fn file(&self) -> &OutputFile {
        match self {
            DependencyOutput::File(f) | DependencyOutput::Phony(f) => f,
        }
    }

    pub fn is_phony(&self) -> bool {
        matches!(self, DependencyOutput::Phony(_))
    }
}

/// Values populated for action and action_foreach targets (and the output
/// list of copy and generated_file targets).
#[derive(Clone, Debug, Default)]
pub struct ActionValues {
    script: Option<SourceFile>,
    args: Vec<SubstitutionPattern>,
    outputs: Vec<SubstitutionPattern>,
    depfile: Option<SubstitutionPattern>,
}

impl ActionValues {
    pub fn script(&self) -> Option<&SourceFile> {
        self.script.as_ref()
    }

    pub fn set_script(&mut self, script: SourceFile) {
        self.script = Some(script);
    }

    pub fn args(&self) -> &[SubstitutionPattern] {
        &self.args
    }

    pub fn set_args(&mut self, args: Vec<SubstitutionPattern>) {
        self.args = args;
    }

    pub fn outputs(&self) -> &[SubstitutionPattern] {
        &self.outputs
    }

    pub fn set_outputs(&mut self, outputs: Vec<SubstitutionPattern>) {
        self.outputs = outputs;
    }

    pub fn depfile(&self) -> Option<&SubstitutionPattern> {
        self.depfile.as_ref()
    }

    pub fn set_depfile(&mut self, depfile: SubstitutionPattern) {
        self.depfile = Some(depfile);
    }
}

/// How a generated_file target serializes the collected values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputConversion {
    /// One value per line.
    #[default]
    ListLines,
    Json,
}

/// The transitive Rust crate information a Rust writer needs, computed at
/// resolution time. "Accessible" crates may be named in source and become
/// `--extern` switches; the direct set feeds the implicit input list; walked
/// groups become order-only inputs.
#[derive(Clone, Debug, Default)]
pub struct RustTransitiveLibs {
    pub accessible: Vec<TargetIndex>,
    pub direct: Vec<TargetIndex>,
    pub walked_groups: Vec<TargetIndex>,
}

/// The computed portion of a target, written exactly once by resolution.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResolvedState {
    pub computed_outputs: Vec<OutputFile>,
    pub link_output: Option<OutputFile>,
    pub dependency_output: Option<DependencyOutput>,
    pub recursive_hard_deps: IndexSet<TargetIndex>,
    pub inherited_libraries: InheritedLibraries,
    pub rust_libs: RustTransitiveLibs,
}

#[derive(Clone, Debug)]
pub struct Target {
    label: Label,
    output_type: OutputType,
    toolchain: Option<ToolchainIndex>,

    sources: Vec<SourceFile>,
    source_types_used: SourceTypes,

    output_name: Option<String>,
    output_extension: Option<String>,
    output_dir: Option<SourceDir>,

    public_deps: Vec<LabelTargetPair>,
    private_deps: Vec<LabelTargetPair>,
    data_deps: Vec<LabelTargetPair>,
    gen_deps: Vec<LabelTargetPair>,

    configs: Vec<Label>,
    all_dependent_configs: Vec<Label>,
    public_configs: Vec<Label>,

    config_values: ConfigValues,
    rust_values: RustValues,
    action_values: ActionValues,
    metadata: Metadata,

    // generated_file values.
    contents: Option<Value>,
    output_conversion: OutputConversion,
    data_keys: Vec<String>,
    walk_keys: Vec<String>,
    rebase: bool,

    resolved: Option<ResolvedState>,
}

impl Target {
    pub fn new(label: Label, output_type: OutputType) -> Target {
        Target {
            label,
            output_type,
            toolchain: None,
            sources: Vec::new(),
            source_types_used: SourceTypes::default(),
            output_name: None,
            output_extension: None,
            output_dir: None,
            public_deps: Vec::new(),
            private_deps: Vec::new(),
            data_deps: Vec::new(),
            gen_deps: Vec::new(),
            configs: Vec::new(),
            all_dependent_configs: Vec::new(),
            public_configs: Vec::new(),
            config_values: ConfigValues::default(),
            rust_values: RustValues::default(),
            action_values: ActionValues::default(),
            metadata: Metadata::default(),
            contents: None,
            output_conversion: OutputConversion::default(),
            data_keys: Vec::new(),
            walk_keys: Vec::new(),
            rebase: false,
            resolved: None,
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    pub fn toolchain(&self) -> Option<ToolchainIndex> {
        self.toolchain
    }

    pub fn set_toolchain(&mut self, toolchain: ToolchainIndex) {
        self.toolchain = Some(toolchain);
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut Vec<SourceFile> {
        &mut self.sources
    }

    pub fn source_types_used(&self) -> &SourceTypes {
        &self.source_types_used
    }

    pub fn source_types_used_mut(&mut self) -> &mut SourceTypes {
        &mut self.source_types_used
    }

    pub fn output_name(&self) -> Option<&str> {
        self.output_name.as_deref()
    }

    pub fn set_output_name(&mut self, name: impl Into<String>) {
        self.output_name = Some(name.into());
    }

    pub fn output_extension(&self) -> Option<&str> {
        self.output_extension.as_deref()
    }

    pub fn set_output_extension(&mut self, ext: impl Into<String>) {
        self.output_extension = Some(ext.into());
    }

    pub fn output_dir(&self) -> Option<&SourceDir> {
        self.output_dir.as_ref()
    }

    pub fn set_output_dir(&mut self, dir: SourceDir) {
        self.output_dir = Some(dir);
    }

    pub fn public_deps(&self) -> &[LabelTargetPair] {
        &self.public_deps
    }

    pub fn public_deps_mut(&mut self) -> &mut Vec<LabelTargetPair> {
        &mut self.public_deps
    }

    pub fn private_deps(&self) -> &[LabelTargetPair] {
        &self.private_deps
    }

    pub fn private_deps_mut(&mut self) -> &mut Vec<LabelTargetPair> {
        &mut self.private_deps
    }

    pub fn data_deps(&self) -> &[LabelTargetPair] {
        &self.data_deps
    }

    pub fn data_deps_mut(&mut self) -> &mut Vec<LabelTargetPair> {
        &mut self.data_deps
    }

    pub fn gen_deps(&self) -> &[LabelTargetPair] {
        &self.gen_deps
    }

    pub fn gen_deps_mut(&mut self) -> &mut Vec<LabelTargetPair> {
        &mut self.gen_deps
    }

    /// Direct public then private deps, the order every traversal uses.
    pub fn linked_deps(&self) -> impl Iterator<Item = (&LabelTargetPair, bool)> {
        self.public_deps
            .iter()
            .map(|p| (p, true))
            .chain(self.private_deps.iter().map(|p| (p, false)))
    }

    pub fn configs(&self) -> &[Label] {
        &self.configs
    }

    pub fn configs_mut(&mut self) -> &mut Vec<Label> {
        &mut self.configs
    }

    pub fn all_dependent_configs(&self) -> &[Label] {
        &self.all_dependent_configs
    }

    pub fn all_dependent_configs_mut(&mut self) -> &mut Vec<Label> {
        &mut self.all_dependent_configs
    }

    pub fn public_configs(&self) -> &[Label] {
        &self.public_configs
    }

    pub fn public_configs_mut(&mut self) -> &mut Vec<Label> {
        &mut self.public_configs
    }

    pub fn config_values(&self) -> &ConfigValues {
        &self.config_values
    }

    pub fn config_values_mut(&mut self) -> &mut ConfigValues {
        &mut self.config_values
    }

    pub fn rust_values(&self) -> &RustValues {
        &self.rust_values
    }

    pub fn rust_values_mut(&mut self) -> &mut RustValues {
        &mut self.rust_values
    }

    pub fn action_values(&self) -> &ActionValues {
        &self.action_values
    }

    pub fn action_values_mut(&mut self) -> &mut ActionValues {
        &mut self.action_values
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn contents(&self) -> Option<&Value> {
        self.contents.as_ref()
    }

    pub fn set_contents(&mut self, v: Value) {
        self.contents = Some(v);
    }

    pub fn output_conversion(&self) -> OutputConversion {
        self.output_conversion
    }

    pub fn set_output_conversion(&mut self, c: OutputConversion) {
        self.output_conversion = c;
    }

    pub fn data_keys(&self) -> &[String] {
        &self.data_keys
    }

    pub fn data_keys_mut(&mut self) -> &mut Vec<String> {
        &mut self.data_keys
    }

    pub fn walk_keys(&self) -> &[String] {
        &self.walk_keys
    }

    pub fn walk_keys_mut(&mut self) -> &mut Vec<String> {
        &mut self.walk_keys
    }

    pub fn rebase(&self) -> bool {
        self.rebase
    }

    pub fn set_rebase(&mut self, rebase: bool) {
        self.rebase = rebase;
    }

    /// True when this target compiles with a Rust tool.
    pub fn is_rust_target(&self) -> bool {
        self.source_types_used.rust_used()
            && matches!(
                self.output_type,
                OutputType::Executable
                    | OutputType::SharedLibrary
                    | OutputType::StaticLibrary
                    | OutputType::LoadableModule
                    | OutputType::RustLibrary
                    | OutputType::RustProcMacro
            )
    }

    /// The crate type this target compiles to, when it compiles with a Rust
    /// tool at all.
    pub fn rust_crate_type(&self) -> Option<crate::rust_values::RustCrateType> {
        if self.is_rust_target() {
            self.rust_values.inferred_crate_type(self.output_type)
        } else {
            None
        }
    }

    /// The crate name used in `--crate-name` and `--extern`, defaulting to
    /// the label name with dashes mapped to underscores.
    pub fn crate_name(&self) -> String {
        if self.rust_values.crate_name().is_empty() {
            self.label.name().replace('-', "_")
        } else {
            self.rust_values.crate_name().to_owned()
        }
    }

    /// The base file name of the output: the tool's prefix (`lib` for
    /// library tools) plus the output_name override or the label name.
    pub fn output_name_with_prefix(&self, tool: Option<&Tool>) -> String {
        let base = self.output_name.as_deref().unwrap_or_else(|| self.label.name());
        match tool {
            Some(tool) => format!("{}{}", tool.output_prefix(), base),
            None => base.to_owned(),
        }
    }

    /// The output extension including the dot: the target override when set
    /// (empty override means "no extension"), the tool default otherwise.
    pub fn resolved_output_extension(&self, tool: Option<&Tool>) -> String {
        match &self.output_extension {
            Some(ext) if ext.is_empty() => String::new(),
            Some(ext) => format!(".{}", ext),
            None => tool
                .map(|t| t.default_output_extension().to_owned())
                .unwrap_or_default(),
        }
    }

    // -- Computed state, available after resolution ------------------------

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    pub(crate) fn set_resolved(&mut self, state: ResolvedState) {
        assert!(self.resolved.is_none(), "target {} resolved twice", self.label);
        self.resolved = Some(state);
    }

    fn resolved(&self) -> &ResolvedState {
        self.resolved
            .as_ref()
            .unwrap_or_else(|| panic!("target {} used before resolution", self.label))
    }

    /// All files the target produces, in pattern order (object files for a
    /// source set).
    pub fn computed_outputs(&self) -> &[OutputFile] {
        &self.resolved().computed_outputs
    }

    /// The file handed to a linker when this target is linked in.
    pub fn link_output(&self) -> Option<&OutputFile> {
        self.resolved().link_output.as_ref()
    }

    pub fn dependency_output(&self) -> Option<&DependencyOutput> {
        self.resolved().dependency_output.as_ref()
    }

    pub fn dependency_output_file_or_phony(&self) -> Option<&OutputFile> {
        self.resolved().dependency_output.as_ref().map(|d| d.file())
    }

    pub fn recursive_hard_deps(&self) -> &IndexSet<TargetIndex> {
        &self.resolved().recursive_hard_deps
    }

    pub fn inherited_libraries(&self) -> &InheritedLibraries {
        &self.resolved().inherited_libraries
    }

    pub fn rust_transitive_libs(&self) -> &RustTransitiveLibs {
        &self.resolved().rust_libs
    }
}
