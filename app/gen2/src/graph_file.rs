/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The on-disk description of a resolved target graph.
//!
//! A front-end (parser, scope evaluator) normally hands the generator an
//! in-memory graph; this JSON schema is the serialized form of that
//! contract, mirroring the target fields one to one. Deserialization here
//! is deliberately dumb; all validation happens in graph resolution.

use std::collections::BTreeMap;

use anyhow::Context as _;
use gen2_core::label::Label;
use gen2_core::source_file::SourceDir;
use gen2_core::source_file::SourceFile;
use gen2_node::config_values::LibFile;
use gen2_node::graph::LabelTargetPair;
use gen2_node::graph::TargetGraph;
use gen2_node::graph::TargetIndex;
use gen2_node::graph::ToolchainIndex;
use gen2_node::metadata::Value;
use gen2_node::rust_values::RustCrateType;
use gen2_node::substitution::SubstitutionPattern;
use gen2_node::target::OutputConversion;
use gen2_node::target::OutputType;
use gen2_node::target::Target;
use gen2_node::toolchain::Tool;
use gen2_node::toolchain::ToolKind;
use gen2_node::toolchain::Toolchain;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphFile {
    /// Source-absolute build directory, e.g. `//out/Debug/`.
    pub build_dir: String,
    #[serde(default)]
    pub default_toolchain: Option<String>,
    pub toolchains: Vec<ToolchainDesc>,
    pub targets: Vec<TargetDesc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainDesc {
    pub label: String,
    pub tools: Vec<ToolDesc>,
    #[serde(default)]
    pub deps: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolDesc {
    pub kind: String,
    pub command: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub link_output: Option<String>,
    #[serde(default)]
    pub depend_output: Option<String>,
    #[serde(default)]
    pub output_prefix: String,
    #[serde(default)]
    pub default_output_extension: String,
    #[serde(default)]
    pub depfile: Option<String>,
    #[serde(default)]
    pub pool: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDesc {
    pub label: String,
    #[serde(rename = "type")]
    pub output_type: String,
    #[serde(default)]
    pub toolchain: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub public_deps: Vec<String>,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default)]
    pub data_deps: Vec<String>,
    #[serde(default)]
    pub gen_deps: Vec<String>,
    #[serde(default)]
    pub configs: Vec<String>,
    #[serde(default)]
    pub public_configs: Vec<String>,
    #[serde(default)]
    pub all_dependent_configs: Vec<String>,

    #[serde(default)]
    pub output_name: Option<String>,
    #[serde(default)]
    pub output_extension: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,

    // Rust values.
    #[serde(default)]
    pub crate_root: Option<String>,
    #[serde(default)]
    pub crate_name: Option<String>,
    #[serde(default)]
    pub crate_type: Option<String>,
    #[serde(default)]
    pub aliased_deps: BTreeMap<String, String>,

    // Aggregated config values.
    #[serde(default)]
    pub cflags: Vec<String>,
    #[serde(default)]
    pub cflags_c: Vec<String>,
    #[serde(default)]
    pub cflags_cc: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub ldflags: Vec<String>,
    #[serde(default)]
    pub lib_dirs: Vec<String>,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub externs: Vec<ExternDesc>,
    #[serde(default)]
    pub rustflags: Vec<String>,
    #[serde(default)]
    pub rustenv: Vec<String>,

    // Action values.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub depfile: Option<String>,

    // generated_file values.
    #[serde(default)]
    pub contents: Option<serde_json::Value>,
    #[serde(default)]
    pub output_conversion: Option<String>,
    #[serde(default)]
    pub data_keys: Vec<String>,
    #[serde(default)]
    pub walk_keys: Vec<String>,
    #[serde(default)]
    pub rebase: bool,

    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata_source_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExternDesc {
    pub name: String,
    pub path: String,
}

fn parse_output_type(s: &str) -> anyhow::Result<OutputType> {
    Ok(match s {
        "group" => OutputType::Group,
        "copy" => OutputType::Copy,
        "action" => OutputType::Action,
        "action_foreach" => OutputType::ActionForeach,
        "bundle_data" => OutputType::BundleData,
        "create_bundle" => OutputType::CreateBundle,
        "generated_file" => OutputType::GeneratedFile,
        "source_set" => OutputType::SourceSet,
        "static_library" => OutputType::StaticLibrary,
        "shared_library" => OutputType::SharedLibrary,
        "loadable_module" => OutputType::LoadableModule,
        "executable" => OutputType::Executable,
        "rust_library" => OutputType::RustLibrary,
        "rust_proc_macro" => OutputType::RustProcMacro,
        other => anyhow::bail!("unknown target type `{}`", other),
    })
}

fn parse_tool_kind(s: &str) -> anyhow::Result<ToolKind> {
    Ok(match s {
        "cc" => ToolKind::Cc,
        "cxx" => ToolKind::Cxx,
        "alink" => ToolKind::Alink,
        "solink" => ToolKind::Solink,
        "link" => ToolKind::Link,
        "stamp" => ToolKind::Stamp,
        "copy" => ToolKind::Copy,
        "rust_bin" => ToolKind::RustBin,
        "rust_rlib" => ToolKind::RustRlib,
        "rust_dylib" => ToolKind::RustDylib,
        "rust_cdylib" => ToolKind::RustCdylib,
        "rust_macro" => ToolKind::RustMacro,
        "rust_staticlib" => ToolKind::RustStaticlib,
        other => anyhow::bail!("unknown tool kind `{}`", other),
    })
}

fn parse_crate_type(s: &str) -> anyhow::Result<RustCrateType> {
    Ok(match s {
        "bin" => RustCrateType::Bin,
        "rlib" => RustCrateType::Rlib,
        "dylib" => RustCrateType::Dylib,
        "cdylib" => RustCrateType::Cdylib,
        "proc-macro" => RustCrateType::ProcMacro,
        "staticlib" => RustCrateType::Staticlib,
        other => anyhow::bail!("unknown crate type `{}`", other),
    })
}

fn parse_lib_file(s: &str) -> LibFile {
    if s.starts_with('/') {
        LibFile::Source(SourceFile::unchecked_new(s))
    } else {
        LibFile::Name(s.to_owned())
    }
}

fn json_to_metadata_value(v: &serde_json::Value) -> anyhow::Result<Value> {
    Ok(match v {
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Array(items) => Value::List(
            items
                .iter()
                .map(json_to_metadata_value)
                .collect::<anyhow::Result<_>>()?,
        ),
        other => anyhow::bail!("unsupported metadata value {}", other),
    })
}

fn build_tool(desc: &ToolDesc) -> anyhow::Result<Tool> {
    let kind = parse_tool_kind(&desc.kind)?;
    let mut tool = Tool::new(kind, &desc.command)?;
    let outputs: Vec<&str> = desc.outputs.iter().map(String::as_str).collect();
    tool.set_outputs(&outputs)?;
    if let Some(description) = &desc.description {
        tool.set_description(description);
    }
    if let Some(link_output) = &desc.link_output {
        tool.set_link_output(link_output)?;
    }
    if let Some(depend_output) = &desc.depend_output {
        tool.set_depend_output(depend_output)
            ?;
    }
    tool.set_output_prefix(&desc.output_prefix);
    tool.set_default_output_extension(&desc.default_output_extension);
    if let Some(depfile) = &desc.depfile {
        tool.set_depfile(depfile)?;
    }
    if let Some(pool) = &desc.pool {
        tool.set_pool(pool);
    }
    Ok(tool)
}

/// Turns the description into an arena graph: toolchains first, then all
/// targets, then the dependency edges once every label has an index.
pub fn build_graph(desc: &GraphFile) -> anyhow::Result<(TargetGraph, SourceDir)> {
    let build_dir = SourceDir::new(desc.build_dir.as_str())?;
    let mut graph = TargetGraph::new();

    let mut toolchain_indices: BTreeMap<String, ToolchainIndex> = BTreeMap::new();
    for tc_desc in &desc.toolchains {
        let label = Label::parse(&tc_desc.label)
            .with_context(|| format!("toolchain `{}`", tc_desc.label))?;
        let mut toolchain = Toolchain::new(label);
        for tool_desc in &tc_desc.tools {
            toolchain.add_tool(
                build_tool(tool_desc)
                    .with_context(|| format!("tool `{}` of `{}`", tool_desc.kind, tc_desc.label))?,
            );
        }
        let idx = graph.add_toolchain(toolchain);
        toolchain_indices.insert(tc_desc.label.clone(), idx);
    }
    if let Some(default) = &desc.default_toolchain {
        let idx = toolchain_indices
            .get(default)
            .with_context(|| format!("default toolchain `{}` is not declared", default))?;
        graph.set_default_toolchain(*idx);
    }

    // Pass one: create every target so labels resolve to indices.
    let mut target_indices: Vec<TargetIndex> = Vec::with_capacity(desc.targets.len());
    for target_desc in &desc.targets {
        let target = build_target(target_desc, &toolchain_indices, &graph)
            .with_context(|| format!("target `{}`", target_desc.label))?;
        target_indices.push(graph.add_target(target)?);
    }

    // Pass two: wire the four dependency vectors.
    for (target_desc, idx) in desc.targets.iter().zip(&target_indices) {
        let wire = |graph: &TargetGraph, dep: &str| -> anyhow::Result<LabelTargetPair> {
            let label = Label::parse(dep)?;
            let target = graph
                .target_by_label(&label)
                .with_context(|| format!("dependency `{}` of `{}` is not in the graph", dep, target_desc.label))?;
            Ok(LabelTargetPair::new(label, target))
        };
        let mut public_deps = Vec::new();
        for dep in &target_desc.public_deps {
            public_deps.push(wire(&graph, dep)?);
        }
        let mut private_deps = Vec::new();
        for dep in &target_desc.deps {
            private_deps.push(wire(&graph, dep)?);
        }
        let mut data_deps = Vec::new();
        for dep in &target_desc.data_deps {
            data_deps.push(wire(&graph, dep)?);
        }
        let mut gen_deps = Vec::new();
        for dep in &target_desc.gen_deps {
            gen_deps.push(wire(&graph, dep)?);
        }
        let target = graph.target_mut(*idx);
        *target.public_deps_mut() = public_deps;
        *target.private_deps_mut() = private_deps;
        *target.data_deps_mut() = data_deps;
        *target.gen_deps_mut() = gen_deps;
    }

    Ok((graph, build_dir))
}

fn build_target(
    desc: &TargetDesc,
    toolchain_indices: &BTreeMap<String, ToolchainIndex>,
    graph: &TargetGraph,
) -> anyhow::Result<Target> {
    let label = Label::parse(&desc.label)?;
    let mut target = Target::new(label, parse_output_type(&desc.output_type)?);

    match &desc.toolchain {
        Some(tc) => {
            let idx = toolchain_indices
                .get(tc)
                .with_context(|| format!("toolchain `{}` is not declared", tc))?;
            target.set_toolchain(*idx);
        }
        None => {
            let idx = graph
                .default_toolchain()
                .context("no toolchain declared in the graph")?;
            target.set_toolchain(idx);
        }
    }

    for source in &desc.sources {
        let file = SourceFile::new(source.as_str())?;
        target.source_types_used_mut().set(file.source_type());
        target.sources_mut().push(file);
    }

    if let Some(name) = &desc.output_name {
        target.set_output_name(name);
    }
    if let Some(ext) = &desc.output_extension {
        target.set_output_extension(ext);
    }
    if let Some(dir) = &desc.output_dir {
        target.set_output_dir(SourceDir::new(dir.as_str())?);
    }
    for config in &desc.configs {
        target.configs_mut().push(Label::parse(config)?);
    }
    for config in &desc.public_configs {
        target.public_configs_mut().push(Label::parse(config)?);
    }
    for config in &desc.all_dependent_configs {
        target.all_dependent_configs_mut().push(Label::parse(config)?);
    }

    if let Some(root) = &desc.crate_root {
        target.rust_values_mut().set_crate_root(SourceFile::new(root.as_str())?);
    }
    if let Some(name) = &desc.crate_name {
        target.rust_values_mut().set_crate_name(name);
    }
    if let Some(crate_type) = &desc.crate_type {
        target.rust_values_mut().set_crate_type(parse_crate_type(crate_type)?);
    }
    for (dep, rename) in &desc.aliased_deps {
        target
            .rust_values_mut()
            .aliased_deps_mut()
            .insert(Label::parse(dep)?, rename.clone());
    }

    {
        let values = target.config_values_mut();
        values.cflags_mut().extend(desc.cflags.iter().cloned());
        values.cflags_c_mut().extend(desc.cflags_c.iter().cloned());
        values.cflags_cc_mut().extend(desc.cflags_cc.iter().cloned());
        values.defines_mut().extend(desc.defines.iter().cloned());
        values.ldflags_mut().extend(desc.ldflags.iter().cloned());
        values.rustflags_mut().extend(desc.rustflags.iter().cloned());
        values.rustenv_mut().extend(desc.rustenv.iter().cloned());
        for dir in &desc.include_dirs {
            values.include_dirs_mut().push(SourceDir::new(dir.as_str())?);
        }
        for dir in &desc.lib_dirs {
            values.lib_dirs_mut().push(SourceDir::new(dir.as_str())?);
        }
        for input in &desc.inputs {
            values.inputs_mut().push(SourceFile::new(input.as_str())?);
        }
        for lib in &desc.libs {
            values.libs_mut().push(parse_lib_file(lib));
        }
        for ext in &desc.externs {
            values
                .externs_mut()
                .push((ext.name.clone(), parse_lib_file(&ext.path)));
        }
    }

    if let Some(script) = &desc.script {
        target.action_values_mut().set_script(SourceFile::new(script.as_str())?);
    }
    if !desc.args.is_empty() {
        let args = desc
            .args
            .iter()
            .map(|a| SubstitutionPattern::parse(a))
            .collect::<Result<_, _>>()?;
        target.action_values_mut().set_args(args);
    }
    if !desc.outputs.is_empty() {
        let outputs = desc
            .outputs
            .iter()
            .map(|o| SubstitutionPattern::parse(o))
            .collect::<Result<_, _>>()?;
        target.action_values_mut().set_outputs(outputs);
    }
    if let Some(depfile) = &desc.depfile {
        target.action_values_mut().set_depfile(SubstitutionPattern::parse(depfile)?);
    }

    if let Some(contents) = &desc.contents {
        target.set_contents(json_to_metadata_value(contents)?);
    }
    if let Some(conversion) = &desc.output_conversion {
        target.set_output_conversion(match conversion.as_str() {
            "json" => OutputConversion::Json,
            "" | "list lines" => OutputConversion::ListLines,
            other => anyhow::bail!("unknown output conversion `{}`", other),
        });
    }
    target.data_keys_mut().extend(desc.data_keys.iter().cloned());
    target.walk_keys_mut().extend(desc.walk_keys.iter().cloned());
    target.set_rebase(desc.rebase);

    for (key, value) in &desc.metadata {
        target
            .metadata_mut()
            .contents_mut()
            .insert(key.clone(), json_to_metadata_value(value)?);
    }
    if let Some(dir) = &desc.metadata_source_dir {
        target.metadata_mut().set_source_dir(SourceDir::new(dir.as_str())?);
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use gen2_core::build_settings::BuildSettings;
    use gen2_ninja::ninja_build_writer::run_and_write_files;

    use super::*;

    const GRAPH: &str = r#"{
        "build_dir": "//out/Debug/",
        "toolchains": [
            {
                "label": "//toolchain:default",
                "tools": [
                    {
                        "kind": "stamp",
                        "command": "touch {{output}}"
                    },
                    {
                        "kind": "rust_bin",
                        "command": "{{rustenv}} rustc --crate-name {{crate_name}} {{source}} --crate-type {{crate_type}} {{rustflags}} -o {{output}} {{rustdeps}} {{externs}}",
                        "outputs": ["{{root_out_dir}}/{{crate_name}}{{output_extension}}"]
                    },
                    {
                        "kind": "rust_rlib",
                        "command": "{{rustenv}} rustc --crate-name {{crate_name}} {{source}} --crate-type {{crate_type}} {{rustflags}} -o {{output}} {{rustdeps}} {{externs}}",
                        "outputs": ["{{target_out_dir}}/{{target_output_name}}{{output_extension}}"],
                        "output_prefix": "lib",
                        "default_output_extension": ".rlib"
                    }
                ]
            }
        ],
        "targets": [
            {
                "label": "//lib:util",
                "type": "rust_library",
                "sources": ["//lib/lib.rs"],
                "crate_root": "//lib/lib.rs",
                "crate_name": "util"
            },
            {
                "label": "//app:main",
                "type": "executable",
                "sources": ["//app/main.rs"],
                "crate_root": "//app/main.rs",
                "crate_name": "app_main",
                "deps": ["//lib:util"]
            }
        ]
    }"#;

    #[test]
    fn loads_and_generates_end_to_end() {
        let desc: GraphFile = serde_json::from_str(GRAPH).unwrap();
        let (graph, build_dir) = build_graph(&desc).unwrap();
        assert_eq!(graph.target_count(), 2);
        assert_eq!(build_dir.as_str(), "//out/Debug/");

        let dir = tempfile::tempdir().unwrap();
        let settings = BuildSettings::new(dir.path().to_path_buf(), build_dir);
        run_and_write_files(graph, &settings).unwrap();

        let out_root = dir.path().join("out").join("Debug");
        let master = std::fs::read_to_string(out_root.join("build.ninja")).unwrap();
        assert!(master.contains("subninja toolchain.ninja"));
        let sub =
            std::fs::read_to_string(out_root.join("obj").join("app").join("main.ninja")).unwrap();
        assert!(sub.contains("build ./app_main: rust_bin ../../app/main.rs"));
        assert!(sub.contains("  externs = --extern util=obj/lib/libutil.rlib\n"));
    }

    #[test]
    fn unknown_dependency_is_an_error() {
        let mut desc: GraphFile = serde_json::from_str(GRAPH).unwrap();
        desc.targets[1].deps.push("//missing:nothing".to_owned());
        let err = build_graph(&desc).unwrap_err();
        assert!(err.to_string().contains("not in the graph"));
    }
}
