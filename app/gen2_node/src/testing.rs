/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Helpers for tests: a graph with a fully populated default toolchain and a
//! conventional build directory (`//out/Debug/`).

use std::path::PathBuf;

use gen2_core::build_settings::BuildSettings;
use gen2_core::error::BuildError;
use gen2_core::label::Label;
use gen2_core::source_file::SourceDir;

use crate::graph::TargetGraph;
use crate::graph::TargetIndex;
use crate::graph::ToolchainIndex;
use crate::target::OutputType;
use crate::target::Target;
use crate::toolchain::Tool;
use crate::toolchain::ToolKind;
use crate::toolchain::Toolchain;

pub struct TestSetup {
    pub graph: TargetGraph,
    pub settings: BuildSettings,
    pub toolchain: ToolchainIndex,
}

impl TestSetup {
    pub fn new() -> TestSetup {
        let settings = BuildSettings::new(
            PathBuf::from("/src"),
            SourceDir::unchecked_new("//out/Debug/"),
        );
        let mut graph = TargetGraph::new();
        let toolchain = graph.add_toolchain(testing_toolchain(
            Label::parse("//toolchain:default").unwrap(),
            false,
        ));
        TestSetup {
            graph,
            settings,
            toolchain,
        }
    }

    /// A second toolchain whose solink produces a `.TOC` companion next to
    /// the shared library.
    pub fn add_toolchain_with_toc(&mut self) -> ToolchainIndex {
        self.graph.add_toolchain(testing_toolchain(
            Label::parse("//toolchain_with_toc:with_toc").unwrap(),
            true,
        ))
    }

    /// A target wired to the default toolchain.
    pub fn target(&self, label: &str, output_type: OutputType) -> Target {
        let mut t = Target::new(Label::parse(label).unwrap(), output_type);
        t.set_toolchain(self.toolchain);
        t
    }

    pub fn add_target(&mut self, target: Target) -> TargetIndex {
        self.graph.add_target(target).unwrap()
    }

    pub fn resolve(&mut self) -> Vec<BuildError> {
        self.graph.resolve_all(&self.settings)
    }

    /// Resolution must succeed in most tests.
    pub fn resolve_ok(&mut self) {
        let errors = self.resolve();
        assert!(errors.is_empty(), "unexpected resolve errors: {:?}", errors);
    }
}

impl Default for TestSetup {
    fn default() -> Self {
        TestSetup::new()
    }
}

const RUST_COMMAND: &str = "{{rustenv}} rustc --crate-name {{crate_name}} {{source}} \
     --crate-type {{crate_type}} {{rustflags}} -o {{output}} {{rustdeps}} {{externs}}";

fn tool(kind: ToolKind, command: &str) -> Tool {
    Tool::new(kind, command).unwrap()
}

/// The tool definitions every test assumes, patterned after what a real
/// minimal toolchain declares.
pub fn testing_toolchain(label: Label, solink_with_toc: bool) -> Toolchain {
    let mut tc = Toolchain::new(label);

    let mut cc = tool(
        ToolKind::Cc,
        "cc {{source}} {{cflags}} {{cflags_c}} {{defines}} {{include_dirs}} -o {{output}}",
    );
    cc.set_outputs(&["{{target_out_dir}}/{{target_output_name}}.{{source_name_part}}.o"])
        .unwrap();
    tc.add_tool(cc);

    let mut cxx = tool(
        ToolKind::Cxx,
        "c++ {{source}} {{cflags}} {{cflags_cc}} {{defines}} {{include_dirs}} -o {{output}}",
    );
    cxx.set_outputs(&["{{target_out_dir}}/{{target_output_name}}.{{source_name_part}}.o"])
        .unwrap();
    tc.add_tool(cxx);

    let mut alink = tool(ToolKind::Alink, "ar {{output}} {{source}}");
    alink.set_outputs(&["{{target_out_dir}}/{{target_output_name}}.a"]).unwrap();
    alink.set_output_prefix("lib");
    tc.add_tool(alink);

    let mut solink = tool(ToolKind::Solink, "ld -shared -o {{output}} {{ldflags}} {{libs}}");
    if solink_with_toc {
        solink
            .set_outputs(&[
                "{{root_out_dir}}/{{target_output_name}}{{output_extension}}",
                "{{root_out_dir}}/{{target_output_name}}{{output_extension}}.TOC",
            ])
            .unwrap();
        solink
            .set_link_output("{{root_out_dir}}/{{target_output_name}}{{output_extension}}")
            .unwrap();
        solink
            .set_depend_output("{{root_out_dir}}/{{target_output_name}}{{output_extension}}.TOC")
            .unwrap();
    } else {
        solink
            .set_outputs(&["{{root_out_dir}}/{{target_output_name}}{{output_extension}}"])
            .unwrap();
    }
    solink.set_output_prefix("lib");
    solink.set_default_output_extension(".so");
    tc.add_tool(solink);

    let mut link = tool(ToolKind::Link, "ld -o {{output}} {{ldflags}} {{libs}}");
    link.set_outputs(&["{{root_out_dir}}/{{target_output_name}}{{output_extension}}"])
        .unwrap();
    tc.add_tool(link);

    let mut stamp = tool(ToolKind::Stamp, "touch {{output}}");
    stamp.set_outputs(&[]).unwrap();
    tc.add_tool(stamp);

    let mut copy = tool(ToolKind::Copy, "cp {{source}} {{output}}");
    copy.set_outputs(&[]).unwrap();
    tc.add_tool(copy);

    let mut rust_bin = tool(ToolKind::RustBin, RUST_COMMAND);
    rust_bin
        .set_outputs(&["{{root_out_dir}}/{{crate_name}}{{output_extension}}"])
        .unwrap();
    tc.add_tool(rust_bin);

    for (kind, ext) in [
        (ToolKind::RustRlib, ".rlib"),
        (ToolKind::RustDylib, ".so"),
        (ToolKind::RustCdylib, ".so"),
        (ToolKind::RustMacro, ".so"),
        (ToolKind::RustStaticlib, ".a"),
    ] {
        let mut t = tool(kind, RUST_COMMAND);
        t.set_outputs(&["{{target_out_dir}}/{{target_output_name}}{{output_extension}}"])
            .unwrap();
        t.set_output_prefix("lib");
        t.set_default_output_extension(ext);
        tc.add_tool(t);
    }

    tc
}
