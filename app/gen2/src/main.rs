/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The command-line wrapper: load a graph description, resolve it, emit the
//! build files, report structured errors.

mod graph_file;

use std::path::PathBuf;
use std::process;

use anyhow::Context as _;
use clap::Parser;
use gen2_core::build_settings::BuildSettings;
use gen2_core::error::BuildError;
use gen2_core::source_file::SourceDir;
use gen2_ninja::ninja_build_writer;

#[derive(Debug, clap::Parser)]
#[clap(
    name = "gen2",
    about = "Generates ninja files from a resolved build graph"
)]
struct Opt {
    /// How chatty to be: 0 = warnings only, 1 = info, 2+ = debug.
    #[clap(short, long, parse(from_occurrences), global = true)]
    verbose: usize,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Generate build files into the build directory.
    Gen(GenArgs),
}

#[derive(Debug, clap::Args)]
struct GenArgs {
    /// The graph description produced by the front-end.
    #[clap(long, value_name = "FILE")]
    graph: PathBuf,

    /// The directory `//` refers to. Defaults to the current directory.
    #[clap(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Require at least one target whose label contains this substring.
    #[clap(long, value_name = "SUBSTRING")]
    filter: Option<String>,

    /// Overrides the build directory declared in the graph file
    /// (source-absolute, e.g. //out/Release).
    #[clap(value_name = "BUILD_DIR")]
    build_dir: Option<String>,
}

enum RunError {
    Setup(anyhow::Error),
    Build(Vec<BuildError>),
}

impl From<anyhow::Error> for RunError {
    fn from(e: anyhow::Error) -> RunError {
        RunError::Setup(e)
    }
}

fn main() {
    let opt = Opt::parse();
    init_tracing(opt.verbose);
    let code = match opt.command {
        Command::Gen(args) => match run_gen(args) {
            Ok(()) => 0,
            Err(RunError::Setup(e)) => {
                eprintln!("ERROR: {:#}", e);
                1
            }
            Err(RunError::Build(errors)) => {
                for e in errors {
                    eprint!("{}", e.render());
                }
                1
            }
        },
    };
    process::exit(code);
}

fn init_tracing(verbose: usize) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_gen(args: GenArgs) -> Result<(), RunError> {
    let data = std::fs::read_to_string(&args.graph)
        .with_context(|| format!("reading {}", args.graph.display()))?;
    let desc: graph_file::GraphFile = serde_json::from_str(&data)
        .with_context(|| format!("parsing {}", args.graph.display()))?;

    let (graph, build_dir) = graph_file::build_graph(&desc)?;
    let build_dir = match &args.build_dir {
        Some(dir) => SourceDir::new(dir.as_str()).map_err(anyhow::Error::from)?,
        None => build_dir,
    };

    if let Some(filter) = &args.filter {
        let matching = graph
            .targets()
            .filter(|(_, t)| t.label().user_visible_name(false).contains(filter.as_str()))
            .count();
        if matching == 0 {
            return Err(RunError::Setup(anyhow::anyhow!(
                "no target matches the filter `{}`",
                filter
            )));
        }
        tracing::info!(%filter, matching, "filter matched");
    }

    let root = match &args.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("getting the current directory")?,
    };
    let settings = BuildSettings::new(root, build_dir);

    tracing::info!(
        targets = graph.target_count(),
        build_dir = %settings.build_dir(),
        "generating"
    );
    ninja_build_writer::run_and_write_files(graph, &settings).map_err(RunError::Build)
}
