#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use commands::generate::GenerateArgs;
use miette::Result;
use nodepin_core::config::{Channel, Dialect, DEFAULT_MAX_PARALLEL};
use nodepin_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nodepin")]
#[command(author, version, about = "Offline source manifests from npm and yarn lockfiles", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Lockfile dialect (npm or yarn)
    dialect: Dialect,

    /// Path to package-lock.json or yarn.lock
    lockfile: PathBuf,

    /// Where to write the manifest
    #[arg(short, long, default_value = "generated-sources.json")]
    output: PathBuf,

    /// Skip development-only dependencies
    #[arg(long)]
    no_devel: bool,

    /// Maximum number of packages processed at once
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_PARALLEL)]
    max_parallel: usize,

    /// Write the manifest and exit successfully despite fetch failures
    #[arg(long)]
    keep_going: bool,

    /// Also emit node headers for this target version
    #[arg(long, value_name = "VERSION")]
    node_headers: Option<String>,

    /// Runtime the extra headers are for (node or electron)
    #[arg(long, value_name = "RUNTIME", requires = "node_headers")]
    node_runtime: Option<String>,

    /// Cache channel
    #[arg(long, value_parser = parse_channel, default_value = "stable")]
    channel: Channel,
}

fn parse_channel(s: &str) -> std::result::Result<Channel, String> {
    match s {
        "stable" => Ok(Channel::Stable),
        "nightly" => Ok(Channel::Nightly),
        "dev" => Ok(Channel::Dev),
        other => Err(format!("unknown channel '{other}'")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_channel(cli.channel)
        .with_max_parallel(cli.max_parallel);

    logging::init(config.verbosity, config.json_logs);

    let args = GenerateArgs {
        dialect: cli.dialect,
        lockfile: config.resolve_path(&cli.lockfile),
        output: config.resolve_path(&cli.output),
        no_devel: cli.no_devel,
        keep_going: cli.keep_going,
        node_headers: cli.node_headers,
        node_runtime: cli.node_runtime,
    };

    commands::generate::run(&config, &args, cli.json)
}
