//! xcproj: format, check, inspect and edit Xcode project documents.

mod commands;
mod manifest;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "xcproj", version, about = "Xcode project document tool")]
struct Cli {
    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a project document in canonical form
    Fmt {
        /// Path to project.pbxproj
        file: PathBuf,
        /// Report whether the file is canonical without writing it
        #[arg(long)]
        check: bool,
    },
    /// Parse and validate a project document
    Check {
        /// Path to project.pbxproj
        file: PathBuf,
    },
    /// List the objects of a project document
    Inspect {
        /// Path to project.pbxproj
        file: PathBuf,
        /// Only objects of this kind (e.g. PBXNativeTarget)
        #[arg(long)]
        kind: Option<String>,
        /// Print JSON instead of one line per object
        #[arg(long)]
        json: bool,
    },
    /// Apply the capabilities listed in xcproj.toml
    Apply {
        /// Manifest path (default: search upward for xcproj.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number new objects 000000000000000000000001, 2, ...
        #[arg(long)]
        deterministic_ids: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "xcproj=debug" } else { "xcproj=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Fmt { file, check } => commands::fmt::run(&file, check),
        Commands::Check { file } => commands::check::run(&file),
        Commands::Inspect { file, kind, json } => {
            commands::inspect::run(&file, kind.as_deref(), json)
        }
        Commands::Apply {
            config,
            deterministic_ids,
        } => {
            let cwd = std::env::current_dir()?;
            commands::apply::run(&cwd, config.as_deref(), deterministic_ids)
        }
    }
}
