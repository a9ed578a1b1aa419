//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{play, script_cmd};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "botscript")]
#[command(author, version, about = "Branching message scripts for chat bots")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a .botscript directory with default configuration
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Load a script and report unreachable posts, dead ends and inert rules
    Check {
        /// Script file (defaults to the built-in sample)
        file: Option<PathBuf>,

        /// Exit with an error if any finding is reported
        #[arg(long)]
        strict: bool,
    },

    /// Print the transition graph in Graphviz DOT
    Graph {
        /// Script file (defaults to the built-in sample)
        file: Option<PathBuf>,
    },

    /// Load a script, converting voice and round media with ffmpeg
    Prepare {
        /// Script file
        file: PathBuf,
    },

    /// Walk through a script in the terminal, reading replies from stdin
    Play {
        /// Script file (defaults to the built-in sample)
        file: Option<PathBuf>,
    },

    /// List the posts of the built-in sample script
    Sample,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "botscript=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // a subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;
    let format = cli
        .format
        .unwrap_or_else(|| config.global.default_format.into());
    let output = Output::new(format);

    debug!(project_root = ?config.project_root, "configuration loaded");

    match cli.command {
        Commands::Init { path } => {
            let config_path = Config::init_project(&path)?;
            output.success(&format!("Initialized botscript project at {}", path.display()));
            debug!(config = %config_path.display(), "project config written");
        }

        Commands::Check { file, strict } => script_cmd::check(&output, &config, file.as_deref(), strict)?,
        Commands::Graph { file } => script_cmd::graph(&output, &config, file.as_deref())?,
        Commands::Prepare { file } => script_cmd::prepare(&output, &config, &file)?,
        Commands::Play { file } => play::run(&output, &config, file.as_deref())?,
        Commands::Sample => script_cmd::sample(&output)?,
    }

    Ok(())
}
