//! Guardian CLI
//!
//! Command-line simulator for the guardian SOS pipeline. Transports print to
//! the console instead of reaching a carrier or push service.
//!
//! # Usage
//!
//! ```bash
//! # Replay a recorded sensor trace through the classifier
//! guardian classify --trace walk.json
//!
//! # Run one SOS dispatch, cancelling after two seconds
//! guardian sos --contacts contacts.json --cancel-after-ms 2000
//!
//! # Write the default configuration
//! guardian config --write guardian.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use guardian_sos::GuardianConfig;

pub mod classify;
pub mod console;
pub mod sos;

/// Guardian Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "guardian")]
#[command(author, version, about = "Personal safety SOS simulator")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a motion trace through the anomaly classifier
    Classify(classify::ClassifyArgs),

    /// Run one SOS countdown and dispatch against console transports
    Sos(sos::SosArgs),

    /// Write the default configuration
    Config(ConfigArgs),

    /// Display version information
    Version,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Destination file
    #[arg(short, long)]
    pub write: PathBuf,
}

/// Load `path`, or the defaults when no file is given
pub fn load_config(path: Option<&Path>) -> anyhow::Result<GuardianConfig> {
    match path {
        Some(path) => GuardianConfig::from_json(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(GuardianConfig::default()),
    }
}

/// Write the default configuration to `args.write`
pub fn write_default_config(args: &ConfigArgs) -> anyhow::Result<()> {
    GuardianConfig::default()
        .to_json(&args.write)
        .with_context(|| format!("writing config to {}", args.write.display()))?;
    println!("Wrote default configuration to {}", args.write.display());
    Ok(())
}
