//! `guardian`: personal-safety SOS toolkit.
//!
//! - `classify` replays a recorded motion trace and prints detected anomalies
//! - `sos` runs one countdown and fan-out against console transports
//! - `config` writes the default TOML configuration
//! - `version` prints the CLI and core library versions
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use guardian_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify(args) => guardian_cli::classify::execute(args)?,
        Commands::Sos(args) => guardian_cli::sos::execute(args).await?,
        Commands::Config(args) => guardian_cli::write_default_config(&args)?,
        Commands::Version => {
            println!("guardian {}", env!("CARGO_PKG_VERSION"));
            println!("SOS core version: {}", guardian_sos::VERSION);
        }
    }

    Ok(())
}
