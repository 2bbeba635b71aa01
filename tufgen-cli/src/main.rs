//! tufgen - signed TUF repository fixtures for package-repository client tests
//!
//! Thin driver around tufgen-core: pick a fixture flavor, run it against the
//! current (or given) repository directory, exit on the first error.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tufgen_core::fixture::{self, ALL_FIXTURE_ROLES, PASSPHRASE};
use tufgen_core::KeyStore;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "tufgen",
    about = "Generate signed TUF repository fixtures for client test suites",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Repository directory to operate in
    #[clap(long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the basic fixture: four top-level roles, two targets,
    /// reproducible signatures (fails if metadata/ already exists)
    Basic,

    /// Generate the delegated fixture: top-level roles plus the
    /// package_metadata and package delegated roles (replaces metadata/)
    Delegated,

    /// Create passphrase-protected key pairs under keys/
    Keygen {
        /// Role names to create keys for (defaults to every role the two
        /// fixtures use)
        #[clap(long, value_delimiter = ',')]
        roles: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_filter_directive())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(command = ?cli.command, dir = %cli.dir.display(), "Parsed command line");

    match cli.command {
        Command::Basic => {
            let live = fixture::generate_basic(&cli.dir)
                .with_context(|| format!("Basic fixture failed in {}", cli.dir.display()))?;
            println!("Published basic fixture metadata to {}", live.display());
        }
        Command::Delegated => {
            let live = fixture::generate_delegated(&cli.dir)
                .with_context(|| format!("Delegated fixture failed in {}", cli.dir.display()))?;
            println!("Published delegated fixture metadata to {}", live.display());
        }
        Command::Keygen { roles } => {
            let roles = if roles.is_empty() {
                ALL_FIXTURE_ROLES.iter().map(|r| r.to_string()).collect()
            } else {
                roles
            };
            let store = KeyStore::new(&cli.dir, PASSPHRASE);
            for role in &roles {
                store
                    .generate(role)
                    .with_context(|| format!("Key generation failed for role '{role}'"))?;
                println!("Generated key pair for role '{role}'");
            }
        }
    }

    Ok(())
}
