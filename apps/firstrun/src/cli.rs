//! Command line interface definition

use clap::{Parser, Subcommand};
use firstrun_types::ColorChoice;
use std::path::PathBuf;

/// firstrun - provision a device from a locally staged app repository
#[derive(Parser)]
#[command(name = "firstrun")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Provision a device from a locally staged app repository")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Repository directory (overrides config and FIRSTRUN_REPO)
    #[arg(long, global = true, value_name = "DIR")]
    pub repo: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// List the apps the repository offers
    #[command(alias = "ls")]
    List {
        /// Category to list instead of the default selection
        #[arg(long)]
        category: Option<String>,
    },

    /// Check whether the repository can be provisioned from
    Verify,

    /// Install the selected apps and wait until provisioning completes
    Provision {
        /// Category to provision instead of the default selection
        #[arg(long)]
        category: Option<String>,

        /// Install only these package ids
        #[arg(long = "only", value_name = "PACKAGE_ID")]
        only: Vec<String>,

        /// Seconds to wait for installs to report back
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}

impl Commands {
    /// Get command name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Commands::List { .. } => "list",
            Commands::Verify => "verify",
            Commands::Provision { .. } => "provision",
        }
    }
}
