//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docsmith - Help file build engine
#[derive(Parser)]
#[command(name = "docsmith")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Help file build engine")]
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
    /// Output line-delimited JSON events instead of styled text
    #[arg(long, global = true)]
    pub json: bool,

    /// Show debug events from the build tools
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a help file build from a build file
    #[command(alias = "b")]
    Build {
        /// Path to the build file (.toml)
        build_file: PathBuf,
    },

    /// List the build step catalog in execution order
    Steps,
}
