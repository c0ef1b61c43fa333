//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// fetchr - fetch files over HTTP, an anonymizing overlay or a paired device
#[derive(Parser)]
#[command(name = "fetchr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch files over HTTP, an anonymizing overlay or a paired device")]
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

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Download a URL
    #[command(alias = "g")]
    Get(GetArgs),

    /// Show which transport a URL would use
    Route {
        /// URL to inspect
        url: String,
    },
}

#[derive(Args)]
pub struct GetArgs {
    /// Source URL (http, https or bluetooth)
    pub url: String,

    /// Destination file; a fresh scratch file when omitted
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Run in the background, delegating to the native facility when possible
    #[arg(long = "async")]
    pub background: bool,

    /// Cache tag from a previous download; skips the body when unchanged
    #[arg(long, value_name = "TAG", conflicts_with = "background")]
    pub etag: Option<String>,

    /// Expected BLAKE3 digest of the finished file (hex)
    #[arg(long, value_name = "HEX", conflicts_with = "background")]
    pub blake3: Option<String>,

    /// Title shown by the native download facility
    #[arg(long, requires = "background")]
    pub title: Option<String>,

    /// Identifier correlating events of this download
    #[arg(long, requires = "background")]
    pub id: Option<String>,
}
