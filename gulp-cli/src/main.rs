//! gulp: mirror an org's metadata into `.apexlink/gulp`.
//!
//! # Usage
//!
//! ```text
//! gulp sync [--workspace DIR] [--namespaces a,b] [--dry-run] [--debug]
//! gulp diff [--workspace DIR] [--namespaces a,b]
//! gulp packages [--workspace DIR] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, packages::PackagesArgs, sync::SyncArgs};

#[derive(Parser, Debug)]
#[command(
    name = "gulp",
    version,
    about = "Download org metadata into a local mirror for offline analysis",
    long_about = None,
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull metadata and reconcile the local mirror.
    Sync(SyncArgs),

    /// Show unified diffs of what sync would change.
    Diff(DiffArgs),

    /// List installed managed packages and their namespaces.
    Packages(PackagesArgs),
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    match cli.command {
        Commands::Sync(args) => args.run().await,
        Commands::Diff(args) => args.run().await,
        Commands::Packages(args) => args.run().await,
    }
}
