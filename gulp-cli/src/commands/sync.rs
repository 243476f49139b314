//! `gulp sync`: pull metadata and reconcile the mirror.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gulp_metadata::pipeline;
use gulp_sync::{store_root_at, SyncReport, WriteResult};

use super::{requested_namespaces, WorkspaceArgs};

/// Arguments for `gulp sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Managed namespaces to include (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub namespaces: Vec<String>,

    /// Report what would change without touching the mirror.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub async fn run(self) -> Result<()> {
        let config = self.workspace.config()?;
        let client = self.workspace.client(&config)?;
        let namespaces = requested_namespaces(&self.namespaces, &config);
        tracing::debug!(instance = client.instance_url(), "connecting");

        let report = pipeline::run(&client, &self.workspace.workspace, &namespaces, self.dry_run)
            .await
            .context("gulp sync failed")?;

        print_report(&store_root_at(&self.workspace.workspace), &report, self.dry_run);
        Ok(())
    }
}

fn print_report(root: &Path, report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if report.is_noop() {
        println!(
            "{prefix}✓ mirror up to date ({} files)",
            report.unchanged()
        );
        return;
    }

    println!(
        "{prefix}✓ {} ({} written, {} unchanged, {} deleted)",
        root.display(),
        report.written(),
        report.unchanged(),
        report.deleted()
    );

    for result in &report.results {
        let path = result.path().strip_prefix(root).unwrap_or(result.path());
        match result {
            WriteResult::Written { .. } => println!("  {}  {}", "✎".green(), path.display()),
            WriteResult::WouldWrite { .. } => println!("  {}  {}", "~".yellow(), path.display()),
            WriteResult::Deleted { .. } => println!("  {}  {}", "✗".red(), path.display()),
            WriteResult::WouldDelete { .. } => println!("  {}  {}", "-".red(), path.display()),
            WriteResult::Unchanged { .. } => {}
        }
    }
}
