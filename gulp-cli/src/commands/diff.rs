//! `gulp diff`: show what `gulp sync` would change.

use anyhow::{Context, Result};
use clap::Args;

use gulp_metadata::pipeline;

use super::{requested_namespaces, WorkspaceArgs};

/// Arguments for `gulp diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Managed namespaces to include (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub namespaces: Vec<String>,
}

impl DiffArgs {
    pub async fn run(self) -> Result<()> {
        let config = self.workspace.config()?;
        let client = self.workspace.client(&config)?;
        let namespaces = requested_namespaces(&self.namespaces, &config);

        let gathered = pipeline::gather(&client, &self.workspace.workspace, &namespaces)
            .await
            .context("gulp diff failed")?;
        let diffs = gathered
            .store
            .diff()
            .context("failed to compare with the mirror")?;

        if diffs.is_empty() {
            println!("No differences.");
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        Ok(())
    }
}
