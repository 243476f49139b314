//! `gulp packages`: installed package namespaces.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use gulp_metadata::{list_packages, PackageInfo};

use super::WorkspaceArgs;

/// Arguments for `gulp packages`.
#[derive(Args, Debug)]
pub struct PackagesArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "namespace")]
    namespace: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "description")]
    description: String,
}

impl PackagesArgs {
    pub async fn run(self) -> Result<()> {
        let config = self.workspace.config()?;
        let client = self.workspace.client(&config)?;
        let packages = list_packages(&client)
            .await
            .context("failed to list installed packages")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&packages).context("failed to serialize packages")?
            );
            return Ok(());
        }
        print_table(packages);
        Ok(())
    }
}

fn print_table(packages: Vec<PackageInfo>) {
    if packages.is_empty() {
        println!("No namespaced packages installed.");
        return;
    }
    let rows: Vec<PackageRow> = packages
        .into_iter()
        .map(|p| PackageRow {
            namespace: p.namespace.to_string(),
            name: p.name,
            description: p.description,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
