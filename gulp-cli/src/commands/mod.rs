pub mod diff;
pub mod packages;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use gulp_client::{ClientSettings, SalesforceClient};
use gulp_core::{config, GulpConfig, Namespace};

/// Options shared by every command.
#[derive(Args, Debug)]
pub struct WorkspaceArgs {
    /// Workspace directory holding `.apexlink/`.
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,
}

impl WorkspaceArgs {
    /// Workspace config, falling back to `~/.apexlink/gulp.yaml`, with
    /// `GULP_*` environment overrides applied.
    pub fn config(&self) -> Result<GulpConfig> {
        let home = dirs::home_dir();
        let config = config::load_at(&self.workspace, home.as_deref())
            .context("failed to load gulp configuration")?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn client(&self, config: &GulpConfig) -> Result<SalesforceClient> {
        let settings = ClientSettings::from_config(config).context("incomplete gulp configuration")?;
        Ok(SalesforceClient::new(settings))
    }
}

/// `--namespaces` when given, otherwise the configured list.
pub fn requested_namespaces(cli: &[String], config: &GulpConfig) -> Vec<Namespace> {
    if cli.is_empty() {
        config.namespaces.clone()
    } else {
        cli.iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(Namespace::from)
            .collect()
    }
}
