//! Workspace configuration.
//!
//! # Storage layout
//!
//! ```text
//! <workspace>/.apexlink/gulp.yaml   (preferred)
//! <home>/.apexlink/gulp.yaml        (fallback)
//! ```
//!
//! Both files are optional; missing files yield [`GulpConfig::default`].
//! `GULP_INSTANCE_URL`, `GULP_ACCESS_TOKEN` and `GULP_API_VERSION` override
//! whatever the file says.
//!
//! Tests must use the `_at` forms with a `TempDir`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::Namespace;

pub const CONFIG_DIR: &str = ".apexlink";
pub const CONFIG_FILE: &str = "gulp.yaml";

/// Settings for one gulp workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GulpConfig {
    pub instance_url: Option<String>,
    pub access_token: Option<String>,
    pub api_version: String,
    /// Namespaces gulped when the command line does not name any.
    pub namespaces: Vec<Namespace>,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
}

impl Default for GulpConfig {
    fn default() -> Self {
        Self {
            instance_url: None,
            access_token: None,
            api_version: "58.0".to_string(),
            namespaces: Vec::new(),
            request_timeout_secs: 120,
            poll_interval_secs: 15,
            poll_timeout_secs: 10 * 60,
        }
    }
}

impl GulpConfig {
    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("GULP_INSTANCE_URL") {
            self.instance_url = Some(url);
        }
        if let Some(token) = lookup("GULP_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(version) = lookup("GULP_API_VERSION") {
            self.api_version = version;
        }
        self
    }

    pub fn require_instance_url(&self) -> Result<&str, ConfigError> {
        self.instance_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("instance_url"))
    }

    pub fn require_access_token(&self) -> Result<&str, ConfigError> {
        self.access_token
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("access_token"))
    }
}

/// `<root>/.apexlink/gulp.yaml`. Pure, no I/O.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Load a single config file; `Ok(None)` if absent.
pub fn load_file(path: &Path) -> Result<Option<GulpConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Load config for `workspace`, falling back to `home`, then to defaults.
/// Environment overrides are not applied here.
pub fn load_at(workspace: &Path, home: Option<&Path>) -> Result<GulpConfig, ConfigError> {
    if let Some(config) = load_file(&config_path_at(workspace))? {
        return Ok(config);
    }
    if let Some(home) = home {
        if let Some(config) = load_file(&config_path_at(home))? {
            return Ok(config);
        }
    }
    Ok(GulpConfig::default())
}
