use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

// Re-export the configuration surface from the core crate.
pub use biw_core::{
    BiCredentials, ColumnMapping, Config, DbConfig, Driver, Parameters, ServiceAccount,
    StagingProvider, StorageConfig, TableMapping, ValidationMode,
};

use biw_core::{Error, Result};

/// Load the component configuration document delivered by the platform
/// runtime. Validation is separate, callers pick the mode for their action.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config =
        serde_json::from_str(&content).context("Failed to parse the configuration document")?;
    Ok(config)
}

/// Settings injected by the platform runtime through `BIW_*` environment
/// variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformEnv {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub run_id: Option<String>,

    #[serde(default)]
    pub config_id: Option<String>,

    #[serde(default)]
    pub staging_file_provider: Option<String>,
}

impl PlatformEnv {
    /// Read `BIW_TOKEN`, `BIW_URL`, `BIW_RUN_ID`, `BIW_CONFIG_ID` and
    /// `BIW_STAGING_FILE_PROVIDER`. Presence is checked lazily, each action
    /// requires a different subset.
    pub fn from_env() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("BIW"))
            .build()
            .context("Failed to read BIW_* environment variables")?;
        let env = settings
            .try_deserialize()
            .context("Failed to read BIW_* environment variables")?;
        Ok(env)
    }

    pub fn token(&self) -> Result<&str> {
        require_env(&self.token, "BIW_TOKEN")
    }

    pub fn url(&self) -> Result<&str> {
        require_env(&self.url, "BIW_URL")
    }

    pub fn config_id(&self) -> Result<&str> {
        require_env(&self.config_id, "BIW_CONFIG_ID")
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref().filter(|v| !v.is_empty())
    }

    pub fn staging_file_provider(&self) -> Result<Option<StagingProvider>> {
        match self.staging_file_provider.as_deref() {
            None | Some("") => Ok(None),
            Some("aws") => Ok(Some(StagingProvider::Aws)),
            Some("azure") => Ok(Some(StagingProvider::Azure)),
            Some(other) => Err(Error::Configuration(format!(
                "Unknown staging file provider \"{other}\", expected \"aws\" or \"azure\""
            ))),
        }
    }
}

fn require_env<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value.as_deref().filter(|v| !v.is_empty()).ok_or_else(|| {
        Error::Configuration(format!("{name} environment variable must be set"))
    })
}
