//! Runtime configuration, loaded from `~/.config/notewarden/config.toml`.

use anyhow::{Context, Result};
use notewarden_ai::LlmRetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "notewarden";
const CONFIG_FILE: &str = "config.toml";
const WORKSPACE_DIR: &str = "workspace";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider round-trips allowed per `send_message`.
    pub max_iterations: usize,
    /// Character bound for action log input/output summaries.
    pub summary_limit: usize,
    /// Byte bound for a tool result fed back to the model.
    pub max_tool_result_length: usize,
    /// Credentials that must decrypt before a session may start.
    pub required_credentials: Vec<String>,
    pub rate_window_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            summary_limit: 200,
            max_tool_result_length: 4000,
            required_credentials: vec!["api_key".to_string()],
            rate_window_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotewardenConfig {
    /// Overrides `NOTEWARDEN_DIR` / `~/.notewarden`.
    pub data_dir: Option<PathBuf>,
    /// Root of the local file store. Defaults to `<data_dir>/workspace`.
    pub workspace_root: Option<PathBuf>,
    pub runtime: RuntimeConfig,
    pub retry: LlmRetryConfig,
}

impl NotewardenConfig {
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<()> {
        let runtime = &self.runtime;
        if runtime.max_iterations == 0 {
            anyhow::bail!("runtime.max_iterations must be at least 1");
        }
        if runtime.summary_limit < 16 {
            anyhow::bail!("runtime.summary_limit must be at least 16");
        }
        if runtime.max_tool_result_length < 256 {
            anyhow::bail!("runtime.max_tool_result_length must be at least 256");
        }
        if runtime.rate_window_secs == 0 {
            anyhow::bail!("runtime.rate_window_secs must be at least 1");
        }
        if self.retry.backoff_multiplier < 1.0 {
            anyhow::bail!("retry.backoff_multiplier must be at least 1.0");
        }
        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => notewarden_storage::paths::resolve_notewarden_dir(),
        }
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(notewarden_storage::paths::DATABASE_FILE))
    }

    pub fn master_key_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(notewarden_storage::paths::MASTER_KEY_FILE))
    }

    pub fn workspace_root(&self) -> Result<PathBuf> {
        match &self.workspace_root {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join(WORKSPACE_DIR)),
        }
    }
}
