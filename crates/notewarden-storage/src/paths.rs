//! Data directory resolution.

use anyhow::Result;
use std::path::PathBuf;

const NOTEWARDEN_DIR: &str = ".notewarden";
pub const MASTER_KEY_FILE: &str = "master.key";
pub const DATABASE_FILE: &str = "notewarden.db";

/// Environment variable to override the data directory.
pub const NOTEWARDEN_DIR_ENV: &str = "NOTEWARDEN_DIR";

/// Priority: NOTEWARDEN_DIR env var > ~/.notewarden/
pub fn resolve_notewarden_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(NOTEWARDEN_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(NOTEWARDEN_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}
