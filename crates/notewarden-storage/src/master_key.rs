//! Process-wide master key for credential sealing.

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::Rng;
use std::path::Path;

/// Base64 of a 32-byte key; takes precedence over the key file.
pub const MASTER_KEY_ENV: &str = "NOTEWARDEN_MASTER_KEY";

pub const MASTER_KEY_LEN: usize = 32;

fn decode_key(encoded: &str) -> Result<[u8; MASTER_KEY_LEN]> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .context("Master key is not valid base64")?;
    if bytes.len() != MASTER_KEY_LEN {
        anyhow::bail!(
            "Master key must be {} bytes, got {}",
            MASTER_KEY_LEN,
            bytes.len()
        );
    }
    let mut key = [0u8; MASTER_KEY_LEN];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Read the key at `path`, generating and persisting a new one if absent.
pub fn load_or_create_at(path: &Path) -> Result<[u8; MASTER_KEY_LEN]> {
    if path.exists() {
        let encoded = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read master key {}", path.display()))?;
        return decode_key(&encoded);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut key = [0u8; MASTER_KEY_LEN];
    rand::rng().fill_bytes(&mut key);
    std::fs::write(path, STANDARD.encode(key))
        .with_context(|| format!("Failed to write master key {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(path = %path.display(), "Generated new master key");
    Ok(key)
}

/// `NOTEWARDEN_MASTER_KEY` if set, else the key file at `path`.
pub fn resolve(path: &Path) -> Result<[u8; MASTER_KEY_LEN]> {
    if let Ok(encoded) = std::env::var(MASTER_KEY_ENV)
        && !encoded.trim().is_empty()
    {
        return decode_key(&encoded);
    }
    load_or_create_at(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_then_reloads_same_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys").join("master.key");

        let first = load_or_create_at(&path).unwrap();
        let second = load_or_create_at(&path).unwrap();
        assert_eq!(first, second);
        assert!(path.exists());
    }

    #[test]
    fn rejects_truncated_key_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");
        std::fs::write(&path, STANDARD.encode([1u8; 16])).unwrap();

        let err = load_or_create_at(&path).unwrap_err();
        assert!(err.to_string().contains("32"));
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");
        load_or_create_at(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
