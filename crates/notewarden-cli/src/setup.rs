//! Builds the embedded core for CLI usage.

use anyhow::Result;
use notewarden_core::runtime::NoProviders;
use notewarden_core::storage::Storage;
use notewarden_core::workspace::LocalFileStore;
use notewarden_core::{AppCore, NotewardenConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// The CLI administers agents; it has no provider binding and starts no
/// conversations.
pub fn prepare_core(config: &NotewardenConfig, db_path: Option<PathBuf>) -> Result<Arc<AppCore>> {
    config.validate()?;
    let db_path = match db_path {
        Some(path) => path,
        None => config.db_path()?,
    };
    let storage = Storage::new(&db_path)?;
    let master_key = notewarden_storage::master_key::resolve(&config.master_key_path()?)?;
    let core = AppCore::with_storage(
        storage,
        master_key,
        Arc::new(LocalFileStore::new(config.workspace_root()?)),
        Arc::new(NoProviders),
        config,
    )?;
    Ok(Arc::new(core))
}
