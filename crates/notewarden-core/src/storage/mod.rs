//! Typed wrappers over `notewarden-storage`.

pub mod action_log;
pub mod agent;
pub mod session;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub use action_log::ActionLogStorage;
pub use agent::AgentStorage;
pub use session::SessionStorage;

pub struct Storage {
    raw: Arc<notewarden_storage::Storage>,
    pub agents: AgentStorage,
    pub sessions: SessionStorage,
    pub action_logs: ActionLogStorage,
}

impl Storage {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_raw(notewarden_storage::Storage::new(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_raw(notewarden_storage::Storage::in_memory()?))
    }

    fn from_raw(raw: notewarden_storage::Storage) -> Self {
        let raw = Arc::new(raw);
        Self {
            agents: AgentStorage::new(raw.clone()),
            sessions: SessionStorage::new(raw.clone()),
            action_logs: ActionLogStorage::new(raw.clone()),
            raw,
        }
    }

    /// Byte-level credential table, for the vault.
    pub fn credentials(&self) -> notewarden_storage::CredentialStorage {
        self.raw.credentials.clone()
    }
}
