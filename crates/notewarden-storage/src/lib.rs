//! Notewarden Storage - redb persistence for agents and their audit trail.
//!
//! Byte-level APIs only; typed wrappers live in `notewarden-core`.
//!
//! # Tables
//!
//! - `agents` - Agent definitions
//! - `credentials` - Sealed per-agent secrets, keyed `agent_id:key`
//! - `agent_sessions` / `agent_session_index` - Session records by agent
//! - `action_logs` - Append-only tool invocation audit

pub mod action_log;
pub mod agent;
pub mod credential;
pub mod encryption;
pub mod master_key;
pub mod paths;
pub mod range_utils;
pub mod session;
pub mod time_utils;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use action_log::ActionLogStorage;
pub use agent::AgentStorage;
pub use credential::{CredentialStorage, StoredCredential};
pub use encryption::SecretEncryptor;
pub use session::SessionStorage;

/// What [`Storage::delete_agent_cascade`] removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    pub agent_existed: bool,
    pub credentials_removed: usize,
    pub sessions_removed: Vec<String>,
}

/// Opens every table on one database.
pub struct Storage {
    db: Arc<Database>,
    pub agents: AgentStorage,
    pub credentials: CredentialStorage,
    pub sessions: SessionStorage,
    pub action_logs: ActionLogStorage,
}

impl Storage {
    /// Create or open the database at `path` and initialize all tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_db(Arc::new(Database::create(path)?))
    }

    /// Volatile database, for tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::from_db(Arc::new(db))
    }

    fn from_db(db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            agents: AgentStorage::new(db.clone())?,
            credentials: CredentialStorage::new(db.clone())?,
            sessions: SessionStorage::new(db.clone())?,
            action_logs: ActionLogStorage::new(db.clone())?,
            db,
        })
    }

    /// Remove an agent with its credentials and sessions in one transaction.
    ///
    /// Action logs are left in place.
    pub fn delete_agent_cascade(&self, agent_id: &str) -> Result<CascadeReport> {
        let write_txn = self.db.begin_write()?;
        let report = CascadeReport {
            agent_existed: agent::remove_in(&write_txn, agent_id)?,
            credentials_removed: credential::remove_agent_in(&write_txn, agent_id)?,
            sessions_removed: session::remove_agent_in(&write_txn, agent_id)?,
        };
        write_txn.commit()?;
        Ok(report)
    }

    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_removes_children_but_keeps_logs() {
        let storage = Storage::in_memory().unwrap();
        storage.agents.put_raw("agent-1", b"{}").unwrap();
        storage.agents.put_raw("agent-2", b"{}").unwrap();
        storage
            .credentials
            .put("agent-1", &StoredCredential::new("api_key", b"x"))
            .unwrap();
        storage
            .credentials
            .put("agent-2", &StoredCredential::new("api_key", b"y"))
            .unwrap();
        storage.sessions.put_raw("s1", "agent-1", b"{}").unwrap();
        storage.sessions.put_raw("s2", "agent-2", b"{}").unwrap();
        storage.action_logs.append_raw("s1", b"log").unwrap();

        let report = storage.delete_agent_cascade("agent-1").unwrap();
        assert!(report.agent_existed);
        assert_eq!(report.credentials_removed, 1);
        assert_eq!(report.sessions_removed, vec!["s1".to_string()]);

        assert!(!storage.agents.exists("agent-1").unwrap());
        assert!(storage.credentials.list("agent-1").unwrap().is_empty());
        assert!(storage.sessions.get_raw("s1").unwrap().is_none());
        assert_eq!(storage.action_logs.list_by_session_raw("s1").unwrap().len(), 1);
        assert!(!storage.sessions.put_raw("s1", "agent-1", b"late").unwrap());
        assert!(storage.sessions.list_by_agent_raw("agent-1").unwrap().is_empty());

        assert!(storage.agents.exists("agent-2").unwrap());
        assert_eq!(storage.credentials.list("agent-2").unwrap().len(), 1);
        assert!(storage.sessions.get_raw("s2").unwrap().is_some());
    }

    #[test]
    fn test_new_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notewarden.db");
        let storage = Storage::new(&path).unwrap();
        storage.agents.put_raw("a", b"{}").unwrap();
        assert!(path.exists());
    }
}
