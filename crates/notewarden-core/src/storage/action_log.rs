use anyhow::Result;
use std::sync::Arc;

use crate::models::ActionLog;

#[derive(Clone)]
pub struct ActionLogStorage {
    raw: Arc<notewarden_storage::Storage>,
}

impl ActionLogStorage {
    pub(super) fn new(raw: Arc<notewarden_storage::Storage>) -> Self {
        Self { raw }
    }

    pub fn append(&self, entry: &ActionLog) -> Result<()> {
        let bytes = serde_json::to_vec(entry)?;
        self.raw.action_logs.append_raw(&entry.session_id, &bytes)?;
        Ok(())
    }

    /// Entries for a session, oldest first.
    pub fn list_for_session(&self, session_id: &str) -> Result<Vec<ActionLog>> {
        self.raw
            .action_logs
            .list_by_session_raw(session_id)?
            .into_iter()
            .map(|bytes| Ok(serde_json::from_slice(&bytes)?))
            .collect()
    }
}
