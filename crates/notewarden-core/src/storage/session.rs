use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::models::AgentSession;

#[derive(Clone)]
pub struct SessionStorage {
    raw: Arc<notewarden_storage::Storage>,
}

impl SessionStorage {
    pub(super) fn new(raw: Arc<notewarden_storage::Storage>) -> Self {
        Self { raw }
    }

    /// Persist the record. A record whose agent was deleted is dropped.
    pub fn save(&self, session: &AgentSession) -> Result<()> {
        let bytes = serde_json::to_vec(session)?;
        let written = self
            .raw
            .sessions
            .put_raw(&session.id, &session.agent_id, &bytes)?;
        if !written {
            debug!(
                session_id = %session.id,
                agent_id = %session.agent_id,
                "Agent gone, session record not saved"
            );
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<AgentSession>> {
        match self.raw.sessions.get_raw(id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Sessions of one agent, newest first.
    pub fn list_by_agent(&self, agent_id: &str) -> Result<Vec<AgentSession>> {
        let mut sessions = self
            .raw
            .sessions
            .list_by_agent_raw(agent_id)?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice::<AgentSession>(&bytes))
            .collect::<Result<Vec<_>, _>>()?;
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    pub fn list_all(&self) -> Result<Vec<AgentSession>> {
        self.raw
            .sessions
            .list_raw()?
            .into_iter()
            .map(|(_, bytes)| Ok(serde_json::from_slice(&bytes)?))
            .collect()
    }
}
