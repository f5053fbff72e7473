use anyhow::{Context, Result};
use notewarden_storage::CascadeReport;
use std::sync::Arc;

use crate::models::Agent;

#[derive(Clone)]
pub struct AgentStorage {
    raw: Arc<notewarden_storage::Storage>,
}

impl AgentStorage {
    pub(super) fn new(raw: Arc<notewarden_storage::Storage>) -> Self {
        Self { raw }
    }

    pub fn save(&self, agent: &Agent) -> Result<()> {
        let bytes = serde_json::to_vec(agent)?;
        self.raw.agents.put_raw(&agent.id, &bytes)
    }

    pub fn get(&self, id: &str) -> Result<Option<Agent>> {
        match self.raw.agents.get_raw(id)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt agent record {}", id))?,
            )),
            None => Ok(None),
        }
    }

    /// All agents, oldest first.
    pub fn list(&self) -> Result<Vec<Agent>> {
        let mut agents = self
            .raw
            .agents
            .list_raw()?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice::<Agent>(&bytes))
            .collect::<Result<Vec<_>, _>>()?;
        agents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(agents)
    }

    pub fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Agent>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|agent| agent.workspace_id == workspace_id)
            .collect())
    }

    /// Delete the agent, its credentials and its sessions.
    pub fn delete_cascade(&self, id: &str) -> Result<CascadeReport> {
        self.raw.delete_agent_cascade(id)
    }
}
