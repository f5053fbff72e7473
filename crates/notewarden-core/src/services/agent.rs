//! Agent CRUD. Deleting an agent cascades to its credentials and sessions.

use anyhow::Context;
use notewarden_storage::CascadeReport;
use std::sync::Arc;
use tracing::info;

use crate::error::{AgentError, Result};
use crate::models::{Agent, AgentPatch, NewAgent};
use crate::AppCore;

pub async fn list_agents(core: &Arc<AppCore>, workspace_id: &str) -> Result<Vec<Agent>> {
    Ok(core
        .storage
        .agents
        .list_by_workspace(workspace_id)
        .with_context(|| format!("Failed to list agents of workspace {}", workspace_id))?)
}

/// Every agent regardless of workspace.
pub async fn list_all_agents(core: &Arc<AppCore>) -> Result<Vec<Agent>> {
    Ok(core.storage.agents.list().context("Failed to list agents")?)
}

pub async fn get_agent(core: &Arc<AppCore>, id: &str) -> Result<Agent> {
    core.storage
        .agents
        .get(id)
        .with_context(|| format!("Failed to get agent {}", id))?
        .ok_or_else(|| AgentError::AgentNotFound(id.to_string()))
}

pub async fn create_agent(core: &Arc<AppCore>, new_agent: NewAgent) -> Result<Agent> {
    let agent = new_agent.into_agent();
    let errors = agent.validate();
    if !errors.is_empty() {
        return Err(AgentError::Validation(errors));
    }
    core.storage
        .agents
        .save(&agent)
        .with_context(|| format!("Failed to create agent {}", agent.name))?;
    info!(agent_id = %agent.id, name = %agent.name, "Created agent");
    Ok(agent)
}

pub async fn update_agent(core: &Arc<AppCore>, id: &str, patch: AgentPatch) -> Result<Agent> {
    let mut agent = get_agent(core, id).await?;
    if patch.is_empty() {
        return Ok(agent);
    }
    agent.apply(patch);
    let errors = agent.validate();
    if !errors.is_empty() {
        return Err(AgentError::Validation(errors));
    }
    core.storage
        .agents
        .save(&agent)
        .with_context(|| format!("Failed to update agent {}", id))?;
    info!(agent_id = %id, "Updated agent");
    Ok(agent)
}

/// Remove the agent with its credentials and sessions. Action logs stay.
pub async fn delete_agent(core: &Arc<AppCore>, id: &str) -> Result<CascadeReport> {
    get_agent(core, id).await?;
    // Cancel first; a turn still in flight can no longer persist its session.
    let live = core.sessions.drop_agent(id);
    let report = core
        .storage
        .agents
        .delete_cascade(id)
        .with_context(|| format!("Failed to delete agent {}", id))?;
    core.rate_limiter.reset(id);
    info!(
        agent_id = %id,
        credentials = report.credentials_removed,
        sessions = report.sessions_removed.len(),
        live_sessions = live,
        "Deleted agent"
    );
    Ok(report)
}

pub async fn toggle_active(core: &Arc<AppCore>, id: &str, active: bool) -> Result<Agent> {
    let mut agent = get_agent(core, id).await?;
    if agent.is_active == active {
        return Ok(agent);
    }
    agent.is_active = active;
    agent.updated_at = notewarden_storage::time_utils::now_ms();
    core.storage
        .agents
        .save(&agent)
        .with_context(|| format!("Failed to update agent {}", id))?;
    info!(agent_id = %id, active, "Toggled agent");
    Ok(agent)
}
