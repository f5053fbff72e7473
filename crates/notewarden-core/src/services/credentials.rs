//! Per-agent secrets. Values go in and never come back out.

use std::sync::Arc;
use tracing::info;

use super::agent::get_agent;
use crate::error::{AgentError, Result};
use crate::models::CredentialSummary;
use crate::AppCore;

const MAX_KEY_LEN: usize = 64;

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(AgentError::InvalidInput(format!(
            "credential key must be 1-{MAX_KEY_LEN} characters"
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AgentError::InvalidInput(format!(
            "credential key {key:?} may only contain letters, digits, '_', '-' and '.'"
        )));
    }
    Ok(())
}

pub async fn list_credentials(
    core: &Arc<AppCore>,
    agent_id: &str,
) -> Result<Vec<CredentialSummary>> {
    get_agent(core, agent_id).await?;
    Ok(core.vault.list(agent_id)?)
}

pub async fn set_credential(
    core: &Arc<AppCore>,
    agent_id: &str,
    key: &str,
    value: &str,
) -> Result<CredentialSummary> {
    validate_key(key)?;
    if value.is_empty() {
        return Err(AgentError::InvalidInput(
            "credential value must not be empty".to_string(),
        ));
    }
    get_agent(core, agent_id).await?;
    let summary = core.vault.set(agent_id, key, value)?;
    info!(agent_id = %agent_id, key = %key, "Stored credential");
    Ok(summary)
}

/// Returns whether the key existed.
pub async fn delete_credential(core: &Arc<AppCore>, agent_id: &str, key: &str) -> Result<bool> {
    get_agent(core, agent_id).await?;
    let removed = core.vault.delete(agent_id, key)?;
    if removed {
        info!(agent_id = %agent_id, key = %key, "Deleted credential");
    }
    Ok(removed)
}
