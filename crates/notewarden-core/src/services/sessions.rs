//! Conversation sessions: start, message, cancel, complete, inspect.

use anyhow::Context;
use notewarden_ai::RetryingProvider;
use notewarden_traits::{ChatMessage, LlmProvider, ProviderError};
use std::sync::Arc;
use tracing::{info, warn};

use super::agent::get_agent;
use crate::error::{AgentError, Result};
use crate::models::{
    ActionLog, AgentSession, FailureReason, SessionStatus, StartSessionRequest,
};
use crate::runtime::{
    LiveSession, ProviderCredentials, RateUsage, SendMessageOutcome, SessionHandle,
};
use crate::security::VaultError;
use crate::AppCore;

const CANCELLED_NOTE: &str = "Session cancelled.";

/// Start a conversation for an active agent. The agent's previous live
/// session, if any, is superseded. Missing credentials or a provider that
/// cannot be built leave the returned session `failed`.
pub async fn start_session(
    core: &Arc<AppCore>,
    request: StartSessionRequest,
) -> Result<AgentSession> {
    let agent = get_agent(core, &request.agent_id).await?;
    if !agent.is_active {
        return Err(AgentError::AgentInactive(agent.id));
    }

    let mut live = LiveSession::new(AgentSession::new(&request), None);
    core.storage
        .sessions
        .save(&live.record)
        .context("Failed to save session")?;

    let credentials = match resolve_credentials(core, &agent.id)? {
        Ok(credentials) => credentials,
        Err((reason, message)) => return fail_at_start(core, live, reason, message),
    };
    match core.providers.create(&agent, &credentials) {
        Ok(provider) => {
            let provider: Arc<dyn LlmProvider> =
                Arc::new(RetryingProvider::new(provider, core.retry.clone()));
            live.provider = Some(provider);
        }
        Err(err) => {
            let reason = match err {
                ProviderError::Unavailable(_) => FailureReason::ProviderUnavailable,
                ProviderError::InvalidRequest(_) => FailureReason::InvalidRequest,
            };
            return fail_at_start(core, live, reason, err.to_string());
        }
    }

    let record = live.record.clone();
    if let Some(previous) = core.sessions.register(Arc::new(SessionHandle::new(live))) {
        supersede(core, &previous, &record.id).await?;
    }
    info!(
        session_id = %record.id,
        agent_id = %record.agent_id,
        notebook = record.notebook_path.as_deref().unwrap_or("-"),
        "Started session"
    );
    Ok(record)
}

type StartFailure = (FailureReason, String);

/// Decrypt every credential of the agent. Configured required keys must be
/// present and intact; other keys that fail to decrypt are skipped.
fn resolve_credentials(
    core: &AppCore,
    agent_id: &str,
) -> Result<std::result::Result<ProviderCredentials, StartFailure>> {
    let mut credentials = ProviderCredentials::default();
    let stored = core.vault.list(agent_id)?;

    for key in &core.runtime.required_credentials {
        let failure = match core.vault.reveal(agent_id, key) {
            Ok(value) => {
                credentials.insert(key.clone(), value);
                continue;
            }
            Err(VaultError::CredentialNotFound { .. }) => (
                FailureReason::CredentialMissing,
                format!("credential {key} is not set"),
            ),
            Err(VaultError::DecryptionFailed { .. }) => (
                FailureReason::DecryptionFailed,
                format!("credential {key} could not be decrypted"),
            ),
            Err(err) => return Err(err.into()),
        };
        return Ok(Err(failure));
    }

    for summary in stored {
        if credentials.get(&summary.key).is_some() {
            continue;
        }
        match core.vault.reveal(agent_id, &summary.key) {
            Ok(value) => credentials.insert(summary.key, value),
            Err(err) => warn!(agent_id = %agent_id, key = %summary.key, error = %err, "Skipping credential"),
        }
    }
    Ok(Ok(credentials))
}

fn fail_at_start(
    core: &AppCore,
    mut live: LiveSession,
    reason: FailureReason,
    message: String,
) -> Result<AgentSession> {
    warn!(
        session_id = %live.record.id,
        agent_id = %live.record.agent_id,
        ?reason,
        error = %message,
        "Session failed at start"
    );
    live.record.fail(message);
    core.storage
        .sessions
        .save(&live.record)
        .context("Failed to save session")?;
    Ok(live.record)
}

/// Wind down a replaced handle. A busy handle is only flagged; its loop
/// observes the token and records the cancellation itself.
async fn supersede(core: &AppCore, previous: &SessionHandle, successor: &str) -> Result<()> {
    previous.cancel.cancel();
    let Ok(mut live) = previous.live.try_lock() else {
        return Ok(());
    };
    if live.record.transition(SessionStatus::Cancelled) {
        live.transcript.clear();
        core.storage
            .sessions
            .save(&live.record)
            .context("Failed to save session")?;
        info!(session_id = %previous.id, successor = %successor, "Session superseded");
    }
    Ok(())
}

/// Run one user turn. Fatal conditions come back as a `failed` outcome,
/// not as an error.
pub async fn send_message(
    core: &Arc<AppCore>,
    session_id: &str,
    text: &str,
) -> Result<SendMessageOutcome> {
    let Some(handle) = core.sessions.get(session_id) else {
        return Err(ended_or_missing(core, session_id)?);
    };
    let Ok(mut live) = handle.live.try_lock() else {
        return Err(AgentError::SessionBusy(session_id.to_string()));
    };
    if live.record.status.is_terminal() {
        return Err(AgentError::SessionEnded(session_id.to_string()));
    }
    if text.trim().is_empty() {
        return Err(AgentError::InvalidInput("message must not be empty".to_string()));
    }

    let outcome = core.executor().send(&handle, &mut live, text).await?;
    if outcome.status.is_terminal() {
        core.sessions.release(session_id);
    }
    Ok(outcome)
}

/// Error for a session id with no live handle.
fn ended_or_missing(core: &AppCore, session_id: &str) -> Result<AgentError> {
    Ok(match core.storage.sessions.get(session_id)? {
        Some(_) => AgentError::SessionEnded(session_id.to_string()),
        None => AgentError::SessionNotFound(session_id.to_string()),
    })
}

/// Request cancellation. Terminal sessions are returned unchanged. A session
/// in the middle of a turn stops at its next iteration boundary.
pub async fn cancel_session(core: &Arc<AppCore>, session_id: &str) -> Result<AgentSession> {
    let Some(handle) = core.sessions.get(session_id) else {
        let mut session = get_session(core, session_id).await?;
        if session.transition(SessionStatus::Cancelled) {
            core.storage.sessions.save(&session)?;
        }
        return Ok(session);
    };

    handle.cancel.cancel();
    let Ok(mut live) = handle.live.try_lock() else {
        info!(session_id = %session_id, "Cancellation requested for busy session");
        return get_session(core, session_id).await;
    };
    if live.record.transition(SessionStatus::Cancelled) {
        live.transcript.push(ChatMessage::system(CANCELLED_NOTE));
        core.storage.sessions.save(&live.record)?;
        info!(session_id = %session_id, "Session cancelled");
    }
    core.sessions.release(session_id);
    Ok(live.record.clone())
}

/// External task-completion signal.
pub async fn complete_session(core: &Arc<AppCore>, session_id: &str) -> Result<AgentSession> {
    let Some(handle) = core.sessions.get(session_id) else {
        return Err(ended_or_missing(core, session_id)?);
    };
    let Ok(mut live) = handle.live.try_lock() else {
        return Err(AgentError::SessionBusy(session_id.to_string()));
    };
    if live.record.status == SessionStatus::Pending {
        return Err(AgentError::InvalidInput(format!(
            "session {} has not started",
            session_id
        )));
    }
    if !live.record.transition(SessionStatus::Completed) {
        return Err(AgentError::SessionEnded(session_id.to_string()));
    }
    core.storage.sessions.save(&live.record)?;
    core.sessions.release(session_id);
    info!(session_id = %session_id, "Session completed");
    Ok(live.record.clone())
}

/// Sessions of one agent, newest first.
pub async fn list_sessions(core: &Arc<AppCore>, agent_id: &str) -> Result<Vec<AgentSession>> {
    Ok(core
        .storage
        .sessions
        .list_by_agent(agent_id)
        .with_context(|| format!("Failed to list sessions of agent {}", agent_id))?)
}

pub async fn list_all_sessions(core: &Arc<AppCore>) -> Result<Vec<AgentSession>> {
    let mut sessions = core
        .storage
        .sessions
        .list_all()
        .context("Failed to list sessions")?;
    sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Ok(sessions)
}

pub async fn get_session(core: &Arc<AppCore>, session_id: &str) -> Result<AgentSession> {
    core.storage
        .sessions
        .get(session_id)
        .with_context(|| format!("Failed to get session {}", session_id))?
        .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))
}

/// In-memory transcript of a live session. Ended sessions have none.
pub async fn get_transcript(core: &Arc<AppCore>, session_id: &str) -> Result<Vec<ChatMessage>> {
    let Some(handle) = core.sessions.get(session_id) else {
        get_session(core, session_id).await?;
        return Ok(Vec::new());
    };
    let Ok(live) = handle.live.try_lock() else {
        return Err(AgentError::SessionBusy(session_id.to_string()));
    };
    Ok(live.transcript.clone())
}

/// Action log of a session, oldest first. Available after the session and
/// its agent are gone.
pub async fn get_session_logs(core: &Arc<AppCore>, session_id: &str) -> Result<Vec<ActionLog>> {
    Ok(core
        .storage
        .action_logs
        .list_for_session(session_id)
        .with_context(|| format!("Failed to read action log of session {}", session_id))?)
}

pub async fn rate_usage(core: &Arc<AppCore>, agent_id: &str) -> Result<RateUsage> {
    let agent = get_agent(core, agent_id).await?;
    Ok(core.rate_limiter.usage(&agent))
}
