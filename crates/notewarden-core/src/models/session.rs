//! Agent session record and its state machine.

use notewarden_storage::time_utils;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Running)
                | (Pending | Running, Failed)
                | (Pending | Running, Cancelled)
                | (Running, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended in `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    RateLimitExceeded,
    ProviderUnavailable,
    InvalidRequest,
    CredentialMissing,
    DecryptionFailed,
    AgentUnavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub agent_id: String,
    pub user_id: String,
    #[serde(default)]
    pub notebook_path: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl StartSessionRequest {
    pub fn new(agent_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn with_notebook(mut self, notebook_path: impl Into<String>) -> Self {
        self.notebook_path = Some(notebook_path.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSession {
    pub id: String,
    pub agent_id: String,
    pub task_id: Option<String>,
    pub user_id: String,
    /// Notebook the conversation was opened from; the default for tool calls.
    pub notebook_path: Option<String>,
    pub status: SessionStatus,
    pub tokens_used: u64,
    pub api_calls_made: u64,
    pub files_modified: Vec<String>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub error_message: Option<String>,
}

impl AgentSession {
    pub fn new(request: &StartSessionRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id: request.agent_id.clone(),
            task_id: request.task_id.clone(),
            user_id: request.user_id.clone(),
            notebook_path: request.notebook_path.clone(),
            status: SessionStatus::Pending,
            tokens_used: 0,
            api_calls_made: 0,
            files_modified: Vec::new(),
            started_at: time_utils::now_ms(),
            completed_at: None,
            error_message: None,
        }
    }

    /// Move to `next`. Returns false, leaving the record untouched, when the
    /// transition is not allowed.
    pub fn transition(&mut self, next: SessionStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(time_utils::now_ms());
        }
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        let changed = self.transition(SessionStatus::Failed);
        if changed {
            self.error_message = Some(message.into());
        }
        changed
    }

    pub fn record_provider_call(&mut self, tokens: u64) {
        self.api_calls_made += 1;
        self.tokens_used = self.tokens_used.saturating_add(tokens);
    }

    pub fn record_file_modified(&mut self, path: &str) {
        if !self.files_modified.iter().any(|p| p == path) {
            self.files_modified.push(path.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AgentSession {
        AgentSession::new(&StartSessionRequest::new("agent-1", "user-1"))
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut s = session();
        assert!(s.transition(SessionStatus::Running));
        assert!(s.transition(SessionStatus::Running));
        assert!(s.completed_at.is_none());
        assert!(s.transition(SessionStatus::Completed));
        assert!(s.completed_at.is_some());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [
            SessionStatus::Completed,
            SessionStatus::Failed,
            SessionStatus::Cancelled,
        ] {
            let mut s = session();
            s.transition(SessionStatus::Running);
            assert!(s.transition(terminal));
            for next in [
                SessionStatus::Pending,
                SessionStatus::Running,
                SessionStatus::Completed,
                SessionStatus::Failed,
                SessionStatus::Cancelled,
            ] {
                assert!(!s.transition(next), "{terminal} -> {next} must be rejected");
            }
            assert_eq!(s.status, terminal);
        }
    }

    #[test]
    fn test_pending_cannot_complete() {
        let mut s = session();
        assert!(!s.transition(SessionStatus::Completed));
        assert_eq!(s.status, SessionStatus::Pending);
        assert!(s.completed_at.is_none());
        assert!(s.transition(SessionStatus::Cancelled));
    }

    #[test]
    fn test_no_return_to_pending() {
        let mut s = session();
        assert!(!s.transition(SessionStatus::Pending));
        s.transition(SessionStatus::Running);
        assert!(!s.transition(SessionStatus::Pending));
    }

    #[test]
    fn test_fail_sets_message_once() {
        let mut s = session();
        assert!(s.fail("boom"));
        assert!(!s.fail("again"));
        assert_eq!(s.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_files_modified_deduplicated() {
        let mut s = session();
        s.record_file_modified("notes/a.md");
        s.record_file_modified("notes/b.md");
        s.record_file_modified("notes/a.md");
        assert_eq!(s.files_modified, vec!["notes/a.md", "notes/b.md"]);
    }
}
