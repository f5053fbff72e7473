//! Execution Loop: drives one `send_message` from the user's text to a
//! final answer, a terminal status, or an exhausted iteration budget.

use notewarden_ai::text_utils::middle_truncate;
use notewarden_ai::{estimate_request_tokens, tool_catalog};
use notewarden_traits::{ChatMessage, GenerateRequest, ProviderError};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::prompt::build_system_prompt;
use super::rate_limit::RateLimiter;
use super::router::ToolRouter;
use super::session::{LiveSession, SessionHandle};
use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::models::{ActionLog, AgentSession, FailureReason, SessionStatus};
use crate::storage::Storage;

/// Result of one `send_message` call.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageOutcome {
    pub session: AgentSession,
    pub status: SessionStatus,
    /// Final assistant text, or the last partial content when the budget ran out.
    pub response: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Rows written during this call only.
    pub action_logs: Vec<ActionLog>,
    pub failure: Option<FailureReason>,
    pub budget_exhausted: bool,
}

pub struct ExecutionLoop<'a> {
    pub storage: &'a Storage,
    pub rate_limiter: &'a RateLimiter,
    pub router: &'a ToolRouter,
    pub config: &'a RuntimeConfig,
}

impl ExecutionLoop<'_> {
    /// Caller holds the session's live lock and has checked it is not terminal.
    pub async fn send(
        &self,
        handle: &SessionHandle,
        live: &mut LiveSession,
        text: &str,
    ) -> Result<SendMessageOutcome> {
        live.transcript.push(ChatMessage::user(text));
        if live.record.status == SessionStatus::Pending {
            live.record.transition(SessionStatus::Running);
        }
        self.storage.sessions.save(&live.record)?;

        let mut action_logs = Vec::new();
        let mut partial: Option<String> = None;

        for iteration in 0..self.config.max_iterations {
            if handle.cancel.is_cancelled() {
                return self.cancel(live, None, action_logs);
            }

            // Re-read every round so scope edits and deactivation apply immediately.
            let agent = match self.storage.agents.get(&live.record.agent_id)? {
                Some(agent) if agent.is_active => agent,
                Some(_) => {
                    return self.fail(
                        live,
                        FailureReason::AgentUnavailable,
                        "agent was deactivated".to_string(),
                        action_logs,
                    );
                }
                None => {
                    return self.fail(
                        live,
                        FailureReason::AgentUnavailable,
                        "agent no longer exists".to_string(),
                        action_logs,
                    );
                }
            };
            let Some(provider) = live.provider.clone() else {
                return self.fail(
                    live,
                    FailureReason::ProviderUnavailable,
                    "no provider bound to session".to_string(),
                    action_logs,
                );
            };

            let mut messages = Vec::with_capacity(live.transcript.len() + 1);
            messages.push(ChatMessage::system(build_system_prompt(
                &agent,
                live.record.notebook_path.as_deref(),
            )));
            messages.extend(live.transcript.iter().cloned());
            let request = GenerateRequest::new(messages)
                .with_tools(tool_catalog(&agent.capabilities.enabled()));

            if let Err(err) = self
                .rate_limiter
                .check_and_consume(&agent, estimate_request_tokens(&request))
            {
                return self.fail(
                    live,
                    FailureReason::RateLimitExceeded,
                    err.to_string(),
                    action_logs,
                );
            }

            let response = match provider.generate(request).await {
                Ok(response) => response,
                Err(err) => {
                    let reason = match err {
                        ProviderError::Unavailable(_) => FailureReason::ProviderUnavailable,
                        ProviderError::InvalidRequest(_) => FailureReason::InvalidRequest,
                    };
                    return self.fail(live, reason, err.to_string(), action_logs);
                }
            };
            live.record.record_provider_call(response.tokens_used);
            debug!(
                session_id = %live.record.id,
                iteration,
                tokens = response.tokens_used,
                tool_calls = response.tool_calls.len(),
                "Provider round-trip"
            );

            if !response.has_tool_calls() {
                let answer = response.content.unwrap_or_default();
                live.transcript.push(ChatMessage::assistant(answer.clone()));
                if handle.cancel.is_cancelled() {
                    return self.cancel(live, Some(answer), action_logs);
                }
                self.storage.sessions.save(&live.record)?;
                return Ok(Self::outcome(live, Some(answer), action_logs, None, false));
            }

            if let Some(content) = response.content.as_deref()
                && !content.trim().is_empty()
            {
                partial = Some(content.to_string());
            }
            live.transcript.push(ChatMessage::assistant_with_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let (output, log) = self.router.invoke(&agent, &mut live.record, call).await;
                live.transcript.push(ChatMessage::tool_result(
                    call.id.clone(),
                    middle_truncate(&output.to_model_content(), self.config.max_tool_result_length),
                ));
                action_logs.push(log);
            }
            self.storage.sessions.save(&live.record)?;
        }

        if handle.cancel.is_cancelled() {
            return self.cancel(live, partial, action_logs);
        }
        info!(
            session_id = %live.record.id,
            max_iterations = self.config.max_iterations,
            "Iteration budget exhausted"
        );
        live.transcript.push(ChatMessage::system(format!(
            "Iteration budget of {} exhausted before a final answer.",
            self.config.max_iterations
        )));
        self.storage.sessions.save(&live.record)?;
        Ok(Self::outcome(live, partial, action_logs, None, true))
    }

    fn fail(
        &self,
        live: &mut LiveSession,
        reason: FailureReason,
        message: String,
        action_logs: Vec<ActionLog>,
    ) -> Result<SendMessageOutcome> {
        warn!(
            session_id = %live.record.id,
            agent_id = %live.record.agent_id,
            ?reason,
            error = %message,
            "Session failed"
        );
        live.transcript
            .push(ChatMessage::system(format!("Session failed: {message}")));
        live.record.fail(message);
        self.storage.sessions.save(&live.record)?;
        Ok(Self::outcome(live, None, action_logs, Some(reason), false))
    }

    fn cancel(
        &self,
        live: &mut LiveSession,
        response: Option<String>,
        action_logs: Vec<ActionLog>,
    ) -> Result<SendMessageOutcome> {
        info!(session_id = %live.record.id, "Session cancelled");
        live.transcript
            .push(ChatMessage::system("Session cancelled."));
        live.record.transition(SessionStatus::Cancelled);
        self.storage.sessions.save(&live.record)?;
        Ok(Self::outcome(live, response, action_logs, None, false))
    }

    fn outcome(
        live: &LiveSession,
        response: Option<String>,
        action_logs: Vec<ActionLog>,
        failure: Option<FailureReason>,
        budget_exhausted: bool,
    ) -> SendMessageOutcome {
        SendMessageOutcome {
            session: live.record.clone(),
            status: live.record.status,
            response,
            messages: live.transcript.clone(),
            action_logs,
            failure,
            budget_exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditTrail;
    use crate::models::{Agent, Capabilities, NewAgent, Scope, StartSessionRequest};
    use crate::runtime::rate_limit::InMemoryRateCounters;
    use crate::workspace::MemoryFileStore;
    use notewarden_ai::{MockProvider, MockStep};
    use notewarden_traits::{FileStore, Role};
    use serde_json::json;
    use std::sync::Arc;

    struct Harness {
        storage: Storage,
        rate_limiter: RateLimiter,
        router: ToolRouter,
        config: RuntimeConfig,
        store: Arc<MemoryFileStore>,
    }

    impl Harness {
        fn new(max_iterations: usize) -> Self {
            let storage = Storage::in_memory().unwrap();
            let store = Arc::new(MemoryFileStore::with_files([("notes/a.md", "hello")]));
            let router = ToolRouter::new(
                store.clone(),
                AuditTrail::new(Arc::new(storage.action_logs.clone())),
                200,
            );
            Self {
                rate_limiter: RateLimiter::new(Arc::new(InMemoryRateCounters::new()), 3600),
                router,
                config: RuntimeConfig {
                    max_iterations,
                    ..RuntimeConfig::default()
                },
                storage,
                store,
            }
        }

        fn agent(&self, new: NewAgent) -> Agent {
            let agent = new.into_agent();
            self.storage.agents.save(&agent).unwrap();
            agent
        }

        fn session(&self, agent: &Agent, provider: Arc<MockProvider>) -> SessionHandle {
            let record = AgentSession::new(&StartSessionRequest::new(agent.id.clone(), "user"));
            self.storage.sessions.save(&record).unwrap();
            SessionHandle::new(LiveSession::new(record, Some(provider)))
        }

        fn executor(&self) -> ExecutionLoop<'_> {
            ExecutionLoop {
                storage: &self.storage,
                rate_limiter: &self.rate_limiter,
                router: &self.router,
                config: &self.config,
            }
        }

        async fn send(&self, handle: &SessionHandle, text: &str) -> SendMessageOutcome {
            let mut live = handle.live.lock().await;
            self.executor().send(handle, &mut live, text).await.unwrap()
        }
    }

    fn reader() -> NewAgent {
        NewAgent::new("ws", "reader", "mock", "m")
            .with_scope(Scope::unrestricted().with_folders(["notes/*"]))
    }

    #[tokio::test]
    async fn test_final_answer_without_tools() {
        let h = Harness::new(5);
        let agent = h.agent(reader());
        let provider = Arc::new(MockProvider::from_steps("m", vec![MockStep::text("hi there")]));
        let handle = h.session(&agent, provider.clone());

        let outcome = h.send(&handle, "hello").await;
        assert_eq!(outcome.status, SessionStatus::Running);
        assert_eq!(outcome.response.as_deref(), Some("hi there"));
        assert_eq!(outcome.session.api_calls_made, 1);
        assert!(outcome.action_logs.is_empty());

        let request = &provider.requests()[0];
        assert_eq!(request.messages[0].role, Role::System);
        let tools: Vec<_> = request.tools.iter().map(|t| t.name.as_str()).collect();
        assert!(tools.contains(&"read_file"));
        assert!(!tools.contains(&"write_file"));

        let persisted = h.storage.sessions.get(&handle.id).unwrap().unwrap();
        assert_eq!(persisted.status, SessionStatus::Running);
    }

    #[tokio::test]
    async fn test_tool_result_fed_back_before_next_call() {
        let h = Harness::new(5);
        let agent = h.agent(reader());
        let provider = Arc::new(MockProvider::from_steps(
            "m",
            vec![
                MockStep::tool_call("c1", "read_file", json!({ "path": "notes/a.md" })),
                MockStep::tool_call(
                    "c2",
                    "write_file",
                    json!({ "path": "notes/a.md", "content": "changed" }),
                ),
                MockStep::text("done"),
            ],
        ));
        let handle = h.session(&agent, provider.clone());

        let outcome = h.send(&handle, "edit a.md").await;
        assert_eq!(outcome.response.as_deref(), Some("done"));
        assert_eq!(outcome.session.api_calls_made, 3);
        assert_eq!(outcome.action_logs.len(), 2);
        assert!(outcome.action_logs[0].was_allowed);
        assert!(!outcome.action_logs[1].was_allowed);
        assert_eq!(h.store.snapshot("notes/a.md").as_deref(), Some("hello"));

        let second = &provider.requests()[1];
        let tool_msg = second.messages.last().unwrap();
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(tool_msg.content, "hello");

        let third = &provider.requests()[2];
        assert!(third.messages.last().unwrap().content.contains("not permitted"));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_not_failure() {
        let h = Harness::new(2);
        let agent = h.agent(reader());
        let step = MockStep::tool_call("c", "read_file", json!({ "path": "notes/a.md" }))
            .with_content("still looking");
        let provider = Arc::new(MockProvider::from_steps("m", vec![step.clone(), step]));
        let handle = h.session(&agent, provider);

        let outcome = h.send(&handle, "loop").await;
        assert!(outcome.budget_exhausted);
        assert_eq!(outcome.status, SessionStatus::Running);
        assert_eq!(outcome.response.as_deref(), Some("still looking"));
        let note = outcome.messages.last().unwrap();
        assert_eq!(note.role, Role::System);
        assert!(note.content.contains("budget"));
    }

    #[tokio::test]
    async fn test_cancel_during_last_iteration_wins_over_budget() {
        let h = Harness::new(1);
        let agent = h.agent(reader());
        let step = MockStep::tool_call("c", "read_file", json!({ "path": "notes/a.md" }))
            .with_content("half done")
            .with_delay(200);
        let provider = Arc::new(MockProvider::from_steps("m", vec![step]));
        let handle = h.session(&agent, provider);

        let token = handle.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            token.cancel();
        });

        let outcome = h.send(&handle, "go").await;
        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert!(!outcome.budget_exhausted);
        assert_eq!(outcome.response.as_deref(), Some("half done"));
        assert_eq!(outcome.action_logs.len(), 1);
        let persisted = h.storage.sessions.get(&handle.id).unwrap().unwrap();
        assert_eq!(persisted.status, SessionStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_provider_failure_is_fatal_and_keeps_counters() {
        let h = Harness::new(5);
        let agent = h.agent(NewAgent::new("ws", "w", "mock", "m").with_capabilities(Capabilities::all()));
        let provider = Arc::new(MockProvider::from_steps(
            "m",
            vec![
                MockStep::tool_call("c1", "write_file", json!({ "path": "notes/a.md", "content": "x" })),
                MockStep::unavailable("upstream down"),
            ],
        ));
        let handle = h.session(&agent, provider);

        let outcome = h.send(&handle, "go").await;
        assert_eq!(outcome.status, SessionStatus::Failed);
        assert_eq!(outcome.failure, Some(FailureReason::ProviderUnavailable));
        assert_eq!(outcome.session.api_calls_made, 1);
        assert_eq!(outcome.session.files_modified, vec!["notes/a.md"]);
        assert!(outcome.messages.last().unwrap().content.starts_with("Session failed:"));

        let persisted = h.storage.sessions.get(&handle.id).unwrap().unwrap();
        assert_eq!(persisted.status, SessionStatus::Failed);
        assert!(persisted.error_message.unwrap().contains("upstream down"));
    }

    #[tokio::test]
    async fn test_rate_limit_fails_session() {
        let h = Harness::new(5);
        let agent = h.agent(reader().with_limits(1, 16_000));
        let provider = Arc::new(MockProvider::new("m"));
        let handle = h.session(&agent, provider.clone());

        assert_eq!(h.send(&handle, "one").await.status, SessionStatus::Running);
        let second = h.send(&handle, "two").await;
        assert_eq!(second.status, SessionStatus::Failed);
        assert_eq!(second.failure, Some(FailureReason::RateLimitExceeded));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_observed_between_iterations() {
        let h = Harness::new(5);
        let agent = h.agent(reader());
        let provider = Arc::new(MockProvider::from_steps("m", vec![MockStep::text("never")]));
        let handle = h.session(&agent, provider.clone());
        handle.cancel.cancel();

        let outcome = h.send(&handle, "hi").await;
        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert_eq!(provider.call_count(), 0);
        assert!(outcome.session.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_deactivated_agent_stops_loop() {
        let h = Harness::new(5);
        let mut agent = h.agent(reader());
        let provider = Arc::new(MockProvider::new("m"));
        let handle = h.session(&agent, provider.clone());
        agent.is_active = false;
        h.storage.agents.save(&agent).unwrap();

        let outcome = h.send(&handle, "hi").await;
        assert_eq!(outcome.failure, Some(FailureReason::AgentUnavailable));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_long_tool_results_are_truncated_for_the_model() {
        let h = Harness::new(5);
        let agent = h.agent(NewAgent::new("ws", "r", "mock", "m"));
        let big = "x".repeat(10_000);
        h.store.create_file("big.md", &big).await.unwrap();
        let provider = Arc::new(MockProvider::from_steps(
            "m",
            vec![MockStep::tool_call("c1", "read_file", json!({ "path": "big.md" }))],
        ));
        let handle = h.session(&agent, provider.clone());

        h.send(&handle, "read").await;
        let tool_msg = provider.requests()[1].messages.last().unwrap().clone();
        assert!(tool_msg.content.len() <= h.config.max_tool_result_length);
        assert!(tool_msg.content.contains("bytes truncated"));
    }
}
