//! Tool Router: scope check, dispatch, audit.

use notewarden_ai::text_utils::truncate_chars;
use notewarden_ai::{ToolInvocation, ToolKind, ToolOutput};
use notewarden_traits::{FileStore, ToolCall};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::audit::AuditTrail;
use crate::models::{ActionLog, Agent, AgentSession};
use crate::security::{ProposedAction, evaluate, is_allowed, normalize_path};

pub const SCOPE_DENIED_MESSAGE: &str = "action not permitted by agent scope";

pub struct ToolRouter {
    store: Arc<dyn FileStore>,
    audit: AuditTrail,
    summary_limit: usize,
}

impl ToolRouter {
    pub fn new(store: Arc<dyn FileStore>, audit: AuditTrail, summary_limit: usize) -> Self {
        Self {
            store,
            audit,
            summary_limit,
        }
    }

    fn summarize(&self, text: &str) -> String {
        truncate_chars(text, self.summary_limit)
    }

    /// Run one tool call for `session`. Always writes exactly one action log
    /// row; the row is also returned to the caller.
    pub async fn invoke(
        &self,
        agent: &Agent,
        session: &mut AgentSession,
        call: &ToolCall,
    ) -> (ToolOutput, ActionLog) {
        let mut log = ActionLog::new(&session.id, &call.name);

        let invocation = match ToolInvocation::decode(call) {
            Ok(invocation) => invocation,
            Err(err) => {
                let output = ToolOutput::error(err.to_string());
                log.target_path = ["path", "folder"]
                    .iter()
                    .find_map(|field| call.arguments.get(*field)?.as_str())
                    .map(str::to_string);
                log.input_summary = self.summarize(&call.arguments.to_string());
                log.output_summary = self.summarize(&err.to_string());
                self.audit.record(&log);
                return (output, log);
            }
        };

        let op = &invocation.op;
        let kind = op.kind();
        let notebook = invocation
            .notebook
            .clone()
            .or_else(|| session.notebook_path.clone());
        let action = ProposedAction::new(kind, notebook, op.target().map(str::to_string));
        log.target_path = action.path.clone();
        log.input_summary = self.summarize(&op.input_summary());

        let decision = evaluate(&agent.scope, &agent.capabilities, &action);
        if !decision.allowed {
            info!(
                agent_id = %agent.id,
                session_id = %session.id,
                tool = %kind,
                reason = decision.reason.as_deref().unwrap_or_default(),
                "Tool call denied by scope"
            );
            self.audit.record(&log);
            return (ToolOutput::error(SCOPE_DENIED_MESSAGE), log);
        }

        log.was_allowed = true;
        let started = Instant::now();
        let result = op.execute(self.store.as_ref()).await;
        log.execution_time_ms = started.elapsed().as_millis() as u64;

        let output = match result {
            Ok(mut value) => {
                // Listings and search hits must not leak out-of-scope paths.
                value.retain_paths(|path, is_dir| {
                    let entry_op = if is_dir {
                        ToolKind::ListFiles
                    } else {
                        ToolKind::ReadFile
                    };
                    is_allowed(
                        &agent.scope,
                        &agent.capabilities,
                        &ProposedAction::new(entry_op, action.notebook.clone(), Some(path.to_string())),
                    )
                });
                if kind.mutates()
                    && let Some(path) = action.path.as_deref().and_then(normalize_path)
                {
                    session.record_file_modified(&path);
                }
                ToolOutput::success(value.into_value())
            }
            Err(err) => {
                debug!(tool = %kind, error = %err, "File store rejected tool call");
                ToolOutput::error(err.to_string())
            }
        };

        log.output_summary = self.summarize(&output.to_model_content());
        self.audit.record(&log);
        (output, log)
    }
}
