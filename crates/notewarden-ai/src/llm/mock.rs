//! Deterministic provider driven by scripted steps.

use std::collections::VecDeque;

use async_trait::async_trait;
use notewarden_traits::{
    GenerateRequest, GenerateResponse, LlmProvider, ProviderError, Role, ToolCall,
};
use parking_lot::Mutex;
use tokio::time::{Duration, sleep};

use super::estimate_tokens;

#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Final assistant text.
    Text(String),
    /// One or more tool calls, with optional accompanying text.
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    Error(ProviderError),
}

#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub tokens: Option<u64>,
    pub kind: MockStepKind,
}

impl MockStep {
    fn of(kind: MockStepKind) -> Self {
        Self {
            delay_ms: 0,
            tokens: None,
            kind,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::of(MockStepKind::Text(content.into()))
    }

    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::of(MockStepKind::ToolCalls {
            content: None,
            calls: vec![ToolCall {
                id: id.into(),
                name: name.into(),
                arguments,
            }],
        })
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self::of(MockStepKind::ToolCalls {
            content: None,
            calls,
        })
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::of(MockStepKind::Error(ProviderError::Unavailable(
            message.into(),
        )))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::of(MockStepKind::Error(ProviderError::InvalidRequest(
            message.into(),
        )))
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_content(mut self, text: impl Into<String>) -> Self {
        if let MockStepKind::ToolCalls { content, .. } = &mut self.kind {
            *content = Some(text.into());
        }
        self
    }
}

/// Scripted [`LlmProvider`]. Once the script runs out it echoes the latest
/// tool result or user message back as final text.
#[derive(Debug, Default)]
pub struct MockProvider {
    model: String,
    script: Mutex<VecDeque<MockStep>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_steps(model, Vec::new())
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::from(steps)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_step(&self, step: MockStep) {
        self.script.lock().push_back(step);
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn fallback_response(request: &GenerateRequest) -> GenerateResponse {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| matches!(msg.role, Role::Tool | Role::User))
            .map(|msg| format!("mock-echo: {}", msg.content))
            .unwrap_or_else(|| "mock-ok".to_string());

        GenerateResponse {
            tokens_used: estimate_tokens(&text).max(1),
            content: Some(text),
            tool_calls: Vec::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        self.requests.lock().push(request.clone());
        let step = self.script.lock().pop_front();
        let Some(step) = step else {
            return Ok(Self::fallback_response(&request));
        };

        if step.delay_ms > 0 {
            sleep(Duration::from_millis(step.delay_ms)).await;
        }

        match step.kind {
            MockStepKind::Text(content) => Ok(GenerateResponse {
                tokens_used: step.tokens.unwrap_or_else(|| estimate_tokens(&content).max(1)),
                content: Some(content),
                tool_calls: Vec::new(),
            }),
            MockStepKind::ToolCalls { content, calls } => Ok(GenerateResponse {
                tokens_used: step.tokens.unwrap_or(5),
                content,
                tool_calls: calls,
            }),
            MockStepKind::Error(err) => Err(err),
        }
    }
}
