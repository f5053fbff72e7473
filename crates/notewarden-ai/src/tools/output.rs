use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one tool call, as fed back to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    /// Text for the `tool` transcript message.
    pub fn to_model_content(&self) -> String {
        if !self.success {
            return format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"));
        }
        match &self.result {
            Value::String(text) => text.clone(),
            Value::Null => "ok".to_string(),
            other => other.to_string(),
        }
    }
}
