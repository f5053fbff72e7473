use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit row for one attempted tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionLog {
    pub id: String,
    pub session_id: String,
    /// Tool name as requested by the model, even when it is not a known tool.
    pub action_type: String,
    pub target_path: Option<String>,
    pub input_summary: String,
    pub output_summary: String,
    pub was_allowed: bool,
    pub execution_time_ms: u64,
    pub timestamp: i64,
}

impl ActionLog {
    pub fn new(session_id: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            action_type: action_type.into(),
            target_path: None,
            input_summary: String::new(),
            output_summary: String::new(),
            was_allowed: false,
            execution_time_ms: 0,
            timestamp: notewarden_storage::time_utils::now_ms(),
        }
    }
}
