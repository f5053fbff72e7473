//! Action Log: fire-and-forget audit of every tool call.

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use crate::models::ActionLog;
use crate::storage::ActionLogStorage;

/// Destination for action log rows.
pub trait ActionLogSink: Send + Sync {
    fn append(&self, entry: &ActionLog) -> Result<()>;
}

impl ActionLogSink for ActionLogStorage {
    fn append(&self, entry: &ActionLog) -> Result<()> {
        ActionLogStorage::append(self, entry)
    }
}

/// Writes to a sink without ever failing the caller.
#[derive(Clone)]
pub struct AuditTrail {
    sink: Arc<dyn ActionLogSink>,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn ActionLogSink>) -> Self {
        Self { sink }
    }

    pub fn record(&self, entry: &ActionLog) {
        if let Err(err) = self.sink.append(entry) {
            warn!(
                session_id = %entry.session_id,
                action = %entry.action_type,
                allowed = entry.was_allowed,
                error = %err,
                "Failed to write action log"
            );
        }
    }
}
