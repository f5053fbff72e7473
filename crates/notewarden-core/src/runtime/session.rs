//! Session Manager: live conversation handles, one per agent at most.

use dashmap::DashMap;
use notewarden_traits::{ChatMessage, LlmProvider};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::models::AgentSession;

/// State guarded for the duration of one `send_message`.
pub struct LiveSession {
    pub record: AgentSession,
    pub transcript: Vec<ChatMessage>,
    pub provider: Option<Arc<dyn LlmProvider>>,
}

impl LiveSession {
    pub fn new(record: AgentSession, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            record,
            transcript: Vec::new(),
            provider,
        }
    }
}

pub struct SessionHandle {
    pub id: String,
    pub agent_id: String,
    pub cancel: CancellationToken,
    pub live: AsyncMutex<LiveSession>,
}

impl SessionHandle {
    pub fn new(live: LiveSession) -> Self {
        Self {
            id: live.record.id.clone(),
            agent_id: live.record.agent_id.clone(),
            cancel: CancellationToken::new(),
            live: AsyncMutex::new(live),
        }
    }
}

#[derive(Default)]
pub struct SessionManager {
    handles: DashMap<String, Arc<SessionHandle>>,
    current_by_agent: Mutex<HashMap<String, String>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle` as its agent's live session. The handle it replaces,
    /// if any, is unregistered and returned so the caller can wind it down.
    pub fn register(&self, handle: Arc<SessionHandle>) -> Option<Arc<SessionHandle>> {
        let previous_id = self
            .current_by_agent
            .lock()
            .insert(handle.agent_id.clone(), handle.id.clone());
        self.handles.insert(handle.id.clone(), handle);
        previous_id.and_then(|id| self.handles.remove(&id).map(|(_, prev)| prev))
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.handles.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn current_session_id(&self, agent_id: &str) -> Option<String> {
        self.current_by_agent.lock().get(agent_id).cloned()
    }

    /// Forget a handle that reached a terminal state.
    pub fn release(&self, session_id: &str) {
        if let Some((_, handle)) = self.handles.remove(session_id) {
            let mut current = self.current_by_agent.lock();
            if current.get(&handle.agent_id) == Some(&handle.id) {
                current.remove(&handle.agent_id);
            }
        }
    }

    /// Cancel and drop every handle of `agent_id`. Returns how many were live.
    pub fn drop_agent(&self, agent_id: &str) -> usize {
        self.current_by_agent.lock().remove(agent_id);
        let ids: Vec<String> = self
            .handles
            .iter()
            .filter(|entry| entry.value().agent_id == agent_id)
            .map(|entry| entry.key().clone())
            .collect();
        let mut dropped = 0;
        for id in ids {
            if let Some((_, handle)) = self.handles.remove(&id) {
                handle.cancel.cancel();
                dropped += 1;
            }
        }
        dropped
    }

    pub fn live_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StartSessionRequest;

    fn handle(agent_id: &str) -> Arc<SessionHandle> {
        let record = AgentSession::new(&StartSessionRequest::new(agent_id, "user"));
        Arc::new(SessionHandle::new(LiveSession::new(record, None)))
    }

    #[test]
    fn test_register_supersedes_previous_handle() {
        let manager = SessionManager::new();
        let first = handle("agent-1");
        let second = handle("agent-1");
        let other = handle("agent-2");

        assert!(manager.register(first.clone()).is_none());
        assert!(manager.register(other.clone()).is_none());
        let replaced = manager.register(second.clone()).unwrap();

        assert_eq!(replaced.id, first.id);
        assert!(manager.get(&first.id).is_none());
        assert_eq!(manager.current_session_id("agent-1"), Some(second.id.clone()));
        assert_eq!(manager.live_count(), 2);
    }

    #[test]
    fn test_release_only_clears_matching_current() {
        let manager = SessionManager::new();
        let first = handle("agent-1");
        manager.register(first.clone());
        manager.release(&first.id);
        assert!(manager.current_session_id("agent-1").is_none());
        assert_eq!(manager.live_count(), 0);
        manager.release("unknown");
    }

    #[test]
    fn test_drop_agent_cancels_handles() {
        let manager = SessionManager::new();
        let a = handle("agent-1");
        let b = handle("agent-2");
        manager.register(a.clone());
        manager.register(b.clone());

        assert_eq!(manager.drop_agent("agent-1"), 1);
        assert!(a.cancel.is_cancelled());
        assert!(!b.cancel.is_cancelled());
        assert!(manager.get(&a.id).is_none());
        assert!(manager.get(&b.id).is_some());
    }

    #[tokio::test]
    async fn test_live_lock_is_exclusive() {
        let h = handle("agent-1");
        let guard = h.live.lock().await;
        assert!(h.live.try_lock().is_err());
        drop(guard);
        assert!(h.live.try_lock().is_ok());
    }
}
