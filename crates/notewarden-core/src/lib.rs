//! Notewarden core: scoped LLM agents over a notebook workspace.
//!
//! [`AppCore`] wires storage, the credential vault, the rate limiter, the
//! tool router and live sessions together; [`services`] is the operation
//! surface the UI layer calls.

pub mod audit;
pub mod config;
pub mod error;
pub mod models;
pub mod runtime;
pub mod security;
pub mod services;
pub mod storage;
pub mod workspace;

pub use config::{NotewardenConfig, RuntimeConfig};
pub use error::{AgentError, Result};
pub use models::*;
pub use runtime::SendMessageOutcome;

use notewarden_ai::LlmRetryConfig;
use notewarden_traits::FileStore;
use std::sync::Arc;
use tracing::{info, warn};

use audit::AuditTrail;
use runtime::{
    ExecutionLoop, InMemoryRateCounters, ProviderFactory, RateLimiter, SessionManager, ToolRouter,
};
use security::CredentialVault;
use storage::Storage;

const INTERRUPTED_MESSAGE: &str = "interrupted by restart";

/// Application state shared by every surface (CLI, desktop shell, tests).
pub struct AppCore {
    pub storage: Arc<Storage>,
    pub vault: CredentialVault,
    pub rate_limiter: RateLimiter,
    pub sessions: SessionManager,
    pub router: ToolRouter,
    pub file_store: Arc<dyn FileStore>,
    pub providers: Arc<dyn ProviderFactory>,
    pub runtime: RuntimeConfig,
    pub retry: LlmRetryConfig,
}

impl AppCore {
    /// Open the database and master key named by `config`.
    pub fn new(
        config: &NotewardenConfig,
        file_store: Arc<dyn FileStore>,
        providers: Arc<dyn ProviderFactory>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let storage = Storage::new(config.db_path()?)?;
        let master_key = notewarden_storage::master_key::resolve(&config.master_key_path()?)?;
        Self::with_storage(storage, master_key, file_store, providers, config)
    }

    pub fn with_storage(
        storage: Storage,
        master_key: [u8; 32],
        file_store: Arc<dyn FileStore>,
        providers: Arc<dyn ProviderFactory>,
        config: &NotewardenConfig,
    ) -> anyhow::Result<Self> {
        let storage = Arc::new(storage);
        let interrupted = Self::reconcile_sessions(&storage)?;

        let vault = CredentialVault::new(storage.credentials(), master_key);
        let rate_limiter = RateLimiter::new(
            Arc::new(InMemoryRateCounters::new()),
            config.runtime.rate_window_secs,
        );
        let router = ToolRouter::new(
            file_store.clone(),
            AuditTrail::new(Arc::new(storage.action_logs.clone())),
            config.runtime.summary_limit,
        );

        info!(interrupted, "Initialized notewarden core");

        Ok(Self {
            storage,
            vault,
            rate_limiter,
            sessions: SessionManager::new(),
            router,
            file_store,
            providers,
            runtime: config.runtime.clone(),
            retry: config.retry.clone(),
        })
    }

    /// Fail sessions a previous process left pending or running; their
    /// transcripts and provider bindings are gone.
    fn reconcile_sessions(storage: &Storage) -> anyhow::Result<usize> {
        let mut interrupted = 0;
        for mut session in storage.sessions.list_all()? {
            if session.status.is_active() && session.fail(INTERRUPTED_MESSAGE) {
                storage.sessions.save(&session)?;
                interrupted += 1;
            }
        }
        if interrupted > 0 {
            warn!(count = interrupted, "Marked stale sessions as failed");
        }
        Ok(interrupted)
    }

    pub(crate) fn executor(&self) -> ExecutionLoop<'_> {
        ExecutionLoop {
            storage: &self.storage,
            rate_limiter: &self.rate_limiter,
            router: &self.router,
            config: &self.runtime,
        }
    }
}
