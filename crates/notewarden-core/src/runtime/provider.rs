//! Binding an agent to a model provider.

use notewarden_traits::{LlmProvider, ProviderError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::models::Agent;

/// Decrypted secrets handed to a [`ProviderFactory`] for one session start.
/// `Debug` prints key names only.
#[derive(Default)]
pub struct ProviderCredentials {
    values: BTreeMap<String, String>,
}

impl ProviderCredentials {
    pub(crate) fn insert(&mut self, key: impl Into<String>, value: String) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Builds the provider client for an agent's `provider`/`model` pair.
pub trait ProviderFactory: Send + Sync {
    fn create(
        &self,
        agent: &Agent,
        credentials: &ProviderCredentials,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError>;
}

/// Factory for surfaces that never start conversations.
#[derive(Debug, Default)]
pub struct NoProviders;

impl ProviderFactory for NoProviders {
    fn create(
        &self,
        agent: &Agent,
        _credentials: &ProviderCredentials,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Err(ProviderError::InvalidRequest(format!(
            "no provider binding available for {}",
            agent.provider
        )))
    }
}
