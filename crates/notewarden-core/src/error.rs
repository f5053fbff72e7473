use thiserror::Error;

use crate::models::validation::{ValidationError, join_errors};
use crate::security::VaultError;

/// Errors returned by the service layer.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent {0} not found")]
    AgentNotFound(String),
    #[error("Agent {0} is inactive")]
    AgentInactive(String),
    #[error("Session {0} not found")]
    SessionNotFound(String),
    #[error("Session {0} has already ended")]
    SessionEnded(String),
    #[error("Session {0} is already processing a message")]
    SessionBusy(String),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
