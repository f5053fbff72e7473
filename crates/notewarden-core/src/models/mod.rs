pub mod action_log;
pub mod agent;
pub mod credential;
pub mod session;
pub mod validation;

pub use action_log::ActionLog;
pub use agent::{Agent, AgentPatch, Capabilities, NewAgent, Scope, WILDCARD};
pub use credential::CredentialSummary;
pub use session::{AgentSession, FailureReason, SessionStatus, StartSessionRequest};
pub use validation::ValidationError;
