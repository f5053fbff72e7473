pub mod guard;
pub mod vault;

pub use guard::{GuardDecision, ProposedAction, evaluate, is_allowed, normalize_path};
pub use vault::{CredentialVault, VaultError};
