use serde::{Deserialize, Serialize};

/// Public view of a stored credential. There is no value field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialSummary {
    pub key: String,
    pub created_at: i64,
}
