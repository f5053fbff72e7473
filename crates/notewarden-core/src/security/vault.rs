//! Credential Vault: per-agent secrets sealed with AES-256-GCM.
//!
//! Each agent gets its own key, SHA-256(master key || "agent:" || agent id).
//! The `agent_id:key` pair is bound as associated data, so a row copied to
//! another agent or key name fails to open.

use notewarden_storage::{CredentialStorage, SecretEncryptor, StoredCredential};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::CredentialSummary;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Credential {key} not found for agent {agent_id}")]
    CredentialNotFound { agent_id: String, key: String },
    #[error("Credential {key} for agent {agent_id} could not be decrypted")]
    DecryptionFailed { agent_id: String, key: String },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub struct CredentialVault {
    storage: CredentialStorage,
    master_key: [u8; 32],
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

fn associated_data(agent_id: &str, key: &str) -> Vec<u8> {
    format!("{}:{}", agent_id, key).into_bytes()
}

impl CredentialVault {
    pub fn new(storage: CredentialStorage, master_key: [u8; 32]) -> Self {
        Self {
            storage,
            master_key,
        }
    }

    fn encryptor_for(&self, agent_id: &str) -> Result<SecretEncryptor, VaultError> {
        let mut hasher = Sha256::new();
        hasher.update(self.master_key);
        hasher.update(b"agent:");
        hasher.update(agent_id.as_bytes());
        Ok(SecretEncryptor::new(&hasher.finalize())?)
    }

    /// Store or replace a secret. Re-setting a key keeps its creation time.
    pub fn set(
        &self,
        agent_id: &str,
        key: &str,
        plaintext: &str,
    ) -> Result<CredentialSummary, VaultError> {
        let sealed = self
            .encryptor_for(agent_id)?
            .encrypt(plaintext.as_bytes(), &associated_data(agent_id, key))?;

        let credential = match self.storage.get(agent_id, key)? {
            Some(mut existing) => {
                existing.reseal(&sealed);
                existing
            }
            None => StoredCredential::new(key, &sealed),
        };
        self.storage.put(agent_id, &credential)?;

        Ok(CredentialSummary {
            key: credential.key,
            created_at: credential.created_at,
        })
    }

    /// Decrypt a secret. Only the session runtime calls this.
    pub(crate) fn reveal(&self, agent_id: &str, key: &str) -> Result<String, VaultError> {
        let credential =
            self.storage
                .get(agent_id, key)?
                .ok_or_else(|| VaultError::CredentialNotFound {
                    agent_id: agent_id.to_string(),
                    key: key.to_string(),
                })?;

        let decryption_failed = || VaultError::DecryptionFailed {
            agent_id: agent_id.to_string(),
            key: key.to_string(),
        };
        let sealed = credential.sealed_bytes().map_err(|_| decryption_failed())?;
        let plaintext = self
            .encryptor_for(agent_id)?
            .decrypt(&sealed, &associated_data(agent_id, key))
            .map_err(|_| decryption_failed())?;
        String::from_utf8(plaintext).map_err(|_| decryption_failed())
    }

    pub fn list(&self, agent_id: &str) -> Result<Vec<CredentialSummary>, VaultError> {
        Ok(self
            .storage
            .list(agent_id)?
            .into_iter()
            .map(|credential| CredentialSummary {
                key: credential.key,
                created_at: credential.created_at,
            })
            .collect())
    }

    /// Returns true if the key existed.
    pub fn delete(&self, agent_id: &str, key: &str) -> Result<bool, VaultError> {
        Ok(self.storage.delete(agent_id, key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notewarden_storage::Storage;
    use std::sync::Arc;

    fn vault_with(storage: &Storage, key: [u8; 32]) -> CredentialVault {
        CredentialVault::new(storage.credentials.clone(), key)
    }

    #[test]
    fn test_set_then_reveal_round_trips() {
        let storage = Storage::in_memory().unwrap();
        let vault = vault_with(&storage, [7u8; 32]);

        vault.set("agent-1", "api_key", "sk-test-🔑").unwrap();
        assert_eq!(vault.reveal("agent-1", "api_key").unwrap(), "sk-test-🔑");
    }

    #[test]
    fn test_list_never_exposes_plaintext() {
        let storage = Storage::in_memory().unwrap();
        let vault = vault_with(&storage, [7u8; 32]);
        vault.set("agent-1", "api_key", "sk-very-secret").unwrap();
        vault.set("agent-1", "base_url", "https://llm.internal").unwrap();

        let summaries = vault.list("agent-1").unwrap();
        let keys: Vec<_> = summaries.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["api_key", "base_url"]);

        let json = serde_json::to_string(&summaries).unwrap();
        assert!(!json.contains("sk-very-secret"));
        assert!(!json.contains("llm.internal"));

        // Nor does the stored row.
        let raw = storage.credentials.get("agent-1", "api_key").unwrap().unwrap();
        let raw_json = serde_json::to_string(&raw).unwrap();
        assert!(!raw_json.contains("sk-very-secret"));
    }

    #[test]
    fn test_reset_replaces_without_duplicating() {
        let storage = Storage::in_memory().unwrap();
        let vault = vault_with(&storage, [7u8; 32]);
        let first = vault.set("agent-1", "api_key", "old").unwrap();
        let second = vault.set("agent-1", "api_key", "new").unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(vault.list("agent-1").unwrap().len(), 1);
        assert_eq!(vault.reveal("agent-1", "api_key").unwrap(), "new");
    }

    #[test]
    fn test_delete_then_reveal_is_not_found() {
        let storage = Storage::in_memory().unwrap();
        let vault = vault_with(&storage, [7u8; 32]);
        vault.set("agent-1", "api_key", "secret").unwrap();

        assert!(vault.delete("agent-1", "api_key").unwrap());
        assert!(!vault.delete("agent-1", "api_key").unwrap());
        assert!(matches!(
            vault.reveal("agent-1", "api_key"),
            Err(VaultError::CredentialNotFound { .. })
        ));
    }

    #[test]
    fn test_rotated_master_key_fails_decryption() {
        let storage = Storage::in_memory().unwrap();
        vault_with(&storage, [7u8; 32])
            .set("agent-1", "api_key", "secret")
            .unwrap();

        let rotated = vault_with(&storage, [8u8; 32]);
        assert!(matches!(
            rotated.reveal("agent-1", "api_key"),
            Err(VaultError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_secrets_are_isolated_per_agent() {
        let storage = Storage::in_memory().unwrap();
        let vault = vault_with(&storage, [7u8; 32]);
        vault.set("agent-1", "api_key", "one").unwrap();

        // Copy agent-1's sealed row under agent-2.
        let row = storage.credentials.get("agent-1", "api_key").unwrap().unwrap();
        storage.credentials.put("agent-2", &row).unwrap();

        assert!(matches!(
            vault.reveal("agent-2", "api_key"),
            Err(VaultError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_concurrent_use_needs_no_lock() {
        let storage = Storage::in_memory().unwrap();
        let vault = Arc::new(vault_with(&storage, [7u8; 32]));
        vault.set("agent-1", "api_key", "shared").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let vault = vault.clone();
                std::thread::spawn(move || vault.reveal("agent-1", "api_key").unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "shared");
        }
    }
}
