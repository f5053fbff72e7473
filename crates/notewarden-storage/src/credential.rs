//! Sealed per-agent credentials.
//!
//! Rows are keyed `{agent_id}:{key}` so one prefix scan lists an agent's
//! credentials. This layer never sees plaintext.

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::range_utils::{child_prefix, prefix_range};
use crate::time_utils::now_ms;

const CREDENTIALS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("credentials");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub key: String,
    /// base64(nonce || ciphertext || tag)
    sealed: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StoredCredential {
    pub fn new(key: impl Into<String>, sealed: &[u8]) -> Self {
        let now = now_ms();
        Self {
            key: key.into(),
            sealed: STANDARD.encode(sealed),
            created_at: now,
            updated_at: now,
        }
    }

    /// Swap the ciphertext, keeping the original creation time.
    pub fn reseal(&mut self, sealed: &[u8]) {
        self.sealed = STANDARD.encode(sealed);
        self.updated_at = now_ms();
    }

    pub fn sealed_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.sealed)
            .context("Stored credential is not valid base64")
    }
}

fn row_key(agent_id: &str, key: &str) -> String {
    format!("{}:{}", agent_id, key)
}

#[derive(Debug, Clone)]
pub struct CredentialStorage {
    db: Arc<Database>,
}

impl CredentialStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(CREDENTIALS_TABLE)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    pub fn put(&self, agent_id: &str, credential: &StoredCredential) -> Result<()> {
        let data = serde_json::to_vec(credential)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CREDENTIALS_TABLE)?;
            table.insert(row_key(agent_id, &credential.key).as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, agent_id: &str, key: &str) -> Result<Option<StoredCredential>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CREDENTIALS_TABLE)?;
        match table.get(row_key(agent_id, key).as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All credentials of an agent, ordered by key name.
    pub fn list(&self, agent_id: &str) -> Result<Vec<StoredCredential>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CREDENTIALS_TABLE)?;
        let (start, end) = prefix_range(&child_prefix(agent_id));

        let mut items = Vec::new();
        for item in table.range(start.as_str()..end.as_str())? {
            let (_, value) = item?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    pub fn delete(&self, agent_id: &str, key: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(CREDENTIALS_TABLE)?;
            table.remove(row_key(agent_id, key).as_str())?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }
}

/// Drop every credential of an agent inside an outer write transaction.
pub(crate) fn remove_agent_in(txn: &WriteTransaction, agent_id: &str) -> Result<usize> {
    let mut table = txn.open_table(CREDENTIALS_TABLE)?;
    let (start, end) = prefix_range(&child_prefix(agent_id));

    let keys: Vec<String> = table
        .range(start.as_str()..end.as_str())?
        .map(|item| item.map(|(key, _)| key.value().to_string()))
        .collect::<Result<_, _>>()?;
    for key in &keys {
        table.remove(key.as_str())?;
    }
    Ok(keys.len())
}
