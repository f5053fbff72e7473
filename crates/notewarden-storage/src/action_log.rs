//! Append-only action log.
//!
//! Keys are `{session_id}:{timestamp_ns:020}:{seq:010}`, so a prefix scan over a
//! session returns entries oldest first. There is no update or
//! delete operation.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::range_utils::{child_prefix, prefix_range};
use crate::time_utils::sortable_nanos;

const ACTION_LOG_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("action_logs");

#[derive(Debug)]
pub struct ActionLogStorage {
    db: Arc<Database>,
    seq: AtomicU64,
}

impl ActionLogStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(ACTION_LOG_TABLE)?;
        write_txn.commit()?;
        Ok(Self {
            db,
            seq: AtomicU64::new(0),
        })
    }

    /// Append one entry for `session_id`; returns the row key.
    pub fn append_raw(&self, session_id: &str, data: &[u8]) -> Result<String> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let key = format!("{}:{}:{:010}", session_id, sortable_nanos(), seq);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ACTION_LOG_TABLE)?;
            table.insert(key.as_str(), data)?;
        }
        write_txn.commit()?;
        Ok(key)
    }

    /// Entries for one session, oldest first.
    pub fn list_by_session_raw(&self, session_id: &str) -> Result<Vec<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTION_LOG_TABLE)?;
        let (start, end) = prefix_range(&child_prefix(session_id));

        let mut entries = Vec::new();
        for item in table.range(start.as_str()..end.as_str())? {
            let (_, value) = item?;
            entries.push(value.value().to_vec());
        }
        Ok(entries)
    }

    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTION_LOG_TABLE)?;
        Ok(table.len()? as usize)
    }
}
