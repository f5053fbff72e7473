//! Agent session records with an `agent_id:session_id` index.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use std::sync::Arc;

use crate::range_utils::{child_prefix, prefix_range};

const SESSION_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("agent_sessions");
/// Index table: agent_id:session_id -> session_id
const SESSION_AGENT_INDEX_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("agent_session_index");

#[derive(Debug, Clone)]
pub struct SessionStorage {
    db: Arc<Database>,
}

impl SessionStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(SESSION_TABLE)?;
        write_txn.open_table(SESSION_AGENT_INDEX_TABLE)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Insert or replace a session row and its agent index entry.
    ///
    /// Returns false and writes nothing when `agent_id` has no agent row, so
    /// a turn finishing after its agent was deleted cannot re-create it.
    pub fn put_raw(&self, id: &str, agent_id: &str, data: &[u8]) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        if !crate::agent::contains_in(&write_txn, agent_id)? {
            write_txn.abort()?;
            return Ok(false);
        }
        {
            let mut table = write_txn.open_table(SESSION_TABLE)?;
            table.insert(id, data)?;

            let mut index = write_txn.open_table(SESSION_AGENT_INDEX_TABLE)?;
            let index_key = format!("{}:{}", agent_id, id);
            index.insert(index_key.as_str(), id)?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    pub fn get_raw(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_TABLE)?;
        Ok(table.get(id)?.map(|value| value.value().to_vec()))
    }

    pub fn list_raw(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_TABLE)?;

        let mut sessions = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            sessions.push((key.value().to_string(), value.value().to_vec()));
        }
        Ok(sessions)
    }

    pub fn list_by_agent_raw(&self, agent_id: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(SESSION_AGENT_INDEX_TABLE)?;
        let table = read_txn.open_table(SESSION_TABLE)?;
        let (start, end) = prefix_range(&child_prefix(agent_id));

        let mut sessions = Vec::new();
        for item in index.range(start.as_str()..end.as_str())? {
            let (_, session_id) = item?;
            let session_id = session_id.value().to_string();
            if let Some(value) = table.get(session_id.as_str())? {
                sessions.push((session_id, value.value().to_vec()));
            }
        }
        Ok(sessions)
    }
}

/// Drop every session of an agent inside an outer write transaction.
pub(crate) fn remove_agent_in(txn: &WriteTransaction, agent_id: &str) -> Result<Vec<String>> {
    let mut index = txn.open_table(SESSION_AGENT_INDEX_TABLE)?;
    let mut table = txn.open_table(SESSION_TABLE)?;
    let (start, end) = prefix_range(&child_prefix(agent_id));

    let entries: Vec<(String, String)> = index
        .range(start.as_str()..end.as_str())?
        .map(|item| item.map(|(key, value)| (key.value().to_string(), value.value().to_string())))
        .collect::<Result<_, _>>()?;

    let mut removed = Vec::with_capacity(entries.len());
    for (index_key, session_id) in entries {
        index.remove(index_key.as_str())?;
        table.remove(session_id.as_str())?;
        removed.push(session_id);
    }
    Ok(removed)
}
