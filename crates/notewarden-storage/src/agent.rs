//! Agent definitions, stored as JSON blobs keyed by agent id.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use std::sync::Arc;

const AGENT_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("agents");

#[derive(Debug, Clone)]
pub struct AgentStorage {
    db: Arc<Database>,
}

impl AgentStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(AGENT_TABLE)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    pub fn put_raw(&self, id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AGENT_TABLE)?;
            table.insert(id, data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_raw(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AGENT_TABLE)?;
        Ok(table.get(id)?.map(|value| value.value().to_vec()))
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.get_raw(id)?.is_some())
    }

    /// All agents in id order.
    pub fn list_raw(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AGENT_TABLE)?;

        let mut agents = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            agents.push((key.value().to_string(), value.value().to_vec()));
        }
        Ok(agents)
    }
}

/// Whether the agent row exists, as seen by an outer write transaction.
pub(crate) fn contains_in(txn: &WriteTransaction, agent_id: &str) -> Result<bool> {
    let table = txn.open_table(AGENT_TABLE)?;
    Ok(table.get(agent_id)?.is_some())
}

/// Remove an agent row inside an outer write transaction.
pub(crate) fn remove_in(txn: &WriteTransaction, agent_id: &str) -> Result<bool> {
    let mut table = txn.open_table(AGENT_TABLE)?;
    Ok(table.remove(agent_id)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::backends::InMemoryBackend;

    fn storage() -> AgentStorage {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .unwrap();
        AgentStorage::new(Arc::new(db)).unwrap()
    }

    #[test]
    fn put_replaces_and_lists_in_id_order() {
        let storage = storage();
        storage.put_raw("agent-b", b"{\"name\":\"b\"}").unwrap();
        storage.put_raw("agent-a", b"{\"name\":\"a\"}").unwrap();
        storage.put_raw("agent-a", b"{\"name\":\"a2\"}").unwrap();

        let ids: Vec<String> = storage.list_raw().unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["agent-a", "agent-b"]);
        assert_eq!(
            storage.get_raw("agent-a").unwrap().unwrap(),
            b"{\"name\":\"a2\"}"
        );
        assert!(!storage.exists("agent-c").unwrap());
    }

    #[test]
    fn remove_in_reports_whether_row_existed() {
        let storage = storage();
        storage.put_raw("agent-1", b"{}").unwrap();

        let txn = storage.db.begin_write().unwrap();
        assert!(remove_in(&txn, "agent-1").unwrap());
        assert!(!remove_in(&txn, "agent-1").unwrap());
        txn.commit().unwrap();

        assert!(storage.get_raw("agent-1").unwrap().is_none());
    }
}
