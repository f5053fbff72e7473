use async_trait::async_trait;
use notewarden_traits::{
    FileEntry, FileMetadata, FileStore, FileStoreError, FileStoreResult, SearchHit,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

use super::{is_hidden, relative_path, require_file_path, scan_lines};

/// One operation received by a [`MemoryFileStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStoreCall {
    pub operation: &'static str,
    pub path: Option<String>,
}

/// In-memory `FileStore`. Directories are implied by file paths.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<FileStoreCall>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store.files.lock();
            for (path, content) in files {
                map.insert(path.into(), content.into());
            }
        }
        store
    }

    /// Operations received so far, oldest first.
    pub fn calls(&self) -> Vec<FileStoreCall> {
        self.calls.lock().clone()
    }

    /// Current content of `path`, bypassing the call record.
    pub fn snapshot(&self, path: &str) -> Option<String> {
        self.files.lock().get(path).cloned()
    }

    fn record(&self, operation: &'static str, path: Option<&str>) {
        self.calls.lock().push(FileStoreCall {
            operation,
            path: path.map(str::to_string),
        });
    }

    fn is_dir(files: &BTreeMap<String, String>, relative: &str) -> bool {
        relative.is_empty() || files.keys().any(|path| path.starts_with(&format!("{relative}/")))
    }

    /// Files and implied directories strictly below `folder`.
    fn entries_under(files: &BTreeMap<String, String>, folder: &str) -> Vec<FileEntry> {
        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{folder}/")
        };
        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for path in files.keys().filter(|p| p.starts_with(&prefix) && !is_hidden(p)) {
            let mut end = prefix.len();
            while let Some(offset) = path[end..].find('/') {
                end += offset;
                dirs.insert(path[..end].to_string());
                end += 1;
            }
            entries.push(FileEntry {
                path: path.clone(),
                is_dir: false,
            });
        }
        entries.extend(dirs.into_iter().map(|path| FileEntry { path, is_dir: true }));
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn read_file(&self, path: &str) -> FileStoreResult<String> {
        self.record("read_file", Some(path));
        let relative = require_file_path(path)?;
        self.files
            .lock()
            .get(&relative)
            .cloned()
            .ok_or(FileStoreError::NotFound(relative))
    }

    async fn write_file(&self, path: &str, content: &str) -> FileStoreResult<()> {
        self.record("write_file", Some(path));
        let relative = require_file_path(path)?;
        match self.files.lock().get_mut(&relative) {
            Some(existing) => {
                *existing = content.to_string();
                Ok(())
            }
            None => Err(FileStoreError::NotFound(relative)),
        }
    }

    async fn create_file(&self, path: &str, content: &str) -> FileStoreResult<()> {
        self.record("create_file", Some(path));
        let relative = require_file_path(path)?;
        let mut files = self.files.lock();
        if files.contains_key(&relative) {
            return Err(FileStoreError::Conflict(format!("{relative} already exists")));
        }
        files.insert(relative, content.to_string());
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> FileStoreResult<()> {
        self.record("delete_file", Some(path));
        let relative = require_file_path(path)?;
        self.files
            .lock()
            .remove(&relative)
            .map(|_| ())
            .ok_or(FileStoreError::NotFound(relative))
    }

    async fn list_files(&self, folder: Option<&str>) -> FileStoreResult<Vec<FileEntry>> {
        self.record("list_files", folder);
        let relative = relative_path(folder.unwrap_or(""))?;
        let files = self.files.lock();
        if !Self::is_dir(&files, &relative) {
            return Err(FileStoreError::NotFound(relative));
        }
        Ok(Self::entries_under(&files, &relative))
    }

    async fn search_content(
        &self,
        query: &str,
        folder: Option<&str>,
    ) -> FileStoreResult<Vec<SearchHit>> {
        self.record("search_content", folder);
        let relative = relative_path(folder.unwrap_or(""))?;
        let needle = query.trim().to_lowercase();
        let mut hits = Vec::new();
        if needle.is_empty() {
            return Ok(hits);
        }
        let files = self.files.lock();
        for entry in Self::entries_under(&files, &relative) {
            if entry.is_dir {
                continue;
            }
            let content = files.get(&entry.path).map(String::as_str).unwrap_or_default();
            if !scan_lines(&entry.path, content, &needle, &mut hits) {
                break;
            }
        }
        Ok(hits)
    }

    async fn get_metadata(&self, path: &str) -> FileStoreResult<FileMetadata> {
        self.record("get_file_metadata", Some(path));
        let relative = require_file_path(path)?;
        let files = self.files.lock();
        if let Some(content) = files.get(&relative) {
            return Ok(FileMetadata {
                path: relative,
                size: content.len() as u64,
                is_dir: false,
                modified_at: None,
            });
        }
        if Self::is_dir(&files, &relative) {
            return Ok(FileMetadata {
                path: relative,
                size: 0,
                is_dir: true,
                modified_at: None,
            });
        }
        Err(FileStoreError::NotFound(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryFileStore {
        MemoryFileStore::with_files([
            ("notes/a.md", "alpha"),
            ("notes/deep/b.md", "Alpha two"),
            ("todo.txt", "none"),
        ])
    }

    #[tokio::test]
    async fn test_listing_includes_implied_dirs() {
        let store = store();
        let paths: Vec<_> = store
            .list_files(None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.path, e.is_dir))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("notes".to_string(), true),
                ("notes/a.md".to_string(), false),
                ("notes/deep".to_string(), true),
                ("notes/deep/b.md".to_string(), false),
                ("todo.txt".to_string(), false),
            ]
        );

        let deep = store.list_files(Some("notes/deep")).await.unwrap();
        assert_eq!(deep.len(), 1);
        assert!(store.list_files(Some("nowhere")).await.is_err());
    }

    #[tokio::test]
    async fn test_mutations_and_errors() {
        let store = store();
        store.create_file("notes/c.md", "c").await.unwrap();
        assert!(matches!(
            store.create_file("notes/c.md", "again").await,
            Err(FileStoreError::Conflict(_))
        ));
        assert!(matches!(
            store.write_file("missing.md", "x").await,
            Err(FileStoreError::NotFound(_))
        ));
        store.delete_file("todo.txt").await.unwrap();
        assert!(store.snapshot("todo.txt").is_none());
        assert_eq!(store.calls().len(), 4);
        assert_eq!(store.calls()[0].operation, "create_file");
    }

    #[tokio::test]
    async fn test_search_and_metadata() {
        let store = store();
        let hits = store.search_content("ALPHA", Some("notes")).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(store.get_metadata("notes").await.unwrap().is_dir);
        assert_eq!(store.get_metadata("notes/a.md").await.unwrap().size, 5);
    }
}
