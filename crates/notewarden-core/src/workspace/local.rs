use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notewarden_traits::{
    FileEntry, FileMetadata, FileStore, FileStoreError, FileStoreResult, SearchHit,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use super::{is_hidden, relative_path, require_file_path, scan_lines};

/// `FileStore` rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> FileStoreResult<Self> {
        let store = Self::new(root);
        std::fs::create_dir_all(&store.root)?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_file(&self, path: &str) -> FileStoreResult<(String, PathBuf)> {
        let relative = require_file_path(path)?;
        let full = self.root.join(&relative);
        Ok((relative, full))
    }

    fn resolve_folder(&self, folder: Option<&str>) -> FileStoreResult<PathBuf> {
        let relative = relative_path(folder.unwrap_or(""))?;
        let full = self.root.join(&relative);
        if !full.is_dir() {
            return Err(FileStoreError::NotFound(relative));
        }
        Ok(full)
    }

    /// Walk `start` on a blocking thread, yielding workspace-relative paths.
    async fn walk(&self, start: PathBuf) -> FileStoreResult<Vec<(String, PathBuf, bool)>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            for entry in WalkDir::new(&start)
                .min_depth(1)
                .follow_links(false)
                .sort_by_file_name()
            {
                let entry = entry.map_err(|err| FileStoreError::Io(err.to_string()))?;
                let Ok(relative) = entry.path().strip_prefix(&root) else {
                    continue;
                };
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if is_hidden(&relative) {
                    continue;
                }
                let is_dir = entry.file_type().is_dir();
                entries.push((relative, entry.into_path(), is_dir));
            }
            Ok(entries)
        })
        .await
        .map_err(|err| FileStoreError::Io(err.to_string()))?
    }
}

fn io_error(relative: &str, err: std::io::Error) -> FileStoreError {
    match err.kind() {
        ErrorKind::NotFound => FileStoreError::NotFound(relative.to_string()),
        ErrorKind::AlreadyExists => FileStoreError::Conflict(format!("{relative} already exists")),
        _ => FileStoreError::Io(format!("{relative}: {err}")),
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read_file(&self, path: &str) -> FileStoreResult<String> {
        let (relative, full) = self.resolve_file(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|err| io_error(&relative, err))
    }

    async fn write_file(&self, path: &str, content: &str) -> FileStoreResult<()> {
        let (relative, full) = self.resolve_file(path)?;
        if !full.is_file() {
            return Err(FileStoreError::NotFound(relative));
        }
        tokio::fs::write(&full, content)
            .await
            .map_err(|err| io_error(&relative, err))
    }

    async fn create_file(&self, path: &str, content: &str) -> FileStoreResult<()> {
        let (relative, full) = self.resolve_file(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| io_error(&relative, err))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|err| io_error(&relative, err))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|err| io_error(&relative, err))?;
        file.flush().await.map_err(|err| io_error(&relative, err))
    }

    async fn delete_file(&self, path: &str) -> FileStoreResult<()> {
        let (relative, full) = self.resolve_file(path)?;
        if full.is_dir() {
            return Err(FileStoreError::Io(format!("{relative} is a directory")));
        }
        tokio::fs::remove_file(&full)
            .await
            .map_err(|err| io_error(&relative, err))
    }

    async fn list_files(&self, folder: Option<&str>) -> FileStoreResult<Vec<FileEntry>> {
        let start = self.resolve_folder(folder)?;
        Ok(self
            .walk(start)
            .await?
            .into_iter()
            .map(|(path, _, is_dir)| FileEntry { path, is_dir })
            .collect())
    }

    async fn search_content(
        &self,
        query: &str,
        folder: Option<&str>,
    ) -> FileStoreResult<Vec<SearchHit>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let start = self.resolve_folder(folder)?;
        let mut hits = Vec::new();
        for (relative, full, is_dir) in self.walk(start).await? {
            if is_dir {
                continue;
            }
            // Binary and unreadable files are skipped.
            let Ok(content) = tokio::fs::read_to_string(&full).await else {
                continue;
            };
            if !scan_lines(&relative, &content, &needle, &mut hits) {
                break;
            }
        }
        Ok(hits)
    }

    async fn get_metadata(&self, path: &str) -> FileStoreResult<FileMetadata> {
        let (relative, full) = self.resolve_file(path)?;
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|err| io_error(&relative, err))?;
        let modified_at = metadata
            .modified()
            .ok()
            .map(|time| DateTime::<Utc>::from(time).timestamp_millis());
        Ok(FileMetadata {
            path: relative,
            size: metadata.len(),
            is_dir: metadata.is_dir(),
            modified_at,
        })
    }
}
