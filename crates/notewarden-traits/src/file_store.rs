//! File store contract.
//!
//! Paths are workspace-relative, `/`-separated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FileStoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FileStoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            std::io::ErrorKind::AlreadyExists => Self::Conflict(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    /// Last modification, milliseconds since the epoch.
    pub modified_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub path: String,
    pub line: usize,
    pub snippet: String,
}

pub type FileStoreResult<T> = Result<T, FileStoreError>;

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read_file(&self, path: &str) -> FileStoreResult<String>;

    /// Overwrite an existing file.
    async fn write_file(&self, path: &str, content: &str) -> FileStoreResult<()>;

    /// Create a new file; `Conflict` if it already exists.
    async fn create_file(&self, path: &str, content: &str) -> FileStoreResult<()>;

    async fn delete_file(&self, path: &str) -> FileStoreResult<()>;

    /// List entries under `folder`, or the workspace root when `None`.
    async fn list_files(&self, folder: Option<&str>) -> FileStoreResult<Vec<FileEntry>>;

    /// Search file contents, optionally restricted to a folder.
    async fn search_content(
        &self,
        query: &str,
        folder: Option<&str>,
    ) -> FileStoreResult<Vec<SearchHit>>;

    async fn get_metadata(&self, path: &str) -> FileStoreResult<FileMetadata>;
}
