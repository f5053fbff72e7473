//! Typed decoding of a model's tool call and dispatch onto a file store.

use notewarden_traits::{
    FileEntry, FileMetadata, FileStore, FileStoreError, SearchHit, ToolCall,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use super::ToolKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolArgsError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    CreateFile { path: String, content: String },
    DeleteFile { path: String },
    ListFiles { folder: Option<String> },
    SearchContent { query: String, folder: Option<String> },
    GetFileMetadata { path: String },
}

/// A decoded call: the operation plus the notebook it names, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub op: FileOp,
    pub notebook: Option<String>,
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
    notebook: Option<String>,
}

#[derive(Deserialize)]
struct ContentArgs {
    path: String,
    content: String,
    notebook: Option<String>,
}

#[derive(Deserialize)]
struct FolderArgs {
    folder: Option<String>,
    notebook: Option<String>,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    folder: Option<String>,
    notebook: Option<String>,
}

fn parse<T: DeserializeOwned>(kind: ToolKind, arguments: &Value) -> Result<T, ToolArgsError> {
    // Some providers send `null` for argument-less calls.
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments.clone()
    };
    serde_json::from_value(arguments).map_err(|err| ToolArgsError::InvalidArguments {
        tool: kind.as_str().to_string(),
        message: err.to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ToolInvocation {
    pub fn decode(call: &ToolCall) -> Result<Self, ToolArgsError> {
        let kind = ToolKind::from_name(&call.name)
            .ok_or_else(|| ToolArgsError::UnknownTool(call.name.clone()))?;

        let (op, notebook) = match kind {
            ToolKind::ReadFile | ToolKind::DeleteFile | ToolKind::GetFileMetadata => {
                let args: PathArgs = parse(kind, &call.arguments)?;
                let op = match kind {
                    ToolKind::ReadFile => FileOp::ReadFile { path: args.path },
                    ToolKind::DeleteFile => FileOp::DeleteFile { path: args.path },
                    _ => FileOp::GetFileMetadata { path: args.path },
                };
                (op, args.notebook)
            }
            ToolKind::WriteFile | ToolKind::CreateFile => {
                let args: ContentArgs = parse(kind, &call.arguments)?;
                let op = if kind == ToolKind::WriteFile {
                    FileOp::WriteFile {
                        path: args.path,
                        content: args.content,
                    }
                } else {
                    FileOp::CreateFile {
                        path: args.path,
                        content: args.content,
                    }
                };
                (op, args.notebook)
            }
            ToolKind::ListFiles => {
                let args: FolderArgs = parse(kind, &call.arguments)?;
                (
                    FileOp::ListFiles {
                        folder: non_empty(args.folder),
                    },
                    args.notebook,
                )
            }
            ToolKind::SearchContent => {
                let args: SearchArgs = parse(kind, &call.arguments)?;
                (
                    FileOp::SearchContent {
                        query: args.query,
                        folder: non_empty(args.folder),
                    },
                    args.notebook,
                )
            }
        };

        if let Some(path) = op.path()
            && path.trim().is_empty()
        {
            return Err(ToolArgsError::InvalidArguments {
                tool: kind.as_str().to_string(),
                message: "path must not be empty".to_string(),
            });
        }

        Ok(Self {
            op,
            notebook: non_empty(notebook),
        })
    }
}

impl FileOp {
    pub fn kind(&self) -> ToolKind {
        match self {
            FileOp::ReadFile { .. } => ToolKind::ReadFile,
            FileOp::WriteFile { .. } => ToolKind::WriteFile,
            FileOp::CreateFile { .. } => ToolKind::CreateFile,
            FileOp::DeleteFile { .. } => ToolKind::DeleteFile,
            FileOp::ListFiles { .. } => ToolKind::ListFiles,
            FileOp::SearchContent { .. } => ToolKind::SearchContent,
            FileOp::GetFileMetadata { .. } => ToolKind::GetFileMetadata,
        }
    }

    /// File path for file-targeting operations.
    pub fn path(&self) -> Option<&str> {
        match self {
            FileOp::ReadFile { path }
            | FileOp::WriteFile { path, .. }
            | FileOp::CreateFile { path, .. }
            | FileOp::DeleteFile { path }
            | FileOp::GetFileMetadata { path } => Some(path),
            FileOp::ListFiles { .. } | FileOp::SearchContent { .. } => None,
        }
    }

    /// Path or folder the operation touches; `None` means the workspace root.
    pub fn target(&self) -> Option<&str> {
        match self {
            FileOp::ListFiles { folder } | FileOp::SearchContent { folder, .. } => {
                folder.as_deref()
            }
            _ => self.path(),
        }
    }

    /// Short description of the arguments for the audit log. File bodies are
    /// reduced to their length.
    pub fn input_summary(&self) -> String {
        match self {
            FileOp::ReadFile { path }
            | FileOp::DeleteFile { path }
            | FileOp::GetFileMetadata { path } => format!("path={path}"),
            FileOp::WriteFile { path, content } | FileOp::CreateFile { path, content } => {
                format!("path={path} content_len={}", content.chars().count())
            }
            FileOp::ListFiles { folder } => {
                format!("folder={}", folder.as_deref().unwrap_or("/"))
            }
            FileOp::SearchContent { query, folder } => format!(
                "query={query:?} folder={}",
                folder.as_deref().unwrap_or("/")
            ),
        }
    }

    /// Run the operation against `store`.
    pub async fn execute(&self, store: &dyn FileStore) -> Result<OpOutput, FileStoreError> {
        match self {
            FileOp::ReadFile { path } => store.read_file(path).await.map(OpOutput::Content),
            FileOp::WriteFile { path, content } => {
                store.write_file(path, content).await?;
                Ok(OpOutput::Ack(json!({ "path": path, "written": content.len() })))
            }
            FileOp::CreateFile { path, content } => {
                store.create_file(path, content).await?;
                Ok(OpOutput::Ack(json!({ "path": path, "created": true })))
            }
            FileOp::DeleteFile { path } => {
                store.delete_file(path).await?;
                Ok(OpOutput::Ack(json!({ "path": path, "deleted": true })))
            }
            FileOp::ListFiles { folder } => store
                .list_files(folder.as_deref())
                .await
                .map(OpOutput::Entries),
            FileOp::SearchContent { query, folder } => store
                .search_content(query, folder.as_deref())
                .await
                .map(OpOutput::Hits),
            FileOp::GetFileMetadata { path } => {
                store.get_metadata(path).await.map(OpOutput::Metadata)
            }
        }
    }
}

/// What a file-store operation returned, before it is shown to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum OpOutput {
    Content(String),
    Ack(Value),
    Entries(Vec<FileEntry>),
    Hits(Vec<SearchHit>),
    Metadata(FileMetadata),
}

impl OpOutput {
    /// Drop listed entries or search hits for which `keep(path, is_dir)` is false.
    pub fn retain_paths(&mut self, keep: impl Fn(&str, bool) -> bool) {
        match self {
            OpOutput::Entries(entries) => entries.retain(|entry| keep(&entry.path, entry.is_dir)),
            OpOutput::Hits(hits) => hits.retain(|hit| keep(&hit.path, false)),
            _ => {}
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            OpOutput::Content(text) => Value::String(text),
            OpOutput::Ack(value) => value,
            OpOutput::Entries(entries) => serde_json::to_value(entries).unwrap_or_default(),
            OpOutput::Hits(hits) => serde_json::to_value(hits).unwrap_or_default(),
            OpOutput::Metadata(metadata) => serde_json::to_value(metadata).unwrap_or_default(),
        }
    }
}
