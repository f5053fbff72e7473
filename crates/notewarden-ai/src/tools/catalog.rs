//! Tool kinds and the capability each one requires.

use std::fmt;

use notewarden_traits::ToolSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One independently toggleable agent permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    Create,
    Delete,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Read,
        Capability::Write,
        Capability::Create,
        Capability::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::Create => "create",
            Capability::Delete => "delete",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    ReadFile,
    WriteFile,
    CreateFile,
    DeleteFile,
    ListFiles,
    SearchContent,
    GetFileMetadata,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        ToolKind::ReadFile,
        ToolKind::WriteFile,
        ToolKind::CreateFile,
        ToolKind::DeleteFile,
        ToolKind::ListFiles,
        ToolKind::SearchContent,
        ToolKind::GetFileMetadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
            ToolKind::CreateFile => "create_file",
            ToolKind::DeleteFile => "delete_file",
            ToolKind::ListFiles => "list_files",
            ToolKind::SearchContent => "search_content",
            ToolKind::GetFileMetadata => "get_file_metadata",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn required_capability(&self) -> Capability {
        match self {
            ToolKind::ReadFile
            | ToolKind::ListFiles
            | ToolKind::SearchContent
            | ToolKind::GetFileMetadata => Capability::Read,
            ToolKind::WriteFile => Capability::Write,
            ToolKind::CreateFile => Capability::Create,
            ToolKind::DeleteFile => Capability::Delete,
        }
    }

    /// The target is a single file, so its extension is checked.
    pub fn targets_file(&self) -> bool {
        !self.targets_folder()
    }

    /// The target is a folder (`list_files`, `search_content`).
    pub fn targets_folder(&self) -> bool {
        matches!(self, ToolKind::ListFiles | ToolKind::SearchContent)
    }

    /// Successful calls change the workspace.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            ToolKind::WriteFile | ToolKind::CreateFile | ToolKind::DeleteFile
        )
    }

    fn description(&self) -> &'static str {
        match self {
            ToolKind::ReadFile => "Read the full text of a file.",
            ToolKind::WriteFile => "Replace the content of an existing file.",
            ToolKind::CreateFile => "Create a new file. Fails if the file already exists.",
            ToolKind::DeleteFile => "Delete a file.",
            ToolKind::ListFiles => {
                "List files and folders under a folder, or the workspace root when omitted."
            }
            ToolKind::SearchContent => {
                "Search file contents for a case-insensitive substring, optionally within a folder."
            }
            ToolKind::GetFileMetadata => "Get size and modification time of a file.",
        }
    }

    fn parameters(&self) -> Value {
        let notebook = json!({
            "type": "string",
            "description": "Notebook the file belongs to. Defaults to the session notebook."
        });
        let path = json!({ "type": "string", "description": "Workspace-relative file path." });
        let content = json!({ "type": "string", "description": "Full file content." });
        let folder = json!({ "type": "string", "description": "Workspace-relative folder." });

        match self {
            ToolKind::ReadFile | ToolKind::DeleteFile | ToolKind::GetFileMetadata => json!({
                "type": "object",
                "properties": { "path": path, "notebook": notebook },
                "required": ["path"]
            }),
            ToolKind::WriteFile | ToolKind::CreateFile => json!({
                "type": "object",
                "properties": { "path": path, "content": content, "notebook": notebook },
                "required": ["path", "content"]
            }),
            ToolKind::ListFiles => json!({
                "type": "object",
                "properties": { "folder": folder, "notebook": notebook }
            }),
            ToolKind::SearchContent => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text to look for." },
                    "folder": folder,
                    "notebook": notebook
                },
                "required": ["query"]
            }),
        }
    }

    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schemas for every tool whose capability is in `enabled`.
///
/// Only trims what the model is offered; every call is still checked
/// against the agent's scope when it runs.
pub fn tool_catalog(enabled: &[Capability]) -> Vec<ToolSchema> {
    ToolKind::ALL
        .iter()
        .filter(|kind| enabled.contains(&kind.required_capability()))
        .map(ToolKind::schema)
        .collect()
}
