//! Scope Guard: decides whether an agent may perform a proposed file action.
//!
//! Checks run in a fixed order and the first failure wins:
//! capability → notebook → folder → file type. Every input resolves to a
//! decision; malformed paths are denied rather than reported as errors.

use glob_match::glob_match;
use notewarden_ai::ToolKind;

use crate::models::{Capabilities, Scope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedAction {
    pub kind: ToolKind,
    pub notebook: Option<String>,
    /// File path for file tools, folder for `list_files`/`search_content`.
    pub path: Option<String>,
    /// Lowercased extension of a file target, `Some("")` when the file has none.
    pub extension: Option<String>,
}

impl ProposedAction {
    pub fn new(kind: ToolKind, notebook: Option<String>, path: Option<String>) -> Self {
        let extension = match (&path, kind.targets_file()) {
            (Some(path), true) => Some(extension_of(path)),
            _ => None,
        };
        Self {
            kind,
            notebook,
            path,
            extension,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl GuardDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

pub fn is_allowed(scope: &Scope, capabilities: &Capabilities, action: &ProposedAction) -> bool {
    evaluate(scope, capabilities, action).allowed
}

pub fn evaluate(
    scope: &Scope,
    capabilities: &Capabilities,
    action: &ProposedAction,
) -> GuardDecision {
    let required = action.kind.required_capability();
    if !capabilities.allows(required) {
        return GuardDecision::deny(format!("{} capability is disabled", required));
    }

    match action.notebook.as_deref() {
        Some(notebook) => {
            if !notebook_matches(&scope.notebooks, notebook) {
                return GuardDecision::deny(format!("notebook {notebook} is outside scope"));
            }
        }
        None if !Scope::is_unrestricted(&scope.notebooks) => {
            return GuardDecision::deny("no notebook given and notebooks are restricted");
        }
        None => {}
    }

    if let Some(raw_path) = action.path.as_deref() {
        let Some(path) = normalize_path(raw_path) else {
            return GuardDecision::deny(format!("path {raw_path} is not a workspace path"));
        };
        if !folder_matches(&scope.folders, &path, action.kind) {
            return GuardDecision::deny(format!("path {path} is outside scope"));
        }
    }

    if let Some(extension) = action.extension.as_deref()
        && !file_type_matches(&scope.file_types, extension)
    {
        return GuardDecision::deny(format!("file type \"{extension}\" is outside scope"));
    }

    GuardDecision::allow()
}

/// Canonical workspace-relative form of `path`: `\` becomes `/`, empty and `.`
/// segments are dropped. Returns `None` for any `..` segment.
pub fn normalize_path(path: &str) -> Option<String> {
    let unified = path.trim().replace('\\', "/");
    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

fn extension_of(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    std::path::Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn has_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn notebook_matches(notebooks: &[String], notebook: &str) -> bool {
    if Scope::is_unrestricted(notebooks) {
        return true;
    }
    notebooks.iter().any(|pattern| {
        let pattern = pattern.trim();
        pattern == notebook || (has_glob(pattern) && glob_match(pattern, notebook))
    })
}

fn folder_matches(folders: &[String], path: &str, kind: ToolKind) -> bool {
    if Scope::is_unrestricted(folders) {
        return true;
    }
    folders.iter().any(|raw| {
        let Some(pattern) = normalize_path(raw) else {
            return false;
        };
        if pattern.is_empty() {
            return false;
        }
        if !has_glob(&pattern) {
            // Bare folder name: the folder and everything below it.
            return path == pattern || path.starts_with(&format!("{pattern}/"));
        }
        if glob_match(&pattern, path) {
            return true;
        }
        // `notes/*` also lets the agent list or search `notes` itself.
        kind.targets_folder()
            && pattern
                .strip_suffix("/**")
                .or_else(|| pattern.strip_suffix("/*"))
                .is_some_and(|base| base == path)
    })
}

fn normalize_file_type(pattern: &str) -> String {
    let pattern = pattern.trim();
    let pattern = pattern.strip_prefix("*.").unwrap_or(pattern);
    let pattern = pattern.strip_prefix('.').unwrap_or(pattern);
    pattern.to_lowercase()
}

fn file_type_matches(file_types: &[String], extension: &str) -> bool {
    if Scope::is_unrestricted(file_types) {
        return true;
    }
    if extension.is_empty() {
        return false;
    }
    file_types.iter().any(|raw| {
        let pattern = normalize_file_type(raw);
        pattern == extension || (has_glob(&pattern) && glob_match(&pattern, extension))
    })
}
