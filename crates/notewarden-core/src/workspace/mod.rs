//! Workspace file stores: the directory-backed [`LocalFileStore`] and the
//! in-memory [`MemoryFileStore`].

mod local;
mod memory;

pub use local::LocalFileStore;
pub use memory::{FileStoreCall, MemoryFileStore};

use notewarden_ai::text_utils::truncate_chars;
use notewarden_traits::{FileStoreError, FileStoreResult, SearchHit};

use crate::security::normalize_path;

/// Upper bound on hits returned by one `search_content` call.
pub const MAX_SEARCH_HITS: usize = 100;
const SNIPPET_CHARS: usize = 160;

/// Workspace-relative form of `path`. An empty result means the root.
pub(crate) fn relative_path(path: &str) -> FileStoreResult<String> {
    normalize_path(path).ok_or_else(|| FileStoreError::Io(format!("invalid path: {path}")))
}

pub(crate) fn require_file_path(path: &str) -> FileStoreResult<String> {
    let relative = relative_path(path)?;
    if relative.is_empty() {
        return Err(FileStoreError::Io("a file path is required".to_string()));
    }
    Ok(relative)
}

fn is_hidden(relative: &str) -> bool {
    relative.split('/').any(|segment| segment.starts_with('.'))
}

/// Append case-insensitive line matches of `needle` (already lowercased)
/// in `content`. Returns false once `hits` is full.
pub(crate) fn scan_lines(
    path: &str,
    content: &str,
    needle: &str,
    hits: &mut Vec<SearchHit>,
) -> bool {
    for (index, line) in content.lines().enumerate() {
        if hits.len() >= MAX_SEARCH_HITS {
            return false;
        }
        if line.to_lowercase().contains(needle) {
            hits.push(SearchHit {
                path: path.to_string(),
                line: index + 1,
                snippet: truncate_chars(line.trim(), SNIPPET_CHARS),
            });
        }
    }
    hits.len() < MAX_SEARCH_HITS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("/notes/./a.md").unwrap(), "notes/a.md");
        assert_eq!(relative_path("").unwrap(), "");
        assert!(relative_path("notes/../../etc/passwd").is_err());
        assert!(require_file_path("/").is_err());
    }

    #[test]
    fn test_scan_lines_is_case_insensitive_and_capped() {
        let mut hits = Vec::new();
        assert!(scan_lines("a.md", "Alpha\nbeta\nALPHABET", "alpha", &mut hits));
        assert_eq!(
            hits.iter().map(|h| h.line).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let many = "x\n".repeat(MAX_SEARCH_HITS + 5);
        let mut hits = Vec::new();
        assert!(!scan_lines("b.md", &many, "x", &mut hits));
        assert_eq!(hits.len(), MAX_SEARCH_HITS);
    }

    #[test]
    fn test_hidden_segments() {
        assert!(is_hidden(".git/config"));
        assert!(is_hidden("notes/.draft.md"));
        assert!(!is_hidden("notes/draft.md"));
    }
}
