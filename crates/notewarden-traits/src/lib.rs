//! Notewarden Traits - contracts with the collaborators outside the core.
//!
//! The core never talks to a model vendor or a storage engine directly. It
//! only sees:
//! - [`LlmProvider`]: `generate(messages, tools) -> {content, tool_calls, tokens_used}`
//! - [`FileStore`]: the seven file operations an agent may request

pub mod file_store;
pub mod llm;

pub use file_store::{
    FileEntry, FileMetadata, FileStore, FileStoreError, FileStoreResult, SearchHit,
};
pub use llm::{
    ChatMessage, GenerateRequest, GenerateResponse, LlmProvider, ProviderError, Role, ToolCall,
    ToolSchema,
};
