//! Notewarden AI - what an agent may ask for and how its model is called.
//!
//! - [`tools`]: the closed set of file tools, their capability requirements,
//!   argument decoding and dispatch onto a [`notewarden_traits::FileStore`]
//! - [`llm`]: retrying provider wrapper, token estimation and a scripted mock

pub mod llm;
pub mod text_utils;
pub mod tools;

pub use llm::{LlmRetryConfig, RetryingProvider, estimate_request_tokens, estimate_tokens};
pub use tools::{
    Capability, FileOp, OpOutput, ToolArgsError, ToolInvocation, ToolKind, ToolOutput,
    tool_catalog,
};

#[cfg(any(test, feature = "test-utils"))]
pub use llm::mock::{MockProvider, MockStep};
