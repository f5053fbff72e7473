//! File tools an agent can call.

mod catalog;
mod invocation;
mod output;

pub use catalog::{Capability, ToolKind, tool_catalog};
pub use invocation::{FileOp, OpOutput, ToolArgsError, ToolInvocation};
pub use output::ToolOutput;
