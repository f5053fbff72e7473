//! Provider plumbing shared by every model binding.

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod retry;

pub use retry::{LlmRetryConfig, RetryingProvider};

use notewarden_traits::GenerateRequest;

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Estimate for a full request, counting messages, tool-call arguments and
/// the advertised tool schemas.
pub fn estimate_request_tokens(request: &GenerateRequest) -> u64 {
    let messages: u64 = request
        .messages
        .iter()
        .map(|msg| {
            let calls: u64 = msg
                .tool_calls
                .iter()
                .map(|call| estimate_tokens(&call.name) + estimate_tokens(&call.arguments.to_string()))
                .sum();
            estimate_tokens(&msg.content) + calls
        })
        .sum();
    let tools: u64 = request
        .tools
        .iter()
        .map(|tool| {
            estimate_tokens(&tool.name)
                + estimate_tokens(&tool.description)
                + estimate_tokens(&tool.parameters.to_string())
        })
        .sum();
    messages + tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use notewarden_traits::ChatMessage;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_request_estimate_grows_with_tools() {
        let bare = GenerateRequest::new(vec![ChatMessage::user("read notes/a.md")]);
        let with_tools = bare.clone().with_tools(crate::tool_catalog(&[crate::Capability::Read]));
        assert!(estimate_request_tokens(&with_tools) > estimate_request_tokens(&bare));
    }
}
