//! Session runtime: rate limiting, prompt construction, tool routing and the
//! execution loop.

pub mod executor;
pub mod prompt;
pub mod provider;
pub mod rate_limit;
pub mod router;
pub mod session;

pub use executor::{ExecutionLoop, SendMessageOutcome};
pub use prompt::build_system_prompt;
pub use provider::{NoProviders, ProviderCredentials, ProviderFactory};
pub use rate_limit::{
    InMemoryRateCounters, RateCounterStore, RateLimitError, RateLimiter, RateUsage,
};
pub use router::{SCOPE_DENIED_MESSAGE, ToolRouter};
pub use session::{LiveSession, SessionHandle, SessionManager};
