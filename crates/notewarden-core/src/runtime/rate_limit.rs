//! Per-agent request and token ceilings.
//!
//! Counters live behind [`RateCounterStore`] so they can be shared by every
//! session of an agent; the in-memory store keeps one sliding window of call
//! timestamps per agent.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::models::Agent;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("request limit reached: {used} of {limit} requests in the current window")]
    RequestsPerHour { limit: u32, used: u32 },
    #[error("request needs about {requested} tokens, limit is {limit}")]
    TokensPerRequest { limit: u32, requested: u64 },
}

/// Sliding-window counters shared across sessions.
pub trait RateCounterStore: Send + Sync {
    /// Drop calls at or before `window_start`, then record a call at `now` if
    /// fewer than `limit` remain. Must be atomic per agent. `Err` carries the
    /// number of calls already in the window.
    fn try_acquire(&self, agent_id: &str, now: i64, window_start: i64, limit: u32)
    -> Result<u32, u32>;

    /// Calls recorded after `window_start`.
    fn used(&self, agent_id: &str, window_start: i64) -> u32;

    fn reset(&self, agent_id: &str);
}

#[derive(Debug, Default)]
pub struct InMemoryRateCounters {
    windows: DashMap<String, VecDeque<i64>>,
}

impl InMemoryRateCounters {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateCounterStore for InMemoryRateCounters {
    fn try_acquire(
        &self,
        agent_id: &str,
        now: i64,
        window_start: i64,
        limit: u32,
    ) -> Result<u32, u32> {
        // The entry guard holds the shard lock for the whole check-and-record.
        let mut window = self.windows.entry(agent_id.to_string()).or_default();
        while window.front().is_some_and(|&ts| ts <= window_start) {
            window.pop_front();
        }
        let used = window.len() as u32;
        if used >= limit {
            return Err(used);
        }
        window.push_back(now);
        Ok(used + 1)
    }

    fn used(&self, agent_id: &str, window_start: i64) -> u32 {
        self.windows
            .get(agent_id)
            .map(|window| window.iter().filter(|&&ts| ts > window_start).count() as u32)
            .unwrap_or(0)
    }

    fn reset(&self, agent_id: &str) {
        self.windows.remove(agent_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateUsage {
    pub used: u32,
    pub limit: u32,
    pub window_secs: u64,
}

impl RateUsage {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}

pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub struct RateLimiter {
    counters: Arc<dyn RateCounterStore>,
    clock: Clock,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(counters: Arc<dyn RateCounterStore>, window_secs: u64) -> Self {
        Self::with_clock(
            counters,
            window_secs,
            Arc::new(notewarden_storage::time_utils::now_ms),
        )
    }

    pub fn with_clock(counters: Arc<dyn RateCounterStore>, window_secs: u64, clock: Clock) -> Self {
        Self {
            counters,
            clock,
            window_secs,
        }
    }

    fn window_start(&self, now: i64) -> i64 {
        now - (self.window_secs as i64) * 1000
    }

    /// Reject oversized requests, then take one unit from the agent's window.
    pub fn check_and_consume(
        &self,
        agent: &Agent,
        estimated_tokens: u64,
    ) -> Result<RateUsage, RateLimitError> {
        if estimated_tokens > u64::from(agent.max_tokens_per_request) {
            info!(
                agent_id = %agent.id,
                requested = estimated_tokens,
                limit = agent.max_tokens_per_request,
                "Request exceeds token ceiling"
            );
            return Err(RateLimitError::TokensPerRequest {
                limit: agent.max_tokens_per_request,
                requested: estimated_tokens,
            });
        }

        let now = (self.clock)();
        let limit = agent.max_requests_per_hour;
        match self
            .counters
            .try_acquire(&agent.id, now, self.window_start(now), limit)
        {
            Ok(used) => Ok(RateUsage {
                used,
                limit,
                window_secs: self.window_secs,
            }),
            Err(used) => {
                info!(agent_id = %agent.id, used, limit, "Request limit reached");
                Err(RateLimitError::RequestsPerHour { limit, used })
            }
        }
    }

    pub fn usage(&self, agent: &Agent) -> RateUsage {
        let now = (self.clock)();
        RateUsage {
            used: self.counters.used(&agent.id, self.window_start(now)),
            limit: agent.max_requests_per_hour,
            window_secs: self.window_secs,
        }
    }

    pub fn reset(&self, agent_id: &str) {
        self.counters.reset(agent_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAgent;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn agent(max_requests: u32, max_tokens: u32) -> Agent {
        NewAgent::new("ws", "limited", "mock", "m")
            .with_limits(max_requests, max_tokens)
            .into_agent()
    }

    fn limiter_with_clock() -> (RateLimiter, Arc<AtomicI64>) {
        let now = Arc::new(AtomicI64::new(1_000_000));
        let clock_now = now.clone();
        let limiter = RateLimiter::with_clock(
            Arc::new(InMemoryRateCounters::new()),
            3600,
            Arc::new(move || clock_now.load(Ordering::SeqCst)),
        );
        (limiter, now)
    }

    #[test]
    fn test_n_plus_one_rejected() {
        let (limiter, _) = limiter_with_clock();
        let agent = agent(3, 1000);
        for expected in 1..=3 {
            assert_eq!(limiter.check_and_consume(&agent, 10).unwrap().used, expected);
        }
        assert_eq!(
            limiter.check_and_consume(&agent, 10).unwrap_err(),
            RateLimitError::RequestsPerHour { limit: 3, used: 3 }
        );
        // Rejections do not consume.
        assert_eq!(limiter.usage(&agent).used, 3);
    }

    #[test]
    fn test_window_slides() {
        let (limiter, now) = limiter_with_clock();
        let agent = agent(1, 1000);
        limiter.check_and_consume(&agent, 1).unwrap();
        assert!(limiter.check_and_consume(&agent, 1).is_err());

        now.fetch_add(3_599_000, Ordering::SeqCst);
        assert!(limiter.check_and_consume(&agent, 1).is_err());

        now.fetch_add(1_000, Ordering::SeqCst);
        assert!(limiter.check_and_consume(&agent, 1).is_ok());
    }

    #[test]
    fn test_token_ceiling_rejects_without_consuming() {
        let (limiter, _) = limiter_with_clock();
        let agent = agent(5, 100);
        assert_eq!(
            limiter.check_and_consume(&agent, 101).unwrap_err(),
            RateLimitError::TokensPerRequest {
                limit: 100,
                requested: 101
            }
        );
        assert_eq!(limiter.usage(&agent).used, 0);
        assert!(limiter.check_and_consume(&agent, 100).is_ok());
    }

    #[test]
    fn test_agents_have_separate_budgets() {
        let (limiter, _) = limiter_with_clock();
        let a = agent(1, 1000);
        let b = agent(1, 1000);
        assert!(limiter.check_and_consume(&a, 1).is_ok());
        assert!(limiter.check_and_consume(&b, 1).is_ok());
        assert!(limiter.check_and_consume(&a, 1).is_err());
    }

    #[test]
    fn test_reset_clears_agent_window() {
        let (limiter, _) = limiter_with_clock();
        let agent = agent(1, 1000);
        limiter.check_and_consume(&agent, 1).unwrap();
        limiter.reset(&agent.id);
        assert_eq!(limiter.usage(&agent).remaining(), 1);
    }

    #[test]
    fn test_concurrent_callers_cannot_overspend() {
        let limiter = Arc::new(RateLimiter::new(Arc::new(InMemoryRateCounters::new()), 3600));
        let agent = Arc::new(agent(10, 1000));

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let limiter = limiter.clone();
                let agent = agent.clone();
                std::thread::spawn(move || limiter.check_and_consume(&agent, 1).is_ok())
            })
            .collect();
        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(granted, 10);
        assert_eq!(limiter.usage(&agent).used, 10);
    }
}
