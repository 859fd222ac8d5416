//! Stage scheduling and retry.
//!
//! This module provides:
//! - Retry policies with backoff, jitter and exhaustion hooks
//! - The per-stage driver (health gate, single flight, claim, advance)
//! - The fleet that ticks every driver on an interval

mod driver;
mod fleet;
mod retry;

pub use driver::{StageDriver, StageOutcome};
pub use fleet::{Fleet, StageReport, TickReport};
pub use retry::{
    should_retry, BackoffStrategy, JitterStrategy, NoOpRetryHook, RetryConfig, RetryDecision,
    RetryExhaustedHook, RetryPolicy, RetryState,
};
