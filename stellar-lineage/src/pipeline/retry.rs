//! Retry with randomized exponential backoff and an exhaustion hook.
//!
//! [`RetryPolicy::call`] wraps one outbound call. Transient failures are
//! retried up to `max_attempts` calls in total; permanent failures return
//! immediately. When the last attempt fails the injected
//! [`RetryExhaustedHook`] runs before the error propagates, which is how the
//! health monitor learns that an upstream has started rate limiting.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{LineageError, Result};

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base (constant)
    Constant,
}

/// Jitter strategy to prevent thundering herd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    None,
    /// Random from 0 to delay
    #[default]
    Full,
    /// Half fixed, half random
    Equal,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of calls, including the first one.
    pub max_attempts: usize,
    /// Base delay between retries in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter_strategy: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::upstream_api()
    }
}

impl RetryConfig {
    /// Seven attempts, random exponential waits capped at 71 seconds.
    #[must_use]
    pub const fn upstream_api() -> Self {
        Self {
            max_attempts: 7,
            base_delay_ms: 1_000,
            max_delay_ms: 71_000,
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::Full,
        }
    }

    /// Four attempts, plain exponential waits from half a second, capped at
    /// 7 seconds.
    #[must_use]
    pub const fn document_store() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 7_000,
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::None,
        }
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub const fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub const fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub const fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }

    /// Rejects configurations that can never make a call or never wait.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(LineageError::Config(
                "retry max_attempts must be >= 1".to_string(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(LineageError::Config(format!(
                "retry max_delay_ms ({}) is below base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }
}

/// Per-call retry bookkeeping.
#[derive(Debug, Default)]
pub struct RetryState {
    /// Number of failed attempts so far.
    pub attempt: usize,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the wait before the next attempt.
    #[must_use]
    pub fn calculate_delay(&self, config: &RetryConfig) -> Duration {
        let base = config.base_delay_ms;
        let max = config.max_delay_ms;
        let attempt = u32::try_from(self.attempt).unwrap_or(u32::MAX);

        let delay = match config.backoff_strategy {
            BackoffStrategy::Exponential => base
                .saturating_mul(2u64.saturating_pow(attempt))
                .min(max),
            BackoffStrategy::Linear => base
                .saturating_mul(u64::from(attempt).saturating_add(1))
                .min(max),
            BackoffStrategy::Constant => base.min(max),
        };

        let jittered = match config.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more retries, give up.
    GiveUp,
}

/// Records one failed attempt and decides what happens next.
#[must_use]
pub fn should_retry(state: &mut RetryState, config: &RetryConfig) -> RetryDecision {
    if state.attempt + 1 >= config.max_attempts {
        state.attempt += 1;
        return RetryDecision::GiveUp;
    }

    let delay = state.calculate_delay(config);
    state.attempt += 1;
    RetryDecision::Retry(delay)
}

/// Callback run once when a retried call fails on its final attempt.
#[async_trait]
pub trait RetryExhaustedHook: Send + Sync {
    /// Observes the exhausted operation and its final error.
    async fn on_exhausted(&self, operation: &str, attempts: usize, error: &LineageError);
}

/// A hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRetryHook;

#[async_trait]
impl RetryExhaustedHook for NoOpRetryHook {
    async fn on_exhausted(&self, _operation: &str, _attempts: usize, _error: &LineageError) {}
}

/// A retry configuration bound to an exhaustion hook.
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    hook: Arc<dyn RetryExhaustedHook>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Creates a policy with no exhaustion hook.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            hook: Arc::new(NoOpRetryHook),
        }
    }

    /// Sets the exhaustion hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn RetryExhaustedHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation`, retrying transient failures.
    ///
    /// Exhaustion returns [`LineageError::RetriesExhausted`] after the hook
    /// has run. Non-transient errors are returned unchanged and do not
    /// trigger the hook.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let mut state = RetryState::new();

        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                tracing::debug!(operation, error = %err, "Not retrying permanent error");
                return Err(err);
            }

            match should_retry(&mut state, &self.config) {
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        operation,
                        attempt = state.attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    tracing::error!(
                        operation,
                        attempts = state.attempt,
                        error = %err,
                        "Retries exhausted"
                    );
                    self.hook.on_exhausted(operation, state.attempt, &err).await;
                    return Err(LineageError::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts: state.attempt,
                        last_error: err.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UpstreamError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast(max_attempts: usize) -> RetryConfig {
        RetryConfig::upstream_api()
            .with_max_attempts(max_attempts)
            .with_base_delay_ms(0)
            .with_jitter(JitterStrategy::None)
    }

    fn rate_limited() -> LineageError {
        UpstreamError::Status {
            api: "horizon".into(),
            url: "https://horizon.example/accounts/GA".into(),
            status: 429,
        }
        .into()
    }

    #[derive(Default)]
    struct RecordingHook {
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl RetryExhaustedHook for RecordingHook {
        async fn on_exhausted(&self, operation: &str, attempts: usize, _error: &LineageError) {
            self.calls.lock().push((operation.to_string(), attempts));
        }
    }

    #[test]
    fn test_presets() {
        let api = RetryConfig::upstream_api();
        assert_eq!(api.max_attempts, 7);
        assert_eq!(api.max_delay_ms, 71_000);
        assert_eq!(api.jitter_strategy, JitterStrategy::Full);

        let docs = RetryConfig::document_store();
        assert_eq!(docs.max_attempts, 4);
        assert_eq!(docs.max_delay_ms, 7_000);
        assert_eq!(docs.jitter_strategy, JitterStrategy::None);

        assert!(docs.max_attempts < api.max_attempts);
        assert!(docs.base_delay_ms < api.base_delay_ms);
        assert!(docs.max_delay_ms < api.max_delay_ms);
    }

    #[test]
    fn test_validate() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(fast(0).validate().is_err());
        assert!(RetryConfig::default()
            .with_max_delay_ms(10)
            .validate()
            .is_err());
    }

    #[test]
    fn test_calculate_delay_exponential_no_jitter() {
        let config = RetryConfig::document_store().with_base_delay_ms(100);
        let mut state = RetryState::new();

        assert_eq!(state.calculate_delay(&config), Duration::from_millis(100));
        state.attempt = 1;
        assert_eq!(state.calculate_delay(&config), Duration::from_millis(200));
        state.attempt = 2;
        assert_eq!(state.calculate_delay(&config), Duration::from_millis(400));
    }

    #[test]
    fn test_calculate_delay_capped_at_max() {
        let config = RetryConfig::document_store();
        let state = RetryState { attempt: 10 };
        assert_eq!(state.calculate_delay(&config), Duration::from_millis(7_000));
    }

    #[test]
    fn test_full_jitter_stays_under_cap() {
        let config = RetryConfig::upstream_api();
        for attempt in 0..12 {
            let state = RetryState { attempt };
            assert!(state.calculate_delay(&config) <= Duration::from_millis(71_000));
        }
    }

    #[test]
    fn test_linear_and_constant_backoff() {
        let linear = fast(3)
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Linear);
        let constant = fast(3)
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Constant);
        let state = RetryState { attempt: 2 };

        assert_eq!(state.calculate_delay(&linear), Duration::from_millis(300));
        assert_eq!(state.calculate_delay(&constant), Duration::from_millis(100));
    }

    #[test]
    fn test_should_retry_counts_total_attempts() {
        let config = fast(3);
        let mut state = RetryState::new();

        assert!(matches!(should_retry(&mut state, &config), RetryDecision::Retry(_)));
        assert!(matches!(should_retry(&mut state, &config), RetryDecision::Retry(_)));
        assert_eq!(should_retry(&mut state, &config), RetryDecision::GiveUp);
        assert_eq!(state.attempt, 3);
    }

    #[tokio::test]
    async fn test_call_success_first_try() {
        let policy = RetryPolicy::new(fast(3));
        let result = policy.call("op", || async { Ok(42) }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_call_success_after_transient_failures() {
        let policy = RetryPolicy::new(fast(5));
        let calls = AtomicUsize::new(0);

        let result = policy
            .call("op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(rate_limited())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_runs_hook_once_after_max_attempts() {
        let hook = Arc::new(RecordingHook::default());
        let policy = RetryPolicy::new(fast(7)).with_hook(hook.clone());
        let calls = AtomicUsize::new(0);

        let result: Result<()> = policy
            .call("horizon.account", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rate_limited()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert!(matches!(
            result,
            Err(LineageError::RetriesExhausted { attempts: 7, .. })
        ));
        assert_eq!(
            hook.calls.lock().clone(),
            vec![("horizon.account".to_string(), 7)]
        );
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let hook = Arc::new(RecordingHook::default());
        let policy = RetryPolicy::new(fast(7)).with_hook(hook.clone());
        let calls = AtomicUsize::new(0);

        let result: Result<()> = policy
            .call("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(LineageError::NotFound("gone".into())) }
            })
            .await;

        assert!(matches!(result, Err(LineageError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(hook.calls.lock().is_empty());
    }
}
