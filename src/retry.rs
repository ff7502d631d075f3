//! Transient-fault retry
//!
//! Wraps a whole extraction stream. When the stream fails with a transient
//! store error the stream is rebuilt from scratch and consumed again, so
//! records already yielded before the failure are yielded a second time.

use crate::error::Result;
use crate::types::BackoffType;
use futures::{stream, Stream, StreamExt};
use rand::Rng;
use std::pin::Pin;
use std::time::Duration;
use tracing::warn;

/// Boxed fallible stream
pub type RetryStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// Retry policy for transient store errors
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on any single delay
    pub max_backoff: Duration,
    /// How delays grow
    pub backoff_type: BackoffType,
    /// Draw each delay uniformly from zero up to the computed backoff
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create the default policy (3 attempts, exponential)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total attempts
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Enable or disable jitter
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Upper bound of the delay after the given failed attempt (0-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }

    /// Actual delay to sleep after the given failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_for(attempt);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }

        let millis = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }
}

struct RetryState<T, F> {
    factory: F,
    inner: RetryStream<T>,
    attempt: u32,
    policy: RetryPolicy,
    label: String,
    finished: bool,
}

/// Consume the stream built by `factory`, rebuilding it on transient errors
///
/// At most `policy.max_attempts` streams are built in total. Any other error,
/// or a transient one on the last attempt, is yielded and ends the stream.
pub fn retry_stream<T, F>(policy: RetryPolicy, label: impl Into<String>, mut factory: F) -> RetryStream<T>
where
    T: Send + 'static,
    F: FnMut() -> RetryStream<T> + Send + 'static,
{
    let state = RetryState {
        inner: factory(),
        factory,
        attempt: 0,
        policy,
        label: label.into(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            match state.inner.next().await {
                Some(Ok(item)) => return Some((Ok(item), state)),
                None => return None,
                Some(Err(err))
                    if err.is_transient() && state.attempt + 1 < state.policy.max_attempts =>
                {
                    let delay = state.policy.delay_for(state.attempt);
                    state.attempt += 1;
                    warn!(
                        "{} unavailable, attempt {}/{}, restarting in {:?}: {}",
                        state.label, state.attempt, state.policy.max_attempts, delay, err
                    );
                    tokio::time::sleep(delay).await;
                    state.inner = (state.factory)();
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
            }
        }
    }))
}
