//! Generic retry policy for remote service calls.
//!
//! Both the embedding and completion clients funnel their network calls
//! through [`RetryPolicy::run`], so the backoff schedule and the
//! transient/permanent distinction are defined once.
//!
//! Transient failures (timeouts, HTTP 429, 5xx) are retried with randomized
//! exponential backoff: each wait is drawn uniformly from `min_wait` up to an
//! exponentially growing ceiling capped at `max_wait`. Permanent failures and
//! exhausted retry budgets surface to the caller; nothing is silently
//! swallowed.

use std::time::Duration;

use rand::Rng;

use crate::error::Error;

/// A failed remote call, classified by whether retrying may help.
#[derive(Debug)]
pub struct RemoteError {
    pub message: String,
    pub transient: bool,
}

impl RemoteError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }
}

/// Bounded-attempt randomized exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    /// Up to 6 attempts, waits drawn from 1s growing to a 20s ceiling.
    fn default() -> Self {
        Self {
            max_attempts: 6,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// Run `op`, retrying transient failures until the attempt budget runs
    /// out.
    ///
    /// Permanent failures map to [`Error::Remote`] immediately; an exhausted
    /// budget maps to [`Error::ServiceUnavailable`] carrying the last failure
    /// message.
    pub fn run<T>(
        &self,
        service: &'static str,
        mut op: impl FnMut() -> Result<T, RemoteError>,
    ) -> Result<T, Error> {
        let mut last_message = String::new();

        for attempt in 1..=self.max_attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.transient => {
                    tracing::warn!(
                        service,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err.message,
                        "transient failure, backing off"
                    );
                    last_message = err.message;
                    if attempt < self.max_attempts {
                        std::thread::sleep(self.backoff_wait(attempt));
                    }
                }
                Err(err) => {
                    return Err(Error::Remote {
                        service,
                        message: err.message,
                    });
                }
            }
        }

        Err(Error::ServiceUnavailable {
            service,
            attempts: self.max_attempts,
            message: last_message,
        })
    }

    /// Wait before attempt `attempt + 1`: uniform in `[min_wait, ceiling]`
    /// where the ceiling doubles per attempt and is capped at `max_wait`.
    fn backoff_wait(&self, attempt: u32) -> Duration {
        let ceiling = self
            .min_wait
            .saturating_mul(1u32 << (attempt - 1).min(16))
            .min(self.max_wait);
        if ceiling <= self.min_wait {
            return self.min_wait;
        }
        let span = ceiling - self.min_wait;
        self.min_wait + span.mul_f64(rand::thread_rng().gen::<f64>())
    }
}
