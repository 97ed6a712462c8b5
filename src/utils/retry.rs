use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Exponential Backoff
// ============================================================================

#[derive(Clone, Debug)]
pub struct BackoffSchedule {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffSchedule {
    /// Tight schedule for in-process contention (e.g. a parent row raced by
    /// a sibling commit), where the conflicting writer finishes in
    /// milliseconds.
    pub fn quick() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(250),
        }
    }

    /// The waits between attempts: `max_attempts - 1` entries, doubling from
    /// `base_delay` up to `max_delay`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let base = self.base_delay;
        let cap = self.max_delay;
        (0..self.max_attempts.saturating_sub(1)).map(move |i| {
            let factor = 2u32.saturating_pow(i.min(16));
            base.saturating_mul(factor).min(cap)
        })
    }
}

/// Run `operation` until it succeeds, the error is classified as permanent,
/// or the schedule is exhausted. Returns the last error on failure.
pub async fn retry_if<T, E, F, Fut, P>(
    schedule: &BackoffSchedule,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut delays = schedule.delays();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if !should_retry(&error) {
                    tracing::debug!(error = %error, "permanent failure, not retrying");
                    return Err(error);
                }
                match delays.next() {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "transient failure, retrying after delay"
                        );
                        sleep(delay).await;
                    }
                    None => {
                        tracing::error!(attempt, error = %error, "retries exhausted");
                        return Err(error);
                    }
                }
            }
        }
    }
}
