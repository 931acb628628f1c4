/// Retry policy with exponential backoff and jitter for upstream calls.
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retry attempts allowed after the initial try.
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to backoff (±30%)
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Execute a future, retrying while `is_transient` classifies the failure as
/// recoverable and the attempt budget is not exhausted. The last error is
/// returned unchanged.
pub async fn with_retry<F, Fut, T, E, P>(config: &RetryConfig, is_transient: P, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    let mut backoff = config.initial_backoff;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries || !is_transient(&e) {
                    return Err(e);
                }

                let delay = calculate_backoff(backoff, config.jitter);

                warn!(
                    "Transient failure ({}), retry attempt {}/{} in {:?}",
                    e, attempt, config.max_retries, delay
                );

                tokio::time::sleep(delay).await;

                // Exponential backoff
                backoff = Duration::from_millis(
                    ((backoff.as_millis() as f64 * config.backoff_multiplier)
                        .min(config.max_backoff.as_millis() as f64)) as u64,
                );
            }
        }
    }
}

fn calculate_backoff(base: Duration, jitter: bool) -> Duration {
    if jitter {
        let mut rng = rand::thread_rng();
        let jitter_factor = 1.0 + rng.gen_range(-0.3..0.3); // ±30%
        Duration::from_millis((base.as_millis() as f64 * jitter_factor) as u64)
    } else {
        base
    }
}
