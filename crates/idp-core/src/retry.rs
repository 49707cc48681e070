//! Exponential backoff with jitter for `TRANSIENT` stage errors.
//!
//! Mirrors the retry discipline in §5: base 500ms, factor 2, jitter ±25%,
//! cap 30s, max 5 attempts by default. Only `ErrorKind::is_transient()`
//! errors are retried; everything else returns immediately.

use crate::error::StageError;
use exponential_backoff::Backoff;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_ms: u64,
    pub cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_ms: 500,
            cap_ms: 30_000,
        }
    }
}

fn jittered(duration: Duration) -> Duration {
    use rand::Rng;
    let jitter_fraction = rand::thread_rng().gen_range(-0.25..=0.25);
    let nanos = duration.as_nanos() as f64 * (1.0 + jitter_fraction);
    Duration::from_nanos(nanos.max(0.0) as u64)
}

/// Run `op` until it succeeds, exhausts `cfg.max_attempts`, or fails with a
/// non-transient error. Retries sleep on the current task; callers that need
/// the wait to respect a cancellation token should race this future against
/// the token themselves (the orchestrator does, see `idp-orchestrator`).
pub async fn retry_stage<T, F, Fut>(cfg: &RetryConfig, mut op: F) -> Result<T, StageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StageError>>,
{
    let backoff = Backoff::new(
        cfg.max_attempts,
        Duration::from_millis(cfg.base_ms),
        Duration::from_millis(cfg.cap_ms),
    );
    let mut waits = backoff.into_iter();

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.kind.is_transient() => match waits.next() {
                Some(Some(wait)) => {
                    tokio::time::sleep(jittered(wait)).await;
                }
                _ => return Err(err),
            },
            Err(err) => return Err(err),
        }
    }
}
