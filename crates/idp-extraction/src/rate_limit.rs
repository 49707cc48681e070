//! A fixed-interval request-per-second limiter shared across a stage's
//! concurrent calls to one provider client (§4.6 Concurrency).

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

pub struct RateLimiter {
    interval: Duration,
    last: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(rps: f32) -> Self {
        let rps = rps.max(0.01);
        Self {
            interval: Duration::from_secs_f32(1.0 / rps),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until at least one interval has elapsed since the previous
    /// acquire, then mark this moment as the new last request time.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last {
            let earliest = previous + self.interval;
            if earliest > now {
                tokio::time::sleep(earliest - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}
