//! Fixed-window request budget shared by every upstream call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::RateLimitConfig;

#[derive(Debug, Clone)]
pub(crate) struct RateBudget {
    window: Arc<Mutex<Window>>,
    limit: u32,
    length: Duration,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    used: u32,
}

impl RateBudget {
    pub(crate) fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Arc::new(Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            })),
            limit: config.requests.max(1),
            length: Duration::from_secs(config.window_secs.max(1)),
        }
    }

    /// Take one request slot, sleeping until the window rolls over if none is left.
    pub(crate) async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                if now.duration_since(window.started) >= self.length {
                    window.started = now;
                    window.used = 0;
                }
                if window.used < self.limit {
                    window.used += 1;
                    return;
                }
                (window.started + self.length).saturating_duration_since(now)
            };

            debug!(wait_ms = wait.as_millis() as u64, "request budget exhausted, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Slots left in the current window.
    pub(crate) async fn remaining(&self) -> u32 {
        let window = self.window.lock().await;
        if Instant::now().duration_since(window.started) >= self.length {
            self.limit
        } else {
            self.limit.saturating_sub(window.used)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(requests: u32, window_secs: u64) -> RateBudget {
        RateBudget::new(&RateLimitConfig {
            requests,
            window_secs,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn spends_slots_within_window() {
        let budget = budget(3, 60);
        budget.acquire().await;
        budget.acquire().await;
        assert_eq!(budget.remaining().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_the_next_window_when_exhausted() {
        let budget = budget(2, 60);
        budget.acquire().await;
        budget.acquire().await;

        let start = Instant::now();
        budget.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(budget.remaining().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_shared_between_clones() {
        let budget = budget(2, 60);
        let other = budget.clone();
        budget.acquire().await;
        other.acquire().await;
        assert_eq!(budget.remaining().await, 0);
    }
}
