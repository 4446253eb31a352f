use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::clock::Clock;

const WINDOW: Duration = Duration::from_secs(60);
/// Extra wait past the window boundary so the provider's own window has rolled too.
const WINDOW_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub requests_per_minute: u32,
    /// When false, an exhausted budget is logged but not waited out.
    pub wait_on_limit: bool,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Rolling per-minute call budget for oracle calls.
///
/// One instance per run. `acquire` is called before every oracle attempt; when
/// the budget for the current 60s window is spent it sleeps until the window
/// rolls over and starts a fresh one. Disabled limiters never block.
pub struct RateLimiter {
    settings: RateLimitSettings,
    clock: Arc<dyn Clock>,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings, clock: Arc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            settings,
            clock,
            window: Mutex::new(Window { started, count: 0 }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Calls counted in the current window.
    pub fn count(&self) -> u32 {
        self.lock().count
    }

    pub async fn acquire(&self) {
        if !self.settings.enabled {
            return;
        }

        // The lock is never held across the sleep below.
        let wait = {
            let now = self.clock.now();
            let mut window = self.lock();
            let elapsed = now.saturating_duration_since(window.started);
            if elapsed >= WINDOW {
                window.started = now;
                window.count = 0;
            }

            if window.count >= self.settings.requests_per_minute {
                let remaining = WINDOW.saturating_sub(elapsed) + WINDOW_GRACE;
                if self.settings.wait_on_limit {
                    Some(remaining)
                } else {
                    warn!(
                        count = window.count,
                        limit = self.settings.requests_per_minute,
                        "Rate limit reached, continuing without waiting"
                    );
                    window.count += 1;
                    None
                }
            } else {
                window.count += 1;
                None
            }
        };

        if let Some(wait) = wait {
            warn!(
                wait_secs = wait.as_secs_f64().round(),
                limit = self.settings.requests_per_minute,
                "Rate limit reached, waiting for the next window"
            );
            self.clock.sleep(wait).await;
            let mut window = self.lock();
            window.started = self.clock.now();
            window.count = 1;
            debug!("Rate limit window reset");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(enabled: bool, rpm: u32, wait: bool) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let settings = RateLimitSettings {
            enabled,
            requests_per_minute: rpm,
            wait_on_limit: wait,
        };
        (RateLimiter::new(settings, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_disabled_limiter_never_blocks_or_counts() {
        let (limiter, clock) = limiter(false, 1, true);
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(!limiter.is_enabled());
        assert_eq!(limiter.count(), 0);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_blocks_until_window_rolls_over() {
        let (limiter, clock) = limiter(true, 2, true);
        limiter.acquire().await;
        clock.advance(Duration::from_secs(10));
        limiter.acquire().await;
        assert!(clock.sleeps().is_empty());

        // Third call in the same window waits out the remaining 50s plus grace.
        limiter.acquire().await;
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(53)]);
        assert_eq!(limiter.count(), 1);
    }

    #[tokio::test]
    async fn test_window_resets_after_a_minute() {
        let (limiter, clock) = limiter(true, 2, true);
        limiter.acquire().await;
        limiter.acquire().await;
        clock.advance(Duration::from_secs(61));
        limiter.acquire().await;
        assert!(clock.sleeps().is_empty());
        assert_eq!(limiter.count(), 1);
    }

    #[tokio::test]
    async fn test_no_wait_mode_proceeds_over_budget() {
        let (limiter, clock) = limiter(true, 1, false);
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(clock.sleeps().is_empty());
        assert_eq!(limiter.count(), 2);
    }
}
