//! Rate limiting for the proxy's rendering mode
//!
//! When the proxy connection string asks for JavaScript rendering, the proxy
//! accepts at most [`RENDER_REQUESTS_PER_MINUTE`] requests per wall-clock
//! minute. [`RenderingRateLimiter::acquire`] is awaited before every fetch;
//! the fourth fetch within one minute waits for the next minute boundary.
//!
//! Windows are aligned to the clock's `(hour, minute)`, not sliding.

use chrono::{Local, NaiveDateTime, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Fetches allowed per wall-clock minute in rendering mode
pub const RENDER_REQUESTS_PER_MINUTE: u32 = 3;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// The current minute window and how many fetches it has admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteWindow {
    window_start: (u32, u32),
    count_in_window: u32,
}

impl MinuteWindow {
    /// An empty window for the minute containing `now`
    pub fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            window_start: hour_minute(now),
            count_in_window: 0,
        }
    }

    /// Admits one fetch at `now`
    ///
    /// # Returns
    ///
    /// * `None` - The fetch may proceed and has been counted
    /// * `Some(wait)` - The window is full; wait this long for the next
    ///   minute, then call [`MinuteWindow::restart`]
    pub fn admit(&mut self, now: NaiveDateTime) -> Option<Duration> {
        if hour_minute(now) != self.window_start {
            self.restart(now);
            return None;
        }

        if self.count_in_window >= RENDER_REQUESTS_PER_MINUTE {
            return Some(until_next_minute(now));
        }

        self.count_in_window += 1;
        None
    }

    /// Opens a new window at `now` with one fetch (the caller's) counted
    pub fn restart(&mut self, now: NaiveDateTime) {
        self.window_start = hour_minute(now);
        self.count_in_window = 1;
    }

    pub fn count(&self) -> u32 {
        self.count_in_window
    }

    pub fn window_start(&self) -> (u32, u32) {
        self.window_start
    }
}

/// Gate awaited before every network fetch
pub struct RenderingRateLimiter {
    enabled: bool,
    clock: Arc<dyn Clock>,
    window: Mutex<MinuteWindow>,
}

impl RenderingRateLimiter {
    /// Creates a limiter; a disabled limiter never waits
    pub fn new(enabled: bool) -> Self {
        Self::with_clock(enabled, Arc::new(LocalClock))
    }

    pub fn with_clock(enabled: bool, clock: Arc<dyn Clock>) -> Self {
        let window = MinuteWindow::starting_at(clock.now());
        if enabled {
            tracing::info!(
                "Rendering mode active; limiting fetches to {} per minute",
                RENDER_REQUESTS_PER_MINUTE
            );
        }
        Self {
            enabled,
            clock,
            window: Mutex::new(window),
        }
    }

    /// Waits until one more fetch is allowed
    ///
    /// Holds the window lock while waiting, so rendering-mode fetches are
    /// admitted one at a time in arrival order.
    pub async fn acquire(&self) {
        if !self.enabled {
            return;
        }

        let mut window = self.window.lock().await;
        if let Some(wait) = window.admit(self.clock.now()) {
            tracing::info!(
                "{} rendering fetches already this minute; waiting {:?}",
                RENDER_REQUESTS_PER_MINUTE,
                wait
            );
            tokio::time::sleep(wait).await;
            window.restart(self.clock.now());
        }
    }

    /// Snapshot of the current window
    pub async fn window(&self) -> MinuteWindow {
        *self.window.lock().await
    }
}

fn hour_minute(now: NaiveDateTime) -> (u32, u32) {
    (now.hour(), now.minute())
}

fn until_next_minute(now: NaiveDateTime) -> Duration {
    let into_minute =
        Duration::from_secs(now.second() as u64) + Duration::from_nanos(now.nanosecond() as u64);
    Duration::from_secs(60).saturating_sub(into_minute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Mutex as StdMutex;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    struct ManualClock(StdMutex<NaiveDateTime>);

    impl ManualClock {
        fn new(now: NaiveDateTime) -> Arc<Self> {
            Arc::new(Self(StdMutex::new(now)))
        }

        fn set(&self, now: NaiveDateTime) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn test_three_per_minute_then_wait() {
        let mut window = MinuteWindow::starting_at(at(10, 15, 0));

        assert_eq!(window.admit(at(10, 15, 1)), None);
        assert_eq!(window.admit(at(10, 15, 2)), None);
        assert_eq!(window.admit(at(10, 15, 3)), None);
        assert_eq!(window.count(), 3);

        assert_eq!(window.admit(at(10, 15, 45)), Some(Duration::from_secs(15)));
        // A refused admission is not counted
        assert_eq!(window.count(), 3);
    }

    #[test]
    fn test_new_minute_resets_window() {
        let mut window = MinuteWindow::starting_at(at(10, 15, 0));
        for _ in 0..3 {
            window.admit(at(10, 15, 30));
        }

        assert_eq!(window.admit(at(10, 16, 0)), None);
        assert_eq!(window.window_start(), (10, 16));
        assert_eq!(window.count(), 1);
    }

    #[test]
    fn test_hour_change_with_same_minute_resets() {
        let mut window = MinuteWindow::starting_at(at(10, 15, 0));
        for _ in 0..3 {
            window.admit(at(10, 15, 0));
        }
        assert_eq!(window.admit(at(11, 15, 0)), None);
        assert_eq!(window.window_start(), (11, 15));
    }

    #[test]
    fn test_ceiling_holds_within_any_minute() {
        let mut window = MinuteWindow::starting_at(at(9, 0, 0));
        let mut admitted_per_minute = std::collections::HashMap::new();

        for second in 0..180u32 {
            let now = at(9, second / 60, second % 60);
            if window.admit(now).is_none() {
                *admitted_per_minute.entry(now.minute()).or_insert(0) += 1;
            }
        }

        assert!(admitted_per_minute.values().all(|&n| n <= RENDER_REQUESTS_PER_MINUTE));
        assert_eq!(admitted_per_minute.len(), 3);
    }

    #[test]
    fn test_wait_accounts_for_subsecond_offset() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(10, 15, 59, 250)
            .unwrap();
        assert_eq!(until_next_minute(now), Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_disabled_limiter_never_waits() {
        let clock = ManualClock::new(at(12, 0, 0));
        let limiter = RenderingRateLimiter::with_clock(false, clock);

        let started = tokio::time::Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.window().await.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fourth_fetch_waits_for_minute_boundary() {
        let clock = ManualClock::new(at(12, 0, 50));
        let limiter = RenderingRateLimiter::with_clock(true, clock.clone());

        let started = tokio::time::Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(started.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_secs(10));

        let window = limiter.window().await;
        assert_eq!(window.count(), 1);

        // Once the wall clock moves on, the window follows it
        clock.set(at(12, 1, 5));
        limiter.acquire().await;
        let window = limiter.window().await;
        assert_eq!(window.window_start(), (12, 1));
        assert_eq!(window.count(), 1);
    }
}
