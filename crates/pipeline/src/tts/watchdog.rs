//! Keep-alive watchdog
//!
//! Some engines silently stop producing audio once a single session has run
//! for a while. A pause immediately followed by a resume keeps them going.
//! The watchdog only owns the timer; what a tick does is up to the caller.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Periodic timer armed while an utterance is being spoken
#[derive(Debug)]
pub struct KeepAliveWatchdog {
    interval: Duration,
    enabled: bool,
    task: Option<JoinHandle<()>>,
}

impl KeepAliveWatchdog {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        Self {
            interval,
            enabled,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking, replacing any previous timer.
    ///
    /// The first tick fires one full interval from now. `on_tick` returning
    /// `false` stops the timer. Must be called from within a tokio runtime.
    pub fn arm<F>(&mut self, mut on_tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.disarm();

        if !self.enabled || self.interval.is_zero() {
            return;
        }

        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !on_tick() {
                    break;
                }
            }
        }));

        tracing::trace!(interval_ms = period.as_millis() as u64, "Keep-alive armed");
    }

    /// Stop the timer. Idempotent.
    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::trace!("Keep-alive disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for KeepAliveWatchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() -> bool + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = count.clone();
        (count, move || {
            ticks.fetch_add(1, Ordering::SeqCst);
            true
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_interval() {
        let mut watchdog = KeepAliveWatchdog::new(Duration::from_secs(10), true);
        let (count, on_tick) = counter();
        watchdog.arm(on_tick);
        assert!(watchdog.is_armed());

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_stops_ticks() {
        let mut watchdog = KeepAliveWatchdog::new(Duration::from_secs(10), true);
        let (count, on_tick) = counter();
        watchdog.arm(on_tick);

        tokio::time::sleep(Duration::from_secs(15)).await;
        watchdog.disarm();
        watchdog.disarm();
        assert!(!watchdog.is_armed());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_timer() {
        let mut watchdog = KeepAliveWatchdog::new(Duration::from_secs(10), true);
        let (first, on_first) = counter();
        let (second, on_second) = counter();

        watchdog.arm(on_first);
        tokio::time::sleep(Duration::from_secs(5)).await;
        watchdog.arm(on_second);

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_returning_false_stops_timer() {
        let mut watchdog = KeepAliveWatchdog::new(Duration::from_secs(1), true);
        watchdog.arm(|| false);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!watchdog.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_never_arms() {
        let mut watchdog = KeepAliveWatchdog::new(Duration::from_secs(1), false);
        let (count, on_tick) = counter();
        watchdog.arm(on_tick);
        assert!(!watchdog.is_armed());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
