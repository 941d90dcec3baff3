//! Owned trailing-debounce timer

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// A single cancellable deadline
///
/// `schedule` replaces any armed deadline, so repeated calls implement a
/// trailing debounce. `expired` never resolves while disarmed, which makes it
/// safe to poll from a `select!` branch unconditionally.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer to fire `delay` from now
    pub fn schedule(&mut self, delay: Duration) {
        let deadline = Instant::now() + delay;
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().reset(deadline),
            None => self.sleep = Some(Box::pin(sleep(delay))),
        }
    }

    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.sleep.as_ref().map(|s| s.deadline())
    }

    /// Resolves once when the armed deadline passes, disarming the timer
    pub async fn expired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_pushes_deadline_back() {
        let start = Instant::now();
        let mut timer = DebounceTimer::new();
        timer.schedule(Duration::from_millis(500));
        tokio::time::advance(Duration::from_millis(300)).await;
        timer.schedule(Duration::from_millis(500));

        timer.expired().await;
        assert_eq!(start.elapsed(), Duration::from_millis(800));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_fires() {
        let mut timer = DebounceTimer::new();
        timer.schedule(Duration::from_millis(10));
        timer.cancel();
        assert!(timeout(Duration::from_secs(5), timer.expired()).await.is_err());
    }
}
