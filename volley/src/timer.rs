use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

/// Fixed-period ticker reporting time since it was started.
pub(crate) struct Timer {
    interval: Interval,
    start: Instant,
    interval_dur: Duration,
}

impl Timer {
    pub async fn new(interval_dur: Duration) -> Self {
        let mut interval = interval(interval_dur);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // NOTE: First tick completes instantly
        let start = interval.tick().await;
        Self {
            interval,
            start,
            interval_dur,
        }
    }

    /// Wait for the next tick and return the time elapsed since the timer started.
    pub async fn tick(&mut self) -> Duration {
        self.interval.tick().await;
        self.start.elapsed()
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl std::fmt::Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.interval_dur))
    }
}
