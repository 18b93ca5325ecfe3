use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

const WINDOW: Duration = Duration::from_secs(1);

/// Counts events and logs the rate roughly once per second.
pub struct RateMeter {
    window_start: Instant,
    count: u64,
    last_rate: Option<u64>,
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateMeter {
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            count: 0,
            last_rate: None,
        }
    }

    /// Record one event. Returns the count of the window that just closed, if any.
    pub fn tick(&mut self) -> Option<u64> {
        self.count += 1;
        if self.window_start.elapsed() <= WINDOW {
            return None;
        }

        let rate = self.count;
        info!("{rate} tx/s");
        self.count = 0;
        self.window_start = Instant::now();
        self.last_rate = Some(rate);
        Some(rate)
    }
}

impl fmt::Display for RateMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_rate {
            Some(rate) => write!(f, "{rate} tx/s"),
            None => write!(f, "- tx/s"),
        }
    }
}
