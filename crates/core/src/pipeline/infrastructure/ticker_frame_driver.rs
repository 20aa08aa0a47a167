use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::pipeline::frame_driver::FrameDriver;

/// Fixed-rate refresh signal for hosts without a display.
pub struct TickerFrameDriver {
    ticker: crossbeam_channel::Receiver<Instant>,
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl TickerFrameDriver {
    /// `refresh_hz` must be positive.
    pub fn new(refresh_hz: f64, cancelled: Arc<AtomicBool>) -> Self {
        let period = Duration::from_secs_f64(1.0 / refresh_hz);
        Self {
            ticker: crossbeam_channel::tick(period),
            cancelled,
            deadline: None,
        }
    }

    /// Stop delivering refreshes once `duration` has passed.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.deadline = Some(Instant::now() + duration);
        self
    }
}

impl FrameDriver for TickerFrameDriver {
    fn next_frame(&mut self) -> Option<Instant> {
        if self.cancelled.load(Ordering::Relaxed) {
            return None;
        }
        let now = self.ticker.recv().ok()?;
        if self.cancelled.load(Ordering::Relaxed) {
            return None;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => None,
            _ => Some(now),
        }
    }
}
