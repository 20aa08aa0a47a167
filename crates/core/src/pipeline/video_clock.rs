use std::time::Instant;

/// Session-relative millisecond clock for VIDEO-mode inference.
///
/// Readings are strictly increasing even if two calls land on the same
/// instant or the caller passes an older instant.
#[derive(Debug)]
pub struct VideoClock {
    origin: Instant,
    last_ms: Option<f64>,
}

/// Smallest step forced between two readings.
const MIN_STEP_MS: f64 = 0.001;

impl VideoClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(origin: Instant) -> Self {
        Self {
            origin,
            last_ms: None,
        }
    }

    pub fn now_ms(&mut self) -> f64 {
        self.timestamp_at(Instant::now())
    }

    /// Milliseconds from session start to `at`, bumped past the previous
    /// reading when needed.
    pub fn timestamp_at(&mut self, at: Instant) -> f64 {
        let elapsed = at.saturating_duration_since(self.origin).as_secs_f64() * 1000.0;
        let ts = match self.last_ms {
            Some(last) if elapsed <= last => last + MIN_STEP_MS,
            _ => elapsed,
        };
        self.last_ms = Some(ts);
        ts
    }
}

impl Default for VideoClock {
    fn default() -> Self {
        Self::new()
    }
}
