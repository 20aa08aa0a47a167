use super::object_detector::DetectError;

/// Enforces strictly increasing timestamps for VIDEO-mode inference.
#[derive(Debug, Default)]
pub struct TimestampGuard {
    last_ms: Option<f64>,
}

impl TimestampGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `timestamp_ms` if it is later than every previous one.
    /// A rejected timestamp leaves the guard unchanged.
    pub fn advance(&mut self, timestamp_ms: f64) -> Result<(), DetectError> {
        let previous = self.last_ms.unwrap_or(f64::NEG_INFINITY);
        if !(timestamp_ms > previous) {
            return Err(DetectError::NonMonotonicTimestamp {
                previous,
                current: timestamp_ms,
            });
        }
        self.last_ms = Some(timestamp_ms);
        Ok(())
    }

    pub fn last_ms(&self) -> Option<f64> {
        self.last_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_timestamp_always_accepted() {
        let mut guard = TimestampGuard::new();
        assert!(guard.advance(0.0).is_ok());
        assert_eq!(guard.last_ms(), Some(0.0));
    }

    #[test]
    fn test_increasing_accepted() {
        let mut guard = TimestampGuard::new();
        for ts in [1.0, 1.5, 16.7, 33.3] {
            assert!(guard.advance(ts).is_ok());
        }
    }

    #[test]
    fn test_equal_rejected() {
        let mut guard = TimestampGuard::new();
        guard.advance(10.0).unwrap();
        assert!(matches!(
            guard.advance(10.0),
            Err(DetectError::NonMonotonicTimestamp { .. })
        ));
    }

    #[test]
    fn test_decreasing_rejected_and_state_kept() {
        let mut guard = TimestampGuard::new();
        guard.advance(10.0).unwrap();
        assert!(guard.advance(5.0).is_err());
        assert_eq!(guard.last_ms(), Some(10.0));
        assert!(guard.advance(10.5).is_ok());
    }

    #[test]
    fn test_nan_rejected() {
        let mut guard = TimestampGuard::new();
        guard.advance(10.0).unwrap();
        assert!(guard.advance(f64::NAN).is_err());
    }

    #[test]
    fn test_leading_nan_rejected() {
        let mut guard = TimestampGuard::new();
        assert!(guard.advance(f64::NAN).is_err());
        assert_eq!(guard.last_ms(), None);
    }
}
