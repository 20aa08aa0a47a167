use std::time::Instant;

/// Source of display refresh signals for a session.
pub trait FrameDriver {
    /// Blocks until the next refresh. `None` once the driver has stopped.
    fn next_frame(&mut self) -> Option<Instant>;
}
