use thiserror::Error;

use crate::shared::frame::Frame;

use super::detection::DetectionResult;
use super::detector_options::RunningMode;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("timestamp {current}ms is not after previous {previous}ms")]
    NonMonotonicTimestamp { previous: f64, current: f64 },
    #[error("detector is configured for {configured} mode")]
    WrongRunningMode { configured: RunningMode },
    #[error("detector has been closed")]
    Closed,
    #[error("inference failed: {0}")]
    Inference(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain interface for object detection.
///
/// Implementations hold backend resources that must be released with
/// [`close`](ObjectDetector::close) before the handle is dropped.
pub trait ObjectDetector: Send {
    /// Single-image detection. Only valid in IMAGE mode.
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, DetectError>;

    /// Detection on one frame of a stream. Only valid in VIDEO mode;
    /// `timestamp_ms` must increase strictly from call to call.
    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<DetectionResult, DetectError>;

    /// Releases backend resources. Any later call returns [`DetectError::Closed`].
    fn close(&mut self) -> Result<(), DetectError>;
}
