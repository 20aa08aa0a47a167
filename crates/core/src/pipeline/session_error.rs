use thiserror::Error;

use crate::capture::domain::capture_error::CaptureError;
use crate::detection::domain::detector_initializer::DetectorInitError;
use crate::render::domain::detection_renderer::DetectionDefect;

/// Everything that can go wrong in a session, as seen by its host.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Runtime or model acquisition failed. Terminal, never retried.
    #[error("failed to initialize the object detection model: {0}")]
    InitializationFailure(#[source] DetectorInitError),
    /// Camera refused or absent. The session stays alive but never streams.
    #[error("camera access was not granted: {0}")]
    PermissionDenied(#[source] CaptureError),
    /// No 2D drawing context; the frame's draw step is skipped.
    #[error("canvas 2D context is not available")]
    RenderSurfaceUnavailable,
    /// A detection that cannot be drawn; skipped on its own.
    #[error("malformed detection: {0}")]
    MalformedDetection(#[source] DetectionDefect),
}

impl SessionError {
    /// Errors that end the useful life of the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::InitializationFailure(_))
    }
}
