use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera access denied for {0}")]
    PermissionDenied(String),
    #[error("no camera found: {0}")]
    NotFound(String),
    #[error("camera {device} failed: {source}")]
    Device {
        device: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("track {0} has ended")]
    TrackEnded(String),
}

impl CaptureError {
    /// Denial and missing hardware both mean "no camera for you" to the
    /// session; everything else is a device fault.
    pub fn is_access_failure(&self) -> bool {
        matches!(
            self,
            CaptureError::PermissionDenied(_) | CaptureError::NotFound(_)
        )
    }
}
