use thiserror::Error;

use super::detector_options::{Delegate, DetectorOptions};
use super::object_detector::ObjectDetector;

#[derive(Error, Debug)]
pub enum DetectorInitError {
    #[error("invalid detector options: {0}")]
    InvalidOptions(String),
    #[error("{0} delegate is not supported on this platform")]
    UnsupportedDelegate(Delegate),
    #[error("failed to start inference runtime: {0}")]
    Runtime(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to fetch model asset: {0}")]
    ModelAsset(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to load model: {0}")]
    ModelLoad(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("detector initialization was already started for this session")]
    AlreadyStarted,
    #[error("initialization worker exited without a result")]
    WorkerLost,
}

/// Builds a ready-to-use detector from options.
///
/// Construction is expensive (runtime start-up, model download and load)
/// and is expected to run off the display thread.
pub trait DetectorInitializer: Send + Sync {
    fn initialize(
        &self,
        options: &DetectorOptions,
    ) -> Result<Box<dyn ObjectDetector>, DetectorInitError>;
}
