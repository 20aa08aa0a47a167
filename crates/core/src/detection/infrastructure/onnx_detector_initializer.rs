use std::sync::Arc;

use crate::detection::domain::detector_initializer::{DetectorInitError, DetectorInitializer};
use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::object_detector::ObjectDetector;

use super::execution_provider::execution_providers_for;
use super::model_resolver::{ModelCache, ProgressFn};
use super::onnx_object_detector::OnnxObjectDetector;

pub type DownloadProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Two-step detector construction: bind the runtime to an execution
/// backend, then fetch the model asset and load it.
#[derive(Default)]
pub struct OnnxDetectorInitializer {
    progress: Option<DownloadProgress>,
}

impl OnnxDetectorInitializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report model download progress as `(downloaded, total)` bytes.
    pub fn with_progress(mut self, progress: DownloadProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl DetectorInitializer for OnnxDetectorInitializer {
    fn initialize(
        &self,
        options: &DetectorOptions,
    ) -> Result<Box<dyn ObjectDetector>, DetectorInitError> {
        options
            .validate()
            .map_err(DetectorInitError::InvalidOptions)?;

        let providers = execution_providers_for(options.delegate)?;
        log::info!("Inference runtime bound to {} delegate", options.delegate);

        let progress = self.progress.clone().map(|cb| -> ProgressFn {
            Box::new(move |downloaded, total| cb(downloaded, total))
        });
        let model_path = ModelCache::user_default()
            .and_then(|cache| cache.fetch(&options.model_asset, progress))
            .map_err(|e| DetectorInitError::ModelAsset(Box::new(e)))?;

        let detector = OnnxObjectDetector::new(&model_path, providers, options.clone())
            .map_err(DetectorInitError::ModelLoad)?;
        log::info!(
            "Object detector ready ({} mode, model {})",
            options.running_mode,
            options.model_asset.name
        );
        Ok(Box::new(detector))
    }
}
