use crate::capture::domain::facing_mode::FacingMode;
use crate::capture::domain::media_devices::MediaConstraints;
use crate::detection::domain::detector_options::{DetectorOptions, RunningMode};
use crate::render::domain::detection_renderer::{BoundsPolicy, OverlayStyle};

/// Everything a session needs to know up front.
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    pub detector: DetectorOptions,
    pub facing_mode: FacingMode,
    pub bounds_policy: BoundsPolicy,
    pub overlay: OverlayStyle,
}

impl SessionOptions {
    /// Detector options with the running mode pinned to VIDEO; the frame
    /// loop only ever calls `detect_for_video`.
    pub fn video_detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            running_mode: RunningMode::Video,
            ..self.detector.clone()
        }
    }

    pub fn media_constraints(&self) -> MediaConstraints {
        MediaConstraints::video_facing(self.facing_mode)
    }
}
