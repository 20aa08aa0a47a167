pub const DETECTOR_MODEL_NAME: &str = "ssd_mobilenet_v1_12.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/object_detection_segmentation/ssd-mobilenetv1/model/ssd_mobilenet_v1_12.onnx";

/// Directory name under the user cache dir where model assets live.
pub const APP_DIR_NAME: &str = "Framewatch";

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

/// Display refresh cadence used by the headless driver.
pub const DEFAULT_REFRESH_HZ: f64 = 60.0;

#[cfg(target_os = "linux")]
pub const DEFAULT_FRONT_DEVICE: &str = "/dev/video0";
#[cfg(target_os = "macos")]
pub const DEFAULT_FRONT_DEVICE: &str = "0";
#[cfg(target_os = "windows")]
pub const DEFAULT_FRONT_DEVICE: &str = "video=Integrated Camera";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const DEFAULT_FRONT_DEVICE: &str = "0";
