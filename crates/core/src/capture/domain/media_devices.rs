use super::capture_error::CaptureError;
use super::facing_mode::FacingMode;
use super::media_stream::MediaStream;

/// Video track constraints. `facing_mode` is a preference, not a requirement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoConstraints {
    pub facing_mode: Option<FacingMode>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<u32>,
}

/// Request for a camera stream. Audio is never requested.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaConstraints {
    pub video: VideoConstraints,
}

impl MediaConstraints {
    pub fn video_facing(facing_mode: FacingMode) -> Self {
        Self {
            video: VideoConstraints {
                facing_mode: Some(facing_mode),
                ..Default::default()
            },
        }
    }
}

/// Grants access to camera hardware.
pub trait MediaDevices: Send {
    fn get_user_media(
        &mut self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, CaptureError>;
}
