use crate::shared::frame::Frame;

use super::capture_error::CaptureError;
use super::facing_mode::FacingMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// Negotiated parameters of a running track.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackSettings {
    pub device_id: String,
    pub width: u32,
    pub height: u32,
    pub facing_mode: Option<FacingMode>,
    pub frame_rate: Option<f64>,
}

/// One video source inside a [`MediaStream`].
///
/// `read_frame` never blocks: it returns the newest decoded frame since the
/// previous call, or `None` if nothing new arrived.
pub trait MediaStreamTrack: Send {
    fn id(&self) -> &str;
    fn settings(&self) -> TrackSettings;
    fn ready_state(&self) -> TrackState;
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
    /// Releases the underlying device. Stopping an ended track is a no-op.
    fn stop(&mut self) -> Result<(), CaptureError>;
}

/// A live camera session: the set of tracks granted by one request.
pub struct MediaStream {
    id: String,
    tracks: Vec<Box<dyn MediaStreamTrack>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<Box<dyn MediaStreamTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Box<dyn MediaStreamTrack>] {
        &self.tracks
    }

    /// True while at least one track is live.
    pub fn is_active(&self) -> bool {
        self.tracks
            .iter()
            .any(|t| t.ready_state() == TrackState::Live)
    }

    /// First live track; frames are read from it.
    pub fn video_track_mut(&mut self) -> Option<&mut Box<dyn MediaStreamTrack>> {
        self.tracks
            .iter_mut()
            .find(|t| t.ready_state() == TrackState::Live)
    }

    /// Stops every track, attempting each one even if an earlier stop failed.
    ///
    /// Returns the failures; an empty vector means every track released.
    pub fn stop_all_tracks(&mut self) -> Vec<CaptureError> {
        let mut failures = Vec::new();
        for track in &mut self.tracks {
            if let Err(e) = track.stop() {
                log::warn!("Failed to stop track {}: {e}", track.id());
                failures.push(e);
            }
        }
        failures
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks.iter().map(|t| t.id()).collect::<Vec<_>>())
            .finish()
    }
}
