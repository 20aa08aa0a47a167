use crate::shared::frame::Frame;

use super::capture_error::CaptureError;
use super::media_stream::MediaStream;

/// How much media the sink has buffered, mirroring the HTML media element
/// readiness levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    /// First frame arrived; dimensions are now known.
    LoadedMetadata { width: u32, height: u32 },
}

/// Hidden video element: owns the attached stream and holds the frame
/// currently "on screen".
#[derive(Debug, Default)]
pub struct VideoSink {
    src_object: Option<MediaStream>,
    current: Option<Frame>,
    ready_state: ReadyState,
    playing: bool,
    metadata_fired: bool,
    ended: bool,
}

impl VideoSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a stream, replacing any previous one. The old stream is
    /// returned so the caller decides how to release it.
    pub fn set_src_object(&mut self, stream: MediaStream) -> Option<MediaStream> {
        let previous = self.src_object.replace(stream);
        self.current = None;
        self.ready_state = ReadyState::HaveNothing;
        self.playing = false;
        self.metadata_fired = false;
        self.ended = false;
        previous
    }

    pub fn src_object(&self) -> Option<&MediaStream> {
        self.src_object.as_ref()
    }

    pub fn take_src_object(&mut self) -> Option<MediaStream> {
        self.current = None;
        self.ready_state = ReadyState::HaveNothing;
        self.playing = false;
        self.ended = false;
        self.src_object.take()
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True once the attached stream has no live track left.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn video_width(&self) -> u32 {
        self.current.as_ref().map_or(0, Frame::width)
    }

    pub fn video_height(&self) -> u32 {
        self.current.as_ref().map_or(0, Frame::height)
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    /// Pull the newest frame from the attached stream.
    ///
    /// Before playback only the first frame is latched (enough to learn the
    /// dimensions); once playing, every new frame replaces the current one.
    /// Returns `LoadedMetadata` exactly once per attached stream. When the
    /// last live track ends the last frame stays visible but readiness
    /// drops below `HaveEnoughData`, so nothing further is inferred on it.
    pub fn poll(&mut self) -> Option<SinkEvent> {
        let stream = self.src_object.as_mut()?;
        if self.ended || (self.current.is_some() && !self.playing) {
            return None;
        }

        let stream_id = stream.id().to_string();
        let ended = match stream.video_track_mut() {
            None => true,
            Some(track) => match track.read_frame() {
                Ok(Some(frame)) => {
                    self.current = Some(frame);
                    false
                }
                Ok(None) => false,
                Err(CaptureError::TrackEnded(id)) => {
                    log::debug!("Video track {id} reported end of stream");
                    true
                }
                Err(e) => {
                    log::warn!("Video track {} read failed: {e}", track.id());
                    false
                }
            },
        };
        if ended {
            self.mark_ended(&stream_id);
            return None;
        }

        let frame = self.current.as_ref()?;
        self.ready_state = if self.playing {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveMetadata
        };

        if self.metadata_fired {
            return None;
        }
        self.metadata_fired = true;
        Some(SinkEvent::LoadedMetadata {
            width: frame.width(),
            height: frame.height(),
        })
    }

    fn mark_ended(&mut self, stream_id: &str) {
        self.ended = true;
        self.playing = false;
        self.ready_state = if self.current.is_some() {
            ReadyState::HaveCurrentData
        } else {
            ReadyState::HaveNothing
        };
        log::warn!("Video stream {stream_id} ended, no more frames will arrive");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_error::CaptureError;
    use crate::capture::domain::media_stream::{MediaStreamTrack, TrackSettings, TrackState};
    use std::collections::VecDeque;

    struct QueueTrack {
        frames: VecDeque<Frame>,
    }

    impl MediaStreamTrack for QueueTrack {
        fn id(&self) -> &str {
            "queue"
        }

        fn settings(&self) -> TrackSettings {
            TrackSettings {
                device_id: "queue".into(),
                width: 8,
                height: 6,
                facing_mode: None,
                frame_rate: None,
            }
        }

        fn ready_state(&self) -> TrackState {
            TrackState::Live
        }

        fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            Ok(self.frames.pop_front())
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }
    }

    fn sink_with_frames(n: usize) -> VideoSink {
        let frames = (0..n).map(|i| Frame::filled(8, 6, [0, 0, 0], i)).collect();
        let mut sink = VideoSink::new();
        sink.set_src_object(MediaStream::new(
            "s",
            vec![Box::new(QueueTrack { frames })],
        ));
        sink
    }

    /// Yields its frames, then reports the end of the stream once and
    /// stays ended.
    struct EndingTrack {
        frames: VecDeque<Frame>,
        state: TrackState,
    }

    impl MediaStreamTrack for EndingTrack {
        fn id(&self) -> &str {
            "ending"
        }

        fn settings(&self) -> TrackSettings {
            TrackSettings {
                device_id: "ending".into(),
                width: 8,
                height: 6,
                facing_mode: None,
                frame_rate: None,
            }
        }

        fn ready_state(&self) -> TrackState {
            self.state
        }

        fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            match self.frames.pop_front() {
                Some(frame) => Ok(Some(frame)),
                None => {
                    self.state = TrackState::Ended;
                    Err(CaptureError::TrackEnded("ending".into()))
                }
            }
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            self.state = TrackState::Ended;
            Ok(())
        }
    }

    fn sink_ending_after(n: usize) -> VideoSink {
        let frames = (0..n).map(|i| Frame::filled(8, 6, [0, 0, 0], i)).collect();
        let mut sink = VideoSink::new();
        sink.set_src_object(MediaStream::new(
            "s",
            vec![Box::new(EndingTrack {
                frames,
                state: TrackState::Live,
            })],
        ));
        sink
    }

    #[test]
    fn test_poll_without_stream_is_quiet() {
        let mut sink = VideoSink::new();
        assert_eq!(sink.poll(), None);
        assert_eq!(sink.ready_state(), ReadyState::HaveNothing);
    }

    #[test]
    fn test_loaded_metadata_fires_once() {
        let mut sink = sink_with_frames(3);
        assert_eq!(
            sink.poll(),
            Some(SinkEvent::LoadedMetadata {
                width: 8,
                height: 6
            })
        );
        assert_eq!(sink.ready_state(), ReadyState::HaveMetadata);
        sink.play();
        assert_eq!(sink.poll(), None);
        assert_eq!(sink.ready_state(), ReadyState::HaveEnoughData);
    }

    #[test]
    fn test_paused_sink_holds_first_frame() {
        let mut sink = sink_with_frames(3);
        sink.poll();
        sink.poll();
        assert_eq!(sink.current_frame().unwrap().index(), 0);
        sink.play();
        sink.poll();
        assert_eq!(sink.current_frame().unwrap().index(), 1);
    }

    #[test]
    fn test_no_frames_means_no_metadata() {
        let mut sink = sink_with_frames(0);
        assert_eq!(sink.poll(), None);
        assert_eq!(sink.video_width(), 0);
        assert_eq!(sink.video_height(), 0);
    }

    #[test]
    fn test_take_src_object_resets_state() {
        let mut sink = sink_with_frames(1);
        sink.poll();
        sink.play();
        assert!(sink.take_src_object().is_some());
        assert!(sink.take_src_object().is_none());
        assert_eq!(sink.ready_state(), ReadyState::HaveNothing);
        assert!(!sink.is_playing());
        assert!(sink.current_frame().is_none());
    }

    #[test]
    fn test_ended_track_drops_below_enough_data() {
        let mut sink = sink_ending_after(2);
        assert!(sink.poll().is_some());
        sink.play();
        sink.poll();
        assert_eq!(sink.ready_state(), ReadyState::HaveEnoughData);

        assert_eq!(sink.poll(), None);
        assert!(sink.is_ended());
        assert_eq!(sink.ready_state(), ReadyState::HaveCurrentData);
        assert_eq!(sink.current_frame().unwrap().index(), 1);

        for _ in 0..5 {
            assert_eq!(sink.poll(), None);
            assert_eq!(sink.ready_state(), ReadyState::HaveCurrentData);
        }
    }

    #[test]
    fn test_stream_without_live_tracks_is_ended() {
        let mut sink = sink_ending_after(0);
        assert_eq!(sink.poll(), None);
        assert!(sink.is_ended());
        assert_eq!(sink.ready_state(), ReadyState::HaveNothing);
        // Track is now Ended, so no live track remains.
        assert_eq!(sink.poll(), None);
        assert!(sink.is_ended());
    }

    #[test]
    fn test_new_stream_clears_ended() {
        let mut sink = sink_ending_after(0);
        sink.poll();
        assert!(sink.is_ended());
        sink.set_src_object(MediaStream::new("t", Vec::new()));
        assert!(!sink.is_ended());
    }
}
