use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::media_devices::MediaDevices;
use crate::capture::domain::video_sink::{ReadyState, SinkEvent, VideoSink};
use crate::detection::domain::detector_initializer::{DetectorInitError, DetectorInitializer};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::render::domain::canvas::Canvas;
use crate::render::domain::detection_renderer::{DetectionRenderer, RenderSummary};

use super::frame_driver::FrameDriver;
use super::frame_report::{FrameOutcome, FrameReport, TeardownReport};
use super::infrastructure::background_initializer::{
    spawn_initialization, InitResult, PendingDetector,
};
use super::session_error::SessionError;
use super::session_logger::SessionLogger;
use super::session_options::SessionOptions;
use super::session_state::SessionState;
use super::video_clock::VideoClock;

/// One mounted lifetime of the camera detector: owns the detector, the
/// camera stream, the hidden video sink and the canvas, and runs the
/// self-rescheduling frame loop on the host's refresh signal.
///
/// The host calls [`tick`](Self::tick) once per display refresh. Everything
/// else (initialization results, camera metadata, scheduled frames) is
/// picked up from there.
pub struct DetectionSession<C: Canvas> {
    options: SessionOptions,
    state: SessionState,
    last_error: Option<SessionError>,
    detector: Option<Box<dyn ObjectDetector>>,
    pending: Option<PendingDetector>,
    init_started: bool,
    media_devices: Box<dyn MediaDevices>,
    video: VideoSink,
    canvas: C,
    renderer: DetectionRenderer,
    clock: VideoClock,
    logger: Box<dyn SessionLogger>,
    frame_requested: bool,
}

impl<C: Canvas> DetectionSession<C> {
    pub fn new(
        options: SessionOptions,
        media_devices: Box<dyn MediaDevices>,
        canvas: C,
        logger: Box<dyn SessionLogger>,
    ) -> Self {
        let renderer = DetectionRenderer::new(options.bounds_policy, options.overlay.clone());
        Self {
            options,
            state: SessionState::Loading,
            last_error: None,
            detector: None,
            pending: None,
            init_started: false,
            media_devices,
            video: VideoSink::new(),
            canvas,
            renderer,
            clock: VideoClock::new(),
            logger,
            frame_requested: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn video(&self) -> &VideoSink {
        &self.video
    }

    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// True once the camera stream has no live track left. The last frame
    /// stays on screen but is never inferred on again.
    pub fn is_feed_ended(&self) -> bool {
        self.state == SessionState::Streaming && self.video.is_ended()
    }

    /// Status line for the host UI. Initialization failures read as errors;
    /// a refused camera reads as advice.
    pub fn status_message(&self) -> String {
        match (&self.last_error, self.state) {
            (Some(e), SessionState::InitFailed) => format!("Error: {e}"),
            (Some(e), SessionState::PermissionDenied) => {
                format!("Camera unavailable ({e}). Allow access to the camera and try again.")
            }
            _ if self.is_feed_ended() => "The camera stopped sending video.".to_string(),
            _ => self.state.status_message().to_string(),
        }
    }

    /// Start building the detector on a worker thread. Only one attempt is
    /// allowed per session.
    pub fn begin_initialization(
        &mut self,
        initializer: Arc<dyn DetectorInitializer>,
    ) -> Result<(), DetectorInitError> {
        if self.init_started {
            return Err(DetectorInitError::AlreadyStarted);
        }
        self.init_started = true;
        self.logger.info("Initializing object detector");
        self.pending = Some(spawn_initialization(
            initializer,
            self.options.video_detector_options(),
        ));
        Ok(())
    }

    /// Accept the initialization outcome. On success the camera is
    /// requested immediately.
    pub fn on_detector_initialized(&mut self, result: InitResult) {
        self.init_started = true;
        self.pending = None;

        match result {
            Ok(mut detector) => {
                if self.state != SessionState::Loading {
                    log::warn!("Detector arrived in {} state, closing it", self.state);
                    if let Err(e) = detector.close() {
                        log::warn!("Failed to close surplus detector: {e}");
                    }
                    return;
                }
                self.detector = Some(detector);
                self.transition(SessionState::Ready);
                self.setup_camera();
            }
            Err(e) if self.state == SessionState::Disposed => {
                log::debug!("Ignoring initialization failure after teardown: {e}");
            }
            Err(e) => {
                let error = SessionError::InitializationFailure(e);
                log::error!("{error}");
                self.last_error = Some(error);
                self.transition(SessionState::InitFailed);
            }
        }
    }

    fn setup_camera(&mut self) {
        self.transition(SessionState::PermissionPending);
        let constraints = self.options.media_constraints();
        match self.media_devices.get_user_media(&constraints) {
            Ok(stream) => {
                log::debug!("Camera stream {} granted", stream.id());
                if let Some(mut previous) = self.video.set_src_object(stream) {
                    previous.stop_all_tracks();
                }
            }
            Err(e) => {
                if e.is_access_failure() {
                    log::warn!("Camera unavailable: {e}");
                } else {
                    log::error!("Camera failed to open: {e}");
                }
                self.last_error = Some(SessionError::PermissionDenied(e));
                self.transition(SessionState::PermissionDenied);
            }
        }
    }

    fn on_loaded_metadata(&mut self, width: u32, height: u32) {
        self.video.play();
        self.transition(SessionState::Streaming);
        self.logger
            .info(&format!("Video dimensions: {width}x{height}"));
        self.request_animation_frame();
    }

    /// Schedule one Frame Loop pass on the next refresh. Ignored after
    /// teardown.
    pub fn request_animation_frame(&mut self) {
        if self.state != SessionState::Disposed {
            self.frame_requested = true;
        }
    }

    /// Handle one display refresh.
    pub fn tick(&mut self, now: Instant) -> Option<FrameReport> {
        if self.state == SessionState::Disposed {
            return None;
        }

        if let Some(result) = self.pending.as_ref().and_then(PendingDetector::try_take) {
            self.on_detector_initialized(result);
        }

        if let Some(SinkEvent::LoadedMetadata { width, height }) = self.video.poll() {
            self.on_loaded_metadata(width, height);
        }

        if !std::mem::take(&mut self.frame_requested) {
            return None;
        }
        self.detect_objects(now)
    }

    /// One Frame Loop pass. Always reschedules itself, whatever happened.
    pub fn detect_objects(&mut self, now: Instant) -> Option<FrameReport> {
        let report = self.process_frame(now);
        if let Some(report) = &report {
            self.logger.frame(report);
        }
        self.request_animation_frame();
        report
    }

    fn process_frame(&mut self, now: Instant) -> Option<FrameReport> {
        let detector = self.detector.as_mut()?;
        if self.video.ready_state() != ReadyState::HaveEnoughData {
            return None;
        }
        let frame = self.video.current_frame()?;

        let (width, height) = frame.dimensions();
        self.canvas.set_size(width, height);
        let timestamp_ms = self.clock.timestamp_at(now);

        let mut report = FrameReport {
            frame_index: frame.index(),
            timestamp_ms,
            canvas_size: (self.canvas.width(), self.canvas.height()),
            outcome: FrameOutcome::SurfaceUnavailable,
            inference_ms: 0.0,
            render_ms: 0.0,
        };

        if self.canvas.context_2d().is_none() {
            log::error!("{}", SessionError::RenderSurfaceUnavailable);
            return Some(report);
        }

        let started = Instant::now();
        let result = detector.detect_for_video(frame, timestamp_ms);
        report.inference_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.logger.timing("inference", report.inference_ms);

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Inference failed on frame {}: {e}", frame.index());
                report.outcome = FrameOutcome::InferenceFailed(e.to_string());
                return Some(report);
            }
        };

        let Some(ctx) = self.canvas.context_2d() else {
            log::error!("{}", SessionError::RenderSurfaceUnavailable);
            return Some(report);
        };
        let started = Instant::now();
        let summary = self.renderer.render(ctx, frame, &result);
        report.render_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.logger.timing("render", report.render_ms);

        log_skipped(&summary);
        log::debug!(
            "Frame {} at {timestamp_ms:.1}ms: {} detections, {} drawn",
            frame.index(),
            result.len(),
            summary.drawn.len()
        );
        report.outcome = FrameOutcome::Rendered(summary);
        Some(report)
    }

    /// Release the detector and stop every camera track. Both steps run
    /// even if the other fails. Later calls do nothing.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.state == SessionState::Disposed {
            return report;
        }
        self.frame_requested = false;
        self.pending = None;

        if let Some(mut detector) = self.detector.take() {
            match detector.close() {
                Ok(()) => report.detector_closed = true,
                Err(e) => {
                    log::warn!("Failed to close detector: {e}");
                    report.failures.push(format!("detector: {e}"));
                }
            }
        }

        if let Some(mut stream) = self.video.take_src_object() {
            let total = stream.tracks().len();
            let failures = stream.stop_all_tracks();
            report.tracks_stopped = total - failures.len();
            report
                .failures
                .extend(failures.into_iter().map(|e| format!("track: {e}")));
        }

        self.transition(SessionState::Disposed);
        self.logger.summary();
        report
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        self.logger
            .info(&format!("Session {} -> {}", self.state, next));
        self.state = next;
    }
}

impl<C: Canvas> Drop for DetectionSession<C> {
    fn drop(&mut self) {
        let report = self.teardown();
        if !report.is_clean() {
            log::warn!("Session dropped with cleanup failures: {:?}", report.failures);
        }
    }
}

fn log_skipped(summary: &RenderSummary) {
    for skipped in &summary.skipped {
        let geometric = skipped.defect.is_geometric();
        let error = SessionError::MalformedDetection(skipped.defect.clone());
        if geometric {
            log::warn!("Skipping detection {}: {error}", skipped.index);
        } else {
            log::debug!("Skipping detection {}: {error}", skipped.index);
        }
    }
}

/// Feed refresh signals from `driver` into `session` until the driver stops,
/// the session reaches a terminal state, or the camera feed ends. Returns the
/// number of frames that produced a report.
pub fn run_session<C: Canvas>(
    session: &mut DetectionSession<C>,
    driver: &mut dyn FrameDriver,
) -> usize {
    let mut frames = 0;
    while !session.state().is_terminal() {
        let Some(now) = driver.next_frame() else {
            break;
        };
        if session.tick(now).is_some() {
            frames += 1;
        }
        if session.is_feed_ended() {
            break;
        }
    }
    frames
}
