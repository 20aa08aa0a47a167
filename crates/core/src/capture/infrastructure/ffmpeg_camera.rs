use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::facing_mode::FacingMode;
use crate::capture::domain::media_devices::{MediaConstraints, MediaDevices, VideoConstraints};
use crate::capture::domain::media_stream::{
    MediaStream, MediaStreamTrack, TrackSettings, TrackState,
};
use crate::shared::frame::Frame;

#[cfg(target_os = "linux")]
const CAPTURE_INPUT_FORMAT: &str = "v4l2";
#[cfg(target_os = "macos")]
const CAPTURE_INPUT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const CAPTURE_INPUT_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CAPTURE_INPUT_FORMAT: &str = "v4l2";

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// How long `stop` waits for the capture thread before detaching it.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// A camera the host knows about, addressed the way the platform capture
/// input expects (`/dev/video0`, `0`, `video=Integrated Camera`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraDevice {
    pub path: String,
    pub facing: FacingMode,
}

impl CameraDevice {
    pub fn new(path: impl Into<String>, facing: FacingMode) -> Self {
        Self {
            path: path.into(),
            facing,
        }
    }
}

/// Pick the device matching the preferred facing mode, falling back to any
/// other camera when none matches.
pub fn select_device(
    devices: &[CameraDevice],
    preferred: Option<FacingMode>,
) -> Result<&CameraDevice, CaptureError> {
    let Some(preferred) = preferred else {
        return devices
            .first()
            .ok_or_else(|| CaptureError::NotFound("no camera devices configured".into()));
    };

    if let Some(device) = devices.iter().find(|d| d.facing == preferred) {
        return Ok(device);
    }

    match devices.first() {
        Some(device) => {
            log::warn!(
                "No {preferred}-facing camera available, falling back to {} ({})",
                device.path,
                device.facing
            );
            Ok(device)
        }
        None => Err(CaptureError::NotFound(format!(
            "no {preferred}-facing camera configured"
        ))),
    }
}

/// Opens cameras through libavdevice's platform capture input.
pub struct FfmpegMediaDevices {
    devices: Vec<CameraDevice>,
}

impl FfmpegMediaDevices {
    pub fn new(devices: Vec<CameraDevice>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }
}

impl MediaDevices for FfmpegMediaDevices {
    fn get_user_media(
        &mut self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, CaptureError> {
        let device = select_device(&self.devices, constraints.video.facing_mode)?;
        log::info!(
            "Opening {} camera {} via {CAPTURE_INPUT_FORMAT}",
            device.facing,
            device.path
        );
        let track = FfmpegCameraTrack::open(device, &constraints.video)?;
        let id = format!("stream-{}", NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed));
        Ok(MediaStream::new(id, vec![Box::new(track)]))
    }
}

/// Live camera track. A capture thread decodes frames and keeps only the
/// most recent one in a single-slot channel.
pub struct FfmpegCameraTrack {
    id: String,
    settings: TrackSettings,
    frame_rx: crossbeam_channel::Receiver<Frame>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    state: TrackState,
}

impl FfmpegCameraTrack {
    pub fn open(device: &CameraDevice, constraints: &VideoConstraints) -> Result<Self, CaptureError> {
        let source = CaptureSource::open(device, constraints)?;
        let settings = TrackSettings {
            device_id: device.path.clone(),
            width: source.width,
            height: source.height,
            facing_mode: Some(device.facing),
            frame_rate: source.frame_rate,
        };

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = spawn_capture(source, frame_tx, frame_rx.clone(), cancelled.clone());

        Ok(Self {
            id: format!("{}:{}", device.facing, device.path),
            settings,
            frame_rx,
            cancelled,
            handle: Some(handle),
            state: TrackState::Live,
        })
    }
}

impl MediaStreamTrack for FfmpegCameraTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn settings(&self) -> TrackSettings {
        self.settings.clone()
    }

    fn ready_state(&self) -> TrackState {
        self.state
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.state == TrackState::Ended {
            return Err(CaptureError::TrackEnded(self.id.clone()));
        }
        match self.frame_rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(crossbeam_channel::TryRecvError::Empty) => Ok(None),
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                self.state = TrackState::Ended;
                Err(CaptureError::TrackEnded(self.id.clone()))
            }
        }
    }

    /// The capture thread only sees the cancel flag between packets, so a
    /// device that stops delivering would block a plain join. After
    /// `STOP_TIMEOUT` the thread is detached and left to exit on its own.
    fn stop(&mut self) -> Result<(), CaptureError> {
        self.state = TrackState::Ended;
        self.cancelled.store(true, Ordering::Relaxed);
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        if !wait_for_exit(&self.frame_rx, Instant::now() + STOP_TIMEOUT) {
            log::warn!(
                "Capture thread for {} did not stop within {:?}, detaching it",
                self.id,
                STOP_TIMEOUT
            );
            return Err(CaptureError::Device {
                device: self.settings.device_id.clone(),
                source: "capture thread did not stop in time".into(),
            });
        }

        handle.join().map_err(|_| CaptureError::Device {
            device: self.settings.device_id.clone(),
            source: "capture thread panicked".into(),
        })?;
        log::debug!("Camera track {} stopped", self.id);
        Ok(())
    }
}

/// Drain `frames` until every sender is gone (the capture thread exited) or
/// `deadline` passes. Returns true if the thread exited.
fn wait_for_exit(frames: &crossbeam_channel::Receiver<Frame>, deadline: Instant) -> bool {
    loop {
        match frames.recv_deadline(deadline) {
            Ok(_) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return true,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => return false,
        }
    }
}

impl Drop for FfmpegCameraTrack {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Camera track {} stopped with error: {e}", self.id);
        }
    }
}

/// Demuxer and decoder for one opened capture device.
struct CaptureSource {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    stream_index: usize,
    width: u32,
    height: u32,
    frame_rate: Option<f64>,
}

// Safety: CaptureSource is moved into the capture thread once and only
// touched from there afterwards.
unsafe impl Send for CaptureSource {}

impl CaptureSource {
    fn open(device: &CameraDevice, constraints: &VideoConstraints) -> Result<Self, CaptureError> {
        let device_error = |e: ffmpeg_next::Error| map_open_error(&device.path, e);

        ffmpeg_next::init().map_err(device_error)?;
        ffmpeg_next::device::register_all();

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == CAPTURE_INPUT_FORMAT)
            .ok_or_else(|| CaptureError::Device {
                device: device.path.clone(),
                source: format!("capture input '{CAPTURE_INPUT_FORMAT}' not available").into(),
            })?;

        let ictx = ffmpeg_next::format::open_with(
            &device.path,
            &format,
            capture_options(constraints),
        )
        .map_err(device_error)?
        .input();

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::NotFound(format!("{} has no video stream", device.path)))?;
        let stream_index = stream.index();

        let rate = stream.rate();
        let frame_rate = (rate.denominator() != 0 && rate.numerator() != 0)
            .then(|| rate.numerator() as f64 / rate.denominator() as f64);

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(device_error)?;

        Ok(Self {
            width: decoder.width(),
            height: decoder.height(),
            ictx,
            decoder,
            stream_index,
            frame_rate,
        })
    }
}

fn capture_options(constraints: &VideoConstraints) -> ffmpeg_next::Dictionary<'static> {
    let mut options = ffmpeg_next::Dictionary::new();
    if let (Some(w), Some(h)) = (constraints.width, constraints.height) {
        options.set("video_size", &format!("{w}x{h}"));
    }
    if let Some(fps) = constraints.frame_rate {
        options.set("framerate", &fps.to_string());
    }
    options
}

fn map_open_error(device: &str, e: ffmpeg_next::Error) -> CaptureError {
    match e {
        ffmpeg_next::Error::Other { errno } => {
            match std::io::Error::from_raw_os_error(errno).kind() {
                std::io::ErrorKind::PermissionDenied => {
                    CaptureError::PermissionDenied(device.to_string())
                }
                std::io::ErrorKind::NotFound => CaptureError::NotFound(device.to_string()),
                _ => CaptureError::Device {
                    device: device.to_string(),
                    source: Box::new(e),
                },
            }
        }
        ffmpeg_next::Error::StreamNotFound => CaptureError::NotFound(device.to_string()),
        other => CaptureError::Device {
            device: device.to_string(),
            source: Box::new(other),
        },
    }
}

fn spawn_capture(
    mut source: CaptureSource,
    frame_tx: crossbeam_channel::Sender<Frame>,
    frame_slot: crossbeam_channel::Receiver<Frame>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut converter = RgbConverter::default();
        let mut frame_index = 0usize;

        for (stream, packet) in source.ictx.packets() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            if stream.index() != source.stream_index {
                continue;
            }
            if source.decoder.send_packet(&packet).is_err() {
                continue;
            }

            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            while source.decoder.receive_frame(&mut decoded).is_ok() {
                match converter.convert(&decoded, frame_index) {
                    Ok(frame) => {
                        frame_index += 1;
                        publish_latest(&frame_tx, &frame_slot, frame);
                    }
                    Err(e) => log::warn!("Dropping undecodable camera frame: {e}"),
                }
            }
        }
    })
}

/// Replace whatever frame is waiting with `frame`.
fn publish_latest(
    tx: &crossbeam_channel::Sender<Frame>,
    slot: &crossbeam_channel::Receiver<Frame>,
    frame: Frame,
) {
    let _ = slot.try_recv();
    let _ = tx.try_send(frame);
}

/// Source layout a scaler was built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ScalerInput {
    format: ffmpeg_next::format::Pixel,
    width: u32,
    height: u32,
}

impl ScalerInput {
    fn of(frame: &ffmpeg_next::util::frame::video::Video) -> Self {
        Self {
            format: frame.format(),
            width: frame.width(),
            height: frame.height(),
        }
    }
}

/// Converts decoded frames to packed RGB24, rebuilding the scaler whenever
/// the camera changes pixel format or resolution.
#[derive(Default)]
struct RgbConverter {
    scaler: Option<(ScalerInput, ffmpeg_next::software::scaling::Context)>,
}

impl RgbConverter {
    fn convert(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
        index: usize,
    ) -> Result<Frame, ffmpeg_next::Error> {
        let input = ScalerInput::of(decoded);
        if input.width == 0 || input.height == 0 {
            return Err(ffmpeg_next::Error::InvalidData);
        }
        let mut scaler = match self.scaler.take() {
            Some((current, scaler)) if current == input => scaler,
            previous => {
                if previous.is_some() {
                    log::info!(
                        "Camera input changed to {}x{} ({:?}), rebuilding scaler",
                        input.width,
                        input.height,
                        input.format
                    );
                }
                ffmpeg_next::software::scaling::Context::get(
                    input.format,
                    input.width,
                    input.height,
                    ffmpeg_next::format::Pixel::RGB24,
                    input.width,
                    input.height,
                    ffmpeg_next::software::scaling::Flags::BILINEAR,
                )?
            }
        };

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        let outcome = scaler.run(decoded, &mut rgb_frame);
        self.scaler = Some((input, scaler));
        outcome?;
        Ok(Frame::new(
            extract_rgb_pixels(&rgb_frame, input.width, input.height),
            input.width,
            input.height,
            index,
        ))
    }
}

/// Copies an RGB24 frame into a tightly packed buffer, dropping row padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
