use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use framewatch_core::capture::domain::facing_mode::FacingMode;
use framewatch_core::capture::infrastructure::ffmpeg_camera::{CameraDevice, FfmpegMediaDevices};
use framewatch_core::detection::domain::detector_options::{Delegate, DetectorOptions};
use framewatch_core::detection::infrastructure::onnx_detector_initializer::OnnxDetectorInitializer;
use framewatch_core::pipeline::detection_session::{run_session, DetectionSession};
use framewatch_core::pipeline::infrastructure::ticker_frame_driver::TickerFrameDriver;
use framewatch_core::pipeline::session_error::SessionError;
use framewatch_core::pipeline::session_logger::StdoutSessionLogger;
use framewatch_core::pipeline::session_options::SessionOptions;
use framewatch_core::render::domain::detection_renderer::{BoundsPolicy, OverlayStyle};
use framewatch_core::render::infrastructure::display_list_canvas::DisplayListCanvas;
use framewatch_core::shared::constants::{
    DEFAULT_FRONT_DEVICE, DEFAULT_REFRESH_HZ, DEFAULT_SCORE_THRESHOLD,
};

/// Live object detection on a camera feed.
#[derive(Parser)]
#[command(name = "framewatch")]
struct Cli {
    /// Preferred camera: user (front) or environment (rear).
    #[arg(long, default_value = "user")]
    facing: FacingMode,

    /// Capture device for the front camera.
    #[arg(long, default_value = DEFAULT_FRONT_DEVICE)]
    front_device: String,

    /// Capture device for the rear camera, if there is one.
    #[arg(long)]
    rear_device: Option<String>,

    /// Execution backend: cpu or gpu.
    #[arg(long, default_value = "cpu")]
    delegate: Delegate,

    /// strict skips boxes leaving the frame; permissive only skips empty boxes.
    #[arg(long, default_value = "strict")]
    bounds_policy: BoundsPolicy,

    /// Draw "<label> (<score>%)" next to each box.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    labels: bool,

    /// Minimum detection score (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD)]
    score_threshold: f32,

    /// Keep at most this many detections per frame.
    #[arg(long)]
    max_results: Option<usize>,

    /// Only report these categories (comma-separated).
    #[arg(long, value_delimiter = ',')]
    allow: Option<Vec<String>>,

    /// Never report these categories (comma-separated).
    #[arg(long, value_delimiter = ',')]
    deny: Option<Vec<String>>,

    /// Display refresh rate driving the frame loop, in Hz.
    #[arg(long, default_value_t = DEFAULT_REFRESH_HZ)]
    refresh_hz: f64,

    /// Stop after this many seconds (default: run until Ctrl-C).
    #[arg(long)]
    duration: Option<f64>,
}

/// The camera was refused or missing; the run itself did nothing wrong.
const EXIT_CAMERA_UNAVAILABLE: i32 = 2;

fn main() {
    env_logger::init();

    match run() {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))?;

    let devices = FfmpegMediaDevices::new(camera_devices(&cli));
    let mut session = DetectionSession::new(
        session_options(&cli),
        Box::new(devices),
        DisplayListCanvas::new(),
        Box::new(StdoutSessionLogger::default()),
    );

    let initializer = OnnxDetectorInitializer::new().with_progress(Arc::new(download_progress));
    session.begin_initialization(Arc::new(initializer))?;

    let mut driver = TickerFrameDriver::new(cli.refresh_hz, cancelled);
    if let Some(secs) = cli.duration {
        driver = driver.with_duration(Duration::from_secs_f64(secs));
    }

    log::info!("Running at {} Hz, press Ctrl-C to stop", cli.refresh_hz);
    let frames = run_session(&mut session, &mut driver);
    if session.is_feed_ended() {
        log::warn!("{}", session.status_message());
    }

    let outcome = exit_code(session.last_error());
    if outcome == Ok(EXIT_CAMERA_UNAVAILABLE) {
        eprintln!("{}", session.status_message());
    }
    let report = session.teardown();
    log::info!(
        "Processed {frames} frames; detector closed: {}, tracks stopped: {}",
        report.detector_closed,
        report.tracks_stopped
    );
    for failure in &report.failures {
        log::warn!("Cleanup failure: {failure}");
    }

    Ok(outcome?)
}

/// Process exit code for how the session ended. A refused camera is advice
/// for the user, not a failure of the program.
fn exit_code(error: Option<&SessionError>) -> Result<i32, String> {
    match error {
        None => Ok(0),
        Some(SessionError::PermissionDenied(_)) => Ok(EXIT_CAMERA_UNAVAILABLE),
        Some(e) => Err(e.to_string()),
    }
}

fn session_options(cli: &Cli) -> SessionOptions {
    SessionOptions {
        detector: DetectorOptions {
            delegate: cli.delegate,
            score_threshold: cli.score_threshold,
            max_results: cli.max_results,
            category_allowlist: cli.allow.clone().unwrap_or_default(),
            category_denylist: cli.deny.clone().unwrap_or_default(),
            ..Default::default()
        },
        facing_mode: cli.facing,
        bounds_policy: cli.bounds_policy,
        overlay: OverlayStyle {
            show_labels: cli.labels,
            ..Default::default()
        },
    }
}

fn camera_devices(cli: &Cli) -> Vec<CameraDevice> {
    let mut devices = vec![CameraDevice::new(&cli.front_device, FacingMode::User)];
    if let Some(rear) = &cli.rear_device {
        devices.push(CameraDevice::new(rear, FacingMode::Environment));
    }
    devices
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.score_threshold) {
        return Err(format!(
            "Score threshold must be between 0.0 and 1.0, got {}",
            cli.score_threshold
        )
        .into());
    }
    if !(cli.refresh_hz > 0.0 && cli.refresh_hz.is_finite()) {
        return Err(format!("Refresh rate must be positive, got {}", cli.refresh_hz).into());
    }
    if cli.allow.is_some() && cli.deny.is_some() {
        return Err("--allow and --deny are mutually exclusive".into());
    }
    if cli.max_results == Some(0) {
        return Err("--max-results must be at least 1".into());
    }
    if let Some(secs) = cli.duration {
        if !(secs > 0.0 && secs.is_finite()) {
            return Err(format!("Duration must be positive, got {secs}").into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading object detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading object detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framewatch_core::capture::domain::capture_error::CaptureError;
    use framewatch_core::detection::domain::detector_initializer::DetectorInitError;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("framewatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.facing, FacingMode::User);
        assert_eq!(cli.delegate, Delegate::Cpu);
        assert_eq!(cli.bounds_policy, BoundsPolicy::Strict);
        assert!(cli.labels);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_allow_and_deny_conflict() {
        let cli = parse(&["--allow", "person", "--deny", "cup"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_score_threshold_range() {
        assert!(validate(&parse(&["--score-threshold", "1.5"])).is_err());
        assert!(validate(&parse(&["--score-threshold", "0.3"])).is_ok());
    }

    #[test]
    fn test_refresh_rate_must_be_positive() {
        assert!(validate(&parse(&["--refresh-hz", "0"])).is_err());
    }

    #[test]
    fn test_session_options_from_flags() {
        let cli = parse(&[
            "--facing",
            "environment",
            "--bounds-policy",
            "permissive",
            "--labels",
            "false",
            "--allow",
            "person,dog",
        ]);
        let options = session_options(&cli);
        assert_eq!(options.facing_mode, FacingMode::Environment);
        assert_eq!(options.bounds_policy, BoundsPolicy::Permissive);
        assert!(!options.overlay.show_labels);
        assert_eq!(options.detector.category_allowlist, vec!["person", "dog"]);
    }

    #[test]
    fn test_rear_device_added_when_given() {
        let cli = parse(&["--rear-device", "/dev/video2"]);
        let devices = camera_devices(&cli);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].facing, FacingMode::Environment);
    }

    #[test]
    fn test_clean_run_exits_zero() {
        assert_eq!(exit_code(None), Ok(0));
    }

    #[test]
    fn test_refused_camera_is_advisory_exit() {
        let err = SessionError::PermissionDenied(CaptureError::PermissionDenied(
            "/dev/video0".into(),
        ));
        assert_eq!(exit_code(Some(&err)), Ok(EXIT_CAMERA_UNAVAILABLE));
        assert_ne!(EXIT_CAMERA_UNAVAILABLE, 1);
    }

    #[test]
    fn test_init_failure_is_error_exit() {
        let err = SessionError::InitializationFailure(DetectorInitError::AlreadyStarted);
        let message = exit_code(Some(&err)).unwrap_err();
        assert!(message.starts_with("failed to initialize"), "{message}");
    }
}
