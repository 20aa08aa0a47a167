use std::sync::Arc;
use std::time::Instant;

use iced::widget::{canvas, column, container, image, stack, text};
use iced::{window, ContentFit, Element, Length, Subscription, Task};

use framewatch_core::capture::domain::facing_mode::FacingMode;
use framewatch_core::capture::infrastructure::ffmpeg_camera::{CameraDevice, FfmpegMediaDevices};
use framewatch_core::detection::infrastructure::onnx_detector_initializer::OnnxDetectorInitializer;
use framewatch_core::pipeline::detection_session::DetectionSession;
use framewatch_core::pipeline::session_logger::NullSessionLogger;
use framewatch_core::pipeline::session_options::SessionOptions;
use framewatch_core::render::infrastructure::display_list_canvas::DisplayListCanvas;
use framewatch_core::shared::constants::DEFAULT_FRONT_DEVICE;
use framewatch_core::shared::frame::Frame;

use crate::overlay::DetectionOverlay;

struct VideoImage {
    index: usize,
    dimensions: (u32, u32),
    handle: image::Handle,
}

#[derive(Debug, Clone)]
pub enum Message {
    Frame(Instant),
    CloseRequested(window::Id),
}

pub struct App {
    session: DetectionSession<DisplayListCanvas>,
    /// Most recent video frame as an image handle, keyed by frame index.
    video_image: Option<VideoImage>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let devices =
            FfmpegMediaDevices::new(vec![CameraDevice::new(DEFAULT_FRONT_DEVICE, FacingMode::User)]);
        let mut session = DetectionSession::new(
            SessionOptions::default(),
            Box::new(devices),
            DisplayListCanvas::new(),
            Box::new(NullSessionLogger),
        );
        if let Err(e) = session.begin_initialization(Arc::new(OnnxDetectorInitializer::new())) {
            log::error!("Could not start detector initialization: {e}");
        }

        (
            Self {
                session,
                video_image: None,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Frame(now) => {
                if let Some(report) = self.session.tick(now) {
                    log::trace!(
                        "Frame {}: {} drawn, {} skipped",
                        report.frame_index,
                        report.drawn(),
                        report.skipped()
                    );
                }
                self.refresh_video_image();
            }
            Message::CloseRequested(_) => {
                let report = self.session.teardown();
                for failure in &report.failures {
                    log::warn!("Cleanup failure: {failure}");
                }
                return iced::exit();
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let status = text(self.session.status_message()).size(14);

        let surface: Element<'_, Message> = match &self.video_image {
            Some(video) => {
                let overlay =
                    DetectionOverlay::new(self.session.canvas().commands(), video.dimensions);
                stack![
                    image(video.handle.clone())
                        .content_fit(ContentFit::Contain)
                        .width(Length::Fill)
                        .height(Length::Fill),
                    canvas(overlay).width(Length::Fill).height(Length::Fill),
                ]
                .width(Length::Fill)
                .height(Length::Fill)
                .into()
            }
            None => container(text("Waiting for the camera...").size(16))
                .center(Length::Fill)
                .into(),
        };

        column![text("Live Object Detection").size(22), status, surface]
            .spacing(12)
            .padding(16)
            .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            window::frames().map(Message::Frame),
            window::close_requests().map(Message::CloseRequested),
        ])
    }

    /// Re-upload the video frame only when the canvas holds a new one.
    fn refresh_video_image(&mut self) {
        let Some(frame) = self.session.canvas().latest_image() else {
            return;
        };
        if matches!(&self.video_image, Some(video) if video.index == frame.index()) {
            return;
        }
        match rgba_handle(frame) {
            Some(handle) => {
                self.video_image = Some(VideoImage {
                    index: frame.index(),
                    dimensions: frame.dimensions(),
                    handle,
                })
            }
            None => log::warn!("Frame {} has an unexpected pixel buffer size", frame.index()),
        }
    }
}

fn rgba_handle(frame: &Frame) -> Option<image::Handle> {
    let (width, height) = frame.dimensions();
    let rgb = ::image::RgbImage::from_raw(width, height, frame.data().to_vec())?;
    let rgba = ::image::DynamicImage::ImageRgb8(rgb).into_rgba8().into_raw();
    Some(image::Handle::from_rgba(width, height, rgba))
}
