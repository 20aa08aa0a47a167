use std::sync::Arc;

use crate::render::domain::canvas::{Canvas, RenderingContext2d, StrokeStyle, TextStyle};
use crate::shared::frame::Frame;

/// One recorded drawing operation.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Image {
        frame: Arc<Frame>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    StrokeRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        style: StrokeStyle,
    },
    FillText {
        text: String,
        x: f64,
        y: f64,
        style: TextStyle,
    },
}

/// Canvas that records drawing commands instead of rasterizing them.
///
/// A clear covering the whole surface drops everything recorded before it,
/// so the list only ever holds the current picture. Hosts replay it with
/// whatever graphics stack they have.
#[derive(Clone, Debug, Default)]
pub struct DisplayListCanvas {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl DisplayListCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Most recent frame painted onto the canvas.
    pub fn latest_image(&self) -> Option<&Arc<Frame>> {
        self.commands.iter().rev().find_map(|c| match c {
            DrawCommand::Image { frame, .. } => Some(frame),
            _ => None,
        })
    }

    fn covers_surface(&self, x: f64, y: f64, width: f64, height: f64) -> bool {
        x <= 0.0 && y <= 0.0 && x + width >= self.width as f64 && y + height >= self.height as f64
    }
}

impl Canvas for DisplayListCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if (self.width, self.height) == (width, height) {
            return;
        }
        log::debug!("Canvas resized to {width}x{height}");
        self.width = width;
        self.height = height;
        self.commands.clear();
    }

    fn context_2d(&mut self) -> Option<&mut dyn RenderingContext2d> {
        Some(self)
    }
}

impl RenderingContext2d for DisplayListCanvas {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if self.covers_surface(x, y, width, height) {
            self.commands.clear();
        }
        self.commands.push(DrawCommand::Clear {
            x,
            y,
            width,
            height,
        });
    }

    fn draw_image(&mut self, frame: &Frame, dx: f64, dy: f64, dw: f64, dh: f64) {
        self.commands.push(DrawCommand::Image {
            frame: Arc::new(frame.clone()),
            x: dx,
            y: dy,
            width: dw,
            height: dh,
        });
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, style: &StrokeStyle) {
        self.commands.push(DrawCommand::StrokeRect {
            x,
            y,
            width,
            height,
            style: *style,
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
            style: *style,
        });
    }
}
