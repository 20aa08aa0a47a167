use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub line_width: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub font_size_px: f32,
}

/// Immediate-mode 2D drawing API, modelled on the browser canvas context.
/// Coordinates are canvas pixels with the origin at the top-left.
pub trait RenderingContext2d {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn draw_image(&mut self, frame: &Frame, dx: f64, dy: f64, dw: f64, dh: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, style: &StrokeStyle);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle);
}

/// A drawing surface whose backing size tracks the video it shows.
pub trait Canvas: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Resizes the backing store. Setting the current size again is a no-op
    /// and must not clear the surface.
    fn set_size(&mut self, width: u32, height: u32);
    /// `None` when the surface cannot provide a 2D context.
    fn context_2d(&mut self) -> Option<&mut dyn RenderingContext2d>;
}
