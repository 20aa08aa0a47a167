use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke};
use iced::{mouse, Color, Pixels, Point, Rectangle, Renderer, Size, Theme};

use framewatch_core::render::domain::canvas::Color as OverlayColor;
use framewatch_core::render::infrastructure::display_list_canvas::DrawCommand;

/// Replays the session canvas's box and label commands on top of the video
/// image, letterboxed the same way the image widget fits the frame.
pub struct DetectionOverlay<'a> {
    commands: &'a [DrawCommand],
    source: (u32, u32),
}

impl<'a> DetectionOverlay<'a> {
    pub fn new(commands: &'a [DrawCommand], source: (u32, u32)) -> Self {
        Self { commands, source }
    }
}

impl<Message> canvas::Program<Message> for DetectionOverlay<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let Some(fit) = Letterbox::fit(bounds.size(), self.source) else {
            return vec![frame.into_geometry()];
        };

        for command in self.commands {
            match command {
                DrawCommand::StrokeRect {
                    x,
                    y,
                    width,
                    height,
                    style,
                } => {
                    let path = Path::rectangle(
                        fit.point(*x, *y),
                        Size::new(fit.length(*width), fit.length(*height)),
                    );
                    frame.stroke(
                        &path,
                        Stroke::default()
                            .with_color(to_iced(style.color))
                            .with_width(style.line_width),
                    );
                }
                DrawCommand::FillText { text, x, y, style } => {
                    // The command names the baseline; iced anchors text at its top.
                    let font_size = style.font_size_px as f64;
                    frame.fill_text(canvas::Text {
                        content: text.clone(),
                        position: fit.point(*x, *y - font_size),
                        color: to_iced(style.color),
                        size: Pixels(fit.length(font_size)),
                        ..canvas::Text::default()
                    });
                }
                DrawCommand::Clear { .. } | DrawCommand::Image { .. } => {}
            }
        }

        vec![frame.into_geometry()]
    }
}

fn to_iced(color: OverlayColor) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, color.a as f32 / 255.0)
}

/// Maps source-frame pixels into widget space for a centered, aspect-preserving fit.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl Letterbox {
    fn fit(bounds: Size, (width, height): (u32, u32)) -> Option<Self> {
        if width == 0 || height == 0 || bounds.width <= 0.0 || bounds.height <= 0.0 {
            return None;
        }
        let (w, h) = (width as f32, height as f32);
        let scale = (bounds.width / w).min(bounds.height / h);
        Some(Self {
            scale,
            offset_x: (bounds.width - w * scale) / 2.0,
            offset_y: (bounds.height - h * scale) / 2.0,
        })
    }

    fn point(&self, x: f64, y: f64) -> Point {
        Point::new(
            self.offset_x + x as f32 * self.scale,
            self.offset_y + y as f32 * self.scale,
        )
    }

    fn length(&self, v: f64) -> f32 {
        v as f32 * self.scale
    }
}
