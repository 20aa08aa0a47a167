use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::detection::domain::bounding_box::BoundingBox;
use crate::detection::domain::detection::{Category, Detection, DetectionResult};
use crate::shared::frame::Frame;

use super::canvas::{Color, RenderingContext2d, StrokeStyle, TextStyle};

/// Which boxes are eligible for drawing.
///
/// Degenerate boxes are rejected under both policies; `Strict` also rejects
/// boxes that leave the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundsPolicy {
    #[default]
    Strict,
    Permissive,
}

impl fmt::Display for BoundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsPolicy::Strict => write!(f, "strict"),
            BoundsPolicy::Permissive => write!(f, "permissive"),
        }
    }
}

impl FromStr for BoundsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(BoundsPolicy::Strict),
            "permissive" => Ok(BoundsPolicy::Permissive),
            other => Err(format!(
                "unknown bounds policy '{other}', expected strict or permissive"
            )),
        }
    }
}

/// Why a detection was not drawn.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionDefect {
    #[error("detection has no bounding box")]
    MissingBoundingBox,
    #[error("detection has no category")]
    MissingCategory,
    #[error("degenerate bounding box ({0})")]
    Degenerate(BoundingBox),
    #[error("bounding box ({bbox}) exceeds {frame_width}x{frame_height} frame")]
    OutOfBounds {
        bbox: BoundingBox,
        frame_width: u32,
        frame_height: u32,
    },
}

impl DetectionDefect {
    /// The detection was complete but its box cannot be drawn.
    pub fn is_geometric(&self) -> bool {
        matches!(
            self,
            DetectionDefect::Degenerate(_) | DetectionDefect::OutOfBounds { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    pub stroke: StrokeStyle,
    pub text: TextStyle,
    /// Label anchor relative to the box's top-left corner.
    pub label_offset: (f64, f64),
    pub show_labels: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke: StrokeStyle {
                color: Color::RED,
                line_width: 2.0,
            },
            text: TextStyle {
                color: Color::RED,
                font_size_px: 16.0,
            },
            label_offset: (5.0, 20.0),
            show_labels: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawnDetection {
    pub bounding_box: BoundingBox,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkippedDetection {
    /// Position in the detector's output.
    pub index: usize,
    pub defect: DetectionDefect,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderSummary {
    pub drawn: Vec<DrawnDetection>,
    pub skipped: Vec<SkippedDetection>,
}

/// `"<name> (<pct>%)"`, e.g. `"person (88%)"`.
pub fn format_label(category: &Category) -> String {
    format!("{} ({}%)", category.label(), category.percent())
}

/// Check that a detection has everything needed to draw it.
pub fn validate_detection(
    detection: &Detection,
    policy: BoundsPolicy,
    frame_width: u32,
    frame_height: u32,
) -> Result<(BoundingBox, &Category), DetectionDefect> {
    let bbox = detection
        .bounding_box
        .ok_or(DetectionDefect::MissingBoundingBox)?;
    let category = detection
        .top_category()
        .ok_or(DetectionDefect::MissingCategory)?;

    if bbox.is_empty() {
        return Err(DetectionDefect::Degenerate(bbox));
    }
    if policy == BoundsPolicy::Strict && !bbox.fits_within(frame_width, frame_height) {
        return Err(DetectionDefect::OutOfBounds {
            bbox,
            frame_width,
            frame_height,
        });
    }
    Ok((bbox, category))
}

/// Draws a frame and its detection overlay onto a 2D context.
#[derive(Clone, Debug, Default)]
pub struct DetectionRenderer {
    policy: BoundsPolicy,
    style: OverlayStyle,
}

impl DetectionRenderer {
    pub fn new(policy: BoundsPolicy, style: OverlayStyle) -> Self {
        Self { policy, style }
    }

    pub fn policy(&self) -> BoundsPolicy {
        self.policy
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Clear the canvas, paint `frame` over it, then outline every valid
    /// detection. Invalid detections are skipped and reported, never drawn.
    pub fn render(
        &self,
        ctx: &mut dyn RenderingContext2d,
        frame: &Frame,
        result: &DetectionResult,
    ) -> RenderSummary {
        let (fw, fh) = frame.dimensions();
        ctx.clear_rect(0.0, 0.0, fw as f64, fh as f64);
        ctx.draw_image(frame, 0.0, 0.0, fw as f64, fh as f64);

        let mut summary = RenderSummary::default();
        for (index, detection) in result.detections.iter().enumerate() {
            match validate_detection(detection, self.policy, fw, fh) {
                Ok((bbox, category)) => {
                    summary.drawn.push(self.draw_detection(ctx, bbox, category));
                }
                Err(defect) => summary.skipped.push(SkippedDetection { index, defect }),
            }
        }
        summary
    }

    fn draw_detection(
        &self,
        ctx: &mut dyn RenderingContext2d,
        bbox: BoundingBox,
        category: &Category,
    ) -> DrawnDetection {
        let x = bbox.origin_x as f64;
        let y = bbox.origin_y as f64;
        ctx.stroke_rect(
            x,
            y,
            bbox.width as f64,
            bbox.height as f64,
            &self.style.stroke,
        );

        let label = format_label(category);
        if self.style.show_labels {
            let (dx, dy) = self.style.label_offset;
            ctx.fill_text(&label, x + dx, y + dy, &self.style.text);
        }
        DrawnDetection {
            bounding_box: bbox,
            label,
        }
    }
}
