use crate::render::domain::detection_renderer::RenderSummary;

/// What happened to one frame after inference.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Rendered(RenderSummary),
    /// Detector returned an error; nothing was drawn.
    InferenceFailed(String),
    /// No 2D context; inference was skipped along with drawing.
    SurfaceUnavailable,
}

/// One Frame Loop pass that got past the readiness guard.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub frame_index: usize,
    pub timestamp_ms: f64,
    pub canvas_size: (u32, u32),
    pub outcome: FrameOutcome,
    pub inference_ms: f64,
    pub render_ms: f64,
}

impl FrameReport {
    pub fn drawn(&self) -> usize {
        match &self.outcome {
            FrameOutcome::Rendered(summary) => summary.drawn.len(),
            _ => 0,
        }
    }

    pub fn skipped(&self) -> usize {
        match &self.outcome {
            FrameOutcome::Rendered(summary) => summary.skipped.len(),
            _ => 0,
        }
    }
}

/// What teardown released, and what refused to go quietly.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub detector_closed: bool,
    pub tracks_stopped: usize,
    pub failures: Vec<String>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
