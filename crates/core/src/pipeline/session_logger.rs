use std::collections::HashMap;
use std::time::Instant;

use super::frame_report::{FrameOutcome, FrameReport};

/// Observer for session events, separate from the `log` facade so hosts
/// can collect per-frame statistics without scraping log lines.
pub trait SessionLogger: Send {
    /// Called once per Frame Loop pass that produced a report.
    fn frame(&mut self, report: &FrameReport);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. detections drawn).
    fn metric(&mut self, name: &str, value: f64);

    /// Lifecycle message.
    fn info(&mut self, message: &str);

    /// End-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by the desktop app and tests.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn frame(&mut self, _report: &FrameReport) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Collects per-stage timings and metrics and prints a progress line every
/// `throttle_frames` frames plus a summary at the end.
pub struct StdoutSessionLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames: usize,
    failed_frames: usize,
    messages: Vec<String>,
}

impl StdoutSessionLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
            failed_frames: 0,
            messages: Vec::new(),
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Formatted summary, or `None` if no frame was ever processed.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 && self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Session summary ({} frames, {} failed, {:.1}s total):",
            self.frames,
            self.failed_frames,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("  {name}: avg {:.1}", mean(&self.metrics[name])));
        }

        if self.frames > 0 && elapsed_ms > 0.0 {
            let fps = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for StdoutSessionLogger {
    fn default() -> Self {
        Self::new(60)
    }
}

impl SessionLogger for StdoutSessionLogger {
    fn frame(&mut self, report: &FrameReport) {
        self.frames += 1;
        if !matches!(report.outcome, FrameOutcome::Rendered(_)) {
            self.failed_frames += 1;
        }
        self.metric("detections", report.drawn() as f64);
        self.metric("skipped", report.skipped() as f64);

        if self.frames % self.throttle_frames == 0 {
            let (w, h) = report.canvas_size;
            log::info!(
                "Frame {} at {:.0}ms ({w}x{h}): {} drawn, {} skipped, inference {:.1}ms",
                report.frame_index,
                report.timestamp_ms,
                report.drawn(),
                report.skipped(),
                report.inference_ms
            );
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::domain::detection_renderer::{DrawnDetection, RenderSummary};
    use crate::detection::domain::bounding_box::BoundingBox;
    use approx::assert_relative_eq;

    fn report(drawn: usize) -> FrameReport {
        FrameReport {
            frame_index: 0,
            timestamp_ms: 16.0,
            canvas_size: (640, 480),
            outcome: FrameOutcome::Rendered(RenderSummary {
                drawn: (0..drawn)
                    .map(|_| DrawnDetection {
                        bounding_box: BoundingBox::new(0, 0, 1, 1),
                        label: "cup (90%)".into(),
                    })
                    .collect(),
                skipped: Vec::new(),
            }),
            inference_ms: 12.0,
            render_ms: 1.0,
        }
    }

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullSessionLogger;
        logger.frame(&report(1));
        logger.timing("inference", 5.0);
        logger.metric("detections", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_frame_records_detection_metrics() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.frame(&report(2));
        logger.frame(&report(4));

        assert_eq!(logger.frames(), 2);
        let values = logger.metrics_for("detections").unwrap();
        assert_relative_eq!(mean(values), 3.0);
    }

    #[test]
    fn test_failed_frames_counted() {
        let mut logger = StdoutSessionLogger::new(10);
        let mut failed = report(0);
        failed.outcome = FrameOutcome::InferenceFailed("boom".into());
        logger.frame(&failed);
        logger.frame(&report(1));

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("2 frames, 1 failed"));
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.timing("inference", 20.0);
        logger.timing("inference", 30.0);
        logger.timing("render", 5.0);

        assert_eq!(logger.timings_for("inference").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("render").unwrap().len(), 1);
    }

    #[test]
    fn test_summary_includes_stages_and_fps() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.frame(&report(1));
        logger.timing("inference", 10.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Session summary"));
        assert!(summary.contains("inference"));
        assert!(summary.contains("detections"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutSessionLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.info("camera ready");
        assert_eq!(logger.messages, vec!["camera ready".to_string()]);
    }

    #[test]
    fn test_throttle_never_zero() {
        let logger = StdoutSessionLogger::new(0);
        assert_eq!(logger.throttle_frames, 1);
    }
}
