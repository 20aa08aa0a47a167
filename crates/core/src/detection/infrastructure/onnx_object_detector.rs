/// SSD-style COCO object detector using ONNX Runtime via `ort`.
///
/// The model carries its own resize and box decoding, so preprocessing is
/// just a uint8 NHWC batch of one and postprocessing maps normalized
/// `[ymin, xmin, ymax, xmax]` boxes back to frame pixels.
use std::path::Path;

use ort::execution_providers::ExecutionProviderDispatch;

use crate::detection::domain::bounding_box::BoundingBox;
use crate::detection::domain::detection::{Category, Detection, DetectionResult};
use crate::detection::domain::detector_options::{DetectorOptions, RunningMode};
use crate::detection::domain::object_detector::{DetectError, ObjectDetector};
use crate::detection::domain::timestamp_guard::TimestampGuard;
use crate::shared::frame::Frame;

use super::coco_labels::coco_label;

/// Output tensor positions, discovered from the model's output names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OutputLayout {
    boxes: usize,
    classes: usize,
    scores: usize,
    count: usize,
}

impl OutputLayout {
    fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let (mut boxes, mut classes, mut scores, mut count) = (None, None, None, None);
        for (i, name) in names.into_iter().enumerate() {
            let name = name.to_ascii_lowercase();
            if name.contains("boxes") {
                boxes = Some(i);
            } else if name.contains("classes") {
                classes = Some(i);
            } else if name.contains("scores") {
                scores = Some(i);
            } else if name.contains("num_detections") {
                count = Some(i);
            }
        }
        Some(Self {
            boxes: boxes?,
            classes: classes?,
            scores: scores?,
            count: count?,
        })
    }
}

pub struct OnnxObjectDetector {
    session: Option<ort::session::Session>,
    layout: OutputLayout,
    options: DetectorOptions,
    timestamps: TimestampGuard,
}

impl OnnxObjectDetector {
    /// Load the model and bind it to the given execution providers.
    pub fn new(
        model_path: &Path,
        providers: Vec<ExecutionProviderDispatch>,
        options: DetectorOptions,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(providers)?
            .commit_from_file(model_path)?;

        let layout = OutputLayout::from_names(session.outputs().iter().map(|o| o.name()))
            .ok_or("model does not expose boxes/classes/scores/num_detections outputs")?;

        Ok(Self {
            session: Some(session),
            layout,
            options,
            timestamps: TimestampGuard::new(),
        })
    }

    fn run(&mut self, frame: &Frame) -> Result<DetectionResult, DetectError> {
        let layout = self.layout;
        let session = self.session.as_mut().ok_or(DetectError::Closed)?;

        let input = frame.as_ndarray().insert_axis(ndarray::Axis(0)).to_owned();
        let input_value = ort::value::Tensor::from_array(input).map_err(inference)?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(inference)?;

        let boxes = outputs[layout.boxes]
            .try_extract_array::<f32>()
            .map_err(inference)?;
        let classes = outputs[layout.classes]
            .try_extract_array::<f32>()
            .map_err(inference)?;
        let scores = outputs[layout.scores]
            .try_extract_array::<f32>()
            .map_err(inference)?;
        let count = outputs[layout.count]
            .try_extract_array::<f32>()
            .map_err(inference)?;

        let boxes: Vec<f32> = boxes.iter().copied().collect();
        let classes: Vec<f32> = classes.iter().copied().collect();
        let scores: Vec<f32> = scores.iter().copied().collect();
        let count = count.iter().next().copied().unwrap_or(0.0).max(0.0) as usize;

        let detections = decode_detections(
            &boxes,
            &classes,
            &scores,
            count,
            frame.width(),
            frame.height(),
        );
        Ok(DetectionResult::new(self.options.filter(detections)))
    }
}

impl ObjectDetector for OnnxObjectDetector {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, DetectError> {
        if self.options.running_mode != RunningMode::Image {
            return Err(DetectError::WrongRunningMode {
                configured: self.options.running_mode,
            });
        }
        self.run(frame)
    }

    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<DetectionResult, DetectError> {
        if self.session.is_none() {
            return Err(DetectError::Closed);
        }
        if self.options.running_mode != RunningMode::Video {
            return Err(DetectError::WrongRunningMode {
                configured: self.options.running_mode,
            });
        }
        self.timestamps.advance(timestamp_ms)?;
        self.run(frame)
    }

    fn close(&mut self) -> Result<(), DetectError> {
        match self.session.take() {
            Some(session) => {
                drop(session);
                log::debug!("ONNX detector session released");
                Ok(())
            }
            None => Err(DetectError::Closed),
        }
    }
}

fn inference<E: std::error::Error + Send + Sync + 'static>(e: E) -> DetectError {
    DetectError::Inference(Box::new(e))
}

/// Convert raw SSD outputs into pixel-space detections.
///
/// `boxes` holds `count` rows of normalized `[ymin, xmin, ymax, xmax]`;
/// `classes` holds COCO ids as floats. Rows with unknown ids are dropped.
fn decode_detections(
    boxes: &[f32],
    classes: &[f32],
    scores: &[f32],
    count: usize,
    frame_width: u32,
    frame_height: u32,
) -> Vec<Detection> {
    let rows = count
        .min(boxes.len() / 4)
        .min(classes.len())
        .min(scores.len());
    let fw = frame_width as f64;
    let fh = frame_height as f64;

    (0..rows)
        .filter_map(|i| {
            let class_id = classes[i].round() as i32;
            let name = coco_label(class_id)?;
            let b = &boxes[i * 4..i * 4 + 4];
            let bbox = BoundingBox::from_corners(
                b[1] as f64 * fw,
                b[0] as f64 * fh,
                b[3] as f64 * fw,
                b[2] as f64 * fh,
            );
            Some(Detection::new(
                bbox,
                vec![Category::new(class_id, name, scores[i])],
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_layout_from_names() {
        let layout = OutputLayout::from_names([
            "num_detections",
            "detection_boxes",
            "detection_scores",
            "detection_classes",
        ])
        .unwrap();
        assert_eq!(
            layout,
            OutputLayout {
                boxes: 1,
                classes: 3,
                scores: 2,
                count: 0,
            }
        );
    }

    #[test]
    fn test_output_layout_handles_tensor_suffixes() {
        let layout = OutputLayout::from_names([
            "detection_boxes:0",
            "detection_classes:0",
            "detection_scores:0",
            "num_detections:0",
        ]);
        assert!(layout.is_some());
    }

    #[test]
    fn test_output_layout_missing_output() {
        assert!(OutputLayout::from_names(["detection_boxes", "detection_scores"]).is_none());
    }

    #[test]
    fn test_decode_maps_normalized_boxes_to_pixels() {
        // One person covering the centre quarter of a 200x100 frame.
        let boxes = [0.25, 0.25, 0.75, 0.75];
        let dets = decode_detections(&boxes, &[1.0], &[0.9], 1, 200, 100);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bounding_box, Some(BoundingBox::new(50, 25, 100, 50)));
        let top = dets[0].top_category().unwrap();
        assert_eq!(top.category_name, "person");
        assert_eq!(top.index, 1);
    }

    #[test]
    fn test_decode_respects_count() {
        let boxes = [0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 1.0, 1.0];
        let dets = decode_detections(&boxes, &[1.0, 3.0], &[0.9, 0.8], 1, 100, 100);
        assert_eq!(dets.len(), 1);
    }

    #[test]
    fn test_decode_drops_unknown_classes() {
        let boxes = [0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 1.0, 1.0];
        let dets = decode_detections(&boxes, &[12.0, 47.0], &[0.9, 0.8], 2, 100, 100);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].top_category().unwrap().category_name, "cup");
    }

    #[test]
    fn test_decode_tolerates_short_buffers() {
        let dets = decode_detections(&[0.0, 0.0, 1.0], &[1.0], &[0.9], 5, 100, 100);
        assert!(dets.is_empty());
    }
}
