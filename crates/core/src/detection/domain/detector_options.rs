use std::fmt;
use std::str::FromStr;

use crate::shared::constants::{DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, DEFAULT_SCORE_THRESHOLD};

use super::detection::Detection;

/// Execution backend the detector runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Delegate {
    #[default]
    Cpu,
    Gpu,
}

impl fmt::Display for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delegate::Cpu => write!(f, "CPU"),
            Delegate::Gpu => write!(f, "GPU"),
        }
    }
}

impl FromStr for Delegate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Delegate::Cpu),
            "gpu" => Ok(Delegate::Gpu),
            other => Err(format!("unknown delegate '{other}', expected cpu or gpu")),
        }
    }
}

/// IMAGE mode treats every call as unrelated; VIDEO mode expects a
/// timestamped, strictly ordered sequence of frames from one stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunningMode {
    Image,
    #[default]
    Video,
}

impl fmt::Display for RunningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunningMode::Image => write!(f, "IMAGE"),
            RunningMode::Video => write!(f, "VIDEO"),
        }
    }
}

/// Where the model comes from. The asset is fixed per release; there is
/// no user override.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelAsset {
    pub name: String,
    pub url: String,
}

impl Default for ModelAsset {
    fn default() -> Self {
        Self {
            name: DETECTOR_MODEL_NAME.to_string(),
            url: DETECTOR_MODEL_URL.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorOptions {
    pub model_asset: ModelAsset,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
    pub score_threshold: f32,
    pub max_results: Option<usize>,
    pub category_allowlist: Vec<String>,
    pub category_denylist: Vec<String>,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            model_asset: ModelAsset::default(),
            delegate: Delegate::Cpu,
            running_mode: RunningMode::Video,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_results: None,
            category_allowlist: Vec::new(),
            category_denylist: Vec::new(),
        }
    }
}

impl DetectorOptions {
    /// Rejects option combinations the detector cannot honor.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(format!(
                "score threshold must be between 0.0 and 1.0, got {}",
                self.score_threshold
            ));
        }
        if !self.category_allowlist.is_empty() && !self.category_denylist.is_empty() {
            return Err("category allowlist and denylist are mutually exclusive".into());
        }
        if self.max_results == Some(0) {
            return Err("max results must be positive when set".into());
        }
        Ok(())
    }

    /// Applies score threshold, category lists and result cap.
    ///
    /// Output is sorted by top score, highest first.
    pub fn filter(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let mut kept: Vec<Detection> = detections
            .into_iter()
            .filter(|d| d.top_score() >= self.score_threshold)
            .filter(|d| self.category_allowed(d))
            .collect();
        kept.sort_by(|a, b| {
            b.top_score()
                .partial_cmp(&a.top_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(max) = self.max_results {
            kept.truncate(max);
        }
        kept
    }

    fn category_allowed(&self, detection: &Detection) -> bool {
        let Some(name) = detection.top_category().map(|c| c.category_name.as_str()) else {
            return self.category_allowlist.is_empty();
        };
        if !self.category_allowlist.is_empty() {
            return self.category_allowlist.iter().any(|a| a == name);
        }
        !self.category_denylist.iter().any(|d| d == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::bounding_box::BoundingBox;
    use crate::detection::domain::detection::Category;

    fn det(name: &str, score: f32) -> Detection {
        Detection::new(
            BoundingBox::new(0, 0, 10, 10),
            vec![Category::new(0, name, score)],
        )
    }

    fn names(dets: &[Detection]) -> Vec<&str> {
        dets.iter()
            .map(|d| d.top_category().unwrap().category_name.as_str())
            .collect()
    }

    #[test]
    fn test_defaults_request_video_mode_on_cpu() {
        let opts = DetectorOptions::default();
        assert_eq!(opts.running_mode, RunningMode::Video);
        assert_eq!(opts.delegate, Delegate::Cpu);
        assert_eq!(opts.model_asset.url, DETECTOR_MODEL_URL);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_filter_drops_low_scores_and_sorts() {
        let opts = DetectorOptions {
            score_threshold: 0.5,
            ..Default::default()
        };
        let out = opts.filter(vec![det("a", 0.6), det("b", 0.4), det("c", 0.9)]);
        assert_eq!(names(&out), vec!["c", "a"]);
    }

    #[test]
    fn test_filter_caps_results() {
        let opts = DetectorOptions {
            score_threshold: 0.0,
            max_results: Some(2),
            ..Default::default()
        };
        let out = opts.filter(vec![det("a", 0.1), det("b", 0.3), det("c", 0.2)]);
        assert_eq!(names(&out), vec!["b", "c"]);
    }

    #[test]
    fn test_allowlist_keeps_only_listed() {
        let opts = DetectorOptions {
            score_threshold: 0.0,
            category_allowlist: vec!["cup".into()],
            ..Default::default()
        };
        let out = opts.filter(vec![det("cup", 0.7), det("person", 0.9)]);
        assert_eq!(names(&out), vec!["cup"]);
    }

    #[test]
    fn test_denylist_removes_listed() {
        let opts = DetectorOptions {
            score_threshold: 0.0,
            category_denylist: vec!["person".into()],
            ..Default::default()
        };
        let out = opts.filter(vec![det("cup", 0.7), det("person", 0.9)]);
        assert_eq!(names(&out), vec!["cup"]);
    }

    #[test]
    fn test_validate_rejects_both_lists() {
        let opts = DetectorOptions {
            category_allowlist: vec!["a".into()],
            category_denylist: vec!["b".into()],
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let opts = DetectorOptions {
            score_threshold: 1.5,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_delegate_parse() {
        assert_eq!("GPU".parse::<Delegate>().unwrap(), Delegate::Gpu);
        assert_eq!("cpu".parse::<Delegate>().unwrap(), Delegate::Cpu);
        assert!("tpu".parse::<Delegate>().is_err());
    }
}
