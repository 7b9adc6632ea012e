use serde::{Deserialize, Serialize};

use crate::{classes, error::DetectorError};

/// Manual corrections applied when mapping boxes onto the destination canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateCorrection {
    /// Horizontal offset in destination pixels, added after scaling.
    pub offset_x: f32,
    /// Vertical offset in destination pixels, added after scaling.
    pub offset_y: f32,
    /// Scale factor for the x center and the width.
    pub scale_x: f32,
    /// Scale factor for the y center and the height.
    pub scale_y: f32,
    /// Mirror box centers horizontally about the canvas.
    pub flip_x: bool,
    /// Mirror box centers vertically about the canvas.
    pub flip_y: bool,
}

impl Default for CoordinateCorrection {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            flip_x: false,
            flip_y: false,
        }
    }
}

/// Detector configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum arg-max class score a candidate must exceed to be kept
    pub confidence_threshold: f32,
    /// IoU above which a lower confidence box is suppressed
    pub iou_threshold: f32,
    /// Model input width in pixels
    pub input_width: usize,
    /// Model input height in pixels
    pub input_height: usize,
    /// Normalized size under which a box is dropped when both sides are smaller
    pub min_detection_size: f32,
    /// Process every `frame_skip`-th sampled frame
    pub frame_skip: u32,
    /// Category names retained after class remapping
    pub target_categories: Vec<String>,
    /// Positioning corrections for the destination canvas
    pub correction: CoordinateCorrection,
    /// Maximum number of detections reported per frame
    pub max_output_boxes: usize,
    /// Maximum number of candidates considered by non-maximum suppression
    pub max_nms_candidates: usize,
    /// Boost input contrast on some frames to help with small objects
    pub enhance_distant_objects: bool,
    /// Processed frames between two contrast boosts
    pub enhancement_interval: u32,
}

/// Default configuration for the detector.
impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.4,
            input_width: 640,
            input_height: 640,
            min_detection_size: 0.01,
            frame_skip: 3,
            target_categories: ["person", "cow", "sheep", "chicken"]
                .into_iter()
                .map(String::from)
                .collect(),
            correction: CoordinateCorrection::default(),
            max_output_boxes: 20,
            max_nms_candidates: 80,
            enhance_distant_objects: false,
            enhancement_interval: 10,
        }
    }
}

/// Strides of the three YOLOv8 detection heads.
const HEAD_STRIDES: [usize; 3] = [8, 16, 32];

impl DetectorConfig {
    /// Number of candidate detections a YOLOv8 model emits at this input size.
    ///
    /// 8400 for the default 640x640 input.
    pub fn expected_detections(&self) -> usize {
        HEAD_STRIDES
            .iter()
            .map(|s| (self.input_width / s) * (self.input_height / s))
            .sum()
    }

    /// Whether `category` is one of the configured targets.
    pub fn is_target(&self, category: &str) -> bool {
        self.target_categories.iter().any(|c| c == category)
    }

    /// Check the configuration once, before any frame is processed.
    pub fn validate(&self) -> Result<(), DetectorError> {
        let invalid = |msg: String| Err(DetectorError::InvalidConfig(msg));

        if !(self.confidence_threshold > 0.0 && self.confidence_threshold < 1.0) {
            return invalid(format!(
                "confidence_threshold must be in (0, 1), got {}",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return invalid(format!(
                "iou_threshold must be in [0, 1], got {}",
                self.iou_threshold
            ));
        }
        if !(self.min_detection_size >= 0.0 && self.min_detection_size.is_finite()) {
            return invalid(format!(
                "min_detection_size must be a non-negative number, got {}",
                self.min_detection_size
            ));
        }
        for (name, size) in [
            ("input_width", self.input_width),
            ("input_height", self.input_height),
        ] {
            if size == 0 || size % 32 != 0 {
                return invalid(format!(
                    "{name} must be a positive multiple of 32, got {size}"
                ));
            }
        }
        if self.frame_skip == 0 {
            return invalid("frame_skip must be at least 1".to_string());
        }
        if self.enhancement_interval == 0 {
            return invalid("enhancement_interval must be at least 1".to_string());
        }
        if self.max_output_boxes == 0 || self.max_nms_candidates == 0 {
            return invalid("max_output_boxes and max_nms_candidates must be at least 1".to_string());
        }

        let c = &self.correction;
        if !(c.scale_x.is_finite() && c.scale_x > 0.0 && c.scale_y.is_finite() && c.scale_y > 0.0)
        {
            return invalid(format!(
                "coordinate scales must be positive, got ({}, {})",
                c.scale_x, c.scale_y
            ));
        }
        if !(c.offset_x.is_finite() && c.offset_y.is_finite()) {
            return invalid(format!(
                "coordinate offsets must be finite, got ({}, {})",
                c.offset_x, c.offset_y
            ));
        }

        if self.target_categories.is_empty() {
            return invalid("target_categories must not be empty".to_string());
        }
        if let Some(unknown) = self
            .target_categories
            .iter()
            .find(|c| !classes::is_reachable(c))
        {
            return invalid(format!("target category {unknown:?} is never produced by the model"));
        }

        Ok(())
    }
}
