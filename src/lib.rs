#![deny(missing_docs)]

//! YOLOv8 detection post-processing in Rust
//!
//! This crate turns the raw `[1, 84, N]` output of a YOLOv8 detector into a
//! short list of labeled boxes on a destination canvas, keeping only a few
//! target categories (person, cow, sheep and chicken by default).
//!
//! # Examples
//!
//! ```no_run
//! use herdcam_yolo::{CanvasSize, DetectorConfig, RawTensor, postprocess_output};
//!
//! let config = DetectorConfig::default();
//!
//! // output of the network for one 640x640 frame
//! let raw = RawTensor::new(vec![0.0; 84 * 8400], vec![1, 84, 8400]);
//!
//! let detections = postprocess_output(&raw, &config, CanvasSize::new(1280, 720))
//!     .expect("Failed to decode detections");
//! for detection in detections {
//!     println!("Detection: {:?}", detection);
//! }
//! ```

/// Inference backend seam
mod backend;

/// COCO class table and category remapping
mod classes;

/// Detector configuration
mod config;

/// Model space to canvas coordinate mapping
mod coordinates;

/// Candidate decoding
mod decoder;

/// Detection types and sinks
mod detection;

/// Per-frame detection pipeline
mod detector;

/// Error type
mod error;

/// Non-maximum suppression
mod nms;

/// Frame to model input conversion
mod preprocess;

/// Per-category statistics
mod stats;

/// Backend output tensors
mod tensor;

pub use backend::{CandleBackend, InferenceBackend};
pub use classes::{CLASS_SYNONYMS, COCO_CLASSES, category_for_class};
pub use config::{CoordinateCorrection, DetectorConfig};
pub use coordinates::{CanvasSize, CoordinateMapper};
pub use decoder::decode_detections;
pub use detection::{Detection, DetectionSet, DetectionSink, LabeledDetection, LatestDetections};
pub use detector::{CategoryCounters, Detector, FrameStride, postprocess_output};
pub use error::DetectorError;
pub use nms::{iou, non_maximum_suppression};
pub use preprocess::{enhance_contrast, preprocess_frame};
pub use stats::CategoryStats;
pub use tensor::{CanonicalView, NUM_FEATURES, RawTensor};
