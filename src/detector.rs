use std::collections::HashMap;

use candle_core::{DType, Tensor};
use kornia_image::{Image, ImageSize};

use super::{
    backend::InferenceBackend,
    config::DetectorConfig,
    coordinates::{CanvasSize, CoordinateMapper},
    decoder::decode_detections,
    detection::{Detection, DetectionSet, LabeledDetection},
    error::DetectorError,
    nms::non_maximum_suppression,
    preprocess::preprocess_frame,
    tensor::RawTensor,
};

/// Decode a raw backend output into the final detections of a frame.
///
/// Runs shape normalization, decoding with coordinate mapping, and
/// non-maximum suppression.
pub fn postprocess_output(
    raw: &RawTensor,
    config: &DetectorConfig,
    canvas: CanvasSize,
) -> Result<Vec<Detection>, DetectorError> {
    let view = raw.canonical_view(config.expected_detections())?;
    let mapper = CoordinateMapper::new(canvas, config.correction);
    let candidates = decode_detections(&view, config, &mapper);
    let num_candidates = candidates.len();

    let detections = non_maximum_suppression(
        candidates,
        config.iou_threshold,
        config.max_nms_candidates,
        config.max_output_boxes,
    );

    tracing::debug!(
        "{} candidates above threshold, {} kept after nms",
        num_candidates,
        detections.len()
    );

    Ok(detections)
}

/// Decides which sampled frames get processed.
#[derive(Debug, Clone)]
pub struct FrameStride {
    stride: u32,
    counter: u32,
}

impl FrameStride {
    /// Fire on every `stride`-th frame. A stride of 0 is treated as 1.
    pub fn new(stride: u32) -> Self {
        Self {
            stride: stride.max(1),
            counter: 0,
        }
    }

    /// Count one sampled frame and tell whether it should be processed.
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.stride {
            self.counter = 0;
            true
        } else {
            false
        }
    }
}

/// Per-category running numbers used to label detections on screen.
#[derive(Debug, Clone, Default)]
pub struct CategoryCounters {
    counters: HashMap<String, u32>,
}

impl CategoryCounters {
    /// Counters for `categories`, all starting at zero.
    pub fn new<S: AsRef<str>>(categories: &[S]) -> Self {
        Self {
            counters: categories
                .iter()
                .map(|c| (c.as_ref().to_string(), 0))
                .collect(),
        }
    }

    /// Next ordinal for `category`, starting at 1.
    pub fn next(&mut self, category: &str) -> u32 {
        let counter = self.counters.entry(category.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Last ordinal handed out for `category`.
    pub fn get(&self, category: &str) -> u32 {
        self.counters.get(category).copied().unwrap_or(0)
    }

    /// Start a new session: every counter goes back to zero.
    pub fn reset(&mut self) {
        tracing::info!("resetting category counters");
        self.counters.values_mut().for_each(|c| *c = 0);
    }
}

/// Per-frame detection pipeline on top of an inference backend.
pub struct Detector<B> {
    config: DetectorConfig,
    backend: B,
    enabled: bool,
    frames_processed: u64,
}

impl<B: InferenceBackend> Detector<B> {
    /// Create a new detector.
    ///
    /// The configuration is validated and the backend runs one warm-up
    /// inference on a blank input; an output that cannot be decoded at the
    /// configured input size is reported here instead of on every frame.
    pub fn new(config: DetectorConfig, mut backend: B) -> Result<Self, DetectorError> {
        config.validate()?;

        let warmup = Tensor::zeros(
            (1, 3, config.input_height, config.input_width),
            DType::F32,
            backend.device(),
        )?;
        let raw = backend.infer(&warmup).map_err(|e| match e {
            DetectorError::BackendUnavailable(_) => e,
            other => DetectorError::BackendUnavailable(format!("warm-up inference failed: {other}")),
        })?;

        let expected = config.expected_detections();
        let view = raw.canonical_view(expected)?;
        if view.num_detections() != expected {
            return Err(DetectorError::InvalidConfig(format!(
                "model emits {} detections but a {}x{} input needs {}",
                view.num_detections(),
                config.input_width,
                config.input_height,
                expected
            )));
        }

        tracing::info!(
            "detector ready: output {:?}, input {}x{}, targets {:?}",
            raw.shape(),
            config.input_width,
            config.input_height,
            config.target_categories
        );

        Ok(Self {
            config,
            backend,
            enabled: true,
            frames_processed: 0,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Whether the backend is still usable.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fresh counters for the configured target categories.
    pub fn new_counters(&self) -> CategoryCounters {
        CategoryCounters::new(&self.config.target_categories)
    }

    /// Frame stride scheduler for the configured `frame_skip`.
    pub fn frame_stride(&self) -> FrameStride {
        FrameStride::new(self.config.frame_skip)
    }

    /// Detect objects in an rgb8 frame and place them on `canvas`.
    ///
    /// Never fails: any error is logged and yields an empty set. Once the
    /// backend reports itself unavailable the detector stops calling it.
    pub fn process_frame(
        &mut self,
        image: &Image<u8, 3>,
        canvas: CanvasSize,
        counters: &mut CategoryCounters,
    ) -> DetectionSet {
        let frame = self.frames_processed;
        self.frames_processed += 1;

        if !self.enabled {
            return DetectionSet::empty(frame);
        }

        match self.detect(image, frame, canvas) {
            Ok(detections) => label_detections(frame, detections, counters),
            Err(DetectorError::BackendUnavailable(msg)) => {
                tracing::error!("inference backend unavailable, disabling detection: {}", msg);
                self.enabled = false;
                DetectionSet::empty(frame)
            }
            Err(e) => {
                tracing::warn!("skipping frame {}: {}", frame, e);
                DetectionSet::empty(frame)
            }
        }
    }

    fn detect(
        &mut self,
        image: &Image<u8, 3>,
        frame: u64,
        canvas: CanvasSize,
    ) -> Result<Vec<Detection>, DetectorError> {
        let enhance = self.config.enhance_distant_objects
            && frame % u64::from(self.config.enhancement_interval) == 0;

        let input_size = ImageSize {
            width: self.config.input_width,
            height: self.config.input_height,
        };
        let input = preprocess_frame(image, input_size, enhance, self.backend.device())?;

        let raw = self.backend.infer(&input)?;

        postprocess_output(&raw, &self.config, canvas)
    }
}

fn label_detections(
    frame: u64,
    detections: Vec<Detection>,
    counters: &mut CategoryCounters,
) -> DetectionSet {
    let items = detections
        .into_iter()
        .map(|detection| LabeledDetection {
            ordinal: counters.next(detection.category),
            detection,
        })
        .collect();
    let set = DetectionSet { frame, items };

    if !set.is_empty() {
        let summary: Vec<String> = set
            .items
            .iter()
            .take(5)
            .map(|d| format!("{}({:.2})", d.detection.category, d.detection.confidence))
            .collect();
        tracing::debug!(
            "frame {}: {} objects detected: {}",
            frame,
            set.len(),
            summary.join(", ")
        );
    }

    set
}
