use serde::Serialize;

/// A detected object on the destination canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    /// Minimum x coordinate of the bounding box.
    pub xmin: f32,
    /// Minimum y coordinate of the bounding box.
    pub ymin: f32,
    /// Maximum x coordinate of the bounding box.
    pub xmax: f32,
    /// Maximum y coordinate of the bounding box.
    pub ymax: f32,
    /// Arg-max class score.
    pub confidence: f32,
    /// Target category, after class synonym remapping.
    pub category: &'static str,
}

impl Detection {
    /// Build a detection from `[x1, y1, x2, y2]` corners.
    pub fn from_corners(corners: [f32; 4], confidence: f32, category: &'static str) -> Self {
        let [xmin, ymin, xmax, ymax] = corners;
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            confidence,
            category,
        }
    }

    /// Box width.
    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    /// Box height.
    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Box area.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// A detection with the display ordinal assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabeledDetection {
    /// The detection itself.
    pub detection: Detection,
    /// Per-category running number, starting at 1.
    pub ordinal: u32,
}

impl LabeledDetection {
    /// Overlay label, e.g. `PERSON #3`.
    pub fn label(&self) -> String {
        format!(
            "{} #{}",
            self.detection.category.to_uppercase(),
            self.ordinal
        )
    }

    /// Confidence as a percentage with one decimal, e.g. `90.0%`.
    pub fn confidence_label(&self) -> String {
        format!("{:.1}%", self.detection.confidence * 100.0)
    }

    /// Overlay color of the category as RGB.
    pub fn color(&self) -> [u8; 3] {
        match self.detection.category {
            "person" => [0, 255, 0],
            "cow" => [0, 0, 255],
            "sheep" => [255, 255, 255],
            "chicken" => [255, 235, 4],
            _ => [255, 0, 0],
        }
    }
}

/// Detections kept for one processed frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionSet {
    /// Sequence number of the frame that produced the set.
    pub frame: u64,
    /// Detections in decreasing confidence order.
    pub items: Vec<LabeledDetection>,
}

impl DetectionSet {
    /// An empty set for `frame`.
    pub fn empty(frame: u64) -> Self {
        Self {
            frame,
            items: Vec::new(),
        }
    }

    /// Number of detections.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no detection survived.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of detections of `category`.
    pub fn count(&self, category: &str) -> usize {
        self.items
            .iter()
            .filter(|d| d.detection.category == category)
            .count()
    }
}

/// Receiver of the detections of each processed frame.
pub trait DetectionSink {
    /// Take the detections of one frame.
    fn consume(&mut self, detections: &DetectionSet);
}

/// Holds the most recent detections, discarding results that arrive late.
#[derive(Debug, Default)]
pub struct LatestDetections {
    current: Option<DetectionSet>,
}

impl LatestDetections {
    /// Store `detections` unless a set from the same or a newer frame is held.
    ///
    /// Returns whether the set was accepted.
    pub fn offer(&mut self, detections: DetectionSet) -> bool {
        if let Some(current) = &self.current {
            if current.frame >= detections.frame {
                tracing::debug!(
                    "dropping detections of frame {}, already showing frame {}",
                    detections.frame,
                    current.frame
                );
                return false;
            }
        }
        self.current = Some(detections);
        true
    }

    /// The most recent detections, if any.
    pub fn get(&self) -> Option<&DetectionSet> {
        self.current.as_ref()
    }
}

impl DetectionSink for LatestDetections {
    fn consume(&mut self, detections: &DetectionSet) {
        self.offer(detections.clone());
    }
}
