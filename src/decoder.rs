use crate::{
    classes::category_for_class, config::DetectorConfig, coordinates::CoordinateMapper,
    detection::Detection, tensor::CanonicalView,
};

/// Decode every candidate of `view` into canvas-space detections.
///
/// A candidate is kept when its arg-max class score is strictly above the
/// confidence threshold, its remapped category is a configured target, and
/// its box is finite and at least one side of its normalized box reaches
/// `min_detection_size`.
/// The result is not yet deduplicated.
pub fn decode_detections(
    view: &CanonicalView<'_>,
    config: &DetectorConfig,
    mapper: &CoordinateMapper,
) -> Vec<Detection> {
    let input_w = config.input_width as f32;
    let input_h = config.input_height as f32;
    let mut detections = Vec::new();

    for index in 0..view.num_detections() {
        let (class_index, confidence) = view.best_class(index);
        if confidence.is_nan() || confidence <= config.confidence_threshold {
            continue;
        }

        let Some(category) = category_for_class(class_index) else {
            continue;
        };
        if !config.is_target(category) {
            continue;
        }

        let [cx, cy, w, h] = view.raw_box(index);
        if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
            continue;
        }
        let normalized = [cx / input_w, cy / input_h, w / input_w, h / input_h];
        if normalized[2] < config.min_detection_size && normalized[3] < config.min_detection_size {
            continue;
        }

        detections.push(Detection::from_corners(
            mapper.map(normalized),
            confidence,
            category,
        ));
    }

    detections
}
