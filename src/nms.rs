use crate::detection::Detection;

/// Intersection over union of two detections.
///
/// Two boxes with no union area, e.g. two disjoint zero-area boxes, have an
/// IoU of 0.
pub fn iou(b1: &Detection, b2: &Detection) -> f32 {
    let i_xmin = b1.xmin.max(b2.xmin);
    let i_xmax = b1.xmax.min(b2.xmax);
    let i_ymin = b1.ymin.max(b2.ymin);
    let i_ymax = b1.ymax.min(b2.ymax);
    let i_area = (i_xmax - i_xmin).max(0.) * (i_ymax - i_ymin).max(0.);
    let union = b1.area() + b2.area() - i_area;
    if union > 0. { i_area / union } else { 0. }
}

/// Non-maximum suppression for detections.
///
/// Greedy and category-agnostic: the most confident remaining detection is
/// kept and every remaining detection overlapping it with an IoU greater
/// than `threshold` is dropped, regardless of category.
///
/// # Arguments
///
/// * `detections` - The candidate detections, consumed.
/// * `threshold` - The IoU threshold for suppression.
/// * `max_candidates` - Only the most confident `max_candidates` take part.
/// * `max_output` - Maximum number of detections returned.
///
/// Returns the kept detections in decreasing confidence order.
pub fn non_maximum_suppression(
    mut detections: Vec<Detection>,
    threshold: f32,
    max_candidates: usize,
    max_output: usize,
) -> Vec<Detection> {
    // Stable, so equal confidences keep decode order.
    detections.sort_by(|b1, b2| b2.confidence.total_cmp(&b1.confidence));
    detections.truncate(max_candidates);

    let mut suppressed = vec![false; detections.len()];
    let mut picked = Vec::new();

    for index in 0..detections.len() {
        if suppressed[index] {
            continue;
        }
        let best = &detections[index];
        picked.push(*best);

        for (other, dropped) in detections.iter().zip(suppressed.iter_mut()).skip(index + 1) {
            if !*dropped && iou(best, other) > threshold {
                *dropped = true;
            }
        }
    }

    picked.truncate(max_output);
    picked
}
