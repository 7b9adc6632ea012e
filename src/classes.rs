/// COCO class names in model output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Class names folded into a category they are not literally equal to.
///
/// The scene has chickens but COCO has no such class; the detector reports
/// them as birds.
pub const CLASS_SYNONYMS: &[(&str, &str)] = &[("bird", "chicken")];

/// Category reported for a class index, after synonym remapping.
///
/// Returns `None` for indices outside the class table.
pub fn category_for_class(class_index: usize) -> Option<&'static str> {
    let name = *COCO_CLASSES.get(class_index)?;
    Some(
        CLASS_SYNONYMS
            .iter()
            .find(|(from, _)| *from == name)
            .map_or(name, |(_, to)| *to),
    )
}

/// Whether some class index maps onto `category`.
pub(crate) fn is_reachable(category: &str) -> bool {
    (0..COCO_CLASSES.len()).any(|i| category_for_class(i) == Some(category))
}
