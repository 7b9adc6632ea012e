use serde::Serialize;

use crate::detection::{DetectionSet, DetectionSink};

/// Count of detections per target category in the latest frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryStats {
    counts: Vec<(String, usize)>,
    frame: Option<u64>,
}

impl CategoryStats {
    /// Statistics over `categories`, in the given order.
    pub fn new<S: AsRef<str>>(categories: &[S]) -> Self {
        Self {
            counts: categories
                .iter()
                .map(|c| (c.as_ref().to_string(), 0))
                .collect(),
            frame: None,
        }
    }

    /// Detections of `category` in the latest frame.
    pub fn count(&self, category: &str) -> usize {
        self.counts
            .iter()
            .find(|(c, _)| c == category)
            .map_or(0, |(_, n)| *n)
    }

    /// Detections of all tracked categories in the latest frame.
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// Frame the counts were taken from.
    pub fn frame(&self) -> Option<u64> {
        self.frame
    }

    /// `(category, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(c, n)| (c.as_str(), *n))
    }
}

impl DetectionSink for CategoryStats {
    fn consume(&mut self, detections: &DetectionSet) {
        for (category, count) in self.counts.iter_mut() {
            *count = detections.count(category);
        }
        self.frame = Some(detections.frame);
    }
}

impl std::fmt::Display for CategoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (category, count) in self.iter() {
            write!(f, "{category}: {count}, ")?;
        }
        write!(f, "total: {}", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Detection, LabeledDetection};

    fn set(frame: u64, categories: &[&'static str]) -> DetectionSet {
        DetectionSet {
            frame,
            items: categories
                .iter()
                .enumerate()
                .map(|(i, c)| LabeledDetection {
                    detection: Detection::from_corners([0.0, 0.0, 1.0, 1.0], 0.5, *c),
                    ordinal: i as u32 + 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_counts_follow_latest_frame() {
        let mut stats = CategoryStats::new(&["person", "cow", "sheep", "chicken"]);
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.frame(), None);

        stats.consume(&set(3, &["cow", "cow", "person", "horse"]));
        assert_eq!(stats.count("cow"), 2);
        assert_eq!(stats.count("person"), 1);
        assert_eq!(stats.count("horse"), 0);
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.frame(), Some(3));
        assert_eq!(
            stats.to_string(),
            "person: 1, cow: 2, sheep: 0, chicken: 0, total: 3"
        );

        stats.consume(&set(6, &["chicken"]));
        assert_eq!(stats.count("cow"), 0);
        assert_eq!(stats.total(), 1);
    }
}
