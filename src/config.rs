use crate::filter::DetectionFilter;

/// Threshold surface of the pipeline. Values only; how they are obtained
/// (CLI, defaults) is the caller's concern.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Candidates scoring below this are discarded outright.
    pub score_threshold: f32,
    /// Boxes overlapping above this ratio are treated as one object.
    pub iou_threshold: f32,
    /// A pitch needs accepted detections in at least this fraction of its
    /// frames to be trusted.
    pub min_detection_ratio: f32,
    /// Write a `.dets` sidecar next to each pitch video with the raw
    /// per-frame candidates.
    pub dump_detections: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            iou_threshold: 0.45,
            min_detection_ratio: 0.2,
            dump_detections: false,
        }
    }
}

impl OverlayConfig {
    #[inline]
    pub fn filter(&self) -> DetectionFilter {
        DetectionFilter::new(self.score_threshold, self.iou_threshold)
    }
}
