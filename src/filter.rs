use crate::detection::Detection;

/// Reduces one frame's raw candidate set to at most one accepted ball
/// detection. The domain guarantees a single ball is physically present,
/// so several survivors after suppression mean detector noise, not several
/// balls.
#[derive(Debug, Clone, Copy)]
pub struct DetectionFilter {
    pub score_threshold: f32,
    pub iou_threshold: f32,
}

impl DetectionFilter {
    pub fn new(score_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            score_threshold,
            iou_threshold,
        }
    }

    /// Score cut, then non-maximum suppression, then the single
    /// highest-scoring survivor. `None` is a valid, expected outcome.
    pub fn select(&self, mut dets: Vec<Detection>) -> Option<Detection> {
        dets.retain(|d| d.confidence >= self.score_threshold);

        if dets.is_empty() {
            return None;
        }

        let dets = self.suppress(dets);

        // suppress() keeps dets sorted by confidence
        dets.into_iter().next()
    }

    /// Non-maximum suppression: two boxes with IoU above the threshold are
    /// the same object; the higher-scoring one wins. Returns survivors in
    /// descending confidence order.
    pub fn suppress(&self, mut dets: Vec<Detection>) -> Vec<Detection> {
        if dets.len() < 2 {
            return dets;
        }

        dets.sort_unstable_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());

        let mut retain: Vec<_> = (0..dets.len() as i32).collect();
        for idx in 0..dets.len() - 1 {
            if retain[idx] != -1 {
                for r in retain[idx + 1..].iter_mut() {
                    if *r != -1 {
                        let iou = dets[idx].iou(&dets[*r as usize]);
                        if iou > self.iou_threshold {
                            *r = -1;
                        }
                    }
                }
            }
        }

        retain.retain(|&x| x > -1);

        dets.into_iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                if retain.contains(&(idx as i32)) {
                    Some(item)
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, confidence: f32) -> Detection {
        Detection {
            x,
            y,
            w: 16.0,
            h: 16.0,
            confidence,
        }
    }

    fn filter() -> DetectionFilter {
        DetectionFilter::new(0.5, 0.45)
    }

    #[test]
    fn empty_frame_yields_absent() {
        assert_eq!(filter().select(vec![]), None);
    }

    #[test]
    fn all_below_threshold_yields_absent() {
        let dets = vec![det(10.0, 10.0, 0.2), det(40.0, 40.0, 0.49)];
        assert_eq!(filter().select(dets), None);
    }

    #[test]
    fn dominant_box_wins_over_overlapping_noise() {
        // three boxes on top of each other, one clear winner
        let best = det(100.0, 100.0, 0.95);
        let dets = vec![det(102.0, 101.0, 0.6), best, det(99.0, 98.0, 0.7)];

        assert_eq!(filter().select(dets), Some(best));
    }

    #[test]
    fn highest_score_wins_among_disjoint_survivors() {
        // non-overlapping noise elsewhere in the frame
        let best = det(100.0, 100.0, 0.9);
        let dets = vec![det(400.0, 300.0, 0.8), best];

        assert_eq!(filter().select(dets), Some(best));
    }

    #[test]
    fn suppression_keeps_disjoint_boxes() {
        let dets = vec![det(100.0, 100.0, 0.9), det(400.0, 300.0, 0.8)];
        let kept = filter().suppress(dets);

        assert_eq!(kept.len(), 2);
        assert!(kept[0].confidence >= kept[1].confidence);
    }

    #[test]
    fn suppression_merges_overlapping_boxes() {
        let dets = vec![
            det(100.0, 100.0, 0.9),
            det(101.0, 100.0, 0.8),
            det(100.0, 102.0, 0.7),
        ];
        let kept = filter().suppress(dets);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }
}
