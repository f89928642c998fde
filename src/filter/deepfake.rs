use serde::{Deserialize, Serialize};

use super::ClipClassifier;
use crate::frame::FrameSequence;

/// Aggregate verdict for one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepfakeReport {
    pub is_fake: bool,
    pub probability: f64,
    pub total_frames: usize,
    pub fake_frame_count: usize,
}

impl DeepfakeReport {
    /// Clamp `probability` to [0, 1] (NaN reads as 0) and derive the frame
    /// count as `floor(total_frames * probability)`.
    pub fn new(total_frames: usize, probability: f64, threshold: f64) -> Self {
        let probability = if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) };
        let fake_frame_count = (total_frames as f64 * probability).floor() as usize;
        Self {
            is_fake: total_frames > 0 && probability >= threshold,
            probability,
            total_frames,
            fake_frame_count: fake_frame_count.min(total_frames),
        }
    }
}

/// Placeholder scorer: the more consecutive frames disagree, the higher the
/// score. A learned classifier replaces this behind `ClipClassifier`.
#[derive(Debug, Clone)]
pub struct TemporalDriftClassifier {
    threshold: f64,
    sensitivity: f64,
}

impl TemporalDriftClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, sensitivity: 4.0 }
    }

    /// Mean absolute per-channel difference between neighbours, in [0, 1].
    fn mean_drift(sequence: &FrameSequence) -> f64 {
        let mut total = 0.0;
        let mut pairs = 0usize;
        for pair in sequence.frames().windows(2) {
            if pair[0].dimensions() != pair[1].dimensions() || pair[0].as_raw().is_empty() {
                continue;
            }
            let sum: u64 = pair[0]
                .as_raw()
                .iter()
                .zip(pair[1].as_raw())
                .map(|(&a, &b)| a.abs_diff(b) as u64)
                .sum();
            total += sum as f64 / (pair[0].as_raw().len() as f64 * 255.0);
            pairs += 1;
        }
        if pairs == 0 { 0.0 } else { total / pairs as f64 }
    }
}

impl ClipClassifier for TemporalDriftClassifier {
    fn name(&self) -> &str {
        "temporal_drift"
    }

    fn classify(&self, sequence: &FrameSequence) -> DeepfakeReport {
        let probability = Self::mean_drift(sequence) * self.sensitivity;
        DeepfakeReport::new(sequence.len(), probability, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn clip(levels: &[u8]) -> FrameSequence {
        let frames = levels.iter().map(|&v| Frame::solid(4, 4, [v, v, v])).collect();
        FrameSequence::new(frames, 30.0).unwrap()
    }

    fn assert_invariants(report: &DeepfakeReport) {
        assert!((0.0..=1.0).contains(&report.probability));
        assert_eq!(
            report.fake_frame_count,
            (report.total_frames as f64 * report.probability).floor() as usize
        );
    }

    #[test]
    fn test_report_clamps_probability() {
        for probability in [-0.3, 0.0, 0.37, 1.0, 7.5, f64::NAN] {
            let report = DeepfakeReport::new(11, probability, 0.5);
            assert_invariants(&report);
        }
        let report = DeepfakeReport::new(10, 0.37, 0.5);
        assert_eq!(report.fake_frame_count, 3);
        assert!(!report.is_fake);
    }

    #[test]
    fn test_static_clip_scores_zero() {
        let report = TemporalDriftClassifier::new(0.5).classify(&clip(&[40, 40, 40, 40]));
        assert_eq!(report.probability, 0.0);
        assert_eq!(report.total_frames, 4);
        assert_eq!(report.fake_frame_count, 0);
        assert!(!report.is_fake);
    }

    #[test]
    fn test_flickering_clip_scores_high() {
        let report = TemporalDriftClassifier::new(0.5).classify(&clip(&[0, 255, 0, 255, 0]));
        assert_eq!(report.probability, 1.0);
        assert_eq!(report.fake_frame_count, 5);
        assert!(report.is_fake);
        assert_invariants(&report);
    }

    #[test]
    fn test_empty_clip() {
        let report = TemporalDriftClassifier::new(0.0).classify(&clip(&[]));
        assert_eq!(report.total_frames, 0);
        assert_eq!(report.fake_frame_count, 0);
        assert!(!report.is_fake);
    }
}
