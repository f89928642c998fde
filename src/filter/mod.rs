// Per-frame filters and clip-level classifiers
//
// Every enhancement stage is a single-frame-in/single-frame-out function with
// no knowledge of neighbouring frames, so it composes with any temporal stage.
// The built-in filters are deterministic stand-ins; a model-backed filter only
// needs to implement `FrameFilter` (or `ClipClassifier` for whole-clip scoring)
// and be placed into a `FilterSet`.

pub mod deepfake;
pub mod low_light;
pub mod resolution;

use rayon::prelude::*;
use tracing::debug;

pub use deepfake::*;
pub use low_light::*;
pub use resolution::*;

use crate::config::FilterConfig;
use crate::frame::{Frame, FrameSequence};

/// Stateless frame-to-frame transform. Output must keep the input dimensions.
pub trait FrameFilter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Produce the transformed frame
    fn apply(&self, frame: &Frame) -> Frame;
}

/// Whole-clip reduction to a deepfake likelihood.
pub trait ClipClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, sequence: &FrameSequence) -> DeepfakeReport;
}

/// Map a filter over every frame, preserving order.
pub fn apply_filter(sequence: FrameSequence, filter: &dyn FrameFilter, parallel: bool) -> FrameSequence {
    debug!("Applying {} to {} frames (parallel: {})", filter.name(), sequence.len(), parallel);

    let frames: Vec<Frame> = if parallel {
        sequence.frames().par_iter().map(|frame| filter.apply(frame)).collect()
    } else {
        sequence.frames().iter().map(|frame| filter.apply(frame)).collect()
    };

    sequence.with_frames(frames)
}

/// The filters and classifier the pipeline dispatches to.
pub struct FilterSet {
    pub low_light: Box<dyn FrameFilter>,
    pub super_resolution: Box<dyn FrameFilter>,
    pub detail_enhance: Box<dyn FrameFilter>,
    pub classifier: Box<dyn ClipClassifier>,
}

impl FilterSet {
    /// Built-in deterministic filters tuned by config
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            low_light: Box::new(LowLightEnhance::new(config.low_light_gain, config.low_light_offset)),
            super_resolution: Box::new(ResolutionSim::new(config.resolution_scale)),
            detail_enhance: Box::new(DetailEnhanceSim::new(config.detail_sigma, config.detail_threshold)),
            classifier: Box::new(TemporalDriftClassifier::new(config.deepfake_threshold)),
        }
    }

    pub fn with_low_light(mut self, filter: Box<dyn FrameFilter>) -> Self {
        self.low_light = filter;
        self
    }

    pub fn with_super_resolution(mut self, filter: Box<dyn FrameFilter>) -> Self {
        self.super_resolution = filter;
        self
    }

    pub fn with_detail_enhance(mut self, filter: Box<dyn FrameFilter>) -> Self {
        self.detail_enhance = filter;
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn ClipClassifier>) -> Self {
        self.classifier = classifier;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Invert;

    impl FrameFilter for Invert {
        fn name(&self) -> &str {
            "invert"
        }

        fn apply(&self, frame: &Frame) -> Frame {
            let data = frame.as_raw().iter().map(|v| 255 - v).collect();
            Frame::from_raw(frame.width(), frame.height(), data).unwrap()
        }
    }

    #[test]
    fn test_apply_filter_preserves_order() {
        let frames: Vec<Frame> = (0..32u8).map(|i| Frame::solid(3, 3, [i, i, i])).collect();
        let seq = FrameSequence::new(frames, 25.0).unwrap();

        let serial = apply_filter(seq.clone(), &Invert, false);
        let parallel = apply_filter(seq, &Invert, true);
        assert_eq!(serial, parallel);

        let levels: Vec<u8> = parallel.frames().iter().map(|f| f.pixel(0, 0)[0]).collect();
        let expected: Vec<u8> = (0..32u8).map(|i| 255 - i).collect();
        assert_eq!(levels, expected);
        assert_eq!(parallel.fps(), 25.0);
    }

    #[test]
    fn test_filter_set_slots_are_replaceable() {
        let set = FilterSet::from_config(&crate::config::Config::default().filters)
            .with_detail_enhance(Box::new(Invert));
        assert_eq!(set.detail_enhance.name(), "invert");
        assert_eq!(set.low_light.name(), "low_light");
    }
}
