use image::imageops::{self, FilterType};

use super::FrameFilter;
use crate::frame::Frame;

/// Stand-in for a super-resolution model: downsample then resample back to
/// the original size.
#[derive(Debug, Clone)]
pub struct ResolutionSim {
    scale: u32,
}

impl ResolutionSim {
    pub fn new(scale: u32) -> Self {
        Self { scale: scale.max(1) }
    }
}

impl FrameFilter for ResolutionSim {
    fn name(&self) -> &str {
        "super_resolution"
    }

    fn apply(&self, frame: &Frame) -> Frame {
        let (width, height) = frame.dimensions();
        if self.scale == 1 || width == 0 || height == 0 {
            return frame.clone();
        }

        let small_width = (width / self.scale).max(1);
        let small_height = (height / self.scale).max(1);
        let small = imageops::resize(frame.as_image(), small_width, small_height, FilterType::Triangle);
        Frame::from_image(imageops::resize(&small, width, height, FilterType::CatmullRom))
    }
}

/// Stand-in for a detail-enhancement model: unsharp mask at native size.
#[derive(Debug, Clone)]
pub struct DetailEnhanceSim {
    sigma: f32,
    threshold: i32,
}

impl DetailEnhanceSim {
    pub fn new(sigma: f32, threshold: i32) -> Self {
        Self { sigma, threshold }
    }
}

impl FrameFilter for DetailEnhanceSim {
    fn name(&self) -> &str {
        "detail_enhance"
    }

    fn apply(&self, frame: &Frame) -> Frame {
        if frame.width() == 0 || frame.height() == 0 {
            return frame.clone();
        }
        Frame::from_image(imageops::unsharpen(frame.as_image(), self.sigma, self.threshold))
    }
}
