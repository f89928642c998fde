//! Frame and frame-sequence types shared by the codec, transforms and filters.

use image::{Rgb, RgbImage};

use crate::error::{Result, ReframeError};

/// Number of interleaved channels in every frame (RGB, 8 bits each).
pub const CHANNELS: usize = 3;

/// A single decoded picture. Frames are never mutated once built; transforms
/// always produce new frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Build a frame from packed `rgb24` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(ReframeError::Media(format!(
                "Frame buffer holds {} bytes, {}x{} rgb24 needs {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        RgbImage::from_raw(width, height, data)
            .map(Self::from_image)
            .ok_or_else(|| ReframeError::Media(format!("Invalid {}x{} frame buffer", width, height)))
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn solid(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self::from_image(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }
}

/// Ordered frames plus the rate they are meant to play at.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    frames: Vec<Frame>,
    fps: f64,
}

impl FrameSequence {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ReframeError::InvalidParameter(format!(
                "frame rate must be positive, got {}",
                fps
            )));
        }
        Ok(Self { frames, fps })
    }

    pub fn empty(fps: f64) -> Result<Self> {
        Self::new(Vec::new(), fps)
    }

    /// Replace the frames while keeping the frame rate.
    pub(crate) fn with_frames(&self, frames: Vec<Frame>) -> Self {
        Self { frames, fps: self.fps }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn width(&self) -> Option<u32> {
        self.first().map(Frame::width)
    }

    pub fn height(&self) -> Option<u32> {
        self.first().map(Frame::height)
    }

    /// Verify every frame matches the first frame's size.
    pub fn check_dimensions(&self) -> Result<()> {
        let Some(first) = self.first() else {
            return Ok(());
        };
        let (expected_width, expected_height) = first.dimensions();
        for (index, frame) in self.frames.iter().enumerate().skip(1) {
            let (actual_width, actual_height) = frame.dimensions();
            if (actual_width, actual_height) != (expected_width, expected_height) {
                return Err(ReframeError::DimensionMismatch {
                    index,
                    expected_width,
                    expected_height,
                    actual_width,
                    actual_height,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_checks_length() {
        assert!(Frame::from_raw(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(Frame::from_raw(2, 2, vec![0; 11]), Err(ReframeError::Media(_))));
    }

    #[test]
    fn test_sequence_rejects_non_positive_fps() {
        assert!(FrameSequence::empty(0.0).is_err());
        assert!(FrameSequence::empty(f64::NAN).is_err());
        let seq = FrameSequence::empty(24.0).unwrap();
        assert_eq!(seq.frame_count(), 0);
        assert_eq!(seq.width(), None);
    }

    #[test]
    fn test_check_dimensions_reports_first_offender() {
        let frames = vec![
            Frame::solid(4, 4, [0, 0, 0]),
            Frame::solid(4, 4, [1, 1, 1]),
            Frame::solid(4, 2, [2, 2, 2]),
        ];
        let seq = FrameSequence::new(frames, 30.0).unwrap();
        match seq.check_dimensions() {
            Err(ReframeError::DimensionMismatch { index, actual_height, .. }) => {
                assert_eq!(index, 2);
                assert_eq!(actual_height, 2);
            }
            other => panic!("expected dimension mismatch, got {:?}", other),
        }
    }
}
