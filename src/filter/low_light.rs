use image::RgbImage;

use super::FrameFilter;
use crate::frame::Frame;

/// Luma histogram equalization followed by a global gain/offset.
#[derive(Debug, Clone)]
pub struct LowLightEnhance {
    gain: f32,
    offset: f32,
}

impl LowLightEnhance {
    pub fn new(gain: f32, offset: f32) -> Self {
        Self { gain, offset }
    }
}

impl FrameFilter for LowLightEnhance {
    fn name(&self) -> &str {
        "low_light"
    }

    fn apply(&self, frame: &Frame) -> Frame {
        let (width, height) = frame.dimensions();
        let pixels = frame.as_raw().len() / 3;

        let mut luma = Vec::with_capacity(pixels);
        let mut chroma = Vec::with_capacity(pixels);
        for rgb in frame.as_raw().chunks_exact(3) {
            let (y, cb, cr) = rgb_to_ycbcr(rgb[0], rgb[1], rgb[2]);
            luma.push(to_u8(y));
            chroma.push((cb, cr));
        }

        let lut = equalization_lut(&luma);

        let mut data = Vec::with_capacity(frame.as_raw().len());
        for (&y, &(cb, cr)) in luma.iter().zip(&chroma) {
            let [r, g, b] = ycbcr_to_rgb(lut[y as usize] as f32, cb, cr);
            for channel in [r, g, b] {
                data.push(to_u8(channel as f32 * self.gain + self.offset));
            }
        }

        // Buffer length is w*h*3 by construction.
        match RgbImage::from_raw(width, height, data) {
            Some(image) => Frame::from_image(image),
            None => frame.clone(),
        }
    }
}

// BT.601 full range, as used by JPEG
fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (y, cb, cr)
}

fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> [u8; 3] {
    let r = y + 1.402 * (cr - 128.0);
    let g = y - 0.344_136 * (cb - 128.0) - 0.714_136 * (cr - 128.0);
    let b = y + 1.772 * (cb - 128.0);
    [to_u8(r), to_u8(g), to_u8(b)]
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// CDF lookup table anchored at the darkest populated level. A plane with a
/// single level maps to itself.
fn equalization_lut(plane: &[u8]) -> [u8; 256] {
    let mut histogram = [0usize; 256];
    for &v in plane {
        histogram[v as usize] += 1;
    }

    let mut lut = [0u8; 256];
    let total = plane.len();
    let cdf_min = histogram.iter().copied().find(|&count| count > 0).unwrap_or(0);
    if total == cdf_min {
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = i as u8;
        }
        return lut;
    }

    let scale = 255.0 / (total - cdf_min) as f32;
    let mut cdf = 0usize;
    for (level, &count) in histogram.iter().enumerate() {
        cdf += count;
        lut[level] = to_u8(cdf.saturating_sub(cdf_min) as f32 * scale);
    }
    lut
}
