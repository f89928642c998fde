//! Inter-frame transforms: blending in-between frames and remapping playback
//! speed by dropping or duplicating frames. None of these touch the frame rate.

use tracing::debug;

use crate::error::{Result, ReframeError};
use crate::frame::{Frame, FrameSequence};

/// Most frames a temporal transform may produce from one clip.
pub const MAX_OUTPUT_FRAMES: usize = 1_000_000;

/// Blend `n` evenly spaced frames strictly between `a` and `b`.
pub fn interpolate(a: &Frame, b: &Frame, n: usize) -> Result<Vec<Frame>> {
    if n >= MAX_OUTPUT_FRAMES {
        return Err(ReframeError::InvalidParameter(format!(
            "cannot blend {} frames between one pair",
            n
        )));
    }
    if a.dimensions() != b.dimensions() {
        let (expected_width, expected_height) = a.dimensions();
        let (actual_width, actual_height) = b.dimensions();
        return Err(ReframeError::DimensionMismatch {
            index: 1,
            expected_width,
            expected_height,
            actual_width,
            actual_height,
        });
    }

    let (width, height) = a.dimensions();
    let mut frames = Vec::with_capacity(n);
    for i in 1..=n {
        let alpha = i as f32 / (n + 1) as f32;
        let data = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&pa, &pb)| blend(pa, pb, alpha))
            .collect();
        frames.push(Frame::from_raw(width, height, data)?);
    }
    Ok(frames)
}

fn blend(a: u8, b: u8, alpha: f32) -> u8 {
    let value = a as f32 * (1.0 - alpha) + b as f32 * alpha;
    value.round().clamp(0.0, 255.0) as u8
}

/// Insert `n` blended frames between every adjacent pair.
///
/// The result has `(len - 1) * (n + 1) + 1` frames and keeps the source fps,
/// so the clip plays longer: slow motion by interpolation.
pub fn interpolate_sequence(sequence: FrameSequence, n: usize) -> Result<FrameSequence> {
    if n == 0 || sequence.len() <= 1 {
        return Ok(sequence);
    }

    let frames = sequence.frames();
    let total = expanded_len(frames.len(), n).ok_or_else(|| {
        ReframeError::InvalidParameter(format!(
            "{} intermediate frames over {} source frames exceeds {} output frames",
            n,
            frames.len(),
            MAX_OUTPUT_FRAMES
        ))
    })?;
    let mut output = Vec::with_capacity(total);
    for pair in frames.windows(2) {
        output.push(pair[0].clone());
        output.extend(interpolate(&pair[0], &pair[1], n)?);
    }
    if let Some(last) = frames.last() {
        output.push(last.clone());
    }

    debug!("Interpolated {} frames into {}", frames.len(), output.len());
    Ok(sequence.with_frames(output))
}

/// Approximate a playback speed change without touching the frame rate.
///
/// Factors above 1 keep every `floor(factor)`-th frame from index 0. Factors
/// below 1 repeat each frame `floor(1 / factor) - 1` extra times (never fewer
/// than zero) and append the final frame exactly once.
pub fn remap_speed(sequence: FrameSequence, factor: f64) -> Result<FrameSequence> {
    if !(factor.is_finite() && factor > 0.0) {
        return Err(ReframeError::InvalidParameter(format!(
            "speed factor must be a positive number, got {}",
            factor
        )));
    }

    if factor == 1.0 {
        return Ok(sequence);
    }

    let frames = sequence.frames();
    let output: Vec<Frame> = if factor > 1.0 {
        let step = factor.floor() as usize;
        frames.iter().step_by(step).cloned().collect()
    } else if frames.len() <= 1 {
        return Ok(sequence);
    } else {
        let extra = duplicate_count(factor);
        let total = expanded_len(frames.len(), extra).ok_or_else(|| {
            ReframeError::InvalidParameter(format!(
                "speed factor {} over {} source frames exceeds {} output frames",
                factor,
                frames.len(),
                MAX_OUTPUT_FRAMES
            ))
        })?;
        let mut output = Vec::with_capacity(total);
        if let Some((last, rest)) = frames.split_last() {
            for frame in rest {
                for _ in 0..=extra {
                    output.push(frame.clone());
                }
            }
            output.push(last.clone());
        }
        output
    };

    debug!("Remapped {} frames to {} at speed {}", frames.len(), output.len(), factor);
    Ok(sequence.with_frames(output))
}

/// Extra copies per frame for slow motion; 0.5 < factor < 1 clamps to zero.
/// Saturates at `usize::MAX` for vanishing factors.
fn duplicate_count(factor: f64) -> usize {
    let copies = (1.0 / factor).floor() - 1.0;
    if copies > 0.0 { copies as usize } else { 0 }
}

/// `(len - 1) * (extra + 1) + 1`: every frame but the last gains `extra`
/// followers. `None` on overflow or past [`MAX_OUTPUT_FRAMES`].
fn expanded_len(len: usize, extra: usize) -> Option<usize> {
    extra
        .checked_add(1)
        .and_then(|per_frame| len.saturating_sub(1).checked_mul(per_frame))
        .and_then(|total| total.checked_add(1))
        .filter(|&total| total <= MAX_OUTPUT_FRAMES)
}
