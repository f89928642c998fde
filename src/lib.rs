//! Reframe - Video Frame-Sequence Transformation Pipeline
//!
//! Decodes a video into ordered frames with ffmpeg, applies an interpolation,
//! speed remap, enhancement filter or clip-level score, and re-encodes the
//! result at the source frame rate.

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod frame;
pub mod media;
pub mod pipeline;
pub mod request;
pub mod temporal;
