// Frame codec over ffmpeg
//
// This module turns video files into in-memory frame sequences and back:
// - Commands: ffmpeg/ffprobe command builders and scoped child processes
// - Probe: stream metadata parsing
// - Processor: the ffmpeg-backed FrameCodec implementation

pub mod commands;
pub mod probe;
pub mod processor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use commands::*;
pub use probe::*;
pub use processor::*;

use crate::config::Config;
use crate::error::Result;
use crate::frame::FrameSequence;

/// What an encode produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSummary {
    pub output_path: PathBuf,
    pub frames_written: usize,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Main trait for turning media files into frames and back
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameCodec: Send + Sync {
    /// Decode every frame of the first video stream, in order
    async fn decode(&self, source: &Path) -> Result<FrameSequence>;

    /// Encode frames in order at `fps`; never leaves a partial file behind
    async fn encode(&self, sequence: FrameSequence, output: &Path, fps: f64) -> Result<EncodeSummary>;

    /// Read stream metadata without decoding
    async fn probe(&self, source: &Path) -> Result<VideoInfo>;

    /// Check if the underlying tools are available
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating codec instances
pub struct FrameCodecFactory;

impl FrameCodecFactory {
    /// Create the default codec implementation (ffmpeg-based)
    pub fn create_codec(config: &Config) -> Box<dyn FrameCodec> {
        let codec = FfmpegCodec::new(config.media.clone());
        if config.pipeline.save_scratch_frames {
            Box::new(codec.with_scratch_dir(&config.paths.scratch_dir))
        } else {
            Box::new(codec)
        }
    }
}
