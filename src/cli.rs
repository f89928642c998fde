use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;
use crate::request::{TransformKind, TransformRequest};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Transform selection shared by `process` and `batch`
#[derive(ClapArgs, Debug, Clone)]
pub struct TransformArgs {
    /// Transform to apply: interpolate, speed, low_light, super_resolution, detail_enhance, deepfake
    #[arg(short, long)]
    pub transform: TransformKind,

    /// Frames to synthesize between each original pair (interpolate)
    #[arg(long)]
    pub frames: Option<usize>,

    /// Playback speed factor; above 1 is faster, below 1 is slower (speed)
    #[arg(long)]
    pub speed: Option<f64>,
}

impl TransformArgs {
    pub fn to_request(&self) -> Result<TransformRequest> {
        TransformRequest::from_kind(self.transform, self.frames, self.speed)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transform a single video or image
    Process {
        /// Input media file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        transform: TransformArgs,

        /// Output directory (defaults to the configured output directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Transform every media file in a directory
    Batch {
        /// Input directory (defaults to the configured upload directory)
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        #[command(flatten)]
        transform: TransformArgs,

        /// Output directory (defaults to the configured output directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Show stream information for a video
    Probe {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "reframe.toml")]
        output: PathBuf,
    },
}
