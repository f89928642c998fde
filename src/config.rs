use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, ReframeError};

// Serde defaults for fields added after the first config format
fn default_fallback_fps() -> f64 {
    30.0
}

fn default_parallel_filters() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub media: MediaConfig,
    pub paths: PathsConfig,
    pub filters: FilterConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Encoder used for output videos
    pub video_codec: String,
    /// Additional encoding options appended after the codec
    /// Common options: ["-preset", "medium", "-crf", "18"]
    pub encode_options: Vec<String>,
    /// Frame rate assumed when the source does not report a usable one
    #[serde(default = "default_fallback_fps")]
    pub fallback_fps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where incoming media is dropped; default input for batch runs
    pub upload_dir: PathBuf,
    /// Where encoded results are written
    pub output_dir: PathBuf,
    /// Root for per-run frame dumps
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Multiplicative gain applied after luma equalization
    pub low_light_gain: f32,
    /// Additive offset applied after luma equalization
    pub low_light_offset: f32,
    /// Downsample factor used by the resolution simulation
    pub resolution_scale: u32,
    /// Blur radius of the unsharp mask
    pub detail_sigma: f32,
    /// Minimum difference before the unsharp mask sharpens a pixel
    pub detail_threshold: i32,
    /// Probability at or above which a clip is reported as fake
    pub deepfake_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Dump every decoded frame as PNG under the scratch directory
    pub save_scratch_frames: bool,
    /// Run per-frame filters on the rayon pool
    #[serde(default = "default_parallel_filters")]
    pub parallel_filters: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                video_codec: "libx264".to_string(),
                encode_options: vec![
                    "-preset".to_string(),
                    "medium".to_string(),
                    "-crf".to_string(),
                    "18".to_string(),
                ],
                fallback_fps: default_fallback_fps(),
            },
            paths: PathsConfig {
                upload_dir: PathBuf::from("uploads"),
                output_dir: PathBuf::from("processed"),
                scratch_dir: PathBuf::from("frames"),
            },
            filters: FilterConfig {
                low_light_gain: 1.3,
                low_light_offset: 30.0,
                resolution_scale: 2,
                detail_sigma: 1.5,
                detail_threshold: 2,
                deepfake_threshold: 0.5,
            },
            pipeline: PipelineConfig {
                save_scratch_frames: false,
                parallel_filters: default_parallel_filters(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReframeError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ReframeError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReframeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReframeError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.media.fallback_fps.is_finite() && self.media.fallback_fps > 0.0) {
            return Err(ReframeError::Config(format!(
                "fallback_fps must be positive, got {}",
                self.media.fallback_fps
            )));
        }
        if self.filters.resolution_scale == 0 {
            return Err(ReframeError::Config("resolution_scale must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.filters.deepfake_threshold) {
            return Err(ReframeError::Config(format!(
                "deepfake_threshold must be within [0, 1], got {}",
                self.filters.deepfake_threshold
            )));
        }
        Ok(())
    }

    /// Create the upload, output and scratch directories if missing.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.paths.upload_dir, &self.paths.output_dir, &self.paths.scratch_dir] {
            debug!("Ensuring directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Point all working directories under a single root.
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        let root = root.as_ref();
        self.paths.upload_dir = root.join("uploads");
        self.paths.output_dir = root.join("processed");
        self.paths.scratch_dir = root.join("frames");
        self
    }
}
