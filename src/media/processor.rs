use async_trait::async_trait;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{EncodeSummary, FrameCodec, MediaCommandBuilder, VideoInfo, parse_probe_output};
use crate::config::MediaConfig;
use crate::error::{Result, ReframeError};
use crate::frame::{CHANNELS, Frame, FrameSequence};

// Container frame counts are hints only; don't trust them for allocation.
const MAX_PREALLOCATED_FRAMES: u64 = 4096;

/// Concrete frame codec backed by ffmpeg/ffprobe subprocesses exchanging
/// packed rgb24 frames over pipes
#[derive(Debug, Clone)]
pub struct FfmpegCodec {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
    scratch_dir: Option<PathBuf>,
}

impl FfmpegCodec {
    /// Create a new ffmpeg codec
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);

        Self {
            config,
            command_builder,
            scratch_dir: None,
        }
    }

    /// Dump decoded frames as PNG under a per-run directory of `dir`
    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn probe_blocking(&self, source: &Path) -> Result<VideoInfo> {
        if !source.is_file() {
            return Err(ReframeError::SourceUnreadable(format!(
                "{} does not exist or is not a file",
                source.display()
            )));
        }

        let output = self.command_builder.probe(source).execute()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReframeError::SourceUnreadable(format!(
                "cannot open {}: {}",
                source.display(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(&stdout, self.config.fallback_fps).map_err(|e| match e {
            ReframeError::SourceUnreadable(msg) => {
                ReframeError::SourceUnreadable(format!("{}: {}", source.display(), msg))
            }
            ReframeError::Json(e) => ReframeError::SourceUnreadable(format!(
                "{}: unexpected probe output: {}",
                source.display(),
                e
            )),
            other => other,
        })
    }

    pub fn decode_blocking(&self, source: &Path) -> Result<FrameSequence> {
        let info = self.probe_blocking(source)?;
        info!(
            "Decoding {} ({}x{} @ {} fps)",
            source.display(),
            info.width,
            info.height,
            info.fps
        );

        let frame_bytes = info.width as usize * info.height as usize * CHANNELS;
        let mut scratch = self.scratch_run_dir();

        let mut process = self.command_builder.decode_frames(source).spawn_reader()?;
        let mut reader = BufReader::new(process.take_stdout()?);
        let mut frames = Vec::with_capacity(info.frame_count_hint.unwrap_or(0).min(MAX_PREALLOCATED_FRAMES) as usize);

        loop {
            let mut buffer = vec![0u8; frame_bytes];
            let filled = read_full(&mut reader, &mut buffer).map_err(|e| {
                ReframeError::SourceUnreadable(format!("read error in {}: {}", source.display(), e))
            })?;

            if filled == 0 {
                break;
            }
            if filled < frame_bytes {
                warn!(
                    "Discarding truncated trailing frame ({} of {} bytes) from {}",
                    filled,
                    frame_bytes,
                    source.display()
                );
                break;
            }

            let frame = Frame::from_raw(info.width, info.height, buffer)?;
            if let Some(dir) = scratch.as_deref() {
                let path = dir.join(format!("frame_{:05}.png", frames.len()));
                if let Err(e) = frame.as_image().save(&path) {
                    warn!("Could not write scratch frame {}: {}", path.display(), e);
                    scratch = None;
                }
            }
            frames.push(frame);
        }

        drop(reader);
        let exit = process.finish()?;
        if !exit.success() {
            return Err(ReframeError::SourceUnreadable(format!(
                "decoding {} failed: {}",
                source.display(),
                exit.stderr.trim()
            )));
        }

        if frames.is_empty() {
            warn!("No frames decoded from {}", source.display());
        } else {
            info!("Decoded {} frames from {}", frames.len(), source.display());
        }

        FrameSequence::new(frames, info.fps)
    }

    pub fn encode_blocking(&self, sequence: &FrameSequence, output: &Path, fps: f64) -> Result<EncodeSummary> {
        let first = sequence.first().ok_or_else(|| {
            ReframeError::EmptySequence(format!("nothing to encode into {}", output.display()))
        })?;
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ReframeError::InvalidParameter(format!(
                "frame rate must be positive, got {}",
                fps
            )));
        }
        sequence.check_dimensions()?;

        let (width, height) = first.dimensions();
        info!(
            "Encoding {} frames ({}x{} @ {} fps) to {}",
            sequence.len(),
            width,
            height,
            fps,
            output.display()
        );

        let parent = match output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        // Stage next to the destination; the staged file is removed on drop
        // unless it is persisted after a clean encode.
        let extension = output
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string());
        let staged = tempfile::Builder::new()
            .prefix(".reframe-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(&parent)?
            .into_temp_path();

        let command = self.command_builder.encode_frames(
            width,
            height,
            fps,
            &self.config.video_codec,
            output_pixel_format(width, height),
            &self.config.encode_options,
            &staged,
        );
        let mut process = command.spawn_writer()?;

        let written = {
            let mut writer = BufWriter::new(process.take_stdin()?);
            write_frames(&mut writer, sequence.frames())
        };
        let exit = process.finish()?;

        if !exit.success() {
            return Err(ReframeError::Media(format!(
                "Frame encoding into {} failed: {}",
                output.display(),
                exit.stderr.trim()
            )));
        }
        let frames_written = written.map_err(|e| {
            ReframeError::Media(format!("Failed to stream frames to encoder: {}", e))
        })?;

        staged
            .persist(output)
            .map_err(|e| ReframeError::Io(e.error))?;

        info!("Wrote {} frames to {}", frames_written, output.display());
        Ok(EncodeSummary {
            output_path: output.to_path_buf(),
            frames_written,
            width,
            height,
            fps,
        })
    }

    pub fn check_availability_blocking(&self) -> Result<()> {
        let output = self
            .command_builder
            .version_check()
            .execute()
            .map_err(|e| ReframeError::Media(format!("ffmpeg not found: {}", e)))?;

        if output.status.success() {
            info!("ffmpeg is available");
            Ok(())
        } else {
            Err(ReframeError::Media("ffmpeg version check failed".to_string()))
        }
    }

    fn scratch_run_dir(&self) -> Option<PathBuf> {
        let root = self.scratch_dir.as_ref()?;
        let dir = root.join(Uuid::new_v4().to_string());
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                debug!("Writing scratch frames to {}", dir.display());
                Some(dir)
            }
            Err(e) => {
                warn!("Scratch directory {} unavailable: {}", dir.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl FrameCodec for FfmpegCodec {
    async fn decode(&self, source: &Path) -> Result<FrameSequence> {
        let codec = self.clone();
        let source = source.to_path_buf();
        tokio::task::spawn_blocking(move || codec.decode_blocking(&source))
            .await
            .map_err(|e| ReframeError::Media(format!("Decode task failed: {}", e)))?
    }

    async fn encode(&self, sequence: FrameSequence, output: &Path, fps: f64) -> Result<EncodeSummary> {
        let codec = self.clone();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || codec.encode_blocking(&sequence, &output, fps))
            .await
            .map_err(|e| ReframeError::Media(format!("Encode task failed: {}", e)))?
    }

    async fn probe(&self, source: &Path) -> Result<VideoInfo> {
        let codec = self.clone();
        let source = source.to_path_buf();
        tokio::task::spawn_blocking(move || codec.probe_blocking(&source))
            .await
            .map_err(|e| ReframeError::Media(format!("Probe task failed: {}", e)))?
    }

    fn check_availability(&self) -> Result<()> {
        self.check_availability_blocking()
    }
}

/// 4:2:0 needs even dimensions; fall back to 4:4:4 so odd sizes survive the round trip.
fn output_pixel_format(width: u32, height: u32) -> &'static str {
    if width % 2 == 0 && height % 2 == 0 { "yuv420p" } else { "yuv444p" }
}

/// Fill `buffer` as far as the stream allows. Returns the number of bytes read;
/// anything short of `buffer.len()` means end of stream.
fn read_full<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn write_frames<W: Write>(writer: &mut W, frames: &[Frame]) -> std::io::Result<usize> {
    for frame in frames {
        writer.write_all(frame.as_raw())?;
    }
    writer.flush()?;
    Ok(frames.len())
}
