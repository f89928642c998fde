use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Output, Stdio};
use std::thread::JoinHandle;
use tracing::debug;

use crate::error::{Result, ReframeError};

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Only report errors on stderr
    pub fn quiet(self) -> Self {
        self.arg("-v").arg("error")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set pixel format
    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    /// Set container/stream format
    pub fn format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-f").arg(format)
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Run to completion and capture stdout/stderr
    pub fn execute(&self) -> Result<Output> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .map_err(|e| ReframeError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))
    }

    /// Spawn with stdout piped for reading raw frames
    pub fn spawn_reader(&self) -> Result<MediaProcess> {
        self.spawn(Stdio::null(), Stdio::piped())
    }

    /// Spawn with stdin piped for writing raw frames
    pub fn spawn_writer(&self) -> Result<MediaProcess> {
        self.spawn(Stdio::piped(), Stdio::null())
    }

    fn spawn(&self, stdin: Stdio, stdout: Stdio) -> Result<MediaProcess> {
        debug!("Spawning media processing command: {} {:?}", self.binary_path, self.args);

        let mut child = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReframeError::Media(format!("Failed to spawn {}: {}", self.binary_path, e)))?;

        // Drain stderr on its own thread so a chatty child never blocks on a full pipe.
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        Ok(MediaProcess {
            child: Some(child),
            stderr,
            description: self.description.clone(),
        })
    }
}

/// A running media child process. Dropping it without `finish` kills and
/// reaps the child, so early returns never leak the process or its pipes.
pub struct MediaProcess {
    child: Option<Child>,
    stderr: Option<JoinHandle<String>>,
    description: String,
}

/// Exit status plus whatever the child wrote to stderr
pub struct MediaExit {
    pub status: ExitStatus,
    pub stderr: String,
}

impl MediaExit {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

impl MediaProcess {
    pub fn take_stdout(&mut self) -> Result<ChildStdout> {
        self.child
            .as_mut()
            .and_then(|child| child.stdout.take())
            .ok_or_else(|| ReframeError::Media(format!("{}: stdout is not piped", self.description)))
    }

    pub fn take_stdin(&mut self) -> Result<ChildStdin> {
        self.child
            .as_mut()
            .and_then(|child| child.stdin.take())
            .ok_or_else(|| ReframeError::Media(format!("{}: stdin is not piped", self.description)))
    }

    /// Wait for the child to exit and collect its stderr
    pub fn finish(mut self) -> Result<MediaExit> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ReframeError::Media(format!("{}: process already finished", self.description)))?;

        // Close our end of stdin so the child sees EOF.
        drop(child.stdin.take());

        let status = child
            .wait()
            .map_err(|e| ReframeError::Media(format!("{}: failed to wait: {}", self.description, e)))?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        debug!("{} exited with {}", self.description, status);
        Ok(MediaExit { status, stderr })
    }
}

impl Drop for MediaProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            debug!("Killing unfinished process: {}", self.description);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Builder for the ffmpeg/ffprobe invocations the codec needs
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build stream probe command (JSON on stdout)
    pub fn probe<P: AsRef<Path>>(&self, source: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Stream probe")
            .quiet()
            .args(["-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames"])
            .args(["-of", "json"])
            .output(source)
    }

    /// Build command that decodes the first video stream to packed rgb24 on stdout
    pub fn decode_frames<P: AsRef<Path>>(&self, source: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Frame decoding")
            .quiet()
            .arg("-noautorotate")
            .input(source)
            .args(["-map", "0:v:0"])
            .args(["-vsync", "passthrough"])
            .no_audio()
            .format("rawvideo")
            .pixel_format("rgb24")
            .arg("pipe:1")
    }

    /// Build command that encodes packed rgb24 frames read from stdin
    #[allow(clippy::too_many_arguments)]
    pub fn encode_frames<P: AsRef<Path>>(
        &self,
        width: u32,
        height: u32,
        fps: f64,
        video_codec: &str,
        output_pixel_format: &str,
        additional_options: &[String],
        output: P,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.ffmpeg_path, "Frame encoding")
            .overwrite()
            .quiet()
            .format("rawvideo")
            .pixel_format("rgb24")
            .arg("-s")
            .arg(format!("{}x{}", width, height))
            .arg("-r")
            .arg(fps.to_string())
            .arg("-i")
            .arg("pipe:0")
            .no_audio()
            .video_codec(video_codec)
            .pixel_format(output_pixel_format);

        // Add user-specified additional options
        for option in additional_options {
            cmd = cmd.arg(option);
        }

        cmd.output(output)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Version check").arg("-version")
    }
}
