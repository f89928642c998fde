use image::RgbImage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{ErrorKind, Result, ReframeError};
use crate::filter::{DeepfakeReport, FilterSet, apply_filter};
use crate::frame::{Frame, FrameSequence};
use crate::media::{EncodeSummary, FrameCodec, FrameCodecFactory, VideoInfo};
use crate::request::TransformRequest;
use crate::temporal::{interpolate_sequence, remap_speed};

const VIDEO_EXTENSIONS: [&str; 8] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v"];
const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "webp", "tif", "tiff"];

/// Stage of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Decoding,
    Transforming,
    Encoding,
    Done,
    Failed,
}

impl PipelineState {
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, Decoding) | (Decoding, Transforming) | (Transforming, Encoding) => true,
            // Scoring has no encode stage.
            (Transforming, Done) | (Encoding, Done) => true,
            (Done | Failed, Failed) => false,
            (_, Failed) => true,
            _ => false,
        }
    }
}

/// Bookkeeping for one request: its id and every state it passed through
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub id: Uuid,
    state: PipelineState,
    history: Vec<PipelineState>,
    failure: Option<ErrorKind>,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
            failure: None,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal pipeline transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Run {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        self.history.push(next);
    }

    fn fail(&mut self, error: &ReframeError) {
        warn!("Run {} failed while {:?}: {}", self.id, self.state, error);
        self.failure = Some(error.kind());
        self.advance(PipelineState::Failed);
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn failure(&self) -> Option<ErrorKind> {
        self.failure
    }
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Video(EncodeSummary),
    Image { output_path: PathBuf },
    Score(DeepfakeReport),
}

/// Result of the transform stage, before encoding
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    Frames(FrameSequence),
    Score(DeepfakeReport),
}

/// Terminal, serializable record returned once per request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Ok {
        output_path: PathBuf,
        frames_written: usize,
    },
    Score {
        #[serde(flatten)]
        report: DeepfakeReport,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl PipelineResult {
    pub fn from_outcome(result: Result<PipelineOutcome>) -> Self {
        match result {
            Ok(PipelineOutcome::Video(summary)) => PipelineResult::Ok {
                output_path: summary.output_path,
                frames_written: summary.frames_written,
            },
            Ok(PipelineOutcome::Image { output_path }) => PipelineResult::Ok {
                output_path,
                frames_written: 1,
            },
            Ok(PipelineOutcome::Score(report)) => PipelineResult::Score { report },
            Err(e) => PipelineResult::Error {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, PipelineResult::Error { .. })
    }
}

/// Kind of media a path holds, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(MediaKind::Video)
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}

/// Collect media files under `dir`, sorted for a stable processing order
fn media_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| MediaKind::from_path(p).is_some())
        .collect();
    files.sort();
    files
}

/// Drives decode -> transform -> encode for one request at a time.
/// Holds no per-run state, so one instance can serve concurrent requests.
/// Frame work runs on the blocking pool, never on the async worker.
pub struct Pipeline {
    config: Config,
    codec: Box<dyn FrameCodec>,
    filters: Arc<FilterSet>,
}

impl Pipeline {
    pub fn new(config: Config, codec: Box<dyn FrameCodec>, filters: FilterSet) -> Self {
        Self {
            config,
            codec,
            filters: Arc::new(filters),
        }
    }

    /// Build the ffmpeg-backed pipeline with the built-in filters
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let codec = FrameCodecFactory::create_codec(&config);

        // Check dependencies
        codec.check_availability()?;

        let filters = FilterSet::from_config(&config.filters);
        Ok(Self::new(config, codec, filters))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process a video or still image, picked by extension
    pub async fn process(&self, source: &Path, request: &TransformRequest) -> Result<PipelineOutcome> {
        match MediaKind::from_path(source) {
            Some(MediaKind::Video) => self.run(source, request).await,
            Some(MediaKind::Image) => self.process_image(source, request).await,
            None => Err(ReframeError::UnsupportedFormat(source.display().to_string())),
        }
    }

    /// Run the video pipeline
    pub async fn run(&self, source: &Path, request: &TransformRequest) -> Result<PipelineOutcome> {
        let (_, result) = self.run_tracked(source, request).await;
        result
    }

    /// Run the video pipeline and also return the state trail
    pub async fn run_tracked(
        &self,
        source: &Path,
        request: &TransformRequest,
    ) -> (PipelineRun, Result<PipelineOutcome>) {
        let mut run = PipelineRun::new();
        info!("Run {}: {} on {}", run.id, request.kind(), source.display());

        let result = self.drive(&mut run, source, request).await;
        if let Err(e) = &result {
            run.fail(e);
        }
        (run, result)
    }

    async fn drive(
        &self,
        run: &mut PipelineRun,
        source: &Path,
        request: &TransformRequest,
    ) -> Result<PipelineOutcome> {
        // Parameters are checked before any work happens.
        request.validate()?;

        run.advance(PipelineState::Decoding);
        let sequence = self.codec.decode(source).await?;
        if sequence.is_empty() {
            warn!("Run {}: {} decoded to an empty sequence", run.id, source.display());
        }

        run.advance(PipelineState::Transforming);
        match self.transform(sequence, request).await? {
            Transformed::Score(report) => {
                info!(
                    "Run {}: probability {:.3}, {}/{} frames flagged",
                    run.id, report.probability, report.fake_frame_count, report.total_frames
                );
                run.advance(PipelineState::Done);
                Ok(PipelineOutcome::Score(report))
            }
            Transformed::Frames(sequence) => {
                run.advance(PipelineState::Encoding);
                let output_path = self.output_path(source, request)?;
                let fps = sequence.fps();
                let summary = self.codec.encode(sequence, &output_path, fps).await?;
                run.advance(PipelineState::Done);
                info!("Run {}: wrote {}", run.id, summary.output_path.display());
                Ok(PipelineOutcome::Video(summary))
            }
        }
    }

    /// Apply the requested transform to a decoded sequence
    pub async fn transform(&self, sequence: FrameSequence, request: &TransformRequest) -> Result<Transformed> {
        let filters = Arc::clone(&self.filters);
        let parallel = self.config.pipeline.parallel_filters;
        let request = request.clone();
        tokio::task::spawn_blocking(move || transform_sequence(&filters, parallel, sequence, &request))
            .await
            .map_err(|e| ReframeError::Media(format!("Transform task failed: {}", e)))?
    }

    /// Apply a per-frame transform to a still image
    pub async fn process_image(&self, source: &Path, request: &TransformRequest) -> Result<PipelineOutcome> {
        request.validate()?;
        if !request.kind().is_per_frame() {
            return Err(ReframeError::InvalidParameter(format!(
                "{} needs a video, {} is a still image",
                request.kind(),
                source.display()
            )));
        }

        let output_path = self.output_path(source, request)?;
        let filters = Arc::clone(&self.filters);
        let source = source.to_path_buf();
        let request = request.clone();
        tokio::task::spawn_blocking(move || transform_still(&filters, &source, &output_path, &request))
            .await
            .map_err(|e| ReframeError::Media(format!("Image task failed: {}", e)))?
    }

    /// Process every media file under `dir`; per-file failures are recorded,
    /// not fatal. `on_file` sees each result as it lands, with the file's
    /// position and the total.
    pub async fn process_directory<F>(
        &self,
        dir: &Path,
        request: &TransformRequest,
        mut on_file: F,
    ) -> Result<Vec<(PathBuf, PipelineResult)>>
    where
        F: FnMut(usize, usize, &Path, &PipelineResult),
    {
        if !dir.is_dir() {
            return Err(ReframeError::Config(format!("{} is not a directory", dir.display())));
        }

        let files = media_files(dir);
        let total = files.len();
        info!("Found {} media files in {}", total, dir.display());

        let mut results = Vec::with_capacity(total);
        for (index, path) in files.into_iter().enumerate() {
            let result = PipelineResult::from_outcome(self.process(&path, request).await);
            match &result {
                PipelineResult::Error { message, .. } => warn!("Failed to process {}: {}", path.display(), message),
                _ => info!("Successfully processed: {}", path.display()),
            }
            on_file(index + 1, total, &path, &result);
            results.push((path, result));
        }
        Ok(results)
    }

    pub async fn probe(&self, source: &Path) -> Result<VideoInfo> {
        self.codec.probe(source).await
    }

    fn output_path(&self, source: &Path, request: &TransformRequest) -> Result<PathBuf> {
        Ok(self.config.paths.output_dir.join(request.output_name(source)?))
    }
}

fn transform_sequence(
    filters: &FilterSet,
    parallel: bool,
    sequence: FrameSequence,
    request: &TransformRequest,
) -> Result<Transformed> {
    let frames = match request {
        TransformRequest::Interpolate { intermediate_frames } => interpolate_sequence(sequence, *intermediate_frames)?,
        TransformRequest::SpeedChange { factor } => remap_speed(sequence, *factor)?,
        TransformRequest::LowLight => apply_filter(sequence, filters.low_light.as_ref(), parallel),
        TransformRequest::SuperResolutionSim => apply_filter(sequence, filters.super_resolution.as_ref(), parallel),
        TransformRequest::DetailEnhanceSim => apply_filter(sequence, filters.detail_enhance.as_ref(), parallel),
        TransformRequest::DeepfakeScore => return Ok(Transformed::Score(filters.classifier.classify(&sequence))),
    };
    Ok(Transformed::Frames(frames))
}

fn transform_still(
    filters: &FilterSet,
    source: &Path,
    output_path: &Path,
    request: &TransformRequest,
) -> Result<PipelineOutcome> {
    let filter = match request {
        TransformRequest::LowLight => filters.low_light.as_ref(),
        TransformRequest::SuperResolutionSim => filters.super_resolution.as_ref(),
        TransformRequest::DetailEnhanceSim => filters.detail_enhance.as_ref(),
        other => {
            return Err(ReframeError::InvalidParameter(format!(
                "{} does not apply to still images",
                other.kind()
            )));
        }
    };

    info!("Applying {} to image {}", filter.name(), source.display());
    let image = image::open(source)
        .map_err(|e| ReframeError::SourceUnreadable(format!("{}: {}", source.display(), e)))?
        .to_rgb8();
    let output = filter.apply(&Frame::from_image(image));

    save_staged(output.as_image(), output_path)?;
    info!("Wrote {}", output_path.display());
    Ok(PipelineOutcome::Image {
        output_path: output_path.to_path_buf(),
    })
}

/// Write `image` next to `output_path` under a temporary name and rename it
/// into place once fully written. On error nothing is left behind.
fn save_staged(image: &RgbImage, output_path: &Path) -> Result<()> {
    let parent = match output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    // The suffix keeps the extension so the encoder is picked from it.
    let extension = output_path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let staged = tempfile::Builder::new()
        .prefix(".reframe-")
        .suffix(&format!(".{}", extension))
        .tempfile_in(&parent)?
        .into_temp_path();

    image.save(&staged)?;
    staged.persist(output_path).map_err(|e| ReframeError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockFrameCodec;

    fn gray(level: u8) -> Frame {
        Frame::solid(4, 4, [level, level, level])
    }

    fn clip(levels: &[u8]) -> FrameSequence {
        FrameSequence::new(levels.iter().map(|&v| gray(v)).collect(), 30.0).unwrap()
    }

    fn pipeline(codec: MockFrameCodec, root: &Path) -> Pipeline {
        let config = Config::default().with_root(root);
        let filters = FilterSet::from_config(&config.filters);
        Pipeline::new(config, Box::new(codec), filters)
    }

    fn expect_decode(codec: &mut MockFrameCodec, sequence: FrameSequence) {
        codec
            .expect_decode()
            .times(1)
            .returning(move |_| Ok(sequence.clone()));
    }

    fn summarize(sequence: FrameSequence, output: &Path, fps: f64) -> Result<EncodeSummary> {
        if sequence.is_empty() {
            return Err(ReframeError::EmptySequence("nothing to encode".to_string()));
        }
        Ok(EncodeSummary {
            output_path: output.to_path_buf(),
            frames_written: sequence.len(),
            width: sequence.width().unwrap_or(0),
            height: sequence.height().unwrap_or(0),
            fps,
        })
    }

    #[test]
    fn test_state_transitions() {
        use PipelineState::*;
        assert!(Idle.can_transition_to(Decoding));
        assert!(Idle.can_transition_to(Failed));
        assert!(Transforming.can_transition_to(Done));
        assert!(Encoding.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Encoding));
        assert!(!Decoding.can_transition_to(Done));
        assert!(!Done.can_transition_to(Failed));
    }

    #[tokio::test]
    async fn test_interpolation_black_to_white() {
        let dir = tempfile::tempdir().unwrap();
        let mut codec = MockFrameCodec::new();
        expect_decode(&mut codec, clip(&[0, 255]));
        codec
            .expect_encode()
            .withf(|sequence, output, fps| {
                let levels: Vec<u8> = sequence.frames().iter().map(|f| f.pixel(0, 0)[0]).collect();
                levels.len() == 3
                    && levels[0] == 0
                    && (127..=128).contains(&levels[1])
                    && levels[2] == 255
                    && *fps == 30.0
                    && output.ends_with("processed/interpolate_1_clip.mp4")
            })
            .times(1)
            .returning(summarize);

        let pipeline = pipeline(codec, dir.path());
        let request = TransformRequest::Interpolate { intermediate_frames: 1 };
        let (run, result) = pipeline.run_tracked(Path::new("uploads/clip.mp4"), &request).await;

        match result.unwrap() {
            PipelineOutcome::Video(summary) => {
                assert_eq!(summary.frames_written, 3);
                assert_eq!(summary.fps, 30.0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(
            run.history(),
            &[
                PipelineState::Idle,
                PipelineState::Decoding,
                PipelineState::Transforming,
                PipelineState::Encoding,
                PipelineState::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_speed_change_drops_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut codec = MockFrameCodec::new();
        expect_decode(&mut codec, clip(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]));
        codec
            .expect_encode()
            .withf(|sequence, output, _| {
                let levels: Vec<u8> = sequence.frames().iter().map(|f| f.pixel(0, 0)[0]).collect();
                levels == vec![0, 2, 4, 6, 8] && output.ends_with("speed_2_clip.mp4")
            })
            .times(1)
            .returning(summarize);

        let pipeline = pipeline(codec, dir.path());
        let outcome = pipeline
            .run(Path::new("clip.mp4"), &TransformRequest::SpeedChange { factor: 2.0 })
            .await
            .unwrap();
        assert!(matches!(outcome, PipelineOutcome::Video(EncodeSummary { frames_written: 5, .. })));
    }

    #[tokio::test]
    async fn test_deepfake_score_skips_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let mut codec = MockFrameCodec::new();
        expect_decode(&mut codec, clip(&[0, 255, 0, 255]));
        codec.expect_encode().never();

        let pipeline = pipeline(codec, dir.path());
        let (run, result) = pipeline
            .run_tracked(Path::new("clip.mp4"), &TransformRequest::DeepfakeScore)
            .await;

        match result.unwrap() {
            PipelineOutcome::Score(report) => {
                assert_eq!(report.total_frames, 4);
                assert!((0.0..=1.0).contains(&report.probability));
                assert_eq!(
                    report.fake_frame_count,
                    (report.total_frames as f64 * report.probability).floor() as usize
                );
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!run.history().contains(&PipelineState::Encoding));
        assert_eq!(run.state(), PipelineState::Done);
    }

    #[tokio::test]
    async fn test_invalid_speed_fails_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let mut codec = MockFrameCodec::new();
        codec.expect_decode().never();
        codec.expect_encode().never();

        let pipeline = pipeline(codec, dir.path());
        for factor in [0.0, -1.5] {
            let (run, result) = pipeline
                .run_tracked(Path::new("clip.mp4"), &TransformRequest::SpeedChange { factor })
                .await;
            assert!(matches!(result, Err(ReframeError::InvalidParameter(_))));
            assert_eq!(run.history(), &[PipelineState::Idle, PipelineState::Failed]);
            assert_eq!(run.failure(), Some(ErrorKind::InvalidParameter));
        }
    }

    #[tokio::test]
    async fn test_unreadable_source_fails_in_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let mut codec = MockFrameCodec::new();
        codec
            .expect_decode()
            .returning(|source| Err(ReframeError::SourceUnreadable(source.display().to_string())));
        codec.expect_encode().never();

        let pipeline = pipeline(codec, dir.path());
        let (run, result) = pipeline
            .run_tracked(Path::new("broken.mp4"), &TransformRequest::LowLight)
            .await;
        assert!(matches!(result, Err(ReframeError::SourceUnreadable(_))));
        assert_eq!(
            run.history(),
            &[PipelineState::Idle, PipelineState::Decoding, PipelineState::Failed]
        );
    }

    #[tokio::test]
    async fn test_empty_clip_surfaces_empty_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut codec = MockFrameCodec::new();
        expect_decode(&mut codec, clip(&[]));
        codec.expect_encode().times(1).returning(summarize);

        let pipeline = pipeline(codec, dir.path());
        let (run, result) = pipeline
            .run_tracked(Path::new("empty.mp4"), &TransformRequest::DetailEnhanceSim)
            .await;
        assert!(matches!(result, Err(ReframeError::EmptySequence(_))));
        assert_eq!(run.failure(), Some(ErrorKind::EmptySequence));
        assert_eq!(
            run.history(),
            &[
                PipelineState::Idle,
                PipelineState::Decoding,
                PipelineState::Transforming,
                PipelineState::Encoding,
                PipelineState::Failed
            ]
        );
    }

    #[tokio::test]
    async fn test_per_frame_filters_keep_count_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(MockFrameCodec::new(), dir.path());
        for request in [
            TransformRequest::LowLight,
            TransformRequest::SuperResolutionSim,
            TransformRequest::DetailEnhanceSim,
        ] {
            match pipeline.transform(clip(&[5, 10, 15]), &request).await.unwrap() {
                Transformed::Frames(sequence) => {
                    assert_eq!(sequence.len(), 3);
                    assert_eq!(sequence.fps(), 30.0);
                    sequence.check_dimensions().unwrap();
                    assert_eq!(sequence.width(), Some(4));
                }
                Transformed::Score(_) => panic!("per-frame filter produced a score"),
            }
        }
    }

    #[tokio::test]
    async fn test_process_image_low_light() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        image::RgbImage::from_pixel(6, 4, image::Rgb([12, 10, 8])).save(&source).unwrap();

        let pipeline = pipeline(MockFrameCodec::new(), dir.path());
        let outcome = pipeline.process(&source, &TransformRequest::LowLight).await.unwrap();

        let expected = dir.path().join("processed").join("low_light_photo.png");
        assert_eq!(outcome, PipelineOutcome::Image { output_path: expected.clone() });
        let written = image::open(&expected).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (6, 4));
        assert!(written.get_pixel(0, 0).0[0] > 12);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("processed"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".reframe-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_image_save_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));

        // No encoder exists for this extension.
        let output = dir.path().join("out.unknownext");
        assert!(save_staged(&image, &output).is_err());
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        // An earlier result survives a failed overwrite.
        std::fs::write(&output, b"previous").unwrap();
        assert!(save_staged(&image, &output).is_err());
        assert_eq!(std::fs::read(&output).unwrap(), b"previous");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_image_save_replaces_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.png");
        std::fs::write(&output, b"stale").unwrap();

        save_staged(&RgbImage::from_pixel(3, 2, image::Rgb([9, 9, 9])), &output).unwrap();
        assert_eq!(image::open(&output).unwrap().to_rgb8().dimensions(), (3, 2));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_process_image_rejects_temporal_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        image::RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0])).save(&source).unwrap();

        let pipeline = pipeline(MockFrameCodec::new(), dir.path());
        let result = pipeline
            .process(&source, &TransformRequest::Interpolate { intermediate_frames: 2 })
            .await;
        assert!(matches!(result, Err(ReframeError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_process_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(MockFrameCodec::new(), dir.path());
        let result = pipeline.process(Path::new("notes.txt"), &TransformRequest::LowLight).await;
        assert!(matches!(result, Err(ReframeError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_process_directory_records_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        image::RgbImage::from_pixel(4, 4, image::Rgb([30, 30, 30]))
            .save(uploads.join("a.png"))
            .unwrap();
        std::fs::write(uploads.join("b.jpg"), b"not really a jpeg").unwrap();
        std::fs::write(uploads.join("readme.txt"), b"ignored").unwrap();

        let pipeline = pipeline(MockFrameCodec::new(), dir.path());
        let mut seen = Vec::new();
        let results = pipeline
            .process_directory(&uploads, &TransformRequest::DetailEnhanceSim, |index, total, path, result| {
                seen.push((index, total, path.to_path_buf(), result.is_ok()));
            })
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (1, 2, uploads.join("a.png"), true),
                (2, 2, uploads.join("b.jpg"), false),
            ]
        );
        assert_eq!(results.len(), 2);
        assert!(results[0].0.ends_with("a.png"));
        assert!(results[0].1.is_ok());
        assert!(matches!(
            results[1].1,
            PipelineResult::Error { kind: ErrorKind::SourceUnreadable, .. }
        ));
    }

    #[tokio::test]
    async fn test_process_directory_rejects_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(MockFrameCodec::new(), dir.path());
        let mut calls = 0;
        let result = pipeline
            .process_directory(&dir.path().join("nope"), &TransformRequest::LowLight, |_, _, _, _| calls += 1)
            .await;
        assert!(matches!(result, Err(ReframeError::Config(_))));
        assert_eq!(calls, 0);
    }

    /// Remembers which threads ran it
    struct ThreadRecorder(Arc<std::sync::Mutex<Vec<std::thread::ThreadId>>>);

    impl crate::filter::FrameFilter for ThreadRecorder {
        fn name(&self) -> &str {
            "thread_recorder"
        }

        fn apply(&self, frame: &Frame) -> Frame {
            self.0.lock().unwrap().push(std::thread::current().id());
            frame.clone()
        }
    }

    #[tokio::test]
    async fn test_transform_runs_off_the_async_worker() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default().with_root(dir.path());
        config.pipeline.parallel_filters = false;

        let threads = Arc::new(std::sync::Mutex::new(Vec::new()));
        let filters =
            FilterSet::from_config(&config.filters).with_low_light(Box::new(ThreadRecorder(Arc::clone(&threads))));
        let pipeline = Pipeline::new(config, Box::new(MockFrameCodec::new()), filters);

        let transformed = pipeline
            .transform(clip(&[1, 2]), &TransformRequest::LowLight)
            .await
            .unwrap();
        assert!(matches!(transformed, Transformed::Frames(ref sequence) if sequence.len() == 2));

        let worker = std::thread::current().id();
        let threads = threads.lock().unwrap();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id != worker));
    }

    #[test]
    fn test_result_json_shapes() {
        let error = PipelineResult::from_outcome(Err(ReframeError::InvalidParameter("bad".to_string())));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "invalid_parameter");

        let score = PipelineResult::from_outcome(Ok(PipelineOutcome::Score(DeepfakeReport::new(10, 0.25, 0.5))));
        let json = serde_json::to_value(&score).unwrap();
        assert_eq!(json["status"], "score");
        assert_eq!(json["fake_frame_count"], 2);
        assert_eq!(json["is_fake"], false);
    }

    #[test]
    fn test_media_kind_by_extension() {
        assert_eq!(MediaKind::from_path(Path::new("a/b.MP4")), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path(Path::new("b.jpeg")), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path(Path::new("b")), None);
    }
}
