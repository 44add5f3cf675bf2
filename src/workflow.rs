use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::artifacts::{ArtifactKind, ArtifactRegistry};
use crate::config::Config;
use crate::error::Result;
use crate::media::{MixLevels, TranscoderFactory};
use crate::naming::{artifact_path_in, file_stem, sanitize, sanitize_filename};
use crate::operations::{
    require_input, run_transform, Clip, ImageToVideo, Loop, MixAudio, Mute, NoProgress,
    OperationKind, OperationOutcome, OperationResult, ProgressObserver, ReplaceAudio, Toolbox,
    Transform, VocalSeparation,
};
use crate::separator::SeparatorFactory;
use crate::setup::Capabilities;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipRequest {
    /// Offset, as a duration (`30s`) or clock time (`00:00:30`)
    pub start: String,
    /// Length; `None` clips to the end
    pub duration: Option<String>,
}

/// Which transforms to apply to a run's source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationRequest {
    pub remove_vocals: bool,
    pub mute: bool,
    /// Loop target such as `1m`
    pub loop_to: Option<String>,
    pub clip: Option<ClipRequest>,
}

impl OperationRequest {
    pub fn is_empty(&self) -> bool {
        !self.remove_vocals && !self.mute && self.loop_to.is_none() && self.clip.is_none()
    }

    /// Enabled transforms, in execution order. Each reads the source itself,
    /// never another transform's output.
    fn transforms(&self, source: &Path) -> Vec<Box<dyn Transform>> {
        let mut transforms: Vec<Box<dyn Transform>> = Vec::new();

        if self.remove_vocals {
            transforms.push(Box::new(VocalSeparation::new(source)));
        }
        if self.mute {
            transforms.push(Box::new(Mute::new(source)));
        }
        if let Some(target) = &self.loop_to {
            transforms.push(Box::new(Loop::new(source, target.as_str())));
        }
        if let Some(clip) = &self.clip {
            transforms.push(Box::new(Clip::new(
                source,
                clip.start.as_str(),
                clip.duration.clone(),
            )));
        }

        transforms
    }
}

/// Two-input operations; exactly one runs per tool-mode invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    ReplaceAudio { video: PathBuf, audio: PathBuf },
    MixAudio { video: PathBuf, audio: PathBuf, levels: MixLevels },
    ImageToVideo { image: PathBuf, audio: PathBuf },
}

impl ToolRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            ToolRequest::ReplaceAudio { .. } => OperationKind::ReplaceAudio,
            ToolRequest::MixAudio { .. } => OperationKind::MixAudio,
            ToolRequest::ImageToVideo { .. } => OperationKind::ImageToVideo,
        }
    }

    fn inputs(&self) -> (&Path, &Path) {
        match self {
            ToolRequest::ReplaceAudio { video, audio } => (video.as_path(), audio.as_path()),
            ToolRequest::MixAudio { video, audio, .. } => (video.as_path(), audio.as_path()),
            ToolRequest::ImageToVideo { image, audio } => (image.as_path(), audio.as_path()),
        }
    }

    fn output_kind(&self) -> ArtifactKind {
        match self {
            ToolRequest::ReplaceAudio { .. } => ArtifactKind::AudioReplacedVideo,
            ToolRequest::MixAudio { .. } => ArtifactKind::AudioMixedVideo,
            ToolRequest::ImageToVideo { .. } => ArtifactKind::ImageVideo,
        }
    }
}

/// Everything one run produced, including failures
#[derive(Debug)]
pub struct RunReport {
    pub registry: ArtifactRegistry,
    pub outcomes: Vec<OperationOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

pub struct Pipeline {
    tools: Toolbox,
    progress: Arc<dyn ProgressObserver>,
}

impl Pipeline {
    pub fn new(tools: Toolbox) -> Self {
        Self {
            tools,
            progress: Arc::new(NoProgress),
        }
    }

    /// Build a pipeline backed by ffmpeg and demucs
    pub fn from_config(config: &Config, capabilities: Capabilities) -> Self {
        let transcoder = TranscoderFactory::create_transcoder(config.media.clone());
        let separator = SeparatorFactory::create_separator(config.separator.clone());
        Self::new(Toolbox::new(
            Arc::from(transcoder),
            Arc::from(separator),
            capabilities,
        ))
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.tools.capabilities
    }

    /// Apply every requested transform to `source`, one after another.
    ///
    /// A failing transform is recorded and the rest still run; assets that
    /// were produced are never discarded.
    pub async fn run(&self, source: &Path, request: &OperationRequest) -> RunReport {
        let started_at = Utc::now();
        info!("Processing {}", source.display());

        let mut registry = ArtifactRegistry::with_original(source);
        let mut outcomes = Vec::new();

        for transform in request.transforms(source) {
            let outcome = run_transform(transform.as_ref(), &self.tools, self.progress.as_ref()).await;
            for asset in outcome.assets() {
                registry.insert(asset.clone());
            }
            outcomes.push(outcome);
        }

        let report = RunReport {
            registry,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "Run finished: {} artifacts, {} failed operations",
            report.registry.len(),
            report.failures().count()
        );
        report
    }

    /// Run one two-input operation on copies staged in `work_dir`.
    ///
    /// The output is named after the caller's original file and kept; the
    /// staged copies are removed once the operation has finished.
    pub async fn run_tool(&self, request: &ToolRequest, work_dir: &Path) -> RunReport {
        let started_at = Utc::now();
        let mut staged = Vec::new();

        let outcome = match self.stage(request, work_dir, &mut staged).await {
            Ok(transform) => {
                run_transform(transform.as_ref(), &self.tools, self.progress.as_ref()).await
            }
            Err(e) => {
                warn!("{} could not start: {}", request.kind(), e);
                OperationOutcome {
                    operation: request.kind(),
                    result: OperationResult::Failed(e),
                    elapsed: Duration::ZERO,
                }
            }
        };

        for path in staged {
            if let Err(e) = fs::remove_file(&path).await {
                warn!("Failed to remove staged copy {}: {}", path.display(), e);
            }
        }

        let mut registry = ArtifactRegistry::new();
        for asset in outcome.assets() {
            registry.insert(asset.clone());
        }

        RunReport {
            registry,
            outcomes: vec![outcome],
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn stage(
        &self,
        request: &ToolRequest,
        work_dir: &Path,
        staged: &mut Vec<PathBuf>,
    ) -> Result<Box<dyn Transform>> {
        let (first, second) = request.inputs();
        require_input(first)?;
        require_input(second)?;
        fs::create_dir_all(work_dir).await?;

        let first_copy = stage_copy(first, work_dir).await?;
        staged.push(first_copy.clone());
        let second_copy = stage_copy(second, work_dir).await?;
        staged.push(second_copy.clone());

        let output = artifact_path_in(work_dir, &sanitize(&file_stem(first)), request.output_kind());

        let transform: Box<dyn Transform> = match request {
            ToolRequest::ReplaceAudio { .. } => {
                Box::new(ReplaceAudio::with_output(first_copy, second_copy, output))
            }
            ToolRequest::MixAudio { levels, .. } => {
                Box::new(MixAudio::with_output(first_copy, second_copy, *levels, output))
            }
            ToolRequest::ImageToVideo { .. } => {
                Box::new(ImageToVideo::with_output(first_copy, second_copy, output))
            }
        };
        Ok(transform)
    }
}

async fn stage_copy(input: &Path, work_dir: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let staged = work_dir.join(format!("staged_{}_{}", Uuid::new_v4().simple(), sanitize_filename(&name)));
    fs::copy(input, &staged).await?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::YtdlrError;
    use crate::operations::testing::*;

    struct Fixture {
        dir: tempfile::TempDir,
        source: PathBuf,
        transcoder: Arc<FakeTranscoder>,
    }

    fn fixture(separator_fails: bool, capabilities: Capabilities) -> (Fixture, Pipeline) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.mp4");
        touch(&source);

        let transcoder = Arc::new(FakeTranscoder::new(10.0));
        let mut separator = FakeSeparator::new(&dir.path().join("separated/htdemucs/song"));
        separator.with_vocals = false;
        separator.fail = separator_fails;

        let pipeline = Pipeline::new(toolbox(transcoder.clone(), Arc::new(separator), capabilities));
        (
            Fixture {
                dir,
                source,
                transcoder,
            },
            pipeline,
        )
    }

    #[tokio::test]
    async fn test_remove_vocals_with_transcoder() {
        let (fx, pipeline) = fixture(false, Capabilities::all());
        let request = OperationRequest {
            remove_vocals: true,
            ..Default::default()
        };

        let report = pipeline.run(&fx.source, &request).await;

        assert_eq!(
            report.registry.kinds(),
            vec![
                ArtifactKind::Original,
                ArtifactKind::InstrumentalVideo,
                ArtifactKind::InstrumentalAudio
            ]
        );
        assert!(report.all_succeeded());
    }

    #[tokio::test]
    async fn test_remove_vocals_without_transcoder() {
        let capabilities = Capabilities {
            transcoder: false,
            ..Capabilities::all()
        };
        let (fx, pipeline) = fixture(false, capabilities);
        let request = OperationRequest {
            remove_vocals: true,
            ..Default::default()
        };

        let report = pipeline.run(&fx.source, &request).await;

        assert_eq!(
            report.registry.kinds(),
            vec![ArtifactKind::Original, ArtifactKind::InstrumentalAudio]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_operations() {
        let (fx, pipeline) = fixture(true, Capabilities::all());
        let request = OperationRequest {
            remove_vocals: true,
            mute: true,
            loop_to: Some("5s".to_string()),
            clip: Some(ClipRequest {
                start: "2s".to_string(),
                duration: None,
            }),
        };

        let report = pipeline.run(&fx.source, &request).await;

        let order: Vec<_> = report.outcomes.iter().map(|o| o.operation).collect();
        assert_eq!(
            order,
            vec![
                OperationKind::VocalSeparation,
                OperationKind::Mute,
                OperationKind::Loop,
                OperationKind::Clip
            ]
        );
        assert!(matches!(
            report.outcomes[0].error(),
            Some(YtdlrError::SeparationFailed(_))
        ));
        assert_eq!(report.failures().count(), 1);
        assert!(report.registry.contains(ArtifactKind::Original));
        assert!(report.registry.contains(ArtifactKind::MutedVideo));
        assert!(report.registry.contains(ArtifactKind::ClippedVideo));
        // 10s source is already longer than 5s
        assert_eq!(report.registry.path(ArtifactKind::LoopedVideo), Some(fx.source.as_path()));
        assert_eq!(
            fx.transcoder.calls(),
            vec!["strip_audio", "probe_duration", "trim"]
        );
    }

    #[tokio::test]
    async fn test_all_failures_leave_only_original() {
        let (fx, pipeline) = fixture(true, Capabilities::all());
        let request = OperationRequest {
            remove_vocals: true,
            loop_to: Some("forever".to_string()),
            ..Default::default()
        };

        let report = pipeline.run(&fx.source, &request).await;

        assert_eq!(report.registry.kinds(), vec![ArtifactKind::Original]);
        assert_eq!(report.failures().count(), 2);
        assert!(matches!(
            report.outcomes[1].error(),
            Some(YtdlrError::InvalidDuration(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_request_only_registers_original() {
        let (fx, pipeline) = fixture(false, Capabilities::all());
        let request = OperationRequest::default();
        assert!(request.is_empty());

        let report = pipeline.run(&fx.source, &request).await;
        assert_eq!(report.registry.len(), 1);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_tool_mode_removes_staged_copies_and_keeps_output() {
        let (fx, pipeline) = fixture(false, Capabilities::all());
        let audio = fx.dir.path().join("new track!.mp3");
        touch(&audio);
        let work_dir = fx.dir.path().join("work");

        let request = ToolRequest::ReplaceAudio {
            video: fx.source.clone(),
            audio: audio.clone(),
        };
        let report = pipeline.run_tool(&request, &work_dir).await;

        let output = work_dir.join("song_replaced_audio.mp4");
        assert!(report.all_succeeded());
        assert_eq!(report.registry.kinds(), vec![ArtifactKind::AudioReplacedVideo]);
        assert_eq!(report.registry.path(ArtifactKind::AudioReplacedVideo), Some(output.as_path()));
        assert!(output.is_file());

        let leftovers: Vec<_> = std::fs::read_dir(&work_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with("staged_"))
            .collect();
        assert!(leftovers.is_empty(), "staged copies left behind: {:?}", leftovers);
        // Caller's files are untouched
        assert!(fx.source.is_file());
        assert!(audio.is_file());
    }

    #[tokio::test]
    async fn test_tool_mode_missing_input() {
        let (fx, pipeline) = fixture(false, Capabilities::all());
        let request = ToolRequest::ImageToVideo {
            image: fx.dir.path().join("cover.png"),
            audio: fx.source.clone(),
        };

        let report = pipeline.run_tool(&request, &fx.dir.path().join("work")).await;

        assert!(report.registry.is_empty());
        assert!(matches!(
            report.outcomes[0].error(),
            Some(YtdlrError::MissingInput(_))
        ));
        assert!(fx.transcoder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tool_mode_failure_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        let audio = dir.path().join("track.mp3");
        touch(&video);
        touch(&audio);
        let work_dir = dir.path().join("work");
        let pipeline = Pipeline::new(transcoder_only(Arc::new(FakeTranscoder::failing())));

        let request = ToolRequest::MixAudio {
            video,
            audio,
            levels: MixLevels::default(),
        };
        let report = pipeline.run_tool(&request, &work_dir).await;

        assert!(!report.all_succeeded());
        assert_eq!(std::fs::read_dir(&work_dir).unwrap().count(), 0);
    }
}
