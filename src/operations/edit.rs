use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::artifacts::{ArtifactKind, MediaAsset};
use crate::duration::{parse_duration, parse_timestamp};
use crate::error::{Result, YtdlrError};
use crate::naming::artifact_path;
use super::{clear_stale_output, ensure_output, require_input, OperationKind, Toolbox, Transform};

/// Drop every audio track, copying the rest
pub struct Mute {
    input: PathBuf,
}

impl Mute {
    pub fn new<P: AsRef<Path>>(input: P) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Transform for Mute {
    fn kind(&self) -> OperationKind {
        OperationKind::Mute
    }

    fn validate(&self, tools: &Toolbox) -> Result<()> {
        tools.capabilities.require_transcoder()?;
        require_input(&self.input)
    }

    async fn execute(&self, tools: &Toolbox) -> Result<Vec<MediaAsset>> {
        let output = artifact_path(&self.input, ArtifactKind::MutedVideo);
        clear_stale_output(&output).await?;

        tools.transcoder.strip_audio(&self.input, &output).await?;
        ensure_output(&output)?;

        Ok(vec![MediaAsset::new(output, ArtifactKind::MutedVideo)])
    }
}

/// Repeat the input until it reaches a target length
pub struct Loop {
    input: PathBuf,
    target: String,
}

impl Loop {
    pub fn new<P: AsRef<Path>, S: Into<String>>(input: P, target: S) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            target: target.into(),
        }
    }

    fn target_seconds(&self) -> Result<f64> {
        let seconds = parse_duration(&self.target)?;
        if seconds <= 0.0 {
            return Err(YtdlrError::InvalidDuration(format!(
                "loop target must be positive, got '{}'",
                self.target
            )));
        }
        Ok(seconds)
    }
}

#[async_trait]
impl Transform for Loop {
    fn kind(&self) -> OperationKind {
        OperationKind::Loop
    }

    fn validate(&self, tools: &Toolbox) -> Result<()> {
        self.target_seconds()?;
        tools.capabilities.require_transcoder()?;
        tools.capabilities.require_prober()?;
        require_input(&self.input)
    }

    async fn execute(&self, tools: &Toolbox) -> Result<Vec<MediaAsset>> {
        let target = self.target_seconds()?;
        let current = tools
            .transcoder
            .probe_duration(&self.input)
            .await
            .map_err(|e| match e {
                YtdlrError::ProbeFailed(_) => e,
                other => YtdlrError::ProbeFailed(other.to_string()),
            })?;

        if current >= target {
            info!(
                "{} is already {:.3}s (target {:.3}s); leaving it unchanged",
                self.input.display(),
                current,
                target
            );
            return Ok(vec![MediaAsset::new(&self.input, ArtifactKind::LoopedVideo)]);
        }

        let output = artifact_path(&self.input, ArtifactKind::LoopedVideo);
        clear_stale_output(&output).await?;

        tools.transcoder.loop_to(&self.input, &output, target).await?;
        ensure_output(&output)?;

        Ok(vec![MediaAsset::new(output, ArtifactKind::LoopedVideo)])
    }
}

/// Frame-accurate time-range cut
pub struct Clip {
    input: PathBuf,
    start: String,
    duration: Option<String>,
}

impl Clip {
    pub fn new<P: AsRef<Path>, S: Into<String>>(input: P, start: S, duration: Option<String>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            start: start.into(),
            duration,
        }
    }

    fn range(&self) -> Result<(f64, Option<f64>)> {
        let start = parse_timestamp(&self.start)?;
        if start < 0.0 {
            return Err(YtdlrError::InvalidDuration(format!(
                "clip start cannot be negative, got '{}'",
                self.start
            )));
        }

        let duration = match &self.duration {
            None => None,
            Some(text) => {
                let seconds = parse_duration(text)?;
                if seconds <= 0.0 {
                    return Err(YtdlrError::InvalidDuration(format!(
                        "clip duration must be positive, got '{}'",
                        text
                    )));
                }
                Some(seconds)
            }
        };

        Ok((start, duration))
    }
}

#[async_trait]
impl Transform for Clip {
    fn kind(&self) -> OperationKind {
        OperationKind::Clip
    }

    fn validate(&self, tools: &Toolbox) -> Result<()> {
        self.range()?;
        tools.capabilities.require_transcoder()?;
        require_input(&self.input)
    }

    async fn execute(&self, tools: &Toolbox) -> Result<Vec<MediaAsset>> {
        let (start, duration) = self.range()?;
        let output = artifact_path(&self.input, ArtifactKind::ClippedVideo);
        clear_stale_output(&output).await?;

        tools
            .transcoder
            .trim(&self.input, &output, start, duration)
            .await?;
        ensure_output(&output)?;

        Ok(vec![MediaAsset::new(output, ArtifactKind::ClippedVideo)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockTranscoder;
    use crate::operations::testing::*;
    use crate::operations::{run_transform, NoProgress};
    use crate::setup::Capabilities;
    use mockall::predicate::*;
    use std::sync::Arc;

    fn source(dir: &Path) -> PathBuf {
        let input = dir.join("song.mp4");
        touch(&input);
        input
    }

    #[tokio::test]
    async fn test_mute_is_idempotent_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());
        let transcoder = Arc::new(FakeTranscoder::new(10.0));
        let tools = transcoder_only(transcoder.clone());

        let first = Mute::new(&input).execute(&tools).await.unwrap();
        let second = Mute::new(&input).execute(&tools).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].path, dir.path().join("song_muted.mp4"));
        assert_eq!(transcoder.calls(), vec!["strip_audio", "strip_audio"]);
    }

    #[tokio::test]
    async fn test_mute_without_output_is_transcode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());
        let tools = transcoder_only(Arc::new(FakeTranscoder::silent()));

        let result = Mute::new(&input).execute(&tools).await;
        assert!(matches!(result, Err(YtdlrError::TranscodeFailed(_))));
    }

    #[tokio::test]
    async fn test_mute_clears_stale_output_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());
        touch(&dir.path().join("song_muted.mp4"));
        let tools = transcoder_only(Arc::new(FakeTranscoder::silent()));

        assert!(Mute::new(&input).execute(&tools).await.is_err());
        assert!(!dir.path().join("song_muted.mp4").exists());
    }

    #[tokio::test]
    async fn test_mute_requires_transcoder() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());
        let mut tools = transcoder_only(Arc::new(FakeTranscoder::new(10.0)));
        tools.capabilities = Capabilities {
            transcoder: false,
            ..Capabilities::all()
        };

        let outcome = run_transform(&Mute::new(&input), &tools, &NoProgress).await;
        assert!(matches!(outcome.error(), Some(YtdlrError::MissingDependency(_))));
    }

    #[tokio::test]
    async fn test_loop_shorter_target_returns_input_without_transcoding() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());

        let mut mock = MockTranscoder::new();
        mock.expect_probe_duration().times(1).returning(|_| Ok(10.0));
        mock.expect_loop_to().never();
        let tools = transcoder_only(Arc::new(mock));

        let assets = Loop::new(&input, "5s").execute(&tools).await.unwrap();
        assert_eq!(assets, vec![MediaAsset::new(&input, ArtifactKind::LoopedVideo)]);
    }

    #[tokio::test]
    async fn test_loop_longer_target_loops_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());
        let expected_output = dir.path().join("song_looped.mp4");

        let mut mock = MockTranscoder::new();
        mock.expect_probe_duration().returning(|_| Ok(10.0));
        mock.expect_loop_to()
            .with(always(), eq(expected_output.clone()), eq(60.0))
            .times(1)
            .returning(|_, output, _| {
                std::fs::write(output, b"looped")?;
                Ok(())
            });
        let tools = transcoder_only(Arc::new(mock));

        let assets = Loop::new(&input, "1m").execute(&tools).await.unwrap();
        assert_eq!(assets[0].path, expected_output);
        assert_eq!(assets[0].kind, ArtifactKind::LoopedVideo);
    }

    #[tokio::test]
    async fn test_loop_rejects_bad_targets_before_probing() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());
        let transcoder = Arc::new(FakeTranscoder::new(10.0));
        let tools = transcoder_only(transcoder.clone());

        for target in ["abc", "0", "-5s", "1e308h"] {
            let outcome = run_transform(&Loop::new(&input, target), &tools, &NoProgress).await;
            assert!(
                matches!(outcome.error(), Some(YtdlrError::InvalidDuration(_))),
                "target {:?}",
                target
            );
        }
        assert!(transcoder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_loop_probe_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());

        let mut mock = MockTranscoder::new();
        mock.expect_probe_duration()
            .returning(|_| Err(YtdlrError::TranscodeFailed("ffprobe crashed".to_string())));
        let tools = transcoder_only(Arc::new(mock));

        let result = Loop::new(&input, "1m").execute(&tools).await;
        assert!(matches!(result, Err(YtdlrError::ProbeFailed(_))));
    }

    #[tokio::test]
    async fn test_clip_parses_clock_start_and_duration() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());

        let mut mock = MockTranscoder::new();
        mock.expect_trim()
            .with(always(), always(), eq(90.0), eq(Some(15.0)))
            .times(1)
            .returning(|_, output, _, _| {
                std::fs::write(output, b"clipped")?;
                Ok(())
            });
        let tools = transcoder_only(Arc::new(mock));

        let assets = Clip::new(&input, "01:30", Some("15s".to_string()))
            .execute(&tools)
            .await
            .unwrap();
        assert_eq!(assets[0].path, dir.path().join("song_clipped.mp4"));
    }

    #[tokio::test]
    async fn test_clip_without_duration_runs_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());

        let mut mock = MockTranscoder::new();
        mock.expect_trim()
            .with(always(), always(), eq(5.0), eq(None))
            .times(1)
            .returning(|_, output, _, _| {
                std::fs::write(output, b"clipped")?;
                Ok(())
            });
        let tools = transcoder_only(Arc::new(mock));

        assert!(Clip::new(&input, "5", None).execute(&tools).await.is_ok());
    }

    #[tokio::test]
    async fn test_clip_rejects_nonsense_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());
        let tools = transcoder_only(Arc::new(FakeTranscoder::new(10.0)));

        let negative_start = Clip::new(&input, "-3", None);
        let zero_length = Clip::new(&input, "0", Some("0s".to_string()));
        let unbounded = Clip::new(&input, "0", Some("1e308h".to_string()));
        assert!(matches!(
            negative_start.validate(&tools),
            Err(YtdlrError::InvalidDuration(_))
        ));
        assert!(matches!(
            unbounded.validate(&tools),
            Err(YtdlrError::InvalidDuration(_))
        ));
        assert!(matches!(
            zero_length.validate(&tools),
            Err(YtdlrError::InvalidDuration(_))
        ));
    }

    #[tokio::test]
    async fn test_clip_transcoder_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = source(dir.path());
        let tools = transcoder_only(Arc::new(FakeTranscoder::failing()));

        let outcome = run_transform(&Clip::new(&input, "0", None), &tools, &NoProgress).await;
        assert!(matches!(outcome.error(), Some(YtdlrError::TranscodeFailed(_))));
    }
}
