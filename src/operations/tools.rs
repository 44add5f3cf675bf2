// Two-input operations. They are not chained onto a download; the caller
// supplies both files and picks exactly one of these.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::artifacts::{ArtifactKind, MediaAsset};
use crate::error::{Result, YtdlrError};
use crate::media::MixLevels;
use crate::naming::artifact_path;
use super::{clear_stale_output, ensure_output, require_input, OperationKind, Toolbox, Transform};

fn require_inputs(first: &Path, second: &Path, tools: &Toolbox) -> Result<()> {
    tools.capabilities.require_transcoder()?;
    require_input(first)?;
    require_input(second)
}

/// Swap a video's soundtrack for a different audio file
pub struct ReplaceAudio {
    video: PathBuf,
    audio: PathBuf,
    output: PathBuf,
}

impl ReplaceAudio {
    pub fn new<P: AsRef<Path>>(video: P, audio: P) -> Self {
        let output = artifact_path(video.as_ref(), ArtifactKind::AudioReplacedVideo);
        Self::with_output(video, audio, output)
    }

    pub fn with_output<P: AsRef<Path>>(video: P, audio: P, output: PathBuf) -> Self {
        Self {
            video: video.as_ref().to_path_buf(),
            audio: audio.as_ref().to_path_buf(),
            output,
        }
    }
}

#[async_trait]
impl Transform for ReplaceAudio {
    fn kind(&self) -> OperationKind {
        OperationKind::ReplaceAudio
    }

    fn validate(&self, tools: &Toolbox) -> Result<()> {
        require_inputs(&self.video, &self.audio, tools)
    }

    async fn execute(&self, tools: &Toolbox) -> Result<Vec<MediaAsset>> {
        clear_stale_output(&self.output).await?;
        tools
            .transcoder
            .replace_audio(&self.video, &self.audio, &self.output)
            .await?;
        ensure_output(&self.output)?;

        Ok(vec![MediaAsset::new(&self.output, ArtifactKind::AudioReplacedVideo)])
    }
}

/// Blend a second audio track into a video's own soundtrack
pub struct MixAudio {
    video: PathBuf,
    audio: PathBuf,
    levels: MixLevels,
    output: PathBuf,
}

impl MixAudio {
    pub fn new<P: AsRef<Path>>(video: P, audio: P, levels: MixLevels) -> Self {
        let output = artifact_path(video.as_ref(), ArtifactKind::AudioMixedVideo);
        Self::with_output(video, audio, levels, output)
    }

    pub fn with_output<P: AsRef<Path>>(
        video: P,
        audio: P,
        levels: MixLevels,
        output: PathBuf,
    ) -> Self {
        Self {
            video: video.as_ref().to_path_buf(),
            audio: audio.as_ref().to_path_buf(),
            levels,
            output,
        }
    }
}

#[async_trait]
impl Transform for MixAudio {
    fn kind(&self) -> OperationKind {
        OperationKind::MixAudio
    }

    fn validate(&self, tools: &Toolbox) -> Result<()> {
        for (name, gain) in [
            ("video gain", self.levels.video_gain),
            ("audio gain", self.levels.audio_gain),
        ] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(YtdlrError::InvalidParameter(format!(
                    "{} must be a non-negative number, got {}",
                    name, gain
                )));
            }
        }
        require_inputs(&self.video, &self.audio, tools)
    }

    async fn execute(&self, tools: &Toolbox) -> Result<Vec<MediaAsset>> {
        clear_stale_output(&self.output).await?;
        tools
            .transcoder
            .mix_audio(&self.video, &self.audio, &self.output, self.levels)
            .await?;
        ensure_output(&self.output)?;

        Ok(vec![MediaAsset::new(&self.output, ArtifactKind::AudioMixedVideo)])
    }
}

/// Full-HD video of a still image for the length of an audio track
pub struct ImageToVideo {
    image: PathBuf,
    audio: PathBuf,
    output: PathBuf,
}

impl ImageToVideo {
    pub fn new<P: AsRef<Path>>(image: P, audio: P) -> Self {
        let output = artifact_path(image.as_ref(), ArtifactKind::ImageVideo);
        Self::with_output(image, audio, output)
    }

    pub fn with_output<P: AsRef<Path>>(image: P, audio: P, output: PathBuf) -> Self {
        Self {
            image: image.as_ref().to_path_buf(),
            audio: audio.as_ref().to_path_buf(),
            output,
        }
    }
}

#[async_trait]
impl Transform for ImageToVideo {
    fn kind(&self) -> OperationKind {
        OperationKind::ImageToVideo
    }

    fn validate(&self, tools: &Toolbox) -> Result<()> {
        require_inputs(&self.image, &self.audio, tools)
    }

    async fn execute(&self, tools: &Toolbox) -> Result<Vec<MediaAsset>> {
        clear_stale_output(&self.output).await?;
        tools
            .transcoder
            .still_to_video(&self.image, &self.audio, &self.output)
            .await?;
        ensure_output(&self.output)?;

        Ok(vec![MediaAsset::new(&self.output, ArtifactKind::ImageVideo)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::*;
    use crate::operations::{run_transform, NoProgress};
    use std::sync::Arc;

    fn inputs(dir: &Path, first: &str, second: &str) -> (PathBuf, PathBuf) {
        let a = dir.join(first);
        let b = dir.join(second);
        touch(&a);
        touch(&b);
        (a, b)
    }

    #[tokio::test]
    async fn test_replace_audio_names_output_after_video() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio) = inputs(dir.path(), "clip.mp4", "track.mp3");
        let tools = transcoder_only(Arc::new(FakeTranscoder::new(10.0)));

        let assets = ReplaceAudio::new(&video, &audio).execute(&tools).await.unwrap();
        assert_eq!(assets[0].path, dir.path().join("clip_replaced_audio.mp4"));
        assert_eq!(assets[0].kind, ArtifactKind::AudioReplacedVideo);
    }

    #[tokio::test]
    async fn test_replace_audio_missing_audio_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        touch(&video);
        let transcoder = Arc::new(FakeTranscoder::new(10.0));
        let tools = transcoder_only(transcoder.clone());

        let op = ReplaceAudio::new(&video, &dir.path().join("gone.mp3"));
        let outcome = run_transform(&op, &tools, &NoProgress).await;

        assert!(matches!(outcome.error(), Some(YtdlrError::MissingInput(_))));
        assert!(transcoder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mix_audio_rejects_negative_gain() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio) = inputs(dir.path(), "clip.mp4", "track.mp3");
        let tools = transcoder_only(Arc::new(FakeTranscoder::new(10.0)));
        let levels = MixLevels {
            video_gain: -1.0,
            audio_gain: 1.0,
        };

        let result = MixAudio::new(&video, &audio, levels).validate(&tools);
        assert!(matches!(result, Err(YtdlrError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_mix_audio_writes_mixed_output() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio) = inputs(dir.path(), "clip.mp4", "track.mp3");
        let transcoder = Arc::new(FakeTranscoder::new(10.0));
        let tools = transcoder_only(transcoder.clone());

        let op = MixAudio::new(&video, &audio, MixLevels::default());
        let outcome = run_transform(&op, &tools, &NoProgress).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.assets()[0].path, dir.path().join("clip_mixed_audio.mp4"));
        assert_eq!(transcoder.calls(), vec!["mix_audio"]);
    }

    #[tokio::test]
    async fn test_image_to_video_uses_explicit_output() {
        let dir = tempfile::tempdir().unwrap();
        let (image, audio) = inputs(dir.path(), "cover.png", "song.mp3");
        let output = dir.path().join("renamed.mp4");
        let tools = transcoder_only(Arc::new(FakeTranscoder::new(10.0)));

        let assets = ImageToVideo::with_output(&image, &audio, output.clone())
            .execute(&tools)
            .await
            .unwrap();
        assert_eq!(assets, vec![MediaAsset::new(output, ArtifactKind::ImageVideo)]);
    }

    #[tokio::test]
    async fn test_image_to_video_transcoder_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (image, audio) = inputs(dir.path(), "cover.png", "song.mp3");
        let tools = transcoder_only(Arc::new(FakeTranscoder::failing()));

        let outcome = run_transform(&ImageToVideo::new(&image, &audio), &tools, &NoProgress).await;
        assert!(matches!(outcome.error(), Some(YtdlrError::TranscodeFailed(_))));
    }
}
