use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Result, YtdlrError};
use super::{MediaCommandBuilder, MixLevels, Transcoder};

/// Concrete transcoder (ffmpeg for transforms, ffprobe for probing)
pub struct FfmpegTranscoder {
    command_builder: MediaCommandBuilder,
}

impl FfmpegTranscoder {
    /// Create a new ffmpeg transcoder
    pub fn new(config: MediaConfig) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(&config),
        }
    }
}

/// Parse ffprobe's bare `format=duration` output
pub fn parse_probe_output(stdout: &str) -> Result<f64> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty());
    let value = line
        .ok_or_else(|| YtdlrError::ProbeFailed("ffprobe printed no duration".to_string()))?;

    let seconds: f64 = value
        .parse()
        .map_err(|_| YtdlrError::ProbeFailed(format!("Unparsable duration '{}'", value)))?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(YtdlrError::ProbeFailed(format!("Invalid duration '{}'", value)));
    }

    Ok(seconds)
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        debug!("Probing duration of {}", path.display());

        let stdout = self
            .command_builder
            .probe_duration(path)
            .capture()
            .await
            .map_err(|e| match e {
                YtdlrError::MissingDependency(_) => e,
                other => YtdlrError::ProbeFailed(other.to_string()),
            })?;

        let seconds = parse_probe_output(&stdout)?;
        debug!("{} is {:.3}s long", path.display(), seconds);
        Ok(seconds)
    }

    async fn strip_audio(&self, input: &Path, output: &Path) -> Result<()> {
        info!("Removing audio from {} -> {}", input.display(), output.display());
        self.command_builder.strip_audio(input, output).execute().await
    }

    async fn loop_to(&self, input: &Path, output: &Path, seconds: f64) -> Result<()> {
        info!(
            "Looping {} to {:.3}s -> {}",
            input.display(),
            seconds,
            output.display()
        );
        self.command_builder.loop_to(input, output, seconds).execute().await
    }

    async fn trim(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        duration: Option<f64>,
    ) -> Result<()> {
        match duration {
            Some(d) => info!("Clipping {} from {:.3}s for {:.3}s", input.display(), start, d),
            None => info!("Clipping {} from {:.3}s to end", input.display(), start),
        }
        self.command_builder
            .trim(input, output, start, duration)
            .execute()
            .await
    }

    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        info!(
            "Replacing audio of {} with {} -> {}",
            video.display(),
            audio.display(),
            output.display()
        );
        self.command_builder
            .replace_audio(video, audio, output)
            .execute()
            .await
    }

    async fn mix_audio(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        levels: MixLevels,
    ) -> Result<()> {
        info!(
            "Mixing {} (x{}) with {} (x{}) -> {}",
            video.display(),
            levels.video_gain,
            audio.display(),
            levels.audio_gain,
            output.display()
        );
        self.command_builder
            .mix_audio(video, audio, output, levels)
            .execute()
            .await
    }

    async fn still_to_video(&self, image: &Path, audio: &Path, output: &Path) -> Result<()> {
        info!(
            "Rendering {} over {} -> {}",
            image.display(),
            audio.display(),
            output.display()
        );
        self.command_builder
            .still_to_video(image, audio, output)
            .execute()
            .await
    }

    async fn get_version_info(&self) -> Result<String> {
        let stdout = self.command_builder.version_check().capture().await?;
        // First line carries the version
        Ok(stdout.lines().next().unwrap_or("Unknown version").to_string())
    }
}
