// Media transcoder abstraction
//
// - Commands: ffmpeg/ffprobe command builders
// - Processor: ffmpeg-backed implementation of the Transcoder trait

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Media transformations delegated to an external transcoder.
///
/// Implementations only run the tool; validating inputs and checking that
/// the output file appeared is left to the calling operation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Duration of a media file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Copy all streams except audio
    async fn strip_audio(&self, input: &Path, output: &Path) -> Result<()>;

    /// Loop the input until it reaches `seconds`, without re-encoding
    async fn loop_to(&self, input: &Path, output: &Path, seconds: f64) -> Result<()>;

    /// Cut `[start, start + duration)`; `None` runs to the end of the source
    async fn trim(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        duration: Option<f64>,
    ) -> Result<()>;

    /// Pair the video's picture stream with a different audio track
    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;

    /// Blend the video's audio with a second track
    async fn mix_audio(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        levels: MixLevels,
    ) -> Result<()>;

    /// Render a still image for the length of an audio track
    async fn still_to_video(&self, image: &Path, audio: &Path, output: &Path) -> Result<()>;

    /// Get transcoder version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating transcoder instances
pub struct TranscoderFactory;

impl TranscoderFactory {
    /// Create the default transcoder implementation (FFmpeg-based)
    pub fn create_transcoder(config: MediaConfig) -> Box<dyn Transcoder> {
        Box::new(processor::FfmpegTranscoder::new(config))
    }
}
