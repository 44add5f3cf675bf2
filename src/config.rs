use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, YtdlrError};

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_clip_preset() -> String {
    "fast".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_still_audio_bitrate() -> String {
    "192k".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub media: MediaConfig,
    pub separator: SeparatorConfig,
    pub fetcher: FetcherConfig,
    pub upload: UploadConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary, used for duration probing
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// x264 preset used when clipping re-encodes
    /// (ultrafast, veryfast, fast, medium, slow)
    #[serde(default = "default_clip_preset")]
    pub clip_preset: String,
    /// Audio codec for every step that re-encodes audio
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    /// Audio bitrate for image-to-video output
    #[serde(default = "default_still_audio_bitrate")]
    pub still_audio_bitrate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparatorConfig {
    /// Path to demucs binary
    pub binary_path: String,
    /// Separation model name; also the name of demucs' output subdirectory
    pub model: String,
    /// Root directory demucs writes stems into
    pub output_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Path to yt-dlp binary
    pub binary_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Drive folder used when none is given on the command line
    pub default_folder_id: String,
    /// JSON file holding an `access_token`; `YTDLR_DRIVE_TOKEN` takes precedence
    pub token_path: PathBuf,
    /// Drive metadata API base
    pub api_base: String,
    /// Drive upload API base
    pub upload_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory downloads and tool-mode outputs are written to
    pub directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                ffprobe_path: default_ffprobe_path(),
                clip_preset: default_clip_preset(),
                audio_codec: default_audio_codec(),
                still_audio_bitrate: default_still_audio_bitrate(),
            },
            separator: SeparatorConfig {
                binary_path: "demucs".to_string(),
                model: "htdemucs".to_string(),
                output_root: PathBuf::from("separated"),
            },
            fetcher: FetcherConfig {
                binary_path: "yt-dlp".to_string(),
            },
            upload: UploadConfig {
                default_folder_id: String::new(),
                token_path: PathBuf::from(".ytdlr/drive_token.json"),
                api_base: "https://www.googleapis.com/drive/v3".to_string(),
                upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
            },
            output: OutputConfig {
                directory: PathBuf::from("."),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| YtdlrError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| YtdlrError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;

        std::fs::write(path, content)
            .map_err(|e| YtdlrError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| YtdlrError::Config(format!("Failed to serialize config: {}", e)))
    }
}
