use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::FetcherConfig;
use crate::error::{Result, YtdlrError};

/// One downloadable video stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub format_id: String,
    pub height: u32,
}

/// Metadata for a remote video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub title: String,
    pub thumbnail: Option<String>,
    pub formats: Vec<FormatInfo>,
}

impl VideoInfo {
    /// Distinct available heights, highest first
    pub fn heights(&self) -> Vec<u32> {
        let mut heights: Vec<u32> = self.formats.iter().map(|f| f.height).collect();
        heights.sort_unstable_by(|a, b| b.cmp(a));
        heights.dedup();
        heights
    }
}

/// Remote video metadata and download
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn probe(&self, url: &str) -> Result<VideoInfo>;

    /// Download the best stream at `height` (plus best audio) as MP4 to `dest`
    async fn download(&self, url: &str, height: u32, dest: &Path) -> Result<()>;
}

// Subset of `yt-dlp -J` output
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    height: Option<u32>,
    vcodec: Option<String>,
}

/// Parse yt-dlp's JSON dump, keeping only streams that carry video
pub fn parse_video_info(json: &str) -> Result<VideoInfo> {
    let info: YtDlpInfo = serde_json::from_str(json)?;

    let formats = info
        .formats
        .into_iter()
        .filter(|f| f.vcodec.as_deref() != Some("none"))
        .filter_map(|f| {
            f.height.filter(|h| *h > 0).map(|height| FormatInfo {
                format_id: f.format_id,
                height,
            })
        })
        .collect();

    Ok(VideoInfo {
        title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
        thumbnail: info.thumbnail,
        formats,
    })
}

/// Format selector: exact height video + best audio, or a pre-merged stream
pub fn format_selector(height: u32) -> String {
    format!("bestvideo[height={h}]+bestaudio/best[height={h}]", h = height)
}

/// yt-dlp CLI wrapper
pub struct YtDlpFetcher {
    config: FetcherConfig,
}

impl YtDlpFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        debug!("Executing fetcher: {} {:?}", self.config.binary_path, args);

        let output = Command::new(&self.config.binary_path)
            .args(args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => YtdlrError::MissingDependency(format!(
                    "{} not found: {}",
                    self.config.binary_path, e
                )),
                _ => YtdlrError::Fetch(format!("Failed to execute {}: {}", self.config.binary_path, e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(YtdlrError::Fetch(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn probe(&self, url: &str) -> Result<VideoInfo> {
        info!("Fetching video info for {}", url);
        let args = vec![
            "-J".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            url.to_string(),
        ];
        let stdout = self.run(&args).await?;
        parse_video_info(&stdout)
    }

    async fn download(&self, url: &str, height: u32, dest: &Path) -> Result<()> {
        info!("Downloading {}p of {} to {}", height, url, dest.display());

        // yt-dlp skips files that already exist
        match tokio::fs::remove_file(dest).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let args = vec![
            "-f".to_string(),
            format_selector(height),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "-o".to_string(),
            dest.to_string_lossy().to_string(),
            url.to_string(),
        ];
        self.run(&args).await?;

        if !dest.is_file() {
            return Err(YtdlrError::Fetch(format!(
                "Download finished but {} is missing",
                dest.display()
            )));
        }

        info!("Downloaded {}", dest.display());
        Ok(())
    }
}
