use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, YtdlrError};

/// External tools found at startup.
///
/// Detected once and passed around by value; operations consult it instead
/// of probing the system again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// ffmpeg
    pub transcoder: bool,
    /// ffprobe
    pub prober: bool,
    /// demucs
    pub separator: bool,
    /// yt-dlp
    pub fetcher: bool,
}

/// One line of the capability report
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub capability: &'static str,
    pub binary: String,
    pub resolved: Option<PathBuf>,
}

impl Capabilities {
    /// Everything available
    pub fn all() -> Self {
        Self {
            transcoder: true,
            prober: true,
            separator: true,
            fetcher: true,
        }
    }

    /// Look up every configured binary on PATH
    pub fn detect(config: &Config) -> Self {
        let report = Self::report(config);
        let found = |name: &str| {
            report
                .iter()
                .any(|status| status.capability == name && status.resolved.is_some())
        };

        let capabilities = Self {
            transcoder: found("transcoder"),
            prober: found("prober"),
            separator: found("separator"),
            fetcher: found("fetcher"),
        };

        for status in &report {
            match &status.resolved {
                Some(path) => info!("{} available at {}", status.binary, path.display()),
                None => warn!("{} not found; dependent steps will be skipped", status.binary),
            }
        }

        capabilities
    }

    /// Resolve each configured binary, for the `check` command
    pub fn report(config: &Config) -> Vec<ToolStatus> {
        [
            ("transcoder", &config.media.binary_path),
            ("prober", &config.media.ffprobe_path),
            ("separator", &config.separator.binary_path),
            ("fetcher", &config.fetcher.binary_path),
        ]
        .into_iter()
        .map(|(capability, binary)| ToolStatus {
            capability,
            binary: binary.clone(),
            resolved: which::which(binary).ok(),
        })
        .collect()
    }

    pub fn require_transcoder(&self) -> Result<()> {
        if self.transcoder {
            Ok(())
        } else {
            Err(YtdlrError::MissingDependency("ffmpeg is not installed".to_string()))
        }
    }

    pub fn require_prober(&self) -> Result<()> {
        if self.prober {
            Ok(())
        } else {
            Err(YtdlrError::MissingDependency("ffprobe is not installed".to_string()))
        }
    }

    pub fn require_separator(&self) -> Result<()> {
        if self.separator {
            Ok(())
        } else {
            Err(YtdlrError::MissingDependency("demucs is not installed".to_string()))
        }
    }

    pub fn require_fetcher(&self) -> Result<()> {
        if self.fetcher {
            Ok(())
        } else {
            Err(YtdlrError::MissingDependency("yt-dlp is not installed".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tools_are_reported() {
        let mut config = Config::default();
        config.media.binary_path = "ytdlr-missing-ffmpeg".to_string();
        config.separator.binary_path = "ytdlr-missing-demucs".to_string();

        let capabilities = Capabilities::detect(&config);
        assert!(!capabilities.transcoder);
        assert!(!capabilities.separator);
        assert!(matches!(
            capabilities.require_transcoder(),
            Err(YtdlrError::MissingDependency(_))
        ));
    }

    #[test]
    fn test_requirements_pass_when_available() {
        let capabilities = Capabilities::all();
        assert!(capabilities.require_transcoder().is_ok());
        assert!(capabilities.require_prober().is_ok());
        assert!(capabilities.require_separator().is_ok());
        assert!(capabilities.require_fetcher().is_ok());
    }
}
