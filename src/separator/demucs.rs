use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::SeparatorConfig;
use crate::error::{Result, YtdlrError};
use crate::naming::file_stem;
use super::{Separator, StemPaths};

/// demucs abbreviates long track names; this many leading characters of the
/// stem are enough to find its output directory again.
const STEM_DIR_PREFIX_CHARS: usize = 10;

const NO_VOCALS_FILE: &str = "no_vocals.mp3";
const VOCALS_FILE: &str = "vocals.mp3";

/// demucs CLI wrapper
pub struct DemucsSeparator {
    config: SeparatorConfig,
}

impl DemucsSeparator {
    pub fn new(config: SeparatorConfig) -> Self {
        Self { config }
    }

    /// Directory demucs writes per-track folders into
    pub fn model_dir(&self) -> PathBuf {
        self.config.output_root.join(&self.config.model)
    }

    fn build_args(&self, input: &Path) -> Vec<String> {
        vec![
            "--mp3".to_string(),
            "--two-stems=vocals".to_string(),
            "-n".to_string(),
            self.config.model.clone(),
            "-o".to_string(),
            self.config.output_root.to_string_lossy().to_string(),
            input.to_string_lossy().to_string(),
        ]
    }
}

/// Locate the folder demucs produced for `stem` under `model_dir`.
///
/// Tries the exact name first, then the first (by name) sibling directory
/// sharing the stem's first ten characters.
pub fn resolve_stem_dir(model_dir: &Path, stem: &str) -> Option<PathBuf> {
    let exact = model_dir.join(stem);
    if exact.is_dir() {
        return Some(exact);
    }

    let prefix: String = stem.chars().take(STEM_DIR_PREFIX_CHARS).collect();
    debug!(
        "No exact stem directory for '{}', searching {} for prefix '{}'",
        stem,
        model_dir.display(),
        prefix
    );

    WalkDir::new(model_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .find(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| e.into_path())
}

#[async_trait]
impl Separator for DemucsSeparator {
    async fn separate(&self, input: &Path) -> Result<StemPaths> {
        info!("Separating vocals for {} (this may take a few minutes)", input.display());

        let args = self.build_args(input);
        debug!("Executing separator: {} {:?}", self.config.binary_path, args);

        let output = Command::new(&self.config.binary_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => YtdlrError::MissingDependency(format!(
                    "{} not found: {}",
                    self.config.binary_path, e
                )),
                _ => YtdlrError::SeparationFailed(format!(
                    "Failed to execute {}: {}",
                    self.config.binary_path, e
                )),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(YtdlrError::SeparationFailed(format!(
                "{} exited with {}: {}",
                self.config.binary_path,
                output.status,
                stderr.trim()
            )));
        }

        let stem = file_stem(input);
        let stem_dir = resolve_stem_dir(&self.model_dir(), &stem).ok_or_else(|| {
            YtdlrError::SeparationFailed(format!(
                "Output for '{}' not found under {}",
                stem,
                self.model_dir().display()
            ))
        })?;

        let no_vocals = stem_dir.join(NO_VOCALS_FILE);
        if !no_vocals.is_file() {
            return Err(YtdlrError::SeparationFailed(format!(
                "{} missing from {}",
                NO_VOCALS_FILE,
                stem_dir.display()
            )));
        }

        let vocals = stem_dir.join(VOCALS_FILE);
        let vocals = if vocals.is_file() {
            Some(vocals)
        } else {
            warn!("Separator produced no vocals stem in {}", stem_dir.display());
            None
        };

        Ok(StemPaths { no_vocals, vocals })
    }
}
