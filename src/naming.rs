//! Filesystem-safe names and deterministic artifact paths.

use std::path::{Path, PathBuf};

use crate::artifacts::ArtifactKind;

const FALLBACK_NAME: &str = "video";
const FALLBACK_FILENAME: &str = "uploaded_video.mp4";

fn keep_safe_chars(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Reduce a title to a filesystem-safe name; never returns an empty string.
pub fn sanitize(name: &str) -> String {
    let safe = keep_safe_chars(name);
    if safe.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        safe
    }
}

/// Like [`sanitize`], for names that are expected to carry an extension.
pub fn sanitize_filename(name: &str) -> String {
    let safe = keep_safe_chars(name);
    if safe.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        safe
    }
}

/// Base name of `path` without its extension.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Output path for `kind` derived from `input`, placed next to it.
///
/// The original kind maps to the input itself.
pub fn artifact_path(input: &Path, kind: ArtifactKind) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    match kind.suffix() {
        Some(_) => artifact_path_in(dir, &file_stem(input), kind),
        None => input.to_path_buf(),
    }
}

/// Output path for `kind` with an explicit directory and stem.
pub fn artifact_path_in(dir: &Path, stem: &str, kind: ArtifactKind) -> PathBuf {
    let suffix = kind.suffix().unwrap_or(".mp4");
    dir.join(format!("{}{}", stem, suffix))
}
