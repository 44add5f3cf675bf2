use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Every artifact a run can produce. Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Original,
    InstrumentalVideo,
    InstrumentalAudio,
    IsolatedVocals,
    MutedVideo,
    LoopedVideo,
    ClippedVideo,
    AudioReplacedVideo,
    AudioMixedVideo,
    ImageVideo,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 10] = [
        ArtifactKind::Original,
        ArtifactKind::InstrumentalVideo,
        ArtifactKind::InstrumentalAudio,
        ArtifactKind::IsolatedVocals,
        ArtifactKind::MutedVideo,
        ArtifactKind::LoopedVideo,
        ArtifactKind::ClippedVideo,
        ArtifactKind::AudioReplacedVideo,
        ArtifactKind::AudioMixedVideo,
        ArtifactKind::ImageVideo,
    ];

    /// Symbolic registry key
    pub fn key(self) -> &'static str {
        match self {
            ArtifactKind::Original => "original",
            ArtifactKind::InstrumentalVideo => "instrumental_mp4",
            ArtifactKind::InstrumentalAudio => "instrumental_mp3",
            ArtifactKind::IsolatedVocals => "vocals_mp3",
            ArtifactKind::MutedVideo => "muted_mp4",
            ArtifactKind::LoopedVideo => "looped_mp4",
            ArtifactKind::ClippedVideo => "clipped_mp4",
            ArtifactKind::AudioReplacedVideo => "replaced_audio_mp4",
            ArtifactKind::AudioMixedVideo => "mixed_audio_mp4",
            ArtifactKind::ImageVideo => "image_video_mp4",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Human-readable label for listings
    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Original => "Original MP4",
            ArtifactKind::InstrumentalVideo => "Karaoke Video",
            ArtifactKind::InstrumentalAudio => "Backing Track MP3",
            ArtifactKind::IsolatedVocals => "Vocals MP3",
            ArtifactKind::MutedVideo => "Muted Video",
            ArtifactKind::LoopedVideo => "Looped Video",
            ArtifactKind::ClippedVideo => "Clipped Video",
            ArtifactKind::AudioReplacedVideo => "Audio Replaced Video",
            ArtifactKind::AudioMixedVideo => "Audio Mixed Video",
            ArtifactKind::ImageVideo => "Image Video",
        }
    }

    /// Filename suffix appended to the input stem; `None` for the original.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            ArtifactKind::Original => None,
            ArtifactKind::InstrumentalVideo => Some("_instrumental.mp4"),
            ArtifactKind::InstrumentalAudio => Some("_instrumental.mp3"),
            ArtifactKind::IsolatedVocals => Some("_vocals.mp3"),
            ArtifactKind::MutedVideo => Some("_muted.mp4"),
            ArtifactKind::LoopedVideo => Some("_looped.mp4"),
            ArtifactKind::ClippedVideo => Some("_clipped.mp4"),
            ArtifactKind::AudioReplacedVideo => Some("_replaced_audio.mp4"),
            ArtifactKind::AudioMixedVideo => Some("_mixed_audio.mp4"),
            ArtifactKind::ImageVideo => Some("_image_video.mp4"),
        }
    }

    /// Whether the upload step selects this artifact unless told otherwise.
    pub fn upload_by_default(self) -> bool {
        matches!(self, ArtifactKind::Original | ArtifactKind::InstrumentalVideo)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A file on disk representing one stage of processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl MediaAsset {
    pub fn new<P: Into<PathBuf>>(path: P, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn original<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(path, ArtifactKind::Original)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Run-scoped mapping from artifact kind to the file produced for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactRegistry {
    entries: BTreeMap<ArtifactKind, MediaAsset>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a registry seeded with the run's source file.
    pub fn with_original<P: Into<PathBuf>>(path: P) -> Self {
        let mut registry = Self::new();
        registry.insert(MediaAsset::original(path));
        registry
    }

    /// Insert an asset under its kind, replacing any previous entry.
    pub fn insert(&mut self, asset: MediaAsset) -> Option<MediaAsset> {
        self.entries.insert(asset.kind, asset)
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&MediaAsset> {
        self.entries.get(&kind)
    }

    pub fn path(&self, kind: ArtifactKind) -> Option<&Path> {
        self.get(kind).map(MediaAsset::path)
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<ArtifactKind> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaAsset> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Assets selected for upload: the defaults, or everything when `all`.
    pub fn upload_selection(&self, all: bool) -> Vec<&MediaAsset> {
        self.iter()
            .filter(|asset| all || asset.kind.upload_by_default())
            .collect()
    }
}

impl Serialize for ArtifactRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (kind, asset) in &self.entries {
            map.serialize_entry(kind.key(), &asset.path.to_string_lossy())?;
        }
        map.end()
    }
}

/// Holds the registry of the current run; starting a new source discards
/// whatever the previous run produced.
#[derive(Debug, Default)]
pub struct Session {
    source: Option<String>,
    registry: ArtifactRegistry,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a run for `source` (a URL or a local path), clearing state when
    /// it differs from the current one. Returns true if state was reset.
    pub fn begin(&mut self, source: &str) -> bool {
        if self.source.as_deref() == Some(source) {
            return false;
        }
        self.source = Some(source.to_string());
        self.registry = ArtifactRegistry::new();
        true
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Replace the whole registry with the result of a finished run.
    pub fn replace(&mut self, registry: ArtifactRegistry) {
        self.registry = registry;
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }
}
