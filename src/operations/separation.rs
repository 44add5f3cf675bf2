use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::artifacts::{ArtifactKind, MediaAsset};
use crate::error::Result;
use crate::naming::artifact_path;
use super::{clear_stale_output, ensure_output, move_file, require_input, OperationKind, Toolbox, Transform};

/// Split vocals from the accompaniment and build a karaoke video
pub struct VocalSeparation {
    input: PathBuf,
}

impl VocalSeparation {
    pub fn new<P: AsRef<Path>>(input: P) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
        }
    }

    /// Put the instrumental back under the original picture
    async fn remux(&self, tools: &Toolbox, instrumental: &Path) -> Result<MediaAsset> {
        let output = artifact_path(&self.input, ArtifactKind::InstrumentalVideo);
        clear_stale_output(&output).await?;

        tools
            .transcoder
            .replace_audio(&self.input, instrumental, &output)
            .await?;
        ensure_output(&output)?;

        Ok(MediaAsset::new(output, ArtifactKind::InstrumentalVideo))
    }
}

#[async_trait]
impl Transform for VocalSeparation {
    fn kind(&self) -> OperationKind {
        OperationKind::VocalSeparation
    }

    fn validate(&self, tools: &Toolbox) -> Result<()> {
        tools.capabilities.require_separator()?;
        require_input(&self.input)
    }

    async fn execute(&self, tools: &Toolbox) -> Result<Vec<MediaAsset>> {
        let stems = tools.separator.separate(&self.input).await?;
        let mut assets = Vec::new();

        let instrumental = artifact_path(&self.input, ArtifactKind::InstrumentalAudio);
        move_file(&stems.no_vocals, &instrumental).await?;
        info!("Created instrumental audio: {}", instrumental.display());
        assets.push(MediaAsset::new(&instrumental, ArtifactKind::InstrumentalAudio));

        if let Some(vocals) = &stems.vocals {
            let isolated = artifact_path(&self.input, ArtifactKind::IsolatedVocals);
            match move_file(vocals, &isolated).await {
                Ok(()) => {
                    info!("Created isolated vocals: {}", isolated.display());
                    assets.push(MediaAsset::new(isolated, ArtifactKind::IsolatedVocals));
                }
                Err(e) => warn!("Could not keep vocals stem {}: {}", vocals.display(), e),
            }
        }

        if !tools.capabilities.transcoder {
            warn!("ffmpeg not found; skipping karaoke video merge");
            return Ok(assets);
        }

        match self.remux(tools, &instrumental).await {
            Ok(video) => {
                info!("Created karaoke video: {}", video.path.display());
                assets.push(video);
            }
            // The audio stems are still useful without the video
            Err(e) => warn!("Karaoke video merge failed: {}", e),
        }

        Ok(assets)
    }
}
