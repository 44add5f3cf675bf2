//! Transform operations and the state machine that drives them.
//!
//! Every operation reads one or more existing files and writes a new,
//! deterministically named one. Running an operation goes through
//! `Pending -> Validating -> Running -> Succeeded | Failed`; validation
//! happens before any external process is spawned, and errors never escape
//! [`run_transform`], they become a failed [`OperationOutcome`].

pub mod edit;
pub mod separation;
pub mod tools;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub use edit::{Clip, Loop, Mute};
pub use separation::VocalSeparation;
pub use tools::{ImageToVideo, MixAudio, ReplaceAudio};

use crate::artifacts::MediaAsset;
use crate::error::{Result, YtdlrError};
use crate::media::Transcoder;
use crate::separator::Separator;
use crate::setup::Capabilities;

/// External capabilities available to operations
#[derive(Clone)]
pub struct Toolbox {
    pub transcoder: Arc<dyn Transcoder>,
    pub separator: Arc<dyn Separator>,
    pub capabilities: Capabilities,
}

impl Toolbox {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        separator: Arc<dyn Separator>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            transcoder,
            separator,
            capabilities,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    VocalSeparation,
    Mute,
    Loop,
    Clip,
    ReplaceAudio,
    MixAudio,
    ImageToVideo,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::VocalSeparation => "vocal separation",
            OperationKind::Mute => "mute",
            OperationKind::Loop => "loop",
            OperationKind::Clip => "clip",
            OperationKind::ReplaceAudio => "replace audio",
            OperationKind::MixAudio => "mix audio",
            OperationKind::ImageToVideo => "image to video",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Validating,
    Running,
    Succeeded,
    Failed,
}

/// A single media transformation
#[async_trait]
pub trait Transform: Send + Sync {
    fn kind(&self) -> OperationKind;

    /// Check capabilities, inputs and parameters. Must not spawn processes.
    fn validate(&self, tools: &Toolbox) -> Result<()>;

    /// Run the external tools and return the assets produced
    async fn execute(&self, tools: &Toolbox) -> Result<Vec<MediaAsset>>;
}

/// Receives state transitions as operations run
pub trait ProgressObserver: Send + Sync {
    fn on_state(&self, operation: OperationKind, state: OperationState);
}

/// Observer that ignores everything
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_state(&self, _operation: OperationKind, _state: OperationState) {}
}

#[derive(Debug)]
pub enum OperationResult {
    Succeeded(Vec<MediaAsset>),
    Failed(YtdlrError),
}

/// Terminal record of one operation run
#[derive(Debug)]
pub struct OperationOutcome {
    pub operation: OperationKind,
    pub result: OperationResult,
    pub elapsed: Duration,
}

impl OperationOutcome {
    pub fn state(&self) -> OperationState {
        match self.result {
            OperationResult::Succeeded(_) => OperationState::Succeeded,
            OperationResult::Failed(_) => OperationState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, OperationResult::Succeeded(_))
    }

    pub fn assets(&self) -> &[MediaAsset] {
        match &self.result {
            OperationResult::Succeeded(assets) => assets,
            OperationResult::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&YtdlrError> {
        match &self.result {
            OperationResult::Failed(e) => Some(e),
            OperationResult::Succeeded(_) => None,
        }
    }
}

/// Drive one transform through its states. Never fails; errors are recorded.
pub async fn run_transform(
    transform: &dyn Transform,
    tools: &Toolbox,
    progress: &dyn ProgressObserver,
) -> OperationOutcome {
    let operation = transform.kind();
    let started = Instant::now();

    let transition = |state: OperationState| {
        debug!("{}: {:?}", operation, state);
        progress.on_state(operation, state);
    };

    transition(OperationState::Pending);
    transition(OperationState::Validating);

    let result = match transform.validate(tools) {
        Err(e) => Err(e),
        Ok(()) => {
            transition(OperationState::Running);
            transform.execute(tools).await
        }
    };

    let result = match result {
        Ok(assets) => {
            for asset in &assets {
                info!("{} produced {}: {}", operation, asset.kind, asset.path.display());
            }
            transition(OperationState::Succeeded);
            OperationResult::Succeeded(assets)
        }
        Err(e) => {
            warn!("{} failed: {}", operation, e);
            transition(OperationState::Failed);
            OperationResult::Failed(e)
        }
    };

    OperationOutcome {
        operation,
        result,
        elapsed: started.elapsed(),
    }
}

pub(crate) fn require_input(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(YtdlrError::MissingInput(path.display().to_string()))
    }
}

/// The transcoder exiting cleanly is not enough; the file has to be there.
pub(crate) fn ensure_output(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(YtdlrError::TranscodeFailed(format!(
            "No output written to {}",
            path.display()
        )))
    }
}

/// Drop a previous run's output so a silent failure cannot pass for success.
pub(crate) async fn clear_stale_output(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale output {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Rename, falling back to copy + delete across filesystems.
pub(crate) async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::media::MixLevels;
    use crate::separator::StemPaths;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Transcoder that writes placeholder outputs and records each call
    pub struct FakeTranscoder {
        pub duration: f64,
        pub fail: bool,
        pub write_output: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeTranscoder {
        pub fn new(duration: f64) -> Self {
            Self {
                duration,
                fail: false,
                write_output: true,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(10.0)
            }
        }

        pub fn silent() -> Self {
            Self {
                write_output: false,
                ..Self::new(10.0)
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str, output: &Path) -> Result<()> {
            self.calls.lock().unwrap().push(call.to_string());
            if self.fail {
                return Err(YtdlrError::TranscodeFailed(format!("{} exploded", call)));
            }
            if self.write_output {
                std::fs::write(output, call.as_bytes())?;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn probe_duration(&self, _path: &Path) -> Result<f64> {
            self.calls.lock().unwrap().push("probe_duration".to_string());
            Ok(self.duration)
        }

        async fn strip_audio(&self, _input: &Path, output: &Path) -> Result<()> {
            self.record("strip_audio", output)
        }

        async fn loop_to(&self, _input: &Path, output: &Path, _seconds: f64) -> Result<()> {
            self.record("loop_to", output)
        }

        async fn trim(
            &self,
            _input: &Path,
            output: &Path,
            _start: f64,
            _duration: Option<f64>,
        ) -> Result<()> {
            self.record("trim", output)
        }

        async fn replace_audio(&self, _video: &Path, _audio: &Path, output: &Path) -> Result<()> {
            self.record("replace_audio", output)
        }

        async fn mix_audio(
            &self,
            _video: &Path,
            _audio: &Path,
            output: &Path,
            _levels: MixLevels,
        ) -> Result<()> {
            self.record("mix_audio", output)
        }

        async fn still_to_video(&self, _image: &Path, _audio: &Path, output: &Path) -> Result<()> {
            self.record("still_to_video", output)
        }

        async fn get_version_info(&self) -> Result<String> {
            Ok("fake 1.0".to_string())
        }
    }

    /// Separator that drops stem files into a scratch directory
    pub struct FakeSeparator {
        pub stem_dir: PathBuf,
        pub with_vocals: bool,
        pub fail: bool,
    }

    impl FakeSeparator {
        pub fn new(stem_dir: &Path) -> Self {
            Self {
                stem_dir: stem_dir.to_path_buf(),
                with_vocals: true,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl Separator for FakeSeparator {
        async fn separate(&self, input: &Path) -> Result<StemPaths> {
            if self.fail {
                return Err(YtdlrError::SeparationFailed(format!(
                    "no stems for {}",
                    input.display()
                )));
            }
            std::fs::create_dir_all(&self.stem_dir)?;
            let no_vocals = self.stem_dir.join("no_vocals.mp3");
            std::fs::write(&no_vocals, b"instrumental")?;
            let vocals = if self.with_vocals {
                let path = self.stem_dir.join("vocals.mp3");
                std::fs::write(&path, b"vocals")?;
                Some(path)
            } else {
                None
            };
            Ok(StemPaths { no_vocals, vocals })
        }
    }

    pub fn toolbox(
        transcoder: Arc<dyn Transcoder>,
        separator: Arc<dyn Separator>,
        capabilities: Capabilities,
    ) -> Toolbox {
        Toolbox::new(transcoder, separator, capabilities)
    }

    /// Toolbox whose separator always fails; for tests that never separate
    pub fn transcoder_only(transcoder: Arc<dyn Transcoder>) -> Toolbox {
        let separator = FakeSeparator {
            stem_dir: PathBuf::new(),
            with_vocals: false,
            fail: true,
        };
        Toolbox::new(transcoder, Arc::new(separator), Capabilities::all())
    }

    pub fn touch(path: &Path) {
        std::fs::write(path, b"media").unwrap();
    }
}
