use std::io::ErrorKind;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

use crate::config::MediaConfig;
use crate::error::{Result, YtdlrError};

/// Output frame the image-to-video step scales and pads into.
pub const STILL_FRAME_WIDTH: u32 = 1920;
pub const STILL_FRAME_HEIGHT: u32 = 1080;

/// Fade window, in seconds, `amix` uses when one input drops out.
pub const MIX_DROPOUT_TRANSITION: u32 = 2;

/// Per-source gain multipliers for audio mixing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixLevels {
    pub video_gain: f64,
    pub audio_gain: f64,
}

impl Default for MixLevels {
    fn default() -> Self {
        Self {
            video_gain: 1.0,
            audio_gain: 1.0,
        }
    }
}

/// Render seconds the way ffmpeg expects them on the command line
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy every selected stream
    pub fn copy_all(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Select a stream for the output
    pub fn map<S: Into<String>>(self, specifier: S) -> Self {
        self.arg("-map").arg(specifier)
    }

    /// Stop at the end of the shortest input
    pub fn shortest(self) -> Self {
        self.arg("-shortest")
    }

    /// Seek before decoding the next input
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format_seconds(seconds))
    }

    /// Limit output duration
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(format_seconds(seconds))
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add a filter graph spanning several inputs
    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    /// x264 speed preset
    pub fn preset<S: Into<String>>(self, preset: S) -> Self {
        self.arg("-preset").arg(preset)
    }

    async fn run(&self) -> Result<Output> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => YtdlrError::MissingDependency(format!(
                    "{} not found: {}",
                    self.binary_path, e
                )),
                _ => YtdlrError::TranscodeFailed(format!(
                    "Failed to execute {}: {}",
                    self.binary_path, e
                )),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(YtdlrError::TranscodeFailed(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(output)
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        self.run().await.map(|_| ())
    }

    /// Execute the command and return its stdout
    pub async fn capture(&self) -> Result<String> {
        let output = self.run().await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Builder for the ffmpeg invocations each transform needs
pub struct MediaCommandBuilder {
    binary_path: String,
    ffprobe_path: String,
    clip_preset: String,
    audio_codec: String,
    still_audio_bitrate: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            binary_path: config.binary_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            clip_preset: config.clip_preset.clone(),
            audio_codec: config.audio_codec.clone(),
            still_audio_bitrate: config.still_audio_bitrate.clone(),
        }
    }

    /// Build duration probe command (ffprobe)
    pub fn probe_duration<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Duration probe")
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .output(path)
    }

    /// Build stream-copy command that drops every audio track
    pub fn strip_audio<P: AsRef<Path>>(&self, input: P, output: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Mute")
            .overwrite()
            .input(input)
            .copy_all()
            .no_audio()
            .output(output)
    }

    /// Build command looping the input indefinitely, cut at `seconds`
    pub fn loop_to<P: AsRef<Path>>(&self, input: P, output: P, seconds: f64) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Loop")
            .overwrite()
            .args(["-stream_loop", "-1"])
            .input(input)
            .duration(seconds)
            .copy_all()
            .output(output)
    }

    /// Build frame-accurate trim command; always re-encodes
    pub fn trim<P: AsRef<Path>>(
        &self,
        input: P,
        output: P,
        start: f64,
        duration: Option<f64>,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Clip")
            .overwrite()
            .seek(start)
            .input(input);

        if let Some(duration) = duration {
            cmd = cmd.duration(duration);
        }

        cmd.video_codec("libx264")
            .preset(&self.clip_preset)
            .audio_codec(&self.audio_codec)
            .args(["-avoid_negative_ts", "make_zero"])
            .output(output)
    }

    /// Build remux command pairing the video's picture with another audio track
    pub fn replace_audio<P: AsRef<Path>>(&self, video: P, audio: P, output: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio replacement")
            .overwrite()
            .input(video)
            .input(audio)
            .copy_video()
            .audio_codec(&self.audio_codec)
            .map("0:v:0")
            .map("1:a:0")
            .shortest()
            .output(output)
    }

    /// Build command blending the video's own audio with a second track
    pub fn mix_audio<P: AsRef<Path>>(
        &self,
        video: P,
        audio: P,
        output: P,
        levels: MixLevels,
    ) -> MediaCommand {
        let graph = format!(
            "[0:a]volume={}[a0];[1:a]volume={}[a1];[a0][a1]amix=inputs=2:duration=shortest:dropout_transition={}[aout]",
            levels.video_gain, levels.audio_gain, MIX_DROPOUT_TRANSITION
        );

        MediaCommand::new(&self.binary_path, "Audio mix")
            .overwrite()
            .input(video)
            .input(audio)
            .filter_complex(graph)
            .map("0:v:0")
            .map("[aout]")
            .copy_video()
            .audio_codec(&self.audio_codec)
            .output(output)
    }

    /// Build command turning a still image plus an audio track into a video
    pub fn still_to_video<P: AsRef<Path>>(&self, image: P, audio: P, output: P) -> MediaCommand {
        let (w, h) = (STILL_FRAME_WIDTH, STILL_FRAME_HEIGHT);
        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
        );

        MediaCommand::new(&self.binary_path, "Image to video")
            .overwrite()
            .args(["-loop", "1"])
            .input(image)
            .input(audio)
            .video_codec("libx264")
            .args(["-tune", "stillimage"])
            .audio_codec(&self.audio_codec)
            .args(["-b:a", self.still_audio_bitrate.as_str()])
            .args(["-pix_fmt", "yuv420p"])
            .video_filter(filter)
            .shortest()
            .output(output)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}
