use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::workflow::{ClipRequest, OperationRequest};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Transforms applied after a download or to a local file
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct OperationArgs {
    /// Create a karaoke version (instrumental audio + video)
    #[arg(long)]
    pub remove_vocals: bool,

    /// Create a copy with every audio track removed
    #[arg(long)]
    pub mute: bool,

    /// Loop the video up to this length (e.g. 30s, 5m, 1h)
    #[arg(long, value_name = "DURATION")]
    pub loop_to: Option<String>,

    /// Clip start offset (e.g. 90s or 00:01:30)
    #[arg(long, value_name = "TIME")]
    pub clip_start: Option<String>,

    /// Clip length; omit to clip to the end
    #[arg(long, value_name = "DURATION", requires = "clip_start")]
    pub clip_duration: Option<String>,
}

impl OperationArgs {
    pub fn to_request(&self) -> OperationRequest {
        OperationRequest {
            remove_vocals: self.remove_vocals,
            mute: self.mute,
            loop_to: self.loop_to.clone(),
            clip: self.clip_start.as_ref().map(|start| ClipRequest {
                start: start.clone(),
                duration: self.clip_duration.clone(),
            }),
        }
    }
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct UploadArgs {
    /// Upload the results to Google Drive when done
    #[arg(long)]
    pub upload: bool,

    /// Upload every artifact, not just the videos
    #[arg(long, requires = "upload")]
    pub upload_all: bool,

    /// Drive folder id (defaults to the configured folder)
    #[arg(long)]
    pub folder_id: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show title, thumbnail and available resolutions of a video
    Info {
        /// Video URL
        url: String,
    },

    /// Download a video and optionally process and upload it
    Download {
        /// Video URL
        url: String,

        /// Resolution to download (defaults to the highest available)
        #[arg(long)]
        height: Option<u32>,

        /// Directory to save the download in
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        operations: OperationArgs,

        #[command(flatten)]
        upload: UploadArgs,

        /// Print the resulting artifacts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Process a local video file
    Process {
        /// Input video file
        input: PathBuf,

        #[command(flatten)]
        operations: OperationArgs,

        #[command(flatten)]
        upload: UploadArgs,

        /// Print the resulting artifacts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace a video's soundtrack with another audio file
    ReplaceAudio {
        /// Input video file
        video: PathBuf,

        /// Replacement audio file
        audio: PathBuf,

        /// Directory for the result
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Mix an audio file into a video's soundtrack
    MixAudio {
        /// Input video file
        video: PathBuf,

        /// Audio file to mix in
        audio: PathBuf,

        /// Gain applied to the video's own audio
        #[arg(long, default_value = "1.0")]
        video_gain: f64,

        /// Gain applied to the added audio
        #[arg(long, default_value = "1.0")]
        audio_gain: f64,

        /// Directory for the result
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Turn a still image and an audio track into a 1080p video
    ImageVideo {
        /// Image file
        image: PathBuf,

        /// Audio file
        audio: PathBuf,

        /// Directory for the result
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Upload files to Google Drive
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Drive folder id (defaults to the configured folder)
        #[arg(long)]
        folder_id: Option<String>,
    },

    /// Report which external tools are available
    Check,

    /// Print the effective configuration
    Config {
        /// Write it to the config file instead
        #[arg(long)]
        write: bool,
    },
}
