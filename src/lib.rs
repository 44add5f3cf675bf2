//! ytdlr - Video Download and Karaoke Toolkit
//!
//! Downloads videos with yt-dlp, then derives new files from them: karaoke
//! versions via demucs, and muted, looped, clipped or re-scored edits via
//! ffmpeg. Results can be uploaded to Google Drive.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod operations;
pub mod artifacts;
pub mod naming;
pub mod duration;
pub mod media;
pub mod separator;
pub mod fetch;
pub mod upload;
pub mod error;
pub mod setup;
