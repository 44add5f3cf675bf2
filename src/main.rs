//! ytdlr - Video Download and Karaoke Toolkit
//!
//! Entry point: parses the command line, sets up logging and configuration,
//! detects the external tools once, then dispatches to the pipeline.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ytdlr::artifacts::{ArtifactRegistry, Session};
use ytdlr::cli::{Args, Commands, UploadArgs};
use ytdlr::config::Config;
use ytdlr::fetch::{MediaFetcher, YtDlpFetcher};
use ytdlr::media::{MixLevels, TranscoderFactory};
use ytdlr::naming::sanitize;
use ytdlr::operations::{OperationKind, OperationState, ProgressObserver};
use ytdlr::setup::Capabilities;
use ytdlr::upload::{DriveUploader, Uploader};
use ytdlr::workflow::{OperationRequest, Pipeline, RunReport, ToolRequest};

const DEFAULT_CONFIG_FILE: &str = "ytdlr.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = if config_path.exists() {
        info!("Loading configuration from {}", config_path.display());
        Config::from_file(&config_path)?
    } else if args.config.is_some() {
        bail!("Config file {} does not exist", config_path.display());
    } else {
        Config::default()
    };

    // Detect external tools once; everything downstream uses this value
    let capabilities = Capabilities::detect(&config);
    if !capabilities.transcoder {
        warn!("ffmpeg not found. Video processing will be limited.");
    }

    match args.command {
        Commands::Info { url } => {
            capabilities.require_fetcher()?;
            let fetcher = YtDlpFetcher::new(config.fetcher.clone());
            let video = fetcher.probe(&url).await?;

            println!("\nTitle: {}", video.title);
            if let Some(thumbnail) = &video.thumbnail {
                println!("Thumbnail: {}", thumbnail);
            }
            println!("\nAvailable Resolutions:");
            for (i, height) in video.heights().iter().enumerate() {
                println!("{}. {}p", i + 1, height);
            }
        }
        Commands::Download {
            url,
            height,
            output_dir,
            operations,
            upload,
            json,
        } => {
            capabilities.require_fetcher()?;
            let fetcher = YtDlpFetcher::new(config.fetcher.clone());
            let mut session = Session::new();
            session.begin(&url);

            let video = fetcher.probe(&url).await?;
            info!("Title: {}", video.title);

            let heights = video.heights();
            let height = match height {
                Some(h) if heights.contains(&h) => h,
                Some(h) => bail!(
                    "{}p is not available; choose one of: {}",
                    h,
                    format_heights(&heights)
                ),
                None => *heights
                    .first()
                    .ok_or_else(|| anyhow!("No suitable video formats found"))?,
            };

            let output_dir = output_dir.unwrap_or_else(|| config.output.directory.clone());
            tokio::fs::create_dir_all(&output_dir).await?;
            let dest = output_dir.join(format!("{}.mp4", sanitize(&video.title)));

            let spinner = spinner(format!("Downloading {}p...", height));
            let downloaded = fetcher.download(&url, height, &dest).await;
            spinner.finish_and_clear();
            downloaded?;
            println!("✅ Downloaded: {}", dest.display());

            let pipeline = Pipeline::from_config(&config, capabilities);
            let report = run_with_spinner(pipeline, &dest, &operations.to_request()).await;
            session.replace(report.registry.clone());

            print_report(&report, json)?;
            upload_selected(session.registry(), &upload, &config).await?;
        }
        Commands::Process {
            input,
            operations,
            upload,
            json,
        } => {
            if !input.is_file() {
                bail!("Input file not found: {}", input.display());
            }
            let pipeline = Pipeline::from_config(&config, capabilities);
            let report = run_with_spinner(pipeline, &input, &operations.to_request()).await;

            print_report(&report, json)?;
            upload_selected(&report.registry, &upload, &config).await?;
        }
        Commands::ReplaceAudio {
            video,
            audio,
            output_dir,
        } => {
            let request = ToolRequest::ReplaceAudio { video, audio };
            run_tool(&config, capabilities, request, output_dir).await?;
        }
        Commands::MixAudio {
            video,
            audio,
            video_gain,
            audio_gain,
            output_dir,
        } => {
            let levels = MixLevels {
                video_gain,
                audio_gain,
            };
            let request = ToolRequest::MixAudio {
                video,
                audio,
                levels,
            };
            run_tool(&config, capabilities, request, output_dir).await?;
        }
        Commands::ImageVideo {
            image,
            audio,
            output_dir,
        } => {
            let request = ToolRequest::ImageToVideo { image, audio };
            run_tool(&config, capabilities, request, output_dir).await?;
        }
        Commands::Upload { files, folder_id } => {
            let uploader = DriveUploader::new(config.upload.clone())?;
            let folder_id = folder_id.unwrap_or_else(|| config.upload.default_folder_id.clone());

            let mut failed = 0;
            for file in &files {
                match uploader.upload(file, &folder_id).await {
                    Ok(link) => println!("Uploaded {}: {}", file.display(), link),
                    Err(e) => {
                        failed += 1;
                        eprintln!("❌ Upload of {} failed: {}", file.display(), e);
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} uploads failed", failed, files.len());
            }
        }
        Commands::Check => {
            println!("\n{:<12} {:<10} {:<50}", "Capability", "Binary", "Status");
            println!("{}", "-".repeat(72));
            for status in Capabilities::report(&config) {
                let resolved = match &status.resolved {
                    Some(path) => path.display().to_string(),
                    None => "Missing".to_string(),
                };
                println!("{:<12} {:<10} {:<50}", status.capability, status.binary, resolved);
            }
            if capabilities.transcoder {
                let transcoder = TranscoderFactory::create_transcoder(config.media.clone());
                match transcoder.get_version_info().await {
                    Ok(version) => println!("\n{}", version),
                    Err(e) => warn!("Could not read transcoder version: {}", e),
                }
            }
        }
        Commands::Config { write } => {
            if write {
                config.save_to_file(&config_path)?;
                println!("Configuration written to {}", config_path.display());
            } else {
                print!("{}", config.to_toml()?);
            }
        }
    }

    Ok(())
}

/// Renders operation state changes on a spinner
struct SpinnerProgress {
    bar: ProgressBar,
}

impl ProgressObserver for SpinnerProgress {
    fn on_state(&self, operation: OperationKind, state: OperationState) {
        match state {
            OperationState::Running => self.bar.set_message(format!("Running {}...", operation)),
            OperationState::Succeeded => self.bar.println(format!("✅ {} done", operation)),
            OperationState::Failed => self.bar.println(format!("❌ {} failed", operation)),
            OperationState::Pending | OperationState::Validating => {}
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message(message);
    bar
}

async fn run_with_spinner(
    pipeline: Pipeline,
    source: &Path,
    request: &OperationRequest,
) -> RunReport {
    let bar = spinner("Processing...".to_string());
    let pipeline = pipeline.with_progress(Arc::new(SpinnerProgress { bar: bar.clone() }));
    let report = pipeline.run(source, request).await;
    bar.finish_and_clear();
    report
}

async fn run_tool(
    config: &Config,
    capabilities: Capabilities,
    request: ToolRequest,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let work_dir = output_dir.unwrap_or_else(|| config.output.directory.clone());
    let bar = spinner(format!("Running {}...", request.kind()));
    let pipeline = Pipeline::from_config(config, capabilities)
        .with_progress(Arc::new(SpinnerProgress { bar: bar.clone() }));

    let report = pipeline.run_tool(&request, &work_dir).await;
    bar.finish_and_clear();

    print_report(&report, false)?;
    if !report.all_succeeded() {
        bail!("{} failed", request.kind());
    }
    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.registry)?);
        return Ok(());
    }

    let cwd = std::env::current_dir().unwrap_or_default();
    println!("\n📂 Files Ready");
    println!("{:<22} {:<60}", "Artifact", "Path");
    println!("{}", "-".repeat(82));
    for asset in report.registry.iter() {
        let shown = pathdiff::diff_paths(&asset.path, &cwd).unwrap_or_else(|| asset.path.clone());
        println!("{:<22} {:<60}", asset.kind.label(), shown.display());
    }

    for outcome in report.failures() {
        if let Some(e) = outcome.error() {
            println!("❌ {} failed: {}", outcome.operation, e);
        }
    }

    let elapsed = report.finished_at - report.started_at;
    info!("Run took {}s", elapsed.num_seconds());
    Ok(())
}

async fn upload_selected(
    registry: &ArtifactRegistry,
    upload: &UploadArgs,
    config: &Config,
) -> Result<()> {
    if !upload.upload {
        return Ok(());
    }

    let folder_id = upload
        .folder_id
        .clone()
        .unwrap_or_else(|| config.upload.default_folder_id.clone());
    let uploader = DriveUploader::new(config.upload.clone()).context("Failed to create uploader")?;

    println!("\n☁️ Uploading to Google Drive");
    for asset in registry.upload_selection(upload.upload_all) {
        let spinner = spinner(format!("Uploading {}...", asset.path.display()));
        let result = uploader.upload(&asset.path, &folder_id).await;
        spinner.finish_and_clear();

        // One failed upload does not stop the others
        match result {
            Ok(link) => println!("Uploaded {}: {}", asset.kind.label(), link),
            Err(e) => eprintln!("❌ Upload of {} failed: {}", asset.path.display(), e),
        }
    }
    Ok(())
}

fn format_heights(heights: &[u32]) -> String {
    heights
        .iter()
        .map(|h| format!("{}p", h))
        .collect::<Vec<_>>()
        .join(", ")
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".ytdlr").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "ytdlr.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("ytdlr.log").display());

    Ok(())
}
