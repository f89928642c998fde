//! Reframe - Video Frame-Sequence Transformation Pipeline
//!
//! Command line driver: loads configuration, sets up logging and runs the
//! pipeline over a single file or a directory of uploads.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use reframe::cli::{Args, Commands};
use reframe::config::Config;
use reframe::media::{FrameCodec, FrameCodecFactory};
use reframe::pipeline::{Pipeline, PipelineResult};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    info!("Starting Reframe - Video Frame-Sequence Transformation Pipeline");

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load reframe.toml from current directory first
            if Path::new("reframe.toml").exists() {
                info!("Found reframe.toml in current directory, loading...");
                Config::from_file("reframe.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Probe { input } => {
            let codec = FrameCodecFactory::create_codec(&config);
            codec.check_availability()?;
            let info = codec.probe(&input).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Process { input, transform, output_dir } => {
            info!("Processing media file: {}", input.display());
            let request = transform.to_request()?;
            override_output_dir(&mut config, output_dir);
            config.ensure_directories()?;

            let pipeline = Pipeline::from_config(config)?;
            let result = PipelineResult::from_outcome(pipeline.process(&input, &request).await);
            println!("{}", serde_json::to_string_pretty(&result)?);

            if let PipelineResult::Error { message, .. } = result {
                anyhow::bail!(message);
            }
        }
        Commands::Batch { input_dir, transform, output_dir } => {
            let request = transform.to_request()?;
            override_output_dir(&mut config, output_dir);
            config.ensure_directories()?;

            let input_dir = input_dir.unwrap_or_else(|| config.paths.upload_dir.clone());
            info!("Processing directory: {}", input_dir.display());

            let pipeline = Pipeline::from_config(config)?;
            let progress = make_progress_bar();
            let results = pipeline
                .process_directory(&input_dir, &request, |done, total, path, _| {
                    progress.set_length(total as u64);
                    progress.set_position(done as u64);
                    progress.set_message(file_label(path));
                })
                .await?;
            progress.finish_and_clear();

            let failures = results.iter().filter(|(_, result)| !result.is_ok()).count();
            let results: Vec<_> = results
                .into_iter()
                .map(|(path, result)| serde_json::json!({ "source": path, "result": result }))
                .collect();

            println!("{}", serde_json::to_string_pretty(&results)?);
            info!("Batch finished: {} processed, {} failed", results.len(), failures);
        }
    }

    info!("Reframe completed successfully");
    Ok(())
}

fn override_output_dir(config: &mut Config, output_dir: Option<PathBuf>) {
    if let Some(dir) = output_dir {
        config.paths.output_dir = dir;
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn make_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}] {msg}") {
        bar.set_style(style.progress_chars("##-"));
    }
    bar
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let reframe_dir = std::env::current_dir()?.join(".reframe");
    let log_dir = reframe_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "reframe.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console goes to stderr so stdout stays clean JSON
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("reframe.log").display()
    );

    Ok(())
}
