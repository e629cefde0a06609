use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image_insight::config::AppConfig;
use image_insight::upload::UploadedImage;
use image_insight::{build_processor, web_server};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "image-insight", version, about = "Image metadata extraction and AI analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Print the normalized metadata of an image as JSON
    Inspect { path: PathBuf },
    /// Extract metadata and analyze an image with the hosted model
    Analyze {
        path: PathBuf,
        /// Free-text context to guide the analysis
        #[arg(short, long)]
        context: Option<String>,
    },
}

async fn read_upload(path: &Path) -> Result<UploadedImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(UploadedImage::new(file_name, mime_type, bytes))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new()?;

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting image-insight");

    let processor = build_processor(&config)?;

    match cli.command {
        Command::Serve => {
            if let Err(e) = web_server::start_web_server(Arc::new(config), processor).await {
                log::error!("Web server error: {}", e);
            }
        }
        Command::Inspect { path } => {
            let upload = read_upload(&path).await?;
            let record = processor.normalizer().normalize(&upload).await;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Analyze { path, context } => {
            let upload = read_upload(&path).await?;
            let outcome = processor.process(&upload, context.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);
            if let Err(e) = outcome.analysis {
                anyhow::bail!(e);
            }
        }
    }

    info!("image-insight finished");

    Ok(())
}
