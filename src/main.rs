use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use mycoscan::config::{RunConfig, RunMode};
use mycoscan::predict;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a pre-trained classifier (ONNX file)
    ///
    /// The annotation level and tile size are derived from the model's
    /// input shape, overriding --level
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Annotation level (RootSegm or IRStruct)
    #[arg(long, default_value = "RootSegm")]
    level: String,

    /// Prediction batch size within a tile row
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Mosaic images to predict
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Mycoscan starting");
    tracing::info!("Annotation level: {}", args.level);
    tracing::info!("Batch size: {}", args.batch_size);
    tracing::info!("Images: {}", args.images.len());

    let config = RunConfig::new(RunMode::Predict, args.model, &args.level, args.batch_size);

    predict::run(&args.images, &config)
}
