//! Classifies one image with a retrained model and a flat labels file,
//! printing the top predictions and, when the five-category face labels are
//! present, a derived verdict.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use image_classify::{
    classifier::{EngineConfig, InferenceEngine, OrtEngine},
    fetch::{FetchConfig, resolve_image},
    labels::load_flat_labels,
    ranking::top_k,
    verdict::{FaceScores, judge},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify one image with a retrained model")]
struct Args {
    /// Path or URL of the image to classify.
    #[arg(long)]
    image: String,

    /// Path to the model file.
    #[arg(long)]
    graph: PathBuf,

    /// Path to the newline-delimited labels file, one label per class.
    #[arg(long)]
    labels: PathBuf,

    /// Name of the input tensor.
    #[arg(long, default_value = "input")]
    input_layer: String,

    /// Name of the softmax output tensor.
    #[arg(long, default_value = "final_result")]
    output_layer: String,

    /// Square input side length the image is resized to.
    #[arg(long, default_value_t = 224)]
    input_size: u32,

    #[arg(long, default_value_t = 0.0)]
    input_mean: f32,

    #[arg(long, default_value_t = 255.0)]
    input_std: f32,

    /// Display this many predictions.
    #[arg(long, default_value_t = 5)]
    num_top_predictions: usize,

    /// Directory for cached downloaded images.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut fetch_config = FetchConfig::default();
    if let Some(dir) = &args.cache_dir {
        fetch_config.cache_dir = dir.clone();
    }

    let image_path = resolve_image(&args.image, &fetch_config)?;
    if !image_path.exists() {
        bail!("image file does not exist: {}", image_path.display());
    }
    if !args.graph.exists() {
        bail!("graph file does not exist: {}", args.graph.display());
    }

    let labels = load_flat_labels(&args.labels)?;
    log::info!("loaded {} labels from {}", labels.len(), args.labels.display());

    let image = image::open(&image_path)
        .with_context(|| format!("failed to open image {}", image_path.display()))?;

    let mut engine = OrtEngine::load(
        &args.graph,
        EngineConfig {
            input_layer: args.input_layer,
            output_layer: args.output_layer,
            input_size: args.input_size,
            input_mean: args.input_mean,
            input_std: args.input_std,
        },
    )?;
    let probs = engine.predict(&image)?;

    if probs.len() != labels.len() {
        log::warn!(
            "model produced {} scores but the labels file has {} entries",
            probs.len(),
            labels.len()
        );
    }

    for prediction in top_k(&probs, args.num_top_predictions) {
        let name = labels
            .get(prediction.class_id)
            .map(String::as_str)
            .unwrap_or("");
        println!("{name} (score = {:.5})", prediction.score);
    }

    if let Some(scores) = FaceScores::from_labels(&labels, &probs) {
        println!("{}", judge(&scores));
    }

    Ok(())
}
