//! Classifies one image with an ImageNet model, looking class IDs up
//! through the synset label maps shipped alongside the model. The model
//! bundle is downloaded and extracted into `--model-dir` when absent.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use image_classify::{
    classifier::{EngineConfig, InferenceEngine, OrtEngine},
    fetch::{FetchConfig, resolve_image},
    labels::NodeLookup,
    model,
    ranking::top_k,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify one image with an ImageNet model")]
struct Args {
    /// Directory holding the model file and its label maps.
    #[arg(long)]
    model_dir: PathBuf,

    /// URL of a .tar.gz bundle to download into the model directory when
    /// the model file is missing.
    #[arg(long)]
    archive_url: Option<String>,

    /// Path or URL of the image to classify.
    #[arg(long)]
    image_file: String,

    /// Optional localized synset map laid over the default display strings.
    #[arg(long)]
    localized_labels: Option<PathBuf>,

    /// Name of the input tensor.
    #[arg(long, default_value = "input")]
    input_layer: String,

    /// Name of the softmax output tensor.
    #[arg(long, default_value = "softmax")]
    output_layer: String,

    /// Square input side length the image is resized to.
    #[arg(long, default_value_t = 299)]
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

    model::ensure_bundle_ready(&args.model_dir, args.archive_url.as_deref())?;

    let lookup = NodeLookup::load(
        &model::label_map_path(&args.model_dir),
        &model::synset_map_path(&args.model_dir),
        args.localized_labels.as_deref(),
    )?;
    log::info!("label lookup table holds {} classes", lookup.len());

    let mut fetch_config = FetchConfig::default();
    if let Some(dir) = &args.cache_dir {
        fetch_config.cache_dir = dir.clone();
    }

    let image_path = resolve_image(&args.image_file, &fetch_config)?;
    if !image_path.exists() {
        bail!("image file does not exist: {}", image_path.display());
    }
    let image = image::open(&image_path)
        .with_context(|| format!("failed to open image {}", image_path.display()))?;

    let mut engine = OrtEngine::load(
        &model::model_path(&args.model_dir),
        EngineConfig {
            input_layer: args.input_layer,
            output_layer: args.output_layer,
            input_size: args.input_size,
            input_mean: args.input_mean,
            input_std: args.input_std,
        },
    )?;
    let probs = engine.predict(&image)?;

    for prediction in top_k(&probs, args.num_top_predictions) {
        println!(
            "{} (score = {:.5})",
            lookup.display_name(prediction.class_id),
            prediction.score
        );
    }

    Ok(())
}
