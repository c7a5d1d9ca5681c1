//! The inference boundary: preprocessing an image into an input tensor and
//! running one forward pass through an ONNX session.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, imageops::FilterType};
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Name of the graph's input tensor.
    pub input_layer: String,
    /// Name of the softmax output tensor.
    pub output_layer: String,
    /// Square side length the image is resized to before feeding.
    pub input_size: u32,
    pub input_mean: f32,
    pub input_std: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_layer: "input".to_string(),
            output_layer: "softmax".to_string(),
            input_size: 299,
            input_mean: 0.0,
            input_std: 255.0,
        }
    }
}

/// The one contract the pipeline has with the inference engine: given a
/// decoded image, return the probability vector over the model's classes.
pub trait InferenceEngine {
    fn predict(&mut self, image: &DynamicImage) -> Result<Vec<f32>>;
}

pub struct OrtEngine {
    session: Session,
    config: EngineConfig,
}

impl OrtEngine {
    pub fn load(model_path: &Path, config: EngineConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        Ok(Self { session, config })
    }
}

impl InferenceEngine for OrtEngine {
    fn predict(&mut self, image: &DynamicImage) -> Result<Vec<f32>> {
        let input = prepare_input(
            image,
            self.config.input_size,
            self.config.input_mean,
            self.config.input_std,
        );
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.config.input_layer.as_str() => tensor])
            .context("failed to run ORT session")?;

        let output = outputs.get(self.config.output_layer.as_str()).ok_or_else(|| {
            anyhow!(
                "model has no output tensor named {:?}",
                self.config.output_layer
            )
        })?;
        let probs = output.try_extract_array::<f32>()?;

        // Squeeze [1, N] (or already-1-D) output down to the flat vector.
        Ok(probs.iter().copied().collect())
    }
}

/// Resizes to `size` x `size` and builds the NHWC float tensor, normalizing
/// each channel as `(px - mean) / std`.
pub fn prepare_input(image: &DynamicImage, size: u32, mean: f32, std: f32) -> Array4<f32> {
    let resized = image
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();

    let mut input = Array4::<f32>::zeros((1, size as usize, size as usize, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            input[[0, y as usize, x as usize, channel]] =
                (pixel.0[channel] as f32 - mean) / std;
        }
    }
    input
}
