//! Single-image classification around an ONNX model: resolve an image
//! reference (path or URL), build a label table, run one forward pass, and
//! rank the top-K predictions.

pub mod classifier;
pub mod fetch;
pub mod labels;
pub mod model;
pub mod ranking;
pub mod verdict;
