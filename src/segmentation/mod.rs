mod preprocess;
mod selfie;
pub mod types;

pub use preprocess::{downsample_to_width, Preprocessor, TensorLayout};
pub use selfie::SelfieSegmenter;
pub use types::{SegmentationModel, SegmentationResult};

use anyhow::Result;

/// Create the default segmentation model (landscape selfie segmenter)
pub fn create_default_model(model_path: &str) -> Result<Box<dyn SegmentationModel>> {
    let model = SelfieSegmenter::new(model_path)?;
    Ok(Box::new(model))
}
