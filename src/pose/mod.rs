mod blazepose;
pub mod landmarks;

pub use blazepose::BlazePoseLandmarker;
pub use landmarks::{Landmark, LandmarkIndex, PoseResult, Side};

use anyhow::Result;
use image::RgbImage;

/// Trait for body landmark models
pub trait PoseModel {
    /// Detect the subject's landmarks on a (downsampled) frame
    ///
    /// # Returns
    /// * `Ok(None)` when no subject is detected
    /// * Landmarks normalized to the input frame otherwise
    fn detect(&mut self, frame: &RgbImage) -> Result<Option<PoseResult>>;
}

/// Create the default pose model (BlazePose full)
pub fn create_default_model(model_path: &str) -> Result<Box<dyn PoseModel>> {
    let model = BlazePoseLandmarker::new(model_path)?;
    Ok(Box::new(model))
}
