use crate::raster::AlphaMask;
use anyhow::Result;
use image::RgbImage;

/// Output of one segmentation run, delivered to the draw path.
///
/// `image` is the frame the mask was computed from; the draw pass composites
/// that frame rather than whatever the camera produced since.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    pub image: RgbImage,
    pub mask: AlphaMask,
}

/// Trait for person segmentation models
/// Allows swapping between different backends (selfie segmenter, test fakes, etc.)
pub trait SegmentationModel {
    /// Process a frame and return a foreground probability mask
    ///
    /// # Arguments
    /// * `frame` - Input RGB frame
    ///
    /// # Returns
    /// * Mask with values 0.0-1.0 at the frame's dimensions
    fn segment(&mut self, frame: &RgbImage) -> Result<AlphaMask>;

    /// Get the model's preferred input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}
