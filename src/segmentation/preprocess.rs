use crate::raster::AlphaMask;
use anyhow::Result;
use image::{imageops, RgbImage};
use ndarray::Array4;

/// Memory layout expected by a model's image input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[1, 3, H, W]`
    Nchw,
    /// `[1, H, W, 3]`, used by the MediaPipe family of models
    Nhwc,
}

/// Preprocessor for converting RGB images to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
    layout: TensorLayout,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32, layout: TensorLayout) -> Self {
        Self {
            target_width,
            target_height,
            layout,
        }
    }

    pub fn input_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Preprocess an RGB image into a normalized tensor
    ///
    /// Steps:
    /// 1. Resize (stretch) to target dimensions
    /// 2. Convert to float and normalize to [0, 1]
    /// 3. Lay out as NCHW or NHWC
    pub fn preprocess(&self, image: &RgbImage) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized;
        let source = if image.dimensions() != (self.target_width, self.target_height) {
            resized = imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            );
            &resized
        } else {
            image
        };

        let (width, height) = source.dimensions();
        let (w, h) = (width as usize, height as usize);
        let mut tensor = match self.layout {
            TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, h, w)),
            TensorLayout::Nhwc => Array4::<f32>::zeros((1, h, w, 3)),
        };

        for (x, y, pixel) in source.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                match self.layout {
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                }
            }
        }

        Ok(tensor)
    }

    /// Resize a model-resolution mask back to frame dimensions
    ///
    /// # Arguments
    /// * `values` - Flattened mask at model resolution, row-major
    /// * `mask_width`, `mask_height` - Model output size
    /// * `target_width`, `target_height` - Frame size
    pub fn postprocess_mask(
        values: Vec<f32>,
        mask_width: u32,
        mask_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> Result<AlphaMask> {
        let _span = tracing::debug_span!("postprocess").entered();

        let mask = AlphaMask::from_vec(mask_width, mask_height, values)?;
        Ok(mask.resized(target_width, target_height))
    }
}

/// Downsample a frame to `target_width`, preserving aspect ratio.
pub fn downsample_to_width(frame: &RgbImage, target_width: u32) -> RgbImage {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 || width <= target_width {
        return frame.clone();
    }
    let aspect = width as f32 / height as f32;
    let target_height = ((target_width as f32 / aspect).round() as u32).max(1);
    imageops::resize(
        frame,
        target_width,
        target_height,
        imageops::FilterType::Triangle,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;

    #[test]
    fn nhwc_tensor_keeps_channels_last() {
        let mut image = RgbImage::from_pixel(4, 2, Rgb([0, 0, 0]));
        image.put_pixel(3, 1, Rgb([255, 51, 0]));
        let pre = Preprocessor::new(4, 2, TensorLayout::Nhwc);
        let tensor = pre.preprocess(&image).unwrap();
        assert_eq!(tensor.shape(), &[1, 2, 4, 3]);
        assert_relative_eq!(tensor[[0, 1, 3, 0]], 1.0);
        assert_relative_eq!(tensor[[0, 1, 3, 1]], 0.2);
    }

    #[test]
    fn nchw_tensor_keeps_channels_first() {
        let image = RgbImage::from_pixel(8, 8, Rgb([255, 0, 0]));
        let pre = Preprocessor::new(4, 4, TensorLayout::Nchw);
        let tensor = pre.preprocess(&image).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 4, 4]);
        assert_relative_eq!(tensor[[0, 0, 2, 2]], 1.0);
        assert_relative_eq!(tensor[[0, 1, 2, 2]], 0.0);
    }

    #[test]
    fn postprocess_rejects_short_output() {
        assert!(Preprocessor::postprocess_mask(vec![0.0; 3], 2, 2, 4, 4).is_err());
    }

    #[test]
    fn downsample_preserves_aspect() {
        let frame = RgbImage::new(1280, 720);
        let small = downsample_to_width(&frame, 256);
        assert_eq!(small.dimensions(), (256, 144));
    }

    #[test]
    fn downsample_never_upscales() {
        let frame = RgbImage::new(200, 100);
        assert_eq!(downsample_to_width(&frame, 256).dimensions(), (200, 100));
    }
}
