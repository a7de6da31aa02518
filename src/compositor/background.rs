use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::config::CompositorConfig;

/// Smallest size of the downscaled image the blur background works on
const MIN_SMALL_WIDTH: u32 = 160;
const MIN_SMALL_HEIGHT: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundMode {
    #[default]
    Color,
    Blur,
    Image,
}

/// Selected background plus the image backing `Image` mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackgroundState {
    pub mode: BackgroundMode,
    pub image: Option<RgbImage>,
}

impl BackgroundState {
    pub fn color() -> Self {
        Self {
            mode: BackgroundMode::Color,
            image: None,
        }
    }

    pub fn blur() -> Self {
        Self {
            mode: BackgroundMode::Blur,
            image: None,
        }
    }

    pub fn image(image: RgbImage) -> Self {
        Self {
            mode: BackgroundMode::Image,
            image: Some(image),
        }
    }
}

/// Renders the background layer, reusing its intermediates across frames.
pub struct BackgroundRenderer {
    config: CompositorConfig,
    stretched: Option<RgbImage>,
}

impl BackgroundRenderer {
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            config,
            stretched: None,
        }
    }

    /// Drop cached intermediates after the selection changed.
    pub fn invalidate(&mut self) {
        self.stretched = None;
    }

    /// Working size of the blur background for a `width`x`height` frame.
    pub fn small_size(&self, width: u32, height: u32) -> (u32, u32) {
        let k = self.config.blur_downscale.max(1);
        (
            (width / k).max(MIN_SMALL_WIDTH),
            (height / k).max(MIN_SMALL_HEIGHT),
        )
    }

    /// Draw the background for `state` into `out`, sized like `frame`.
    pub fn render(&mut self, state: &BackgroundState, frame: &RgbImage, out: &mut RgbImage) {
        let (width, height) = frame.dimensions();
        match (state.mode, &state.image) {
            (BackgroundMode::Color, _) => {
                let fill = Rgb(self.config.background_color);
                for pixel in out.pixels_mut() {
                    *pixel = fill;
                }
            }
            (BackgroundMode::Blur, _) => {
                let (sw, sh) = self.small_size(width, height);
                let mut small = imageops::resize(frame, sw, sh, FilterType::Triangle);
                for _ in 0..self.config.blur_passes {
                    small = imageops::blur(&small, self.config.blur_px);
                }
                *out = imageops::resize(&small, width, height, FilterType::Triangle);
            }
            (BackgroundMode::Image, Some(image)) => {
                let stale = self
                    .stretched
                    .as_ref()
                    .map_or(true, |s| s.dimensions() != (width, height));
                if stale {
                    self.stretched =
                        Some(imageops::resize(image, width, height, FilterType::Triangle));
                }
                if let Some(stretched) = &self.stretched {
                    out.copy_from_slice(stretched.as_raw());
                }
            }
            (BackgroundMode::Image, None) => out.copy_from_slice(frame.as_raw()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn color_mode_fills_the_frame() {
        let mut renderer = BackgroundRenderer::new(CompositorConfig::default());
        let mut out = RgbImage::new(32, 18);
        renderer.render(&BackgroundState::color(), &frame(32, 18), &mut out);
        assert!(out.pixels().all(|p| *p == Rgb([0x10, 0x13, 0x18])));
    }

    #[test]
    fn small_size_has_a_floor() {
        let renderer = BackgroundRenderer::new(CompositorConfig::default());
        assert_eq!(renderer.small_size(1280, 720), (426, 240));
        assert_eq!(renderer.small_size(320, 180), (160, 90));
    }

    #[test]
    fn blur_mode_softens_edges_at_frame_size() {
        let mut renderer = BackgroundRenderer::new(CompositorConfig::default());
        let mut out = RgbImage::new(320, 180);
        renderer.render(&BackgroundState::blur(), &frame(320, 180), &mut out);
        assert_eq!(out.dimensions(), (320, 180));
        let edge = out.get_pixel(160, 90)[0];
        assert!(edge > 20 && edge < 235, "edge value {edge}");
    }

    #[test]
    fn image_mode_stretches_the_selection() {
        let mut renderer = BackgroundRenderer::new(CompositorConfig::default());
        let state = BackgroundState::image(RgbImage::from_pixel(4, 4, Rgb([10, 200, 30])));
        let mut out = RgbImage::new(64, 36);
        renderer.render(&state, &frame(64, 36), &mut out);
        assert!(out.pixels().all(|p| *p == Rgb([10, 200, 30])));
    }

    #[test]
    fn image_mode_without_image_shows_the_camera() {
        let mut renderer = BackgroundRenderer::new(CompositorConfig::default());
        let state = BackgroundState {
            mode: BackgroundMode::Image,
            image: None,
        };
        let camera = frame(16, 9);
        let mut out = RgbImage::new(16, 9);
        renderer.render(&state, &camera, &mut out);
        assert_eq!(out, camera);
    }
}
