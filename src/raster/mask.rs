use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RasterError {
    #[error("raster data has {actual} values, expected {expected} for {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Alpha raster: 0.0 = transparent (background), 1.0 = opaque (foreground).
///
/// Stored row-major, one `f32` per pixel, the same layout the segmentation
/// backends produce.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl AlphaMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RasterError::SizeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> f32,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y).clamp(0.0, 1.0));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let idx = self.index(x, y);
        self.data[idx] = value.clamp(0.0, 1.0);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Reallocate to `width`x`height` if the size differs, clearing the
    /// contents. Returns whether a reallocation happened.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        if self.dimensions() == (width, height) {
            return false;
        }
        self.width = width;
        self.height = height;
        self.data = vec![0.0; width as usize * height as usize];
        true
    }

    /// Overwrite this mask with `other`, resizing if needed.
    pub fn copy_from(&mut self, other: &AlphaMask) {
        self.ensure_size(other.width, other.height);
        self.data.copy_from_slice(&other.data);
    }

    /// True when every pixel is fully transparent.
    pub fn is_clear(&self) -> bool {
        self.data.iter().all(|&a| a <= 0.0)
    }

    /// Number of pixels with alpha above `threshold`
    pub fn count_above(&self, threshold: f32) -> usize {
        self.data.iter().filter(|&&a| a > threshold).count()
    }

    /// Bilinear resize, used when a model returns a mask at its own input
    /// resolution.
    pub fn resized(&self, width: u32, height: u32) -> AlphaMask {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(self.width, self.height, |x, y| Luma([self.get(x, y)]));
        let resized = image::imageops::resize(
            &buffer,
            width,
            height,
            image::imageops::FilterType::Triangle,
        );
        AlphaMask {
            width,
            height,
            data: resized
                .into_raw()
                .into_iter()
                .map(|a| a.clamp(0.0, 1.0))
                .collect(),
        }
    }

    /// Grayscale visualization of the mask
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([(self.get(x, y) * 255.0).round().clamp(0.0, 255.0) as u8])
        })
    }

    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let v = (self.get(x, y) * 255.0).round().clamp(0.0, 255.0) as u8;
            image::Rgb([v, v, v])
        })
    }
}

/// Cut `src` out of `dst`: `dst *= 1 - amount * src`.
///
/// `amount` scales how much of `src` is removed (the global alpha of the
/// cut-out draw).
pub fn subtract_alpha(dst: &mut AlphaMask, src: &AlphaMask, amount: f32) {
    debug_assert_eq!(dst.dimensions(), src.dimensions());
    let amount = amount.clamp(0.0, 1.0);
    for (d, &s) in dst.data.iter_mut().zip(src.data.iter()) {
        *d *= 1.0 - amount * s;
    }
}

/// Draw `src` over `dst` with standard source-over alpha:
/// `dst = src + dst * (1 - src)`.
pub fn union_alpha(dst: &mut AlphaMask, src: &AlphaMask) {
    debug_assert_eq!(dst.dimensions(), src.dimensions());
    for (d, &s) in dst.data.iter_mut().zip(src.data.iter()) {
        *d = s + *d * (1.0 - s);
    }
}

/// Copy `src` over `dst` weighted by `mask`:
/// `dst = dst * (1 - a) + src * a`.
pub fn masked_copy(dst: &mut RgbImage, src: &RgbImage, mask: &AlphaMask) {
    debug_assert_eq!(dst.dimensions(), src.dimensions());
    debug_assert_eq!(dst.dimensions(), mask.dimensions());
    for ((d, s), &a) in dst
        .pixels_mut()
        .zip(src.pixels())
        .zip(mask.data.iter())
    {
        if a <= 0.0 {
            continue;
        }
        if a >= 1.0 {
            *d = *s;
            continue;
        }
        for c in 0..3 {
            let v = d[c] as f32 * (1.0 - a) + s[c] as f32 * a;
            d[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}
