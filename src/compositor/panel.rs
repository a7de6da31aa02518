use image::RgbImage;

/// Axis-aligned rounded rectangle, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Panel {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub radius: f32,
}

impl Panel {
    /// Coverage of pixel (`px`, `py`) with anti-aliased corners.
    fn coverage(&self, px: i32, py: i32) -> f32 {
        let r = self
            .radius
            .min(self.width as f32 / 2.0)
            .min(self.height as f32 / 2.0)
            .max(0.0);
        let (fx, fy) = (px as f32 + 0.5, py as f32 + 0.5);
        let left = self.x as f32 + r;
        let right = (self.x + self.width) as f32 - r;
        let top = self.y as f32 + r;
        let bottom = (self.y + self.height) as f32 - r;

        let cx = fx.clamp(left, right);
        let cy = fy.clamp(top, bottom);
        if cx == fx || cy == fy {
            return 1.0;
        }
        let d = ((fx - cx).powi(2) + (fy - cy).powi(2)).sqrt();
        (r + 0.5 - d).clamp(0.0, 1.0)
    }

    /// Blend `color` over the panel area at `alpha`.
    pub fn fill(&self, img: &mut RgbImage, color: [u8; 3], alpha: f32) {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + self.width).min(img.width() as i32);
        let y1 = (self.y + self.height).min(img.height() as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                let a = alpha * self.coverage(px, py);
                if a <= 0.0 {
                    continue;
                }
                let pixel = img.get_pixel_mut(px as u32, py as u32);
                for c in 0..3 {
                    let v = pixel[c] as f32 * (1.0 - a) + color[c] as f32 * a;
                    pixel[c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}

/// Copy `src` into `img` with its top-left corner at (`x`, `y`).
pub fn blit(img: &mut RgbImage, src: &RgbImage, x: i32, y: i32) {
    for (sx, sy, pixel) in src.enumerate_pixels() {
        let (dx, dy) = (x + sx as i32, y + sy as i32);
        if dx >= 0 && dy >= 0 && dx < img.width() as i32 && dy < img.height() as i32 {
            img.put_pixel(dx as u32, dy as u32, *pixel);
        }
    }
}
