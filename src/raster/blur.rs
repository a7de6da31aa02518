use super::AlphaMask;

/// Number of box passes used to approximate a Gaussian.
const BOX_PASSES: usize = 3;

/// Radii of the box filters whose repeated application approximates a
/// Gaussian of standard deviation `sigma`.
pub fn box_radii_for_gaussian(sigma: f32, passes: usize) -> Vec<usize> {
    if sigma <= 0.0 || passes == 0 {
        return Vec::new();
    }
    let n = passes as f32;
    let ideal = (12.0 * sigma * sigma / n + 1.0).sqrt();
    let mut lower = ideal.floor() as i64;
    if lower % 2 == 0 {
        lower -= 1;
    }
    let lower = lower.max(1);
    let upper = lower + 2;
    let lf = lower as f32;
    let m = ((12.0 * sigma * sigma - n * lf * lf - 4.0 * n * lf - 3.0 * n) / (-4.0 * lf - 4.0))
        .round()
        .max(0.0) as usize;

    (0..passes)
        .map(|i| {
            let size = if i < m { lower } else { upper };
            ((size - 1) / 2) as usize
        })
        .collect()
}

/// Total reach in pixels of the Gaussian approximation for `sigma`.
pub fn blur_support(sigma: f32) -> usize {
    box_radii_for_gaussian(sigma, BOX_PASSES).iter().sum()
}

/// Gaussian blur of an alpha mask, in place.
///
/// Pixels outside the raster count as fully transparent, so blurring a
/// shape spreads it outward and pulls alpha in at the frame border.
/// `scratch` is reused between calls to keep the hot path allocation free.
pub fn gaussian_blur(mask: &mut AlphaMask, sigma: f32, scratch: &mut Vec<f32>) {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    if sigma <= 0.0 || w == 0 || h == 0 {
        return;
    }

    scratch.resize(w * h, 0.0);
    let data = mask.data_mut();
    for radius in box_radii_for_gaussian(sigma, BOX_PASSES) {
        if radius == 0 {
            continue;
        }
        box_blur_horizontal(data, scratch, w, h, radius);
        box_blur_vertical(scratch, data, w, h, radius);
    }
    // Running sums leave float residue far from any content.
    for v in data.iter_mut() {
        *v = if *v < 1e-6 { 0.0 } else { v.min(1.0) };
    }
}

/// Convenience wrapper returning a blurred copy.
pub fn gaussian_blurred(mask: &AlphaMask, sigma: f32) -> AlphaMask {
    let mut out = mask.clone();
    let mut scratch = Vec::new();
    gaussian_blur(&mut out, sigma, &mut scratch);
    out
}

// Running-sum box filter: src → dst, zero padded.
fn box_blur_horizontal(src: &[f32], dst: &mut [f32], w: usize, h: usize, r: usize) {
    let norm = 1.0 / (2 * r + 1) as f32;
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        let out = &mut dst[y * w..(y + 1) * w];
        let mut acc: f32 = row[..=r.min(w - 1)].iter().sum();
        for x in 0..w {
            out[x] = acc * norm;
            if x + r + 1 < w {
                acc += row[x + r + 1];
            }
            if x >= r {
                acc -= row[x - r];
            }
        }
    }
}

fn box_blur_vertical(src: &[f32], dst: &mut [f32], w: usize, h: usize, r: usize) {
    let norm = 1.0 / (2 * r + 1) as f32;
    for x in 0..w {
        let mut acc = 0.0f32;
        for y in 0..=r.min(h - 1) {
            acc += src[y * w + x];
        }
        for y in 0..h {
            dst[y * w + x] = acc * norm;
            if y + r + 1 < h {
                acc += src[(y + r + 1) * w + x];
            }
            if y >= r {
                acc -= src[(y - r) * w + x];
            }
        }
    }
}
