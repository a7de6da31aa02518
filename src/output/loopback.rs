use super::OutputSink;
use anyhow::{bail, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

pub struct V4L2Output {
    // Held so the negotiated format stays attached to the device.
    _device: Device,
    file: File,
    width: u32,
    height: u32,
    yuyv: Vec<u8>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;
        let mut format = Output::format(&device).context("Failed to query output format")?;
        format.width = width;
        format.height = height;
        format.fourcc = FourCC::new(b"YUYV");
        let format = Output::set_format(&device, &format).context("Failed to set YUYV output format")?;
        let (requested_width, requested_height) = (width, height);
        let (width, height) = accepted_size(&format)?;
        if (width, height) != (requested_width, requested_height) {
            tracing::warn!(
                "Device accepted {}x{} instead of {}x{}; frames are scaled to match",
                width,
                height,
                requested_width,
                requested_height
            );
        }

        // v4l2loopback takes raw frames written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            _device: device,
            file,
            width,
            height,
            yuyv: Vec::with_capacity((width * height * 2) as usize),
        })
    }
}

/// Frame size the device agreed to; anything but YUYV is rejected.
fn accepted_size(format: &Format) -> Result<(u32, u32)> {
    if format.fourcc != FourCC::new(b"YUYV") {
        bail!("Device refused YUYV output (got {})", format.fourcc);
    }
    if format.width == 0 || format.height == 0 {
        bail!("Device reported an empty {}x{} frame", format.width, format.height);
    }
    Ok((format.width, format.height))
}

/// Pack an RGB frame as YUYV 4:2:2 into `out`, two pixels per four bytes
/// with chroma averaged over the pair.
fn rgb_to_yuyv(rgb: &RgbImage, out: &mut Vec<u8>) {
    let (width, height) = rgb.dimensions();
    out.clear();
    out.reserve((width.div_ceil(2) * 4 * height) as usize);

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let p1 = rgb.get_pixel(x, y);
            let p2 = if x + 1 < width {
                rgb.get_pixel(x + 1, y)
            } else {
                p1
            };

            let (y1, u1, v1) = rgb_to_yuv(p1[0], p1[1], p1[2]);
            let (y2, u2, v2) = rgb_to_yuv(p2[0], p2[1], p2[2]);
            let u = ((u1 as u16 + u2 as u16) / 2) as u8;
            let v = ((v1 as u16 + v2 as u16) / 2) as u8;

            out.extend_from_slice(&[y1, u, y2, v]);
        }
    }
}

/// BT.601 full-range conversion
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);

    let y = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;
    let u = (-0.169 * r - 0.331 * g + 0.5 * b + 128.0).round().clamp(0.0, 255.0) as u8;
    let v = (0.5 * r - 0.419 * g - 0.081 * b + 128.0).round().clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            let resized = imageops::resize(frame, self.width, self.height, FilterType::Triangle);
            rgb_to_yuyv(&resized, &mut self.yuyv);
        } else {
            rgb_to_yuyv(frame, &mut self.yuyv);
        }

        self.file
            .write_all(&self.yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn negotiated_size_wins_over_the_request() {
        let format = Format::new(640, 480, FourCC::new(b"YUYV"));
        assert_eq!(accepted_size(&format).unwrap(), (640, 480));

        let mut frame = Vec::new();
        let (width, height) = accepted_size(&format).unwrap();
        rgb_to_yuyv(&RgbImage::new(width, height), &mut frame);
        assert_eq!(frame.len(), 640 * 480 * 2);
    }

    #[test]
    fn other_pixel_formats_are_refused() {
        let format = Format::new(1280, 720, FourCC::new(b"MJPG"));
        assert!(accepted_size(&format).is_err());
    }

    #[test]
    fn grey_has_neutral_chroma() {
        assert_eq!(rgb_to_yuv(0, 0, 0), (0, 128, 128));
        assert_eq!(rgb_to_yuv(255, 255, 255), (255, 128, 128));
        assert_eq!(rgb_to_yuv(128, 128, 128), (128, 128, 128));
    }

    #[test]
    fn red_pushes_v_up_and_u_down() {
        let (y, u, v) = rgb_to_yuv(255, 0, 0);
        assert_eq!(y, 76);
        assert!(u < 128);
        assert_eq!(v, 255);
    }

    #[test]
    fn yuyv_packs_pairs_and_pads_odd_width() {
        let mut img = RgbImage::from_pixel(3, 2, Rgb([255, 255, 255]));
        img.put_pixel(1, 0, Rgb([0, 0, 0]));
        let mut out = Vec::new();
        rgb_to_yuyv(&img, &mut out);
        // Two macropixels per row, the last one repeating its only pixel.
        assert_eq!(out.len(), 2 * 2 * 4);
        assert_eq!(&out[0..4], &[255, 128, 0, 128]);
        assert_eq!(&out[4..8], &[255, 128, 255, 128]);
    }
}
