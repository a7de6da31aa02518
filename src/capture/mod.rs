mod feed;
mod webcam;

pub use feed::FrameFeed;
pub use webcam::WebcamCapture;

use anyhow::Result;
use image::RgbImage;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame
    fn capture_frame(&mut self) -> Result<RgbImage>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);

    /// Whether a complete frame can be read without stalling
    fn is_ready(&self) -> bool {
        true
    }
}

/// Flip a frame left-to-right so the subject sees themselves as in a mirror.
pub fn mirror(frame: &mut RgbImage) {
    image::imageops::flip_horizontal_in_place(frame);
}
