//! Where composited frames go.

mod loopback;

pub use loopback::V4L2Output;

use anyhow::Result;
use image::RgbImage;

/// A consumer of finished frames. Frames of another size are scaled to
/// [`resolution`](OutputSink::resolution) by the sink.
pub trait OutputSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Size of the frames the consumer sees
    fn resolution(&self) -> (u32, u32);
}
