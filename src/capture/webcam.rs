use super::{mirror, CaptureSource, FrameFeed};
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

/// Webcam read on its own thread, so the frame loop can tell whether a
/// frame is buffered instead of blocking on the device.
pub struct WebcamCapture {
    feed: FrameFeed,
}

impl WebcamCapture {
    /// Open camera `device_index` as close to `width`x`height` @ `fps` as it allows.
    pub fn new(device_index: u32, width: u32, height: u32, fps: u32, mirror: bool) -> Result<Self> {
        tracing::info!(
            "Initializing webcam {} at {}x{} (mirror: {})",
            device_index,
            width,
            height,
            mirror
        );

        let feed = FrameFeed::spawn("capture", move || {
            let mut camera = open_camera(device_index, width, height, fps)?;
            let actual = camera.resolution();
            let grab = move || grab_frame(&mut camera, mirror);
            Ok((grab, (actual.width(), actual.height())))
        })?;

        let (w, h) = feed.resolution();
        tracing::info!("Webcam initialized at {}x{}", w, h);
        Ok(Self { feed })
    }
}

fn open_camera(device_index: u32, width: u32, height: u32, fps: u32) -> Result<Camera> {
    let index = CameraIndex::Index(device_index);
    let wanted = CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, fps);
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));

    let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

    camera
        .open_stream()
        .context("Failed to open camera stream")?;

    Ok(camera)
}

fn grab_frame(camera: &mut Camera, mirrored: bool) -> Result<RgbImage> {
    let frame = camera.frame().context("Failed to capture frame")?;

    let mut decoded = frame
        .decode_image::<RgbFormat>()
        .context("Failed to decode frame")?;

    if mirrored {
        mirror(&mut decoded);
    }
    Ok(decoded)
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        self.feed.capture_frame()
    }

    fn resolution(&self) -> (u32, u32) {
        self.feed.resolution()
    }

    fn is_ready(&self) -> bool {
        self.feed.is_ready()
    }
}
