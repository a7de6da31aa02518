//! Background capture thread handing the newest frame to the frame loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver};
use image::RgbImage;

use super::CaptureSource;

/// Pause after a failed grab before trying again
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Frames produced on a dedicated thread.
///
/// Holds at most one frame; a newer frame replaces an unread one, so the
/// loop always processes the latest image and [`is_ready`] tells whether
/// one is waiting.
///
/// [`is_ready`]: CaptureSource::is_ready
pub struct FrameFeed {
    frames: Receiver<RgbImage>,
    running: Arc<AtomicBool>,
    width: u32,
    height: u32,
}

impl FrameFeed {
    /// Start a capture thread.
    ///
    /// `open` runs on that thread and returns the frame grabber together
    /// with its resolution, so sources that cannot leave their thread
    /// (camera handles) never have to.
    pub fn spawn<F, G>(name: &str, open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<(G, (u32, u32))> + Send + 'static,
        G: FnMut() -> Result<RgbImage>,
    {
        let (ready_tx, ready_rx) = bounded::<Result<(u32, u32)>>(1);
        let (frame_tx, frames) = bounded::<RgbImage>(1);
        let stale = frames.clone();
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = running.clone();

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut grab = match open() {
                    Ok((grab, size)) => {
                        let _ = ready_tx.send(Ok(size));
                        grab
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while worker_running.load(Ordering::Relaxed) {
                    match grab() {
                        Ok(frame) => {
                            if frame_tx.is_full() {
                                let _ = stale.try_recv();
                            }
                            if frame_tx.send(frame).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Frame grab failed: {:#}", e);
                            thread::sleep(RETRY_DELAY);
                        }
                    }
                }
                tracing::debug!("Capture thread stopped");
            })
            .context("Failed to start capture thread")?;

        let (width, height) = ready_rx
            .recv()
            .map_err(|_| anyhow!("Capture thread exited during startup"))??;

        Ok(Self {
            frames,
            running,
            width,
            height,
        })
    }
}

impl CaptureSource for FrameFeed {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        self.frames
            .recv()
            .map_err(|_| anyhow!("Capture thread stopped"))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_ready(&self) -> bool {
        !self.frames.is_empty()
    }
}

impl Drop for FrameFeed {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::scheduler::{FrameScheduler, SkipReason, Tick};
    use image::Rgb;
    use std::time::Instant;

    /// Feed whose frames are released one by one through `gate`.
    fn gated_feed() -> (FrameFeed, crossbeam_channel::Sender<u8>) {
        let (gate, released) = crossbeam_channel::unbounded::<u8>();
        let feed = FrameFeed::spawn("test-capture", move || {
            let grab = move || -> Result<RgbImage> {
                let value = released.recv()?;
                Ok(RgbImage::from_pixel(4, 2, Rgb([value, 0, 0])))
            };
            Ok((grab, (4, 2)))
        })
        .unwrap();
        (feed, gate)
    }

    fn wait_until_ready(feed: &FrameFeed) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !feed.is_ready() {
            assert!(Instant::now() < deadline, "no frame arrived");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn scheduler_skips_until_a_frame_is_buffered() {
        let (mut feed, gate) = gated_feed();
        assert_eq!(feed.resolution(), (4, 2));
        let mut scheduler = FrameScheduler::new(SchedulerConfig::default());

        assert_eq!(
            scheduler.tick(Duration::ZERO, feed.is_ready()),
            Tick::Skip(SkipReason::NotReady)
        );
        assert_eq!(scheduler.cycle(), 0);

        gate.send(7).unwrap();
        wait_until_ready(&feed);
        assert!(matches!(
            scheduler.tick(Duration::from_millis(1), feed.is_ready()),
            Tick::Process(_)
        ));
        assert_eq!(feed.capture_frame().unwrap().get_pixel(0, 0)[0], 7);
        assert!(!feed.is_ready());
    }

    #[test]
    fn unread_frames_are_replaced_by_newer_ones() {
        let (mut feed, gate) = gated_feed();
        for value in 1..=3 {
            gate.send(value).unwrap();
        }
        // The thread keeps at most one frame; wait for the last one to land.
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            wait_until_ready(&feed);
            let frame = feed.capture_frame().unwrap();
            if frame.get_pixel(0, 0)[0] == 3 {
                break;
            }
            assert!(Instant::now() < deadline, "latest frame never arrived");
        }
    }

    #[test]
    fn failed_open_is_reported() {
        type Grab = fn() -> Result<RgbImage>;
        let result =
            FrameFeed::spawn("test-capture", || -> Result<(Grab, (u32, u32))> {
                Err(anyhow!("no camera"))
            });
        match result {
            Err(e) => assert!(e.to_string().contains("no camera")),
            Ok(_) => panic!("open failure was swallowed"),
        }
    }
}
