//! One processed cycle: models, result channels, refinement and composite.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::RgbImage;

use crate::capture::CaptureSource;
use crate::compositor::Compositor;
use crate::config::PipelineConfig;
use crate::control::ControlEvent;
use crate::pose::{PoseModel, PoseResult};
use crate::refine::MaskRefiner;
use crate::scheduler::{CyclePlan, FrameScheduler, PerfSnapshot, Tick};
use crate::segmentation::{downsample_to_width, SegmentationModel, SegmentationResult};

/// Drives both models and redraws whenever a segmentation result arrives.
///
/// Pose results are drained without blocking at the end of every cycle, so
/// every draw uses the most recent pose available at that moment.
pub struct Pipeline {
    segmenter: Box<dyn SegmentationModel>,
    pose_model: Box<dyn PoseModel>,
    seg_tx: Sender<SegmentationResult>,
    seg_rx: Receiver<SegmentationResult>,
    pose_tx: Sender<Option<PoseResult>>,
    pose_rx: Receiver<Option<PoseResult>>,
    latest_pose: Option<PoseResult>,
    refiner: MaskRefiner,
    compositor: Compositor,
    pose_input_width: u32,
    show_matte: bool,
    matte: Option<RgbImage>,
    segmented: bool,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        segmenter: Box<dyn SegmentationModel>,
        pose_model: Box<dyn PoseModel>,
    ) -> Self {
        let (seg_tx, seg_rx) = unbounded();
        let (pose_tx, pose_rx) = unbounded();
        Self {
            segmenter,
            pose_model,
            seg_tx,
            seg_rx,
            pose_tx,
            pose_rx,
            latest_pose: None,
            refiner: MaskRefiner::new(config.refine.clone(), config.limbs.clone()),
            compositor: Compositor::new(config.compositor.clone()),
            pose_input_width: config.scheduler.pose_input_width,
            show_matte: false,
            matte: None,
            segmented: false,
        }
    }

    /// Emit the refined mask as a grayscale frame instead of the composite.
    pub fn with_matte_view(mut self, show_matte: bool) -> Self {
        self.show_matte = show_matte;
        self
    }

    pub fn apply_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Background(background) => self.compositor.set_background(background),
            ControlEvent::Privacy(level, overlay) => self.compositor.set_privacy(level, overlay),
            ControlEvent::ToggleHud => {
                let on = self.compositor.toggle_hud();
                tracing::info!("HUD {}", if on { "on" } else { "off" });
            }
        }
    }

    /// Run the work `plan` asks for on `frame`.
    ///
    /// Returns true when a new output frame was drawn. Model failures are
    /// logged and skip only the affected model for this cycle.
    pub fn run_cycle(&mut self, frame: &RgbImage, plan: &CyclePlan, perf: &PerfSnapshot) -> bool {
        if plan.run_segmentation {
            let _span = tracing::debug_span!("segment", cycle = plan.cycle).entered();
            match self.segmenter.segment(frame) {
                Ok(mask) => {
                    let result = SegmentationResult {
                        image: frame.clone(),
                        mask,
                    };
                    // Both ends live in `self`, so the send cannot fail.
                    let _ = self.seg_tx.send(result);
                }
                Err(e) => tracing::warn!(cycle = plan.cycle, "Segmentation failed: {:#}", e),
            }
        }

        let drawn = match self.seg_rx.try_iter().last() {
            Some(result) => {
                self.draw(&result, plan.cycle, perf);
                true
            }
            None if !self.segmented => {
                // Nothing to cut out yet: background only.
                self.compositor.compose(frame, None, perf);
                true
            }
            None => false,
        };

        if plan.run_pose {
            let _span = tracing::debug_span!("pose", cycle = plan.cycle).entered();
            let small = downsample_to_width(frame, self.pose_input_width);
            match self.pose_model.detect(&small) {
                Ok(pose) => {
                    let _ = self.pose_tx.send(pose);
                }
                Err(e) => tracing::warn!(cycle = plan.cycle, "Pose detection failed: {:#}", e),
            }
        }

        // Drained every cycle, whether or not a mask arrived; the next draw
        // uses the newest pose.
        for pose in self.pose_rx.try_iter() {
            self.latest_pose = pose;
        }

        drawn
    }

    /// Gate on `scheduler`, then capture and process one frame.
    ///
    /// Returns true when a new output frame is ready. Only the processing
    /// after the frame is in hand counts towards the frame time.
    pub fn step<C: CaptureSource + ?Sized>(
        &mut self,
        capture: &mut C,
        scheduler: &mut FrameScheduler,
        ts: Duration,
    ) -> Result<bool> {
        let plan = match scheduler.tick(ts, capture.is_ready()) {
            Tick::Process(plan) => plan,
            Tick::Skip(reason) => {
                tracing::trace!(?reason, "tick skipped");
                return Ok(false);
            }
        };

        let frame = capture
            .capture_frame()
            .context("Failed to capture frame")?;

        let started = Instant::now();
        let perf = scheduler.stats().snapshot();
        let drawn = self.run_cycle(&frame, &plan, &perf);
        scheduler.finish_cycle(started.elapsed());
        Ok(drawn)
    }

    fn draw(&mut self, result: &SegmentationResult, cycle: u64, perf: &PerfSnapshot) {
        let (width, height) = result.image.dimensions();
        let resized;
        let raw = if result.mask.dimensions() == (width, height) {
            &result.mask
        } else {
            resized = result.mask.resized(width, height);
            &resized
        };

        let refined = self.refiner.refine(raw, self.latest_pose.as_ref(), cycle);
        if self.show_matte {
            self.matte = Some(refined.to_rgb());
        }
        self.compositor.compose(&result.image, Some(refined), perf);
        self.segmented = true;
    }

    /// Most recent output frame
    pub fn output(&self) -> &RgbImage {
        match (&self.matte, self.show_matte) {
            (Some(matte), true) => matte,
            _ => self.compositor.output(),
        }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn refiner(&self) -> &MaskRefiner {
        &self.refiner
    }

    /// Newest pose result, used by the next draw
    pub fn latest_pose(&self) -> Option<&PoseResult> {
        self.latest_pose.as_ref()
    }
}
