//! Forearm and hand reconstruction from pose landmarks.
//!
//! Segmentation models tend to drop forearms and hands, especially in
//! motion. The reconstructor draws them back from the pose: a tapered
//! capsule per forearm and an oriented ellipse per hand, each on its own
//! layer so the shoulder keep-out and feathering can be applied per layer
//! before the result is merged into the refined mask.

mod forearm;
mod keepout;
mod palm;

pub use forearm::{draw_forearm, draw_tapered_segment, ForearmRadii};
pub use keepout::{apply_shoulder_keep_out, Shoulders};
pub use palm::{draw_palm, palm_ellipse};

use crate::config::LimbConfig;
use crate::pose::{PoseResult, Side};
use crate::raster::{gaussian_blur, union_alpha, AlphaMask};

/// What was drawn for one pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LimbCoverage {
    pub left_forearm: bool,
    pub right_forearm: bool,
    pub left_palm: bool,
    pub right_palm: bool,
}

impl LimbCoverage {
    pub fn any(&self) -> bool {
        self.left_forearm || self.right_forearm || self.left_palm || self.right_palm
    }

    fn mark(&mut self, side: Side, forearm: bool, palm: bool) {
        match side {
            Side::Left => {
                self.left_forearm = forearm;
                self.left_palm = palm;
            }
            Side::Right => {
                self.right_forearm = forearm;
                self.right_palm = palm;
            }
        }
    }
}

pub struct LimbReconstructor {
    config: LimbConfig,
    arm_layer: AlphaMask,
    palm_layer: AlphaMask,
    blur_scratch: Vec<f32>,
}

impl LimbReconstructor {
    pub fn new(config: LimbConfig) -> Self {
        Self {
            config,
            arm_layer: AlphaMask::new(0, 0),
            palm_layer: AlphaMask::new(0, 0),
            blur_scratch: Vec::new(),
        }
    }

    pub fn arm_layer(&self) -> &AlphaMask {
        &self.arm_layer
    }

    pub fn palm_layer(&self) -> &AlphaMask {
        &self.palm_layer
    }

    /// Draw the forearm and hand layers for `pose` at `width`x`height`.
    ///
    /// Layers are cleared first; a side whose landmarks are missing or not
    /// visible enough gets nothing. The shoulder keep-out is applied here,
    /// before any feathering.
    pub fn reconstruct(&mut self, pose: &PoseResult, width: u32, height: u32) -> LimbCoverage {
        let _span = tracing::debug_span!("limbs").entered();

        self.arm_layer.ensure_size(width, height);
        self.palm_layer.ensure_size(width, height);
        self.arm_layer.clear();
        self.palm_layer.clear();

        let mut coverage = LimbCoverage::default();
        let Some(shoulders) = Shoulders::from_pose(pose, width, height) else {
            return coverage;
        };
        let threshold = self.config.visibility_threshold;
        let radii = ForearmRadii::from_shoulder_width(shoulders.width(), width);

        for side in Side::BOTH {
            let forearm = pose.visible_pixels([side.elbow(), side.wrist()], threshold, width, height);
            if let Some([elbow, wrist]) = forearm {
                draw_forearm(
                    &mut self.arm_layer,
                    elbow,
                    wrist,
                    radii,
                    self.config.taper_steps,
                );
            }

            let hand = pose.visible_pixels(
                [side.wrist(), side.index_finger(), side.pinky()],
                threshold,
                width,
                height,
            );
            if let Some([wrist, index, pinky]) = hand {
                let ellipse = palm_ellipse(wrist, index, pinky, width, &self.config);
                draw_palm(&mut self.palm_layer, &ellipse, self.config.palm_outline_scale);
            }

            coverage.mark(side, forearm.is_some(), hand.is_some());
        }

        if self.config.shoulder_keep_out {
            let radius = shoulders.keep_out_radius(self.config.keep_out_radius_k);
            apply_shoulder_keep_out(&mut self.arm_layer, &shoulders, radius);
            if self.config.keep_out_for_palms {
                apply_shoulder_keep_out(&mut self.palm_layer, &shoulders, radius);
            }
        }

        tracing::trace!(?coverage, "limbs reconstructed");
        coverage
    }

    /// Feather the layers drawn by [`reconstruct`](Self::reconstruct) and
    /// union them into `dst`. The layers are blurred in place.
    pub fn merge_into(&mut self, dst: &mut AlphaMask, coverage: LimbCoverage) {
        if coverage.left_forearm || coverage.right_forearm {
            gaussian_blur(
                &mut self.arm_layer,
                self.config.arm_feather_px,
                &mut self.blur_scratch,
            );
            union_alpha(dst, &self.arm_layer);
        }
        if coverage.left_palm || coverage.right_palm {
            gaussian_blur(
                &mut self.palm_layer,
                self.config.palm_feather_px,
                &mut self.blur_scratch,
            );
            union_alpha(dst, &self.palm_layer);
        }
    }

    /// Reconstruct and merge in one step.
    pub fn apply(&mut self, pose: &PoseResult, dst: &mut AlphaMask) -> LimbCoverage {
        let (width, height) = dst.dimensions();
        let coverage = self.reconstruct(pose, width, height);
        self.merge_into(dst, coverage);
        coverage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex};

    const W: u32 = 320;
    const H: u32 = 240;

    /// Arms hanging down and out, hands below the wrists.
    fn pose(visibility: f32) -> PoseResult {
        let mut landmarks = vec![Landmark::with_visibility(0.5, 0.2, 0.9); LandmarkIndex::COUNT];
        let mut put = |i: LandmarkIndex, x: f32, y: f32| {
            landmarks[i as usize] = Landmark::with_visibility(x, y, visibility);
        };
        put(LandmarkIndex::LeftShoulder, 0.35, 0.35);
        put(LandmarkIndex::RightShoulder, 0.65, 0.35);
        put(LandmarkIndex::LeftElbow, 0.25, 0.55);
        put(LandmarkIndex::RightElbow, 0.75, 0.55);
        put(LandmarkIndex::LeftWrist, 0.22, 0.75);
        put(LandmarkIndex::RightWrist, 0.78, 0.75);
        put(LandmarkIndex::LeftIndex, 0.21, 0.82);
        put(LandmarkIndex::LeftPinky, 0.24, 0.82);
        put(LandmarkIndex::RightIndex, 0.79, 0.82);
        put(LandmarkIndex::RightPinky, 0.76, 0.82);
        PoseResult::new(landmarks)
    }

    fn at(mask: &AlphaMask, x: f32, y: f32) -> f32 {
        mask.get((x * W as f32).round() as u32, (y * H as f32).round() as u32)
    }

    #[test]
    fn visible_pose_draws_both_sides() {
        let mut limbs = LimbReconstructor::new(LimbConfig::default());
        let coverage = limbs.reconstruct(&pose(0.5), W, H);
        assert_eq!(
            coverage,
            LimbCoverage {
                left_forearm: true,
                right_forearm: true,
                left_palm: true,
                right_palm: true,
            }
        );
        assert!(at(limbs.arm_layer(), 0.235, 0.65) > 0.9);
        assert!(!limbs.palm_layer().is_clear());
    }

    #[test]
    fn hidden_landmarks_draw_nothing() {
        let mut limbs = LimbReconstructor::new(LimbConfig::default());
        let coverage = limbs.reconstruct(&pose(0.1), W, H);
        assert!(!coverage.any());
        assert!(limbs.arm_layer().is_clear());
        assert!(limbs.palm_layer().is_clear());
    }

    #[test]
    fn one_hidden_pinky_only_drops_that_hand() {
        let mut p = pose(0.9);
        p.landmarks[LandmarkIndex::RightPinky as usize].visibility = Some(0.05);
        let mut limbs = LimbReconstructor::new(LimbConfig::default());
        let coverage = limbs.reconstruct(&p, W, H);
        assert!(coverage.left_palm);
        assert!(!coverage.right_palm);
        assert!(coverage.right_forearm);
    }

    #[test]
    fn shoulder_pixels_are_empty_on_both_layers() {
        // Elbows tucked against the shoulders so the raw geometry overlaps them.
        let mut p = pose(0.9);
        p.landmarks[LandmarkIndex::LeftElbow as usize] = Landmark::new(0.36, 0.40);
        p.landmarks[LandmarkIndex::RightElbow as usize] = Landmark::new(0.64, 0.40);
        p.landmarks[LandmarkIndex::LeftWrist as usize] = Landmark::new(0.36, 0.36);
        p.landmarks[LandmarkIndex::RightWrist as usize] = Landmark::new(0.64, 0.36);
        let mut limbs = LimbReconstructor::new(LimbConfig::default());
        limbs.reconstruct(&p, W, H);
        for layer in [limbs.arm_layer(), limbs.palm_layer()] {
            assert_eq!(at(layer, 0.35, 0.35), 0.0);
            assert_eq!(at(layer, 0.65, 0.35), 0.0);
        }
    }

    #[test]
    fn keep_out_can_be_disabled() {
        let mut p = pose(0.9);
        p.landmarks[LandmarkIndex::LeftElbow as usize] = Landmark::new(0.35, 0.35);
        let config = LimbConfig {
            shoulder_keep_out: false,
            ..LimbConfig::default()
        };
        let mut limbs = LimbReconstructor::new(config);
        limbs.reconstruct(&p, W, H);
        assert!(at(limbs.arm_layer(), 0.35, 0.35) > 0.9);
    }

    #[test]
    fn merge_adds_feathered_limbs() {
        let mut limbs = LimbReconstructor::new(LimbConfig::default());
        let mut dst = AlphaMask::new(W, H);
        let coverage = limbs.apply(&pose(0.5), &mut dst);
        assert!(coverage.any());
        assert!(at(&dst, 0.235, 0.65) > 0.5);
        assert_eq!(at(&dst, 0.5, 0.05), 0.0);
    }

    #[test]
    fn missing_shoulders_skip_everything() {
        let p = PoseResult::new(vec![Landmark::new(0.5, 0.5); 5]);
        let mut limbs = LimbReconstructor::new(LimbConfig::default());
        let mut dst = AlphaMask::new(W, H);
        assert!(!limbs.apply(&p, &mut dst).any());
        assert!(dst.is_clear());
    }
}
