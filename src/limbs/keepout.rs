use crate::geometry::{distance, Point};
use crate::pose::{LandmarkIndex, PoseResult};
use crate::raster::{draw, AlphaMask};

/// Pixel positions of both shoulders; they set the scale of every
/// reconstructed limb and anchor the keep-out regions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shoulders {
    pub left: Point,
    pub right: Point,
}

impl Shoulders {
    /// Both shoulders must be present. Their visibility is not checked:
    /// the derived sizes are clamped, so a low-confidence shoulder only
    /// shifts the scale.
    pub fn from_pose(pose: &PoseResult, width: u32, height: u32) -> Option<Self> {
        let left = pose.get(LandmarkIndex::LeftShoulder)?;
        let right = pose.get(LandmarkIndex::RightShoulder)?;
        Some(Self {
            left: left.to_pixel(width, height),
            right: right.to_pixel(width, height),
        })
    }

    pub fn width(&self) -> f32 {
        distance(self.left, self.right)
    }

    pub fn keep_out_radius(&self, k: f32) -> f32 {
        (self.width() * k).round()
    }
}

/// Erase everything within `radius` of either shoulder.
///
/// Pose-derived geometry is unreliable at the shoulder/neck junction, and
/// there the segmentation mask is already right.
pub fn apply_shoulder_keep_out(layer: &mut AlphaMask, shoulders: &Shoulders, radius: f32) {
    draw::erase_circle(layer, shoulders.left, radius);
    draw::erase_circle(layer, shoulders.right, radius);
}
