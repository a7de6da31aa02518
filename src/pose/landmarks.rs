use crate::geometry::{self, Point};

/// BlazePose landmark indices consumed by the limb reconstructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
}

impl LandmarkIndex {
    /// Full BlazePose topology size
    pub const COUNT: usize = 33;
}

/// Body side, from the subject's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn shoulder(self) -> LandmarkIndex {
        match self {
            Side::Left => LandmarkIndex::LeftShoulder,
            Side::Right => LandmarkIndex::RightShoulder,
        }
    }

    pub fn elbow(self) -> LandmarkIndex {
        match self {
            Side::Left => LandmarkIndex::LeftElbow,
            Side::Right => LandmarkIndex::RightElbow,
        }
    }

    pub fn wrist(self) -> LandmarkIndex {
        match self {
            Side::Left => LandmarkIndex::LeftWrist,
            Side::Right => LandmarkIndex::RightWrist,
        }
    }

    pub fn pinky(self) -> LandmarkIndex {
        match self {
            Side::Left => LandmarkIndex::LeftPinky,
            Side::Right => LandmarkIndex::RightPinky,
        }
    }

    pub fn index_finger(self) -> LandmarkIndex {
        match self {
            Side::Left => LandmarkIndex::LeftIndex,
            Side::Right => LandmarkIndex::RightIndex,
        }
    }
}

/// A single normalized landmark
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Normalized X (0.0..=1.0)
    pub x: f32,
    /// Normalized Y (0.0..=1.0)
    pub y: f32,
    /// Detection confidence, when the model reports one
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            visibility: None,
        }
    }

    pub fn with_visibility(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            visibility: Some(visibility),
        }
    }

    /// A landmark without a visibility score is trusted; one with a score
    /// must exceed `threshold`.
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility.map_or(true, |v| v > threshold)
    }

    pub fn to_pixel(&self, width: u32, height: u32) -> Point {
        geometry::to_pixel(self.x, self.y, width, height)
    }
}

/// Landmarks of one detected subject
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoseResult {
    pub landmarks: Vec<Landmark>,
}

impl PoseResult {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks.get(index as usize)
    }

    /// The landmark at `index`, only if present and visible.
    pub fn visible(&self, index: LandmarkIndex, threshold: f32) -> Option<&Landmark> {
        self.get(index).filter(|lm| lm.is_visible(threshold))
    }

    /// Pixel positions of all `indices`, or `None` if any is missing or
    /// below `threshold`.
    pub fn visible_pixels<const N: usize>(
        &self,
        indices: [LandmarkIndex; N],
        threshold: f32,
        width: u32,
        height: u32,
    ) -> Option<[Point; N]> {
        let mut points = [Point::default(); N];
        for (slot, index) in points.iter_mut().zip(indices) {
            *slot = self.visible(index, threshold)?.to_pixel(width, height);
        }
        Some(points)
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}
