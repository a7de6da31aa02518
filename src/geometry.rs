//! Small geometry helpers shared by the limb reconstructor and the raster
//! drawing code. Coordinates are `f32` pixels unless stated otherwise.

/// A point in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_point(a: Point, b: Point, t: f32) -> Point {
    Point::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
}

pub fn distance(a: Point, b: Point) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Convert a normalized coordinate pair to pixel space.
///
/// Inputs outside `[0, 1]` are clamped to the frame, and the result is
/// rounded to whole pixels so shapes land on the same grid every frame.
pub fn to_pixel(x: f32, y: f32, width: u32, height: u32) -> Point {
    Point::new(
        (clamp(x, 0.0, 1.0) * width as f32).round(),
        (clamp(y, 0.0, 1.0) * height as f32).round(),
    )
}

/// Distance from `p` to the segment `a`-`b`, together with the segment
/// parameter of the closest point.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> (f32, f32) {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        clamp(((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq, 0.0, 1.0)
    };
    let closest = lerp_point(a, b, t);
    (distance(p, closest), t)
}
