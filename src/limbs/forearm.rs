use crate::geometry::{clamp, lerp, lerp_point, Point};
use crate::raster::{draw, AlphaMask};

/// Proximal and distal forearm radii, px
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForearmRadii {
    pub elbow: f32,
    pub wrist: f32,
}

impl ForearmRadii {
    /// Radii scaled from shoulder width so the stroke follows the subject's
    /// distance from the camera, bounded by the frame width.
    pub fn from_shoulder_width(shoulder_width: f32, frame_width: u32) -> Self {
        let w = frame_width as f32;
        let base = clamp(
            (shoulder_width * 0.20).round(),
            (w * 0.016).round(),
            (w * 0.05).round(),
        );
        Self {
            elbow: (base * 0.90).round(),
            wrist: (base * 0.72).round(),
        }
    }
}

/// Tapered capsule from `a` to `b`, drawn as `steps` round-capped pieces
/// whose radius moves linearly from `radius_a` to `radius_b`.
pub fn draw_tapered_segment(
    mask: &mut AlphaMask,
    a: Point,
    b: Point,
    radius_a: f32,
    radius_b: f32,
    steps: usize,
) {
    let steps = steps.max(1);
    for i in 0..steps {
        let t0 = i as f32 / steps as f32;
        let t1 = (i + 1) as f32 / steps as f32;
        let radius = lerp(radius_a, radius_b, (t0 + t1) * 0.5).max(0.5);
        draw::fill_capsule(mask, lerp_point(a, b, t0), lerp_point(a, b, t1), radius, 1.0);
    }
}

/// Forearm stroke plus slightly oversized joint caps so the capsule ends
/// show no seam.
pub fn draw_forearm(
    mask: &mut AlphaMask,
    elbow: Point,
    wrist: Point,
    radii: ForearmRadii,
    steps: usize,
) {
    draw_tapered_segment(mask, elbow, wrist, radii.elbow, radii.wrist, steps);
    draw::fill_circle(mask, elbow, (radii.elbow * 1.02).round(), 1.0);
    draw::fill_circle(mask, wrist, (radii.wrist * 1.05).round(), 1.0);
}
