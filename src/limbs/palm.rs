use crate::config::LimbConfig;
use crate::geometry::{clamp, distance, Point};
use crate::raster::{draw, AlphaMask, Ellipse};

/// Alpha of the inner outline stroke
const OUTLINE_ALPHA: f32 = 0.9;

/// Oriented ellipse standing in for a hand.
///
/// The ellipse points from the wrist toward the midpoint of the index and
/// pinky fingertips and is pushed forward from the wrist so it covers the
/// palm rather than the joint.
pub fn palm_ellipse(
    wrist: Point,
    index: Point,
    pinky: Point,
    frame_width: u32,
    config: &LimbConfig,
) -> Ellipse {
    let w = frame_width as f32;
    let tip = index.midpoint(pinky);
    let mut length = distance(wrist, tip);
    if length <= f32::EPSILON {
        length = 1.0;
    }
    let dx = (tip.x - wrist.x) / length;
    let dy = (tip.y - wrist.y) / length;

    let forward = clamp(length * config.palm_forward_k, w * 0.04, w * 0.14);
    let semi_major = clamp(
        length * 2.0,
        w * config.palm_semi_major_min,
        w * config.palm_semi_major_max,
    );

    Ellipse {
        center: Point::new(wrist.x + dx * forward, wrist.y + dy * forward),
        semi_major,
        semi_minor: semi_major * config.palm_minor_to_major,
        angle: dy.atan2(dx),
    }
}

/// Filled hand ellipse with a slightly smaller outline stroked on top.
pub fn draw_palm(mask: &mut AlphaMask, ellipse: &Ellipse, outline_scale: f32) {
    draw::fill_ellipse(mask, ellipse, 1.0);

    let line_width = (ellipse.semi_major.min(ellipse.semi_minor) * 0.22)
        .round()
        .max(2.0);
    draw::stroke_ellipse(mask, &ellipse.scaled(outline_scale), line_width, OUTLINE_ALPHA);
}
