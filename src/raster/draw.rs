//! Anti-aliased shape drawing onto alpha masks.
//!
//! Pixel `(x, y)` is sampled at its integer coordinate, the same grid the
//! landmarks are rounded to. Fills use source-over compositing, erases use
//! destination-out.

use super::AlphaMask;
use crate::geometry::{distance, distance_to_segment, Point};

/// Coverage of a pixel at distance `d` from a shape whose boundary lies at
/// distance `r` from its skeleton. Fully covered up to `r`, then a half
/// pixel ramp.
fn edge_coverage(d: f32, r: f32) -> f32 {
    if d <= r {
        1.0
    } else {
        (r + 0.5 - d).clamp(0.0, 1.0)
    }
}

/// Inclusive pixel range covering `[lo, hi]`, clipped to `0..size`.
fn span(lo: f32, hi: f32, size: u32) -> Option<(u32, u32)> {
    if size == 0 || hi < 0.0 || lo > (size - 1) as f32 {
        return None;
    }
    let start = lo.floor().max(0.0) as u32;
    let end = (hi.ceil().max(0.0) as u32).min(size - 1);
    Some((start, end))
}

fn for_each_in_box<F>(mask: &mut AlphaMask, min: Point, max: Point, mut f: F)
where
    F: FnMut(Point) -> f32,
{
    let (w, h) = mask.dimensions();
    let (Some((x0, x1)), Some((y0, y1))) = (span(min.x, max.x, w), span(min.y, max.y, h)) else {
        return;
    };
    let width = w as usize;
    let data = mask.data_mut();
    for y in y0..=y1 {
        for x in x0..=x1 {
            let a = f(Point::new(x as f32, y as f32));
            if a <= 0.0 {
                continue;
            }
            let d = &mut data[y as usize * width + x as usize];
            *d = a + *d * (1.0 - a);
        }
    }
}

pub fn fill_circle(mask: &mut AlphaMask, center: Point, radius: f32, alpha: f32) {
    if radius <= 0.0 {
        return;
    }
    let reach = radius + 1.0;
    for_each_in_box(
        mask,
        Point::new(center.x - reach, center.y - reach),
        Point::new(center.x + reach, center.y + reach),
        |p| edge_coverage(distance(p, center), radius) * alpha,
    );
}

/// Round-capped stroke of constant radius from `a` to `b`.
pub fn fill_capsule(mask: &mut AlphaMask, a: Point, b: Point, radius: f32, alpha: f32) {
    if radius <= 0.0 {
        return;
    }
    let reach = radius + 1.0;
    for_each_in_box(
        mask,
        Point::new(a.x.min(b.x) - reach, a.y.min(b.y) - reach),
        Point::new(a.x.max(b.x) + reach, a.y.max(b.y) + reach),
        |p| edge_coverage(distance_to_segment(p, a, b).0, radius) * alpha,
    );
}

/// Orientation and size of an ellipse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub center: Point,
    pub semi_major: f32,
    pub semi_minor: f32,
    /// Rotation of the major axis, radians
    pub angle: f32,
}

impl Ellipse {
    pub fn scaled(&self, factor: f32) -> Ellipse {
        Ellipse {
            semi_major: self.semi_major * factor,
            semi_minor: self.semi_minor * factor,
            ..*self
        }
    }

    /// Normalized radius of `p`: 1.0 on the boundary, < 1.0 inside.
    fn normalized_radius(&self, p: Point) -> f32 {
        let (sin, cos) = self.angle.sin_cos();
        let dx = p.x - self.center.x;
        let dy = p.y - self.center.y;
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        ((u / self.semi_major).powi(2) + (v / self.semi_minor).powi(2)).sqrt()
    }

    fn bounds(&self, pad: f32) -> (Point, Point) {
        let reach = self.semi_major.max(self.semi_minor) + pad + 1.0;
        (
            Point::new(self.center.x - reach, self.center.y - reach),
            Point::new(self.center.x + reach, self.center.y + reach),
        )
    }

    fn is_degenerate(&self) -> bool {
        self.semi_major <= 0.0 || self.semi_minor <= 0.0
    }
}

pub fn fill_ellipse(mask: &mut AlphaMask, ellipse: &Ellipse, alpha: f32) {
    if ellipse.is_degenerate() {
        return;
    }
    // Distances are approximated along the minor axis scale.
    let scale = ellipse.semi_minor.min(ellipse.semi_major);
    let (min, max) = ellipse.bounds(0.0);
    for_each_in_box(mask, min, max, |p| {
        let r = ellipse.normalized_radius(p);
        edge_coverage(r * scale, scale) * alpha
    });
}

pub fn stroke_ellipse(mask: &mut AlphaMask, ellipse: &Ellipse, line_width: f32, alpha: f32) {
    if ellipse.is_degenerate() || line_width <= 0.0 {
        return;
    }
    let scale = ellipse.semi_minor.min(ellipse.semi_major);
    let half = line_width * 0.5;
    let (min, max) = ellipse.bounds(half);
    for_each_in_box(mask, min, max, |p| {
        let r = ellipse.normalized_radius(p);
        edge_coverage((r - 1.0).abs() * scale, half) * alpha
    });
}

/// Destination-out circle: removes alpha inside the circle.
pub fn erase_circle(mask: &mut AlphaMask, center: Point, radius: f32) {
    if radius <= 0.0 {
        return;
    }
    let (w, h) = mask.dimensions();
    let reach = radius + 1.0;
    let (Some((x0, x1)), Some((y0, y1))) = (
        span(center.x - reach, center.x + reach, w),
        span(center.y - reach, center.y + reach, h),
    ) else {
        return;
    };
    let width = w as usize;
    let data = mask.data_mut();
    for y in y0..=y1 {
        for x in x0..=x1 {
            let cover = edge_coverage(distance(Point::new(x as f32, y as f32), center), radius);
            data[y as usize * width + x as usize] *= 1.0 - cover;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn circle_covers_center_and_not_far_pixels() {
        let mut mask = AlphaMask::new(40, 40);
        fill_circle(&mut mask, Point::new(20.0, 20.0), 5.0, 1.0);
        assert_relative_eq!(mask.get(20, 20), 1.0);
        assert_relative_eq!(mask.get(25, 20), 1.0);
        assert_eq!(mask.get(27, 20), 0.0);
    }

    #[test]
    fn circle_partially_off_frame_is_clipped() {
        let mut mask = AlphaMask::new(10, 10);
        fill_circle(&mut mask, Point::new(-2.0, 5.0), 4.0, 1.0);
        assert_relative_eq!(mask.get(0, 5), 1.0);
        assert_eq!(mask.get(9, 5), 0.0);
    }

    #[test]
    fn capsule_joins_endpoints() {
        let mut mask = AlphaMask::new(50, 20);
        fill_capsule(&mut mask, Point::new(5.0, 10.0), Point::new(45.0, 10.0), 3.0, 1.0);
        for x in [5, 25, 45] {
            assert_relative_eq!(mask.get(x, 10), 1.0);
        }
        assert_eq!(mask.get(25, 15), 0.0);
        // Round cap past the end
        assert_relative_eq!(mask.get(48, 10), 1.0);
    }

    #[test]
    fn rotated_ellipse_follows_its_axis() {
        let mut mask = AlphaMask::new(100, 100);
        let ellipse = Ellipse {
            center: Point::new(50.0, 50.0),
            semi_major: 30.0,
            semi_minor: 10.0,
            angle: std::f32::consts::FRAC_PI_2,
        };
        fill_ellipse(&mut mask, &ellipse, 1.0);
        // Major axis is vertical after a quarter turn.
        assert_relative_eq!(mask.get(50, 75), 1.0);
        assert_eq!(mask.get(75, 50), 0.0);
    }

    #[test]
    fn stroke_leaves_center_empty() {
        let mut mask = AlphaMask::new(100, 100);
        let ellipse = Ellipse {
            center: Point::new(50.0, 50.0),
            semi_major: 30.0,
            semi_minor: 20.0,
            angle: 0.0,
        };
        stroke_ellipse(&mut mask, &ellipse, 4.0, 0.9);
        assert_eq!(mask.get(50, 50), 0.0);
        assert_relative_eq!(mask.get(80, 50), 0.9);
    }

    #[test]
    fn erase_clears_center_for_any_positive_radius() {
        for radius in [0.3, 1.0, 7.5] {
            let mut mask = AlphaMask::filled(20, 20, 1.0);
            erase_circle(&mut mask, Point::new(10.0, 10.0), radius);
            assert_eq!(mask.get(10, 10), 0.0);
            assert_relative_eq!(mask.get(0, 0), 1.0);
        }
    }

    #[test]
    fn zero_radius_draws_nothing() {
        let mut mask = AlphaMask::new(10, 10);
        fill_circle(&mut mask, Point::new(5.0, 5.0), 0.0, 1.0);
        fill_capsule(&mut mask, Point::new(1.0, 1.0), Point::new(8.0, 8.0), 0.0, 1.0);
        assert!(mask.is_clear());
    }
}
