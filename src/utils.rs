//! Utility functions for polygon geometry and coordinate transformations.

pub mod safe_cast;

use opencv::core::Point2f;

/// Perimeter of a closed 4-point polygon
#[must_use]
pub fn polygon_perimeter(corners: &[Point2f; 4]) -> f64 {
    let mut perimeter = 0.0;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        perimeter += f64::from((b.x - a.x).hypot(b.y - a.y));
    }
    perimeter
}

/// Centroid of a 4-point polygon
#[must_use]
pub fn polygon_centroid(corners: &[Point2f; 4]) -> Point2f {
    let sum = corners
        .iter()
        .fold((0.0f32, 0.0f32), |acc, p| (acc.0 + p.x, acc.1 + p.y));
    Point2f::new(sum.0 / 4.0, sum.1 / 4.0)
}

/// Map a polygon from region-local, possibly-upscaled coordinates back to
/// full-frame coordinates: divide by the upscale factor, add the region origin.
#[must_use]
pub fn map_to_frame(corners: &[Point2f; 4], upscale: f32, origin: Point2f) -> [Point2f; 4] {
    corners.map(|p| Point2f::new(p.x / upscale + origin.x, p.y / upscale + origin.y))
}
