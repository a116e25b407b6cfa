use crate::core::pipeline::Interpolatable;
use nalgebra::{Point2, Vector3};

const EPSILON: f32 = 1e-5;

/// Calculates the barycentric coordinates (alpha, beta, gamma) of point p
/// with respect to triangle (v1, v2, v3).
///
/// Returns `None` if the triangle is degenerate (area is near zero).
///
/// # Returns
/// A Vector3 where:
/// - x: alpha (weight for v1)
/// - y: beta  (weight for v2)
/// - z: gamma (weight for v3)
pub fn barycentric_coordinates(
    p: Point2<f32>,
    v1: Point2<f32>,
    v2: Point2<f32>,
    v3: Point2<f32>,
) -> Option<Vector3<f32>> {
    let e1 = v2 - v1;
    let e2 = v3 - v1;
    let p_v1 = p - v1;

    let total_area_x2 = signed_area_x2(v1, v2, v3);
    if total_area_x2.abs() < EPSILON {
        return None;
    }

    let inv_total_area_x2 = 1.0 / total_area_x2;

    // Sub-triangle (p, v3, v1)
    let beta = (p_v1.x * e2.y - p_v1.y * e2.x) * inv_total_area_x2;
    // Sub-triangle (p, v1, v2)
    let gamma = (e1.x * p_v1.y - e1.y * p_v1.x) * inv_total_area_x2;
    let alpha = 1.0 - beta - gamma;

    Some(Vector3::new(alpha, beta, gamma))
}

/// Twice the signed area of the triangle (v1, v2, v3).
#[inline]
pub fn signed_area_x2(v1: Point2<f32>, v2: Point2<f32>, v3: Point2<f32>) -> f32 {
    let e1 = v2 - v1;
    let e2 = v3 - v1;
    e1.x * e2.y - e1.y * e2.x
}

/// Checks if the barycentric coordinates represent a point inside the triangle.
/// Returns true if alpha, beta, and gamma are all >= 0.
#[inline(always)]
pub fn is_inside_triangle(bary: Vector3<f32>) -> bool {
    bary.x >= -EPSILON && bary.y >= -EPSILON && bary.z >= -EPSILON
}

/// True when the point lies within `threshold` (in barycentric units) of any edge.
#[inline]
pub fn is_near_edge(bary: Vector3<f32>, threshold: f32) -> bool {
    bary.x < threshold || bary.y < threshold || bary.z < threshold
}

/// Weighted sum of three per-vertex values.
#[inline]
pub fn interpolate<T: Interpolatable>(bary: Vector3<f32>, values: &[T; 3]) -> T {
    values[0] * bary.x + values[1] * bary.y + values[2] * bary.z
}
