//! Depth-tested 2D primitives drawn on top of (and among) the shaded
//! triangles: vertex discs, direction lines, control-point grids, light icons.

use crate::core::framebuffer::RenderTarget;
use crate::core::geometry::Triangle;
use crate::io::config::{Config, to_vector3};
use nalgebra::{Point3, Vector3};

/// Fills a disc of `radius` pixels centered on the projection of `point`.
/// Every pixel is tested at the point's depth.
pub fn draw_point(target: &RenderTarget, point: &Point3<f32>, radius: f32, color: Vector3<f32>) {
    let (cx, cy) = to_pixel(target, point);
    let r = radius.max(0.0);
    let reach = r.ceil() as i64;
    let r2 = r * r;

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if (dx * dx + dy * dy) as f32 <= r2 {
                target.plot(cx + dx, cy + dy, point.z, color);
            }
        }
    }
}

/// Bresenham line between the projections of `start` and `end`, with depth
/// interpolated linearly along the line.
pub fn draw_line(
    target: &RenderTarget,
    start: &Point3<f32>,
    end: &Point3<f32>,
    color: Vector3<f32>,
) {
    let (mut x, mut y) = to_pixel(target, start);
    let (x1, y1) = to_pixel(target, end);

    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let steps = dx.max(-dy).max(1) as f32;
    let mut step = 0.0;

    loop {
        let depth = start.z + (end.z - start.z) * (step / steps);
        target.plot(x, y, depth, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        step += 1.0;
    }
}

/// Debug markers for every vertex: a disc, plus optional normal and
/// tangent segments.
pub fn draw_vertex_markers(target: &RenderTarget, triangles: &[&Triangle], config: &Config) {
    let settings = &config.vertex;
    let radius = (settings.radius_coef * target.canvas.width() as f32).max(1.0);
    let vertex_color = to_vector3(config.triangle.vertex_color);
    let normal_color = to_vector3(settings.normal_color);
    let tangent_color = to_vector3(settings.tangent_color);

    for vertex in triangles.iter().flat_map(|t| t.vertices().iter()) {
        let p = vertex.position();
        draw_point(target, &p, radius, vertex_color);
        if settings.draw_normals {
            let tip = p + vertex.normal() * settings.normal_length;
            draw_line(target, &p, &tip, normal_color);
        }
        if settings.draw_tangents {
            let u_tip = p + vertex.u_tangent() * settings.tangent_length;
            let v_tip = p + vertex.v_tangent() * settings.tangent_length;
            draw_line(target, &p, &u_tip, tangent_color);
            draw_line(target, &p, &v_tip, tangent_color);
        }
    }
}

#[inline]
fn to_pixel(target: &RenderTarget, point: &Point3<f32>) -> (i64, i64) {
    let w = target.canvas.width() as f32;
    let h = target.canvas.height() as f32;
    ((point.x * w).floor() as i64, (point.y * h).floor() as i64)
}
