use crate::core::framebuffer::RenderTarget;
use crate::core::geometry::Triangle;
use crate::core::math::interpolation::{
    barycentric_coordinates, interpolate, is_inside_triangle, signed_area_x2,
};
use crate::core::math::transform::{project_to_canvas, safe_normalize};
use crate::core::pipeline::{Fragment, PixelShader};
use nalgebra::{Point2, Vector3};
use rayon::prelude::*;
use serde::Deserialize;
use std::ops::Range;

const DEGENERATE_AREA: f32 = 1e-6;
const HORIZONTAL_EPSILON: f32 = 1e-6;

/// How a batch of triangles is spread over worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    /// One thread, triangles in order.
    Sequential,
    /// Disjoint row bands in parallel; each band draws every triangle in
    /// order, so the result is identical to `Sequential`.
    Tiled,
    /// Triangles in parallel over the whole canvas. Overlapping triangles
    /// race on shared pixels, so the output is not reproducible.
    PerTriangle,
}

/// Scanline triangle filler shared by every shader.
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    pub concurrency: Concurrency,
    /// Band height used by `Concurrency::Tiled`.
    pub tile_rows: usize,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(Concurrency::Tiled, 32)
    }
}

/// One non-horizontal triangle edge, in scanline units.
#[derive(Debug, Clone, Copy)]
struct Edge {
    /// First scanline (inclusive) whose pixel center lies on the edge's span.
    y_start: i32,
    /// Last scanline (exclusive).
    y_end: i32,
    /// X at the center of `y_start`.
    x_start: f32,
    dx_dy: f32,
}

impl Edge {
    fn between(top: Point2<f32>, bottom: Point2<f32>) -> Option<Self> {
        let dy = bottom.y - top.y;
        if dy.abs() < HORIZONTAL_EPSILON {
            return None;
        }
        let y_start = (top.y - 0.5).ceil() as i32;
        let y_end = (bottom.y - 0.5).ceil() as i32;
        if y_start >= y_end {
            return None;
        }
        let dx_dy = (bottom.x - top.x) / dy;
        let x_start = top.x + (y_start as f32 + 0.5 - top.y) * dx_dy;
        Some(Self {
            y_start,
            y_end,
            x_start,
            dx_dy,
        })
    }

    /// X at the center of scanline `y`; evaluated directly so every band
    /// computes bit-identical spans.
    #[inline]
    fn x_at(&self, y: i32) -> f32 {
        self.x_start + (y - self.y_start) as f32 * self.dx_dy
    }
}

/// Edges keyed (sorted) by their starting scanline.
struct EdgeTable {
    edges: Vec<Edge>,
}

impl EdgeTable {
    fn build(screen: &[Point2<f32>; 3]) -> Self {
        let mut sorted = *screen;
        sorted.sort_by(|a, b| a.y.total_cmp(&b.y));
        let [p0, p1, p2] = sorted;

        let mut edges: Vec<Edge> = [(p0, p1), (p1, p2), (p0, p2)]
            .into_iter()
            .filter_map(|(top, bottom)| Edge::between(top, bottom))
            .collect();
        edges.sort_by_key(|e| e.y_start);
        Self { edges }
    }

    fn y_range(&self) -> Option<Range<i32>> {
        let start = self.edges.iter().map(|e| e.y_start).min()?;
        let end = self.edges.iter().map(|e| e.y_end).max()?;
        Some(start..end)
    }
}

struct ActiveEdge {
    edge: Edge,
    x: f32,
}

impl Rasterizer {
    pub fn new(concurrency: Concurrency, tile_rows: usize) -> Self {
        Self {
            concurrency,
            tile_rows: tile_rows.max(1),
        }
    }

    /// Draws `triangles` in slice order according to the concurrency mode.
    pub fn draw_triangles<S: PixelShader>(
        &self,
        triangles: &[&Triangle],
        target: &RenderTarget,
        shader: &S,
    ) {
        let height = target.canvas.height();
        match self.concurrency {
            Concurrency::Sequential => {
                for triangle in triangles {
                    self.rasterize_triangle(triangle, target, shader, 0..height);
                }
            }
            Concurrency::Tiled => {
                let rows = self.tile_rows.max(1);
                let bands: Vec<Range<usize>> = (0..height)
                    .step_by(rows)
                    .map(|start| start..(start + rows).min(height))
                    .collect();
                bands.into_par_iter().for_each(|band| {
                    for triangle in triangles {
                        self.rasterize_triangle(triangle, target, shader, band.clone());
                    }
                });
            }
            Concurrency::PerTriangle => {
                triangles.par_iter().for_each(|triangle| {
                    self.rasterize_triangle(triangle, target, shader, 0..height);
                });
            }
        }
    }

    /// Fills the part of `triangle` that falls on scanlines `rows`.
    ///
    /// Vertices are projected with `x * width`, `y * height`; their z is the
    /// depth key. An edge table built from the Y-sorted vertices drives the
    /// sweep, and every pixel between a pair of active edges is confirmed
    /// with barycentric weights before the depth test.
    pub fn rasterize_triangle<S: PixelShader>(
        &self,
        triangle: &Triangle,
        target: &RenderTarget,
        shader: &S,
        rows: Range<usize>,
    ) {
        let canvas = target.canvas;
        let width = canvas.width() as f32;
        let height = canvas.height() as f32;

        let vertices = triangle.vertices();
        let screen = [
            project_to_canvas(&vertices[0].position(), width, height),
            project_to_canvas(&vertices[1].position(), width, height),
            project_to_canvas(&vertices[2].position(), width, height),
        ];
        if signed_area_x2(screen[0], screen[1], screen[2]).abs() < DEGENERATE_AREA {
            return;
        }
        let depths = Vector3::new(
            vertices[0].position().z,
            vertices[1].position().z,
            vertices[2].position().z,
        );
        let varyings = triangle.varyings();

        let table = EdgeTable::build(&screen);
        let Some(span) = table.y_range() else {
            return;
        };
        let y_begin = span.start.max(rows.start as i32).max(0);
        let y_end = span.end.min(rows.end as i32).min(canvas.height() as i32);
        if y_begin >= y_end {
            return;
        }

        let mut next_edge = 0;
        let mut active: Vec<ActiveEdge> = Vec::with_capacity(3);

        for y in y_begin..y_end {
            // Enter edges that have started by this scanline.
            while next_edge < table.edges.len() && table.edges[next_edge].y_start <= y {
                let edge = table.edges[next_edge];
                active.push(ActiveEdge { edge, x: 0.0 });
                next_edge += 1;
            }
            // Retire edges whose span has ended.
            active.retain(|a| a.edge.y_end > y);
            for a in &mut active {
                a.x = a.edge.x_at(y);
            }
            active.sort_by(|a, b| a.x.total_cmp(&b.x));

            for pair in active.chunks_exact(2) {
                let x_from = ((pair[0].x - 0.5).ceil() as i64).max(0);
                let x_to = ((pair[1].x - 0.5).ceil() as i64).min(canvas.width() as i64);
                for x in x_from..x_to {
                    self.shade_pixel(
                        x as usize, y as usize, &screen, depths, &varyings, target, shader,
                    );
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[inline]
    fn shade_pixel<S: PixelShader>(
        &self,
        x: usize,
        y: usize,
        screen: &[Point2<f32>; 3],
        depths: Vector3<f32>,
        varyings: &[crate::core::pipeline::SurfaceVarying; 3],
        target: &RenderTarget,
        shader: &S,
    ) {
        let pixel_center = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
        let Some(bary) = barycentric_coordinates(pixel_center, screen[0], screen[1], screen[2])
        else {
            return;
        };
        if !is_inside_triangle(bary) {
            return;
        }

        // Relative to the first vertex so a constant-z triangle stores exactly its z.
        let depth =
            depths.x + bary.y * (depths.y - depths.x) + bary.z * (depths.z - depths.x);
        if !target.depth.test_and_set(x, y, depth) {
            return;
        }

        let mut varying = interpolate(bary, varyings);
        varying.normal = safe_normalize(varying.normal);

        let fragment = Fragment {
            x,
            y,
            bary,
            depth,
            varying,
        };
        target.canvas.blend_pixel(x, y, shader.shade(&fragment));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::framebuffer::{Canvas, DepthBuffer};
    use crate::core::geometry::Vertex;
    use nalgebra::{Point3, Vector4};

    struct Solid(Vector3<f32>);

    impl PixelShader for Solid {
        fn shade(&self, _fragment: &Fragment) -> Vector4<f32> {
            Vector4::new(self.0.x, self.0.y, self.0.z, 1.0)
        }
    }

    fn flat_triangle(points: [(f32, f32); 3], z: f32) -> Triangle {
        Triangle::new(
            Vertex::new(Point3::new(points[0].0, points[0].1, z)),
            Vertex::new(Point3::new(points[1].0, points[1].1, z)),
            Vertex::new(Point3::new(points[2].0, points[2].1, z)),
        )
    }

    fn covered(canvas: &Canvas, color: [u8; 3]) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                if canvas.get_rgb8(x, y) == Some(color) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn edge_table_skips_horizontal_edges() {
        let screen = [
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(0.0, 4.0),
        ];
        let table = EdgeTable::build(&screen);
        assert_eq!(table.edges.len(), 2);
        assert_eq!(table.y_range(), Some(0..4));
    }

    #[test]
    fn fills_only_pixels_inside() {
        let canvas = Canvas::new(2, 2, Vector3::zeros());
        let depth = DepthBuffer::new(2, 2);
        let target = RenderTarget {
            canvas: &canvas,
            depth: &depth,
        };
        // Hypotenuse x + y = 2.5 pixels: three pixel centers inside, one outside.
        let tri = flat_triangle([(0.0, 0.0), (1.25, 0.0), (0.0, 1.25)], 0.5);
        Rasterizer::new(Concurrency::Sequential, 1).draw_triangles(
            &[&tri],
            &target,
            &Solid(Vector3::new(1.0, 0.0, 0.0)),
        );

        assert_eq!(covered(&canvas, [255, 0, 0]), vec![(0, 0), (1, 0), (0, 1)]);
        assert_eq!(canvas.get_rgb8(1, 1), Some([0, 0, 0]));
        assert_eq!(depth.get(1, 1), Some(f32::NEG_INFINITY));
    }

    #[test]
    fn degenerate_triangle_draws_nothing() {
        let canvas = Canvas::new(4, 4, Vector3::zeros());
        let depth = DepthBuffer::new(4, 4);
        let target = RenderTarget {
            canvas: &canvas,
            depth: &depth,
        };
        let tri = flat_triangle([(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)], 0.0);
        Rasterizer::default().draw_triangles(&[&tri], &target, &Solid(Vector3::x()));
        assert!(covered(&canvas, [255, 0, 0]).is_empty());
    }

    #[test]
    fn triangle_partly_off_canvas_is_clipped() {
        let canvas = Canvas::new(4, 4, Vector3::zeros());
        let depth = DepthBuffer::new(4, 4);
        let target = RenderTarget {
            canvas: &canvas,
            depth: &depth,
        };
        let tri = flat_triangle([(-1.0, -1.0), (3.0, -1.0), (-1.0, 3.0)], 0.0);
        Rasterizer::default().draw_triangles(&[&tri], &target, &Solid(Vector3::y()));
        assert_eq!(covered(&canvas, [0, 255, 0]).len(), 16);
    }

    #[test]
    fn nearer_triangle_wins_in_either_order() {
        let back = flat_triangle([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], 0.2);
        let front = flat_triangle([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], 0.8);
        let red = Solid(Vector3::new(1.0, 0.0, 0.0));
        let blue = Solid(Vector3::new(0.0, 0.0, 1.0));

        for back_first in [true, false] {
            let canvas = Canvas::new(8, 8, Vector3::zeros());
            let depth = DepthBuffer::new(8, 8);
            let target = RenderTarget {
                canvas: &canvas,
                depth: &depth,
            };
            let rasterizer = Rasterizer::new(Concurrency::Sequential, 8);
            if back_first {
                rasterizer.draw_triangles(&[&back], &target, &red);
                rasterizer.draw_triangles(&[&front], &target, &blue);
            } else {
                rasterizer.draw_triangles(&[&front], &target, &blue);
                rasterizer.draw_triangles(&[&back], &target, &red);
            }
            assert_eq!(canvas.get_rgb8(1, 1), Some([0, 0, 255]));
            assert_eq!(depth.get(1, 1), Some(0.8));
        }
    }

    #[test]
    fn coplanar_tie_goes_to_last_writer() {
        let tri = flat_triangle([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], 0.5);
        let canvas = Canvas::new(8, 8, Vector3::zeros());
        let depth = DepthBuffer::new(8, 8);
        let target = RenderTarget {
            canvas: &canvas,
            depth: &depth,
        };
        let rasterizer = Rasterizer::new(Concurrency::Sequential, 8);
        rasterizer.draw_triangles(&[&tri], &target, &Solid(Vector3::x()));
        rasterizer.draw_triangles(&[&tri], &target, &Solid(Vector3::y()));
        assert_eq!(canvas.get_rgb8(1, 1), Some([0, 255, 0]));
    }

    #[test]
    fn different_coplanar_triangles_tie_on_every_shared_pixel() {
        let outer = flat_triangle([(0.02, 0.03), (0.97, 0.11), (0.13, 0.94)], 0.8);
        let inner = flat_triangle([(0.21, 0.17), (0.71, 0.29), (0.27, 0.66)], 0.8);
        let canvas = Canvas::new(64, 64, Vector3::zeros());
        let depth = DepthBuffer::new(64, 64);
        let target = RenderTarget {
            canvas: &canvas,
            depth: &depth,
        };
        let rasterizer = Rasterizer::new(Concurrency::Sequential, 64);
        rasterizer.draw_triangles(&[&outer], &target, &Solid(Vector3::x()));
        rasterizer.draw_triangles(&[&inner], &target, &Solid(Vector3::y()));

        for y in 0..64 {
            for x in 0..64 {
                let stored = depth.get(x, y);
                assert!(
                    stored == Some(0.8) || stored == Some(f32::NEG_INFINITY),
                    "depth {stored:?} at ({x}, {y})"
                );
            }
        }

        let green = covered(&canvas, [0, 255, 0]);
        assert!(green.len() > 100);

        // Every pixel the inner triangle covers must keep its color.
        let inner_pixels = {
            let canvas = Canvas::new(64, 64, Vector3::zeros());
            let depth = DepthBuffer::new(64, 64);
            let target = RenderTarget {
                canvas: &canvas,
                depth: &depth,
            };
            rasterizer.draw_triangles(&[&inner], &target, &Solid(Vector3::y()));
            covered(&canvas, [0, 255, 0])
        };
        assert_eq!(green, inner_pixels);
    }

    #[test]
    fn tiled_output_matches_sequential() {
        let triangles = [
            flat_triangle([(0.05, 0.1), (0.9, 0.2), (0.3, 0.95)], 0.3),
            flat_triangle([(0.6, 0.05), (0.95, 0.9), (0.1, 0.6)], 0.3),
            flat_triangle([(0.2, 0.2), (0.8, 0.3), (0.5, 0.7)], 0.6),
        ];
        let refs: Vec<&Triangle> = triangles.iter().collect();
        let shader = Solid(Vector3::new(0.2, 0.4, 0.6));

        let render = |rasterizer: Rasterizer| {
            let canvas = Canvas::new(37, 29, Vector3::zeros());
            let depth = DepthBuffer::new(37, 29);
            let target = RenderTarget {
                canvas: &canvas,
                depth: &depth,
            };
            rasterizer.draw_triangles(&refs, &target, &shader);
            canvas.to_rgb_image().into_raw()
        };

        let sequential = render(Rasterizer::new(Concurrency::Sequential, 1));
        let tiled = render(Rasterizer::new(Concurrency::Tiled, 5));
        assert_eq!(sequential, tiled);
    }
}
