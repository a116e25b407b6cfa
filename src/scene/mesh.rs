use crate::core::geometry::{Triangle, Vertex};
use crate::core::math::transform::{TransformFactory, normal_matrix};
use crate::error::{RasterError, Result};
use crate::pipeline::draw_data::{DrawData, Drawable};
use crate::pipeline::overlay::draw_vertex_markers;
use crate::pipeline::shaders::debug::DebugShader;
use crate::pipeline::shaders::phong::PhongShader;
use crate::scene::texture::Texture;
use log::debug;
use nalgebra::{Matrix4, Point3, Vector2, Vector3};
use rayon::prelude::*;
use std::sync::Arc;

/// An owned list of triangles with a pivot-centered model transform and
/// optional shared bitmaps.
///
/// Triangles keep their insertion order; `draw_order` is the painter's
/// permutation (descending max z, stable) recomputed after every transform.
pub struct Mesh {
    triangles: Vec<Triangle>,
    draw_order: Vec<usize>,
    /// The matrix last passed to `transform`, before pivot centering.
    transform_matrix: Matrix4<f32>,
    /// `T(+pivot) * transform_matrix * T(-pivot)`.
    model_matrix: Matrix4<f32>,
    /// Pivot in normalized canvas space.
    position: Point3<f32>,
    texture: Option<Arc<Texture>>,
    normal_map: Option<Arc<Texture>>,
    color: Option<Vector3<f32>>,
}

impl Mesh {
    /// Builds a mesh whose pivot is the centroid of its vertices.
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let mut mesh = Self {
            triangles: Vec::new(),
            draw_order: Vec::new(),
            transform_matrix: Matrix4::identity(),
            model_matrix: Matrix4::identity(),
            position: Point3::origin(),
            texture: None,
            normal_map: None,
            color: None,
        };
        mesh.set_triangles(triangles);
        mesh.recenter_pivot();
        mesh
    }

    /// `N = ceil(sqrt(level))`; an N×N grid over the unit square, two
    /// triangles per cell, every vertex carrying its own (u, v).
    pub fn tessellation_grid(level: u32) -> Result<Vec<Triangle>> {
        if level == 0 {
            return Err(RasterError::InvalidTessellation(level));
        }
        let n = (level as f32).sqrt().ceil() as u32;
        let step = 1.0 / n as f32;
        let grid_vertex = |x: u32, y: u32| {
            let (u, v) = (x as f32 * step, y as f32 * step);
            Vertex::new(Point3::new(u, v, 0.0)).with_uv(u, v)
        };

        let mut triangles = Vec::with_capacity((2 * n * n) as usize);
        for x in 0..n {
            for y in 0..n {
                let a = grid_vertex(x, y);
                let b = grid_vertex(x + 1, y);
                let c = grid_vertex(x, y + 1);
                let d = grid_vertex(x + 1, y + 1);
                triangles.push(Triangle::new(a, b, c));
                triangles.push(Triangle::new(b, c, d));
            }
        }
        Ok(triangles)
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn draw_order(&self) -> &[usize] {
        &self.draw_order
    }

    /// Triangles in painter's order.
    pub fn ordered_triangles(&self) -> impl Iterator<Item = &Triangle> + '_ {
        self.draw_order.iter().map(move |&i| &self.triangles[i])
    }

    /// Replaces the geometry and re-applies the current transform.
    pub fn set_triangles(&mut self, triangles: Vec<Triangle>) {
        self.triangles = triangles;
        self.apply_transform();
    }

    /// Replaces geometry and pivot together, re-applying the current
    /// transform once.
    pub fn set_geometry(&mut self, triangles: Vec<Triangle>, position: Point3<f32>) {
        self.triangles = triangles;
        self.position = position;
        self.apply_transform();
    }

    pub fn model_matrix(&self) -> &Matrix4<f32> {
        &self.model_matrix
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    /// Moves the pivot and re-applies the current transform around it.
    pub fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
        self.apply_transform();
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Option<Arc<Texture>>) {
        self.texture = texture;
    }

    pub fn normal_map(&self) -> Option<&Arc<Texture>> {
        self.normal_map.as_ref()
    }

    pub fn set_normal_map(&mut self, normal_map: Option<Arc<Texture>>) {
        self.normal_map = normal_map;
    }

    pub fn color(&self) -> Option<Vector3<f32>> {
        self.color
    }

    pub fn set_color(&mut self, color: Option<Vector3<f32>>) {
        self.color = color;
    }

    /// Recomputes every transformed vertex from its original with
    /// `T(+pivot) * matrix * T(-pivot)`, then re-sorts the draw order.
    ///
    /// Transforms are absolute: calling this twice with the same matrix
    /// gives the same result as calling it once.
    pub fn apply_matrix(&mut self, matrix: &Matrix4<f32>) {
        self.transform_matrix = *matrix;
        self.apply_transform();
    }

    fn apply_transform(&mut self) {
        self.model_matrix = TransformFactory::about_pivot(&self.position, &self.transform_matrix);
        let model = self.model_matrix;
        let normals = normal_matrix(&model);
        self.triangles
            .par_iter_mut()
            .for_each(|triangle| triangle.transform(&model, &normals));
        self.sort_triangles_by_depth();
    }

    /// Stable sort of the draw order by descending max transformed z.
    pub fn sort_triangles_by_depth(&mut self) {
        let depths: Vec<f32> = self.triangles.iter().map(Triangle::max_depth).collect();
        self.draw_order = (0..self.triangles.len()).collect();
        self.draw_order.sort_by(|&a, &b| depths[b].total_cmp(&depths[a]));
    }

    /// Translates the bounding-box minimum to the origin and scales
    /// uniformly so the largest extent becomes 1.
    pub fn normalize(&mut self) {
        let Some((min, max)) = self.bounds() else {
            return;
        };
        let extent = max - min;
        let max_extent = extent.x.max(extent.y).max(extent.z);
        let scale = if max_extent > f32::EPSILON {
            1.0 / max_extent
        } else {
            1.0
        };
        debug!("Normalizing mesh: min {min:?}, max {max:?}, scale {scale}");

        for triangle in &mut self.triangles {
            for vertex in triangle.vertices_mut() {
                let p = vertex.position_original();
                vertex.set_position_original(Point3::from((p - min) * scale));
            }
        }
        self.apply_transform();
    }

    /// Sets the pivot to the centroid of all original vertex positions.
    pub fn recenter_pivot(&mut self) {
        let count = self.triangles.len() * 3;
        if count == 0 {
            return;
        }
        let sum = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices().iter())
            .fold(Vector3::zeros(), |acc, v| acc + v.position_original().coords);
        self.set_position(Point3::from(sum / count as f32));
    }

    /// Per-face tangent and bitangent from position and UV deltas. A face
    /// with a degenerate UV mapping gets zero tangents.
    pub fn calculate_tangents(&mut self) {
        for triangle in &mut self.triangles {
            let [v0, v1, v2] = triangle.vertices_mut();
            let (tangent, bitangent) = face_tangents(v0, v1, v2);
            for vertex in [v0, v1, v2] {
                vertex.set_u_tangent_original(tangent);
                vertex.set_v_tangent_original(bitangent);
            }
        }
        self.apply_transform();
    }

    fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let mut points = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices().iter())
            .map(Vertex::position_original);
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        }))
    }
}

fn face_tangents(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> (Vector3<f32>, Vector3<f32>) {
    let delta_pos1 = v1.position_original() - v0.position_original();
    let delta_pos2 = v2.position_original() - v0.position_original();
    let delta_uv1: Vector2<f32> = v1.uv() - v0.uv();
    let delta_uv2: Vector2<f32> = v2.uv() - v0.uv();

    let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
    if det.abs() < 1e-12 {
        return (Vector3::zeros(), Vector3::zeros());
    }
    let r = 1.0 / det;
    let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
    let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r;
    (tangent, bitangent)
}

impl Drawable for Mesh {
    fn draw(&self, data: &mut DrawData) {
        data.bind_mesh(self.texture.clone(), self.normal_map.clone(), self.color);

        let ordered: Vec<&Triangle> = self.ordered_triangles().collect();
        let target = data.target();
        let rasterizer = data.rasterizer;

        if data.config.render.debug_draw {
            let shader = DebugShader::from_config(&data.config.triangle);
            rasterizer.draw_triangles(&ordered, &target, &shader);
            draw_vertex_markers(&target, &ordered, data.config);
        } else {
            let shader = PhongShader::from_draw_data(data);
            rasterizer.draw_triangles(&ordered, &target, &shader);
        }
    }

    fn transform(&mut self, matrix: &Matrix4<f32>) {
        self.apply_matrix(matrix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn vertex(x: f32, y: f32, z: f32) -> Vertex {
        Vertex::new(Point3::new(x, y, z))
    }

    fn sample_mesh() -> Mesh {
        Mesh::new(vec![
            Triangle::new(vertex(0.2, 0.2, 0.1), vertex(0.8, 0.2, 0.3), vertex(0.2, 0.8, 0.2)),
            Triangle::new(vertex(0.8, 0.2, 0.3), vertex(0.8, 0.8, 0.6), vertex(0.2, 0.8, 0.2)),
            Triangle::new(vertex(0.3, 0.3, 0.6), vertex(0.7, 0.3, 0.0), vertex(0.5, 0.7, 0.1)),
        ])
    }

    #[test]
    fn tessellation_count_is_two_n_squared() {
        for (level, n) in [(1, 1), (4, 2), (5, 3), (10, 4), (100, 10)] {
            let grid = Mesh::tessellation_grid(level).unwrap();
            assert_eq!(grid.len(), 2 * n * n, "level {level}");
        }
    }

    #[test]
    fn tessellation_level_zero_is_rejected() {
        assert!(matches!(
            Mesh::tessellation_grid(0),
            Err(RasterError::InvalidTessellation(0))
        ));
    }

    #[test]
    fn grid_vertices_carry_their_uv() {
        let grid = Mesh::tessellation_grid(4).unwrap();
        let [a, b, c] = grid[0].vertices();
        assert_eq!((a.u, a.v), (0.0, 0.0));
        assert_eq!((b.u, b.v), (0.5, 0.0));
        assert_eq!((c.u, c.v), (0.0, 0.5));
        let d = &grid[1][2];
        assert_eq!((d.u, d.v), (0.5, 0.5));
    }

    #[test]
    fn pivot_is_centroid() {
        let mesh = sample_mesh();
        let expected = Point3::new(4.5 / 9.0, 4.3 / 9.0, 2.4 / 9.0);
        assert!((mesh.position() - expected).norm() < 1e-5);
    }

    #[test]
    fn full_turn_about_pivot_restores_positions() {
        let mut mesh = sample_mesh();
        let before: Vec<Point3<f32>> = mesh
            .triangles()
            .iter()
            .flat_map(|t| t.vertices().iter().map(Vertex::position))
            .collect();

        for axis in [Vector3::x(), Vector3::y(), Vector3::new(1.0, 2.0, 3.0)] {
            mesh.apply_matrix(&TransformFactory::rotation(&axis, 2.0 * PI));
            let after = mesh
                .triangles()
                .iter()
                .flat_map(|t| t.vertices().iter().map(Vertex::position));
            for (a, b) in before.iter().zip(after) {
                assert!((a - b).norm() < 1e-4);
            }
        }
    }

    #[test]
    fn draw_order_is_descending_max_depth_and_stable() {
        let mut mesh = sample_mesh();
        mesh.apply_matrix(&Matrix4::identity());
        // Max depths: 0.3, 0.6, 0.6.
        assert_eq!(mesh.draw_order(), &[1, 2, 0]);

        // Half turn about Y mirrors z around the pivot.
        mesh.apply_matrix(&TransformFactory::rotation_y(PI));
        let depths: Vec<f32> = mesh.ordered_triangles().map(Triangle::max_depth).collect();
        assert!(depths.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(mesh.triangles()[0][0].position_original(), Point3::new(0.2, 0.2, 0.1));
    }

    #[test]
    fn normalize_fits_unit_cube() {
        let mut mesh = Mesh::new(vec![Triangle::new(
            vertex(-2.0, 1.0, 0.0),
            vertex(2.0, 1.0, 1.0),
            vertex(0.0, 3.0, 0.0),
        )]);
        mesh.normalize();
        let t = &mesh.triangles()[0];
        assert_eq!(t[0].position_original(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(t[1].position_original(), Point3::new(1.0, 0.0, 0.25));
        assert_eq!(t[2].position_original(), Point3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn tangents_follow_uv_axes() {
        let mut mesh = Mesh::new(vec![Triangle::new(
            vertex(0.0, 0.0, 0.0).with_uv(0.0, 0.0),
            vertex(2.0, 0.0, 0.0).with_uv(1.0, 0.0),
            vertex(0.0, 3.0, 0.0).with_uv(0.0, 1.0),
        )]);
        mesh.calculate_tangents();
        let v = &mesh.triangles()[0][1];
        assert!((v.u_tangent_original() - Vector3::new(2.0, 0.0, 0.0)).norm() < 1e-6);
        assert!((v.v_tangent_original() - Vector3::new(0.0, 3.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn degenerate_uv_gives_zero_tangents() {
        let mut mesh = Mesh::new(vec![Triangle::new(
            vertex(0.0, 0.0, 0.0),
            vertex(1.0, 0.0, 0.0),
            vertex(0.0, 1.0, 0.0),
        )]);
        mesh.calculate_tangents();
        let v = &mesh.triangles()[0][0];
        assert_eq!(v.u_tangent_original(), Vector3::zeros());
        assert_eq!(v.v_tangent(), Vector3::zeros());
    }
}
