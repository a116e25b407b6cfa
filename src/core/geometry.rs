use crate::core::math::transform::{linear_part, safe_normalize};
use crate::core::pipeline::SurfaceVarying;
use nalgebra::{Matrix3, Matrix4, Point3, Vector2, Vector3};
use std::ops::{Index, IndexMut};

/// A surface point with authoring-space ("original") attributes and their
/// current-frame ("transformed") counterparts.
///
/// Transformed attributes are always `transform(original)`; the setters for
/// original attributes reset the transformed copy.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    position_original: Point3<f32>,
    normal_original: Vector3<f32>,
    u_tangent_original: Vector3<f32>,
    v_tangent_original: Vector3<f32>,

    position: Point3<f32>,
    normal: Vector3<f32>,
    u_tangent: Vector3<f32>,
    v_tangent: Vector3<f32>,

    /// Surface (u, v) coordinates in [0, 1].
    pub u: f32,
    pub v: f32,
}

impl Vertex {
    pub fn new(position: Point3<f32>) -> Self {
        Self::with_frame(position, Vector3::zeros(), Vector3::zeros(), Vector3::zeros())
    }

    pub fn with_frame(
        position: Point3<f32>,
        normal: Vector3<f32>,
        u_tangent: Vector3<f32>,
        v_tangent: Vector3<f32>,
    ) -> Self {
        Self {
            position_original: position,
            normal_original: normal,
            u_tangent_original: u_tangent,
            v_tangent_original: v_tangent,
            position,
            normal,
            u_tangent,
            v_tangent,
            u: 0.0,
            v: 0.0,
        }
    }

    pub fn with_uv(mut self, u: f32, v: f32) -> Self {
        self.u = u;
        self.v = v;
        self
    }

    // --- Original (authoring space) ---

    pub fn position_original(&self) -> Point3<f32> {
        self.position_original
    }

    pub fn normal_original(&self) -> Vector3<f32> {
        self.normal_original
    }

    pub fn u_tangent_original(&self) -> Vector3<f32> {
        self.u_tangent_original
    }

    pub fn v_tangent_original(&self) -> Vector3<f32> {
        self.v_tangent_original
    }

    pub fn set_position_original(&mut self, position: Point3<f32>) {
        self.position_original = position;
        self.position = position;
    }

    pub fn set_normal_original(&mut self, normal: Vector3<f32>) {
        self.normal_original = normal;
        self.normal = normal;
    }

    pub fn set_u_tangent_original(&mut self, tangent: Vector3<f32>) {
        self.u_tangent_original = tangent;
        self.u_tangent = tangent;
    }

    pub fn set_v_tangent_original(&mut self, tangent: Vector3<f32>) {
        self.v_tangent_original = tangent;
        self.v_tangent = tangent;
    }

    // --- Transformed (current frame) ---

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    pub fn u_tangent(&self) -> Vector3<f32> {
        self.u_tangent
    }

    pub fn v_tangent(&self) -> Vector3<f32> {
        self.v_tangent
    }

    pub fn uv(&self) -> Vector2<f32> {
        Vector2::new(self.u, self.v)
    }

    /// Recomputes the transformed attributes from the originals.
    ///
    /// Positions use the full matrix. Tangents lie in the surface and follow
    /// the linear part; normals follow `normal_matrix`, which must be the
    /// inverse-transpose of that linear part.
    pub fn transform(&mut self, matrix: &Matrix4<f32>, normal_matrix: &Matrix3<f32>) {
        let linear = linear_part(matrix);
        self.position = matrix.transform_point(&self.position_original);
        self.normal = safe_normalize(normal_matrix * self.normal_original);
        self.u_tangent = safe_normalize(linear * self.u_tangent_original);
        self.v_tangent = safe_normalize(linear * self.v_tangent_original);
    }

    pub fn varying(&self) -> SurfaceVarying {
        SurfaceVarying {
            position: self.position,
            normal: self.normal,
            u_tangent: self.u_tangent,
            v_tangent: self.v_tangent,
            uv: self.uv(),
        }
    }
}

/// Exactly three vertices. The order is a display winding only; no face is
/// ever culled.
///
/// Indexing with anything other than 0, 1 or 2 is a logic error and panics.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(a: Vertex, b: Vertex, c: Vertex) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    pub fn vertices(&self) -> &[Vertex; 3] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex; 3] {
        &mut self.vertices
    }

    pub fn transform(&mut self, matrix: &Matrix4<f32>, normal_matrix: &Matrix3<f32>) {
        for vertex in &mut self.vertices {
            vertex.transform(matrix, normal_matrix);
        }
    }

    /// Painter's-algorithm key: the largest transformed z of the three vertices.
    pub fn max_depth(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.position.z)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn varyings(&self) -> [SurfaceVarying; 3] {
        [
            self.vertices[0].varying(),
            self.vertices[1].varying(),
            self.vertices[2].varying(),
        ]
    }
}

impl Index<usize> for Triangle {
    type Output = Vertex;

    fn index(&self, index: usize) -> &Vertex {
        assert!(index < 3, "triangle vertex index {index} out of range");
        &self.vertices[index]
    }
}

impl IndexMut<usize> for Triangle {
    fn index_mut(&mut self, index: usize) -> &mut Vertex {
        assert!(index < 3, "triangle vertex index {index} out of range");
        &mut self.vertices[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::transform::{TransformFactory, normal_matrix};
    use std::f32::consts::FRAC_PI_2;

    fn framed_vertex() -> Vertex {
        Vertex::with_frame(
            Point3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        )
        .with_uv(0.25, 0.75)
    }

    #[test]
    fn transform_leaves_originals_untouched() {
        let mut v = framed_vertex();
        let m = TransformFactory::rotation_z(FRAC_PI_2);
        v.transform(&m, &normal_matrix(&m));

        assert!((v.position() - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
        assert!((v.u_tangent() - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
        assert!((v.v_tangent() - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-6);
        assert!((v.normal() - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);

        assert_eq!(v.position_original(), Point3::new(1.0, 0.0, 0.0));
        assert_eq!(v.u_tangent_original(), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(v.uv(), Vector2::new(0.25, 0.75));
    }

    #[test]
    fn transform_is_absolute_not_cumulative() {
        let mut v = framed_vertex();
        let m = TransformFactory::rotation_z(FRAC_PI_2);
        let nm = normal_matrix(&m);
        v.transform(&m, &nm);
        v.transform(&m, &nm);
        assert!((v.position() - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn setting_original_resets_transformed() {
        let mut v = framed_vertex();
        let m = TransformFactory::translation(&Vector3::new(5.0, 0.0, 0.0));
        v.transform(&m, &normal_matrix(&m));
        v.set_position_original(Point3::new(0.0, 0.0, 2.0));
        assert_eq!(v.position(), Point3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn triangle_depth_key_is_max_z() {
        let t = Triangle::new(
            Vertex::new(Point3::new(0.0, 0.0, 0.1)),
            Vertex::new(Point3::new(1.0, 0.0, 0.9)),
            Vertex::new(Point3::new(0.0, 1.0, 0.4)),
        );
        assert_eq!(t.max_depth(), 0.9);
        assert_eq!(t[1].position().z, 0.9);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn fourth_vertex_is_a_contract_violation() {
        let t = Triangle::new(
            Vertex::new(Point3::origin()),
            Vertex::new(Point3::origin()),
            Vertex::new(Point3::origin()),
        );
        let _ = t[3];
    }
}
