use crate::core::geometry::{Triangle, Vertex};
use crate::core::math::transform::safe_normalize;
use crate::error::{RasterError, Result};
use crate::io::control_points::{CONTROL_POINT_COUNT, load_control_points};
use crate::pipeline::draw_data::{DrawData, Drawable};
use crate::pipeline::overlay::{draw_line, draw_point};
use crate::scene::mesh::Mesh;
use log::{debug, info};
use nalgebra::{Matrix4, Point3, Vector3};
use std::path::Path;

/// The x/y range the tessellated patch is fitted into.
const FIT_LOWER: f32 = 0.2;
const FIT_UPPER: f32 = 0.8;

const GRID_SIZE: usize = 4;
const CONTROL_POINT_RADIUS: f32 = 5.0;
const CONTROL_POINT_COLOR: Vector3<f32> = Vector3::new(0.0, 0.0, 0.0);
const CONTROL_GRID_COLOR: Vector3<f32> = Vector3::new(0.0, 0.0, 1.0);

pub type ControlPoints = [Point3<f32>; CONTROL_POINT_COUNT];

/// A gently curved patch over the unit square, used when no control point
/// file is given.
pub fn demo_control_points() -> ControlPoints {
    std::array::from_fn(|k| {
        let (i, j) = ((k / GRID_SIZE) as f32, (k % GRID_SIZE) as f32);
        let z = 0.3 * ((i - 1.5) * (j - 1.5)) / 2.25;
        Point3::new(i / 3.0, j / 3.0, z)
    })
}

/// Cubic Bernstein basis at `t`.
#[inline]
pub fn bernstein(t: f32) -> [f32; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
}

/// Derivative of [`bernstein`] with respect to `t`.
#[inline]
pub fn bernstein_derivative(t: f32) -> [f32; 4] {
    let s = 1.0 - t;
    [
        -3.0 * s * s,
        3.0 * s * (1.0 - 3.0 * t),
        3.0 * t * (2.0 - 3.0 * t),
        3.0 * t * t,
    ]
}

/// Position and analytic frame of the patch at one (u, v).
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSample {
    pub position: Point3<f32>,
    pub u_tangent: Vector3<f32>,
    pub v_tangent: Vector3<f32>,
    pub normal: Vector3<f32>,
}

/// Evaluates the bicubic patch; `control_points[i * 4 + j]` is weighted by
/// `B(u)[i] * B(v)[j]`.
pub fn evaluate(control_points: &ControlPoints, u: f32, v: f32) -> SurfaceSample {
    let bu = bernstein(u);
    let bv = bernstein(v);
    let dbu = bernstein_derivative(u);
    let dbv = bernstein_derivative(v);

    let mut position = Vector3::zeros();
    let mut u_tangent = Vector3::zeros();
    let mut v_tangent = Vector3::zeros();

    for i in 0..GRID_SIZE {
        for j in 0..GRID_SIZE {
            let cp = control_points[i * GRID_SIZE + j].coords;
            position += cp * (bu[i] * bv[j]);
            u_tangent += cp * (dbu[i] * bv[j]);
            v_tangent += cp * (bu[i] * dbv[j]);
        }
    }

    SurfaceSample {
        position: Point3::from(position),
        u_tangent,
        v_tangent,
        normal: safe_normalize(u_tangent.cross(&v_tangent)),
    }
}

/// Maps evaluated points so their x/y bounding box spans [0.2, 0.8].
#[derive(Debug, Clone, Copy)]
struct FitTransform {
    min: Vector3<f32>,
    scale: Vector3<f32>,
}

impl FitTransform {
    fn from_points<'a>(points: impl Iterator<Item = &'a Point3<f32>>) -> Self {
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        debug!("Bounding box: ({min_x}, {min_y}) - ({max_x}, {max_y})");

        let span = FIT_UPPER - FIT_LOWER;
        let axis_scale = |extent: f32| {
            if extent > f32::EPSILON {
                span / extent
            } else {
                1.0
            }
        };
        Self {
            min: Vector3::new(min_x, min_y, 0.0),
            scale: Vector3::new(axis_scale(max_x - min_x), axis_scale(max_y - min_y), 1.0),
        }
    }

    fn point(&self, p: &Point3<f32>) -> Point3<f32> {
        Point3::from((p.coords - self.min).component_mul(&self.scale))
            + Vector3::new(FIT_LOWER, FIT_LOWER, 0.0)
    }

    fn direction(&self, d: &Vector3<f32>) -> Vector3<f32> {
        safe_normalize(d.component_mul(&self.scale))
    }
}

/// A 4×4 control-point patch and the mesh tessellated from it.
pub struct BezierSurface {
    mesh: Mesh,
    control_points: ControlPoints,
    /// Control points in the fitted space of the mesh.
    fitted_control_points: ControlPoints,
    /// `fitted_control_points` under the mesh's model matrix.
    transformed_control_points: ControlPoints,
    tessellation_level: u32,
}

impl BezierSurface {
    pub fn new(control_points: ControlPoints, tessellation_level: u32) -> Result<Self> {
        let (triangles, pivot, fitted) = tessellate(&control_points, tessellation_level)?;
        let mut mesh = Mesh::new(Vec::new());
        mesh.set_geometry(triangles, pivot);

        let mut surface = Self {
            mesh,
            control_points,
            fitted_control_points: fitted,
            transformed_control_points: fitted,
            tessellation_level,
        };
        surface.update_control_points();
        Ok(surface)
    }

    pub fn from_file<P: AsRef<Path>>(path: P, tessellation_level: u32) -> Result<Self> {
        Self::new(load_control_points(path)?, tessellation_level)
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    pub fn control_points(&self) -> &ControlPoints {
        &self.control_points
    }

    pub fn transformed_control_points(&self) -> &ControlPoints {
        &self.transformed_control_points
    }

    pub fn tessellation_level(&self) -> u32 {
        self.tessellation_level
    }

    /// Re-tessellates at `level` and re-applies the current transform.
    /// A failed call leaves the surface unchanged.
    pub fn set_tessellation_level(&mut self, level: u32) -> Result<()> {
        self.rebuild(self.control_points, level)?;
        info!("Tessellation level set to {level}");
        Ok(())
    }

    /// Replaces the grid. Anything other than exactly 16 points is rejected
    /// and the current surface kept.
    pub fn set_control_points(&mut self, points: &[Point3<f32>]) -> Result<()> {
        let grid: ControlPoints = points
            .try_into()
            .map_err(|_| RasterError::ControlPointCount {
                expected: CONTROL_POINT_COUNT,
                found: points.len(),
            })?;
        self.rebuild(grid, self.tessellation_level)
    }

    pub fn reload_control_points<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let grid = load_control_points(path)?;
        self.rebuild(grid, self.tessellation_level)
    }

    fn rebuild(&mut self, control_points: ControlPoints, level: u32) -> Result<()> {
        let (triangles, pivot, fitted) = tessellate(&control_points, level)?;
        self.mesh.set_geometry(triangles, pivot);
        self.control_points = control_points;
        self.fitted_control_points = fitted;
        self.tessellation_level = level;
        self.update_control_points();
        Ok(())
    }

    fn update_control_points(&mut self) {
        let model = *self.mesh.model_matrix();
        for (out, p) in self
            .transformed_control_points
            .iter_mut()
            .zip(&self.fitted_control_points)
        {
            *out = model.transform_point(p);
        }
    }

    fn draw_control_grid(&self, data: &DrawData) {
        let target = data.target();
        let points = &self.transformed_control_points;
        for i in 0..GRID_SIZE {
            for j in 0..GRID_SIZE {
                let point = &points[i * GRID_SIZE + j];
                draw_point(&target, point, CONTROL_POINT_RADIUS, CONTROL_POINT_COLOR);
                if j + 1 < GRID_SIZE {
                    draw_line(&target, point, &points[i * GRID_SIZE + j + 1], CONTROL_GRID_COLOR);
                }
                if i + 1 < GRID_SIZE {
                    draw_line(&target, point, &points[(i + 1) * GRID_SIZE + j], CONTROL_GRID_COLOR);
                }
            }
        }
    }
}

/// Evaluates the patch over the tessellation grid and fits it into the
/// canvas. Returns the triangles, the rotation pivot and the fitted control
/// points.
fn tessellate(
    control_points: &ControlPoints,
    level: u32,
) -> Result<(Vec<Triangle>, Point3<f32>, ControlPoints)> {
    let mut triangles = Mesh::tessellation_grid(level)?;
    debug!("Evaluating Bezier patch over {} triangles", triangles.len());

    let mut samples = Vec::with_capacity(triangles.len() * 3);
    for triangle in &triangles {
        for vertex in triangle.vertices() {
            samples.push(evaluate(control_points, vertex.u, vertex.v));
        }
    }

    let fit = FitTransform::from_points(samples.iter().map(|s| &s.position));
    let mut z_sum = 0.0;
    for (vertex, sample) in triangles
        .iter_mut()
        .flat_map(|t| t.vertices_mut().iter_mut())
        .zip(&samples)
    {
        let position = fit.point(&sample.position);
        let u_tangent = fit.direction(&sample.u_tangent);
        let v_tangent = fit.direction(&sample.v_tangent);
        let normal = safe_normalize(u_tangent.cross(&v_tangent));
        z_sum += position.z;
        *vertex = Vertex::with_frame(position, normal, u_tangent, v_tangent)
            .with_uv(vertex.u, vertex.v);
    }

    let pivot = Point3::new(0.5, 0.5, z_sum / samples.len() as f32);
    debug!("Surface pivot: {pivot:?}");

    let fitted = control_points.map(|p| fit.point(&p));
    Ok((triangles, pivot, fitted))
}

impl Drawable for BezierSurface {
    fn draw(&self, data: &mut DrawData) {
        self.mesh.draw(data);
        if data.config.surface.show_control_points {
            self.draw_control_grid(data);
        }
    }

    fn transform(&mut self, matrix: &Matrix4<f32>) {
        self.mesh.apply_matrix(matrix);
        self.update_control_points();
    }
}
