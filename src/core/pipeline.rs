use nalgebra::{Point3, Vector2, Vector3, Vector4};
use std::ops::{Add, Mul};

/// Trait for types that can be linearly interpolated across a triangle's surface.
///
/// Requirements:
/// - Copy + Clone: cheaply duplicable values for per-vertex storage and interpolation.
/// - Add + Mul<f32>: support linear combination (a + b * t) used by barycentric interpolation.
/// - Send + Sync: safe to use from multiple threads during parallel rasterization.
pub trait Interpolatable:
    Copy + Clone + Add<Output = Self> + Mul<f32, Output = Self> + Send + Sync
{
}

impl<T> Interpolatable for T where
    T: Copy + Clone + Add<Output = T> + Mul<f32, Output = T> + Send + Sync
{
}

/// Per-vertex attributes carried from the transformed vertices to every pixel.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceVarying {
    /// Transformed position in normalized canvas space.
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub u_tangent: Vector3<f32>,
    pub v_tangent: Vector3<f32>,
    /// Surface (u, v) coordinates.
    pub uv: Vector2<f32>,
}

// nalgebra's Point3 doesn't support Point3 + Point3, so positions go through coords.
impl Add for SurfaceVarying {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            position: Point3::from(self.position.coords + other.position.coords),
            normal: self.normal + other.normal,
            u_tangent: self.u_tangent + other.u_tangent,
            v_tangent: self.v_tangent + other.v_tangent,
            uv: self.uv + other.uv,
        }
    }
}

impl Mul<f32> for SurfaceVarying {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self {
            position: Point3::from(self.position.coords * scalar),
            normal: self.normal * scalar,
            u_tangent: self.u_tangent * scalar,
            v_tangent: self.v_tangent * scalar,
            uv: self.uv * scalar,
        }
    }
}

/// Everything the per-pixel stage knows about one covered pixel.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    pub x: usize,
    pub y: usize,
    /// Barycentric weights of the pixel center.
    pub bary: Vector3<f32>,
    pub depth: f32,
    /// Interpolated attributes; `normal` is renormalized.
    pub varying: SurfaceVarying,
}

/// The pluggable per-pixel step of the rasterizer.
///
/// The scanline loop, depth test and canvas writes are shared; only the color
/// of an accepted fragment differs between shaders. Implementations must be
/// thread-safe because fragments may be shaded from several workers.
pub trait PixelShader: Send + Sync {
    /// Returns a straight-alpha RGBA color. Alpha below 1 blends over the
    /// current canvas pixel.
    fn shade(&self, fragment: &Fragment) -> Vector4<f32>;
}
