use crate::core::rasterizer::{Concurrency, Rasterizer};
use crate::error::{RasterError, Result};
use nalgebra::{Point3, Vector3, Vector4};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One shared configuration per render session, passed by reference into
/// the draw chain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub triangle: TriangleConfig,
    #[serde(default)]
    pub vertex: VertexConfig,
    #[serde(default)]
    pub light: LightConfig,
    #[serde(default)]
    pub orbit: OrbitConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let text = fs::read_to_string(path_ref)
            .map_err(|e| RasterError::Config(format!("{}: {e}", path_ref.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RasterError::Config(e.to_string()))
    }

    pub fn rasterizer(&self) -> Rasterizer {
        Rasterizer::new(self.render.concurrency, self.render.tile_rows)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_size")]
    pub width: usize,
    #[serde(default = "default_canvas_size")]
    pub height: usize,
    #[serde(default = "default_white")]
    pub background: [f32; 3],
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_size(),
            height: default_canvas_size(),
            background: default_white(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceConfig {
    /// Text file with the 16 control points.
    #[serde(default)]
    pub control_points: Option<String>,
    #[serde(default = "default_tessellation")]
    pub tessellation_level: u32,
    /// Flat brush color used when no texture is bound.
    #[serde(default = "default_red")]
    pub color: [f32; 3],
    #[serde(default)]
    pub show_control_points: bool,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub normal_map: Option<String>,
    /// OBJ file rendered instead of the Bézier patch.
    #[serde(default)]
    pub mesh: Option<String>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            control_points: None,
            tessellation_level: default_tessellation(),
            color: default_red(),
            show_control_points: false,
            texture: None,
            normal_map: None,
            mesh: None,
        }
    }
}

/// How a sampled normal-map texel becomes the shading normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalMapMode {
    /// `T * d.x + B * d.y + N * d.z` in the interpolated tangent frame.
    #[default]
    TangentSpace,
    /// The negated decoded texel, ignoring the tangent frame.
    Raw,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub debug_draw: bool,
    #[serde(default = "default_concurrency")]
    pub concurrency: Concurrency,
    #[serde(default = "default_tile_rows")]
    pub tile_rows: usize,
    #[serde(default)]
    pub normal_map_mode: NormalMapMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            debug_draw: false,
            concurrency: default_concurrency(),
            tile_rows: default_tile_rows(),
            normal_map_mode: NormalMapMode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriangleConfig {
    #[serde(default = "default_black")]
    pub edge_color: [f32; 3],
    /// RGBA; alpha blends over what is already on the canvas.
    #[serde(default = "default_fill")]
    pub fill_color: [f32; 4],
    #[serde(default = "default_red")]
    pub vertex_color: [f32; 3],
    /// Barycentric distance below which a pixel counts as edge.
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: f32,
}

impl Default for TriangleConfig {
    fn default() -> Self {
        Self {
            edge_color: default_black(),
            fill_color: default_fill(),
            vertex_color: default_red(),
            edge_threshold: default_edge_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VertexConfig {
    /// Vertex disc radius as a fraction of the canvas width.
    #[serde(default = "default_radius_coef")]
    pub radius_coef: f32,
    #[serde(default)]
    pub draw_normals: bool,
    #[serde(default = "default_vector_length")]
    pub normal_length: f32,
    #[serde(default = "default_normal_color")]
    pub normal_color: [f32; 3],
    #[serde(default)]
    pub draw_tangents: bool,
    #[serde(default = "default_vector_length")]
    pub tangent_length: f32,
    #[serde(default = "default_tangent_color")]
    pub tangent_color: [f32; 3],
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            radius_coef: default_radius_coef(),
            draw_normals: false,
            normal_length: default_vector_length(),
            normal_color: default_normal_color(),
            draw_tangents: false,
            tangent_length: default_vector_length(),
            tangent_color: default_tangent_color(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_one")]
    pub kd: f32,
    #[serde(default = "default_one")]
    pub ks: f32,
    /// Specular exponent.
    #[serde(default = "default_specular_m")]
    pub m: f32,
    #[serde(default)]
    pub reflector: bool,
    #[serde(default = "default_reflector_m")]
    pub reflector_m: f32,
    #[serde(default = "default_white")]
    pub color: [f32; 3],
    #[serde(default = "default_light_position")]
    pub position: [f32; 3],
    /// Axis the reflector shines along.
    #[serde(default = "default_reflector_direction")]
    pub direction: [f32; 3],
    #[serde(default = "default_icon_color")]
    pub icon_color: [f32; 3],
    /// Icon disc radius in pixels.
    #[serde(default = "default_icon_size")]
    pub icon_size: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kd: default_one(),
            ks: default_one(),
            m: default_specular_m(),
            reflector: false,
            reflector_m: default_reflector_m(),
            color: default_white(),
            position: default_light_position(),
            direction: default_reflector_direction(),
            icon_color: default_icon_color(),
            icon_size: default_icon_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrbitConfig {
    #[serde(default = "default_orbit_center")]
    pub center: [f32; 3],
    #[serde(default = "default_orbit_radius")]
    pub radius: f32,
    /// Radians added to the light's angle every frame.
    #[serde(default = "default_angular_step")]
    pub angular_step: f32,
    /// `radius = wobble_base + wobble_amplitude * sin(t)` when set.
    #[serde(default)]
    pub wobble: bool,
    #[serde(default = "default_wobble_base")]
    pub wobble_base: f32,
    #[serde(default = "default_wobble_amplitude")]
    pub wobble_amplitude: f32,
    /// Seconds per frame for the wobble clock.
    #[serde(default = "default_frame_time")]
    pub frame_time: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            center: default_orbit_center(),
            radius: default_orbit_radius(),
            angular_step: default_angular_step(),
            wobble: false,
            wobble_base: default_wobble_base(),
            wobble_amplitude: default_wobble_amplitude(),
            frame_time: default_frame_time(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnimationConfig {
    #[serde(default = "default_frames")]
    pub frames: usize,
    /// Initial rotation in degrees (X, Y, Z).
    #[serde(default)]
    pub rotation: [f32; 3],
    /// Degrees added to `rotation` each frame.
    #[serde(default)]
    pub rotation_step: [f32; 3],
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            rotation: [0.0; 3],
            rotation_step: [0.0; 3],
            output: default_output(),
        }
    }
}

pub fn to_vector3(a: [f32; 3]) -> Vector3<f32> {
    Vector3::new(a[0], a[1], a[2])
}

pub fn to_point3(a: [f32; 3]) -> Point3<f32> {
    Point3::new(a[0], a[1], a[2])
}

pub fn to_vector4(a: [f32; 4]) -> Vector4<f32> {
    Vector4::new(a[0], a[1], a[2], a[3])
}

fn default_canvas_size() -> usize {
    2000
}
fn default_tessellation() -> u32 {
    10
}
fn default_tile_rows() -> usize {
    32
}
fn default_concurrency() -> Concurrency {
    Concurrency::Tiled
}
fn default_true() -> bool {
    true
}
fn default_one() -> f32 {
    1.0
}
fn default_specular_m() -> f32 {
    8.0
}
fn default_reflector_m() -> f32 {
    10.0
}
fn default_white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}
fn default_black() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}
fn default_red() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}
fn default_fill() -> [f32; 4] {
    [0.0, 1.0, 0.0, 100.0 / 255.0]
}
fn default_edge_threshold() -> f32 {
    0.02
}
fn default_radius_coef() -> f32 {
    0.005
}
fn default_vector_length() -> f32 {
    0.1
}
fn default_normal_color() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}
fn default_tangent_color() -> [f32; 3] {
    [0.0, 125.0 / 255.0, 125.0 / 255.0]
}
fn default_light_position() -> [f32; 3] {
    [0.0, 0.0, 3.0]
}
fn default_reflector_direction() -> [f32; 3] {
    [0.0, 0.0, -1.0]
}
fn default_icon_color() -> [f32; 3] {
    [155.0 / 255.0, 155.0 / 255.0, 0.0]
}
fn default_icon_size() -> f32 {
    10.0
}
fn default_orbit_center() -> [f32; 3] {
    [0.5, 0.5, 3.0]
}
fn default_orbit_radius() -> f32 {
    0.4
}
fn default_angular_step() -> f32 {
    0.05
}
fn default_wobble_base() -> f32 {
    0.15
}
fn default_wobble_amplitude() -> f32 {
    0.10
}
fn default_frame_time() -> f32 {
    1.0 / 30.0
}
fn default_frames() -> usize {
    1
}
fn default_output() -> String {
    "bezier.png".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.canvas.width, 2000);
        assert_eq!(config.surface.tessellation_level, 10);
        assert_eq!(config.surface.color, [1.0, 0.0, 0.0]);
        assert_eq!(config.light.m, 8.0);
        assert!(config.light.enabled);
        assert!(!config.render.debug_draw);
        assert_eq!(config.render.concurrency, Concurrency::Tiled);
        assert_eq!(config.render.normal_map_mode, NormalMapMode::TangentSpace);
    }

    #[test]
    fn sections_override_selected_fields() {
        let config = Config::from_toml(
            r#"
            [canvas]
            width = 64
            height = 32

            [render]
            debug_draw = true
            concurrency = "per_triangle"
            normal_map_mode = "raw"

            [light]
            kd = 0.5
            reflector = true
            "#,
        )
        .unwrap();
        assert_eq!((config.canvas.width, config.canvas.height), (64, 32));
        assert_eq!(config.canvas.background, [1.0, 1.0, 1.0]);
        assert!(config.render.debug_draw);
        assert_eq!(config.render.concurrency, Concurrency::PerTriangle);
        assert_eq!(config.render.normal_map_mode, NormalMapMode::Raw);
        assert_eq!(config.light.kd, 0.5);
        assert_eq!(config.light.ks, 1.0);
        assert!(config.light.reflector);
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = Config::from_toml("[canvas]\nwidth = \"wide\"").unwrap_err();
        assert!(matches!(err, RasterError::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::load("/nonexistent/bezier.toml").unwrap_err();
        assert!(matches!(err, RasterError::Config(_)));
    }
}
