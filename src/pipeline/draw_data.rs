use crate::core::framebuffer::{Canvas, DepthBuffer, RenderTarget};
use crate::core::rasterizer::Rasterizer;
use crate::io::config::{Config, to_vector3};
use crate::scene::light::LightSource;
use crate::scene::texture::Texture;
use nalgebra::{Matrix4, Vector3};
use std::sync::Arc;

/// Anything the render engine can draw and move.
pub trait Drawable: Send + Sync {
    fn draw(&self, data: &mut DrawData);
    fn transform(&mut self, matrix: &Matrix4<f32>);
}

/// Per-frame render state.
///
/// Borrows the canvas, the engine's lights and the session config; owns a
/// depth buffer sized to the canvas and cleared to `-inf`. The texture slots
/// are rebound by each mesh before it draws; an empty texture slot means
/// flat-color mode using `brush_color`.
pub struct DrawData<'a> {
    pub canvas: &'a Canvas,
    pub depth: DepthBuffer,
    pub lights: &'a [LightSource],
    pub config: &'a Config,
    pub rasterizer: Rasterizer,
    pub texture: Option<Arc<Texture>>,
    pub normal_map: Option<Arc<Texture>>,
    pub brush_color: Vector3<f32>,
}

impl<'a> DrawData<'a> {
    pub fn new(canvas: &'a Canvas, lights: &'a [LightSource], config: &'a Config) -> Self {
        Self {
            canvas,
            depth: DepthBuffer::new(canvas.width(), canvas.height()),
            lights,
            config,
            rasterizer: config.rasterizer(),
            texture: None,
            normal_map: None,
            brush_color: to_vector3(config.surface.color),
        }
    }

    pub fn width(&self) -> usize {
        self.canvas.width()
    }

    pub fn height(&self) -> usize {
        self.canvas.height()
    }

    pub fn target(&self) -> RenderTarget<'_> {
        RenderTarget {
            canvas: self.canvas,
            depth: &self.depth,
        }
    }

    /// Binds one mesh's bitmaps and color; `None` color falls back to the
    /// configured default.
    pub fn bind_mesh(
        &mut self,
        texture: Option<Arc<Texture>>,
        normal_map: Option<Arc<Texture>>,
        color: Option<Vector3<f32>>,
    ) {
        self.texture = texture;
        self.normal_map = normal_map;
        self.brush_color = color.unwrap_or_else(|| to_vector3(self.config.surface.color));
    }
}
