use crate::core::framebuffer::Canvas;
use crate::core::math::transform::TransformFactory;
use crate::error::Result;
use crate::io::config::{Config, to_vector3};
use crate::io::image::load_texture;
use crate::io::obj_loader::load_obj;
use crate::pipeline::draw_data::{DrawData, Drawable};
use crate::scene::bezier::{BezierSurface, demo_control_points};
use crate::scene::light::{LightSource, Orbit};
use crate::scene::mesh::Mesh;
use log::{debug, info, warn};
use nalgebra::Vector3;

/// Owns the canvas, the drawables and the lights, and drives frames.
///
/// A frame is: advance every light along the orbit, clear the canvas to the
/// background, draw every drawable in insertion order, then the light icons.
pub struct RenderEngine {
    config: Config,
    canvas: Canvas,
    drawables: Vec<Box<dyn Drawable>>,
    lights: Vec<LightSource>,
    orbit: Orbit,
    /// Scene rotation in degrees (X, Y, Z), composed as `Rx * Ry * Rz`.
    rotation: Vector3<f32>,
    frame: usize,
}

impl RenderEngine {
    pub fn new(config: Config) -> Self {
        let canvas = Canvas::new(
            config.canvas.width,
            config.canvas.height,
            to_vector3(config.canvas.background),
        );
        let orbit = Orbit::from_config(&config.orbit);
        let rotation = to_vector3(config.animation.rotation);
        Self {
            config,
            canvas,
            drawables: Vec::new(),
            lights: Vec::new(),
            orbit,
            rotation,
            frame: 0,
        }
    }

    /// Engine with the configured surface (or OBJ mesh) and one light.
    pub fn from_config(config: Config) -> Result<Self> {
        let drawable = build_drawable(&config)?;
        let light = LightSource::from_config(&config.light);
        let mut engine = Self::new(config);
        engine.add_drawable(drawable);
        engine.add_light(light);
        Ok(engine)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn lights(&self) -> &[LightSource] {
        &self.lights
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Adds a drawable, applying the current scene rotation to it.
    pub fn add_drawable(&mut self, mut drawable: Box<dyn Drawable>) {
        drawable.transform(&self.rotation_matrix());
        self.drawables.push(drawable);
    }

    pub fn clear_drawables(&mut self) {
        self.drawables.clear();
    }

    pub fn add_light(&mut self, light: LightSource) {
        self.lights.push(light);
    }

    pub fn clear_lights(&mut self) {
        self.lights.clear();
    }

    pub fn set_orbit(&mut self, orbit: Orbit) {
        self.orbit = orbit;
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    /// Sets the absolute scene rotation in degrees.
    pub fn set_rotation(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Vector3::new(x, y, z);
        self.apply_rotation();
    }

    /// Adds the given degrees to the scene rotation.
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.rotation += Vector3::new(dx, dy, dz);
        self.apply_rotation();
    }

    fn rotation_matrix(&self) -> nalgebra::Matrix4<f32> {
        TransformFactory::rotation_euler_degrees(self.rotation.x, self.rotation.y, self.rotation.z)
    }

    fn apply_rotation(&mut self) {
        let matrix = self.rotation_matrix();
        for drawable in &mut self.drawables {
            drawable.transform(&matrix);
        }
    }

    /// One orbit step for every light. The wobble clock is
    /// `frame * frame_time`, so runs are reproducible.
    pub fn advance_lights(&mut self) {
        let time = self.frame as f32 * self.config.orbit.frame_time;
        for light in &mut self.lights {
            self.orbit.advance(light.position_mut(), time);
        }
        self.frame += 1;
    }

    /// Redraws the canvas from scratch.
    pub fn draw(&self) {
        self.canvas.fill(to_vector3(self.config.canvas.background));
        let mut data = DrawData::new(&self.canvas, &self.lights, &self.config);

        for drawable in &self.drawables {
            drawable.draw(&mut data);
        }
        for light in &self.lights {
            light.draw(&mut data);
        }
    }

    pub fn render_frame(&mut self) {
        self.advance_lights();
        self.draw();
        debug!("Rendered frame {}", self.frame);
    }
}

/// The configured OBJ mesh if one is set, else the Bézier surface, with the
/// configured texture and normal map bound.
pub fn build_drawable(config: &Config) -> Result<Box<dyn Drawable>> {
    let surface = &config.surface;
    let texture = surface.texture.as_deref().map(load_texture).transpose()?;
    let normal_map = surface.normal_map.as_deref().map(load_texture).transpose()?;

    let attach = |mesh: &mut Mesh| {
        mesh.set_texture(texture.clone());
        mesh.set_normal_map(normal_map.clone());
    };

    if let Some(path) = &surface.mesh {
        let mut mesh = load_obj(path)?;
        attach(&mut mesh);
        info!("Rendering OBJ mesh with {} triangles", mesh.triangles().len());
        return Ok(Box::new(mesh));
    }

    let mut bezier = match &surface.control_points {
        Some(path) => BezierSurface::from_file(path, surface.tessellation_level)?,
        None => {
            warn!("No control point file configured; using the built-in patch");
            BezierSurface::new(demo_control_points(), surface.tessellation_level)?
        }
    };
    attach(bezier.mesh_mut());
    info!(
        "Bezier surface tessellated into {} triangles",
        bezier.mesh().triangles().len()
    );
    Ok(Box::new(bezier))
}
