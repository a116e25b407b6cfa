use crate::core::math::transform::safe_normalize;
use crate::io::config::{LightConfig, OrbitConfig, to_point3, to_vector3};
use crate::pipeline::draw_data::{DrawData, Drawable};
use crate::pipeline::overlay::draw_point;
use nalgebra::{Matrix4, Point3, Vector3};

/// The view direction used for specular highlights; the camera looks along -z.
pub const VIEW_DIRECTION: Vector3<f32> = Vector3::new(0.0, 0.0, -1.0);

/// Coefficients shared by every light during one draw pass.
#[derive(Debug, Clone, Copy)]
pub struct LightingParams {
    pub kd: f32,
    pub ks: f32,
    /// Specular exponent.
    pub m: f32,
    /// Reflector (spotlight) exponent; `None` disables the cone.
    pub reflector_m: Option<f32>,
}

impl LightingParams {
    pub fn from_config(config: &LightConfig) -> Self {
        Self {
            kd: config.kd,
            ks: config.ks,
            m: config.m,
            reflector_m: config.reflector.then_some(config.reflector_m),
        }
    }
}

/// A point light, optionally acting as a reflector aimed along `direction`.
#[derive(Debug, Clone)]
pub struct LightSource {
    position: Point3<f32>,
    pub color: Vector3<f32>,
    /// Axis the reflector shines along.
    pub direction: Vector3<f32>,
    pub icon_color: Vector3<f32>,
    /// Icon radius in pixels.
    pub icon_size: f32,
}

impl LightSource {
    pub fn new(position: Point3<f32>) -> Self {
        Self {
            position,
            color: Vector3::new(1.0, 1.0, 1.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
            icon_color: Vector3::new(155.0 / 255.0, 155.0 / 255.0, 0.0),
            icon_size: 10.0,
        }
    }

    pub fn from_config(config: &LightConfig) -> Self {
        Self {
            position: to_point3(config.position),
            color: to_vector3(config.color),
            direction: safe_normalize(to_vector3(config.direction)),
            icon_color: to_vector3(config.icon_color),
            icon_size: config.icon_size,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
    }

    pub fn position_mut(&mut self) -> &mut Point3<f32> {
        &mut self.position
    }

    /// Diffuse plus specular light this source adds at `point`.
    ///
    /// The result is unclamped; the caller sums every light and clamps once.
    pub fn contribution(
        &self,
        point: &Point3<f32>,
        normal: &Vector3<f32>,
        base_color: &Vector3<f32>,
        params: &LightingParams,
    ) -> Vector3<f32> {
        let l = safe_normalize(self.position - point);
        let n_dot_l = normal.dot(&l);
        let cos_nl = n_dot_l.max(0.0);

        let r = safe_normalize(normal * (2.0 * n_dot_l) - l);
        let cos_vr = VIEW_DIRECTION.dot(&r).max(0.0).powf(params.m);

        let power = match params.reflector_m {
            Some(mr) => (-l).dot(&self.direction).max(0.0).powf(mr),
            None => 1.0,
        };

        let lit = self.color.component_mul(base_color) * power;
        lit * (params.kd * cos_nl) + lit * (params.ks * cos_vr)
    }
}

impl Drawable for LightSource {
    fn draw(&self, data: &mut DrawData) {
        let target = data.target();
        draw_point(&target, &self.position, self.icon_size, self.icon_color);
    }

    /// Moves the light itself; unlike meshes there is no original to keep.
    fn transform(&mut self, matrix: &Matrix4<f32>) {
        self.position = matrix.transform_point(&self.position);
    }
}

/// Places `position` on the circle of `radius` around `center`, `angle`
/// radians further than its current bearing. Z is pinned to the center's.
pub fn move_across_circle(
    position: &mut Point3<f32>,
    center: &Point3<f32>,
    radius: f32,
    angle: f32,
) {
    let current = (position.y - center.y).atan2(position.x - center.x);
    let next = current + angle;
    position.x = center.x + radius * next.cos();
    position.y = center.y + radius * next.sin();
    position.z = center.z;
}

/// Circular motion applied to every light once per frame.
#[derive(Debug, Clone, Copy)]
pub struct Orbit {
    pub center: Point3<f32>,
    pub radius: f32,
    pub angular_step: f32,
    /// `(base, amplitude)` of a time-varying radius.
    pub wobble: Option<(f32, f32)>,
}

impl Orbit {
    pub fn new(center: Point3<f32>, radius: f32, angular_step: f32) -> Self {
        Self {
            center,
            radius,
            angular_step,
            wobble: None,
        }
    }

    pub fn from_config(config: &OrbitConfig) -> Self {
        Self {
            center: to_point3(config.center),
            radius: config.radius,
            angular_step: config.angular_step,
            wobble: config
                .wobble
                .then_some((config.wobble_base, config.wobble_amplitude)),
        }
    }

    pub fn radius_at(&self, time: f32) -> f32 {
        match self.wobble {
            Some((base, amplitude)) => base + amplitude * time.sin(),
            None => self.radius,
        }
    }

    pub fn advance(&self, position: &mut Point3<f32>, time: f32) {
        move_across_circle(position, &self.center, self.radius_at(time), self.angular_step);
    }
}
