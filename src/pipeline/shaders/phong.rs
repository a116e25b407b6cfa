use crate::core::color::saturate;
use crate::core::math::transform::safe_normalize;
use crate::core::pipeline::{Fragment, PixelShader, SurfaceVarying};
use crate::io::config::NormalMapMode;
use crate::pipeline::draw_data::DrawData;
use crate::scene::light::{LightSource, LightingParams};
use crate::scene::texture::Texture;
use nalgebra::{Point3, Vector3, Vector4};

/// Sums the diffuse and specular contribution of every light at `point` and
/// clamps each channel to [0, 1].
pub fn phong_lighting(
    point: &Point3<f32>,
    normal: &Vector3<f32>,
    base_color: &Vector3<f32>,
    lights: &[LightSource],
    params: &LightingParams,
) -> Vector3<f32> {
    let sum = lights
        .iter()
        .map(|light| light.contribution(point, normal, base_color, params))
        .fold(Vector3::zeros(), |acc, c| acc + c);
    saturate(sum)
}

/// The lit/textured per-pixel shader.
///
/// Base color comes from the bound texture, else the flat brush color. The
/// shading normal is the interpolated normal, optionally perturbed by the
/// normal map.
pub struct PhongShader<'a> {
    pub lights: &'a [LightSource],
    /// `None` when lighting is disabled.
    pub params: Option<LightingParams>,
    pub texture: Option<&'a Texture>,
    pub normal_map: Option<&'a Texture>,
    pub normal_map_mode: NormalMapMode,
    pub brush_color: Vector3<f32>,
}

impl<'a> PhongShader<'a> {
    pub fn from_draw_data(data: &'a DrawData) -> Self {
        let light = &data.config.light;
        Self {
            lights: data.lights,
            params: light.enabled.then(|| LightingParams::from_config(light)),
            texture: data.texture.as_deref(),
            normal_map: data.normal_map.as_deref(),
            normal_map_mode: data.config.render.normal_map_mode,
            brush_color: data.brush_color,
        }
    }

    pub fn base_color(&self, varying: &SurfaceVarying) -> Vector3<f32> {
        match self.texture {
            Some(texture) => texture.sample(varying.uv.x, varying.uv.y),
            None => self.brush_color,
        }
    }

    pub fn shading_normal(&self, varying: &SurfaceVarying) -> Vector3<f32> {
        let Some(map) = self.normal_map else {
            return varying.normal;
        };
        let d = map.sample_normal(varying.uv.x, varying.uv.y);
        match self.normal_map_mode {
            NormalMapMode::TangentSpace => {
                let t = safe_normalize(varying.u_tangent);
                let b = safe_normalize(varying.v_tangent);
                safe_normalize(t * d.x + b * d.y + varying.normal * d.z)
            }
            NormalMapMode::Raw => safe_normalize(-d),
        }
    }
}

impl PixelShader for PhongShader<'_> {
    fn shade(&self, fragment: &Fragment) -> Vector4<f32> {
        let varying = &fragment.varying;
        let base = self.base_color(varying);

        let color = match &self.params {
            Some(params) if !self.lights.is_empty() => {
                let normal = self.shading_normal(varying);
                phong_lighting(&varying.position, &normal, &base, self.lights, params)
            }
            _ => base,
        };
        color.push(1.0)
    }
}
