use crate::core::math::interpolation::is_near_edge;
use crate::core::pipeline::{Fragment, PixelShader};
use crate::io::config::{TriangleConfig, to_vector3, to_vector4};
use nalgebra::{Vector3, Vector4};

/// Wireframe-style shader: opaque edge color close to any triangle edge,
/// translucent fill elsewhere. Ignores texture and lights.
pub struct DebugShader {
    pub edge_color: Vector3<f32>,
    pub fill_color: Vector4<f32>,
    pub edge_threshold: f32,
}

impl DebugShader {
    pub fn from_config(config: &TriangleConfig) -> Self {
        Self {
            edge_color: to_vector3(config.edge_color),
            fill_color: to_vector4(config.fill_color),
            edge_threshold: config.edge_threshold,
        }
    }
}

impl PixelShader for DebugShader {
    fn shade(&self, fragment: &Fragment) -> Vector4<f32> {
        if is_near_edge(fragment.bary, self.edge_threshold) {
            self.edge_color.push(1.0)
        } else {
            self.fill_color
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::SurfaceVarying;
    use nalgebra::{Point3, Vector2};

    fn fragment(bary: Vector3<f32>) -> Fragment {
        Fragment {
            x: 0,
            y: 0,
            bary,
            depth: 0.0,
            varying: SurfaceVarying {
                position: Point3::origin(),
                normal: Vector3::z(),
                u_tangent: Vector3::x(),
                v_tangent: Vector3::y(),
                uv: Vector2::zeros(),
            },
        }
    }

    #[test]
    fn edges_are_opaque_interior_is_translucent() {
        let shader = DebugShader::from_config(&TriangleConfig::default());
        let edge = shader.shade(&fragment(Vector3::new(0.01, 0.49, 0.5)));
        assert_eq!(edge, Vector4::new(0.0, 0.0, 0.0, 1.0));

        let inside = shader.shade(&fragment(Vector3::new(0.3, 0.3, 0.4)));
        assert_eq!(inside.xyz(), Vector3::new(0.0, 1.0, 0.0));
        assert!(inside.w < 1.0);
    }
}
