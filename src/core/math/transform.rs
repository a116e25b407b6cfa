use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3};

//=================================
// Transform Matrix Factory
//=================================

/// Factory for the model-space transforms used by the scene driver.
/// Manually implemented to keep full control over the (right-handed) convention.
pub struct TransformFactory;

#[rustfmt::skip]
impl TransformFactory {
    /// Creates a rotation matrix around an arbitrary axis using Rodrigues' rotation formula.
    pub fn rotation(axis: &Vector3<f32>, angle_rad: f32) -> Matrix4<f32> {
        let axis_unit = axis.normalize();
        let x = axis_unit.x;
        let y = axis_unit.y;
        let z = axis_unit.z;
        let c = angle_rad.cos();
        let s = angle_rad.sin();
        let t = 1.0 - c;

        Matrix4::new(
            t * x * x + c,     t * x * y - z * s, t * x * z + y * s, 0.0,
            t * x * y + z * s, t * y * y + c,     t * y * z - x * s, 0.0,
            t * x * z - y * s, t * y * z + x * s, t * z * z + c,     0.0,
            0.0,               0.0,               0.0,               1.0,
        )
    }

    /// Creates a rotation matrix around the X-axis.
    pub fn rotation_x(angle_rad: f32) -> Matrix4<f32> {
        let c = angle_rad.cos();
        let s = angle_rad.sin();
        Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c,  -s,   0.0,
            0.0, s,   c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Creates a rotation matrix around the Y-axis.
    pub fn rotation_y(angle_rad: f32) -> Matrix4<f32> {
        let c = angle_rad.cos();
        let s = angle_rad.sin();
        Matrix4::new(
            c,   0.0, s,   0.0,
            0.0, 1.0, 0.0, 0.0,
           -s,   0.0, c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Creates a rotation matrix around the Z-axis.
    pub fn rotation_z(angle_rad: f32) -> Matrix4<f32> {
        let c = angle_rad.cos();
        let s = angle_rad.sin();
        Matrix4::new(
            c,  -s,   0.0, 0.0,
            s,   c,   0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation by Euler angles given in degrees, as the product `Rx * Ry * Rz`.
    /// Acting on a column vector, the Z rotation is applied first and X last.
    pub fn rotation_euler_degrees(x_deg: f32, y_deg: f32, z_deg: f32) -> Matrix4<f32> {
        Self::rotation_x(x_deg.to_radians())
            * Self::rotation_y(y_deg.to_radians())
            * Self::rotation_z(z_deg.to_radians())
    }

    /// Creates a translation matrix.
    pub fn translation(translation: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new(
            1.0, 0.0, 0.0, translation.x,
            0.0, 1.0, 0.0, translation.y,
            0.0, 0.0, 1.0, translation.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Creates a non-uniform scaling matrix.
    pub fn scaling_nonuniform(scale: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new(
            scale.x, 0.0,     0.0,     0.0,
            0.0,     scale.y, 0.0,     0.0,
            0.0,     0.0,     scale.z, 0.0,
            0.0,     0.0,     0.0,     1.0,
        )
    }

    /// Conjugates `matrix` by a translation so it acts about `pivot`:
    /// `translate(+pivot) * matrix * translate(-pivot)`.
    pub fn about_pivot(pivot: &Point3<f32>, matrix: &Matrix4<f32>) -> Matrix4<f32> {
        Self::translation(&pivot.coords) * matrix * Self::translation(&-pivot.coords)
    }
}

//=================================
// Direction transforms
//=================================

/// Upper-left 3x3 (linear) part of a homogeneous transform.
#[inline]
pub fn linear_part(matrix: &Matrix4<f32>) -> Matrix3<f32> {
    matrix.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Matrix that maps surface normals under `matrix`: the inverse-transpose of
/// its linear part. For rotations this equals the rotation itself.
/// Singular matrices fall back to the linear part.
pub fn normal_matrix(matrix: &Matrix4<f32>) -> Matrix3<f32> {
    let linear = linear_part(matrix);
    linear
        .try_inverse()
        .map(|inverse| inverse.transpose())
        .unwrap_or(linear)
}

/// Normalizes `v`, treating near-zero vectors as the zero vector.
#[inline]
pub fn safe_normalize(v: Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
}

/// Maps a point in normalized [0,1] canvas space to pixel coordinates.
/// There is no perspective division; z is kept aside as the depth key.
#[inline]
pub fn project_to_canvas(position: &Point3<f32>, width: f32, height: f32) -> Point2<f32> {
    Point2::new(position.x * width, position.y * height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn approx_point(a: &Point3<f32>, b: &Point3<f32>) -> bool {
        (a - b).norm() < 1e-4
    }

    #[test]
    fn full_turn_is_identity() {
        let p = Point3::new(0.3, -0.7, 1.2);
        for m in [
            TransformFactory::rotation_x(2.0 * PI),
            TransformFactory::rotation_y(2.0 * PI),
            TransformFactory::rotation_z(2.0 * PI),
            TransformFactory::rotation(&Vector3::new(1.0, 2.0, 3.0), 2.0 * PI),
        ] {
            assert!(approx_point(&m.transform_point(&p), &p));
        }
    }

    #[test]
    fn pivot_is_a_fixed_point() {
        let pivot = Point3::new(0.5, 0.5, 0.25);
        let m = TransformFactory::about_pivot(&pivot, &TransformFactory::rotation_z(1.1));
        assert!(approx_point(&m.transform_point(&pivot), &pivot));

        let p = Point3::new(1.0, 0.5, 0.25);
        let quarter =
            TransformFactory::about_pivot(&pivot, &TransformFactory::rotation_z(PI / 2.0));
        assert!(approx_point(
            &quarter.transform_point(&p),
            &Point3::new(0.5, 1.0, 0.25)
        ));
    }

    #[test]
    fn euler_matches_axis_product() {
        let m = TransformFactory::rotation_euler_degrees(30.0, 45.0, 60.0);
        let expected = TransformFactory::rotation_x(30f32.to_radians())
            * TransformFactory::rotation_y(45f32.to_radians())
            * TransformFactory::rotation_z(60f32.to_radians());
        assert!((m - expected).norm() < 1e-6);
    }

    #[test]
    fn normal_matrix_of_rotation_is_rotation() {
        let m = TransformFactory::rotation(&Vector3::new(0.2, 1.0, -0.4), 0.8);
        assert!((normal_matrix(&m) - linear_part(&m)).norm() < 1e-5);
    }

    #[test]
    fn normal_matrix_keeps_normals_perpendicular_under_scaling() {
        let m = TransformFactory::scaling_nonuniform(&Vector3::new(2.0, 0.5, 1.0));
        let tangent = Vector3::new(1.0, 1.0, 0.0);
        let normal = Vector3::new(1.0, -1.0, 0.0);

        let t = linear_part(&m) * tangent;
        let n = normal_matrix(&m) * normal;
        assert!(t.dot(&n).abs() < 1e-6);
    }

    #[test]
    fn safe_normalize_zero_vector() {
        assert_eq!(safe_normalize(Vector3::zeros()), Vector3::zeros());
        assert!((safe_normalize(Vector3::new(0.0, 3.0, 4.0)).norm() - 1.0).abs() < 1e-6);
    }
}
