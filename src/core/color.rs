use nalgebra::{Vector3, Vector4};

/// Packs a linear [0,1] RGB color into an opaque `0xAARRGGBB` word.
pub fn pack_rgb(color: Vector3<f32>) -> u32 {
    let r = channel_to_u8(color.x) as u32;
    let g = channel_to_u8(color.y) as u32;
    let b = channel_to_u8(color.z) as u32;
    (255 << 24) | (r << 16) | (g << 8) | b
}

/// Inverse of [`pack_rgb`]; the alpha byte is ignored.
pub fn unpack_rgb(packed: u32) -> Vector3<f32> {
    Vector3::new(
        ((packed >> 16) & 0xFF) as f32 / 255.0,
        ((packed >> 8) & 0xFF) as f32 / 255.0,
        (packed & 0xFF) as f32 / 255.0,
    )
}

/// Splits a packed pixel into its `[r, g, b]` bytes.
pub fn packed_to_rgb8(packed: u32) -> [u8; 3] {
    [
        ((packed >> 16) & 0xFF) as u8,
        ((packed >> 8) & 0xFF) as u8,
        (packed & 0xFF) as u8,
    ]
}

/// Converts 8-bit RGB to a [0,1] color.
pub fn rgb8_to_color(rgb: [u8; 3]) -> Vector3<f32> {
    Vector3::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    )
}

#[inline]
pub fn channel_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Clamps every channel to [0,1].
#[inline]
pub fn saturate(color: Vector3<f32>) -> Vector3<f32> {
    color.map(|c| c.clamp(0.0, 1.0))
}

/// Source-over blend of `src` (RGBA, straight alpha) onto an opaque `dst`.
pub fn blend_over(src: Vector4<f32>, dst: Vector3<f32>) -> Vector3<f32> {
    let alpha = src.w.clamp(0.0, 1.0);
    src.xyz() * alpha + dst * (1.0 - alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack_primaries() {
        assert_eq!(pack_rgb(Vector3::new(1.0, 0.0, 0.0)), 0xFFFF0000);
        assert_eq!(pack_rgb(Vector3::new(0.0, 1.0, 0.0)), 0xFF00FF00);
        assert_eq!(packed_to_rgb8(0xFF102030), [0x10, 0x20, 0x30]);
        assert_eq!(unpack_rgb(0xFFFFFFFF), Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn out_of_range_channels_are_clamped() {
        assert_eq!(pack_rgb(Vector3::new(2.0, -1.0, 0.5)), 0xFFFF0080);
        assert_eq!(saturate(Vector3::new(1.5, -0.2, 0.3)), Vector3::new(1.0, 0.0, 0.3));
    }

    #[test]
    fn blending_respects_alpha() {
        let dst = Vector3::new(1.0, 1.0, 1.0);
        let opaque = blend_over(Vector4::new(0.0, 1.0, 0.0, 1.0), dst);
        assert_eq!(opaque, Vector3::new(0.0, 1.0, 0.0));

        let half = blend_over(Vector4::new(0.0, 0.0, 0.0, 0.5), dst);
        assert!((half - Vector3::new(0.5, 0.5, 0.5)).norm() < 1e-6);
    }
}
