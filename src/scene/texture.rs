use crate::core::color::rgb8_to_color;
use crate::error::Result;
use image::RgbImage;
use log::info;
use nalgebra::Vector3;
use std::path::Path;

/// An immutable RGB bitmap sampled nearest-neighbour.
///
/// Meshes share textures through `Arc<Texture>`; replacing a texture swaps the
/// `Arc`, the pixels themselves are never mutated.
#[derive(Debug, Clone)]
pub struct Texture {
    image: RgbImage,
}

impl Texture {
    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }

    /// Builds a texture from row-major `[r, g, b]` pixels.
    ///
    /// Returns `None` if `pixels.len() != width * height`.
    pub fn from_rgb8(width: u32, height: u32, pixels: &[[u8; 3]]) -> Option<Self> {
        let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
        RgbImage::from_raw(width, height, raw).map(Self::from_image)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let image = image::open(path_ref)?.to_rgb8();
        info!(
            "Loaded texture: {:?} ({}x{})",
            path_ref,
            image.width(),
            image.height()
        );
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Nearest texel at `(u * width, v * height)`, clamped to the image.
    /// V is not flipped: v = 0 is the top row.
    pub fn sample(&self, u: f32, v: f32) -> Vector3<f32> {
        rgb8_to_color(self.texel(u, v))
    }

    /// Samples the texture as a normal map, decoding each channel from
    /// [0, 255] to [-1, 1].
    pub fn sample_normal(&self, u: f32, v: f32) -> Vector3<f32> {
        self.sample(u, v).map(|c| c * 2.0 - 1.0)
    }

    fn texel(&self, u: f32, v: f32) -> [u8; 3] {
        let (w, h) = (self.image.width(), self.image.height());
        if w == 0 || h == 0 {
            return [0, 0, 0];
        }
        let x = clamp_texel(u * w as f32, w);
        let y = clamp_texel(v * h as f32, h);
        self.image.get_pixel(x, y).0
    }
}

#[inline]
fn clamp_texel(coord: f32, size: u32) -> u32 {
    if coord.is_nan() || coord <= 0.0 {
        0
    } else {
        (coord as u32).min(size - 1)
    }
}
