use crate::core::color::{blend_over, pack_rgb, packed_to_rgb8, unpack_rgb};
use atomic_float::AtomicF32;
use image::RgbImage;
use nalgebra::{Vector3, Vector4};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// The render output: a fixed-size grid of packed `0xAARRGGBB` pixels.
///
/// Pixels are atomics so rasterizer workers can write through a shared
/// reference. Whether those writes race depends on how the work is split:
/// tiled rasterization never lets two workers touch the same pixel.
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<AtomicU32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, background: Vector3<f32>) -> Self {
        let packed = pack_rgb(background);
        let pixels = (0..width * height).map(|_| AtomicU32::new(packed)).collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Overwrites every pixel with `color`.
    pub fn fill(&self, color: Vector3<f32>) {
        let packed = pack_rgb(color);
        self.pixels
            .par_iter()
            .for_each(|p| p.store(packed, Ordering::Relaxed));
    }

    /// Bounds-checked opaque write. Out-of-canvas writes are dropped.
    #[inline]
    pub fn set_pixel(&self, x: usize, y: usize, color: Vector3<f32>) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.pixels[idx].store(pack_rgb(color), Ordering::Relaxed);
        }
    }

    /// Writes `color` over the current pixel using its alpha channel.
    #[inline]
    pub fn blend_pixel(&self, x: usize, y: usize, color: Vector4<f32>) {
        if x >= self.width || y >= self.height {
            return;
        }
        if color.w >= 1.0 {
            self.set_pixel(x, y, color.xyz());
            return;
        }
        let idx = self.index(x, y);
        let dst = unpack_rgb(self.pixels[idx].load(Ordering::Relaxed));
        self.pixels[idx].store(pack_rgb(blend_over(color, dst)), Ordering::Relaxed);
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Vector3<f32>> {
        self.get_packed(x, y).map(unpack_rgb)
    }

    pub fn get_rgb8(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        self.get_packed(x, y).map(packed_to_rgb8)
    }

    pub fn get_packed(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.index(x, y)].load(Ordering::Relaxed))
    }

    /// Snapshot of the canvas as an 8-bit RGB image.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let packed = self.pixels[self.index(x as usize, y as usize)].load(Ordering::Relaxed);
            image::Rgb(packed_to_rgb8(packed))
        })
    }
}

/// Per-pixel depth store. Larger z is nearer to the viewer; the cleared
/// value is `-inf`, meaning nothing has been drawn yet.
pub struct DepthBuffer {
    width: usize,
    height: usize,
    depths: Vec<AtomicF32>,
}

impl DepthBuffer {
    pub const CLEARED: f32 = f32::NEG_INFINITY;

    pub fn new(width: usize, height: usize) -> Self {
        let depths = (0..width * height)
            .map(|_| AtomicF32::new(Self::CLEARED))
            .collect();
        Self {
            width,
            height,
            depths,
        }
    }

    pub fn clear(&self) {
        self.depths
            .par_iter()
            .for_each(|d| d.store(Self::CLEARED, Ordering::Relaxed));
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.depths[y * self.width + x].load(Ordering::Relaxed))
    }

    /// Depth test and update in one atomic step.
    ///
    /// Passes when `depth >= stored`, so of two fragments at the same depth
    /// the later one wins. On success the stored depth becomes `depth`.
    #[inline]
    pub fn test_and_set(&self, x: usize, y: usize, depth: f32) -> bool {
        if x >= self.width || y >= self.height || depth.is_nan() {
            return false;
        }
        let previous = self.depths[y * self.width + x].fetch_max(depth, Ordering::AcqRel);
        depth >= previous
    }
}

/// The canvas and depth buffer a draw pass writes into.
#[derive(Clone, Copy)]
pub struct RenderTarget<'a> {
    pub canvas: &'a Canvas,
    pub depth: &'a DepthBuffer,
}

impl RenderTarget<'_> {
    /// Depth-tested opaque write, used by overlay primitives.
    #[inline]
    pub fn plot(&self, x: i64, y: i64, depth: f32, color: Vector3<f32>) {
        if !self.canvas.in_bounds(x, y) {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if self.depth.test_and_set(x, y, depth) {
            self.canvas.set_pixel(x, y, color);
        }
    }
}
