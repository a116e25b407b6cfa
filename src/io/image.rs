use crate::core::framebuffer::Canvas;
use crate::error::Result;
use crate::scene::texture::Texture;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes the canvas as an 8-bit RGB image; the format follows the
/// extension (PNG in practice).
pub fn save_canvas<P: AsRef<Path>>(canvas: &Canvas, path: P) -> Result<()> {
    let path_ref = path.as_ref();
    canvas.to_rgb_image().save(path_ref)?;
    info!(
        "Saved {}x{} canvas to {:?}",
        canvas.width(),
        canvas.height(),
        path_ref
    );
    Ok(())
}

/// Loads a texture or normal map ready to be shared between meshes.
pub fn load_texture<P: AsRef<Path>>(path: P) -> Result<Arc<Texture>> {
    Texture::load(path).map(Arc::new)
}

/// `out.png` → `out_0007.png` for frame 7.
pub fn frame_path<P: AsRef<Path>>(base: P, frame: usize) -> PathBuf {
    let base = base.as_ref();
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{stem}_{frame:04}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{frame:04}"),
    };
    base.with_file_name(name)
}
