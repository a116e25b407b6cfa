use std::io;

/// All error types reported by the loaders and the PNG writer.
///
/// Rendering itself never fails: degenerate geometry and out-of-canvas
/// fragments are dropped silently.
#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    #[error("Control point error on line {line}: {reason}")]
    ControlPoints { line: usize, reason: String },
    #[error("Expected {expected} control points, found {found}")]
    ControlPointCount { expected: usize, found: usize },
    #[error("Invalid tessellation level: {0}")]
    InvalidTessellation(u32),
    #[error("OBJ error: {0}")]
    Obj(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RasterError>;
