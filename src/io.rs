pub mod config;
pub mod control_points;
pub mod image;
pub mod obj_loader;
