pub mod draw_data;
pub mod overlay;
pub mod renderer;
pub mod shaders;
