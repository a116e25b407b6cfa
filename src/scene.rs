pub mod bezier;
pub mod light;
pub mod mesh;
pub mod texture;
