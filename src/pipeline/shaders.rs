pub mod debug;
pub mod phong;
