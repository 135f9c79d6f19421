pub mod camera;
pub mod incident;
