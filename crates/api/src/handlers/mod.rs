pub mod accidents;
pub mod cameras;
pub mod stream;
