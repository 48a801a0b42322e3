pub mod image;
pub mod session;

pub use image::*;
pub use session::*;
