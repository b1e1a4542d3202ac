use image::{ImageBuffer, Rgb};

pub mod camera;
pub mod error;
pub mod font;
pub mod frames;
pub mod geometry;
pub mod label;
pub mod loader;
pub mod palette;
pub mod point;
pub mod render;
pub mod scene;
pub mod screen;
pub mod sequence;

pub use error::VizError;

type ColorDepth = u8;
pub type PixelType = Rgb<ColorDepth>;
pub type ImageType = ImageBuffer<PixelType, Vec<ColorDepth>>;
