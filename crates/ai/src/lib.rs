mod image;
mod structured;

pub mod llm;

pub use image::ImageInput;
pub use structured::{JsonOutputParser, OutputSchema};
