pub mod annotator;
pub mod pipeline;

pub use annotator::{render, AnnotatedImage, OverlayStyle};
pub use pipeline::generate_highlights;
