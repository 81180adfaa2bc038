pub mod extractor;
pub mod types;

pub use extractor::{extract_leaf_bounds, BoundsDiagnostic, Extraction};
pub use types::{BoundingBox, LayoutNode};
