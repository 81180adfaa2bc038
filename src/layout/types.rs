use serde::{Deserialize, Serialize};

/// Element bounds in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// May be negative for inverted boxes.
    pub fn width(&self) -> i64 {
        self.right as i64 - self.left as i64
    }

    pub fn height(&self) -> i64 {
        self.bottom as i64 - self.top as i64
    }

    pub fn is_well_formed(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom
    }
}

/// A `<node>` seen while scanning a layout dump. Lives only for the scan.
#[derive(Debug, Clone, Default)]
pub struct LayoutNode {
    pub bounds: Option<String>,
    pub child_count: usize,
}

impl LayoutNode {
    pub fn is_leaf(&self) -> bool {
        self.child_count == 0
    }
}
