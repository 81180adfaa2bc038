/// Leaf-bounds extraction from layout dumps.
///
/// Streams the document once; every `<node>` element is considered in
/// document order, and only nodes without child elements (of any tag)
/// contribute a box. Problems are reported as diagnostics, never as errors.
use std::fmt;
use std::sync::OnceLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use serde::Serialize;

use crate::layout::types::{BoundingBox, LayoutNode};

const NODE_TAG: &[u8] = b"node";
const BOUNDS_ATTR: &str = "bounds";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundsDiagnostic {
    /// Attribute did not contain `[int,int][int,int]`, or a value overflowed.
    MalformedBounds { raw: String },
    /// `left > right` or `top > bottom`.
    InvertedBounds { raw: String },
    /// The XML itself broke; boxes found before `position` are kept.
    UnreadableDocument { position: u64, message: String },
}

impl fmt::Display for BoundsDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedBounds { raw } => write!(f, "malformed bounds: {raw:?}"),
            Self::InvertedBounds { raw } => write!(f, "inverted bounds: {raw:?}"),
            Self::UnreadableDocument { position, message } => {
                write!(f, "unreadable layout dump at byte {position}: {message}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub boxes: Vec<BoundingBox>,
    pub diagnostics: Vec<BoundsDiagnostic>,
}

fn bounds_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+),(\d+)\]\[(\d+),(\d+)\]").expect("static regex"))
}

/// Parse one `bounds` attribute value.
pub fn parse_bounds(raw: &str) -> Result<BoundingBox, BoundsDiagnostic> {
    let malformed = || BoundsDiagnostic::MalformedBounds {
        raw: raw.to_string(),
    };
    let caps = bounds_pattern().captures(raw).ok_or_else(malformed)?;
    let mut values = [0i32; 4];
    for (slot, idx) in values.iter_mut().zip(1..=4) {
        *slot = caps[idx].parse::<i32>().map_err(|_| malformed())?;
    }
    let [left, top, right, bottom] = values;
    let bbox = BoundingBox::new(left, top, right, bottom);
    if !bbox.is_well_formed() {
        return Err(BoundsDiagnostic::InvertedBounds {
            raw: raw.to_string(),
        });
    }
    Ok(bbox)
}

fn read_node(e: &BytesStart<'_>) -> LayoutNode {
    let bounds = match e.try_get_attribute(BOUNDS_ATTR) {
        Ok(Some(attr)) => attr
            .unescape_value()
            .map(|v| v.into_owned())
            .ok()
            .or_else(|| Some(String::from_utf8_lossy(&attr.value).into_owned())),
        _ => None,
    };
    LayoutNode {
        bounds,
        child_count: 0,
    }
}

fn visit_leaf(node: &LayoutNode, out: &mut Extraction) {
    if !node.is_leaf() {
        return;
    }
    let raw = match node.bounds.as_deref() {
        Some(raw) if !raw.is_empty() => raw,
        _ => return,
    };
    match parse_bounds(raw) {
        Ok(bbox) => out.boxes.push(bbox),
        Err(diag) => {
            tracing::warn!(diagnostic = %diag, "skipping leaf node");
            out.diagnostics.push(diag);
        }
    }
}

pub fn extract_leaf_bounds(document: &str) -> Extraction {
    let mut reader = Reader::from_str(document);
    let mut out = Extraction::default();
    // One frame per open element; `None` for elements that are not `<node>`.
    let mut stack: Vec<Option<LayoutNode>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if let Some(Some(parent)) = stack.last_mut() {
                    parent.child_count += 1;
                }
                let frame = (e.local_name().as_ref() == NODE_TAG).then(|| read_node(&e));
                stack.push(frame);
            }
            Ok(Event::Empty(e)) => {
                if let Some(Some(parent)) = stack.last_mut() {
                    parent.child_count += 1;
                }
                if e.local_name().as_ref() == NODE_TAG {
                    visit_leaf(&read_node(&e), &mut out);
                }
            }
            Ok(Event::End(_)) => {
                if let Some(Some(node)) = stack.pop() {
                    visit_leaf(&node, &mut out);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                let diag = BoundsDiagnostic::UnreadableDocument {
                    position: reader.buffer_position() as u64,
                    message: e.to_string(),
                };
                tracing::warn!(diagnostic = %diag, kept = out.boxes.len(), "stopping layout scan");
                out.diagnostics.push(diag);
                break;
            }
        }
    }

    tracing::debug!(
        boxes = out.boxes.len(),
        diagnostics = out.diagnostics.len(),
        "leaf bounds extracted"
    );
    out
}
