/// Pair layout dumps with screenshots by shared base file name.
///
/// Names come only from the first group; each group is then searched for a
/// file called `<base>.<ext>` with exactly one extension segment.
use std::sync::OnceLock;

use regex::Regex;

use crate::upload::SharedFile;

#[derive(Debug, Clone)]
pub struct FilePair {
    pub name: String,
    pub layout_dump: Option<SharedFile>,
    pub screenshot: Option<SharedFile>,
}

impl FilePair {
    /// Only complete pairs are eligible for processing.
    pub fn is_complete(&self) -> bool {
        self.layout_dump.is_some() && self.screenshot.is_some()
    }
}

fn only_extension() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\.[^.]+$").expect("static regex"))
}

/// Strip the final `.ext`. A name without a dot, or whose only dot is the
/// leading character, is its own base.
pub fn base_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

fn find_counterpart(base: &str, group: &[SharedFile]) -> Option<SharedFile> {
    group
        .iter()
        .find(|file| {
            file.name()
                .strip_prefix(base)
                .is_some_and(|rest| only_extension().is_match(rest))
        })
        .cloned()
}

/// One entry per file in `group_a`, in `group_a` order. Files in `group_b`
/// whose base name never appears in `group_a` are dropped.
pub fn match_files(group_a: &[SharedFile], group_b: &[SharedFile]) -> Vec<FilePair> {
    group_a
        .iter()
        .map(|file| {
            let name = base_name(file.name()).to_string();
            let layout_dump = find_counterpart(&name, group_a);
            let screenshot = find_counterpart(&name, group_b);
            if layout_dump.is_none() || screenshot.is_none() {
                tracing::debug!(
                    name = %name,
                    has_dump = layout_dump.is_some(),
                    has_screenshot = screenshot.is_some(),
                    "incomplete pair"
                );
            }
            FilePair {
                name,
                layout_dump,
                screenshot,
            }
        })
        .collect()
}

pub fn count_mismatch(group_a_len: usize, group_b_len: usize) -> bool {
    group_a_len != group_b_len
}

/// Some dump could not find its screenshot (or the other way round).
pub fn title_mismatch(pairs: &[FilePair], raw_dump_count: usize) -> bool {
    pairs.iter().filter(|p| p.is_complete()).count() != raw_dump_count
}

/// Base names that occur more than once, in first-seen order.
pub fn duplicate_base_names(pairs: &[FilePair]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut dups = Vec::new();
    for pair in pairs {
        if !seen.insert(pair.name.as_str()) && !dups.contains(&pair.name) {
            dups.push(pair.name.clone());
        }
    }
    dups
}
