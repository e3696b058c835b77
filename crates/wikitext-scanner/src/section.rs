//! Section anchors and lookup of a section by name.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;
use unicode_normalization::UnicodeNormalization;

use crate::disabled::remove_disabled_parts;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?m)^(={1,6})(.+?)(={1,6})[ \t]*\r?$").unwrap();
}

/// Anchor of a heading or a requested section name.
///
/// Spaces and underscores are interchangeable and case is kept. Surrounding
/// bold/italic quotes are dropped and a link written as `[[:Target]]` counts
/// the same as `[[Target]]`. HTML escapes such as `.28` for `(` are left
/// alone, so `Talk_.28x.29` and `Talk_(x)` are different anchors.
fn anchor(text: &str) -> String {
    let text: String = text.nfc().collect();
    let text = text.replace('_', " ").replace("[[:", "[[");
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c| c == ' ' || c == '\'')
        .replace(' ', "_")
}

/// Anchors of every heading in `document`, in order.
pub fn section_anchors(document: &str) -> Vec<String> {
    let document = remove_disabled_parts(document);
    let anchors: Vec<String> = HEADING
        .captures_iter(&document)
        .map(|cap| anchor(&cap[2]))
        .filter(|anchor| !anchor.is_empty())
        .collect();
    trace!(count = anchors.len(), "scanned headings");
    anchors
}

/// Whether `document` has a heading whose anchor is `section_name`.
///
/// Matching is case-sensitive. A heading made of a link only matches when the
/// link markup is part of the query: `[[Wiki markup]]` finds
/// `==[[Wiki markup]]==` but `Wiki markup` does not.
pub fn contains_section(document: &str, section_name: &str) -> bool {
    let wanted = anchor(section_name);
    !wanted.is_empty() && section_anchors(document).iter().any(|a| *a == wanted)
}
