//! Regions of wikitext where markup is inert.
//!
//! Comments and a handful of extension tags keep their content away from the
//! parser, so braces, pipes, links and signatures inside them must not be
//! picked up by any of the scanners.

use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

const INERT_TAGS: &[&str] = &["nowiki", "pre", "source", "syntaxhighlight", "math"];

lazy_static! {
    // An unterminated comment swallows the rest of the page, as MediaWiki does.
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?(?:-->|\z)").unwrap();

    static ref INERT_TAG_PATTERNS: Vec<Regex> = INERT_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(
                r"(?is)<{tag}\b[^>]*?/>|<{tag}\b[^>]*>.*?</{tag}\s*>"
            ))
            .unwrap()
        })
        .collect();
}

/// Byte ranges of every disabled region, sorted and non-overlapping.
///
/// Regions are claimed left to right, so a `<!--` inside `<nowiki>` is not a
/// comment and a `<nowiki>` inside a comment is not a tag.
pub(crate) fn disabled_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let next = std::iter::once(&*COMMENT)
            .chain(INERT_TAG_PATTERNS.iter())
            .filter_map(|re| re.find_at(text, pos))
            .min_by(|a, b| a.start().cmp(&b.start()).then(b.end().cmp(&a.end())));

        match next {
            Some(m) if m.end() > m.start() => {
                spans.push(m.start()..m.end());
                pos = m.end();
            }
            _ => break,
        }
    }

    spans
}

/// The disabled region containing `pos`, if any.
pub(crate) fn span_at(spans: &[Range<usize>], pos: usize) -> Option<&Range<usize>> {
    let idx = spans.partition_point(|span| span.end <= pos);
    spans.get(idx).filter(|span| span.start <= pos)
}

/// Copy of `text` with every disabled region cut out.
pub(crate) fn remove_disabled_parts(text: &str) -> String {
    let spans = disabled_spans(text);
    if spans.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in spans {
        out.push_str(&text[last..span.start]);
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}
