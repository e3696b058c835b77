//! Category links: `[[Category:Title|sort key]]`.
//!
//! Finding a link is brace-aware: a title or sort key may itself be built from
//! template transclusions, and the `]]` or `|` inside those must not end the
//! link or split it. Templates in the title are expanded before the title is
//! accepted; a title that still carries markup afterwards is rejected.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::debug;

use crate::disabled::{remove_disabled_parts, span_at};
use crate::error::{Error, Result};
use crate::site::Site;
use crate::template::{expand_templates, BraceTree, Expand, MagicWords};

lazy_static! {
    // Namespace prefix right after `[[`. A leading colon makes the link a
    // plain link to the category page, which the character class rejects.
    static ref NAMESPACE_PREFIX: Regex =
        Regex::new(r"^[ \t]*([^\[\]{}|:#<>\n]+?)[ \t]*:").unwrap();
}

/// Characters MediaWiki never allows in a page title.
const ILLEGAL_TITLE_CHARS: &[char] = &['[', ']', '{', '}', '<', '>', '|', '\n'];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub title: String,
    /// `None` for `[[Category:X]]`, `Some("")` for `[[Category:X|]]`.
    pub sort_key: Option<String>,
}

impl Category {
    pub fn new(title: impl Into<String>) -> Self {
        Category {
            title: title.into(),
            sort_key: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// Wikitext link for this category on `site`.
    pub fn to_link(&self, site: &Site) -> String {
        match &self.sort_key {
            Some(key) => format!("[[{}:{}|{}]]", site.category_namespace(), self.title, key),
            None => format!("[[{}:{}]]", site.category_namespace(), self.title),
        }
    }

    /// Accepts a full link (`[[Category:X|k]]`), a namespaced title
    /// (`Category:X`) or a bare title (`X`).
    pub fn from_text(input: &str, site: &Site) -> Result<Self> {
        let input = input.trim();
        if input.starts_with("[[") {
            return get_category_links(input, site)?
                .into_iter()
                .next()
                .ok_or_else(|| Error::invalid_title(input, "not a category link"));
        }

        let title = match input.split_once(':') {
            Some((ns, rest)) if site.is_category_namespace(ns) => rest.trim(),
            _ => input,
        };
        validate_title(title)?;
        Ok(Category::new(title))
    }
}

/// Location of one category link in a text.
struct CategoryLink {
    /// The whole `[[…]]`.
    span: Range<usize>,
    /// Text between the namespace colon and the closing brackets.
    payload: Range<usize>,
    /// First `|` of the payload that is not inside a template.
    pipe: Option<usize>,
}

fn find_category_links(text: &str, site: &Site) -> Vec<CategoryLink> {
    let tree = BraceTree::parse(text);
    let braces = tree.span_ends();
    let mut links = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find("[[") {
        let start = pos + offset;
        if let Some(span) = span_at(tree.disabled(), start) {
            pos = span.end;
            continue;
        }
        match parse_category_link(text, start, site, &braces, tree.disabled()) {
            Some(link) => {
                pos = link.span.end;
                links.push(link);
            }
            None => pos = start + 2,
        }
    }

    links
}

fn parse_category_link(
    text: &str,
    start: usize,
    site: &Site,
    braces: &HashMap<usize, usize>,
    disabled: &[Range<usize>],
) -> Option<CategoryLink> {
    let after_open = start + 2;
    let caps = NAMESPACE_PREFIX.captures(&text[after_open..])?;
    if !site.is_category_namespace(&caps[1]) {
        return None;
    }

    let bytes = text.as_bytes();
    let payload_start = after_open + caps.get(0)?.end();
    let mut pipe = None;
    let mut pos = payload_start;

    while pos < bytes.len() {
        if let Some(&end) = braces.get(&pos) {
            pos = end;
            continue;
        }
        if let Some(span) = span_at(disabled, pos) {
            pos = span.end;
            continue;
        }
        match bytes[pos] {
            b']' if bytes.get(pos + 1) == Some(&b']') => {
                return Some(CategoryLink {
                    span: start..pos + 2,
                    payload: payload_start..pos,
                    pipe,
                });
            }
            b'[' if bytes.get(pos + 1) == Some(&b'[') => return None,
            b'\n' => return None,
            b'|' if pipe.is_none() => pipe = Some(pos),
            _ => {}
        }
        pos += 1;
    }

    None
}

fn validate_title(title: &str) -> Result<()> {
    if title.is_empty() {
        return Err(Error::invalid_title(title, "empty title"));
    }
    if title.contains(ILLEGAL_TITLE_CHARS) {
        return Err(Error::invalid_title(
            title,
            "contains characters not allowed in titles",
        ));
    }
    Ok(())
}

fn resolve_link(text: &str, link: &CategoryLink, expander: &dyn Expand) -> Result<Category> {
    let (raw_title, raw_key) = match link.pipe {
        Some(pipe) => (&text[link.payload.start..pipe], Some(&text[pipe + 1..link.payload.end])),
        None => (&text[link.payload.clone()], None),
    };
    let raw_title = remove_disabled_parts(raw_title);

    let expanded = expand_templates(&raw_title, expander).map_err(|err| {
        let payload = &text[link.payload.clone()];
        debug!(%payload, %err, "unresolvable category title");
        Error::invalid_title(raw_title.as_str(), "template in title cannot be resolved")
    })?;

    // An expansion such as `{{!}}` may still introduce the title/sort key pipe.
    let (title, sort_key) = match (expanded.split_once('|'), raw_key) {
        (Some((title, rest)), Some(key)) => (title, Some(format!("{rest}|{key}"))),
        (Some((title, rest)), None) => (title, Some(rest.to_string())),
        (None, key) => (expanded.as_str(), key.map(str::to_string)),
    };

    let title = title.trim();
    validate_title(title)?;
    Ok(Category {
        title: title.to_string(),
        sort_key,
    })
}

/// Every category link in `text`, in document order.
///
/// Templates in titles are expanded with [`MagicWords`] only; use
/// [`get_category_links_with`] to supply the wiki's own expansions.
pub fn get_category_links(text: &str, site: &Site) -> Result<Vec<Category>> {
    get_category_links_with(text, site, &MagicWords)
}

pub fn get_category_links_with(
    text: &str,
    site: &Site,
    expander: &dyn Expand,
) -> Result<Vec<Category>> {
    find_category_links(text, site)
        .iter()
        .map(|link| resolve_link(text, link, expander))
        .collect()
}

/// Links for `categories`, each followed by `separator`.
pub fn category_format(categories: &[Category], site: &Site, separator: &str) -> String {
    categories
        .iter()
        .map(|category| format!("{}{}", category.to_link(site), separator))
        .collect()
}

/// Cut every category link, its trailing whitespace and, when given, the
/// separator that follows it.
fn strip_links(text: &str, links: &[CategoryLink], separator: &str) -> String {
    let separator = separator.trim();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for link in links {
        if link.span.start > last {
            out.push_str(&text[last..link.span.start]);
        }
        let mut rest = skip_whitespace(text, link.span.end);
        if !separator.is_empty() && text[rest..].starts_with(separator) {
            rest = skip_whitespace(text, rest + separator.len());
        }
        last = last.max(rest);
    }
    out.push_str(&text[last..]);

    out.trim().to_string()
}

fn skip_whitespace(text: &str, pos: usize) -> usize {
    let rest = &text[pos..];
    pos + (rest.len() - rest.trim_start().len())
}

/// `text` without any category links.
pub fn remove_category_links(text: &str, site: &Site) -> String {
    let links = find_category_links(text, site);
    strip_links(text, &links, "")
}

/// Whitespace between the body and the first link when every link sits in one
/// block after the body.
fn trailing_block_gap<'t>(
    text: &'t str,
    links: &[CategoryLink],
    body: &str,
) -> Option<&'t str> {
    let first = links.first()?.span.start;
    let before = text[..first].trim_end();
    (before.trim_start() == body).then(|| &text[before.len()..first])
}

/// Replace every category link in `text` with `categories`, written as one
/// block at the end of the page.
///
/// Feeding back the result of [`get_category_links`] with the separator the
/// page already uses reproduces the page unchanged. An existing trailing block
/// keeps the spacing that precedes it; otherwise the block is set off from the
/// body by two separators.
pub fn replace_category_links(
    text: &str,
    categories: &[Category],
    site: &Site,
    separator: &str,
) -> String {
    let links = find_category_links(text, site);
    let body = strip_links(text, &links, separator);
    let block = category_format(categories, site, separator);
    if block.is_empty() {
        return body;
    }

    let joined = if body.is_empty() {
        block
    } else {
        match trailing_block_gap(text, &links, &body) {
            Some(gap) => format!("{body}{gap}{block}"),
            None => format!("{body}{separator}{separator}{block}"),
        }
    };

    let trimmed = joined.trim();
    let trimmed = match separator.trim() {
        "" => trimmed,
        sep => trimmed.strip_suffix(sep).unwrap_or(trimmed).trim_end(),
    };
    trimmed.to_string()
}
