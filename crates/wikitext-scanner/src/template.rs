//! Template transclusions: `{{name|positional|key=value}}`.
//!
//! Braces are matched with a counter-based scanner over byte offsets instead
//! of repeated regex passes. Every `{{…}}` (template) and `{{{…}}}` (template
//! argument) span becomes a node in a flat arena, pushed in the order the
//! spans close, which is depth-first and innermost-first. Splitting a template
//! on `|` then walks its own bytes and jumps over the spans of its children,
//! so pipes belonging to nested constructs are never mistaken for separators.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::trace;

use crate::disabled::{disabled_spans, remove_disabled_parts, span_at};
use crate::error::{Error, Result};

/// Upper bound on expansion steps for a single piece of text.
const MAX_EXPANSIONS: usize = 64;

/// Template parameters in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters(Vec<(String, String)>);

impl Parameters {
    pub fn new() -> Self {
        Parameters(Vec::new())
    }

    /// Set `key` to `value`. A key that is already present keeps its
    /// position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// A parsed `{{name|…}}` transclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub params: Parameters,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Template {
            name: name.into(),
            params: Parameters::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Value of the `n`th positional parameter (1-based).
    pub fn positional(&self, n: usize) -> Option<&str> {
        self.params.get(&n.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Brace scanner
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BraceKind {
    /// `{{…}}`
    Template,
    /// `{{{…}}}`, a parameter reference inside a template body
    Argument,
}

impl BraceKind {
    fn width(self) -> usize {
        match self {
            BraceKind::Template => 2,
            BraceKind::Argument => 3,
        }
    }
}

#[derive(Debug)]
struct BraceNode {
    kind: BraceKind,
    span: Range<usize>,
    /// Between the last opening and the first closing brace.
    inner: Range<usize>,
    /// Arena indices of directly nested nodes, left to right.
    children: Vec<usize>,
}

/// A run of opening braces still waiting for its closers.
struct OpenRun {
    /// Offset of each brace; disabled regions may sit between them.
    braces: Vec<usize>,
    children: Vec<usize>,
}

/// One `|`-separated piece of a template body.
struct Segment {
    span: Range<usize>,
    /// First top-level `=`, if the piece is a named parameter.
    eq: Option<usize>,
}

/// Brace structure of a text. Nodes are stored innermost-first.
pub(crate) struct BraceTree<'a> {
    text: &'a str,
    disabled: Vec<Range<usize>>,
    nodes: Vec<BraceNode>,
}

impl<'a> BraceTree<'a> {
    pub(crate) fn parse(text: &'a str) -> Self {
        let bytes = text.as_bytes();
        let disabled = disabled_spans(text);
        let mut nodes = Vec::new();
        let mut stack: Vec<OpenRun> = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            if let Some(span) = span_at(&disabled, pos) {
                pos = span.end;
                continue;
            }
            match bytes[pos] {
                b'{' => {
                    let (braces, end) = brace_run(bytes, pos, b'{', &disabled);
                    if braces.len() >= 2 {
                        stack.push(OpenRun {
                            braces,
                            children: Vec::new(),
                        });
                    }
                    pos = end;
                }
                b'}' => {
                    let (braces, end) = brace_run(bytes, pos, b'}', &disabled);
                    close_runs(&mut stack, &mut nodes, &braces);
                    pos = end;
                }
                _ => pos += 1,
            }
        }

        BraceTree {
            text,
            disabled,
            nodes,
        }
    }

    pub(crate) fn disabled(&self) -> &[Range<usize>] {
        &self.disabled
    }

    /// End offset of the widest brace construct opening at each position.
    pub(crate) fn span_ends(&self) -> HashMap<usize, usize> {
        let mut ends = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let end = ends.entry(node.span.start).or_insert(node.span.end);
            *end = (*end).max(node.span.end);
        }
        ends
    }

    fn templates(&self) -> impl Iterator<Item = (&BraceNode, Template)> + '_ {
        self.nodes
            .iter()
            .filter(|node| node.kind == BraceKind::Template)
            .filter_map(|node| self.template(node).map(|t| (node, t)))
    }

    /// The innermost, leftmost template together with its span.
    fn first_template(&self) -> Option<(Range<usize>, Template)> {
        self.templates()
            .next()
            .map(|(node, template)| (node.span.clone(), template))
    }

    fn segments(&self, node: &BraceNode) -> Vec<Segment> {
        let bytes = self.text.as_bytes();
        let inner = node.inner.clone();
        let mut children = node
            .children
            .iter()
            .map(|&idx| self.nodes[idx].span.clone())
            .peekable();

        let mut segments = Vec::new();
        let mut seg_start = inner.start;
        let mut eq = None;
        let mut links = 0usize;
        let mut pos = inner.start;

        while pos < inner.end {
            while children.peek().is_some_and(|child| child.start < pos) {
                children.next();
            }
            if let Some(child) = children.peek() {
                if child.start == pos {
                    pos = child.end;
                    children.next();
                    continue;
                }
            }
            if let Some(span) = span_at(&self.disabled, pos) {
                pos = span.end;
                continue;
            }

            match bytes[pos] {
                b'[' if bytes.get(pos + 1) == Some(&b'[') => {
                    links += 1;
                    pos += 2;
                    continue;
                }
                b']' if links > 0 && bytes.get(pos + 1) == Some(&b']') => {
                    links -= 1;
                    pos += 2;
                    continue;
                }
                b'|' if links == 0 => {
                    segments.push(Segment {
                        span: seg_start..pos,
                        eq: eq.take(),
                    });
                    seg_start = pos + 1;
                }
                b'=' if links == 0 && eq.is_none() => eq = Some(pos),
                _ => {}
            }
            pos += 1;
        }

        segments.push(Segment {
            span: seg_start..inner.end,
            eq,
        });
        segments
    }

    fn template(&self, node: &BraceNode) -> Option<Template> {
        let segments = self.segments(node);
        let (head, args) = segments.split_first()?;

        let name = remove_disabled_parts(&self.text[head.span.clone()])
            .trim()
            .to_string();
        if name.is_empty() {
            return None;
        }

        // Positional numbering skips every key claimed explicitly anywhere in
        // this instance.
        let claimed: Vec<&str> = args
            .iter()
            .filter_map(|seg| seg.eq.map(|eq| self.text[seg.span.start..eq].trim()))
            .collect();

        let mut params = Parameters::new();
        let mut next = 1usize;
        for seg in args {
            match seg.eq {
                Some(eq) => params.insert(
                    self.text[seg.span.start..eq].trim(),
                    self.text[eq + 1..seg.span.end].trim(),
                ),
                None => {
                    while claimed.contains(&next.to_string().as_str()) {
                        next += 1;
                    }
                    params.insert(next.to_string(), &self.text[seg.span.clone()]);
                    next += 1;
                }
            }
        }

        Some(Template { name, params })
    }
}

/// Offsets of the braces in the run starting at `start`, and the offset just
/// past it. Comments and other disabled regions inside the run are skipped,
/// so `{<!-- -->{` opens like `{{`.
fn brace_run(
    bytes: &[u8],
    start: usize,
    brace: u8,
    disabled: &[Range<usize>],
) -> (Vec<usize>, usize) {
    let mut braces = vec![start];
    let mut end = start + 1;
    let mut pos = end;

    while pos < bytes.len() {
        if let Some(span) = span_at(disabled, pos) {
            pos = span.end;
            continue;
        }
        if bytes[pos] != brace {
            break;
        }
        braces.push(pos);
        pos += 1;
        end = pos;
    }
    (braces, end)
}

/// Match a run of closing braces against the open runs, preferring three
/// braces when both sides have them, as MediaWiki does.
fn close_runs(stack: &mut Vec<OpenRun>, nodes: &mut Vec<BraceNode>, closers: &[usize]) {
    let mut closers = closers;

    while closers.len() >= 2 {
        let Some(open) = stack.last_mut() else {
            break;
        };
        let kind = if open.braces.len() >= 3 && closers.len() >= 3 {
            BraceKind::Argument
        } else {
            BraceKind::Template
        };
        let width = kind.width();
        let openers = open.braces.split_off(open.braces.len() - width);
        let (used, rest) = closers.split_at(width);
        let children = std::mem::take(&mut open.children);

        let idx = nodes.len();
        nodes.push(BraceNode {
            kind,
            span: openers[0]..used[width - 1] + 1,
            inner: openers[width - 1] + 1..used[0],
            children,
        });
        closers = rest;

        // A single leftover opening brace is plain text.
        if open.braces.len() < 2 {
            stack.pop();
        }
        if let Some(parent) = stack.last_mut() {
            parent.children.push(idx);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public entry points
// ─────────────────────────────────────────────────────────────────────────────

/// Every template in `text`, innermost first.
///
/// Parameter values keep the original text of nested templates, so
/// `{{a|b={{c}}}}` yields `c` and then `a` with `b = "{{c}}"`. Unbalanced
/// openers are dropped silently.
pub fn extract_templates(text: &str) -> Vec<Template> {
    let tree = BraceTree::parse(text);
    tree.templates().map(|(_, template)| template).collect()
}

/// Source of template expansions, usually backed by the wiki itself.
pub trait Expand {
    fn expand(&self, template: &Template) -> Option<String>;

    /// Try `self` first, then `other`.
    fn or<E: Expand>(self, other: E) -> Or<Self, E>
    where
        Self: Sized,
    {
        Or(self, other)
    }
}

impl<F> Expand for F
where
    F: Fn(&Template) -> Option<String>,
{
    fn expand(&self, template: &Template) -> Option<String> {
        self(template)
    }
}

/// Two expanders tried in order.
#[derive(Debug, Clone, Copy)]
pub struct Or<A, B>(A, B);

impl<A: Expand, B: Expand> Expand for Or<A, B> {
    fn expand(&self, template: &Template) -> Option<String> {
        self.0.expand(template).or_else(|| self.1.expand(template))
    }
}

/// Expands the escape templates `{{!}}` and `{{=}}` that every wiki ships.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicWords;

impl Expand for MagicWords {
    fn expand(&self, template: &Template) -> Option<String> {
        if !template.params.is_empty() {
            return None;
        }
        match template.name.as_str() {
            "!" => Some("|".to_string()),
            "=" => Some("=".to_string()),
            _ => None,
        }
    }
}

/// Replace templates innermost-first until none are left.
pub fn expand_templates(text: &str, expander: &dyn Expand) -> Result<String> {
    let mut text = text.to_string();
    let mut steps = 0;

    loop {
        let next = BraceTree::parse(&text).first_template();
        let Some((span, template)) = next else {
            return Ok(text);
        };
        if steps == MAX_EXPANSIONS {
            return Err(Error::ExpansionLimit(MAX_EXPANSIONS));
        }
        steps += 1;

        let Some(expansion) = expander.expand(&template) else {
            return Err(Error::UnexpandedTemplate {
                name: template.name,
            });
        };
        trace!(template = %template.name, %expansion, "expanded template");
        text.replace_range(span, &expansion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tpl(name: &str, params: &[(&str, &str)]) -> Template {
        Template {
            name: name.to_string(),
            params: params.iter().copied().collect(),
        }
    }

    /// `{{Pn|…}}` returns its nth positional argument.
    fn positional_picker(template: &Template) -> Option<String> {
        let n: usize = template.name.strip_prefix('P')?.parse().ok()?;
        Some(template.positional(n).unwrap_or_default().to_string())
    }

    // ─────────────────────────────────────────────────────────────
    // Basic extraction
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn bare_template() {
        assert_eq!(extract_templates("{{a}}"), vec![tpl("a", &[])]);
    }

    #[test]
    fn named_parameter() {
        assert_eq!(extract_templates("{{a|b=c}}"), vec![tpl("a", &[("b", "c")])]);
    }

    #[test]
    fn positional_and_named() {
        assert_eq!(
            extract_templates("{{a|b|c=d}}"),
            vec![tpl("a", &[("1", "b"), ("c", "d")])]
        );
    }

    #[test]
    fn nested_template_comes_first() {
        assert_eq!(
            extract_templates("{{a|b={{c}}}}"),
            vec![tpl("c", &[]), tpl("a", &[("b", "{{c}}")])]
        );
    }

    #[test]
    fn deep_nesting_is_innermost_first() {
        let names: Vec<String> = extract_templates("{{a|{{b|{{c}}}}}}")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn siblings_keep_document_order() {
        let names: Vec<String> = extract_templates("{{a}} text {{b}}{{c|{{d}}}}")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn multiline_infobox() {
        let text = "{{Infobox person\n| name = Ada\n| born = 1815\n}}";
        assert_eq!(
            extract_templates(text),
            vec![tpl("Infobox person", &[("name", "Ada"), ("born", "1815")])]
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Separators
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn pipes_inside_links_do_not_split() {
        assert_eq!(
            extract_templates("{{a|[[b|c]]|d}}"),
            vec![tpl("a", &[("1", "[[b|c]]"), ("2", "d")])]
        );
    }

    #[test]
    fn pipes_inside_nested_templates_do_not_split() {
        assert_eq!(
            extract_templates("{{a|{{b|c}}|d}}"),
            vec![tpl("b", &[("1", "c")]), tpl("a", &[("1", "{{b|c}}"), ("2", "d")])]
        );
    }

    #[test]
    fn equals_inside_nested_template_is_positional() {
        assert_eq!(
            extract_templates("{{a|{{b|x=1}}}}")[1],
            tpl("a", &[("1", "{{b|x=1}}")])
        );
    }

    #[test]
    fn value_may_contain_equals() {
        assert_eq!(
            extract_templates("{{a|url=http://x/?q=1}}"),
            vec![tpl("a", &[("url", "http://x/?q=1")])]
        );
    }

    #[test]
    fn argument_references_are_not_templates() {
        assert!(extract_templates("{{{1}}}").is_empty());
        assert_eq!(
            extract_templates("{{a|{{{1|x}}}|y}}"),
            vec![tpl("a", &[("1", "{{{1|x}}}"), ("2", "y")])]
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Parameter keys
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn positional_numbering_skips_claimed_keys() {
        assert_eq!(
            extract_templates("{{a|1=x|y|z}}"),
            vec![tpl("a", &[("1", "x"), ("2", "y"), ("3", "z")])]
        );
        assert_eq!(
            extract_templates("{{a|y|2=x|z}}"),
            vec![tpl("a", &[("1", "y"), ("2", "x"), ("3", "z")])]
        );
    }

    #[test]
    fn named_parameters_are_trimmed_positional_are_not() {
        assert_eq!(
            extract_templates("{{ a | b | k = v }}"),
            vec![tpl("a", &[("1", " b "), ("k", "v")])]
        );
    }

    #[test]
    fn repeated_key_keeps_last_value() {
        assert_eq!(
            extract_templates("{{a|k=1|j=2|k=3}}"),
            vec![tpl("a", &[("k", "3"), ("j", "2")])]
        );
    }

    #[test]
    fn empty_positional_parameters_are_kept() {
        assert_eq!(
            extract_templates("{{P2||pedia}}"),
            vec![tpl("P2", &[("1", ""), ("2", "pedia")])]
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Malformed input and disabled regions
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn unclosed_template_is_dropped() {
        assert!(extract_templates("{{a|b").is_empty());
        assert_eq!(extract_templates("{{a|{{b}}"), vec![tpl("b", &[])]);
    }

    #[test]
    fn stray_closers_are_text() {
        assert_eq!(extract_templates("}} {{a}} }}"), vec![tpl("a", &[])]);
    }

    #[test]
    fn empty_name_is_not_a_template() {
        assert!(extract_templates("{{}} {{ |x}}").is_empty());
    }

    #[test]
    fn triple_open_double_close_matches_inner_pair() {
        assert_eq!(extract_templates("nasty{{{!}}"), vec![tpl("!", &[])]);
    }

    #[test]
    fn comments_are_ignored() {
        assert!(extract_templates("<!-- {{a}} -->").is_empty());
        assert_eq!(
            extract_templates("{{a<!-- note -->|b}}"),
            vec![tpl("a", &[("1", "b")])]
        );
        assert_eq!(
            extract_templates("{{a|b<!--|-->c}}"),
            vec![tpl("a", &[("1", "b<!--|-->c")])]
        );
    }

    #[test]
    fn comment_inside_brace_run() {
        assert_eq!(extract_templates("{<!-- -->{a}}"), vec![tpl("a", &[])]);
        assert_eq!(extract_templates("{{a|b}<!-- x -->}"), vec![tpl("a", &[("1", "b")])]);
        assert_eq!(
            extract_templates("{{<!-- -->{1}}}"),
            Vec::<Template>::new(),
            "comment inside a triple run still makes an argument"
        );
        assert_eq!(
            expand_templates("x{<!-- c -->{!}}y", &MagicWords).unwrap(),
            "x|y"
        );
    }

    #[test]
    fn nowiki_hides_templates() {
        assert_eq!(extract_templates("<nowiki>{{a}}</nowiki>{{b}}"), vec![tpl("b", &[])]);
    }

    #[test]
    fn non_ascii_text_around_templates() {
        assert_eq!(
            extract_templates("Ünïcödé {{Zitat|Tür=Öffnung}} ✓"),
            vec![tpl("Zitat", &[("Tür", "Öffnung")])]
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Expansion
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn magic_words_expand() {
        assert_eq!(
            expand_templates("Foo{{!}}and{{!}}bar", &MagicWords).unwrap(),
            "Foo|and|bar"
        );
        assert_eq!(expand_templates("a{{=}}b", &MagicWords).unwrap(), "a=b");
    }

    #[test]
    fn nested_expansion_resolves_inside_out() {
        let expander = MagicWords.or(positional_picker);
        assert_eq!(
            expand_templates("{{P1|{{P2|L33t|Foo}}}}", &expander).unwrap(),
            "Foo"
        );
        assert_eq!(
            expand_templates("Wiki{{P2||pedia}}", &expander).unwrap(),
            "Wikipedia"
        );
    }

    #[test]
    fn unknown_template_fails() {
        let err = expand_templates("x{{Unknown}}", &MagicWords).unwrap_err();
        assert!(matches!(err, Error::UnexpandedTemplate { name } if name == "Unknown"));
    }

    #[test]
    fn self_reproducing_template_hits_limit() {
        let looping = |_: &Template| Some("{{loop}}".to_string());
        let err = expand_templates("{{loop}}", &looping).unwrap_err();
        assert!(matches!(err, Error::ExpansionLimit(_)));
    }

    #[test]
    fn text_without_templates_is_returned_as_is() {
        assert_eq!(expand_templates("plain [[link]]", &MagicWords).unwrap(), "plain [[link]]");
    }
}
