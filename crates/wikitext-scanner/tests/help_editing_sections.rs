use std::fs;
use std::path::PathBuf;

use wikitext_scanner::{contains_section, get_category_links, section_anchors, Category, Site};

fn help_editing() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/pages/enwiki_help_editing.page");
    fs::read_to_string(path).unwrap()
}

#[test]
fn finds_plain_section() {
    assert!(contains_section(&help_editing(), "Editing"));
}

#[test]
fn spaces_in_section() {
    let page = help_editing();
    assert!(contains_section(&page, "Minor_edits"));
    assert!(!contains_section(&page, "#Minor edits"), "'#Minor edits' is not a section name");
    assert!(!contains_section(&page, "Minor Edits"), "section names are case-sensitive");
    assert!(!contains_section(&page, "Minor_Edits"), "section names are case-sensitive");
}

#[test]
fn spaces_outside_section() {
    let page = help_editing();
    assert!(contains_section(&page, "Naming and_moving"));
    assert!(contains_section(&page, " Naming and_moving "));
    assert!(contains_section(&page, " Naming and_moving_"));
}

#[test]
fn link_in_section() {
    let page = help_editing();
    assert!(contains_section(&page, "[[Wiki markup]]"), "link as section header");
    assert!(contains_section(&page, "[[:Wiki markup]]"), "link with leading colon");
    assert!(!contains_section(&page, "Wiki markup"), "section header is a link");

    assert!(contains_section(&page, "[[Help]]ful tips"), "heading containing a link");
    assert!(contains_section(&page, "[[:Help]]ful tips"), "containing link with leading colon");
    assert!(!contains_section(&page, "Helpful tips"), "heading contains a link");
}

#[test]
fn escaped_punctuation_is_not_decoded() {
    let page = help_editing();
    assert!(contains_section(&page, "Talk_(discussion)_pages"));
    assert!(!contains_section(&page, "Talk_.28discussion.29_pages"));
}

#[test]
fn hidden_headings_are_skipped() {
    let anchors = section_anchors(&help_editing());
    assert!(!anchors.iter().any(|a| a == "Old_section"));
    assert!(!anchors.iter().any(|a| a == "Not_a_section"));
    assert_eq!(anchors.first().map(String::as_str), Some("Editing"));
    assert_eq!(anchors.last().map(String::as_str), Some("See_also"));
}

#[test]
fn page_categories() {
    let cats = get_category_links(&help_editing(), &Site::default()).unwrap();
    assert_eq!(
        cats,
        vec![
            Category::new("Wikipedia help").with_sort_key("Editing"),
            Category::new("Wikipedia editor help"),
        ]
    );
}
