//! Structural parsing of wikitext.
//!
//! Turns human-authored MediaWiki markup into typed values and back:
//! templates (`{{name|arg|k=v}}`), category links, section anchors and the
//! signature timestamps left on discussion pages. Everything works on
//! in-memory strings; fetching and storing pages belongs to the caller.

pub mod category;
pub mod digits;
mod disabled;
pub mod error;
pub mod interwiki;
pub mod section;
pub mod site;
pub mod template;
pub mod timestripper;

pub use category::{
    category_format, get_category_links, get_category_links_with, remove_category_links,
    replace_category_links, Category,
};
pub use digits::{digit_table, from_local_digits, to_local_digits};
pub use error::{Error, Result};
pub use interwiki::{interwiki_format, InterwikiLink};
pub use section::{contains_section, section_anchors};
pub use site::Site;
pub use template::{expand_templates, extract_templates, Expand, MagicWords, Parameters, Template};
pub use timestripper::{
    find_marker, last_match_and_replace, MonthNames, TimeStripper, Timestamp, Timezone,
};
