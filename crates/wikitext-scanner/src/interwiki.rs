//! Language links (`[[de:Titel]]`) that tie a page to its translations.

use serde::{Deserialize, Serialize};

/// A link to the same topic on another language's wiki.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterwikiLink {
    pub lang: String,
    pub title: String,
}

impl InterwikiLink {
    pub fn new(lang: impl Into<String>, title: impl Into<String>) -> Self {
        InterwikiLink {
            lang: lang.into(),
            title: title.into(),
        }
    }

    pub fn to_link(&self) -> String {
        format!("[[{}:{}]]", self.lang, self.title)
    }
}

/// Links sorted by language code, each followed by `separator`.
pub fn interwiki_format(links: &[InterwikiLink], separator: &str) -> String {
    let mut sorted: Vec<&InterwikiLink> = links.iter().collect();
    sorted.sort_by(|a, b| a.lang.cmp(&b.lang));
    sorted
        .into_iter()
        .map(|link| format!("{}{}", link.to_link(), separator))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sorted_by_language() {
        let links = [
            InterwikiLink::new("fr", "French"),
            InterwikiLink::new("de", "German"),
        ];
        assert_eq!(interwiki_format(&links, "\n"), "[[de:German]]\n[[fr:French]]\n");
    }

    #[test]
    fn equal_codes_keep_input_order() {
        let links = [
            InterwikiLink::new("nl", "B"),
            InterwikiLink::new("en", "A"),
            InterwikiLink::new("nl", "A"),
        ];
        assert_eq!(interwiki_format(&links, " "), "[[en:A]] [[nl:B]] [[nl:A]] ");
    }

    #[test]
    fn nothing_to_format() {
        assert_eq!(interwiki_format(&[], "\n"), "");
    }
}
