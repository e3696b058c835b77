//! The slice of wiki configuration the scanners need.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Namespace id of categories on every MediaWiki installation.
const CATEGORY_NAMESPACE_ID: i64 = 14;

fn default_category_namespaces() -> Vec<String> {
    vec!["Category".to_string()]
}

/// Language code and namespace names of one wiki.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub code: String,
    /// Names of the category namespace. The first one is written when
    /// serialising links; all of them are accepted when parsing.
    #[serde(default = "default_category_namespaces")]
    pub category_namespaces: Vec<String>,
}

impl Default for Site {
    fn default() -> Self {
        Site::new("en")
    }
}

impl Site {
    pub fn new(code: impl Into<String>) -> Self {
        Site {
            code: code.into(),
            category_namespaces: default_category_namespaces(),
        }
    }

    /// Add another accepted name for the category namespace.
    pub fn with_category_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        if !self.is_category_namespace(&alias) {
            self.category_namespaces.push(alias);
        }
        self
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Build a site from a `meta=siteinfo&siprop=general|namespaces|namespacealiases`
    /// API response.
    pub fn from_siteinfo_json(text: &str) -> Result<Self> {
        let response: SiteInfoResponse = serde_json::from_str(text)?;
        let query = response.query;

        let mut names = Vec::new();
        if let Some(ns) = query.namespaces.get(&CATEGORY_NAMESPACE_ID.to_string()) {
            names.push(ns.name.clone());
            names.extend(ns.canonical.clone());
        }
        names.extend(
            query
                .namespacealiases
                .into_iter()
                .filter(|alias| alias.id == CATEGORY_NAMESPACE_ID)
                .map(|alias| alias.name),
        );
        if names.is_empty() {
            names = default_category_namespaces();
        }

        let mut site = Site {
            code: query.general.lang,
            category_namespaces: Vec::new(),
        };
        for name in names {
            site = site.with_category_alias(name);
        }
        Ok(site)
    }

    /// Name used when writing `[[Category:…]]` links.
    pub fn category_namespace(&self) -> &str {
        self.category_namespaces
            .first()
            .map(String::as_str)
            .unwrap_or("Category")
    }

    /// Whether `name` designates the category namespace. Case-insensitive,
    /// with underscores and spaces interchangeable.
    pub fn is_category_namespace(&self, name: &str) -> bool {
        let wanted = fold_namespace(name);
        self.category_namespaces
            .iter()
            .any(|ns| fold_namespace(ns) == wanted)
    }
}

fn fold_namespace(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// === siteinfo JSON structures ===

#[derive(Debug, Deserialize)]
struct SiteInfoResponse {
    query: SiteInfoQuery,
}

#[derive(Debug, Deserialize)]
struct SiteInfoQuery {
    general: SiteInfoGeneral,
    #[serde(default)]
    namespaces: HashMap<String, SiteInfoNamespace>,
    #[serde(default)]
    namespacealiases: Vec<SiteInfoAlias>,
}

#[derive(Debug, Deserialize)]
struct SiteInfoGeneral {
    lang: String,
}

#[derive(Debug, Deserialize)]
struct SiteInfoNamespace {
    #[serde(rename = "*")]
    name: String,
    canonical: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SiteInfoAlias {
    id: i64,
    #[serde(rename = "*")]
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_english() {
        let site = Site::default();
        assert_eq!(site.code, "en");
        assert_eq!(site.category_namespace(), "Category");
    }

    #[test]
    fn namespace_matching_folds_case_and_underscores() {
        let site = Site::new("de").with_category_alias("Kategorie");
        assert!(site.is_category_namespace("category"));
        assert!(site.is_category_namespace("KATEGORIE"));
        assert!(!site.is_category_namespace("Template"));

        let spaced = Site::new("en").with_category_alias("Sort key");
        assert!(spaced.is_category_namespace("sort_key"));
    }

    #[test]
    fn yaml_without_namespaces_uses_default() {
        let site = Site::from_yaml("code: fr\n").unwrap();
        assert_eq!(site.code, "fr");
        assert_eq!(site.category_namespaces, vec!["Category".to_string()]);
    }

    #[test]
    fn yaml_with_namespaces() {
        let site = Site::from_yaml("code: fr\ncategory_namespaces: [Catégorie, Category]\n").unwrap();
        assert_eq!(site.category_namespace(), "Catégorie");
        assert!(site.is_category_namespace("category"));
    }

    #[test]
    fn siteinfo_response() {
        let json = r#"{
            "batchcomplete": "",
            "query": {
                "general": {"lang": "de", "sitename": "Wikipedia"},
                "namespaces": {
                    "0": {"id": 0, "*": ""},
                    "14": {"id": 14, "*": "Kategorie", "canonical": "Category"}
                },
                "namespacealiases": [
                    {"id": 14, "*": "Category"},
                    {"id": 4, "*": "WP"}
                ]
            }
        }"#;
        let site = Site::from_siteinfo_json(json).unwrap();
        assert_eq!(site.code, "de");
        assert_eq!(
            site.category_namespaces,
            vec!["Kategorie".to_string(), "Category".to_string()]
        );
    }

    #[test]
    fn broken_siteinfo_is_an_error() {
        assert!(Site::from_siteinfo_json("{\"query\": {}}").is_err());
    }
}
