//! Month-name tables used to read signature dates.

use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

const BUILTIN_MONTHS: &str = include_str!("../../data/months.yaml");

static BUILTIN: OnceCell<HashMap<String, MonthNames>> = OnceCell::new();

/// Full name and abbreviation of the twelve months in one language.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<(String, String)>")]
pub struct MonthNames {
    names: Vec<(String, String)>,
}

impl TryFrom<Vec<(String, String)>> for MonthNames {
    type Error = Error;

    fn try_from(names: Vec<(String, String)>) -> Result<Self> {
        if names.len() != 12 {
            return Err(Error::MonthCount(names.len()));
        }
        let names = names
            .into_iter()
            .map(|(long, short)| (long.nfc().collect(), short.nfc().collect()))
            .collect();
        Ok(MonthNames { names })
    }
}

fn builtin() -> &'static HashMap<String, MonthNames> {
    BUILTIN.get_or_init(|| {
        serde_yaml::from_str(BUILTIN_MONTHS).unwrap_or_else(|err| {
            warn!(error = %err, "built-in month table is unreadable");
            HashMap::new()
        })
    })
}

impl MonthNames {
    /// Shipped table for `lang`, if there is one.
    pub fn for_language(lang: &str) -> Option<&'static MonthNames> {
        builtin().get(lang)
    }

    /// Languages with a shipped table, sorted.
    pub fn languages() -> Vec<&'static str> {
        let mut langs: Vec<&str> = builtin().keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    /// A table given as a YAML list of twelve `[full, abbreviation]` pairs.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Every spelling accepted for a month: full name, abbreviation, and the
    /// abbreviation without its trailing dot.
    pub fn spellings(&self) -> impl Iterator<Item = (&str, u32)> {
        self.names.iter().zip(1..).flat_map(|((long, short), n)| {
            let undotted = short.strip_suffix('.').filter(|s| !s.is_empty());
            [Some(long.as_str()), Some(short.as_str()), undotted]
                .into_iter()
                .flatten()
                .map(move |name| (name, n))
        })
    }

    /// Month of the year (1-12) for any accepted spelling.
    pub fn month_number(&self, name: &str) -> Option<u32> {
        let name: String = name.nfc().collect();
        self.spellings()
            .find(|(spelling, _)| *spelling == name)
            .map(|(_, n)| n)
    }
}
