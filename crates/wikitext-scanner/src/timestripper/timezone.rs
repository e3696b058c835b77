use chrono::FixedOffset;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

lazy_static! {
    // Abbreviation -> (minutes east of UTC, zone name)
    static ref ABBREVIATIONS: HashMap<&'static str, (i32, &'static str)> = {
        let mut m = HashMap::new();
        m.insert("UTC", (0, "UTC"));
        m.insert("GMT", (0, "Europe/London"));
        m.insert("BST", (60, "Europe/London"));
        m.insert("WET", (0, "Europe/Lisbon"));
        m.insert("WEST", (60, "Europe/Lisbon"));
        m.insert("CET", (60, "Europe/Paris"));
        m.insert("CEST", (120, "Europe/Paris"));
        m.insert("MEZ", (60, "Europe/Berlin"));
        m.insert("MESZ", (120, "Europe/Berlin"));
        m.insert("EET", (120, "Europe/Helsinki"));
        m.insert("EEST", (180, "Europe/Helsinki"));
        m.insert("MSK", (180, "Europe/Moscow"));
        m.insert("IRST", (210, "Asia/Tehran"));
        m.insert("IST", (330, "Asia/Kolkata"));
        m.insert("JST", (540, "Asia/Tokyo"));
        m.insert("KST", (540, "Asia/Seoul"));
        m.insert("AEST", (600, "Australia/Sydney"));
        m.insert("AEDT", (660, "Australia/Sydney"));
        m.insert("EST", (-300, "America/New_York"));
        m.insert("EDT", (-240, "America/New_York"));
        m.insert("CST", (-360, "America/Chicago"));
        m.insert("CDT", (-300, "America/Chicago"));
        m.insert("MST", (-420, "America/Denver"));
        m.insert("MDT", (-360, "America/Denver"));
        m.insert("PST", (-480, "America/Los_Angeles"));
        m.insert("PDT", (-420, "America/Los_Angeles"));
        m
    };
}

/// A fixed UTC offset with a human-readable zone name.
///
/// The offset never changes with the date; `CET` is always +01:00 even in
/// summer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timezone {
    pub offset_minutes: i32,
    pub name: String,
}

impl Timezone {
    pub fn new(offset_minutes: i32, name: impl Into<String>) -> Self {
        Timezone {
            offset_minutes,
            name: name.into(),
        }
    }

    pub fn utc() -> Self {
        Timezone::new(0, "UTC")
    }

    /// Zone for a signature abbreviation such as `CET`.
    pub fn from_abbreviation(abbreviation: &str) -> Option<Self> {
        ABBREVIATIONS
            .get(abbreviation)
            .map(|&(offset, name)| Timezone::new(offset, name))
    }

    /// `None` when the offset is a day or more.
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.offset_minutes.checked_mul(60)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_abbreviations() {
        assert_eq!(
            Timezone::from_abbreviation("CET"),
            Some(Timezone::new(60, "Europe/Paris"))
        );
        assert_eq!(Timezone::from_abbreviation("UTC"), Some(Timezone::utc()));
        assert_eq!(
            Timezone::from_abbreviation("PST").and_then(|tz| tz.offset()),
            FixedOffset::west_opt(8 * 3600)
        );
    }

    #[test]
    fn abbreviations_are_case_sensitive() {
        assert_eq!(Timezone::from_abbreviation("cet"), None);
        assert_eq!(Timezone::from_abbreviation("XYZ"), None);
    }

    #[test]
    fn absurd_offset_has_no_fixed_offset() {
        assert_eq!(Timezone::new(24 * 60, "Nowhere").offset(), None);
    }
}
