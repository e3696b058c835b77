//! Finding the most recent signature timestamp in a block of talk-page text.
//!
//! A signature date is never located as one unit. Each component (year, time,
//! month name, day, timezone) is searched for on its own and the rightmost
//! match wins, because on a discussion page the text closest to the end is
//! the latest reply. Every match of a component is then masked out so that a
//! later component cannot read the same digits a second time.

mod months;
mod timezone;

pub use months::MonthNames;
pub use timezone::Timezone;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone as _, Utc};
use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::digits::from_local_digits;
use crate::disabled::remove_disabled_parts;
use crate::error::Result;

lazy_static! {
    static ref YEAR: Regex = Regex::new(r"\b(?P<year>(?:19|20)\d\d)\b").unwrap();
    static ref TIME: Regex =
        Regex::new(r"\b(?P<hour>[01]\d|2[0-3])[:.h](?P<minute>[0-5]\d)\b").unwrap();
    static ref DAY: Regex = Regex::new(r"\b(?P<day>3[01]|[12]\d|0?[1-9])\b").unwrap();
    static ref TIMEZONE: Regex = Regex::new(r"\((?P<tzinfo>[A-Z]{2,5})\)").unwrap();
}

/// Named groups captured by a pattern.
pub type Groups = HashMap<String, String>;

/// A token built from `base` plus as many `delta`s as needed so that it does
/// not occur in `text`. An empty `delta` counts as `"@"`.
pub fn find_marker(text: &str, base: &str, delta: &str) -> String {
    let delta = if delta.is_empty() { "@" } else { delta };
    let mut marker = base.to_string();
    while marker.is_empty() || text.contains(&marker) {
        marker.push_str(delta);
    }
    marker
}

/// Named groups of the rightmost match of `pattern`, and `text` with every
/// match of `pattern` replaced by a fresh marker.
///
/// Without a match the text comes back untouched with `None`.
pub fn last_match_and_replace(text: &str, pattern: &Regex) -> (String, Option<Groups>) {
    let Some(last) = pattern
        .captures_iter(text)
        .max_by_key(|caps| caps.get(0).map_or(0, |m| m.end()))
    else {
        return (text.to_string(), None);
    };

    let groups: Groups = pattern
        .capture_names()
        .flatten()
        .filter_map(|name| last.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
        .collect();

    let marker = find_marker(text, "@@", "@");
    let masked = pattern.replace_all(text, NoExpand(&marker)).into_owned();
    (masked, Some(groups))
}

/// A signature date with its fixed timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub timezone: Timezone,
}

impl Timestamp {
    /// `None` unless the fields form a real date and time.
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        timezone: Timezone,
    ) -> Option<Self> {
        let timestamp = Timestamp {
            year,
            month,
            day,
            hour,
            minute,
            timezone,
        };
        timestamp.to_datetime().map(|_| timestamp)
    }

    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let naive = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, 0)?;
        self.timezone
            .offset()?
            .from_local_datetime(&naive)
            .single()
    }

    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        self.to_datetime().map(|dt| dt.with_timezone(&Utc))
    }
}

/// Reads signature timestamps written in one wiki language.
#[derive(Debug, Clone)]
pub struct TimeStripper {
    language: String,
    months: Option<MonthNames>,
    month_pattern: Option<Regex>,
    timezones: HashMap<String, Timezone>,
}

impl TimeStripper {
    /// A stripper for `language`. Languages without a month table are
    /// accepted; they simply never yield a timestamp.
    pub fn new(language: &str) -> Result<Self> {
        let mut stripper = TimeStripper {
            language: String::new(),
            months: None,
            month_pattern: None,
            timezones: HashMap::new(),
        };
        stripper.set_language(language)?;
        Ok(stripper)
    }

    /// A stripper using a caller-supplied month table.
    pub fn with_months(language: &str, months: MonthNames) -> Result<Self> {
        let mut stripper = TimeStripper::new(language)?;
        stripper.set_months(months)?;
        Ok(stripper)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Switch to the month names of `language`.
    pub fn set_language(&mut self, language: &str) -> Result<()> {
        self.language = language.to_string();
        match MonthNames::for_language(language) {
            Some(months) => self.set_months(months.clone()),
            None => {
                debug!(language, "no month names for language");
                self.months = None;
                self.month_pattern = None;
                Ok(())
            }
        }
    }

    pub fn set_months(&mut self, months: MonthNames) -> Result<()> {
        self.month_pattern = Some(month_pattern(&months)?);
        self.months = Some(months);
        Ok(())
    }

    /// Accept `abbreviation` in signatures, overriding the built-in table.
    pub fn register_timezone(&mut self, abbreviation: impl Into<String>, timezone: Timezone) {
        self.timezones.insert(abbreviation.into(), timezone);
    }

    /// The four-digit year pattern, as used for the first component scan.
    pub fn year_pattern() -> &'static Regex {
        &YEAR
    }

    fn timezone(&self, abbreviation: &str) -> Option<Timezone> {
        self.timezones
            .get(abbreviation)
            .cloned()
            .or_else(|| Timezone::from_abbreviation(abbreviation))
    }

    /// The latest complete timestamp in `text`, if any.
    pub fn timestripper(&self, text: &str) -> Option<Timestamp> {
        let (months, month_pattern) = self.months.as_ref().zip(self.month_pattern.as_ref())?;

        let mut line: String = from_local_digits(&remove_disabled_parts(text)).nfc().collect();
        let mut fields = Groups::new();
        // Time goes before day so hour digits are never taken for a day.
        for pattern in [&*YEAR, &*TIME, month_pattern, &*DAY, &*TIMEZONE] {
            let (masked, groups) = last_match_and_replace(&line, pattern);
            line = masked;
            fields.extend(groups.unwrap_or_default());
        }

        let number = |name: &str| fields.get(name).and_then(|v| v.parse::<u32>().ok());
        let year = i32::try_from(number("year")?).ok()?;
        let month = months.month_number(fields.get("month")?)?;
        let (day, hour, minute) = (number("day")?, number("hour")?, number("minute")?);

        let abbreviation = fields.get("tzinfo")?;
        let Some(timezone) = self.timezone(abbreviation) else {
            debug!(%abbreviation, "unknown timezone abbreviation");
            return None;
        };

        Timestamp::new(year, month, day, hour, minute, timezone)
    }
}

/// Alternation of every month spelling, longest first so that a full name is
/// preferred over its abbreviation.
fn month_pattern(months: &MonthNames) -> Result<Regex> {
    let mut names: Vec<&str> = months.spellings().map(|(name, _)| name).collect();
    names.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    names.dedup();

    let alternatives: Vec<String> = names
        .iter()
        .map(|name| {
            if name.ends_with(char::is_alphanumeric) {
                format!(r"{}\b", regex::escape(name))
            } else {
                regex::escape(name)
            }
        })
        .collect();

    Ok(Regex::new(&format!(r"\b(?P<month>{})", alternatives.join("|")))?)
}
