//! Conversion between ASCII digits and the native digits of a wiki language.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref NON_LATIN_DIGITS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("ar", "٠١٢٣٤٥٦٧٨٩");
        m.insert("bn", "০১২৩৪৫৬৭৮৯");
        m.insert("ckb", "٠١٢٣٤٥٦٧٨٩");
        m.insert("fa", "۰۱۲۳۴۵۶۷۸۹");
        m.insert("hi", "०१२३४५६७८९");
        m.insert("km", "០១២៣៤៥៦៧៨៩");
        m.insert("ml", "൦൧൨൩൪൫൬൭൮൯");
        m.insert("mr", "०१२३४५६७८९");
        m.insert("my", "၀၁၂၃၄၅၆၇၈၉");
        m.insert("ne", "०१२३४५६७८९");
        m.insert("or", "୦୧୨୩୪୫୬୭୮୯");
        m.insert("th", "๐๑๒๓๔๕๖๗๘๙");
        m
    };
}

/// The ten native digit glyphs of `lang`, or `None` when the language writes
/// ASCII digits.
pub fn digit_table(lang: &str) -> Option<[char; 10]> {
    let glyphs = NON_LATIN_DIGITS.get(lang)?;
    let mut table = ['0'; 10];
    for (slot, glyph) in table.iter_mut().zip(glyphs.chars()) {
        *slot = glyph;
    }
    Some(table)
}

/// Render `value` with the native digits of `lang`.
///
/// Only the characters `0`-`9` are touched; languages without a digit table
/// get the plain string form back.
pub fn to_local_digits(value: impl ToString, lang: &str) -> String {
    let text = value.to_string();
    let Some(table) = digit_table(lang) else {
        return text;
    };

    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => table[d as usize],
            None => c,
        })
        .collect()
}

/// Fold the native digits of every known language back to ASCII.
pub fn from_local_digits(text: &str) -> String {
    text.chars()
        .map(|c| {
            NON_LATIN_DIGITS
                .values()
                .find_map(|glyphs| glyphs.chars().position(|g| g == c))
                .and_then(|d| char::from_digit(d as u32, 10))
                .unwrap_or(c)
        })
        .collect()
}
