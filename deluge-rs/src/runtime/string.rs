//! Immutable Deluge string value.
//!
//! Every transform returns a new [`DelugeString`] (or a primitive); nothing
//! here mutates the receiver.  Positions and lengths are counted in Unicode
//! scalar values, not bytes.  The backing storage is an `Arc<str>`, so clones
//! are a reference-count increment and values can be shared freely.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::{NoExpand, Regex};

use crate::error::ParseError;
use super::list::List;
use super::map::Map;
use super::value::Value;

/// Date-time layouts accepted by [`DelugeString::to_date`], tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts accepted by [`DelugeString::to_date`].
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%Y/%m/%d", "%m/%d/%Y"];

/// An immutable, cheaply clonable string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DelugeString(Arc<str>);

impl DelugeString {
    pub fn new(s: impl AsRef<str>) -> Self {
        DelugeString(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters.
    pub fn length(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // ── Predicates ──────────────────────────────────────────────────────────

    pub fn contains(&self, sub: &str) -> bool {
        self.0.contains(sub)
    }

    pub fn contains_ignore_case(&self, sub: &str) -> bool {
        self.0.to_lowercase().contains(&sub.to_lowercase())
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }

    pub fn equals_ignore_case(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.to_lowercase()
    }

    /// Whole-string regular expression match (Java `String.matches`).
    pub fn matches(&self, pattern: &str) -> Result<bool, regex::Error> {
        let re = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(re.is_match(&self.0))
    }

    // ── Case and whitespace ─────────────────────────────────────────────────

    pub fn to_upper_case(&self) -> DelugeString {
        DelugeString::new(self.0.to_uppercase())
    }

    pub fn to_lower_case(&self) -> DelugeString {
        DelugeString::new(self.0.to_lowercase())
    }

    pub fn trim(&self) -> DelugeString {
        DelugeString::new(self.0.trim())
    }

    // ── Positions and slices ────────────────────────────────────────────────

    /// Characters in `[start, end)`; both bounds are clamped to the string.
    pub fn substring(&self, start: i64, end: Option<i64>) -> DelugeString {
        let len = self.length() as i64;
        let start = start.clamp(0, len);
        let end = end.unwrap_or(len).clamp(start, len);
        let out: String = self
            .0
            .chars()
            .skip(start as usize)
            .take((end - start) as usize)
            .collect();
        DelugeString::new(out)
    }

    /// Character index of the first occurrence of `sub`, or `-1`.
    pub fn index_of(&self, sub: &str) -> i64 {
        match self.0.find(sub) {
            Some(byte) => self.0[..byte].chars().count() as i64,
            None => -1,
        }
    }

    /// Character index of the last occurrence of `sub`, or `-1`.
    pub fn last_index_of(&self, sub: &str) -> i64 {
        match self.0.rfind(sub) {
            Some(byte) => self.0[..byte].chars().count() as i64,
            None => -1,
        }
    }

    /// Text before the first occurrence of `delim`; empty when absent.
    pub fn get_prefix(&self, delim: &str) -> DelugeString {
        match self.0.find(delim) {
            Some(i) => DelugeString::new(&self.0[..i]),
            None => DelugeString::default(),
        }
    }

    /// Text after the first occurrence of `delim`; empty when absent.
    pub fn get_suffix(&self, delim: &str) -> DelugeString {
        match self.0.find(delim) {
            Some(i) => DelugeString::new(&self.0[i + delim.len()..]),
            None => DelugeString::default(),
        }
    }

    /// Leading run of alphabetic characters (`"Hello123!".getAlpha()` is `"Hello"`).
    pub fn get_alpha(&self) -> DelugeString {
        self.prefix_while(char::is_alphabetic)
    }

    /// Leading run of alphanumeric characters.
    pub fn get_alpha_numeric(&self) -> DelugeString {
        self.prefix_while(char::is_alphanumeric)
    }

    fn prefix_while(&self, keep: impl Fn(char) -> bool) -> DelugeString {
        let end = self
            .0
            .char_indices()
            .find(|&(_, c)| !keep(c))
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        DelugeString::new(&self.0[..end])
    }

    /// Count of non-overlapping occurrences of `sub`; `0` for an empty `sub`.
    pub fn get_occurence(&self, sub: &str) -> i64 {
        if sub.is_empty() {
            return 0;
        }
        self.0.matches(sub).count() as i64
    }

    // ── Replacement and removal ─────────────────────────────────────────────

    /// Replace every match of the regular expression `pattern`.  The
    /// replacement is inserted literally.
    pub fn replace_all(&self, pattern: &str, replacement: &str) -> Result<DelugeString, regex::Error> {
        let re = Regex::new(pattern)?;
        Ok(DelugeString::new(re.replace_all(&self.0, NoExpand(replacement))))
    }

    /// Replace the first match of the regular expression `pattern`.
    pub fn replace_first(&self, pattern: &str, replacement: &str) -> Result<DelugeString, regex::Error> {
        let re = Regex::new(pattern)?;
        Ok(DelugeString::new(re.replace(&self.0, NoExpand(replacement))))
    }

    /// Remove every literal occurrence of `sub`.
    pub fn remove(&self, sub: &str) -> DelugeString {
        if sub.is_empty() {
            return self.clone();
        }
        DelugeString::new(self.0.replace(sub, ""))
    }

    pub fn remove_first_occurence(&self, sub: &str) -> DelugeString {
        match self.0.find(sub) {
            Some(i) if !sub.is_empty() => {
                DelugeString::new(format!("{}{}", &self.0[..i], &self.0[i + sub.len()..]))
            }
            _ => self.clone(),
        }
    }

    pub fn remove_last_occurence(&self, sub: &str) -> DelugeString {
        match self.0.rfind(sub) {
            Some(i) if !sub.is_empty() => {
                DelugeString::new(format!("{}{}", &self.0[..i], &self.0[i + sub.len()..]))
            }
            _ => self.clone(),
        }
    }

    // ── Padding ─────────────────────────────────────────────────────────────

    /// Pad on the left with repetitions of `fill` up to `len` characters.
    pub fn left_pad(&self, fill: &str, len: usize) -> DelugeString {
        match self.padding(fill, len) {
            Some(pad) => DelugeString::new(format!("{pad}{}", self.0)),
            None => self.clone(),
        }
    }

    /// Pad on the right with repetitions of `fill` up to `len` characters.
    pub fn right_pad(&self, fill: &str, len: usize) -> DelugeString {
        match self.padding(fill, len) {
            Some(pad) => DelugeString::new(format!("{}{pad}", self.0)),
            None => self.clone(),
        }
    }

    fn padding(&self, fill: &str, len: usize) -> Option<String> {
        let cur = self.length();
        if cur >= len || fill.is_empty() {
            return None;
        }
        Some(fill.chars().cycle().take(len - cur).collect())
    }

    // ── Conversions ─────────────────────────────────────────────────────────

    /// Split on `sep`; an empty separator splits into single characters.
    pub fn to_list(&self, sep: &str) -> List {
        if sep.is_empty() {
            self.0.chars().map(|c| Value::from(c.to_string())).collect()
        } else {
            self.0.split(sep).map(Value::from).collect()
        }
    }

    /// Decode a JSON object.
    pub fn to_map(&self) -> Result<Map, ParseError> {
        match self.decode_json()? {
            Value::Map(m) => Ok(m.borrow().clone()),
            _ => Err(ParseError::JsonShape { expected: "an object" }),
        }
    }

    /// Decode a JSON array.
    pub fn to_json_list(&self) -> Result<List, ParseError> {
        match self.decode_json()? {
            Value::List(l) => Ok(l.borrow().clone()),
            _ => Err(ParseError::JsonShape { expected: "an array" }),
        }
    }

    fn decode_json(&self) -> Result<Value, ParseError> {
        let json: serde_json::Value =
            serde_json::from_str(&self.0).map_err(|e| ParseError::Json {
                message: e.to_string(),
            })?;
        Ok(Value::from_json(json))
    }

    /// Parse a decimal or `0x`-prefixed hexadecimal integer.
    pub fn to_long(&self) -> Result<i64, ParseError> {
        let text = self.0.trim();
        let err = || ParseError::Number {
            text: self.0.to_string(),
        };
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let magnitude = match digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            Some(hex) => {
                // from_str_radix takes its own sign; only the one before `0x` counts.
                if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(err());
                }
                i64::from_str_radix(hex, 16).map_err(|_| err())?
            }
            None => {
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(err());
                }
                digits.parse::<i64>().map_err(|_| err())?
            }
        };
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Parse a date or date-time.
    pub fn to_date(&self) -> Result<NaiveDateTime, ParseError> {
        let text = self.0.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt.naive_utc());
        }
        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
                return Ok(dt);
            }
        }
        for fmt in DATE_FORMATS {
            if let Some(dt) = NaiveDate::parse_from_str(text, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
            {
                return Ok(dt);
            }
        }
        Err(ParseError::Date {
            text: self.0.to_string(),
        })
    }
}

impl Default for DelugeString {
    fn default() -> Self {
        DelugeString(Arc::from(""))
    }
}

impl fmt::Display for DelugeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DelugeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl AsRef<str> for DelugeString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DelugeString {
    fn from(s: &str) -> Self {
        DelugeString::new(s)
    }
}

impl From<String> for DelugeString {
    fn from(s: String) -> Self {
        DelugeString(Arc::from(s))
    }
}

impl PartialEq<str> for DelugeString {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for DelugeString {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
