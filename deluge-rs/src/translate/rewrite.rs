//! Condition and literal rewriting for expression-bearing lines.
//!
//! Two modes are available for conditions:
//!
//! - [`ConditionMode::Tokens`] splits the text into string literals and code
//!   first, so `== null` or `true` inside a literal are left alone, and also
//!   maps `&&`, `||` and `!` to `and`, `or` and `not`.
//! - [`ConditionMode::Textual`] replaces the idioms anywhere in the text,
//!   literals included.  Kept for output compatibility with older translations.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::{Captures, Regex};
use tracing::warn;

use crate::runtime::is_runtime_method;

/// Method names the translator passes through unchanged.  Every one of them
/// is dispatchable by [`crate::runtime::call_method`].
pub const METHOD_VOCABULARY: &[&str] = &[
    "contains",
    "startsWith",
    "endsWith",
    "toLowerCase",
    "toUpperCase",
    "substring",
    "subString",
    "subText",
    "indexOf",
    "lastIndexOf",
    "replaceAll",
    "replaceFirst",
    "toList",
    "toMap",
    "size",
    "isEmpty",
    "get",
    "put",
    "add",
    "remove",
    "clear",
    "trim",
    "length",
];

/// How null/boolean idioms inside conditions are substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionMode {
    #[default]
    Tokens,
    Textual,
}

impl FromStr for ConditionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tokens" | "token" => Ok(ConditionMode::Tokens),
            "textual" | "text" => Ok(ConditionMode::Textual),
            other => Err(format!("unknown condition mode `{other}`")),
        }
    }
}

impl fmt::Display for ConditionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConditionMode::Tokens => "tokens",
            ConditionMode::Textual => "textual",
        })
    }
}

// ── Segmentation ──────────────────────────────────────────────────────────────

/// A run of source text: either a quoted literal (quotes included) or code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Code(&'a str),
    Literal(&'a str),
}

/// Split `text` into code and string-literal runs.  An unterminated literal
/// is treated as code.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut code_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let quote = bytes[i];
        if quote != b'"' && quote != b'\'' {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        let mut closed = false;
        while j < bytes.len() {
            match bytes[j] {
                b'\\' => j += 2,
                b if b == quote => {
                    closed = true;
                    break;
                }
                _ => j += 1,
            }
        }
        if !closed {
            break;
        }
        if code_start < i {
            out.push(Segment::Code(&text[code_start..i]));
        }
        out.push(Segment::Literal(&text[i..=j]));
        i = j + 1;
        code_start = i;
    }
    if code_start < text.len() {
        out.push(Segment::Code(&text[code_start..]));
    }
    out
}

// ── Cached patterns ───────────────────────────────────────────────────────────

macro_rules! cached_regex {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pat).expect("pattern literal is valid"))
        }
    };
}

cached_regex!(re_eq_null, r"\s*==\s*(?:NULL|null)\b");
cached_regex!(re_ne_null, r"\s*!=\s*(?:NULL|null)\b");
cached_regex!(re_true, r"\btrue\b");
cached_regex!(re_false, r"\bfalse\b");
cached_regex!(re_and, r"\s*&&\s*");
cached_regex!(re_or, r"\s*\|\|\s*");
cached_regex!(re_method, r"\.([A-Za-z_]\w*)\s*\(");
cached_regex!(re_quoted, r#""([^"']*)"|'([^"']*)'"#);
cached_regex!(re_collection, r"(^|[^.\w])Collection\(\s*\)");
cached_regex!(re_lower_list, r"(^|[^.\w])list\(\s*\)");

const TEXTUAL_PATTERNS: &[&str] = &["== NULL", "!= NULL", "== null", "!= null", " true", " false"];
const TEXTUAL_REPLACEMENTS: &[&str] = &["is None", "is not None", "is None", "is not None", " True", " False"];

fn textual_idioms() -> &'static AhoCorasick {
    static AC: OnceLock<AhoCorasick> = OnceLock::new();
    AC.get_or_init(|| {
        AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .build(TEXTUAL_PATTERNS)
    })
}

// ── Public rewriters ──────────────────────────────────────────────────────────

/// Rewrite an expression: wrap every string literal in `deluge_string(...)`
/// and check method names against the runtime's method surface.
pub fn rewrite_expression(text: &str, mode: ConditionMode) -> String {
    match mode {
        ConditionMode::Tokens => {
            let mut out = String::with_capacity(text.len() + 16);
            for seg in segments(text) {
                match seg {
                    Segment::Code(code) => {
                        warn_unknown_methods(code);
                        out.push_str(code);
                    }
                    Segment::Literal(lit) => wrap_literal(lit, &mut out),
                }
            }
            out
        }
        ConditionMode::Textual => {
            warn_unknown_methods(text);
            wrap_literals_textual(text)
        }
    }
}

/// Rewrite an `if`/`while`/`else if` condition.
pub fn rewrite_condition(text: &str, mode: ConditionMode) -> String {
    match mode {
        ConditionMode::Tokens => {
            let mut out = String::with_capacity(text.len() + 16);
            for seg in segments(text) {
                match seg {
                    Segment::Code(code) => {
                        warn_unknown_methods(code);
                        out.push_str(&rewrite_condition_code(code));
                    }
                    Segment::Literal(lit) => wrap_literal(lit, &mut out),
                }
            }
            out
        }
        ConditionMode::Textual => {
            warn_unknown_methods(text);
            let wrapped = wrap_literals_textual(text);
            textual_idioms().replace_all(&wrapped, TEXTUAL_REPLACEMENTS)
        }
    }
}

/// `Collection()` → `Map()`, `list()` → `List()`; literals untouched.
pub fn canonicalize_constructors(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for seg in segments(text) {
        match seg {
            Segment::Code(code) => {
                let code = re_collection().replace_all(code, "${1}Map()");
                let code = re_lower_list().replace_all(&code, "${1}List()");
                out.push_str(&code);
            }
            Segment::Literal(lit) => out.push_str(lit),
        }
    }
    out
}

fn wrap_literal(lit: &str, out: &mut String) {
    out.push_str("deluge_string(");
    out.push_str(lit);
    out.push(')');
}

fn wrap_literals_textual(text: &str) -> String {
    re_quoted()
        .replace_all(text, |caps: &Captures<'_>| format!("deluge_string({})", &caps[0]))
        .into_owned()
}

fn rewrite_condition_code(code: &str) -> String {
    let code = re_eq_null().replace_all(code, " is None");
    let code = re_ne_null().replace_all(&code, " is not None");
    let code = re_true().replace_all(&code, "True");
    let code = re_false().replace_all(&code, "False");
    let code = re_and().replace_all(&code, " and ");
    let code = re_or().replace_all(&code, " or ");
    rewrite_not(&code)
}

/// `!x` → `not x`, leaving `!=` alone.
fn rewrite_not(code: &str) -> String {
    let mut out = String::with_capacity(code.len() + 8);
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '!' && chars.peek() != Some(&'=') {
            if !out.is_empty() && !out.ends_with(|p: char| p.is_whitespace() || p == '(') {
                out.push(' ');
            }
            out.push_str("not ");
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn warn_unknown_methods(code: &str) {
    for caps in re_method().captures_iter(code) {
        let name = &caps[1];
        if !is_runtime_method(name) {
            warn!(method = name, "method is not provided by the runtime");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
