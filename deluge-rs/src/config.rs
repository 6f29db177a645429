//! `.delugerc` configuration file parser.
//!
//! | Line | Action |
//! |------|--------|
//! | `indent = <n>` | spaces per emitted nesting level (1..=16) |
//! | `conditions = tokens \| textual` | condition rewriting mode |
//! | `strict = true \| false` | refuse to run partially translated scripts |
//! | `user_agent = "<text>"` | `User-Agent` sent by the network built-ins |
//! | `timeout = <seconds>` | per-request network timeout, greater than zero |
//! | Lines starting with `;` | comment, ignored |
//!
//! Values may be double-quoted; `\"` escapes a quote inside quotes.
//! Problems are collected as [`ConfigError`]s and the offending line is
//! skipped, so a partly broken file still loads.

use std::path::Path;
use std::time::Duration;

use crate::http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::translate::{ConditionMode, TranslateOptions};

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub indent: usize,
    pub conditions: ConditionMode,
    pub strict: bool,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let opts = TranslateOptions::default();
        Config {
            indent: opts.indent,
            conditions: opts.conditions,
            strict: false,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Returns the config and a list of any problems; bad lines leave the
    /// corresponding setting at its previous value.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                errors.push(ConfigError {
                    line: lineno,
                    message: format!("expected `key = value`, got `{line}`"),
                });
                continue;
            };
            if let Err(message) = config.set(key.trim(), &unquote(value.trim())) {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Apply one setting.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "indent" => {
                let n: usize = value
                    .parse()
                    .map_err(|_| format!("indent: `{value}` is not a number"))?;
                if !(1..=16).contains(&n) {
                    return Err(format!("indent: {n} is outside 1..=16"));
                }
                self.indent = n;
            }
            "conditions" => self.conditions = value.parse()?,
            "strict" => {
                self.strict = match value.to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => true,
                    "false" | "no" | "off" | "0" => false,
                    _ => return Err(format!("strict: `{value}` is not a boolean")),
                }
            }
            "user_agent" => {
                if value.is_empty() {
                    return Err("user_agent: must not be empty".into());
                }
                self.user_agent = value.to_owned();
            }
            "timeout" => {
                let secs: f64 = value
                    .parse()
                    .map_err(|_| format!("timeout: `{value}` is not a number"))?;
                if !(secs.is_finite() && secs > 0.0) {
                    return Err(format!("timeout: {value} must be greater than zero"));
                }
                self.timeout = Duration::try_from_secs_f64(secs)
                    .map_err(|_| format!("timeout: {value} is out of range"))?;
            }
            _ => return Err(format!("unknown setting `{key}`")),
        }
        Ok(())
    }

    /// Translator options derived from this config.
    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            indent: self.indent,
            conditions: self.conditions,
        }
    }
}

// ── Value unquoting ───────────────────────────────────────────────────────────

/// Strip double quotes, honouring `\"` escapes within them.
fn unquote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_quotes = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            c => out.push(c),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
