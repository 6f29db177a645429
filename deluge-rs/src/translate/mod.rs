//! Deluge → host-statement translator.
//!
//! Translation is a two-stage pipeline:
//!
//! 1. [`preprocess`] normalises raw source into [`LogicalLine`]s, one
//!    construct per line.
//! 2. A [`Session`](session::Session) walks the lines with an explicit block
//!    stack and emits indentation-structured statements.
//!
//! Lines the session cannot rewrite produce no output and a [`Diagnostic`];
//! [`Translator::translate_strict`] turns the first diagnostic into an error.

pub mod preprocess;
pub mod rewrite;
pub mod session;

use std::fmt;

use crate::error::TranslateError;

pub use preprocess::{preprocess, LogicalLine};
pub use rewrite::{ConditionMode, METHOD_VOCABULARY};
use session::Session;

/// Knobs that change the emitted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    pub conditions: ConditionMode,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions {
            indent: 4,
            conditions: ConditionMode::Tokens,
        }
    }
}

/// What went wrong on a line that could not be translated faithfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// No rewrite rule matched the line.
    UnsupportedConstruct,
    UnbalancedClose,
    OrphanElse,
    /// A control header was never followed by its `{`.
    MissingBlock,
    UnclosedBlock,
    UnterminatedRemoteCall,
    StrayRemoteTerminator,
    BadRemoteParam,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::UnsupportedConstruct => "unrecognised statement",
            DiagnosticKind::UnbalancedClose => "closing brace without an open block",
            DiagnosticKind::OrphanElse => "else without a preceding if",
            DiagnosticKind::MissingBlock => "control header without a block",
            DiagnosticKind::UnclosedBlock => "block not closed at end of input",
            DiagnosticKind::UnterminatedRemoteCall => "invokeurl block not terminated",
            DiagnosticKind::StrayRemoteTerminator => "`];` outside an invokeurl block",
            DiagnosticKind::BadRemoteParam => "expected `key: value` inside invokeurl block",
        })
    }
}

/// A line the translator dropped or could only partially handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
    /// The logical line involved.
    pub text: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.kind, self.text)
    }
}

/// Emitted host code plus anything that could not be translated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl Translation {
    /// True when every line was translated.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Stateless front end; each call runs a fresh [`Session`].
#[derive(Debug, Clone, Default)]
pub struct Translator {
    options: TranslateOptions,
}

impl Translator {
    pub fn new(options: TranslateOptions) -> Self {
        Translator { options }
    }

    pub fn options(&self) -> &TranslateOptions {
        &self.options
    }

    /// Translate leniently: untranslatable lines become diagnostics.
    pub fn translate(&self, source: &str) -> Translation {
        self.translate_lines(&preprocess(source))
    }

    /// Translate already-normalised lines.
    pub fn translate_lines(&self, lines: &[LogicalLine]) -> Translation {
        let mut session = Session::new(&self.options);
        for line in lines {
            session.line(line);
        }
        session.finish()
    }

    /// Translate, failing on the first diagnostic.
    pub fn translate_strict(&self, source: &str) -> Result<String, TranslateError> {
        let t = self.translate(source);
        match t.diagnostics.first() {
            Some(d) => Err(TranslateError::from(d)),
            None => Ok(t.code),
        }
    }
}

/// One-shot lenient translation with default options.
pub fn translate(source: &str) -> Translation {
    Translator::default().translate(source)
}
