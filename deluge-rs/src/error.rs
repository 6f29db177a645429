//! Error types shared by the translator, the runtime value model and the
//! host executor.
//!
//! Parse failures of string conversions are typed ([`ParseError`]) and
//! propagate to the caller.  Network failures never show up here: the
//! built-in table turns them into sentinel values instead.

use thiserror::Error;

use crate::translate::Diagnostic;

/// Result alias used throughout the runtime.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A string could not be converted to the requested type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("not a number: {text:?}")]
    Number { text: String },

    #[error("not a date: {text:?}")]
    Date { text: String },

    #[error("invalid JSON: {message}")]
    Json { message: String },

    #[error("JSON value is not {expected}")]
    JsonShape { expected: &'static str },
}

/// Errors raised while executing translated code.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },

    #[error("variable `{name}` is not defined")]
    UndefinedVariable { name: String },

    #[error("{type_name} has no method `{method}`")]
    UnknownMethod {
        type_name: &'static str,
        method: String,
    },

    #[error("`{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("translation incomplete: {}", summarize(.0))]
    Translation(Vec<Diagnostic>),
}

impl RuntimeError {
    pub(crate) fn mismatch(message: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn arity(name: &str, expected: &'static str, got: usize) -> Self {
        RuntimeError::Arity {
            name: name.to_owned(),
            expected,
            got,
        }
    }
}

/// Strict translation refused a construct it could not rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("line {line}: unsupported construct: {reason}")]
    Unsupported { line: usize, reason: String },
}

impl From<&Diagnostic> for TranslateError {
    fn from(d: &Diagnostic) -> Self {
        TranslateError::Unsupported {
            line: d.line,
            reason: d.kind.to_string(),
        }
    }
}

fn summarize(diags: &[Diagnostic]) -> String {
    diags
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::DiagnosticKind;

    #[test]
    fn parse_error_display() {
        let e = ParseError::Number {
            text: "abc".into(),
        };
        assert_eq!(e.to_string(), "not a number: \"abc\"");
    }

    #[test]
    fn parse_error_converts_into_runtime_error() {
        let e: RuntimeError = ParseError::JsonShape { expected: "an object" }.into();
        assert!(matches!(e, RuntimeError::Parse(ParseError::JsonShape { .. })));
        assert_eq!(e.to_string(), "JSON value is not an object");
    }

    #[test]
    fn translate_error_from_diagnostic() {
        let d = Diagnostic {
            line: 4,
            kind: DiagnosticKind::UnbalancedClose,
            text: "}".into(),
        };
        let e = TranslateError::from(&d);
        assert_eq!(
            e,
            TranslateError::Unsupported {
                line: 4,
                reason: "closing brace without an open block".into()
            }
        );
    }
}
