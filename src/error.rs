//! The error channel (spec §6.3, §7): a typed event carrying an error code and a source
//! position, published to any registered [ErrorListener].

use crate::source::SourcePosition;
use std::fmt;

/// All recoverable error conditions the parser can report. Every variant corresponds to one
/// named in the spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnknownAtRule,
    InvalidBlockStart,
    InvalidToken,
    InvalidSelector,
    IdentExpected,
    ColonMissing,
    UnknownDeclarationName,
    ValueMissing,
    InvalidEscape,
    UnterminatedString,
    UnterminatedComment,
}

impl ErrorCode {
    pub fn message(self) -> &'static str {
        match self {
            Self::UnknownAtRule => "unrecognized at-rule",
            Self::InvalidBlockStart => "unexpected '{' at top level",
            Self::InvalidToken => "unexpected token",
            Self::InvalidSelector => "selector did not parse cleanly",
            Self::IdentExpected => "expected a property name",
            Self::ColonMissing => "expected ':' after property name",
            Self::UnknownDeclarationName => "unrecognized property name",
            Self::ValueMissing => "declaration has no value",
            Self::InvalidEscape => "invalid escape sequence",
            Self::UnterminatedString => "unterminated string literal",
            Self::UnterminatedComment => "unterminated comment",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A single reported problem: what went wrong, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CssParseError {
    pub code: ErrorCode,
    pub position: SourcePosition,
}

impl CssParseError {
    pub fn new(code: ErrorCode, position: SourcePosition) -> Self {
        Self { code, position }
    }
}

impl fmt::Display for CssParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.code, self.position)
    }
}

impl std::error::Error for CssParseError {}

/// Returned by the strict single-construct entry points (`parse_media_list`, `parse_medium`)
/// when the construct does not parse cleanly or leftover tokens remain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyntaxError;

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("syntax error")
    }
}

impl std::error::Error for SyntaxError {}

/// An internal "try something else" marker, used throughout the recursive-descent grammar
/// readers the way the reference `Parser`/`CSSParse` machinery uses its own zero-sized
/// `ParseError`: it means "rewind the parser and take a different branch", not "here is a
/// diagnosis for the user" — diagnoses are published through [CssParseError] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseError;

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("parse error")
    }
}

impl std::error::Error for ParseError {}

/// Receives [CssParseError] events as they are published during a parse.
///
/// Implementations must not call back into the parser: listener invocation happens
/// synchronously on the parsing thread, mid-parse, and re-entrancy would observe a half-built
/// AST.
pub trait ErrorListener {
    fn on_error(&self, error: CssParseError);
}

/// An [ErrorListener] that logs every error via the `log` facade (target `"css"`) and
/// otherwise discards it. This is the default listener installed by
/// [Configuration::default](crate::config::Configuration::default), matching the reference
/// tokenizer's own `log::warn!(target: "css", ...)` diagnostics for the same conditions.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingErrorListener;

impl ErrorListener for LoggingErrorListener {
    fn on_error(&self, error: CssParseError) {
        log::warn!(target: "css", "{error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_position() {
        let error = CssParseError::new(ErrorCode::ColonMissing, SourcePosition::start());
        assert_eq!(
            error.to_string(),
            "expected ':' after property name at 1:1"
        );
    }
}
