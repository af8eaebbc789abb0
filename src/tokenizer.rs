//! The mode-switching tokenizer (spec §4.1).
//!
//! Lexical rules mostly follow <https://drafts.csswg.org/css-syntax/#tokenization> verbatim;
//! the one addition over the plain CSS Syntax Level 3 grammar is [Mode], which the rule parser
//! flips between token requests to get selector matcher tokens (`~=`, `|=`, ...) or media
//! comparator tokens (`<=`, `>=`, ...) without re-lexing anything already consumed.

use crate::config::Configuration;
use crate::error::ErrorCode;
use crate::source::{SourcePosition, SourceText};
use std::borrow::Cow;

const NEWLINE: char = '\n';
const TAB: char = '\t';
const WHITESPACE: char = ' ';
const APOSTROPHE: char = '\'';
const BACKSLASH: char = '\\';
const REPLACEMENT: char = '\u{FFFD}';

/// The tokenizer's current lexical mode, switched by the rule parser before each
/// [Tokenizer::next_token] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    /// Plain CSS syntax: at-rule preludes, rule bodies, anywhere matcher/comparator tokens
    /// don't apply.
    #[default]
    Data,

    /// Selector grammar: recognizes `~=`, `|=`, `^=`, `$=`, `*=`, `!=`, `||` as single tokens;
    /// whitespace stays significant (descendant combinator).
    Selector,

    /// Value grammar: recognizes `<`, `>`, `<=`, `>=` as comparator tokens (for media feature
    /// ranges); whitespace stays significant (value component separator).
    Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HashFlag {
    Unrestricted,
    Id,
}

/// A numeric literal, tracking both its `f64` value and — when the lexical form had no
/// fractional part or exponent — its exact integer value. `int_value.is_some()` is what the
/// spec calls an `Integer` token; `None` is what it calls a `Number` token. Grounded on real
/// `cssparser`'s `NumericValue` (see `mozilla-servo-rust-cssparser/ast.rs`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NumericValue {
    pub value: f64,
    pub int_value: Option<i64>,
}

impl NumericValue {
    pub fn is_integer(&self) -> bool {
        self.int_value.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeMatcher {
    /// `=`
    EqualTo,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `^=`
    PrefixMatch,
    /// `$=`
    SuffixMatch,
    /// `*=`
    SubstringMatch,
    /// `!=`
    NotMatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token<'a> {
    Ident(Cow<'a, str>),
    AtKeyword(Cow<'a, str>),
    String(Cow<'a, str>),
    BadString(Cow<'a, str>),
    Url(Cow<'a, str>),
    BadUrl(Cow<'a, str>),
    Hash(Cow<'a, str>, HashFlag),
    Number(NumericValue),
    Percentage(NumericValue),
    Dimension(NumericValue, Cow<'a, str>),
    Function(Cow<'a, str>),
    Delim(char),
    Matcher(AttributeMatcher),
    Comparator(Comparator),
    Column,
    Colon,
    Semicolon,
    Comma,
    CurlyBracketOpen,
    CurlyBracketClose,
    RoundBracketOpen,
    RoundBracketClose,
    SquareBracketOpen,
    SquareBracketClose,
    Whitespace,
    Comment,
    CommentDeclarationOpen,
    CommentDeclarationClose,
    Eof,
}

impl<'a> Token<'a> {
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }
}

/// Streams [Token]s out of CSS source text, one lexical grammar production at a time.
#[derive(Clone)]
pub struct Tokenizer<'a> {
    source: SourceText<'a>,
    position: usize,
    mode: Mode,
    config: Configuration,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: SourceText<'a>, config: Configuration) -> Self {
        Self {
            source,
            position: 0,
            mode: Mode::default(),
            config,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// The byte offset of the next token that will be produced. Suitable for saving/restoring
    /// parser state (see [Parser::state](crate::rule_parser::RuleParser)).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    pub fn source_position(&self) -> SourcePosition {
        self.source.position_at(self.position)
    }

    fn report(&self, code: ErrorCode) {
        self.config
            .report(crate::error::CssParseError::new(code, self.source_position()));
    }

    fn reconsume(&mut self) {
        self.position -= 1;
    }

    fn peek_codepoint(&self, n: usize) -> Option<char> {
        self.source.peek(self.position, n)
    }

    /// <https://drafts.csswg.org/css-syntax/#check-if-two-code-points-are-a-valid-escape>
    fn is_valid_escape_start(&self) -> bool {
        is_valid_escape(self.peek_codepoint(0), self.peek_codepoint(1))
    }

    /// <https://drafts.csswg.org/css-syntax/#check-if-three-code-points-would-start-an-ident-sequence>
    fn is_valid_ident_start(&self) -> bool {
        match self.peek_codepoint(0) {
            Some('-') => {
                let n2 = self.peek_codepoint(1);
                (n2.is_some() && (is_ident_start_code_point(n2.unwrap()) || n2.unwrap() == '-'))
                    || is_valid_escape(n2, self.peek_codepoint(2))
            },
            Some(BACKSLASH) => is_valid_escape(self.peek_codepoint(1), self.peek_codepoint(2)),
            Some(c) if is_ident_start_code_point(c) => true,
            _ => false,
        }
    }

    /// <https://drafts.csswg.org/css-syntax/#check-if-three-code-points-would-start-a-number>
    #[allow(clippy::needless_bool, clippy::if_same_then_else)]
    fn is_valid_number_start(&self) -> bool {
        match self.peek_codepoint(0) {
            Some('+' | '-') => {
                if matches!(self.peek_codepoint(1), Some('0'..='9')) {
                    true
                } else if self.peek_codepoint(1) == Some('.')
                    && matches!(self.peek_codepoint(2), Some('0'..='9'))
                {
                    true
                } else {
                    false
                }
            },
            Some('.') => matches!(self.peek_codepoint(1), Some('0'..='9')),
            Some('0'..='9') => true,
            _ => false,
        }
    }

    #[inline]
    fn current_position(&self) -> usize {
        self.position
    }

    #[inline]
    fn next_codepoint(&mut self) -> Option<char> {
        let c = self.source.peek(self.position, 0);
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            self.next_codepoint();
        }
    }

    #[inline]
    fn consume_whitespace(&mut self) {
        while matches!(self.peek_codepoint(0), Some(NEWLINE | TAB | WHITESPACE)) {
            self.advance(1);
        }
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-an-ident-sequence>
    fn consume_ident_sequence(&mut self) -> String {
        let mut result = String::new();
        loop {
            match self.next_codepoint() {
                Some(c) if is_ident_code_point(c) => result.push(c),
                Some(_) if self.is_valid_escape_start() => {
                    result.push(self.consume_escaped_codepoint());
                },
                Some(_) => {
                    self.reconsume();
                    return result;
                },
                None => return result,
            }
        }
    }

    /// <https://drafts.csswg.org/css-syntax-3/#consume-escaped-code-point>
    fn consume_escaped_codepoint(&mut self) -> char {
        match self.next_codepoint() {
            Some(c @ ('0'..='9' | 'a'..='f' | 'A'..='F')) => {
                let mut num = c.to_digit(16).unwrap();
                let mut digits_consumed = 0;
                while let Some(c @ ('0'..='9' | 'a'..='f' | 'A'..='F')) =
                    self.peek_codepoint(0)
                {
                    self.advance(1);
                    digits_consumed += 1;
                    num = num * 16 + c.to_digit(16).unwrap();
                    if digits_consumed == 5 {
                        break;
                    }
                }
                if matches!(self.peek_codepoint(0), Some(NEWLINE | TAB | WHITESPACE)) {
                    self.advance(1);
                }
                if matches!(num, 0 | 0xD800..=0xDFFF) || num > 0x10FFFF {
                    self.report(ErrorCode::InvalidEscape);
                    REPLACEMENT
                } else {
                    char::from_u32(num).unwrap_or(REPLACEMENT)
                }
            },
            None => {
                self.report(ErrorCode::InvalidEscape);
                REPLACEMENT
            },
            Some(c) => c,
        }
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-a-number>
    fn consume_number(&mut self) -> NumericValue {
        let mut is_integer = true;
        let start = self.current_position();

        if matches!(self.peek_codepoint(0), Some('+' | '-')) {
            self.advance(1);
        }
        while matches!(self.peek_codepoint(0), Some('0'..='9')) {
            self.advance(1);
        }
        if self.peek_codepoint(0) == Some('.') && matches!(self.peek_codepoint(1), Some('0'..='9'))
        {
            self.advance(2);
            is_integer = false;
            while matches!(self.peek_codepoint(0), Some('0'..='9')) {
                self.advance(1);
            }
        }
        if matches!(self.peek_codepoint(0), Some('e' | 'E')) {
            if matches!(self.peek_codepoint(1), Some('0'..='9')) {
                self.advance(2);
                is_integer = false;
                while matches!(self.peek_codepoint(0), Some('0'..='9')) {
                    self.advance(1);
                }
            } else if matches!(
                (self.peek_codepoint(1), self.peek_codepoint(2)),
                (Some('+' | '-'), Some('0'..='9'))
            ) {
                self.advance(3);
                is_integer = false;
                while matches!(self.peek_codepoint(0), Some('0'..='9')) {
                    self.advance(1);
                }
            }
        }

        let end = self.current_position();
        let repr = &self.source.as_str()[start..end];
        let value: f64 = repr.parse().unwrap_or(0.0);
        NumericValue {
            value,
            int_value: is_integer.then(|| repr.parse().unwrap_or(value as i64)),
        }
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-a-numeric-token>
    fn consume_numeric_token(&mut self) -> Token<'a> {
        let number = self.consume_number();
        if self.is_valid_ident_start() {
            let unit = self.consume_ident_sequence();
            Token::Dimension(number, Cow::Owned(unit))
        } else if self.peek_codepoint(0) == Some('%') {
            self.advance(1);
            Token::Percentage(number)
        } else {
            Token::Number(number)
        }
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-the-remnants-of-a-bad-url>
    fn consume_remnants_of_a_bad_url(&mut self) {
        loop {
            match self.next_codepoint() {
                Some('(') | None => return,
                _ if self.is_valid_escape_start() => {
                    self.consume_escaped_codepoint();
                },
                _ => {},
            }
        }
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-a-url-token>
    fn consume_url_token(&mut self) -> Token<'a> {
        let mut value = String::new();
        self.consume_whitespace();

        loop {
            match self.next_codepoint() {
                Some(')') => return Token::Url(Cow::Owned(value)),
                None => {
                    self.report(ErrorCode::UnterminatedString);
                    return Token::Url(Cow::Owned(value));
                },
                Some(c) if is_whitespace(c) => {
                    self.consume_whitespace();
                    if matches!(self.peek_codepoint(0), Some(')') | None) {
                        let hit_eof = self.peek_codepoint(0).is_none();
                        self.advance(1);
                        if hit_eof {
                            self.report(ErrorCode::UnterminatedString);
                        }
                        return Token::Url(Cow::Owned(value));
                    }
                    self.consume_remnants_of_a_bad_url();
                    return Token::BadUrl(Cow::Owned(value));
                },
                Some(
                    '"' | APOSTROPHE | '(' | '\x00'..='\x08' | '\x0b' | '\x0e'..='\x1f' | '\x7f',
                ) => {
                    self.report(ErrorCode::InvalidToken);
                    self.consume_remnants_of_a_bad_url();
                    return Token::BadUrl(Cow::Owned(value));
                },
                Some(BACKSLASH) => {
                    if self.is_valid_escape_start() {
                        value.push(self.consume_escaped_codepoint());
                    } else {
                        self.report(ErrorCode::InvalidEscape);
                        self.consume_remnants_of_a_bad_url();
                        return Token::BadUrl(Cow::Owned(value));
                    }
                },
                Some(c) => value.push(c),
            }
        }
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-an-ident-like-token>
    fn consume_ident_like_token(&mut self) -> Token<'a> {
        let string = self.consume_ident_sequence();

        if string.eq_ignore_ascii_case("url") && self.peek_codepoint(0) == Some('(') {
            self.advance(1);
            loop {
                match (self.peek_codepoint(0), self.peek_codepoint(1)) {
                    (Some(c1), Some(c2)) if is_whitespace(c1) && is_whitespace(c2) => {
                        self.advance(1);
                    },
                    _ => break,
                }
            }

            let n1 = self.peek_codepoint(0);
            let n2 = self.peek_codepoint(1);
            if n1 == Some('"')
                || n1 == Some(APOSTROPHE)
                || (n1.is_some_and(is_whitespace) && (n2 == Some('"') || n2 == Some(APOSTROPHE)))
            {
                Token::Function(Cow::Owned(string))
            } else {
                self.consume_url_token()
            }
        } else if self.peek_codepoint(0) == Some('(') {
            self.advance(1);
            Token::Function(Cow::Owned(string))
        } else {
            Token::Ident(Cow::Owned(string))
        }
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-a-string-token>
    fn consume_string_token(&mut self, end_token: char) -> Token<'a> {
        let mut string = String::new();
        loop {
            match self.next_codepoint() {
                Some(c) if c == end_token => return Token::String(Cow::Owned(string)),
                Some(NEWLINE) => {
                    self.report(ErrorCode::UnterminatedString);
                    self.reconsume();
                    return Token::BadString(Cow::Owned(string));
                },
                Some(BACKSLASH) => match self.peek_codepoint(0) {
                    None => {},
                    Some(NEWLINE) => self.advance(1),
                    Some(_) => string.push(self.consume_escaped_codepoint()),
                },
                Some(c) => string.push(c),
                None => {
                    self.report(ErrorCode::UnterminatedString);
                    return Token::String(Cow::Owned(string));
                },
            }
        }
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-comment>
    /// Unlike the W3C algorithm (which folds comments silently into inter-token whitespace),
    /// a comment that the rule parser asks for directly is surfaced as its own [Token::Comment]
    /// so that higher layers can choose whether to elide it — it is never merged into a
    /// [Token::Whitespace].
    fn consume_comment(&mut self) -> Option<Token<'a>> {
        if !(self.peek_codepoint(0) == Some('/') && self.peek_codepoint(1) == Some('*')) {
            return None;
        }
        self.advance(2);
        loop {
            match self.next_codepoint() {
                Some('*') if self.peek_codepoint(0) == Some('/') => {
                    self.advance(1);
                    break;
                },
                Some(_) => {},
                None => {
                    self.report(ErrorCode::UnterminatedComment);
                    break;
                },
            }
        }
        Some(Token::Comment)
    }

    /// Read the next token from the input stream.
    ///
    /// # Specification
    /// <https://drafts.csswg.org/css-syntax/#consume-token>
    pub fn next_token(&mut self) -> Token<'a> {
        if let Some(comment) = self.consume_comment() {
            return comment;
        }

        match self.next_codepoint() {
            None => Token::Eof,

            Some(NEWLINE | TAB | WHITESPACE) => {
                self.consume_whitespace();
                Token::Whitespace
            },

            Some('"') => self.consume_string_token('"'),
            Some(APOSTROPHE) => self.consume_string_token(APOSTROPHE),

            Some('#') => match self.peek_codepoint(0) {
                Some(c) if is_ident_code_point(c) || self.is_valid_escape_start() => {
                    let hash_flag = if self.is_valid_ident_start() {
                        HashFlag::Id
                    } else {
                        HashFlag::Unrestricted
                    };
                    let value = self.consume_ident_sequence();
                    Token::Hash(Cow::Owned(value), hash_flag)
                },
                _ => Token::Delim('#'),
            },

            Some('(') => Token::RoundBracketOpen,
            Some(')') => Token::RoundBracketClose,

            Some('+') => {
                if self.is_valid_number_start() {
                    self.reconsume();
                    self.consume_numeric_token()
                } else {
                    Token::Delim('+')
                }
            },

            Some(',') => Token::Comma,

            Some('-') => {
                if self.is_valid_number_start() {
                    self.reconsume();
                    self.consume_numeric_token()
                } else if self.peek_codepoint(0) == Some('-') && self.peek_codepoint(1) == Some('>')
                {
                    self.advance(2);
                    Token::CommentDeclarationClose
                } else if self.is_valid_ident_start() {
                    self.reconsume();
                    self.consume_ident_like_token()
                } else {
                    Token::Delim('-')
                }
            },

            Some('.') => {
                if self.is_valid_number_start() {
                    self.reconsume();
                    self.consume_numeric_token()
                } else {
                    Token::Delim('.')
                }
            },

            Some(':') => Token::Colon,
            Some(';') => Token::Semicolon,

            Some('<') => match self.mode {
                Mode::Data => {
                    if self.peek_codepoint(0) == Some('!')
                        && self.peek_codepoint(1) == Some('-')
                        && self.peek_codepoint(2) == Some('-')
                    {
                        self.advance(3);
                        Token::CommentDeclarationOpen
                    } else {
                        Token::Delim('<')
                    }
                },
                Mode::Selector | Mode::Value => {
                    if self.peek_codepoint(0) == Some('=') {
                        self.advance(1);
                        Token::Comparator(Comparator::LessThanOrEqual)
                    } else {
                        Token::Comparator(Comparator::LessThan)
                    }
                },
            },

            Some('>') if self.mode == Mode::Value => {
                if self.peek_codepoint(0) == Some('=') {
                    self.advance(1);
                    Token::Comparator(Comparator::GreaterThanOrEqual)
                } else {
                    Token::Comparator(Comparator::GreaterThan)
                }
            },

            Some('~') if self.mode == Mode::Selector => {
                if self.peek_codepoint(0) == Some('=') {
                    self.advance(1);
                    Token::Matcher(AttributeMatcher::Includes)
                } else {
                    Token::Delim('~')
                }
            },

            Some('|') if self.mode == Mode::Selector => {
                if self.peek_codepoint(0) == Some('=') {
                    self.advance(1);
                    Token::Matcher(AttributeMatcher::DashMatch)
                } else if self.peek_codepoint(0) == Some('|') {
                    self.advance(1);
                    Token::Column
                } else {
                    Token::Delim('|')
                }
            },

            Some('^') if self.mode == Mode::Selector => {
                if self.peek_codepoint(0) == Some('=') {
                    self.advance(1);
                    Token::Matcher(AttributeMatcher::PrefixMatch)
                } else {
                    Token::Delim('^')
                }
            },

            Some('$') if self.mode == Mode::Selector => {
                if self.peek_codepoint(0) == Some('=') {
                    self.advance(1);
                    Token::Matcher(AttributeMatcher::SuffixMatch)
                } else {
                    Token::Delim('$')
                }
            },

            Some('*') if self.mode == Mode::Selector => {
                if self.peek_codepoint(0) == Some('=') {
                    self.advance(1);
                    Token::Matcher(AttributeMatcher::SubstringMatch)
                } else {
                    Token::Delim('*')
                }
            },

            Some('!') if self.mode == Mode::Selector && self.peek_codepoint(0) == Some('=') => {
                self.advance(1);
                Token::Matcher(AttributeMatcher::NotMatch)
            },

            Some('@') => {
                if self.is_valid_ident_start() {
                    let value = self.consume_ident_sequence();
                    Token::AtKeyword(Cow::Owned(value))
                } else {
                    Token::Delim('@')
                }
            },

            Some('[') => Token::SquareBracketOpen,

            Some(BACKSLASH) => {
                if self.is_valid_escape_start() {
                    self.reconsume();
                    self.consume_ident_like_token()
                } else {
                    self.report(ErrorCode::InvalidEscape);
                    Token::Delim(BACKSLASH)
                }
            },

            Some(']') => Token::SquareBracketClose,
            Some('{') => Token::CurlyBracketOpen,
            Some('}') => Token::CurlyBracketClose,

            Some('0'..='9') => {
                self.reconsume();
                self.consume_numeric_token()
            },

            Some(c) if is_ident_start_code_point(c) => {
                self.reconsume();
                self.consume_ident_like_token()
            },

            Some(c) => Token::Delim(c),
        }
    }

    /// §4.1: consume until the next balanced `}` at depth 0 or a top-level `;`; the
    /// terminator is consumed.
    pub fn skip_unknown_rule(&mut self) {
        self.resync(|depth, token| match token {
            Token::Eof => ResyncStep::StopConsumed,
            Token::Semicolon if *depth == 0 => ResyncStep::StopConsumed,
            Token::CurlyBracketOpen => {
                *depth += 1;
                ResyncStep::Continue
            },
            Token::CurlyBracketClose => {
                if *depth == 0 {
                    ResyncStep::StopConsumed
                } else {
                    *depth -= 1;
                    ResyncStep::Continue
                }
            },
            _ => ResyncStep::Continue,
        });
    }

    /// §4.1: consume until the next `;` at depth 0 or Eof; terminator consumed.
    pub fn jump_to_next_semicolon(&mut self) {
        self.resync(|_depth, token| match token {
            Token::Eof | Token::Semicolon => ResyncStep::StopConsumed,
            _ => ResyncStep::Continue,
        });
    }

    /// §4.1: consume until `;` or `}` at depth 0; `;` consumed, `}` left as next token.
    pub fn jump_to_end_of_declaration(&mut self) {
        self.resync(|depth, token| match token {
            Token::Eof => ResyncStep::StopConsumed,
            Token::Semicolon if *depth == 0 => ResyncStep::StopConsumed,
            Token::CurlyBracketOpen => {
                *depth += 1;
                ResyncStep::Continue
            },
            Token::CurlyBracketClose => {
                if *depth == 0 {
                    ResyncStep::StopReconsume
                } else {
                    *depth -= 1;
                    ResyncStep::Continue
                }
            },
            _ => ResyncStep::Continue,
        });
    }

    /// §4.1: consume until the matching `)`, accounting for nested `()`, `[]`, `{}`, strings,
    /// and comments. Called with one `(` already consumed by the caller, so the starting depth
    /// is 1. All bracket kinds share one depth counter (rather than three independent ones)
    /// since this is only ever used to recover from a single already-unclosed `(`, where any
    /// leftover `)`/`]`/`}` belongs to that same unclosed span.
    pub fn jump_to_closed_arguments(&mut self) {
        let mut depth = 1u32;
        loop {
            match self.next_token() {
                Token::Eof => break,
                Token::RoundBracketOpen
                | Token::Function(_)
                | Token::CurlyBracketOpen
                | Token::SquareBracketOpen => depth += 1,
                Token::RoundBracketClose | Token::CurlyBracketClose | Token::SquareBracketClose => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                },
                _ => {},
            }
        }
    }

    fn resync(&mut self, mut step: impl FnMut(&mut u32, &Token<'a>) -> ResyncStep) {
        let saved_mode = self.mode;
        self.mode = Mode::Data;
        let mut depth = 0u32;
        loop {
            let before = self.position;
            let token = self.next_token();
            match step(&mut depth, &token) {
                ResyncStep::Continue => {},
                ResyncStep::StopConsumed => break,
                ResyncStep::StopReconsume => {
                    self.position = before;
                    break;
                },
            }
        }
        self.mode = saved_mode;
    }
}

enum ResyncStep {
    Continue,
    StopConsumed,
    StopReconsume,
}

/// <https://drafts.csswg.org/css-syntax/#whitespace>
#[inline]
fn is_whitespace(c: char) -> bool {
    matches!(c, NEWLINE | TAB | WHITESPACE)
}

/// <https://drafts.csswg.org/css-syntax/#non-ascii-ident-code-point>
#[inline]
fn is_non_ascii_ident_code_point(c: char) -> bool {
    matches!(c, '\u{00B7}' | '\u{00C0}'..'\u{00D6}'
        | '\u{00D8}'..'\u{00F6}'
        | '\u{00F8}'..'\u{037D}'
        | '\u{037F}'..'\u{1FFF}'
        | '\u{200C}' | '\u{200D}' | '\u{203F}' | '\u{2040}'
        | '\u{2070}'..'\u{218F}'
        | '\u{2C00}'..'\u{2FEF}'
        | '\u{3001}'..'\u{D7FF}'
        | '\u{F900}'..'\u{FDCF}'
        | '\u{FDF0}'..'\u{FFFD}'
        | '\u{10000}'..)
}

/// <https://drafts.csswg.org/css-syntax/#ident-start-code-point>
#[inline]
fn is_ident_start_code_point(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_') || is_non_ascii_ident_code_point(c)
}

/// <https://drafts.csswg.org/css-syntax/#ident-code-point>
#[inline]
fn is_ident_code_point(c: char) -> bool {
    matches!(c, '-' | '0'..='9') || is_ident_start_code_point(c)
}

/// <https://drafts.csswg.org/css-syntax/#check-if-three-code-points-would-start-an-ident-sequence>
#[inline]
fn is_valid_escape(c1: Option<char>, c2: Option<char>) -> bool {
    if c1 != Some(BACKSLASH) {
        false
    } else {
        c2 != Some(NEWLINE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str, mode: Mode) -> Vec<Token<'_>> {
        let mut tokenizer = Tokenizer::new(SourceText::new(source), Configuration::default());
        tokenizer.set_mode(mode);
        let mut out = vec![];
        loop {
            let token = tokenizer.next_token();
            if token.is_eof() {
                break;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn lexes_ident_and_colon_and_number() {
        assert_eq!(
            tokens("a:1", Mode::Data),
            vec![
                Token::Ident("a".into()),
                Token::Colon,
                Token::Number(NumericValue {
                    value: 1.0,
                    int_value: Some(1)
                })
            ]
        );
    }

    #[test]
    fn distinguishes_integer_from_float() {
        let toks = tokens("1 1.5", Mode::Data);
        let Token::Number(n) = &toks[0] else {
            panic!()
        };
        assert!(n.is_integer());
        let Token::Number(n) = &toks[2] else {
            panic!()
        };
        assert!(!n.is_integer());
    }

    #[test]
    fn percentage_and_dimension() {
        assert_eq!(
            tokens("50%", Mode::Data),
            vec![Token::Percentage(NumericValue {
                value: 50.0,
                int_value: Some(50)
            })]
        );
        assert_eq!(
            tokens("10px", Mode::Data),
            vec![Token::Dimension(
                NumericValue {
                    value: 10.0,
                    int_value: Some(10)
                },
                "px".into()
            )]
        );
    }

    #[test]
    fn url_token() {
        assert_eq!(
            tokens("url(foo.png)", Mode::Data),
            vec![Token::Url("foo.png".into())]
        );
    }

    #[test]
    fn string_token() {
        assert_eq!(
            tokens("\"hi\"", Mode::Data),
            vec![Token::String("hi".into())]
        );
    }

    #[test]
    fn selector_mode_recognizes_matchers() {
        assert_eq!(
            tokens("~= |= ^= $= *= != ||", Mode::Selector)
                .into_iter()
                .filter(|t| *t != Token::Whitespace)
                .collect::<Vec<_>>(),
            vec![
                Token::Matcher(AttributeMatcher::Includes),
                Token::Matcher(AttributeMatcher::DashMatch),
                Token::Matcher(AttributeMatcher::PrefixMatch),
                Token::Matcher(AttributeMatcher::SuffixMatch),
                Token::Matcher(AttributeMatcher::SubstringMatch),
                Token::Matcher(AttributeMatcher::NotMatch),
                Token::Column,
            ]
        );
    }

    #[test]
    fn data_mode_does_not_recognize_matchers() {
        assert_eq!(
            tokens("~=", Mode::Data),
            vec![Token::Delim('~'), Token::Delim('=')]
        );
    }

    #[test]
    fn value_mode_recognizes_comparators() {
        assert_eq!(
            tokens("< <= > >=", Mode::Value)
                .into_iter()
                .filter(|t| *t != Token::Whitespace)
                .collect::<Vec<_>>(),
            vec![
                Token::Comparator(Comparator::LessThan),
                Token::Comparator(Comparator::LessThanOrEqual),
                Token::Comparator(Comparator::GreaterThan),
                Token::Comparator(Comparator::GreaterThanOrEqual),
            ]
        );
    }

    #[test]
    fn data_mode_cdo_cdc() {
        assert_eq!(
            tokens("<!-- -->", Mode::Data)
                .into_iter()
                .filter(|t| *t != Token::Whitespace)
                .collect::<Vec<_>>(),
            vec![Token::CommentDeclarationOpen, Token::CommentDeclarationClose]
        );
    }

    #[test]
    fn comment_is_its_own_token() {
        assert_eq!(
            tokens("/* hi */a", Mode::Data),
            vec![Token::Comment, Token::Ident("a".into())]
        );
    }

    #[test]
    fn skip_unknown_rule_stops_after_balanced_block() {
        let mut tokenizer = Tokenizer::new(
            SourceText::new(" foo { bar { baz } } qux"),
            Configuration::default(),
        );
        tokenizer.next_token(); // consume leading whitespace
        tokenizer.next_token(); // "foo"
        tokenizer.next_token(); // whitespace
        tokenizer.skip_unknown_rule();
        tokenizer.consume_whitespace();
        assert_eq!(tokenizer.next_token(), Token::Ident("qux".into()));
    }

    #[test]
    fn jump_to_end_of_declaration_leaves_closing_brace() {
        let mut tokenizer =
            Tokenizer::new(SourceText::new("garbage here } rest"), Configuration::default());
        tokenizer.jump_to_end_of_declaration();
        assert_eq!(tokenizer.next_token(), Token::CurlyBracketClose);
    }

    #[test]
    fn jump_to_closed_arguments_skips_nested_parens() {
        let mut tokenizer =
            Tokenizer::new(SourceText::new("a(b(c)) d) rest"), Configuration::default());
        tokenizer.next_token(); // "a"
        tokenizer.jump_to_closed_arguments();
        tokenizer.consume_whitespace();
        assert_eq!(tokenizer.next_token(), Token::Ident("rest".into()));
    }

    #[test]
    fn unterminated_string_recovers_at_eof() {
        let mut tokenizer = Tokenizer::new(SourceText::new("\"abc"), Configuration::default());
        assert_eq!(tokenizer.next_token(), Token::String("abc".into()));
        assert_eq!(tokenizer.next_token(), Token::Eof);
    }
}
