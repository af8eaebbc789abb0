//! Value builder (spec §3.2, §5): assembles a declaration's value out of component values,
//! tracking a trailing `!important` the way the reference engine's own tree models a
//! declaration's value list.

use crate::tokenizer::{NumericValue, Token};
use std::borrow::Cow;

/// A simple grouping delimiter that appeared in a value (`(...)`, `[...]`, `{...}`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockDelimiter {
    Parenthesis,
    SquareBracket,
    CurlyBrace,
}

impl BlockDelimiter {
    fn end_token(self) -> Token<'static> {
        match self {
            Self::Parenthesis => Token::RoundBracketClose,
            Self::SquareBracket => Token::SquareBracketClose,
            Self::CurlyBrace => Token::CurlyBracketClose,
        }
    }
}

/// A single component of a value, mirroring the reference engine's `ComponentValue` /
/// `PreservedToken` split: most tokens pass through unchanged, but grouping tokens recurse into
/// a nested component list, and a function's arguments recurse the same way.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentValue<'a> {
    Ident(Cow<'a, str>),
    AtKeyword(Cow<'a, str>),
    String(Cow<'a, str>),
    Url(Cow<'a, str>),
    Hash(Cow<'a, str>),
    Number(NumericValue),
    Percentage(NumericValue),
    Dimension(NumericValue, Cow<'a, str>),
    Delim(char),
    Comma,
    Colon,
    Function {
        name: Cow<'a, str>,
        arguments: Vec<ComponentValue<'a>>,
    },
    Block {
        delimiter: BlockDelimiter,
        value: Vec<ComponentValue<'a>>,
    },
}

/// The fully assembled value of a declaration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Value<'a> {
    pub components: Vec<ComponentValue<'a>>,
}

impl<'a> Value<'a> {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

enum Frame<'a> {
    Function {
        name: Cow<'a, str>,
        arguments: Vec<ComponentValue<'a>>,
    },
    Block {
        delimiter: BlockDelimiter,
        value: Vec<ComponentValue<'a>>,
    },
}

impl<'a> Frame<'a> {
    fn push(&mut self, component: ComponentValue<'a>) {
        match self {
            Self::Function { arguments, .. } => arguments.push(component),
            Self::Block { value, .. } => value.push(component),
        }
    }

    fn close_token(&self) -> Token<'static> {
        match self {
            Self::Function { .. } => Token::RoundBracketClose,
            Self::Block { delimiter, .. } => delimiter.end_token(),
        }
    }

    fn into_component(self) -> ComponentValue<'a> {
        match self {
            Self::Function { name, arguments } => ComponentValue::Function { name, arguments },
            Self::Block { delimiter, value } => ComponentValue::Block { delimiter, value },
        }
    }
}

/// Builds a declaration's [Value] out of tokens fed in one at a time, tracking nesting depth
/// and a trailing `!important`.
///
/// Usage mirrors [SelectorConstructor](crate::selectors::SelectorConstructor): [Self::reset],
/// then [Self::apply] per significant token (leading/trailing whitespace is insignificant and
/// may be skipped by the caller; interior whitespace is dropped automatically). [Self::is_ready]
/// reports whether the value is complete and well-nested (no open function/block); the caller
/// calls it once it hits the declaration's terminating `;` or `}`.
#[derive(Default)]
pub struct ValueBuilder<'a> {
    top: Vec<ComponentValue<'a>>,
    stack: Vec<Frame<'a>>,
    important: bool,
    pending_bang: bool,
}

impl<'a> ValueBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.top.clear();
        self.stack.clear();
        self.important = false;
        self.pending_bang = false;
    }

    /// Feed one token. Tokens that would extend a pending `! important` but turn out not to
    /// spell it are re-inserted into the value as plain tokens (a lone `!` followed by
    /// something other than `important` is just a `Delim('!')` component).
    pub fn apply(&mut self, token: &Token<'a>) {
        if matches!(token, Token::Whitespace | Token::Comment) {
            return;
        }

        if self.pending_bang {
            self.pending_bang = false;
            if let Token::Ident(name) = token {
                if name.eq_ignore_ascii_case("important") && self.stack.is_empty() {
                    self.important = true;
                    return;
                }
            }
            self.push(ComponentValue::Delim('!'));
        }

        match token {
            Token::Delim('!') if self.stack.is_empty() => {
                self.pending_bang = true;
            },
            Token::Ident(name) => self.push(ComponentValue::Ident(name.clone())),
            Token::AtKeyword(name) => self.push(ComponentValue::AtKeyword(name.clone())),
            Token::String(value) => self.push(ComponentValue::String(value.clone())),
            Token::BadString(value) => self.push(ComponentValue::String(value.clone())),
            Token::Url(value) => self.push(ComponentValue::Url(value.clone())),
            Token::BadUrl(value) => self.push(ComponentValue::Url(value.clone())),
            Token::Hash(value, _) => self.push(ComponentValue::Hash(value.clone())),
            Token::Number(n) => self.push(ComponentValue::Number(*n)),
            Token::Percentage(n) => self.push(ComponentValue::Percentage(*n)),
            Token::Dimension(n, unit) => self.push(ComponentValue::Dimension(*n, unit.clone())),
            Token::Delim(c) => self.push(ComponentValue::Delim(*c)),
            Token::Comma => self.push(ComponentValue::Comma),
            Token::Colon => self.push(ComponentValue::Colon),
            Token::Function(name) => self.stack.push(Frame::Function {
                name: name.clone(),
                arguments: vec![],
            }),
            Token::RoundBracketOpen => self.stack.push(Frame::Block {
                delimiter: BlockDelimiter::Parenthesis,
                value: vec![],
            }),
            Token::SquareBracketOpen => self.stack.push(Frame::Block {
                delimiter: BlockDelimiter::SquareBracket,
                value: vec![],
            }),
            Token::CurlyBracketOpen => self.stack.push(Frame::Block {
                delimiter: BlockDelimiter::CurlyBrace,
                value: vec![],
            }),
            Token::RoundBracketClose | Token::SquareBracketClose | Token::CurlyBracketClose => {
                self.close_frame(token);
            },
            Token::Matcher(_)
            | Token::Comparator(_)
            | Token::Column
            | Token::Semicolon
            | Token::CommentDeclarationOpen
            | Token::CommentDeclarationClose
            | Token::Eof => {},
        }
    }

    fn close_frame(&mut self, token: &Token<'a>) {
        match self.stack.pop() {
            Some(frame) if &frame.close_token() == token => {
                let component = frame.into_component();
                self.push(component);
            },
            Some(frame) => {
                // Mismatched bracket kind: push both back literally rather than losing tokens.
                let component = frame.into_component();
                self.push(component);
                self.push(match token {
                    Token::SquareBracketClose => ComponentValue::Delim(']'),
                    Token::CurlyBracketClose => ComponentValue::Delim('}'),
                    _ => ComponentValue::Delim(')'),
                });
            },
            None => self.push(match token {
                Token::SquareBracketClose => ComponentValue::Delim(']'),
                Token::CurlyBracketClose => ComponentValue::Delim('}'),
                _ => ComponentValue::Delim(')'),
            }),
        }
    }

    fn push(&mut self, component: ComponentValue<'a>) {
        match self.stack.last_mut() {
            Some(frame) => frame.push(component),
            None => self.top.push(component),
        }
    }

    /// Whether the value is complete: no open function/block, and no `!` left hanging with no
    /// `important` after it.
    pub fn is_ready(&self) -> bool {
        self.stack.is_empty() && !self.pending_bang
    }

    pub fn is_important(&self) -> bool {
        self.important
    }

    /// Consume the builder, returning the assembled value.
    pub fn result(mut self) -> Value<'a> {
        if self.pending_bang {
            self.top.push(ComponentValue::Delim('!'));
        }
        while let Some(frame) = self.stack.pop() {
            let component = frame.into_component();
            match self.stack.last_mut() {
                Some(parent) => parent.push(component),
                None => self.top.push(component),
            }
        }
        Value {
            components: self.top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build<'a>(tokens: &[Token<'a>]) -> ValueBuilder<'a> {
        let mut builder = ValueBuilder::new();
        for token in tokens {
            builder.apply(token);
        }
        builder
    }

    #[test]
    fn plain_ident_value() {
        let builder = build(&[Token::Ident("red".into())]);
        assert!(builder.is_ready());
        assert!(!builder.is_important());
        let value = builder.result();
        assert_eq!(value.components, vec![ComponentValue::Ident("red".into())]);
    }

    #[test]
    fn important_tail() {
        let builder = build(&[
            Token::Ident("red".into()),
            Token::Whitespace,
            Token::Delim('!'),
            Token::Whitespace,
            Token::Ident("important".into()),
        ]);
        assert!(builder.is_ready());
        assert!(builder.is_important());
        let value = builder.result();
        assert_eq!(value.components, vec![ComponentValue::Ident("red".into())]);
    }

    #[test]
    fn bang_not_followed_by_important_is_kept_literally() {
        let builder = build(&[Token::Delim('!'), Token::Ident("weird".into())]);
        assert!(!builder.is_important());
        let value = builder.result();
        assert_eq!(
            value.components,
            vec![
                ComponentValue::Delim('!'),
                ComponentValue::Ident("weird".into())
            ]
        );
    }

    #[test]
    fn function_call_nests_arguments() {
        let builder = build(&[
            Token::Function("rgb".into()),
            Token::Number(NumericValue {
                value: 1.0,
                int_value: Some(1),
            }),
            Token::Comma,
            Token::Number(NumericValue {
                value: 2.0,
                int_value: Some(2),
            }),
            Token::RoundBracketClose,
        ]);
        assert!(builder.is_ready());
        let value = builder.result();
        assert_eq!(value.components.len(), 1);
        assert!(matches!(
            &value.components[0],
            ComponentValue::Function { name, arguments } if name == "rgb" && arguments.len() == 3
        ));
    }

    #[test]
    fn unclosed_function_is_not_ready() {
        let builder = build(&[Token::Function("calc".into()), Token::Number(NumericValue {
            value: 1.0,
            int_value: Some(1),
        })]);
        assert!(!builder.is_ready());
    }

    #[test]
    fn nested_blocks() {
        let builder = build(&[
            Token::SquareBracketOpen,
            Token::Ident("a".into()),
            Token::RoundBracketOpen,
            Token::Ident("b".into()),
            Token::RoundBracketClose,
            Token::SquareBracketClose,
        ]);
        assert!(builder.is_ready());
        let value = builder.result();
        let ComponentValue::Block { value: inner, .. } = &value.components[0] else {
            panic!("expected block")
        };
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn reset_clears_state() {
        let mut builder = ValueBuilder::new();
        builder.apply(&Token::Function("calc".into()));
        assert!(!builder.is_ready());
        builder.reset();
        assert!(builder.is_ready());
    }
}
