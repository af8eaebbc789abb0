//! Selector constructor (spec §3.2, §5): selector AST types plus a token-fed state machine
//! that builds a [ComplexSelector] one token at a time.

use crate::error::{CssParseError, ErrorCode};
use crate::source::SourcePosition;
use crate::tokenizer::{AttributeMatcher, HashFlag, Token};
use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
    Column,
}

impl Combinator {
    fn from_delim(c: char) -> Option<Self> {
        match c {
            '>' => Some(Self::Child),
            '+' => Some(Self::NextSibling),
            '~' => Some(Self::SubsequentSibling),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespacePrefix<'a> {
    Named(Cow<'a, str>),
    Any,
    None,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WQName<'a> {
    pub prefix: Option<NamespacePrefix<'a>>,
    pub ident: Cow<'a, str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSelector<'a> {
    Named(WQName<'a>),
    UniversalNamespaced(Option<NamespacePrefix<'a>>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdSelector<'a>(pub Cow<'a, str>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassSelector<'a>(pub Cow<'a, str>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeSelector<'a> {
    Exists {
        name: WQName<'a>,
    },
    Matches {
        name: WQName<'a>,
        matcher: AttributeMatcher,
        value: Cow<'a, str>,
        case_insensitive: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PseudoSelector<'a> {
    /// `:hover`, `:first-child`, ...
    Class(Cow<'a, str>),
    /// `::before`, `::placeholder`, ...
    Element(Cow<'a, str>),
    /// `:not(...)`, `:is(...)`, `:where(...)` — a functional pseudo-class whose argument is
    /// itself a nested selector list.
    Functional {
        name: Cow<'a, str>,
        argument: Vec<ComplexSelector<'a>>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimpleSelector<'a> {
    Type(TypeSelector<'a>),
    Id(IdSelector<'a>),
    Class(ClassSelector<'a>),
    Attribute(AttributeSelector<'a>),
    Pseudo(PseudoSelector<'a>),
}

/// One compound selector: a run of simple selectors with no combinator between them
/// (`div.foo#bar[baz]`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompoundSelector<'a> {
    pub simple_selectors: Vec<SimpleSelector<'a>>,
}

impl<'a> CompoundSelector<'a> {
    pub fn is_empty(&self) -> bool {
        self.simple_selectors.is_empty()
    }
}

/// A full selector: a chain of compound selectors joined by combinators, read left to right
/// (`div.foo > span ~ a`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComplexSelector<'a> {
    pub first: CompoundSelector<'a>,
    pub rest: Vec<(Combinator, CompoundSelector<'a>)>,
}

/// What step of a compound selector the constructor is currently assembling.
#[derive(Clone, Debug)]
enum State<'a> {
    /// Start of a compound selector (or the whole selector); a type selector, `*`, `.`, `#`,
    /// `[`, `:`, or a combinator delimiter is expected next.
    Start,
    /// Just saw `.`; an ident must follow.
    AfterClassDot,
    /// Just saw `#`; handled inline since the tokenizer already distinguishes `Hash(_, Id)`.
    /// Inside `[...]`, reading the attribute name.
    InAttributeName,
    /// Inside `[...]`, read the name, now expect a matcher or `]`.
    InAttributeAfterName { name: WQName<'a> },
    /// Inside `[...]`, read name + matcher, now expect the value.
    InAttributeExpectValue {
        name: WQName<'a>,
        matcher: AttributeMatcher,
    },
    /// Inside `[...]`, read name + matcher + value, now expect `i`/`s` or `]`.
    InAttributeAfterValue {
        name: WQName<'a>,
        matcher: AttributeMatcher,
        value: Cow<'a, str>,
    },
    /// Inside `[...]`, read name + matcher + value + `i`/`s` flag, now expect only `]`.
    AfterAttributeFlagExpectClose,
    /// Just saw `:`, possibly a second `:` follows for a pseudo-element.
    AfterColon,
    /// Just saw `::`; an ident must follow.
    AfterDoubleColon,
    /// Just saw a functional pseudo name + `(`; delegating to a nested constructor until its
    /// matching `)`.
    InFunctionalPseudo {
        name: Cow<'a, str>,
        nested: Box<SelectorConstructor<'a>>,
        depth: u32,
    },
    /// Whitespace seen after a compound selector; still deciding whether a combinator follows
    /// or this is the descendant combinator.
    AfterCompound,
    /// A non-whitespace combinator (`>`, `+`, `~`, `||`) was just consumed; next non-whitespace
    /// starts the next compound selector.
    AfterCombinator(Combinator),
    /// Something in the token stream did not fit the selector grammar.
    Invalid,
}

/// Builds one [ComplexSelector] from a stream of tokens handed in one at a time (spec §5's
/// "Component State Machines").
///
/// Usage: call [Self::reset] before the first token of a selector, then [Self::apply] once per
/// token (already filtered to [Mode::Selector](crate::tokenizer::Mode::Selector) significant
/// tokens — comments are elided by the caller, whitespace is not). [Self::is_valid] reports
/// whether the tokens seen so far still form a legal selector; [Self::result] consumes the
/// constructor and returns what was built, if anything.
#[derive(Clone, Debug)]
pub struct SelectorConstructor<'a> {
    state: State<'a>,
    current: ComplexSelector<'a>,
    compound: CompoundSelector<'a>,
    valid: bool,
    started: bool,
}

impl<'a> Default for SelectorConstructor<'a> {
    fn default() -> Self {
        Self {
            state: State::Start,
            current: ComplexSelector::default(),
            compound: CompoundSelector::default(),
            valid: true,
            started: false,
        }
    }
}

impl<'a> SelectorConstructor<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard any in-progress selector and start over.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the tokens consumed so far still describe a legal selector. Once `false`, it
    /// stays `false` until [Self::reset].
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Feed one token to the constructor. Returns the position-tagged error, if any, that this
    /// token caused (also latched into [Self::is_valid]).
    pub fn apply(&mut self, token: &Token<'a>, position: SourcePosition) -> Option<CssParseError> {
        self.started = true;

        // Take ownership of the current state so the match arms below are free to call
        // `self.push_simple`/`self.invalidate` without fighting a live borrow of `self.state`.
        let state = std::mem::replace(&mut self.state, State::Invalid);

        if let State::InFunctionalPseudo {
            mut nested,
            mut depth,
            name,
        } = state
        {
            match token {
                Token::RoundBracketOpen => {
                    depth += 1;
                    nested.apply(token, position);
                    self.state = State::InFunctionalPseudo {
                        nested,
                        depth,
                        name,
                    };
                },
                Token::RoundBracketClose if depth > 0 => {
                    depth -= 1;
                    nested.apply(token, position);
                    self.state = State::InFunctionalPseudo {
                        nested,
                        depth,
                        name,
                    };
                },
                Token::RoundBracketClose => {
                    let nested_valid = nested.is_valid();
                    let argument = nested.current;
                    self.push_simple(SimpleSelector::Pseudo(PseudoSelector::Functional {
                        name,
                        argument: vec![argument],
                    }));
                    if !nested_valid {
                        return self.invalidate(ErrorCode::InvalidSelector, position);
                    }
                    self.state = State::Start;
                },
                _ => {
                    nested.apply(token, position);
                    self.state = State::InFunctionalPseudo {
                        nested,
                        depth,
                        name,
                    };
                },
            }
            return None;
        }

        match (state, token) {
            (State::Start | State::AfterCombinator(_), Token::Ident(name)) => {
                self.push_simple(SimpleSelector::Type(TypeSelector::Named(WQName {
                    prefix: None,
                    ident: name.clone(),
                })));
                None
            },
            (State::Start | State::AfterCombinator(_), Token::Delim('*')) => {
                self.push_simple(SimpleSelector::Type(TypeSelector::UniversalNamespaced(None)));
                None
            },
            (
                State::Start | State::AfterCombinator(_) | State::AfterCompound,
                Token::Hash(name, HashFlag::Id),
            ) => {
                self.push_simple(SimpleSelector::Id(IdSelector(name.clone())));
                None
            },
            (
                State::Start | State::AfterCombinator(_) | State::AfterCompound,
                Token::Hash(_, HashFlag::Unrestricted),
            ) => self.invalidate(ErrorCode::InvalidSelector, position),
            (
                State::Start | State::AfterCombinator(_) | State::AfterCompound,
                Token::Delim('.'),
            ) => {
                self.state = State::AfterClassDot;
                None
            },
            (State::AfterClassDot, Token::Ident(name)) => {
                self.push_simple(SimpleSelector::Class(ClassSelector(name.clone())));
                None
            },
            (State::AfterClassDot, _) => self.invalidate(ErrorCode::IdentExpected, position),

            (
                State::Start | State::AfterCombinator(_) | State::AfterCompound,
                Token::SquareBracketOpen,
            ) => {
                self.state = State::InAttributeName;
                None
            },
            (State::InAttributeName, Token::Ident(name)) => {
                self.state = State::InAttributeAfterName {
                    name: WQName {
                        prefix: None,
                        ident: name.clone(),
                    },
                };
                None
            },
            (State::InAttributeName, _) => self.invalidate(ErrorCode::IdentExpected, position),

            (State::InAttributeAfterName { name }, Token::SquareBracketClose) => {
                self.push_simple(SimpleSelector::Attribute(AttributeSelector::Exists { name }));
                None
            },
            (State::InAttributeAfterName { name }, Token::Matcher(m)) => {
                self.state = State::InAttributeExpectValue { name, matcher: *m };
                None
            },
            (State::InAttributeAfterName { name }, Token::Delim('=')) => {
                self.state = State::InAttributeExpectValue {
                    name,
                    matcher: AttributeMatcher::exact_equals_marker(),
                };
                None
            },
            (State::InAttributeAfterName { .. }, _) => {
                self.invalidate(ErrorCode::InvalidToken, position)
            },

            (State::InAttributeExpectValue { name, matcher }, Token::String(value))
            | (State::InAttributeExpectValue { name, matcher }, Token::Ident(value)) => {
                self.state = State::InAttributeAfterValue {
                    name,
                    matcher,
                    value: value.clone(),
                };
                None
            },
            (State::InAttributeExpectValue { .. }, _) => {
                self.invalidate(ErrorCode::InvalidToken, position)
            },

            (
                State::InAttributeAfterValue {
                    name,
                    matcher,
                    value,
                },
                Token::SquareBracketClose,
            ) => {
                self.push_simple(SimpleSelector::Attribute(AttributeSelector::Matches {
                    name,
                    matcher,
                    value,
                    case_insensitive: false,
                }));
                None
            },
            (
                State::InAttributeAfterValue {
                    name,
                    matcher,
                    value,
                },
                Token::Ident(flag),
            ) if flag.eq_ignore_ascii_case("i") || flag.eq_ignore_ascii_case("s") => {
                let case_insensitive = flag.eq_ignore_ascii_case("i");
                self.push_simple(SimpleSelector::Attribute(AttributeSelector::Matches {
                    name,
                    matcher,
                    value,
                    case_insensitive,
                }));
                self.state = State::AfterAttributeFlagExpectClose;
                None
            },
            (State::InAttributeAfterValue { .. }, _) => {
                self.invalidate(ErrorCode::InvalidToken, position)
            },
            (State::AfterAttributeFlagExpectClose, Token::SquareBracketClose) => {
                self.state = State::Start;
                None
            },
            (State::AfterAttributeFlagExpectClose, _) => {
                self.invalidate(ErrorCode::InvalidToken, position)
            },

            (
                State::Start | State::AfterCombinator(_) | State::AfterCompound,
                Token::Colon,
            ) => {
                self.state = State::AfterColon;
                None
            },
            (State::AfterColon, Token::Colon) => {
                self.state = State::AfterDoubleColon;
                None
            },
            (State::AfterColon, Token::Ident(name)) => {
                self.push_simple(SimpleSelector::Pseudo(PseudoSelector::Class(name.clone())));
                None
            },
            (State::AfterColon, Token::Function(name)) => {
                self.state = State::InFunctionalPseudo {
                    name: name.clone(),
                    nested: Box::new(SelectorConstructor::new()),
                    depth: 0,
                };
                None
            },
            (State::AfterColon, _) => self.invalidate(ErrorCode::IdentExpected, position),
            (State::AfterDoubleColon, Token::Ident(name)) => {
                self.push_simple(SimpleSelector::Pseudo(PseudoSelector::Element(name.clone())));
                None
            },
            (State::AfterDoubleColon, _) => self.invalidate(ErrorCode::IdentExpected, position),

            (State::Start, Token::Whitespace) => {
                self.state = State::Start;
                None
            },
            (State::AfterCompound, Token::Whitespace) => {
                self.state = State::AfterCompound;
                None
            },
            (State::AfterCombinator(c), Token::Whitespace) => {
                self.state = State::AfterCombinator(c);
                None
            },

            (State::Start, Token::Delim(c)) if Combinator::from_delim(*c).is_some() => {
                self.invalidate(ErrorCode::InvalidSelector, position)
            },

            (state @ (State::Start | State::AfterCompound), Token::Delim(c))
                if Combinator::from_delim(*c).is_some() =>
            {
                self.state = state;
                self.finish_compound();
                self.state = State::AfterCombinator(Combinator::from_delim(*c).unwrap());
                None
            },
            (state @ (State::Start | State::AfterCompound), Token::Column) => {
                self.state = state;
                self.finish_compound();
                self.state = State::AfterCombinator(Combinator::Column);
                None
            },
            (State::AfterCompound, _) if !self.compound.is_empty() => {
                self.state = State::AfterCompound;
                self.finish_compound();
                self.state = State::AfterCombinator(Combinator::Descendant);
                self.apply(token, position)
            },

            (State::Invalid, _) => {
                self.state = State::Invalid;
                None
            },

            _ => self.invalidate(ErrorCode::InvalidToken, position),
        }
    }

    /// Whether a complete, non-empty selector has been assembled and no trailing compound is
    /// left hanging (e.g. after a combinator with nothing following yet).
    pub fn is_ready(&self) -> bool {
        self.started
            && self.valid
            && !matches!(
                self.state,
                State::AfterCombinator(_)
                    | State::AfterClassDot
                    | State::AfterColon
                    | State::AfterDoubleColon
                    | State::InAttributeName
                    | State::InAttributeAfterName { .. }
                    | State::InAttributeExpectValue { .. }
                    | State::InAttributeAfterValue { .. }
                    | State::AfterAttributeFlagExpectClose
                    | State::InFunctionalPseudo { .. }
            )
            && (!self.compound.is_empty() || !self.current.rest.is_empty())
    }

    /// Consume the constructor, returning the assembled selector if one was built and the
    /// grammar never broke.
    pub fn result(mut self) -> Option<ComplexSelector<'a>> {
        if !self.valid {
            return None;
        }
        self.finish_compound();
        if self.current.first.is_empty() && self.current.rest.is_empty() {
            return None;
        }
        Some(self.current)
    }

    fn push_simple(&mut self, simple: SimpleSelector<'a>) {
        self.compound.simple_selectors.push(simple);
        self.state = State::AfterCompound;
    }

    fn finish_compound(&mut self) {
        if self.compound.is_empty() {
            return;
        }
        let compound = std::mem::take(&mut self.compound);
        if self.current.first.is_empty() && self.current.rest.is_empty() {
            self.current.first = compound;
        } else {
            let combinator = match self.state {
                State::AfterCombinator(c) => c,
                _ => Combinator::Descendant,
            };
            self.current.rest.push((combinator, compound));
        }
    }

    fn invalidate(&mut self, code: ErrorCode, position: SourcePosition) -> Option<CssParseError> {
        self.valid = false;
        self.state = State::Invalid;
        Some(CssParseError::new(code, position))
    }
}

impl AttributeMatcher {
    /// There is no dedicated token for plain `=` inside `[attr=value]` (it's the only attribute
    /// comparison the base CSS Syntax grammar spells with a bare `Delim`, not a two-char
    /// matcher token), so the constructor maps it to `EqualTo` directly rather than adding a
    /// seventh token kind to the tokenizer just for this one spot.
    fn exact_equals_marker() -> Self {
        AttributeMatcher::EqualTo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourcePosition;

    fn feed<'a>(tokens: &[Token<'a>]) -> SelectorConstructor<'a> {
        let mut constructor = SelectorConstructor::new();
        for token in tokens {
            constructor.apply(token, SourcePosition::start());
        }
        constructor
    }

    #[test]
    fn type_selector() {
        let constructor = feed(&[Token::Ident("div".into())]);
        assert!(constructor.is_valid());
        assert!(constructor.is_ready());
        let selector = constructor.result().unwrap();
        assert_eq!(selector.first.simple_selectors.len(), 1);
    }

    #[test]
    fn compound_selector_class_and_id() {
        let constructor = feed(&[
            Token::Ident("div".into()),
            Token::Delim('.'),
            Token::Ident("foo".into()),
            Token::Hash("bar".into(), HashFlag::Id),
        ]);
        assert!(constructor.is_valid());
        let selector = constructor.result().unwrap();
        assert_eq!(selector.first.simple_selectors.len(), 3);
    }

    #[test]
    fn combinator_chain() {
        let constructor = feed(&[
            Token::Ident("div".into()),
            Token::Whitespace,
            Token::Delim('>'),
            Token::Whitespace,
            Token::Ident("span".into()),
        ]);
        assert!(constructor.is_valid());
        let selector = constructor.result().unwrap();
        assert_eq!(selector.rest.len(), 1);
        assert_eq!(selector.rest[0].0, Combinator::Child);
    }

    #[test]
    fn descendant_combinator_from_whitespace_alone() {
        let constructor = feed(&[
            Token::Ident("div".into()),
            Token::Whitespace,
            Token::Ident("span".into()),
        ]);
        assert!(constructor.is_valid());
        let selector = constructor.result().unwrap();
        assert_eq!(selector.rest.len(), 1);
        assert_eq!(selector.rest[0].0, Combinator::Descendant);
    }

    #[test]
    fn attribute_exists() {
        let constructor = feed(&[
            Token::SquareBracketOpen,
            Token::Ident("disabled".into()),
            Token::SquareBracketClose,
        ]);
        assert!(constructor.is_valid());
        let selector = constructor.result().unwrap();
        assert!(matches!(
            selector.first.simple_selectors[0],
            SimpleSelector::Attribute(AttributeSelector::Exists { .. })
        ));
    }

    #[test]
    fn attribute_matcher() {
        let constructor = feed(&[
            Token::SquareBracketOpen,
            Token::Ident("lang".into()),
            Token::Matcher(AttributeMatcher::DashMatch),
            Token::String("en".into()),
            Token::SquareBracketClose,
        ]);
        assert!(constructor.is_valid());
        let selector = constructor.result().unwrap();
        assert!(matches!(
            &selector.first.simple_selectors[0],
            SimpleSelector::Attribute(AttributeSelector::Matches {
                matcher: AttributeMatcher::DashMatch,
                ..
            })
        ));
    }

    #[test]
    fn pseudo_class_and_element() {
        let constructor = feed(&[
            Token::Ident("a".into()),
            Token::Colon,
            Token::Ident("hover".into()),
            Token::Colon,
            Token::Colon,
            Token::Ident("before".into()),
        ]);
        assert!(constructor.is_valid());
        let selector = constructor.result().unwrap();
        assert_eq!(selector.first.simple_selectors.len(), 3);
    }

    #[test]
    fn functional_pseudo_not() {
        let constructor = feed(&[
            Token::Colon,
            Token::Function("not".into()),
            Token::Ident("div".into()),
            Token::RoundBracketClose,
        ]);
        assert!(constructor.is_valid());
        let selector = constructor.result().unwrap();
        assert!(matches!(
            &selector.first.simple_selectors[0],
            SimpleSelector::Pseudo(PseudoSelector::Functional { name, .. }) if name == "not"
        ));
    }

    #[test]
    fn invalid_leading_combinator() {
        let constructor = feed(&[Token::Delim('>')]);
        assert!(!constructor.is_valid());
        assert!(constructor.result().is_none());
    }

    #[test]
    fn invalid_hash_without_id_flag() {
        let constructor = feed(&[Token::Hash("1bad".into(), HashFlag::Unrestricted)]);
        assert!(!constructor.is_valid());
    }

    #[test]
    fn reset_clears_state() {
        let mut constructor = SelectorConstructor::new();
        constructor.apply(&Token::Ident("div".into()), SourcePosition::start());
        assert!(constructor.is_ready());
        constructor.reset();
        assert!(!constructor.is_ready());
    }
}
