//! The rule parser (spec §3.2, §4.2, §5): the orchestrator that drives the tokenizer through
//! the recursive-descent CSS grammar, dispatching at-rules against a fixed per-keyword contract
//! table and filling declaration blocks via the selector/value constructors.
//!
//! Grounded on the reference engine's `Parser` (token buffering/reconsume, `state`/`set_state`
//! backup-and-restore) and `RuleParser` (prelude/block split per at-rule), plus
//! `mozilla-servo-rust-cssparser`'s three-way `AtRuleType::{WithoutBlock,WithBlock,OptionalBlock}`
//! split for the at-rule table.

use crate::config::Configuration;
use crate::error::{ErrorCode, SyntaxError};
use crate::properties::{Property, PropertyFactory, UnknownProperty};
use crate::selectors::{ComplexSelector, SelectorConstructor};
use crate::source::SourceText;
use crate::tokenizer::{Mode, Token, Tokenizer};
use crate::tree::{
    CharsetRule, CssMedium, Declaration, DeclarationBlock, DocumentFunction, DocumentRule,
    FontFaceRule, ImportRule, KeyframeRule, KeyframeSelector, KeyframesRule, MediaFeature,
    MediaRule, NamespaceRule, PageRule, Rule, RuleId, StyleRule, Stylesheet, SupportsRule,
    UnknownAtRule,
};
use crate::tree::Condition;
use crate::values::{Value, ValueBuilder};
use std::borrow::Cow;

/// A snapshot of the parser's read position, for lookahead that needs to backtrack further than
/// one token.
#[derive(Clone, Copy, Debug)]
pub struct ParserState {
    tokenizer_position: usize,
    mode: Mode,
}

/// Drives a [Tokenizer] through the stylesheet grammar, building a [Stylesheet].
pub struct RuleParser<'a, 'f> {
    tokenizer: Tokenizer<'a>,
    buffered_token: Option<Token<'a>>,
    config: Configuration,
    factory: &'f dyn PropertyFactory,
    stylesheet: Stylesheet<'a>,
}

impl<'a, 'f> RuleParser<'a, 'f> {
    pub fn new(source: SourceText<'a>, config: Configuration, factory: &'f dyn PropertyFactory) -> Self {
        Self {
            tokenizer: Tokenizer::new(source, config.clone()),
            buffered_token: None,
            config,
            factory,
            stylesheet: Stylesheet::new(),
        }
    }

    /// Parse the whole input as a top-level stylesheet.
    pub fn parse(mut self) -> Stylesheet<'a> {
        self.consume_list_of_rules(true, None);
        self.stylesheet
    }

    /// Parse the input as a single complex selector (spec §6.2 `parse_selector`). Returns `None`
    /// if the selector never becomes valid, regardless of how much input remains.
    pub(crate) fn parse_selector_only(mut self) -> Option<ComplexSelector<'a>> {
        self.tokenizer.set_mode(Mode::Selector);
        let mut constructor = SelectorConstructor::new();
        loop {
            match self.next_token() {
                Token::Eof => break,
                other => {
                    let position = self.tokenizer.source_position();
                    constructor.apply(&other, position);
                },
            }
        }
        if constructor.is_valid() {
            constructor.result()
        } else {
            None
        }
    }

    /// Parse the input as a single value (spec §6.2 `parse_value`).
    pub(crate) fn parse_value_only(mut self) -> Option<Value<'a>> {
        self.tokenizer.set_mode(Mode::Value);
        let mut builder = ValueBuilder::new();
        loop {
            match self.next_token() {
                Token::Eof => break,
                other => builder.apply(&other),
            }
        }
        if !builder.is_ready() {
            return None;
        }
        let value = builder.result();
        (!value.is_empty()).then_some(value)
    }

    /// Parse the input as a single rule, at-rule or qualified (spec §6.2 `parse_rule`).
    pub(crate) fn parse_one_rule(mut self) -> Option<Rule<'a>> {
        self.tokenizer.set_mode(Mode::Data);
        loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment => continue,
                Token::Eof => return None,
                Token::AtKeyword(name) => {
                    let id = self.consume_at_rule(name, None)?;
                    return Some(self.stylesheet.rule(id).clone());
                },
                other => {
                    self.reconsume(other);
                    let id = self.consume_qualified_rule(None)?;
                    return Some(self.stylesheet.rule(id).clone());
                },
            }
        }
    }

    /// Parse the input as a single declaration, handing the interpreted result back through the
    /// configured [PropertyFactory] (spec §6.2 `parse_declaration`).
    pub(crate) fn parse_one_property(mut self) -> Option<Box<dyn Property>> {
        self.tokenizer.set_mode(Mode::Data);
        let name = loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment => continue,
                Token::Ident(name) => break name,
                _ => return None,
            }
        };
        self.skip_insignificant();
        if !matches!(self.next_token(), Token::Colon) {
            return None;
        }
        self.tokenizer.set_mode(Mode::Value);
        let mut builder = ValueBuilder::new();
        loop {
            match self.next_token() {
                Token::Eof => break,
                other => builder.apply(&other),
            }
        }
        if !builder.is_ready() {
            return None;
        }
        let important = builder.is_important();
        let value = builder.result();
        let mut property = match self.factory.create(&name) {
            Some(property) => property,
            None => Box::new(UnknownProperty::new()),
        };
        if !property.try_set_value(value) {
            return None;
        }
        property.set_important(important);
        Some(property)
    }

    /// Parse the input as a declaration list with no surrounding braces (spec §6.2
    /// `parse_declarations`), e.g. the contents of an inline `style` attribute.
    pub(crate) fn parse_many_declarations(mut self) -> DeclarationBlock<'a> {
        self.tokenizer.set_mode(Mode::Data);
        let mut block = DeclarationBlock::default();
        loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment | Token::Semicolon => continue,
                Token::Eof => break,
                Token::Ident(name) => {
                    if let Some(declaration) = self.consume_declaration(name) {
                        block.push(declaration);
                    }
                },
                other => {
                    self.report(ErrorCode::IdentExpected);
                    self.reconsume(other);
                    self.tokenizer.jump_to_end_of_declaration();
                },
            }
        }
        block
    }

    /// Parse the input as a comma-separated media query list (spec §6.2 `parse_media_list`).
    /// Strict: any leftover input (including a block opener) is a [SyntaxError].
    pub(crate) fn parse_media_list_strict(mut self) -> Result<Vec<CssMedium<'a>>, SyntaxError> {
        let (media, has_block) = self.parse_media_list();
        if has_block {
            return Err(SyntaxError);
        }
        match self.next_token() {
            Token::Eof => Ok(media),
            _ => Err(SyntaxError),
        }
    }

    /// Parse the input as exactly one medium (spec §6.2 `parse_medium`). Strict in the same way
    /// as [Self::parse_media_list_strict], and additionally rejects a comma-separated list.
    pub(crate) fn parse_medium_strict(mut self) -> Result<CssMedium<'a>, SyntaxError> {
        let (mut media, has_block) = self.parse_media_list();
        if has_block || media.len() != 1 {
            return Err(SyntaxError);
        }
        match self.next_token() {
            Token::Eof => Ok(media.pop().unwrap()),
            _ => Err(SyntaxError),
        }
    }

    /// Parse the input as an `@supports` condition (spec §6.2 `parse_condition`).
    pub(crate) fn parse_condition_only(mut self) -> Option<Condition<'a>> {
        self.tokenizer.set_mode(Mode::Data);
        self.skip_insignificant();
        if matches!(self.peek_token(), Token::Eof) {
            return None;
        }
        Some(self.parse_supports_or())
    }

    /// Parse the input as an `@document` function list, without a following block (spec §6.2
    /// `parse_document_rules`).
    pub(crate) fn parse_document_rules_only(mut self) -> Option<Vec<DocumentFunction<'a>>> {
        let (functions, _has_block) = self.parse_document_functions();
        (!functions.is_empty()).then_some(functions)
    }

    /// Parse the input as one `@keyframes` keyframe selector entry (`from`, `to`, or a
    /// percentage; spec §6.2 `parse_keyframe_selector`).
    pub(crate) fn parse_keyframe_selector_only(mut self) -> Option<KeyframeSelector> {
        self.tokenizer.set_mode(Mode::Data);
        loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment | Token::Comma => continue,
                Token::Ident(word) if word.eq_ignore_ascii_case("from") => return Some(KeyframeSelector::From),
                Token::Ident(word) if word.eq_ignore_ascii_case("to") => return Some(KeyframeSelector::To),
                Token::Percentage(n) => return Some(KeyframeSelector::Percentage(n.value)),
                _ => return None,
            }
        }
    }

    /// Parse the input as one full keyframe rule, selector list plus body (spec §6.2
    /// `parse_keyframe_rule`).
    pub(crate) fn parse_keyframe_rule_only(mut self) -> Option<KeyframeRule<'a>> {
        self.tokenizer.set_mode(Mode::Data);
        let mut selectors = Vec::new();
        loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment | Token::Comma => continue,
                Token::CurlyBracketOpen => break,
                Token::Ident(word) if word.eq_ignore_ascii_case("from") => selectors.push(KeyframeSelector::From),
                Token::Ident(word) if word.eq_ignore_ascii_case("to") => selectors.push(KeyframeSelector::To),
                Token::Percentage(n) => selectors.push(KeyframeSelector::Percentage(n.value)),
                _ => return None,
            }
        }
        let body = self.consume_declaration_block();
        Some(KeyframeRule { selectors, body })
    }

    // --- token stream plumbing -------------------------------------------------------------

    fn next_token(&mut self) -> Token<'a> {
        match self.buffered_token.take() {
            Some(token) => token,
            None => self.tokenizer.next_token(),
        }
    }

    fn peek_token(&mut self) -> Token<'a> {
        if self.buffered_token.is_none() {
            self.buffered_token = Some(self.tokenizer.next_token());
        }
        self.buffered_token.clone().unwrap()
    }

    fn reconsume(&mut self, token: Token<'a>) {
        self.buffered_token = Some(token);
    }

    fn state(&self) -> ParserState {
        ParserState {
            tokenizer_position: self.tokenizer.position(),
            mode: self.tokenizer.mode(),
        }
    }

    fn set_state(&mut self, state: ParserState) {
        self.tokenizer.set_position(state.tokenizer_position);
        self.tokenizer.set_mode(state.mode);
        self.buffered_token = None;
    }

    fn report(&self, code: ErrorCode) {
        self.config
            .report(crate::error::CssParseError::new(code, self.tokenizer.source_position()));
    }

    fn skip_insignificant(&mut self) {
        loop {
            match self.peek_token() {
                Token::Whitespace | Token::Comment => {
                    self.next_token();
                },
                _ => break,
            }
        }
    }

    /// Skip the body of a block whose opening `{` has already been consumed.
    fn skip_block_contents(&mut self) {
        let mut depth = 1u32;
        loop {
            match self.next_token() {
                Token::Eof => break,
                Token::CurlyBracketOpen => depth += 1,
                Token::CurlyBracketClose => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                },
                _ => {},
            }
        }
    }

    // --- top-level dispatch ------------------------------------------------------------------

    fn consume_list_of_rules(&mut self, top_level: bool, parent: Option<RuleId>) -> Vec<RuleId> {
        self.tokenizer.set_mode(Mode::Data);
        let mut ids = Vec::new();
        loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment => continue,
                Token::Eof => break,
                Token::CommentDeclarationOpen | Token::CommentDeclarationClose => continue,
                Token::CurlyBracketClose if !top_level => break,
                Token::AtKeyword(name) => {
                    if let Some(id) = self.consume_at_rule(name, parent) {
                        ids.push(id);
                    }
                },
                other => {
                    self.reconsume(other);
                    if let Some(id) = self.consume_qualified_rule(parent) {
                        ids.push(id);
                    }
                },
            }
        }
        ids
    }

    // --- qualified (style) rules -------------------------------------------------------------

    fn consume_qualified_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        self.tokenizer.set_mode(Mode::Selector);
        let mut constructor = SelectorConstructor::new();
        let mut selectors = Vec::new();

        loop {
            match self.next_token() {
                Token::Eof => {
                    self.report(ErrorCode::InvalidBlockStart);
                    return None;
                },
                Token::CurlyBracketOpen => break,
                Token::Comma => {
                    let position = self.tokenizer.source_position();
                    let keep_invalid = self.config.keep_invalid_selectors();
                    let valid = constructor.is_valid();
                    if valid || keep_invalid {
                        if let Some(selector) = constructor.result() {
                            selectors.push(selector);
                        }
                    } else {
                        let _ = position;
                    }
                    constructor = SelectorConstructor::new();
                },
                other => {
                    let position = self.tokenizer.source_position();
                    constructor.apply(&other, position);
                },
            }
        }

        let keep_invalid = self.config.keep_invalid_selectors();
        let valid = constructor.is_valid();
        if valid || keep_invalid {
            if let Some(selector) = constructor.result() {
                selectors.push(selector);
            }
        }

        self.tokenizer.set_mode(Mode::Data);
        if selectors.is_empty() {
            self.report(ErrorCode::InvalidSelector);
            self.skip_block_contents();
            return None;
        }

        let body = self.consume_declaration_block();
        Some(
            self.stylesheet
                .insert(Rule::Style(StyleRule { selectors, body }), parent),
        )
    }

    fn consume_declaration_block(&mut self) -> DeclarationBlock<'a> {
        let mut block = DeclarationBlock::default();
        loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment | Token::Semicolon => continue,
                Token::CurlyBracketClose | Token::Eof => break,
                Token::Ident(name) => {
                    if let Some(declaration) = self.consume_declaration(name) {
                        block.push(declaration);
                    }
                },
                other => {
                    self.report(ErrorCode::IdentExpected);
                    self.reconsume(other);
                    self.tokenizer.jump_to_end_of_declaration();
                },
            }
        }
        block
    }

    fn consume_declaration(&mut self, name: Cow<'a, str>) -> Option<Declaration<'a>> {
        self.skip_insignificant();
        match self.next_token() {
            Token::Colon => {},
            other => {
                self.report(ErrorCode::ColonMissing);
                self.reconsume(other);
                self.tokenizer.jump_to_end_of_declaration();
                return None;
            },
        }

        self.tokenizer.set_mode(Mode::Value);
        let mut builder = ValueBuilder::new();
        loop {
            match self.next_token() {
                Token::Eof => break,
                Token::Semicolon if builder.is_ready() => break,
                Token::CurlyBracketClose if builder.is_ready() => {
                    self.reconsume(Token::CurlyBracketClose);
                    break;
                },
                other => builder.apply(&other),
            }
        }
        self.tokenizer.set_mode(Mode::Data);

        if !builder.is_ready() {
            self.report(ErrorCode::ValueMissing);
            return None;
        }
        let important = builder.is_important();
        let value = builder.result();
        if value.is_empty() {
            self.report(ErrorCode::ValueMissing);
            return None;
        }

        match self.factory.create(&name) {
            Some(mut property) => {
                if !property.try_set_value(value.clone()) {
                    self.report(ErrorCode::ValueMissing);
                    return None;
                }
                property.set_important(important);
                Some(Declaration {
                    name,
                    value,
                    important,
                })
            },
            None => {
                self.report(ErrorCode::UnknownDeclarationName);
                let mut property = UnknownProperty::new();
                property.try_set_value(value.clone());
                property.set_important(important);
                Some(Declaration {
                    name,
                    value,
                    important,
                })
            },
        }
    }

    // --- at-rule dispatch table ---------------------------------------------------------------

    fn consume_at_rule(&mut self, name: Cow<'a, str>, parent: Option<RuleId>) -> Option<RuleId> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "charset" => self.consume_charset_rule(parent),
            "import" => self.consume_import_rule(parent),
            "namespace" => self.consume_namespace_rule(parent),
            "media" => self.consume_media_rule(parent),
            "supports" => self.consume_supports_rule(parent),
            "document" | "-moz-document" => self.consume_document_rule(parent),
            "page" => self.consume_page_rule(parent),
            "font-face" => self.consume_font_face_rule(parent),
            "keyframes" | "-webkit-keyframes" | "-moz-keyframes" | "-o-keyframes" => {
                self.consume_keyframes_rule(parent)
            },
            _ => self.consume_unknown_at_rule(name, parent),
        }
    }

    fn read_prelude_value(&mut self) -> (crate::values::Value<'a>, bool) {
        let mut builder = ValueBuilder::new();
        loop {
            match self.next_token() {
                Token::Eof => return (builder.result(), false),
                Token::Semicolon if builder.is_ready() => return (builder.result(), false),
                Token::CurlyBracketOpen if builder.is_ready() => return (builder.result(), true),
                other => builder.apply(&other),
            }
        }
    }

    fn consume_unknown_at_rule(&mut self, name: Cow<'a, str>, parent: Option<RuleId>) -> Option<RuleId> {
        self.report(ErrorCode::UnknownAtRule);
        let (prelude, has_block) = self.read_prelude_value();
        if has_block {
            self.skip_block_contents();
        }
        Some(self.stylesheet.insert(
            Rule::UnknownAt(UnknownAtRule {
                name,
                prelude,
                has_block,
            }),
            parent,
        ))
    }

    fn consume_charset_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        self.tokenizer.set_mode(Mode::Data);
        let encoding = match self.next_token() {
            Token::String(s) => s,
            other => {
                self.report(ErrorCode::InvalidToken);
                self.reconsume(other);
                self.tokenizer.jump_to_next_semicolon();
                return None;
            },
        };
        match self.next_token() {
            Token::Semicolon | Token::Eof => {},
            other => {
                self.reconsume(other);
                self.tokenizer.jump_to_next_semicolon();
            },
        }
        Some(
            self.stylesheet
                .insert(Rule::Charset(CharsetRule { encoding }), parent),
        )
    }

    fn consume_import_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        self.tokenizer.set_mode(Mode::Data);
        self.skip_insignificant();
        let url = match self.next_token() {
            Token::String(s) | Token::Url(s) => s,
            other => {
                self.report(ErrorCode::InvalidToken);
                self.reconsume(other);
                self.tokenizer.jump_to_next_semicolon();
                return None;
            },
        };
        let (media, _has_block) = self.parse_media_list();
        Some(
            self.stylesheet
                .insert(Rule::Import(ImportRule { url, media }), parent),
        )
    }

    fn consume_namespace_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        self.tokenizer.set_mode(Mode::Data);
        self.skip_insignificant();
        let mut prefix = None;
        let mut token = self.next_token();
        if let Token::Ident(p) = &token {
            prefix = Some(p.clone());
            self.skip_insignificant();
            token = self.next_token();
        }
        let url = match token {
            Token::String(s) | Token::Url(s) => s,
            other => {
                self.report(ErrorCode::InvalidToken);
                self.reconsume(other);
                self.tokenizer.jump_to_next_semicolon();
                return None;
            },
        };
        match self.next_token() {
            Token::Semicolon | Token::Eof => {},
            other => {
                self.reconsume(other);
                self.tokenizer.jump_to_next_semicolon();
            },
        }
        Some(
            self.stylesheet
                .insert(Rule::Namespace(NamespaceRule { prefix, url }), parent),
        )
    }

    fn consume_media_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        let (media, has_block) = self.parse_media_list();
        if !has_block {
            self.report(ErrorCode::InvalidToken);
            self.tokenizer.skip_unknown_rule();
            return None;
        }
        let id = self
            .stylesheet
            .insert(Rule::Media(MediaRule { media, rules: vec![] }), parent);
        let children = self.consume_list_of_rules(false, Some(id));
        if let Rule::Media(rule) = self.stylesheet.rule_mut(id) {
            rule.rules = children;
        }
        Some(id)
    }

    /// Reads a comma-separated media query list up to (and consuming) the terminating `;` or
    /// `{`. Returns whether a block follows.
    fn parse_media_list(&mut self) -> (Vec<CssMedium<'a>>, bool) {
        self.tokenizer.set_mode(Mode::Value);
        let mut media = Vec::new();
        let mut current = CssMedium::default();
        let mut has_block = false;

        loop {
            match self.next_token() {
                Token::Eof => break,
                Token::Semicolon => break,
                Token::CurlyBracketOpen => {
                    has_block = true;
                    break;
                },
                Token::Whitespace | Token::Comment => continue,
                Token::Comma => media.push(std::mem::take(&mut current)),
                Token::Ident(word) if word.eq_ignore_ascii_case("not") && current.media_type.is_none() => {
                    current.negated = true;
                },
                Token::Ident(word) if word.eq_ignore_ascii_case("only") && current.media_type.is_none() => {
                    current.only = true;
                },
                Token::Ident(word) if word.eq_ignore_ascii_case("and") => {},
                Token::Ident(word) if current.media_type.is_none() => {
                    current.media_type = Some(word);
                },
                Token::RoundBracketOpen => {
                    current.features.push(self.parse_media_feature());
                },
                _ => {},
            }
        }
        media.push(current);
        self.tokenizer.set_mode(Mode::Data);
        (media, has_block)
    }

    /// Reads a single `(feature)` or `(feature: value)` clause; the leading `(` is already
    /// consumed by the caller.
    fn parse_media_feature(&mut self) -> MediaFeature<'a> {
        self.skip_insignificant();
        let name = match self.next_token() {
            Token::Ident(n) => n,
            other => {
                self.reconsume(other);
                Cow::Borrowed("")
            },
        };
        let mut value = None;
        loop {
            match self.next_token() {
                Token::RoundBracketClose | Token::Eof => break,
                Token::Colon | Token::Comparator(_) | Token::Whitespace => {},
                Token::Ident(v) => value = Some(v),
                Token::Number(n) => value = Some(Cow::Owned(format!("{}", n.value))),
                Token::Dimension(n, unit) => value = Some(Cow::Owned(format!("{}{unit}", n.value))),
                _ => {},
            }
        }
        MediaFeature { name, value }
    }

    fn consume_supports_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        self.tokenizer.set_mode(Mode::Data);
        let condition = self.parse_supports_or();
        self.skip_insignificant();
        match self.next_token() {
            Token::CurlyBracketOpen => {},
            Token::Eof => return None,
            other => {
                self.report(ErrorCode::InvalidToken);
                self.reconsume(other);
                self.tokenizer.skip_unknown_rule();
                return None;
            },
        }
        let id = self.stylesheet.insert(
            Rule::Supports(SupportsRule {
                condition,
                rules: vec![],
            }),
            parent,
        );
        let children = self.consume_list_of_rules(false, Some(id));
        if let Rule::Supports(rule) = self.stylesheet.rule_mut(id) {
            rule.rules = children;
        }
        Some(id)
    }

    fn parse_supports_or(&mut self) -> Condition<'a> {
        let mut terms = vec![self.parse_supports_and()];
        loop {
            self.skip_insignificant();
            match self.peek_token() {
                Token::Ident(word) if word.eq_ignore_ascii_case("or") => {
                    self.next_token();
                    self.skip_insignificant();
                    terms.push(self.parse_supports_and());
                },
                _ => break,
            }
        }
        if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            Condition::Or(terms)
        }
    }

    fn parse_supports_and(&mut self) -> Condition<'a> {
        let mut terms = vec![self.parse_supports_unary()];
        loop {
            self.skip_insignificant();
            match self.peek_token() {
                Token::Ident(word) if word.eq_ignore_ascii_case("and") => {
                    self.next_token();
                    self.skip_insignificant();
                    terms.push(self.parse_supports_unary());
                },
                _ => break,
            }
        }
        if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            Condition::And(terms)
        }
    }

    fn parse_supports_unary(&mut self) -> Condition<'a> {
        self.skip_insignificant();
        match self.peek_token() {
            Token::Ident(word) if word.eq_ignore_ascii_case("not") => {
                self.next_token();
                self.skip_insignificant();
                Condition::Not(Box::new(self.parse_supports_unary()))
            },
            Token::RoundBracketOpen => {
                self.next_token();
                self.skip_insignificant();
                if matches!(self.peek_token(), Token::RoundBracketOpen) {
                    let inner = self.parse_supports_or();
                    self.skip_insignificant();
                    if let Token::RoundBracketClose = self.next_token() {
                    } else {
                        self.report(ErrorCode::InvalidToken);
                    }
                    return inner;
                }
                let name = match self.next_token() {
                    Token::Ident(n) => n,
                    other => {
                        self.reconsume(other);
                        Cow::Borrowed("")
                    },
                };
                self.skip_insignificant();
                if !matches!(self.next_token(), Token::Colon) {
                    self.report(ErrorCode::ColonMissing);
                }
                self.skip_insignificant();
                let mut builder = ValueBuilder::new();
                loop {
                    match self.next_token() {
                        Token::RoundBracketClose | Token::Eof => break,
                        other => builder.apply(&other),
                    }
                }
                let parsed = builder.result();
                let value = Cow::Owned(format!("{parsed:?}"));
                let supported = match self.factory.create(&name) {
                    Some(mut property) => property.try_set_value(parsed),
                    None => false,
                };
                Condition::Feature { name, value, supported }
            },
            _ => Condition::Feature {
                name: Cow::Borrowed(""),
                value: Cow::Borrowed(""),
                supported: false,
            },
        }
    }

    fn consume_document_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        let (functions, has_block) = self.parse_document_functions();
        if !has_block {
            self.report(ErrorCode::InvalidToken);
            self.tokenizer.skip_unknown_rule();
            return None;
        }
        let id = self.stylesheet.insert(
            Rule::Document(DocumentRule {
                functions,
                rules: vec![],
            }),
            parent,
        );
        let children = self.consume_list_of_rules(false, Some(id));
        if let Rule::Document(rule) = self.stylesheet.rule_mut(id) {
            rule.rules = children;
        }
        Some(id)
    }

    fn parse_document_functions(&mut self) -> (Vec<DocumentFunction<'a>>, bool) {
        self.tokenizer.set_mode(Mode::Data);
        let mut functions = Vec::new();
        let mut has_block = false;
        loop {
            match self.next_token() {
                Token::Eof => break,
                Token::Semicolon => break,
                Token::CurlyBracketOpen => {
                    has_block = true;
                    break;
                },
                Token::Whitespace | Token::Comment | Token::Comma => continue,
                Token::Function(name) => {
                    let lower = name.to_ascii_lowercase();
                    let argument = self.read_function_argument_as_text();
                    let function = match lower.as_str() {
                        "url" => DocumentFunction::Url(argument),
                        "url-prefix" => DocumentFunction::UrlPrefix(argument),
                        "domain" => DocumentFunction::Domain(argument),
                        "regexp" => DocumentFunction::Regexp(argument),
                        _ => continue,
                    };
                    functions.push(function);
                },
                _ => {},
            }
        }
        (functions, has_block)
    }

    fn read_function_argument_as_text(&mut self) -> Cow<'a, str> {
        match self.next_token() {
            Token::String(s) | Token::Ident(s) => {
                if !matches!(self.next_token(), Token::RoundBracketClose) {
                    self.tokenizer.jump_to_closed_arguments();
                }
                s
            },
            other => {
                self.reconsume(other);
                self.tokenizer.jump_to_closed_arguments();
                Cow::Borrowed("")
            },
        }
    }

    fn consume_page_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        self.tokenizer.set_mode(Mode::Selector);
        let mut selector_text = String::new();
        loop {
            match self.next_token() {
                Token::Whitespace => {
                    if !selector_text.is_empty() {
                        selector_text.push(' ');
                    }
                },
                Token::CurlyBracketOpen => break,
                Token::Eof => return None,
                Token::Ident(s) => selector_text.push_str(&s),
                Token::Colon => selector_text.push(':'),
                _ => {},
            }
        }
        self.tokenizer.set_mode(Mode::Data);
        let body = self.consume_declaration_block();
        let selector = (!selector_text.trim().is_empty()).then(|| Cow::Owned(selector_text));
        Some(
            self.stylesheet
                .insert(Rule::Page(PageRule { selector, body }), parent),
        )
    }

    fn consume_font_face_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        self.tokenizer.set_mode(Mode::Data);
        loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment => continue,
                Token::CurlyBracketOpen => break,
                Token::Eof => return None,
                _ => {},
            }
        }
        let body = self.consume_declaration_block();
        Some(self.stylesheet.insert(Rule::FontFace(FontFaceRule { body }), parent))
    }

    fn consume_keyframes_rule(&mut self, parent: Option<RuleId>) -> Option<RuleId> {
        self.tokenizer.set_mode(Mode::Data);
        self.skip_insignificant();
        let name = match self.next_token() {
            Token::Ident(n) => n,
            other => {
                self.report(ErrorCode::IdentExpected);
                self.reconsume(other);
                self.tokenizer.skip_unknown_rule();
                return None;
            },
        };
        self.skip_insignificant();
        match self.next_token() {
            Token::CurlyBracketOpen => {},
            other => {
                self.report(ErrorCode::InvalidToken);
                self.reconsume(other);
                self.tokenizer.skip_unknown_rule();
                return None;
            },
        }

        let id = self.stylesheet.insert(
            Rule::Keyframes(KeyframesRule {
                name,
                keyframes: vec![],
            }),
            parent,
        );
        let mut children = Vec::new();
        loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment | Token::Semicolon => continue,
                Token::CurlyBracketClose | Token::Eof => break,
                other => {
                    self.reconsume(other);
                    if let Some(child) = self.consume_keyframe_rule(id) {
                        children.push(child);
                    }
                },
            }
        }
        if let Rule::Keyframes(rule) = self.stylesheet.rule_mut(id) {
            rule.keyframes = children;
        }
        Some(id)
    }

    fn consume_keyframe_rule(&mut self, parent: RuleId) -> Option<RuleId> {
        self.tokenizer.set_mode(Mode::Data);
        let mut selectors = Vec::new();
        loop {
            match self.next_token() {
                Token::Whitespace | Token::Comment | Token::Comma => continue,
                Token::CurlyBracketOpen => break,
                Token::Eof => return None,
                Token::Ident(word) if word.eq_ignore_ascii_case("from") => {
                    selectors.push(KeyframeSelector::From);
                },
                Token::Ident(word) if word.eq_ignore_ascii_case("to") => {
                    selectors.push(KeyframeSelector::To);
                },
                Token::Percentage(n) => selectors.push(KeyframeSelector::Percentage(n.value)),
                _ => {
                    self.report(ErrorCode::InvalidSelector);
                    self.tokenizer.skip_unknown_rule();
                    return None;
                },
            }
        }
        let body = self.consume_declaration_block();
        Some(
            self.stylesheet
                .insert(Rule::Keyframe(KeyframeRule { selectors, body }), Some(parent)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::NullPropertyFactory;

    fn parse(source: &str) -> Stylesheet<'_> {
        RuleParser::new(SourceText::new(source), Configuration::default(), &NullPropertyFactory).parse()
    }

    #[test]
    fn parses_single_style_rule() {
        let sheet = parse("div { color: red; }");
        assert_eq!(sheet.top_level().len(), 1);
        let Rule::Style(rule) = sheet.rule(sheet.top_level()[0]) else {
            panic!("expected style rule")
        };
        assert_eq!(rule.selectors.len(), 1);
    }

    #[test]
    fn unknown_declaration_name_is_kept_as_opaque_property() {
        let sheet = parse("div { bogus-property: 1; }");
        let Rule::Style(rule) = sheet.rule(sheet.top_level()[0]) else {
            panic!("expected style rule")
        };
        assert_eq!(rule.body.declarations.len(), 1);
        assert_eq!(rule.body.get("bogus-property").unwrap().name, "bogus-property");
    }

    #[test]
    fn parses_media_rule_with_nested_style_rule() {
        let sheet = parse("@media screen and (min-width: 400px) { div { } }");
        let Rule::Media(rule) = sheet.rule(sheet.top_level()[0]) else {
            panic!("expected media rule")
        };
        assert_eq!(rule.media.len(), 1);
        assert_eq!(rule.media[0].media_type.as_deref(), Some("screen"));
        assert_eq!(rule.media[0].features.len(), 1);
        assert_eq!(rule.rules.len(), 1);
    }

    #[test]
    fn parses_supports_and_or_not() {
        let sheet = parse("@supports (display: grid) and (not (display: flex)) { }");
        let Rule::Supports(rule) = sheet.rule(sheet.top_level()[0]) else {
            panic!("expected supports rule")
        };
        assert!(matches!(rule.condition, Condition::And(_)));
    }

    #[test]
    fn parses_keyframes_rule() {
        let sheet = parse("@keyframes spin { from { } 50% { } to { } }");
        let Rule::Keyframes(rule) = sheet.rule(sheet.top_level()[0]) else {
            panic!("expected keyframes rule")
        };
        assert_eq!(rule.keyframes.len(), 3);
    }

    #[test]
    fn parses_charset_rule() {
        let sheet = parse("@charset \"utf-8\";");
        let Rule::Charset(rule) = sheet.rule(sheet.top_level()[0]) else {
            panic!("expected charset rule")
        };
        assert_eq!(rule.encoding, "utf-8");
    }

    #[test]
    fn unknown_at_rule_is_kept_and_block_skipped() {
        let sheet = parse("@weird foo bar { anything goes here } div {}");
        assert_eq!(sheet.top_level().len(), 2);
        assert!(matches!(sheet.rule(sheet.top_level()[0]), Rule::UnknownAt(_)));
        assert!(matches!(sheet.rule(sheet.top_level()[1]), Rule::Style(_)));
    }

    #[test]
    fn invalid_block_start_is_recovered() {
        let sheet = parse("{ this is garbage } div { }");
        // the stray '{' at top level starts a qualified rule with no selector tokens before it;
        // recovery should still pick up the following rule.
        assert!(sheet.top_level().iter().any(|id| matches!(sheet.rule(*id), Rule::Style(_))));
    }

    #[test]
    fn parser_state_roundtrips() {
        let mut parser =
            RuleParser::new(SourceText::new("a b"), Configuration::default(), &NullPropertyFactory);
        let before = parser.state();
        parser.next_token();
        parser.next_token();
        parser.set_state(before);
        assert_eq!(parser.next_token(), Token::Ident("a".into()));
    }
}
