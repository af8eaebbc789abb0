//! A streaming, error-tolerant CSS parser implementing the W3C CSS Syntax Level 3 algorithm,
//! adapted for browser-grade permissiveness: unknown tokens are skipped, malformed rules are
//! dropped at their recovery boundary, and parsing never panics on user input.
//!
//! The hard engineering lives in three tightly coupled subsystems:
//!
//! 1. A mode-switching [tokenizer] whose lexical grammar depends on the parser's current
//!    syntactic context (data vs. selector vs. value).
//! 2. A recursive-descent [rule_parser] that assembles at-rules, style rules, nested groupings,
//!    and declarations, with per-construct error recovery.
//! 3. Two dedicated AST assemblers, [selectors] and [values], that consume tokens incrementally
//!    and expose "ready" signals so the rule parser can decide where a construct ends.
//!
//! Deliberately out of scope: the HTML/DOM tree, HTTP/URL fetch, text decoding and encoding
//! detection, selector semantic matching, media-query evaluation against a real device, and
//! style computation (cascade, specificity, rendering).
//!
//! This crate never decodes bytes itself; by the time a [source::SourceText] exists the caller
//! has already produced a `&str`.

pub mod config;
pub mod driver;
pub mod error;
pub mod properties;
pub mod rule_parser;
pub mod selectors;
pub mod source;
pub mod tokenizer;
pub mod tree;
pub mod values;

use config::Configuration;
use error::SyntaxError;
use properties::{NullPropertyFactory, Property, PropertyFactory};
use rule_parser::RuleParser;
use selectors::ComplexSelector;
use source::{CancellationFlag, Cancelled, SourceText};
use std::sync::Arc;
use tree::{Condition, CssMedium, DeclarationBlock, DocumentFunction, KeyframeRule, KeyframeSelector, Rule, Stylesheet};
use values::Value;

/// Parse a full stylesheet synchronously.
pub fn parse_stylesheet<'a>(
    source: &'a str,
    config: Configuration,
    factory: &dyn PropertyFactory,
) -> Stylesheet<'a> {
    RuleParser::new(SourceText::new(source), config, factory).parse()
}

/// Parse a full stylesheet from an async context, observing `cancel` once before parsing starts.
pub async fn parse_stylesheet_async<'a>(
    source: &'a str,
    config: Configuration,
    factory: &dyn PropertyFactory,
    cancel: &CancellationFlag,
) -> Result<Stylesheet<'a>, Cancelled> {
    let text = SourceText::new(source);
    text.prefetch_all(cancel).await?;
    Ok(RuleParser::new(text, config, factory).parse())
}

/// Parse `text` as a single complex selector. Returns `None` if it never becomes valid.
pub fn parse_selector(text: &str) -> Option<ComplexSelector<'_>> {
    RuleParser::new(SourceText::new(text), Configuration::default(), &NullPropertyFactory).parse_selector_only()
}

/// Parse `text` as a single value.
pub fn parse_value(text: &str) -> Option<Value<'_>> {
    RuleParser::new(SourceText::new(text), Configuration::default(), &NullPropertyFactory).parse_value_only()
}

/// Parse `text` as a single rule, at-rule or qualified.
pub fn parse_rule<'a>(text: &'a str, config: Configuration, factory: &dyn PropertyFactory) -> Option<Rule<'a>> {
    RuleParser::new(SourceText::new(text), config, factory).parse_one_rule()
}

/// Parse `text` as a single declaration, returning the interpreted [Property] the configured
/// [PropertyFactory] produced for it.
pub fn parse_declaration(text: &str, config: Configuration, factory: &dyn PropertyFactory) -> Option<Box<dyn Property>> {
    RuleParser::new(SourceText::new(text), config, factory).parse_one_property()
}

/// Parse `text` as a declaration list with no surrounding braces (e.g. an inline `style`
/// attribute's contents).
pub fn parse_declarations<'a>(text: &'a str, config: Configuration, factory: &dyn PropertyFactory) -> DeclarationBlock<'a> {
    RuleParser::new(SourceText::new(text), config, factory).parse_many_declarations()
}

/// Parse `text` as a comma-separated media query list. Fails with [SyntaxError] if the text does
/// not parse cleanly or leftover tokens remain.
pub fn parse_media_list(text: &str, config: Configuration) -> Result<Vec<CssMedium<'_>>, SyntaxError> {
    RuleParser::new(SourceText::new(text), config, &NullPropertyFactory).parse_media_list_strict()
}

/// Parse `text` as exactly one medium. Fails with [SyntaxError] on leftover tokens or more than
/// one comma-separated medium.
pub fn parse_medium(text: &str, config: Configuration) -> Result<CssMedium<'_>, SyntaxError> {
    RuleParser::new(SourceText::new(text), config, &NullPropertyFactory).parse_medium_strict()
}

/// Parse `text` as an `@supports` condition.
pub fn parse_condition(text: &str, config: Configuration) -> Option<Condition<'_>> {
    RuleParser::new(SourceText::new(text), config, &NullPropertyFactory).parse_condition_only()
}

/// Parse `text` as an `@document` function list.
pub fn parse_document_rules(text: &str, config: Configuration) -> Option<Vec<DocumentFunction<'_>>> {
    RuleParser::new(SourceText::new(text), config, &NullPropertyFactory).parse_document_rules_only()
}

/// Parse `text` as one `@keyframes` keyframe selector entry (`from`, `to`, or a percentage).
pub fn parse_keyframe_selector(text: &str, config: Configuration) -> Option<KeyframeSelector> {
    RuleParser::new(SourceText::new(text), config, &NullPropertyFactory).parse_keyframe_selector_only()
}

/// Parse `text` as one full keyframe rule, selector list plus declaration body.
pub fn parse_keyframe_rule<'a>(text: &'a str, config: Configuration, factory: &dyn PropertyFactory) -> Option<KeyframeRule<'a>> {
    RuleParser::new(SourceText::new(text), config, factory).parse_keyframe_rule_only()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::tree::Rule as TreeRule;

    #[test]
    fn parse_stylesheet_never_panics_on_garbage() {
        let inputs = ["", "{", "}", "@", "div {", "a { color", "/* unterminated"];
        for input in inputs {
            let sheet = parse_stylesheet(input, Configuration::default(), &NullPropertyFactory);
            let _ = sheet.len();
        }
    }

    #[test]
    fn parse_selector_roundtrips_simple_case() {
        let selector = parse_selector("div.foo").unwrap();
        assert_eq!(selector.first.simple_selectors.len(), 2);
    }

    #[test]
    fn parse_rule_recognizes_at_rule() {
        let rule = parse_rule("@charset \"utf-8\";", Configuration::default(), &NullPropertyFactory).unwrap();
        assert!(matches!(rule, TreeRule::Charset(_)));
    }

    #[test]
    fn parse_media_list_is_strict_about_leftovers() {
        assert!(parse_media_list("screen, print", Configuration::default()).is_ok());
        assert!(parse_media_list("screen; garbage", Configuration::default()).is_err());
    }

    #[test]
    fn parse_declarations_collects_multiple_entries() {
        let block = parse_declarations("color: red; bogus: 1; display: block", Configuration::default(), &NullPropertyFactory);
        // the null factory recognizes nothing, but unknown-name declarations are kept as opaque
        // properties rather than dropped.
        assert_eq!(block.declarations.len(), 3);
    }

    #[test]
    fn stylesheet_parser_shares_one_parse() {
        let parser = driver::StylesheetParser::without_properties(
            SourceText::new("a {} b {}"),
            Configuration::default(),
        );
        let first: Arc<Stylesheet<'_>> = parser.parse();
        assert_eq!(first.top_level().len(), 2);
    }
}
