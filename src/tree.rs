//! The stylesheet AST (spec §3.2): a `Stylesheet` owning an arena of rules, where each rule
//! knows its parent by index rather than by `Rc`/`Weak` pointer. The tree is append-only and
//! owned by exactly one `Stylesheet` for the lifetime of a parse, so a plain index is sufficient
//! and avoids the reference-counting the reference engine's GC-adjacent code reaches for when
//! ownership is actually shared.

use crate::selectors::ComplexSelector;
use crate::values::Value;
use std::borrow::Cow;

/// An index into a [Stylesheet]'s rule arena. Stable for the lifetime of the stylesheet it came
/// from; never valid across two different `Stylesheet`s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleId(usize);

/// A property name/value pair inside a [DeclarationBlock].
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration<'a> {
    pub name: Cow<'a, str>,
    pub value: Value<'a>,
    pub important: bool,
}

/// The body of a style rule or `@page`/`@font-face`/keyframe rule: an ordered list of
/// declarations where a later declaration with the same name replaces an earlier one, matching
/// the CSS last-write-wins rule.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeclarationBlock<'a> {
    pub declarations: Vec<Declaration<'a>>,
}

impl<'a> DeclarationBlock<'a> {
    /// Append `declaration`, first removing any existing declaration with the same name
    /// (case-insensitively) so a duplicate property name replaces rather than shadows.
    pub fn push(&mut self, declaration: Declaration<'a>) {
        self.declarations
            .retain(|existing| !existing.name.eq_ignore_ascii_case(&declaration.name));
        self.declarations.push(declaration);
    }

    pub fn get(&self, name: &str) -> Option<&Declaration<'a>> {
        self.declarations
            .iter()
            .find(|declaration| declaration.name.eq_ignore_ascii_case(name))
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StyleRule<'a> {
    pub selectors: Vec<ComplexSelector<'a>>,
    pub body: DeclarationBlock<'a>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CharsetRule<'a> {
    pub encoding: Cow<'a, str>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportRule<'a> {
    pub url: Cow<'a, str>,
    pub media: Vec<CssMedium<'a>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamespaceRule<'a> {
    pub prefix: Option<Cow<'a, str>>,
    pub url: Cow<'a, str>,
}

/// One entry of a comma-separated media query list (`screen and (min-width: 400px)`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CssMedium<'a> {
    pub negated: bool,
    pub only: bool,
    pub media_type: Option<Cow<'a, str>>,
    pub features: Vec<MediaFeature<'a>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MediaFeature<'a> {
    pub name: Cow<'a, str>,
    pub value: Option<Cow<'a, str>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MediaRule<'a> {
    pub media: Vec<CssMedium<'a>>,
    pub rules: Vec<RuleId>,
}

/// An `@supports` feature test or boolean combination thereof.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition<'a> {
    /// A `(name: value)` declaration condition. `supported` reflects whether the property
    /// factory recognized `name` and accepted `value` for it, the same check performed while
    /// reading an ordinary declaration — the condition itself is never stored in a block.
    Feature {
        name: Cow<'a, str>,
        value: Cow<'a, str>,
        supported: bool,
    },
    Not(Box<Condition<'a>>),
    And(Vec<Condition<'a>>),
    Or(Vec<Condition<'a>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SupportsRule<'a> {
    pub condition: Condition<'a>,
    pub rules: Vec<RuleId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DocumentFunction<'a> {
    Url(Cow<'a, str>),
    UrlPrefix(Cow<'a, str>),
    Domain(Cow<'a, str>),
    Regexp(Cow<'a, str>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentRule<'a> {
    pub functions: Vec<DocumentFunction<'a>>,
    pub rules: Vec<RuleId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageRule<'a> {
    pub selector: Option<Cow<'a, str>>,
    pub body: DeclarationBlock<'a>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FontFaceRule<'a> {
    pub body: DeclarationBlock<'a>,
}

/// `from`, `to`, or a percentage, as used by one entry of a `@keyframes` rule's selector list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyframeSelector {
    From,
    To,
    Percentage(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeRule<'a> {
    pub selectors: Vec<KeyframeSelector>,
    pub body: DeclarationBlock<'a>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyframesRule<'a> {
    pub name: Cow<'a, str>,
    pub keyframes: Vec<RuleId>,
}

/// An at-rule whose name this crate does not recognize. Kept so that an unrecognized (but
/// grammatically valid) at-rule still round-trips into the tree rather than vanishing — the
/// spec's error recovery drops only the tokens it must skip to resynchronize, not the fact that
/// something was there.
#[derive(Clone, Debug, PartialEq)]
pub struct UnknownAtRule<'a> {
    pub name: Cow<'a, str>,
    pub prelude: Value<'a>,
    pub has_block: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Rule<'a> {
    Style(StyleRule<'a>),
    Charset(CharsetRule<'a>),
    Import(ImportRule<'a>),
    Namespace(NamespaceRule<'a>),
    Media(MediaRule<'a>),
    Supports(SupportsRule<'a>),
    Document(DocumentRule<'a>),
    Page(PageRule<'a>),
    FontFace(FontFaceRule<'a>),
    Keyframes(KeyframesRule<'a>),
    Keyframe(KeyframeRule<'a>),
    UnknownAt(UnknownAtRule<'a>),
}

struct RuleNode<'a> {
    parent: Option<RuleId>,
    rule: Rule<'a>,
}

/// The parsed stylesheet: an arena of rules plus the indices of the ones that sit at the top
/// level (not nested inside a grouping rule).
#[derive(Default)]
pub struct Stylesheet<'a> {
    arena: Vec<RuleNode<'a>>,
    top_level: Vec<RuleId>,
}

impl<'a> Stylesheet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule as a child of `parent` (or at the top level if `None`). Returns the new
    /// rule's id.
    pub fn insert(&mut self, rule: Rule<'a>, parent: Option<RuleId>) -> RuleId {
        let id = RuleId(self.arena.len());
        self.arena.push(RuleNode { parent, rule });
        if parent.is_none() {
            self.top_level.push(id);
        }
        id
    }

    pub fn rule(&self, id: RuleId) -> &Rule<'a> {
        &self.arena[id.0].rule
    }

    pub fn rule_mut(&mut self, id: RuleId) -> &mut Rule<'a> {
        &mut self.arena[id.0].rule
    }

    pub fn parent(&self, id: RuleId) -> Option<RuleId> {
        self.arena[id.0].parent
    }

    pub fn top_level(&self) -> &[RuleId] {
        &self.top_level
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_tracks_top_level_and_nested() {
        let mut sheet = Stylesheet::new();
        let media = sheet.insert(
            Rule::Media(MediaRule {
                media: vec![],
                rules: vec![],
            }),
            None,
        );
        let style = sheet.insert(
            Rule::Style(StyleRule {
                selectors: vec![],
                body: DeclarationBlock::default(),
            }),
            Some(media),
        );

        assert_eq!(sheet.top_level(), &[media]);
        assert_eq!(sheet.parent(style), Some(media));
        assert_eq!(sheet.parent(media), None);
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn declaration_block_last_write_wins() {
        let mut block = DeclarationBlock::default();
        block.push(Declaration {
            name: "color".into(),
            value: Value::default(),
            important: false,
        });
        block.push(Declaration {
            name: "COLOR".into(),
            value: Value::default(),
            important: true,
        });
        assert!(block.get("color").unwrap().important);
        assert_eq!(block.declarations.len(), 1);
    }
}
