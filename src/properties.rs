//! The property factory boundary (spec §6.1): how this crate asks an embedder to interpret a
//! declaration's value, without knowing anything about concrete CSS properties itself.
//!
//! Adapted from `mozilla-servo-rust-cssparser`'s `DeclarationParser` trait — that trait is a
//! compile-time associated-type parameter of a generic `Parser`; here the factory is instead a
//! trait object handed to the driver at construction time, since embedders plug in their own
//! property tables at runtime rather than monomorphizing a parser per table.

use crate::values::Value;

/// Accepts a parsed value for one property, or rejects it.
///
/// Implementations normally correspond to one concrete CSS property (`color`, `display`, ...)
/// and validate the value's shape before storing it.
pub trait Property {
    /// Attempt to adopt `value` as this property's value. Returning `false` means the value was
    /// rejected — rule parsing treats the declaration as invalid and discards it, the same as an
    /// [PropertyFactory::create] miss.
    fn try_set_value(&mut self, value: Value<'_>) -> bool;

    /// Whether this declaration carried a trailing `!important`.
    fn set_important(&mut self, important: bool);
}

/// Looks up a [Property] implementation by name.
///
/// An embedder that only cares about a handful of properties can return `None` for everything
/// else; the rule parser then wraps the raw value in an [UnknownProperty] rather than dropping
/// the declaration, so unknown-name properties still round-trip.
pub trait PropertyFactory {
    fn create(&self, name: &str) -> Option<Box<dyn Property>>;
}

/// A [PropertyFactory] that recognizes nothing. Useful for callers who only want the AST shape
/// (selectors, at-rule structure) and don't care about declaration values at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPropertyFactory;

impl PropertyFactory for NullPropertyFactory {
    fn create(&self, _name: &str) -> Option<Box<dyn Property>> {
        None
    }
}

/// A fallback [Property] that records whatever raw value it was given without interpreting it.
/// Grounded on `DeclarationParser::parse_value`'s permissive "store whatever validated" shape.
#[derive(Debug, Default)]
pub struct UnknownProperty {
    value: Option<Vec<String>>,
    important: bool,
}

impl UnknownProperty {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn important(&self) -> bool {
        self.important
    }

    pub fn raw_value(&self) -> Option<&[String]> {
        self.value.as_deref()
    }
}

impl Property for UnknownProperty {
    fn try_set_value(&mut self, value: Value<'_>) -> bool {
        self.value = Some(
            value
                .components
                .iter()
                .map(|component| format!("{component:?}"))
                .collect(),
        );
        true
    }

    fn set_important(&mut self, important: bool) {
        self.important = important;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::ComponentValue;

    #[test]
    fn null_factory_creates_nothing() {
        assert!(NullPropertyFactory.create("color").is_none());
    }

    #[test]
    fn unknown_property_records_raw_value() {
        let mut property = UnknownProperty::new();
        let value = Value {
            components: vec![ComponentValue::Ident("red".into())],
        };
        assert!(property.try_set_value(value));
        property.set_important(true);
        assert!(property.important());
        assert_eq!(property.raw_value().unwrap().len(), 1);
    }
}
