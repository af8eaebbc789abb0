//! Parser configuration: the default encoding hint, registered error listeners, and feature
//! toggles (spec §6.1).

use crate::error::{CssParseError, ErrorListener, LoggingErrorListener};

/// Carries everything the parser needs from its embedder besides the source text itself.
///
/// Cloning a `Configuration` is cheap (the listener list is reference-counted); this matters
/// because the rule parser hands a `&Configuration` down through every reader without needing
/// to thread a lifetime-bound borrow through async boundaries.
#[derive(Clone)]
pub struct Configuration {
    listeners: std::sync::Arc<Vec<Box<dyn ErrorListener + Send + Sync>>>,
    default_encoding: std::sync::Arc<str>,
    keep_invalid_selectors: bool,
}

impl Configuration {
    /// Report one error to every registered listener, in registration order.
    pub(crate) fn report(&self, error: CssParseError) {
        for listener in self.listeners.iter() {
            listener.on_error(error);
        }
    }

    /// The encoding name the embedder told us it used to decode the source, purely for
    /// diagnostics — this crate never decodes bytes itself.
    pub fn default_encoding(&self) -> &str {
        &self.default_encoding
    }

    /// Whether a `StyleRule` whose selector constructor reported [`is_valid ==
    /// false`](crate::selectors::SelectorConstructor::is_valid) but still produced a non-null
    /// result should be kept (resolves the spec §9 Open Question; defaults to `true`, the
    /// browser-compatible choice).
    pub fn keep_invalid_selectors(&self) -> bool {
        self.keep_invalid_selectors
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            listeners: std::sync::Arc::new(vec![Box::new(LoggingErrorListener)]),
            default_encoding: std::sync::Arc::from("utf-8"),
            keep_invalid_selectors: true,
        }
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("listener_count", &self.listeners.len())
            .field("default_encoding", &self.default_encoding)
            .field("keep_invalid_selectors", &self.keep_invalid_selectors)
            .finish()
    }
}

/// Builds a [Configuration]. Most callers only ever need [Configuration::default].
#[derive(Default)]
pub struct ConfigurationBuilder {
    listeners: Vec<Box<dyn ErrorListener + Send + Sync>>,
    default_encoding: Option<String>,
    keep_invalid_selectors: Option<bool>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: impl ErrorListener + Send + Sync + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn with_default_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.default_encoding = Some(encoding.into());
        self
    }

    pub fn keep_invalid_selectors(mut self, keep: bool) -> Self {
        self.keep_invalid_selectors = Some(keep);
        self
    }

    pub fn build(self) -> Configuration {
        let defaults = Configuration::default();
        let listeners = if self.listeners.is_empty() {
            defaults.listeners
        } else {
            std::sync::Arc::new(self.listeners)
        };
        Configuration {
            listeners,
            default_encoding: self
                .default_encoding
                .map(std::sync::Arc::from)
                .unwrap_or(defaults.default_encoding),
            keep_invalid_selectors: self
                .keep_invalid_selectors
                .unwrap_or(defaults.keep_invalid_selectors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CollectingListener(Arc<Mutex<Vec<CssParseError>>>);

    impl ErrorListener for CollectingListener {
        fn on_error(&self, error: CssParseError) {
            self.0.lock().unwrap().push(error);
        }
    }

    #[test]
    fn default_config_keeps_invalid_selectors() {
        let config = Configuration::default();
        assert!(config.keep_invalid_selectors());
        assert_eq!(config.default_encoding(), "utf-8");
    }

    #[test]
    fn builder_reports_to_custom_listener() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = ConfigurationBuilder::new()
            .with_listener(CollectingListener(seen.clone()))
            .keep_invalid_selectors(false)
            .build();

        assert!(!config.keep_invalid_selectors());

        let error = CssParseError::new(ErrorCode::ValueMissing, Default::default());
        config.report(error);
        assert_eq!(seen.lock().unwrap().as_slice(), &[error]);
    }
}
