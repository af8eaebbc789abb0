//! The public parsing entry point (spec §6.2): a single-latch `StylesheetParser` that can be
//! driven either synchronously or from an async context without parsing twice.

use crate::config::Configuration;
use crate::properties::{NullPropertyFactory, PropertyFactory};
use crate::rule_parser::RuleParser;
use crate::source::{CancellationFlag, Cancelled, SourceText};
use crate::tree::Stylesheet;
use std::sync::{Arc, OnceLock};

/// Parses one stylesheet, at most once, regardless of how many times [Self::parse] or
/// [Self::parse_async] is called or from how many threads.
///
/// Grounded on the workspace's general preference for a small `OnceLock`-backed latch over a
/// mutex for a value that is computed once and then shared read-only: `OnceLock::get_or_init`
/// already guarantees the (non-idempotent, diagnostics-emitting) parse itself runs exactly once
/// even under concurrent callers, with every loser blocking on the winner rather than re-running
/// it or busy-waiting.
pub struct StylesheetParser<'a, 'f> {
    source: SourceText<'a>,
    config: Configuration,
    factory: &'f dyn PropertyFactory,
    result: OnceLock<Arc<Stylesheet<'a>>>,
}

impl<'a, 'f> StylesheetParser<'a, 'f> {
    pub fn new(source: SourceText<'a>, config: Configuration, factory: &'f dyn PropertyFactory) -> Self {
        Self {
            source,
            config,
            factory,
            result: OnceLock::new(),
        }
    }

    /// A parser that discards every declaration value (only the AST shape is produced), for
    /// callers that only care about selectors and rule structure.
    pub fn without_properties(source: SourceText<'a>, config: Configuration) -> StylesheetParser<'a, 'static> {
        StylesheetParser::new(source, config, &NullPropertyFactory)
    }

    /// Run the parse synchronously, or return the already-computed result if another call
    /// already ran it.
    pub fn parse(&self) -> Arc<Stylesheet<'a>> {
        self.result
            .get_or_init(|| {
                let parser = RuleParser::new(self.source, self.config.clone(), self.factory);
                Arc::new(parser.parse())
            })
            .clone()
    }

    /// Run the parse from an async context, observing `cancel` once before the synchronous parse
    /// itself begins. The parse itself is not interruptible once started, matching the spec's
    /// "cancellation is only observed before prefetch completes" rule.
    pub async fn parse_async(&self, cancel: &CancellationFlag) -> Result<Arc<Stylesheet<'a>>, Cancelled> {
        self.source.prefetch_all(cancel).await?;
        Ok(self.parse())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Rule;

    #[test]
    fn parse_is_idempotent() {
        let parser = StylesheetParser::without_properties(SourceText::new("div { color: red; }"), Configuration::default());
        let first = parser.parse();
        let second = parser.parse();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.top_level().len(), 1);
    }

    #[test]
    fn parse_async_returns_same_result_as_sync() {
        let parser = StylesheetParser::without_properties(SourceText::new("a {}"), Configuration::default());
        let cancel = CancellationFlag::new();
        let stylesheet = futures_lite_block_on(parser.parse_async(&cancel)).unwrap();
        assert_eq!(stylesheet.top_level().len(), 1);
        assert!(matches!(stylesheet.rule(stylesheet.top_level()[0]), Rule::Style(_)));
    }

    #[test]
    fn parse_async_respects_precancellation() {
        let parser = StylesheetParser::without_properties(SourceText::new("a {}"), Configuration::default());
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let result = futures_lite_block_on(parser.parse_async(&cancel));
        assert!(result.is_err());
    }

    /// A minimal, dependency-free executor for polling the single `.await` point this module's
    /// async API exposes in tests; pulling in a full async runtime for two tests isn't worth it.
    fn futures_lite_block_on<F: std::future::Future>(mut future: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        let waker = unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) };
        let mut cx = Context::from_waker(&waker);
        let mut future = unsafe { std::pin::Pin::new_unchecked(&mut future) };
        loop {
            match future.as_mut().poll(&mut cx) {
                Poll::Ready(value) => return value,
                Poll::Pending => continue,
            }
        }
    }
}
