//! Per-language engine selection.

use std::collections::HashMap;
use std::sync::Arc;

use tokserve_core::{
    BoxFuture, ProcessingError, ProcessingResult, Processor, ProcessorOutput, SharedProcessor,
};
use tracing::trace;

use crate::tokenizer::{RuleTokenizer, TokenizerOptions};

/// Routes each request to the engine registered for its language.
///
/// Lookup order for a tag such as `en_US`:
/// 1. the normalized tag (`en-us`),
/// 2. its primary subtag (`en`),
/// 3. the fallback engine, if one is set.
#[derive(Default)]
pub struct LanguageRouter {
    routes: HashMap<String, SharedProcessor>,
    fallback: Option<SharedProcessor>,
}

impl LanguageRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router serving `languages` with one shared rule tokenizer.
    pub fn rule_based<I, S>(languages: I, options: TokenizerOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_tokenizer(languages, RuleTokenizer::new(options))
    }

    /// Creates a router serving `languages` with `tokenizer`.
    pub fn with_tokenizer<I, S>(languages: I, tokenizer: RuleTokenizer) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokenizer: SharedProcessor = Arc::new(tokenizer);
        languages
            .into_iter()
            .fold(Self::new(), |router, tag| {
                router.with_language(tag.as_ref(), tokenizer.clone())
            })
    }

    /// Builder: register an engine for a language tag.
    pub fn with_language(mut self, tag: &str, processor: SharedProcessor) -> Self {
        self.register(tag, processor);
        self
    }

    /// Builder: set the engine used when no language matches.
    pub fn with_fallback(mut self, processor: SharedProcessor) -> Self {
        self.fallback = Some(processor);
        self
    }

    /// Registers an engine for a language tag, replacing any previous one.
    pub fn register(&mut self, tag: &str, processor: SharedProcessor) {
        self.routes.insert(normalize_tag(tag), processor);
    }

    /// Finds the engine for a language tag.
    pub fn resolve(&self, tag: &str) -> Option<&SharedProcessor> {
        let normalized = normalize_tag(tag);
        if normalized.is_empty() {
            return self.fallback.as_ref();
        }
        self.routes
            .get(&normalized)
            .or_else(|| {
                normalized
                    .split_once('-')
                    .and_then(|(primary, _)| self.routes.get(primary))
            })
            .or(self.fallback.as_ref())
    }

    /// Registered language tags, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl Processor for LanguageRouter {
    fn name(&self) -> &str {
        "language-router"
    }

    fn process<'a>(
        &'a self,
        language_tag: &'a str,
        utterance: &'a str,
    ) -> BoxFuture<'a, ProcessingResult<ProcessorOutput>> {
        Box::pin(async move {
            let engine = self
                .resolve(language_tag)
                .ok_or_else(|| ProcessingError::UnsupportedLanguage(language_tag.to_string()))?;
            trace!(language = language_tag, engine = engine.name(), "Routing utterance");
            engine.process(language_tag, utterance).await
        })
    }
}

/// Normalizes a language tag: trimmed, `_` replaced by `-`, lowercase.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}
