//! Built-in utterance processors.
//!
//! - [`RuleTokenizer`]: a rule-based tokenizer usable for most
//!   space-delimited languages.
//! - [`EntityTagger`]: optional entity tags (numbers, dates, configured
//!   `TAG:regex` patterns) attached to the tokenizer output.
//! - [`LanguageRouter`]: picks an engine per language tag and reports
//!   unknown languages as [`ProcessingError::UnsupportedLanguage`].
//!
//! Both implement [`Processor`] and can be handed to the server directly.
//!
//! [`ProcessingError::UnsupportedLanguage`]: tokserve_core::ProcessingError::UnsupportedLanguage
//! [`Processor`]: tokserve_core::Processor

mod entities;
mod router;
mod tokenizer;

pub use entities::{DATE, EntityPattern, EntityPatternError, EntityTagger, NUMBER, OTHER, TaggedTokens};
pub use router::{LanguageRouter, normalize_tag};
pub use tokenizer::{RuleTokenizer, TokenizerOptions};

/// Languages served by the rule tokenizer unless configured otherwise.
pub const DEFAULT_LANGUAGES: &[&str] = &["en", "de", "es", "fr", "it"];
