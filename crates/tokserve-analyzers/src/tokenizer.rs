//! Rule-based tokenizer.
//!
//! The pipeline, applied to each utterance:
//!
//! 1. Break hyphens between letters (`Spanish-speaking` becomes two
//!    words) but leave numeric and mixed forms alone (`2012-03-28`,
//!    `1-800-GOT-MILK`).
//! 2. Separate a digit from a following letter (`5km` becomes `5 km`),
//!    except for `am`/`pm` (`3pm` stays whole).
//! 3. Split on whitespace.
//! 4. Peel leading and trailing punctuation into their own tokens,
//!    keeping abbreviations such as `U.S.` intact.
//! 5. Split numeric ranges (`3-5` becomes `3`, `-`, `5`).
//! 6. Optionally lowercase every token.
//!
//! With an [`EntityTagger`] attached, the output carries a tag for every
//! token instead of a bare token array.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokserve_core::{BoxFuture, ProcessingError, ProcessingResult, Processor, ProcessorOutput};

use crate::entities::{EntityTagger, TaggedTokens};

static NUMBER_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?[0-9]+(?:\.[0-9]+)?)-(-?[0-9]+(?:\.[0-9]+)?)$")
        .expect("Invalid number range regex")
});

const LEADING_PUNCTUATION: &[char] = &['"', '\'', '`', '(', '[', '{', '¿', '¡', '«'];
const TRAILING_PUNCTUATION: &[char] = &[
    '"', '\'', ')', ']', '}', '.', ',', ';', ':', '!', '?', '»',
];

/// Tokenizer switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerOptions {
    /// Break hyphens between letters.
    pub split_hyphens: bool,
    /// Lowercase all tokens.
    pub lowercase: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            split_hyphens: true,
            lowercase: false,
        }
    }
}

/// Rule-based tokenizer.
#[derive(Debug, Clone, Default)]
pub struct RuleTokenizer {
    options: TokenizerOptions,
    tagger: Option<EntityTagger>,
}

impl RuleTokenizer {
    /// Creates a tokenizer with the given options.
    pub fn new(options: TokenizerOptions) -> Self {
        Self {
            options,
            tagger: None,
        }
    }

    /// Builder: tag entities in the output.
    pub fn with_tagger(mut self, tagger: EntityTagger) -> Self {
        self.tagger = Some(tagger);
        self
    }

    /// Returns the options in effect.
    pub fn options(&self) -> TokenizerOptions {
        self.options
    }

    /// Splits an utterance into tokens.
    pub fn tokenize(&self, utterance: &str) -> Vec<String> {
        let text = if self.options.split_hyphens {
            break_hyphens(utterance)
        } else {
            utterance.to_string()
        };
        let text = separate_digit_letters(&text);

        let mut tokens = Vec::new();
        for chunk in text.split_whitespace() {
            split_chunk(chunk, &mut tokens);
        }

        if self.options.lowercase {
            for token in &mut tokens {
                *token = token.to_lowercase();
            }
        }
        tokens
    }

    /// Splits an utterance into tokens and tags them, if a tagger is set.
    pub fn analyze(&self, utterance: &str) -> Option<TaggedTokens> {
        let tagger = self.tagger.as_ref()?;
        Some(tagger.tag(self.tokenize(utterance)))
    }
}

impl Processor for RuleTokenizer {
    fn name(&self) -> &str {
        "rule-tokenizer"
    }

    fn process<'a>(
        &'a self,
        _language_tag: &'a str,
        utterance: &'a str,
    ) -> BoxFuture<'a, ProcessingResult<ProcessorOutput>> {
        Box::pin(async move {
            if utterance.contains('\0') {
                return Err(ProcessingError::invalid_input("utterance contains a NUL byte"));
            }
            match self.analyze(utterance) {
                Some(tagged) => Ok(tagged.into()),
                None => Ok(ProcessorOutput::tokens(self.tokenize(utterance))),
            }
        })
    }
}

/// Replaces hyphens joining two letters with spaces.
///
/// Once a hyphen is kept inside a word, later hyphens in the same word are
/// kept too, so `1-800-GOT-MILK` survives whole.
fn break_hyphens(utterance: &str) -> String {
    let mut chars: Vec<char> = utterance.chars().collect();
    let mut seen_hyphen = false;

    for i in 1..chars.len().saturating_sub(1) {
        let c = chars[i];
        if c == '-' {
            if !seen_hyphen && chars[i - 1].is_alphabetic() && chars[i + 1].is_alphabetic() {
                chars[i] = ' ';
            } else {
                seen_hyphen = true;
            }
        } else if c.is_whitespace() {
            seen_hyphen = false;
        }
    }

    chars.into_iter().collect()
}

/// Inserts a space between a digit and a following ASCII letter, unless
/// the letters start with `am` or `pm`.
fn separate_digit_letters(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match next {
            Some(letter)
                if c.is_ascii_digit()
                    && letter.is_ascii_alphabetic()
                    && !starts_with_meridiem(&chars[i + 1..]) =>
            {
                out.push(c);
                out.push(' ');
                out.push(letter);
                i += 2;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn starts_with_meridiem(chars: &[char]) -> bool {
    matches!(chars, ['a' | 'p', 'm', ..])
}

fn split_chunk(chunk: &str, tokens: &mut Vec<String>) {
    let mut core = chunk;

    while let Some(c) = core.chars().next().filter(|c| LEADING_PUNCTUATION.contains(c)) {
        tokens.push(c.to_string());
        core = &core[c.len_utf8()..];
    }

    let mut trailing = Vec::new();
    while let Some(c) = core.chars().next_back().filter(|c| TRAILING_PUNCTUATION.contains(c)) {
        if c == '.' && is_abbreviation(core) {
            break;
        }
        trailing.push(c.to_string());
        core = &core[..core.len() - c.len_utf8()];
    }

    if !core.is_empty() {
        match NUMBER_RANGE.captures(core) {
            Some(range) if core != "9-11" => {
                tokens.push(range[1].to_string());
                tokens.push("-".to_string());
                tokens.push(range[2].to_string());
            }
            _ => tokens.push(core.to_string()),
        }
    }

    tokens.extend(trailing.into_iter().rev());
}

/// `U.S.`, `e.g.`: single letters-and-dots groups ending in a dot.
fn is_abbreviation(word: &str) -> bool {
    let body = &word[..word.len() - 1];
    body.contains('.')
        && !body.ends_with('.')
        && !body.contains("..")
        && body.chars().all(|c| c.is_alphabetic() || c == '.')
}
