//! Entity tagging over tokenizer output.
//!
//! Every token gets a tag, `O` when nothing matched. Numbers (including
//! both halves of a split range) are tagged `NUMBER`; four-digit years are
//! tagged `DATE` unless years are treated as numbers. Configured
//! [`EntityPattern`]s run afterwards, in order, and a later match replaces
//! an earlier tag.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tokserve_core::ProcessorOutput;

/// Tag for tokens no rule matched.
pub const OTHER: &str = "O";
/// Tag for numeric tokens.
pub const NUMBER: &str = "NUMBER";
/// Tag for year-like tokens.
pub const DATE: &str = "DATE";

static NUMBER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[0-9]+(?:\.[0-9]+)?$").expect("Invalid number regex")
});

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[12][0-9]{3}$").expect("Invalid year regex"));

/// Built-in recognizers selectable by name.
const BUILTIN_RECOGNIZERS: &[(&str, &str, &str)] = &[
    ("phone", "PHONE_NUMBER", r"\+?[0-9]{1,3}(?:[-.][0-9]{2,4}){2,4}|\([0-9]{3}\)[0-9]{3}-[0-9]{4}"),
    ("email", "EMAIL_ADDRESS", r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}"),
    ("url", "URL", r"(?:https?://|www\.)[^\s]+"),
];

/// Errors building entity patterns from configuration.
#[derive(Debug, Error)]
pub enum EntityPatternError {
    /// The pattern is not of the form `TAG:regex`.
    #[error("entity pattern {0:?} must look like TAG:regex")]
    MissingTag(String),

    /// The regex part does not compile.
    #[error("invalid regex for entity {tag}: {source}")]
    InvalidRegex {
        tag: String,
        #[source]
        source: regex::Error,
    },

    /// No built-in recognizer has this name.
    #[error("unknown entity recognizer: {0} (expected phone, email or url)")]
    UnknownRecognizer(String),
}

/// A tag assigned to every token the regex matches in full.
///
/// When the regex has a capture group, the entity value is the first
/// group (`@alice` gives `alice` for `USERNAME:[@](.+)`); otherwise it is
/// the whole token.
#[derive(Debug, Clone)]
pub struct EntityPattern {
    tag: String,
    regex: Regex,
}

impl EntityPattern {
    /// Compiles `pattern` for `tag`, anchored to whole tokens.
    pub fn new(tag: impl Into<String>, pattern: &str) -> Result<Self, EntityPatternError> {
        let tag = tag.into();
        match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(regex) => Ok(Self { tag, regex }),
            Err(source) => Err(EntityPatternError::InvalidRegex { tag, source }),
        }
    }

    /// Parses a `TAG:regex` string, splitting at the first colon.
    pub fn parse(spec: &str) -> Result<Self, EntityPatternError> {
        match spec.split_once(':') {
            Some((tag, pattern)) if !tag.trim().is_empty() => Self::new(tag.trim(), pattern),
            _ => Err(EntityPatternError::MissingTag(spec.to_string())),
        }
    }

    /// Looks up a built-in recognizer: `phone`, `email` or `url`.
    pub fn builtin(name: &str) -> Result<Self, EntityPatternError> {
        let (_, tag, pattern) = BUILTIN_RECOGNIZERS
            .iter()
            .find(|(builtin, _, _)| builtin.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| EntityPatternError::UnknownRecognizer(name.to_string()))?;
        Self::new(*tag, pattern)
    }

    /// Returns the tag this pattern assigns.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the entity value if `token` matches.
    pub fn recognize(&self, token: &str) -> Option<String> {
        let captures = self.regex.captures(token)?;
        let value = captures.get(1).or_else(|| captures.get(0))?;
        Some(value.as_str().to_string())
    }
}

/// Tokens with one tag and one optional value per token.
///
/// Serialized as `{"tokens": [...], "nerTags": [...], "nerValues": [...]}`
/// with `null` values for untagged tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedTokens {
    pub tokens: Vec<String>,
    pub ner_tags: Vec<String>,
    pub ner_values: Vec<Option<String>>,
}

impl From<TaggedTokens> for ProcessorOutput {
    fn from(tagged: TaggedTokens) -> Self {
        let mut object = Map::new();
        object.insert("tokens".into(), Value::from(tagged.tokens));
        object.insert("nerTags".into(), Value::from(tagged.ner_tags));
        object.insert("nerValues".into(), Value::from(tagged.ner_values));
        ProcessorOutput::new(Value::Object(object))
    }
}

/// Assigns entity tags to tokens.
#[derive(Debug, Clone, Default)]
pub struct EntityTagger {
    patterns: Vec<EntityPattern>,
    years_as_numbers: bool,
}

impl EntityTagger {
    /// Creates a tagger with only the number and year rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: tag four-digit years as `NUMBER` instead of `DATE`.
    pub fn with_years_as_numbers(mut self, years_as_numbers: bool) -> Self {
        self.years_as_numbers = years_as_numbers;
        self
    }

    /// Builder: add a pattern. Patterns added later win over earlier ones.
    pub fn with_pattern(mut self, pattern: EntityPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Builds a tagger from configuration: built-in recognizer names
    /// first, then `TAG:regex` strings.
    pub fn from_config<R, P>(
        recognizers: R,
        regular_expressions: P,
        years_as_numbers: bool,
    ) -> Result<Self, EntityPatternError>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut tagger = Self::new().with_years_as_numbers(years_as_numbers);
        for name in recognizers {
            tagger.patterns.push(EntityPattern::builtin(name.as_ref())?);
        }
        for spec in regular_expressions {
            tagger.patterns.push(EntityPattern::parse(spec.as_ref())?);
        }
        Ok(tagger)
    }

    /// Configured patterns, in application order.
    pub fn patterns(&self) -> &[EntityPattern] {
        &self.patterns
    }

    /// Tags every token.
    pub fn tag(&self, tokens: Vec<String>) -> TaggedTokens {
        let mut ner_tags = Vec::with_capacity(tokens.len());
        let mut ner_values = Vec::with_capacity(tokens.len());

        for token in &tokens {
            let (tag, value) = self.tag_token(token);
            ner_tags.push(tag.to_string());
            ner_values.push(value);
        }

        TaggedTokens {
            tokens,
            ner_tags,
            ner_values,
        }
    }

    fn tag_token<'a>(&'a self, token: &str) -> (&'a str, Option<String>) {
        if let Some((tag, value)) = self
            .patterns
            .iter()
            .rev()
            .find_map(|pattern| pattern.recognize(token).map(|value| (pattern.tag(), value)))
        {
            return (tag, Some(value));
        }

        if token == "911" || !NUMBER_TOKEN.is_match(token) {
            return (OTHER, None);
        }
        if YEAR_TOKEN.is_match(token) && !self.years_as_numbers {
            return (DATE, Some(token.to_string()));
        }
        (NUMBER, Some(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn tags(tagger: &EntityTagger, tokens: &[&str]) -> Vec<String> {
        tagger.tag(strings(tokens)).ner_tags
    }

    #[test]
    fn numbers_and_years() {
        let tagger = EntityTagger::new();
        assert_eq!(
            tags(&tagger, &["between", "3", "-", "5.5", "in", "2019", "911"]),
            ["O", "NUMBER", "O", "NUMBER", "O", "DATE", "O"]
        );

        let tagger = EntityTagger::new().with_years_as_numbers(true);
        assert_eq!(tags(&tagger, &["2019", "9-11"]), ["NUMBER", "O"]);
    }

    #[test]
    fn regex_patterns_use_first_group_as_value() {
        let tagger = EntityTagger::from_config(
            std::iter::empty::<&str>(),
            ["USERNAME:[@](.+)", "HASHTAG:[#](.+)"],
            false,
        )
        .unwrap();

        let tagged = tagger.tag(strings(&["ping", "@alice", "#rust", "@"]));
        assert_eq!(tagged.ner_tags, ["O", "USERNAME", "HASHTAG", "O"]);
        assert_eq!(
            tagged.ner_values,
            [None, Some("alice".into()), Some("rust".into()), None]
        );
    }

    #[test]
    fn patterns_match_whole_tokens() {
        let pattern = EntityPattern::parse("CODE:[A-Z]{3}").unwrap();
        assert_eq!(pattern.recognize("ABC"), Some("ABC".into()));
        assert_eq!(pattern.recognize("ABCD"), None);
        assert_eq!(pattern.recognize("xABC"), None);
    }

    #[test]
    fn later_patterns_win() {
        let tagger = EntityTagger::new()
            .with_pattern(EntityPattern::parse("ANY:.+").unwrap())
            .with_pattern(EntityPattern::parse("TWO:22").unwrap());
        assert_eq!(tags(&tagger, &["22", "7"]), ["TWO", "ANY"]);
    }

    #[test]
    fn builtin_recognizers() {
        let tagger = EntityTagger::from_config(
            ["phone", "email", "URL"],
            std::iter::empty::<&str>(),
            false,
        )
        .unwrap();

        assert_eq!(
            tags(
                &tagger,
                &["+1-650-555-1234", "bob@example.com", "https://example.com/a?b=1", "hello"]
            ),
            ["PHONE_NUMBER", "EMAIL_ADDRESS", "URL", "O"]
        );
    }

    #[test]
    fn bad_patterns_are_errors() {
        assert!(matches!(
            EntityPattern::parse("no tag here"),
            Err(EntityPatternError::MissingTag(_))
        ));
        assert!(matches!(
            EntityPattern::parse(":[@](.+)"),
            Err(EntityPatternError::MissingTag(_))
        ));
        let err = EntityPattern::parse("BAD:(unclosed").unwrap_err();
        assert!(err.to_string().starts_with("invalid regex for entity BAD"));
        assert!(matches!(
            EntityPattern::builtin("fax"),
            Err(EntityPatternError::UnknownRecognizer(_))
        ));
    }

    #[test]
    fn output_shape() {
        let tagged = EntityTagger::new().tag(strings(&["in", "2"]));
        let output = ProcessorOutput::from(tagged);
        assert_eq!(
            output.into_value(),
            serde_json::json!({
                "tokens": ["in", "2"],
                "nerTags": ["O", "NUMBER"],
                "nerValues": [null, "2"],
            })
        );
    }

    #[test]
    fn tag_after_colon_split_keeps_colons_in_regex() {
        let pattern = EntityPattern::parse("TIME:[0-9]{2}:[0-9]{2}").unwrap();
        assert_eq!(pattern.tag(), "TIME");
        assert_eq!(pattern.recognize("10:30"), Some("10:30".into()));
    }
}
