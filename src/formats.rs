//! Output formats for signatures and token streams.
//!
//! Each format implements [`Formatter`] and is looked up by name in a [`FormatRegistry`].
//! Formats render a [`Report`] (the signatures found in one source file) and may also render
//! a raw token stream.

pub mod json;
pub mod markdown;
pub mod text;

pub use json::JsonFormatter;
pub use markdown::{FunctionStyle, MarkdownFormatter, MarkdownOptions};
pub use text::TextFormatter;

use crate::extraction::Signature;
use crate::token::Token;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("format `{0}` not found")]
    FormatNotFound(String),

    #[error("format `{0}` cannot render token streams")]
    TokensUnsupported(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Everything a formatter may show about one analyzed source.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    /// Display name of the language the source was lexed as.
    pub language: &'a str,
    pub source: &'a str,
    pub signatures: &'a [Signature],
    /// Token stream of `source`, for formats that style by token kind. May be empty.
    pub tokens: &'a [Token<'a>],
}

impl<'a> Report<'a> {
    pub fn new(language: &'a str, source: &'a str, signatures: &'a [Signature]) -> Self {
        Self {
            language,
            source,
            signatures,
            tokens: &[],
        }
    }

    pub fn with_tokens(mut self, tokens: &'a [Token<'a>]) -> Self {
        self.tokens = tokens;
        self
    }
}

pub trait Formatter: Send + Sync {
    /// Name used to select this format (e.g. "text", "json").
    fn name(&self) -> &str;

    fn signatures(&self, report: &Report<'_>) -> Result<String, FormatError>;

    fn tokens(&self, tokens: &[Token<'_>]) -> Result<String, FormatError> {
        let _ = tokens;
        Err(FormatError::TokensUnsupported(self.name().to_string()))
    }

    fn description(&self) -> &str {
        ""
    }
}

/// Formatters by name.
pub struct FormatRegistry {
    formatters: HashMap<String, Box<dyn Formatter>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry {
            formatters: HashMap::new(),
        }
    }

    /// Register a formatter, replacing any formatter of the same name.
    pub fn register<F: Formatter + 'static>(&mut self, formatter: F) {
        self.formatters
            .insert(formatter.name().to_string(), Box::new(formatter));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Formatter, FormatError> {
        self.formatters
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| FormatError::FormatNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<_> = self.formatters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Text, JSON and Markdown (default options).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TextFormatter);
        registry.register(JsonFormatter);
        registry.register(MarkdownFormatter::default());
        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
