//! # lexsig
//!
//! A rule-driven lexer for many languages and a function signature extractor that works on its
//! token stream.
//!
//! Languages are declarative grammars (see [`lexing::grammar`]) compiled into [`RuleSet`]s and
//! served by a [`Registry`]. [`tokenize`] turns text into a lossless, lazily produced token
//! stream; [`extraction::extract`] turns that stream into [`Signature`] records without
//! building a syntax tree.
//!
//! ```text
//! let rules = Registry::global().resolve("python")?;
//! for token in tokenize("def add(a, b): ...", &rules) { ... }
//! let signatures = lexsig::signatures("def add(a, b): ...", "python")?;
//! ```
//!
//! Only configuration problems are errors. Malformed input degrades into `Error` tokens and
//! partial signatures.

pub mod config;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod lexing;
pub mod registry;
pub mod token;

pub use error::{CompilationError, Error, RegistryError};
pub use extraction::{extract, extract_with, LanguageFamily, Signature};
pub use lexing::{compile, tokenize, tokenize_with, GrammarSpec, LexerOptions, RuleSet, Tokens};
pub use registry::Registry;
pub use token::{detokenize, Token, TokenKind};

use extraction::ExtractorOptions;

/// Tokenize `source` as `language` using the global registry.
///
/// Tokens are collected so they can outlive the rule set lookup.
pub fn tokenize_language<'src>(
    source: &'src str,
    language: &str,
) -> Result<Vec<Token<'src>>, RegistryError> {
    let rules = Registry::global().resolve(language)?;
    Ok(tokenize(source, &rules).collect())
}

/// Extract signatures from `source` written in `language` with default options.
pub fn signatures(source: &str, language: &str) -> Result<Vec<Signature>, RegistryError> {
    let rules = Registry::global().resolve(language)?;
    Ok(analyze(
        source,
        &rules,
        LexerOptions::default(),
        ExtractorOptions::default(),
    ))
}

/// Lex and extract in a single pass over the lazy token stream.
pub fn analyze(
    source: &str,
    rules: &RuleSet,
    lexer: LexerOptions,
    extractor: ExtractorOptions,
) -> Vec<Signature> {
    extract_with(tokenize_with(source, rules, lexer), rules.family(), extractor)
}
