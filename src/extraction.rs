//! Signature extraction from token streams.
//!
//! The extractor recovers function and method signatures from a flat token stream without
//! building a syntax tree. It makes a single pass, keeps a bounded lookback, and tracks nesting
//! with a scope stack whose frames close according to the language family (braces, indentation
//! or `end`).
//!
//! Truncated input never loses a declaration whose name was seen: a header still open at the end
//! of the stream is emitted with `partial` set.

pub mod cursor;
pub mod extractor;
pub mod family;
pub mod signature;

pub use extractor::Extractor;
pub use family::{LanguageFamily, UnknownFamily};
pub use signature::{parse_parameters, ParamStyle, Parameter, Signature};

use crate::token::Token;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorOptions {
    /// Record headers terminated by `;` (prototypes, interface methods) outside function bodies.
    pub include_declarations: bool,
    /// Number of significant tokens remembered for lookback heuristics.
    pub lookback: usize,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            include_declarations: true,
            lookback: 8,
        }
    }
}

/// Extract signatures with default options.
pub fn extract<'src, I>(tokens: I, family: LanguageFamily) -> Vec<Signature>
where
    I: IntoIterator<Item = Token<'src>>,
{
    extract_with(tokens, family, ExtractorOptions::default())
}

pub fn extract_with<'src, I>(
    tokens: I,
    family: LanguageFamily,
    options: ExtractorOptions,
) -> Vec<Signature>
where
    I: IntoIterator<Item = Token<'src>>,
{
    let mut extractor = Extractor::new(family, options);
    for token in tokens {
        extractor.feed(token);
    }
    let signatures = extractor.finish();
    tracing::debug!(family = %family, count = signatures.len(), "extracted signatures");
    signatures
}
