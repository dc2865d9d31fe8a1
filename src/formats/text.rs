//! Plain text listing.
//!
//! One line per signature, `scope.name(params) -> returns  (line N)`. Token streams render as
//! a debug listing, one token per line with its span.

use super::{FormatError, Formatter, Report};
use crate::token::Token;
use std::fmt::Write;

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn signatures(&self, report: &Report<'_>) -> Result<String, FormatError> {
        let mut out = String::new();
        for signature in report.signatures {
            let _ = write!(out, "{}({})", signature.qualified_name(), signature.parameters);
            if let Some(returns) = &signature.returns {
                let _ = write!(out, " -> {}", returns);
            }
            if signature.start_line == signature.end_line {
                let _ = write!(out, "  (line {})", signature.start_line);
            } else {
                let _ = write!(
                    out,
                    "  (lines {}-{})",
                    signature.start_line, signature.end_line
                );
            }
            if signature.partial {
                out.push_str(" [partial]");
            }
            out.push('\n');
        }
        Ok(out)
    }

    fn tokens(&self, tokens: &[Token<'_>]) -> Result<String, FormatError> {
        let width = tokens
            .iter()
            .map(|t| t.kind.name().len())
            .max()
            .unwrap_or(0);
        let mut out = String::new();
        for token in tokens {
            let _ = writeln!(
                out,
                "{:>6}..{:<6} {:<width$} {:?}",
                token.start,
                token.end,
                token.kind.name(),
                token.text,
                width = width
            );
        }
        Ok(out)
    }

    fn description(&self) -> &str {
        "One line per signature"
    }
}
