//! Pretty-printed JSON.

use super::{FormatError, Formatter, Report};
use crate::extraction::Signature;
use crate::token::Token;
use serde::Serialize;

pub struct JsonFormatter;

#[derive(Serialize)]
struct SignatureDocument<'a> {
    language: &'a str,
    signatures: &'a [Signature],
}

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn signatures(&self, report: &Report<'_>) -> Result<String, FormatError> {
        let document = SignatureDocument {
            language: report.language,
            signatures: report.signatures,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn tokens(&self, tokens: &[Token<'_>]) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(tokens)?)
    }

    fn description(&self) -> &str {
        "Signatures or tokens as JSON"
    }
}
