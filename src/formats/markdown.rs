//! GitHub-flavored Markdown.
//!
//! The source is wrapped in a fenced code block and the extracted functions are shown in one of
//! three styles:
//!
//! ```text
//! emphasis   summary list after the code      **add**(a, b) - Line 1
//! callout    summary list before the code,    - **add**(a, b) (line 1)
//!            blockquote at each function      > **Function:** `add`
//! heading    code split at each function      ### add
//! ```
//!
//! Line numbers, highlighted lines, a document header and inline emphasis by token kind are
//! optional. Fence character and length are configurable so that sources which themselves
//! contain triple backticks can still be embedded.

use super::{FormatError, Formatter, Report};
use crate::extraction::Signature;
use crate::token::{Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const MIN_FENCE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionStyle {
    /// Summary list after the code block.
    #[default]
    Emphasis,
    /// Bulleted list before the code block, and a blockquote where each function starts.
    Callout,
    /// A `###` heading where each function starts.
    Heading,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    /// Info string of the code fence; the CLI fills in the resolved language alias when empty.
    pub lang: String,
    /// `` ` `` or `~`; anything else falls back to a backtick.
    pub fence_char: char,
    /// At least 3.
    pub fence_count: usize,
    pub include_source: bool,
    /// Prefix each code line with its number.
    pub linenos: bool,
    /// Number of the first line.
    pub linenostart: usize,
    /// Line numbers (as displayed, so relative to `linenostart`) marked `# <<< HIGHLIGHTED`.
    pub hl_lines: Vec<usize>,
    /// Start with a `# title` document header.
    pub full: bool,
    pub title: String,
    /// Bold keywords, italic comments and struck-through errors inside the code block. Needs
    /// the report's tokens.
    pub inline_styles: bool,
    /// When false no function summary or marker is written.
    pub highlight_functions: bool,
    pub function_style: FunctionStyle,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            lang: String::new(),
            fence_char: '`',
            fence_count: MIN_FENCE,
            include_source: true,
            linenos: false,
            linenostart: 1,
            hl_lines: Vec::new(),
            full: false,
            title: "Code".to_string(),
            inline_styles: false,
            highlight_functions: true,
            function_style: FunctionStyle::Emphasis,
        }
    }
}

impl MarkdownOptions {
    pub fn fence(&self) -> String {
        let c = match self.fence_char {
            '`' | '~' => self.fence_char,
            _ => '`',
        };
        std::iter::repeat(c)
            .take(self.fence_count.max(MIN_FENCE))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter {
    options: MarkdownOptions,
}

impl MarkdownFormatter {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    fn code_block(&self, out: &mut String, report: &Report<'_>, functions: &[Signature]) {
        let options = &self.options;
        let fence = options.fence();
        let lines = if options.inline_styles && !report.tokens.is_empty() {
            styled_lines(report.tokens)
        } else {
            split_lines(report.source)
        };
        let markers = options.function_style != FunctionStyle::Emphasis;

        let mut open = false;
        for (index, line) in lines.iter().enumerate() {
            let number = options.linenostart + index;
            let mut starting = functions
                .iter()
                .filter(|s| markers && s.start_line == index + 1)
                .peekable();
            if starting.peek().is_some() {
                if open {
                    let _ = writeln!(out, "{}\n", fence);
                    open = false;
                }
                for signature in starting {
                    self.marker(out, signature, number);
                }
            }

            if !open {
                let _ = writeln!(out, "{}{}", fence, options.lang);
                open = true;
            }
            if options.linenos {
                let _ = write!(out, "{:4} | ", number);
            }
            out.push_str(line);
            if options.hl_lines.contains(&number) {
                out.push_str("  # <<< HIGHLIGHTED");
            }
            out.push('\n');
        }
        if !open {
            let _ = writeln!(out, "{}{}", fence, options.lang);
        }
        let _ = writeln!(out, "{}", fence);

        if !options.hl_lines.is_empty() {
            let mut highlighted = options.hl_lines.clone();
            highlighted.sort_unstable();
            highlighted.dedup();
            let listed: Vec<String> = highlighted.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "\n<!-- Highlighted lines: {} -->", listed.join(", "));
        }
    }

    fn marker(&self, out: &mut String, signature: &Signature, number: usize) {
        match self.options.function_style {
            FunctionStyle::Callout => {
                let _ = writeln!(out, "> **Function:** `{}`", signature.name);
                let _ = writeln!(out, "> Line {}\n", number);
            }
            FunctionStyle::Heading => {
                let _ = writeln!(out, "### {}\n", signature.name);
            }
            FunctionStyle::Emphasis => {}
        }
    }

    /// Headings with only the header text, for reports without source.
    fn heading_list(&self, out: &mut String, functions: &[Signature]) {
        let fence = self.options.fence();
        for signature in functions {
            let _ = writeln!(out, "### {}\n", signature.name);
            let _ = writeln!(out, "{}{}", fence, self.options.lang);
            let _ = writeln!(out, "{}", signature.signature);
            let _ = writeln!(out, "{}\n", fence);
        }
    }
}

fn params_display(parameters: &str) -> String {
    format!("({})", parameters)
}

/// Source lines without their terminators; a final newline does not start another line.
fn split_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if matches!(lines.last(), Some(l) if l.is_empty()) {
        lines.pop();
    }
    lines
}

fn styled_lines(tokens: &[Token<'_>]) -> Vec<String> {
    let mut text = String::new();
    for token in tokens {
        let (open, close) = inline_style(token.kind);
        for (i, piece) in token.text.split('\n').enumerate() {
            if i > 0 {
                text.push('\n');
            }
            if !piece.is_empty() {
                text.push_str(open);
                text.push_str(piece);
                text.push_str(close);
            }
        }
    }
    split_lines(&text)
}

fn inline_style(kind: TokenKind) -> (&'static str, &'static str) {
    if kind.is_a(TokenKind::Comment) {
        ("*", "*")
    } else if kind.is_a(TokenKind::Keyword) {
        ("**", "**")
    } else if kind == TokenKind::Error {
        ("~~", "~~")
    } else {
        ("", "")
    }
}

impl Formatter for MarkdownFormatter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn signatures(&self, report: &Report<'_>) -> Result<String, FormatError> {
        let options = &self.options;
        let mut out = String::new();
        let functions: &[Signature] = if options.highlight_functions {
            report.signatures
        } else {
            &[]
        };

        if options.full {
            let _ = writeln!(out, "# {}\n", options.title);
            out.push_str("Generated by lexsig\n\n");
        }

        if options.function_style == FunctionStyle::Callout && !functions.is_empty() {
            out.push_str("## Functions Found\n\n");
            for signature in functions {
                let _ = writeln!(
                    out,
                    "- **{}**{} (line {})",
                    signature.name,
                    params_display(&signature.parameters),
                    signature.start_line
                );
            }
            out.push('\n');
        }

        if options.include_source {
            self.code_block(&mut out, report, functions);
        } else if options.function_style == FunctionStyle::Heading {
            self.heading_list(&mut out, functions);
        }

        if options.function_style == FunctionStyle::Emphasis && !functions.is_empty() {
            if !out.is_empty() && !out.ends_with("\n\n") {
                out.push('\n');
            }
            out.push_str("## Functions\n\n");
            for signature in functions {
                let _ = writeln!(
                    out,
                    "**{}**{} - Line {}",
                    signature.name,
                    params_display(&signature.parameters),
                    signature.start_line
                );
            }
            out.push('\n');
        }
        Ok(out)
    }

    fn description(&self) -> &str {
        "Fenced source with a function summary"
    }
}
