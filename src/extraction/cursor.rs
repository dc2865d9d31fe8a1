//! Position bookkeeping for the extractor: line/column tracking and a bounded lookback of
//! significant tokens.

use crate::token::Token;
use std::collections::VecDeque;

const TAB_WIDTH: usize = 8;

/// Tracks the line and visual column of the next token.
#[derive(Debug, Clone)]
pub struct LineTracker {
    line: usize,
    column: usize,
    line_has_code: bool,
}

impl Default for LineTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LineTracker {
    pub fn new() -> Self {
        Self {
            line: 1,
            column: 0,
            line_has_code: false,
        }
    }

    /// 1-based line of the next token.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Visual column of the next token, tabs expanded to multiples of 8.
    pub fn column(&self) -> usize {
        self.column
    }

    /// No significant token has been seen on the current line yet.
    pub fn at_line_start(&self) -> bool {
        !self.line_has_code
    }

    /// Move past `text`.
    pub fn advance(&mut self, text: &str, significant: bool) {
        for c in text.chars() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.column = 0;
                    self.line_has_code = false;
                }
                '\t' => self.column = (self.column / TAB_WIDTH + 1) * TAB_WIDTH,
                _ => self.column += 1,
            }
        }
        if significant && !text.ends_with('\n') {
            self.line_has_code = true;
        }
    }
}

/// The last few significant tokens, each with the line it started on.
#[derive(Debug, Clone)]
pub struct Lookback<'src> {
    items: VecDeque<(Token<'src>, usize)>,
    capacity: usize,
}

impl<'src> Lookback<'src> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, token: Token<'src>, line: usize) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back((token, line));
    }

    /// The `n`-th most recent token; `0` is the latest.
    pub fn back(&self, n: usize) -> Option<&Token<'src>> {
        self.entry(n).map(|(token, _)| token)
    }

    pub fn entry(&self, n: usize) -> Option<&(Token<'src>, usize)> {
        let len = self.items.len();
        if n >= len {
            return None;
        }
        self.items.get(len - 1 - n)
    }

    /// Text of the `n`-th most recent token, or `""`.
    pub fn text(&self, n: usize) -> &'src str {
        self.back(n).map(|t| t.text).unwrap_or("")
    }

    /// Newest first.
    pub fn iter_back(&self) -> impl Iterator<Item = &(Token<'src>, usize)> {
        self.items.iter().rev()
    }
}
