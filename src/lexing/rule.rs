//! Compiled rules.
//!
//! A [`Matcher`] answers one question: does its pattern match *starting exactly at* a given
//! offset? The `regex` crate only anchors `\A` at the start of the haystack, so each pattern is
//! compiled twice:
//!
//! - `at_start`: `\A(?:pattern)`, used at offset 0.
//! - `after`: `\A(?s:.)(?:pattern)`, run on a haystack that begins one character *before* the
//!   offset. The extra character is consumed by the prefix and gives `^`, `\b` and friends the
//!   left context they would see in the full text.
//!
//! Both are compiled in multi-line mode, so `^` and `$` are line anchors.

use crate::token::TokenKind;
use regex::{Captures, Regex};

/// Index of a state inside its [`RuleSet`](super::compile::RuleSet).
pub type StateId = usize;

/// What happens to the state stack after a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stay,
    Push(StateId),
    /// Pop this many states; the root is never popped.
    Pop(usize),
    /// Replace the top of the stack.
    Switch(StateId),
}

/// What a rule contributes to the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    Token(TokenKind),
    /// One kind per capture group, in group order.
    Groups(Vec<TokenKind>),
    Nothing,
}

#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    at_start: Regex,
    after: Regex,
}

impl Matcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let at_start = Regex::new(&format!(r"(?m)\A(?:{})", pattern))?;
        let after = Regex::new(&format!(r"(?m)\A(?s:.)(?:{})", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            at_start,
            after,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of capture groups in the pattern (excluding the implicit whole-match group).
    pub fn group_count(&self) -> usize {
        self.at_start.captures_len() - 1
    }

    /// End offset of a match starting at `offset`, if any.
    pub fn end_at(&self, input: &str, offset: usize) -> Option<usize> {
        match previous_char_start(input, offset) {
            None => self.at_start.find(input).map(|m| m.end()),
            Some(base) => self.after.find(&input[base..]).map(|m| base + m.end()),
        }
    }

    /// Captures for a match starting at `offset`, together with the base offset the capture
    /// positions are relative to.
    pub fn captures_at<'h>(&self, input: &'h str, offset: usize) -> Option<(usize, Captures<'h>)> {
        match previous_char_start(input, offset) {
            None => self.at_start.captures(input).map(|caps| (0, caps)),
            Some(base) => self.after.captures(&input[base..]).map(|caps| (base, caps)),
        }
    }
}

/// Start of the character preceding `offset`, or `None` at the beginning of the input.
fn previous_char_start(input: &str, offset: usize) -> Option<usize> {
    input[..offset].char_indices().next_back().map(|(i, _)| i)
}

/// A pattern, its emission and its state action.
#[derive(Debug, Clone)]
pub struct Rule {
    pub matcher: Matcher,
    pub emit: Emit,
    pub action: Action,
}

/// A named, ordered list of rules.
#[derive(Debug, Clone)]
pub struct LexerState {
    pub name: String,
    pub rules: Vec<Rule>,
}
