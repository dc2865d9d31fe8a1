//! The lexer engine.
//!
//!     [`tokenize`] walks the input with a [`StateStack`] and yields tokens lazily. At each offset
//!     the rules of the top state are tried in declaration order and the first one that matches
//!     at exactly that offset wins, regardless of match length. The winner's tokens are queued,
//!     the offset advances past the match, and the rule's action is applied to the stack.
//!
//!     When no rule matches, one character is emitted as [`TokenKind::Error`]. Together with the
//!     zero-width stall limit this guarantees every call terminates, and because every byte ends
//!     up in exactly one token the output always concatenates back to the input.
//!
//!     Each [`Tokens`] iterator owns its own stack and offset. The [`RuleSet`] is only read, so
//!     any number of iterators can share one.

use super::compile::RuleSet;
use super::rule::{Action, Emit, Rule};
use super::state_stack::StateStack;
use crate::token::{Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Consecutive zero-width state changes allowed at one offset before the engine gives up on it.
const MAX_ZERO_WIDTH_TRANSITIONS: usize = 64;

/// Runtime knobs for one tokenization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexerOptions {
    /// Maximum number of states on the stack, root included.
    pub max_state_depth: usize,
    /// Coalesce adjacent `Error` tokens into one.
    pub merge_errors: bool,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            max_state_depth: 64,
            merge_errors: false,
        }
    }
}

/// Tokenize `input` with default options.
pub fn tokenize<'src, 'r>(input: &'src str, rules: &'r RuleSet) -> Tokens<'src, 'r> {
    tokenize_with(input, rules, LexerOptions::default())
}

pub fn tokenize_with<'src, 'r>(
    input: &'src str,
    rules: &'r RuleSet,
    options: LexerOptions,
) -> Tokens<'src, 'r> {
    Tokens {
        input,
        rules,
        options,
        offset: 0,
        stack: StateStack::new(rules.root(), options.max_state_depth),
        pending: VecDeque::new(),
        stalls: 0,
        warned_depth: false,
    }
}

/// Lazy token stream over one input.
#[derive(Debug)]
pub struct Tokens<'src, 'r> {
    input: &'src str,
    rules: &'r RuleSet,
    options: LexerOptions,
    offset: usize,
    stack: StateStack,
    pending: VecDeque<Token<'src>>,
    stalls: usize,
    warned_depth: bool,
}

impl<'src, 'r> Tokens<'src, 'r> {
    /// Current depth of the state stack (1 when only root is active).
    pub fn state_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Byte offset up to which the input has been consumed.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn next_raw(&mut self) -> Option<Token<'src>> {
        self.fill();
        self.pending.pop_front()
    }

    /// Step until a token is queued or the input is exhausted.
    fn fill(&mut self) {
        while self.pending.is_empty() && self.offset < self.input.len() {
            self.step();
        }
    }

    fn step(&mut self) {
        let rules: &'r RuleSet = self.rules;
        let state = rules.state(self.stack.top());
        let start = self.offset;

        for rule in &state.rules {
            let Some(end) = rule.matcher.end_at(self.input, start) else {
                continue;
            };

            if end == start {
                // A zero-width match is only useful if it moves the stack.
                if rule.action == Action::Stay {
                    continue;
                }
                if self.stalls >= MAX_ZERO_WIDTH_TRANSITIONS {
                    break;
                }
                if self.apply(rule.action) {
                    self.stalls += 1;
                    return;
                }
                continue;
            }

            self.stalls = 0;
            if self.apply(rule.action) {
                self.emit(rule, start, end);
            } else {
                self.pending
                    .push_back(Token::new(TokenKind::Error, start, &self.input[start..end]));
            }
            self.offset = end;
            return;
        }

        self.stalls = 0;
        let width = self.input[start..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        let end = start + width;
        self.pending
            .push_back(Token::new(TokenKind::Error, start, &self.input[start..end]));
        self.offset = end;
    }

    /// Apply a state action. Returns `false` when a push was refused by the depth limit.
    fn apply(&mut self, action: Action) -> bool {
        let applied = match action {
            Action::Stay => true,
            Action::Push(id) => self.stack.push(id),
            Action::Pop(count) => {
                self.stack.pop(count);
                true
            }
            Action::Switch(id) => self.stack.switch(id),
        };

        if applied {
            if action != Action::Stay {
                tracing::trace!(
                    state = %self.rules.state(self.stack.top()).name,
                    depth = self.stack.depth(),
                    offset = self.offset,
                    "state transition"
                );
            }
        } else if !self.warned_depth {
            self.warned_depth = true;
            tracing::warn!(
                language = %self.rules.name(),
                max_depth = self.stack.max_depth(),
                offset = self.offset,
                "state stack limit reached, emitting error tokens"
            );
        }
        applied
    }

    fn emit(&mut self, rule: &Rule, start: usize, end: usize) {
        let input = self.input;
        match &rule.emit {
            Emit::Token(kind) => self
                .pending
                .push_back(Token::new(*kind, start, &input[start..end])),
            // Silent rules that consume text still have to account for it.
            Emit::Nothing => self
                .pending
                .push_back(Token::new(TokenKind::Text, start, &input[start..end])),
            Emit::Groups(kinds) => {
                let Some((base, caps)) = rule.matcher.captures_at(input, start) else {
                    self.pending
                        .push_back(Token::new(TokenKind::Text, start, &input[start..end]));
                    return;
                };
                let mut cursor = start;
                for (index, kind) in kinds.iter().enumerate() {
                    let Some(group) = caps.get(index + 1) else {
                        continue;
                    };
                    let (group_start, group_end) = (base + group.start(), base + group.end());
                    if group_start < cursor || group_start == group_end {
                        continue;
                    }
                    if group_start > cursor {
                        self.pending.push_back(Token::new(
                            TokenKind::Text,
                            cursor,
                            &input[cursor..group_start],
                        ));
                    }
                    self.pending
                        .push_back(Token::new(*kind, group_start, &input[group_start..group_end]));
                    cursor = group_end;
                }
                if cursor < end {
                    self.pending
                        .push_back(Token::new(TokenKind::Text, cursor, &input[cursor..end]));
                }
            }
        }
    }
}

impl<'src> Iterator for Tokens<'src, '_> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Token<'src>> {
        let token = self.next_raw()?;
        if !self.options.merge_errors || token.kind != TokenKind::Error {
            return Some(token);
        }

        let mut end = token.end;
        loop {
            self.fill();
            match self.pending.front() {
                Some(next) if next.kind == TokenKind::Error && next.start == end => {
                    end = next.end;
                    self.pending.pop_front();
                }
                _ => break,
            }
        }
        Some(Token::new(
            TokenKind::Error,
            token.start,
            &self.input[token.start..end],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexing::compile::compile;
    use crate::lexing::grammar::{GrammarSpec, RuleSpec, PUSH_SELF};
    use crate::token::detokenize;

    fn kinds_and_text<'a>(tokens: &[Token<'a>]) -> Vec<(TokenKind, &'a str)> {
        tokens.iter().map(|t| (t.kind, t.text)).collect()
    }

    fn strings() -> RuleSet {
        compile(
            GrammarSpec::new("Strings")
                .state(
                    "root",
                    vec![
                        RuleSpec::token(r"\s+", TokenKind::Whitespace),
                        RuleSpec::token("\"", TokenKind::StringDouble).push("string"),
                        RuleSpec::token("=", TokenKind::Operator),
                        RuleSpec::token("==", TokenKind::Operator),
                        RuleSpec::token(r"\w+", TokenKind::Name),
                    ],
                )
                .state(
                    "string",
                    vec![
                        RuleSpec::token(r"\\.", TokenKind::StringEscape),
                        RuleSpec::token("\"", TokenKind::StringDouble).pop(1),
                        RuleSpec::token(r#"[^"\\]+"#, TokenKind::StringDouble),
                    ],
                ),
        )
        .unwrap()
    }

    #[test]
    fn test_first_declared_rule_wins() {
        let rules = strings();
        let tokens: Vec<_> = tokenize("==", &rules).collect();
        assert_eq!(
            kinds_and_text(&tokens),
            vec![(TokenKind::Operator, "="), (TokenKind::Operator, "=")]
        );
    }

    #[test]
    fn test_push_and_pop_string_state() {
        let rules = strings();
        let tokens: Vec<_> = tokenize(r#"a "b\"c" d"#, &rules).collect();
        assert_eq!(
            kinds_and_text(&tokens),
            vec![
                (TokenKind::Name, "a"),
                (TokenKind::Whitespace, " "),
                (TokenKind::StringDouble, "\""),
                (TokenKind::StringDouble, "b"),
                (TokenKind::StringEscape, "\\\""),
                (TokenKind::StringDouble, "c"),
                (TokenKind::StringDouble, "\""),
                (TokenKind::Whitespace, " "),
                (TokenKind::Name, "d"),
            ]
        );
    }

    #[test]
    fn test_unmatched_input_becomes_single_char_errors() {
        let rules = strings();
        let tokens: Vec<_> = tokenize("a@é", &rules).collect();
        assert_eq!(
            kinds_and_text(&tokens),
            vec![
                (TokenKind::Name, "a"),
                (TokenKind::Error, "@"),
                (TokenKind::Name, "é"),
            ]
        );
        let tokens: Vec<_> = tokenize("→→", &rules).collect();
        assert_eq!(
            kinds_and_text(&tokens),
            vec![(TokenKind::Error, "→"), (TokenKind::Error, "→")]
        );
    }

    #[test]
    fn test_merge_errors() {
        let rules = strings();
        let options = LexerOptions {
            merge_errors: true,
            ..LexerOptions::default()
        };
        let tokens: Vec<_> = tokenize_with("@@@ a", &rules, options).collect();
        assert_eq!(
            kinds_and_text(&tokens),
            vec![
                (TokenKind::Error, "@@@"),
                (TokenKind::Whitespace, " "),
                (TokenKind::Name, "a"),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        let rules = strings();
        assert_eq!(tokenize("", &rules).count(), 0);
    }

    #[test]
    fn test_depth_limit_emits_errors() {
        let rules = compile(
            GrammarSpec::new("Parens")
                .state(
                    "root",
                    vec![RuleSpec::token(r"\(", TokenKind::Punctuation).push("nested")],
                )
                .state(
                    "nested",
                    vec![
                        RuleSpec::token(r"\(", TokenKind::Punctuation).push(PUSH_SELF),
                        RuleSpec::token(r"\)", TokenKind::Punctuation).pop(1),
                    ],
                ),
        )
        .unwrap();
        let options = LexerOptions {
            max_state_depth: 3,
            ..LexerOptions::default()
        };
        let mut stream = tokenize_with("(((()", &rules, options);
        let tokens: Vec<_> = stream.by_ref().collect();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Punctuation,
                TokenKind::Punctuation,
                TokenKind::Error,
                TokenKind::Error,
                TokenKind::Punctuation,
            ]
        );
        assert_eq!(stream.state_depth(), 2);
    }

    #[test]
    fn test_zero_width_cycle_terminates() {
        let rules = compile(
            GrammarSpec::new("Cycle")
                .state("root", vec![RuleSpec::default_transition().push("a")])
                .state("a", vec![RuleSpec::default_transition().switch("b")])
                .state("b", vec![RuleSpec::default_transition().switch("a")]),
        )
        .unwrap();
        let tokens: Vec<_> = tokenize("xy", &rules).collect();
        assert_eq!(
            kinds_and_text(&tokens),
            vec![(TokenKind::Error, "x"), (TokenKind::Error, "y")]
        );
    }

    #[test]
    fn test_default_transition_reenters_root() {
        let rules = compile(
            GrammarSpec::new("Default")
                .state(
                    "root",
                    vec![
                        RuleSpec::token("def", TokenKind::Keyword).push("name"),
                        RuleSpec::token(r"\s+", TokenKind::Whitespace),
                        RuleSpec::token(r"\w+", TokenKind::Name),
                    ],
                )
                .state(
                    "name",
                    vec![
                        RuleSpec::token(r"\s+", TokenKind::Whitespace),
                        RuleSpec::token(r"[a-z]\w*", TokenKind::NameFunction).pop(1),
                        RuleSpec::default_transition().pop(1),
                    ],
                ),
        )
        .unwrap();
        let tokens: Vec<_> = tokenize("def f 9", &rules).collect();
        assert_eq!(tokens[2].kind, TokenKind::NameFunction);
        let tokens: Vec<_> = tokenize("def 9", &rules).collect();
        assert_eq!(
            kinds_and_text(&tokens),
            vec![
                (TokenKind::Keyword, "def"),
                (TokenKind::Whitespace, " "),
                (TokenKind::Name, "9"),
            ]
        );
    }

    #[test]
    fn test_group_emission_fills_gaps() {
        let rules = compile(GrammarSpec::new("Groups").state(
            "root",
            vec![
                RuleSpec::groups(
                    r"(def)\s+(\w+)(\()?",
                    vec![
                        TokenKind::KeywordDeclaration,
                        TokenKind::NameFunction,
                        TokenKind::Punctuation,
                    ],
                ),
                RuleSpec::silent(r"\s+"),
            ],
        ))
        .unwrap();
        let tokens: Vec<_> = tokenize("def  f def g(", &rules).collect();
        assert_eq!(
            kinds_and_text(&tokens),
            vec![
                (TokenKind::KeywordDeclaration, "def"),
                (TokenKind::Text, "  "),
                (TokenKind::NameFunction, "f"),
                (TokenKind::Text, " "),
                (TokenKind::KeywordDeclaration, "def"),
                (TokenKind::Text, " "),
                (TokenKind::NameFunction, "g"),
                (TokenKind::Punctuation, "("),
            ]
        );
    }

    #[test]
    fn test_lazy_consumer_can_stop_early() {
        let rules = strings();
        let input = "word ".repeat(10_000);
        let mut stream = tokenize(&input, &rules);
        assert_eq!(stream.next().map(|t| t.text), Some("word"));
        assert!(stream.offset() < 10);
    }

    #[test]
    fn test_round_trip_and_spans() {
        let rules = strings();
        let input = "x = \"unterminated \\";
        let tokens: Vec<_> = tokenize(input, &rules).collect();
        assert_eq!(detokenize(&tokens), input);
        let mut expected = 0;
        for token in &tokens {
            assert_eq!(token.start, expected);
            expected = token.end;
        }
        assert_eq!(expected, input.len());
    }
}
