//! Rule-driven lexing.
//!
//!     A language is described declaratively ([`grammar`]), compiled once into an immutable
//!     [`RuleSet`] ([`compile`]) and then run by the [`engine`] against any number of inputs.
//!     The engine keeps its nesting context on an explicit [`StateStack`].

pub mod compile;
pub mod engine;
pub mod grammar;
pub mod rule;
pub mod state_stack;

pub use compile::{compile, RuleSet, ROOT_STATE};
pub use engine::{tokenize, tokenize_with, LexerOptions, Tokens};
pub use grammar::{GrammarSpec, RuleSpec, PUSH_SELF};
pub use state_stack::StateStack;
