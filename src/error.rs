//! Error types.
//!
//! Only configuration problems are errors: a grammar that does not compile, a language that is
//! not registered, a config file that does not parse. Malformed *input* never produces an error;
//! it degrades into `Error` tokens and partial signatures instead.

use thiserror::Error;

/// A grammar description could not be compiled into a rule set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    #[error("grammar `{language}` has no `root` state")]
    MissingRoot { language: String },

    #[error("grammar `{language}`: state `{referenced_from}` refers to undeclared state `{state}`")]
    UndeclaredState {
        language: String,
        state: String,
        referenced_from: String,
    },

    #[error("grammar `{language}`: rule {rule} of state `{state}` has an invalid pattern: {source}")]
    InvalidPattern {
        language: String,
        state: String,
        rule: usize,
        source: regex::Error,
    },

    #[error(
        "grammar `{language}`: rule {rule} of state `{state}` lists {found} group kinds but the pattern has {expected} capture groups"
    )]
    GroupCountMismatch {
        language: String,
        state: String,
        rule: usize,
        expected: usize,
        found: usize,
    },

    #[error("grammar `{language}`: rule {rule} of state `{state}` sets both `token` and `groups`")]
    ConflictingEmission {
        language: String,
        state: String,
        rule: usize,
    },

    #[error("grammar `{language}`: rule {rule} of state `{state}` combines push, pop and switch")]
    ConflictingActions {
        language: String,
        state: String,
        rule: usize,
    },

    #[error("grammar `{language}`: rule {rule} of state `{state}` pops zero states")]
    InvalidPop {
        language: String,
        state: String,
        rule: usize,
    },

    #[error("grammar `{language}`: state `{state}` includes itself")]
    IncludeCycle { language: String, state: String },
}

/// Lookup and registration failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no lexer registered for `{0}`")]
    LanguageNotFound(String),

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error("invalid grammar description: {0}")]
    Grammar(#[from] serde_yaml::Error),
}

/// Umbrella error for applications driving the library end to end.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Format(#[from] crate::formats::FormatError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
