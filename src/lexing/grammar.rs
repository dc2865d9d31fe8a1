//! Declarative grammar descriptions.
//!
//! A grammar is data: named states, each an ordered list of rules. Rules are tried in
//! declaration order and the first one that matches at the current offset wins, the same way
//! a priority-ordered pattern table is walked from the top.
//!
//! Grammars are usually written in YAML (the built-in ones live in `grammars/`):
//!
//! ```text
//! name: Python
//! aliases: [python, py]
//! family: indent-def
//! states:
//!   root:
//!     - match: '(def)(\s+)'
//!       groups: [Keyword.Declaration, Whitespace]
//!       push: funcname
//!     - include: expressions
//!   funcname:
//!     - match: '[^\W\d]\w*'
//!       token: Name.Function
//!       pop: 1
//!     - default: { pop: 1 }
//! ```
//!
//! The same structure can be assembled in Rust with the [`GrammarSpec`] and [`RuleSpec`]
//! builders. Nothing here is validated; [`compile`](super::compile::compile) does that.

use crate::extraction::LanguageFamily;
use crate::token::TokenKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Marker accepted by `push` meaning "push the state this rule runs in".
pub const PUSH_SELF: &str = "#self";

/// A complete, uncompiled grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrammarSpec {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Filename globs. Informational; lexer selection by filename happens outside the library.
    #[serde(default)]
    pub filenames: Vec<String>,
    #[serde(default)]
    pub family: LanguageFamily,
    pub states: IndexMap<String, Vec<RuleSpec>>,
}

impl GrammarSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            filenames: Vec::new(),
            family: LanguageFamily::Plain,
            states: IndexMap::new(),
        }
    }

    /// Parse a YAML (or JSON) grammar document.
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    /// The plain-text grammar: one rule classifying everything as `Text`.
    pub fn plain_text() -> Self {
        Self::new("Text")
            .alias("text")
            .alias("plain")
            .alias("plaintext")
            .filename("*.txt")
            .state("root", vec![RuleSpec::token(r"(?s).+", TokenKind::Text)])
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn filename(mut self, glob: impl Into<String>) -> Self {
        self.filenames.push(glob.into());
        self
    }

    pub fn family(mut self, family: LanguageFamily) -> Self {
        self.family = family;
        self
    }

    /// Declare (or replace) a state.
    pub fn state(mut self, name: impl Into<String>, rules: Vec<RuleSpec>) -> Self {
        self.states.insert(name.into(), rules);
        self
    }
}

/// One entry in a state's rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    /// Splice the rules of another state here.
    Include(IncludeSpec),
    /// Zero-width transition that always matches.
    Default(DefaultSpec),
    Match(MatchSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludeSpec {
    pub include: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultSpec {
    pub default: TransitionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchSpec {
    #[serde(rename = "match")]
    pub pattern: String,
    /// Kind for the whole match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenKind>,
    /// One kind per capture group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<TokenKind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch: Option<String>,
}

/// State change carried by a `default` rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch: Option<String>,
}

impl RuleSpec {
    /// Match `pattern` and emit the whole match as `kind`.
    pub fn token(pattern: impl Into<String>, kind: TokenKind) -> Self {
        RuleSpec::Match(MatchSpec {
            pattern: pattern.into(),
            token: Some(kind),
            groups: None,
            push: None,
            pop: None,
            switch: None,
        })
    }

    /// Match `pattern` and emit one token per capture group.
    pub fn groups(pattern: impl Into<String>, kinds: Vec<TokenKind>) -> Self {
        RuleSpec::Match(MatchSpec {
            pattern: pattern.into(),
            token: None,
            groups: Some(kinds),
            push: None,
            pop: None,
            switch: None,
        })
    }

    /// Match `pattern` without emitting a token of its own.
    pub fn silent(pattern: impl Into<String>) -> Self {
        RuleSpec::Match(MatchSpec {
            pattern: pattern.into(),
            token: None,
            groups: None,
            push: None,
            pop: None,
            switch: None,
        })
    }

    pub fn include(state: impl Into<String>) -> Self {
        RuleSpec::Include(IncludeSpec {
            include: state.into(),
        })
    }

    /// A zero-width rule; chain [`push`](Self::push), [`pop`](Self::pop) or
    /// [`switch`](Self::switch) to give it a transition.
    pub fn default_transition() -> Self {
        RuleSpec::Default(DefaultSpec {
            default: TransitionSpec::default(),
        })
    }

    pub fn push(mut self, state: impl Into<String>) -> Self {
        if let Some(transition) = self.transition_mut() {
            *transition.0 = Some(state.into());
        }
        self
    }

    pub fn pop(mut self, count: usize) -> Self {
        if let Some(transition) = self.transition_mut() {
            *transition.1 = Some(count);
        }
        self
    }

    pub fn switch(mut self, state: impl Into<String>) -> Self {
        if let Some(transition) = self.transition_mut() {
            *transition.2 = Some(state.into());
        }
        self
    }

    #[allow(clippy::type_complexity)]
    fn transition_mut(
        &mut self,
    ) -> Option<(
        &mut Option<String>,
        &mut Option<usize>,
        &mut Option<String>,
    )> {
        match self {
            RuleSpec::Include(_) => None,
            RuleSpec::Default(spec) => Some((
                &mut spec.default.push,
                &mut spec.default.pop,
                &mut spec.default.switch,
            )),
            RuleSpec::Match(spec) => Some((&mut spec.push, &mut spec.pop, &mut spec.switch)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_yaml_rules() {
        let yaml = r#"
name: Demo
aliases: [demo]
family: brace-keyword
states:
  root:
    - include: common
    - match: '"'
      token: String.Double
      push: string
  common:
    - match: '\s+'
      token: Whitespace
  string:
    - match: '(\\)(.)'
      groups: [String.Escape, String.Escape]
    - match: '"'
      token: String.Double
      pop: 1
    - default: { pop: 1 }
"#;
        let spec = GrammarSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.name, "Demo");
        assert_eq!(spec.family, LanguageFamily::BraceKeyword);
        assert_eq!(
            spec.states.keys().collect::<Vec<_>>(),
            vec!["root", "common", "string"]
        );
        assert_eq!(spec.states["root"][0], RuleSpec::include("common"));
        assert_eq!(
            spec.states["root"][1],
            RuleSpec::token("\"", TokenKind::StringDouble).push("string")
        );
        assert_eq!(
            spec.states["string"][2],
            RuleSpec::default_transition().pop(1)
        );
    }

    #[test]
    fn test_unknown_token_kind_is_rejected() {
        let yaml = r#"
name: Broken
states:
  root:
    - match: 'x'
      token: Keyword.Nope
"#;
        assert!(GrammarSpec::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_builder_ignores_transitions_on_include() {
        let rule = RuleSpec::include("x").push("y");
        assert_eq!(rule, RuleSpec::include("x"));
    }

    #[test]
    fn test_plain_text_grammar_shape() {
        let spec = GrammarSpec::plain_text();
        assert_eq!(spec.states.len(), 1);
        assert!(spec.aliases.iter().any(|a| a == "plain"));
    }
}
