//! Grammar compilation.
//!
//! Turns a [`GrammarSpec`] into an immutable [`RuleSet`]:
//!
//! 1. Index the declared states (declaration order gives the state ids; `root` must exist).
//! 2. Compile each state's own rules: patterns become [`Matcher`]s, state names become ids,
//!    emission and action fields are validated.
//! 3. Flatten `include` entries depth-first, detecting cycles. `#self` pushes resolve to the
//!    state whose list the rule ends up in, so an included rule pushes its includer.
//!
//! Every failure is a [`CompilationError`] raised here; a compiled rule set never fails at
//! tokenization time.

use super::grammar::{GrammarSpec, MatchSpec, RuleSpec, TransitionSpec, PUSH_SELF};
use super::rule::{Action, Emit, LexerState, Matcher, Rule, StateId};
use crate::error::CompilationError;
use crate::extraction::LanguageFamily;
use indexmap::IndexMap;

pub const ROOT_STATE: &str = "root";

/// A compiled grammar.
#[derive(Debug)]
pub struct RuleSet {
    spec: GrammarSpec,
    states: Vec<LexerState>,
    index: IndexMap<String, StateId>,
    root: StateId,
}

impl RuleSet {
    /// A rule set whose root state has no rules; every byte lexes as `Error`.
    pub fn bare(name: &str) -> Self {
        let spec = GrammarSpec::new(name).state(ROOT_STATE, Vec::new());
        let mut index = IndexMap::new();
        index.insert(ROOT_STATE.to_string(), 0);
        Self {
            spec,
            states: vec![LexerState {
                name: ROOT_STATE.to_string(),
                rules: Vec::new(),
            }],
            index,
            root: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.spec.aliases
    }

    pub fn family(&self) -> LanguageFamily {
        self.spec.family
    }

    /// The description this rule set was compiled from.
    pub fn spec(&self) -> &GrammarSpec {
        &self.spec
    }

    pub fn root(&self) -> StateId {
        self.root
    }

    pub fn state(&self, id: StateId) -> &LexerState {
        &self.states[id]
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.index.get(name).copied()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Total number of rules after includes were flattened.
    pub fn rule_count(&self) -> usize {
        self.states.iter().map(|s| s.rules.len()).sum()
    }
}

/// A state's own rules before includes are spliced in.
enum Entry {
    Include(StateId),
    Rule(PendingRule),
}

struct PendingRule {
    matcher: Matcher,
    emit: Emit,
    action: PendingAction,
}

enum PendingAction {
    Resolved(Action),
    PushSelf,
}

/// Compile a grammar description.
pub fn compile(spec: GrammarSpec) -> Result<RuleSet, CompilationError> {
    let language = spec.name.clone();
    let index: IndexMap<String, StateId> = spec
        .states
        .keys()
        .enumerate()
        .map(|(id, name)| (name.clone(), id))
        .collect();
    let root = *index
        .get(ROOT_STATE)
        .ok_or_else(|| CompilationError::MissingRoot {
            language: language.clone(),
        })?;

    let mut entries = Vec::with_capacity(spec.states.len());
    for (state, rules) in &spec.states {
        let compiler = StateCompiler {
            language: &language,
            state,
            index: &index,
        };
        let compiled = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| compiler.entry(i, rule))
            .collect::<Result<Vec<_>, _>>()?;
        entries.push(compiled);
    }

    let mut states = Vec::with_capacity(entries.len());
    for (id, name) in index.keys().enumerate() {
        let mut rules = Vec::new();
        let mut visiting = vec![id];
        flatten(&language, &index, &entries, id, id, &mut visiting, &mut rules)?;
        states.push(LexerState {
            name: name.clone(),
            rules,
        });
    }

    let rule_set = RuleSet {
        spec,
        states,
        index,
        root,
    };
    tracing::debug!(
        language = %rule_set.name(),
        states = rule_set.state_count(),
        rules = rule_set.rule_count(),
        "compiled grammar"
    );
    Ok(rule_set)
}

struct StateCompiler<'a> {
    language: &'a str,
    state: &'a str,
    index: &'a IndexMap<String, StateId>,
}

impl StateCompiler<'_> {
    fn entry(&self, rule: usize, spec: &RuleSpec) -> Result<Entry, CompilationError> {
        match spec {
            RuleSpec::Include(include) => Ok(Entry::Include(self.lookup(&include.include)?)),
            RuleSpec::Default(default) => {
                let action = self.action(rule, &default.default)?;
                let matcher = self.matcher(rule, "")?;
                Ok(Entry::Rule(PendingRule {
                    matcher,
                    emit: Emit::Nothing,
                    action,
                }))
            }
            RuleSpec::Match(spec) => self.match_rule(rule, spec).map(Entry::Rule),
        }
    }

    fn match_rule(&self, rule: usize, spec: &MatchSpec) -> Result<PendingRule, CompilationError> {
        let matcher = self.matcher(rule, &spec.pattern)?;
        let emit = match (&spec.token, &spec.groups) {
            (Some(_), Some(_)) => {
                return Err(CompilationError::ConflictingEmission {
                    language: self.language.to_string(),
                    state: self.state.to_string(),
                    rule,
                })
            }
            (Some(kind), None) => Emit::Token(*kind),
            (None, Some(kinds)) => {
                let expected = matcher.group_count();
                if kinds.len() != expected {
                    return Err(CompilationError::GroupCountMismatch {
                        language: self.language.to_string(),
                        state: self.state.to_string(),
                        rule,
                        expected,
                        found: kinds.len(),
                    });
                }
                Emit::Groups(kinds.clone())
            }
            (None, None) => Emit::Nothing,
        };
        let transition = TransitionSpec {
            push: spec.push.clone(),
            pop: spec.pop,
            switch: spec.switch.clone(),
        };
        let action = self.action(rule, &transition)?;
        Ok(PendingRule {
            matcher,
            emit,
            action,
        })
    }

    fn matcher(&self, rule: usize, pattern: &str) -> Result<Matcher, CompilationError> {
        Matcher::new(pattern).map_err(|source| CompilationError::InvalidPattern {
            language: self.language.to_string(),
            state: self.state.to_string(),
            rule,
            source,
        })
    }

    fn action(
        &self,
        rule: usize,
        transition: &TransitionSpec,
    ) -> Result<PendingAction, CompilationError> {
        let action = match (&transition.push, transition.pop, &transition.switch) {
            (None, None, None) => PendingAction::Resolved(Action::Stay),
            (Some(target), None, None) if target == PUSH_SELF => PendingAction::PushSelf,
            (Some(target), None, None) => {
                PendingAction::Resolved(Action::Push(self.lookup(target)?))
            }
            (None, Some(0), None) => {
                return Err(CompilationError::InvalidPop {
                    language: self.language.to_string(),
                    state: self.state.to_string(),
                    rule,
                })
            }
            (None, Some(count), None) => PendingAction::Resolved(Action::Pop(count)),
            (None, None, Some(target)) => {
                PendingAction::Resolved(Action::Switch(self.lookup(target)?))
            }
            _ => {
                return Err(CompilationError::ConflictingActions {
                    language: self.language.to_string(),
                    state: self.state.to_string(),
                    rule,
                })
            }
        };
        Ok(action)
    }

    fn lookup(&self, target: &str) -> Result<StateId, CompilationError> {
        self.index
            .get(target)
            .copied()
            .ok_or_else(|| CompilationError::UndeclaredState {
                language: self.language.to_string(),
                state: target.to_string(),
                referenced_from: self.state.to_string(),
            })
    }
}

fn flatten(
    language: &str,
    index: &IndexMap<String, StateId>,
    entries: &[Vec<Entry>],
    owner: StateId,
    current: StateId,
    visiting: &mut Vec<StateId>,
    out: &mut Vec<Rule>,
) -> Result<(), CompilationError> {
    for entry in &entries[current] {
        match entry {
            Entry::Include(target) => {
                if visiting.contains(target) {
                    let state = index
                        .get_index(*target)
                        .map(|(name, _)| name.clone())
                        .unwrap_or_default();
                    return Err(CompilationError::IncludeCycle {
                        language: language.to_string(),
                        state,
                    });
                }
                visiting.push(*target);
                flatten(language, index, entries, owner, *target, visiting, out)?;
                visiting.pop();
            }
            Entry::Rule(pending) => {
                let action = match pending.action {
                    PendingAction::Resolved(action) => action,
                    PendingAction::PushSelf => Action::Push(owner),
                };
                out.push(Rule {
                    matcher: pending.matcher.clone(),
                    emit: pending.emit.clone(),
                    action,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn strings() -> GrammarSpec {
        GrammarSpec::new("Demo")
            .alias("demo")
            .state(
                "root",
                vec![
                    RuleSpec::include("space"),
                    RuleSpec::token("\"", TokenKind::StringDouble).push("string"),
                    RuleSpec::token(r"\w+", TokenKind::Name),
                ],
            )
            .state(
                "space",
                vec![RuleSpec::token(r"\s+", TokenKind::Whitespace)],
            )
            .state(
                "string",
                vec![
                    RuleSpec::token("\"", TokenKind::StringDouble).pop(1),
                    RuleSpec::token(r#"[^"]+"#, TokenKind::StringDouble),
                ],
            )
    }

    #[test]
    fn test_compiles_and_flattens_includes() {
        let rules = compile(strings()).unwrap();
        assert_eq!(rules.name(), "Demo");
        assert_eq!(rules.state_count(), 3);
        let root = rules.state(rules.root());
        assert_eq!(root.name, "root");
        assert_eq!(root.rules.len(), 3);
        assert_eq!(root.rules[0].matcher.pattern(), r"\s+");
        assert_eq!(
            root.rules[1].action,
            Action::Push(rules.state_id("string").unwrap())
        );
    }

    #[test]
    fn test_missing_root() {
        let spec = GrammarSpec::new("NoRoot").state("other", vec![]);
        assert_eq!(
            compile(spec).unwrap_err(),
            CompilationError::MissingRoot {
                language: "NoRoot".into()
            }
        );
    }

    #[test]
    fn test_undeclared_state() {
        let spec = GrammarSpec::new("Bad").state(
            "root",
            vec![RuleSpec::token("x", TokenKind::Text).push("nowhere")],
        );
        assert_eq!(
            compile(spec).unwrap_err(),
            CompilationError::UndeclaredState {
                language: "Bad".into(),
                state: "nowhere".into(),
                referenced_from: "root".into(),
            }
        );
    }

    #[test]
    fn test_undeclared_include() {
        let spec = GrammarSpec::new("Bad").state("root", vec![RuleSpec::include("ghost")]);
        assert!(matches!(
            compile(spec),
            Err(CompilationError::UndeclaredState { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let spec = GrammarSpec::new("Bad").state(
            "root",
            vec![
                RuleSpec::token("ok", TokenKind::Text),
                RuleSpec::token("(", TokenKind::Text),
            ],
        );
        match compile(spec) {
            Err(CompilationError::InvalidPattern { state, rule, .. }) => {
                assert_eq!(state, "root");
                assert_eq!(rule, 1);
            }
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
    }

    #[test]
    fn test_group_count_mismatch() {
        let spec = GrammarSpec::new("Bad").state(
            "root",
            vec![RuleSpec::groups("(a)(b)", vec![TokenKind::Name])],
        );
        assert!(matches!(
            compile(spec),
            Err(CompilationError::GroupCountMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_conflicting_actions_and_zero_pop() {
        let both = GrammarSpec::new("Bad").state(
            "root",
            vec![RuleSpec::token("a", TokenKind::Text).push("root").pop(1)],
        );
        assert!(matches!(
            compile(both),
            Err(CompilationError::ConflictingActions { .. })
        ));

        let zero = GrammarSpec::new("Bad").state(
            "root",
            vec![RuleSpec::token("a", TokenKind::Text).pop(0)],
        );
        assert!(matches!(
            compile(zero),
            Err(CompilationError::InvalidPop { .. })
        ));
    }

    #[test]
    fn test_include_cycle() {
        let spec = GrammarSpec::new("Loop")
            .state("root", vec![RuleSpec::include("a")])
            .state("a", vec![RuleSpec::include("b")])
            .state("b", vec![RuleSpec::include("a")]);
        assert!(matches!(
            compile(spec),
            Err(CompilationError::IncludeCycle { .. })
        ));
    }

    #[test]
    fn test_push_self_resolves_to_including_state() {
        let spec = GrammarSpec::new("Nest")
            .state(
                "root",
                vec![RuleSpec::token(r"/\*", TokenKind::CommentMultiline).push("comment")],
            )
            .state("comment", vec![RuleSpec::include("nesting")])
            .state(
                "nesting",
                vec![RuleSpec::token(r"/\*", TokenKind::CommentMultiline).push(PUSH_SELF)],
            );
        let rules = compile(spec).unwrap();
        let comment = rules.state_id("comment").unwrap();
        assert_eq!(rules.state(comment).rules[0].action, Action::Push(comment));
    }

    #[test]
    fn test_default_rule_is_zero_width() {
        let spec = GrammarSpec::new("Default")
            .state("root", vec![RuleSpec::default_transition().push("inner")])
            .state("inner", vec![]);
        let rules = compile(spec).unwrap();
        let rule = &rules.state(rules.root()).rules[0];
        assert_eq!(rule.emit, Emit::Nothing);
        assert_eq!(rule.matcher.end_at("abc", 1), Some(1));
    }
}
