//! Language registry.
//!
//! Maps language names and aliases (case-insensitive) to compiled [`RuleSet`]s. The built-in
//! grammars are parsed from embedded YAML on first use but only compiled when a language is first
//! resolved; the compiled set is then cached for the lifetime of the registry.
//!
//! Reads take a shared lock. The exclusive lock is taken only to compile a built-in for the
//! first time or to register a new grammar.

use crate::error::RegistryError;
use crate::extraction::LanguageFamily;
use crate::lexing::{compile, GrammarSpec, RuleSet};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("python", include_str!("../grammars/python.yaml")),
    ("javascript", include_str!("../grammars/javascript.yaml")),
    ("go", include_str!("../grammars/go.yaml")),
    ("rust", include_str!("../grammars/rust.yaml")),
    ("c", include_str!("../grammars/c.yaml")),
    ("java", include_str!("../grammars/java.yaml")),
    ("ruby", include_str!("../grammars/ruby.yaml")),
    ("json", include_str!("../grammars/json.yaml")),
];

static BUILTINS: Lazy<Vec<GrammarSpec>> = Lazy::new(|| {
    BUILTIN_SOURCES
        .iter()
        .filter_map(|(file, source)| match GrammarSpec::from_yaml(source) {
            Ok(spec) => Some(spec),
            Err(err) => {
                tracing::error!(grammar = %file, error = %err, "built-in grammar does not parse");
                None
            }
        })
        .collect()
});

static PLAIN_TEXT: Lazy<Arc<RuleSet>> = Lazy::new(|| {
    let spec = GrammarSpec::plain_text();
    let name = spec.name.clone();
    Arc::new(compile(spec).unwrap_or_else(|err| {
        tracing::error!(error = %err, "plain text grammar does not compile");
        RuleSet::bare(&name)
    }))
});

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Summary of a registered language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub name: String,
    pub aliases: Vec<String>,
    pub family: LanguageFamily,
    pub filenames: Vec<String>,
}

#[derive(Debug)]
struct Entry {
    spec: GrammarSpec,
    compiled: Option<Arc<RuleSet>>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by lower-cased language name.
    entries: IndexMap<String, Entry>,
    /// Lower-cased alias -> entry key.
    aliases: HashMap<String, String>,
}

impl Inner {
    fn key_for(&self, name: &str) -> Option<&String> {
        self.aliases.get(&normalize(name))
    }

    /// Insert or replace an entry and point its aliases at it.
    fn insert(&mut self, spec: GrammarSpec, compiled: Option<Arc<RuleSet>>) {
        let key = normalize(&spec.name);
        self.aliases.retain(|_, owner| owner != &key);

        for alias in std::iter::once(&spec.name).chain(spec.aliases.iter()) {
            let alias = normalize(alias);
            if let Some(previous) = self.aliases.insert(alias.clone(), key.clone()) {
                if previous != key {
                    tracing::info!(alias = %alias, from = %previous, to = %key, "alias reassigned");
                }
            }
        }
        self.entries.insert(key, Entry { spec, compiled });
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Name/alias to rule set mapping with a lazily populated compile cache.
#[derive(Debug)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry holding the plain-text fallback and every built-in grammar.
    pub fn new() -> Self {
        let registry = Self::empty();
        {
            let mut inner = registry.inner.write();
            for spec in BUILTINS.iter() {
                inner.insert(spec.clone(), None);
            }
        }
        registry
    }

    /// A registry holding only the plain-text fallback.
    pub fn empty() -> Self {
        let mut inner = Inner::default();
        let plain = Registry::plain_text();
        inner.insert(plain.spec().clone(), Some(plain));
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// The rule set that classifies everything as `Text`.
    pub fn plain_text() -> Arc<RuleSet> {
        Arc::clone(&PLAIN_TEXT)
    }

    /// Look up a language by name or alias, compiling it on first use.
    pub fn resolve(&self, name: &str) -> Result<Arc<RuleSet>, RegistryError> {
        {
            let inner = self.inner.read();
            let key = inner
                .key_for(name)
                .ok_or_else(|| RegistryError::LanguageNotFound(name.to_string()))?;
            if let Some(rules) = inner.entries.get(key).and_then(|e| e.compiled.as_ref()) {
                return Ok(Arc::clone(rules));
            }
        }

        let mut inner = self.inner.write();
        let key = inner
            .key_for(name)
            .cloned()
            .ok_or_else(|| RegistryError::LanguageNotFound(name.to_string()))?;
        let entry = inner
            .entries
            .get_mut(&key)
            .ok_or_else(|| RegistryError::LanguageNotFound(name.to_string()))?;
        if let Some(rules) = &entry.compiled {
            return Ok(Arc::clone(rules));
        }
        let rules = Arc::new(compile(entry.spec.clone())?);
        entry.compiled = Some(Arc::clone(&rules));
        Ok(rules)
    }

    /// Like [`resolve`](Self::resolve), falling back to plain text on any failure.
    pub fn resolve_or_plain(&self, name: &str) -> Arc<RuleSet> {
        self.resolve(name).unwrap_or_else(|err| {
            tracing::warn!(language = %name, error = %err, "falling back to plain text");
            Registry::plain_text()
        })
    }

    /// Register an already compiled rule set.
    pub fn register(&self, rules: RuleSet) -> Arc<RuleSet> {
        let mut inner = self.inner.write();
        if let Some(existing) = Self::identical(&inner, rules.spec()) {
            return existing;
        }
        let rules = Arc::new(rules);
        tracing::debug!(language = %rules.name(), "registered grammar");
        inner.insert(rules.spec().clone(), Some(Arc::clone(&rules)));
        rules
    }

    /// Compile and register a grammar. On failure the registry is left untouched.
    pub fn register_grammar(&self, spec: GrammarSpec) -> Result<Arc<RuleSet>, RegistryError> {
        {
            let inner = self.inner.read();
            if let Some(existing) = Self::identical(&inner, &spec) {
                return Ok(existing);
            }
        }
        let rules = compile(spec)?;
        Ok(self.register(rules))
    }

    /// Parse a YAML (or JSON) grammar description and register it.
    pub fn register_yaml(&self, source: &str) -> Result<Arc<RuleSet>, RegistryError> {
        self.register_grammar(GrammarSpec::from_yaml(source)?)
    }

    /// An already compiled entry whose description equals `spec`.
    fn identical(inner: &Inner, spec: &GrammarSpec) -> Option<Arc<RuleSet>> {
        let entry = inner.entries.get(&normalize(&spec.name))?;
        if &entry.spec != spec {
            return None;
        }
        entry.compiled.clone()
    }

    /// Registered languages, sorted by name.
    pub fn languages(&self) -> Vec<LanguageInfo> {
        let inner = self.inner.read();
        let mut languages: Vec<LanguageInfo> = inner
            .entries
            .iter()
            .map(|(key, entry)| {
                let aliases = entry
                    .spec
                    .aliases
                    .iter()
                    .filter(|alias| inner.aliases.get(&normalize(alias)) == Some(key))
                    .cloned()
                    .collect();
                LanguageInfo {
                    name: entry.spec.name.clone(),
                    aliases,
                    family: entry.spec.family,
                    filenames: entry.spec.filenames.clone(),
                }
            })
            .collect();
        languages.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        languages
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().key_for(name).is_some()
    }
}
