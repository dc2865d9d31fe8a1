//! The language registry as seen by library users.

use lexsig::{detokenize, extract, tokenize, LanguageFamily, Registry, RegistryError, TokenKind};
use std::sync::Arc;

const MINI: &str = r#"
name: Mini
aliases: [mini, mn]
filenames: ['*.mini']
family: indent-def
states:
  root:
    - match: '\s+'
      token: Whitespace
    - match: '--.*'
      token: Comment.Single
    - match: '\bdef\b'
      token: Keyword.Declaration
    - match: '[A-Za-z_]\w*'
      token: Name
    - match: '[(),:]'
      token: Punctuation
"#;

#[test]
fn test_builtin_languages() {
    let languages = Registry::global().languages();
    let names: Vec<_> = languages.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(
        names,
        ["C", "Go", "Java", "JavaScript", "JSON", "Python", "Ruby", "Rust", "Text"]
    );

    let family = |name: &str| {
        languages
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.family)
    };
    assert_eq!(family("Python"), Some(LanguageFamily::IndentDef));
    assert_eq!(family("Go"), Some(LanguageFamily::BraceKeyword));
    assert_eq!(family("Java"), Some(LanguageFamily::BraceTyped));
    assert_eq!(family("Ruby"), Some(LanguageFamily::EndKeyword));
    assert_eq!(family("JSON"), Some(LanguageFamily::Plain));
}

#[test]
fn test_global_resolution_is_cached() {
    let first = Registry::global().resolve("ruby").unwrap();
    let second = Registry::global().resolve("RB").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_user_grammar_drives_extraction() {
    let registry = Registry::new();
    registry.register_yaml(MINI).unwrap();
    assert!(registry.contains("mn"));

    let info = registry
        .languages()
        .into_iter()
        .find(|l| l.name == "Mini")
        .unwrap();
    assert_eq!(info.filenames, vec!["*.mini".to_string()]);

    let rules = registry.resolve("mini").unwrap();
    let source = "-- tools\ndef scale(v, k):\n    ret v\n";
    let tokens: Vec<_> = tokenize(source, &rules).collect();
    assert_eq!(detokenize(&tokens), source);
    assert_eq!(tokens[0].kind, TokenKind::CommentSingle);
    assert!(tokens.iter().all(|t| t.kind != TokenKind::Error));

    let found = extract(tokens, rules.family());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "scale");
    assert_eq!(found[0].parameters, "v, k");
    assert_eq!(found[0].start_line, 2);
}

#[test]
fn test_broken_user_grammar_is_rejected() {
    let registry = Registry::new();
    let broken = MINI.replace(r"'[A-Za-z_]\w*'", "'[A-Za-z_'");
    assert!(matches!(
        registry.register_yaml(&broken),
        Err(RegistryError::Compilation(_))
    ));
    assert!(!registry.contains("mini"));
    assert_eq!(registry.resolve_or_plain("mini").name(), "Text");
}
