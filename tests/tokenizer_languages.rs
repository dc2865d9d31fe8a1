//! Tokenization of small, hand-checked snippets in each built-in language.

use lexsig::{detokenize, tokenize, tokenize_language, Registry, RegistryError, Token, TokenKind};
use rstest::rstest;

fn lex(source: &str, language: &str) -> Vec<(TokenKind, String)> {
    let rules = Registry::global()
        .resolve(language)
        .expect("built-in grammar");
    tokenize(source, &rules)
        .map(|t| (t.kind, t.text.to_string()))
        .collect()
}

fn expect(parts: &[(TokenKind, &str)]) -> Vec<(TokenKind, String)> {
    parts.iter().map(|(k, t)| (*k, t.to_string())).collect()
}

#[test]
fn test_python_def_header() {
    use TokenKind::*;
    assert_eq!(
        lex("def add(a, b):", "python"),
        expect(&[
            (KeywordDeclaration, "def"),
            (Whitespace, " "),
            (NameFunction, "add"),
            (Punctuation, "("),
            (Name, "a"),
            (Punctuation, ","),
            (Whitespace, " "),
            (Name, "b"),
            (Punctuation, ")"),
            (Punctuation, ":"),
        ])
    );
}

#[test]
fn test_python_fstring_interpolation() {
    use TokenKind::*;
    assert_eq!(
        lex("f\"x{y}z\"", "python"),
        expect(&[
            (StringDouble, "f\""),
            (StringDouble, "x"),
            (StringInterpol, "{"),
            (Name, "y"),
            (StringInterpol, "}"),
            (StringDouble, "z"),
            (StringDouble, "\""),
        ])
    );
}

#[test]
fn test_javascript_template_interpolation() {
    use TokenKind::*;
    assert_eq!(
        lex("`a${b}c`", "javascript"),
        expect(&[
            (StringBacktick, "`"),
            (StringBacktick, "a"),
            (StringInterpol, "${"),
            (Name, "b"),
            (StringInterpol, "}"),
            (StringBacktick, "c"),
            (StringBacktick, "`"),
        ])
    );
}

#[test]
fn test_rust_block_comments_nest() {
    use TokenKind::*;
    assert_eq!(
        lex("/* a /* b */ c */x", "rust"),
        expect(&[
            (CommentMultiline, "/*"),
            (CommentMultiline, " a "),
            (CommentMultiline, "/*"),
            (CommentMultiline, " b "),
            (CommentMultiline, "*/"),
            (CommentMultiline, " c "),
            (CommentMultiline, "*/"),
            (Name, "x"),
        ])
    );
}

#[test]
fn test_c_preprocessor_lines() {
    use TokenKind::*;
    assert_eq!(
        lex("#include <stdio.h>\nint x;", "c"),
        expect(&[
            (CommentPreproc, "#include <stdio.h>"),
            (Whitespace, "\n"),
            (KeywordType, "int"),
            (Whitespace, " "),
            (Name, "x"),
            (Punctuation, ";"),
        ])
    );
}

#[test]
fn test_c_preprocessor_continuation_and_indent() {
    let tokens = lex("#define X \\\n  1\nint a;\n  #endif", "c");
    assert_eq!(tokens[0], (TokenKind::CommentPreproc, "#define X \\\n  1".to_string()));
    assert_eq!(
        tokens.last(),
        Some(&(TokenKind::CommentPreproc, "  #endif".to_string()))
    );
}

#[test]
fn test_ruby_heredoc() {
    use TokenKind::*;
    assert_eq!(
        lex("x = <<~EOS\n  body\nEOS\ny", "ruby"),
        expect(&[
            (Name, "x"),
            (Whitespace, " "),
            (Operator, "="),
            (Whitespace, " "),
            (StringHeredoc, "<<~EOS"),
            (Whitespace, "\n"),
            (StringHeredoc, "  body\n"),
            (StringHeredoc, "EOS"),
            (Whitespace, "\n"),
            (Name, "y"),
        ])
    );
}

#[test]
fn test_json_keys_are_attributes() {
    use TokenKind::*;
    assert_eq!(
        lex("{\"k\": 1}", "json"),
        expect(&[
            (Punctuation, "{"),
            (NameAttribute, "\"k\""),
            (Punctuation, ":"),
            (Whitespace, " "),
            (NumberInteger, "1"),
            (Punctuation, "}"),
        ])
    );
}

#[test]
fn test_unmatched_character_is_an_error_token() {
    let tokens = lex("[@]", "json");
    assert_eq!(tokens[1], (TokenKind::Error, "@".to_string()));
    assert_eq!(tokens.len(), 3);
}

#[test]
fn test_go_raw_string_spans_lines() {
    let tokens = lex("`a\nb`", "go");
    assert_eq!(tokens, vec![(TokenKind::StringBacktick, "`a\nb`".to_string())]);
}

#[test]
fn test_unknown_language_falls_back_to_plain_text() {
    assert!(matches!(
        tokenize_language("x = 1", "klingon"),
        Err(RegistryError::LanguageNotFound(_))
    ));
    let plain = Registry::global().resolve_or_plain("klingon");
    let tokens: Vec<Token<'_>> = tokenize("x = 1\n", &plain).collect();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Text);
}

#[rstest]
#[case::python("python", "class A:\n    def f(self, *a, **k) -> int:\n        return f'{a!r}'\n")]
#[case::javascript("javascript", "const re = /a[/]b/g;\nclass B { get x() { return `${1}`; } }\n")]
#[case::go("go", "func (s *S) F(a, b int) (int, error) {\n\treturn 0, nil\n}\n")]
#[case::rust("rust", "#[derive(Debug)]\nfn f<'a>(x: &'a str) -> Option<char> { x.chars().next() }\n")]
#[case::c("c", "static const char *name(int i) { return i ? \"a\" : 'b'; }\n")]
#[case::java("java", "@Override\npublic String toString() { return \"\"\"\n  hi\n  \"\"\"; }\n")]
#[case::ruby("ruby", "def self.x?(a, b: 1)\n  \"#{a}\" =~ /b/\nend\n")]
#[case::json("json", "{\"a\": [1, -2.5e3, true, null]}\n")]
fn test_samples_round_trip(#[case] language: &str, #[case] source: &str) {
    let tokens = tokenize_language(source, language).unwrap();
    assert_eq!(detokenize(&tokens), source);
    assert!(
        tokens.iter().all(|t| t.kind != TokenKind::Error),
        "{}: {:?}",
        language,
        tokens.iter().filter(|t| t.kind == TokenKind::Error).collect::<Vec<_>>()
    );
}

#[rstest]
#[case("py")]
#[case("JS")]
#[case("golang")]
#[case("rs")]
#[case("c++")]
#[case("rb")]
#[case("jsonc")]
fn test_aliases_resolve(#[case] alias: &str) {
    assert!(Registry::global().resolve(alias).is_ok());
}
