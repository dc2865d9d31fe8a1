//! Language families and their extraction tables.
//!
//! The extractor's state machine is shared by every language; a family only decides which
//! keywords open declarations and scopes, how bodies are delimited and how parameters are
//! spelled.

use super::signature::ParamStyle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LanguageFamily {
    /// Indentation blocks, `def` keyword (Python).
    IndentDef,
    /// Brace blocks, declaration keyword (JavaScript, Go, Rust).
    BraceKeyword,
    /// Brace blocks, type before the name (C, Java).
    BraceTyped,
    /// `end`-terminated blocks (Ruby).
    EndKeyword,
    /// No declarations.
    #[default]
    Plain,
}

impl LanguageFamily {
    pub const ALL: &'static [LanguageFamily] = &[
        LanguageFamily::IndentDef,
        LanguageFamily::BraceKeyword,
        LanguageFamily::BraceTyped,
        LanguageFamily::EndKeyword,
        LanguageFamily::Plain,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LanguageFamily::IndentDef => "indent-def",
            LanguageFamily::BraceKeyword => "brace-keyword",
            LanguageFamily::BraceTyped => "brace-typed",
            LanguageFamily::EndKeyword => "end-keyword",
            LanguageFamily::Plain => "plain",
        }
    }

    pub fn rules(self) -> &'static FamilyRules {
        match self {
            LanguageFamily::IndentDef => &INDENT_DEF,
            LanguageFamily::BraceKeyword => &BRACE_KEYWORD,
            LanguageFamily::BraceTyped => &BRACE_TYPED,
            LanguageFamily::EndKeyword => &END_KEYWORD,
            LanguageFamily::Plain => &PLAIN,
        }
    }
}

impl fmt::Display for LanguageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language family `{0}`")]
pub struct UnknownFamily(pub String);

impl FromStr for LanguageFamily {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        LanguageFamily::ALL
            .iter()
            .copied()
            .find(|family| family.name() == wanted)
            .ok_or_else(|| UnknownFamily(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    Indent,
    Brace,
    End,
    None,
}

/// Per-family transition parameters.
#[derive(Debug)]
pub struct FamilyRules {
    pub block: BlockStyle,
    /// Keywords that introduce a function header.
    pub declaration_keywords: &'static [&'static str],
    /// Keywords that introduce a named scope (class, struct, module...).
    pub scope_keywords: &'static [&'static str],
    /// Scope keywords whose bodies allow `name(...) {` method shorthand.
    pub method_shorthand_scopes: &'static [&'static str],
    /// Declaration keywords that may be followed by a parenthesized receiver.
    pub receiver_keywords: &'static [&'static str],
    /// Declaration keywords whose anonymous form takes its name from `name = ` or `name: `.
    pub assignable_keywords: &'static [&'static str],
    /// `name = (...) =>` declares a function.
    pub arrow_functions: bool,
    /// Words that may precede a declaration without being part of its return type.
    pub modifiers: &'static [&'static str],
    /// Names that look like `name(` but never declare anything.
    pub non_callers: &'static [&'static str],
    /// `Type name(...)` declarations are recognized.
    pub typed_declarations: bool,
    pub param_style: ParamStyle,
}

impl FamilyRules {
    pub fn is_declaration_keyword(&self, word: &str) -> bool {
        self.declaration_keywords.contains(&word)
    }

    pub fn is_modifier(&self, word: &str) -> bool {
        self.modifiers.contains(&word)
    }

    pub fn is_non_caller(&self, word: &str) -> bool {
        self.non_callers.contains(&word)
    }
}

static INDENT_DEF: FamilyRules = FamilyRules {
    block: BlockStyle::Indent,
    declaration_keywords: &["def"],
    scope_keywords: &["class"],
    method_shorthand_scopes: &[],
    receiver_keywords: &[],
    assignable_keywords: &[],
    arrow_functions: false,
    modifiers: &["async"],
    non_callers: &[],
    typed_declarations: false,
    param_style: ParamStyle::Annotated,
};

static BRACE_KEYWORD: FamilyRules = FamilyRules {
    block: BlockStyle::Brace,
    declaration_keywords: &["function", "fn", "func"],
    scope_keywords: &[
        "class", "struct", "enum", "trait", "impl", "interface", "mod", "type", "union",
        "namespace",
    ],
    method_shorthand_scopes: &["class", "interface"],
    receiver_keywords: &["func"],
    assignable_keywords: &["function"],
    arrow_functions: true,
    modifiers: &[
        "pub", "async", "export", "default", "static", "const", "unsafe", "extern", "get", "set",
        "declare", "abstract", "public", "private", "protected", "readonly", "override",
    ],
    non_callers: &[
        "if", "for", "while", "switch", "catch", "return", "match", "loop", "typeof", "new",
        "super", "import", "require",
    ],
    typed_declarations: false,
    param_style: ParamStyle::AnnotatedOrTrailing,
};

static BRACE_TYPED: FamilyRules = FamilyRules {
    block: BlockStyle::Brace,
    declaration_keywords: &[],
    scope_keywords: &[
        "class", "struct", "interface", "enum", "union", "record", "namespace",
    ],
    method_shorthand_scopes: &[],
    receiver_keywords: &[],
    assignable_keywords: &[],
    arrow_functions: false,
    modifiers: &[
        "public", "private", "protected", "static", "final", "abstract", "synchronized",
        "native", "default", "extern", "inline", "transient", "strictfp", "virtual", "explicit",
    ],
    non_callers: &[
        "if", "for", "while", "switch", "catch", "return", "sizeof", "alignof", "typeof",
        "new", "throw", "case", "else", "do", "defined", "assert", "super", "this",
    ],
    typed_declarations: true,
    param_style: ParamStyle::LeadingType,
};

static END_KEYWORD: FamilyRules = FamilyRules {
    block: BlockStyle::End,
    declaration_keywords: &["def"],
    scope_keywords: &["class", "module"],
    method_shorthand_scopes: &[],
    receiver_keywords: &[],
    assignable_keywords: &[],
    arrow_functions: false,
    modifiers: &[],
    non_callers: &[],
    typed_declarations: false,
    param_style: ParamStyle::KeywordArgs,
};

static PLAIN: FamilyRules = FamilyRules {
    block: BlockStyle::None,
    declaration_keywords: &[],
    scope_keywords: &[],
    method_shorthand_scopes: &[],
    receiver_keywords: &[],
    assignable_keywords: &[],
    arrow_functions: false,
    modifiers: &[],
    non_callers: &[],
    typed_declarations: false,
    param_style: ParamStyle::Annotated,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_names_round_trip() {
        for family in LanguageFamily::ALL {
            assert_eq!(family.name().parse::<LanguageFamily>(), Ok(*family));
        }
        assert_eq!("Brace_Typed".parse(), Ok(LanguageFamily::BraceTyped));
        assert!("lisp".parse::<LanguageFamily>().is_err());
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&LanguageFamily::EndKeyword).unwrap();
        assert_eq!(json, "\"end-keyword\"");
        let family: LanguageFamily = serde_yaml::from_str("indent-def").unwrap();
        assert_eq!(family, LanguageFamily::IndentDef);
    }

    #[test]
    fn test_tables() {
        assert!(LanguageFamily::IndentDef.rules().is_declaration_keyword("def"));
        assert!(LanguageFamily::BraceKeyword.rules().scope_keywords.contains(&"impl"));
        assert!(LanguageFamily::BraceKeyword.rules().arrow_functions);
        assert!(!LanguageFamily::BraceTyped.rules().arrow_functions);
        assert!(LanguageFamily::BraceTyped.rules().typed_declarations);
        assert_eq!(LanguageFamily::Plain.rules().block, BlockStyle::None);
    }
}
