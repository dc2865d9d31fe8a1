//! Token model shared by the lexer engine, the signature extractor and the formatters.
//!
//!     Token kinds form a shallow hierarchy printed in dotted form (`Keyword.Type`,
//!     `Literal.String.Double`). The enum itself is flat so kinds stay `Copy` and cheap to
//!     compare; the hierarchy lives in [`TokenKind::parent`], and [`TokenKind::is_a`] is the
//!     subtype test consumers use ("is this some kind of keyword?").
//!
//!     A [`Token`] borrows its text from the tokenized input. Tokens produced for one input never
//!     overlap and, concatenated in order, reproduce the input byte-for-byte (see
//!     [`detokenize`]).

use serde::de::{self, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Classification of a lexed span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Text,
    Whitespace,
    /// Input no rule of the active state could match.
    Error,

    Keyword,
    KeywordConstant,
    KeywordDeclaration,
    KeywordNamespace,
    KeywordType,

    Name,
    NameAttribute,
    NameBuiltin,
    NameClass,
    NameConstant,
    NameDecorator,
    NameFunction,
    NameLabel,
    NameNamespace,
    NameVariable,

    Literal,
    String,
    StringBacktick,
    StringChar,
    StringDoc,
    StringDouble,
    StringEscape,
    StringHeredoc,
    StringInterpol,
    StringRegex,
    StringSingle,
    StringSymbol,
    Number,
    NumberBin,
    NumberFloat,
    NumberHex,
    NumberInteger,
    NumberOct,

    Operator,
    OperatorWord,
    Punctuation,

    Comment,
    CommentMultiline,
    CommentPreproc,
    CommentSingle,
    CommentSpecial,
}

impl TokenKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [TokenKind] = &[
        TokenKind::Text,
        TokenKind::Whitespace,
        TokenKind::Error,
        TokenKind::Keyword,
        TokenKind::KeywordConstant,
        TokenKind::KeywordDeclaration,
        TokenKind::KeywordNamespace,
        TokenKind::KeywordType,
        TokenKind::Name,
        TokenKind::NameAttribute,
        TokenKind::NameBuiltin,
        TokenKind::NameClass,
        TokenKind::NameConstant,
        TokenKind::NameDecorator,
        TokenKind::NameFunction,
        TokenKind::NameLabel,
        TokenKind::NameNamespace,
        TokenKind::NameVariable,
        TokenKind::Literal,
        TokenKind::String,
        TokenKind::StringBacktick,
        TokenKind::StringChar,
        TokenKind::StringDoc,
        TokenKind::StringDouble,
        TokenKind::StringEscape,
        TokenKind::StringHeredoc,
        TokenKind::StringInterpol,
        TokenKind::StringRegex,
        TokenKind::StringSingle,
        TokenKind::StringSymbol,
        TokenKind::Number,
        TokenKind::NumberBin,
        TokenKind::NumberFloat,
        TokenKind::NumberHex,
        TokenKind::NumberInteger,
        TokenKind::NumberOct,
        TokenKind::Operator,
        TokenKind::OperatorWord,
        TokenKind::Punctuation,
        TokenKind::Comment,
        TokenKind::CommentMultiline,
        TokenKind::CommentPreproc,
        TokenKind::CommentSingle,
        TokenKind::CommentSpecial,
    ];

    /// Dotted name, e.g. `Literal.String.Double`.
    pub fn name(self) -> &'static str {
        use TokenKind::*;
        match self {
            Text => "Text",
            Whitespace => "Whitespace",
            Error => "Error",
            Keyword => "Keyword",
            KeywordConstant => "Keyword.Constant",
            KeywordDeclaration => "Keyword.Declaration",
            KeywordNamespace => "Keyword.Namespace",
            KeywordType => "Keyword.Type",
            Name => "Name",
            NameAttribute => "Name.Attribute",
            NameBuiltin => "Name.Builtin",
            NameClass => "Name.Class",
            NameConstant => "Name.Constant",
            NameDecorator => "Name.Decorator",
            NameFunction => "Name.Function",
            NameLabel => "Name.Label",
            NameNamespace => "Name.Namespace",
            NameVariable => "Name.Variable",
            Literal => "Literal",
            String => "Literal.String",
            StringBacktick => "Literal.String.Backtick",
            StringChar => "Literal.String.Char",
            StringDoc => "Literal.String.Doc",
            StringDouble => "Literal.String.Double",
            StringEscape => "Literal.String.Escape",
            StringHeredoc => "Literal.String.Heredoc",
            StringInterpol => "Literal.String.Interpol",
            StringRegex => "Literal.String.Regex",
            StringSingle => "Literal.String.Single",
            StringSymbol => "Literal.String.Symbol",
            Number => "Literal.Number",
            NumberBin => "Literal.Number.Bin",
            NumberFloat => "Literal.Number.Float",
            NumberHex => "Literal.Number.Hex",
            NumberInteger => "Literal.Number.Integer",
            NumberOct => "Literal.Number.Oct",
            Operator => "Operator",
            OperatorWord => "Operator.Word",
            Punctuation => "Punctuation",
            Comment => "Comment",
            CommentMultiline => "Comment.Multiline",
            CommentPreproc => "Comment.Preproc",
            CommentSingle => "Comment.Single",
            CommentSpecial => "Comment.Special",
        }
    }

    /// The kind one level up the hierarchy. Top-level kinds have no parent.
    pub fn parent(self) -> Option<TokenKind> {
        use TokenKind::*;
        match self {
            Text | Whitespace | Error | Keyword | Name | Literal | Operator | Punctuation
            | Comment => None,
            KeywordConstant | KeywordDeclaration | KeywordNamespace | KeywordType => Some(Keyword),
            NameAttribute | NameBuiltin | NameClass | NameConstant | NameDecorator
            | NameFunction | NameLabel | NameNamespace | NameVariable => Some(Name),
            String | Number => Some(Literal),
            StringBacktick | StringChar | StringDoc | StringDouble | StringEscape
            | StringHeredoc | StringInterpol | StringRegex | StringSingle | StringSymbol => {
                Some(String)
            }
            NumberBin | NumberFloat | NumberHex | NumberInteger | NumberOct => Some(Number),
            OperatorWord => Some(Operator),
            CommentMultiline | CommentPreproc | CommentSingle | CommentSpecial => Some(Comment),
        }
    }

    /// True when `self` is `ancestor` or one of its descendants.
    pub fn is_a(self, ancestor: TokenKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Whitespace and comments: tokens that carry no structure.
    pub fn is_trivia(self) -> bool {
        self == TokenKind::Whitespace || self.is_a(TokenKind::Comment)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a dotted kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown token kind `{0}`")]
pub struct UnknownTokenKind(pub std::string::String);

impl FromStr for TokenKind {
    type Err = UnknownTokenKind;

    /// Accepts the canonical dotted name, an optional `Token.` prefix, and the
    /// `String.*` / `Number.*` shorthands for literal kinds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix("Token.").unwrap_or(trimmed);
        let lookup = |name: &str| TokenKind::ALL.iter().copied().find(|k| k.name() == name);

        lookup(bare)
            .or_else(|| {
                if bare.starts_with("String") || bare.starts_with("Number") {
                    lookup(&format!("Literal.{}", bare))
                } else {
                    None
                }
            })
            .ok_or_else(|| UnknownTokenKind(s.to_string()))
    }
}

impl Serialize for TokenKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for TokenKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = std::string::String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

/// A classified span of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    /// Byte offset of the first byte.
    pub start: usize,
    /// Byte offset one past the last byte.
    pub end: usize,
    pub text: &'src str,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, start: usize, text: &'src str) -> Self {
        Self {
            kind,
            start,
            end: start + text.len(),
            text,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }
}

impl Serialize for Token<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Token", 4)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("start", &self.start)?;
        state.serialize_field("end", &self.end)?;
        state.serialize_field("text", self.text)?;
        state.end()
    }
}

/// Rebuild the source text from a token sequence.
pub fn detokenize(tokens: &[Token<'_>]) -> std::string::String {
    let mut out = std::string::String::with_capacity(tokens.iter().map(|t| t.text.len()).sum());
    for token in tokens {
        out.push_str(token.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_round_trips_through_its_name() {
        for kind in TokenKind::ALL {
            assert_eq!(kind.name().parse::<TokenKind>(), Ok(*kind));
        }
    }

    #[test]
    fn test_literal_shorthand_and_token_prefix() {
        assert_eq!("String.Double".parse(), Ok(TokenKind::StringDouble));
        assert_eq!("Number.Hex".parse(), Ok(TokenKind::NumberHex));
        assert_eq!("Token.Keyword.Type".parse(), Ok(TokenKind::KeywordType));
        assert!("Keyword.Bogus".parse::<TokenKind>().is_err());
    }

    #[test]
    fn test_hierarchy() {
        assert!(TokenKind::KeywordType.is_a(TokenKind::Keyword));
        assert!(TokenKind::StringEscape.is_a(TokenKind::Literal));
        assert!(TokenKind::NumberFloat.is_a(TokenKind::Number));
        assert!(!TokenKind::NameFunction.is_a(TokenKind::Keyword));
        assert!(TokenKind::CommentPreproc.is_trivia());
        assert!(!TokenKind::Text.is_trivia());
    }

    #[test]
    fn test_every_parent_is_listed() {
        for kind in TokenKind::ALL {
            if let Some(parent) = kind.parent() {
                assert!(TokenKind::ALL.contains(&parent));
                assert!(kind.name().starts_with(parent.name()));
            }
        }
    }

    #[test]
    fn test_serializes_dotted_names() {
        let token = Token::new(TokenKind::NameFunction, 4, "add");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"Name.Function","start":4,"end":7,"text":"add"}"#
        );
        let kind: TokenKind = serde_json::from_str("\"Comment.Single\"").unwrap();
        assert_eq!(kind, TokenKind::CommentSingle);
    }

    #[test]
    fn test_detokenize() {
        let tokens = vec![
            Token::new(TokenKind::Keyword, 0, "def"),
            Token::new(TokenKind::Whitespace, 3, " "),
            Token::new(TokenKind::NameFunction, 4, "f"),
        ];
        assert_eq!(detokenize(&tokens), "def f");
        assert_eq!(tokens[2].span(), 4..5);
    }
}
