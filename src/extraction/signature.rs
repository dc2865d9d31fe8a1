//! Signature records and parameter parsing.

use serde::Serialize;

/// One extracted function or method declaration.
///
/// Field order is the serialization order and is kept stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    /// Parameter list text, whitespace-normalized, comments removed.
    pub parameters: String,
    pub params: Vec<Parameter>,
    pub returns: Option<String>,
    /// Dotted path of enclosing declarations; empty at top level.
    pub scope: String,
    /// 1-based line of the first header token.
    pub start_line: usize,
    /// 1-based line where the header ends.
    pub end_line: usize,
    /// The normalized header text.
    pub signature: String,
    /// The input ended before the header was complete.
    pub partial: bool,
}

impl Signature {
    /// `scope.name`, or just `name` at top level.
    pub fn qualified_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.scope, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    fn bare(name: &str) -> Self {
        Self {
            name: name.to_string(),
            annotation: None,
            default: None,
        }
    }
}

/// How a language spells an individual parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `name: Type = default`
    Annotated,
    /// `name: Type`, or Go's `name Type` with the type shared by preceding bare names.
    AnnotatedOrTrailing,
    /// `Type name`
    LeadingType,
    /// `name`, `name = default`, `key:`, `key: default`
    KeywordArgs,
}

/// Whitespace-normalize a raw parameter or header fragment.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a parameter list into individual parameters.
///
/// Splitting only happens on commas outside brackets and quotes. Unparseable pieces are kept
/// whole as the parameter name.
pub fn parse_parameters(raw: &str, style: ParamStyle) -> Vec<Parameter> {
    let pieces: Vec<&str> = split_top_level(raw, ',')
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if style == ParamStyle::LeadingType && pieces.len() == 1 && pieces[0] == "void" {
        return Vec::new();
    }

    let mut params: Vec<(Parameter, bool)> =
        pieces.into_iter().map(|p| parse_one(p, style)).collect();

    if style == ParamStyle::AnnotatedOrTrailing {
        // Go: `a, b int` gives `a` the type of `b`.
        let mut carried: Option<String> = None;
        for (param, trailing) in params.iter_mut().rev() {
            if *trailing {
                carried = param.annotation.clone();
            } else if param.annotation.is_none() && param.default.is_none() {
                param.annotation = carried.clone();
            } else {
                carried = None;
            }
        }
    }
    params.into_iter().map(|(param, _)| param).collect()
}

/// Parse one parameter. The flag reports a Go-style trailing type.
fn parse_one(piece: &str, style: ParamStyle) -> (Parameter, bool) {
    let (head, default) = match find_assignment(piece) {
        Some(at) => (
            piece[..at].trim(),
            Some(normalize(&piece[at + 1..])).filter(|d| !d.is_empty()),
        ),
        None => (piece, None),
    };

    let mut param = match style {
        ParamStyle::Annotated => annotated(head),
        ParamStyle::AnnotatedOrTrailing => {
            if find_colon(head).is_some() {
                annotated(head)
            } else if let Some((name, ty)) = split_trailing_type(head) {
                let param = Parameter {
                    name: name.to_string(),
                    annotation: Some(normalize(ty)),
                    default,
                };
                return (param, true);
            } else {
                Parameter::bare(head)
            }
        }
        ParamStyle::LeadingType => leading_type(head),
        ParamStyle::KeywordArgs => keyword_arg(head, &default),
    };
    if param.default.is_none() {
        param.default = default;
    }
    (param, false)
}

fn annotated(head: &str) -> Parameter {
    match find_colon(head) {
        Some(at) => {
            let name = head[..at].trim();
            let name = name.strip_prefix("mut ").unwrap_or(name).trim();
            Parameter {
                name: name.to_string(),
                annotation: Some(normalize(&head[at + 1..])).filter(|a| !a.is_empty()),
                default: None,
            }
        }
        None => Parameter::bare(head),
    }
}

fn split_trailing_type(head: &str) -> Option<(&str, &str)> {
    let at = head.find(char::is_whitespace)?;
    let (name, ty) = (&head[..at], head[at..].trim());
    if ty.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some((name, ty))
}

fn leading_type(head: &str) -> Parameter {
    let mut body = head.trim_end();
    let mut suffix = String::new();
    while body.ends_with(']') {
        match body.rfind('[') {
            Some(open) => {
                suffix.insert_str(0, &body[open..]);
                body = body[..open].trim_end();
            }
            None => break,
        }
    }

    let name_start = body
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '$')
        .last()
        .map(|(i, _)| i);
    match name_start {
        Some(start) if start > 0 => {
            let annotation = format!("{}{}", normalize(&body[..start]), suffix);
            Parameter {
                name: body[start..].to_string(),
                annotation: Some(annotation).filter(|a| !a.is_empty()),
                default: None,
            }
        }
        _ => Parameter::bare(head),
    }
}

fn keyword_arg(head: &str, default: &Option<String>) -> Parameter {
    if default.is_none() {
        if let Some(at) = find_colon(head) {
            let value = normalize(&head[at + 1..]);
            return Parameter {
                name: head[..at].trim().to_string(),
                annotation: None,
                default: Some(value).filter(|v| !v.is_empty()),
            };
        }
    }
    Parameter::bare(head.trim_end_matches(':').trim())
}

/// Byte offset of a top-level `=` that is an assignment, not part of `==`, `=>`, `<=` and the like.
fn find_assignment(piece: &str) -> Option<usize> {
    let bytes = piece.as_bytes();
    top_level_positions(piece).into_iter().find(|&i| {
        bytes[i] == b'='
            && bytes.get(i + 1).map_or(true, |&b| b != b'=' && b != b'>')
            && (i == 0
                || !matches!(
                    bytes[i - 1],
                    b'=' | b'!' | b'<' | b'>' | b':' | b'+' | b'-' | b'*' | b'/'
                ))
    })
}

/// Byte offset of a top-level `:` that is not part of `::`.
fn find_colon(piece: &str) -> Option<usize> {
    let bytes = piece.as_bytes();
    top_level_positions(piece).into_iter().find(|&i| {
        bytes[i] == b':'
            && bytes.get(i + 1) != Some(&b':')
            && (i == 0 || bytes[i - 1] != b':')
    })
}

/// Offsets of the ASCII punctuation bytes that sit outside brackets and quotes.
fn top_level_positions(text: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            // `->` and `=>` are not closing brackets.
            '>' if i > 0 && matches!(text.as_bytes()[i - 1], b'-' | b'=') => {
                if depth == 0 {
                    positions.push(i);
                }
            }
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 && c.is_ascii_punctuation() => positions.push(i),
            _ => {}
        }
    }
    positions
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for at in top_level_positions(text) {
        if text[at..].starts_with(separator) {
            parts.push(&text[start..at]);
            start = at + separator.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}
