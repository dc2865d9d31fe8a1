//! The signature extraction state machine.
//!
//! Tokens are fed one at a time. The machine is either scanning for a declaration or inside a
//! header (a function header or a scope header such as `class Foo`). Confirmed headers open a
//! frame on the scope stack; a frame is closed by its family's terminator: the matching `}`,
//! a dedent, or the matching `end`. Being "in a body" is simply having an open function frame.
//!
//! Nothing is ever re-read. The only memory of the past is a bounded lookback of significant
//! tokens, used to recognize `Type name(` declarations and assigned anonymous functions.

use super::cursor::{LineTracker, Lookback};
use super::family::{BlockStyle, FamilyRules, LanguageFamily};
use super::signature::{normalize, parse_parameters, Signature};
use super::ExtractorOptions;
use crate::token::{Token, TokenKind};

/// Tokens after which Go's `func` starts a literal, not a declaration.
const FUNC_LITERAL_CONTEXT: &[&str] = &["=", ":=", ":", "(", ",", "return", "go", "defer"];

/// Tokens after which Ruby's `if`/`unless`/`while`/`until` open a block instead of modifying a
/// statement.
const RUBY_BLOCK_CONTEXT: &[&str] = &[
    "=", "+=", "-=", "||=", "&&=", "(", "[", ",", ";", "|", "{", "then", "else", "do", "and", "or",
    "not", "=>",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    /// A named scope; `shorthand` allows `name(...) {` methods directly inside it. Methods in
    /// an `interface` body never have one, so a line break ends them.
    Scope { shorthand: bool, interface: bool },
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Close {
    /// Closed by the `}` that returns the brace depth to this value.
    Brace(usize),
    /// Closed by a logical line indented at or below this column.
    Indent(usize),
    /// Closed by the `end` that returns the block depth to this value.
    End(usize),
}

#[derive(Debug, Clone)]
struct Frame {
    name: String,
    kind: FrameKind,
    close: Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Name,
    Receiver,
    BeforeParams,
    Params,
    BareParams,
    AfterParams,
    /// Past the `=>` of an arrow function.
    Arrow,
}

#[derive(Debug)]
struct FunctionHeader {
    stage: Stage,
    keyword: Option<&'static str>,
    name: Option<String>,
    /// Name taken from `name = function (...)`.
    assigned: Option<String>,
    /// `name = (...)`, a function only once `=>` follows.
    arrow: bool,
    receiver: Option<String>,
    receiver_names: Vec<String>,
    expect_member: bool,
    depth: usize,
    params: String,
    after: String,
    after_word: bool,
    returns_done: bool,
    typed_returns: Option<String>,
    text: String,
    start_line: usize,
    end_line: usize,
    indent: usize,
}

impl FunctionHeader {
    fn new(stage: Stage, start_line: usize, indent: usize) -> Self {
        Self {
            stage,
            keyword: None,
            name: None,
            assigned: None,
            arrow: false,
            receiver: None,
            receiver_names: Vec::new(),
            expect_member: false,
            depth: 0,
            params: String::new(),
            after: String::new(),
            after_word: false,
            returns_done: false,
            typed_returns: None,
            text: String::new(),
            start_line,
            end_line: start_line,
            indent,
        }
    }

    fn push_text(&mut self, text: &str, line: usize) {
        self.text.push_str(text);
        self.end_line = line;
    }
}

#[derive(Debug)]
struct ScopeHeader {
    shorthand: bool,
    interface: bool,
    name: Option<String>,
    after_for: bool,
    angle: usize,
    depth: usize,
    indent: usize,
}

#[derive(Debug)]
enum Phase {
    Scanning,
    Function(FunctionHeader),
    Scope(ScopeHeader),
}

/// How a confirmed function header continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    Open,
    None,
}

/// Push-based extractor for one token stream.
#[derive(Debug)]
pub struct Extractor<'src> {
    rules: &'static FamilyRules,
    options: ExtractorOptions,
    lines: LineTracker,
    lookback: Lookback<'src>,
    frames: Vec<Frame>,
    phase: Phase,
    brace_depth: usize,
    group_depth: usize,
    end_depth: usize,
    line_indent: usize,
    line_start: bool,
    loop_line: Option<usize>,
    signatures: Vec<Signature>,
}

impl<'src> Extractor<'src> {
    pub fn new(family: LanguageFamily, options: ExtractorOptions) -> Self {
        Self {
            rules: family.rules(),
            options,
            lines: LineTracker::new(),
            lookback: Lookback::new(options.lookback),
            frames: Vec::new(),
            phase: Phase::Scanning,
            brace_depth: 0,
            group_depth: 0,
            end_depth: 0,
            line_indent: 0,
            line_start: true,
            loop_line: None,
            signatures: Vec::new(),
        }
    }

    /// Signatures confirmed so far.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn feed(&mut self, token: Token<'src>) {
        if self.rules.block == BlockStyle::None {
            return;
        }
        let line = self.lines.line();
        self.line_start = self.lines.at_line_start();

        if token.is_trivia() {
            self.trivia(token);
            self.lines.advance(token.text, false);
            return;
        }

        if self.line_start {
            self.line_indent = self.lines.column();
            if self.rules.block == BlockStyle::Indent && self.group_depth == 0 {
                self.close_indented(self.line_indent);
            }
        }

        self.dispatch(token, line);
        self.track(token, line);
        self.lookback.push(token, line);
        self.lines.advance(token.text, true);
    }

    /// End of input. A function header still being read is emitted as a partial signature,
    /// unless only its shape suggested a declaration: an unconfirmed arrow, or a `name(` seen
    /// inside a function body, is more likely an expression.
    pub fn finish(mut self) -> Vec<Signature> {
        if let Phase::Function(header) = std::mem::replace(&mut self.phase, Phase::Scanning) {
            let speculative = header.keyword.is_none()
                && if header.arrow {
                    header.stage != Stage::Arrow
                } else {
                    self.in_function_body()
                };
            if header.name.is_some() && !speculative {
                self.record(header, true);
            }
        }
        self.signatures
    }

    fn trivia(&mut self, token: Token<'src>) {
        if let Phase::Function(header) = &mut self.phase {
            if token.kind == TokenKind::Whitespace {
                match header.stage {
                    Stage::Params | Stage::BareParams => header.params.push(' '),
                    Stage::AfterParams if !header.returns_done => header.after.push(' '),
                    _ => {}
                }
                header.text.push(' ');
            }
        }

        let newline = token.text.contains('\n')
            && (token.kind == TokenKind::Whitespace || token.text.ends_with('\n'));
        if newline && self.rules.block == BlockStyle::Brace {
            self.end_interface_method();
        }
        if newline && self.group_depth == 0 {
            self.newline();
        }
    }

    /// Go interface methods end at the line break.
    fn end_interface_method(&mut self) {
        let ends = match &self.phase {
            Phase::Function(header) => {
                header.stage == Stage::AfterParams
                    && header.depth == 0
                    && header.keyword.is_none()
                    && !header.arrow
                    && self.in_interface_body()
            }
            _ => false,
        };
        if !ends {
            return;
        }
        if let Phase::Function(header) = std::mem::replace(&mut self.phase, Phase::Scanning) {
            if self.options.include_declarations {
                self.confirm(header, Body::None);
            }
        }
    }

    /// A line break outside brackets.
    fn newline(&mut self) {
        match self.rules.block {
            BlockStyle::Indent => {
                // A Python header must be finished on its own line.
                if !matches!(self.phase, Phase::Scanning) {
                    self.phase = Phase::Scanning;
                }
            }
            BlockStyle::End => match std::mem::replace(&mut self.phase, Phase::Scanning) {
                Phase::Function(header) => match header.stage {
                    Stage::BeforeParams | Stage::BareParams | Stage::AfterParams => {
                        self.confirm(header, Body::Open)
                    }
                    _ => {}
                },
                Phase::Scope(header) => self.confirm_scope(header),
                Phase::Scanning => {}
            },
            BlockStyle::Brace | BlockStyle::None => {}
        }
    }

    fn dispatch(&mut self, token: Token<'src>, line: usize) {
        match std::mem::replace(&mut self.phase, Phase::Scanning) {
            Phase::Scanning => self.scan(token, line),
            Phase::Function(header) => self.function_header(header, token, line),
            Phase::Scope(header) => self.scope_header(header, token, line),
        }
    }

    fn scan(&mut self, token: Token<'src>, line: usize) {
        if token.kind == TokenKind::NameDecorator {
            return;
        }
        let after_dot = matches!(self.lookback.text(0), "." | "?.");

        if token.kind.is_a(TokenKind::Keyword) && !after_dot {
            if let Some(keyword) = find(self.rules.declaration_keywords, token.text) {
                self.start_function(keyword, token, line);
                return;
            }
            if let Some(keyword) = find(self.rules.scope_keywords, token.text) {
                self.phase = Phase::Scope(ScopeHeader {
                    shorthand: self.rules.method_shorthand_scopes.contains(&keyword),
                    interface: keyword == "interface",
                    name: None,
                    after_for: false,
                    angle: 0,
                    depth: 0,
                    indent: self.line_indent,
                });
                return;
            }
        }

        if is_sym(&token, "(") {
            let header = self.arrow_header(token, line).or_else(|| {
                if self.rules.typed_declarations {
                    self.typed_header(token, line)
                } else {
                    self.method_shorthand(token, line)
                }
            });
            if let Some(header) = header {
                self.phase = Phase::Function(header);
            }
        }
    }

    fn start_function(&mut self, keyword: &'static str, token: Token<'src>, line: usize) {
        if self.rules.receiver_keywords.contains(&keyword)
            && (self.in_function_body() || FUNC_LITERAL_CONTEXT.contains(&self.lookback.text(0)))
        {
            return;
        }

        let mut header = FunctionHeader::new(Stage::Name, line, self.line_indent);
        header.keyword = Some(keyword);
        let assignable = self.rules.assignable_keywords.contains(&keyword);
        if assignable && matches!(self.lookback.text(0), "=" | ":") {
            if let Some(target) = self.lookback.back(1).filter(|t| is_name_like(t)) {
                header.assigned = Some(target.text.to_string());
            }
        }
        header.push_text(token.text, line);
        self.phase = Phase::Function(header);
    }

    /// `name = (` and `name = async (`, held until `=>` confirms it.
    fn arrow_header(&self, token: Token<'src>, line: usize) -> Option<FunctionHeader> {
        if !self.rules.arrow_functions {
            return None;
        }
        let back = usize::from(self.lookback.text(0) == "async");
        let assign = self.lookback.back(back)?;
        if !is_sym(assign, "=") {
            return None;
        }
        let (target, target_line) = *self.lookback.entry(back + 1)?;
        if !is_name_like(&target) {
            return None;
        }

        let mut header = FunctionHeader::new(Stage::Params, target_line, self.line_indent);
        header.name = Some(target.text.to_string());
        header.arrow = true;
        header.depth = 1;
        header.push_text(target.text, target_line);
        header.push_text(" = ", target_line);
        header.push_text(token.text, line);
        Some(header)
    }

    /// `Type name(` in families that put the type first.
    fn typed_header(&self, token: Token<'src>, line: usize) -> Option<FunctionHeader> {
        let (name, name_line) = *self.lookback.entry(0)?;
        if !is_name_like(&name)
            || name.kind == TokenKind::NameDecorator
            || self.rules.is_non_caller(name.text)
        {
            return None;
        }
        let before = self.lookback.back(1)?;
        if !self.is_type_like(before) {
            return None;
        }

        let mut prefix: Vec<(Token<'src>, usize)> = self
            .lookback
            .iter_back()
            .skip(1)
            .take_while(|(t, _)| !is_boundary(t))
            .copied()
            .collect();
        prefix.reverse();

        let start_line = prefix.first().map_or(name_line, |(_, l)| *l);
        let mut header = FunctionHeader::new(Stage::Params, start_line, self.line_indent);
        header.name = Some(name.text.to_string());
        header.depth = 1;

        let mut returns: &[(Token<'src>, usize)] = &prefix;
        while let Some(((first, _), rest)) = returns.split_first() {
            if self.rules.is_modifier(first.text) {
                returns = rest;
            } else {
                break;
            }
        }
        if returns.first().map_or(false, |(t, _)| t.text == "<") {
            let mut depth = 0usize;
            let mut skip = returns.len();
            for (i, (t, _)) in returns.iter().enumerate() {
                depth += t.text.matches('<').count();
                depth = depth.saturating_sub(t.text.matches('>').count());
                if depth == 0 {
                    skip = i + 1;
                    break;
                }
            }
            returns = &returns[skip..];
        }
        header.typed_returns = Some(join_words(returns.iter().map(|(t, _)| t.text)));

        let mut text = join_words(prefix.iter().map(|(t, _)| t.text));
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(name.text);
        text.push_str(token.text);
        header.push_text(&text, line);
        Some(header)
    }

    /// `name(...) {` directly inside a class body.
    fn method_shorthand(&self, token: Token<'src>, line: usize) -> Option<FunctionHeader> {
        let frame = self.frames.last()?;
        let in_scope_body = match (frame.kind, frame.close) {
            (FrameKind::Scope { shorthand: true, .. }, Close::Brace(depth)) => {
                self.brace_depth == depth + 1
            }
            _ => false,
        };
        if !in_scope_body {
            return None;
        }

        let (name, name_line) = *self.lookback.entry(0)?;
        let named = is_name_like(&name)
            || (name.kind.is_a(TokenKind::Keyword) && self.rules.is_modifier(name.text));
        if !named || self.rules.is_non_caller(name.text) {
            return None;
        }
        let preceded_ok = match self.lookback.entry(1) {
            None => true,
            Some((t, t_line)) => {
                *t_line < name_line
                    || matches!(t.text, "{" | "}" | ";" | "*")
                    || t.kind == TokenKind::NameDecorator
                    || self.rules.is_modifier(t.text)
            }
        };
        if !preceded_ok {
            return None;
        }

        let mut header = FunctionHeader::new(Stage::Params, name_line, self.line_indent);
        header.name = Some(name.text.to_string());
        header.depth = 1;
        header.push_text(name.text, name_line);
        header.push_text(token.text, line);
        Some(header)
    }

    fn function_header(&mut self, mut header: FunctionHeader, token: Token<'src>, line: usize) {
        match header.stage {
            Stage::Name => {
                let receiver_allowed = header
                    .keyword
                    .map_or(false, |k| self.rules.receiver_keywords.contains(&k));
                if is_sym(&token, "(") {
                    if receiver_allowed && header.receiver.is_none() {
                        header.stage = Stage::Receiver;
                        header.depth = 1;
                    } else if let Some(assigned) = header.assigned.take() {
                        header.name = Some(assigned);
                        header.stage = Stage::Params;
                        header.depth = 1;
                    } else {
                        return self.scan(token, line);
                    }
                } else if is_sym(&token, "*") {
                    // generator marker
                } else if is_name_like(&token) {
                    header.name = Some(token.text.to_string());
                    header.stage = Stage::BeforeParams;
                } else {
                    return self.scan(token, line);
                }
                header.push_text(token.text, line);
            }
            Stage::Receiver => {
                header.push_text(token.text, line);
                if is_open(&token) {
                    header.depth += 1;
                } else if is_close(&token) {
                    header.depth = header.depth.saturating_sub(1);
                    if header.depth == 0 {
                        header.receiver = header.receiver_names.last().cloned();
                        header.stage = Stage::Name;
                    }
                } else if header.depth == 1 && is_name_like(&token) {
                    header.receiver_names.push(token.text.to_string());
                }
            }
            Stage::BeforeParams => {
                let (opens, closes) = angle_delta(&token);
                if header.depth == 0 && is_sym(&token, "(") {
                    header.stage = Stage::Params;
                    header.depth = 1;
                } else if opens + closes > 0 || is_sym(&token, "[") || is_sym(&token, "]") {
                    header.depth += opens + usize::from(is_sym(&token, "["));
                    header.depth = header
                        .depth
                        .saturating_sub(closes + usize::from(is_sym(&token, "]")));
                } else if header.depth > 0 {
                    // inside generic parameters
                } else if self.rules.block == BlockStyle::End {
                    if is_sym(&token, ".") {
                        header.expect_member = true;
                    } else if header.expect_member && is_name_like(&token) {
                        header.name = Some(token.text.to_string());
                        header.expect_member = false;
                    } else if is_sym(&token, "=") {
                        return self.endless(header);
                    } else if is_sym(&token, ";") {
                        return self.confirm(header, Body::Open);
                    } else {
                        header.stage = Stage::BareParams;
                        header.params.push_str(token.text);
                    }
                } else {
                    return self.scan(token, line);
                }
                header.push_text(token.text, line);
            }
            Stage::Params | Stage::BareParams => {
                if header.stage == Stage::BareParams && header.depth == 0 && is_sym(&token, ";") {
                    return self.confirm(header, Body::Open);
                }
                header.push_text(token.text, line);
                if is_open(&token) {
                    header.depth += 1;
                } else if is_close(&token) {
                    header.depth = header.depth.saturating_sub(1);
                    if header.depth == 0 && header.stage == Stage::Params {
                        header.stage = Stage::AfterParams;
                        self.phase = Phase::Function(header);
                        return;
                    }
                }
                header.params.push_str(token.text);
            }
            Stage::AfterParams if header.arrow => {
                return self.arrow_params_end(header, token, line);
            }
            Stage::AfterParams => return self.after_params(header, token, line),
            Stage::Arrow => {
                if is_sym(&token, "{") {
                    return self.confirm(header, Body::Open);
                }
                self.confirm(header, Body::None);
                return self.scan(token, line);
            }
        }
        self.phase = Phase::Function(header);
    }

    fn after_params(&mut self, mut header: FunctionHeader, token: Token<'src>, line: usize) {
        let top = header.depth == 0;
        match self.rules.block {
            BlockStyle::Brace => {
                if top && is_sym(&token, "{") {
                    return self.confirm(header, Body::Open);
                }
                if top && is_sym(&token, ";") {
                    if self.options.include_declarations && !self.in_function_body() {
                        self.confirm(header, Body::None);
                    }
                    return;
                }
                let aborts = ["}", ")", "=", "=>"].iter().any(|s| is_sym(&token, s))
                    || (is_sym(&token, ",") && !header.after_word);
                if top && aborts {
                    return self.scan(token, line);
                }
                if token.kind.is_a(TokenKind::Keyword) && token.text == "where" {
                    header.returns_done = true;
                }
                if top && (is_name_like(&token) || token.kind.is_a(TokenKind::Keyword)) {
                    header.after_word = true;
                }
            }
            BlockStyle::Indent => {
                if top && is_sym(&token, ":") {
                    return self.confirm(header, Body::Open);
                }
            }
            BlockStyle::End => {
                if top && is_sym(&token, "=") {
                    return self.endless(header);
                }
                if top && is_sym(&token, ";") {
                    return self.confirm(header, Body::Open);
                }
            }
            BlockStyle::None => {}
        }

        let (opens, closes) = angle_delta(&token);
        if is_open(&token) {
            header.depth += 1;
        } else if is_close(&token) {
            header.depth = header.depth.saturating_sub(1);
        } else if opens + closes > 0 {
            header.depth = (header.depth + opens).saturating_sub(closes);
        }
        if !header.returns_done {
            header.after.push_str(token.text);
        }
        header.push_text(token.text, line);
        self.phase = Phase::Function(header);
    }

    /// After `name = (...)`: an optional `: Type` annotation, then `=>` or nothing.
    fn arrow_params_end(&mut self, mut header: FunctionHeader, token: Token<'src>, line: usize) {
        let top = header.depth == 0;
        if top && is_sym(&token, "=>") {
            header.stage = Stage::Arrow;
            self.phase = Phase::Function(header);
            return;
        }
        let annotated = !header.after.trim().is_empty();
        let ends = ["{", "}", ")", ";", ",", "="].iter().any(|s| is_sym(&token, s));
        if (!annotated && !is_sym(&token, ":")) || (top && ends) {
            return self.scan(token, line);
        }

        let (opens, closes) = angle_delta(&token);
        if is_open(&token) {
            header.depth += 1;
        } else if is_close(&token) {
            header.depth = header.depth.saturating_sub(1);
        } else if opens + closes > 0 {
            header.depth = (header.depth + opens).saturating_sub(closes);
        }
        header.after.push_str(token.text);
        header.push_text(token.text, line);
        self.phase = Phase::Function(header);
    }

    /// Ruby `def name(args) = expr`: a complete method without a block.
    fn endless(&mut self, header: FunctionHeader) {
        self.end_depth = self.end_depth.saturating_sub(1);
        self.confirm(header, Body::None);
    }

    fn scope_header(&mut self, mut header: ScopeHeader, token: Token<'src>, line: usize) {
        match self.rules.block {
            BlockStyle::Indent => {
                if is_open(&token) {
                    header.depth += 1;
                } else if is_close(&token) {
                    header.depth = header.depth.saturating_sub(1);
                } else if header.depth == 0 && is_sym(&token, ":") {
                    return self.confirm_scope(header);
                } else if header.depth == 0 && header.name.is_none() && is_name_like(&token) {
                    header.name = Some(token.text.to_string());
                }
            }
            BlockStyle::End => {
                if header.name.is_none() && is_sym(&token, "<<") {
                    // `class << self` opens a block but no named scope
                    return;
                }
                if is_sym(&token, ";") {
                    return self.confirm_scope(header);
                }
                if header.name.is_none() && is_name_like(&token) {
                    header.name = Some(token.text.to_string());
                }
            }
            BlockStyle::Brace => {
                if is_sym(&token, "{") {
                    if header.name.is_some() {
                        return self.confirm_scope(header);
                    }
                    return self.scan(token, line);
                }
                let declaration = token.kind.is_a(TokenKind::Keyword)
                    && self.rules.is_declaration_keyword(token.text);
                if declaration || ["(", ")", "}", ";", "="].iter().any(|s| is_sym(&token, s)) {
                    return self.scan(token, line);
                }
                let (opens, closes) = angle_delta(&token);
                if token.kind.is_a(TokenKind::Keyword) && token.text == "for" {
                    header.after_for = true;
                } else if token.kind.is_a(TokenKind::Keyword) && token.text == "interface" {
                    header.shorthand = true;
                    header.interface = true;
                } else if opens + closes > 0 {
                    header.angle = (header.angle + opens).saturating_sub(closes);
                } else if is_name_like(&token)
                    && (header.after_for || (header.angle == 0 && header.name.is_none()))
                {
                    header.name = Some(token.text.to_string());
                    header.after_for = false;
                }
            }
            BlockStyle::None => return,
        }
        self.phase = Phase::Scope(header);
    }

    fn confirm_scope(&mut self, header: ScopeHeader) {
        let Some(name) = header.name else {
            return;
        };
        let close = match self.rules.block {
            BlockStyle::Indent => Close::Indent(header.indent),
            BlockStyle::End => Close::End(self.end_depth.saturating_sub(1)),
            _ => Close::Brace(self.brace_depth),
        };
        self.frames.push(Frame {
            name,
            kind: FrameKind::Scope {
                shorthand: header.shorthand,
                interface: header.interface,
            },
            close,
        });
    }

    fn confirm(&mut self, header: FunctionHeader, body: Body) {
        let Some(name) = header.name.clone() else {
            return;
        };
        let close = match self.rules.block {
            BlockStyle::Indent => Close::Indent(header.indent),
            BlockStyle::End => Close::End(self.end_depth.saturating_sub(1)),
            _ => Close::Brace(self.brace_depth),
        };
        self.record(header, false);
        if body == Body::Open {
            self.frames.push(Frame {
                name,
                kind: FrameKind::Function,
                close,
            });
        }
    }

    fn record(&mut self, header: FunctionHeader, partial: bool) {
        let Some(name) = header.name else {
            return;
        };
        let mut scope: Vec<&str> = self.frames.iter().map(|f| f.name.as_str()).collect();
        if let Some(receiver) = &header.receiver {
            scope.push(receiver);
        }
        let parameters = normalize(&header.params);
        let returns = match header.typed_returns {
            Some(returns) => Some(returns),
            None => keyword_returns(&header.after),
        }
        .filter(|r| !r.is_empty());

        tracing::trace!(name = %name, line = header.start_line, partial, "signature");
        self.signatures.push(Signature {
            params: parse_parameters(&parameters, self.rules.param_style),
            parameters,
            returns,
            scope: scope.join("."),
            start_line: header.start_line,
            end_line: header.end_line,
            signature: tidy_brackets(&normalize(&header.text)),
            partial,
            name,
        });
    }

    /// Depth bookkeeping for every significant token.
    fn track(&mut self, token: Token<'src>, line: usize) {
        if is_open(&token) {
            self.group_depth += 1;
        } else if is_close(&token) {
            self.group_depth = self.group_depth.saturating_sub(1);
        }

        if is_sym(&token, "{") {
            self.brace_depth += 1;
        } else if is_sym(&token, "}") {
            self.brace_depth = self.brace_depth.saturating_sub(1);
            while let Some(Frame {
                close: Close::Brace(depth),
                ..
            }) = self.frames.last()
            {
                if *depth < self.brace_depth {
                    break;
                }
                self.frames.pop();
            }
        }

        if self.rules.block == BlockStyle::End {
            self.track_end(token, line);
        }
    }

    fn track_end(&mut self, token: Token<'src>, line: usize) {
        if !token.kind.is_a(TokenKind::Keyword) || self.lookback.text(0) == "." {
            return;
        }
        let block_context =
            self.line_start || RUBY_BLOCK_CONTEXT.contains(&self.lookback.text(0));
        match token.text {
            "def" | "class" | "module" | "begin" | "case" => self.end_depth += 1,
            "do" if self.loop_line != Some(line) => self.end_depth += 1,
            "if" | "unless" if block_context => self.end_depth += 1,
            "while" | "until" if block_context => {
                self.end_depth += 1;
                self.loop_line = Some(line);
            }
            "for" if self.line_start => {
                self.end_depth += 1;
                self.loop_line = Some(line);
            }
            "end" => {
                self.end_depth = self.end_depth.saturating_sub(1);
                while let Some(Frame {
                    close: Close::End(depth),
                    ..
                }) = self.frames.last()
                {
                    if *depth < self.end_depth {
                        break;
                    }
                    self.frames.pop();
                }
            }
            _ => {}
        }
    }

    fn close_indented(&mut self, indent: usize) {
        while let Some(Frame {
            close: Close::Indent(column),
            ..
        }) = self.frames.last()
        {
            if indent > *column {
                break;
            }
            self.frames.pop();
        }
    }

    fn in_function_body(&self) -> bool {
        self.frames.iter().any(|f| f.kind == FrameKind::Function)
    }

    fn in_interface_body(&self) -> bool {
        match self.frames.last() {
            Some(Frame {
                kind: FrameKind::Scope { interface: true, .. },
                close: Close::Brace(depth),
                ..
            }) => self.brace_depth == depth + 1,
            _ => false,
        }
    }

    fn is_type_like(&self, token: &Token<'_>) -> bool {
        token.kind == TokenKind::KeywordType
            || (is_name_like(token) && token.kind != TokenKind::NameDecorator)
            || matches!(token.text, "*" | "**" | "&" | ">" | ">>" | "]")
            || self.rules.is_modifier(token.text)
    }
}

fn find(list: &'static [&'static str], word: &str) -> Option<&'static str> {
    list.iter().copied().find(|k| *k == word)
}

fn is_sym(token: &Token<'_>, text: &str) -> bool {
    token.text == text
        && (token.kind == TokenKind::Punctuation || token.kind.is_a(TokenKind::Operator))
}

fn is_open(token: &Token<'_>) -> bool {
    is_sym(token, "(") || is_sym(token, "[") || is_sym(token, "{")
}

fn is_close(token: &Token<'_>) -> bool {
    is_sym(token, ")") || is_sym(token, "]") || is_sym(token, "}")
}

/// Angle brackets carried by an operator made only of `<` and `>`.
fn angle_delta(token: &Token<'_>) -> (usize, usize) {
    let angles = !token.text.is_empty()
        && token.text.chars().all(|c| c == '<' || c == '>')
        && (token.kind == TokenKind::Punctuation || token.kind.is_a(TokenKind::Operator));
    if !angles {
        return (0, 0);
    }
    (token.text.matches('<').count(), token.text.matches('>').count())
}

fn is_name_like(token: &Token<'_>) -> bool {
    let starts_word = token
        .text
        .chars()
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '$');
    token.kind.is_a(TokenKind::Name) || (token.kind == TokenKind::Text && starts_word)
}

/// Where a typed declaration's return type starts.
fn is_boundary(token: &Token<'_>) -> bool {
    token.kind == TokenKind::NameDecorator
        || [";", "{", "}", ":", "(", ")", ",", "="]
            .iter()
            .any(|s| is_sym(token, s))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Join token texts, spacing only between two word-like neighbours.
fn join_words<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for text in texts {
        let needs_space = out.chars().last().map_or(false, is_word_char)
            && text.chars().next().map_or(false, is_word_char);
        if needs_space {
            out.push(' ');
        }
        out.push_str(text);
    }
    out
}

/// Drop the spaces a multi-line header leaves just inside its brackets.
fn tidy_brackets(text: &str) -> String {
    text.replace("( ", "(")
        .replace(" )", ")")
        .replace("[ ", "[")
        .replace(" ]", "]")
}

/// Return annotation written after the parameter list.
fn keyword_returns(after: &str) -> Option<String> {
    let text = normalize(after);
    let text = text
        .strip_prefix("->")
        .or_else(|| text.strip_prefix(':'))
        .unwrap_or(&text)
        .trim();
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_words() {
        assert_eq!(join_words(["struct", "point"]), "struct point");
        assert_eq!(join_words(["List", "<", "T", ">"]), "List<T>");
        assert_eq!(join_words(["const", "char", "*"]), "const char*");
    }

    #[test]
    fn test_tidy_brackets() {
        assert_eq!(tidy_brackets("def long( a, b, )"), "def long(a, b,)");
        assert_eq!(tidy_brackets("f(a[ 0 ])"), "f(a[0])");
    }

    #[test]
    fn test_keyword_returns() {
        assert_eq!(keyword_returns(" -> Vec<u8> ").as_deref(), Some("Vec<u8>"));
        assert_eq!(keyword_returns(": string").as_deref(), Some("string"));
        assert_eq!(keyword_returns(" (int, error)").as_deref(), Some("(int, error)"));
        assert_eq!(keyword_returns("").as_deref(), Some(""));
    }

    #[test]
    fn test_angle_delta_ignores_arrows() {
        let arrow = Token::new(TokenKind::Operator, 0, "->");
        let shift = Token::new(TokenKind::Operator, 0, ">>");
        assert_eq!(angle_delta(&arrow), (0, 0));
        assert_eq!(angle_delta(&shift), (0, 2));
    }
}
