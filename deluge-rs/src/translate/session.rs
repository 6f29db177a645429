//! Per-translation state machine.
//!
//! A [`Session`] owns everything that changes while walking the logical
//! lines of one script: the block stack, the header waiting for its `{`,
//! the conditional that was just closed (for `else` alignment) and the
//! invokeurl sub-mode.  It is created by [`Translator`](super::Translator)
//! for each call and consumed by [`Session::finish`].

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use super::preprocess::{keyword_prefix, LogicalLine};
use super::rewrite::{canonicalize_constructors, rewrite_condition, rewrite_expression};
use super::{Diagnostic, DiagnosticKind, TranslateOptions, Translation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    ElseIf,
    Else,
    While,
    ForEach,
    /// `{` with no header; groups lines without indenting them.
    Bare,
}

#[derive(Debug, Clone)]
struct Block {
    kind: BlockKind,
    /// Depth the header was emitted at.
    depth: usize,
    line: usize,
    header: String,
}

impl Block {
    fn body_depth(&self) -> usize {
        match self.kind {
            BlockKind::Bare => self.depth,
            _ => self.depth + 1,
        }
    }

    fn is_conditional(&self) -> bool {
        matches!(self.kind, BlockKind::If | BlockKind::ElseIf)
    }
}

#[derive(Debug)]
struct Remote {
    line: usize,
    depth: usize,
    /// Opener was `invokeurl` alone; the `[` is on the next line.
    awaiting_bracket: bool,
}

fn for_each_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^for\s+each\s+([A-Za-z_]\w*)\s+in\s+(.+?)\s*\{?\s*$")
            .expect("pattern literal is valid")
    })
}

fn invokeurl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:([A-Za-z_]\w*)\s*=\s*)?invokeurl\s*(\[)?$").expect("pattern literal is valid")
    })
}

fn remote_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^["']?([A-Za-z_][\w-]*)["']?\s*:\s*(.*)$"#).expect("pattern literal is valid")
    })
}

/// Translation state for one script.
pub struct Session<'o> {
    opts: &'o TranslateOptions,
    out: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    stack: Vec<Block>,
    pending: Option<Block>,
    last_closed: Option<Block>,
    remote: Option<Remote>,
    /// Names assigned so far; a bare invokeurl value naming one is a variable.
    bound: HashSet<String>,
}

impl<'o> Session<'o> {
    pub fn new(opts: &'o TranslateOptions) -> Self {
        Session {
            opts,
            out: Vec::new(),
            diagnostics: Vec::new(),
            stack: Vec::new(),
            pending: None,
            last_closed: None,
            remote: None,
            bound: HashSet::new(),
        }
    }

    /// Current nesting depth; never negative.
    fn depth(&self) -> usize {
        self.stack.last().map_or(0, Block::body_depth)
    }

    fn emit(&mut self, depth: usize, code: &str) {
        let width = depth * self.opts.indent;
        self.out.push(format!("{:width$}{code}", ""));
    }

    fn diag(&mut self, kind: DiagnosticKind, line: usize, text: &str) {
        warn!(line, %kind, text, "untranslated line");
        self.diagnostics.push(Diagnostic {
            line,
            kind,
            text: text.to_owned(),
        });
    }

    /// Process one logical line.
    pub fn line(&mut self, l: &LogicalLine) {
        let text = l.text.trim();
        let line = l.line;
        if text.is_empty() || text.starts_with("//") || text.starts_with("/*") || text.ends_with("*/") {
            return;
        }
        if self.remote.is_some() {
            self.remote_line(text, line);
            return;
        }

        let closed = self.last_closed.take();
        if text == "{" {
            self.open_block(line);
            return;
        }
        if let Some(p) = self.pending.take() {
            self.diag(DiagnosticKind::MissingBlock, p.line, &p.header);
        }

        if text == "}" {
            self.close_block(line, text);
        } else if let Some(rest) = header_rest(text, "if") {
            let cond = rewrite_condition(condition_of(rest), self.opts.conditions);
            self.header(BlockKind::If, self.depth(), format!("if {cond}:"), text, line);
        } else if keyword_prefix(text, "for") {
            self.for_each(text, line);
        } else if let Some(rest) = header_rest(text, "while") {
            let cond = rewrite_condition(condition_of(rest), self.opts.conditions);
            self.header(BlockKind::While, self.depth(), format!("while {cond}:"), text, line);
        } else if keyword_prefix(text, "else") {
            self.else_clause(text, line, closed);
        } else if let Some(caps) = invokeurl_re().captures(text) {
            let depth = self.depth();
            let code = match caps.get(1) {
                Some(name) => {
                    self.bound.insert(name.as_str().to_owned());
                    format!("{} = _invokeurl({{", name.as_str())
                }
                None => "_invokeurl({".to_owned(),
            };
            debug!(line, "invokeurl block");
            self.emit(depth, &code);
            self.remote = Some(Remote {
                line,
                depth,
                awaiting_bracket: caps.get(2).is_none(),
            });
        } else if text == "];" || text == "]" {
            self.diag(DiagnosticKind::StrayRemoteTerminator, line, text);
        } else if let Some(rest) = statement_rest(text, "info") {
            let expr = rewrite_expression(rest, self.opts.conditions);
            self.emit(self.depth(), &format!("info({expr})"));
        } else if let Some(rest) = statement_rest(text, "return") {
            let code = if rest.is_empty() {
                "return".to_owned()
            } else {
                format!("return {}", rewrite_expression(rest, self.opts.conditions))
            };
            self.emit(self.depth(), &code);
        } else if let Some((lhs, op, rhs)) = split_assignment(text) {
            let rhs = rewrite_expression(&canonicalize_constructors(rhs), self.opts.conditions);
            self.bound.insert(lhs.to_owned());
            self.emit(self.depth(), &format!("{lhs} {op} {rhs}"));
        } else if let Some(body) = text.strip_suffix(';') {
            let body = body.trim();
            if !body.is_empty() {
                let code = rewrite_expression(&canonicalize_constructors(body), self.opts.conditions);
                self.emit(self.depth(), &code);
            }
        } else {
            self.diag(DiagnosticKind::UnsupportedConstruct, line, text);
        }
    }

    /// Close the session, reporting anything left open.
    pub fn finish(mut self) -> Translation {
        if let Some(p) = self.pending.take() {
            self.diag(DiagnosticKind::MissingBlock, p.line, &p.header);
        }
        if let Some(r) = self.remote.take() {
            self.diag(DiagnosticKind::UnterminatedRemoteCall, r.line, "invokeurl");
        }
        for b in std::mem::take(&mut self.stack) {
            self.diag(DiagnosticKind::UnclosedBlock, b.line, &b.header);
        }
        Translation {
            code: self.out.join("\n"),
            diagnostics: self.diagnostics,
        }
    }

    // ── Blocks ───────────────────────────────────────────────────────────────

    fn header(&mut self, kind: BlockKind, depth: usize, code: String, text: &str, line: usize) {
        debug!(line, ?kind, depth, "control header");
        self.emit(depth, &code);
        self.begin(kind, depth, text, line);
    }

    /// Push the block now if the header carries its `{`, else wait for it.
    fn begin(&mut self, kind: BlockKind, depth: usize, text: &str, line: usize) {
        let block = Block {
            kind,
            depth,
            line,
            header: text.to_owned(),
        };
        if text.ends_with('{') {
            self.stack.push(block);
        } else {
            self.pending = Some(block);
        }
    }

    fn open_block(&mut self, line: usize) {
        let block = match self.pending.take() {
            Some(b) => b,
            None => Block {
                kind: BlockKind::Bare,
                depth: self.depth(),
                line,
                header: "{".to_owned(),
            },
        };
        self.stack.push(block);
    }

    fn close_block(&mut self, line: usize, text: &str) {
        match self.stack.pop() {
            Some(b) => {
                debug!(line, kind = ?b.kind, "block closed");
                if b.is_conditional() {
                    self.last_closed = Some(b);
                }
            }
            None => self.diag(DiagnosticKind::UnbalancedClose, line, text),
        }
    }

    fn else_clause(&mut self, text: &str, line: usize, closed: Option<Block>) {
        let rest = text["else".len()..].trim();
        let rest = rest.strip_suffix('{').unwrap_or(rest).trim();
        let Some(closed) = closed else {
            self.diag(DiagnosticKind::OrphanElse, line, text);
            // Keep braces balanced so the rest of the script still lines up.
            self.begin(BlockKind::Bare, self.depth(), text, line);
            return;
        };
        if rest.is_empty() {
            self.header(BlockKind::Else, closed.depth, "else:".to_owned(), text, line);
        } else if let Some(cond) = header_rest(rest, "if") {
            let cond = rewrite_condition(condition_of(cond), self.opts.conditions);
            self.header(BlockKind::ElseIf, closed.depth, format!("elif {cond}:"), text, line);
        } else {
            self.diag(DiagnosticKind::UnsupportedConstruct, line, text);
        }
    }

    fn for_each(&mut self, text: &str, line: usize) {
        let Some(caps) = for_each_re().captures(text) else {
            self.diag(DiagnosticKind::UnsupportedConstruct, line, text);
            return;
        };
        let name = caps[1].to_owned();
        let iterable = rewrite_expression(&caps[2], self.opts.conditions);
        let code = format!("for {name} in {iterable}:");
        self.bound.insert(name);
        self.header(BlockKind::ForEach, self.depth(), code, text, line);
    }

    // ── invokeurl ────────────────────────────────────────────────────────────

    fn remote_line(&mut self, text: &str, line: usize) {
        let Some(remote) = self.remote.as_mut() else {
            return;
        };
        if remote.awaiting_bracket {
            remote.awaiting_bracket = false;
            if text == "[" {
                return;
            }
        }
        let depth = remote.depth;
        if text == "];" || text == "]" {
            self.remote = None;
            self.emit(depth, "})");
            return;
        }
        match remote_param_re().captures(text) {
            Some(caps) => {
                let value = caps[2].trim().trim_end_matches([',', ';']).trim();
                let value = self.remote_value(value);
                self.emit(depth + 1, &format!("\"{}\": {value},", &caps[1]));
            }
            None => self.diag(DiagnosticKind::BadRemoteParam, line, text),
        }
    }

    /// Bare words are string literals (`type: GET` → `"GET"`); quoted text,
    /// numbers, expressions, container literals and assigned variables pass
    /// through.
    fn remote_value(&self, v: &str) -> String {
        let quoted = v.len() >= 2
            && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')));
        let digits = !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());
        let expression = v.starts_with(['(', '{', '['])
            || v.contains(['.', '(', ')', '+', '-', '*', '/']);
        if quoted || digits || expression || self.bound.contains(v) {
            v.to_owned()
        } else {
            format!("\"{v}\"")
        }
    }
}

// ── Line helpers ──────────────────────────────────────────────────────────────

/// Text after a control keyword (`if`, `while`), if `text` is such a header.
fn header_rest<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    if !keyword_prefix(text, keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    let trimmed = rest.trim_start();
    if trimmed.starts_with('(') || (rest.starts_with(char::is_whitespace) && !trimmed.is_empty()) {
        Some(trimmed)
    } else {
        None
    }
}

/// Operand of a keyword statement (`info x;`, `return x;`), `;` removed.
fn statement_rest<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    if !keyword_prefix(text, keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) && !rest.starts_with(';') {
        if keyword == "return" && rest.starts_with('(') {
            return Some(rest.trim().trim_end_matches(';').trim());
        }
        return None;
    }
    let rest = rest.trim().trim_end_matches(';').trim();
    if keyword == "info" && rest.is_empty() {
        return None;
    }
    Some(rest)
}

/// Condition of a header with the trailing `{` and one pair of enclosing
/// parentheses removed.
fn condition_of(rest: &str) -> &str {
    let rest = rest.trim();
    let rest = rest.strip_suffix('{').unwrap_or(rest).trim();
    strip_outer_parens(rest)
}

fn strip_outer_parens(s: &str) -> &str {
    if !s.starts_with('(') || !s.ends_with(')') {
        return s;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
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
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return if i == s.len() - 1 { s[1..i].trim() } else { s };
                }
            }
            _ => {}
        }
    }
    s
}

/// Split `lhs op rhs;` at the first top-level `=` that is not part of a
/// comparison.  Compound `+=`, `-=`, `*=`, `/=` are recognised.
fn split_assignment(text: &str) -> Option<(&str, &str, &str)> {
    let bytes = text.as_bytes();
    let mut nest = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' | b'[' | b'{' => nest += 1,
            b')' | b']' | b'}' => nest = nest.saturating_sub(1),
            b'=' if nest == 0 => {
                let prev = if i > 0 { bytes[i - 1] } else { 0 };
                let next = bytes.get(i + 1).copied().unwrap_or(0);
                if next == b'=' || matches!(prev, b'=' | b'!' | b'<' | b'>') {
                    return None;
                }
                let (lhs_end, op) = if matches!(prev, b'+' | b'-' | b'*' | b'/') {
                    (i - 1, &text[i - 1..=i])
                } else {
                    (i, "=")
                };
                let lhs = text[..lhs_end].trim();
                let rhs = text[i + 1..].trim().trim_end_matches(';').trim();
                let ident = lhs.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
                    && lhs.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                return (ident && !rhs.is_empty()).then_some((lhs, op, rhs));
            }
            _ => {}
        }
        i += 1;
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
