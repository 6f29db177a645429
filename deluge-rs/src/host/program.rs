//! Statement tree for translated code.
//!
//! Blocks are delimited by indentation.  A physical line that leaves a
//! bracket open is joined with the following lines, so the multi-line
//! `_invokeurl({ … })` calls the translator emits parse as one statement.
//! A header followed by nothing more deeply indented has an empty body.

use super::expr::{parse_expr, Expr};
use crate::error::{RuntimeError, RuntimeResult};

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `if c:` plus any `elif c:` branches, then the `else:` body.
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Vec<Stmt>,
    },
    While { cond: Expr, body: Vec<Stmt> },
    /// `for var in iterable:`
    ForEach {
        var: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Pass,
    Expr(Expr),
}

#[derive(Debug, Clone)]
struct SrcLine {
    indent: usize,
    text: String,
    line: usize,
}

/// Parse emitted code into statements.
pub fn parse_program(code: &str) -> RuntimeResult<Vec<Stmt>> {
    let mut parser = BlockParser {
        lines: logical_lines(code)?,
        pos: 0,
    };
    let stmts = parser.parse_block(0)?;
    match parser.lines.get(parser.pos) {
        Some(l) => Err(syntax(l.line, "unexpected indent")),
        None => Ok(stmts),
    }
}

fn syntax(line: usize, message: impl Into<String>) -> RuntimeError {
    RuntimeError::Syntax {
        line,
        message: message.into(),
    }
}

/// Physical lines joined while brackets or string literals are open; blank
/// lines and `#` comments dropped.
fn logical_lines(code: &str) -> RuntimeResult<Vec<SrcLine>> {
    let mut out = Vec::new();
    let mut pending: Option<SrcLine> = None;
    let mut nesting = Nesting::default();
    for (idx, raw) in code.lines().enumerate() {
        match pending.as_mut() {
            // Inside a string the line break and spacing are part of the literal.
            Some(p) if nesting.in_string() => {
                p.text.push('\n');
                p.text.push_str(raw);
            }
            Some(p) => {
                p.text.push(' ');
                p.text.push_str(raw.trim());
            }
            None => {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                pending = Some(SrcLine {
                    indent: raw.len() - raw.trim_start().len(),
                    text: trimmed.to_owned(),
                    line: idx + 1,
                });
            }
        }
        nesting.feed(raw);
        if nesting.is_closed() {
            nesting = Nesting::default();
            out.extend(pending.take());
        }
    }
    if let Some(p) = pending {
        let what = if nesting.in_string() { "unclosed string" } else { "unclosed bracket" };
        return Err(syntax(p.line, what));
    }
    Ok(out)
}

/// Bracket depth and string state carried from one physical line to the next.
#[derive(Debug, Default)]
struct Nesting {
    depth: i32,
    quote: Option<char>,
    escaped: bool,
}

impl Nesting {
    fn feed(&mut self, line: &str) {
        for c in line.chars() {
            if let Some(q) = self.quote {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == q {
                    self.quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => self.quote = Some(c),
                '(' | '[' | '{' => self.depth += 1,
                ')' | ']' | '}' => self.depth -= 1,
                _ => {}
            }
        }
        // A backslash at the end of a line escapes the line break.
        if self.escaped {
            self.escaped = false;
        }
    }

    fn in_string(&self) -> bool {
        self.quote.is_some()
    }

    /// Nothing left open; stray closers count as closed.
    fn is_closed(&self) -> bool {
        self.depth <= 0 && self.quote.is_none()
    }
}

/// Text between `keyword ` and the trailing `:` of a block header.
fn header<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    rest.strip_suffix(':').map(str::trim)
}

struct BlockParser {
    lines: Vec<SrcLine>,
    pos: usize,
}

impl BlockParser {
    fn parse_block(&mut self, indent: usize) -> RuntimeResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while let Some(l) = self.lines.get(self.pos) {
            if l.indent < indent {
                break;
            }
            if l.indent > indent {
                return Err(syntax(l.line, "unexpected indent"));
            }
            stmts.push(self.parse_stmt(indent)?);
        }
        Ok(stmts)
    }

    /// Body of a header at `indent`: the following more-indented lines.
    fn body(&mut self, indent: usize) -> RuntimeResult<Vec<Stmt>> {
        match self.lines.get(self.pos) {
            Some(l) if l.indent > indent => {
                let inner = l.indent;
                self.parse_block(inner)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// The next line at exactly `indent`, if there is one.
    fn sibling(&self, indent: usize) -> Option<&SrcLine> {
        self.lines.get(self.pos).filter(|l| l.indent == indent)
    }

    fn parse_stmt(&mut self, indent: usize) -> RuntimeResult<Stmt> {
        let SrcLine { text, line, .. } = self.lines[self.pos].clone();
        self.pos += 1;
        let expr = |src: &str| parse_expr(src).map_err(|m| syntax(line, m));

        if let Some(cond) = header(&text, "if") {
            let mut branches = vec![(expr(cond)?, self.body(indent)?)];
            let mut otherwise = Vec::new();
            while let Some(next) = self.sibling(indent) {
                let (next_text, next_line) = (next.text.clone(), next.line);
                if let Some(cond) = header(&next_text, "elif") {
                    self.pos += 1;
                    let cond = parse_expr(cond).map_err(|m| syntax(next_line, m))?;
                    branches.push((cond, self.body(indent)?));
                } else if next_text == "else:" {
                    self.pos += 1;
                    otherwise = self.body(indent)?;
                    break;
                } else {
                    break;
                }
            }
            return Ok(Stmt::If {
                branches,
                otherwise,
            });
        }
        if let Some(cond) = header(&text, "while") {
            let cond = expr(cond)?;
            return Ok(Stmt::While {
                cond,
                body: self.body(indent)?,
            });
        }
        if let Some(head) = header(&text, "for") {
            let Some((var, iterable)) = head.split_once(" in ") else {
                return Err(syntax(line, "expected `for NAME in EXPR:`"));
            };
            let var = var.trim();
            let valid = var.starts_with(|c: char| c.is_alphabetic() || c == '_')
                && var.chars().all(|c| c.is_alphanumeric() || c == '_');
            if !valid {
                return Err(syntax(line, format!("invalid loop variable `{var}`")));
            }
            let iterable = expr(iterable)?;
            return Ok(Stmt::ForEach {
                var: var.to_owned(),
                iterable,
                body: self.body(indent)?,
            });
        }
        if header(&text, "elif").is_some() || text == "else:" {
            return Err(syntax(line, "`elif`/`else` without a matching `if`"));
        }

        match text.as_str() {
            "return" => Ok(Stmt::Return(None)),
            "break" => Ok(Stmt::Break),
            "continue" => Ok(Stmt::Continue),
            "pass" => Ok(Stmt::Pass),
            _ => match text.strip_prefix("return") {
                Some(rest) if rest.starts_with([' ', '(']) => {
                    Ok(Stmt::Return(Some(expr(rest.trim())?)))
                }
                _ => Ok(Stmt::Expr(expr(&text)?)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> Vec<Stmt> {
        parse_program(code).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn flat_statements() {
        let stmts = parse("a = 1\nb = 2\nreturn a + b");
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[2], Stmt::Return(Some(_))));
    }

    #[test]
    fn if_elif_else_chain() {
        let stmts = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\ny = 4");
        assert_eq!(stmts.len(), 2);
        match &stmts[0] {
            Stmt::If {
                branches,
                otherwise,
            } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(otherwise.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn nested_blocks() {
        let stmts = parse("for x in l:\n  if x:\n    while y:\n      y -= 1\n  z = x\n");
        let Stmt::ForEach { var, body, .. } = &stmts[0] else {
            panic!("expected for");
        };
        assert_eq!(var, "x");
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn empty_body_is_allowed() {
        let stmts = parse("if a:\nb = 1");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn multi_line_call_is_joined() {
        let code = "r = _invokeurl({\n    \"url\": \"http://x\",\n    \"type\": \"GET\",\n})\nreturn r";
        let stmts = parse(code);
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0], Stmt::Expr(_)));
    }

    #[test]
    fn brackets_inside_strings_do_not_join() {
        assert_eq!(parse("a = \"(\"\nb = 1").len(), 2);
        let mut n = Nesting::default();
        n.feed(r#"f("a\")", [1)"#);
        assert_eq!(n.depth, 1);
        assert!(!n.in_string());
    }

    #[test]
    fn string_spanning_lines_keeps_brackets_literal() {
        let code = "x = f(\"a (\n b\")\ny = 2";
        let stmts = parse(code);
        assert_eq!(stmts.len(), 2);

        let lines = logical_lines("s = \"one\n  two\"\nt = 1").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "s = \"one\n  two\"");
        assert_eq!(lines[1].line, 3);
    }

    #[test]
    fn unclosed_string_is_reported() {
        match parse_program("a = 1\nb = \"open\nc = 2") {
            Err(RuntimeError::Syntax { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("unclosed string"), "{message}");
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn keywords() {
        let stmts = parse("while True:\n    break\n    continue\n    pass\nreturn");
        let Stmt::While { body, .. } = &stmts[0] else {
            panic!("expected while");
        };
        assert!(matches!(body[..], [Stmt::Break, Stmt::Continue, Stmt::Pass]));
        assert!(matches!(stmts[1], Stmt::Return(None)));
        // `returnValue` is a name, not a return.
        assert!(matches!(parse("returnValue = 1")[0], Stmt::Expr(_)));
    }

    #[test]
    fn syntax_errors_carry_line_numbers() {
        for (code, line) in [
            ("a = 1\n    b = 2", 2),
            ("a = (1", 1),
            ("x = 1\nelse:\n    y", 2),
            ("for 1 in l:\n    x", 1),
            ("a = 1\nb = 1 +", 2),
        ] {
            match parse_program(code) {
                Err(RuntimeError::Syntax { line: l, .. }) => assert_eq!(l, line, "{code}"),
                other => panic!("{code}: expected syntax error, got {other:?}"),
            }
        }
    }
}
