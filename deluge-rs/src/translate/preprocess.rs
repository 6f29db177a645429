//! Block preprocessor: raw Deluge source → logical lines.
//!
//! After this pass every construct the statement translator dispatches on
//! sits on its own line:
//!
//! - comments are gone (`//` and `/* … */`, never inside string literals)
//! - statements sharing a physical line are split at `;`
//! - a block-opening `{` ends its header line (`if(x) {`, `else {`)
//! - a block-closing `}` stands alone, so `} else {` becomes two lines
//! - `r = invokeurl [ url: "x"; type: GET; ];` becomes the opener, one line
//!   per parameter, and a `];` terminator
//!
//! Braces that do not follow a control header (map literals) are kept inline,
//! as are newlines inside parentheses and brackets.

use tracing::trace;

/// One normalised source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub text: String,
    /// 1-based line of the physical source line the text starts on.
    pub line: usize,
}

impl LogicalLine {
    pub fn new(text: impl Into<String>, line: usize) -> Self {
        LogicalLine {
            text: text.into(),
            line,
        }
    }
}

/// Normalise `source` into logical lines.
pub fn preprocess(source: &str) -> Vec<LogicalLine> {
    let mut scanner = Scanner::new(source);
    scanner.run();
    trace!(lines = scanner.out.len(), "preprocessed");
    scanner.out
}

/// Whether `text` is a control header that owns a following `{`.
pub fn is_block_header(text: &str) -> bool {
    let t = text.trim();
    keyword_prefix(t, "if")
        || keyword_prefix(t, "while")
        || keyword_prefix(t, "else")
        || (keyword_prefix(t, "for") && keyword_prefix(t[3..].trim_start(), "each"))
}

/// `text` starts with `word` followed by end of text or a non-identifier char.
pub(crate) fn keyword_prefix(text: &str, word: &str) -> bool {
    match text.strip_prefix(word) {
        Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'),
        None => false,
    }
}

fn ends_with_invokeurl(text: &str) -> bool {
    let t = text.trim_end();
    match t.strip_suffix("invokeurl") {
        Some(head) => !head.ends_with(|c: char| c.is_alphanumeric() || c == '_'),
        None => false,
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    /// Current physical line (1-based).
    line: usize,
    cur: String,
    /// Line the pending text in `cur` started on.
    cur_line: usize,
    /// Open `(`, `[`, `{` that are not block braces.
    nest: Vec<char>,
    /// Nesting level at which the current invokeurl block was opened.
    remote: Option<usize>,
    /// Drop the next `;` (the one following an invokeurl `]`).
    swallow_semicolon: bool,
    out: Vec<LogicalLine>,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Scanner {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            cur: String::new(),
            cur_line: 1,
            nest: Vec::new(),
            remote: None,
            swallow_semicolon: false,
            out: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
            }
        }
        ch
    }

    /// Append to the pending line, remembering where it started.
    fn push(&mut self, c: char) {
        if self.cur.trim().is_empty() && !c.is_whitespace() {
            self.cur.clear();
            self.cur_line = self.line;
        }
        self.cur.push(c);
    }

    fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            self.push(c);
        }
    }

    fn flush(&mut self) {
        let text = self.cur.trim();
        if !text.is_empty() {
            self.out.push(LogicalLine::new(text, self.cur_line));
        }
        self.cur.clear();
    }

    fn emit(&mut self, text: &str, line: usize) {
        self.out.push(LogicalLine::new(text, line));
    }

    /// Nesting inside the current invokeurl block (or at top level).
    fn depth(&self) -> usize {
        self.nest.len() - self.remote.unwrap_or(0)
    }

    fn run(&mut self) {
        while let Some(c) = self.peek() {
            if self.swallow_semicolon && !c.is_whitespace() {
                self.swallow_semicolon = false;
                if c == ';' {
                    self.advance();
                    continue;
                }
            }
            match c {
                '"' | '\'' => self.string_literal(c),
                '/' if self.peek2() == Some('/') => self.line_comment(),
                '/' if self.peek2() == Some('*') => self.block_comment(),
                '\n' => {
                    self.advance();
                    self.newline();
                }
                ';' => {
                    self.advance();
                    if self.depth() == 0 {
                        if self.remote.is_none() {
                            self.push(';');
                        }
                        self.flush();
                    } else {
                        self.push(';');
                    }
                }
                '(' => {
                    self.advance();
                    self.nest.push('(');
                    self.push('(');
                }
                '[' => {
                    self.advance();
                    if self.remote.is_none() && self.nest.is_empty() && ends_with_invokeurl(&self.cur) {
                        let opener = format!("{} [", self.cur.trim());
                        let line = self.cur_line;
                        self.cur.clear();
                        self.emit(&opener, line);
                        self.remote = Some(self.nest.len());
                    } else {
                        self.nest.push('[');
                        self.push('[');
                    }
                }
                ']' => {
                    self.advance();
                    if self.remote.is_some() && self.depth() == 0 {
                        self.flush();
                        let line = self.line;
                        self.emit("];", line);
                        self.remote = None;
                        self.swallow_semicolon = true;
                    } else {
                        self.close_nested('[');
                        self.push(']');
                    }
                }
                ')' => {
                    self.advance();
                    self.close_nested('(');
                    self.push(')');
                }
                '{' => {
                    self.advance();
                    if self.remote.is_none() && self.nest.is_empty() && is_header_or_empty(&self.cur) {
                        if self.cur.trim().is_empty() {
                            let line = self.line;
                            self.cur.clear();
                            self.emit("{", line);
                        } else {
                            let header = format!("{} {{", self.cur.trim());
                            let line = self.cur_line;
                            self.cur.clear();
                            self.emit(&header, line);
                        }
                    } else {
                        self.nest.push('{');
                        self.push('{');
                    }
                }
                '}' => {
                    self.advance();
                    if self.nest.last() == Some(&'{') {
                        self.nest.pop();
                        self.push('}');
                    } else if self.remote.is_none() && self.nest.is_empty() {
                        self.flush();
                        let line = self.line;
                        self.emit("}", line);
                    } else {
                        self.push('}');
                    }
                }
                _ => {
                    self.advance();
                    self.push(c);
                }
            }
        }
        self.flush();
    }

    fn newline(&mut self) {
        if self.depth() > 0 {
            self.push(' ');
            return;
        }
        if self.remote.is_none() && self.nest.is_empty() && ends_with_invokeurl(&self.cur) {
            // `invokeurl` with its `[` on the next line.
            self.push(' ');
            return;
        }
        self.flush();
    }

    fn close_nested(&mut self, open: char) {
        if self.nest.len() > self.remote.unwrap_or(0) && self.nest.last() == Some(&open) {
            self.nest.pop();
        }
    }

    /// Copy a quoted literal verbatim, honouring backslash escapes.
    fn string_literal(&mut self, quote: char) {
        self.advance();
        self.push(quote);
        while let Some(c) = self.advance() {
            self.push(c);
            if c == '\\' {
                if let Some(escaped) = self.advance() {
                    self.push(escaped);
                }
            } else if c == quote {
                return;
            }
        }
    }

    fn line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn block_comment(&mut self) {
        self.advance();
        self.advance();
        while let Some(c) = self.advance() {
            if c == '*' && self.peek() == Some('/') {
                self.advance();
                break;
            }
        }
        // Keep adjacent tokens apart: `a/* x */b` is two words.
        if !self.cur.is_empty() {
            self.push_str(" ");
        }
    }
}

fn is_header_or_empty(text: &str) -> bool {
    text.trim().is_empty() || is_block_header(text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        preprocess(src).into_iter().map(|l| l.text).collect()
    }

    #[test]
    fn splits_statements() {
        assert_eq!(texts("a = 1; b = 2; return a + b;"), ["a = 1;", "b = 2;", "return a + b;"]);
    }

    #[test]
    fn splits_close_else_on_one_line() {
        assert_eq!(
            texts("if(a == NULL){ return 1; } else { return 2; }"),
            ["if(a == NULL) {", "return 1;", "}", "else {", "return 2;", "}"]
        );
    }

    #[test]
    fn splits_close_else_if() {
        assert_eq!(
            texts("if(a) {\n x = 1;\n} else if(b) {\n x = 2;\n}"),
            ["if(a) {", "x = 1;", "}", "else if(b) {", "x = 2;", "}"]
        );
    }

    #[test]
    fn brace_on_next_line_stays_separate() {
        assert_eq!(texts("if(a)\n{\nx = 1;\n}"), ["if(a)", "{", "x = 1;", "}"]);
    }

    #[test]
    fn map_literal_braces_are_not_blocks() {
        assert_eq!(
            texts("m = {\"a\": 1,\n \"b\": {\"c\": 2}};\nx = 1;"),
            ["m = {\"a\": 1,  \"b\": {\"c\": 2}};", "x = 1;"]
        );
    }

    #[test]
    fn literals_shield_delimiters() {
        assert_eq!(
            texts(r#"s = "a; } else { // not a comment"; t = 'x{y';"#),
            [r#"s = "a; } else { // not a comment";"#, "t = 'x{y';"]
        );
        assert_eq!(texts(r#"s = "say \"hi\"; ok";"#), [r#"s = "say \"hi\"; ok";"#]);
    }

    #[test]
    fn strips_comments() {
        assert_eq!(
            texts("// heading\na = 1; // trailing\n/* block\n spanning */ b = 2;"),
            ["a = 1;", "b = 2;"]
        );
    }

    #[test]
    fn unfolds_one_line_invokeurl() {
        assert_eq!(
            texts(r#"r = invokeurl [ url: "http://x"; type: GET; ];"#),
            ["r = invokeurl [", "url: \"http://x\"", "type: GET", "];"]
        );
    }

    #[test]
    fn joins_invokeurl_with_bracket_on_next_line() {
        let src = "resp = invokeurl\n[\n\turl: \"http://x\"\n\ttype: POST\n\tparameters: {\"a\": 1}\n];\ninfo resp;";
        assert_eq!(
            texts(src),
            [
                "resp = invokeurl [",
                "url: \"http://x\"",
                "type: POST",
                "parameters: {\"a\": 1}",
                "];",
                "info resp;"
            ]
        );
    }

    #[test]
    fn parens_join_physical_lines() {
        assert_eq!(texts("x = foo(1,\n  2);"), ["x = foo(1,   2);"]);
    }

    #[test]
    fn line_numbers_are_tracked() {
        let lines = preprocess("a = 1;\n\nif(a) {\n  b = 2;\n}");
        let nums: Vec<usize> = lines.iter().map(|l| l.line).collect();
        assert_eq!(nums, [1, 3, 4, 5]);
    }

    #[test]
    fn header_keywords_need_word_boundary() {
        assert!(is_block_header("if(x)"));
        assert!(is_block_header("else"));
        assert!(is_block_header("for each r in rows"));
        assert!(!is_block_header("ifnull(x)"));
        assert!(!is_block_header("elsewhere ="));
        assert!(!is_block_header("format ="));
    }
}
