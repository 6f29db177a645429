//! Expression lexer, AST, parser and evaluator for translated code.
//!
//! Operator precedence (lowest → highest):
//!   assign  →  or  →  and  →  not  →  comparison  →  additive  →
//!   multiplicative  →  unary  →  postfix (call, method, index)  →  primary
//!
//! Both spellings of the logical operators are accepted (`and`/`&&`,
//! `or`/`||`, `not`/`!`), as are the Deluge literals `true`, `false` and
//! `null` next to `True`, `False` and `None`.  Textual condition mode can
//! leave either form in the emitted code.

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::{call_method, List, Map, Value};

// ── EvalContext ───────────────────────────────────────────────────────────────

/// Variables and function calls, supplied by the executor.
pub trait EvalContext {
    fn get_var(&self, name: &str) -> Option<Value>;

    fn set_var(&mut self, name: &str, value: Value);

    /// Invoke a built-in by name.
    fn call_fn(&mut self, name: &str, args: Vec<Value>) -> RuntimeResult<Value>;
}

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    // Comparison
    Eq, // ==
    Ne, // !=
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    AndAnd, // &&
    OrOr,   // ||

    // Assignment
    Assign,        // =
    PlusAssign,    // +=
    MinusAssign,   // -=
    StarAssign,    // *=
    SlashAssign,   // /=
    PercentAssign, // %=

    // Punctuation
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer {
    src: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Lexer {
            src: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn take_digits(&mut self, s: &mut String) {
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            s.push(c);
            self.pos += 1;
        }
    }

    fn read_number(&mut self, first: char) -> Result<Token, String> {
        let mut s = String::from(first);
        self.take_digits(&mut s);
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            s.push('.');
            self.pos += 1;
            self.take_digits(&mut s);
        }
        if is_float {
            s.parse()
                .map(Token::Float)
                .map_err(|_| format!("invalid number `{s}`"))
        } else {
            s.parse()
                .map(Token::Int)
                .map_err(|_| format!("integer literal `{s}` out of range"))
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, String> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err("unterminated string literal".into()),
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some(c @ ('\\' | '"' | '\'')) => s.push(c),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                    None => return Err("unterminated string literal".into()),
                },
                Some(c) if c == quote => return Ok(Token::Str(s)),
                Some(c) => s.push(c),
            }
        }
    }

    fn read_ident(&mut self, first: char) -> Token {
        let mut s = String::from(first);
        while let Some(c) = self.peek().filter(|c| c.is_alphanumeric() || *c == '_') {
            s.push(c);
            self.pos += 1;
        }
        Token::Ident(s)
    }

    /// `op` alone, or `with_eq` when followed by `=`.
    fn maybe_eq(&mut self, op: Token, with_eq: Token) -> Token {
        if self.eat('=') {
            with_eq
        } else {
            op
        }
    }

    fn next_token(&mut self) -> Result<Token, String> {
        self.skip_ws();
        let Some(ch) = self.advance() else {
            return Ok(Token::Eof);
        };
        Ok(match ch {
            '0'..='9' => return self.read_number(ch),
            '"' | '\'' => return self.read_string(ch),
            c if c.is_alphabetic() || c == '_' => self.read_ident(c),
            '+' => self.maybe_eq(Token::Plus, Token::PlusAssign),
            '-' => self.maybe_eq(Token::Minus, Token::MinusAssign),
            '*' => self.maybe_eq(Token::Star, Token::StarAssign),
            '/' => self.maybe_eq(Token::Slash, Token::SlashAssign),
            '%' => self.maybe_eq(Token::Percent, Token::PercentAssign),
            '!' => self.maybe_eq(Token::Bang, Token::Ne),
            '=' => self.maybe_eq(Token::Assign, Token::Eq),
            '<' => self.maybe_eq(Token::Lt, Token::Le),
            '>' => self.maybe_eq(Token::Gt, Token::Ge),
            '&' if self.eat('&') => Token::AndAnd,
            '|' if self.eat('|') => Token::OrOr,
            '.' => Token::Dot,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            c => return Err(format!("unexpected character `{c}`")),
        })
    }

    fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token()?;
            let done = t == Token::Eof;
            tokens.push(t);
            if done {
                return Ok(tokens);
            }
        }
    }
}

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Is,
    IsNot,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Assign(String, AssignOp, Box<Expr>),
    Call(String, Vec<Expr>),
    /// `receiver.name(args)`
    Method(Box<Expr>, String, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    MapLit(Vec<(Expr, Expr)>),
    ListLit(Vec<Expr>),
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Token::Ident(w) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected {what}, found {:?}", self.peek()))
        }
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_assign(&mut self) -> Result<Expr, String> {
        if let Token::Ident(name) = self.peek().clone() {
            let op = match self.tokens.get(self.pos + 1) {
                Some(Token::Assign) => Some(AssignOp::Set),
                Some(Token::PlusAssign) => Some(AssignOp::Add),
                Some(Token::MinusAssign) => Some(AssignOp::Sub),
                Some(Token::StarAssign) => Some(AssignOp::Mul),
                Some(Token::SlashAssign) => Some(AssignOp::Div),
                Some(Token::PercentAssign) => Some(AssignOp::Rem),
                _ => None,
            };
            if let Some(op) = op {
                self.pos += 2;
                let rhs = self.parse_or()?;
                return Ok(Expr::Assign(name, op, Box::new(rhs)));
            }
        }
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::OrOr) || self.eat_word("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_not()?;
        while self.eat(&Token::AndAnd) || self.eat_word("and") {
            let rhs = self.parse_not()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if self.eat_word("not") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                Token::Ident(w) if w == "is" => BinOp::Is,
                _ => break,
            };
            self.pos += 1;
            let op = if op == BinOp::Is && self.eat_word("not") {
                BinOp::IsNot
            } else {
                op
            };
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        Ok(Expr::Unary(op, Box::new(self.parse_unary()?)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let Token::Ident(name) = self.advance() else {
                    return Err("expected a method name after `.`".into());
                };
                if !self.eat(&Token::LParen) {
                    return Err(format!("attribute access `.{name}` is not supported"));
                }
                let args = self.parse_list(&Token::RParen, "`)`")?;
                expr = Expr::Method(Box::new(expr), name, args);
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_or()?;
                self.expect(&Token::RBracket, "`]`")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: &Token, what: &str) -> Result<Vec<Expr>, String> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.parse_or()?);
            if !self.eat(&Token::Comma) {
                self.expect(close, what)?;
                break;
            }
        }
        Ok(items)
    }

    /// `{k: v, …}` is a map, `{a, b}` a list, `{}` an empty map.
    fn parse_brace(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::RBrace) {
            return Ok(Expr::MapLit(Vec::new()));
        }
        let first = self.parse_or()?;
        if !self.eat(&Token::Colon) {
            let mut items = vec![first];
            if self.eat(&Token::Comma) {
                items.extend(self.parse_list(&Token::RBrace, "`}`")?);
            } else {
                self.expect(&Token::RBrace, "`}`")?;
            }
            return Ok(Expr::ListLit(items));
        }
        let mut pairs = vec![(first, self.parse_or()?)];
        while self.eat(&Token::Comma) {
            if self.peek() == &Token::RBrace {
                break;
            }
            let key = self.parse_or()?;
            self.expect(&Token::Colon, "`:` in map literal")?;
            pairs.push((key, self.parse_or()?));
        }
        self.expect(&Token::RBrace, "`}`")?;
        Ok(Expr::MapLit(pairs))
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Token::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Token::Float(x) => Ok(Expr::Literal(Value::Float(x))),
            Token::Str(s) => Ok(Expr::Literal(Value::from(s))),
            Token::Ident(name) => {
                let literal = match name.as_str() {
                    "True" | "true" => Some(Value::Bool(true)),
                    "False" | "false" => Some(Value::Bool(false)),
                    "None" | "null" | "NULL" => Some(Value::Null),
                    "and" | "or" | "not" | "is" => return Err(format!("unexpected `{name}`")),
                    _ => None,
                };
                if let Some(v) = literal {
                    Ok(Expr::Literal(v))
                } else if self.eat(&Token::LParen) {
                    let args = self.parse_list(&Token::RParen, "`)`")?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(inner)
            }
            Token::LBracket => Ok(Expr::ListLit(self.parse_list(&Token::RBracket, "`]`")?)),
            Token::LBrace => self.parse_brace(),
            Token::Eof => Err("unexpected end of expression".into()),
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

/// Parse one expression (or assignment); trailing tokens are an error.
pub fn parse_expr(src: &str) -> Result<Expr, String> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_assign()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(format!("unexpected {other:?} after expression")),
    }
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

/// Evaluate an [`Expr`] against `ctx`.
pub fn eval_expr(expr: &Expr, ctx: &mut dyn EvalContext) -> RuntimeResult<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),

        Expr::Var(name) => ctx
            .get_var(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable { name: name.clone() }),

        Expr::Unary(op, inner) => {
            let v = eval_expr(inner, ctx)?;
            match op {
                UnaryOp::Neg => v.arith_neg(),
                UnaryOp::Pos => match v {
                    Value::Int(_) | Value::Float(_) => Ok(v),
                    other => Err(RuntimeError::mismatch(format!(
                        "bad operand for unary +: {}",
                        other.type_name()
                    ))),
                },
                UnaryOp::Not => Ok(Value::Bool(!v.as_bool())),
            }
        }

        // `and`/`or` short-circuit and yield the deciding operand.
        Expr::Binary(BinOp::And, lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            if l.as_bool() {
                eval_expr(rhs, ctx)
            } else {
                Ok(l)
            }
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            if l.as_bool() {
                Ok(l)
            } else {
                eval_expr(rhs, ctx)
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            let r = eval_expr(rhs, ctx)?;
            binary(*op, &l, &r)
        }

        Expr::Assign(name, op, rhs) => {
            let v = eval_expr(rhs, ctx)?;
            let v = match compound(*op) {
                None => v,
                Some(bin) => {
                    let cur = ctx
                        .get_var(name)
                        .ok_or_else(|| RuntimeError::UndefinedVariable { name: name.clone() })?;
                    binary(bin, &cur, &v)?
                }
            };
            ctx.set_var(name, v.clone());
            Ok(v)
        }

        Expr::Call(name, args) => {
            let args = eval_all(args, ctx)?;
            ctx.call_fn(name, args)
        }

        Expr::Method(recv, name, args) => {
            let recv = eval_expr(recv, ctx)?;
            let args = eval_all(args, ctx)?;
            call_method(&recv, name, &args)
        }

        Expr::Index(recv, index) => {
            let recv = eval_expr(recv, ctx)?;
            let index = eval_expr(index, ctx)?;
            subscript(&recv, &index)
        }

        Expr::MapLit(pairs) => {
            let mut m = Map::new();
            for (k, v) in pairs {
                let k = eval_expr(k, ctx)?;
                let v = eval_expr(v, ctx)?;
                m.put(k.to_string(), v);
            }
            Ok(Value::map(m))
        }

        Expr::ListLit(items) => Ok(Value::list(eval_all(items, ctx)?.into_iter().collect::<List>())),
    }
}

fn eval_all(exprs: &[Expr], ctx: &mut dyn EvalContext) -> RuntimeResult<Vec<Value>> {
    exprs.iter().map(|e| eval_expr(e, ctx)).collect()
}

/// Operator applied by a compound assignment.
fn compound(op: AssignOp) -> Option<BinOp> {
    match op {
        AssignOp::Set => None,
        AssignOp::Add => Some(BinOp::Add),
        AssignOp::Sub => Some(BinOp::Sub),
        AssignOp::Mul => Some(BinOp::Mul),
        AssignOp::Div => Some(BinOp::Div),
        AssignOp::Rem => Some(BinOp::Rem),
    }
}

fn binary(op: BinOp, l: &Value, r: &Value) -> RuntimeResult<Value> {
    match op {
        BinOp::Add => l.arith_add(r),
        BinOp::Sub => l.arith_sub(r),
        BinOp::Mul => l.arith_mul(r),
        BinOp::Div => l.arith_div(r),
        BinOp::Rem => l.arith_rem(r),
        BinOp::Eq => Ok(Value::Bool(l == r)),
        BinOp::Ne => Ok(Value::Bool(l != r)),
        BinOp::Is => Ok(Value::Bool(identical(l, r))),
        BinOp::IsNot => Ok(Value::Bool(!identical(l, r))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ord = l.compare(r).ok_or_else(|| {
                RuntimeError::mismatch(format!(
                    "cannot compare {} with {}",
                    l.type_name(),
                    r.type_name()
                ))
            })?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ord.is_lt(),
                BinOp::Le => ord.is_le(),
                BinOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            }))
        }
        BinOp::And => Ok(if l.as_bool() { r.clone() } else { l.clone() }),
        BinOp::Or => Ok(if l.as_bool() { l.clone() } else { r.clone() }),
    }
}

/// `is`: containers by handle, null only with null, scalars by value.
fn identical(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Map(a), Value::Map(b)) => std::rc::Rc::ptr_eq(a, b),
        (Value::List(a), Value::List(b)) => std::rc::Rc::ptr_eq(a, b),
        _ => l == r,
    }
}

fn subscript(recv: &Value, index: &Value) -> RuntimeResult<Value> {
    match (recv, index) {
        (Value::List(l), Value::Int(i)) => Ok(l.borrow().get(*i)),
        (Value::Map(m), key) => Ok(m.borrow().get(&key.to_string())),
        (Value::Str(s), Value::Int(i)) if *i >= 0 => Ok(Value::Str(s.substring(*i, Some(*i + 1)))),
        _ => Err(RuntimeError::mismatch(format!(
            "cannot index {} with {}",
            recv.type_name(),
            index.type_name()
        ))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Vars(HashMap<String, Value>);

    impl EvalContext for Vars {
        fn get_var(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }

        fn set_var(&mut self, name: &str, value: Value) {
            self.0.insert(name.to_owned(), value);
        }

        fn call_fn(&mut self, name: &str, args: Vec<Value>) -> RuntimeResult<Value> {
            match name {
                "deluge_string" => Ok(Value::from(args[0].to_string())),
                "Map" => Ok(Value::map(Map::new())),
                _ => Err(RuntimeError::UnknownFunction { name: name.into() }),
            }
        }
    }

    fn eval(src: &str) -> Value {
        eval_in(&mut Vars::default(), src)
    }

    fn eval_in(vars: &mut Vars, src: &str) -> Value {
        let expr = parse_expr(src).unwrap_or_else(|e| panic!("{src}: {e}"));
        eval_expr(&expr, vars).unwrap_or_else(|e| panic!("{src}: {e}"))
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(eval("-2 + 5"), Value::Int(3));
        assert_eq!(eval("7 % 4"), Value::Int(3));
        assert_eq!(eval("6 / 3"), Value::Int(2));
        assert_eq!(eval("1.5 + 1"), Value::Float(2.5));
        assert_eq!(eval("\"a\" + 1"), Value::from("a1"));
    }

    #[test]
    fn comparison_and_logic() {
        assert_eq!(eval("1 < 2 and 2 <= 2"), Value::Bool(true));
        assert_eq!(eval("1 > 2 || 3 >= 3"), Value::Bool(true));
        assert_eq!(eval("not 1 == 1"), Value::Bool(false));
        assert_eq!(eval("!false && true"), Value::Bool(true));
        assert_eq!(eval("1 != 1.0"), Value::Bool(false));
        assert_eq!(eval("0 or \"x\""), Value::from("x"));
        assert_eq!(eval("0 and missing"), Value::Int(0));
    }

    #[test]
    fn null_identity() {
        assert_eq!(eval("None is None"), Value::Bool(true));
        assert_eq!(eval("null is not None"), Value::Bool(false));
        assert_eq!(eval("0 is None"), Value::Bool(false));
        let mut vars = Vars::default();
        eval_in(&mut vars, "m = {}");
        eval_in(&mut vars, "n = m");
        assert_eq!(eval_in(&mut vars, "m is n"), Value::Bool(true));
        assert_eq!(eval_in(&mut vars, "m is {}"), Value::Bool(false));
    }

    #[test]
    fn literals() {
        assert_eq!(eval(r#"{"a": 1, "b": "x",}"#).to_string(), r#"{"a":1,"b":"x"}"#);
        assert_eq!(eval("[1, 2, 3]").to_string(), "[1,2,3]");
        assert_eq!(eval("{1, 2}").to_string(), "[1,2]");
        assert_eq!(eval("{}").to_string(), "{}");
        assert_eq!(eval(r#"'it\'s'"#), Value::from("it's"));
        assert_eq!(eval("\"héllo\".length()"), Value::Int(5));
    }

    #[test]
    fn assignment_and_compound() {
        let mut vars = Vars::default();
        assert_eq!(eval_in(&mut vars, "x = 2"), Value::Int(2));
        eval_in(&mut vars, "x += 3");
        eval_in(&mut vars, "x *= 2");
        assert_eq!(vars.get_var("x"), Some(Value::Int(10)));
    }

    #[test]
    fn methods_and_subscripts() {
        let mut vars = Vars::default();
        eval_in(&mut vars, "l = [10, 20]");
        eval_in(&mut vars, "l.add(30)");
        assert_eq!(eval_in(&mut vars, "l.size()"), Value::Int(3));
        assert_eq!(eval_in(&mut vars, "l[2]"), Value::Int(30));
        assert_eq!(eval_in(&mut vars, "l[9]"), Value::Null);
        assert_eq!(eval_in(&mut vars, r#"{"k": 1}["k"]"#), Value::Int(1));
        assert_eq!(eval_in(&mut vars, r#""abc"[1]"#), Value::from("b"));
        assert_eq!(eval(r#"deluge_string("Hi").toUpperCase()"#), Value::from("HI"));
    }

    #[test]
    fn errors() {
        assert!(parse_expr("1 +").is_err());
        assert!(parse_expr("\"open").is_err());
        assert!(parse_expr("a.b").is_err());
        assert!(parse_expr("1 2").is_err());
        assert!(parse_expr("99999999999999999999").is_err());
        let mut vars = Vars::default();
        let undefined = eval_expr(&parse_expr("y + 1").unwrap(), &mut vars).unwrap_err();
        assert!(matches!(undefined, RuntimeError::UndefinedVariable { name } if name == "y"));
        let cmp = eval_expr(&parse_expr("1 < \"a\"").unwrap(), &mut vars).unwrap_err();
        assert!(matches!(cmp, RuntimeError::TypeMismatch { .. }));
        let div = eval_expr(&parse_expr("1 / 0").unwrap(), &mut vars).unwrap_err();
        assert!(matches!(div, RuntimeError::DivisionByZero));
    }
}
