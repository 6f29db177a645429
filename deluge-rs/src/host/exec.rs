//! Statement executor.

use std::collections::HashMap;

use tracing::{debug, info};

use super::expr::{eval_expr, EvalContext};
use super::program::Stmt;
use crate::builtins::{info_line, BuiltinTable};
use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::{Map, Value};

// ── ControlFlow ───────────────────────────────────────────────────────────────

/// Non-local exit from a block.
#[derive(Debug, Clone)]
pub enum ControlFlow {
    Break,
    Continue,
    Return(Value),
}

// ── Executor ──────────────────────────────────────────────────────────────────

/// Runs a statement tree against one flat variable scope.
pub struct Executor<'b> {
    builtins: &'b BuiltinTable,
    vars: HashMap<String, Value>,
    output: Vec<String>,
}

impl<'b> Executor<'b> {
    pub fn new(builtins: &'b BuiltinTable) -> Self {
        Executor {
            builtins,
            vars: HashMap::new(),
            output: Vec::new(),
        }
    }

    /// An executor whose variables start as the entries of `context`.
    pub fn with_context(builtins: &'b BuiltinTable, context: &Map) -> Self {
        let mut exec = Executor::new(builtins);
        for (k, v) in context.iter() {
            exec.vars.insert(k.clone(), v.clone());
        }
        exec
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Lines written by `info`, in order.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Run a whole program; its value is whatever `return` produced, else null.
    pub fn run(&mut self, stmts: &[Stmt]) -> RuntimeResult<Value> {
        match self.exec_block(stmts)? {
            Some(ControlFlow::Return(v)) => Ok(v),
            Some(ControlFlow::Break | ControlFlow::Continue) | None => Ok(Value::Null),
        }
    }

    pub fn exec_block(&mut self, stmts: &[Stmt]) -> RuntimeResult<Option<ControlFlow>> {
        for stmt in stmts {
            if let Some(cf) = self.exec_stmt(stmt)? {
                return Ok(Some(cf));
            }
        }
        Ok(None)
    }

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> RuntimeResult<Option<ControlFlow>> {
        match stmt {
            Stmt::Expr(e) => {
                eval_expr(e, self)?;
                Ok(None)
            }

            Stmt::If {
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    if eval_expr(cond, self)?.as_bool() {
                        return self.exec_block(body);
                    }
                }
                self.exec_block(otherwise)
            }

            Stmt::While { cond, body } => {
                while eval_expr(cond, self)?.as_bool() {
                    match self.exec_block(body)? {
                        Some(ControlFlow::Break) => break,
                        Some(cf @ ControlFlow::Return(_)) => return Ok(Some(cf)),
                        Some(ControlFlow::Continue) | None => {}
                    }
                }
                Ok(None)
            }

            Stmt::ForEach {
                var,
                iterable,
                body,
            } => {
                let items = iteration_items(&eval_expr(iterable, self)?)?;
                debug!(var = %var, count = items.len(), "for each");
                for item in items {
                    self.vars.insert(var.clone(), item);
                    match self.exec_block(body)? {
                        Some(ControlFlow::Break) => break,
                        Some(cf @ ControlFlow::Return(_)) => return Ok(Some(cf)),
                        Some(ControlFlow::Continue) | None => {}
                    }
                }
                Ok(None)
            }

            Stmt::Return(value) => {
                let v = match value {
                    Some(e) => eval_expr(e, self)?,
                    None => Value::Null,
                };
                Ok(Some(ControlFlow::Return(v)))
            }

            Stmt::Break => Ok(Some(ControlFlow::Break)),
            Stmt::Continue => Ok(Some(ControlFlow::Continue)),
            Stmt::Pass => Ok(None),
        }
    }
}

/// Snapshot of what a `for` loop visits: list elements or map keys.
fn iteration_items(v: &Value) -> RuntimeResult<Vec<Value>> {
    match v {
        Value::List(l) => Ok(l.borrow().iter().cloned().collect()),
        Value::Map(m) => Ok(m.borrow().iter().map(|(k, _)| Value::from(k.as_str())).collect()),
        other => Err(RuntimeError::mismatch(format!(
            "cannot iterate over {}",
            other.type_name()
        ))),
    }
}

impl EvalContext for Executor<'_> {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn set_var(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_owned(), value);
    }

    fn call_fn(&mut self, name: &str, args: Vec<Value>) -> RuntimeResult<Value> {
        if name == "info" {
            let line = info_line(&args);
            info!(target: "deluge::script", "{line}");
            self.output.push(line);
            return Ok(Value::Null);
        }
        self.builtins.call(name, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::program::parse_program;

    fn run(code: &str) -> (Value, Vec<String>) {
        let builtins = BuiltinTable::standard();
        let stmts = parse_program(code).unwrap();
        let mut exec = Executor::new(&builtins);
        let v = exec.run(&stmts).unwrap();
        (v, exec.take_output())
    }

    #[test]
    fn returns_value() {
        assert_eq!(run("a = 1\nb = 2\nreturn a + b").0, Value::Int(3));
        assert_eq!(run("a = 1").0, Value::Null);
    }

    #[test]
    fn branches() {
        let code = "x = 5\nif x > 10:\n    r = \"big\"\nelif x > 3:\n    r = \"mid\"\nelse:\n    r = \"small\"\nreturn r";
        assert_eq!(run(code).0, Value::from("mid"));
    }

    #[test]
    fn loops_with_break_and_continue() {
        let code = "\
total = 0
for n in [1, 2, 3, 4, 5]:
    if n == 2:
        continue
    if n == 5:
        break
    total += n
return total";
        assert_eq!(run(code).0, Value::Int(8));

        let code = "i = 0\nwhile i < 3:\n    i += 1\nreturn i";
        assert_eq!(run(code).0, Value::Int(3));
    }

    #[test]
    fn for_over_map_visits_keys() {
        let code = "m = {\"a\": 1, \"b\": 2}\nks = \"\"\nfor k in m:\n    ks = ks + k\nreturn ks";
        assert_eq!(run(code).0, Value::from("ab"));
    }

    #[test]
    fn return_inside_loop_exits() {
        let code = "for n in [1, 2, 3]:\n    if n == 2:\n        return n\nreturn 0";
        assert_eq!(run(code).0, Value::Int(2));
    }

    #[test]
    fn info_is_captured() {
        let (_, out) = run("info(\"a\", 1)\ninfo({\"k\": [1]})");
        assert_eq!(out, vec!["a 1".to_owned(), r#"{"k":[1]}"#.to_owned()]);
    }

    #[test]
    fn context_seeds_variables() {
        let builtins = BuiltinTable::standard();
        let mut ctx = Map::new();
        ctx.put("name", "Ada");
        let mut exec = Executor::with_context(&builtins, &ctx);
        let stmts = parse_program("greeting = \"Hi \" + name\nreturn greeting.length()").unwrap();
        assert_eq!(exec.run(&stmts).unwrap(), Value::Int(6));
        assert_eq!(exec.var("greeting"), Some(&Value::from("Hi Ada")));
    }

    #[test]
    fn errors_propagate() {
        let builtins = BuiltinTable::standard();
        let mut exec = Executor::new(&builtins);
        let stmts = parse_program("for x in 5:\n    y = x").unwrap();
        assert!(matches!(exec.run(&stmts), Err(RuntimeError::TypeMismatch { .. })));
        let stmts = parse_program("nope()").unwrap();
        assert!(matches!(exec.run(&stmts), Err(RuntimeError::UnknownFunction { .. })));
        let stmts = parse_program("x = \"abc\".toLong()").unwrap();
        assert!(matches!(exec.run(&stmts), Err(RuntimeError::Parse(_))));
    }
}
