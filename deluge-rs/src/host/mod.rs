//! Host executor for translated scripts.
//!
//! The translator emits indentation-structured statements; this module
//! parses and runs them against the runtime value model and the built-in
//! table.  It covers the statement forms the translator produces:
//!
//! - assignment (plain and compound), expression statements
//! - `if` / `elif` / `else`, `while`, `for … in`
//! - `return`, `break`, `continue`
//!
//! # Quick start
//!
//! ```rust
//! use deluge::host::run_script;
//! use deluge::runtime::Map;
//!
//! let v = run_script("a = 1; b = 2; return a + b;", &Map::new()).unwrap();
//! assert_eq!(v.to_string(), "3");
//! ```

pub mod exec;
pub mod expr;
pub mod program;

use tracing::debug;

use crate::builtins::BuiltinTable;
use crate::config::Config;
use crate::error::{RuntimeError, RuntimeResult};
use crate::http::HttpClient;
use crate::runtime::{Map, Value};
use crate::translate::{Diagnostic, Translator};

pub use exec::{ControlFlow, Executor};
pub use expr::EvalContext;
pub use program::{parse_program, Stmt};

/// Result of running one script.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Value of the executed `return`, or null.
    pub value: Value,
    /// Lines written by `info`.
    pub output: Vec<String>,
    /// Lines the translator dropped (lenient mode only).
    pub diagnostics: Vec<Diagnostic>,
}

/// Translator, built-ins and caller context bundled together.
#[derive(Debug)]
pub struct Runtime {
    config: Config,
    translator: Translator,
    builtins: BuiltinTable,
    context: Map,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(Config::default())
    }
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        let client = HttpClient::new(config.user_agent.clone(), config.timeout);
        Runtime {
            translator: Translator::new(config.translate_options()),
            builtins: BuiltinTable::with_client(client),
            context: Map::new(),
            config,
        }
    }

    /// Variables visible to every script run by this runtime.
    pub fn with_context(mut self, context: Map) -> Self {
        self.context = context;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context_mut(&mut self) -> &mut Map {
        &mut self.context
    }

    pub fn builtins(&self) -> &BuiltinTable {
        &self.builtins
    }

    /// For registering or replacing built-ins.
    pub fn builtins_mut(&mut self) -> &mut BuiltinTable {
        &mut self.builtins
    }

    /// Translate `script` to host code.  In strict mode any diagnostic is
    /// an error.
    pub fn translate(&self, script: &str) -> RuntimeResult<(String, Vec<Diagnostic>)> {
        let t = self.translator.translate(script);
        if self.config.strict && !t.is_complete() {
            return Err(RuntimeError::Translation(t.diagnostics));
        }
        Ok((t.code, t.diagnostics))
    }

    /// Translate and run `script`.
    pub fn run(&self, script: &str) -> RuntimeResult<Outcome> {
        let (code, diagnostics) = self.translate(script)?;
        debug!(lines = code.lines().count(), dropped = diagnostics.len(), "translated");
        let stmts = parse_program(&code)?;
        let mut exec = Executor::with_context(&self.builtins, &self.context);
        let value = exec.run(&stmts)?;
        Ok(Outcome {
            value,
            output: exec.take_output(),
            diagnostics,
        })
    }

    /// Translate and run `script`, returning its value.
    pub fn execute(&self, script: &str) -> RuntimeResult<Value> {
        self.run(script).map(|o| o.value)
    }
}

/// One-shot: run `script` with default settings and `context` as its
/// initial variables.
pub fn run_script(script: &str, context: &Map) -> RuntimeResult<Value> {
    Runtime::default()
        .with_context(context.clone())
        .execute(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_mode_refuses_partial_translation() {
        let cfg = Config {
            strict: true,
            ..Config::default()
        };
        let rt = Runtime::new(cfg);
        let err = rt.execute("x = 1;\nthis is not deluge\nreturn x;").unwrap_err();
        assert!(matches!(err, RuntimeError::Translation(ref d) if d.len() == 1));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn lenient_mode_runs_what_it_can() {
        let rt = Runtime::default();
        let out = rt.run("x = 1;\nthis is not deluge\nreturn x;").unwrap();
        assert_eq!(out.value, Value::Int(1));
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn context_and_stubbed_builtin() {
        let mut ctx = Map::new();
        ctx.put("base", 40);
        let mut rt = Runtime::default().with_context(ctx);
        rt.builtins_mut().register("getUrl", |_| Ok(Value::from("2")));
        let v = rt.execute("r = getUrl(\"http://x\");\nreturn base + r.toLong();").unwrap();
        assert_eq!(v, Value::Int(42));
    }

    #[test]
    fn run_script_one_shot() {
        let mut ctx = Map::new();
        ctx.put("who", "world");
        let v = run_script("return \"hello \" + who;", &ctx).unwrap();
        assert_eq!(v, Value::from("hello world"));
    }
}
