//! Built-in function table.
//!
//! Translated code calls built-ins by bare name (`getUrl(u)`, `Map()`,
//! `base64Encode(s)`).  The host executor resolves those names through a
//! [`BuiltinTable`]; callers may [`register`](BuiltinTable::register)
//! replacements, which is how tests stub the network.
//!
//! Each function receives already-evaluated arguments.  Argument count and
//! type problems are typed [`RuntimeError`]s; network failures are values
//! (see [`network`]).

pub mod encoding;
pub mod math;
pub mod network;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::info;

use crate::error::{RuntimeError, RuntimeResult};
use crate::http::HttpClient;
use crate::runtime::{DelugeString, List, Map, Value};

/// A callable built-in.
pub type BuiltinFn = Rc<dyn Fn(&[Value]) -> RuntimeResult<Value>>;

/// Name → callable registry.
#[derive(Clone, Default)]
pub struct BuiltinTable {
    fns: HashMap<String, BuiltinFn>,
}

impl fmt::Debug for BuiltinTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinTable")
            .field("names", &self.names())
            .finish()
    }
}

impl BuiltinTable {
    /// An empty table.
    pub fn new() -> Self {
        BuiltinTable::default()
    }

    /// Every standard built-in, with network calls going through a default
    /// [`HttpClient`].
    pub fn standard() -> Self {
        BuiltinTable::with_client(HttpClient::default())
    }

    /// Every standard built-in, with network calls going through `client`.
    pub fn with_client(client: HttpClient) -> Self {
        let mut table = BuiltinTable::new();
        register_core(&mut table);
        encoding::register(&mut table);
        math::register(&mut table);
        network::register(&mut table, client);
        table
    }

    /// Add or replace `name`.
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> RuntimeResult<Value> + 'static,
    {
        self.fns.insert(name.to_owned(), Rc::new(f));
    }

    pub fn lookup(&self, name: &str) -> Option<BuiltinFn> {
        self.fns.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    /// Call `name`, failing with [`RuntimeError::UnknownFunction`] if absent.
    pub fn call(&self, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        match self.fns.get(name) {
            Some(f) => f(args),
            None => Err(RuntimeError::UnknownFunction {
                name: name.to_owned(),
            }),
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ── Argument helpers ──────────────────────────────────────────────────────────

pub(crate) fn check_arity(
    name: &str,
    args: &[Value],
    min: usize,
    max: usize,
    expected: &'static str,
) -> RuntimeResult<()> {
    if args.len() < min || args.len() > max {
        return Err(RuntimeError::arity(name, expected, args.len()));
    }
    Ok(())
}

/// Text of argument `i`; null is rejected.
pub(crate) fn str_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<String> {
    match args.get(i) {
        Some(Value::Null) => Err(RuntimeError::mismatch(format!(
            "{name}: argument {} is null",
            i + 1
        ))),
        Some(v) => Ok(v.to_string()),
        None => Err(RuntimeError::arity(name, "more", args.len())),
    }
}

/// Numeric argument `i` as `f64`.
pub(crate) fn num_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<f64> {
    match args.get(i) {
        Some(v) => v.as_float().ok_or_else(|| {
            RuntimeError::mismatch(format!(
                "{name}: argument {} must be a number, got {}",
                i + 1,
                v.type_name()
            ))
        }),
        None => Err(RuntimeError::arity(name, "more", args.len())),
    }
}

/// Integer argument `i`; decimals are truncated.
pub(crate) fn int_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<i64> {
    match args.get(i) {
        Some(Value::Int(n)) => Ok(*n),
        Some(_) => num_arg(args, i, name).map(|x| x as i64),
        None => Err(RuntimeError::arity(name, "more", args.len())),
    }
}

// ── Core ──────────────────────────────────────────────────────────────────────

fn status(text: &str) -> Value {
    let mut m = Map::new();
    m.put("status", text);
    Value::map(m)
}

fn register_core(t: &mut BuiltinTable) {
    t.register("Map", new_map);
    t.register("Collection", new_map);
    t.register("List", new_list);
    t.register("deluge_string", |args| {
        check_arity("deluge_string", args, 1, 1, "1")?;
        Ok(match &args[0] {
            Value::Str(s) => Value::Str(s.clone()),
            Value::Null => Value::Str(DelugeString::default()),
            other => Value::from(other.to_string()),
        })
    });
    t.register("ifnull", |args| {
        check_arity("ifnull", args, 2, 2, "2")?;
        Ok(if args[0].is_null() {
            args[1].clone()
        } else {
            args[0].clone()
        })
    });
    t.register("replaceAll", |args| {
        check_arity("replaceAll", args, 3, 3, "3")?;
        let text = str_arg(args, 0, "replaceAll")?;
        let search = str_arg(args, 1, "replaceAll")?;
        let replace = str_arg(args, 2, "replaceAll")?;
        Ok(Value::from(text.replace(&search, &replace)))
    });
    t.register("info", |args| {
        let line = info_line(args);
        info!(target: "deluge::script", "{line}");
        Ok(Value::Null)
    });
    t.register("sendemail", |_| Ok(status("email_sent")));
    t.register("sendsms", |_| Ok(status("sms_sent")));
    t.register("pushNotification", |_| Ok(status("notification_sent")));
}

/// Arguments of an `info` call joined the way they are logged.
pub fn info_line(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn new_map(args: &[Value]) -> RuntimeResult<Value> {
    match args {
        [] => Ok(Value::map(Map::new())),
        [Value::Map(m)] => Ok(Value::map(m.borrow().clone())),
        [other] => Err(RuntimeError::mismatch(format!(
            "Map: cannot build a map from {}",
            other.type_name()
        ))),
        _ => Err(RuntimeError::arity("Map", "0 or 1", args.len())),
    }
}

/// `List()` is empty, `List(list)` copies, `List(a, b, …)` collects.
fn new_list(args: &[Value]) -> RuntimeResult<Value> {
    match args {
        [Value::List(l)] => Ok(Value::list(l.borrow().clone())),
        items => Ok(Value::list(items.iter().cloned().collect::<List>())),
    }
}
