//! Dynamic value type shared by translated programs and built-ins.
//!
//! Maps and lists are shared mutable handles: binding one map to two names
//! and writing through either is visible through both, as in Deluge.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use chrono::NaiveDateTime;

use crate::error::{RuntimeError, RuntimeResult};
use super::list::List;
use super::map::Map;
use super::string::DelugeString;

/// Shared, interior-mutable handle used for container values.
pub type Shared<T> = Rc<RefCell<T>>;

/// A Deluge runtime value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(DelugeString),
    Date(NaiveDateTime),
    Map(Shared<Map>),
    List(Shared<List>),
}

impl Value {
    pub fn map(m: Map) -> Value {
        Value::Map(Rc::new(RefCell::new(m)))
    }

    pub fn list(l: List) -> Value {
        Value::List(Rc::new(RefCell::new(l)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "long",
            Value::Float(_) => "decimal",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::Map(_) => "map",
            Value::List(_) => "list",
        }
    }

    /// Truthiness: null, `false`, zero, and empty strings or containers are falsy.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Date(_) => true,
            Value::Map(m) => !m.borrow().is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(x) => Some(*x as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&DelugeString> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    // ── Arithmetic ────────────────────────────────────────────────────────────

    /// `+`: numeric addition, or concatenation when either side is a string.
    pub fn arith_add(&self, rhs: &Value) -> RuntimeResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Ok(Value::from(format!("{self}{rhs}")))
            }
            _ => self.float_op(rhs, "+", |a, b| a + b),
        }
    }

    pub fn arith_sub(&self, rhs: &Value) -> RuntimeResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(*b))),
            _ => self.float_op(rhs, "-", |a, b| a - b),
        }
    }

    pub fn arith_mul(&self, rhs: &Value) -> RuntimeResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(*b))),
            _ => self.float_op(rhs, "*", |a, b| a * b),
        }
    }

    /// `/`: integer result when both sides are integers and the division is
    /// exact, decimal otherwise.
    pub fn arith_div(&self, rhs: &Value) -> RuntimeResult<Value> {
        if rhs.as_float() == Some(0.0) {
            return Err(RuntimeError::DivisionByZero);
        }
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) if a.checked_rem(*b) == Some(0) => {
                Ok(Value::Int(a.wrapping_div(*b)))
            }
            _ => self.float_op(rhs, "/", |a, b| a / b),
        }
    }

    pub fn arith_rem(&self, rhs: &Value) -> RuntimeResult<Value> {
        if rhs.as_float() == Some(0.0) {
            return Err(RuntimeError::DivisionByZero);
        }
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_rem(*b))),
            _ => self.float_op(rhs, "%", |a, b| a % b),
        }
    }

    pub fn arith_neg(&self) -> RuntimeResult<Value> {
        match self {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Float(x) => Ok(Value::Float(-x)),
            other => Err(RuntimeError::mismatch(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        }
    }

    fn float_op(&self, rhs: &Value, op: &str, f: impl Fn(f64, f64) -> f64) -> RuntimeResult<Value> {
        match (self.as_float(), rhs.as_float()) {
            (Some(a), Some(b)) => Ok(Value::Float(f(a, b))),
            _ => Err(RuntimeError::mismatch(format!(
                "unsupported operand types for {op}: {} and {}",
                self.type_name(),
                rhs.type_name()
            ))),
        }
    }

    // ── Ordering ─────────────────────────────────────────────────────────────

    /// Ordering between mutually comparable values: numbers with numbers,
    /// strings with strings, dates with dates, booleans with booleans.
    /// Anything else is `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_float()?.partial_cmp(&b.as_float()?)
            }
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    // ── JSON ─────────────────────────────────────────────────────────────────

    /// Convert decoded JSON into a runtime value.  Integral numbers become
    /// `Int`, other numbers `Float`.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::list(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into JSON.  Dates are rendered as strings; a container that
    /// contains itself is rendered as [`CYCLE_MARKER`] where it recurs.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_within(&mut Vec::new())
    }

    fn to_json_within(&self, open: &mut Vec<*const ()>) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::Date(d) => serde_json::Value::String(format_date(d)),
            Value::Map(m) => {
                let p = container_ptr(m);
                if open.contains(&p) {
                    return serde_json::Value::String(CYCLE_MARKER.to_owned());
                }
                open.push(p);
                let fields = m
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_within(open)))
                    .collect();
                open.pop();
                serde_json::Value::Object(fields)
            }
            Value::List(l) => {
                let p = container_ptr(l);
                if open.contains(&p) {
                    return serde_json::Value::String(CYCLE_MARKER.to_owned());
                }
                open.push(p);
                let items = l.borrow().iter().map(|v| v.to_json_within(open)).collect();
                open.pop();
                serde_json::Value::Array(items)
            }
        }
    }
}

/// Rendered in place of a container already being rendered.
pub const CYCLE_MARKER: &str = "<cycle>";

fn container_ptr<T>(rc: &Shared<T>) -> *const () {
    Rc::as_ptr(rc) as *const ()
}

fn format_date(d: &NaiveDateTime) -> String {
    d.format("%Y-%m-%d %H:%M:%S").to_string()
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        eq_within(self, other, &mut Vec::new())
    }
}

/// Structural equality.  `open` holds the container pairs under comparison;
/// meeting one again means the two cycles line up, so it counts as equal.
fn eq_within(a: &Value, b: &Value, open: &mut Vec<(*const (), *const ())>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (a, b) if a.is_numeric() && b.is_numeric() => a.as_float() == b.as_float(),
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Date(a), Value::Date(b)) => a == b,
        (Value::Map(x), Value::Map(y)) => {
            let pair = (container_ptr(x), container_ptr(y));
            if Rc::ptr_eq(x, y) || open.contains(&pair) {
                return true;
            }
            open.push(pair);
            let (x, y) = (x.borrow(), y.borrow());
            let same = x.size() == y.size()
                && x.iter()
                    .all(|(k, v)| y.contain_key(k) && eq_within(v, &y.get(k), open));
            open.pop();
            same
        }
        (Value::List(x), Value::List(y)) => {
            let pair = (container_ptr(x), container_ptr(y));
            if Rc::ptr_eq(x, y) || open.contains(&pair) {
                return true;
            }
            open.push(pair);
            let (x, y) = (x.borrow(), y.borrow());
            let same = x.size() == y.size()
                && x.iter()
                    .zip(y.iter())
                    .all(|(v, w)| eq_within(v, w, open));
            open.pop();
            same
        }
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::Date(d) => f.write_str(&format_date(d)),
            Value::Map(_) | Value::List(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(DelugeString::new(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(DelugeString::from(s))
    }
}

impl From<DelugeString> for Value {
    fn from(s: DelugeString) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::map(m)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::list(l)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
