//! Method dispatch for `receiver.method(args)` calls in translated code.
//!
//! Names are the camelCase spellings Deluge scripts use; the translator
//! passes them through untouched, so every name here is callable verbatim.

use crate::error::{RuntimeError, RuntimeResult};
use super::list::List;
use super::map::Map;
use super::string::DelugeString;
use super::value::{Shared, Value};

pub const STRING_METHODS: &[&str] = &[
    "length",
    "isEmpty",
    "contains",
    "containsIgnoreCase",
    "startsWith",
    "endsWith",
    "equalsIgnoreCase",
    "matches",
    "toUpperCase",
    "toLowerCase",
    "trim",
    "substring",
    "subString",
    "subText",
    "indexOf",
    "lastIndexOf",
    "getPrefix",
    "getSuffix",
    "getAlpha",
    "getAlphaNumeric",
    "getOccurence",
    "replaceAll",
    "replaceFirst",
    "remove",
    "removeFirstOccurence",
    "removeLastOccurence",
    "leftPad",
    "rightPad",
    "toList",
    "toMap",
    "toJSONList",
    "toLong",
    "toDate",
    "toString",
];

pub const MAP_METHODS: &[&str] = &[
    "put",
    "putAll",
    "get",
    "containKey",
    "containValue",
    "remove",
    "keys",
    "values",
    "size",
    "isEmpty",
    "clear",
    "toString",
];

pub const LIST_METHODS: &[&str] = &[
    "add",
    "addAll",
    "get",
    "remove",
    "removeElement",
    "contains",
    "indexOf",
    "lastIndexOf",
    "lastindexOf",
    "size",
    "isEmpty",
    "isempty",
    "clear",
    "sort",
    "distinct",
    "intersect",
    "sublist",
    "toString",
];

const NUMBER_METHODS: &[&str] = &["toLong", "toDecimal", "toString"];

/// Whether any runtime type answers to `name`.
pub fn is_runtime_method(name: &str) -> bool {
    [STRING_METHODS, MAP_METHODS, LIST_METHODS, NUMBER_METHODS]
        .iter()
        .any(|set| set.contains(&name))
}

/// Invoke `name` on `receiver`.
pub fn call_method(receiver: &Value, name: &str, args: &[Value]) -> RuntimeResult<Value> {
    match receiver {
        Value::Str(s) => string_method(s, name, args),
        Value::Map(m) => map_method(m, name, args),
        Value::List(l) => list_method(l, name, args),
        Value::Int(_) | Value::Float(_) => number_method(receiver, name, args),
        Value::Date(_) | Value::Bool(_) if name == "toString" => {
            arity(name, args, 0, 0, "0")?;
            Ok(Value::from(receiver.to_string()))
        }
        other => Err(unknown(other, name)),
    }
}

// ── Argument helpers ──────────────────────────────────────────────────────────

fn unknown(receiver: &Value, method: &str) -> RuntimeError {
    RuntimeError::UnknownMethod {
        type_name: receiver.type_name(),
        method: method.to_owned(),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize, expected: &'static str) -> RuntimeResult<()> {
    if args.len() < min || args.len() > max {
        return Err(RuntimeError::arity(name, expected, args.len()));
    }
    Ok(())
}

/// String form of an argument.  Numbers are accepted and formatted.
fn str_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<String> {
    match args.get(i) {
        Some(Value::Null) => Err(RuntimeError::mismatch(format!(
            "{name}: argument {} is null",
            i + 1
        ))),
        Some(v) => Ok(v.to_string()),
        None => Err(RuntimeError::arity(name, "more", args.len())),
    }
}

fn int_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<i64> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s.to_long()?),
        Some(v) => v.as_int().ok_or_else(|| {
            RuntimeError::mismatch(format!(
                "{name}: argument {} must be a number, got {}",
                i + 1,
                v.type_name()
            ))
        }),
        None => Err(RuntimeError::arity(name, "more", args.len())),
    }
}

fn opt_int_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<Option<i64>> {
    match args.get(i) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => int_arg(args, i, name).map(Some),
    }
}

fn value_arg<'a>(args: &'a [Value], i: usize, name: &str) -> RuntimeResult<&'a Value> {
    args.get(i)
        .ok_or_else(|| RuntimeError::arity(name, "more", args.len()))
}

fn map_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<Map> {
    match value_arg(args, i, name)? {
        Value::Map(m) => Ok(m.borrow().clone()),
        other => Err(RuntimeError::mismatch(format!(
            "{name}: expected a map, got {}",
            other.type_name()
        ))),
    }
}

fn list_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<List> {
    match value_arg(args, i, name)? {
        Value::List(l) => Ok(l.borrow().clone()),
        other => Err(RuntimeError::mismatch(format!(
            "{name}: expected a list, got {}",
            other.type_name()
        ))),
    }
}

fn len_arg(args: &[Value], i: usize, name: &str) -> RuntimeResult<usize> {
    Ok(int_arg(args, i, name)?.max(0) as usize)
}

// ── String ────────────────────────────────────────────────────────────────────

fn string_method(s: &DelugeString, name: &str, args: &[Value]) -> RuntimeResult<Value> {
    let v = match name {
        "length" => {
            arity(name, args, 0, 0, "0")?;
            Value::Int(s.length() as i64)
        }
        "isEmpty" => {
            arity(name, args, 0, 0, "0")?;
            Value::Bool(s.is_empty())
        }
        "contains" => {
            arity(name, args, 1, 1, "1")?;
            Value::Bool(s.contains(&str_arg(args, 0, name)?))
        }
        "containsIgnoreCase" => {
            arity(name, args, 1, 1, "1")?;
            Value::Bool(s.contains_ignore_case(&str_arg(args, 0, name)?))
        }
        "startsWith" => {
            arity(name, args, 1, 1, "1")?;
            Value::Bool(s.starts_with(&str_arg(args, 0, name)?))
        }
        "endsWith" => {
            arity(name, args, 1, 1, "1")?;
            Value::Bool(s.ends_with(&str_arg(args, 0, name)?))
        }
        "equalsIgnoreCase" => {
            arity(name, args, 1, 1, "1")?;
            Value::Bool(s.equals_ignore_case(&str_arg(args, 0, name)?))
        }
        "matches" => {
            arity(name, args, 1, 1, "1")?;
            Value::Bool(s.matches(&str_arg(args, 0, name)?)?)
        }
        "toUpperCase" => s.to_upper_case().into(),
        "toLowerCase" => s.to_lower_case().into(),
        "trim" => s.trim().into(),
        "substring" | "subString" | "subText" => {
            arity(name, args, 1, 2, "1 or 2")?;
            s.substring(int_arg(args, 0, name)?, opt_int_arg(args, 1, name)?)
                .into()
        }
        "indexOf" => {
            arity(name, args, 1, 1, "1")?;
            Value::Int(s.index_of(&str_arg(args, 0, name)?))
        }
        "lastIndexOf" => {
            arity(name, args, 1, 1, "1")?;
            Value::Int(s.last_index_of(&str_arg(args, 0, name)?))
        }
        "getPrefix" => {
            arity(name, args, 1, 1, "1")?;
            s.get_prefix(&str_arg(args, 0, name)?).into()
        }
        "getSuffix" => {
            arity(name, args, 1, 1, "1")?;
            s.get_suffix(&str_arg(args, 0, name)?).into()
        }
        "getAlpha" => s.get_alpha().into(),
        "getAlphaNumeric" => s.get_alpha_numeric().into(),
        "getOccurence" => {
            arity(name, args, 1, 1, "1")?;
            Value::Int(s.get_occurence(&str_arg(args, 0, name)?))
        }
        "replaceAll" => {
            arity(name, args, 2, 2, "2")?;
            s.replace_all(&str_arg(args, 0, name)?, &str_arg(args, 1, name)?)?
                .into()
        }
        "replaceFirst" => {
            arity(name, args, 2, 2, "2")?;
            s.replace_first(&str_arg(args, 0, name)?, &str_arg(args, 1, name)?)?
                .into()
        }
        "remove" => {
            arity(name, args, 1, 1, "1")?;
            s.remove(&str_arg(args, 0, name)?).into()
        }
        "removeFirstOccurence" => {
            arity(name, args, 1, 1, "1")?;
            s.remove_first_occurence(&str_arg(args, 0, name)?).into()
        }
        "removeLastOccurence" => {
            arity(name, args, 1, 1, "1")?;
            s.remove_last_occurence(&str_arg(args, 0, name)?).into()
        }
        "leftPad" => {
            arity(name, args, 2, 2, "2")?;
            s.left_pad(&str_arg(args, 0, name)?, len_arg(args, 1, name)?)
                .into()
        }
        "rightPad" => {
            arity(name, args, 2, 2, "2")?;
            s.right_pad(&str_arg(args, 0, name)?, len_arg(args, 1, name)?)
                .into()
        }
        "toList" => {
            arity(name, args, 0, 1, "0 or 1")?;
            let sep = match args.first() {
                Some(v) => v.to_string(),
                None => ",".to_owned(),
            };
            s.to_list(&sep).into()
        }
        "toMap" => s.to_map()?.into(),
        "toJSONList" => s.to_json_list()?.into(),
        "toLong" => Value::Int(s.to_long()?),
        "toDate" => Value::Date(s.to_date()?),
        "toString" => Value::Str(s.clone()),
        _ => return Err(unknown(&Value::Str(s.clone()), name)),
    };
    Ok(v)
}

// ── Map ───────────────────────────────────────────────────────────────────────

fn map_method(m: &Shared<Map>, name: &str, args: &[Value]) -> RuntimeResult<Value> {
    let v = match name {
        "put" => {
            arity(name, args, 2, 2, "2")?;
            let key = str_arg(args, 0, name)?;
            m.borrow_mut().put(key, args[1].clone());
            Value::Null
        }
        "putAll" => {
            arity(name, args, 1, 1, "1")?;
            let other = map_arg(args, 0, name)?;
            m.borrow_mut().put_all(&other);
            Value::Null
        }
        "get" => {
            arity(name, args, 1, 1, "1")?;
            m.borrow().get(&str_arg(args, 0, name)?)
        }
        "containKey" => {
            arity(name, args, 1, 1, "1")?;
            Value::Bool(m.borrow().contain_key(&str_arg(args, 0, name)?))
        }
        "containValue" => {
            arity(name, args, 1, 1, "1")?;
            Value::Bool(m.borrow().contain_value(&args[0]))
        }
        "remove" => {
            arity(name, args, 1, 1, "1")?;
            let key = str_arg(args, 0, name)?;
            m.borrow_mut().remove(&key)
        }
        "keys" => m.borrow().keys().into(),
        "values" => m.borrow().values().into(),
        "size" => Value::Int(m.borrow().size() as i64),
        "isEmpty" => Value::Bool(m.borrow().is_empty()),
        "clear" => {
            m.borrow_mut().clear();
            Value::Null
        }
        "toString" => Value::from(Value::Map(m.clone()).to_string()),
        _ => return Err(unknown(&Value::Map(m.clone()), name)),
    };
    Ok(v)
}

// ── List ──────────────────────────────────────────────────────────────────────

fn list_method(l: &Shared<List>, name: &str, args: &[Value]) -> RuntimeResult<Value> {
    let v = match name {
        "add" => {
            arity(name, args, 1, 1, "1")?;
            l.borrow_mut().add(args[0].clone());
            Value::Null
        }
        "addAll" => {
            arity(name, args, 1, 1, "1")?;
            let other = list_arg(args, 0, name)?;
            l.borrow_mut().add_all(&other);
            Value::Null
        }
        "get" => {
            arity(name, args, 1, 1, "1")?;
            l.borrow().get(int_arg(args, 0, name)?)
        }
        "remove" => {
            arity(name, args, 1, 1, "1")?;
            let index = int_arg(args, 0, name)?;
            l.borrow_mut().remove(index)
        }
        "removeElement" => {
            arity(name, args, 1, 1, "1")?;
            // The argument may be the receiver itself; compare before mutating.
            let index = l.borrow().index_of(&args[0]);
            if index >= 0 {
                l.borrow_mut().remove(index);
            }
            Value::Bool(index >= 0)
        }
        "contains" => {
            arity(name, args, 1, 1, "1")?;
            Value::Bool(l.borrow().contains(&args[0]))
        }
        "indexOf" => {
            arity(name, args, 1, 1, "1")?;
            Value::Int(l.borrow().index_of(&args[0]))
        }
        "lastIndexOf" | "lastindexOf" => {
            arity(name, args, 1, 1, "1")?;
            Value::Int(l.borrow().last_index_of(&args[0]))
        }
        "size" => Value::Int(l.borrow().size() as i64),
        "isEmpty" | "isempty" => Value::Bool(l.borrow().is_empty()),
        "clear" => {
            l.borrow_mut().clear();
            Value::Null
        }
        "sort" => {
            arity(name, args, 0, 1, "0 or 1")?;
            let ascending = args.first().map_or(true, Value::as_bool);
            l.borrow_mut().sort(ascending)?;
            Value::List(l.clone())
        }
        "distinct" => l.borrow().distinct().into(),
        "intersect" => {
            arity(name, args, 1, 1, "1")?;
            let other = list_arg(args, 0, name)?;
            l.borrow().intersect(&other).into()
        }
        "sublist" => {
            arity(name, args, 1, 2, "1 or 2")?;
            let start = int_arg(args, 0, name)?;
            let end = opt_int_arg(args, 1, name)?;
            l.borrow().sublist(start, end).into()
        }
        "toString" => Value::from(Value::List(l.clone()).to_string()),
        _ => return Err(unknown(&Value::List(l.clone()), name)),
    };
    Ok(v)
}

// ── Numbers ───────────────────────────────────────────────────────────────────

fn number_method(n: &Value, name: &str, args: &[Value]) -> RuntimeResult<Value> {
    arity(name, args, 0, 0, "0")?;
    match name {
        "toLong" => Ok(Value::Int(n.as_int().unwrap_or_default())),
        "toDecimal" => Ok(Value::Float(n.as_float().unwrap_or_default())),
        "toString" => Ok(Value::from(n.to_string())),
        _ => Err(unknown(n, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(recv: &Value, name: &str, args: &[Value]) -> Value {
        call_method(recv, name, args).unwrap()
    }

    #[test]
    fn string_surface() {
        let s = Value::from("Hello World");
        assert_eq!(call(&s, "length", &[]), Value::Int(11));
        assert_eq!(call(&s, "toUpperCase", &[]), Value::from("HELLO WORLD"));
        assert_eq!(call(&s, "subString", &[Value::Int(6)]), Value::from("World"));
        assert_eq!(
            call(&s, "substring", &[Value::Int(0), Value::Int(5)]),
            Value::from("Hello")
        );
        assert_eq!(call(&s, "getPrefix", &["@".into()]), Value::from(""));
        assert_eq!(call(&s, "contains", &["World".into()]), Value::Bool(true));
        assert_eq!(s, Value::from("Hello World"));
    }

    #[test]
    fn string_to_list_defaults_to_comma() {
        let l = call(&Value::from("a,b"), "toList", &[]);
        match l {
            Value::List(l) => assert_eq!(l.borrow().size(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn string_parse_failure_is_typed() {
        let err = call_method(&Value::from("nope"), "toLong", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::Parse(_)));
    }

    #[test]
    fn pad_accepts_string_length() {
        let v = call(&Value::from("7"), "leftPad", &["0".into(), "3".into()]);
        assert_eq!(v, Value::from("007"));
    }

    #[test]
    fn map_mutates_through_handle() {
        let m = Value::map(Map::new());
        call(&m, "put", &["a".into(), Value::Int(1)]);
        call(&m, "put", &["b".into(), Value::Int(2)]);
        assert_eq!(call(&m, "get", &["a".into()]), Value::Int(1));
        assert_eq!(call(&m, "size", &[]), Value::Int(2));
        assert_eq!(call(&m, "containKey", &["b".into()]), Value::Bool(true));
        assert_eq!(call(&m, "remove", &["a".into()]), Value::Int(1));
        assert_eq!(call(&m, "toString", &[]), Value::from(r#"{"b":2}"#));
    }

    #[test]
    fn put_all_with_itself() {
        let m = Value::map(Map::new());
        call(&m, "put", &["a".into(), Value::Int(1)]);
        call(&m, "putAll", &[m.clone()]);
        assert_eq!(call(&m, "size", &[]), Value::Int(1));
    }

    #[test]
    fn list_methods_given_their_own_receiver() {
        let l = Value::list(List::new());
        call(&l, "add", &[Value::list(List::new())]);
        assert_eq!(call(&l, "contains", &[l.clone()]), Value::Bool(false));
        assert_eq!(call(&l, "removeElement", &[l.clone()]), Value::Bool(false));
        assert_eq!(call(&l, "size", &[]), Value::Int(1));

        call(&l, "addAll", &[l.clone()]);
        assert_eq!(call(&l, "size", &[]), Value::Int(2));
        assert_eq!(call(&l, "removeElement", &[Value::list(List::new())]), Value::Bool(true));
        assert_eq!(call(&l, "size", &[]), Value::Int(1));
    }

    #[test]
    fn list_surface() {
        let l = Value::list(List::new());
        for n in [3, 1, 2, 1] {
            call(&l, "add", &[Value::Int(n)]);
        }
        assert_eq!(call(&l, "get", &[Value::Int(10)]), Value::Null);
        assert_eq!(call(&l, "lastindexOf", &[Value::Int(1)]), Value::Int(3));
        let distinct = call(&l, "distinct", &[]);
        assert_eq!(call(&distinct, "size", &[]), Value::Int(3));
        assert_eq!(call(&l, "size", &[]), Value::Int(4));
        call(&l, "sort", &[Value::Bool(false)]);
        assert_eq!(call(&l, "get", &[Value::Int(0)]), Value::Int(3));
        call(&l, "addAll", &[l.clone()]);
        assert_eq!(call(&l, "size", &[]), Value::Int(8));
    }

    #[test]
    fn unknown_method_and_arity() {
        let err = call_method(&Value::from("x"), "frobnicate", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownMethod { type_name: "string", .. }));
        let err = call_method(&Value::from("x"), "contains", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::Arity { got: 0, .. }));
        assert!(call_method(&Value::Null, "size", &[]).is_err());
    }

    #[test]
    fn numbers_convert() {
        assert_eq!(call(&Value::Float(2.9), "toLong", &[]), Value::Int(2));
        assert_eq!(call(&Value::Int(2), "toString", &[]), Value::from("2"));
        assert!(is_runtime_method("toDecimal"));
        assert!(!is_runtime_method("frobnicate"));
    }
}
