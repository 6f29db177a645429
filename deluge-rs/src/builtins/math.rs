//! Numeric built-ins.
//!
//! Integer inputs stay integers where the operation allows it (`abs`,
//! `min`, `max`, `power` with a non-negative exponent, `round` to zero
//! places); everything else produces a decimal.

use rand::Rng;

use super::{check_arity, int_arg, num_arg, BuiltinTable};
use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::Value;

const RANDOM_MAX: i64 = 2_000_000_000;

pub(super) fn register(t: &mut BuiltinTable) {
    unary(t, "cos", f64::cos);
    unary(t, "sin", f64::sin);
    unary(t, "tan", f64::tan);
    unary(t, "exp", f64::exp);
    unary(t, "toDecimal", |x| x);

    t.register("log", |args| {
        check_arity("log", args, 1, 1, "1")?;
        let x = num_arg(args, 0, "log")?;
        if x <= 0.0 {
            return Err(domain_error("log", x));
        }
        Ok(Value::Float(x.ln()))
    });
    t.register("sqrt", |args| {
        check_arity("sqrt", args, 1, 1, "1")?;
        let x = num_arg(args, 0, "sqrt")?;
        if x < 0.0 {
            return Err(domain_error("sqrt", x));
        }
        Ok(Value::Float(x.sqrt()))
    });
    t.register("abs", |args| {
        check_arity("abs", args, 1, 1, "1")?;
        match &args[0] {
            Value::Int(n) => Ok(Value::Int(n.wrapping_abs())),
            _ => Ok(Value::Float(num_arg(args, 0, "abs")?.abs())),
        }
    });
    t.register("min", |args| pick("min", args, |a, b| b < a));
    t.register("max", |args| pick("max", args, |a, b| b > a));
    t.register("power", power);
    t.register("round", round);
    t.register("ceil", |args| {
        check_arity("ceil", args, 1, 1, "1")?;
        Ok(Value::Int(num_arg(args, 0, "ceil")?.ceil() as i64))
    });
    t.register("floor", |args| {
        check_arity("floor", args, 1, 1, "1")?;
        Ok(Value::Int(num_arg(args, 0, "floor")?.floor() as i64))
    });
    t.register("toHex", |args| {
        check_arity("toHex", args, 1, 1, "1")?;
        Ok(Value::from(to_hex(int_arg(args, 0, "toHex")?)))
    });
    t.register("randomNumber", random_number);
}

fn unary(t: &mut BuiltinTable, name: &'static str, f: fn(f64) -> f64) {
    t.register(name, move |args| {
        check_arity(name, args, 1, 1, "1")?;
        Ok(Value::Float(f(num_arg(args, 0, name)?)))
    });
}

fn domain_error(name: &str, x: f64) -> RuntimeError {
    RuntimeError::mismatch(format!("{name}: math domain error for {x}"))
}

/// Return whichever argument wins `better`, keeping its original type.
fn pick(name: &str, args: &[Value], better: fn(f64, f64) -> bool) -> RuntimeResult<Value> {
    check_arity(name, args, 2, 2, "2")?;
    let a = num_arg(args, 0, name)?;
    let b = num_arg(args, 1, name)?;
    Ok(if better(a, b) {
        args[1].clone()
    } else {
        args[0].clone()
    })
}

fn power(args: &[Value]) -> RuntimeResult<Value> {
    check_arity("power", args, 2, 2, "2")?;
    if let (Value::Int(base), Value::Int(exp)) = (&args[0], &args[1]) {
        if let Some(n) = u32::try_from(*exp).ok().and_then(|e| base.checked_pow(e)) {
            return Ok(Value::Int(n));
        }
    }
    let base = num_arg(args, 0, "power")?;
    let exp = num_arg(args, 1, "power")?;
    Ok(Value::Float(base.powf(exp)))
}

/// Round half to even, to `decimals` places.
fn round(args: &[Value]) -> RuntimeResult<Value> {
    check_arity("round", args, 1, 2, "1 or 2")?;
    let decimals = if args.len() == 2 {
        int_arg(args, 1, "round")?
    } else {
        0
    };
    if let Value::Int(n) = &args[0] {
        if decimals >= 0 {
            return Ok(Value::Int(*n));
        }
    }
    let x = num_arg(args, 0, "round")?;
    let scale = 10f64.powi(decimals.clamp(-308, 308) as i32);
    let rounded = (x * scale).round_ties_even() / scale;
    Ok(match &args[0] {
        Value::Int(_) => Value::Int(rounded as i64),
        _ => Value::Float(rounded),
    })
}

pub fn to_hex(n: i64) -> String {
    if n < 0 {
        format!("-0x{:x}", n.unsigned_abs())
    } else {
        format!("0x{n:x}")
    }
}

/// `randomNumber([max[, min]])`: uniform in `min..max`.
fn random_number(args: &[Value]) -> RuntimeResult<Value> {
    check_arity("randomNumber", args, 0, 2, "0 to 2")?;
    let max = if args.is_empty() {
        RANDOM_MAX
    } else {
        int_arg(args, 0, "randomNumber")?
    };
    let min = if args.len() == 2 {
        int_arg(args, 1, "randomNumber")?
    } else {
        0
    };
    if min >= max {
        return Err(RuntimeError::mismatch(format!(
            "randomNumber: empty range {min}..{max}"
        )));
    }
    Ok(Value::Int(rand::thread_rng().gen_range(min..max)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> RuntimeResult<Value> {
        BuiltinTable::standard().call(name, args)
    }

    #[test]
    fn integer_preserving() {
        assert!(matches!(call("abs", &[Value::Int(-3)]).unwrap(), Value::Int(3)));
        assert!(matches!(call("min", &[Value::Int(3), Value::Float(2.5)]).unwrap(), Value::Float(x) if x == 2.5));
        assert!(matches!(call("max", &[Value::Int(3), Value::Float(2.5)]).unwrap(), Value::Int(3)));
        assert!(matches!(call("power", &[Value::Int(2), Value::Int(10)]).unwrap(), Value::Int(1024)));
        assert!(matches!(call("power", &[Value::Int(2), Value::Int(-1)]).unwrap(), Value::Float(x) if x == 0.5));
    }

    #[test]
    fn rounding_is_half_even() {
        assert!(matches!(call("round", &[Value::Float(2.5)]).unwrap(), Value::Float(x) if x == 2.0));
        assert!(matches!(call("round", &[Value::Float(3.5)]).unwrap(), Value::Float(x) if x == 4.0));
        assert!(matches!(
            call("round", &[Value::Float(3.14159), Value::Int(2)]).unwrap(),
            Value::Float(x) if (x - 3.14).abs() < 1e-9
        ));
        assert!(matches!(call("round", &[Value::Int(7)]).unwrap(), Value::Int(7)));
        assert!(matches!(call("round", &[Value::Int(1250), Value::Int(-2)]).unwrap(), Value::Int(1200)));
    }

    #[test]
    fn ceil_floor_hex() {
        assert!(matches!(call("ceil", &[Value::Float(1.2)]).unwrap(), Value::Int(2)));
        assert!(matches!(call("floor", &[Value::Float(-1.2)]).unwrap(), Value::Int(-2)));
        assert_eq!(to_hex(255), "0xff");
        assert_eq!(to_hex(-255), "-0xff");
        assert_eq!(to_hex(0), "0x0");
    }

    #[test]
    fn domain_errors() {
        assert!(call("log", &[Value::Int(0)]).is_err());
        assert!(call("sqrt", &[Value::Int(-1)]).is_err());
        assert!(matches!(call("sqrt", &[Value::Int(9)]).unwrap(), Value::Float(x) if x == 3.0));
        assert!(call("cos", &["x".into()]).is_err());
    }

    #[test]
    fn random_in_range() {
        for _ in 0..50 {
            match call("randomNumber", &[Value::Int(10), Value::Int(5)]).unwrap() {
                Value::Int(n) => assert!((5..10).contains(&n)),
                other => panic!("expected long, got {other:?}"),
            }
        }
        assert!(call("randomNumber", &[Value::Int(1), Value::Int(1)]).is_err());
        assert!(matches!(call("randomNumber", &[]).unwrap(), Value::Int(n) if (0..RANDOM_MAX).contains(&n)));
    }
}
