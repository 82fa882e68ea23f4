//! Implementation of the `system_math` host namespace.
//!
//! `system_math` is seeded into every fresh environment and reached by
//! dotted lookup: `system_math.sqrt(16)` resolves the attribute to a native
//! callable, `system_math.pi` to a float constant. All functions take float
//! arguments (integers are widened) and return floats, except the rounding
//! family which returns integers.

use std::str::FromStr;

use strum::{Display, EnumString};

use crate::builtins::NativeCallable;
use crate::error::{Error, RunResult};
use crate::value::Value;

/// Math namespace functions, dispatched by attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MathFunction {
    Sqrt,
    Floor,
    Ceil,
    Trunc,
    Fabs,
    Pow,
    Sin,
    Cos,
    Tan,
    Log,
    Log2,
    Log10,
    Exp,
}

/// Resolves a dotted attribute of `system_math` to a value.
///
/// Functions become native callables; constants evaluate immediately.
pub fn lookup(attr: &str) -> Option<Value> {
    if let Ok(function) = MathFunction::from_str(attr) {
        return Some(Value::Native(NativeCallable::Math(function)));
    }
    let constant = match attr {
        "pi" => std::f64::consts::PI,
        "e" => std::f64::consts::E,
        "tau" => std::f64::consts::TAU,
        "inf" => f64::INFINITY,
        "nan" => f64::NAN,
        _ => return None,
    };
    Some(Value::Float(constant))
}

impl MathFunction {
    /// Executes the function with the provided positional arguments.
    pub fn call(self, args: Vec<Value>) -> RunResult<Value> {
        match self {
            Self::Pow => {
                let (base, exp) = two_floats(self, &args)?;
                Ok(Value::Float(base.powf(exp)))
            }
            Self::Log => match args.len() {
                1 => Ok(Value::Float(one_float(self, &args)?.ln())),
                2 => {
                    let (x, base) = two_floats(self, &args)?;
                    Ok(Value::Float(x.log(base)))
                }
                n => Err(arity_error(self, "1 or 2", n)),
            },
            Self::Floor => Ok(Value::Int(one_float(self, &args)?.floor() as i64)),
            Self::Ceil => Ok(Value::Int(one_float(self, &args)?.ceil() as i64)),
            Self::Trunc => Ok(Value::Int(one_float(self, &args)?.trunc() as i64)),
            Self::Sqrt => {
                let x = one_float(self, &args)?;
                if x < 0.0 {
                    return Err(Error::value("math domain error").stage("system_math"));
                }
                Ok(Value::Float(x.sqrt()))
            }
            Self::Fabs => Ok(Value::Float(one_float(self, &args)?.abs())),
            Self::Sin => Ok(Value::Float(one_float(self, &args)?.sin())),
            Self::Cos => Ok(Value::Float(one_float(self, &args)?.cos())),
            Self::Tan => Ok(Value::Float(one_float(self, &args)?.tan())),
            Self::Log2 => Ok(Value::Float(one_float(self, &args)?.log2())),
            Self::Log10 => Ok(Value::Float(one_float(self, &args)?.log10())),
            Self::Exp => Ok(Value::Float(one_float(self, &args)?.exp())),
        }
    }
}

fn as_float(function: MathFunction, value: &Value) -> RunResult<f64> {
    match value {
        Value::Int(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v),
        other => Err(Error::type_error(format!(
            "system_math.{function}() expects a number, not {}",
            other.type_name()
        ))
        .stage("system_math")),
    }
}

fn one_float(function: MathFunction, args: &[Value]) -> RunResult<f64> {
    match args {
        [value] => as_float(function, value),
        _ => Err(arity_error(function, "1", args.len())),
    }
}

fn two_floats(function: MathFunction, args: &[Value]) -> RunResult<(f64, f64)> {
    match args {
        [a, b] => Ok((as_float(function, a)?, as_float(function, b)?)),
        _ => Err(arity_error(function, "2", args.len())),
    }
}

fn arity_error(function: MathFunction, expected: &str, got: usize) -> Error {
    Error::type_error(format!(
        "system_math.{function}() takes {expected} argument(s) ({got} given)"
    ))
    .stage("system_math")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_of_sixteen() {
        let result = MathFunction::Sqrt.call(vec![Value::Int(16)]).unwrap();
        assert!(matches!(result, Value::Float(v) if v == 4.0));
    }

    #[test]
    fn floor_returns_int() {
        let result = MathFunction::Floor.call(vec![Value::Float(2.9)]).unwrap();
        assert!(matches!(result, Value::Int(2)));
    }

    #[test]
    fn lookup_resolves_functions_and_constants() {
        assert!(matches!(lookup("sqrt"), Some(Value::Native(_))));
        assert!(matches!(lookup("pi"), Some(Value::Float(_))));
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn sqrt_of_negative_is_domain_error() {
        let err = MathFunction::Sqrt.call(vec![Value::Int(-1)]).unwrap_err();
        assert!(err.message().contains("domain"));
    }
}
