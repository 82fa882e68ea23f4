//! Variables and the ordered environment.
//!
//! An [`Environment`] is an insertion-ordered map from identifier to
//! [`Variable`]. Every fresh environment is pre-populated with the builtins
//! registry. Lookup is exact-match first; names containing `.` fall back to
//! attribute walks on the head value, which is how `system_math.sqrt` and
//! imported module members are reached.

use indexmap::IndexMap;
use strum::Display;

use crate::builtins::{Builtin, NativeCallable};
use crate::error::{Error, RunResult};
use crate::modules::math;
use crate::value::Value;

/// Kind tag mirroring the value tag plus the binding-specific labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum VarKind {
    None,
    Int,
    Float,
    Str,
    Func,
    Module,
    HostModule,
    /// Formal parameter binding.
    Arg,
    /// Result of a dotted lookup into a host value.
    Derived,
}

impl VarKind {
    /// The kind a plain (non-arg, non-derived) binding of `value` gets.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::None => Self::None,
            Value::Int(_) => Self::Int,
            Value::Float(_) => Self::Float,
            Value::Str(_) => Self::Str,
            Value::Native(_) | Value::Function(_) => Self::Func,
            Value::Module(_) => Self::Module,
            Value::Math => Self::HostModule,
        }
    }
}

/// A named binding.
///
/// `owner` is the label of the environment the variable lives in; it is a
/// diagnostic breadcrumb, not an ownership edge.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub value: Value,
    pub kind: VarKind,
    pub owner: String,
}

/// Insertion-ordered variable store, seeded with the builtins registry.
#[derive(Debug, Clone)]
pub struct Environment {
    label: String,
    vars: IndexMap<String, Variable>,
}

impl Environment {
    /// Creates an environment pre-populated with the builtins registry.
    pub fn new(label: impl Into<String>) -> Self {
        let mut env = Self {
            label: label.into(),
            vars: IndexMap::new(),
        };
        env.define("system", Value::Native(NativeCallable::Builtin(Builtin::System)), VarKind::Func);
        env.define(
            "systemreturn",
            Value::Native(NativeCallable::Builtin(Builtin::SystemReturn)),
            VarKind::Func,
        );
        env.define("system_math", Value::Math, VarKind::HostModule);
        env.define("input", Value::Native(NativeCallable::Builtin(Builtin::Input)), VarKind::Func);
        env
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Binding names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Bindings with their values, in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(name, var)| (name.as_str(), &var.value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Direct (non-dotted) access to a binding's value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).map(|var| &var.value)
    }

    /// Creates or replaces a binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value, kind: VarKind) {
        let name = name.into();
        let variable = Variable {
            name: name.clone(),
            value,
            kind,
            owner: self.label.clone(),
        };
        self.vars.insert(name, variable);
    }

    /// Resolves `name` to a variable.
    ///
    /// Exact match wins. Otherwise, if `name` is dotted and the head segment
    /// resolves, the remaining segments are walked as attribute lookups on
    /// the head value. Any failure reports `variable '<name>' not found`.
    pub fn find_variable(&self, name: &str) -> RunResult<Variable> {
        if let Some(variable) = self.vars.get(name) {
            return Ok(variable.clone());
        }

        if let Some((head, _)) = name.split_once('.') {
            if let Some(head_var) = self.vars.get(head) {
                let mut value = head_var.value.clone();
                let mut resolved = true;
                for segment in name.split('.').skip(1) {
                    match attribute(&value, segment) {
                        Some(next) => value = next,
                        None => {
                            resolved = false;
                            break;
                        }
                    }
                }
                if resolved {
                    return Ok(Variable {
                        name: name.to_owned(),
                        value,
                        kind: VarKind::Derived,
                        owner: self.label.clone(),
                    });
                }
            }
        }

        Err(Error::name_error(format!("variable '{name}' not found")).stage("find_variable"))
    }
}

/// One attribute step of a dotted lookup.
fn attribute(value: &Value, segment: &str) -> Option<Value> {
    match value {
        Value::Math => math::lookup(segment),
        Value::Module(module) => module.get(segment).cloned(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_environment_is_seeded_with_builtins() {
        let env = Environment::new("test");
        let names: Vec<_> = env.names().collect();
        assert_eq!(names, vec!["system", "systemreturn", "system_math", "input"]);
    }

    #[test]
    fn exact_match_wins_over_dotted_fallback() {
        let mut env = Environment::new("test");
        env.define("a.b", Value::Int(1), VarKind::Int);
        let var = env.find_variable("a.b").unwrap();
        assert!(matches!(var.value, Value::Int(1)));
        assert_eq!(var.kind, VarKind::Int);
    }

    #[test]
    fn dotted_lookup_reaches_math_functions() {
        let env = Environment::new("test");
        let var = env.find_variable("system_math.sqrt").unwrap();
        assert_eq!(var.kind, VarKind::Derived);
        assert!(var.value.is_callable());
    }

    #[test]
    fn missing_variable_reports_full_name() {
        let env = Environment::new("test");
        let err = env.find_variable("system_math.nope").unwrap_err();
        assert!(err.message().contains("variable 'system_math.nope' not found"));
        let err = env.find_variable("ghost").unwrap_err();
        assert!(err.message().contains("variable 'ghost' not found"));
    }
}
