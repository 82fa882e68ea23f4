//! The runtime value model.
//!
//! [`Value`] is a tagged variant covering everything a variable can hold.
//! String values are "string-like" by construction: the `Str` tag is the
//! string-like tag, and the expression evaluator's `+` preserves it on
//! concatenation with any operand, in either position.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::builtins::NativeCallable;
use crate::function::Function;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null/absent, also used to pad unresolved positional arguments.
    None,
    Int(i64),
    Float(f64),
    /// The string-like kind: concatenation with anything stringifiable
    /// yields `Str` again.
    Str(String),
    /// A host-native callable (`system`, `systemreturn`, `input`, or a
    /// `system_math` function reached by dotted lookup).
    Native(NativeCallable),
    /// A user-defined subroutine.
    Function(Rc<Function>),
    /// An imported module namespace.
    Module(Rc<ModuleNamespace>),
    /// The `system_math` host namespace; attribute lookup resolves its
    /// functions and constants.
    Math,
}

impl Value {
    /// True for values a CALL statement may invoke.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Native(_) | Self::Function(_))
    }

    /// Short tag name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Native(_) => "func",
            Self::Function(_) => "func",
            Self::Module(_) => "module",
            Self::Math => "module",
        }
    }

    /// The textual form used for concatenation and for `system` arguments.
    pub fn stringify(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Self::Str(s) => write!(f, "{s}"),
            Self::Native(n) => write!(f, "{n}"),
            Self::Function(func) => write!(f, "<function '{}'>", func.name),
            Self::Module(module) => write!(f, "<module '{}'>", module.name),
            Self::Math => write!(f, "<module 'system_math'>"),
        }
    }
}

/// An opaque namespace produced by `<import NAME>`.
///
/// Holds only the bindings the module's execution added on top of the
/// builtin baseline, in definition order.
#[derive(Debug)]
pub struct ModuleNamespace {
    pub name: String,
    entries: IndexMap<String, Value>,
}

impl ModuleNamespace {
    pub fn new(name: impl Into<String>, entries: IndexMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Looks up a member by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Member names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
