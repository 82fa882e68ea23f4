//! Error types and the report format shared by the whole interpreter.
//!
//! Every fallible operation returns [`RunResult`]. An [`Error`] carries the
//! error class (named like the host exception it corresponds to), a message,
//! and the context used by the report line: the stage (function) that raised
//! it and the source-qualified name it was raised in. Context is attached
//! with the builder methods and is first-write-wins, so the innermost raise
//! site determines what the user sees.

use std::fmt;

use strum::IntoStaticStr;

/// Result alias used throughout the crate.
pub type RunResult<T> = Result<T, Error>;

/// Error classes, named after the host exception classes they report as.
///
/// The variant name is the class name: it is split at uppercase boundaries
/// and upper-cased by [`Error::humanised`], so `ModuleNotFoundError` reports
/// as `MODULE NOT FOUND FATAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum ErrorKind {
    SyntaxError,
    NameError,
    ValueError,
    TypeError,
    RuntimeError,
    ZeroDivisionError,
    ModuleNotFoundError,
    FileNotFoundError,
}

impl ErrorKind {
    /// The host-style class name, e.g. `"SyntaxError"`.
    pub fn class_name(self) -> &'static str {
        self.into()
    }
}

/// A structured interpreter error.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    /// Function or stage that raised the error, e.g. `find_variable`.
    stage: &'static str,
    /// Source-qualified name the error was raised in, e.g. `demo.main`.
    origin: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stage: "",
            origin: String::new(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, message)
    }

    pub fn name_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NameError, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ZeroDivisionError, message)
    }

    pub fn module_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModuleNotFoundError, message)
    }

    pub fn file_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileNotFoundError, message)
    }

    /// Records the raising stage. First write wins.
    pub fn stage(mut self, stage: &'static str) -> Self {
        if self.stage.is_empty() {
            self.stage = stage;
        }
        self
    }

    /// Records the source-qualified origin. First write wins, so the
    /// innermost parser that sees the error names it.
    pub fn origin(mut self, origin: &str) -> Self {
        if self.origin.is_empty() {
            self.origin = origin.to_owned();
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The humanised error name: the class name split at uppercase
    /// boundaries, upper-cased, with `ERROR` replaced by `FATAL`.
    ///
    /// `SyntaxError` -> `SYNTAX FATAL`, `ZeroDivisionError` -> `ZERO
    /// DIVISION FATAL`.
    pub fn humanised(&self) -> String {
        let mut name = String::new();
        for ch in self.kind.class_name().chars() {
            if ch.is_uppercase() && !name.is_empty() {
                name.push(' ');
            }
            name.extend(ch.to_uppercase());
        }
        name.replace("ERROR", "FATAL")
    }

    /// Renders the user-facing report line.
    ///
    /// Layout and styling match the interpreter's fixed format:
    /// `[servo] got '<NAME>' from <stage>() in '<origin>': - <message>`.
    pub fn report(&self) -> String {
        let stage = if self.stage.is_empty() { "execute" } else { self.stage };
        let origin = if self.origin.is_empty() { "servo" } else { &self.origin };
        format!(
            "\x1b[1m[servo]\x1b[0;91m got '{}' from {stage}() in '{origin}':\n      - {}\x1b[0m",
            self.humanised(),
            self.message
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.class_name(), self.message)
    }
}

impl std::error::Error for Error {}
