//! The built-ins registry.
//!
//! Every fresh environment is seeded with these bindings: `system` and
//! `systemreturn` run a shell command (echoing vs. returning the captured
//! stdout), `input` reads one line from the host, and `system_math` exposes
//! the host math namespace (implemented in [`crate::modules::math`]).

use std::process::Command;

use strum::{Display, IntoStaticStr};

use crate::error::{Error, RunResult};
use crate::io::HostIo;
use crate::modules::math::MathFunction;
use crate::value::Value;

/// Any host-native callable a variable can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeCallable {
    /// A registry builtin (`system`, `systemreturn`, `input`).
    Builtin(Builtin),
    /// A `system_math` function reached by dotted lookup.
    Math(MathFunction),
}

impl NativeCallable {
    /// Calls this native with the given positional arguments.
    pub fn call(self, args: Vec<Value>, io: &mut impl HostIo) -> RunResult<Value> {
        match self {
            Self::Builtin(builtin) => builtin.call(args, io),
            Self::Math(function) => function.call(args),
        }
    }
}

impl std::fmt::Display for NativeCallable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin(builtin) => write!(f, "<built-in function {builtin}>"),
            Self::Math(function) => write!(f, "<built-in function system_math.{function}>"),
        }
    }
}

/// The registry builtins seeded into every environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    System,
    SystemReturn,
    Input,
}

impl Builtin {
    /// Executes the builtin with the provided positional arguments.
    pub(crate) fn call(self, args: Vec<Value>, io: &mut impl HostIo) -> RunResult<Value> {
        match self {
            Self::System => {
                let command = single_argument(self, args)?;
                let stdout = run_shell(self, &command)?;
                io.write_line(stdout.trim_end_matches('\n'));
                Ok(Value::None)
            }
            Self::SystemReturn => {
                let command = single_argument(self, args)?;
                run_shell(self, &command).map(Value::Str)
            }
            Self::Input => {
                match args.as_slice() {
                    [] => {}
                    [prompt] => io.write(&prompt.stringify()),
                    more => {
                        return Err(Error::type_error(format!(
                            "input() takes at most one argument ({} given)",
                            more.len()
                        ))
                        .stage("input"));
                    }
                }
                io.read_line().map(Value::Str)
            }
        }
    }
}

/// Runs `command` through the shell and returns its captured stdout.
///
/// A non-zero exit reports the captured stderr as the error message.
fn run_shell(builtin: Builtin, command: &str) -> RunResult<String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|e| Error::runtime(format!("failed to spawn shell: {e}")).stage(builtin.into()))?;
    tracing::debug!(command, status = ?output.status, "shell command finished");
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(Error::value(stderr.trim_end().to_owned()).stage(builtin.into()))
    }
}

fn single_argument(builtin: Builtin, args: Vec<Value>) -> RunResult<String> {
    match args.as_slice() {
        [command] => Ok(command.stringify()),
        other => Err(Error::type_error(format!(
            "{builtin}() takes exactly one argument ({} given)",
            other.len()
        ))
        .stage(builtin.into())),
    }
}
