#![doc = include_str!("../../../README.md")]
mod builtins;
mod environment;
mod error;
mod expr;
mod function;
mod import;
mod io;
mod modules;
mod parser;
mod run;
mod source;
mod value;

pub use crate::{
    builtins::{Builtin, NativeCallable},
    environment::{Environment, VarKind, Variable},
    error::{Error, ErrorKind, RunResult},
    function::Function,
    import::{is_regular_file, ModuleResolver},
    io::{CollectIo, HostIo, StdIo},
    modules::math::MathFunction,
    parser::{Flow, Parser},
    run::{run_file, run_source},
    source::{SourceText, SOURCE_EXTENSION},
    value::{ModuleNamespace, Value},
};
