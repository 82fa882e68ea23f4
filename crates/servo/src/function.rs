//! User-defined subroutines.
//!
//! A [`Function`] stores the body text, parameter names, the optional
//! block-parameter index, and a copy-on-definition snapshot of the defining
//! environment. Each invocation re-parses the body with a fresh parser over
//! a clone of the snapshot; a RETURN signal raised while executing the body
//! is caught here and its value returned.

use std::rc::Rc;

use crate::environment::{Environment, VarKind};
use crate::error::RunResult;
use crate::import::ModuleResolver;
use crate::io::HostIo;
use crate::parser::{Flow, Parser};
use crate::source::SourceText;
use crate::value::Value;

/// A user-defined subroutine.
#[derive(Debug, Clone)]
pub struct Function {
    /// The subroutine name (lambdas get a generated `__lambda_<K>` name).
    pub name: String,
    /// Parameter names with block braces stripped.
    pub params: Vec<String>,
    /// Index of the block parameter, if one was declared with `{…}`.
    pub block_param: Option<usize>,
    /// The body text between the defining braces, re-parsed per invocation.
    pub body: String,
    /// Copy-on-definition snapshot of the defining environment.
    pub captured: Environment,
    /// Resolver for `<import …>` directives inside the body.
    pub resolver: ModuleResolver,
    /// Source-qualified name of the defining source, for diagnostics.
    pub origin: String,
}

impl Function {
    /// Invokes the subroutine with an already-evaluated argument bundle.
    ///
    /// The bundle is normalised first (a single empty string-like argument
    /// means zero arguments), then each positional argument is bound under
    /// the corresponding parameter name in a clone of the captured
    /// environment. The subroutine itself is re-bound under its own name so
    /// recursive calls resolve.
    pub fn call(&self, args: Vec<Value>, io: &mut impl HostIo) -> RunResult<Value> {
        let args = normalise(args);

        let mut env = self.captured.clone();
        env.define(self.name.clone(), Value::Function(Rc::new(self.clone())), VarKind::Func);
        for (index, param) in self.params.iter().enumerate() {
            if let Some(arg) = args.get(index) {
                env.define(param.clone(), arg.clone(), VarKind::Arg);
            }
        }

        let source = SourceText::synthetic(self.origin.clone(), &self.body);
        let mut parser = Parser::new(source, env, self.resolver.clone());
        match parser.run(io)? {
            Flow::Return(value) => Ok(value),
            Flow::Continue => Ok(Value::None),
        }
    }
}

/// A single-element bundle holding an empty string-like value counts as an
/// empty call.
fn normalise(args: Vec<Value>) -> Vec<Value> {
    match args.as_slice() {
        [Value::Str(s)] if s.is_empty() => Vec::new(),
        _ => args,
    }
}
