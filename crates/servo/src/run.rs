//! Public interface for running Script sources.

use std::path::Path;

use crate::environment::Environment;
use crate::error::{Error, RunResult};
use crate::import::ModuleResolver;
use crate::io::HostIo;
use crate::parser::{Flow, Parser};
use crate::source::SourceText;

/// Parses and executes the source file at `path`.
///
/// # Errors
/// Returns the first error raised while reading, parsing, or executing the
/// file. A `return` at top level is reported as a runtime error; the RETURN
/// signal never crosses this boundary.
pub fn run_file(path: &Path, resolver: ModuleResolver, io: &mut impl HostIo) -> RunResult<()> {
    let source = SourceText::read(path)?;
    run(source, resolver, io)
}

/// Parses and executes an in-memory source under the given qualified name.
///
/// # Example
/// ```
/// use servo::{run_source, CollectIo, ModuleResolver};
///
/// let mut io = CollectIo::new();
/// run_source(
///     "demo.inline",
///     "x = \"a\" + \"b\"\nsystem(\"echo \" + x)\n",
///     ModuleResolver::default(),
///     &mut io,
/// )
/// .unwrap();
/// assert_eq!(io.output(), "ab\n");
/// ```
pub fn run_source(
    qualified: &str,
    text: &str,
    resolver: ModuleResolver,
    io: &mut impl HostIo,
) -> RunResult<()> {
    run(SourceText::synthetic(qualified, text), resolver, io)
}

fn run(source: SourceText, resolver: ModuleResolver, io: &mut impl HostIo) -> RunResult<()> {
    let qualified = source.qualified_name().to_owned();
    let env = Environment::new(qualified.as_str());
    let mut parser = Parser::new(source, env, resolver);
    match parser.run(io)? {
        Flow::Continue => Ok(()),
        Flow::Return(_) => {
            Err(Error::runtime("unexpected return at top level").stage("execute").origin(&qualified))
        }
    }
}
