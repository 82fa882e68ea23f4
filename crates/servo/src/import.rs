//! The `<import NAME>` module loader.
//!
//! A module name resolves to `<working_dir>/<name>.sv` first, then to the
//! bundled library directory (`reach/`). The file is executed end-to-end
//! against a fresh environment; every binding that was not part of the
//! builtin baseline (recorded before execution) becomes a member of the
//! resulting namespace.

use std::path::{Path, PathBuf};

use ahash::AHashSet;
use indexmap::IndexMap;

use crate::environment::Environment;
use crate::error::{Error, RunResult};
use crate::io::HostIo;
use crate::parser::{Flow, Parser};
use crate::source::{SourceText, SOURCE_EXTENSION};
use crate::value::ModuleNamespace;

/// Module search paths.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    /// Searched first; defaults to the process working directory.
    pub working_dir: PathBuf,
    /// The bundled library directory, searched second.
    pub reach_dir: PathBuf,
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            reach_dir: default_reach_dir(),
        }
    }
}

impl ModuleResolver {
    /// Resolver rooted at explicit directories (used by tests and embedders).
    pub fn new(working_dir: impl Into<PathBuf>, reach_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            reach_dir: reach_dir.into(),
        }
    }

    /// Resolves a short module name to a source path.
    pub fn resolve(&self, name: &str) -> RunResult<PathBuf> {
        let file = format!("{name}.{SOURCE_EXTENSION}");
        for candidate in [self.working_dir.join(&file), self.reach_dir.join(&file)] {
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(Error::module_not_found(format!("module '{name}' not found locally or in reach.")).stage("resolve"))
    }

    /// Loads and runs the named module, returning its user-added bindings.
    pub fn load_module(&self, name: &str, io: &mut impl HostIo) -> RunResult<ModuleNamespace> {
        let path = self.resolve(name)?;
        let source = SourceText::read(&path)?;

        let env = Environment::new(source.qualified_name());
        let baseline: AHashSet<String> = env.names().map(ToOwned::to_owned).collect();

        let mut parser = Parser::new(source, env, self.clone());
        if let Flow::Return(_) = parser.run(io)? {
            return Err(Error::runtime(format!("unexpected return at top level of module '{name}'"))
                .stage("import_module"));
        }

        let mut entries = IndexMap::new();
        for (binding, value) in parser.environment().iter() {
            if !baseline.contains(binding) {
                entries.insert(binding.to_owned(), value.clone());
            }
        }
        tracing::debug!(module = name, members = entries.len(), "module loaded");
        Ok(ModuleNamespace::new(name, entries))
    }
}

/// `SERVO_REACH` wins, then `reach/` next to the executable, then `reach/`
/// under the working directory.
fn default_reach_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SERVO_REACH") {
        return PathBuf::from(dir);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("reach");
            if candidate.is_dir() {
                return candidate;
            }
        }
    }
    PathBuf::from("reach")
}

/// True if `path` names a regular file.
pub fn is_regular_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
