//! Host I/O abstraction.
//!
//! All interpreter output (the `system` builtin's echo) and line input (the
//! `input` builtin) go through the [`HostIo`] trait so that embedders and
//! tests can capture or script it. [`StdIo`] talks to the real stdout/stdin;
//! [`CollectIo`] buffers output and serves pre-seeded input lines.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::error::{Error, RunResult};

/// Output sink and line-input source for a running program.
pub trait HostIo {
    /// Writes `text` with no trailing newline.
    fn write(&mut self, text: &str);

    /// Writes `text` followed by a newline.
    fn write_line(&mut self, text: &str) {
        self.write(text);
        self.write("\n");
    }

    /// Reads one line of input, without the trailing newline.
    fn read_line(&mut self) -> RunResult<String>;
}

/// Standard stdout/stdin implementation.
#[derive(Debug, Default)]
pub struct StdIo;

impl HostIo for StdIo {
    fn write(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn read_line(&mut self) -> RunResult<String> {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::runtime(format!("failed to read input: {e}")).stage("input"))?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

/// Collecting implementation for tests and embedding.
///
/// Output is appended to an internal string; input lines are served from a
/// queue and an exhausted queue yields empty lines.
#[derive(Debug, Default)]
pub struct CollectIo {
    output: String,
    input: VecDeque<String>,
}

impl CollectIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collector whose `input` builtin will return the given lines
    /// in order.
    pub fn with_input(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            output: String::new(),
            input: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Everything written so far.
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl HostIo for CollectIo {
    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn read_line(&mut self) -> RunResult<String> {
        Ok(self.input.pop_front().unwrap_or_default())
    }
}
