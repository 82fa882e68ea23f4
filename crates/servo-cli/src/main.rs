use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use servo::{is_regular_file, run_file, Error, ModuleResolver, StdIo, SOURCE_EXTENSION};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("SERVO_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::new(env::args().skip(1).collect());
    let verbose = args.has("-v");

    match init_servo(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{}", err.report());
            if verbose {
                ExitCode::SUCCESS
            } else {
                println!("\x1b[91m      - exit with code 1\x1b[0m");
                ExitCode::from(1)
            }
        }
    }
}

/// Selects the source file and runs it.
///
/// `-m dotted.name` translates to `dotted/name.sv`; otherwise the first
/// positional argument is taken as a path. The path must name an existing
/// regular file.
fn init_servo(args: &Args) -> Result<(), Error> {
    let path = match args.option("-m") {
        Some(dotted) => format!("{}.{SOURCE_EXTENSION}", dotted.replace('.', "/")),
        None => args
            .get(0)
            .ok_or_else(|| {
                Error::runtime("please provide a servo file as argument 1.")
                    .stage("init_servo")
                    .origin("servo.base")
            })?
            .to_owned(),
    };
    let path = PathBuf::from(path);
    if !is_regular_file(&path) {
        return Err(Error::file_not_found(format!(
            "tried to run servo file that is a directory or does not exist:\n        - {}",
            path.display()
        ))
        .stage("init_servo")
        .origin("servo.base"));
    }
    run_file(&path, ModuleResolver::default(), &mut StdIo)
}

/// Positional-or-option argument accessor.
struct Args {
    items: Vec<String>,
}

impl Args {
    fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    /// The argument at `index`, if present.
    fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    /// The value following `option`, if both are present.
    fn option(&self, option: &str) -> Option<&str> {
        self.items
            .iter()
            .position(|arg| arg == option)
            .and_then(|at| self.items.get(at + 1))
            .map(String::as_str)
    }

    fn has(&self, flag: &str) -> bool {
        self.items.iter().any(|arg| arg == flag)
    }
}
