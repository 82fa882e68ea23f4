//! Module loader coverage: search order, namespace content, and use of
//! imported bindings from programs.

use std::fs;
use std::path::Path;

use servo::{run_source, CollectIo, ErrorKind, ModuleResolver};

fn write_module(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(format!("{name}.sv")), content).unwrap();
}

/// Runs `source` with the module search rooted at `working`/`reach`.
fn run_with(source: &str, working: &Path, reach: &Path) -> String {
    let mut io = CollectIo::new();
    run_source("test.import", source, ModuleResolver::new(working, reach), &mut io)
        .unwrap_or_else(|err| panic!("program failed: {err}"));
    io.output().to_owned()
}

#[test]
fn imported_function_is_callable_through_the_namespace() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "math_utils", "fn square(n) {\n    return n ^ 2\n}\n");
    let output = run_with(
        "<import math_utils>\nsystem(\"echo \" + math_utils.square(3))\n",
        dir.path(),
        dir.path(),
    );
    assert_eq!(output, "9\n");
}

#[test]
fn imported_value_binding_is_reachable_by_dotted_lookup() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "vals", "answer = 41 + 1\n");
    let output = run_with(
        "<import vals>\nsystem(\"echo \" + vals.answer)\n",
        dir.path(),
        dir.path(),
    );
    assert_eq!(output, "42\n");
}

#[test]
fn module_side_effects_run_at_import_time() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "noisy", "system(\"echo loading\")\n");
    let output = run_with("<import noisy>\nsystem(\"echo done\")\n", dir.path(), dir.path());
    assert_eq!(output, "loading\ndone\n");
}

#[test]
fn namespace_contains_only_user_added_bindings() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "m", "a = 1\nfn b() { return 2\n}\n");
    let mut io = CollectIo::new();
    let namespace = ModuleResolver::new(dir.path(), dir.path())
        .load_module("m", &mut io)
        .unwrap();
    let names: Vec<_> = namespace.names().collect();
    assert_eq!(names, vec!["a", "b"], "builtins must not leak into the namespace");
}

#[test]
fn importing_twice_yields_identical_namespaces() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "m", "a = 1\nb = \"two\"\n");
    let resolver = ModuleResolver::new(dir.path(), dir.path());
    let mut io = CollectIo::new();
    let first = resolver.load_module("m", &mut io).unwrap();
    let second = resolver.load_module("m", &mut io).unwrap();
    assert_eq!(first.names().collect::<Vec<_>>(), second.names().collect::<Vec<_>>());
    assert_eq!(first.len(), second.len());
}

#[test]
fn working_directory_wins_over_reach() {
    let working = tempfile::tempdir().unwrap();
    let reach = tempfile::tempdir().unwrap();
    write_module(working.path(), "which", "fn tell() { system(\"echo local\") }\n");
    write_module(reach.path(), "which", "fn tell() { system(\"echo reach\") }\n");
    let output = run_with(
        "<import which>\nwhich.tell()\n",
        working.path(),
        reach.path(),
    );
    assert_eq!(output, "local\n");
}

#[test]
fn reach_directory_is_the_fallback() {
    let working = tempfile::tempdir().unwrap();
    let reach = tempfile::tempdir().unwrap();
    write_module(reach.path(), "lib_only", "fn tell() { system(\"echo reach\") }\n");
    let output = run_with(
        "<import lib_only>\nlib_only.tell()\n",
        working.path(),
        reach.path(),
    );
    assert_eq!(output, "reach\n");
}

#[test]
fn missing_module_reports_module_not_found() {
    let working = tempfile::tempdir().unwrap();
    let reach = tempfile::tempdir().unwrap();
    let mut io = CollectIo::new();
    let err = run_source(
        "test.import",
        "<import missing>\n",
        ModuleResolver::new(working.path(), reach.path()),
        &mut io,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModuleNotFoundError);
    assert!(err.message().contains("module 'missing' not found"), "{}", err.message());
}

#[test]
fn bundled_reach_module_works_end_to_end() {
    // The repository ships reach/math_utils.sv; resolve it explicitly so the
    // test does not depend on the executable's location.
    let reach = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../reach");
    let working = tempfile::tempdir().unwrap();
    let output = run_with(
        "<import math_utils>\nsystem(\"echo \" + math_utils.cube(2))\n",
        working.path(),
        &reach,
    );
    assert_eq!(output, "8\n");
}
