//! End-to-end scenarios driven through the public `run_source` entry point,
//! with output captured by `CollectIo`.

use servo::{run_source, CollectIo, ErrorKind, ModuleResolver};

/// Runs `source` and returns everything the program wrote.
fn run(source: &str) -> String {
    let mut io = CollectIo::new();
    run_source("test.scenario", source, ModuleResolver::default(), &mut io)
        .unwrap_or_else(|err| panic!("program failed: {err}\n{source}"));
    io.output().to_owned()
}

#[test]
fn system_echoes_command_output() {
    assert_eq!(run("system(\"echo hi\")\n"), "hi\n");
}

#[test]
fn string_concatenation_feeds_system() {
    let source = "x = \"a\" + \"b\"\nsystem(\"echo \" + x)\n";
    assert_eq!(run(source), "ab\n");
}

#[test]
fn user_function_with_argument() {
    let source = "fn greet(who) { system(\"echo hello \" + who) }\ngreet(\"world\")\n";
    assert_eq!(run(source), "hello world\n");
}

#[test]
fn block_parameter_receives_trailing_block() {
    let source = "fn twice({blk}) { blk() blk() }\ntwice() { system(\"echo !\") }\n";
    assert_eq!(run(source), "!\n!\n");
}

#[test]
fn block_lands_at_declared_index_zero() {
    let source = "fn lead({blk}, a) { blk() system(\"echo \" + a) }\nlead(\"x\") { system(\"echo b\") }\n";
    assert_eq!(run(source), "b\nx\n");
}

#[test]
fn block_lands_at_declared_index_one() {
    let source = "fn trail(a, {blk}) { system(\"echo \" + a) blk() }\ntrail(\"x\") { system(\"echo b\") }\n";
    assert_eq!(run(source), "x\nb\n");
}

#[test]
fn short_call_is_padded_with_nulls_before_the_block() {
    let source = "fn pad(a, {blk}) { blk() }\npad() { system(\"echo p\") }\n";
    assert_eq!(run(source), "p\n");
}

#[test]
fn call_without_block_runs_immediately() {
    let source = "fn opt(a, {blk}) { system(\"echo \" + a) }\nopt(\"solo\")\nsystem(\"echo after\")\n";
    assert_eq!(run(source), "solo\nafter\n");
}

#[test]
fn empty_argument_list_means_zero_arguments() {
    let source = "fn noargs() { system(\"echo none\") }\nnoargs()\n";
    assert_eq!(run(source), "none\n");
}

#[test]
fn return_value_flows_into_assignment() {
    let source = "fn give() { return \"v\"\n}\nx = give()\nsystem(\"echo \" + x)\n";
    assert_eq!(run(source), "v\n");
}

#[test]
fn arithmetic_with_power_in_return() {
    let source = "fn square(n) { return n ^ 2\n}\nsystem(\"echo \" + square(3))\n";
    assert_eq!(run(source), "9\n");
}

#[test]
fn systemreturn_captures_without_echoing() {
    let source = "x = systemreturn(\"printf a\")\nsystem(\"echo \" + x + \"b\")\n";
    assert_eq!(run(source), "ab\n");
}

#[test]
fn input_reads_scripted_lines() {
    let mut io = CollectIo::with_input(["ping"]);
    run_source(
        "test.scenario",
        "x = input()\nsystem(\"echo got \" + x)\n",
        ModuleResolver::default(),
        &mut io,
    )
    .unwrap();
    assert_eq!(io.output(), "got ping\n");
}

#[test]
fn nested_function_definitions() {
    let source = "fn outer() { fn inner() { system(\"echo i\") } inner() }\nouter()\n";
    assert_eq!(run(source), "i\n");
}

#[test]
fn comments_are_ignored() {
    let source = "# line comment\n/* multi\nline comment */\nsystem(\"echo c\")\n";
    assert_eq!(run(source), "c\n");
}

#[test]
fn bare_block_defines_a_lambda_without_running_it() {
    let source = "{ system(\"echo never\") }\nsystem(\"echo after\")\n";
    assert_eq!(run(source), "after\n");
}

#[test]
fn math_namespace_is_reachable_by_dotted_lookup() {
    let source = "x = system_math.sqrt(16)\nsystem(\"echo \" + x)\n";
    assert_eq!(run(source), "4.0\n");
}

#[test]
fn failed_assignment_is_silently_dropped() {
    let mut io = CollectIo::new();
    let err = run_source(
        "test.scenario",
        "y = unknown_var\nsystem(\"echo \" + y)\n",
        ModuleResolver::default(),
        &mut io,
    )
    .unwrap_err();
    // The assignment itself is swallowed; the later use fails at lookup.
    assert_eq!(err.kind(), ErrorKind::NameError);
    assert!(err.message().contains("variable 'y' not found"), "{}", err.message());
    assert_eq!(io.output(), "");
}

#[test]
fn reparsing_the_same_source_is_idempotent() {
    let source = "fn greet(who) { system(\"echo hello \" + who) }\ngreet(\"twice\")\n";
    assert_eq!(run(source), run(source));
}

#[test]
fn callee_mutations_do_not_leak_back_to_the_caller() {
    let source = "fn set() { x = \"inner\" }\nx = \"outer\"\nset()\nsystem(\"echo \" + x)\n";
    assert_eq!(run(source), "outer\n");
}

#[test]
fn functions_resolve_functions_defined_before_them() {
    let source = "fn count(n) { system(\"echo \" + n) }\nfn down(n) { count(n) }\ndown(2)\n";
    assert_eq!(run(source), "2\n");
}
