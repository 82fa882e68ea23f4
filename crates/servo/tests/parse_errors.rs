//! Error-path coverage for the mode machine.

use servo::{run_source, CollectIo, Error, ErrorKind, ModuleResolver};

/// Runs `source` and returns the error it must produce.
fn run_err(source: &str) -> Error {
    let mut io = CollectIo::new();
    run_source("test.errors", source, ModuleResolver::default(), &mut io)
        .expect_err("expected the program to fail")
}

mod syntax {
    use super::*;

    #[test]
    fn unexpected_character_at_statement_level() {
        let err = run_err(")\n");
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert!(err.message().contains("unexpected character: ')'"), "{}", err.message());
    }

    #[test]
    fn unexpected_token_after_identifier() {
        let err = run_err("x 1\n");
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert!(err.message().contains("unexpected token '1' after identifier"), "{}", err.message());
    }

    #[test]
    fn newline_after_bare_identifier() {
        let err = run_err("x \n");
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert!(err.message().contains("after identifier 'x'"), "{}", err.message());
    }

    #[test]
    fn statement_level_arithmetic_has_no_receiver() {
        let err = run_err("3+4\n");
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert!(err.message().contains("arithmetic"), "{}", err.message());
    }

    #[test]
    fn import_artifact_without_a_name() {
        let err = run_err("<import>\n");
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert!(err.message().contains("module name"), "{}", err.message());
    }
}

mod unterminated {
    use super::*;

    fn assert_unterminated(source: &str, mode: &str) {
        let err = run_err(source);
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert!(
            err.message().contains("unterminated mode") && err.message().contains(mode),
            "expected unterminated {mode}, got: {}",
            err.message()
        );
    }

    #[test]
    fn mid_string() {
        assert_unterminated("\"abc\n", "STRING");
    }

    #[test]
    fn mid_block() {
        assert_unterminated("{ system(\"x\")\n", "BLOCK");
    }

    #[test]
    fn mid_call() {
        assert_unterminated("f(1\n", "CALL");
    }

    #[test]
    fn mid_multiline_comment() {
        assert_unterminated("/* abc\n", "MLCOMMENT");
    }

    #[test]
    fn mid_function_definition() {
        assert_unterminated("fn f() { system(\"x\")\n", "FUNCTION_DEF");
    }

    #[test]
    fn bare_identifier_line_never_completes() {
        assert_unterminated("x\n", "CHECK_ASSIGNMENT");
    }
}

mod resolution {
    use super::*;

    #[test]
    fn calling_an_unknown_name() {
        let err = run_err("ghost()\n");
        assert_eq!(err.kind(), ErrorKind::NameError);
        assert!(err.message().contains("variable 'ghost' not found"), "{}", err.message());
    }

    #[test]
    fn keywords_are_only_recognised_before_whitespace() {
        // `fn(` parses as a call to a variable named `fn`.
        let err = run_err("fn(1)\n");
        assert_eq!(err.kind(), ErrorKind::NameError);
        assert!(err.message().contains("variable 'fn' not found"), "{}", err.message());
    }

    #[test]
    fn unknown_variable_inside_call_arguments() {
        let err = run_err("system(\"echo \" + missing)\n");
        assert_eq!(err.kind(), ErrorKind::NameError);
        assert!(err.message().contains("variable 'missing' not found"), "{}", err.message());
    }
}

mod invocation {
    use super::*;

    #[test]
    fn calling_a_non_callable_value() {
        let err = run_err("x = 1\nx(2)\n");
        assert_eq!(err.kind(), ErrorKind::TypeError);
        assert!(err.message().contains("variable 'x' is not callable"), "{}", err.message());
    }

    #[test]
    fn multiple_block_parameters_are_rejected() {
        let err = run_err("fn f({a}, {b}) { system(\"x\") }\n");
        assert_eq!(err.kind(), ErrorKind::ValueError);
        assert!(
            err.message().contains("multiple block arguments not supported"),
            "{}",
            err.message()
        );
    }
}

mod artifacts {
    use super::*;

    #[test]
    fn unknown_artifact_word() {
        let err = run_err("<export foo>\n");
        assert_eq!(err.kind(), ErrorKind::ValueError);
        assert!(err.message().contains("unknown artifact 'export'"), "{}", err.message());
    }
}

mod control {
    use super::*;

    #[test]
    fn return_at_top_level_is_a_runtime_error() {
        let err = run_err("return 1\n");
        assert_eq!(err.kind(), ErrorKind::RuntimeError);
        assert!(err.message().contains("unexpected return at top level"), "{}", err.message());
    }

    #[test]
    fn return_expression_failure_surfaces() {
        let err = run_err("fn f() { return missing_var\n}\nf()\n");
        assert_eq!(err.kind(), ErrorKind::ValueError);
        assert!(err.message().contains("Return evaluation error"), "{}", err.message());
    }
}

mod reporting {
    use super::*;

    #[test]
    fn report_line_carries_humanised_name_and_origin() {
        let err = run_err(")\n");
        let report = err.report();
        assert!(report.contains("[servo]"), "{report}");
        assert!(report.contains("got 'SYNTAX FATAL'"), "{report}");
        assert!(report.contains("in 'test.errors'"), "{report}");
    }

    #[test]
    fn subroutine_errors_surface_to_the_caller() {
        // The failure happens while executing the body of `f`, and the
        // caller of `f` observes it.
        let err = run_err("fn f() { ghost() }\nf()\n");
        assert_eq!(err.kind(), ErrorKind::NameError);
        assert!(err.message().contains("variable 'ghost' not found"), "{}", err.message());
    }
}
