//! End-to-end behaviour through the public session API.

#![expect(clippy::unwrap_used)] // test code OK

use lispi::ast::{sym, val};
use lispi::config::{DefinePolicy, InterpreterConfig};
use lispi::reader::{parse, tokenize};
use lispi::session::{Interpreter, Transcript, is_terminal_signal, run_script};
use lispi::{DEFAULT_MAX_EVAL_DEPTH, Error, Value};

/// Evaluate each line in one session and return the printed text of every result
fn session_output(lines: &[&str]) -> Vec<String> {
    let interpreter = Interpreter::default();
    lines
        .iter()
        .flat_map(|line| interpreter.eval_line(line))
        .map(|value| value.to_string())
        .collect()
}

#[test]
fn tokenizes_punctuation_as_separate_tokens() {
    assert_eq!(tokenize("(+ 1 2)"), vec!["(", "+", "1", "2", ")"]);
}

#[test]
fn arithmetic_folds_left() {
    let interpreter = Interpreter::default();
    let test_cases = vec![
        ("(+ 1 2 3)", val(6)),
        ("(- 10 3 2)", val(5)),
        ("(* 2 3 4)", val(24)),
        ("(/ 4 0)", Value::error(Error::DivideByZero)),
    ];

    for (input, expected) in test_cases {
        assert_eq!(interpreter.eval_line(input), Some(expected), "{input}");
    }
    assert_eq!(session_output(&["(/ 4 0)"]), vec!["Cannot divide by zero"]);
}

#[test]
fn if_returns_quoted_branch_unevaluated() {
    let result = Interpreter::default().eval_line("(if (> 3 2) 'yes 'no)").unwrap();
    assert_eq!(result, sym("yes"));
    assert!(result.is_quoted());
}

#[test]
fn definitions_persist_across_lines() {
    assert_eq!(
        session_output(&["(define x 5)", "(+ x 1)"]),
        vec!["5", "6"]
    );
    assert_eq!(
        session_output(&[
            "(defun sq (n) (* n n))",
            "(sq 4)",
            "(defun fact (n) (if (< n 2) 1 (* n (fact (- n 1)))))",
            "(fact 5)",
        ]),
        vec![
            "((n) (* n n))",
            "16",
            "((n) (if (< n 2) 1 (* n (fact (- n 1)))))",
            "120"
        ]
    );
}

#[test]
fn procedures_do_not_close_over_their_caller() {
    assert_eq!(
        session_output(&[
            "(defun inner (y) (+ x y))",
            "(defun outer (x) (inner 1))",
            "(outer 5)",
        ])[2],
        "x is not bound to a value"
    );
}

#[test]
fn quit_is_the_only_terminal_signal() {
    let interpreter = Interpreter::default();
    let result = interpreter.eval_line("(quit)").unwrap();
    assert_eq!(result, sym("bye"));
    assert!(is_terminal_signal(&result));

    for line in ["(+ 1 2)", "'quit", "T", "()", "(/ 1 0)"] {
        let value = interpreter.eval_line(line).unwrap();
        assert!(!is_terminal_signal(&value), "{line} must not end the session");
    }
}

#[test]
fn quoted_structures_print_back() {
    let test_cases = ["'(a b c)", "'(1 (2 (3)) ())", "'(defun f (x) (* x x))"];
    for input in test_cases {
        let printed = parse(input).unwrap().to_string();
        let canonical: String = input[1..].split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(printed, canonical);
    }
}

#[test]
fn unterminated_lists_report_end_of_input() {
    for input in ["(", "(+ 1 2", "((a) (b)", "'", "(define x '"] {
        assert_eq!(
            Interpreter::default().eval_line(input),
            Some(Value::error(Error::UnexpectedEndOfInput)),
            "{input}"
        );
    }
}

#[test]
fn stray_close_paren_is_reported() {
    assert_eq!(
        session_output(&[")"]),
        vec!["An object cannot start with ')'"]
    );
}

#[test]
fn runaway_recursion_is_reported_and_the_session_continues() {
    let interpreter =
        Interpreter::new(InterpreterConfig::default().with_max_eval_depth(1_000));
    interpreter.eval_line("(defun loop (n) (loop (+ n 1)))");
    assert_eq!(
        interpreter.eval_line("(loop 0)"),
        Some(Value::error(Error::RecursionLimitExceeded(1_000)))
    );
    assert_eq!(interpreter.eval_line("(+ 1 1)"), Some(val(2)));
}

#[test]
fn deeply_nested_input_is_reported_not_fatal() {
    let depth = 25_000;
    let nested = format!("{}{}", "(".repeat(depth), ")".repeat(depth));
    let interpreter = Interpreter::default();

    let applied = interpreter.eval_line(&nested).unwrap();
    assert!(applied.is_error());
    assert!(
        applied
            .to_string()
            .ends_with("is not a function name; try using a symbol instead")
    );

    let quoted = interpreter.eval_line(&format!("'{nested}")).unwrap();
    assert!(!quoted.is_error());
    assert!(quoted.to_string().contains("..."));

    let sum = format!("{}1{}", "(+ ".repeat(depth), ")".repeat(depth));
    assert_eq!(
        interpreter.eval_line(&sum),
        Some(Value::error(Error::RecursionLimitExceeded(DEFAULT_MAX_EVAL_DEPTH)))
    );

    // Deep data survives being bound, looked up and copied
    interpreter.eval_line(&format!("(define deep '{nested})"));
    assert!(interpreter.eval_line("(car deep)").unwrap().to_string().contains("..."));

    assert_eq!(interpreter.eval_line("(+ 1 1)"), Some(val(2)));
}

#[test]
fn only_the_first_expression_of_a_line_is_evaluated() {
    assert_eq!(session_output(&["5 )"]), vec!["5"]);
    assert_eq!(
        session_output(&["(define a 1) (define b 2)", "b"]),
        vec!["1", "b is not bound to a value"]
    );
}

#[test]
fn define_policy_is_configurable() {
    let lines = ["(define x 1)", "(define x 2)", "x"];
    let run = |interpreter: &Interpreter| -> Vec<Value> {
        lines.iter().filter_map(|line| interpreter.eval_line(line)).collect()
    };

    assert_eq!(run(&Interpreter::default()), vec![val(1), val(2), val(1)]);

    let overwrite =
        Interpreter::new(InterpreterConfig::default().with_define_policy(DefinePolicy::Overwrite));
    assert_eq!(run(&overwrite), vec![val(1), val(2), val(2)]);
}

#[test]
fn transcript_mirrors_console_and_log() {
    let interpreter = Interpreter::default();
    let script = "(define r 3)\n(* r r)\n(car '(a b))\n(/ 1 0)\n(quit)\n";
    let mut transcript = Transcript::new(Vec::new(), Some(Vec::new()));

    assert!(run_script(&interpreter, script.as_bytes(), &mut transcript).unwrap());

    let (console, log) = transcript.into_parts();
    let expected = "3\n9\na\nCannot divide by zero\nbye\n";
    assert_eq!(String::from_utf8(console).unwrap(), expected);
    assert_eq!(String::from_utf8(log.unwrap()).unwrap(), expected);
}
