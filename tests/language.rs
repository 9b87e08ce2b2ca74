use jcode::{Error, ErrorKind, Lexer, TokenKind, Value};
use pretty_assertions::assert_eq;

fn assert_success(src: &str) -> Value {
    match jcode::run("<test>", src) {
        Ok(value) => value,
        Err(e) => panic!("Script failed:\n{}", e.render()),
    }
}

fn assert_failure(src: &str) -> Error {
    match jcode::run("<test>", src) {
        Ok(value) => panic!("Script succeeded with {value:?} but was expected to fail"),
        Err(e) => e,
    }
}

/// Value of the final top-level statement.
fn last(src: &str) -> Value {
    let Value::List(values) = assert_success(src) else {
        panic!("top level should produce a list");
    };
    let last = values.borrow().last().cloned();
    last.expect("program has at least one statement")
}

fn kinds(src: &str) -> Vec<TokenKind> {
    Lexer::new("<test>", src)
        .tokenize()
        .expect("source should lex")
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn lexing_a_mixed_expression() {
    assert_eq!(
        kinds("1 + 2.5"),
        vec![
            TokenKind::Int(1),
            TokenKind::Plus,
            TokenKind::Float(2.5),
            TokenKind::Eof
        ]
    );
}

#[test]
fn variables_and_constants() {
    assert_eq!(last("var x : 5\nx"), Value::int(5));

    let error = assert_failure("int y = 5\ny : 6");
    assert_eq!(error.kind, ErrorKind::ConstantReassignment);
    assert_eq!(error.details, "Cannot reassign constant 'y'");
}

#[test]
fn loop_bodies_choose_their_result() {
    assert_eq!(last("for i = 0 to 5 { }"), Value::null());
    assert_eq!(
        last("for i = 0 to 5 : i"),
        Value::list((0..5).map(Value::int).collect())
    );
    assert_eq!(
        last("for i = 10 to 0 step -5 : i"),
        Value::list(vec![Value::int(10), Value::int(5)])
    );
}

#[test]
fn division_by_zero_points_at_the_divisor() {
    let error = assert_failure("5 / 0");
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert_eq!(error.details, "Division by zero");
    assert_eq!(error.span.start.index, 4);
    assert_eq!(error.span.end.index, 5);
}

#[test]
fn function_calls_check_arity() {
    let src = "func add(int a, int b) => a + b\n";
    assert_eq!(last(&format!("{src}add(2, 3)")), Value::int(5));

    let error = assert_failure(&format!("{src}add(2)"));
    assert_eq!(
        error.details,
        "1 too few arguments passed into <function add>"
    );
    let error = assert_failure(&format!("{src}add(1, 2, 3)"));
    assert_eq!(
        error.details,
        "1 too many arguments passed into <function add>"
    );
}

#[test]
fn string_indexing() {
    assert_eq!(last("\"abc\"[1]"), Value::string("b"));
    assert_eq!(last("\"abc\"[-1]"), Value::string("c"));

    let error = assert_failure("\"abc\"[5]");
    assert_eq!(
        error.details,
        "Character at this index could not be retrieved from string because index is out of bounds"
    );
}

#[test]
fn oversized_string_repetition_is_a_runtime_error() {
    assert_eq!(last("\"ab\" * 3"), Value::string("ababab"));

    let error = assert_failure("\"ab\" * 9223372036854775807");
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert_eq!(error.details, "String is too large");
    assert_eq!(error.span.start.index, 7);
}

#[test]
fn lexing_is_deterministic() {
    let src = "func f(int n) {\n  return n * 2\n}\n\nvar xs : [f(1), \"two\", 3.5]\n";
    assert_eq!(kinds(src), kinds(src));
}

#[test]
fn pure_evaluation_is_idempotent() {
    let src = "func fib(int n) {\n  if n < 2 : return n\n  return fib(n - 1) + fib(n - 2)\n}\nfib(10)";
    assert_eq!(last(src), last(src));
    assert_eq!(last(src), Value::int(55));

    let first = assert_failure("var xs : [1, 2]\nxs[9]").render();
    let second = assert_failure("var xs : [1, 2]\nxs[9]").render();
    assert_eq!(first, second);
}

#[test]
fn closures_and_higher_order_functions() {
    let src = "\
func make_adder(int n) => func(int x) => x + n
var add5 : make_adder(5)
func twice(function f, int x) => f(f(x))
twice(add5, 1)";
    assert_eq!(last(src), Value::int(11));
}

#[test]
fn lists_share_identity() {
    let src = "\
var a : [1]
var b : a
append(b, 2)
len(a)";
    assert_eq!(last(src), Value::int(2));
    assert_eq!(
        last("[1, 2] + 3"),
        Value::list(vec![Value::int(1), Value::int(2), Value::int(3)])
    );
}

#[test]
fn classes_and_builtins_work_together() {
    let src = "\
class Point {
  func __init__(int x, int y) {
    self.x : x
    self.y : y
  }
  func sum() => self.x + self.y
}
var p : new Point(2, 3)
[p.sum(), isinstance(p, Point), hasattr(p, \"z\")]";
    assert_eq!(
        last(src),
        Value::list(vec![Value::int(5), Value::int(1), Value::int(0)])
    );
}

#[test]
fn source_files_run_main() {
    let value = jcode::run("demo.jc", "func helper() => 40\nfunc main() => helper() + 2");
    assert_eq!(value.map_err(|e| e.render()), Ok(Value::int(42)));

    let error = jcode::run("demo.jcode", "var x : 1").unwrap_err();
    assert_eq!(
        error.details,
        "No 'main' function found. Every JCode program must have a 'main' function."
    );
}

#[test]
fn runtime_errors_render_a_traceback() {
    let error = assert_failure("func f() => 1 / 0\nf()");
    let rendered = error.render();
    assert!(
        rendered.starts_with("Traceback (most recent call last):\n"),
        "{rendered}"
    );
    assert!(rendered.contains("in <program>\n"), "{rendered}");
    assert!(rendered.contains("in f\n"), "{rendered}");
    assert!(rendered.contains("Runtime Error: Division by zero\n"), "{rendered}");
}

#[test]
fn syntax_errors_are_static() {
    let error = assert_failure("var x : )");
    assert_eq!(error.kind, ErrorKind::InvalidSyntax);
    assert!(error.is_static());

    let error = assert_failure("var s : \"open");
    assert_eq!(error.kind, ErrorKind::ExpectedCharacter);
}
