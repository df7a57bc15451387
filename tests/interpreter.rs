mod common;

use loxwalk as lox;

use common::{run, run_err, run_err_with};
use lox::error::{LoxError, RuntimeError};
use lox::interpreter::InterpreterConfig;

fn runtime_error(source: &str) -> RuntimeError {
    match run_err(source).0 {
        LoxError::Runtime(e) => e,
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn prints_scalars() {
    let out = run(r#"
        print 1;
        print 2.5;
        print "hi";
        print true;
        print nil;
        print 1 / 0;
    "#);

    assert_eq!(out, "1\n2.5\nhi\ntrue\nnil\ninf\n");
}

#[test]
fn arithmetic_and_concatenation() {
    assert_eq!(run("print 1 + 2;"), "3\n");
    assert_eq!(run("print \"a\" + \"b\";"), "ab\n");
    assert_eq!(run("print (5 - 3) * 4 / 2;"), "4\n");
    assert_eq!(run("print -(-3);"), "3\n");
}

#[test]
fn mixed_plus_is_a_type_error() {
    let err = runtime_error("print 1 + \"a\";");

    assert_eq!(
        err,
        RuntimeError::TypeError {
            message: "Operands must be two numbers or two strings.".into(),
            line: 1
        }
    );
}

#[test]
fn comparison_requires_numbers() {
    assert!(matches!(
        runtime_error("print \"a\" < 1;"),
        RuntimeError::TypeError { .. }
    ));
    assert!(matches!(
        runtime_error("print -\"a\";"),
        RuntimeError::TypeError { .. }
    ));
}

#[test]
fn equality_never_crosses_kinds() {
    let out = run(r#"
        print nil == false;
        print 1 == "1";
        print "a" == "a";
        print nil == nil;
        print 1 != 2;
    "#);

    assert_eq!(out, "false\nfalse\ntrue\ntrue\ntrue\n");
}

#[test]
fn truthiness() {
    let out = run(r#"
        if (0) print "zero"; else print "no";
        if ("") print "empty"; else print "no";
        if (nil) print "nil"; else print "falsey";
        print !false;
        print !!nil;
    "#);

    assert_eq!(out, "zero\nempty\nfalsey\ntrue\nfalse\n");
}

#[test]
fn logical_operators_short_circuit() {
    let out = run(r#"
        print false and (1/0);
        print nil or "fallback";
        print 1 and 2;
        var called = false;
        fun touch() { called = true; return true; }
        print true or touch();
        print called;
    "#);

    assert_eq!(out, "false\nfallback\n2\ntrue\nfalse\n");
}

#[test]
fn block_scope_shadows_and_restores() {
    let out = run(r#"
        var a = "global";
        {
            var a = "outer";
            {
                var a = "inner";
                print a;
            }
            print a;
        }
        print a;
    "#);

    assert_eq!(out, "inner\nouter\nglobal\n");
}

#[test]
fn assignment_writes_the_resolved_binding() {
    let out = run(r#"
        var a = 1;
        {
            var a = 10;
            a = 20;
            print a;
        }
        print a;
        a = 2;
        print a;
    "#);

    assert_eq!(out, "20\n1\n2\n");
}

#[test]
fn closures_capture_variables_by_reference() {
    let out = run(r#"
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                return i;
            }
            return count;
        }

        var c1 = makeCounter();
        var c2 = makeCounter();
        print c1();
        print c1();
        print c2();
    "#);

    assert_eq!(out, "1\n2\n1\n");
}

#[test]
fn closure_sees_binding_from_declaration_site() {
    // a later shadowing declaration must not change what `show` reads
    let out = run(r#"
        var a = "global";
        {
            fun show() { print a; }
            show();
            var a = "block";
            show();
        }
    "#);

    assert_eq!(out, "global\nglobal\n");
}

#[test]
fn while_and_for_loops() {
    let out = run(r#"
        var i = 0;
        while (i < 3) { print i; i = i + 1; }
        for (var j = 0; j < 2; j = j + 1) print j * 10;
    "#);

    assert_eq!(out, "0\n1\n2\n0\n10\n");
}

#[test]
fn return_unwinds_loops_and_blocks() {
    let out = run(r#"
        fun first(limit) {
            for (var i = 0; i < limit; i = i + 1) {
                {
                    if (i == 2) return i;
                }
            }
            return -1;
        }
        print first(10);
        print first(1);
    "#);

    assert_eq!(out, "2\n-1\n");
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(run("fun f() {} print f();"), "nil\n");
    assert_eq!(run("fun f() { return; } print f();"), "nil\n");
}

#[test]
fn recursion() {
    let out = run(r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(15);
    "#);

    assert_eq!(out, "610\n");
}

#[test]
fn functions_print_by_name() {
    assert_eq!(run("fun add(a, b) {} print add;"), "<fn add>\n");
    assert_eq!(run("print clock;"), "<native fn clock>\n");
}

#[test]
fn clock_returns_a_number() {
    assert_eq!(run("print clock() > 0;"), "true\n");
}

#[test]
fn arity_mismatch() {
    assert_eq!(
        runtime_error("fun f(a, b) {}\nf(1);"),
        RuntimeError::ArityMismatch {
            expected: 2,
            got: 1,
            line: 2
        }
    );
}

#[test]
fn calling_a_non_callable() {
    assert_eq!(
        runtime_error("\"not a function\"();"),
        RuntimeError::NotCallable { line: 1 }
    );
}

#[test]
fn undefined_variable() {
    assert_eq!(
        runtime_error("print missing;"),
        RuntimeError::UndefinedVariable {
            name: "missing".into(),
            line: 1
        }
    );
    assert!(matches!(
        runtime_error("missing = 1;"),
        RuntimeError::UndefinedVariable { .. }
    ));
}

#[test]
fn unbounded_recursion_reports_stack_overflow() {
    let config = InterpreterConfig { max_call_depth: 64 };
    let (err, _) = run_err_with("fun f(n) { return f(n + 1); } f(0);", config);

    assert!(matches!(
        err,
        LoxError::Runtime(RuntimeError::StackOverflow { depth: 64, .. })
    ));
}

#[test]
fn output_before_a_runtime_error_is_kept() {
    let (err, out) = run_err("print \"before\";\nprint nil + 1;\nprint \"after\";");

    assert_eq!(out, "before\n");
    assert_eq!(err.to_string(), "Operands must be two numbers or two strings.\n[line 2]");
}

#[test]
fn definitions_survive_between_runs() {
    let (mut interpreter, buffer) = common::interpreter();

    lox::run_source("var greeting = \"hi\"; fun twice(x) { return x + x; }", &mut interpreter)
        .unwrap();
    lox::run_source("{ var local = twice(greeting); print local; }", &mut interpreter).unwrap();

    assert_eq!(buffer.contents(), "hihi\n");
}

#[test]
fn deep_recursion_through_blocks_under_default_limit() {
    let out = run(r#"
        fun count(n) {
            if (n == 0) return 0;
            {
                var x = n;
                return 1 + count(x - 1);
            }
        }
        print count(1000);
    "#);

    assert_eq!(out, "1000\n");
}

#[test]
fn caller_block_locals_survive_callee_returning_from_nested_blocks() {
    let out = run(r#"
        fun inner(n) {
            {
                var shadow = "inner";
                {
                    if (n > 0) return n;
                }
            }
            return 0;
        }

        fun outer() {
            var before = "caller";
            {
                var shadow = "block";
                var got = inner(3);
                print shadow;
                print got;
            }
            print before;
        }

        outer();
    "#);

    assert_eq!(out, "block\n3\ncaller\n");
}

#[test]
fn closures_from_an_earlier_run_keep_their_resolution() {
    let (mut interpreter, buffer) = common::interpreter();

    lox::run_source(
        "fun make() { var n = 0; fun inc() { n = n + 1; return n; } return inc; }\nvar counter = make();",
        &mut interpreter,
    )
    .unwrap();
    lox::run_source("print counter(); print counter();", &mut interpreter).unwrap();

    assert_eq!(buffer.contents(), "1\n2\n");
}

struct ClosedSink;

impl std::io::Write for ClosedSink {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn print_failure_reports_the_print_line() {
    let mut interpreter = lox::interpreter::Interpreter::with_output(Box::new(ClosedSink));
    let err = lox::run_source("var a = 1;\n\nprint a;", &mut interpreter).unwrap_err();

    let LoxError::Runtime(err) = err else {
        panic!("expected runtime error, got {:?}", err);
    };
    assert_eq!(
        err,
        RuntimeError::Output {
            message: "sink closed".into(),
            line: 3
        }
    );
}
