use assert_cmd::Command;
use std::io::Write;

fn loxwalk() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("loxwalk"))
}

fn source_file(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", source).unwrap();
    file
}

#[test]
fn runs_program_from_file() {
    let file = source_file("var a = 1;\nprint a + 2;\n");

    loxwalk()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn tokenizes_file() {
    let file = source_file("var x = 42;");

    loxwalk()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .success()
        .stdout("VAR var null\nIDENTIFIER x null\nEQUAL = null\nNUMBER 42 42.0\nSEMICOLON ; null\nEOF  null\n");
}

#[test]
fn tokenizes_file_as_json() {
    let file = source_file("\"hi\"");

    loxwalk()
        .args(["tokenize", "--json"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("\"token_type\":\"STRING\""))
        .stdout(predicates::str::contains("\"literal\":\"hi\""));
}

#[test]
fn lexical_error_exits_65() {
    let file = source_file("var a = @;");

    loxwalk()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicates::str::contains("Unexpected character: @"));
}

#[test]
fn parses_expression() {
    let file = source_file("(1 + 2) * -3");

    loxwalk()
        .arg("parse")
        .arg(file.path())
        .assert()
        .success()
        .stdout("(* (group (+ 1.0 2.0)) (- 3.0))\n");
}

#[test]
fn evaluates_expression() {
    let file = source_file("\"foo\" + \"bar\"");

    loxwalk()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .success()
        .stdout("foobar\n");
}

#[test]
fn syntax_error_exits_65() {
    let file = source_file("print 1\nprint 2;");

    loxwalk()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicates::str::contains("Expect ';' after value."));
}

#[test]
fn static_error_exits_65_without_running() {
    let file = source_file("print \"ran\";\nreturn 1;");

    loxwalk()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(65)
        .stdout("")
        .stderr(predicates::str::contains("Can't return from top-level code."));
}

#[test]
fn runtime_error_exits_70() {
    let file = source_file("print \"first\";\nprint -\"x\";");

    loxwalk()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(70)
        .stdout("first\n")
        .stderr(predicates::str::contains("Operand must be a number.\n[line 2]"));
}

#[test]
fn max_depth_flag_limits_recursion() {
    let file = source_file("fun f() { f(); }\nf();");

    loxwalk()
        .args(["run", "--max-depth", "16"])
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicates::str::contains("call depth exceeded 16"));
}

#[test]
fn empty_file_runs() {
    let file = source_file("");

    loxwalk().arg("run").arg(file.path()).assert().success();
}

#[test]
fn missing_file_fails() {
    loxwalk()
        .args(["run", "no_such_file.lox"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Failed to open file"));
}

#[test]
fn no_file_prints_notice() {
    loxwalk()
        .arg("run")
        .assert()
        .success()
        .stdout(predicates::str::contains("No input filepath was provided"));
}
