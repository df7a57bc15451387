use loxwalk as lox;

use lox::ast::{ExprKind, Stmt};
use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::parser::Parser;
use lox::scanner::Scanner;

fn tokens(source: &str) -> Vec<lox::token::Token> {
    Scanner::new(source).scan_all().expect("scan failed")
}

fn print_expr(source: &str) -> String {
    let expr = Parser::new(tokens(source))
        .parse_expression()
        .expect("parse failed");
    AstPrinter::print(&expr)
}

fn parse_program(source: &str) -> Vec<Stmt> {
    Parser::new(tokens(source)).parse().expect("parse failed")
}

fn parse_errors(source: &str) -> Vec<LoxError> {
    Parser::new(tokens(source))
        .parse()
        .expect_err("expected parse errors")
}

#[test]
fn precedence_and_grouping() {
    assert_eq!(print_expr("-123 * (45.67)"), "(* (- 123.0) (group 45.67))");
    assert_eq!(print_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
    assert_eq!(print_expr("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
    assert_eq!(print_expr("1 < 2 == !false"), "(== (< 1.0 2.0) (! false))");
}

#[test]
fn logical_operators_bind_looser_than_equality() {
    assert_eq!(
        print_expr("a == b or c and d"),
        "(or (== a b) (and c d))"
    );
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(print_expr("a = b = 1"), "(= a (= b 1.0))");
}

#[test]
fn calls_properties_and_super() {
    assert_eq!(print_expr("f(1, \"x\")(nil)"), "(call (call f 1.0 x) nil)");
    assert_eq!(print_expr("a.b.c"), "(. (. a b) c)");
    assert_eq!(print_expr("a.b = this"), "(= (. a b) this)");
    assert_eq!(print_expr("super.m"), "(super m)");
}

#[test]
fn invalid_assignment_target() {
    let err = Parser::new(tokens("1 + 2 = 3"))
        .parse_expression()
        .unwrap_err();

    assert_eq!(err.to_string(), "[line 1] Error: Invalid assignment target.");
}

#[test]
fn missing_expression_is_reported() {
    let err = Parser::new(tokens("(1 +")).parse_expression().unwrap_err();
    assert!(err.to_string().contains("Expect expression."));
}

#[test]
fn for_loop_is_desugared_into_block_and_while() {
    let program = parse_program("for (var i = 0; i < 3; i = i + 1) print i;");
    assert_eq!(program.len(), 1);

    let Stmt::Block(outer) = &program[0] else {
        panic!("expected block, got {:?}", program[0]);
    };
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { condition, body } = &outer[1] else {
        panic!("expected while, got {:?}", outer[1]);
    };
    assert!(matches!(condition.kind, ExprKind::Binary { .. }));

    let Stmt::Block(inner) = body.as_ref() else {
        panic!("expected loop body block, got {:?}", body);
    };
    assert!(matches!(inner[0], Stmt::Print { .. }));
    assert!(matches!(inner[1], Stmt::Expression(_)));
}

#[test]
fn for_loop_without_clauses_loops_on_true() {
    let program = parse_program("for (;;) print 1;");

    let Stmt::While { condition, .. } = &program[0] else {
        panic!("expected bare while, got {:?}", program[0]);
    };
    assert_eq!(AstPrinter::print(condition), "true");
}

#[test]
fn class_declaration_with_superclass() {
    let program = parse_program("class B < A { init(x) { this.x = x; } m() {} }");

    let Stmt::Class(class) = &program[0] else {
        panic!("expected class, got {:?}", program[0]);
    };
    assert_eq!(class.name.lexeme, "B");
    assert!(class.superclass.is_some());

    let names: Vec<_> = class.methods.iter().map(|m| m.name.lexeme.as_str()).collect();
    assert_eq!(names, vec!["init", "m"]);
    assert_eq!(class.methods[0].params.len(), 1);
}

#[test]
fn every_syntax_error_is_collected() {
    let errors = parse_errors("var = 1;\nprint 2;\nvar ;\n");

    assert_eq!(errors.len(), 2);
    assert!(errors[0].to_string().starts_with("[line 1]"));
    assert!(errors[1].to_string().starts_with("[line 3]"));
}

#[test]
fn expression_ids_are_unique() {
    let a = Parser::new(tokens("x")).parse_expression().unwrap();
    let b = Parser::new(tokens("x")).parse_expression().unwrap();

    assert_ne!(a.id, b.id);
}
