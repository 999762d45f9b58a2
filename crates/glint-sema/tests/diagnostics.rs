//! Tests for error values and their rendering.
//!
//! Message wording is pinned with inline snapshots; the full ariadne output
//! is checked structurally (code, message, span content) since its layout
//! belongs to the rendering library.

use glint_ast::builder;
use glint_ast::expr::{BinaryOp, ExprValue};
use glint_common::span::Span;
use glint_sema::diagnostics::{error_code, render_diagnostic};
use glint_sema::{resolve, CompileError, ResolveOptions, TransformerContext};

fn sp(start: u32, end: u32) -> Span {
    Span::new(start, end)
}

fn first_error(statements: Vec<glint_ast::stmt::Statement>) -> CompileError {
    let mut module = builder::module("test", statements);
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect_err("expected a compile error")
}

#[test]
fn unknown_identifier_message() {
    let err = first_error(vec![builder::declare_const(
        "x",
        ExprValue::None,
        builder::identifier("undefined_thing", sp(10, 25)),
        sp(0, 25),
    )]);
    insta::assert_snapshot!(err.to_string(), @"unknown identifier `undefined_thing`");
    insta::assert_snapshot!(error_code(&err.kind), @"E0100");
}

#[test]
fn unmatching_types_message_names_both_sides() {
    let err = first_error(vec![builder::declare_const(
        "x",
        ExprValue::None,
        builder::binary(
            BinaryOp::Add,
            builder::bool_value(true, sp(4, 8)),
            builder::float_literal(1.0, sp(11, 14)),
            sp(4, 14),
        ),
        sp(0, 14),
    )]);
    insta::assert_snapshot!(
        err.to_string(),
        @"unmatching types: `bool` vs `{float literal}`"
    );
}

#[test]
fn rendered_diagnostic_carries_code_and_span() {
    let source = "const x = undefined_thing;";
    let err = first_error(vec![builder::declare_const(
        "x",
        ExprValue::None,
        builder::identifier("undefined_thing", sp(10, 25)),
        sp(0, 25),
    )]);

    let rendered = render_diagnostic(&err, source, "shader.gsl");
    assert!(rendered.contains("E0100"), "missing code: {rendered}");
    assert!(
        rendered.contains("unknown identifier `undefined_thing`"),
        "missing message: {rendered}"
    );
    assert!(
        rendered.contains("undefined_thing;"),
        "missing source excerpt: {rendered}"
    );
}

#[test]
fn rendered_diagnostic_includes_fix_hint_when_available() {
    // A non-boolean const-if condition has a fix hint.
    let source = "const if (1) {}";
    let err = first_error(vec![builder::const_branch(
        vec![(
            builder::int_literal(1, sp(10, 11)),
            glint_ast::stmt::Statement::no_op(sp(13, 15)),
        )],
        None,
        sp(0, 15),
    )]);
    let rendered = render_diagnostic(&err, source, "shader.gsl");
    assert!(
        rendered.contains("boolean expression"),
        "missing fix hint: {rendered}"
    );
}

#[test]
fn errors_serialize_for_tooling() {
    let err = first_error(vec![builder::declare_const(
        "x",
        ExprValue::None,
        builder::identifier("nope", sp(3, 7)),
        sp(0, 7),
    )]);

    let json = serde_json::to_value(&err).expect("errors serialize");
    assert_eq!(json["span"]["start"], 3);
    assert_eq!(json["span"]["end"], 7);
    assert_eq!(json["kind"]["UnknownIdentifier"]["name"], "nope");
}

#[test]
fn spans_survive_through_nested_expressions() {
    // The error points at the offending sub-expression, not the statement.
    let err = first_error(vec![builder::declare_const(
        "x",
        ExprValue::None,
        builder::binary(
            BinaryOp::Add,
            builder::int_literal(1, sp(4, 5)),
            builder::identifier("missing", sp(8, 15)),
            sp(4, 15),
        ),
        sp(0, 15),
    )]);
    assert_eq!(err.span, sp(8, 15));
}
