//! Partial-compilation mode: the resolver tolerates unresolved identifiers,
//! missing option values and non-foldable constants instead of failing, so
//! IDE-style tooling can resolve a single module in isolation.

use glint_ast::builder;
use glint_ast::expr::{BinaryOp, Expression, ExprValue};
use glint_ast::stmt::Statement;
use glint_ast::ty::ExpressionType;
use glint_common::span::Span;
use glint_sema::{resolve, ResolveOptions, TransformerContext};

fn sp(n: u32) -> Span {
    Span::new(n, n + 1)
}

fn ty_name(name: &str) -> ExprValue<ExpressionType> {
    ExprValue::from_expr(builder::identifier(name, sp(0)))
}

fn partial_context() -> TransformerContext {
    let mut context = TransformerContext::new();
    context.partial_compilation = true;
    context
}

#[test]
fn missing_option_value_stays_unresolved() {
    // option T: u32; -- no value, no default: fatal in full compilation,
    // a placeholder in partial compilation.
    let mut module = builder::module(
        "test",
        vec![builder::declare_option("T", ty_name("u32"), None, sp(1))],
    );
    let mut context = partial_context();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect("partial compilation should tolerate a missing option value");

    match &module.root.statements[0] {
        Statement::DeclareOption(option) => {
            let data = context
                .constants
                .retrieve(option.opt_index.unwrap(), sp(0))
                .unwrap();
            assert_eq!(data.value, None, "placeholder must hold no value");
        }
        _ => unreachable!(),
    }
}

#[test]
fn constant_depending_on_unresolved_option_is_deferred() {
    // option T: u32; const size = T * 2;
    let mut module = builder::module(
        "test",
        vec![
            builder::declare_option("T", ty_name("u32"), None, sp(1)),
            builder::declare_const(
                "size",
                ExprValue::None,
                builder::binary(
                    BinaryOp::Multiply,
                    builder::identifier("T", sp(2)),
                    builder::int_literal(2, sp(2)),
                    sp(2),
                ),
                sp(2),
            ),
        ],
    );
    let mut context = partial_context();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect("partial compilation should defer the constant");

    match &module.root.statements[1] {
        Statement::DeclareConst(node) => {
            let data = context
                .constants
                .retrieve(node.const_index.unwrap(), sp(0))
                .unwrap();
            assert_eq!(data.value, None);
            // The initializer stays a runtime-shaped expression.
            assert!(matches!(
                node.expression,
                Some(Expression::Binary(_))
            ));
        }
        _ => unreachable!(),
    }
}

#[test]
fn wildcard_import_without_resolver_relaxes_unknown_identifiers() {
    // import * from "somewhere"; const x = imported_thing;
    let mut module = builder::module(
        "test",
        vec![
            builder::import_symbols("somewhere", &[("", "")], sp(1)),
            builder::declare_const(
                "x",
                ExprValue::None,
                builder::identifier("imported_thing", sp(2)),
                sp(2),
            ),
        ],
    );
    let mut context = partial_context();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect("wildcard import should relax unknown identifiers");

    // The unresolved identifier survives as-is.
    match &module.root.statements[1] {
        Statement::DeclareConst(node) => {
            assert!(matches!(
                node.expression,
                Some(Expression::Identifier(_))
            ));
        }
        _ => unreachable!(),
    }
}

#[test]
fn selective_import_without_resolver_registers_unresolved_names() {
    // import helper from "somewhere"; const x = helper;
    // `helper` is known-but-unresolved, so references stay untouched
    // without tripping the unknown-identifier trap.
    let mut module = builder::module(
        "test",
        vec![
            builder::import_symbols("somewhere", &[("helper", "")], sp(1)),
            builder::declare_const(
                "x",
                ExprValue::None,
                builder::identifier("helper", sp(2)),
                sp(2),
            ),
        ],
    );
    let mut context = partial_context();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect("selective import should register unresolved names");

    match &module.root.statements[1] {
        Statement::DeclareConst(node) => {
            assert!(matches!(
                node.expression,
                Some(Expression::Identifier(_))
            ));
        }
        _ => unreachable!(),
    }
}

#[test]
fn full_compilation_still_traps_unknown_identifiers() {
    let mut module = builder::module(
        "test",
        vec![builder::declare_const(
            "x",
            ExprValue::None,
            builder::identifier("nope", sp(1)),
            sp(1),
        )],
    );
    let mut context = TransformerContext::new();
    assert!(resolve(&mut module, &mut context, &ResolveOptions::default()).is_err());
}
