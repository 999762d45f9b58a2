//! Re-resolution stability: running the resolver over an already-resolved
//! tree must be a fixed point. Preregistration reserves the indices the
//! first run assigned, so neither indices nor tree shape may change.

use glint_ast::builder;
use glint_ast::expr::{BinaryOp, ExprValue};
use glint_ast::module::Module;
use glint_ast::stmt::{LoopUnroll, Statement};
use glint_ast::ty::ExpressionType;
use glint_common::span::Span;
use glint_sema::{resolve, ResolveOptions, TransformerContext};

fn sp(n: u32) -> Span {
    Span::new(n, n + 1)
}

fn ty_name(name: &str) -> ExprValue<ExpressionType> {
    ExprValue::from_expr(builder::identifier(name, sp(0)))
}

/// Resolve twice (fresh context each time, as a re-run would) and require
/// structural equality.
fn assert_fixed_point(mut module: Module, options: &ResolveOptions<'_>) {
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, options).expect("first resolution should succeed");

    let mut second = module.clone();
    let mut second_context = TransformerContext::new();
    resolve(&mut second, &mut second_context, options)
        .expect("re-resolution should succeed");

    assert_eq!(module, second, "re-resolution changed the tree");
}

#[test]
fn plain_declarations_are_stable() {
    let module = builder::module(
        "test",
        vec![
            builder::declare_const("k", ty_name("i32"), builder::int_literal(3, sp(1)), sp(1)),
            builder::declare_struct(
                "Data",
                vec![builder::struct_member("v", ty_name("f32"), sp(2))],
                sp(2),
            ),
            builder::declare_function(
                "f",
                vec![builder::function_param("d", ty_name("Data"), sp(3))],
                ty_name("i32"),
                vec![builder::return_statement(
                    Some(builder::binary(
                        BinaryOp::Add,
                        builder::identifier("k", sp(4)),
                        builder::int_literal(1, sp(4)),
                        sp(4),
                    )),
                    sp(4),
                )],
                sp(3),
            ),
        ],
    );
    assert_fixed_point(module, &ResolveOptions::default());
}

#[test]
fn const_if_resolution_is_stable() {
    let module = builder::module(
        "test",
        vec![
            builder::declare_const("N", ExprValue::None, builder::int_literal(4, sp(1)), sp(1)),
            builder::const_branch(
                vec![(
                    builder::binary(
                        BinaryOp::CompGt,
                        builder::identifier("N", sp(2)),
                        builder::int_literal(2, sp(2)),
                        sp(2),
                    ),
                    builder::declare_const(
                        "a",
                        ExprValue::None,
                        builder::int_literal(1, sp(3)),
                        sp(3),
                    ),
                )],
                None,
                sp(2),
            ),
        ],
    );
    assert_fixed_point(module, &ResolveOptions::default());
}

#[test]
fn unrolled_loops_are_stable() {
    let mut for_loop = builder::for_loop(
        "i",
        builder::u32_value(0, sp(1)),
        builder::u32_value(2, sp(1)),
        None,
        builder::multi(
            vec![builder::declare_variable(
                "x",
                ExprValue::None,
                Some(builder::identifier("i", sp(2))),
                sp(2),
            )],
            sp(2),
        ),
        sp(1),
    );
    if let Statement::For(node) = &mut for_loop {
        node.unroll = ExprValue::Value(LoopUnroll::Always);
    }
    let module = builder::module(
        "test",
        vec![builder::declare_function(
            "f",
            vec![],
            ExprValue::None,
            vec![for_loop],
            sp(1),
        )],
    );
    let options = ResolveOptions {
        unroll_for_loops: true,
        ..ResolveOptions::default()
    };
    assert_fixed_point(module, &options);
}

#[test]
fn alias_removal_is_stable() {
    let module = builder::module(
        "test",
        vec![
            builder::declare_struct("Data", vec![], sp(1)),
            builder::declare_alias("D", builder::identifier("Data", sp(2)), sp(2)),
            builder::declare_variable("d", ty_name("D"), None, sp(3)),
        ],
    );
    let options = ResolveOptions {
        remove_aliases: true,
        ..ResolveOptions::default()
    };
    assert_fixed_point(module, &options);
}
