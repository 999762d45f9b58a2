//! Integration tests for option value binding and `@unroll` loop expansion.

use glint_ast::builder;
use glint_ast::constant::ConstantValue;
use glint_ast::expr::{Expression, ExprValue};
use glint_ast::stmt::{LoopUnroll, Statement};
use glint_ast::ty::ExpressionType;
use glint_common::span::Span;
use glint_sema::{
    hash_option, resolve, resolve_with_options, CompileErrorKind, ResolveOptions,
    TransformerContext,
};
use rustc_hash::FxHashMap;

fn sp(n: u32) -> Span {
    Span::new(n, n + 1)
}

fn ty_name(name: &str) -> ExprValue<ExpressionType> {
    ExprValue::from_expr(builder::identifier(name, sp(0)))
}

// ── Options ────────────────────────────────────────────────────────────

#[test]
fn option_value_binding_overrides_default() {
    // option T: u32 = 16; const size = T;
    let statements = vec![
        builder::declare_option(
            "T",
            ty_name("u32"),
            Some(builder::int_literal(16, sp(1))),
            sp(1),
        ),
        builder::declare_const(
            "size",
            ExprValue::None,
            builder::identifier("T", sp(2)),
            sp(2),
        ),
    ];

    let mut module = builder::module("test", statements);
    let mut context = TransformerContext::new();
    let mut option_values = FxHashMap::default();
    option_values.insert(hash_option("T"), ConstantValue::u32_value(4));
    resolve_with_options(
        &mut module,
        &mut context,
        &ResolveOptions::default(),
        option_values,
    )
    .expect("resolution should succeed");

    // The option constant holds the supplied value, and references fold.
    match &module.root.statements[0] {
        Statement::DeclareOption(option) => {
            let data = context
                .constants
                .retrieve(option.opt_index.unwrap(), sp(0))
                .unwrap();
            assert_eq!(data.value, Some(ConstantValue::u32_value(4)));
        }
        _ => unreachable!(),
    }
    match &module.root.statements[1] {
        Statement::DeclareConst(node) => {
            let data = context
                .constants
                .retrieve(node.const_index.unwrap(), sp(0))
                .unwrap();
            assert_eq!(data.value, Some(ConstantValue::u32_value(4)));
        }
        _ => unreachable!(),
    }
}

#[test]
fn option_default_applies_without_supplied_value() {
    let mut module = builder::module(
        "test",
        vec![builder::declare_option(
            "T",
            ty_name("u32"),
            Some(builder::int_literal(16, sp(1))),
            sp(1),
        )],
    );
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &ResolveOptions::default()).unwrap();

    match &module.root.statements[0] {
        Statement::DeclareOption(option) => {
            let data = context
                .constants
                .retrieve(option.opt_index.unwrap(), sp(0))
                .unwrap();
            assert_eq!(data.value, Some(ConstantValue::u32_value(16)));
        }
        _ => unreachable!(),
    }
}

#[test]
fn option_without_value_or_default_fails() {
    let mut module = builder::module(
        "test",
        vec![builder::declare_option("T", ty_name("u32"), None, sp(1))],
    );
    let mut context = TransformerContext::new();
    let err = resolve(&mut module, &mut context, &ResolveOptions::default()).unwrap_err();
    assert_eq!(
        err.kind,
        CompileErrorKind::MissingOptionValue { name: "T".into() }
    );
}

#[test]
fn option_type_must_be_constant_capable() {
    // Samplers cannot be options.
    let mut module = builder::module(
        "test",
        vec![builder::declare_option(
            "S",
            ExprValue::from_expr(builder::access_index(
                builder::identifier("sampler2D", sp(1)),
                vec![builder::identifier("f32", sp(1))],
                sp(1),
            )),
            None,
            sp(1),
        )],
    );
    let mut context = TransformerContext::new();
    let err = resolve(&mut module, &mut context, &ResolveOptions::default()).unwrap_err();
    assert!(
        matches!(err.kind, CompileErrorKind::ExpectedConstantType { .. }),
        "got {err:?}"
    );
}

// ── Loop unrolling ─────────────────────────────────────────────────────

fn unrolled_loop_module() -> Vec<Statement> {
    // fn f() { @unroll for i in 0u -> 3u { let x = i; } }
    let mut for_loop = builder::for_loop(
        "i",
        builder::u32_value(0, sp(1)),
        builder::u32_value(3, sp(2)),
        None,
        builder::multi(
            vec![builder::declare_variable(
                "x",
                ExprValue::None,
                Some(builder::identifier("i", sp(3))),
                sp(3),
            )],
            sp(3),
        ),
        sp(1),
    );
    if let Statement::For(node) = &mut for_loop {
        node.unroll = ExprValue::Value(LoopUnroll::Always);
    }
    vec![builder::declare_function(
        "f",
        vec![],
        ExprValue::None,
        vec![for_loop],
        sp(1),
    )]
}

#[test]
fn unroll_for_expands_to_scoped_iterations() {
    let mut module = builder::module("test", unrolled_loop_module());
    let mut context = TransformerContext::new();
    let options = ResolveOptions {
        unroll_for_loops: true,
        ..ResolveOptions::default()
    };
    resolve(&mut module, &mut context, &options).unwrap();

    let body = match &module.root.statements[0] {
        Statement::DeclareFunction(function) => &function.body,
        _ => unreachable!(),
    };
    // The for statement became a multi of three scoped iterations.
    match &body[0] {
        Statement::Multi(multi) => {
            assert_eq!(multi.statements.len(), 3);
            for (i, iteration) in multi.statements.iter().enumerate() {
                let Statement::Scoped(scoped) = iteration else {
                    panic!("expected scoped iteration, got {iteration:?}");
                };
                let Statement::Multi(inner) = scoped.statement.as_ref() else {
                    panic!("expected iteration body list");
                };
                // First statement declares the counter constant.
                match &inner.statements[0] {
                    Statement::DeclareConst(counter) => {
                        assert_eq!(counter.name, "i");
                        let value = context
                            .constants
                            .retrieve(counter.const_index.unwrap(), sp(0))
                            .unwrap()
                            .value
                            .clone();
                        assert_eq!(value, Some(ConstantValue::u32_value(i as u32)));
                    }
                    other => panic!("expected counter constant, got {other:?}"),
                }
            }
        }
        other => panic!("expected unrolled multi, got {other:?}"),
    }
}

#[test]
fn unrolled_iterations_use_distinct_variable_indices() {
    let mut module = builder::module("test", unrolled_loop_module());
    let mut context = TransformerContext::new();
    let options = ResolveOptions {
        unroll_for_loops: true,
        ..ResolveOptions::default()
    };
    resolve(&mut module, &mut context, &options).unwrap();

    let body = match &module.root.statements[0] {
        Statement::DeclareFunction(function) => &function.body,
        _ => unreachable!(),
    };
    let Statement::Multi(multi) = &body[0] else {
        panic!("expected unrolled multi");
    };

    fn collect_var_indices(statement: &Statement, seen: &mut Vec<usize>) {
        match statement {
            Statement::DeclareVariable(var) => seen.push(var.var_index.expect("index filled")),
            Statement::Multi(multi) => {
                for statement in &multi.statements {
                    collect_var_indices(statement, seen);
                }
            }
            Statement::Scoped(scoped) => collect_var_indices(&scoped.statement, seen),
            _ => {}
        }
    }

    let mut seen = Vec::new();
    for iteration in &multi.statements {
        collect_var_indices(iteration, &mut seen);
    }
    assert_eq!(seen.len(), 3);
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 3, "iterations must not share variable indices");
}

#[test]
fn without_unroll_option_the_loop_stays() {
    let mut module = builder::module("test", unrolled_loop_module());
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &ResolveOptions::default()).unwrap();

    let body = match &module.root.statements[0] {
        Statement::DeclareFunction(function) => &function.body,
        _ => unreachable!(),
    };
    assert!(matches!(&body[0], Statement::For(_)));
}

#[test]
fn unroll_for_each_expands_array_elements() {
    // fn f(a: array[u32, 2]) { @unroll for each v in a { let y = v; } }
    let array_ty = ExprValue::from_expr(builder::access_index(
        builder::identifier("array", sp(1)),
        vec![
            builder::identifier("u32", sp(1)),
            builder::int_literal(2, sp(1)),
        ],
        sp(1),
    ));

    let for_each = Statement::ForEach(glint_ast::stmt::ForEachStatement {
        span: sp(2),
        var_name: "v".into(),
        var_index: None,
        expression: builder::identifier("a", sp(2)),
        unroll: ExprValue::Value(LoopUnroll::Always),
        statement: Box::new(builder::multi(
            vec![builder::declare_variable(
                "y",
                ExprValue::None,
                Some(builder::identifier("v", sp(3))),
                sp(3),
            )],
            sp(3),
        )),
    });

    let mut module = builder::module(
        "test",
        vec![builder::declare_function(
            "f",
            vec![builder::function_param("a", array_ty, sp(1))],
            ExprValue::None,
            vec![for_each],
            sp(1),
        )],
    );
    let mut context = TransformerContext::new();
    let options = ResolveOptions {
        unroll_for_each_loops: true,
        ..ResolveOptions::default()
    };
    resolve(&mut module, &mut context, &options).unwrap();

    let body = match &module.root.statements[0] {
        Statement::DeclareFunction(function) => &function.body,
        _ => unreachable!(),
    };
    match &body[0] {
        Statement::Multi(multi) => {
            assert_eq!(multi.statements.len(), 2);
            for iteration in &multi.statements {
                let Statement::Scoped(scoped) = iteration else {
                    panic!("expected scoped iteration");
                };
                let Statement::Multi(inner) = scoped.statement.as_ref() else {
                    panic!("expected iteration body");
                };
                match &inner.statements[0] {
                    Statement::DeclareVariable(element) => {
                        assert_eq!(element.name, "v");
                        assert!(matches!(
                            element.initial_expression,
                            Some(Expression::AccessIndex(_))
                        ));
                    }
                    other => panic!("expected element declaration, got {other:?}"),
                }
            }
        }
        other => panic!("expected unrolled multi, got {other:?}"),
    }
}
