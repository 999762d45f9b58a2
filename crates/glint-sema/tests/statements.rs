//! Integration tests for statement resolution: `const if` collapsing,
//! compile-time conditionals, alias removal, declaration checks and the
//! statement-level error paths.

use glint_ast::builder;
use glint_ast::constant::ConstantValue;
use glint_ast::expr::{BinaryOp, Expression, ExprValue};
use glint_ast::module::Module;
use glint_ast::stmt::Statement;
use glint_ast::ty::{ExpressionType, PrimitiveType};
use glint_common::span::Span;
use glint_sema::{resolve, CompileError, CompileErrorKind, ResolveOptions, TransformerContext};

fn sp(n: u32) -> Span {
    Span::new(n, n + 1)
}

fn ty_name(name: &str) -> ExprValue<ExpressionType> {
    ExprValue::from_expr(builder::identifier(name, sp(0)))
}

fn resolve_with(
    statements: Vec<Statement>,
    options: &ResolveOptions<'_>,
) -> (Module, TransformerContext) {
    let mut module = builder::module("test", statements);
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, options).expect("resolution should succeed");
    (module, context)
}

fn resolve_ok(statements: Vec<Statement>) -> (Module, TransformerContext) {
    resolve_with(statements, &ResolveOptions::default())
}

fn resolve_err(statements: Vec<Statement>) -> CompileError {
    let mut module = builder::module("test", statements);
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect_err("resolution should fail")
}

// ── const if ───────────────────────────────────────────────────────────

#[test]
fn const_if_keeps_only_the_taken_arm() {
    // const N = 4; const if (N > 2) { let a = 1; } else { let a = 2; }
    let (module, _context) = resolve_ok(vec![
        builder::declare_const("N", ExprValue::None, builder::int_literal(4, sp(1)), sp(1)),
        builder::const_branch(
            vec![(
                builder::binary(
                    BinaryOp::CompGt,
                    builder::identifier("N", sp(2)),
                    builder::int_literal(2, sp(2)),
                    sp(2),
                ),
                builder::multi(
                    vec![builder::declare_variable(
                        "a",
                        ExprValue::None,
                        Some(builder::int_literal(1, sp(3))),
                        sp(3),
                    )],
                    sp(3),
                ),
            )],
            Some(builder::multi(
                vec![builder::declare_variable(
                    "a",
                    ExprValue::None,
                    Some(builder::int_literal(2, sp(4))),
                    sp(4),
                )],
                sp(4),
            )),
            sp(2),
        ),
    ]);

    // The branch statement is gone; the taken arm's statement list replaced it.
    assert_eq!(module.root.statements.len(), 2);
    match &module.root.statements[1] {
        Statement::Multi(multi) => {
            assert_eq!(multi.statements.len(), 1);
            match &multi.statements[0] {
                Statement::DeclareVariable(var) =>

                {
                    let init = var.initial_expression.as_ref().unwrap();
                    match init {
                        Expression::ConstantValue(cv) => {
                            assert_eq!(cv.value, ConstantValue::int_literal(1));
                        }
                        other => panic!("expected the taken arm's literal, got {other:?}"),
                    }
                }
                other => panic!("expected variable declaration, got {other:?}"),
            }
        }
        other => panic!("expected spliced statement list, got {other:?}"),
    }
}

#[test]
fn const_if_with_no_taken_arm_is_removed() {
    let (module, _context) = resolve_ok(vec![builder::const_branch(
        vec![(
            builder::bool_value(false, sp(1)),
            builder::declare_variable(
                "a",
                ExprValue::None,
                Some(builder::int_literal(1, sp(1))),
                sp(1),
            ),
        )],
        None,
        sp(1),
    )]);
    assert!(module.root.statements.is_empty());
}

#[test]
fn const_if_requires_boolean_condition() {
    let err = resolve_err(vec![builder::const_branch(
        vec![(
            builder::int_literal(1, sp(1)),
            Statement::no_op(sp(1)),
        )],
        None,
        sp(1),
    )]);
    assert!(
        matches!(err.kind, CompileErrorKind::ConditionExpectedBool { .. }),
        "got {err:?}"
    );
}

#[test]
fn runtime_branch_requires_boolean_condition_type() {
    // fn f() { if (1) {} }
    let err = resolve_err(vec![builder::declare_function(
        "f",
        vec![],
        ExprValue::None,
        vec![builder::branch(
            vec![(builder::int_literal(1, sp(1)), Statement::no_op(sp(1)))],
            None,
            sp(1),
        )],
        sp(1),
    )]);
    assert!(
        matches!(err.kind, CompileErrorKind::ConditionExpectedBool { .. }),
        "got {err:?}"
    );
}

// ── Compile-time conditionals ──────────────────────────────────────────

#[test]
fn conditional_statement_folds_away() {
    // #[cond(true)] const a = 1;  #[cond(false)] const b = 2;
    let (module, _context) = resolve_ok(vec![
        builder::conditional(
            builder::bool_value(true, sp(1)),
            builder::declare_const("a", ExprValue::None, builder::int_literal(1, sp(1)), sp(1)),
            sp(1),
        ),
        builder::conditional(
            builder::bool_value(false, sp(2)),
            builder::declare_const("b", ExprValue::None, builder::int_literal(2, sp(2)), sp(2)),
            sp(2),
        ),
    ]);

    assert_eq!(module.root.statements.len(), 1);
    assert!(matches!(
        &module.root.statements[0],
        Statement::DeclareConst(node) if node.name == "a"
    ));
}

// ── Aliases ────────────────────────────────────────────────────────────

#[test]
fn alias_resolves_to_target() {
    // struct Data {}; alias D = Data; fn f(d: D) {}
    let (module, _context) = resolve_ok(vec![
        builder::declare_struct("Data", vec![], sp(1)),
        builder::declare_alias("D", builder::identifier("Data", sp(2)), sp(2)),
        builder::declare_function(
            "f",
            vec![builder::function_param("d", ty_name("D"), sp(3))],
            ExprValue::None,
            vec![],
            sp(3),
        ),
    ]);

    match &module.root.statements[2] {
        Statement::DeclareFunction(function) => {
            let ty = function.parameters[0].ty.value().unwrap();
            assert!(ty.resolve_alias().is_struct(), "got {ty:?}");
        }
        _ => unreachable!(),
    }
}

#[test]
fn remove_aliases_strips_every_alias() {
    let options = ResolveOptions {
        remove_aliases: true,
        ..ResolveOptions::default()
    };
    let (module, _context) = resolve_with(
        vec![
            builder::declare_struct("Data", vec![], sp(1)),
            builder::declare_alias("D", builder::identifier("Data", sp(2)), sp(2)),
            builder::declare_function(
                "f",
                vec![builder::function_param("d", ty_name("D"), sp(3))],
                ExprValue::None,
                vec![],
                sp(3),
            ),
        ],
        &options,
    );

    // No alias declaration survives, and no type mentions an alias.
    for statement in &module.root.statements {
        assert!(
            !matches!(statement, Statement::DeclareAlias(_)),
            "alias declaration survived"
        );
    }
    match &module.root.statements[1] {
        Statement::DeclareFunction(function) => {
            let ty = function.parameters[0].ty.value().unwrap();
            assert!(ty.is_struct(), "alias not spliced away: {ty:?}");
        }
        _ => unreachable!(),
    }
}

#[test]
fn alias_of_value_fails() {
    let err = resolve_err(vec![
        builder::declare_const("x", ExprValue::None, builder::int_literal(1, sp(1)), sp(1)),
        builder::declare_alias("y", builder::identifier("x", sp(2)), sp(2)),
    ]);
    assert!(
        matches!(err.kind, CompileErrorKind::AliasUnexpectedType { .. }),
        "got {err:?}"
    );
}

// ── Declarations ───────────────────────────────────────────────────────

#[test]
fn variable_without_type_or_initializer_fails() {
    let err = resolve_err(vec![builder::declare_variable(
        "x",
        ExprValue::None,
        None,
        sp(1),
    )]);
    assert_eq!(err.kind, CompileErrorKind::MissingExpression);
}

#[test]
fn variable_annotation_must_match_initializer() {
    let err = resolve_err(vec![builder::declare_variable(
        "x",
        ty_name("bool"),
        Some(builder::int_literal(1, sp(1))),
        sp(1),
    )]);
    assert!(
        matches!(err.kind, CompileErrorKind::DeclarationTypeMismatch { .. }),
        "got {err:?}"
    );
}

#[test]
fn duplicate_identifier_fails() {
    let err = resolve_err(vec![
        builder::declare_const("x", ExprValue::None, builder::int_literal(1, sp(1)), sp(1)),
        builder::declare_const("x", ExprValue::None, builder::int_literal(2, sp(2)), sp(2)),
    ]);
    assert_eq!(
        err.kind,
        CompileErrorKind::IdentifierAlreadyUsed { name: "x".into() }
    );
}

#[test]
fn struct_member_cannot_have_builtin_and_location() {
    use glint_ast::stmt::BuiltinEntry;

    let mut member = builder::struct_member("position", ty_name("f32"), sp(1));
    member.builtin = ExprValue::Value(BuiltinEntry::Position);
    member.location_index = ExprValue::from_expr(builder::int_literal(0, sp(1)));

    let err = resolve_err(vec![builder::declare_struct("V", vec![member], sp(1))]);
    assert_eq!(err.kind, CompileErrorKind::StructFieldBuiltinLocation);
}

#[test]
fn struct_member_disabled_by_condition_is_skipped_in_indexing() {
    // struct S { #[cond(false)] hidden: f32, shown: i32 }
    // fn get(s: S) -> i32 { return s.shown; }
    let mut hidden = builder::struct_member("hidden", ty_name("f32"), sp(1));
    hidden.cond = ExprValue::from_expr(builder::bool_value(false, sp(1)));
    let shown = builder::struct_member("shown", ty_name("i32"), sp(2));

    let (module, _context) = resolve_ok(vec![
        builder::declare_struct("S", vec![hidden, shown], sp(1)),
        builder::declare_function(
            "get",
            vec![builder::function_param("s", ty_name("S"), sp(3))],
            ty_name("i32"),
            vec![builder::return_statement(
                Some(builder::access(
                    builder::identifier("s", sp(4)),
                    &["shown"],
                    sp(4),
                )),
                sp(4),
            )],
            sp(3),
        ),
    ]);

    match &module.root.statements[1] {
        Statement::DeclareFunction(function) => match &function.body[0] {
            Statement::Return(ret) => match ret.expression.as_ref().unwrap() {
                Expression::AccessField(access) => {
                    // `shown` is the first *enabled* member.
                    assert_eq!(access.field_index, 0);
                }
                other => panic!("expected field access, got {other:?}"),
            },
            _ => unreachable!(),
        },
        _ => unreachable!(),
    }
}

#[test]
fn std140_structs_reject_bool_members() {
    use glint_ast::stmt::MemoryLayout;

    let mut decl = builder::declare_struct(
        "U",
        vec![builder::struct_member("flag", ty_name("bool"), sp(1))],
        sp(1),
    );
    if let Statement::DeclareStruct(node) = &mut decl {
        node.description.layout = ExprValue::Value(MemoryLayout::Std140);
    }
    let err = resolve_err(vec![decl]);
    assert!(
        matches!(err.kind, CompileErrorKind::StructLayoutTypeNotAllowed { .. }),
        "got {err:?}"
    );
}

#[test]
fn std140_nested_struct_must_share_layout() {
    use glint_ast::stmt::MemoryLayout;

    let inner = builder::declare_struct(
        "Inner",
        vec![builder::struct_member("v", ty_name("f32"), sp(1))],
        sp(1),
    );
    let mut outer = builder::declare_struct(
        "Outer",
        vec![builder::struct_member("inner", ty_name("Inner"), sp(2))],
        sp(2),
    );
    if let Statement::DeclareStruct(node) = &mut outer {
        node.description.layout = ExprValue::Value(MemoryLayout::Std140);
    }
    let err = resolve_err(vec![inner, outer]);
    assert!(
        matches!(err.kind, CompileErrorKind::StructLayoutInnerMismatch { .. }),
        "got {err:?}"
    );
}

// ── Control flow checks ────────────────────────────────────────────────

#[test]
fn return_outside_function_fails() {
    let err = resolve_err(vec![builder::return_statement(None, sp(1))]);
    assert_eq!(err.kind, CompileErrorKind::ReturnOutsideFunction);
}

#[test]
fn return_type_must_match() {
    let err = resolve_err(vec![builder::declare_function(
        "f",
        vec![],
        ty_name("i32"),
        vec![builder::return_statement(
            Some(builder::bool_value(true, sp(1))),
            sp(1),
        )],
        sp(1),
    )]);
    assert!(
        matches!(err.kind, CompileErrorKind::UnmatchingTypes { .. }),
        "got {err:?}"
    );
}

#[test]
fn break_outside_loop_fails() {
    let err = resolve_err(vec![builder::declare_function(
        "f",
        vec![],
        ExprValue::None,
        vec![Statement::Break(glint_ast::stmt::BreakStatement { span: sp(1) })],
        sp(1),
    )]);
    assert_eq!(
        err.kind,
        CompileErrorKind::LoopControlOutsideLoop { control: "break" }
    );
}

#[test]
fn break_inside_while_is_accepted() {
    let (_module, _context) = resolve_ok(vec![builder::declare_function(
        "f",
        vec![],
        ExprValue::None,
        vec![builder::while_loop(
            builder::bool_value(true, sp(1)),
            Statement::Break(glint_ast::stmt::BreakStatement { span: sp(1) }),
            sp(1),
        )],
        sp(1),
    )]);
}

#[test]
fn discard_requires_fragment_stage() {
    use glint_ast::module::ShaderStage;

    let mut vertex = builder::declare_function(
        "vert",
        vec![],
        ExprValue::None,
        vec![Statement::Discard(glint_ast::stmt::DiscardStatement { span: sp(1) })],
        sp(1),
    );
    if let Statement::DeclareFunction(node) = &mut vertex {
        node.entry_stage = ExprValue::Value(ShaderStage::Vertex);
    }
    let err = resolve_err(vec![vertex]);
    assert!(
        matches!(err.kind, CompileErrorKind::DiscardOutsideFragmentStage { .. }),
        "got {err:?}"
    );

    // Same body under a fragment stage is fine.
    let mut fragment = builder::declare_function(
        "frag",
        vec![],
        ExprValue::None,
        vec![Statement::Discard(glint_ast::stmt::DiscardStatement { span: sp(1) })],
        sp(1),
    );
    if let Statement::DeclareFunction(node) = &mut fragment {
        node.entry_stage = ExprValue::Value(ShaderStage::Fragment);
    }
    let mut module = builder::module("test", vec![fragment]);
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect("discard in fragment stage should resolve");
}

#[test]
fn forward_references_within_a_module_are_legal() {
    // fn caller() -> i32 { return callee(); }  fn callee() -> i32 { ... }
    let (_module, _context) = resolve_ok(vec![
        builder::declare_function(
            "caller",
            vec![],
            ty_name("i32"),
            vec![builder::return_statement(
                Some(builder::call(builder::identifier("callee", sp(1)), vec![], sp(1))),
                sp(1),
            )],
            sp(1),
        ),
        builder::declare_function(
            "callee",
            vec![],
            ty_name("i32"),
            vec![builder::return_statement(
                Some(builder::i32_value(1, sp(2))),
                sp(2),
            )],
            sp(2),
        ),
    ]);
}

#[test]
fn scope_cleanup_drops_locals() {
    // fn f() { { let x = 1; } return x; } -- x is out of scope.
    let err = resolve_err(vec![builder::declare_function(
        "f",
        vec![],
        ty_name("i32"),
        vec![
            builder::scoped(
                builder::declare_variable(
                    "x",
                    ExprValue::None,
                    Some(builder::int_literal(1, sp(1))),
                    sp(1),
                ),
                sp(1),
            ),
            builder::return_statement(Some(builder::identifier("x", sp(2))), sp(2)),
        ],
        sp(1),
    )]);
    assert_eq!(
        err.kind,
        CompileErrorKind::UnknownIdentifier { name: "x".into() }
    );
}

#[test]
fn type_annotations_are_completed_everywhere() {
    // Invariant: every expression in a successfully resolved tree has a
    // cached type.
    let (module, _context) = resolve_ok(vec![
        builder::declare_const("k", ty_name("u32"), builder::int_literal(8, sp(1)), sp(1)),
        builder::declare_function(
            "f",
            vec![builder::function_param("x", ty_name("u32"), sp(2))],
            ty_name("u32"),
            vec![builder::return_statement(
                Some(builder::binary(
                    BinaryOp::Add,
                    builder::identifier("x", sp(3)),
                    builder::identifier("k", sp(3)),
                    sp(3),
                )),
                sp(3),
            )],
            sp(2),
        ),
    ]);

    fn assert_typed(expr: &Expression) {
        assert!(
            expr.cached_type().is_some(),
            "expression missing a type: {expr:?}"
        );
        match expr {
            Expression::Binary(node) => {
                assert_typed(&node.left);
                assert_typed(&node.right);
            }
            Expression::AccessField(node) => assert_typed(&node.expr),
            _ => {}
        }
    }

    match &module.root.statements[1] {
        Statement::DeclareFunction(function) => match &function.body[0] {
            Statement::Return(ret) => {
                let expr = ret.expression.as_ref().unwrap();
                assert_typed(expr);
                assert_eq!(
                    expr.cached_type(),
                    Some(&ExpressionType::Primitive(PrimitiveType::UInt32))
                );
            }
            _ => unreachable!(),
        },
        _ => unreachable!(),
    }
}
