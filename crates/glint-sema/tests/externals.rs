//! Integration tests for external resource blocks: allowed types, binding
//! attributes, named-block namespaces and resource method calls.

use glint_ast::builder;
use glint_ast::expr::{Expression, ExprValue};
use glint_ast::intrinsic::IntrinsicKind;
use glint_ast::module::{Module, ModuleFeature};
use glint_ast::stmt::{DeclareExternalStatement, ExternalVar, Statement};
use glint_ast::ty::{ExpressionType, PrimitiveType, VectorType};
use glint_common::span::Span;
use glint_sema::{resolve, CompileError, CompileErrorKind, ResolveOptions, TransformerContext};

fn sp(n: u32) -> Span {
    Span::new(n, n + 1)
}

fn ty_name(name: &str) -> ExprValue<ExpressionType> {
    ExprValue::from_expr(builder::identifier(name, sp(0)))
}

fn ty_apply(constructor: &str, arguments: Vec<Expression>) -> ExprValue<ExpressionType> {
    ExprValue::from_expr(builder::access_index(
        builder::identifier(constructor, sp(0)),
        arguments,
        sp(0),
    ))
}

fn external_var(name: &str, ty: ExprValue<ExpressionType>) -> ExternalVar {
    ExternalVar {
        span: sp(0),
        name: name.into(),
        ty,
        binding_set: ExprValue::None,
        binding_index: ExprValue::None,
        var_index: None,
    }
}

fn external_block(name: &str, vars: Vec<ExternalVar>) -> Statement {
    Statement::DeclareExternal(DeclareExternalStatement {
        span: sp(0),
        name: name.into(),
        external_index: None,
        binding_set: ExprValue::None,
        auto_binding: ExprValue::None,
        external_vars: vars,
    })
}

fn resolve_ok(statements: Vec<Statement>) -> (Module, TransformerContext) {
    let mut module = builder::module("test", statements);
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect("resolution should succeed");
    (module, context)
}

fn resolve_err(statements: Vec<Statement>) -> CompileError {
    let mut module = builder::module("test", statements);
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect_err("resolution should fail")
}

#[test]
fn anonymous_external_declares_resources() {
    // external { tex: sampler2D[f32], data: uniform[Settings] }
    let (module, context) = resolve_ok(vec![
        builder::declare_struct(
            "Settings",
            vec![builder::struct_member("strength", ty_name("f32"), sp(1))],
            sp(1),
        ),
        external_block(
            "",
            vec![
                external_var("tex", ty_apply("sampler2D", vec![builder::identifier("f32", sp(2))])),
                external_var("data", ty_apply("uniform", vec![builder::identifier("Settings", sp(3))])),
            ],
        ),
    ]);

    match &module.root.statements[1] {
        Statement::DeclareExternal(node) => {
            let tex = context
                .variables
                .retrieve(node.external_vars[0].var_index.unwrap(), sp(0))
                .unwrap();
            assert!(tex.ty.is_sampler(), "got {:?}", tex.ty);

            let data = context
                .variables
                .retrieve(node.external_vars[1].var_index.unwrap(), sp(0))
                .unwrap();
            assert!(
                matches!(data.ty, ExpressionType::Uniform(_)),
                "got {:?}",
                data.ty
            );
        }
        _ => unreachable!(),
    }
}

#[test]
fn uniform_field_access_preserves_wrapper_then_unwraps_for_locals() {
    // external { data: uniform[Settings] }
    // fn f() -> f32 { return data.strength; }
    let (module, _context) = resolve_ok(vec![
        builder::declare_struct(
            "Settings",
            vec![builder::struct_member("strength", ty_name("f32"), sp(1))],
            sp(1),
        ),
        external_block(
            "",
            vec![external_var(
                "data",
                ty_apply("uniform", vec![builder::identifier("Settings", sp(2))]),
            )],
        ),
        builder::declare_function(
            "f",
            vec![],
            ty_name("f32"),
            vec![builder::return_statement(
                Some(builder::access(
                    builder::identifier("data", sp(3)),
                    &["strength"],
                    sp(3),
                )),
                sp(3),
            )],
            sp(3),
        ),
    ]);

    match &module.root.statements[2] {
        Statement::DeclareFunction(function) => match &function.body[0] {
            Statement::Return(ret) => {
                // A non-struct field type passes through unwrapped.
                assert_eq!(
                    ret.expression.as_ref().unwrap().cached_type(),
                    Some(&ExpressionType::Primitive(PrimitiveType::Float32))
                );
            }
            _ => unreachable!(),
        },
        _ => unreachable!(),
    }
}

#[test]
fn sampler_method_call_lowers_to_intrinsic() {
    // external { tex: sampler2D[f32] }
    // fn sample(uv: vec2[f32]) -> vec4[f32] { return tex.Sample(uv); }
    let (module, _context) = resolve_ok(vec![
        external_block(
            "",
            vec![external_var(
                "tex",
                ty_apply("sampler2D", vec![builder::identifier("f32", sp(1))]),
            )],
        ),
        builder::declare_function(
            "sample",
            vec![builder::function_param(
                "uv",
                ty_apply("vec2", vec![builder::identifier("f32", sp(2))]),
                sp(2),
            )],
            ty_apply("vec4", vec![builder::identifier("f32", sp(2))]),
            vec![builder::return_statement(
                Some(builder::call(
                    builder::access(builder::identifier("tex", sp(3)), &["Sample"], sp(3)),
                    vec![builder::identifier("uv", sp(3))],
                    sp(3),
                )),
                sp(3),
            )],
            sp(2),
        ),
    ]);

    match &module.root.statements[1] {
        Statement::DeclareFunction(function) => match &function.body[0] {
            Statement::Return(ret) => match ret.expression.as_ref().unwrap() {
                Expression::Intrinsic(intrinsic) => {
                    assert_eq!(intrinsic.intrinsic, IntrinsicKind::TextureSampleImplicitLod);
                    // Sampler object + coordinates.
                    assert_eq!(intrinsic.parameters.len(), 2);
                    assert_eq!(
                        intrinsic.cached_type,
                        Some(ExpressionType::Vector(VectorType {
                            component_count: 4,
                            component_type: PrimitiveType::Float32,
                        }))
                    );
                }
                other => panic!("expected intrinsic call, got {other:?}"),
            },
            _ => unreachable!(),
        },
        _ => unreachable!(),
    }
}

#[test]
fn named_block_members_resolve_through_the_block() {
    // external Textures { tex: sampler2D[f32] }
    // fn f(uv: vec2[f32]) -> vec4[f32] { return Textures.tex.Sample(uv); }
    let (_module, _context) = resolve_ok(vec![
        external_block(
            "Textures",
            vec![external_var(
                "tex",
                ty_apply("sampler2D", vec![builder::identifier("f32", sp(1))]),
            )],
        ),
        builder::declare_function(
            "f",
            vec![builder::function_param(
                "uv",
                ty_apply("vec2", vec![builder::identifier("f32", sp(2))]),
                sp(2),
            )],
            ty_apply("vec4", vec![builder::identifier("f32", sp(2))]),
            vec![builder::return_statement(
                Some(builder::call(
                    builder::access(
                        builder::identifier("Textures", sp(3)),
                        &["tex", "Sample"],
                        sp(3),
                    ),
                    vec![builder::identifier("uv", sp(3))],
                    sp(3),
                )),
                sp(3),
            )],
            sp(2),
        ),
    ]);
}

#[test]
fn named_block_members_are_not_in_the_outer_scope() {
    let err = resolve_err(vec![
        external_block(
            "Textures",
            vec![external_var(
                "tex",
                ty_apply("sampler2D", vec![builder::identifier("f32", sp(1))]),
            )],
        ),
        builder::declare_const(
            "x",
            ExprValue::None,
            builder::identifier("tex", sp(2)),
            sp(2),
        ),
    ]);
    assert_eq!(
        err.kind,
        CompileErrorKind::UnknownIdentifier { name: "tex".into() }
    );
}

#[test]
fn plain_primitives_require_the_feature() {
    let statements = vec![external_block("", vec![external_var("t", ty_name("f32"))])];

    let err = resolve_err(statements.clone());
    assert!(
        matches!(err.kind, CompileErrorKind::ExternalTypeNotAllowed { .. }),
        "got {err:?}"
    );

    // With the feature enabled the same declaration is accepted.
    let mut module = builder::module("test", statements);
    module.metadata.enabled_features = vec![ModuleFeature::PrimitiveExternals];
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &ResolveOptions::default())
        .expect("primitive externals should be allowed under the feature");
}

#[test]
fn duplicate_external_variable_fails() {
    let err = resolve_err(vec![
        external_block(
            "",
            vec![external_var(
                "tex",
                ty_apply("sampler2D", vec![builder::identifier("f32", sp(1))]),
            )],
        ),
        external_block(
            "",
            vec![external_var(
                "tex",
                ty_apply("sampler2D", vec![builder::identifier("f32", sp(2))]),
            )],
        ),
    ]);
    assert_eq!(
        err.kind,
        CompileErrorKind::ExternalAlreadyDeclared { name: "tex".into() }
    );
}

#[test]
fn texture_write_method_returns_no_type() {
    // external { img: texture2D[f32, 2] }   (2 = read-write access)
    // fn w(coords: vec2[i32], value: vec4[f32]) { img.Write(coords, value); }
    let (module, _context) = resolve_ok(vec![
        external_block(
            "",
            vec![external_var(
                "img",
                ty_apply(
                    "texture2D",
                    vec![
                        builder::identifier("f32", sp(1)),
                        builder::u32_value(2, sp(1)),
                    ],
                ),
            )],
        ),
        builder::declare_function(
            "w",
            vec![
                builder::function_param(
                    "coords",
                    ty_apply("vec2", vec![builder::identifier("i32", sp(2))]),
                    sp(2),
                ),
                builder::function_param(
                    "value",
                    ty_apply("vec4", vec![builder::identifier("f32", sp(2))]),
                    sp(2),
                ),
            ],
            ExprValue::None,
            vec![builder::expression_statement(
                builder::call(
                    builder::access(builder::identifier("img", sp(3)), &["Write"], sp(3)),
                    vec![
                        builder::identifier("coords", sp(3)),
                        builder::identifier("value", sp(3)),
                    ],
                    sp(3),
                ),
                sp(3),
            )],
            sp(2),
        ),
    ]);

    match &module.root.statements[1] {
        Statement::DeclareFunction(function) => match &function.body[0] {
            Statement::Expression(statement) => match &statement.expression {
                Expression::Intrinsic(intrinsic) => {
                    assert_eq!(intrinsic.intrinsic, IntrinsicKind::TextureWrite);
                    assert_eq!(intrinsic.cached_type, Some(ExpressionType::NoType));
                }
                other => panic!("expected intrinsic, got {other:?}"),
            },
            _ => unreachable!(),
        },
        _ => unreachable!(),
    }
}
