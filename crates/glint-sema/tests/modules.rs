//! Integration tests for module imports: selective re-export, renames,
//! whole-module binding, de-duplication, cycle detection, feature gating
//! and unused-symbol elimination in imported modules.

use rustc_hash::FxHashMap;

use glint_ast::builder;
use glint_ast::constant::ConstantValue;
use glint_ast::expr::ExprValue;
use glint_ast::module::{Module, ModuleFeature, ShaderStage};
use glint_ast::stmt::Statement;
use glint_ast::ty::ExpressionType;
use glint_common::span::Span;
use glint_sema::{
    resolve, CompileErrorKind, ModuleResolver, ResolveOptions, TransformerContext,
};

fn sp(n: u32) -> Span {
    Span::new(n, n + 1)
}

fn ty_name(name: &str) -> ExprValue<ExpressionType> {
    ExprValue::from_expr(builder::identifier(name, sp(0)))
}

/// A module resolver backed by a name -> module map. Modules are cloned on
/// every resolution, like a file loader re-parsing sources.
struct MapResolver {
    modules: FxHashMap<String, Module>,
}

impl MapResolver {
    fn new(modules: Vec<(&str, Module)>) -> Self {
        Self {
            modules: modules
                .into_iter()
                .map(|(name, module)| (name.to_string(), module))
                .collect(),
        }
    }
}

impl ModuleResolver for MapResolver {
    fn resolve(&self, module_name: &str) -> Option<Module> {
        self.modules.get(module_name).cloned()
    }
}

/// A math module exporting a constant, a function and a struct.
fn math_module() -> Module {
    let mut scale = builder::declare_const(
        "scale",
        ty_name("f32"),
        builder::float_literal(2.0, sp(1)),
        sp(1),
    );
    if let Statement::DeclareConst(node) = &mut scale {
        node.is_exported = ExprValue::Value(true);
    }

    let mut double = builder::declare_function(
        "double",
        vec![builder::function_param("x", ty_name("f32"), sp(2))],
        ty_name("f32"),
        vec![builder::return_statement(
            Some(builder::binary(
                glint_ast::expr::BinaryOp::Multiply,
                builder::identifier("x", sp(2)),
                builder::identifier("scale", sp(2)),
                sp(2),
            )),
            sp(2),
        )],
        sp(2),
    );
    if let Statement::DeclareFunction(node) = &mut double {
        node.is_exported = ExprValue::Value(true);
    }

    let mut point = builder::declare_struct(
        "Point",
        vec![
            builder::struct_member("x", ty_name("f32"), sp(3)),
            builder::struct_member("y", ty_name("f32"), sp(3)),
        ],
        sp(3),
    );
    if let Statement::DeclareStruct(node) = &mut point {
        node.is_exported = ExprValue::Value(true);
    }

    // An unexported helper nothing imports: elimination should drop it.
    let unused = builder::declare_function("helper", vec![], ExprValue::None, vec![], sp(4));

    builder::module("Math", vec![scale, double, point, unused])
}

// ── Selective imports ──────────────────────────────────────────────────

#[test]
fn selective_import_materializes_symbols() {
    // import double, scale from "math";  fn go() -> f32 { return double(scale); }
    let resolver = MapResolver::new(vec![("math", math_module())]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    let mut module = builder::module(
        "main",
        vec![
            builder::import_symbols("math", &[("double", ""), ("scale", "")], sp(1)),
            builder::declare_function(
                "go",
                vec![],
                ty_name("f32"),
                vec![builder::return_statement(
                    Some(builder::call(
                        builder::identifier("double", sp(2)),
                        vec![builder::identifier("scale", sp(2))],
                        sp(2),
                    )),
                    sp(2),
                )],
                sp(2),
            ),
        ],
    );
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &options).expect("import should resolve");

    // The import statement was replaced by generated declarations.
    assert!(matches!(&module.root.statements[0], Statement::Multi(_)));
    // The imported module is materialized on the main module.
    assert_eq!(module.imported_modules.len(), 1);
    assert_eq!(module.imported_modules[0].module.metadata.module_name, "Math");
}

#[test]
fn renamed_import_binds_the_new_name() {
    let resolver = MapResolver::new(vec![("math", math_module())]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    let mut module = builder::module(
        "main",
        vec![
            builder::import_symbols("math", &[("double", "twice")], sp(1)),
            builder::declare_function(
                "go",
                vec![],
                ty_name("f32"),
                vec![builder::return_statement(
                    Some(builder::call(
                        builder::identifier("twice", sp(2)),
                        vec![builder::float_literal(3.0, sp(2))],
                        sp(2),
                    )),
                    sp(2),
                )],
                sp(2),
            ),
        ],
    );
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &options).expect("renamed import should resolve");

    // The original name is not in scope.
    let mut module = builder::module(
        "main",
        vec![
            builder::import_symbols("math", &[("double", "twice")], sp(1)),
            builder::declare_function(
                "go",
                vec![],
                ty_name("f32"),
                vec![builder::return_statement(
                    Some(builder::call(
                        builder::identifier("double", sp(2)),
                        vec![builder::float_literal(3.0, sp(2))],
                        sp(2),
                    )),
                    sp(2),
                )],
                sp(2),
            ),
        ],
    );
    let mut context = TransformerContext::new();
    let err = resolve(&mut module, &mut context, &options).unwrap_err();
    assert_eq!(
        err.kind,
        CompileErrorKind::UnknownIdentifier {
            name: "double".into()
        }
    );
}

#[test]
fn importing_a_missing_symbol_fails() {
    let resolver = MapResolver::new(vec![("math", math_module())]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    let mut module = builder::module(
        "main",
        vec![builder::import_symbols("math", &[("nonsense", "")], sp(1))],
    );
    let mut context = TransformerContext::new();
    let err = resolve(&mut module, &mut context, &options).unwrap_err();
    assert!(
        matches!(err.kind, CompileErrorKind::ImportIdentifierNotFound { .. }),
        "got {err:?}"
    );
}

#[test]
fn wildcard_import_brings_everything_exported() {
    let resolver = MapResolver::new(vec![("math", math_module())]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    let mut module = builder::module(
        "main",
        vec![
            builder::import_symbols("math", &[("", "")], sp(1)),
            builder::declare_variable(
                "p",
                ty_name("Point"),
                None,
                sp(2),
            ),
        ],
    );
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &options).expect("wildcard import should resolve");
}

#[test]
fn whole_module_import_allows_qualified_access() {
    // import "math"; fn go() -> f32 { return Math.double(1.0); }
    let resolver = MapResolver::new(vec![("math", math_module())]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    let mut module = builder::module(
        "main",
        vec![
            builder::import_module("math", sp(1)),
            builder::declare_function(
                "go",
                vec![],
                ty_name("f32"),
                vec![builder::return_statement(
                    Some(builder::call(
                        builder::access(builder::identifier("Math", sp(2)), &["double"], sp(2)),
                        vec![builder::float_literal(1.0, sp(2))],
                        sp(2),
                    )),
                    sp(2),
                )],
                sp(2),
            ),
        ],
    );
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &options).expect("qualified access should resolve");
}

// ── Identity, cycles, features ─────────────────────────────────────────

#[test]
fn two_paths_to_the_same_module_share_one_entry() {
    // Both "math" and "math/again" resolve to metadata name "Math".
    let resolver = MapResolver::new(vec![
        ("math", math_module()),
        ("math/again", math_module()),
    ]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    let mut module = builder::module(
        "main",
        vec![
            builder::import_symbols("math", &[("double", "")], sp(1)),
            builder::import_symbols("math/again", &[("scale", "")], sp(2)),
        ],
    );
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &options).expect("both imports should resolve");

    assert_eq!(
        module.imported_modules.len(),
        1,
        "same metadata name must occupy a single module entry"
    );
}

#[test]
fn circular_import_is_detected() {
    // A imports B; B imports A.
    let module_a = builder::module("A", vec![builder::import_symbols("B", &[("x", "")], sp(1))]);
    let module_b = builder::module("B", vec![builder::import_symbols("A", &[("y", "")], sp(1))]);

    let resolver = MapResolver::new(vec![("A", module_a.clone()), ("B", module_b)]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    let mut module = module_a;
    let mut context = TransformerContext::new();
    let err = resolve(&mut module, &mut context, &options).unwrap_err();

    // The cycle surfaces through the nested compilation failure chain.
    fn find_cycle(kind: &CompileErrorKind) -> bool {
        match kind {
            CompileErrorKind::CircularImport { .. } => true,
            CompileErrorKind::ModuleCompilationFailed { error, .. } => {
                error.contains("circular import")
            }
            _ => false,
        }
    }
    assert!(find_cycle(&err.kind), "got {err:?}");
}

#[test]
fn module_feature_mismatch_fails() {
    let mut advanced = builder::module("Advanced", vec![]);
    advanced.metadata.enabled_features = vec![ModuleFeature::Float64];

    let resolver = MapResolver::new(vec![("advanced", advanced)]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    // The importing module does not enable Float64.
    let mut module = builder::module(
        "main",
        vec![builder::import_module("advanced", sp(1))],
    );
    let mut context = TransformerContext::new();
    let err = resolve(&mut module, &mut context, &options).unwrap_err();
    assert!(
        matches!(err.kind, CompileErrorKind::ModuleFeatureMismatch { .. }),
        "got {err:?}"
    );
}

#[test]
fn import_without_resolver_fails() {
    let mut module = builder::module(
        "main",
        vec![builder::import_symbols("math", &[("double", "")], sp(1))],
    );
    let mut context = TransformerContext::new();
    let err = resolve(&mut module, &mut context, &ResolveOptions::default()).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::NoModuleResolver);
}

#[test]
fn multiple_wildcards_fail() {
    let resolver = MapResolver::new(vec![("math", math_module())]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };
    let mut module = builder::module(
        "main",
        vec![builder::import_symbols("math", &[("", ""), ("", "")], sp(1))],
    );
    let mut context = TransformerContext::new();
    let err = resolve(&mut module, &mut context, &options).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::ImportMultipleWildcard);
}

// ── Unused elimination ─────────────────────────────────────────────────

#[test]
fn unimported_symbols_are_eliminated_from_imported_modules() {
    let resolver = MapResolver::new(vec![("math", math_module())]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    let mut module = builder::module(
        "main",
        vec![builder::import_symbols("math", &[("scale", "")], sp(1))],
    );
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &options).unwrap();

    let imported_root = &module.imported_modules[0].module.root;
    let names: Vec<&str> = imported_root
        .statements
        .iter()
        .filter_map(|statement| match statement {
            Statement::DeclareFunction(node) => Some(node.name.as_str()),
            _ => None,
        })
        .collect();
    assert!(
        !names.contains(&"helper"),
        "unreferenced helper should be eliminated, kept: {names:?}"
    );
    assert!(
        !names.contains(&"double"),
        "double was not imported and nothing reaches it, kept: {names:?}"
    );
}

#[test]
fn entry_stage_elimination_drops_unreached_functions() {
    use glint_ast::expr::BinaryOp;

    // Entry fragment function uses `used`; `dead` is unreachable.
    let used = builder::declare_function(
        "used",
        vec![],
        ty_name("f32"),
        vec![builder::return_statement(
            Some(builder::float_literal(1.0, sp(1))),
            sp(1),
        )],
        sp(1),
    );
    let dead = builder::declare_function(
        "dead",
        vec![],
        ty_name("f32"),
        vec![builder::return_statement(
            Some(builder::float_literal(2.0, sp(2))),
            sp(2),
        )],
        sp(2),
    );
    let mut entry = builder::declare_function(
        "frag",
        vec![],
        ExprValue::None,
        vec![builder::expression_statement(
            builder::binary(
                BinaryOp::Add,
                builder::call(builder::identifier("used", sp(3)), vec![], sp(3)),
                builder::float_literal(0.0, sp(3)),
                sp(3),
            ),
            sp(3),
        )],
        sp(3),
    );
    if let Statement::DeclareFunction(node) = &mut entry {
        node.entry_stage = ExprValue::Value(ShaderStage::Fragment);
    }

    let options = ResolveOptions {
        eliminate_unused_stages: Some(vec![ShaderStage::Fragment]),
        ..ResolveOptions::default()
    };
    let mut module = builder::module("main", vec![used, dead, entry]);
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &options).unwrap();

    let names: Vec<&str> = module
        .root
        .statements
        .iter()
        .filter_map(|statement| match statement {
            Statement::DeclareFunction(node) => Some(node.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["used", "frag"]);
}

#[test]
fn imported_constant_keeps_its_value() {
    let resolver = MapResolver::new(vec![("math", math_module())]);
    let options = ResolveOptions {
        module_resolver: Some(&resolver),
        ..ResolveOptions::default()
    };

    let mut module = builder::module(
        "main",
        vec![
            builder::import_symbols("math", &[("scale", "")], sp(1)),
            builder::declare_const(
                "copy",
                ExprValue::None,
                builder::identifier("scale", sp(2)),
                sp(2),
            ),
        ],
    );
    let mut context = TransformerContext::new();
    resolve(&mut module, &mut context, &options).unwrap();

    match &module.root.statements[1] {
        Statement::DeclareConst(node) => {
            let value = context
                .constants
                .retrieve(node.const_index.unwrap(), sp(0))
                .unwrap()
                .value
                .clone();
            assert_eq!(value, Some(ConstantValue::f32_value(2.0)));
        }
        _ => unreachable!(),
    }
}
