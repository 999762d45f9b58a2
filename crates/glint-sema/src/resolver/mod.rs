//! The resolver: a multi-pass tree rewriter that turns unresolved
//! identifiers into typed references into the symbol tables, assigns a type
//! to every expression, validates every construct and partially evaluates
//! constant subtrees.
//!
//! Resolution of one module runs in two passes over its root statements:
//! pass 1 registers every top-level declaration (so forward references
//! within a module are legal) and resolves everything except function
//! bodies; pass 2 resolves the bodies collected during pass 1, in source
//! order.

mod exprs;
mod imports;
mod stmts;

use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;
use tracing::debug;

use glint_common::span::Span;

use glint_ast::constant::ConstantValue;
use glint_ast::expr::{Expression, ExprValue};
use glint_ast::module::{Module, ModuleFeature, ShaderStage};
use glint_ast::remap::IndexGenerators;
use glint_ast::stmt::{MultiStatement, Statement};
use glint_ast::transform::{visit_expression, visit_statement_list};
use glint_ast::ty::{AliasType, ExpressionType};

use crate::builtins::register_builtins;
use crate::const_fold::{as_constant, propagate_constants};
use crate::context::{
    AliasData, ConstantData, ExternalBlockData, FunctionData, IdentifierData, IdentifierKind,
    ModuleData, StructData, TransformerContext, TypeContent, VariableData, MAIN_MODULE_INDEX,
};
use crate::env::{EnvArena, EnvId};
use crate::error::{CompileError, CompileErrorKind};
use crate::ops;
use crate::stringify::TypeStringifier;
use crate::usage::{eliminate_unused, UsageChecker};
use crate::ResolveOptions;

/// Sentinel stored in `module_by_name` while an import is in flight; seeing
/// it on re-entry means a circular import.
const MODULE_ID_SENTINEL: usize = usize::MAX;

/// Per-imported-module resolver state.
pub(crate) struct ModuleState {
    pub env: EnvId,
    /// Dependency tracking for unused-symbol elimination; absent in partial
    /// compilation.
    pub usage: Option<UsageChecker>,
    /// Symbols already re-exported into a given importing module, so a
    /// non-renamed symbol materializes only once.
    pub exported_sets: FxHashMap<String, ExportedSet>,
}

#[derive(Default)]
pub(crate) struct ExportedSet {
    pub constants: FixedBitSet,
    pub functions: FixedBitSet,
    pub structs: FixedBitSet,
}

pub(crate) struct NamedExternalState {
    pub env: EnvId,
}

/// The function whose body is currently being resolved.
pub(crate) struct FunctionContext {
    pub stage: Option<ShaderStage>,
    pub return_type: ExpressionType,
}

/// Fresh-index providers backed by the context tables; used when remapping
/// merged or duplicated subtrees.
pub(crate) struct ContextGenerators<'a>(pub &'a mut TransformerContext);

impl IndexGenerators for ContextGenerators<'_> {
    fn next_alias_index(&mut self) -> usize {
        self.0.aliases.register_new_index(true)
    }
    fn next_constant_index(&mut self) -> usize {
        self.0.constants.register_new_index(true)
    }
    fn next_function_index(&mut self) -> usize {
        self.0.functions.register_new_index(true)
    }
    fn next_struct_index(&mut self) -> usize {
        self.0.structs.register_new_index(true)
    }
    fn next_variable_index(&mut self) -> usize {
        self.0.variables.register_new_index(true)
    }
}

pub(crate) struct Resolver<'a> {
    pub(crate) context: &'a mut TransformerContext,
    pub(crate) options: &'a ResolveOptions<'a>,

    pub(crate) envs: EnvArena,
    pub(crate) global_env: EnvId,
    pub(crate) current_env: EnvId,
    pub(crate) current_module_index: usize,

    /// Resolved imported modules, in state-index order.
    pub(crate) modules: Vec<ModuleState>,
    /// Owned imported-module trees; `modules[i]` describes `imports[i]`.
    pub(crate) imports: Vec<glint_ast::module::ImportedModule>,
    pub(crate) module_by_name: FxHashMap<String, usize>,

    pub(crate) named_external_blocks: Vec<NamedExternalState>,
    pub(crate) declared_external_vars: FxHashMap<String, u32>,

    pub(crate) current_conditional_index: u32,
    pub(crate) next_conditional_index: u32,

    /// Function indices registered in pass 1 awaiting body resolution.
    pub(crate) pending_functions: Vec<usize>,
    pub(crate) current_function: Option<FunctionContext>,
    pub(crate) loop_depth: u32,

    /// Features enabled by the main module.
    pub(crate) features: Vec<ModuleFeature>,
}

/// Resolve `module` in place against `context`.
pub(crate) fn run(
    module: &mut Module,
    context: &mut TransformerContext,
    options: &ResolveOptions<'_>,
) -> Result<(), CompileError> {
    debug!(module = %module.metadata.module_name, "resolving module tree");

    let mut envs = EnvArena::new();
    let global_env = envs.alloc(None, "");

    let mut resolver = Resolver {
        context,
        options,
        envs,
        global_env,
        current_env: global_env,
        current_module_index: MAIN_MODULE_INDEX,
        modules: Vec::new(),
        imports: Vec::new(),
        module_by_name: FxHashMap::default(),
        named_external_blocks: Vec::new(),
        declared_external_vars: FxHashMap::default(),
        current_conditional_index: 0,
        next_conditional_index: 1,
        pending_functions: Vec::new(),
        current_function: None,
        loop_depth: 0,
        features: module.metadata.enabled_features.clone(),
    };

    resolver.preregister_indices(module)?;
    register_builtins(
        resolver.context,
        &mut resolver.envs,
        global_env,
        &resolver.features,
    )?;

    let module_env = resolver
        .envs
        .alloc(Some(global_env), module.metadata.module_name.clone());

    // Pre-linked imported modules (a tree that has been through the resolver
    // before) resolve first, each in its own environment. Their state slots
    // are all installed up front so module indices are position-stable even
    // if resolution pulls in further modules.
    let imported = std::mem::take(&mut module.imported_modules);
    resolver.imports = imported;
    for module_index in 0..resolver.imports.len() {
        let name = resolver.imports[module_index]
            .module
            .metadata
            .module_name
            .clone();
        let identifier = resolver.imports[module_index].identifier.clone();
        if !resolver.imports[module_index]
            .module
            .imported_modules
            .is_empty()
        {
            return Err(CompileError::new(
                CompileErrorKind::Internal {
                    message: "imported modules cannot have imported modules themselves".into(),
                },
                Span::default(),
            ));
        }

        let env = resolver.envs.alloc(Some(global_env), name.clone());
        resolver.module_by_name.insert(name.clone(), module_index);
        resolver.modules.push(ModuleState {
            env,
            usage: None,
            exported_sets: FxHashMap::default(),
        });
        resolver.current_env = global_env;
        resolver.register_module_identifier(identifier, module_index, name, Span::default())?;
    }

    for module_index in 0..resolver.imports.len() {
        resolver.current_env = resolver.modules[module_index].env;
        resolver.current_module_index = module_index;

        let mut root = std::mem::take(&mut resolver.imports[module_index].module.root);
        resolver.resolve_module_root(&mut root)?;
        resolver.imports[module_index].module.root = root;

        if !resolver.context.partial_compilation {
            let mut checker = UsageChecker::new();
            checker.register(&resolver.imports[module_index].module.root);
            resolver.modules[module_index].usage = Some(checker);
        }
    }

    resolver.current_env = module_env;
    resolver.current_module_index = MAIN_MODULE_INDEX;
    resolver.resolve_module_root(&mut module.root)?;

    // Drop what imported modules declare but nothing reaches.
    for module_index in 0..resolver.modules.len() {
        if let Some(mut checker) = resolver.modules[module_index].usage.take() {
            checker.resolve();
            eliminate_unused(
                &mut resolver.imports[module_index].module.root,
                checker.usage(),
            );
        }
    }
    module.imported_modules = std::mem::take(&mut resolver.imports);

    // Entry-stage driven elimination over the main module, when requested.
    if let Some(stages) = &options.eliminate_unused_stages {
        let mut checker = UsageChecker::new();
        checker.register(&module.root);
        let entry_functions: Vec<usize> = resolver
            .context
            .functions
            .iter()
            .filter(|(_, data)| {
                data.module_index == MAIN_MODULE_INDEX
                    && data.entry_stage.is_some_and(|stage| stages.contains(&stage))
            })
            .map(|(index, _)| index)
            .collect();
        for index in entry_functions {
            checker.mark_function_as_used(index);
        }
        checker.resolve();
        eliminate_unused(&mut module.root, checker.usage());
        debug!(module = %module.metadata.module_name, "eliminated unused symbols");
    }

    Ok(())
}

impl<'a> Resolver<'a> {
    // ── Module-level driving ───────────────────────────────────────────

    /// Two-pass resolution of one module's root statement list.
    pub(crate) fn resolve_module_root(
        &mut self,
        root: &mut MultiStatement,
    ) -> Result<(), CompileError> {
        visit_statement_list(self, &mut root.statements)?;
        self.resolve_functions(&mut root.statements)
    }

    /// Pass 2: resolve the bodies of functions registered during pass 1, in
    /// source order.
    fn resolve_functions(&mut self, statements: &mut Vec<Statement>) -> Result<(), CompileError> {
        let pending: Vec<usize> = std::mem::take(&mut self.pending_functions);
        if pending.is_empty() {
            return Ok(());
        }
        let pending: rustc_hash::FxHashSet<usize> = pending.into_iter().collect();
        self.resolve_functions_in(statements, &pending)
    }

    fn resolve_functions_in(
        &mut self,
        statements: &mut [Statement],
        pending: &rustc_hash::FxHashSet<usize>,
    ) -> Result<(), CompileError> {
        for statement in statements {
            match statement {
                Statement::DeclareFunction(node) => {
                    if node.func_index.is_some_and(|index| pending.contains(&index)) {
                        self.resolve_function_body(node)?;
                    }
                }
                Statement::Multi(node) => {
                    self.resolve_functions_in(&mut node.statements, pending)?
                }
                Statement::Scoped(node) => {
                    self.resolve_functions_in(std::slice::from_mut(&mut node.statement), pending)?
                }
                Statement::Conditional(node) => {
                    self.resolve_functions_in(std::slice::from_mut(&mut node.statement), pending)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ── Scopes & lookup ────────────────────────────────────────────────

    pub(crate) fn push_scope(&mut self) {
        self.envs.push_scope(self.current_env);
    }

    pub(crate) fn pop_scope(&mut self) {
        self.envs.pop_scope(self.current_env);
    }

    pub(crate) fn find_identifier(&self, name: &str) -> Option<IdentifierData> {
        self.envs.find(self.current_env, name).copied()
    }

    pub(crate) fn stringify(&self, ty: &ExpressionType) -> String {
        TypeStringifier::new(self.context).format(ty)
    }

    pub(crate) fn error(&self, kind: CompileErrorKind, span: Span) -> CompileError {
        CompileError::new(kind, span)
    }

    // ── Registration ───────────────────────────────────────────────────

    fn check_available(&self, name: &str, span: Span) -> Result<(), CompileError> {
        if self
            .envs
            .is_available(self.current_env, name, self.current_conditional_index)
        {
            Ok(())
        } else {
            Err(self.error(
                CompileErrorKind::IdentifierAlreadyUsed { name: name.into() },
                span,
            ))
        }
    }

    fn register_identifier(&mut self, name: String, index: usize, kind: IdentifierKind) {
        let conditional_index = self.current_conditional_index;
        self.envs.register(
            self.current_env,
            name,
            IdentifierData {
                index,
                kind,
                conditional_index,
            },
        );
    }

    pub(crate) fn register_alias(
        &mut self,
        name: String,
        data: AliasData,
        index: Option<usize>,
        span: Span,
    ) -> Result<usize, CompileError> {
        self.check_available(&name, span)?;
        let index = self.context.aliases.register(data, index, span)?;
        self.register_identifier(name, index, IdentifierKind::Alias);
        Ok(index)
    }

    /// Register a constant (or option). `data == None` reserves the index
    /// for a placeholder that partial compilation could not evaluate.
    pub(crate) fn register_constant(
        &mut self,
        name: String,
        kind: IdentifierKind,
        data: Option<ConstantData>,
        index: Option<usize>,
        span: Span,
    ) -> Result<usize, CompileError> {
        self.check_available(&name, span)?;
        let index = match data {
            Some(data) => self.context.constants.register(data, index, span)?,
            None => match index {
                Some(index) => {
                    self.context.constants.preregister(index, span)?;
                    index
                }
                None => self.context.constants.register_new_index(true),
            },
        };
        self.register_identifier(name, index, kind);
        Ok(index)
    }

    /// Register a function. Entry functions may share a name iff their
    /// stages differ; in partial compilation, conditionally-declared
    /// duplicates are tolerated.
    pub(crate) fn register_function(
        &mut self,
        name: String,
        data: FunctionData,
        index: Option<usize>,
        span: Span,
    ) -> Result<usize, CompileError> {
        if let Some(existing) = self.find_identifier(&name) {
            let mut duplicate = !self.context.partial_compilation;

            if let Some(stage) = data.entry_stage {
                if existing.kind == IdentifierKind::Function {
                    let other = self.context.functions.retrieve(existing.index, span)?;
                    if other.entry_stage.is_some_and(|other_stage| other_stage != stage) {
                        duplicate = false;
                    }
                }
            }

            if duplicate {
                return Err(
                    self.error(CompileErrorKind::IdentifierAlreadyUsed { name }, span)
                );
            }
        }

        let index = self.context.functions.register(data, index, span)?;
        self.register_identifier(name, index, IdentifierKind::Function);
        Ok(index)
    }

    pub(crate) fn register_struct(
        &mut self,
        name: String,
        data: StructData,
        index: Option<usize>,
        span: Span,
    ) -> Result<usize, CompileError> {
        self.check_available(&name, span)?;
        let index = self.context.structs.register(data, index, span)?;
        self.register_identifier(name, index, IdentifierKind::Struct);
        Ok(index)
    }

    pub(crate) fn register_variable(
        &mut self,
        name: String,
        kind: IdentifierKind,
        data: VariableData,
        index: Option<usize>,
        span: Span,
    ) -> Result<usize, CompileError> {
        self.check_available(&name, span)?;
        let index = self.context.variables.register(data, index, span)?;
        self.register_identifier(name, index, kind);
        Ok(index)
    }

    pub(crate) fn register_external_block(
        &mut self,
        name: String,
        data: ExternalBlockData,
        index: Option<usize>,
        span: Span,
    ) -> Result<usize, CompileError> {
        self.check_available(&name, span)?;
        let index = self
            .context
            .named_external_blocks
            .register(data, index, span)?;
        self.register_identifier(name, index, IdentifierKind::ExternalBlock);
        Ok(index)
    }

    /// Register a module under `identifier`. The table index mirrors the
    /// state index so module references are position-stable.
    pub(crate) fn register_module_identifier(
        &mut self,
        identifier: String,
        module_index: usize,
        module_name: String,
        span: Span,
    ) -> Result<(), CompileError> {
        self.check_available(&identifier, span)?;
        let index = self.context.modules.register(
            ModuleData {
                module_index,
                name: module_name,
            },
            Some(module_index),
            span,
        )?;
        self.register_identifier(identifier, index, IdentifierKind::Module);
        Ok(())
    }

    /// Occupy a name whose meaning is not known yet (partial compilation).
    pub(crate) fn register_unresolved(&mut self, name: String) {
        self.register_identifier(name, usize::MAX, IdentifierKind::Unresolved);
    }

    // ── Constant evaluation ────────────────────────────────────────────

    /// Fold `expr` and extract its constant value. In full compilation a
    /// non-foldable expression is an error; partial compilation yields
    /// `None`.
    pub(crate) fn compute_constant_value(
        &mut self,
        expr: &mut Expression,
    ) -> Result<Option<ConstantValue>, CompileError> {
        propagate_constants(expr, self.context)?;
        if let Some(value) = as_constant(expr) {
            return Ok(Some(value.clone()));
        }
        if self.context.partial_compilation {
            Ok(None)
        } else {
            Err(self.error(CompileErrorKind::ConstantExpressionRequired, expr.span()))
        }
    }

    /// Fold a `u32` attribute slot in place. `Ok(false)` means unresolved
    /// (partial compilation only).
    pub(crate) fn fold_attr_u32(
        &mut self,
        attr: &mut ExprValue<u32>,
        span: Span,
    ) -> Result<bool, CompileError> {
        match attr {
            ExprValue::None => Err(self.error(CompileErrorKind::AttributeRequiresValue, span)),
            ExprValue::Value(_) => Ok(true),
            ExprValue::Expr(expr) => {
                visit_expression(self, expr)?;
                let Some(value) = self.compute_constant_value(expr)? else {
                    return Ok(false);
                };
                match value.as_u32() {
                    Some(folded) => {
                        *attr = ExprValue::Value(folded);
                        Ok(true)
                    }
                    None => {
                        use glint_ast::constant::ScalarValue;
                        let negative = matches!(
                            &value,
                            ConstantValue::Scalar(ScalarValue::I32(v)) if *v < 0
                        ) || matches!(
                            &value,
                            ConstantValue::Scalar(ScalarValue::IntLiteral(v)) if *v < 0
                        );
                        if negative {
                            Err(self.error(
                                CompileErrorKind::AttributeUnexpectedNegative {
                                    value: format!("{value:?}"),
                                },
                                span,
                            ))
                        } else {
                            Err(self.error(
                                CompileErrorKind::AttributeUnexpectedType {
                                    expected: "u32".into(),
                                    found: self.stringify(&value.constant_type()),
                                },
                                span,
                            ))
                        }
                    }
                }
            }
        }
    }

    /// Fold a `bool` attribute slot in place.
    pub(crate) fn fold_attr_bool(
        &mut self,
        attr: &mut ExprValue<bool>,
        span: Span,
    ) -> Result<bool, CompileError> {
        match attr {
            ExprValue::None => Err(self.error(CompileErrorKind::AttributeRequiresValue, span)),
            ExprValue::Value(_) => Ok(true),
            ExprValue::Expr(expr) => {
                visit_expression(self, expr)?;
                let Some(value) = self.compute_constant_value(expr)? else {
                    return Ok(false);
                };
                match value.as_bool() {
                    Some(folded) => {
                        *attr = ExprValue::Value(folded);
                        Ok(true)
                    }
                    None => Err(self.error(
                        CompileErrorKind::AttributeUnexpectedType {
                            expected: "bool".into(),
                            found: self.stringify(&value.constant_type()),
                        },
                        span,
                    )),
                }
            }
        }
    }

    /// Fold a workgroup-size attribute (a three-component `u32` vector).
    pub(crate) fn fold_attr_workgroup(
        &mut self,
        attr: &mut ExprValue<[u32; 3]>,
        span: Span,
    ) -> Result<bool, CompileError> {
        match attr {
            ExprValue::None => Err(self.error(CompileErrorKind::AttributeRequiresValue, span)),
            ExprValue::Value(_) => Ok(true),
            ExprValue::Expr(expr) => {
                visit_expression(self, expr)?;
                let Some(value) = self.compute_constant_value(expr)? else {
                    return Ok(false);
                };
                let components = match &value {
                    ConstantValue::Vector(components) if components.len() == 3 => components
                        .iter()
                        .map(|c| ConstantValue::Scalar(c.clone()).as_u32())
                        .collect::<Option<Vec<u32>>>(),
                    _ => None,
                };
                match components {
                    Some(components) => {
                        *attr = ExprValue::Value([components[0], components[1], components[2]]);
                        Ok(true)
                    }
                    None => Err(self.error(
                        CompileErrorKind::AttributeUnexpectedType {
                            expected: "vec3[u32]".into(),
                            found: self.stringify(&value.constant_type()),
                        },
                        span,
                    )),
                }
            }
        }
    }

    /// Enum-valued attributes must arrive as literal values; an expression
    /// slot is a parse-level misuse.
    pub(crate) fn require_literal_attr<T>(
        &self,
        attr: &ExprValue<T>,
        span: Span,
    ) -> Result<(), CompileError> {
        if attr.is_expr() {
            Err(self.error(CompileErrorKind::AttributeUnexpectedExpression, span))
        } else {
            Ok(())
        }
    }

    // ── Types ──────────────────────────────────────────────────────────

    /// Resolve a `Type` table reference to the full type it denotes.
    pub(crate) fn resolve_type(
        &mut self,
        ty: ExpressionType,
        resolve_alias: bool,
        span: Span,
    ) -> Result<ExpressionType, CompileError> {
        if let ExpressionType::Type(type_index) = ty {
            let data = self.context.types.retrieve(type_index, span)?;
            return match &data.content {
                TypeContent::Full(full) => Ok(full.clone()),
                TypeContent::Partial(_) => Err(self.error(
                    CompileErrorKind::FullTypeExpected {
                        found: format!("{} (partial)", data.name),
                    },
                    span,
                )),
            };
        }

        if resolve_alias || self.options.remove_aliases {
            Ok(ty.resolve_alias().clone())
        } else {
            Ok(ty)
        }
    }

    /// Resolve a type annotation slot. `Ok(None)` means unresolved (partial
    /// compilation); an absent slot resolves to `NoType`.
    pub(crate) fn resolve_type_expr(
        &mut self,
        value: &mut ExprValue<ExpressionType>,
        resolve_alias: bool,
        span: Span,
    ) -> Result<Option<ExpressionType>, CompileError> {
        match value {
            ExprValue::None => Ok(Some(ExpressionType::NoType)),
            ExprValue::Value(ty) => {
                let mut ty = ty.clone();
                self.transform_type(&mut ty, span)?;
                let resolved = self.resolve_type(ty, resolve_alias, span)?;
                self.mark_type_used(&resolved, span)?;
                Ok(Some(resolved))
            }
            ExprValue::Expr(expr) => {
                visit_expression(self, expr)?;
                let Some(expr_type) = expr.cached_type().cloned() else {
                    return Ok(None);
                };
                let resolved = self.resolve_type(expr_type, resolve_alias, span)?;
                self.mark_type_used(&resolved, span)?;
                Ok(Some(resolved))
            }
        }
    }

    /// Normalize a type carried by the tree: splice aliases away when
    /// requested and record cross-module struct/function usage.
    pub(crate) fn transform_type(
        &mut self,
        ty: &mut ExpressionType,
        span: Span,
    ) -> Result<(), CompileError> {
        if self.options.remove_aliases && ty.is_alias() {
            *ty = ty.resolve_alias().clone();
        }
        self.mark_type_used(ty, span)
    }

    /// Record that the current module reaches the symbols inside `ty`.
    pub(crate) fn mark_type_used(
        &mut self,
        ty: &ExpressionType,
        span: Span,
    ) -> Result<(), CompileError> {
        let resolved = ty.resolve_alias();
        if let Some(struct_index) = resolved.struct_index() {
            self.mark_struct_used(struct_index, span)?;
        } else if let ExpressionType::Function(function_index) = resolved {
            self.mark_function_used(*function_index, span)?;
        }
        Ok(())
    }

    fn owner_usage(&mut self, module_index: usize) -> Option<&mut UsageChecker> {
        if module_index == self.current_module_index || module_index == MAIN_MODULE_INDEX {
            return None;
        }
        self.modules
            .get_mut(module_index)
            .and_then(|state| state.usage.as_mut())
    }

    pub(crate) fn mark_struct_used(
        &mut self,
        index: usize,
        span: Span,
    ) -> Result<(), CompileError> {
        let module_index = self.context.structs.retrieve(index, span)?.module_index;
        if let Some(usage) = self.owner_usage(module_index) {
            usage.mark_struct_as_used(index);
        }
        Ok(())
    }

    pub(crate) fn mark_function_used(
        &mut self,
        index: usize,
        span: Span,
    ) -> Result<(), CompileError> {
        let module_index = self.context.functions.retrieve(index, span)?.module_index;
        if let Some(usage) = self.owner_usage(module_index) {
            usage.mark_function_as_used(index);
        }
        Ok(())
    }

    pub(crate) fn mark_constant_used(
        &mut self,
        index: usize,
        span: Span,
    ) -> Result<(), CompileError> {
        let module_index = self.context.constants.retrieve(index, span)?.module_index;
        if let Some(usage) = self.owner_usage(module_index) {
            usage.mark_constant_as_used(index);
        }
        Ok(())
    }

    // ── Identifier handling ────────────────────────────────────────────

    /// Chase alias indirections in the identifier table down to a terminal
    /// identifier.
    pub(crate) fn resolve_alias_identifier(
        &self,
        data: IdentifierData,
        span: Span,
    ) -> Result<IdentifierData, CompileError> {
        let mut current = data;
        while current.kind == IdentifierKind::Alias {
            let alias = self.context.aliases.retrieve(current.index, span)?;
            current = alias.target;
        }
        Ok(current)
    }

    /// The type of the value an identifier denotes.
    fn identifier_type(
        &self,
        data: IdentifierData,
        span: Span,
    ) -> Result<Option<ExpressionType>, CompileError> {
        let ty = match data.kind {
            IdentifierKind::Constant | IdentifierKind::Option => {
                match self.context.constants.try_retrieve(data.index, span)? {
                    Some(constant) => match &constant.value {
                        Some(value) => value.constant_type(),
                        None => return Ok(None),
                    },
                    None => return Ok(None),
                }
            }
            IdentifierKind::Function => ExpressionType::Function(data.index),
            IdentifierKind::Intrinsic => {
                let intrinsic = self.context.intrinsics.retrieve(data.index, span)?;
                ExpressionType::IntrinsicFunction(intrinsic.kind)
            }
            IdentifierKind::Struct => ExpressionType::Struct(data.index),
            IdentifierKind::Type => ExpressionType::Type(data.index),
            IdentifierKind::Variable
            | IdentifierKind::Parameter
            | IdentifierKind::ExternalVariable => {
                self.context.variables.retrieve(data.index, span)?.ty.clone()
            }
            IdentifierKind::Module => {
                let module = self.context.modules.retrieve(data.index, span)?;
                ExpressionType::Module(module.module_index)
            }
            IdentifierKind::ExternalBlock => ExpressionType::NamedExternalBlock(data.index),
            IdentifierKind::Alias
            | IdentifierKind::Field
            | IdentifierKind::ReservedName
            | IdentifierKind::Unresolved => {
                return Err(self.error(
                    CompileErrorKind::Internal {
                        message: "identifier kind has no value type".into(),
                    },
                    span,
                ))
            }
        };
        Ok(Some(ty))
    }

    /// Build the typed expression node an identifier resolves to.
    pub(crate) fn handle_identifier(
        &mut self,
        data: IdentifierData,
        span: Span,
    ) -> Result<Expression, CompileError> {
        use glint_ast::expr::*;

        match data.kind {
            IdentifierKind::Alias => {
                let terminal = self.resolve_alias_identifier(data, span)?;
                if self.options.remove_aliases {
                    return self.handle_identifier(terminal, span);
                }
                let target = self.identifier_type(terminal, span)?;
                let cached_type = target.map(|target| {
                    ExpressionType::Alias(AliasType {
                        alias_index: data.index,
                        target: Box::new(target),
                    })
                });
                Ok(Expression::AliasValue(AliasValueExpression {
                    span,
                    cached_type,
                    alias_index: data.index,
                }))
            }
            IdentifierKind::Constant | IdentifierKind::Option => {
                self.mark_constant_used(data.index, span).ok();
                let cached_type = self.identifier_type(data, span)?;
                Ok(Expression::Constant(ConstantExpression {
                    span,
                    cached_type,
                    constant_index: data.index,
                }))
            }
            IdentifierKind::Function => {
                self.mark_function_used(data.index, span)?;
                Ok(Expression::Function(FunctionExpression {
                    span,
                    cached_type: Some(ExpressionType::Function(data.index)),
                    function_index: data.index,
                }))
            }
            IdentifierKind::Intrinsic => {
                let kind = self.context.intrinsics.retrieve(data.index, span)?.kind;
                Ok(Expression::IntrinsicFunction(IntrinsicFunctionExpression {
                    span,
                    cached_type: Some(ExpressionType::IntrinsicFunction(kind)),
                    intrinsic_index: data.index,
                }))
            }
            IdentifierKind::Struct => {
                self.mark_struct_used(data.index, span)?;
                Ok(Expression::StructType(StructTypeExpression {
                    span,
                    cached_type: Some(ExpressionType::Struct(data.index)),
                    struct_index: data.index,
                }))
            }
            IdentifierKind::Type => Ok(Expression::Type(TypeExpression {
                span,
                cached_type: Some(ExpressionType::Type(data.index)),
                type_index: data.index,
            })),
            IdentifierKind::Variable
            | IdentifierKind::Parameter
            | IdentifierKind::ExternalVariable => {
                let cached_type = self.identifier_type(data, span)?;
                Ok(Expression::Variable(VariableValueExpression {
                    span,
                    cached_type,
                    variable_index: data.index,
                }))
            }
            IdentifierKind::Module => {
                let module_index = self
                    .context
                    .modules
                    .retrieve(data.index, span)?
                    .module_index;
                Ok(Expression::Module(ModuleExpression {
                    span,
                    cached_type: Some(ExpressionType::Module(module_index)),
                    module_index,
                }))
            }
            IdentifierKind::ExternalBlock => {
                Ok(Expression::NamedExternalBlock(NamedExternalBlockExpression {
                    span,
                    cached_type: Some(ExpressionType::NamedExternalBlock(data.index)),
                    external_block_index: data.index,
                }))
            }
            IdentifierKind::Field | IdentifierKind::ReservedName | IdentifierKind::Unresolved => {
                Err(self.error(
                    CompileErrorKind::UnexpectedIdentifier {
                        name: String::new(),
                    },
                    span,
                ))
            }
        }
    }

    // ── Preregistration ────────────────────────────────────────────────

    /// Reserve every symbol index already encoded in the tree, so re-running
    /// the resolver is a fixed point.
    fn preregister_indices(&mut self, module: &Module) -> Result<(), CompileError> {
        for imported in &module.imported_modules {
            self.preregister_statements(&imported.module.root.statements)?;
        }
        self.preregister_statements(&module.root.statements)
    }

    fn preregister_statements(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        for statement in statements {
            self.preregister_statement(statement)?;
        }
        Ok(())
    }

    fn preregister_statement(&mut self, stmt: &Statement) -> Result<(), CompileError> {
        let span = stmt.span();
        match stmt {
            Statement::DeclareAlias(node) => {
                if let Some(index) = node.alias_index {
                    self.context.aliases.preregister(index, span)?;
                }
            }
            Statement::DeclareConst(node) => {
                if let Some(index) = node.const_index {
                    self.context.constants.preregister(index, span)?;
                }
            }
            Statement::DeclareOption(node) => {
                if let Some(index) = node.opt_index {
                    self.context.constants.preregister(index, span)?;
                }
            }
            Statement::DeclareFunction(node) => {
                if let Some(index) = node.func_index {
                    self.context.functions.preregister(index, span)?;
                }
                for parameter in &node.parameters {
                    if let Some(index) = parameter.var_index {
                        self.context.variables.preregister(index, span)?;
                    }
                }
                self.preregister_statements(&node.body)?;
            }
            Statement::DeclareStruct(node) => {
                if let Some(index) = node.struct_index {
                    self.context.structs.preregister(index, span)?;
                }
            }
            Statement::DeclareVariable(node) => {
                if let Some(index) = node.var_index {
                    self.context.variables.preregister(index, span)?;
                }
            }
            Statement::DeclareExternal(node) => {
                if let Some(index) = node.external_index {
                    self.context.named_external_blocks.preregister(index, span)?;
                }
                for var in &node.external_vars {
                    if let Some(index) = var.var_index {
                        self.context.variables.preregister(index, span)?;
                    }
                }
            }
            Statement::For(node) => {
                if let Some(index) = node.var_index {
                    self.context.variables.preregister(index, span)?;
                }
                self.preregister_statement(&node.statement)?;
            }
            Statement::ForEach(node) => {
                if let Some(index) = node.var_index {
                    self.context.variables.preregister(index, span)?;
                }
                self.preregister_statement(&node.statement)?;
            }
            Statement::Branch(node) => {
                for cond in &node.cond_statements {
                    self.preregister_statement(&cond.statement)?;
                }
                if let Some(else_statement) = &node.else_statement {
                    self.preregister_statement(else_statement)?;
                }
            }
            Statement::Conditional(node) => self.preregister_statement(&node.statement)?,
            Statement::Multi(node) => self.preregister_statements(&node.statements)?,
            Statement::Scoped(node) => self.preregister_statement(&node.statement)?,
            Statement::While(node) => self.preregister_statement(&node.statement)?,
            _ => {}
        }
        Ok(())
    }

    // ── Misc helpers ───────────────────────────────────────────────────

    pub(crate) fn is_feature_enabled(&self, feature: ModuleFeature) -> bool {
        self.features.contains(&feature)
    }

    /// Lower a freshly-computed constant against an optional declared type
    /// and return its final type.
    pub(crate) fn lower_constant(
        &mut self,
        declared: Option<&ExpressionType>,
        value: &mut ConstantValue,
        span: Span,
    ) -> Result<ExpressionType, CompileError> {
        if let Some(declared) = declared {
            ops::resolve_untyped_value(declared.resolve_alias(), value, span)?;
        }
        let mut ty = value.constant_type();
        if declared.is_none() {
            ops::resolve_untyped_type(&mut ty);
            ops::resolve_untyped_value(&ty, value, span)?;
            ty = value.constant_type();
        }
        Ok(ty)
    }
}
