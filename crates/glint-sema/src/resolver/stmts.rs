//! Statement resolution rules.
//!
//! Declarations register their symbols (pass 1 defers function bodies),
//! `const if` chains collapse to the taken arm, compile-time conditionals
//! tag or drop their statement, and `@unroll` loops expand into repeated
//! scopes with remapped symbol indices.

use glint_common::span::Span;

use glint_ast::builder;
use glint_ast::constant::{ConstantValue, ScalarValue};
use glint_ast::expr::{Expression, ExprValue};
use glint_ast::module::ShaderStage;
use glint_ast::remap::IndexRemapper;
use glint_ast::stmt::{
    BranchStatement, ConditionalStatement, DeclareAliasStatement, DeclareConstStatement,
    DeclareExternalStatement, DeclareFunctionStatement, DeclareOptionStatement,
    DeclareStructStatement, DeclareVariableStatement, ForEachStatement, ForStatement,
    LoopUnroll, MultiStatement, Statement, WhileStatement,
};
use glint_ast::transform::{visit_statement, visit_statement_list, StmtTransformation};
use glint_ast::ty::{ExpressionType, PrimitiveType};

use crate::context::{
    AliasData, ConstantData, ExternalBlockData, FunctionData, IdentifierData, IdentifierKind,
    StructData, VariableData,
};
use crate::error::{CompileError, CompileErrorKind};
use crate::ops;

use super::{ContextGenerators, FunctionContext, NamedExternalState, Resolver};

impl Resolver<'_> {
    pub(crate) fn handle_statement(&mut self, stmt: &mut Statement) -> Result<(), CompileError> {
        visit_statement(self, stmt)
    }

    pub(crate) fn dispatch_statement(
        &mut self,
        stmt: Statement,
    ) -> Result<StmtTransformation, CompileError> {
        use StmtTransformation::DontVisitChildren as Keep;

        match stmt {
            Statement::Branch(node) => self.resolve_branch(node),
            Statement::Conditional(node) => self.resolve_conditional_stmt(node),
            Statement::DeclareAlias(node) => self.resolve_declare_alias(node),
            Statement::DeclareConst(node) => self.resolve_declare_const(node),
            Statement::DeclareExternal(node) => self.resolve_declare_external(node),
            Statement::DeclareFunction(node) => self.resolve_declare_function(node),
            Statement::DeclareOption(node) => self.resolve_declare_option(node),
            Statement::DeclareStruct(node) => self.resolve_declare_struct(node),
            Statement::DeclareVariable(node) => self.resolve_declare_variable(node),
            Statement::For(node) => self.resolve_for(node),
            Statement::ForEach(node) => self.resolve_for_each(node),
            Statement::Import(node) => self.resolve_import(node),
            Statement::While(node) => self.resolve_while(node),
            Statement::Expression(mut node) => {
                self.handle_expression(&mut node.expression)?;
                Ok(Keep(Statement::Expression(node)))
            }
            Statement::Multi(mut node) => {
                visit_statement_list(self, &mut node.statements)?;
                Ok(Keep(Statement::Multi(node)))
            }
            Statement::Scoped(mut node) => {
                self.push_scope();
                let result = self.handle_statement(&mut node.statement);
                self.pop_scope();
                result?;
                Ok(Keep(Statement::Scoped(node)))
            }
            Statement::Return(mut node) => {
                if let Some(expression) = &mut node.expression {
                    self.handle_expression(expression)?;
                }
                self.check_return(&node)?;
                Ok(Keep(Statement::Return(node)))
            }
            Statement::Discard(node) => {
                let Some(function) = &self.current_function else {
                    return Err(self.error(CompileErrorKind::DiscardOutsideFunction, node.span));
                };
                if let Some(stage) = function.stage {
                    if stage != ShaderStage::Fragment {
                        return Err(self.error(
                            CompileErrorKind::DiscardOutsideFragmentStage {
                                stage: stage.name().into(),
                            },
                            node.span,
                        ));
                    }
                }
                Ok(Keep(Statement::Discard(node)))
            }
            Statement::Break(node) => {
                if self.loop_depth == 0 {
                    return Err(self.error(
                        CompileErrorKind::LoopControlOutsideLoop { control: "break" },
                        node.span,
                    ));
                }
                Ok(Keep(Statement::Break(node)))
            }
            Statement::Continue(node) => {
                if self.loop_depth == 0 {
                    return Err(self.error(
                        CompileErrorKind::LoopControlOutsideLoop { control: "continue" },
                        node.span,
                    ));
                }
                Ok(Keep(Statement::Continue(node)))
            }
            Statement::NoOp(node) => Ok(Keep(Statement::NoOp(node))),
        }
    }

    fn check_return(
        &self,
        node: &glint_ast::stmt::ReturnStatement,
    ) -> Result<(), CompileError> {
        let Some(function) = &self.current_function else {
            return Err(self.error(CompileErrorKind::ReturnOutsideFunction, node.span));
        };

        let expected = function.return_type.resolve_alias();
        match &node.expression {
            Some(expression) => {
                let Some(found) = expression.cached_type() else {
                    return Ok(()); // unresolved, partial compilation
                };
                if !ops::types_match(expected, &found.resolve_alias().unwrap_external()) {
                    return Err(self.error(
                        CompileErrorKind::UnmatchingTypes {
                            left: self.stringify(&function.return_type),
                            right: self.stringify(found),
                        },
                        node.span,
                    ));
                }
            }
            None => {
                if !expected.is_no_type() {
                    return Err(self.error(
                        CompileErrorKind::UnmatchingTypes {
                            left: self.stringify(&function.return_type),
                            right: "()".into(),
                        },
                        node.span,
                    ));
                }
            }
        }
        Ok(())
    }

    // ── Branches & conditionals ────────────────────────────────────────

    fn resolve_branch(
        &mut self,
        mut node: BranchStatement,
    ) -> Result<StmtTransformation, CompileError> {
        if !node.is_const {
            for cond in &mut node.cond_statements {
                self.handle_expression(&mut cond.condition)?;
                if let Some(ty) = cond.condition.cached_type() {
                    if *ty.resolve_alias() != ExpressionType::Primitive(PrimitiveType::Bool) {
                        return Err(self.error(
                            CompileErrorKind::ConditionExpectedBool {
                                found: self.stringify(ty),
                            },
                            cond.condition.span(),
                        ));
                    }
                }
                self.push_scope();
                let result = self.handle_statement(&mut cond.statement);
                self.pop_scope();
                result?;
            }
            if let Some(else_statement) = &mut node.else_statement {
                self.push_scope();
                let result = self.handle_statement(else_statement);
                self.pop_scope();
                result?;
            }
            return Ok(StmtTransformation::DontVisitChildren(Statement::Branch(node)));
        }

        // `const if`: evaluate conditions now and splice the taken arm in.
        for i in 0..node.cond_statements.len() {
            self.handle_expression(&mut node.cond_statements[i].condition)?;

            let Some(condition) =
                self.compute_constant_value(&mut node.cond_statements[i].condition)?
            else {
                // Unresolvable condition: resolve the rest and keep the node.
                for cond in node.cond_statements.iter_mut().skip(i + 1) {
                    self.handle_expression(&mut cond.condition)?;
                    self.handle_statement(&mut cond.statement)?;
                }
                if let Some(else_statement) = &mut node.else_statement {
                    self.handle_statement(else_statement)?;
                }
                return Ok(StmtTransformation::DontVisitChildren(Statement::Branch(node)));
            };

            let Some(taken) = condition.as_bool() else {
                return Err(self.error(
                    CompileErrorKind::ConditionExpectedBool {
                        found: self.stringify(&condition.constant_type()),
                    },
                    node.cond_statements[i].condition.span(),
                ));
            };

            if taken {
                let mut statement = node.cond_statements.swap_remove(i).statement;
                self.handle_statement(&mut statement)?;
                return Ok(StmtTransformation::Replace(*statement));
            }
        }

        match node.else_statement {
            Some(mut else_statement) => {
                self.handle_statement(&mut else_statement)?;
                Ok(StmtTransformation::Replace(*else_statement))
            }
            None => Ok(StmtTransformation::Remove),
        }
    }

    fn resolve_conditional_stmt(
        &mut self,
        mut node: ConditionalStatement,
    ) -> Result<StmtTransformation, CompileError> {
        self.handle_expression(&mut node.condition)?;

        let Some(condition) = self.compute_constant_value(&mut node.condition)? else {
            // Unresolvable: everything declared inside belongs to a fresh
            // conditional index.
            let previous = self.current_conditional_index;
            self.current_conditional_index = self.next_conditional_index;
            self.next_conditional_index += 1;
            let result = self.handle_statement(&mut node.statement);
            self.current_conditional_index = previous;
            result?;
            return Ok(StmtTransformation::DontVisitChildren(Statement::Conditional(node)));
        };

        let Some(enabled) = condition.as_bool() else {
            return Err(self.error(
                CompileErrorKind::ConditionExpectedBool {
                    found: self.stringify(&condition.constant_type()),
                },
                node.span,
            ));
        };

        if enabled {
            self.handle_statement(&mut node.statement)?;
            Ok(StmtTransformation::Replace(*node.statement))
        } else {
            Ok(StmtTransformation::Remove)
        }
    }

    // ── Declarations ───────────────────────────────────────────────────

    fn resolve_declare_alias(
        &mut self,
        mut node: DeclareAliasStatement,
    ) -> Result<StmtTransformation, CompileError> {
        if node.name.is_empty() {
            return Err(self.error(CompileErrorKind::EmptyIdentifier, node.span));
        }

        self.handle_expression(&mut node.expression)?;

        let Some(expr_type) = node.expression.cached_type().cloned() else {
            self.register_unresolved(node.name.clone());
            return Ok(StmtTransformation::DontVisitChildren(Statement::DeclareAlias(node)));
        };
        let resolved = expr_type.resolve_alias().clone();

        let target = match &resolved {
            ExpressionType::Struct(struct_index) => {
                self.mark_struct_used(*struct_index, node.span)?;
                IdentifierData {
                    index: *struct_index,
                    kind: IdentifierKind::Struct,
                    conditional_index: 0,
                }
            }
            ExpressionType::Function(function_index) => {
                self.mark_function_used(*function_index, node.span)?;
                IdentifierData {
                    index: *function_index,
                    kind: IdentifierKind::Function,
                    conditional_index: 0,
                }
            }
            ExpressionType::Alias(alias) => IdentifierData {
                index: alias.alias_index,
                kind: IdentifierKind::Alias,
                conditional_index: 0,
            },
            ExpressionType::Module(module_index) => IdentifierData {
                index: *module_index,
                kind: IdentifierKind::Module,
                conditional_index: 0,
            },
            _ => {
                return Err(self.error(
                    CompileErrorKind::AliasUnexpectedType {
                        type_name: self.stringify(&expr_type),
                    },
                    node.span,
                ))
            }
        };

        let index = self.register_alias(
            node.name.clone(),
            AliasData {
                name: node.name.clone(),
                target,
            },
            node.alias_index,
            node.span,
        )?;
        node.alias_index = Some(index);

        if self.options.remove_aliases {
            return Ok(StmtTransformation::Remove);
        }
        Ok(StmtTransformation::DontVisitChildren(Statement::DeclareAlias(node)))
    }

    fn resolve_declare_const(
        &mut self,
        mut node: DeclareConstStatement,
    ) -> Result<StmtTransformation, CompileError> {
        let Some(expression) = &mut node.expression else {
            return Err(self.error(CompileErrorKind::ConstMissingExpression, node.span));
        };
        self.handle_expression(expression)?;

        if node.is_exported.has_value() {
            self.fold_attr_bool(&mut node.is_exported, node.span)?;
        }

        let declared = match self.resolve_type_expr(&mut node.ty, false, node.span)? {
            Some(ExpressionType::NoType) => None,
            Some(ty) => {
                if !ty.resolve_alias().is_constant_type() {
                    return Err(self.error(
                        CompileErrorKind::ExpectedConstantType {
                            found: self.stringify(&ty),
                        },
                        node.span,
                    ));
                }
                Some(ty)
            }
            None => None,
        };

        let expression = node.expression.as_mut().expect("checked above");

        // A constant aliasing another constant keeps the referenced value.
        let value_and_type = if let Expression::Constant(reference) = &*expression {
            let value = self
                .context
                .constants
                .try_retrieve(reference.constant_index, node.span)?
                .and_then(|data| data.value.clone());
            self.mark_constant_used(reference.constant_index, node.span).ok();
            match value {
                Some(value) => {
                    let ty = value.constant_type();
                    Some((value, ty))
                }
                None => None,
            }
        } else {
            match self.compute_constant_value(expression)? {
                Some(mut value) => {
                    let ty = self.lower_constant(declared.as_ref(), &mut value, node.span)?;
                    *expression = builder::constant_value(value.clone(), expression.span());
                    Some((value, ty))
                }
                None => None,
            }
        };

        let Some((value, value_type)) = value_and_type else {
            // Partial compilation placeholder.
            let index = self.register_constant(
                node.name.clone(),
                IdentifierKind::Constant,
                None,
                node.const_index,
                node.span,
            )?;
            node.const_index = Some(index);
            return Ok(StmtTransformation::DontVisitChildren(Statement::DeclareConst(node)));
        };

        if let Some(declared) = &declared {
            ops::validate_concrete_type(declared, node.span)?;
            if !ops::types_match(declared.resolve_alias(), &value_type) {
                return Err(self.error(
                    CompileErrorKind::DeclarationTypeMismatch {
                        declared: self.stringify(declared),
                        initializer: self.stringify(&value_type),
                    },
                    node.span,
                ));
            }
        }

        let index = self.register_constant(
            node.name.clone(),
            IdentifierKind::Constant,
            Some(ConstantData {
                module_index: self.current_module_index,
                value: Some(value),
            }),
            node.const_index,
            node.span,
        )?;
        node.const_index = Some(index);

        if !value_type.is_literal() {
            node.ty = ExprValue::Value(value_type);
        }
        Ok(StmtTransformation::DontVisitChildren(Statement::DeclareConst(node)))
    }

    fn resolve_declare_option(
        &mut self,
        mut node: DeclareOptionStatement,
    ) -> Result<StmtTransformation, CompileError> {
        let Some(resolved) = self.resolve_type_expr(&mut node.opt_type, false, node.span)? else {
            let index = self.register_constant(
                node.name.clone(),
                IdentifierKind::Option,
                None,
                node.opt_index,
                node.span,
            )?;
            node.opt_index = Some(index);
            if let Some(default_value) = &mut node.default_value {
                self.handle_expression(default_value)?;
            }
            return Ok(StmtTransformation::DontVisitChildren(Statement::DeclareOption(node)));
        };

        let target = resolved.resolve_alias().clone();
        if !target.is_constant_type() {
            return Err(self.error(
                CompileErrorKind::ExpectedConstantType {
                    found: self.stringify(&resolved),
                },
                node.span,
            ));
        }

        if let Some(default_value) = &mut node.default_value {
            self.handle_expression(default_value)?;
            if default_value.cached_type().is_none() {
                let index = self.register_constant(
                    node.name.clone(),
                    IdentifierKind::Option,
                    None,
                    node.opt_index,
                    node.span,
                )?;
                node.opt_index = Some(index);
                return Ok(StmtTransformation::DontVisitChildren(Statement::DeclareOption(node)));
            }
        }

        let opt_type = if self.options.remove_aliases {
            target
        } else {
            resolved
        };
        ops::validate_concrete_type(&opt_type, node.span)?;

        let option_hash = crate::context::hash_option(&node.name);
        let supplied = self.context.option_values.get(&option_hash).cloned();

        let data = if let Some(mut value) = supplied {
            ops::resolve_untyped_value(opt_type.resolve_alias(), &mut value, node.span)?;
            Some(ConstantData {
                module_index: self.current_module_index,
                value: Some(value),
            })
        } else if self.context.partial_compilation {
            // The value may still arrive later; never commit to the default.
            Some(ConstantData {
                module_index: self.current_module_index,
                value: None,
            })
        } else {
            let Some(default_value) = &mut node.default_value else {
                return Err(self.error(
                    CompileErrorKind::MissingOptionValue {
                        name: node.name.clone(),
                    },
                    node.span,
                ));
            };
            let value = self.compute_constant_value(default_value)?.map(|mut value| {
                ops::resolve_untyped_value(opt_type.resolve_alias(), &mut value, node.span)
                    .map(|()| value)
            });
            match value {
                Some(value) => Some(ConstantData {
                    module_index: self.current_module_index,
                    value: Some(value?),
                }),
                None => Some(ConstantData {
                    module_index: self.current_module_index,
                    value: None,
                }),
            }
        };

        let index = self.register_constant(
            node.name.clone(),
            IdentifierKind::Option,
            data,
            node.opt_index,
            node.span,
        )?;
        node.opt_index = Some(index);
        node.opt_type = ExprValue::Value(opt_type);
        Ok(StmtTransformation::DontVisitChildren(Statement::DeclareOption(node)))
    }

    fn resolve_declare_function(
        &mut self,
        mut node: DeclareFunctionStatement,
    ) -> Result<StmtTransformation, CompileError> {
        let mut parameter_types = Vec::with_capacity(node.parameters.len());
        for parameter in &mut node.parameters {
            let resolved = self.resolve_type_expr(&mut parameter.ty, false, parameter.span)?;
            match resolved {
                Some(ty) => {
                    ops::validate_concrete_type(&ty, parameter.span)?;
                    parameter.ty = ExprValue::Value(ty.clone());
                    parameter_types.push(ty);
                }
                None => parameter_types.push(ExpressionType::NoType),
            }
        }

        let return_type = match self.resolve_type_expr(&mut node.return_type, false, node.span)? {
            Some(ty) => {
                if !ty.is_no_type() {
                    ops::validate_concrete_type(&ty, node.span)?;
                }
                node.return_type = ExprValue::Value(ty.clone());
                ty
            }
            None => ExpressionType::NoType,
        };

        self.require_literal_attr(&node.entry_stage, node.span)?;
        self.require_literal_attr(&node.depth_write, node.span)?;
        if node.early_fragment_tests.has_value() {
            self.fold_attr_bool(&mut node.early_fragment_tests, node.span)?;
        }
        if node.is_exported.has_value() {
            self.fold_attr_bool(&mut node.is_exported, node.span)?;
        }
        if node.workgroup_size.has_value() {
            self.fold_attr_workgroup(&mut node.workgroup_size, node.span)?;
        }

        let entry_stage = node.entry_stage.value().copied();

        let index = self.register_function(
            node.name.clone(),
            FunctionData {
                module_index: self.current_module_index,
                name: node.name.clone(),
                parameters: parameter_types,
                return_type,
                entry_stage,
            },
            node.func_index,
            node.span,
        )?;
        node.func_index = Some(index);

        // Body resolution happens in the second pass.
        self.pending_functions.push(index);
        Ok(StmtTransformation::DontVisitChildren(Statement::DeclareFunction(node)))
    }

    /// Pass 2: resolve one function body.
    pub(crate) fn resolve_function_body(
        &mut self,
        node: &mut DeclareFunctionStatement,
    ) -> Result<(), CompileError> {
        let entry_stage = node.entry_stage.value().copied();

        if let Some(stage) = entry_stage {
            if node.parameters.len() > 1 {
                return Err(self.error(
                    CompileErrorKind::EntryFunctionTooManyParameters {
                        function: node.name.clone(),
                    },
                    node.span,
                ));
            }
            if let Some(parameter) = node.parameters.first() {
                let is_struct = parameter
                    .ty
                    .value()
                    .is_some_and(|ty| ty.resolve_alias().is_struct());
                if !is_struct && parameter.ty.is_resolved() {
                    return Err(self.error(
                        CompileErrorKind::EntryFunctionParameterNotStruct {
                            function: node.name.clone(),
                        },
                        parameter.span,
                    ));
                }
            }
            if stage != ShaderStage::Fragment {
                if node.depth_write.has_value() {
                    return Err(self.error(
                        CompileErrorKind::EntryStageAttributeMismatch {
                            attribute: "depth_write",
                        },
                        node.span,
                    ));
                }
                if node.early_fragment_tests.has_value() {
                    return Err(self.error(
                        CompileErrorKind::EntryStageAttributeMismatch {
                            attribute: "early_fragment_tests",
                        },
                        node.span,
                    ));
                }
            }
            if stage != ShaderStage::Compute && node.workgroup_size.has_value() {
                return Err(self.error(
                    CompileErrorKind::EntryStageAttributeMismatch {
                        attribute: "workgroup_size",
                    },
                    node.span,
                ));
            }
        }

        self.push_scope();

        for parameter in &mut node.parameters {
            match parameter.ty.value().cloned() {
                Some(ty) => {
                    let index = self.register_variable(
                        parameter.name.clone(),
                        IdentifierKind::Parameter,
                        VariableData { ty },
                        parameter.var_index,
                        parameter.span,
                    )?;
                    parameter.var_index = Some(index);
                }
                None => self.register_unresolved(parameter.name.clone()),
            }
        }

        let return_type = node
            .return_type
            .value()
            .cloned()
            .unwrap_or(ExpressionType::NoType);
        let previous = self.current_function.replace(FunctionContext {
            stage: entry_stage,
            return_type,
        });
        let previous_loop_depth = std::mem::replace(&mut self.loop_depth, 0);

        let result = visit_statement_list(self, &mut node.body);

        self.loop_depth = previous_loop_depth;
        self.current_function = previous;
        self.pop_scope();
        result
    }

    fn resolve_declare_struct(
        &mut self,
        mut node: DeclareStructStatement,
    ) -> Result<StmtTransformation, CompileError> {
        if node.is_exported.has_value() {
            self.fold_attr_bool(&mut node.is_exported, node.span)?;
        }
        self.require_literal_attr(&node.description.layout, node.span)?;
        let layout = node.description.layout.value().copied();

        let mut declared_members: Vec<String> = Vec::new();
        for member_index in 0..node.description.members.len() {
            let member_span = node.description.members[member_index].span;

            let enabled = {
                let member = &mut node.description.members[member_index];
                if member.cond.has_value() {
                    self.fold_attr_bool(&mut member.cond, member_span)?;
                    !matches!(member.cond, ExprValue::Value(false))
                } else {
                    true
                }
            };
            if !enabled {
                continue;
            }

            {
                let member = &mut node.description.members[member_index];
                self.require_literal_attr(&member.builtin, member_span)?;
                self.require_literal_attr(&member.interp, member_span)?;
                if member.location_index.has_value() {
                    self.fold_attr_u32(&mut member.location_index, member_span)?;
                }
                if member.builtin.has_value() && member.location_index.has_value() {
                    return Err(
                        self.error(CompileErrorKind::StructFieldBuiltinLocation, member_span)
                    );
                }
            }

            let member_name = node.description.members[member_index].name.clone();
            if declared_members.contains(&member_name) {
                let cond_unresolved = node.description.members[member_index].cond.is_expr();
                if !(cond_unresolved && self.context.partial_compilation) {
                    return Err(self.error(
                        CompileErrorKind::StructFieldMultiple { field: member_name },
                        member_span,
                    ));
                }
            } else {
                declared_members.push(member_name);
            }

            if !node.description.members[member_index].ty.has_value() {
                return Err(self.error(CompileErrorKind::MissingExpression, member_span));
            }

            let mut member_ty =
                std::mem::take(&mut node.description.members[member_index].ty);
            let resolved = self.resolve_type_expr(&mut member_ty, false, member_span)?;
            match resolved {
                Some(ty) => member_ty = ExprValue::Value(ty),
                None => {
                    // Unresolved member type: partial compilation only.
                    node.description.members[member_index].ty = member_ty;
                    continue;
                }
            }
            node.description.members[member_index].ty = member_ty;

            let member_type = node.description.members[member_index]
                .ty
                .value()
                .cloned()
                .expect("just resolved");

            if let Some(layout) = layout {
                let target = member_type.resolve_alias();
                match target {
                    ExpressionType::Primitive(PrimitiveType::Bool) => {
                        return Err(self.error(
                            CompileErrorKind::StructLayoutTypeNotAllowed {
                                type_name: "bool".into(),
                                layout: layout.name().into(),
                            },
                            member_span,
                        ))
                    }
                    ExpressionType::Struct(inner_index) => {
                        let inner_layout = self
                            .context
                            .structs
                            .retrieve(*inner_index, member_span)?
                            .description
                            .layout
                            .value()
                            .copied();
                        match inner_layout {
                            Some(inner) if inner == layout => {}
                            Some(inner) => {
                                return Err(self.error(
                                    CompileErrorKind::StructLayoutInnerMismatch {
                                        outer: layout.name().into(),
                                        inner: inner.name().into(),
                                    },
                                    member_span,
                                ))
                            }
                            None => {
                                return Err(self.error(
                                    CompileErrorKind::StructLayoutInnerMismatch {
                                        outer: layout.name().into(),
                                        inner: "<no layout>".into(),
                                    },
                                    member_span,
                                ))
                            }
                        }
                    }
                    _ => {}
                }
            }

            ops::validate_concrete_type(&member_type, member_span)?;
        }

        node.description.condition_index = self.current_conditional_index;

        let index = self.register_struct(
            node.description.name.clone(),
            StructData {
                module_index: self.current_module_index,
                description: node.description.clone(),
            },
            node.struct_index,
            node.span,
        )?;
        node.struct_index = Some(index);
        Ok(StmtTransformation::DontVisitChildren(Statement::DeclareStruct(node)))
    }

    fn resolve_declare_variable(
        &mut self,
        mut node: DeclareVariableStatement,
    ) -> Result<StmtTransformation, CompileError> {
        let mut initial_type = ExpressionType::NoType;
        if let Some(initial) = &mut node.initial_expression {
            self.handle_expression(initial)?;
            match initial.cached_type() {
                Some(ty) => initial_type = ty.unwrap_external(),
                None => {
                    self.register_unresolved(node.name.clone());
                    return Ok(StmtTransformation::DontVisitChildren(
                        Statement::DeclareVariable(node),
                    ));
                }
            }
        }

        let resolved = if !node.ty.has_value() {
            if node.initial_expression.is_none() {
                return Err(self.error(CompileErrorKind::MissingExpression, node.span));
            }
            ops::resolve_untyped_type(&mut initial_type);
            initial_type
        } else {
            let Some(declared) = self.resolve_type_expr(&mut node.ty, false, node.span)? else {
                self.register_unresolved(node.name.clone());
                return Ok(StmtTransformation::DontVisitChildren(
                    Statement::DeclareVariable(node),
                ));
            };
            if !initial_type.is_no_type()
                && !ops::types_match(declared.resolve_alias(), initial_type.resolve_alias())
            {
                return Err(self.error(
                    CompileErrorKind::DeclarationTypeMismatch {
                        declared: self.stringify(&declared),
                        initializer: self.stringify(&initial_type),
                    },
                    node.span,
                ));
            }
            declared
        };

        ops::validate_concrete_type(&resolved, node.span)?;

        let index = self.register_variable(
            node.name.clone(),
            IdentifierKind::Variable,
            VariableData {
                ty: resolved.clone(),
            },
            node.var_index,
            node.span,
        )?;
        node.var_index = Some(index);

        if !resolved.is_literal() {
            node.ty = ExprValue::Value(resolved);
        }
        Ok(StmtTransformation::DontVisitChildren(Statement::DeclareVariable(node)))
    }

    fn resolve_declare_external(
        &mut self,
        mut node: DeclareExternalStatement,
    ) -> Result<StmtTransformation, CompileError> {
        let previous_env = self.current_env;

        if !node.name.is_empty() {
            let environment_index = self.named_external_blocks.len();
            let block_env = self.envs.alloc(
                Some(self.current_env),
                self.envs.module_id(self.current_env).to_string(),
            );
            self.named_external_blocks
                .push(NamedExternalState { env: block_env });

            let index = self.register_external_block(
                node.name.clone(),
                ExternalBlockData {
                    environment_index,
                    name: node.name.clone(),
                },
                node.external_index,
                node.span,
            )?;
            node.external_index = Some(index);
            self.current_env = block_env;
        }

        let result = self.resolve_external_vars(&mut node);
        self.current_env = previous_env;
        result?;

        Ok(StmtTransformation::DontVisitChildren(Statement::DeclareExternal(node)))
    }

    fn resolve_external_vars(
        &mut self,
        node: &mut DeclareExternalStatement,
    ) -> Result<(), CompileError> {
        if node.binding_set.has_value() {
            self.fold_attr_u32(&mut node.binding_set, node.span)?;
        }
        if node.auto_binding.has_value() {
            self.fold_attr_bool(&mut node.auto_binding, node.span)?;
        }

        for var in &mut node.external_vars {
            let internal_name = if node.name.is_empty() {
                var.name.clone()
            } else {
                format!("{}_{}", node.name, var.name)
            };

            let current_conditional = self.current_conditional_index;
            if let Some(&existing_conditional) = self.declared_external_vars.get(&internal_name) {
                let conflicting = existing_conditional == 0
                    || current_conditional == 0
                    || existing_conditional == current_conditional;
                if conflicting {
                    return Err(self.error(
                        CompileErrorKind::ExternalAlreadyDeclared {
                            name: var.name.clone(),
                        },
                        var.span,
                    ));
                }
            }
            self.declared_external_vars
                .insert(internal_name, current_conditional);

            let Some(resolved) = self.resolve_type_expr(&mut var.ty, false, var.span)? else {
                self.register_unresolved(var.name.clone());
                continue;
            };
            let target = resolved.resolve_alias().clone();

            if !self.is_external_type_allowed(&target) {
                return Err(self.error(
                    CompileErrorKind::ExternalTypeNotAllowed {
                        name: var.name.clone(),
                        type_name: self.stringify(&resolved),
                    },
                    var.span,
                ));
            }

            if !matches!(target, ExpressionType::PushConstant(_)) {
                if var.binding_set.has_value() {
                    self.fold_attr_u32(&mut var.binding_set, var.span)?;
                }
                if var.binding_index.has_value() {
                    self.fold_attr_u32(&mut var.binding_index, var.span)?;
                }
            }

            ops::validate_concrete_type(&target, var.span)?;

            var.ty = ExprValue::Value(resolved);
            let index = self.register_variable(
                var.name.clone(),
                IdentifierKind::ExternalVariable,
                VariableData { ty: target },
                var.var_index,
                var.span,
            )?;
            var.var_index = Some(index);
        }

        Ok(())
    }

    fn is_external_type_allowed(&self, target: &ExpressionType) -> bool {
        let primitives_ok =
            self.is_feature_enabled(glint_ast::module::ModuleFeature::PrimitiveExternals);
        match target {
            ExpressionType::Sampler(_)
            | ExpressionType::Texture(_)
            | ExpressionType::Uniform(_)
            | ExpressionType::Storage(_)
            | ExpressionType::PushConstant(_) => true,
            ExpressionType::Primitive(_)
            | ExpressionType::Vector(_)
            | ExpressionType::Matrix(_) => primitives_ok,
            ExpressionType::Array(array) => match array.contained.as_ref() {
                ExpressionType::Sampler(_) | ExpressionType::Texture(_) => true,
                ExpressionType::Primitive(_)
                | ExpressionType::Vector(_)
                | ExpressionType::Matrix(_) => primitives_ok,
                _ => false,
            },
            _ => false,
        }
    }

    // ── Loops ──────────────────────────────────────────────────────────

    fn resolve_while(
        &mut self,
        mut node: WhileStatement,
    ) -> Result<StmtTransformation, CompileError> {
        self.handle_expression(&mut node.condition)?;
        if let Some(ty) = node.condition.cached_type() {
            if *ty.resolve_alias() != ExpressionType::Primitive(PrimitiveType::Bool) {
                return Err(self.error(
                    CompileErrorKind::ConditionExpectedBool {
                        found: self.stringify(ty),
                    },
                    node.condition.span(),
                ));
            }
        }

        self.push_scope();
        self.loop_depth += 1;
        let result = self.handle_statement(&mut node.statement);
        self.loop_depth -= 1;
        self.pop_scope();
        result?;
        Ok(StmtTransformation::DontVisitChildren(Statement::While(node)))
    }

    fn resolve_for(&mut self, mut node: ForStatement) -> Result<StmtTransformation, CompileError> {
        self.handle_expression(&mut node.from_expr)?;
        self.handle_expression(&mut node.to_expr)?;
        if let Some(step) = &mut node.step_expr {
            self.handle_expression(step)?;
        }
        self.require_literal_attr(&node.unroll, node.span)?;

        let unroll_requested = matches!(node.unroll, ExprValue::Value(LoopUnroll::Always));
        if unroll_requested && self.options.unroll_for_loops {
            if let Some(unrolled) = self.try_unroll_for(&mut node)? {
                return Ok(StmtTransformation::Replace(unrolled));
            }
        }

        // Runtime loop form. The counter cannot be registered when an unroll
        // is still pending, because unrolling turns it into a constant.
        let wont_unroll = !unroll_requested;
        let from_type = node.from_expr.cached_type().cloned();

        self.push_scope();
        let register_result = match from_type {
            Some(mut counter_type) if wont_unroll => {
                ops::resolve_untyped_type(&mut counter_type);
                self.register_variable(
                    node.var_name.clone(),
                    IdentifierKind::Variable,
                    VariableData { ty: counter_type },
                    node.var_index,
                    node.span,
                )
                .map(|index| node.var_index = Some(index))
            }
            _ => {
                self.register_unresolved(node.var_name.clone());
                Ok(())
            }
        };
        let body_result = register_result.and_then(|()| {
            self.loop_depth += 1;
            let result = self.handle_statement(&mut node.statement);
            self.loop_depth -= 1;
            result
        });
        self.pop_scope();
        body_result?;

        Ok(StmtTransformation::DontVisitChildren(Statement::For(node)))
    }

    /// Expand an `@unroll` counting loop. `Ok(None)` means the bounds could
    /// not be folded and the loop stays in its runtime form.
    fn try_unroll_for(
        &mut self,
        node: &mut ForStatement,
    ) -> Result<Option<Statement>, CompileError> {
        let Some(from_value) = self.compute_constant_value(&mut node.from_expr)? else {
            return Ok(None);
        };
        let Some(to_value) = self.compute_constant_value(&mut node.to_expr)? else {
            return Ok(None);
        };
        let step_value = match &mut node.step_expr {
            Some(step) => match self.compute_constant_value(step)? {
                Some(value) => Some(value),
                None => return Ok(None),
            },
            None => None,
        };

        // Pick the counter type: `from` first, falling back to `to`, with
        // untyped literals defaulting to i32.
        let counter_primitive = |value: &ConstantValue| match value {
            ConstantValue::Scalar(ScalarValue::I32(_)) => Some(PrimitiveType::Int32),
            ConstantValue::Scalar(ScalarValue::U32(_)) => Some(PrimitiveType::UInt32),
            ConstantValue::Scalar(ScalarValue::IntLiteral(_)) => Some(PrimitiveType::IntLiteral),
            _ => None,
        };

        let from_primitive = counter_primitive(&from_value).ok_or_else(|| {
            self.error(
                CompileErrorKind::ForFromTypeExpectInteger {
                    found: self.stringify(&from_value.constant_type()),
                },
                node.from_expr.span(),
            )
        })?;

        let mut counter_type = from_primitive;
        if counter_type == PrimitiveType::IntLiteral {
            let to_primitive = counter_primitive(&to_value).ok_or_else(|| {
                self.error(
                    CompileErrorKind::ForToUnmatchingType {
                        from: from_primitive.name().into(),
                        to: self.stringify(&to_value.constant_type()),
                    },
                    node.to_expr.span(),
                )
            })?;
            counter_type = to_primitive;
        }
        if counter_type == PrimitiveType::IntLiteral {
            counter_type = PrimitiveType::Int32;
        }

        let as_i64 = |value: &ConstantValue, span: Span| -> Result<i64, CompileError> {
            match value {
                ConstantValue::Scalar(ScalarValue::I32(v)) => Ok(i64::from(*v)),
                ConstantValue::Scalar(ScalarValue::U32(v)) => Ok(i64::from(*v)),
                ConstantValue::Scalar(ScalarValue::IntLiteral(v)) => Ok(*v),
                other => Err(self.error(
                    CompileErrorKind::ForFromTypeExpectInteger {
                        found: self.stringify(&other.constant_type()),
                    },
                    span,
                )),
            }
        };

        let from = as_i64(&from_value, node.from_expr.span())?;
        let to = as_i64(&to_value, node.to_expr.span())?;
        let step = match &step_value {
            Some(value) => as_i64(value, node.span)?,
            None => 1,
        };

        let make_counter = |value: i64, span: Span| -> Result<Expression, CompileError> {
            let constant = match counter_type {
                PrimitiveType::Int32 => {
                    ConstantValue::i32_value(i32::try_from(value).map_err(|_| {
                        CompileError::new(
                            CompileErrorKind::LiteralOutOfRange {
                                type_name: "i32".into(),
                                value: value.to_string(),
                            },
                            span,
                        )
                    })?)
                }
                PrimitiveType::UInt32 => {
                    ConstantValue::u32_value(u32::try_from(value).map_err(|_| {
                        CompileError::new(
                            CompileErrorKind::LiteralOutOfRange {
                                type_name: "u32".into(),
                                value: value.to_string(),
                            },
                            span,
                        )
                    })?)
                }
                _ => {
                    return Err(CompileError::new(
                        CompileErrorKind::Internal {
                            message: format!("unexpected counter type {}", counter_type.name()),
                        },
                        span,
                    ))
                }
            };
            Ok(builder::constant_value(constant, span))
        };

        let span = node.span;
        let mut statements = Vec::new();
        let mut counter = from;
        while counter < to {
            self.push_scope();

            let mut iteration = Vec::with_capacity(2);
            let mut counter_decl = builder::declare_const(
                node.var_name.clone(),
                ExprValue::None,
                make_counter(counter, span)?,
                span,
            );
            let declare_result = self.handle_statement(&mut counter_decl);

            let body_result = declare_result.and_then(|()| {
                // Each iteration reuses the declaration indices of the body,
                // so remap them through fresh ones.
                let mut body = (*node.statement).clone();
                let mut generators = ContextGenerators(&mut *self.context);
                let mut remapper = IndexRemapper::new(&mut generators);
                remapper.remap_statement(&mut body);
                self.handle_statement(&mut body).map(|()| body)
            });

            self.pop_scope();
            let body = body_result?;

            iteration.push(counter_decl);
            iteration.push(unscope(body));
            statements.push(builder::scoped(
                builder::multi(iteration, span),
                span,
            ));

            counter += step;
            if step <= 0 {
                break;
            }
        }

        Ok(Some(Statement::Multi(MultiStatement { span, statements })))
    }

    fn resolve_for_each(
        &mut self,
        mut node: ForEachStatement,
    ) -> Result<StmtTransformation, CompileError> {
        if node.var_name.is_empty() {
            return Err(self.error(CompileErrorKind::EmptyIdentifier, node.span));
        }

        self.handle_expression(&mut node.expression)?;
        self.require_literal_attr(&node.unroll, node.span)?;

        let Some(expr_type) = node.expression.cached_type().cloned() else {
            self.push_scope();
            self.register_unresolved(node.var_name.clone());
            self.loop_depth += 1;
            let result = self.handle_statement(&mut node.statement);
            self.loop_depth -= 1;
            self.pop_scope();
            result?;
            return Ok(StmtTransformation::DontVisitChildren(Statement::ForEach(node)));
        };

        let resolved = expr_type.resolve_alias().unwrap_external();
        let ExpressionType::Array(array) = &resolved else {
            return Err(self.error(
                CompileErrorKind::ForEachUnsupportedType {
                    found: self.stringify(&expr_type),
                },
                node.span,
            ));
        };
        let inner_type = (*array.contained).clone();
        let length = array.length;

        let unroll_requested = matches!(node.unroll, ExprValue::Value(LoopUnroll::Always));
        if unroll_requested && self.options.unroll_for_each_loops {
            let span = node.span;
            let mut statements = Vec::with_capacity(length as usize);

            for i in 0..length {
                self.push_scope();

                let mut element_access = builder::access_index(
                    node.expression.clone(),
                    vec![builder::u32_value(i, span)],
                    span,
                );
                let iteration_result = self
                    .handle_expression(&mut element_access)
                    .and_then(|()| {
                        let mut element_decl = builder::declare_variable(
                            node.var_name.clone(),
                            ExprValue::None,
                            Some(element_access),
                            span,
                        );
                        self.handle_statement(&mut element_decl)?;

                        let mut body = (*node.statement).clone();
                        let mut generators = ContextGenerators(&mut *self.context);
                        let mut remapper = IndexRemapper::new(&mut generators);
                        remapper.remap_statement(&mut body);
                        self.handle_statement(&mut body)?;
                        Ok((element_decl, body))
                    });

                self.pop_scope();
                let (element_decl, body) = iteration_result?;

                statements.push(builder::scoped(
                    builder::multi(vec![element_decl, unscope(body)], span),
                    span,
                ));
            }

            return Ok(StmtTransformation::Replace(Statement::Multi(
                MultiStatement { span, statements },
            )));
        }

        self.push_scope();
        let register_result = self
            .register_variable(
                node.var_name.clone(),
                IdentifierKind::Variable,
                VariableData { ty: inner_type },
                node.var_index,
                node.span,
            )
            .map(|index| node.var_index = Some(index));
        let body_result = register_result.and_then(|()| {
            self.loop_depth += 1;
            let result = self.handle_statement(&mut node.statement);
            self.loop_depth -= 1;
            result
        });
        self.pop_scope();
        body_result?;

        Ok(StmtTransformation::DontVisitChildren(Statement::ForEach(node)))
    }
}

/// Strip a redundant scope wrapper from an unrolled body; the iteration
/// already provides one.
fn unscope(stmt: Statement) -> Statement {
    match stmt {
        Statement::Scoped(scoped) => *scoped.statement,
        other => other,
    }
}
