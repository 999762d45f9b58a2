//! Expression resolution rules.
//!
//! One method per node kind, each implementing the decision that node makes:
//! identifier lookup, access-chain rewriting (fields, swizzles, methods,
//! namespaces), operator validation, partial-type instantiation, call
//! dispatch and compile-time selection.

use glint_common::span::Span;

use glint_ast::expr::{
    AccessFieldExpression, AccessIdentifierExpression, AccessIndexExpression,
    AliasValueExpression, AssignExpression, AssignOp, BinaryExpression, CallFunctionExpression,
    CastExpression, ConditionalExpression, ConstantExpression, Expression, ExprValue,
    IdentifierExpression, IntrinsicExpression, SwizzleExpression, UnaryExpression,
};
use glint_ast::intrinsic::IntrinsicKind;
use glint_ast::stmt::Statement;
use glint_ast::transform::{visit_expression, ExprTransformation, StmtTransformation, Transformer};
use glint_ast::ty::{ExpressionType, MethodType, PrimitiveType};

use crate::context::{IdentifierKind, TypeContent, TypeParameter, TypeParameterCategory};
use crate::error::{CompileError, CompileErrorKind};
use crate::intrinsics::validate_intrinsic;
use crate::ops;

use super::Resolver;

impl Transformer for Resolver<'_> {
    type Error = CompileError;

    fn transform_expression(
        &mut self,
        expr: Expression,
    ) -> Result<ExprTransformation, CompileError> {
        self.dispatch_expression(expr)
    }

    fn transform_statement(&mut self, stmt: Statement) -> Result<StmtTransformation, CompileError> {
        self.dispatch_statement(stmt)
    }
}

impl Resolver<'_> {
    /// Recursively resolve one expression slot.
    pub(crate) fn handle_expression(&mut self, expr: &mut Expression) -> Result<(), CompileError> {
        visit_expression(self, expr)
    }

    fn dispatch_expression(
        &mut self,
        expr: Expression,
    ) -> Result<ExprTransformation, CompileError> {
        use ExprTransformation::DontVisitChildren as Keep;

        match expr {
            Expression::Identifier(node) => self.resolve_identifier(node),
            Expression::AccessIdentifier(node) => self.resolve_access_identifier(node),
            Expression::AccessField(node) => self.resolve_access_field(node),
            Expression::AccessIndex(node) => self.resolve_access_index(node),
            Expression::AliasValue(node) => self.resolve_alias_value(node),
            Expression::Assign(node) => self.resolve_assign(node),
            Expression::Binary(node) => self.resolve_binary(node),
            Expression::CallFunction(node) => self.resolve_call(node),
            Expression::Cast(node) => self.resolve_cast(node),
            Expression::Conditional(node) => self.resolve_conditional_expr(node),
            Expression::Constant(node) => self.resolve_constant_expr(node),
            Expression::Intrinsic(node) => self.resolve_intrinsic(node),
            Expression::Swizzle(node) => self.resolve_swizzle(node),
            Expression::Unary(node) => self.resolve_unary(node),
            Expression::Variable(mut node) => {
                if let Some(data) = self
                    .context
                    .variables
                    .try_retrieve(node.variable_index, node.span)?
                {
                    node.cached_type = Some(data.ty.clone());
                }
                Ok(Keep(Expression::Variable(node)))
            }
            Expression::ConstantValue(mut node) => {
                node.cached_type = Some(node.value.constant_type());
                Ok(Keep(Expression::ConstantValue(node)))
            }
            Expression::Function(mut node) => {
                node.cached_type = Some(ExpressionType::Function(node.function_index));
                Ok(Keep(Expression::Function(node)))
            }
            Expression::IntrinsicFunction(mut node) => {
                let kind = self
                    .context
                    .intrinsics
                    .retrieve(node.intrinsic_index, node.span)?
                    .kind;
                node.cached_type = Some(ExpressionType::IntrinsicFunction(kind));
                Ok(Keep(Expression::IntrinsicFunction(node)))
            }
            Expression::Module(mut node) => {
                node.cached_type = Some(ExpressionType::Module(node.module_index));
                Ok(Keep(Expression::Module(node)))
            }
            Expression::NamedExternalBlock(mut node) => {
                node.cached_type =
                    Some(ExpressionType::NamedExternalBlock(node.external_block_index));
                Ok(Keep(Expression::NamedExternalBlock(node)))
            }
            Expression::StructType(mut node) => {
                node.cached_type = Some(ExpressionType::Struct(node.struct_index));
                Ok(Keep(Expression::StructType(node)))
            }
            Expression::Type(mut node) => {
                node.cached_type = Some(ExpressionType::Type(node.type_index));
                Ok(Keep(Expression::Type(node)))
            }
        }
    }

    // ── Identifiers ────────────────────────────────────────────────────

    fn resolve_identifier(
        &mut self,
        node: IdentifierExpression,
    ) -> Result<ExprTransformation, CompileError> {
        if node.name.is_empty() {
            return Err(self.error(CompileErrorKind::EmptyIdentifier, node.span));
        }

        let Some(data) = self.find_identifier(&node.name) else {
            if self.context.allow_unknown_identifiers {
                return Ok(ExprTransformation::DontVisitChildren(Expression::Identifier(
                    node,
                )));
            }
            return Err(self.error(
                CompileErrorKind::UnknownIdentifier {
                    name: node.name,
                },
                node.span,
            ));
        };

        if data.kind == IdentifierKind::Unresolved {
            return Ok(ExprTransformation::DontVisitChildren(Expression::Identifier(
                node,
            )));
        }

        // Another conditional branch may resolve this name instead.
        if self.context.partial_compilation
            && data.conditional_index > 0
            && data.conditional_index != self.current_conditional_index
        {
            return Ok(ExprTransformation::DontVisitChildren(Expression::Identifier(
                node,
            )));
        }

        let replacement = self.handle_identifier(data, node.span).map_err(|err| {
            match err.kind {
                CompileErrorKind::UnexpectedIdentifier { .. } => self.error(
                    CompileErrorKind::UnexpectedIdentifier { name: node.name },
                    node.span,
                ),
                _ => err,
            }
        })?;
        Ok(ExprTransformation::Replace(replacement))
    }

    // ── Access chains ──────────────────────────────────────────────────

    fn resolve_access_identifier(
        &mut self,
        mut node: AccessIdentifierExpression,
    ) -> Result<ExprTransformation, CompileError> {
        if node.identifiers.is_empty() {
            return Err(self.error(CompileErrorKind::NoIdentifier, node.span));
        }

        let saved_env = self.current_env;
        let result = self.resolve_access_identifier_inner(&mut node);
        self.current_env = saved_env;
        result
    }

    fn resolve_access_identifier_inner(
        &mut self,
        node: &mut AccessIdentifierExpression,
    ) -> Result<ExprTransformation, CompileError> {
        self.handle_expression(&mut node.expr)?;

        let span = node.span;
        let identifiers = std::mem::take(&mut node.identifiers);
        let mut indexed =
            std::mem::replace(&mut node.expr, Box::new(placeholder(span)));

        // Rebuilds the tail of the chain when a segment stays unresolved.
        let finish = |indexed: Box<Expression>, from: usize| {
            let remaining: Vec<_> = identifiers[from..].to_vec();
            ExprTransformation::Replace(Expression::AccessIdentifier(
                AccessIdentifierExpression {
                    span,
                    cached_type: None,
                    expr: indexed,
                    identifiers: remaining,
                },
            ))
        };

        for i in 0..identifiers.len() {
            let entry = &identifiers[i];
            if entry.name.is_empty() {
                return Err(self.error(CompileErrorKind::EmptyIdentifier, entry.span));
            }

            let Some(expr_type) = indexed.cached_type() else {
                return Ok(finish(indexed, i));
            };
            let resolved = expr_type.resolve_alias().clone();

            match &resolved {
                ExpressionType::Sampler(_) => {
                    let method_index = match entry.name.as_str() {
                        "Sample" => 0,
                        "SampleDepthComp" => 1,
                        _ => {
                            return Err(self.error(
                                CompileErrorKind::UnknownMethod {
                                    type_name: self.stringify(&resolved),
                                    method: entry.name.clone(),
                                },
                                entry.span,
                            ))
                        }
                    };
                    indexed = Box::new(method_access(indexed, entry, method_index, resolved, span));
                }
                ExpressionType::Texture(_) => {
                    let method_index = match entry.name.as_str() {
                        "Read" => 0,
                        "Write" => 1,
                        _ => {
                            return Err(self.error(
                                CompileErrorKind::UnknownMethod {
                                    type_name: self.stringify(&resolved),
                                    method: entry.name.clone(),
                                },
                                entry.span,
                            ))
                        }
                    };
                    indexed = Box::new(method_access(indexed, entry, method_index, resolved, span));
                }
                ExpressionType::Array(_) | ExpressionType::DynArray(_) => {
                    if entry.name != "Size" {
                        return Err(self.error(
                            CompileErrorKind::UnknownMethod {
                                type_name: self.stringify(&resolved),
                                method: entry.name.clone(),
                            },
                            entry.span,
                        ));
                    }
                    indexed = Box::new(method_access(indexed, entry, 0, resolved, span));
                }
                _ if resolved.is_struct_addressible() => {
                    match self.resolve_struct_member(&resolved, entry.name.as_str(), entry.span)? {
                        MemberLookup::Found { field_index, ty } => {
                            indexed = Box::new(Expression::AccessField(AccessFieldExpression {
                                span,
                                cached_type: Some(ty),
                                expr: indexed,
                                field_index,
                            }));
                        }
                        MemberLookup::Unresolved => return Ok(finish(indexed, i)),
                    }
                }
                ExpressionType::Primitive(_) | ExpressionType::Vector(_) => {
                    if entry.name.len() > 4 {
                        return Err(self.error(
                            CompileErrorKind::InvalidSwizzle {
                                swizzle: entry.name.clone(),
                            },
                            entry.span,
                        ));
                    }
                    let mut components = Vec::with_capacity(entry.name.len());
                    for c in entry.name.chars() {
                        let component = ops::swizzle_component_index(c).ok_or_else(|| {
                            self.error(
                                CompileErrorKind::InvalidSwizzle {
                                    swizzle: entry.name.clone(),
                                },
                                entry.span,
                            )
                        })?;
                        components.push(component);
                    }

                    let strf = crate::stringify::TypeStringifier::new(self.context);
                    let cached_type =
                        ops::compute_swizzle_type(&resolved, &components, entry.span, &strf)?;

                    indexed = Box::new(Expression::Swizzle(SwizzleExpression {
                        span,
                        cached_type: Some(cached_type),
                        expr: indexed,
                        components,
                    }));
                }
                ExpressionType::NamedExternalBlock(block_index) => {
                    let environment_index = self
                        .context
                        .named_external_blocks
                        .retrieve(*block_index, entry.span)?
                        .environment_index;
                    let block_env = self.named_external_blocks[environment_index].env;

                    let Some(data) = self.envs.find(block_env, &entry.name).copied() else {
                        if self.context.allow_unknown_identifiers {
                            return Ok(finish(indexed, i));
                        }
                        return Err(self.error(
                            CompileErrorKind::UnknownIdentifier {
                                name: entry.name.clone(),
                            },
                            span,
                        ));
                    };
                    if data.kind == IdentifierKind::Unresolved
                        || (self.context.partial_compilation
                            && data.conditional_index != self.current_conditional_index)
                    {
                        return Ok(finish(indexed, i));
                    }
                    indexed = Box::new(self.handle_identifier(data, entry.span)?);
                }
                ExpressionType::Module(module_index) => {
                    self.current_env = self.modules[*module_index].env;

                    let Some(data) = self.envs.find(self.current_env, &entry.name).copied()
                    else {
                        if self.context.allow_unknown_identifiers {
                            return Ok(finish(indexed, i));
                        }
                        return Err(self.error(
                            CompileErrorKind::UnknownIdentifier {
                                name: entry.name.clone(),
                            },
                            span,
                        ));
                    };
                    if data.kind == IdentifierKind::Unresolved
                        || (self.context.partial_compilation
                            && data.conditional_index != self.current_conditional_index)
                    {
                        return Ok(finish(indexed, i));
                    }
                    indexed = Box::new(self.handle_identifier(data, entry.span)?);
                }
                _ => return Err(self.error(CompileErrorKind::UnexpectedAccessedType, span)),
            }
        }

        Ok(ExprTransformation::Replace(*indexed))
    }

    fn resolve_access_field(
        &mut self,
        mut node: AccessFieldExpression,
    ) -> Result<ExprTransformation, CompileError> {
        self.handle_expression(&mut node.expr)?;

        let Some(expr_type) = node.expr.cached_type() else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::AccessField(node)));
        };
        let resolved = expr_type.resolve_alias().clone();

        let Some(struct_index) = resolved.struct_index() else {
            return Err(self.error(
                CompileErrorKind::FieldUnexpectedType {
                    type_name: self.stringify(&resolved),
                },
                node.span,
            ));
        };

        match self.member_at_position(struct_index, node.field_index, node.span)? {
            MemberLookup::Found { ty, .. } => {
                node.cached_type = Some(self.wrap_field_type(&resolved, ty));
                Ok(ExprTransformation::DontVisitChildren(Expression::AccessField(node)))
            }
            MemberLookup::Unresolved => {
                Ok(ExprTransformation::DontVisitChildren(Expression::AccessField(node)))
            }
        }
    }

    fn resolve_access_index(
        &mut self,
        mut node: AccessIndexExpression,
    ) -> Result<ExprTransformation, CompileError> {
        self.handle_expression(&mut node.expr)?;
        for index in &mut node.indices {
            self.handle_expression(index)?;
        }

        let Some(expr_type) = node.expr.cached_type() else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::AccessIndex(node)));
        };
        let mut resolved = expr_type.resolve_alias().clone();

        if let ExpressionType::Type(type_index) = resolved {
            return self.instantiate_partial_type(node, type_index);
        }

        if node.indices.len() != 1 {
            return Err(self.error(CompileErrorKind::NoIndex, node.span));
        }

        let index_span = node.indices[0].span();
        let Some(index_type) = node.indices[0].cached_type().cloned() else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::AccessIndex(node)));
        };
        let ExpressionType::Primitive(index_prim) = index_type.resolve_alias().clone() else {
            return Err(self.error(
                CompileErrorKind::IndexRequiresIntegerIndices {
                    found: self.stringify(&index_type),
                },
                node.span,
            ));
        };
        if !matches!(
            index_prim,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::IntLiteral
        ) {
            return Err(self.error(
                CompileErrorKind::IndexRequiresIntegerIndices {
                    found: self.stringify(&index_type),
                },
                node.span,
            ));
        }

        if resolved.is_array() || resolved.is_dyn_array() {
            resolved = match resolved {
                ExpressionType::Array(array) => (*array.contained).clone(),
                ExpressionType::DynArray(array) => (*array.contained).clone(),
                _ => unreachable!(),
            };
        } else if resolved.is_struct_addressible() {
            if index_prim != PrimitiveType::Int32 {
                return Err(self.error(
                    CompileErrorKind::IndexStructRequiresInt32Indices {
                        found: self.stringify(&index_type),
                    },
                    node.span,
                ));
            }

            let Some(value) = self.compute_constant_value(&mut node.indices[0])? else {
                return Ok(ExprTransformation::DontVisitChildren(Expression::AccessIndex(node)));
            };
            let field_index = match value {
                glint_ast::constant::ConstantValue::Scalar(
                    glint_ast::constant::ScalarValue::I32(v),
                ) => v,
                other => {
                    return Err(self.error(
                        CompileErrorKind::Internal {
                            message: format!(
                                "i32-typed index folded to {:?}",
                                other.constant_type()
                            ),
                        },
                        index_span,
                    ))
                }
            };
            if field_index < 0 {
                return Err(self.error(
                    CompileErrorKind::IndexOutOfBounds {
                        kind: "struct",
                        index: i64::from(field_index),
                    },
                    node.span,
                ));
            }

            let struct_index = resolved.struct_index().expect("struct-addressible");
            return match self.member_at_position(struct_index, field_index as u32, index_span)? {
                MemberLookup::Found { ty, .. } => {
                    Ok(ExprTransformation::Replace(Expression::AccessField(
                        AccessFieldExpression {
                            span: node.span,
                            cached_type: Some(ty),
                            expr: node.expr,
                            field_index: field_index as u32,
                        },
                    )))
                }
                MemberLookup::Unresolved => {
                    Ok(ExprTransformation::DontVisitChildren(Expression::AccessIndex(node)))
                }
            };
        } else if let ExpressionType::Matrix(matrix) = &resolved {
            resolved = ExpressionType::Vector(glint_ast::ty::VectorType {
                component_count: matrix.row_count,
                component_type: matrix.component_type,
            });
        } else if let ExpressionType::Vector(vector) = &resolved {
            resolved = ExpressionType::Primitive(vector.component_type);
        } else {
            return Err(self.error(
                CompileErrorKind::IndexUnexpectedType {
                    found: self.stringify(&resolved),
                },
                node.span,
            ));
        }

        node.cached_type = Some(resolved);
        Ok(ExprTransformation::DontVisitChildren(Expression::AccessIndex(node)))
    }

    /// `type_expr[params...]` -- apply a partial type's parameters.
    fn instantiate_partial_type(
        &mut self,
        mut node: AccessIndexExpression,
        type_index: usize,
    ) -> Result<ExprTransformation, CompileError> {
        let (required, optional) = {
            let data = self.context.types.retrieve(type_index, node.span)?;
            match &data.content {
                TypeContent::Partial(partial) => (
                    partial.parameters.clone(),
                    partial.optional_parameters.clone(),
                ),
                TypeContent::Full(_) => {
                    return Err(self.error(
                        CompileErrorKind::ExpectedPartialType {
                            found: data.name.clone(),
                        },
                        node.span,
                    ))
                }
            }
        };

        if node.indices.len() < required.len() {
            return Err(self.error(
                CompileErrorKind::PartialTypeTooFewParameters {
                    expected: required.len() as u32,
                    found: node.indices.len() as u32,
                },
                node.span,
            ));
        }
        if node.indices.len() > required.len() + optional.len() {
            return Err(self.error(
                CompileErrorKind::PartialTypeTooManyParameters {
                    expected: (required.len() + optional.len()) as u32,
                    found: node.indices.len() as u32,
                },
                node.span,
            ));
        }

        let mut parameters = Vec::with_capacity(node.indices.len());
        for i in 0..node.indices.len() {
            let category = if i < required.len() {
                required[i]
            } else {
                optional[i - required.len()]
            };
            let index_span = node.indices[i].span();

            match category {
                TypeParameterCategory::ConstantValue => {
                    let Some(value) = self.compute_constant_value(&mut node.indices[i])? else {
                        return Ok(ExprTransformation::DontVisitChildren(
                            Expression::AccessIndex(node),
                        ));
                    };
                    parameters.push(TypeParameter::Constant(value));
                }
                TypeParameterCategory::FullType
                | TypeParameterCategory::PrimitiveType
                | TypeParameterCategory::StructType => {
                    let Some(index_type) = node.indices[i].cached_type().cloned() else {
                        return Ok(ExprTransformation::DontVisitChildren(
                            Expression::AccessIndex(node),
                        ));
                    };
                    let resolved = self.resolve_type(
                        index_type,
                        category != TypeParameterCategory::FullType,
                        index_span,
                    )?;

                    match category {
                        TypeParameterCategory::PrimitiveType => {
                            if !resolved.resolve_alias().is_primitive() {
                                return Err(self.error(
                                    CompileErrorKind::PartialTypeParameterCategory {
                                        category: "primitive",
                                        index: i as u32,
                                    },
                                    index_span,
                                ));
                            }
                            parameters.push(TypeParameter::Type(resolved.resolve_alias().clone()));
                        }
                        TypeParameterCategory::StructType => {
                            if !resolved.resolve_alias().is_struct() {
                                return Err(self.error(
                                    CompileErrorKind::PartialTypeParameterCategory {
                                        category: "struct",
                                        index: i as u32,
                                    },
                                    index_span,
                                ));
                            }
                            parameters.push(TypeParameter::Type(resolved.resolve_alias().clone()));
                        }
                        _ => parameters.push(TypeParameter::Type(resolved)),
                    }
                }
            }
        }

        let built = {
            let data = self.context.types.retrieve(type_index, node.span)?;
            let TypeContent::Partial(partial) = &data.content else {
                unreachable!("checked above");
            };
            (partial.build)(&parameters, node.span)?
        };

        self.mark_type_used(&built, node.span)?;
        node.cached_type = Some(built);
        Ok(ExprTransformation::DontVisitChildren(Expression::AccessIndex(node)))
    }

    // ── Values & operators ─────────────────────────────────────────────

    fn resolve_alias_value(
        &mut self,
        mut node: AliasValueExpression,
    ) -> Result<ExprTransformation, CompileError> {
        let data = crate::context::IdentifierData {
            index: node.alias_index,
            kind: IdentifierKind::Alias,
            conditional_index: 0,
        };
        if self.options.remove_aliases {
            let terminal = self.resolve_alias_identifier(data, node.span)?;
            return Ok(ExprTransformation::Replace(
                self.handle_identifier(terminal, node.span)?,
            ));
        }

        let replacement = self.handle_identifier(data, node.span)?;
        match replacement {
            Expression::AliasValue(alias) => {
                node.cached_type = alias.cached_type;
                Ok(ExprTransformation::DontVisitChildren(Expression::AliasValue(node)))
            }
            other => Ok(ExprTransformation::Replace(other)),
        }
    }

    fn resolve_assign(
        &mut self,
        mut node: AssignExpression,
    ) -> Result<ExprTransformation, CompileError> {
        self.handle_expression(&mut node.left)?;
        self.handle_expression(&mut node.right)?;

        let (Some(left_type), Some(right_type)) =
            (node.left.cached_type().cloned(), node.right.cached_type().cloned())
        else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::Assign(node)));
        };

        if !is_lvalue(&node.left) {
            return Err(self.error(CompileErrorKind::AssignTemporary, node.span));
        }

        let left_resolved = left_type.resolve_alias().clone();
        let right_resolved = right_type.resolve_alias().unwrap_external();

        if let Some(binary_op) = node.op.binary_op() {
            let strf = crate::stringify::TypeStringifier::new(self.context);
            let result = ops::validate_binary_op(
                binary_op,
                &left_resolved,
                &right_resolved,
                node.span,
                &strf,
            )?;
            if !ops::types_match(&left_resolved, &result) {
                return Err(self.error(
                    CompileErrorKind::UnmatchingTypes {
                        left: self.stringify(&left_type),
                        right: self.stringify(&result),
                    },
                    node.span,
                ));
            }

            // Lower `a op= b` to `a = a op b`.
            let lowered_right = Expression::Binary(BinaryExpression {
                span: node.span,
                cached_type: Some(result),
                op: binary_op,
                left: node.left.clone(),
                right: node.right,
            });
            node.right = Box::new(lowered_right);
            node.op = AssignOp::Simple;
        } else if !ops::types_match(&left_resolved, &right_resolved) {
            return Err(self.error(
                CompileErrorKind::UnmatchingTypes {
                    left: self.stringify(&left_type),
                    right: self.stringify(&right_type),
                },
                node.span,
            ));
        }

        node.cached_type = Some(left_type);
        Ok(ExprTransformation::DontVisitChildren(Expression::Assign(node)))
    }

    fn resolve_binary(
        &mut self,
        mut node: BinaryExpression,
    ) -> Result<ExprTransformation, CompileError> {
        self.handle_expression(&mut node.left)?;
        self.handle_expression(&mut node.right)?;

        let (Some(left_type), Some(right_type)) =
            (node.left.cached_type(), node.right.cached_type())
        else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::Binary(node)));
        };

        let strf = crate::stringify::TypeStringifier::new(self.context);
        let result = ops::validate_binary_op(
            node.op,
            left_type.resolve_alias(),
            right_type.resolve_alias(),
            node.span,
            &strf,
        )?;
        node.cached_type = Some(result);
        Ok(ExprTransformation::DontVisitChildren(Expression::Binary(node)))
    }

    fn resolve_unary(
        &mut self,
        mut node: UnaryExpression,
    ) -> Result<ExprTransformation, CompileError> {
        self.handle_expression(&mut node.operand)?;

        let Some(operand_type) = node.operand.cached_type().cloned() else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::Unary(node)));
        };

        let strf = crate::stringify::TypeStringifier::new(self.context);
        ops::validate_unary_op(node.op, operand_type.resolve_alias(), node.span, &strf)?;
        node.cached_type = Some(operand_type);
        Ok(ExprTransformation::DontVisitChildren(Expression::Unary(node)))
    }

    fn resolve_swizzle(
        &mut self,
        mut node: SwizzleExpression,
    ) -> Result<ExprTransformation, CompileError> {
        self.handle_expression(&mut node.expr)?;

        let Some(expr_type) = node.expr.cached_type() else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::Swizzle(node)));
        };

        let strf = crate::stringify::TypeStringifier::new(self.context);
        let swizzle_type = ops::compute_swizzle_type(
            expr_type.resolve_alias(),
            &node.components,
            node.span,
            &strf,
        )?;
        node.cached_type = Some(swizzle_type);
        Ok(ExprTransformation::DontVisitChildren(Expression::Swizzle(node)))
    }

    fn resolve_cast(
        &mut self,
        mut node: CastExpression,
    ) -> Result<ExprTransformation, CompileError> {
        for sub in &mut node.expressions {
            self.handle_expression(sub)?;
        }

        let Some(mut target) = self.resolve_type_expr(&mut node.target_type, false, node.span)?
        else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::Cast(node)));
        };

        if let ExpressionType::Array(array) = &mut target {
            if array.length == 0 {
                array.length = node.expressions.len() as u32;
            }
        }

        let operand_types: Option<Vec<ExpressionType>> = node
            .expressions
            .iter()
            .map(|sub| sub.cached_type().map(|ty| ty.resolve_alias().clone()))
            .collect();
        if let Some(operand_types) = operand_types {
            let operand_refs: Vec<&ExpressionType> = operand_types.iter().collect();
            let strf = crate::stringify::TypeStringifier::new(self.context);
            ops::validate_cast(target.resolve_alias(), &operand_refs, node.span, &strf)?;
        }

        node.cached_type = Some(target.clone());
        node.target_type = ExprValue::Value(target);
        Ok(ExprTransformation::DontVisitChildren(Expression::Cast(node)))
    }

    fn resolve_conditional_expr(
        &mut self,
        mut node: ConditionalExpression,
    ) -> Result<ExprTransformation, CompileError> {
        self.handle_expression(&mut node.condition)?;

        let Some(condition) = self.compute_constant_value(&mut node.condition)? else {
            self.handle_expression(&mut node.true_expr)?;
            self.handle_expression(&mut node.false_expr)?;
            return Ok(ExprTransformation::DontVisitChildren(Expression::Conditional(node)));
        };

        let Some(taken) = condition.as_bool() else {
            return Err(self.error(
                CompileErrorKind::ConditionExpectedBool {
                    found: self.stringify(&condition.constant_type()),
                },
                node.condition.span(),
            ));
        };

        let mut chosen = if taken {
            *node.true_expr
        } else {
            *node.false_expr
        };
        self.handle_expression(&mut chosen)?;
        Ok(ExprTransformation::Replace(chosen))
    }

    fn resolve_constant_expr(
        &mut self,
        mut node: ConstantExpression,
    ) -> Result<ExprTransformation, CompileError> {
        let value = self
            .context
            .constants
            .try_retrieve(node.constant_index, node.span)?
            .and_then(|data| data.value.clone());

        let Some(value) = value else {
            if self.context.partial_compilation {
                return Ok(ExprTransformation::DontVisitChildren(Expression::Constant(node)));
            }
            return Err(self.error(
                CompileErrorKind::InvalidConstantIndex {
                    index: node.constant_index,
                },
                node.span,
            ));
        };

        self.mark_constant_used(node.constant_index, node.span)?;
        node.cached_type = Some(value.constant_type());
        Ok(ExprTransformation::DontVisitChildren(Expression::Constant(node)))
    }

    fn resolve_intrinsic(
        &mut self,
        mut node: IntrinsicExpression,
    ) -> Result<ExprTransformation, CompileError> {
        for parameter in &mut node.parameters {
            self.handle_expression(parameter)?;
        }

        let resolved: Option<Vec<ExpressionType>> = node
            .parameters
            .iter()
            .map(|p| p.cached_type().map(|ty| ty.resolve_alias().clone()))
            .collect();
        let Some(resolved) = resolved else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::Intrinsic(node)));
        };

        let refs: Vec<&ExpressionType> = resolved.iter().collect();
        let strf = crate::stringify::TypeStringifier::new(self.context);
        let result = validate_intrinsic(node.intrinsic, &refs, node.span, &strf)?;
        node.cached_type = Some(result);
        Ok(ExprTransformation::DontVisitChildren(Expression::Intrinsic(node)))
    }

    // ── Calls ──────────────────────────────────────────────────────────

    fn resolve_call(
        &mut self,
        mut node: CallFunctionExpression,
    ) -> Result<ExprTransformation, CompileError> {
        self.handle_expression(&mut node.target)?;
        for argument in &mut node.arguments {
            self.handle_expression(argument)?;
        }

        let Some(target_type) = node.target.cached_type().cloned() else {
            return Ok(ExprTransformation::DontVisitChildren(Expression::CallFunction(node)));
        };
        let resolved = target_type.resolve_alias().clone();

        match resolved {
            ExpressionType::Function(_) => self.resolve_function_call(node),
            ExpressionType::IntrinsicFunction(kind) => {
                if !matches!(*node.target, Expression::IntrinsicFunction(_)) {
                    return Err(
                        self.error(CompileErrorKind::ExpectedIntrinsicFunction, node.target.span())
                    );
                }
                let mut intrinsic = Expression::Intrinsic(IntrinsicExpression {
                    span: node.span,
                    cached_type: None,
                    intrinsic: kind,
                    parameters: node.arguments,
                });
                self.handle_expression(&mut intrinsic)?;
                Ok(ExprTransformation::Replace(intrinsic))
            }
            ExpressionType::Method(method) => self.resolve_method_call(node, method),
            ExpressionType::Type(type_index) => self.resolve_type_call(node, type_index),
            ExpressionType::Struct(_)
            | ExpressionType::Primitive(_)
            | ExpressionType::Vector(_)
            | ExpressionType::Matrix(_)
            | ExpressionType::Array(_) => {
                // The target denotes a concrete type: rewrite to a cast.
                let mut cast = Expression::Cast(CastExpression {
                    span: node.span,
                    cached_type: None,
                    target_type: ExprValue::Value(resolved),
                    expressions: node.arguments,
                });
                self.handle_expression(&mut cast)?;
                Ok(ExprTransformation::Replace(cast))
            }
            _ => Err(self.error(CompileErrorKind::FunctionCallExpectedFunction, node.span)),
        }
    }

    fn resolve_function_call(
        &mut self,
        mut node: CallFunctionExpression,
    ) -> Result<ExprTransformation, CompileError> {
        let function_index = match &*node.target {
            Expression::Function(target) => target.function_index,
            Expression::AliasValue(target) => {
                let terminal = self.resolve_alias_identifier(
                    crate::context::IdentifierData {
                        index: target.alias_index,
                        kind: IdentifierKind::Alias,
                        conditional_index: 0,
                    },
                    node.span,
                )?;
                if terminal.kind != IdentifierKind::Function {
                    return Err(
                        self.error(CompileErrorKind::FunctionCallExpectedFunction, node.span)
                    );
                }
                terminal.index
            }
            _ => return Err(self.error(CompileErrorKind::FunctionCallExpectedFunction, node.span)),
        };

        let (name, parameters, return_type, entry_stage) = {
            let data = self.context.functions.retrieve(function_index, node.span)?;
            (
                data.name.clone(),
                data.parameters.clone(),
                data.return_type.clone(),
                data.entry_stage,
            )
        };

        if entry_stage.is_some() {
            return Err(self.error(
                CompileErrorKind::FunctionCallUnexpectedEntryFunction { function: name },
                node.span,
            ));
        }

        if node.arguments.len() != parameters.len() {
            return Err(self.error(
                CompileErrorKind::FunctionCallUnmatchingParameterCount {
                    function: name,
                    expected: parameters.len() as u32,
                    found: node.arguments.len() as u32,
                },
                node.span,
            ));
        }

        for i in 0..node.arguments.len() {
            let argument_type = node.arguments[i].cached_type().cloned();
            let Some(argument_type) = argument_type else {
                return Ok(ExprTransformation::DontVisitChildren(Expression::CallFunction(node)));
            };
            if !ops::types_match(
                parameters[i].resolve_alias(),
                &argument_type.resolve_alias().unwrap_external(),
            ) {
                return Err(self.error(
                    CompileErrorKind::FunctionCallUnmatchingParameterType {
                        function: name,
                        index: i as u32,
                        expected: self.stringify(&parameters[i]),
                        found: self.stringify(&argument_type),
                    },
                    node.arguments[i].span(),
                ));
            }
        }

        node.cached_type = Some(return_type);
        Ok(ExprTransformation::DontVisitChildren(Expression::CallFunction(node)))
    }

    fn resolve_method_call(
        &mut self,
        node: CallFunctionExpression,
        method: MethodType,
    ) -> Result<ExprTransformation, CompileError> {
        // The method target is the access node built by AccessIdentifier
        // resolution; its inner expression becomes the first parameter.
        let Expression::AccessIdentifier(access) = *node.target else {
            return Err(self.error(
                CompileErrorKind::Internal {
                    message: "method call target is not an access expression".into(),
                },
                node.span,
            ));
        };

        let object_type = (*method.object).clone();
        let kind = match (&object_type, method.method_index) {
            (ExpressionType::Array(_) | ExpressionType::DynArray(_), 0) => {
                IntrinsicKind::ArraySize
            }
            (ExpressionType::Sampler(_), 0) => IntrinsicKind::TextureSampleImplicitLod,
            (ExpressionType::Sampler(_), 1) => IntrinsicKind::TextureSampleImplicitLodDepthComp,
            (ExpressionType::Texture(_), 0) => IntrinsicKind::TextureRead,
            (ExpressionType::Texture(_), 1) => IntrinsicKind::TextureWrite,
            _ => {
                return Err(self.error(
                    CompileErrorKind::InvalidMethodIndex {
                        index: method.method_index,
                        type_name: self.stringify(&object_type),
                    },
                    node.span,
                ))
            }
        };

        let mut parameters = Vec::with_capacity(node.arguments.len() + 1);
        parameters.push(*access.expr);
        parameters.extend(node.arguments);

        let mut intrinsic = Expression::Intrinsic(IntrinsicExpression {
            span: node.span,
            cached_type: None,
            intrinsic: kind,
            parameters,
        });
        self.handle_expression(&mut intrinsic)?;
        Ok(ExprTransformation::Replace(intrinsic))
    }

    fn resolve_type_call(
        &mut self,
        node: CallFunctionExpression,
        type_index: usize,
    ) -> Result<ExprTransformation, CompileError> {
        enum Target {
            Full(ExpressionType),
            PartialZeroArity,
            PartialNeedsParameters(u32),
        }

        let target = {
            let data = self.context.types.retrieve(type_index, node.span)?;
            match &data.content {
                TypeContent::Full(full) => Target::Full(full.clone()),
                TypeContent::Partial(partial) => {
                    if partial.parameters.is_empty() {
                        Target::PartialZeroArity
                    } else {
                        Target::PartialNeedsParameters(partial.parameters.len() as u32)
                    }
                }
            }
        };

        match target {
            Target::Full(full) => {
                // `vec3[f32](...)` -- a cast to the denoted type.
                let mut cast = Expression::Cast(CastExpression {
                    span: node.span,
                    cached_type: None,
                    target_type: ExprValue::Value(full),
                    expressions: node.arguments,
                });
                self.handle_expression(&mut cast)?;
                Ok(ExprTransformation::Replace(cast))
            }
            Target::PartialZeroArity => {
                let built = {
                    let data = self.context.types.retrieve(type_index, node.span)?;
                    let TypeContent::Partial(partial) = &data.content else {
                        unreachable!("checked above");
                    };
                    (partial.build)(&[], node.span)?
                };
                let mut node = node;
                node.cached_type = Some(built);
                Ok(ExprTransformation::DontVisitChildren(Expression::CallFunction(node)))
            }
            Target::PartialNeedsParameters(required) => Err(self.error(
                CompileErrorKind::PartialTypeTooFewParameters {
                    expected: required,
                    found: 0,
                },
                node.span,
            )),
        }
    }

    // ── Struct member helpers ──────────────────────────────────────────

    /// Find a member by name among a struct's enabled members.
    fn resolve_struct_member(
        &mut self,
        container: &ExpressionType,
        name: &str,
        span: Span,
    ) -> Result<MemberLookup, CompileError> {
        let struct_index = container.struct_index().ok_or_else(|| {
            self.error(
                CompileErrorKind::StructExpected {
                    found: self.stringify(container),
                },
                span,
            )
        })?;

        let (members, struct_condition) = {
            let data = self.context.structs.retrieve(struct_index, span)?;
            (
                data.description.members.clone(),
                data.description.condition_index,
            )
        };

        let mut field_index: i64 = 0;
        let mut has_unresolved = false;
        let mut found = None;
        for member in &members {
            match &member.cond {
                ExprValue::Value(false) => continue,
                ExprValue::Expr(_) => has_unresolved = true,
                _ => {}
            }
            if member.name == name {
                found = Some(member);
                break;
            }
            field_index += 1;
        }

        let Some(member) = found else {
            if struct_condition != self.current_conditional_index {
                return Ok(MemberLookup::Unresolved);
            }
            return Err(self.error(
                CompileErrorKind::UnknownField { field: name.into() },
                span,
            ));
        };

        if member.cond.is_expr() {
            if self.context.partial_compilation {
                return Ok(MemberLookup::Unresolved);
            }
            return Err(self.error(CompileErrorKind::ConstantExpressionRequired, span));
        }

        let ExprValue::Value(member_type) = &member.ty else {
            return Ok(MemberLookup::Unresolved);
        };
        let ty = self.wrap_field_type(container, member_type.clone());

        if has_unresolved {
            // Fields before this one are condition-pending, so the position
            // is not known yet.
            return Ok(MemberLookup::Unresolved);
        }

        Ok(MemberLookup::Found {
            field_index: field_index as u32,
            ty,
        })
    }

    /// Find the member at a position among a struct's enabled members.
    fn member_at_position(
        &mut self,
        struct_index: usize,
        position: u32,
        span: Span,
    ) -> Result<MemberLookup, CompileError> {
        let members = self
            .context
            .structs
            .retrieve(struct_index, span)?
            .description
            .members
            .clone();

        let mut remaining = position;
        for member in &members {
            match &member.cond {
                ExprValue::Value(false) => continue,
                ExprValue::Expr(_) => return Ok(MemberLookup::Unresolved),
                _ => {}
            }
            if remaining == 0 {
                let ExprValue::Value(ty) = &member.ty else {
                    return Ok(MemberLookup::Unresolved);
                };
                return Ok(MemberLookup::Found {
                    field_index: position,
                    ty: ty.clone(),
                });
            }
            remaining -= 1;
        }

        Err(self.error(
            CompileErrorKind::IndexOutOfBounds {
                kind: "struct",
                index: i64::from(position),
            },
            span,
        ))
    }

    /// Preserve uniform/storage wrappers around inner struct field types.
    fn wrap_field_type(
        &self,
        container: &ExpressionType,
        field_type: ExpressionType,
    ) -> ExpressionType {
        match container.resolve_alias() {
            ExpressionType::Uniform(_) => field_type.wrap_uniform(),
            ExpressionType::Storage(storage) => field_type.wrap_storage(storage.access),
            _ => field_type,
        }
    }
}

enum MemberLookup {
    Found { field_index: u32, ty: ExpressionType },
    Unresolved,
}

/// Whether an expression denotes a writable place.
fn is_lvalue(expr: &Expression) -> bool {
    match expr {
        Expression::Variable(_) => true,
        Expression::AccessField(node) => is_lvalue(&node.expr),
        Expression::AccessIndex(node) => is_lvalue(&node.expr),
        Expression::Swizzle(node) => is_lvalue(&node.expr),
        _ => false,
    }
}

fn placeholder(span: Span) -> Expression {
    Expression::Identifier(IdentifierExpression {
        span,
        cached_type: None,
        name: String::new(),
    })
}

fn method_access(
    object: Box<Expression>,
    entry: &glint_ast::expr::IdentifierEntry,
    method_index: u32,
    object_type: ExpressionType,
    span: Span,
) -> Expression {
    Expression::AccessIdentifier(AccessIdentifierExpression {
        span,
        cached_type: Some(ExpressionType::Method(MethodType {
            method_index,
            object: Box::new(object_type),
        })),
        expr: object,
        identifiers: vec![entry.clone()],
    })
}
