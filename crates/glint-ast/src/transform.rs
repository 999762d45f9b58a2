//! Generic tree-rewriting driver.
//!
//! A [`Transformer`] supplies one hook per node category; each hook takes the
//! node by value and decides what happens to it: default-recurse, keep
//! as-is, splice a replacement, or (statements only) remove it from the
//! enclosing list. The driver owns the recursion, so a hook never observes a
//! partially-visited child, and hooks are free to move children out of the
//! node they own.
//!
//! Hooks that recurse themselves (via [`visit_expression`] /
//! [`visit_statement`]) return `DontVisitChildren` to stop the driver from
//! recursing a second time. The driver never recurses into a `Replace`
//! result.

use glint_common::span::Span;

use crate::expr::{Expression, ExprValue, IdentifierExpression};
use crate::stmt::Statement;

/// Outcome of an expression hook.
pub enum ExprTransformation {
    /// Put the node back and recurse into its children.
    VisitChildren(Expression),
    /// Put the node back; children were already handled (or must not be).
    DontVisitChildren(Expression),
    /// Splice the given node in place of the visited one.
    Replace(Expression),
}

/// Outcome of a statement hook.
pub enum StmtTransformation {
    VisitChildren(Statement),
    DontVisitChildren(Statement),
    Replace(Statement),
    /// Delete the statement from its enclosing list. In a non-list position
    /// the statement collapses to a no-op.
    Remove,
}

/// A concrete tree rewriter.
pub trait Transformer {
    type Error;

    fn transform_expression(
        &mut self,
        expr: Expression,
    ) -> Result<ExprTransformation, Self::Error> {
        Ok(ExprTransformation::VisitChildren(expr))
    }

    fn transform_statement(&mut self, stmt: Statement) -> Result<StmtTransformation, Self::Error> {
        Ok(StmtTransformation::VisitChildren(stmt))
    }
}

/// Fills an expression slot while the hook owns the real node.
fn vacant_expression() -> Expression {
    Expression::Identifier(IdentifierExpression {
        span: Span::default(),
        cached_type: None,
        name: String::new(),
    })
}

/// Run `t` over the expression in `slot`, splicing replacements in place.
pub fn visit_expression<T: Transformer>(
    t: &mut T,
    slot: &mut Expression,
) -> Result<(), T::Error> {
    let owned = std::mem::replace(slot, vacant_expression());
    match t.transform_expression(owned)? {
        ExprTransformation::VisitChildren(mut expr) => {
            visit_expression_children(t, &mut expr)?;
            *slot = expr;
        }
        ExprTransformation::DontVisitChildren(expr) => *slot = expr,
        ExprTransformation::Replace(expr) => *slot = expr,
    }
    Ok(())
}

/// Recurse into every child expression of `expr`, in source order.
pub fn visit_expression_children<T: Transformer>(
    t: &mut T,
    expr: &mut Expression,
) -> Result<(), T::Error> {
    match expr {
        Expression::AccessIdentifier(node) => visit_expression(t, &mut node.expr),
        Expression::AccessField(node) => visit_expression(t, &mut node.expr),
        Expression::AccessIndex(node) => {
            visit_expression(t, &mut node.expr)?;
            for index in &mut node.indices {
                visit_expression(t, index)?;
            }
            Ok(())
        }
        Expression::Assign(node) => {
            visit_expression(t, &mut node.left)?;
            visit_expression(t, &mut node.right)
        }
        Expression::Binary(node) => {
            visit_expression(t, &mut node.left)?;
            visit_expression(t, &mut node.right)
        }
        Expression::CallFunction(node) => {
            visit_expression(t, &mut node.target)?;
            for argument in &mut node.arguments {
                visit_expression(t, argument)?;
            }
            Ok(())
        }
        Expression::Cast(node) => {
            visit_expr_value(t, &mut node.target_type)?;
            for sub in &mut node.expressions {
                visit_expression(t, sub)?;
            }
            Ok(())
        }
        Expression::Conditional(node) => {
            visit_expression(t, &mut node.condition)?;
            visit_expression(t, &mut node.true_expr)?;
            visit_expression(t, &mut node.false_expr)
        }
        Expression::Intrinsic(node) => {
            for parameter in &mut node.parameters {
                visit_expression(t, parameter)?;
            }
            Ok(())
        }
        Expression::Swizzle(node) => visit_expression(t, &mut node.expr),
        Expression::Unary(node) => visit_expression(t, &mut node.operand),
        Expression::AliasValue(_)
        | Expression::Constant(_)
        | Expression::ConstantValue(_)
        | Expression::Function(_)
        | Expression::Identifier(_)
        | Expression::IntrinsicFunction(_)
        | Expression::Module(_)
        | Expression::NamedExternalBlock(_)
        | Expression::StructType(_)
        | Expression::Type(_)
        | Expression::Variable(_) => Ok(()),
    }
}

/// Visit the expression form of an attribute slot, if it has one.
pub fn visit_expr_value<T: Transformer, V>(
    t: &mut T,
    value: &mut ExprValue<V>,
) -> Result<(), T::Error> {
    if let ExprValue::Expr(expr) = value {
        visit_expression(t, expr)?;
    }
    Ok(())
}

/// Run `t` over a statement in a non-list position. `Remove` collapses the
/// slot to a no-op.
pub fn visit_statement<T: Transformer>(t: &mut T, slot: &mut Statement) -> Result<(), T::Error> {
    let span = slot.span();
    let owned = std::mem::replace(slot, Statement::no_op(span));
    match t.transform_statement(owned)? {
        StmtTransformation::VisitChildren(mut stmt) => {
            visit_statement_children(t, &mut stmt)?;
            *slot = stmt;
        }
        StmtTransformation::DontVisitChildren(stmt) => *slot = stmt,
        StmtTransformation::Replace(stmt) => *slot = stmt,
        StmtTransformation::Remove => *slot = Statement::no_op(span),
    }
    Ok(())
}

/// Run `t` over every statement of a list, dropping removed statements.
pub fn visit_statement_list<T: Transformer>(
    t: &mut T,
    statements: &mut Vec<Statement>,
) -> Result<(), T::Error> {
    let mut result = Vec::with_capacity(statements.len());
    for owned in statements.drain(..) {
        match t.transform_statement(owned)? {
            StmtTransformation::VisitChildren(mut stmt) => {
                visit_statement_children(t, &mut stmt)?;
                result.push(stmt);
            }
            StmtTransformation::DontVisitChildren(stmt) => result.push(stmt),
            StmtTransformation::Replace(stmt) => result.push(stmt),
            StmtTransformation::Remove => {}
        }
    }
    *statements = result;
    Ok(())
}

/// Recurse into every child (expressions first, then statements) of `stmt`.
pub fn visit_statement_children<T: Transformer>(
    t: &mut T,
    stmt: &mut Statement,
) -> Result<(), T::Error> {
    match stmt {
        Statement::Branch(node) => {
            for cond in &mut node.cond_statements {
                visit_expression(t, &mut cond.condition)?;
                visit_statement(t, &mut cond.statement)?;
            }
            if let Some(else_statement) = &mut node.else_statement {
                visit_statement(t, else_statement)?;
            }
            Ok(())
        }
        Statement::Conditional(node) => {
            visit_expression(t, &mut node.condition)?;
            visit_statement(t, &mut node.statement)
        }
        Statement::DeclareAlias(node) => visit_expression(t, &mut node.expression),
        Statement::DeclareConst(node) => {
            visit_expr_value(t, &mut node.ty)?;
            if let Some(expression) = &mut node.expression {
                visit_expression(t, expression)?;
            }
            Ok(())
        }
        Statement::DeclareExternal(node) => {
            visit_expr_value(t, &mut node.binding_set)?;
            visit_expr_value(t, &mut node.auto_binding)?;
            for var in &mut node.external_vars {
                visit_expr_value(t, &mut var.ty)?;
                visit_expr_value(t, &mut var.binding_set)?;
                visit_expr_value(t, &mut var.binding_index)?;
            }
            Ok(())
        }
        Statement::DeclareFunction(node) => {
            for parameter in &mut node.parameters {
                visit_expr_value(t, &mut parameter.ty)?;
            }
            visit_expr_value(t, &mut node.return_type)?;
            visit_expr_value(t, &mut node.entry_stage)?;
            visit_expr_value(t, &mut node.is_exported)?;
            visit_expr_value(t, &mut node.depth_write)?;
            visit_expr_value(t, &mut node.early_fragment_tests)?;
            visit_expr_value(t, &mut node.workgroup_size)?;
            visit_statement_list(t, &mut node.body)
        }
        Statement::DeclareOption(node) => {
            visit_expr_value(t, &mut node.opt_type)?;
            if let Some(default_value) = &mut node.default_value {
                visit_expression(t, default_value)?;
            }
            Ok(())
        }
        Statement::DeclareStruct(node) => {
            visit_expr_value(t, &mut node.is_exported)?;
            visit_expr_value(t, &mut node.description.layout)?;
            for member in &mut node.description.members {
                visit_expr_value(t, &mut member.ty)?;
                visit_expr_value(t, &mut member.cond)?;
                visit_expr_value(t, &mut member.builtin)?;
                visit_expr_value(t, &mut member.interp)?;
                visit_expr_value(t, &mut member.location_index)?;
            }
            Ok(())
        }
        Statement::DeclareVariable(node) => {
            visit_expr_value(t, &mut node.ty)?;
            if let Some(initial) = &mut node.initial_expression {
                visit_expression(t, initial)?;
            }
            Ok(())
        }
        Statement::Expression(node) => visit_expression(t, &mut node.expression),
        Statement::For(node) => {
            visit_expression(t, &mut node.from_expr)?;
            visit_expression(t, &mut node.to_expr)?;
            if let Some(step) = &mut node.step_expr {
                visit_expression(t, step)?;
            }
            visit_expr_value(t, &mut node.unroll)?;
            visit_statement(t, &mut node.statement)
        }
        Statement::ForEach(node) => {
            visit_expression(t, &mut node.expression)?;
            visit_expr_value(t, &mut node.unroll)?;
            visit_statement(t, &mut node.statement)
        }
        Statement::Multi(node) => visit_statement_list(t, &mut node.statements),
        Statement::Return(node) => {
            if let Some(expression) = &mut node.expression {
                visit_expression(t, expression)?;
            }
            Ok(())
        }
        Statement::Scoped(node) => visit_statement(t, &mut node.statement),
        Statement::While(node) => {
            visit_expression(t, &mut node.condition)?;
            visit_statement(t, &mut node.statement)
        }
        Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Discard(_)
        | Statement::Import(_)
        | Statement::NoOp(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use crate::expr::BinaryOp;

    /// Rewrites every integer literal to 0 and removes no-op statements.
    struct Zeroer;

    impl Transformer for Zeroer {
        type Error = ();

        fn transform_expression(
            &mut self,
            expr: Expression,
        ) -> Result<ExprTransformation, Self::Error> {
            if let Expression::ConstantValue(node) = &expr {
                let span = node.span;
                return Ok(ExprTransformation::Replace(builder::int_literal(0, span)));
            }
            Ok(ExprTransformation::VisitChildren(expr))
        }

        fn transform_statement(
            &mut self,
            stmt: Statement,
        ) -> Result<StmtTransformation, Self::Error> {
            if matches!(stmt, Statement::NoOp(_)) {
                return Ok(StmtTransformation::Remove);
            }
            Ok(StmtTransformation::VisitChildren(stmt))
        }
    }

    #[test]
    fn replace_splices_in_place() {
        let span = Span::new(0, 1);
        let mut expr = builder::binary(
            BinaryOp::Add,
            builder::int_literal(1, span),
            builder::int_literal(2, span),
            span,
        );

        visit_expression(&mut Zeroer, &mut expr).unwrap();

        match expr {
            Expression::Binary(node) => {
                for side in [&node.left, &node.right] {
                    match side.as_ref() {
                        Expression::ConstantValue(cv) => {
                            assert_eq!(cv.value, crate::ConstantValue::int_literal(0));
                        }
                        other => panic!("expected constant, got {other:?}"),
                    }
                }
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn remove_drops_from_list() {
        let span = Span::new(0, 1);
        let mut statements = vec![
            Statement::no_op(span),
            builder::expression_statement(builder::int_literal(1, span), span),
            Statement::no_op(span),
        ];
        visit_statement_list(&mut Zeroer, &mut statements).unwrap();
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn remove_in_slot_becomes_no_op() {
        let span = Span::new(0, 4);
        let mut slot = Statement::no_op(span);
        visit_statement(&mut Zeroer, &mut slot).unwrap();
        assert!(matches!(slot, Statement::NoOp(_)));
    }
}
