//! Constant propagation.
//!
//! A dedicated transformer folding constant subtrees into
//! `ConstantValueExpression` nodes. Floating arithmetic follows IEEE-754;
//! integer arithmetic wraps (two's complement). Integer division or modulo
//! by zero is undefined at the language level: the folder refuses to fold
//! and leaves the expression for the runtime.

use glint_common::span::Span;

use glint_ast::builder;
use glint_ast::constant::{ConstantValue, ScalarValue};
use glint_ast::expr::{BinaryOp, Expression, ExprValue, UnaryOp};
use glint_ast::intrinsic::IntrinsicKind;
use glint_ast::transform::{
    visit_expression, visit_expression_children, ExprTransformation, Transformer,
};
use glint_ast::ty::{ExpressionType, PrimitiveType};

use crate::context::TransformerContext;
use crate::error::{CompileError, CompileErrorKind};

/// Recursive constant folder over one expression tree.
pub struct ConstantPropagation<'a> {
    context: &'a TransformerContext,
}

impl<'a> ConstantPropagation<'a> {
    pub fn new(context: &'a TransformerContext) -> Self {
        Self { context }
    }
}

/// Fold every constant subtree of `expr` in place.
pub fn propagate_constants(
    expr: &mut Expression,
    context: &TransformerContext,
) -> Result<(), CompileError> {
    let mut propagation = ConstantPropagation::new(context);
    visit_expression(&mut propagation, expr)
}

/// The constant value of an already-folded expression, if it is one.
pub fn as_constant(expr: &Expression) -> Option<&ConstantValue> {
    match expr {
        Expression::ConstantValue(node) => Some(&node.value),
        _ => None,
    }
}

impl Transformer for ConstantPropagation<'_> {
    type Error = CompileError;

    fn transform_expression(
        &mut self,
        mut expr: Expression,
    ) -> Result<ExprTransformation, Self::Error> {
        // Children first, then this node.
        visit_expression_children(self, &mut expr)?;
        match self.try_fold(&expr)? {
            Some(folded) => Ok(ExprTransformation::Replace(folded)),
            None => Ok(ExprTransformation::DontVisitChildren(expr)),
        }
    }
}

impl ConstantPropagation<'_> {
    fn try_fold(&mut self, expr: &Expression) -> Result<Option<Expression>, CompileError> {
        let span = expr.span();
        let folded = match expr {
            Expression::Constant(node) => {
                let data = self
                    .context
                    .constants
                    .try_retrieve(node.constant_index, span)
                    .map_err(CompileError::from)?;
                data.and_then(|data| data.value.clone())
            }
            Expression::Binary(node) => {
                match (as_constant(&node.left), as_constant(&node.right)) {
                    (Some(left), Some(right)) => fold_binary(node.op, left, right, span)?,
                    _ => None,
                }
            }
            Expression::Unary(node) => match as_constant(&node.operand) {
                Some(operand) => fold_unary(node.op, operand, span)?,
                None => None,
            },
            Expression::Cast(node) => {
                let ExprValue::Value(target) = &node.target_type else {
                    return Ok(None);
                };
                let operands: Option<Vec<&ConstantValue>> =
                    node.expressions.iter().map(as_constant).collect();
                match operands {
                    Some(operands) => fold_cast(target, &operands, span)?,
                    None => None,
                }
            }
            Expression::Swizzle(node) => match as_constant(&node.expr) {
                Some(value) => fold_swizzle(value, &node.components),
                None => None,
            },
            Expression::AccessIndex(node) => {
                if node.indices.len() != 1 {
                    return Ok(None);
                }
                match (as_constant(&node.expr), as_constant(&node.indices[0])) {
                    (Some(container), Some(index)) => fold_index(container, index, span)?,
                    _ => None,
                }
            }
            Expression::Conditional(node) => match as_constant(&node.condition) {
                Some(condition) => match condition.as_bool() {
                    Some(true) => return Ok(Some((*node.true_expr).clone())),
                    Some(false) => return Ok(Some((*node.false_expr).clone())),
                    None => None,
                },
                None => None,
            },
            Expression::Intrinsic(node) => {
                let operands: Option<Vec<&ConstantValue>> =
                    node.parameters.iter().map(as_constant).collect();
                match operands {
                    Some(operands) => fold_intrinsic(node.intrinsic, &operands),
                    None => None,
                }
            }
            _ => None,
        };

        Ok(folded.map(|value| builder::constant_value(value, span)))
    }
}

// ── Scalar helpers ─────────────────────────────────────────────────────

/// Promote a pair of scalars to a common representation. Untyped literals
/// adopt the typed side, with range checks on integers.
fn promote_pair(
    left: &ScalarValue,
    right: &ScalarValue,
    span: Span,
) -> Result<Option<(ScalarValue, ScalarValue)>, CompileError> {
    if left.primitive_type() == right.primitive_type() {
        return Ok(Some((left.clone(), right.clone())));
    }

    fn promote(
        literal: &ScalarValue,
        target: PrimitiveType,
        span: Span,
    ) -> Result<Option<ScalarValue>, CompileError> {
        let out_of_range = |value: String| {
            CompileError::new(
                CompileErrorKind::LiteralOutOfRange {
                    type_name: target.name().into(),
                    value,
                },
                span,
            )
        };
        let promoted = match (literal, target) {
            (ScalarValue::IntLiteral(v), PrimitiveType::Int32) => ScalarValue::I32(
                i32::try_from(*v).map_err(|_| out_of_range(v.to_string()))?,
            ),
            (ScalarValue::IntLiteral(v), PrimitiveType::UInt32) => ScalarValue::U32(
                u32::try_from(*v).map_err(|_| out_of_range(v.to_string()))?,
            ),
            (ScalarValue::IntLiteral(v), PrimitiveType::Float32) => ScalarValue::F32(*v as f32),
            (ScalarValue::IntLiteral(v), PrimitiveType::Float64) => ScalarValue::F64(*v as f64),
            (ScalarValue::FloatLiteral(v), PrimitiveType::Float32) => ScalarValue::F32(*v as f32),
            (ScalarValue::FloatLiteral(v), PrimitiveType::Float64) => ScalarValue::F64(*v),
            _ => return Ok(None),
        };
        Ok(Some(promoted))
    }

    if left.primitive_type().is_literal() {
        if let Some(promoted) = promote(left, right.primitive_type(), span)? {
            return Ok(Some((promoted, right.clone())));
        }
    } else if right.primitive_type().is_literal() {
        if let Some(promoted) = promote(right, left.primitive_type(), span)? {
            return Ok(Some((left.clone(), promoted)));
        }
    }
    Ok(None)
}

/// Fold one scalar pair under `op`. `None` means "not foldable" (type
/// mismatch left to the checker, or integer division by zero).
fn fold_scalar_binary(
    op: BinaryOp,
    left: &ScalarValue,
    right: &ScalarValue,
) -> Option<ScalarValue> {
    use ScalarValue::*;

    macro_rules! arith {
        ($l:expr, $r:expr, $wrap_add:ident, $wrap_sub:ident, $wrap_mul:ident, $ctor:ident) => {
            match op {
                BinaryOp::Add => Some($ctor($l.$wrap_add(*$r))),
                BinaryOp::Subtract => Some($ctor($l.$wrap_sub(*$r))),
                BinaryOp::Multiply => Some($ctor($l.$wrap_mul(*$r))),
                BinaryOp::Divide => {
                    if *$r == 0 {
                        None
                    } else {
                        Some($ctor($l.wrapping_div(*$r)))
                    }
                }
                BinaryOp::Modulo => {
                    if *$r == 0 {
                        None
                    } else {
                        Some($ctor($l.wrapping_rem(*$r)))
                    }
                }
                BinaryOp::CompEq => Some(Bool($l == $r)),
                BinaryOp::CompNe => Some(Bool($l != $r)),
                BinaryOp::CompLt => Some(Bool($l < $r)),
                BinaryOp::CompLe => Some(Bool($l <= $r)),
                BinaryOp::CompGt => Some(Bool($l > $r)),
                BinaryOp::CompGe => Some(Bool($l >= $r)),
                BinaryOp::LogicalAnd | BinaryOp::LogicalOr => None,
            }
        };
    }

    macro_rules! float_arith {
        ($l:expr, $r:expr, $ctor:ident) => {
            match op {
                BinaryOp::Add => Some($ctor($l + $r)),
                BinaryOp::Subtract => Some($ctor($l - $r)),
                BinaryOp::Multiply => Some($ctor($l * $r)),
                BinaryOp::Divide => Some($ctor($l / $r)),
                BinaryOp::Modulo => Some($ctor($l % $r)),
                BinaryOp::CompEq => Some(Bool($l == $r)),
                BinaryOp::CompNe => Some(Bool($l != $r)),
                BinaryOp::CompLt => Some(Bool($l < $r)),
                BinaryOp::CompLe => Some(Bool($l <= $r)),
                BinaryOp::CompGt => Some(Bool($l > $r)),
                BinaryOp::CompGe => Some(Bool($l >= $r)),
                BinaryOp::LogicalAnd | BinaryOp::LogicalOr => None,
            }
        };
    }

    match (left, right) {
        (Bool(l), Bool(r)) => match op {
            BinaryOp::LogicalAnd => Some(Bool(*l && *r)),
            BinaryOp::LogicalOr => Some(Bool(*l || *r)),
            BinaryOp::CompEq => Some(Bool(l == r)),
            BinaryOp::CompNe => Some(Bool(l != r)),
            _ => None,
        },
        (I32(l), I32(r)) => arith!(l, r, wrapping_add, wrapping_sub, wrapping_mul, I32),
        (U32(l), U32(r)) => arith!(l, r, wrapping_add, wrapping_sub, wrapping_mul, U32),
        (IntLiteral(l), IntLiteral(r)) => {
            arith!(l, r, wrapping_add, wrapping_sub, wrapping_mul, IntLiteral)
        }
        (F32(l), F32(r)) => float_arith!(l, r, F32),
        (F64(l), F64(r)) => float_arith!(l, r, F64),
        (FloatLiteral(l), FloatLiteral(r)) => float_arith!(l, r, FloatLiteral),
        _ => None,
    }
}

fn fold_binary(
    op: BinaryOp,
    left: &ConstantValue,
    right: &ConstantValue,
    span: Span,
) -> Result<Option<ConstantValue>, CompileError> {
    match (left, right) {
        (ConstantValue::Scalar(l), ConstantValue::Scalar(r)) => {
            let Some((l, r)) = promote_pair(l, r, span)? else {
                return Ok(None);
            };
            Ok(fold_scalar_binary(op, &l, &r).map(ConstantValue::Scalar))
        }
        (ConstantValue::Vector(l), ConstantValue::Vector(r)) => {
            if l.len() != r.len() {
                return Ok(None);
            }
            let mut components = Vec::with_capacity(l.len());
            for (a, b) in l.iter().zip(r.iter()) {
                let Some((a, b)) = promote_pair(a, b, span)? else {
                    return Ok(None);
                };
                match fold_scalar_binary(op, &a, &b) {
                    // Componentwise comparisons do not collapse to bool here.
                    Some(ScalarValue::Bool(_)) if !matches!(a, ScalarValue::Bool(_)) => {
                        return Ok(None)
                    }
                    Some(component) => components.push(component),
                    None => return Ok(None),
                }
            }
            Ok(Some(ConstantValue::Vector(components)))
        }
        (ConstantValue::Vector(l), ConstantValue::Scalar(r)) => {
            let mut components = Vec::with_capacity(l.len());
            for a in l {
                let Some((a, b)) = promote_pair(a, r, span)? else {
                    return Ok(None);
                };
                match fold_scalar_binary(op, &a, &b) {
                    Some(ScalarValue::Bool(_)) if !matches!(a, ScalarValue::Bool(_)) => {
                        return Ok(None)
                    }
                    Some(component) => components.push(component),
                    None => return Ok(None),
                }
            }
            Ok(Some(ConstantValue::Vector(components)))
        }
        _ => Ok(None),
    }
}

fn fold_unary(
    op: UnaryOp,
    operand: &ConstantValue,
    _span: Span,
) -> Result<Option<ConstantValue>, CompileError> {
    fn scalar(op: UnaryOp, value: &ScalarValue) -> Option<ScalarValue> {
        use ScalarValue::*;
        match (op, value) {
            (UnaryOp::Plus, v) => Some(v.clone()),
            (UnaryOp::Minus, I32(v)) => Some(I32(v.wrapping_neg())),
            (UnaryOp::Minus, U32(v)) => Some(U32(v.wrapping_neg())),
            (UnaryOp::Minus, IntLiteral(v)) => Some(IntLiteral(v.wrapping_neg())),
            (UnaryOp::Minus, F32(v)) => Some(F32(-v)),
            (UnaryOp::Minus, F64(v)) => Some(F64(-v)),
            (UnaryOp::Minus, FloatLiteral(v)) => Some(FloatLiteral(-v)),
            (UnaryOp::LogicalNot, Bool(v)) => Some(Bool(!v)),
            (UnaryOp::BitwiseNot, I32(v)) => Some(I32(!v)),
            (UnaryOp::BitwiseNot, U32(v)) => Some(U32(!v)),
            (UnaryOp::BitwiseNot, IntLiteral(v)) => Some(IntLiteral(!v)),
            _ => None,
        }
    }

    Ok(match operand {
        ConstantValue::Scalar(value) => scalar(op, value).map(ConstantValue::Scalar),
        ConstantValue::Vector(components) => {
            let folded: Option<Vec<ScalarValue>> =
                components.iter().map(|c| scalar(op, c)).collect();
            folded.map(ConstantValue::Vector)
        }
        ConstantValue::Array { .. } => None,
    })
}

/// Convert one scalar to a target primitive for a cast. Integer narrowing
/// wraps; literals lower with a range check.
fn cast_scalar(
    value: &ScalarValue,
    target: PrimitiveType,
    span: Span,
) -> Result<Option<ScalarValue>, CompileError> {
    use ScalarValue::*;

    if value.primitive_type() == target {
        return Ok(Some(value.clone()));
    }

    if value.primitive_type().is_literal() {
        let mut constant = ConstantValue::Scalar(value.clone());
        crate::ops::resolve_untyped_value(
            &ExpressionType::Primitive(target),
            &mut constant,
            span,
        )?;
        return Ok(match constant {
            ConstantValue::Scalar(scalar) if scalar.primitive_type() == target => Some(scalar),
            _ => None,
        });
    }

    let converted = match (value, target) {
        (I32(v), PrimitiveType::UInt32) => U32(*v as u32),
        (I32(v), PrimitiveType::Float32) => F32(*v as f32),
        (I32(v), PrimitiveType::Float64) => F64(*v as f64),
        (U32(v), PrimitiveType::Int32) => I32(*v as i32),
        (U32(v), PrimitiveType::Float32) => F32(*v as f32),
        (U32(v), PrimitiveType::Float64) => F64(*v as f64),
        (F32(v), PrimitiveType::Int32) => I32(*v as i32),
        (F32(v), PrimitiveType::UInt32) => U32(*v as u32),
        (F32(v), PrimitiveType::Float64) => F64(f64::from(*v)),
        (F64(v), PrimitiveType::Int32) => I32(*v as i32),
        (F64(v), PrimitiveType::UInt32) => U32(*v as u32),
        (F64(v), PrimitiveType::Float32) => F32(*v as f32),
        _ => return Ok(None),
    };
    Ok(Some(converted))
}

fn fold_cast(
    target: &ExpressionType,
    operands: &[&ConstantValue],
    span: Span,
) -> Result<Option<ConstantValue>, CompileError> {
    match target {
        ExpressionType::Primitive(p) => {
            let [ConstantValue::Scalar(value)] = operands else {
                return Ok(None);
            };
            Ok(cast_scalar(value, *p, span)?.map(ConstantValue::Scalar))
        }
        ExpressionType::Vector(vec) => {
            let mut components = Vec::with_capacity(vec.component_count as usize);
            for operand in operands {
                match operand {
                    ConstantValue::Scalar(value) => {
                        match cast_scalar(value, vec.component_type, span)? {
                            Some(converted) => components.push(converted),
                            None => return Ok(None),
                        }
                    }
                    ConstantValue::Vector(inner) => {
                        for value in inner {
                            match cast_scalar(value, vec.component_type, span)? {
                                Some(converted) => components.push(converted),
                                None => return Ok(None),
                            }
                        }
                    }
                    ConstantValue::Array { .. } => return Ok(None),
                }
            }
            if components.len() != vec.component_count as usize {
                return Ok(None);
            }
            Ok(Some(ConstantValue::Vector(components)))
        }
        ExpressionType::Array(array) => {
            let values: Vec<ConstantValue> = operands.iter().map(|v| (*v).clone()).collect();
            Ok(Some(ConstantValue::Array {
                element_type: (*array.contained).clone(),
                values,
            }))
        }
        _ => Ok(None),
    }
}

fn fold_swizzle(value: &ConstantValue, components: &[u32]) -> Option<ConstantValue> {
    let source: Vec<ScalarValue> = match value {
        ConstantValue::Scalar(scalar) => vec![scalar.clone()],
        ConstantValue::Vector(components) => components.clone(),
        ConstantValue::Array { .. } => return None,
    };

    let mut picked = Vec::with_capacity(components.len());
    for &component in components {
        picked.push(source.get(component as usize)?.clone());
    }

    if picked.len() == 1 {
        Some(ConstantValue::Scalar(picked.remove(0)))
    } else {
        Some(ConstantValue::Vector(picked))
    }
}

fn fold_index(
    container: &ConstantValue,
    index: &ConstantValue,
    _span: Span,
) -> Result<Option<ConstantValue>, CompileError> {
    let index = match index {
        ConstantValue::Scalar(ScalarValue::I32(v)) => usize::try_from(*v).ok(),
        ConstantValue::Scalar(ScalarValue::U32(v)) => Some(*v as usize),
        ConstantValue::Scalar(ScalarValue::IntLiteral(v)) => usize::try_from(*v).ok(),
        _ => None,
    };
    let Some(index) = index else {
        return Ok(None);
    };

    Ok(match container {
        ConstantValue::Vector(components) => {
            components.get(index).cloned().map(ConstantValue::Scalar)
        }
        ConstantValue::Array { values, .. } => values.get(index).cloned(),
        ConstantValue::Scalar(_) => None,
    })
}

/// Fold the numeric intrinsics with obvious compile-time semantics.
fn fold_intrinsic(kind: IntrinsicKind, operands: &[&ConstantValue]) -> Option<ConstantValue> {
    use ScalarValue::*;

    fn unary_float(value: &ConstantValue, f: impl Fn(f64) -> f64) -> Option<ConstantValue> {
        match value {
            ConstantValue::Scalar(F32(v)) => Some(ConstantValue::f32_value(f(f64::from(*v)) as f32)),
            ConstantValue::Scalar(F64(v)) => {
                Some(ConstantValue::Scalar(F64(f(*v))))
            }
            ConstantValue::Scalar(FloatLiteral(v)) => Some(ConstantValue::float_literal(f(*v))),
            _ => None,
        }
    }

    match (kind, operands) {
        (IntrinsicKind::Abs, [value]) => match value {
            ConstantValue::Scalar(I32(v)) => Some(ConstantValue::i32_value(v.wrapping_abs())),
            ConstantValue::Scalar(IntLiteral(v)) => {
                Some(ConstantValue::int_literal(v.wrapping_abs()))
            }
            _ => unary_float(value, f64::abs),
        },
        (IntrinsicKind::Floor, [value]) => unary_float(value, f64::floor),
        (IntrinsicKind::Ceil, [value]) => unary_float(value, f64::ceil),
        (IntrinsicKind::Sqrt, [value]) => unary_float(value, f64::sqrt),
        (IntrinsicKind::Min | IntrinsicKind::Max, [left, right]) => {
            let pick_left = match (left, right) {
                (ConstantValue::Scalar(I32(l)), ConstantValue::Scalar(I32(r))) => l <= r,
                (ConstantValue::Scalar(U32(l)), ConstantValue::Scalar(U32(r))) => l <= r,
                (ConstantValue::Scalar(IntLiteral(l)), ConstantValue::Scalar(IntLiteral(r))) => {
                    l <= r
                }
                (ConstantValue::Scalar(F32(l)), ConstantValue::Scalar(F32(r))) => l <= r,
                (ConstantValue::Scalar(F64(l)), ConstantValue::Scalar(F64(r))) => l <= r,
                (
                    ConstantValue::Scalar(FloatLiteral(l)),
                    ConstantValue::Scalar(FloatLiteral(r)),
                ) => l <= r,
                _ => return None,
            };
            let take_left = if kind == IntrinsicKind::Min {
                pick_left
            } else {
                !pick_left
            };
            Some(if take_left {
                (*left).clone()
            } else {
                (*right).clone()
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_ast::builder;

    fn fold(mut expr: Expression) -> Expression {
        let context = TransformerContext::new();
        propagate_constants(&mut expr, &context).unwrap();
        expr
    }

    fn span() -> Span {
        Span::new(0, 1)
    }

    #[test]
    fn folds_integer_arithmetic() {
        let expr = fold(builder::binary(
            BinaryOp::Add,
            builder::i32_value(2, span()),
            builder::i32_value(3, span()),
            span(),
        ));
        assert_eq!(as_constant(&expr), Some(&ConstantValue::i32_value(5)));
    }

    #[test]
    fn literal_adopts_concrete_side() {
        let expr = fold(builder::binary(
            BinaryOp::Multiply,
            builder::i32_value(4, span()),
            builder::int_literal(3, span()),
            span(),
        ));
        assert_eq!(as_constant(&expr), Some(&ConstantValue::i32_value(12)));
    }

    #[test]
    fn integer_division_by_zero_stays_runtime() {
        let expr = fold(builder::binary(
            BinaryOp::Divide,
            builder::i32_value(1, span()),
            builder::i32_value(0, span()),
            span(),
        ));
        assert!(as_constant(&expr).is_none());
        assert!(matches!(expr, Expression::Binary(_)));
    }

    #[test]
    fn float_division_by_zero_folds_to_infinity() {
        let expr = fold(builder::binary(
            BinaryOp::Divide,
            builder::f32_value(1.0, span()),
            builder::f32_value(0.0, span()),
            span(),
        ));
        assert_eq!(
            as_constant(&expr),
            Some(&ConstantValue::f32_value(f32::INFINITY))
        );
    }

    #[test]
    fn integer_arithmetic_wraps() {
        let expr = fold(builder::binary(
            BinaryOp::Add,
            builder::i32_value(i32::MAX, span()),
            builder::i32_value(1, span()),
            span(),
        ));
        assert_eq!(as_constant(&expr), Some(&ConstantValue::i32_value(i32::MIN)));
    }

    #[test]
    fn folds_nested_comparison() {
        // (1 + 2) < 4
        let expr = fold(builder::binary(
            BinaryOp::CompLt,
            builder::binary(
                BinaryOp::Add,
                builder::int_literal(1, span()),
                builder::int_literal(2, span()),
                span(),
            ),
            builder::int_literal(4, span()),
            span(),
        ));
        assert_eq!(as_constant(&expr), Some(&ConstantValue::bool_value(true)));
    }

    #[test]
    fn folds_swizzle_of_constant_vector() {
        let vector = builder::constant_value(
            ConstantValue::Vector(vec![
                ScalarValue::F32(1.0),
                ScalarValue::F32(2.0),
                ScalarValue::F32(3.0),
            ]),
            span(),
        );
        let expr = fold(Expression::Swizzle(glint_ast::expr::SwizzleExpression {
            span: span(),
            cached_type: None,
            expr: Box::new(vector),
            components: vec![2, 0],
        }));
        assert_eq!(
            as_constant(&expr),
            Some(&ConstantValue::Vector(vec![
                ScalarValue::F32(3.0),
                ScalarValue::F32(1.0)
            ]))
        );
    }

    #[test]
    fn folds_constant_reference() {
        let mut context = TransformerContext::new();
        let index = context
            .constants
            .register(
                crate::context::ConstantData {
                    module_index: usize::MAX,
                    value: Some(ConstantValue::u32_value(16)),
                },
                None,
                span(),
            )
            .unwrap();

        let mut expr = builder::constant_ref(
            index,
            ExpressionType::Primitive(PrimitiveType::UInt32),
            span(),
        );
        propagate_constants(&mut expr, &context).unwrap();
        assert_eq!(as_constant(&expr), Some(&ConstantValue::u32_value(16)));
    }
}
