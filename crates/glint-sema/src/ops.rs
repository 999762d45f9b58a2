//! Operator, cast and literal typing rules.
//!
//! Pure type algebra: given already-alias-resolved operand types, compute
//! result types or reject. Untyped literal primitives participate in
//! matching until a declaration boundary lowers them; the lowering helpers
//! live here too.

use glint_common::span::Span;

use glint_ast::constant::{ConstantValue, ScalarValue};
use glint_ast::expr::{BinaryOp, UnaryOp};
use glint_ast::ty::{ExpressionType, PrimitiveType, VectorType};

use crate::error::{CompileError, CompileErrorKind};
use crate::stringify::TypeStringifier;

// ── Matching ───────────────────────────────────────────────────────────

/// Whether two primitives are equal up to untyped-literal compatibility.
pub fn primitives_match(a: PrimitiveType, b: PrimitiveType) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (PrimitiveType::IntLiteral, other) | (other, PrimitiveType::IntLiteral) => {
            matches!(other, PrimitiveType::Int32 | PrimitiveType::UInt32)
        }
        (PrimitiveType::FloatLiteral, other) | (other, PrimitiveType::FloatLiteral) => {
            matches!(other, PrimitiveType::Float32 | PrimitiveType::Float64)
        }
        _ => false,
    }
}

/// The concrete survivor of a matched primitive pair (literals defer to the
/// typed side).
pub fn unify_primitives(a: PrimitiveType, b: PrimitiveType) -> PrimitiveType {
    if a.is_literal() {
        b
    } else {
        a
    }
}

/// Structural type equality up to untyped-literal compatibility.
pub fn types_match(left: &ExpressionType, right: &ExpressionType) -> bool {
    match (left, right) {
        (ExpressionType::Primitive(a), ExpressionType::Primitive(b)) => primitives_match(*a, *b),
        (ExpressionType::Vector(a), ExpressionType::Vector(b)) => {
            a.component_count == b.component_count
                && primitives_match(a.component_type, b.component_type)
        }
        (ExpressionType::Matrix(a), ExpressionType::Matrix(b)) => {
            a.column_count == b.column_count
                && a.row_count == b.row_count
                && primitives_match(a.component_type, b.component_type)
        }
        (ExpressionType::Array(a), ExpressionType::Array(b)) => {
            a.length == b.length && types_match(&a.contained, &b.contained)
        }
        (ExpressionType::DynArray(a), ExpressionType::DynArray(b)) => {
            types_match(&a.contained, &b.contained)
        }
        _ => left == right,
    }
}

/// The concrete survivor of a matched type pair.
pub fn unify_types(left: &ExpressionType, right: &ExpressionType) -> ExpressionType {
    match (left, right) {
        (ExpressionType::Primitive(a), ExpressionType::Primitive(b)) => {
            ExpressionType::Primitive(unify_primitives(*a, *b))
        }
        (ExpressionType::Vector(a), ExpressionType::Vector(b)) => {
            ExpressionType::Vector(VectorType {
                component_count: a.component_count,
                component_type: unify_primitives(a.component_type, b.component_type),
            })
        }
        _ => {
            if left.is_literal() {
                right.clone()
            } else {
                left.clone()
            }
        }
    }
}

// ── Binary & unary operators ───────────────────────────────────────────

fn must_match(
    left: &ExpressionType,
    right: &ExpressionType,
    span: Span,
    strf: &TypeStringifier<'_>,
) -> Result<(), CompileError> {
    if types_match(left, right) {
        Ok(())
    } else {
        Err(CompileError::new(
            CompileErrorKind::UnmatchingTypes {
                left: strf.format(left),
                right: strf.format(right),
            },
            span,
        ))
    }
}

fn primitives_must_match(
    left: PrimitiveType,
    right: PrimitiveType,
    span: Span,
    strf: &TypeStringifier<'_>,
) -> Result<(), CompileError> {
    must_match(
        &ExpressionType::Primitive(left),
        &ExpressionType::Primitive(right),
        span,
        strf,
    )
}

/// Validate a binary operation over alias-resolved operand types and compute
/// its result type.
pub fn validate_binary_op(
    op: BinaryOp,
    left: &ExpressionType,
    right: &ExpressionType,
    span: Span,
    strf: &TypeStringifier<'_>,
) -> Result<ExpressionType, CompileError> {
    let unsupported = |side: &'static str, ty: &ExpressionType| {
        CompileError::new(
            CompileErrorKind::BinaryUnsupported {
                side,
                type_name: strf.format(ty),
            },
            span,
        )
    };
    let incompatible = || {
        CompileError::new(
            CompileErrorKind::BinaryIncompatibleTypes {
                left: strf.format(left),
                right: strf.format(right),
            },
            span,
        )
    };

    if !left.is_primitive() && !left.is_matrix() && !left.is_vector() {
        return Err(unsupported("left", left));
    }
    if !right.is_primitive() && !right.is_matrix() && !right.is_vector() {
        return Err(unsupported("right", right));
    }

    let bool_ty = ExpressionType::Primitive(PrimitiveType::Bool);

    match left {
        ExpressionType::Primitive(left_prim) => match op {
            BinaryOp::CompGe | BinaryOp::CompGt | BinaryOp::CompLe | BinaryOp::CompLt => {
                if *left_prim == PrimitiveType::Bool {
                    return Err(unsupported("left", left));
                }
                must_match(left, right, span, strf)?;
                Ok(bool_ty)
            }
            BinaryOp::CompEq | BinaryOp::CompNe => {
                must_match(left, right, span, strf)?;
                Ok(bool_ty)
            }
            BinaryOp::Add | BinaryOp::Subtract => {
                must_match(left, right, span, strf)?;
                Ok(unify_types(left, right))
            }
            BinaryOp::Modulo | BinaryOp::Multiply | BinaryOp::Divide => {
                if !left_prim.is_numeric() {
                    return Err(unsupported("left", left));
                }
                match right {
                    ExpressionType::Matrix(right_mat) => {
                        primitives_must_match(*left_prim, right_mat.component_type, span, strf)?;
                        Ok(right.clone())
                    }
                    ExpressionType::Primitive(_) => {
                        must_match(left, right, span, strf)?;
                        Ok(unify_types(left, right))
                    }
                    ExpressionType::Vector(right_vec) => {
                        primitives_must_match(*left_prim, right_vec.component_type, span, strf)?;
                        Ok(right.clone())
                    }
                    _ => Err(incompatible()),
                }
            }
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                if *left_prim != PrimitiveType::Bool {
                    return Err(unsupported("left", left));
                }
                must_match(left, right, span, strf)?;
                Ok(bool_ty)
            }
        },
        ExpressionType::Matrix(left_mat) => match op {
            BinaryOp::CompEq
            | BinaryOp::CompNe
            | BinaryOp::CompGe
            | BinaryOp::CompGt
            | BinaryOp::CompLe
            | BinaryOp::CompLt => {
                must_match(left, right, span, strf)?;
                Ok(bool_ty)
            }
            BinaryOp::Add | BinaryOp::Subtract => {
                must_match(left, right, span, strf)?;
                Ok(left.clone())
            }
            BinaryOp::Multiply => match right {
                ExpressionType::Matrix(_) => {
                    must_match(left, right, span, strf)?;
                    Ok(left.clone())
                }
                ExpressionType::Primitive(right_prim) => {
                    primitives_must_match(left_mat.component_type, *right_prim, span, strf)?;
                    Ok(left.clone())
                }
                ExpressionType::Vector(right_vec) => {
                    primitives_must_match(
                        left_mat.component_type,
                        right_vec.component_type,
                        span,
                        strf,
                    )?;
                    if left_mat.column_count != right_vec.component_count {
                        return Err(incompatible());
                    }
                    Ok(right.clone())
                }
                _ => Err(incompatible()),
            },
            BinaryOp::Divide | BinaryOp::Modulo | BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                Err(unsupported("left", left))
            }
        },
        ExpressionType::Vector(left_vec) => match op {
            BinaryOp::CompEq
            | BinaryOp::CompNe
            | BinaryOp::CompGe
            | BinaryOp::CompGt
            | BinaryOp::CompLe
            | BinaryOp::CompLt => {
                must_match(left, right, span, strf)?;
                Ok(bool_ty)
            }
            BinaryOp::Add | BinaryOp::Subtract => {
                must_match(left, right, span, strf)?;
                Ok(unify_types(left, right))
            }
            BinaryOp::Modulo | BinaryOp::Multiply | BinaryOp::Divide => match right {
                ExpressionType::Primitive(right_prim) => {
                    primitives_must_match(left_vec.component_type, *right_prim, span, strf)?;
                    Ok(left.clone())
                }
                ExpressionType::Vector(_) => {
                    must_match(left, right, span, strf)?;
                    Ok(unify_types(left, right))
                }
                _ => Err(incompatible()),
            },
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => Err(unsupported("left", left)),
        },
        _ => Err(unsupported("left", left)),
    }
}

/// Validate a unary operation; the result type is always the operand type.
pub fn validate_unary_op(
    op: UnaryOp,
    operand: &ExpressionType,
    span: Span,
    strf: &TypeStringifier<'_>,
) -> Result<(), CompileError> {
    let unsupported = || {
        CompileError::new(
            CompileErrorKind::UnaryUnsupported {
                type_name: strf.format(operand),
            },
            span,
        )
    };

    match op {
        UnaryOp::LogicalNot => {
            if *operand != ExpressionType::Primitive(PrimitiveType::Bool) {
                return Err(unsupported());
            }
        }
        UnaryOp::BitwiseNot => {
            if !matches!(
                operand,
                ExpressionType::Primitive(PrimitiveType::Int32 | PrimitiveType::UInt32)
            ) {
                return Err(unsupported());
            }
        }
        UnaryOp::Minus | UnaryOp::Plus => {
            let base = match operand {
                ExpressionType::Primitive(p) => *p,
                ExpressionType::Vector(v) => v.component_type,
                _ => return Err(unsupported()),
            };
            if !base.is_numeric() {
                return Err(unsupported());
            }
        }
    }
    Ok(())
}

// ── Swizzles ───────────────────────────────────────────────────────────

/// Map a swizzle letter to a component index. Accepts the xyzw, rgba and
/// stpq letter sets.
pub fn swizzle_component_index(c: char) -> Option<u32> {
    match c {
        'x' | 'r' | 's' => Some(0),
        'y' | 'g' | 't' => Some(1),
        'z' | 'b' | 'p' => Some(2),
        'w' | 'a' | 'q' => Some(3),
        _ => None,
    }
}

/// Type of a swizzle over `ty`, checking every component index against the
/// source component count.
pub fn compute_swizzle_type(
    ty: &ExpressionType,
    components: &[u32],
    span: Span,
    strf: &TypeStringifier<'_>,
) -> Result<ExpressionType, CompileError> {
    let invalid = || {
        CompileError::new(
            CompileErrorKind::InvalidSwizzle {
                swizzle: components
                    .iter()
                    .map(|&c| ['x', 'y', 'z', 'w'][c.min(3) as usize])
                    .collect(),
            },
            span,
        )
    };

    if components.is_empty() || components.len() > 4 {
        return Err(invalid());
    }

    let (base, source_count) = match ty {
        ExpressionType::Primitive(p) => (*p, 1),
        ExpressionType::Vector(v) => (v.component_type, v.component_count),
        _ => {
            return Err(CompileError::new(
                CompileErrorKind::SwizzleUnexpectedType {
                    found: strf.format(ty),
                },
                span,
            ))
        }
    };

    if components.iter().any(|&c| c >= source_count) {
        return Err(invalid());
    }

    if components.len() == 1 {
        Ok(ExpressionType::Primitive(base))
    } else {
        Ok(ExpressionType::Vector(VectorType {
            component_count: components.len() as u32,
            component_type: base,
        }))
    }
}

// ── Casts ──────────────────────────────────────────────────────────────

/// Whether `from` can be explicitly converted to `to`.
fn convertible(from: PrimitiveType, to: PrimitiveType) -> bool {
    use PrimitiveType::*;
    if from == to {
        return true;
    }
    let concrete = |p: PrimitiveType| matches!(p, Float32 | Float64 | Int32 | UInt32);
    match from {
        IntLiteral => matches!(to, Int32 | UInt32 | Float32 | Float64),
        FloatLiteral => matches!(to, Float32 | Float64),
        _ => concrete(from) && concrete(to),
    }
}

/// Validate a cast per the shape rules, given the resolved target type and
/// the alias-resolved types of the cast operands.
pub fn validate_cast(
    target: &ExpressionType,
    operands: &[&ExpressionType],
    span: Span,
    strf: &TypeStringifier<'_>,
) -> Result<(), CompileError> {
    let incompatible = |from: &ExpressionType| {
        CompileError::new(
            CompileErrorKind::CastIncompatibleTypes {
                from: strf.format(from),
                to: strf.format(target),
            },
            span,
        )
    };

    match target {
        ExpressionType::Matrix(mat) => {
            if operands.len() == 1 {
                match operands[0] {
                    ExpressionType::Matrix(from) => {
                        if !convertible(from.component_type, mat.component_type) {
                            return Err(CompileError::new(
                                CompileErrorKind::CastIncompatibleBaseTypes {
                                    from: from.component_type.name().into(),
                                    to: mat.component_type.name().into(),
                                },
                                span,
                            ));
                        }
                        return Ok(());
                    }
                    // Single scalar: diagonal matrix.
                    ExpressionType::Primitive(p) => {
                        if !convertible(*p, mat.component_type) {
                            return Err(incompatible(operands[0]));
                        }
                        return Ok(());
                    }
                    other => {
                        return Err(CompileError::new(
                            CompileErrorKind::CastMatrixExpectedVectorOrScalar {
                                found: strf.format(other),
                            },
                            span,
                        ))
                    }
                }
            }

            // Column vectors or a full scalar listing.
            if operands.iter().all(|ty| ty.is_vector()) {
                if operands.len() != mat.column_count as usize {
                    return Err(CompileError::new(
                        CompileErrorKind::CastComponentMismatch {
                            from: operands.len() as u32,
                            to: mat.column_count,
                        },
                        span,
                    ));
                }
                for ty in operands {
                    let ExpressionType::Vector(v) = ty else { unreachable!() };
                    if v.component_count != mat.row_count {
                        return Err(CompileError::new(
                            CompileErrorKind::CastMatrixVectorComponentMismatch {
                                found: v.component_count,
                                expected: mat.row_count,
                            },
                            span,
                        ));
                    }
                    if !primitives_match(v.component_type, mat.component_type) {
                        return Err(incompatible(ty));
                    }
                }
                Ok(())
            } else if operands.iter().all(|ty| ty.is_primitive()) {
                let expected = mat.column_count * mat.row_count;
                if operands.len() as u32 != expected {
                    return Err(CompileError::new(
                        CompileErrorKind::CastComponentMismatch {
                            from: operands.len() as u32,
                            to: expected,
                        },
                        span,
                    ));
                }
                for ty in operands {
                    let ExpressionType::Primitive(p) = ty else { unreachable!() };
                    if !convertible(*p, mat.component_type) {
                        return Err(incompatible(ty));
                    }
                }
                Ok(())
            } else {
                let found = operands
                    .iter()
                    .find(|ty| !ty.is_vector() && !ty.is_primitive())
                    .unwrap_or(&operands[0]);
                Err(CompileError::new(
                    CompileErrorKind::CastMatrixExpectedVectorOrScalar {
                        found: strf.format(found),
                    },
                    span,
                ))
            }
        }
        ExpressionType::Vector(vec) => {
            // A lone vector of the right size may convert its element type.
            if let [ExpressionType::Vector(from)] = operands {
                if from.component_count == vec.component_count {
                    if convertible(from.component_type, vec.component_type) {
                        return Ok(());
                    }
                    return Err(CompileError::new(
                        CompileErrorKind::CastIncompatibleBaseTypes {
                            from: from.component_type.name().into(),
                            to: vec.component_type.name().into(),
                        },
                        span,
                    ));
                }
            }

            let mut component_sum = 0u32;
            for ty in operands {
                match ty {
                    ExpressionType::Primitive(p) => {
                        if !primitives_match(*p, vec.component_type) {
                            return Err(incompatible(ty));
                        }
                        component_sum += 1;
                    }
                    ExpressionType::Vector(v) => {
                        if !primitives_match(v.component_type, vec.component_type) {
                            return Err(incompatible(ty));
                        }
                        component_sum += v.component_count;
                    }
                    other => return Err(incompatible(other)),
                }
            }
            if component_sum != vec.component_count {
                return Err(CompileError::new(
                    CompileErrorKind::CastComponentMismatch {
                        from: component_sum,
                        to: vec.component_count,
                    },
                    span,
                ));
            }
            Ok(())
        }
        ExpressionType::Primitive(to) => {
            let [operand] = operands else {
                return Err(CompileError::new(
                    CompileErrorKind::CastComponentMismatch {
                        from: operands.len() as u32,
                        to: 1,
                    },
                    span,
                ));
            };
            match operand {
                ExpressionType::Primitive(from) if convertible(*from, *to) => Ok(()),
                other => Err(incompatible(other)),
            }
        }
        ExpressionType::Array(array) => {
            if operands.len() as u32 != array.length {
                return Err(CompileError::new(
                    CompileErrorKind::CastComponentMismatch {
                        from: operands.len() as u32,
                        to: array.length,
                    },
                    span,
                ));
            }
            for ty in operands {
                if !types_match(ty, &array.contained) {
                    return Err(incompatible(ty));
                }
            }
            Ok(())
        }
        other => Err(CompileError::new(
            CompileErrorKind::InvalidCast {
                to: strf.format(other),
            },
            span,
        )),
    }
}

// ── Untyped literal lowering ───────────────────────────────────────────

/// Rewrite remaining literal primitives to their defaults (`i32`, `f32`).
pub fn resolve_untyped_type(ty: &mut ExpressionType) {
    match ty {
        ExpressionType::Primitive(p) => match p {
            PrimitiveType::IntLiteral => *p = PrimitiveType::Int32,
            PrimitiveType::FloatLiteral => *p = PrimitiveType::Float32,
            _ => {}
        },
        ExpressionType::Vector(v) => match v.component_type {
            PrimitiveType::IntLiteral => v.component_type = PrimitiveType::Int32,
            PrimitiveType::FloatLiteral => v.component_type = PrimitiveType::Float32,
            _ => {}
        },
        ExpressionType::Array(a) => resolve_untyped_type(&mut a.contained),
        _ => {}
    }
}

fn lower_scalar(
    scalar: &mut ScalarValue,
    target: PrimitiveType,
    span: Span,
) -> Result<(), CompileError> {
    let out_of_range = |value: String| {
        CompileError::new(
            CompileErrorKind::LiteralOutOfRange {
                type_name: target.name().into(),
                value,
            },
            span,
        )
    };

    match (&*scalar, target) {
        (ScalarValue::IntLiteral(v), PrimitiveType::Int32) => {
            let value = i32::try_from(*v).map_err(|_| out_of_range(v.to_string()))?;
            *scalar = ScalarValue::I32(value);
        }
        (ScalarValue::IntLiteral(v), PrimitiveType::UInt32) => {
            let value = u32::try_from(*v).map_err(|_| out_of_range(v.to_string()))?;
            *scalar = ScalarValue::U32(value);
        }
        (ScalarValue::IntLiteral(v), PrimitiveType::Float32) => {
            *scalar = ScalarValue::F32(*v as f32);
        }
        (ScalarValue::IntLiteral(v), PrimitiveType::Float64) => {
            *scalar = ScalarValue::F64(*v as f64);
        }
        (ScalarValue::FloatLiteral(v), PrimitiveType::Float32) => {
            *scalar = ScalarValue::F32(*v as f32);
        }
        (ScalarValue::FloatLiteral(v), PrimitiveType::Float64) => {
            *scalar = ScalarValue::F64(*v);
        }
        _ => {}
    }
    Ok(())
}

/// Lower untyped literal scalars and vectors inside `value` to the
/// `expected` type, with range checks.
pub fn resolve_untyped_value(
    expected: &ExpressionType,
    value: &mut ConstantValue,
    span: Span,
) -> Result<(), CompileError> {
    match (value, expected) {
        (ConstantValue::Scalar(scalar), ExpressionType::Primitive(p)) => {
            lower_scalar(scalar, *p, span)
        }
        (ConstantValue::Vector(components), ExpressionType::Vector(v)) => {
            for component in components {
                lower_scalar(component, v.component_type, span)?;
            }
            Ok(())
        }
        (ConstantValue::Array { values, element_type }, ExpressionType::Array(a)) => {
            for element in values {
                resolve_untyped_value(&a.contained, element, span)?;
            }
            if element_type.is_literal() {
                *element_type = (*a.contained).clone();
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Reject types that cannot back a concrete declaration: unsized arrays and
/// leaked untyped literals.
pub fn validate_concrete_type(ty: &ExpressionType, span: Span) -> Result<(), CompileError> {
    match ty {
        ExpressionType::Array(a) if a.length == 0 => {
            Err(CompileError::new(CompileErrorKind::ArrayLengthRequired, span))
        }
        _ if ty.is_literal() => Err(CompileError::new(CompileErrorKind::UnexpectedUntyped, span)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransformerContext;

    fn prim(p: PrimitiveType) -> ExpressionType {
        ExpressionType::Primitive(p)
    }

    fn vec_ty(count: u32, p: PrimitiveType) -> ExpressionType {
        ExpressionType::Vector(VectorType {
            component_count: count,
            component_type: p,
        })
    }

    #[test]
    fn literal_matches_concrete() {
        assert!(primitives_match(PrimitiveType::IntLiteral, PrimitiveType::Int32));
        assert!(primitives_match(PrimitiveType::IntLiteral, PrimitiveType::UInt32));
        assert!(!primitives_match(PrimitiveType::IntLiteral, PrimitiveType::Float32));
        assert!(primitives_match(PrimitiveType::FloatLiteral, PrimitiveType::Float64));
    }

    #[test]
    fn binary_add_unifies_literals() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let result = validate_binary_op(
            BinaryOp::Add,
            &prim(PrimitiveType::Int32),
            &prim(PrimitiveType::IntLiteral),
            Span::default(),
            &strf,
        )
        .unwrap();
        assert_eq!(result, prim(PrimitiveType::Int32));
    }

    #[test]
    fn binary_comparison_yields_bool() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let result = validate_binary_op(
            BinaryOp::CompLt,
            &prim(PrimitiveType::Float32),
            &prim(PrimitiveType::Float32),
            Span::default(),
            &strf,
        )
        .unwrap();
        assert_eq!(result, prim(PrimitiveType::Bool));

        // Ordering comparisons reject booleans.
        let err = validate_binary_op(
            BinaryOp::CompLt,
            &prim(PrimitiveType::Bool),
            &prim(PrimitiveType::Bool),
            Span::default(),
            &strf,
        )
        .unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::BinaryUnsupported { .. }));
    }

    #[test]
    fn vector_scalar_broadcast() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let result = validate_binary_op(
            BinaryOp::Multiply,
            &vec_ty(3, PrimitiveType::Float32),
            &prim(PrimitiveType::Float32),
            Span::default(),
            &strf,
        )
        .unwrap();
        assert_eq!(result, vec_ty(3, PrimitiveType::Float32));
    }

    #[test]
    fn swizzle_typing() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let source = vec_ty(3, PrimitiveType::Float32);

        let scalar = compute_swizzle_type(&source, &[1], Span::default(), &strf).unwrap();
        assert_eq!(scalar, prim(PrimitiveType::Float32));

        let shuffled = compute_swizzle_type(&source, &[2, 0], Span::default(), &strf).unwrap();
        assert_eq!(shuffled, vec_ty(2, PrimitiveType::Float32));

        // Component out of range.
        let err = compute_swizzle_type(&source, &[3], Span::default(), &strf).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::InvalidSwizzle { .. }));
    }

    #[test]
    fn scalar_single_letter_swizzle_is_allowed() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let ty = compute_swizzle_type(
            &prim(PrimitiveType::Float32),
            &[0],
            Span::default(),
            &strf,
        )
        .unwrap();
        assert_eq!(ty, prim(PrimitiveType::Float32));
    }

    #[test]
    fn cast_vector_from_components() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let target = vec_ty(3, PrimitiveType::Float32);
        let scalar = prim(PrimitiveType::Float32);
        let pair = vec_ty(2, PrimitiveType::Float32);

        validate_cast(&target, &[&pair, &scalar], Span::default(), &strf).unwrap();

        let err =
            validate_cast(&target, &[&pair, &pair], Span::default(), &strf).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::CastComponentMismatch { .. }));
    }

    #[test]
    fn lowering_checks_ranges() {
        let mut value = ConstantValue::int_literal(1 << 40);
        let err = resolve_untyped_value(
            &prim(PrimitiveType::Int32),
            &mut value,
            Span::default(),
        )
        .unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::LiteralOutOfRange { .. }));

        let mut ok = ConstantValue::int_literal(7);
        resolve_untyped_value(&prim(PrimitiveType::UInt32), &mut ok, Span::default()).unwrap();
        assert_eq!(ok, ConstantValue::u32_value(7));
    }
}
