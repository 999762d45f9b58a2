//! Intrinsic call validation.
//!
//! Each intrinsic kind has a descriptor: an ordered list of parameter checks
//! and a rule deriving the result type. Validation runs over alias-resolved
//! argument types.

use glint_common::span::Span;

use glint_ast::intrinsic::IntrinsicKind;
use glint_ast::ty::{ExpressionType, MatrixType, PrimitiveType, VectorType};

use crate::error::{CompileError, CompileErrorKind};
use crate::ops;
use crate::stringify::TypeStringifier;

/// One positional parameter check.
#[derive(Debug, Clone, Copy)]
enum ParamCheck {
    /// Float scalar or float vector.
    FloatScalarOrVector,
    /// Numeric scalar or vector (integers included).
    Numeric,
    /// Float vector of any size.
    FloatVector,
    /// Float vector with exactly three components.
    FloatVector3,
    /// Any matrix.
    Matrix,
    /// A square matrix.
    SquareMatrix,
    /// Fixed or dynamically sized array.
    ArrayLike,
    /// A non-depth sampler.
    Sampler,
    /// A depth sampler.
    DepthSampler,
    /// A texture.
    Texture,
    /// Float vector/scalar with as many components as the sampler (param 0)
    /// has coordinate dimensions.
    SampleCoordinates,
    /// Integer vector/scalar addressing the texture (param 0).
    TexelCoordinates,
    /// A vec4 of the texture's base type (texel value for writes).
    TexelValue,
    /// `bool` or a boolean vector.
    BoolOrBoolVector,
    /// Primitive or vector operand (select's value operands).
    PrimitiveOrVector,
    /// Same type as parameter 0 (component-count and base barrier).
    SameAsParam0,
    /// Same type as parameter 1.
    SameAsParam1,
    /// Float scalar (depth comparison reference).
    FloatScalar,
}

/// How the result type is derived.
#[derive(Debug, Clone, Copy)]
enum ReturnRule {
    Param0,
    /// The component type of parameter 0 (dot, length, distance).
    Param0Component,
    /// Parameter 0 transposed (matrix).
    Param0Transposed,
    Param1,
    U32,
    /// vec4 of the sampled/texel base type of parameter 0.
    Vec4OfSampled,
    /// The sampled base type of parameter 0 (depth comparison result).
    SampledScalar,
    NoType,
}

fn descriptor(kind: IntrinsicKind) -> (&'static [ParamCheck], ReturnRule) {
    use IntrinsicKind::*;
    use ParamCheck::*;
    match kind {
        ArcCos | ArcCosh | ArcSin | ArcSinh | ArcTan | ArcTanh | Ceil | Cos | Cosh | DegToRad
        | Exp | Exp2 | Floor | Fract | InverseSqrt | Log | Log2 | RadToDeg | Round | RoundEven
        | Sin | Sinh | Sqrt | Tan | Tanh | Trunc => (&[FloatScalarOrVector], ReturnRule::Param0),
        Abs | Sign => (&[Numeric], ReturnRule::Param0),
        Min | Max => (&[Numeric, SameAsParam0], ReturnRule::Param0),
        Clamp => (&[Numeric, SameAsParam0, SameAsParam0], ReturnRule::Param0),
        Pow | ArcTan2 => (&[FloatScalarOrVector, SameAsParam0], ReturnRule::Param0),
        Lerp => (
            &[FloatScalarOrVector, SameAsParam0, SameAsParam0],
            ReturnRule::Param0,
        ),
        CrossProduct => (&[FloatVector3, SameAsParam0], ReturnRule::Param0),
        DotProduct => (&[FloatVector, SameAsParam0], ReturnRule::Param0Component),
        Distance => (&[FloatVector, SameAsParam0], ReturnRule::Param0Component),
        Length => (&[FloatVector], ReturnRule::Param0Component),
        Normalize => (&[FloatVector], ReturnRule::Param0),
        Reflect => (&[FloatVector, SameAsParam0], ReturnRule::Param0),
        MatrixInverse => (&[SquareMatrix], ReturnRule::Param0),
        MatrixTranspose => (&[Matrix], ReturnRule::Param0Transposed),
        Select => (
            &[BoolOrBoolVector, PrimitiveOrVector, SameAsParam1],
            ReturnRule::Param1,
        ),
        ArraySize => (&[ArrayLike], ReturnRule::U32),
        TextureSampleImplicitLod => (&[Sampler, SampleCoordinates], ReturnRule::Vec4OfSampled),
        TextureSampleImplicitLodDepthComp => (
            &[DepthSampler, SampleCoordinates, FloatScalar],
            ReturnRule::SampledScalar,
        ),
        TextureRead => (&[Texture, TexelCoordinates], ReturnRule::Vec4OfSampled),
        TextureWrite => (&[Texture, TexelCoordinates, TexelValue], ReturnRule::NoType),
    }
}

fn expected_type_error(
    index: u32,
    expected: &'static str,
    found: &ExpressionType,
    span: Span,
    strf: &TypeStringifier<'_>,
) -> CompileError {
    CompileError::new(
        CompileErrorKind::IntrinsicExpectedType {
            index,
            expected,
            found: strf.format(found),
        },
        span,
    )
}

fn float_scalar_or_vector(ty: &ExpressionType) -> bool {
    match ty {
        ExpressionType::Primitive(p) => p.is_floating(),
        ExpressionType::Vector(v) => v.component_type.is_floating(),
        _ => false,
    }
}

fn numeric(ty: &ExpressionType) -> bool {
    match ty {
        ExpressionType::Primitive(p) => p.is_numeric(),
        ExpressionType::Vector(v) => v.component_type.is_numeric(),
        _ => false,
    }
}

fn vector_components_for(ty: &ExpressionType) -> Option<u32> {
    match ty {
        ExpressionType::Primitive(_) => Some(1),
        ExpressionType::Vector(v) => Some(v.component_count),
        _ => None,
    }
}

/// The name used in diagnostics for `kind`.
fn display_name(kind: IntrinsicKind) -> &'static str {
    kind.function_name().unwrap_or(match kind {
        IntrinsicKind::ArraySize => "Size",
        IntrinsicKind::TextureRead => "Read",
        IntrinsicKind::TextureWrite => "Write",
        IntrinsicKind::TextureSampleImplicitLod => "Sample",
        IntrinsicKind::TextureSampleImplicitLodDepthComp => "SampleDepthComp",
        _ => "<intrinsic>",
    })
}

/// Validate an intrinsic call and compute its result type. `args` are the
/// alias-resolved argument types in call order (the object first for method
/// intrinsics).
pub fn validate_intrinsic(
    kind: IntrinsicKind,
    args: &[&ExpressionType],
    span: Span,
    strf: &TypeStringifier<'_>,
) -> Result<ExpressionType, CompileError> {
    let (checks, ret) = descriptor(kind);

    if args.len() != checks.len() {
        return Err(CompileError::new(
            CompileErrorKind::IntrinsicExpectedParameterCount {
                name: display_name(kind),
                count: checks.len() as u32,
            },
            span,
        ));
    }

    for (i, (check, ty)) in checks.iter().zip(args.iter()).enumerate() {
        let index = i as u32;
        let ty = *ty;
        match check {
            ParamCheck::FloatScalarOrVector => {
                if !float_scalar_or_vector(ty) {
                    return Err(expected_type_error(index, "floating", ty, span, strf));
                }
            }
            ParamCheck::Numeric => {
                if !numeric(ty) {
                    return Err(expected_type_error(index, "numeric", ty, span, strf));
                }
            }
            ParamCheck::FloatVector => match ty {
                ExpressionType::Vector(v) if v.component_type.is_floating() => {}
                _ => return Err(expected_type_error(index, "float vector", ty, span, strf)),
            },
            ParamCheck::FloatVector3 => match ty {
                ExpressionType::Vector(v)
                    if v.component_type.is_floating() && v.component_count == 3 => {}
                _ => {
                    return Err(expected_type_error(
                        index,
                        "three-component float vector",
                        ty,
                        span,
                        strf,
                    ))
                }
            },
            ParamCheck::Matrix => {
                if !ty.is_matrix() {
                    return Err(expected_type_error(index, "matrix", ty, span, strf));
                }
            }
            ParamCheck::SquareMatrix => match ty {
                ExpressionType::Matrix(m) if m.column_count == m.row_count => {}
                _ => return Err(expected_type_error(index, "square matrix", ty, span, strf)),
            },
            ParamCheck::ArrayLike => {
                if !ty.is_array() && !ty.is_dyn_array() {
                    return Err(expected_type_error(index, "array", ty, span, strf));
                }
            }
            ParamCheck::Sampler => match ty {
                ExpressionType::Sampler(s) if !s.depth => {}
                _ => return Err(expected_type_error(index, "sampler", ty, span, strf)),
            },
            ParamCheck::DepthSampler => match ty {
                ExpressionType::Sampler(s) if s.depth => {}
                _ => return Err(expected_type_error(index, "depth sampler", ty, span, strf)),
            },
            ParamCheck::Texture => {
                if !ty.is_texture() {
                    return Err(expected_type_error(index, "texture", ty, span, strf));
                }
            }
            ParamCheck::SampleCoordinates => {
                let ExpressionType::Sampler(sampler) = args[0] else {
                    return Err(expected_type_error(0, "sampler", args[0], span, strf));
                };
                let expected = sampler.dim.coordinate_count();
                let matches = match ty {
                    ExpressionType::Primitive(p) => expected == 1 && p.is_floating(),
                    ExpressionType::Vector(v) => {
                        v.component_count == expected && v.component_type.is_floating()
                    }
                    _ => false,
                };
                if !matches {
                    return Err(expected_type_error(
                        index,
                        "sampler coordinate",
                        ty,
                        span,
                        strf,
                    ));
                }
            }
            ParamCheck::TexelCoordinates => {
                let ExpressionType::Texture(texture) = args[0] else {
                    return Err(expected_type_error(0, "texture", args[0], span, strf));
                };
                let expected = texture.dim.coordinate_count();
                let matches = match ty {
                    ExpressionType::Primitive(p) => expected == 1 && p.is_integer(),
                    ExpressionType::Vector(v) => {
                        v.component_count == expected && v.component_type.is_integer()
                    }
                    _ => false,
                };
                if !matches {
                    return Err(expected_type_error(
                        index,
                        "texel coordinate",
                        ty,
                        span,
                        strf,
                    ));
                }
            }
            ParamCheck::TexelValue => {
                let ExpressionType::Texture(texture) = args[0] else {
                    return Err(expected_type_error(0, "texture", args[0], span, strf));
                };
                let matches = matches!(
                    ty,
                    ExpressionType::Vector(v)
                        if v.component_count == 4
                            && ops::primitives_match(v.component_type, texture.base_type)
                );
                if !matches {
                    return Err(expected_type_error(index, "texel value", ty, span, strf));
                }
            }
            ParamCheck::BoolOrBoolVector => {
                let matches = match ty {
                    ExpressionType::Primitive(PrimitiveType::Bool) => true,
                    ExpressionType::Vector(v) => v.component_type == PrimitiveType::Bool,
                    _ => false,
                };
                if !matches {
                    return Err(expected_type_error(index, "boolean", ty, span, strf));
                }
            }
            ParamCheck::PrimitiveOrVector => {
                if !ty.is_primitive() && !ty.is_vector() {
                    return Err(expected_type_error(
                        index,
                        "primitive or vector",
                        ty,
                        span,
                        strf,
                    ));
                }
                // A vector condition must match the value's component count.
                if let (Some(cond), Some(val)) =
                    (vector_components_for(args[0]), vector_components_for(ty))
                {
                    if args[0].is_vector() && cond != val {
                        return Err(CompileError::new(
                            CompileErrorKind::IntrinsicUnmatchingVecComponent {
                                left: strf.format(args[0]),
                                right: strf.format(ty),
                            },
                            span,
                        ));
                    }
                }
            }
            ParamCheck::SameAsParam0 | ParamCheck::SameAsParam1 => {
                let reference = if matches!(check, ParamCheck::SameAsParam0) {
                    args[0]
                } else {
                    args[1]
                };
                if !ops::types_match(reference, ty) {
                    return Err(CompileError::new(
                        CompileErrorKind::IntrinsicUnmatchingParameterType {
                            index,
                            left: strf.format(reference),
                            right: strf.format(ty),
                        },
                        span,
                    ));
                }
            }
            ParamCheck::FloatScalar => match ty {
                ExpressionType::Primitive(p) if p.is_floating() => {}
                _ => return Err(expected_type_error(index, "float scalar", ty, span, strf)),
            },
        }
    }

    let result = match ret {
        ReturnRule::Param0 => (*args[0]).clone(),
        ReturnRule::Param0Component => match args[0] {
            ExpressionType::Vector(v) => ExpressionType::Primitive(v.component_type),
            other => (*other).clone(),
        },
        ReturnRule::Param0Transposed => match args[0] {
            ExpressionType::Matrix(m) => ExpressionType::Matrix(MatrixType {
                column_count: m.row_count,
                row_count: m.column_count,
                component_type: m.component_type,
            }),
            other => (*other).clone(),
        },
        ReturnRule::Param1 => (*args[1]).clone(),
        ReturnRule::U32 => ExpressionType::Primitive(PrimitiveType::UInt32),
        ReturnRule::Vec4OfSampled => {
            let base = match args[0] {
                ExpressionType::Sampler(s) => s.sampled_type,
                ExpressionType::Texture(t) => t.base_type,
                _ => PrimitiveType::Float32,
            };
            ExpressionType::Vector(VectorType {
                component_count: 4,
                component_type: base,
            })
        }
        ReturnRule::SampledScalar => {
            let base = match args[0] {
                ExpressionType::Sampler(s) => s.sampled_type,
                _ => PrimitiveType::Float32,
            };
            ExpressionType::Primitive(base)
        }
        ReturnRule::NoType => ExpressionType::NoType,
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransformerContext;
    use glint_ast::ty::{ImageDim, SamplerType};

    fn vec_ty(count: u32, p: PrimitiveType) -> ExpressionType {
        ExpressionType::Vector(VectorType {
            component_count: count,
            component_type: p,
        })
    }

    #[test]
    fn dot_product_returns_component_type() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let v = vec_ty(3, PrimitiveType::Float32);
        let result =
            validate_intrinsic(IntrinsicKind::DotProduct, &[&v, &v], Span::default(), &strf)
                .unwrap();
        assert_eq!(result, ExpressionType::Primitive(PrimitiveType::Float32));
    }

    #[test]
    fn transpose_flips_dimensions() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let m = ExpressionType::Matrix(MatrixType {
            column_count: 2,
            row_count: 4,
            component_type: PrimitiveType::Float32,
        });
        let result =
            validate_intrinsic(IntrinsicKind::MatrixTranspose, &[&m], Span::default(), &strf)
                .unwrap();
        assert_eq!(
            result,
            ExpressionType::Matrix(MatrixType {
                column_count: 4,
                row_count: 2,
                component_type: PrimitiveType::Float32,
            })
        );
    }

    #[test]
    fn sample_coordinates_follow_sampler_dim() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let sampler = ExpressionType::Sampler(SamplerType {
            dim: ImageDim::Dim2D,
            sampled_type: PrimitiveType::Float32,
            depth: false,
        });
        let coords2 = vec_ty(2, PrimitiveType::Float32);
        let coords3 = vec_ty(3, PrimitiveType::Float32);

        let result = validate_intrinsic(
            IntrinsicKind::TextureSampleImplicitLod,
            &[&sampler, &coords2],
            Span::default(),
            &strf,
        )
        .unwrap();
        assert_eq!(result, vec_ty(4, PrimitiveType::Float32));

        let err = validate_intrinsic(
            IntrinsicKind::TextureSampleImplicitLod,
            &[&sampler, &coords3],
            Span::default(),
            &strf,
        )
        .unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::IntrinsicExpectedType { .. }));
    }

    #[test]
    fn arity_is_checked() {
        let context = TransformerContext::new();
        let strf = TypeStringifier::new(&context);
        let x = ExpressionType::Primitive(PrimitiveType::Float32);
        let err = validate_intrinsic(IntrinsicKind::Clamp, &[&x], Span::default(), &strf)
            .unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::IntrinsicExpectedParameterCount {
                name: "clamp",
                count: 3
            }
        );
    }
}
