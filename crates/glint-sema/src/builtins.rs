//! Builtin registration.
//!
//! Populates the global environment of a compilation: primitive type names,
//! partial type constructors (`array`, `vecN`, `matN`, samplers, textures,
//! resource wrappers), intrinsic function names and the named builtin
//! constants. Feature-gated entries (`f64`, 1D images, primitive externals)
//! only register when the module enables the feature.

use glint_common::span::Span;

use glint_ast::constant::{ConstantValue, ScalarValue};
use glint_ast::intrinsic::IntrinsicKind;
use glint_ast::module::ModuleFeature;
use glint_ast::ty::{
    AccessPolicy, ArrayType, DynArrayType, ExpressionType, ImageDim, ImageFormat, MatrixType,
    PrimitiveType, SamplerType, TextureType, VectorType,
};

use crate::context::{
    ConstantData, IdentifierData, IdentifierKind, IntrinsicData, PartialType, TransformerContext,
    TypeContent, TypeData, TypeParameter, TypeParameterCategory, MAIN_MODULE_INDEX,
};
use crate::env::{EnvArena, EnvId};
use crate::error::{CompileError, CompileErrorKind};

fn expect_type(parameter: &TypeParameter) -> &ExpressionType {
    match parameter {
        TypeParameter::Type(ty) => ty,
        TypeParameter::Constant(_) => unreachable!("category-checked by the caller"),
    }
}

fn expect_constant(parameter: &TypeParameter) -> &ConstantValue {
    match parameter {
        TypeParameter::Constant(value) => value,
        TypeParameter::Type(_) => unreachable!("category-checked by the caller"),
    }
}

/// Map a folded access-policy constant to the policy enum.
pub fn access_policy_from_constant(value: &ConstantValue) -> Option<AccessPolicy> {
    match value.as_u32()? {
        0 => Some(AccessPolicy::Read),
        1 => Some(AccessPolicy::Write),
        2 => Some(AccessPolicy::ReadWrite),
        _ => None,
    }
}

fn array_length_from_constant(value: &ConstantValue, span: Span) -> Result<u32, CompileError> {
    let error = |shown: String| {
        CompileError::new(CompileErrorKind::ArrayLength { length: shown }, span)
    };
    match value {
        ConstantValue::Scalar(ScalarValue::IntLiteral(v)) => {
            if *v <= 0 || *v > i64::from(u32::MAX) {
                return Err(error(v.to_string()));
            }
            Ok(*v as u32)
        }
        ConstantValue::Scalar(ScalarValue::I32(v)) => {
            if *v <= 0 {
                return Err(error(v.to_string()));
            }
            Ok(*v as u32)
        }
        ConstantValue::Scalar(ScalarValue::U32(v)) => {
            if *v == 0 {
                return Err(error(v.to_string()));
            }
            Ok(*v)
        }
        other => Err(error(format!("{:?}", other.constant_type()))),
    }
}

struct BuiltinRegistrar<'a> {
    context: &'a mut TransformerContext,
    envs: &'a mut EnvArena,
    global_env: EnvId,
}

impl BuiltinRegistrar<'_> {
    fn register_identifier(&mut self, name: &str, index: usize, kind: IdentifierKind) {
        self.envs.register(
            self.global_env,
            name,
            IdentifierData {
                index,
                kind,
                conditional_index: 0,
            },
        );
    }

    fn register_full_type(&mut self, name: &str, ty: ExpressionType) -> Result<(), CompileError> {
        let index = self.context.types.register(
            TypeData {
                name: name.into(),
                content: TypeContent::Full(ty),
            },
            None,
            Span::default(),
        )?;
        self.register_identifier(name, index, IdentifierKind::Type);
        Ok(())
    }

    fn register_partial_type(
        &mut self,
        name: &str,
        partial: PartialType,
    ) -> Result<(), CompileError> {
        let index = self.context.types.register(
            TypeData {
                name: name.into(),
                content: TypeContent::Partial(partial),
            },
            None,
            Span::default(),
        )?;
        self.register_identifier(name, index, IdentifierKind::Type);
        Ok(())
    }

    fn register_intrinsic(
        &mut self,
        name: &str,
        kind: IntrinsicKind,
    ) -> Result<(), CompileError> {
        let index =
            self.context
                .intrinsics
                .register(IntrinsicData { kind }, None, Span::default())?;
        self.register_identifier(name, index, IdentifierKind::Intrinsic);
        Ok(())
    }

    fn register_constant(
        &mut self,
        name: &str,
        value: ConstantValue,
        index: usize,
    ) -> Result<(), CompileError> {
        let index = self.context.constants.register(
            ConstantData {
                module_index: MAIN_MODULE_INDEX,
                value: Some(value),
            },
            Some(index),
            Span::default(),
        )?;
        self.register_identifier(name, index, IdentifierKind::Constant);
        Ok(())
    }
}

/// Register every builtin into `global_env`.
pub fn register_builtins(
    context: &mut TransformerContext,
    envs: &mut EnvArena,
    global_env: EnvId,
    features: &[ModuleFeature],
) -> Result<(), CompileError> {
    let enabled = |feature: ModuleFeature| features.contains(&feature);
    let mut r = BuiltinRegistrar {
        context,
        envs,
        global_env,
    };

    // ── Primitive types ────────────────────────────────────────────────

    r.register_full_type("bool", ExpressionType::Primitive(PrimitiveType::Bool))?;
    r.register_full_type("f32", ExpressionType::Primitive(PrimitiveType::Float32))?;
    r.register_full_type("i32", ExpressionType::Primitive(PrimitiveType::Int32))?;
    r.register_full_type("u32", ExpressionType::Primitive(PrimitiveType::UInt32))?;
    if enabled(ModuleFeature::Float64) {
        r.register_full_type("f64", ExpressionType::Primitive(PrimitiveType::Float64))?;
    }

    // ── Arrays ─────────────────────────────────────────────────────────

    r.register_partial_type(
        "array",
        PartialType {
            parameters: vec![TypeParameterCategory::FullType],
            optional_parameters: vec![TypeParameterCategory::ConstantValue],
            build: Box::new(|parameters, span| {
                let contained = expect_type(&parameters[0]).clone();
                let length = match parameters.get(1) {
                    Some(parameter) => {
                        array_length_from_constant(expect_constant(parameter), span)?
                    }
                    None => 0,
                };
                Ok(ExpressionType::Array(ArrayType {
                    contained: Box::new(contained),
                    length,
                }))
            }),
        },
    )?;

    r.register_partial_type(
        "dyn_array",
        PartialType {
            parameters: vec![TypeParameterCategory::FullType],
            optional_parameters: vec![],
            build: Box::new(|parameters, _span| {
                Ok(ExpressionType::DynArray(DynArrayType {
                    contained: Box::new(expect_type(&parameters[0]).clone()),
                }))
            }),
        },
    )?;

    // ── Vectors and matrices ───────────────────────────────────────────

    for component_count in 2..=4u32 {
        r.register_partial_type(
            &format!("vec{component_count}"),
            PartialType {
                parameters: vec![TypeParameterCategory::PrimitiveType],
                optional_parameters: vec![],
                build: Box::new(move |parameters, _span| {
                    let ExpressionType::Primitive(component_type) = expect_type(&parameters[0])
                    else {
                        unreachable!("category-checked by the caller")
                    };
                    Ok(ExpressionType::Vector(VectorType {
                        component_count,
                        component_type: *component_type,
                    }))
                }),
            },
        )?;
    }

    for column_count in 2..=4u32 {
        for row_count in 2..=4u32 {
            let name = if column_count == row_count {
                format!("mat{column_count}")
            } else {
                format!("mat{column_count}x{row_count}")
            };
            r.register_partial_type(
                &name,
                PartialType {
                    parameters: vec![TypeParameterCategory::PrimitiveType],
                    optional_parameters: vec![],
                    build: Box::new(move |parameters, span| {
                        let ExpressionType::Primitive(component_type) =
                            expect_type(&parameters[0])
                        else {
                            unreachable!("category-checked by the caller")
                        };
                        if !matches!(
                            component_type,
                            PrimitiveType::Float32 | PrimitiveType::Float64
                        ) {
                            return Err(CompileError::new(
                                CompileErrorKind::MatrixExpectedFloat {
                                    found: component_type.name().into(),
                                },
                                span,
                            ));
                        }
                        Ok(ExpressionType::Matrix(MatrixType {
                            column_count,
                            row_count,
                            component_type: *component_type,
                        }))
                    }),
                },
            )?;
        }
    }

    // ── Samplers ───────────────────────────────────────────────────────

    let samplers: &[(&str, ImageDim, Option<ModuleFeature>, bool)] = &[
        ("sampler1D", ImageDim::Dim1D, Some(ModuleFeature::Texture1D), false),
        ("sampler1D_array", ImageDim::Dim1DArray, Some(ModuleFeature::Texture1D), false),
        ("sampler2D", ImageDim::Dim2D, None, false),
        ("sampler2D_array", ImageDim::Dim2DArray, None, false),
        ("sampler3D", ImageDim::Dim3D, None, false),
        ("sampler_cube", ImageDim::Cubemap, None, false),
        ("depth_sampler1D", ImageDim::Dim1D, Some(ModuleFeature::Texture1D), true),
        ("depth_sampler1D_array", ImageDim::Dim1DArray, Some(ModuleFeature::Texture1D), true),
        ("depth_sampler2D", ImageDim::Dim2D, None, true),
        ("depth_sampler2D_array", ImageDim::Dim2DArray, None, true),
        ("depth_sampler_cube", ImageDim::Cubemap, None, true),
    ];

    for &(name, dim, required_feature, depth) in samplers {
        if let Some(feature) = required_feature {
            if !enabled(feature) {
                continue;
            }
        }
        r.register_partial_type(
            name,
            PartialType {
                parameters: vec![TypeParameterCategory::PrimitiveType],
                optional_parameters: vec![],
                build: Box::new(move |parameters, span| {
                    let ExpressionType::Primitive(sampled_type) = expect_type(&parameters[0])
                    else {
                        unreachable!("category-checked by the caller")
                    };
                    if *sampled_type != PrimitiveType::Float32 {
                        return Err(CompileError::new(
                            CompileErrorKind::SamplerUnexpectedType {
                                found: sampled_type.name().into(),
                            },
                            span,
                        ));
                    }
                    Ok(ExpressionType::Sampler(SamplerType {
                        dim,
                        sampled_type: *sampled_type,
                        depth,
                    }))
                }),
            },
        )?;
    }

    // ── Textures ───────────────────────────────────────────────────────

    let textures: &[(&str, ImageDim, Option<ModuleFeature>)] = &[
        ("texture1D", ImageDim::Dim1D, Some(ModuleFeature::Texture1D)),
        ("texture1D_array", ImageDim::Dim1DArray, Some(ModuleFeature::Texture1D)),
        ("texture2D", ImageDim::Dim2D, None),
        ("texture2D_array", ImageDim::Dim2DArray, None),
        ("texture3D", ImageDim::Dim3D, None),
        ("texture_cube", ImageDim::Cubemap, None),
    ];

    for &(name, dim, required_feature) in textures {
        if let Some(feature) = required_feature {
            if !enabled(feature) {
                continue;
            }
        }
        r.register_partial_type(
            name,
            PartialType {
                parameters: vec![
                    TypeParameterCategory::PrimitiveType,
                    TypeParameterCategory::ConstantValue,
                ],
                optional_parameters: vec![TypeParameterCategory::ConstantValue],
                build: Box::new(move |parameters, span| {
                    let ExpressionType::Primitive(base_type) = expect_type(&parameters[0]) else {
                        unreachable!("category-checked by the caller")
                    };
                    if *base_type != PrimitiveType::Float32 {
                        return Err(CompileError::new(
                            CompileErrorKind::TextureUnexpectedType {
                                found: base_type.name().into(),
                            },
                            span,
                        ));
                    }

                    let access = access_policy_from_constant(expect_constant(&parameters[1]))
                        .ok_or_else(|| {
                            CompileError::new(CompileErrorKind::TextureUnexpectedAccess, span)
                        })?;

                    let format = match parameters.get(2) {
                        Some(parameter) => {
                            match expect_constant(parameter).as_u32() {
                                Some(0) => ImageFormat::Rgba8,
                                _ => {
                                    return Err(CompileError::new(
                                        CompileErrorKind::TextureUnexpectedFormat,
                                        span,
                                    ))
                                }
                            }
                        }
                        None => ImageFormat::Unknown,
                    };

                    Ok(ExpressionType::Texture(TextureType {
                        dim,
                        base_type: *base_type,
                        access,
                        format,
                    }))
                }),
            },
        )?;
    }

    // ── Resource wrappers ──────────────────────────────────────────────

    r.register_partial_type(
        "storage",
        PartialType {
            parameters: vec![TypeParameterCategory::StructType],
            optional_parameters: vec![TypeParameterCategory::ConstantValue],
            build: Box::new(|parameters, span| {
                let ExpressionType::Struct(struct_index) = expect_type(&parameters[0]) else {
                    unreachable!("category-checked by the caller")
                };
                let access = match parameters.get(1) {
                    Some(parameter) => {
                        access_policy_from_constant(expect_constant(parameter)).ok_or_else(
                            || CompileError::new(CompileErrorKind::StorageUnexpectedAccess, span),
                        )?
                    }
                    None => AccessPolicy::ReadWrite,
                };
                Ok(ExpressionType::Storage(glint_ast::ty::StorageType {
                    struct_index: *struct_index,
                    access,
                }))
            }),
        },
    )?;

    r.register_partial_type(
        "uniform",
        PartialType {
            parameters: vec![TypeParameterCategory::StructType],
            optional_parameters: vec![],
            build: Box::new(|parameters, _span| {
                let ExpressionType::Struct(struct_index) = expect_type(&parameters[0]) else {
                    unreachable!("category-checked by the caller")
                };
                Ok(ExpressionType::Uniform(glint_ast::ty::UniformType {
                    struct_index: *struct_index,
                }))
            }),
        },
    )?;

    r.register_partial_type(
        "push_constant",
        PartialType {
            parameters: vec![TypeParameterCategory::StructType],
            optional_parameters: vec![],
            build: Box::new(|parameters, _span| {
                let ExpressionType::Struct(struct_index) = expect_type(&parameters[0]) else {
                    unreachable!("category-checked by the caller")
                };
                Ok(ExpressionType::PushConstant(glint_ast::ty::PushConstantType {
                    struct_index: *struct_index,
                }))
            }),
        },
    )?;

    // ── Intrinsics ─────────────────────────────────────────────────────

    for &kind in IntrinsicKind::all() {
        if let Some(name) = kind.function_name() {
            r.register_intrinsic(name, kind)?;
        }
    }

    // ── Builtin constants ──────────────────────────────────────────────
    //
    // Fixed indices so every module of a compilation agrees on them.

    r.register_constant("pi", ConstantValue::float_literal(std::f64::consts::PI), 0)?;
    r.register_constant("tau", ConstantValue::float_literal(std::f64::consts::TAU), 1)?;
    r.register_constant("epsilon32", ConstantValue::f32_value(f32::EPSILON), 2)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_gated_types_stay_hidden() {
        let mut context = TransformerContext::new();
        let mut envs = EnvArena::new();
        let global = envs.alloc(None, "");
        register_builtins(&mut context, &mut envs, global, &[]).unwrap();

        assert!(envs.find(global, "vec3").is_some());
        assert!(envs.find(global, "sampler2D").is_some());
        assert!(envs.find(global, "f64").is_none());
        assert!(envs.find(global, "texture1D").is_none());

        let mut context = TransformerContext::new();
        let mut envs = EnvArena::new();
        let global = envs.alloc(None, "");
        register_builtins(
            &mut context,
            &mut envs,
            global,
            &[ModuleFeature::Float64, ModuleFeature::Texture1D],
        )
        .unwrap();
        assert!(envs.find(global, "f64").is_some());
        assert!(envs.find(global, "texture1D").is_some());
    }

    #[test]
    fn builtin_constants_use_fixed_indices() {
        let mut context = TransformerContext::new();
        let mut envs = EnvArena::new();
        let global = envs.alloc(None, "");
        register_builtins(&mut context, &mut envs, global, &[]).unwrap();

        let pi = envs.find(global, "pi").unwrap();
        assert_eq!(pi.index, 0);
        assert_eq!(pi.kind, IdentifierKind::Constant);
        let value = context
            .constants
            .retrieve(0, Span::default())
            .unwrap()
            .value
            .clone();
        assert_eq!(
            value,
            Some(ConstantValue::float_literal(std::f64::consts::PI))
        );
    }
}
