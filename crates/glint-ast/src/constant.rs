//! Compile-time constant values.
//!
//! [`ConstantValue`] is what constant propagation produces and what option
//! values, attribute folds and unrolled loop counters are made of. Untyped
//! literals ([`ScalarValue::IntLiteral`]/[`ScalarValue::FloatLiteral`]) live
//! here too, until declaration boundaries lower them to concrete types.

use crate::ty::{ArrayType, ExpressionType, PrimitiveType, VectorType};

/// A single scalar constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    F32(f32),
    F64(f64),
    I32(i32),
    U32(u32),
    String(String),
    /// Untyped integer literal, kept at full width until lowered.
    IntLiteral(i64),
    /// Untyped float literal, kept at full width until lowered.
    FloatLiteral(f64),
}

impl ScalarValue {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            ScalarValue::Bool(_) => PrimitiveType::Bool,
            ScalarValue::F32(_) => PrimitiveType::Float32,
            ScalarValue::F64(_) => PrimitiveType::Float64,
            ScalarValue::I32(_) => PrimitiveType::Int32,
            ScalarValue::U32(_) => PrimitiveType::UInt32,
            ScalarValue::String(_) => PrimitiveType::String,
            ScalarValue::IntLiteral(_) => PrimitiveType::IntLiteral,
            ScalarValue::FloatLiteral(_) => PrimitiveType::FloatLiteral,
        }
    }
}

/// A compile-time value of any constant-capable type.
///
/// Vectors are 2 to 4 homogeneous scalars; arrays carry their element type
/// explicitly so empty arrays stay typed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Scalar(ScalarValue),
    Vector(Vec<ScalarValue>),
    Array {
        element_type: ExpressionType,
        values: Vec<ConstantValue>,
    },
}

impl ConstantValue {
    /// The type of this constant. Total: every constant has a type.
    pub fn constant_type(&self) -> ExpressionType {
        match self {
            ConstantValue::Scalar(scalar) => ExpressionType::Primitive(scalar.primitive_type()),
            ConstantValue::Vector(components) => ExpressionType::Vector(VectorType {
                component_count: components.len() as u32,
                component_type: components
                    .first()
                    .map(ScalarValue::primitive_type)
                    .unwrap_or(PrimitiveType::Bool),
            }),
            ConstantValue::Array {
                element_type,
                values,
            } => ExpressionType::Array(ArrayType {
                contained: Box::new(element_type.clone()),
                length: values.len() as u32,
            }),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstantValue::Scalar(ScalarValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// The value as an unsigned 32-bit integer, accepting untyped literals
    /// and non-negative `i32` values. Attribute folding wants this shape.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ConstantValue::Scalar(ScalarValue::U32(v)) => Some(*v),
            ConstantValue::Scalar(ScalarValue::I32(v)) => u32::try_from(*v).ok(),
            ConstantValue::Scalar(ScalarValue::IntLiteral(v)) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn bool_value(value: bool) -> Self {
        ConstantValue::Scalar(ScalarValue::Bool(value))
    }

    pub fn i32_value(value: i32) -> Self {
        ConstantValue::Scalar(ScalarValue::I32(value))
    }

    pub fn u32_value(value: u32) -> Self {
        ConstantValue::Scalar(ScalarValue::U32(value))
    }

    pub fn f32_value(value: f32) -> Self {
        ConstantValue::Scalar(ScalarValue::F32(value))
    }

    pub fn int_literal(value: i64) -> Self {
        ConstantValue::Scalar(ScalarValue::IntLiteral(value))
    }

    pub fn float_literal(value: f64) -> Self {
        ConstantValue::Scalar(ScalarValue::FloatLiteral(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_types() {
        assert_eq!(
            ConstantValue::i32_value(4).constant_type(),
            ExpressionType::Primitive(PrimitiveType::Int32)
        );
        assert_eq!(
            ConstantValue::int_literal(4).constant_type(),
            ExpressionType::Primitive(PrimitiveType::IntLiteral)
        );
    }

    #[test]
    fn vector_type_from_components() {
        let vec = ConstantValue::Vector(vec![ScalarValue::F32(0.0), ScalarValue::F32(1.0)]);
        assert_eq!(
            vec.constant_type(),
            ExpressionType::Vector(VectorType {
                component_count: 2,
                component_type: PrimitiveType::Float32,
            })
        );
    }

    #[test]
    fn array_type_tracks_length() {
        let arr = ConstantValue::Array {
            element_type: ExpressionType::Primitive(PrimitiveType::UInt32),
            values: vec![ConstantValue::u32_value(1), ConstantValue::u32_value(2)],
        };
        match arr.constant_type() {
            ExpressionType::Array(a) => {
                assert_eq!(a.length, 2);
                assert_eq!(*a.contained, ExpressionType::Primitive(PrimitiveType::UInt32));
            }
            other => panic!("expected array type, got {other:?}"),
        }
    }
}
