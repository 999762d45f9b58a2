//! Type representation for the Glint type system.
//!
//! [`ExpressionType`] is the tagged variant covering every type the language
//! knows, from primitives and vectors up to shader resources (samplers,
//! textures, uniform/storage blocks) and the resolver-internal kinds (type
//! references, partial-type applications, methods, aliases).
//!
//! Matrix elements are always floating point. The `IntLiteral`/`FloatLiteral`
//! primitives exist only transiently on unresolved literals and are lowered
//! to concrete types before any backend sees the tree.

use crate::intrinsic::IntrinsicKind;

/// A primitive scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    Float32,
    Float64,
    Int32,
    UInt32,
    /// An untyped float literal, pending lowering to `f32`/`f64`.
    FloatLiteral,
    /// An untyped integer literal, pending lowering to `i32`/`u32`.
    IntLiteral,
    String,
}

impl PrimitiveType {
    /// Keyword-level name, used when no symbol table is needed.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Float32 => "f32",
            PrimitiveType::Float64 => "f64",
            PrimitiveType::Int32 => "i32",
            PrimitiveType::UInt32 => "u32",
            PrimitiveType::FloatLiteral => "{float literal}",
            PrimitiveType::IntLiteral => "{integer literal}",
            PrimitiveType::String => "string",
        }
    }

    pub fn is_literal(self) -> bool {
        matches!(self, PrimitiveType::FloatLiteral | PrimitiveType::IntLiteral)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveType::Bool | PrimitiveType::String)
    }

    pub fn is_floating(self) -> bool {
        matches!(
            self,
            PrimitiveType::Float32 | PrimitiveType::Float64 | PrimitiveType::FloatLiteral
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::IntLiteral
        )
    }
}

/// Dimensionality of a sampler or texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageDim {
    Dim1D,
    Dim1DArray,
    Dim2D,
    Dim2DArray,
    Dim3D,
    Cubemap,
}

impl ImageDim {
    /// Number of coordinate components needed to address the image.
    pub fn coordinate_count(self) -> u32 {
        match self {
            ImageDim::Dim1D => 1,
            ImageDim::Dim1DArray | ImageDim::Dim2D => 2,
            ImageDim::Dim2DArray | ImageDim::Dim3D | ImageDim::Cubemap => 3,
        }
    }
}

/// Read/write policy of a storage buffer or texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPolicy {
    Read,
    Write,
    ReadWrite,
}

/// Texel format of a writable texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Unknown,
    Rgba8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorType {
    /// 2 to 4.
    pub component_count: u32,
    pub component_type: PrimitiveType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixType {
    /// 2 to 4.
    pub column_count: u32,
    /// 2 to 4.
    pub row_count: u32,
    /// Always a floating type.
    pub component_type: PrimitiveType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub contained: Box<ExpressionType>,
    /// 0 means the length is not yet specified (filled from a cast arity).
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynArrayType {
    pub contained: Box<ExpressionType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerType {
    pub dim: ImageDim,
    pub sampled_type: PrimitiveType,
    pub depth: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureType {
    pub dim: ImageDim,
    pub base_type: PrimitiveType,
    pub access: AccessPolicy,
    pub format: ImageFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageType {
    pub struct_index: usize,
    pub access: AccessPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformType {
    pub struct_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantType {
    pub struct_index: usize,
}

/// A reference through an alias, keeping both the alias identity (for
/// diagnostics and alias-preserving output) and the resolved target.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasType {
    pub alias_index: usize,
    pub target: Box<ExpressionType>,
}

/// A method projected off an object (`sampler.Sample`, `array.Size`, ...).
/// Only ever appears as the cached type of a call target.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodType {
    pub method_index: u32,
    pub object: Box<ExpressionType>,
}

/// The type of any expression in the language.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionType {
    /// The absence of a type (`()`-like); functions without a return type.
    NoType,
    Primitive(PrimitiveType),
    Vector(VectorType),
    Matrix(MatrixType),
    Array(ArrayType),
    DynArray(DynArrayType),
    /// An *instance* of a struct, by index into the struct table.
    Struct(usize),
    /// A user-declared function, by index into the function table.
    Function(usize),
    /// A builtin intrinsic used as a call target.
    IntrinsicFunction(IntrinsicKind),
    Sampler(SamplerType),
    Texture(TextureType),
    Storage(StorageType),
    Uniform(UniformType),
    PushConstant(PushConstantType),
    Alias(AliasType),
    /// An imported module used as a namespace.
    Module(usize),
    /// A named external resource block used as a namespace.
    NamedExternalBlock(usize),
    Method(MethodType),
    /// A reference into the *type* table -- the type of an expression that
    /// denotes a type (e.g. the identifier `vec3`), distinct from an
    /// instantiated type.
    Type(usize),
}

impl ExpressionType {
    pub fn is_no_type(&self) -> bool {
        matches!(self, ExpressionType::NoType)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, ExpressionType::Primitive(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, ExpressionType::Vector(_))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, ExpressionType::Matrix(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ExpressionType::Array(_))
    }

    pub fn is_dyn_array(&self) -> bool {
        matches!(self, ExpressionType::DynArray(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, ExpressionType::Struct(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, ExpressionType::Function(_))
    }

    pub fn is_intrinsic_function(&self) -> bool {
        matches!(self, ExpressionType::IntrinsicFunction(_))
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, ExpressionType::Sampler(_))
    }

    pub fn is_texture(&self) -> bool {
        matches!(self, ExpressionType::Texture(_))
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, ExpressionType::Alias(_))
    }

    pub fn is_module(&self) -> bool {
        matches!(self, ExpressionType::Module(_))
    }

    pub fn is_method(&self) -> bool {
        matches!(self, ExpressionType::Method(_))
    }

    pub fn is_type_ref(&self) -> bool {
        matches!(self, ExpressionType::Type(_))
    }

    /// Whether this type transitively involves an untyped literal.
    pub fn is_literal(&self) -> bool {
        match self {
            ExpressionType::Primitive(p) => p.is_literal(),
            ExpressionType::Vector(v) => v.component_type.is_literal(),
            ExpressionType::Array(a) => a.contained.is_literal(),
            _ => false,
        }
    }

    /// Whether values of this type can exist at compile time (constants and
    /// option declarations).
    pub fn is_constant_type(&self) -> bool {
        match self {
            ExpressionType::Primitive(_) | ExpressionType::Vector(_) => true,
            ExpressionType::Array(a) => a.contained.is_constant_type(),
            _ => false,
        }
    }

    /// Whether this type carries struct fields that can be addressed --
    /// plain structs plus the external wrappers around them.
    pub fn is_struct_addressible(&self) -> bool {
        matches!(
            self,
            ExpressionType::Struct(_)
                | ExpressionType::Uniform(_)
                | ExpressionType::Storage(_)
                | ExpressionType::PushConstant(_)
        )
    }

    /// Chase alias indirections down to the underlying type.
    pub fn resolve_alias(&self) -> &ExpressionType {
        let mut ty = self;
        while let ExpressionType::Alias(alias) = ty {
            ty = &alias.target;
        }
        ty
    }

    /// The struct index carried by a struct-addressible type, if any.
    pub fn struct_index(&self) -> Option<usize> {
        match self.resolve_alias() {
            ExpressionType::Struct(index) => Some(*index),
            ExpressionType::Uniform(u) => Some(u.struct_index),
            ExpressionType::Storage(s) => Some(s.struct_index),
            ExpressionType::PushConstant(p) => Some(p.struct_index),
            _ => None,
        }
    }

    /// Re-wrap a struct field type in the uniform wrapper of its container.
    /// Non-struct field types pass through untouched.
    pub fn wrap_uniform(self) -> ExpressionType {
        match self.resolve_alias() {
            ExpressionType::Struct(index) => {
                ExpressionType::Uniform(UniformType { struct_index: *index })
            }
            _ => self,
        }
    }

    /// Re-wrap a struct field type in the storage wrapper of its container,
    /// inheriting the container's access policy.
    pub fn wrap_storage(self, access: AccessPolicy) -> ExpressionType {
        match self.resolve_alias() {
            ExpressionType::Struct(index) => ExpressionType::Storage(StorageType {
                struct_index: *index,
                access,
            }),
            _ => self,
        }
    }

    /// Strip an external wrapper (uniform/storage/push-constant), yielding
    /// the plain struct type underneath.
    pub fn unwrap_external(&self) -> ExpressionType {
        match self {
            ExpressionType::Uniform(u) => ExpressionType::Struct(u.struct_index),
            ExpressionType::Storage(s) => ExpressionType::Struct(s.struct_index),
            ExpressionType::PushConstant(p) => ExpressionType::Struct(p.struct_index),
            other => other.clone(),
        }
    }
}
