//! Builtin intrinsic function kinds.
//!
//! Parameter checking and return-type computation live in the semantic
//! crate; this enum is the wire-level identity carried by intrinsic call
//! nodes and by `ExpressionType::IntrinsicFunction`.

/// Every intrinsic the language exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    Abs,
    ArcCos,
    ArcCosh,
    ArcSin,
    ArcSinh,
    ArcTan,
    ArcTan2,
    ArcTanh,
    ArraySize,
    Ceil,
    Clamp,
    Cos,
    Cosh,
    CrossProduct,
    DegToRad,
    Distance,
    DotProduct,
    Exp,
    Exp2,
    Floor,
    Fract,
    InverseSqrt,
    Length,
    Lerp,
    Log,
    Log2,
    MatrixInverse,
    MatrixTranspose,
    Max,
    Min,
    Normalize,
    Pow,
    RadToDeg,
    Reflect,
    Round,
    RoundEven,
    Select,
    Sign,
    Sin,
    Sinh,
    Sqrt,
    Tan,
    Tanh,
    TextureRead,
    TextureSampleImplicitLod,
    TextureSampleImplicitLodDepthComp,
    TextureWrite,
    Trunc,
}

impl IntrinsicKind {
    /// The source-level function name, or `None` for method-only intrinsics
    /// (texture/sampler/array methods have no free-function spelling).
    pub fn function_name(self) -> Option<&'static str> {
        use IntrinsicKind::*;
        Some(match self {
            Abs => "abs",
            ArcCos => "acos",
            ArcCosh => "acosh",
            ArcSin => "asin",
            ArcSinh => "asinh",
            ArcTan => "atan",
            ArcTan2 => "atan2",
            ArcTanh => "atanh",
            Ceil => "ceil",
            Clamp => "clamp",
            Cos => "cos",
            Cosh => "cosh",
            CrossProduct => "cross",
            DegToRad => "deg_to_rad",
            Distance => "distance",
            DotProduct => "dot",
            Exp => "exp",
            Exp2 => "exp2",
            Floor => "floor",
            Fract => "fract",
            InverseSqrt => "inverse_sqrt",
            Length => "length",
            Lerp => "lerp",
            Log => "log",
            Log2 => "log2",
            MatrixInverse => "inverse",
            MatrixTranspose => "transpose",
            Max => "max",
            Min => "min",
            Normalize => "normalize",
            Pow => "pow",
            RadToDeg => "rad_to_deg",
            Reflect => "reflect",
            Round => "round",
            RoundEven => "round_even",
            Select => "select",
            Sign => "sign",
            Sin => "sin",
            Sinh => "sinh",
            Sqrt => "sqrt",
            Tan => "tan",
            Tanh => "tanh",
            Trunc => "trunc",
            ArraySize | TextureRead | TextureSampleImplicitLod
            | TextureSampleImplicitLodDepthComp | TextureWrite => return None,
        })
    }

    /// All intrinsics, in registration order.
    pub fn all() -> &'static [IntrinsicKind] {
        use IntrinsicKind::*;
        &[
            Abs, ArcCos, ArcCosh, ArcSin, ArcSinh, ArcTan, ArcTan2, ArcTanh, ArraySize, Ceil,
            Clamp, Cos, Cosh, CrossProduct, DegToRad, Distance, DotProduct, Exp, Exp2, Floor,
            Fract, InverseSqrt, Length, Lerp, Log, Log2, MatrixInverse, MatrixTranspose, Max, Min,
            Normalize, Pow, RadToDeg, Reflect, Round, RoundEven, Select, Sign, Sin, Sinh, Sqrt,
            Tan, Tanh, TextureRead, TextureSampleImplicitLod, TextureSampleImplicitLodDepthComp,
            TextureWrite, Trunc,
        ]
    }
}
