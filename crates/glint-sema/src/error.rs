//! Compilation errors.
//!
//! Every failure the semantic core can produce is a value: a
//! [`CompileErrorKind`] plus the source span of the offending node. Type
//! names inside error payloads are pre-rendered strings -- the stringifier
//! is the only component that formats types, and it runs at error
//! construction time while the symbol tables are still at hand.

use std::fmt;

use serde::Serialize;

use glint_common::arena::{ArenaError, ArenaErrorKind};
use glint_common::span::Span;

/// A typed compilation failure with a source location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The specific kind of compilation error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CompileErrorKind {
    // ── Parse-structural ───────────────────────────────────────────────
    /// An identifier slot holds an empty name.
    EmptyIdentifier,
    /// A mandatory expression is missing.
    MissingExpression,
    /// An access chain has no identifier segments.
    NoIdentifier,
    /// An index access carries no (or more than one) index.
    NoIndex,

    // ── Name resolution ────────────────────────────────────────────────
    UnknownIdentifier { name: String },
    IdentifierAlreadyUsed { name: String },
    ReservedName { name: String },
    UnexpectedIdentifier { name: String },
    AliasUnexpectedType { type_name: String },
    CircularImport { module_name: String },
    ModuleNotFound { module_name: String },
    ModuleFeatureMismatch { module_name: String, feature: String },
    ModuleCompilationFailed { module_name: String, error: String },
    NoModuleResolver,
    ImportMultipleWildcard,
    ImportWildcardRename,
    ImportIdentifierAlreadyPresent { name: String },
    ImportIdentifierNotFound { names: String, module_name: String },

    // ── Type mismatches ────────────────────────────────────────────────
    UnmatchingTypes { left: String, right: String },
    DeclarationTypeMismatch { declared: String, initializer: String },
    ConditionExpectedBool { found: String },
    StructExpected { found: String },
    FullTypeExpected { found: String },
    ExpectedPartialType { found: String },
    PartialTypeTooFewParameters { expected: u32, found: u32 },
    PartialTypeTooManyParameters { expected: u32, found: u32 },
    PartialTypeParameterCategory { category: &'static str, index: u32 },
    BinaryUnsupported { side: &'static str, type_name: String },
    BinaryIncompatibleTypes { left: String, right: String },
    UnaryUnsupported { type_name: String },
    CastComponentMismatch { from: u32, to: u32 },
    CastIncompatibleTypes { from: String, to: String },
    CastIncompatibleBaseTypes { from: String, to: String },
    CastMatrixExpectedVectorOrScalar { found: String },
    CastMatrixVectorComponentMismatch { found: u32, expected: u32 },
    InvalidCast { to: String },
    FunctionCallExpectedFunction,
    FunctionCallUnmatchingParameterCount { function: String, expected: u32, found: u32 },
    FunctionCallUnmatchingParameterType { function: String, index: u32, expected: String, found: String },
    FunctionCallUnexpectedEntryFunction { function: String },
    ExpectedIntrinsicFunction,
    InvalidMethodIndex { index: u32, type_name: String },
    UnknownMethod { type_name: String, method: String },
    UnknownField { field: String },
    FieldUnexpectedType { type_name: String },
    IndexOutOfBounds { kind: &'static str, index: i64 },
    IndexRequiresIntegerIndices { found: String },
    IndexStructRequiresInt32Indices { found: String },
    IndexUnexpectedType { found: String },
    InvalidSwizzle { swizzle: String },
    SwizzleUnexpectedType { found: String },
    IntrinsicExpectedParameterCount { name: &'static str, count: u32 },
    IntrinsicExpectedType { index: u32, expected: &'static str, found: String },
    IntrinsicUnmatchingParameterType { index: u32, left: String, right: String },
    IntrinsicUnmatchingVecComponent { left: String, right: String },

    // ── Constant evaluation ────────────────────────────────────────────
    ConstantExpressionRequired,
    LiteralOutOfRange { type_name: String, value: String },
    AttributeRequiresValue,
    AttributeUnexpectedExpression,
    AttributeUnexpectedType { expected: String, found: String },
    AttributeUnexpectedNegative { value: String },
    UnexpectedUntyped,

    // ── Semantic policy ────────────────────────────────────────────────
    AssignTemporary,
    StructFieldMultiple { field: String },
    StructFieldBuiltinLocation,
    StructLayoutTypeNotAllowed { type_name: String, layout: String },
    StructLayoutInnerMismatch { outer: String, inner: String },
    EntryFunctionParameterNotStruct { function: String },
    EntryFunctionTooManyParameters { function: String },
    EntryStageAttributeMismatch { attribute: &'static str },
    DiscardOutsideFunction,
    DiscardOutsideFragmentStage { stage: String },
    LoopControlOutsideLoop { control: &'static str },
    ReturnOutsideFunction,
    ExpectedConstantType { found: String },
    ConstMissingExpression,
    MissingOptionValue { name: String },
    ExternalAlreadyDeclared { name: String },
    ExternalTypeNotAllowed { name: String, type_name: String },
    ArrayLength { length: String },
    ArrayLengthRequired,
    MatrixExpectedFloat { found: String },
    SamplerUnexpectedType { found: String },
    TextureUnexpectedType { found: String },
    TextureUnexpectedAccess,
    TextureUnexpectedFormat,
    StorageUnexpectedAccess,
    ForFromTypeExpectInteger { found: String },
    ForToUnmatchingType { from: String, to: String },
    ForEachUnsupportedType { found: String },
    UnexpectedAccessedType,

    // ── Internal ───────────────────────────────────────────────────────
    /// An invariant the resolver itself maintains was violated: a bug.
    Internal { message: String },
    InvalidIndex { index: usize },
    InvalidConstantIndex { index: usize },
    AlreadyUsedIndex { index: usize },
    AlreadyUsedIndexPreregister { index: usize },
}

impl From<ArenaError> for CompileError {
    fn from(err: ArenaError) -> Self {
        let kind = match err.kind {
            ArenaErrorKind::AlreadyUsedIndex => CompileErrorKind::AlreadyUsedIndex { index: err.index },
            ArenaErrorKind::AlreadyUsedIndexPreregister => {
                CompileErrorKind::AlreadyUsedIndexPreregister { index: err.index }
            }
            ArenaErrorKind::InvalidIndex => CompileErrorKind::InvalidIndex { index: err.index },
        };
        CompileError::new(kind, err.span)
    }
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CompileErrorKind::*;
        match self {
            EmptyIdentifier => write!(f, "empty identifier"),
            MissingExpression => write!(f, "missing expression"),
            NoIdentifier => write!(f, "accessed expression has no identifier"),
            NoIndex => write!(f, "index access expects exactly one index"),

            UnknownIdentifier { name } => write!(f, "unknown identifier `{name}`"),
            IdentifierAlreadyUsed { name } => write!(f, "identifier `{name}` is already used"),
            ReservedName { name } => write!(f, "`{name}` is a reserved name"),
            UnexpectedIdentifier { name } => write!(f, "unexpected identifier `{name}`"),
            AliasUnexpectedType { type_name } => {
                write!(f, "cannot alias a value of type `{type_name}`")
            }
            CircularImport { module_name } => {
                write!(f, "circular import of module `{module_name}`")
            }
            ModuleNotFound { module_name } => write!(f, "module `{module_name}` not found"),
            ModuleFeatureMismatch { module_name, feature } => write!(
                f,
                "module `{module_name}` requires feature `{feature}` which is not enabled"
            ),
            ModuleCompilationFailed { module_name, error } => {
                write!(f, "failed to compile module `{module_name}`: {error}")
            }
            NoModuleResolver => write!(f, "no module resolver configured, cannot import"),
            ImportMultipleWildcard => write!(f, "only one wildcard import is allowed"),
            ImportWildcardRename => write!(f, "a wildcard import cannot be renamed"),
            ImportIdentifierAlreadyPresent { name } => {
                write!(f, "symbol `{name}` is imported multiple times")
            }
            ImportIdentifierNotFound { names, module_name } => {
                write!(f, "module `{module_name}` does not export `{names}`")
            }

            UnmatchingTypes { left, right } => {
                write!(f, "unmatching types: `{left}` vs `{right}`")
            }
            DeclarationTypeMismatch { declared, initializer } => write!(
                f,
                "declared type `{declared}` does not match initializer type `{initializer}`"
            ),
            ConditionExpectedBool { found } => {
                write!(f, "condition must be `bool`, found `{found}`")
            }
            StructExpected { found } => write!(f, "expected a struct type, found `{found}`"),
            FullTypeExpected { found } => {
                write!(f, "expected a fully-specified type, found `{found}`")
            }
            ExpectedPartialType { found } => {
                write!(f, "`{found}` is not a parameterized type")
            }
            PartialTypeTooFewParameters { expected, found } => write!(
                f,
                "too few type parameters: expected at least {expected}, found {found}"
            ),
            PartialTypeTooManyParameters { expected, found } => write!(
                f,
                "too many type parameters: expected at most {expected}, found {found}"
            ),
            PartialTypeParameterCategory { category, index } => {
                write!(f, "type parameter {index} must be a {category} type")
            }
            BinaryUnsupported { side, type_name } => write!(
                f,
                "binary operation not supported on {side} operand of type `{type_name}`"
            ),
            BinaryIncompatibleTypes { left, right } => {
                write!(f, "incompatible operand types `{left}` and `{right}`")
            }
            UnaryUnsupported { type_name } => {
                write!(f, "unary operation not supported on type `{type_name}`")
            }
            CastComponentMismatch { from, to } => write!(
                f,
                "cast component count mismatch: expression provides {from}, target needs {to}"
            ),
            CastIncompatibleTypes { from, to } => {
                write!(f, "cannot cast `{from}` to `{to}`")
            }
            CastIncompatibleBaseTypes { from, to } => {
                write!(f, "cannot convert base type `{from}` to `{to}`")
            }
            CastMatrixExpectedVectorOrScalar { found } => write!(
                f,
                "matrix cast expects column vectors or scalars, found `{found}`"
            ),
            CastMatrixVectorComponentMismatch { found, expected } => write!(
                f,
                "matrix cast column has {found} components, expected {expected}"
            ),
            InvalidCast { to } => write!(f, "invalid cast to `{to}`"),
            FunctionCallExpectedFunction => write!(f, "expected a function to call"),
            FunctionCallUnmatchingParameterCount { function, expected, found } => write!(
                f,
                "function `{function}` expects {expected} argument(s), found {found}"
            ),
            FunctionCallUnmatchingParameterType { function, index, expected, found } => write!(
                f,
                "argument {index} of `{function}` expects `{expected}`, found `{found}`"
            ),
            FunctionCallUnexpectedEntryFunction { function } => {
                write!(f, "entry function `{function}` cannot be called")
            }
            ExpectedIntrinsicFunction => write!(f, "expected an intrinsic function"),
            InvalidMethodIndex { index, type_name } => {
                write!(f, "invalid method index {index} on type `{type_name}`")
            }
            UnknownMethod { type_name, method } => {
                write!(f, "type `{type_name}` has no method `{method}`")
            }
            UnknownField { field } => write!(f, "unknown field `{field}`"),
            FieldUnexpectedType { type_name } => {
                write!(f, "type `{type_name}` has no fields")
            }
            IndexOutOfBounds { kind, index } => {
                write!(f, "{kind} index {index} is out of bounds")
            }
            IndexRequiresIntegerIndices { found } => {
                write!(f, "indices must be integers, found `{found}`")
            }
            IndexStructRequiresInt32Indices { found } => {
                write!(f, "struct indices must be `i32`, found `{found}`")
            }
            IndexUnexpectedType { found } => {
                write!(f, "type `{found}` cannot be indexed")
            }
            InvalidSwizzle { swizzle } => write!(f, "invalid swizzle `{swizzle}`"),
            SwizzleUnexpectedType { found } => {
                write!(f, "cannot swizzle a value of type `{found}`")
            }
            IntrinsicExpectedParameterCount { name, count } => {
                write!(f, "`{name}` expects {count} parameter(s)")
            }
            IntrinsicExpectedType { index, expected, found } => write!(
                f,
                "intrinsic parameter {index} expects a {expected} type, found `{found}`"
            ),
            IntrinsicUnmatchingParameterType { index, left, right } => write!(
                f,
                "intrinsic parameter {index} of type `{right}` does not match `{left}`"
            ),
            IntrinsicUnmatchingVecComponent { left, right } => write!(
                f,
                "vector component counts do not match: `{left}` vs `{right}`"
            ),

            ConstantExpressionRequired => write!(f, "a constant expression is required here"),
            LiteralOutOfRange { type_name, value } => {
                write!(f, "literal `{value}` is out of range for `{type_name}`")
            }
            AttributeRequiresValue => write!(f, "attribute requires a value"),
            AttributeUnexpectedExpression => {
                write!(f, "attribute does not accept an expression")
            }
            AttributeUnexpectedType { expected, found } => {
                write!(f, "attribute expects `{expected}`, found `{found}`")
            }
            AttributeUnexpectedNegative { value } => {
                write!(f, "attribute value `{value}` cannot be negative")
            }
            UnexpectedUntyped => write!(f, "untyped literal leaked past its declaration"),

            AssignTemporary => write!(f, "cannot assign to a temporary value"),
            StructFieldMultiple { field } => {
                write!(f, "struct field `{field}` is defined multiple times")
            }
            StructFieldBuiltinLocation => write!(
                f,
                "a struct field cannot carry both a builtin and a location"
            ),
            StructLayoutTypeNotAllowed { type_name, layout } => {
                write!(f, "type `{type_name}` is not allowed in a `{layout}` struct")
            }
            StructLayoutInnerMismatch { outer, inner } => write!(
                f,
                "nested struct layout `{inner}` does not match outer layout `{outer}`"
            ),
            EntryFunctionParameterNotStruct { function } => write!(
                f,
                "entry function `{function}` parameter must be a struct"
            ),
            EntryFunctionTooManyParameters { function } => write!(
                f,
                "entry function `{function}` takes at most one parameter"
            ),
            EntryStageAttributeMismatch { attribute } => write!(
                f,
                "attribute `{attribute}` is not allowed on this entry stage"
            ),
            DiscardOutsideFunction => write!(f, "`discard` outside of a function"),
            DiscardOutsideFragmentStage { stage } => {
                write!(f, "`discard` is only allowed in fragment stage, not {stage}")
            }
            LoopControlOutsideLoop { control } => {
                write!(f, "`{control}` outside of a loop")
            }
            ReturnOutsideFunction => write!(f, "`return` outside of a function"),
            ExpectedConstantType { found } => {
                write!(f, "`{found}` cannot be used as a constant type")
            }
            ConstMissingExpression => write!(f, "constant declaration requires a value"),
            MissingOptionValue { name } => {
                write!(f, "option `{name}` has no value and no default")
            }
            ExternalAlreadyDeclared { name } => {
                write!(f, "external variable `{name}` is already declared")
            }
            ExternalTypeNotAllowed { name, type_name } => write!(
                f,
                "external variable `{name}` has unsupported type `{type_name}`"
            ),
            ArrayLength { length } => write!(f, "invalid array length `{length}`"),
            ArrayLengthRequired => write!(f, "array length is required here"),
            MatrixExpectedFloat { found } => {
                write!(f, "matrix element type must be floating, found `{found}`")
            }
            SamplerUnexpectedType { found } => {
                write!(f, "sampler element type must be `f32`, found `{found}`")
            }
            TextureUnexpectedType { found } => {
                write!(f, "texture element type must be `f32`, found `{found}`")
            }
            TextureUnexpectedAccess => write!(f, "invalid texture access policy"),
            TextureUnexpectedFormat => write!(f, "unsupported texture format"),
            StorageUnexpectedAccess => write!(f, "invalid storage access policy"),
            ForFromTypeExpectInteger { found } => write!(
                f,
                "loop counter must have an integer type, found `{found}`"
            ),
            ForToUnmatchingType { from, to } => write!(
                f,
                "loop bound type `{to}` does not match counter type `{from}`"
            ),
            ForEachUnsupportedType { found } => {
                write!(f, "cannot iterate over a value of type `{found}`")
            }
            UnexpectedAccessedType => write!(f, "this type cannot be accessed with `.`"),

            Internal { message } => write!(f, "internal error: {message}"),
            InvalidIndex { index } => write!(f, "internal error: invalid index {index}"),
            InvalidConstantIndex { index } => {
                write!(f, "internal error: invalid constant index {index}")
            }
            AlreadyUsedIndex { index } => {
                write!(f, "internal error: index {index} is already used")
            }
            AlreadyUsedIndexPreregister { index } => write!(
                f,
                "internal error: cannot preregister already-used index {index}"
            ),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = CompileError::new(
            CompileErrorKind::UnknownIdentifier { name: "foo".into() },
            Span::new(0, 3),
        );
        assert_eq!(err.to_string(), "unknown identifier `foo`");
    }

    #[test]
    fn arena_errors_convert() {
        let err: CompileError = ArenaError {
            kind: ArenaErrorKind::InvalidIndex,
            index: 12,
            span: Span::new(4, 5),
        }
        .into();
        assert_eq!(err.kind, CompileErrorKind::InvalidIndex { index: 12 });
        assert_eq!(err.span, Span::new(4, 5));
    }
}
