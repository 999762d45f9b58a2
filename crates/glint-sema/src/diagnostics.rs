//! Ariadne-based diagnostic rendering.
//!
//! Renders [`CompileError`] values into formatted, labeled reports. Output
//! is colorless so snapshots stay stable; the error code identifies the
//! error family independently of the message wording.

use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};

use crate::error::{CompileError, CompileErrorKind};

/// Stable error code of a [`CompileErrorKind`].
pub fn error_code(kind: &CompileErrorKind) -> &'static str {
    use CompileErrorKind::*;
    match kind {
        EmptyIdentifier | MissingExpression | NoIdentifier | NoIndex => "E0001",

        UnknownIdentifier { .. } => "E0100",
        IdentifierAlreadyUsed { .. } => "E0101",
        ReservedName { .. } | UnexpectedIdentifier { .. } => "E0102",
        AliasUnexpectedType { .. } => "E0103",
        CircularImport { .. } => "E0110",
        ModuleNotFound { .. } => "E0111",
        ModuleFeatureMismatch { .. } => "E0112",
        ModuleCompilationFailed { .. } => "E0113",
        NoModuleResolver => "E0114",
        ImportMultipleWildcard
        | ImportWildcardRename
        | ImportIdentifierAlreadyPresent { .. }
        | ImportIdentifierNotFound { .. } => "E0115",

        UnmatchingTypes { .. } | DeclarationTypeMismatch { .. } => "E0200",
        ConditionExpectedBool { .. } => "E0201",
        StructExpected { .. } => "E0202",
        FullTypeExpected { .. } | ExpectedPartialType { .. } => "E0203",
        PartialTypeTooFewParameters { .. }
        | PartialTypeTooManyParameters { .. }
        | PartialTypeParameterCategory { .. } => "E0204",
        BinaryUnsupported { .. } | BinaryIncompatibleTypes { .. } => "E0205",
        UnaryUnsupported { .. } => "E0206",
        CastComponentMismatch { .. }
        | CastIncompatibleTypes { .. }
        | CastIncompatibleBaseTypes { .. }
        | CastMatrixExpectedVectorOrScalar { .. }
        | CastMatrixVectorComponentMismatch { .. }
        | InvalidCast { .. } => "E0207",
        FunctionCallExpectedFunction
        | FunctionCallUnmatchingParameterCount { .. }
        | FunctionCallUnmatchingParameterType { .. }
        | FunctionCallUnexpectedEntryFunction { .. }
        | ExpectedIntrinsicFunction => "E0208",
        InvalidMethodIndex { .. } | UnknownMethod { .. } => "E0209",
        UnknownField { .. } | FieldUnexpectedType { .. } => "E0210",
        IndexOutOfBounds { .. }
        | IndexRequiresIntegerIndices { .. }
        | IndexStructRequiresInt32Indices { .. }
        | IndexUnexpectedType { .. } => "E0211",
        InvalidSwizzle { .. } | SwizzleUnexpectedType { .. } => "E0212",
        IntrinsicExpectedParameterCount { .. }
        | IntrinsicExpectedType { .. }
        | IntrinsicUnmatchingParameterType { .. }
        | IntrinsicUnmatchingVecComponent { .. } => "E0213",

        ConstantExpressionRequired => "E0300",
        LiteralOutOfRange { .. } => "E0301",
        AttributeRequiresValue
        | AttributeUnexpectedExpression
        | AttributeUnexpectedType { .. }
        | AttributeUnexpectedNegative { .. } => "E0302",
        UnexpectedUntyped => "E0303",

        AssignTemporary => "E0400",
        StructFieldMultiple { .. } => "E0401",
        StructFieldBuiltinLocation => "E0402",
        StructLayoutTypeNotAllowed { .. } | StructLayoutInnerMismatch { .. } => "E0403",
        EntryFunctionParameterNotStruct { .. }
        | EntryFunctionTooManyParameters { .. }
        | EntryStageAttributeMismatch { .. } => "E0404",
        DiscardOutsideFunction | DiscardOutsideFragmentStage { .. } => "E0405",
        LoopControlOutsideLoop { .. } => "E0406",
        ReturnOutsideFunction => "E0407",
        ExpectedConstantType { .. } => "E0408",
        ConstMissingExpression => "E0409",
        MissingOptionValue { .. } => "E0410",
        ExternalAlreadyDeclared { .. } | ExternalTypeNotAllowed { .. } => "E0411",
        ArrayLength { .. } | ArrayLengthRequired => "E0412",
        MatrixExpectedFloat { .. } => "E0413",
        SamplerUnexpectedType { .. }
        | TextureUnexpectedType { .. }
        | TextureUnexpectedAccess
        | TextureUnexpectedFormat
        | StorageUnexpectedAccess => "E0414",
        ForFromTypeExpectInteger { .. }
        | ForToUnmatchingType { .. }
        | ForEachUnsupportedType { .. } => "E0415",
        UnexpectedAccessedType => "E0416",

        Internal { .. }
        | InvalidIndex { .. }
        | InvalidConstantIndex { .. }
        | AlreadyUsedIndex { .. }
        | AlreadyUsedIndexPreregister { .. } => "E0900",
    }
}

/// A fix hint, when one plausibly exists.
fn fix_suggestion(kind: &CompileErrorKind) -> Option<&'static str> {
    match kind {
        CompileErrorKind::ConditionExpectedBool { .. } => {
            Some("use a boolean expression, e.g. `x != 0`")
        }
        CompileErrorKind::ConstantExpressionRequired => {
            Some("only constants, options and literals can appear here")
        }
        CompileErrorKind::ArrayLengthRequired => {
            Some("give the array an explicit length, e.g. `array[f32, 4]`")
        }
        CompileErrorKind::MissingOptionValue { .. } => {
            Some("add a default value or supply the option at compile time")
        }
        _ => None,
    }
}

/// Render a compile error into a formatted diagnostic string.
///
/// The output is colorless for consistent test snapshots.
pub fn render_diagnostic(error: &CompileError, source: &str, _filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Clamp to the source and keep the span non-empty for ariadne.
    let clamp = |range: Range<usize>| -> Range<usize> {
        let start = range.start.min(source_len);
        let end = range.end.min(source_len).max(start);
        if start == end {
            start..end.saturating_add(1).min(source_len)
        } else {
            start..end
        }
    };

    let span = clamp(error.span.to_range());
    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(error_code(&error.kind))
        .with_message(error.to_string())
        .with_config(config)
        .with_label(Label::new(span).with_message(error.to_string()));

    if let Some(hint) = fix_suggestion(&error.kind) {
        builder = builder.with_help(hint);
    }

    let mut buf = Vec::new();
    builder
        .finish()
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_common::span::Span;

    #[test]
    fn renders_code_and_message() {
        let err = CompileError::new(
            CompileErrorKind::UnknownIdentifier { name: "foo".into() },
            Span::new(4, 7),
        );
        let out = render_diagnostic(&err, "let foo = 1;", "shader.gsl");
        assert!(out.contains("E0100"), "missing code in: {out}");
        assert!(out.contains("unknown identifier `foo`"), "missing message in: {out}");
    }
}
