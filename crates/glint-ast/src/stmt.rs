//! Statement nodes.
//!
//! Statements carry their source span; declaration statements additionally
//! carry an `Option<usize>` symbol index that the resolver fills and that
//! stays stable across re-runs (preregistration).

use glint_common::span::Span;

use crate::expr::{Expression, ExprValue};
use crate::module::ShaderStage;
use crate::ty::ExpressionType;

/// Loop unrolling request carried by `@unroll` attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopUnroll {
    Always,
    Hint,
    Never,
}

/// Memory layout of a struct used through a uniform/storage block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLayout {
    Std140,
    Std430,
}

impl MemoryLayout {
    pub fn name(self) -> &'static str {
        match self {
            MemoryLayout::Std140 => "std140",
            MemoryLayout::Std430 => "std430",
        }
    }
}

/// Stage-provided struct member values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinEntry {
    Position,
    FragCoord,
    FragDepth,
    VertexIndex,
    InstanceIndex,
    GlobalInvocationIndices,
    LocalInvocationIndices,
    WorkgroupIndices,
}

/// Interpolation qualifier of a varying struct member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationQualifier {
    Flat,
    NoPerspective,
    Smooth,
}

/// Depth output mode of a fragment entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthWriteMode {
    Greater,
    Less,
    Replace,
    Unchanged,
}

/// One `cond => statement` arm of a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct CondStatement {
    pub condition: Expression,
    pub statement: Box<Statement>,
}

/// `if` / `const if` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchStatement {
    pub span: Span,
    /// `const if`: conditions must fold and the taken arm replaces the node.
    pub is_const: bool,
    pub cond_statements: Vec<CondStatement>,
    pub else_statement: Option<Box<Statement>>,
}

/// `#[cond(expr)] statement` -- a statement guarded by a compile-time
/// condition. Unresolvable conditions tag nested declarations with a fresh
/// conditional index.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalStatement {
    pub span: Span,
    pub condition: Expression,
    pub statement: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareAliasStatement {
    pub span: Span,
    pub name: String,
    pub alias_index: Option<usize>,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareConstStatement {
    pub span: Span,
    pub name: String,
    pub const_index: Option<usize>,
    pub ty: ExprValue<ExpressionType>,
    pub expression: Option<Expression>,
    pub is_exported: ExprValue<bool>,
}

/// One resource inside an `external` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalVar {
    pub span: Span,
    pub name: String,
    pub ty: ExprValue<ExpressionType>,
    pub binding_set: ExprValue<u32>,
    pub binding_index: ExprValue<u32>,
    pub var_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareExternalStatement {
    pub span: Span,
    /// Empty for anonymous blocks; named blocks open their own namespace.
    pub name: String,
    pub external_index: Option<usize>,
    pub binding_set: ExprValue<u32>,
    pub auto_binding: ExprValue<bool>,
    pub external_vars: Vec<ExternalVar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParameter {
    pub span: Span,
    pub name: String,
    pub ty: ExprValue<ExpressionType>,
    pub var_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareFunctionStatement {
    pub span: Span,
    pub name: String,
    pub func_index: Option<usize>,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: ExprValue<ExpressionType>,
    pub body: Vec<Statement>,
    pub entry_stage: ExprValue<ShaderStage>,
    pub is_exported: ExprValue<bool>,
    pub depth_write: ExprValue<DepthWriteMode>,
    pub early_fragment_tests: ExprValue<bool>,
    pub workgroup_size: ExprValue<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareOptionStatement {
    pub span: Span,
    pub name: String,
    pub opt_index: Option<usize>,
    pub opt_type: ExprValue<ExpressionType>,
    pub default_value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub span: Span,
    pub name: String,
    pub ty: ExprValue<ExpressionType>,
    /// Compile-time member condition; a false condition disables the member.
    pub cond: ExprValue<bool>,
    pub builtin: ExprValue<BuiltinEntry>,
    pub interp: ExprValue<InterpolationQualifier>,
    pub location_index: ExprValue<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDescription {
    pub name: String,
    pub layout: ExprValue<MemoryLayout>,
    /// Conditional index active when the struct was declared.
    pub condition_index: u32,
    pub members: Vec<StructMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareStructStatement {
    pub span: Span,
    pub struct_index: Option<usize>,
    pub is_exported: ExprValue<bool>,
    pub description: StructDescription,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareVariableStatement {
    pub span: Span,
    pub name: String,
    pub var_index: Option<usize>,
    pub ty: ExprValue<ExpressionType>,
    pub initial_expression: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscardStatement {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub span: Span,
    pub expression: Expression,
}

/// `for name in from -> to [: step] body`, counting loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub span: Span,
    pub var_name: String,
    pub var_index: Option<usize>,
    pub from_expr: Expression,
    pub to_expr: Expression,
    pub step_expr: Option<Expression>,
    pub unroll: ExprValue<LoopUnroll>,
    pub statement: Box<Statement>,
}

/// `for name in array body`, element loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachStatement {
    pub span: Span,
    pub var_name: String,
    pub var_index: Option<usize>,
    pub expression: Expression,
    pub unroll: ExprValue<LoopUnroll>,
    pub statement: Box<Statement>,
}

/// One imported symbol: named (optionally renamed) or the wildcard (empty
/// identifier).
#[derive(Debug, Clone, PartialEq)]
pub struct ImportIdentifier {
    pub span: Span,
    pub identifier: String,
    pub renamed_identifier: String,
    pub renamed_span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportStatement {
    pub span: Span,
    /// The name handed to the module resolver (path, url, logical name).
    pub module_name: String,
    /// The identifier a plain `import M;` binds the module to. Empty means
    /// derive one from the resolved module's name.
    pub module_identifier: String,
    /// Selective imports; empty means the module itself is imported.
    pub identifiers: Vec<ImportIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiStatement {
    pub span: Span,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoOpStatement {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub span: Span,
    pub expression: Option<Expression>,
}

/// A statement executed inside its own lexical scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedStatement {
    pub span: Span,
    pub statement: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub span: Span,
    pub condition: Expression,
    pub statement: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakStatement {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinueStatement {
    pub span: Span,
}

/// Any statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Branch(BranchStatement),
    Break(BreakStatement),
    Conditional(ConditionalStatement),
    Continue(ContinueStatement),
    DeclareAlias(DeclareAliasStatement),
    DeclareConst(DeclareConstStatement),
    DeclareExternal(DeclareExternalStatement),
    DeclareFunction(DeclareFunctionStatement),
    DeclareOption(DeclareOptionStatement),
    DeclareStruct(DeclareStructStatement),
    DeclareVariable(DeclareVariableStatement),
    Discard(DiscardStatement),
    Expression(ExpressionStatement),
    For(ForStatement),
    ForEach(ForEachStatement),
    Import(ImportStatement),
    Multi(MultiStatement),
    NoOp(NoOpStatement),
    Return(ReturnStatement),
    Scoped(ScopedStatement),
    While(WhileStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Branch(s) => s.span,
            Statement::Break(s) => s.span,
            Statement::Conditional(s) => s.span,
            Statement::Continue(s) => s.span,
            Statement::DeclareAlias(s) => s.span,
            Statement::DeclareConst(s) => s.span,
            Statement::DeclareExternal(s) => s.span,
            Statement::DeclareFunction(s) => s.span,
            Statement::DeclareOption(s) => s.span,
            Statement::DeclareStruct(s) => s.span,
            Statement::DeclareVariable(s) => s.span,
            Statement::Discard(s) => s.span,
            Statement::Expression(s) => s.span,
            Statement::For(s) => s.span,
            Statement::ForEach(s) => s.span,
            Statement::Import(s) => s.span,
            Statement::Multi(s) => s.span,
            Statement::NoOp(s) => s.span,
            Statement::Return(s) => s.span,
            Statement::Scoped(s) => s.span,
            Statement::While(s) => s.span,
        }
    }

    pub fn no_op(span: Span) -> Statement {
        Statement::NoOp(NoOpStatement { span })
    }
}
