//! Expression nodes.
//!
//! Every expression carries its source span and an optional cached
//! [`ExpressionType`]; the resolver fills the cache, later passes only read
//! it. Symbol references (`Constant`, `Variable`, `Function`, ...) carry
//! table indices, never names -- the name-bearing forms (`Identifier`,
//! `AccessIdentifier`) exist only before resolution.

use glint_common::span::Span;

use crate::constant::ConstantValue;
use crate::intrinsic::IntrinsicKind;
use crate::ty::ExpressionType;

/// An attribute or annotation slot: absent, an unresolved expression, or a
/// resolved value. Declaration attributes (`cond`, `entry`, `unroll`,
/// binding indices) and type annotations all use this shape; the resolver
/// folds `Expr` slots into `Value` slots.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue<T> {
    None,
    Expr(Box<Expression>),
    Value(T),
}

impl<T> Default for ExprValue<T> {
    fn default() -> Self {
        ExprValue::None
    }
}

impl<T> ExprValue<T> {
    pub fn has_value(&self) -> bool {
        !matches!(self, ExprValue::None)
    }

    pub fn is_expr(&self) -> bool {
        matches!(self, ExprValue::Expr(_))
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ExprValue::Value(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ExprValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn expr_mut(&mut self) -> Option<&mut Expression> {
        match self {
            ExprValue::Expr(e) => Some(e),
            _ => None,
        }
    }

    pub fn from_expr(expr: Expression) -> Self {
        ExprValue::Expr(Box::new(expr))
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    CompEq,
    CompNe,
    CompLt,
    CompLe,
    CompGt,
    CompGe,
    LogicalAnd,
    LogicalOr,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    LogicalNot,
    BitwiseNot,
    Minus,
    Plus,
}

/// Assignment operators. Compound forms are lowered by the resolver into a
/// simple assignment of the matching binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Simple,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl AssignOp {
    /// The binary operator a compound assignment lowers through.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Simple => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Subtract => Some(BinaryOp::Subtract),
            AssignOp::Multiply => Some(BinaryOp::Multiply),
            AssignOp::Divide => Some(BinaryOp::Divide),
            AssignOp::Modulo => Some(BinaryOp::Modulo),
        }
    }
}

/// One `.name` segment of an access chain.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierEntry {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub name: String,
}

/// An unresolved access chain `expr.a.b`. The resolver rewrites each segment
/// into a field access, swizzle, method projection or namespace lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessIdentifierExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub expr: Box<Expression>,
    pub identifiers: Vec<IdentifierEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessFieldExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub expr: Box<Expression>,
    /// Position among the struct's *enabled* members.
    pub field_index: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessIndexExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub expr: Box<Expression>,
    /// Single index for containers; one entry per type parameter when the
    /// accessed expression denotes a partial type.
    pub indices: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliasValueExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub alias_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub op: AssignOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallFunctionExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub target: Box<Expression>,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub target_type: ExprValue<ExpressionType>,
    pub expressions: Vec<Expression>,
}

/// A compile-time selection `cond ? a : b`; the condition must fold to a
/// boolean constant and the whole node is replaced by the taken branch.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub condition: Box<Expression>,
    pub true_expr: Box<Expression>,
    pub false_expr: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub constant_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantValueExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub value: ConstantValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub function_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicFunctionExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub intrinsic_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub intrinsic: IntrinsicKind,
    pub parameters: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub module_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedExternalBlockExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub external_block_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructTypeExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub struct_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwizzleExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub expr: Box<Expression>,
    /// 1 to 4 component indices, each < the source component count.
    pub components: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub type_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub op: UnaryOp,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableValueExpression {
    pub span: Span,
    pub cached_type: Option<ExpressionType>,
    pub variable_index: usize,
}

/// Any expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    AccessIdentifier(AccessIdentifierExpression),
    AccessField(AccessFieldExpression),
    AccessIndex(AccessIndexExpression),
    AliasValue(AliasValueExpression),
    Assign(AssignExpression),
    Binary(BinaryExpression),
    CallFunction(CallFunctionExpression),
    Cast(CastExpression),
    Conditional(ConditionalExpression),
    Constant(ConstantExpression),
    ConstantValue(ConstantValueExpression),
    Function(FunctionExpression),
    Identifier(IdentifierExpression),
    Intrinsic(IntrinsicExpression),
    IntrinsicFunction(IntrinsicFunctionExpression),
    Module(ModuleExpression),
    NamedExternalBlock(NamedExternalBlockExpression),
    StructType(StructTypeExpression),
    Swizzle(SwizzleExpression),
    Type(TypeExpression),
    Unary(UnaryExpression),
    Variable(VariableValueExpression),
}

macro_rules! for_each_expr_variant {
    ($self:expr, $node:ident => $body:expr) => {
        match $self {
            Expression::AccessIdentifier($node) => $body,
            Expression::AccessField($node) => $body,
            Expression::AccessIndex($node) => $body,
            Expression::AliasValue($node) => $body,
            Expression::Assign($node) => $body,
            Expression::Binary($node) => $body,
            Expression::CallFunction($node) => $body,
            Expression::Cast($node) => $body,
            Expression::Conditional($node) => $body,
            Expression::Constant($node) => $body,
            Expression::ConstantValue($node) => $body,
            Expression::Function($node) => $body,
            Expression::Identifier($node) => $body,
            Expression::Intrinsic($node) => $body,
            Expression::IntrinsicFunction($node) => $body,
            Expression::Module($node) => $body,
            Expression::NamedExternalBlock($node) => $body,
            Expression::StructType($node) => $body,
            Expression::Swizzle($node) => $body,
            Expression::Type($node) => $body,
            Expression::Unary($node) => $body,
            Expression::Variable($node) => $body,
        }
    };
}

impl Expression {
    pub fn span(&self) -> Span {
        for_each_expr_variant!(self, node => node.span)
    }

    pub fn cached_type(&self) -> Option<&ExpressionType> {
        for_each_expr_variant!(self, node => node.cached_type.as_ref())
    }

    pub fn cached_type_mut(&mut self) -> &mut Option<ExpressionType> {
        for_each_expr_variant!(self, node => &mut node.cached_type)
    }

    pub fn set_cached_type(&mut self, ty: ExpressionType) {
        *self.cached_type_mut() = Some(ty);
    }
}
