//! Node construction helpers.
//!
//! Used by the resolver when it synthesizes nodes (unrolled loop bodies,
//! import-generated aliases and constants) and by tests, which build whole
//! modules through these since parsing is a separate concern.

use glint_common::span::Span;

use crate::constant::ConstantValue;
use crate::expr::{
    AccessIdentifierExpression, AccessIndexExpression, AssignExpression, AssignOp,
    BinaryExpression, BinaryOp, CallFunctionExpression, ConstantExpression,
    ConstantValueExpression, Expression, ExprValue, FunctionExpression, IdentifierEntry,
    IdentifierExpression, ModuleExpression, StructTypeExpression, UnaryExpression, UnaryOp,
};
use crate::module::{Module, ModuleMetadata};
use crate::stmt::{
    BranchStatement, CondStatement, ConditionalStatement, DeclareAliasStatement,
    DeclareConstStatement, DeclareFunctionStatement, DeclareOptionStatement,
    DeclareStructStatement, DeclareVariableStatement, ExpressionStatement, ForStatement,
    FunctionParameter, ImportIdentifier, ImportStatement, MultiStatement, ReturnStatement,
    ScopedStatement, Statement, StructDescription, StructMember, WhileStatement,
};
use crate::ty::ExpressionType;

// ── Expressions ────────────────────────────────────────────────────────

pub fn identifier(name: impl Into<String>, span: Span) -> Expression {
    Expression::Identifier(IdentifierExpression {
        span,
        cached_type: None,
        name: name.into(),
    })
}

pub fn constant_value(value: ConstantValue, span: Span) -> Expression {
    Expression::ConstantValue(ConstantValueExpression {
        span,
        cached_type: Some(value.constant_type()),
        value,
    })
}

pub fn int_literal(value: i64, span: Span) -> Expression {
    constant_value(ConstantValue::int_literal(value), span)
}

pub fn float_literal(value: f64, span: Span) -> Expression {
    constant_value(ConstantValue::float_literal(value), span)
}

pub fn bool_value(value: bool, span: Span) -> Expression {
    constant_value(ConstantValue::bool_value(value), span)
}

pub fn i32_value(value: i32, span: Span) -> Expression {
    constant_value(ConstantValue::i32_value(value), span)
}

pub fn u32_value(value: u32, span: Span) -> Expression {
    constant_value(ConstantValue::u32_value(value), span)
}

pub fn f32_value(value: f32, span: Span) -> Expression {
    constant_value(ConstantValue::f32_value(value), span)
}

/// A reference to a registered constant, with its type already cached.
pub fn constant_ref(constant_index: usize, ty: ExpressionType, span: Span) -> Expression {
    Expression::Constant(ConstantExpression {
        span,
        cached_type: Some(ty),
        constant_index,
    })
}

pub fn function_ref(function_index: usize, span: Span) -> Expression {
    Expression::Function(FunctionExpression {
        span,
        cached_type: Some(ExpressionType::Function(function_index)),
        function_index,
    })
}

pub fn struct_type_ref(struct_index: usize, span: Span) -> Expression {
    Expression::StructType(StructTypeExpression {
        span,
        cached_type: Some(ExpressionType::Struct(struct_index)),
        struct_index,
    })
}

pub fn module_ref(module_index: usize, span: Span) -> Expression {
    Expression::Module(ModuleExpression {
        span,
        cached_type: Some(ExpressionType::Module(module_index)),
        module_index,
    })
}

pub fn binary(op: BinaryOp, left: Expression, right: Expression, span: Span) -> Expression {
    Expression::Binary(BinaryExpression {
        span,
        cached_type: None,
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn unary(op: UnaryOp, operand: Expression, span: Span) -> Expression {
    Expression::Unary(UnaryExpression {
        span,
        cached_type: None,
        op,
        operand: Box::new(operand),
    })
}

pub fn assign(op: AssignOp, left: Expression, right: Expression, span: Span) -> Expression {
    Expression::Assign(AssignExpression {
        span,
        cached_type: None,
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// `expr.a.b` -- an unresolved access chain.
pub fn access(expr: Expression, names: &[&str], span: Span) -> Expression {
    Expression::AccessIdentifier(AccessIdentifierExpression {
        span,
        cached_type: None,
        expr: Box::new(expr),
        identifiers: names
            .iter()
            .map(|name| IdentifierEntry {
                name: (*name).into(),
                span,
            })
            .collect(),
    })
}

/// `expr[index...]` -- container indexing or partial-type application.
pub fn access_index(expr: Expression, indices: Vec<Expression>, span: Span) -> Expression {
    Expression::AccessIndex(AccessIndexExpression {
        span,
        cached_type: None,
        expr: Box::new(expr),
        indices,
    })
}

pub fn call(target: Expression, arguments: Vec<Expression>, span: Span) -> Expression {
    Expression::CallFunction(CallFunctionExpression {
        span,
        cached_type: None,
        target: Box::new(target),
        arguments,
    })
}

// ── Statements ─────────────────────────────────────────────────────────

pub fn expression_statement(expression: Expression, span: Span) -> Statement {
    Statement::Expression(ExpressionStatement { span, expression })
}

pub fn declare_variable(
    name: impl Into<String>,
    ty: ExprValue<ExpressionType>,
    initial: Option<Expression>,
    span: Span,
) -> Statement {
    Statement::DeclareVariable(DeclareVariableStatement {
        span,
        name: name.into(),
        var_index: None,
        ty,
        initial_expression: initial,
    })
}

pub fn declare_const(
    name: impl Into<String>,
    ty: ExprValue<ExpressionType>,
    expression: Expression,
    span: Span,
) -> Statement {
    Statement::DeclareConst(DeclareConstStatement {
        span,
        name: name.into(),
        const_index: None,
        ty,
        expression: Some(expression),
        is_exported: ExprValue::None,
    })
}

pub fn declare_alias(name: impl Into<String>, expression: Expression, span: Span) -> Statement {
    Statement::DeclareAlias(DeclareAliasStatement {
        span,
        name: name.into(),
        alias_index: None,
        expression,
    })
}

pub fn return_statement(expression: Option<Expression>, span: Span) -> Statement {
    Statement::Return(ReturnStatement { span, expression })
}

pub fn multi(statements: Vec<Statement>, span: Span) -> Statement {
    Statement::Multi(MultiStatement { span, statements })
}

pub fn scoped(statement: Statement, span: Span) -> Statement {
    Statement::Scoped(ScopedStatement {
        span,
        statement: Box::new(statement),
    })
}

pub fn declare_option(
    name: impl Into<String>,
    opt_type: ExprValue<ExpressionType>,
    default_value: Option<Expression>,
    span: Span,
) -> Statement {
    Statement::DeclareOption(DeclareOptionStatement {
        span,
        name: name.into(),
        opt_index: None,
        opt_type,
        default_value,
    })
}

pub fn function_param(
    name: impl Into<String>,
    ty: ExprValue<ExpressionType>,
    span: Span,
) -> FunctionParameter {
    FunctionParameter {
        span,
        name: name.into(),
        ty,
        var_index: None,
    }
}

pub fn declare_function(
    name: impl Into<String>,
    parameters: Vec<FunctionParameter>,
    return_type: ExprValue<ExpressionType>,
    body: Vec<Statement>,
    span: Span,
) -> Statement {
    Statement::DeclareFunction(DeclareFunctionStatement {
        span,
        name: name.into(),
        func_index: None,
        parameters,
        return_type,
        body,
        entry_stage: ExprValue::None,
        is_exported: ExprValue::None,
        depth_write: ExprValue::None,
        early_fragment_tests: ExprValue::None,
        workgroup_size: ExprValue::None,
    })
}

pub fn struct_member(
    name: impl Into<String>,
    ty: ExprValue<ExpressionType>,
    span: Span,
) -> StructMember {
    StructMember {
        span,
        name: name.into(),
        ty,
        cond: ExprValue::None,
        builtin: ExprValue::None,
        interp: ExprValue::None,
        location_index: ExprValue::None,
    }
}

pub fn declare_struct(
    name: impl Into<String>,
    members: Vec<StructMember>,
    span: Span,
) -> Statement {
    Statement::DeclareStruct(DeclareStructStatement {
        span,
        struct_index: None,
        is_exported: ExprValue::None,
        description: StructDescription {
            name: name.into(),
            layout: ExprValue::None,
            condition_index: 0,
            members,
        },
    })
}

/// A `const if` chain; conditions are evaluated at resolve time.
pub fn const_branch(
    cond_statements: Vec<(Expression, Statement)>,
    else_statement: Option<Statement>,
    span: Span,
) -> Statement {
    Statement::Branch(BranchStatement {
        span,
        is_const: true,
        cond_statements: cond_statements
            .into_iter()
            .map(|(condition, statement)| CondStatement {
                condition,
                statement: Box::new(statement),
            })
            .collect(),
        else_statement: else_statement.map(Box::new),
    })
}

pub fn branch(
    cond_statements: Vec<(Expression, Statement)>,
    else_statement: Option<Statement>,
    span: Span,
) -> Statement {
    Statement::Branch(BranchStatement {
        span,
        is_const: false,
        cond_statements: cond_statements
            .into_iter()
            .map(|(condition, statement)| CondStatement {
                condition,
                statement: Box::new(statement),
            })
            .collect(),
        else_statement: else_statement.map(Box::new),
    })
}

/// A statement guarded by a compile-time condition.
pub fn conditional(condition: Expression, statement: Statement, span: Span) -> Statement {
    Statement::Conditional(ConditionalStatement {
        span,
        condition,
        statement: Box::new(statement),
    })
}

pub fn for_loop(
    var_name: impl Into<String>,
    from_expr: Expression,
    to_expr: Expression,
    step_expr: Option<Expression>,
    statement: Statement,
    span: Span,
) -> Statement {
    Statement::For(ForStatement {
        span,
        var_name: var_name.into(),
        var_index: None,
        from_expr,
        to_expr,
        step_expr,
        unroll: ExprValue::None,
        statement: Box::new(statement),
    })
}

pub fn while_loop(condition: Expression, statement: Statement, span: Span) -> Statement {
    Statement::While(WhileStatement {
        span,
        condition,
        statement: Box::new(statement),
    })
}

/// `import M;` -- bind the whole module to an identifier.
pub fn import_module(module_name: impl Into<String>, span: Span) -> Statement {
    Statement::Import(ImportStatement {
        span,
        module_name: module_name.into(),
        module_identifier: String::new(),
        identifiers: Vec::new(),
    })
}

/// `import a, b as c from M;` -- selective import with optional renames.
pub fn import_symbols(
    module_name: impl Into<String>,
    symbols: &[(&str, &str)],
    span: Span,
) -> Statement {
    Statement::Import(ImportStatement {
        span,
        module_name: module_name.into(),
        module_identifier: String::new(),
        identifiers: symbols
            .iter()
            .map(|(identifier, renamed)| ImportIdentifier {
                span,
                identifier: (*identifier).into(),
                renamed_identifier: (*renamed).into(),
                renamed_span: span,
            })
            .collect(),
    })
}

// ── Modules ────────────────────────────────────────────────────────────

pub fn module(name: impl Into<String>, statements: Vec<Statement>) -> Module {
    Module::new(
        ModuleMetadata::new(name),
        MultiStatement {
            span: Span::default(),
            statements,
        },
    )
}
