//! Reachability tracking and unused-symbol elimination.
//!
//! `UsageChecker` records, for every declaration of a resolved tree, the
//! symbols it references. Seeding marks roots (entry functions, symbols
//! re-exported through imports); `resolve` computes the reachable closure;
//! `eliminate_unused` then drops declarations nothing reaches.

use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;

use glint_ast::expr::{Expression, ExprValue};
use glint_ast::stmt::{MultiStatement, Statement};
use glint_ast::ty::ExpressionType;

/// Bit-sets of reachable symbols, per table.
#[derive(Debug, Default, Clone)]
pub struct UsageSet {
    pub used_functions: FixedBitSet,
    pub used_structs: FixedBitSet,
    pub used_constants: FixedBitSet,
    pub used_variables: FixedBitSet,
    pub used_aliases: FixedBitSet,
}

fn set(bits: &mut FixedBitSet, index: usize) {
    if index >= bits.len() {
        bits.grow(index + 1);
    }
    bits.insert(index);
}

fn get(bits: &FixedBitSet, index: usize) -> bool {
    index < bits.len() && bits.contains(index)
}

impl UsageSet {
    pub fn is_function_used(&self, index: usize) -> bool {
        get(&self.used_functions, index)
    }
    pub fn is_struct_used(&self, index: usize) -> bool {
        get(&self.used_structs, index)
    }
    pub fn is_constant_used(&self, index: usize) -> bool {
        get(&self.used_constants, index)
    }
    pub fn is_variable_used(&self, index: usize) -> bool {
        get(&self.used_variables, index)
    }
    pub fn is_alias_used(&self, index: usize) -> bool {
        get(&self.used_aliases, index)
    }
}

/// Dependencies of one declaration.
#[derive(Debug, Default)]
struct SymbolDeps {
    functions: Vec<usize>,
    structs: Vec<usize>,
    constants: Vec<usize>,
    variables: Vec<usize>,
    aliases: Vec<usize>,
}

/// Marks reachable symbols from seeded roots.
#[derive(Debug, Default)]
pub struct UsageChecker {
    usage: UsageSet,
    function_deps: FxHashMap<usize, SymbolDeps>,
    struct_deps: FxHashMap<usize, SymbolDeps>,
    constant_deps: FxHashMap<usize, SymbolDeps>,
    variable_deps: FxHashMap<usize, SymbolDeps>,
    alias_deps: FxHashMap<usize, SymbolDeps>,
}

impl UsageChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dependency edges of every declaration under `root`.
    pub fn register(&mut self, root: &MultiStatement) {
        for statement in &root.statements {
            self.register_statement(statement);
        }
    }

    fn register_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::DeclareFunction(node) => {
                let Some(index) = node.func_index else { return };
                let mut deps = SymbolDeps::default();
                for parameter in &node.parameters {
                    collect_type_value(&parameter.ty, &mut deps);
                }
                collect_type_value(&node.return_type, &mut deps);
                for statement in &node.body {
                    collect_statement(statement, &mut deps);
                }
                self.function_deps.insert(index, deps);
            }
            Statement::DeclareStruct(node) => {
                let Some(index) = node.struct_index else { return };
                let mut deps = SymbolDeps::default();
                for member in &node.description.members {
                    collect_type_value(&member.ty, &mut deps);
                }
                self.struct_deps.insert(index, deps);
            }
            Statement::DeclareConst(node) => {
                let Some(index) = node.const_index else { return };
                let mut deps = SymbolDeps::default();
                if let Some(expression) = &node.expression {
                    collect_expression(expression, &mut deps);
                }
                self.constant_deps.insert(index, deps);
            }
            Statement::DeclareAlias(node) => {
                let Some(index) = node.alias_index else { return };
                let mut deps = SymbolDeps::default();
                collect_expression(&node.expression, &mut deps);
                self.alias_deps.insert(index, deps);
            }
            Statement::DeclareExternal(node) => {
                for var in &node.external_vars {
                    let Some(index) = var.var_index else { continue };
                    let mut deps = SymbolDeps::default();
                    collect_type_value(&var.ty, &mut deps);
                    self.variable_deps.insert(index, deps);
                }
            }
            Statement::Multi(node) => {
                for statement in &node.statements {
                    self.register_statement(statement);
                }
            }
            Statement::Scoped(node) => self.register_statement(&node.statement),
            Statement::Conditional(node) => self.register_statement(&node.statement),
            _ => {}
        }
    }

    pub fn mark_function_as_used(&mut self, index: usize) {
        set(&mut self.usage.used_functions, index);
    }

    pub fn mark_struct_as_used(&mut self, index: usize) {
        set(&mut self.usage.used_structs, index);
    }

    pub fn mark_constant_as_used(&mut self, index: usize) {
        set(&mut self.usage.used_constants, index);
    }

    pub fn mark_variable_as_used(&mut self, index: usize) {
        set(&mut self.usage.used_variables, index);
    }

    pub fn mark_alias_as_used(&mut self, index: usize) {
        set(&mut self.usage.used_aliases, index);
    }

    /// Propagate usage along the recorded edges until a fixed point.
    pub fn resolve(&mut self) {
        #[derive(Clone, Copy)]
        enum Item {
            Function(usize),
            Struct(usize),
            Constant(usize),
            Variable(usize),
            Alias(usize),
        }

        let mut worklist: Vec<Item> = Vec::new();
        worklist.extend(self.usage.used_functions.ones().map(Item::Function));
        worklist.extend(self.usage.used_structs.ones().map(Item::Struct));
        worklist.extend(self.usage.used_constants.ones().map(Item::Constant));
        worklist.extend(self.usage.used_variables.ones().map(Item::Variable));
        worklist.extend(self.usage.used_aliases.ones().map(Item::Alias));

        while let Some(item) = worklist.pop() {
            let deps = match item {
                Item::Function(index) => self.function_deps.get(&index),
                Item::Struct(index) => self.struct_deps.get(&index),
                Item::Constant(index) => self.constant_deps.get(&index),
                Item::Variable(index) => self.variable_deps.get(&index),
                Item::Alias(index) => self.alias_deps.get(&index),
            };
            let Some(deps) = deps else { continue };

            for &index in &deps.functions {
                if !get(&self.usage.used_functions, index) {
                    set(&mut self.usage.used_functions, index);
                    worklist.push(Item::Function(index));
                }
            }
            for &index in &deps.structs {
                if !get(&self.usage.used_structs, index) {
                    set(&mut self.usage.used_structs, index);
                    worklist.push(Item::Struct(index));
                }
            }
            for &index in &deps.constants {
                if !get(&self.usage.used_constants, index) {
                    set(&mut self.usage.used_constants, index);
                    worklist.push(Item::Constant(index));
                }
            }
            for &index in &deps.variables {
                if !get(&self.usage.used_variables, index) {
                    set(&mut self.usage.used_variables, index);
                    worklist.push(Item::Variable(index));
                }
            }
            for &index in &deps.aliases {
                if !get(&self.usage.used_aliases, index) {
                    set(&mut self.usage.used_aliases, index);
                    worklist.push(Item::Alias(index));
                }
            }
        }
    }

    pub fn usage(&self) -> &UsageSet {
        &self.usage
    }
}

// ── Dependency collection ──────────────────────────────────────────────

fn collect_type(ty: &ExpressionType, deps: &mut SymbolDeps) {
    match ty {
        ExpressionType::Array(a) => collect_type(&a.contained, deps),
        ExpressionType::DynArray(a) => collect_type(&a.contained, deps),
        ExpressionType::Struct(index) => deps.structs.push(*index),
        ExpressionType::Function(index) => deps.functions.push(*index),
        ExpressionType::Storage(s) => deps.structs.push(s.struct_index),
        ExpressionType::Uniform(u) => deps.structs.push(u.struct_index),
        ExpressionType::PushConstant(p) => deps.structs.push(p.struct_index),
        ExpressionType::Alias(a) => {
            deps.aliases.push(a.alias_index);
            collect_type(&a.target, deps);
        }
        ExpressionType::Method(m) => collect_type(&m.object, deps),
        _ => {}
    }
}

fn collect_type_value(value: &ExprValue<ExpressionType>, deps: &mut SymbolDeps) {
    match value {
        ExprValue::Value(ty) => collect_type(ty, deps),
        ExprValue::Expr(expr) => collect_expression(expr, deps),
        ExprValue::None => {}
    }
}

fn collect_attr<T>(value: &ExprValue<T>, deps: &mut SymbolDeps) {
    if let ExprValue::Expr(expr) = value {
        collect_expression(expr, deps);
    }
}

fn collect_expression(expr: &Expression, deps: &mut SymbolDeps) {
    if let Some(ty) = expr.cached_type() {
        collect_type(ty, deps);
    }

    match expr {
        Expression::AccessIdentifier(node) => collect_expression(&node.expr, deps),
        Expression::AccessField(node) => collect_expression(&node.expr, deps),
        Expression::AccessIndex(node) => {
            collect_expression(&node.expr, deps);
            for index in &node.indices {
                collect_expression(index, deps);
            }
        }
        Expression::AliasValue(node) => deps.aliases.push(node.alias_index),
        Expression::Assign(node) => {
            collect_expression(&node.left, deps);
            collect_expression(&node.right, deps);
        }
        Expression::Binary(node) => {
            collect_expression(&node.left, deps);
            collect_expression(&node.right, deps);
        }
        Expression::CallFunction(node) => {
            collect_expression(&node.target, deps);
            for argument in &node.arguments {
                collect_expression(argument, deps);
            }
        }
        Expression::Cast(node) => {
            collect_type_value(&node.target_type, deps);
            for sub in &node.expressions {
                collect_expression(sub, deps);
            }
        }
        Expression::Conditional(node) => {
            collect_expression(&node.condition, deps);
            collect_expression(&node.true_expr, deps);
            collect_expression(&node.false_expr, deps);
        }
        Expression::Constant(node) => deps.constants.push(node.constant_index),
        Expression::Function(node) => deps.functions.push(node.function_index),
        Expression::Intrinsic(node) => {
            for parameter in &node.parameters {
                collect_expression(parameter, deps);
            }
        }
        Expression::StructType(node) => deps.structs.push(node.struct_index),
        Expression::Swizzle(node) => collect_expression(&node.expr, deps),
        Expression::Unary(node) => collect_expression(&node.operand, deps),
        Expression::Variable(node) => deps.variables.push(node.variable_index),
        Expression::ConstantValue(_)
        | Expression::Identifier(_)
        | Expression::IntrinsicFunction(_)
        | Expression::Module(_)
        | Expression::NamedExternalBlock(_)
        | Expression::Type(_) => {}
    }
}

fn collect_statement(stmt: &Statement, deps: &mut SymbolDeps) {
    match stmt {
        Statement::Branch(node) => {
            for cond in &node.cond_statements {
                collect_expression(&cond.condition, deps);
                collect_statement(&cond.statement, deps);
            }
            if let Some(else_statement) = &node.else_statement {
                collect_statement(else_statement, deps);
            }
        }
        Statement::Conditional(node) => {
            collect_expression(&node.condition, deps);
            collect_statement(&node.statement, deps);
        }
        Statement::DeclareAlias(node) => collect_expression(&node.expression, deps),
        Statement::DeclareConst(node) => {
            collect_type_value(&node.ty, deps);
            if let Some(expression) = &node.expression {
                collect_expression(expression, deps);
            }
        }
        Statement::DeclareExternal(node) => {
            for var in &node.external_vars {
                collect_type_value(&var.ty, deps);
            }
        }
        Statement::DeclareFunction(node) => {
            for parameter in &node.parameters {
                collect_type_value(&parameter.ty, deps);
            }
            collect_type_value(&node.return_type, deps);
            for statement in &node.body {
                collect_statement(statement, deps);
            }
        }
        Statement::DeclareOption(node) => {
            collect_type_value(&node.opt_type, deps);
            if let Some(default_value) = &node.default_value {
                collect_expression(default_value, deps);
            }
        }
        Statement::DeclareStruct(node) => {
            for member in &node.description.members {
                collect_type_value(&member.ty, deps);
            }
        }
        Statement::DeclareVariable(node) => {
            collect_type_value(&node.ty, deps);
            if let Some(initial) = &node.initial_expression {
                collect_expression(initial, deps);
            }
        }
        Statement::Expression(node) => collect_expression(&node.expression, deps),
        Statement::For(node) => {
            collect_expression(&node.from_expr, deps);
            collect_expression(&node.to_expr, deps);
            if let Some(step) = &node.step_expr {
                collect_expression(step, deps);
            }
            collect_attr(&node.unroll, deps);
            collect_statement(&node.statement, deps);
        }
        Statement::ForEach(node) => {
            collect_expression(&node.expression, deps);
            collect_attr(&node.unroll, deps);
            collect_statement(&node.statement, deps);
        }
        Statement::Multi(node) => {
            for statement in &node.statements {
                collect_statement(statement, deps);
            }
        }
        Statement::Return(node) => {
            if let Some(expression) = &node.expression {
                collect_expression(expression, deps);
            }
        }
        Statement::Scoped(node) => collect_statement(&node.statement, deps),
        Statement::While(node) => {
            collect_expression(&node.condition, deps);
            collect_statement(&node.statement, deps);
        }
        Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Discard(_)
        | Statement::Import(_)
        | Statement::NoOp(_) => {}
    }
}

// ── Elimination ────────────────────────────────────────────────────────

fn keep_statement(stmt: &mut Statement, usage: &UsageSet) -> bool {
    match stmt {
        Statement::DeclareFunction(node) => node
            .func_index
            .map_or(true, |index| usage.is_function_used(index)),
        Statement::DeclareStruct(node) => node
            .struct_index
            .map_or(true, |index| usage.is_struct_used(index)),
        Statement::DeclareConst(node) => node
            .const_index
            .map_or(true, |index| usage.is_constant_used(index)),
        Statement::DeclareAlias(node) => node
            .alias_index
            .map_or(true, |index| usage.is_alias_used(index)),
        Statement::DeclareExternal(node) => {
            node.external_vars.retain(|var| {
                var.var_index
                    .map_or(true, |index| usage.is_variable_used(index))
            });
            !node.external_vars.is_empty()
        }
        Statement::Multi(node) => {
            eliminate_unused(node, usage);
            true
        }
        Statement::Scoped(node) => keep_statement(&mut node.statement, usage),
        _ => true,
    }
}

/// Drop every declaration under `root` the usage set does not reach.
pub fn eliminate_unused(root: &mut MultiStatement, usage: &UsageSet) {
    root.statements.retain_mut(|stmt| keep_statement(stmt, usage));
}
