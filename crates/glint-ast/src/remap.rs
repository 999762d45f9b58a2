//! Symbol index remapping.
//!
//! When a subtree is merged into another compilation (module import) or
//! duplicated (loop unrolling), every symbol index it carries must be
//! rewritten through fresh indices so the two copies stay distinct. The
//! caller supplies one generator per symbol kind; the remapper guarantees a
//! given old index maps to the same new index throughout one run.

use rustc_hash::FxHashMap;

use crate::expr::Expression;
use crate::stmt::Statement;
use crate::ty::ExpressionType;

/// Fresh-index providers, one per remappable symbol kind. Kinds without a
/// provider keep their indices (intrinsics, modules and types are global to
/// a compilation and never remapped).
pub trait IndexGenerators {
    fn next_alias_index(&mut self) -> usize;
    fn next_constant_index(&mut self) -> usize;
    fn next_function_index(&mut self) -> usize;
    fn next_struct_index(&mut self) -> usize;
    fn next_variable_index(&mut self) -> usize;
}

/// Structural walker rewriting every symbol index through [`IndexGenerators`].
pub struct IndexRemapper<'a, G: IndexGenerators> {
    generators: &'a mut G,
    aliases: FxHashMap<usize, usize>,
    constants: FxHashMap<usize, usize>,
    functions: FxHashMap<usize, usize>,
    structs: FxHashMap<usize, usize>,
    variables: FxHashMap<usize, usize>,
}

impl<'a, G: IndexGenerators> IndexRemapper<'a, G> {
    pub fn new(generators: &'a mut G) -> Self {
        Self {
            generators,
            aliases: FxHashMap::default(),
            constants: FxHashMap::default(),
            functions: FxHashMap::default(),
            structs: FxHashMap::default(),
            variables: FxHashMap::default(),
        }
    }

    fn map_alias(&mut self, index: usize) -> usize {
        *self
            .aliases
            .entry(index)
            .or_insert_with(|| self.generators.next_alias_index())
    }

    fn map_constant(&mut self, index: usize) -> usize {
        *self
            .constants
            .entry(index)
            .or_insert_with(|| self.generators.next_constant_index())
    }

    fn map_function(&mut self, index: usize) -> usize {
        *self
            .functions
            .entry(index)
            .or_insert_with(|| self.generators.next_function_index())
    }

    fn map_struct(&mut self, index: usize) -> usize {
        *self
            .structs
            .entry(index)
            .or_insert_with(|| self.generators.next_struct_index())
    }

    fn map_variable(&mut self, index: usize) -> usize {
        *self
            .variables
            .entry(index)
            .or_insert_with(|| self.generators.next_variable_index())
    }

    fn map_alias_opt(&mut self, index: &mut Option<usize>) {
        if let Some(i) = index {
            *i = self.map_alias(*i);
        }
    }

    fn map_constant_opt(&mut self, index: &mut Option<usize>) {
        if let Some(i) = index {
            *i = self.map_constant(*i);
        }
    }

    fn map_function_opt(&mut self, index: &mut Option<usize>) {
        if let Some(i) = index {
            *i = self.map_function(*i);
        }
    }

    fn map_struct_opt(&mut self, index: &mut Option<usize>) {
        if let Some(i) = index {
            *i = self.map_struct(*i);
        }
    }

    fn map_variable_opt(&mut self, index: &mut Option<usize>) {
        if let Some(i) = index {
            *i = self.map_variable(*i);
        }
    }

    /// Rewrite struct/function/alias indices embedded in a type.
    pub fn remap_type(&mut self, ty: &mut ExpressionType) {
        match ty {
            ExpressionType::Array(array) => self.remap_type(&mut array.contained),
            ExpressionType::DynArray(array) => self.remap_type(&mut array.contained),
            ExpressionType::Struct(index) => *index = self.map_struct(*index),
            ExpressionType::Function(index) => *index = self.map_function(*index),
            ExpressionType::Storage(storage) => {
                storage.struct_index = self.map_struct(storage.struct_index)
            }
            ExpressionType::Uniform(uniform) => {
                uniform.struct_index = self.map_struct(uniform.struct_index)
            }
            ExpressionType::PushConstant(push) => {
                push.struct_index = self.map_struct(push.struct_index)
            }
            ExpressionType::Alias(alias) => {
                alias.alias_index = self.map_alias(alias.alias_index);
                self.remap_type(&mut alias.target);
            }
            ExpressionType::Method(method) => self.remap_type(&mut method.object),
            ExpressionType::NoType
            | ExpressionType::Primitive(_)
            | ExpressionType::Vector(_)
            | ExpressionType::Matrix(_)
            | ExpressionType::IntrinsicFunction(_)
            | ExpressionType::Sampler(_)
            | ExpressionType::Texture(_)
            | ExpressionType::Module(_)
            | ExpressionType::NamedExternalBlock(_)
            | ExpressionType::Type(_) => {}
        }
    }

    fn remap_type_value(&mut self, value: &mut crate::expr::ExprValue<ExpressionType>) {
        match value {
            crate::expr::ExprValue::Value(ty) => self.remap_type(ty),
            crate::expr::ExprValue::Expr(expr) => self.remap_expression(expr),
            crate::expr::ExprValue::None => {}
        }
    }

    fn remap_attr_expr<T>(&mut self, value: &mut crate::expr::ExprValue<T>) {
        if let crate::expr::ExprValue::Expr(expr) = value {
            self.remap_expression(expr);
        }
    }

    pub fn remap_expression(&mut self, expr: &mut Expression) {
        if let Some(ty) = expr.cached_type_mut() {
            self.remap_type(ty);
        }

        match expr {
            Expression::AccessIdentifier(node) => self.remap_expression(&mut node.expr),
            Expression::AccessField(node) => self.remap_expression(&mut node.expr),
            Expression::AccessIndex(node) => {
                self.remap_expression(&mut node.expr);
                for index in &mut node.indices {
                    self.remap_expression(index);
                }
            }
            Expression::AliasValue(node) => node.alias_index = self.map_alias(node.alias_index),
            Expression::Assign(node) => {
                self.remap_expression(&mut node.left);
                self.remap_expression(&mut node.right);
            }
            Expression::Binary(node) => {
                self.remap_expression(&mut node.left);
                self.remap_expression(&mut node.right);
            }
            Expression::CallFunction(node) => {
                self.remap_expression(&mut node.target);
                for argument in &mut node.arguments {
                    self.remap_expression(argument);
                }
            }
            Expression::Cast(node) => {
                self.remap_type_value(&mut node.target_type);
                for sub in &mut node.expressions {
                    self.remap_expression(sub);
                }
            }
            Expression::Conditional(node) => {
                self.remap_expression(&mut node.condition);
                self.remap_expression(&mut node.true_expr);
                self.remap_expression(&mut node.false_expr);
            }
            Expression::Constant(node) => {
                node.constant_index = self.map_constant(node.constant_index)
            }
            Expression::Function(node) => {
                node.function_index = self.map_function(node.function_index)
            }
            Expression::Intrinsic(node) => {
                for parameter in &mut node.parameters {
                    self.remap_expression(parameter);
                }
            }
            Expression::StructType(node) => {
                node.struct_index = self.map_struct(node.struct_index)
            }
            Expression::Swizzle(node) => self.remap_expression(&mut node.expr),
            Expression::Unary(node) => self.remap_expression(&mut node.operand),
            Expression::Variable(node) => {
                node.variable_index = self.map_variable(node.variable_index)
            }
            Expression::ConstantValue(_)
            | Expression::Identifier(_)
            | Expression::IntrinsicFunction(_)
            | Expression::Module(_)
            | Expression::NamedExternalBlock(_)
            | Expression::Type(_) => {}
        }
    }

    pub fn remap_statement(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::Branch(node) => {
                for cond in &mut node.cond_statements {
                    self.remap_expression(&mut cond.condition);
                    self.remap_statement(&mut cond.statement);
                }
                if let Some(else_statement) = &mut node.else_statement {
                    self.remap_statement(else_statement);
                }
            }
            Statement::Conditional(node) => {
                self.remap_expression(&mut node.condition);
                self.remap_statement(&mut node.statement);
            }
            Statement::DeclareAlias(node) => {
                self.map_alias_opt(&mut node.alias_index);
                self.remap_expression(&mut node.expression);
            }
            Statement::DeclareConst(node) => {
                self.map_constant_opt(&mut node.const_index);
                self.remap_type_value(&mut node.ty);
                if let Some(expression) = &mut node.expression {
                    self.remap_expression(expression);
                }
            }
            Statement::DeclareExternal(node) => {
                self.remap_attr_expr(&mut node.binding_set);
                self.remap_attr_expr(&mut node.auto_binding);
                for var in &mut node.external_vars {
                    self.map_variable_opt(&mut var.var_index);
                    self.remap_type_value(&mut var.ty);
                    self.remap_attr_expr(&mut var.binding_set);
                    self.remap_attr_expr(&mut var.binding_index);
                }
            }
            Statement::DeclareFunction(node) => {
                self.map_function_opt(&mut node.func_index);
                for parameter in &mut node.parameters {
                    self.map_variable_opt(&mut parameter.var_index);
                    self.remap_type_value(&mut parameter.ty);
                }
                self.remap_type_value(&mut node.return_type);
                self.remap_attr_expr(&mut node.entry_stage);
                self.remap_attr_expr(&mut node.is_exported);
                self.remap_attr_expr(&mut node.depth_write);
                self.remap_attr_expr(&mut node.early_fragment_tests);
                self.remap_attr_expr(&mut node.workgroup_size);
                for statement in &mut node.body {
                    self.remap_statement(statement);
                }
            }
            Statement::DeclareOption(node) => {
                self.map_constant_opt(&mut node.opt_index);
                self.remap_type_value(&mut node.opt_type);
                if let Some(default_value) = &mut node.default_value {
                    self.remap_expression(default_value);
                }
            }
            Statement::DeclareStruct(node) => {
                self.map_struct_opt(&mut node.struct_index);
                self.remap_attr_expr(&mut node.is_exported);
                for member in &mut node.description.members {
                    self.remap_type_value(&mut member.ty);
                    self.remap_attr_expr(&mut member.cond);
                    self.remap_attr_expr(&mut member.location_index);
                }
            }
            Statement::DeclareVariable(node) => {
                self.map_variable_opt(&mut node.var_index);
                self.remap_type_value(&mut node.ty);
                if let Some(initial) = &mut node.initial_expression {
                    self.remap_expression(initial);
                }
            }
            Statement::Expression(node) => self.remap_expression(&mut node.expression),
            Statement::For(node) => {
                self.map_variable_opt(&mut node.var_index);
                self.remap_expression(&mut node.from_expr);
                self.remap_expression(&mut node.to_expr);
                if let Some(step) = &mut node.step_expr {
                    self.remap_expression(step);
                }
                self.remap_attr_expr(&mut node.unroll);
                self.remap_statement(&mut node.statement);
            }
            Statement::ForEach(node) => {
                self.map_variable_opt(&mut node.var_index);
                self.remap_expression(&mut node.expression);
                self.remap_attr_expr(&mut node.unroll);
                self.remap_statement(&mut node.statement);
            }
            Statement::Multi(node) => {
                for statement in &mut node.statements {
                    self.remap_statement(statement);
                }
            }
            Statement::Return(node) => {
                if let Some(expression) = &mut node.expression {
                    self.remap_expression(expression);
                }
            }
            Statement::Scoped(node) => self.remap_statement(&mut node.statement),
            Statement::While(node) => {
                self.remap_expression(&mut node.condition);
                self.remap_statement(&mut node.statement);
            }
            Statement::Break(_)
            | Statement::Continue(_)
            | Statement::Discard(_)
            | Statement::Import(_)
            | Statement::NoOp(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use glint_common::span::Span;

    struct Offset(usize);

    impl IndexGenerators for Offset {
        fn next_alias_index(&mut self) -> usize {
            self.bump()
        }
        fn next_constant_index(&mut self) -> usize {
            self.bump()
        }
        fn next_function_index(&mut self) -> usize {
            self.bump()
        }
        fn next_struct_index(&mut self) -> usize {
            self.bump()
        }
        fn next_variable_index(&mut self) -> usize {
            self.bump()
        }
    }

    impl Offset {
        fn bump(&mut self) -> usize {
            let index = self.0;
            self.0 += 1;
            index
        }
    }

    #[test]
    fn same_old_index_maps_once() {
        let span = Span::new(0, 1);
        let mut generators = Offset(100);
        let mut remapper = IndexRemapper::new(&mut generators);

        let ty = crate::ty::ExpressionType::Primitive(crate::ty::PrimitiveType::Int32);
        let mut a = builder::constant_ref(7, ty.clone(), span);
        let mut b = builder::constant_ref(7, ty, span);
        remapper.remap_expression(&mut a);
        remapper.remap_expression(&mut b);

        let index_of = |expr: &Expression| match expr {
            Expression::Constant(node) => node.constant_index,
            _ => unreachable!(),
        };
        assert_eq!(index_of(&a), 100);
        assert_eq!(index_of(&b), 100);
    }

    #[test]
    fn cached_types_are_remapped() {
        let span = Span::new(0, 1);
        let mut generators = Offset(50);
        let mut remapper = IndexRemapper::new(&mut generators);

        let mut expr = builder::struct_type_ref(3, span);
        remapper.remap_expression(&mut expr);

        match &expr {
            Expression::StructType(node) => {
                assert_eq!(node.struct_index, 50);
                assert_eq!(node.cached_type, Some(ExpressionType::Struct(50)));
            }
            _ => unreachable!(),
        }
    }
}
