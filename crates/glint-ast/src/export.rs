//! Walk over a module's exported declarations.
//!
//! The module linker uses this to find what an imported module offers:
//! every `const`, `fn` and `struct` whose `export` attribute resolved to
//! true. Only resolved trees are walked, so conditionals have already been
//! collapsed; the walk still descends into multi-statements and scoped
//! wrappers.

use crate::expr::ExprValue;
use crate::stmt::{
    DeclareConstStatement, DeclareFunctionStatement, DeclareStructStatement, MultiStatement,
    Statement,
};

/// Receiver for exported declarations.
pub trait ExportVisitor {
    fn exported_const(&mut self, stmt: &DeclareConstStatement);
    fn exported_function(&mut self, stmt: &DeclareFunctionStatement);
    fn exported_struct(&mut self, stmt: &DeclareStructStatement);
}

fn is_exported(value: &ExprValue<bool>) -> bool {
    matches!(value, ExprValue::Value(true))
}

fn visit_statement<V: ExportVisitor>(stmt: &Statement, visitor: &mut V) {
    match stmt {
        Statement::DeclareConst(node) if is_exported(&node.is_exported) => {
            visitor.exported_const(node)
        }
        Statement::DeclareFunction(node) if is_exported(&node.is_exported) => {
            visitor.exported_function(node)
        }
        Statement::DeclareStruct(node) if is_exported(&node.is_exported) => {
            visitor.exported_struct(node)
        }
        Statement::Multi(node) => {
            for statement in &node.statements {
                visit_statement(statement, visitor);
            }
        }
        Statement::Scoped(node) => visit_statement(&node.statement, visitor),
        Statement::Conditional(node) => visit_statement(&node.statement, visitor),
        _ => {}
    }
}

/// Invoke `visitor` for each exported declaration under `root`.
pub fn visit_exports<V: ExportVisitor>(root: &MultiStatement, visitor: &mut V) {
    for statement in &root.statements {
        visit_statement(statement, visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use glint_common::span::Span;

    #[derive(Default)]
    struct Collect {
        consts: Vec<String>,
        functions: Vec<String>,
    }

    impl ExportVisitor for Collect {
        fn exported_const(&mut self, stmt: &DeclareConstStatement) {
            self.consts.push(stmt.name.clone());
        }
        fn exported_function(&mut self, stmt: &DeclareFunctionStatement) {
            self.functions.push(stmt.name.clone());
        }
        fn exported_struct(&mut self, _stmt: &DeclareStructStatement) {}
    }

    #[test]
    fn only_exported_declarations_are_visited() {
        let span = Span::new(0, 1);
        let exported = match builder::declare_const("a", ExprValue::None, builder::int_literal(1, span), span)
        {
            Statement::DeclareConst(mut node) => {
                node.is_exported = ExprValue::Value(true);
                Statement::DeclareConst(node)
            }
            _ => unreachable!(),
        };
        let hidden = builder::declare_const("b", ExprValue::None, builder::int_literal(2, span), span);

        let root = MultiStatement {
            span,
            statements: vec![exported, hidden],
        };

        let mut collect = Collect::default();
        visit_exports(&root, &mut collect);
        assert_eq!(collect.consts, vec!["a"]);
        assert!(collect.functions.is_empty());
    }
}
