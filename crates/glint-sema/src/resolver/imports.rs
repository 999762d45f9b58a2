//! Import resolution and module linking.
//!
//! An import resolves its target through the caller-supplied module
//! resolver, merges the target's symbols into the compilation's tables
//! (remapping indices), and materializes the requested symbols as aliases
//! and constant re-declarations in the importing module. Module identity is
//! the resolved metadata name, so two paths yielding the same module are
//! de-duplicated; a sentinel installed while a module resolves catches
//! circular imports.

use fixedbitset::FixedBitSet;
use tracing::debug;

use glint_common::span::Span;

use glint_ast::builder;
use glint_ast::export::{visit_exports, ExportVisitor};
use glint_ast::module::ImportedModule;
use glint_ast::remap::IndexRemapper;
use glint_ast::stmt::{
    DeclareConstStatement, DeclareFunctionStatement, DeclareStructStatement, ImportStatement,
    MultiStatement, Statement,
};
use glint_ast::transform::StmtTransformation;

use crate::context::TransformerContext;
use crate::error::{CompileError, CompileErrorKind};
use crate::usage::UsageChecker;

use super::{ContextGenerators, ExportedSet, ModuleState, Resolver, MODULE_ID_SENTINEL};

fn bit_contains(bits: &FixedBitSet, index: usize) -> bool {
    index < bits.len() && bits.contains(index)
}

fn bit_insert(bits: &mut FixedBitSet, index: usize) {
    if index >= bits.len() {
        bits.grow(index + 1);
    }
    bits.insert(index);
}

/// Derive a legal identifier from a module name (identifiers cannot start
/// with a digit, hence the prefix).
fn module_identifier(module_name: &str) -> String {
    let mut identifier = String::with_capacity(module_name.len() + 1);
    identifier.push('_');
    identifier.extend(
        module_name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' }),
    );
    identifier
}

impl Resolver<'_> {
    pub(super) fn resolve_import(
        &mut self,
        node: ImportStatement,
    ) -> Result<StmtTransformation, CompileError> {
        // Gather the requested symbols: name -> renames ("" = not renamed).
        let mut imported_symbols: Vec<(String, Vec<String>)> = Vec::new();
        let mut import_everything = false;
        for entry in &node.identifiers {
            if entry.identifier.is_empty() {
                if import_everything {
                    return Err(self.error(CompileErrorKind::ImportMultipleWildcard, entry.span));
                }
                if !entry.renamed_identifier.is_empty() {
                    return Err(self.error(
                        CompileErrorKind::ImportWildcardRename,
                        entry.span.merge(entry.renamed_span),
                    ));
                }
                import_everything = true;
            } else {
                let renames = match imported_symbols
                    .iter_mut()
                    .find(|(name, _)| name == &entry.identifier)
                {
                    Some((_, renames)) => renames,
                    None => {
                        imported_symbols.push((entry.identifier.clone(), Vec::new()));
                        &mut imported_symbols.last_mut().expect("just pushed").1
                    }
                };
                if entry.renamed_identifier.is_empty()
                    && renames.iter().any(String::is_empty)
                {
                    return Err(self.error(
                        CompileErrorKind::ImportIdentifierAlreadyPresent {
                            name: entry.identifier.clone(),
                        },
                        entry.span,
                    ));
                }
                renames.push(entry.renamed_identifier.clone());
            }
        }

        let Some(module_resolver) = self.options.module_resolver else {
            if !self.context.partial_compilation {
                return Err(self.error(CompileErrorKind::NoModuleResolver, node.span));
            }
            // A wildcard import could bring in any identifier, so unknown
            // names stop being errors from here on.
            if import_everything {
                self.context.allow_unknown_identifiers = true;
            } else {
                for (identifier, renames) in imported_symbols {
                    for rename in renames {
                        if rename.is_empty() {
                            self.register_unresolved(identifier.clone());
                        } else {
                            self.register_unresolved(rename);
                        }
                    }
                }
            }
            return Ok(StmtTransformation::DontVisitChildren(Statement::Import(node)));
        };

        // Resolve every time; identity comes from the returned metadata, so
        // several paths may name the same module.
        let Some(target) = module_resolver.resolve(&node.module_name) else {
            return Err(self.error(
                CompileErrorKind::ModuleNotFound {
                    module_name: node.module_name.clone(),
                },
                node.span,
            ));
        };

        for feature in &target.metadata.enabled_features {
            if !self.is_feature_enabled(*feature) {
                return Err(self.error(
                    CompileErrorKind::ModuleFeatureMismatch {
                        module_name: node.module_name.clone(),
                        feature: feature.name().into(),
                    },
                    node.span,
                ));
            }
        }

        let target_name = target.metadata.module_name.clone();
        let generated_identifier = module_identifier(&target_name);

        let module_index = if let Some(&known) = self
            .module_by_name
            .get(&node.module_name)
            .or_else(|| self.module_by_name.get(&target_name))
        {
            if known == MODULE_ID_SENTINEL {
                return Err(self.error(
                    CompileErrorKind::CircularImport {
                        module_name: node.module_name.clone(),
                    },
                    node.span,
                ));
            }
            self.module_by_name.insert(node.module_name.clone(), known);
            known
        } else {
            self.load_module(&node, target, &target_name, &generated_identifier)?
        };

        // Materialize the requested symbols in the importing module.
        let mut alias_statements: Vec<Statement> = Vec::new();
        let mut const_statements: Vec<Statement> = Vec::new();

        if !imported_symbols.is_empty() || import_everything {
            let importing_module = self.envs.module_id(self.current_env).to_string();
            let span = node.span;

            {
                let root = &self.imports[module_index].module.root;
                let state = &mut self.modules[module_index];
                let context: &TransformerContext = self.context;

                let mut collector = ImportCollector {
                    context,
                    usage: state.usage.as_mut(),
                    exported_set: state.exported_sets.entry(importing_module).or_default(),
                    imported_symbols: &mut imported_symbols,
                    import_everything,
                    alias_statements: &mut alias_statements,
                    const_statements: &mut const_statements,
                    error: None,
                    span,
                };
                visit_exports(root, &mut collector);
                if let Some(error) = collector.error {
                    return Err(error);
                }
            }

            if !imported_symbols.is_empty() {
                let names: Vec<String> =
                    imported_symbols.into_iter().map(|(name, _)| name).collect();
                return Err(self.error(
                    CompileErrorKind::ImportIdentifierNotFound {
                        names: names.join(", "),
                        module_name: node.module_name.clone(),
                    },
                    node.span,
                ));
            }

            if alias_statements.is_empty() && const_statements.is_empty() {
                return Ok(StmtTransformation::Remove);
            }
        } else {
            // Plain import: bind the module itself to an identifier.
            let alias_name = if node.module_identifier.is_empty() {
                target_name
                    .chars()
                    .map(|c| if c.is_alphanumeric() { c } else { '_' })
                    .collect()
            } else {
                node.module_identifier.clone()
            };
            alias_statements.push(builder::declare_alias(
                alias_name,
                builder::module_ref(module_index, node.span),
                node.span,
            ));
        }

        let mut statements = alias_statements;
        statements.append(&mut const_statements);
        for statement in &mut statements {
            self.handle_statement(statement)?;
        }

        if self.options.remove_aliases {
            return Ok(StmtTransformation::Remove);
        }

        Ok(StmtTransformation::Replace(Statement::Multi(MultiStatement {
            span: node.span,
            statements,
        })))
    }

    /// Resolve a freshly-loaded module in its own environment and install it
    /// in the compilation.
    fn load_module(
        &mut self,
        node: &ImportStatement,
        mut target: glint_ast::module::Module,
        target_name: &str,
        generated_identifier: &str,
    ) -> Result<usize, CompileError> {
        debug!(module = %target_name, "linking imported module");

        if !target.imported_modules.is_empty() {
            return Err(self.error(
                CompileErrorKind::Internal {
                    message: "imported modules cannot have imported modules themselves".into(),
                },
                node.span,
            ));
        }

        // The sentinel stays installed while the module (and its own
        // imports) resolve; re-entry through either name is a cycle.
        self.module_by_name
            .insert(node.module_name.clone(), MODULE_ID_SENTINEL);
        self.module_by_name
            .insert(target_name.to_string(), MODULE_ID_SENTINEL);

        // Indices encoded in the loaded tree come from another compilation;
        // remap them into ours.
        {
            let mut generators = ContextGenerators(&mut *self.context);
            let mut remapper = IndexRemapper::new(&mut generators);
            for statement in &mut target.root.statements {
                remapper.remap_statement(statement);
            }
        }

        let module_env = self
            .envs
            .alloc(Some(self.global_env), target_name.to_string());

        // Reserve this module's state slot before resolving: the module's
        // own imports load recursively and take the slots after it.
        let module_index = self.modules.len();
        self.modules.push(ModuleState {
            env: module_env,
            usage: None,
            exported_sets: Default::default(),
        });
        self.imports.push(ImportedModule {
            identifier: generated_identifier.to_string(),
            module: glint_ast::module::Module::new(
                target.metadata.clone(),
                Default::default(),
            ),
        });

        let previous_env = self.current_env;
        let previous_module = self.current_module_index;
        // The importing module's pass-1 may still be collecting pending
        // function bodies; they are not ours to drain.
        let previous_pending = std::mem::take(&mut self.pending_functions);
        self.current_env = module_env;
        self.current_module_index = module_index;

        let result = self.resolve_module_root(&mut target.root);

        self.current_env = previous_env;
        self.current_module_index = previous_module;
        self.pending_functions = previous_pending;

        result.map_err(|err| {
            self.error(
                CompileErrorKind::ModuleCompilationFailed {
                    module_name: node.module_name.clone(),
                    error: err.to_string(),
                },
                node.span,
            )
        })?;

        if !self.context.partial_compilation {
            let mut checker = UsageChecker::new();
            checker.register(&target.root);
            self.modules[module_index].usage = Some(checker);
        }
        self.imports[module_index].module = target;

        self.register_module_identifier(
            generated_identifier.to_string(),
            module_index,
            target_name.to_string(),
            node.span,
        )?;

        self.module_by_name
            .insert(node.module_name.clone(), module_index);
        self.module_by_name
            .insert(target_name.to_string(), module_index);

        Ok(module_index)
    }
}

/// Collects the alias/const statements an import materializes.
struct ImportCollector<'a> {
    context: &'a TransformerContext,
    usage: Option<&'a mut UsageChecker>,
    exported_set: &'a mut ExportedSet,
    imported_symbols: &'a mut Vec<(String, Vec<String>)>,
    import_everything: bool,
    alias_statements: &'a mut Vec<Statement>,
    const_statements: &'a mut Vec<Statement>,
    error: Option<CompileError>,
    span: Span,
}

impl ImportCollector<'_> {
    /// Whether `identifier` was requested, and under which names.
    fn check_import(&mut self, identifier: &str) -> Option<Vec<String>> {
        if let Some(position) = self
            .imported_symbols
            .iter()
            .position(|(name, _)| name == identifier)
        {
            let (_, renames) = self.imported_symbols.remove(position);
            return Some(renames);
        }
        if self.import_everything {
            return Some(vec![String::new()]);
        }
        None
    }
}

impl ExportVisitor for ImportCollector<'_> {
    fn exported_const(&mut self, stmt: &DeclareConstStatement) {
        if self.error.is_some() {
            return;
        }
        let Some(const_index) = stmt.const_index else { return };
        let Some(renames) = self.check_import(&stmt.name) else {
            return;
        };

        let value = self
            .context
            .constants
            .try_retrieve(const_index, self.span)
            .ok()
            .flatten()
            .and_then(|data| data.value.clone());
        let Some(value) = value else {
            self.error = Some(CompileError::new(
                CompileErrorKind::InvalidConstantIndex { index: const_index },
                stmt.span,
            ));
            return;
        };

        if let Some(usage) = self.usage.as_deref_mut() {
            usage.mark_constant_as_used(const_index);
        }

        for rename in renames {
            let imported_name = if rename.is_empty() {
                if bit_contains(&self.exported_set.constants, const_index) {
                    continue;
                }
                bit_insert(&mut self.exported_set.constants, const_index);
                stmt.name.clone()
            } else {
                rename
            };
            self.const_statements.push(builder::declare_const(
                imported_name,
                glint_ast::expr::ExprValue::None,
                builder::constant_ref(const_index, value.constant_type(), self.span),
                self.span,
            ));
        }
    }

    fn exported_function(&mut self, stmt: &DeclareFunctionStatement) {
        if self.error.is_some() {
            return;
        }
        let Some(func_index) = stmt.func_index else { return };
        let Some(renames) = self.check_import(&stmt.name) else {
            return;
        };

        if let Some(usage) = self.usage.as_deref_mut() {
            usage.mark_function_as_used(func_index);
        }

        for rename in renames {
            let imported_name = if rename.is_empty() {
                if bit_contains(&self.exported_set.functions, func_index) {
                    continue;
                }
                bit_insert(&mut self.exported_set.functions, func_index);
                stmt.name.clone()
            } else {
                rename
            };
            self.alias_statements.push(builder::declare_alias(
                imported_name,
                builder::function_ref(func_index, self.span),
                self.span,
            ));
        }
    }

    fn exported_struct(&mut self, stmt: &DeclareStructStatement) {
        if self.error.is_some() {
            return;
        }
        let Some(struct_index) = stmt.struct_index else { return };
        let Some(renames) = self.check_import(&stmt.description.name) else {
            return;
        };

        if let Some(usage) = self.usage.as_deref_mut() {
            usage.mark_struct_as_used(struct_index);
        }

        for rename in renames {
            let imported_name = if rename.is_empty() {
                if bit_contains(&self.exported_set.structs, struct_index) {
                    continue;
                }
                bit_insert(&mut self.exported_set.structs, struct_index);
                stmt.description.name.clone()
            } else {
                rename
            };
            self.alias_statements.push(builder::declare_alias(
                imported_name,
                builder::struct_type_ref(struct_index, self.span),
                self.span,
            ));
        }
    }
}
