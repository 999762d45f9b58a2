//! Lexical environments with scope stacks.
//!
//! Identifier resolution walks the current environment's identifiers from
//! newest to oldest (nearest shadow wins) and falls through the parent link.
//! Environments form a tree: the global environment at the root, one child
//! per module, one per named external block. They are arena-allocated and
//! addressed by [`EnvId`] so the resolver can hop between them freely.

use crate::context::{IdentifierData, IdentifierKind};

/// Handle to an environment in the [`EnvArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvId(pub usize);

#[derive(Debug, Clone)]
pub struct NamedIdentifier {
    pub name: String,
    pub data: IdentifierData,
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    prev_len: usize,
}

/// One lexical environment.
#[derive(Debug)]
pub struct Environment {
    pub parent: Option<EnvId>,
    /// Name of the module this environment belongs to.
    pub module_id: String,
    identifiers: Vec<NamedIdentifier>,
    scopes: Vec<Scope>,
}

/// Arena of all environments of one compilation.
#[derive(Debug, Default)]
pub struct EnvArena {
    envs: Vec<Environment>,
}

impl EnvArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, parent: Option<EnvId>, module_id: impl Into<String>) -> EnvId {
        let id = EnvId(self.envs.len());
        self.envs.push(Environment {
            parent,
            module_id: module_id.into(),
            identifiers: Vec::new(),
            scopes: Vec::new(),
        });
        id
    }

    pub fn module_id(&self, env: EnvId) -> &str {
        &self.envs[env.0].module_id
    }

    /// Open a scope: identifiers registered from here on are dropped at the
    /// matching [`pop_scope`](Self::pop_scope).
    pub fn push_scope(&mut self, env: EnvId) {
        let environment = &mut self.envs[env.0];
        environment.scopes.push(Scope {
            prev_len: environment.identifiers.len(),
        });
    }

    /// Close the innermost scope, dropping its identifiers.
    ///
    /// # Panics
    ///
    /// Panics if the environment has no open scope.
    pub fn pop_scope(&mut self, env: EnvId) {
        let environment = &mut self.envs[env.0];
        let scope = environment
            .scopes
            .pop()
            .expect("cannot pop scope: none is open");
        environment.identifiers.truncate(scope.prev_len);
    }

    /// Register an identifier in `env`'s innermost scope (or at environment
    /// level when no scope is open).
    pub fn register(&mut self, env: EnvId, name: impl Into<String>, data: IdentifierData) {
        self.envs[env.0].identifiers.push(NamedIdentifier {
            name: name.into(),
            data,
        });
    }

    /// Find `name`, innermost shadow first, falling through parent
    /// environments.
    pub fn find(&self, env: EnvId, name: &str) -> Option<&IdentifierData> {
        self.find_if(env, name, |_| true)
    }

    /// Like [`find`](Self::find) but skipping entries the predicate rejects.
    pub fn find_if(
        &self,
        env: EnvId,
        name: &str,
        mut accept: impl FnMut(&IdentifierData) -> bool,
    ) -> Option<&IdentifierData> {
        let mut current = Some(env);
        while let Some(id) = current {
            let environment = &self.envs[id.0];
            for identifier in environment.identifiers.iter().rev() {
                if identifier.name == name && accept(&identifier.data) {
                    return Some(&identifier.data);
                }
            }
            current = environment.parent;
        }
        None
    }

    /// Whether `name` can be registered under the active conditional.
    ///
    /// Two identifiers with the same name may coexist iff their conditional
    /// indices differ and neither is unconditional.
    pub fn is_available(&self, env: EnvId, name: &str, current_conditional: u32) -> bool {
        match self.find(env, name) {
            None => true,
            Some(existing) => {
                existing.conditional_index != 0
                    && current_conditional != 0
                    && existing.conditional_index != current_conditional
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(index: usize, kind: IdentifierKind) -> IdentifierData {
        IdentifierData {
            index,
            kind,
            conditional_index: 0,
        }
    }

    #[test]
    fn lookup_in_current_environment() {
        let mut arena = EnvArena::new();
        let env = arena.alloc(None, "main");
        arena.register(env, "x", data(0, IdentifierKind::Variable));

        assert!(arena.find(env, "x").is_some());
        assert!(arena.find(env, "y").is_none());
    }

    #[test]
    fn lookup_falls_through_parent() {
        let mut arena = EnvArena::new();
        let global = arena.alloc(None, "");
        let module = arena.alloc(Some(global), "main");
        arena.register(global, "vec3", data(0, IdentifierKind::Type));

        let found = arena.find(module, "vec3").unwrap();
        assert_eq!(found.kind, IdentifierKind::Type);
    }

    #[test]
    fn shadowing_and_scope_cleanup() {
        let mut arena = EnvArena::new();
        let env = arena.alloc(None, "main");
        arena.register(env, "x", data(0, IdentifierKind::Variable));

        arena.push_scope(env);
        arena.register(env, "x", data(1, IdentifierKind::Constant));
        assert_eq!(arena.find(env, "x").unwrap().index, 1);

        arena.pop_scope(env);
        assert_eq!(arena.find(env, "x").unwrap().index, 0);
    }

    #[test]
    fn conditional_coexistence() {
        let mut arena = EnvArena::new();
        let env = arena.alloc(None, "main");
        arena.register(
            env,
            "f",
            IdentifierData {
                index: 0,
                kind: IdentifierKind::Function,
                conditional_index: 1,
            },
        );

        // Same name under a different conditional is fine.
        assert!(arena.is_available(env, "f", 2));
        // Same conditional, or unconditional, collides.
        assert!(!arena.is_available(env, "f", 1));
        assert!(!arena.is_available(env, "f", 0));
    }

    #[test]
    #[should_panic(expected = "cannot pop scope")]
    fn pop_without_push_panics() {
        let mut arena = EnvArena::new();
        let env = arena.alloc(None, "main");
        arena.pop_scope(env);
    }
}
