//! Owned abstract syntax tree for the Glint shading language.
//!
//! The tree is a closed tagged-variant design: one enum per node category
//! ([`expr::Expression`], [`stmt::Statement`]), discriminating exactly the
//! node kinds the resolver knows. Expressions own their children; references
//! from expressions into declarations are carried as indices into the
//! semantic symbol tables, never as pointers, so the owned tree is always
//! acyclic.
//!
//! # Architecture
//!
//! - [`ty`]: the `ExpressionType` model covering every type the language knows
//! - [`constant`]: compile-time values (scalars, vectors, arrays, literals)
//! - [`expr`] / [`stmt`]: the node enums, plus attribute slots ([`expr::ExprValue`])
//! - [`module`]: translation units, metadata, features, imported modules
//! - [`intrinsic`]: the builtin intrinsic function kinds
//! - [`transform`]: the generic rewriting driver (visit / replace / remove)
//! - [`remap`]: structural clone-time index rewriting
//! - [`export`]: callback walk over a module's exported declarations
//! - [`builder`]: node construction helpers for synthesized code and tests

pub mod builder;
pub mod constant;
pub mod export;
pub mod expr;
pub mod intrinsic;
pub mod module;
pub mod remap;
pub mod stmt;
pub mod transform;
pub mod ty;

pub use constant::{ConstantValue, ScalarValue};
pub use expr::{Expression, ExprValue};
pub use intrinsic::IntrinsicKind;
pub use module::{Module, ModuleFeature, ModuleMetadata, ShaderStage};
pub use stmt::Statement;
pub use ty::{ExpressionType, PrimitiveType};
