//! Shared infrastructure for the Glint compiler.
//!
//! This crate holds the pieces every other compiler layer builds on:
//!
//! - [`span`]: byte-offset source spans and on-demand line/column lookup
//! - [`arena`]: the index-stable symbol arena ([`arena::IndexList`]) backing
//!   every symbol table in the semantic core

pub mod arena;
pub mod span;

pub use arena::{ArenaError, IndexList};
pub use span::{LineIndex, Span};
