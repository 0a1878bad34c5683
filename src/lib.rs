//! Compiles editor-authored condition lists into boolean filter trees.
//!
//! A condition list is a flat sequence of conditions and junctions, each
//! annotated with the grouping level of its parentheses. Compiling it
//! resolves every attribute, lowers every condition into a leaf node with
//! bound parameters, and associates the leaves into AND / OR sets with AND
//! binding tighter than OR.

pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod filter;
pub mod lowering;
pub mod model;
pub mod render;
pub mod resolver;
pub mod tree_builder;

pub use compiler::{CompiledFilter, FilterCompiler};
pub use error::{CompileError, StructuralError};
