//! Structured control flow reconstruction.
//!
//! Turns a basic-block control flow graph into a tree of nested blocks,
//! loops, conditionals and switches whose `break`/`continue` jumps all name
//! an enclosing construct. See [`structurize::structurize`] for the core
//! algorithm and [`pipeline::Pipeline`] for the module-level driver.

pub mod entity;
pub mod error;
pub mod ir;
pub mod pipeline;
pub mod structurize;

pub use error::CoreError;
