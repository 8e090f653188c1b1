//! Compilation and compile-result caching

pub mod cache;
pub mod compiler;

pub use cache::{CacheEntry, CompileCache, OutputSet};
pub use compiler::Compiler;
