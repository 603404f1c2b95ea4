//! The incremental analysis driver.
//!
//! Sits above the namer, resolver, and checker: owns the [`GlobalState`]
//! (symbol table, signature store, files, dependency graph, per-file
//! diagnostics), fans per-file work out to a rayon pool, merges results
//! through a single writer, and on every edit batch picks the cheapest
//! sound re-analysis path. A new state is published atomically only when
//! a batch completes; cancelled or failed work leaves the previous epoch
//! untouched.

pub mod dependency_graph;
mod driver;
mod state;

pub use dependency_graph::DependencyGraph;
pub use driver::{AnalysisResult, Analyzer, AnalyzerOptions, FileInput, PathTaken};
pub use state::{Epoch, FileDiagnostics, FileRecord, GlobalState};
