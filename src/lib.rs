//! tyc: a whole-program static type checker for a dynamically typed
//! scripting language.
//!
//! The pipeline lives in the workspace crates; this root crate re-exports
//! them under one roof and hosts the batch CLI binary.
//!
//! - `common`: interner, spans, diagnostics, limits, cancellation
//! - `ast`: desugared input trees (the parser is an external producer)
//! - `binder`: symbol table and namer
//! - `solver`: the type lattice and signature store
//! - `resolver`: constants, ancestry linearization, annotations
//! - `checker`: CFG construction and type inference
//! - `driver`: incremental analysis driver and global state

pub use tyc_ast as ast;
pub use tyc_binder as binder;
pub use tyc_checker as checker;
pub use tyc_common as common;
pub use tyc_driver as driver;
pub use tyc_resolver as resolver;
pub use tyc_solver as solver;

pub use tyc_driver::{AnalysisResult, Analyzer, AnalyzerOptions, FileInput, PathTaken};
