//! Method-body analysis: CFG construction and type inference.
//!
//! [`cfg`] lowers each desugared method body into a control-flow graph of
//! basic blocks over explicit bindings; [`infer`] runs forward abstract
//! interpretation over that graph against the resolved symbol table.
//! Both stages are per-file pure: they read the shared table, interner,
//! and signature store, and return diagnostics plus reference edges for
//! the driver to merge.

pub mod cfg;
pub mod infer;

use rustc_hash::FxHashSet;
use tracing::debug;
use tyc_ast::SourceFile;
use tyc_binder::{MethodBinding, SymbolId, SymbolTable};
use tyc_common::diagnostics::Diagnostic;
use tyc_common::interner::NameTable;
use tyc_common::Limits;
use tyc_solver::{SignatureStore, TypeInterner};

/// Output of checking one file: diagnostics for that file only, plus the
/// symbols its bodies reference (dependency-graph edges).
#[derive(Debug, Default)]
pub struct FileCheckResult {
    pub diagnostics: Vec<Diagnostic>,
    pub references: FxHashSet<SymbolId>,
}

/// Lower and infer every method of one file.
///
/// Pure with respect to shared state: safe to run for many files in
/// parallel against the same (read-only) table and store.
pub fn check_file(
    table: &SymbolTable,
    names: &NameTable,
    interner: &TypeInterner,
    store: &SignatureStore,
    limits: &Limits,
    tree: &SourceFile,
    methods: &[MethodBinding],
) -> FileCheckResult {
    debug!(file = tree.path, methods = methods.len(), "checking file");
    let mut result = FileCheckResult::default();

    for binding in methods {
        let Some(decl) = tree.method_at(&binding.path) else {
            continue;
        };
        let graph = cfg::lower_method(decl);
        cfg::check_definite_assignment(
            &graph,
            names,
            &tree.path,
            &mut result.diagnostics,
        );
        let method_result = infer::check_method(&infer::InferCx {
            table,
            names,
            interner,
            store,
            limits,
            file_path: &tree.path,
            method: binding.symbol,
            owner: binding.owner,
        }, &graph);
        result.diagnostics.extend(method_result.diagnostics);
        result.references.extend(method_result.references);
    }

    result
}
