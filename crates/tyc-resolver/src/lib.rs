//! The resolver: whole-program passes between naming and checking.
//!
//! Given the symbol table the namer produced, the resolver
//!
//! 1. resolves every declared superclass/mixin constant reference,
//!    retrying in passes until a fixed point (forward references inside
//!    mutual-dependency cycles resolve in a later pass; what is still
//!    unresolved after the fixed point is reported and defaults away),
//! 2. linearizes every class's ancestry (deterministic, depth-first,
//!    duplicates keep the most-derived occurrence) and detects cyclic
//!    hierarchies, which are fatal for the participating classes only,
//! 3. lowers declared annotations into lattice types, filling the
//!    signature store, and
//! 4. checks override compatibility along the freshly built ancestries.
//!
//! Resolution is single-threaded over the whole table: each pass may
//! depend on any other class.

mod annotations;
mod constants;
mod linearize;
mod overrides;

pub use constants::resolve_constant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use tyc_binder::{SymbolId, SymbolTable, symbol_flags};
use tyc_common::diagnostics::Diagnostic;
use tyc_common::interner::NameTable;
use tyc_common::{FileId, Limits};
use tyc_solver::{SignatureStore, TypeInterner};

/// Everything the resolver learned in one run.
#[derive(Debug, Default)]
pub struct ResolveOutput {
    pub diagnostics: Vec<Diagnostic>,
    pub store: SignatureStore,
    /// Symbols each file references through declarations and annotations.
    /// The driver merges these edges into the dependency graph.
    pub references: FxHashMap<FileId, FxHashSet<SymbolId>>,
}

/// Shared context for the resolver passes.
pub(crate) struct ResolveCx<'a> {
    pub table: &'a mut SymbolTable,
    pub names: &'a NameTable,
    pub interner: &'a TypeInterner,
    pub file_paths: &'a FxHashMap<FileId, String>,
    pub limits: &'a Limits,
    pub out: ResolveOutput,
}

impl ResolveCx<'_> {
    pub(crate) fn file_path(&self, file: FileId) -> String {
        self.file_paths
            .get(&file)
            .cloned()
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    pub(crate) fn record_reference(&mut self, from: FileId, to: SymbolId) {
        self.out.references.entry(from).or_default().insert(to);
    }
}

/// Clear every resolver-written fact so the passes can run again on a
/// table whose declarations changed. Core symbols keep their built-in
/// superclass edges (they have no annotation trees to re-resolve);
/// everything recomputes ancestry.
pub fn reset_resolution(table: &mut SymbolTable) {
    let ids: Vec<SymbolId> = table.live_ids().collect();
    for id in ids {
        let Some(sym) = table.get_mut(id) else { continue };
        sym.ancestry = None;
        sym.clear_flag(symbol_flags::RESOLVED | symbol_flags::CYCLIC_ANCESTRY);
        if sym.has_flag(symbol_flags::CORE) {
            continue;
        }
        sym.superclass = None;
        sym.includes.clear();
        for mixin in &mut sym.mixin_exprs {
            mixin.target = None;
        }
    }
}

/// Run all resolver passes over the table.
pub fn resolve_program(
    table: &mut SymbolTable,
    names: &NameTable,
    interner: &TypeInterner,
    file_paths: &FxHashMap<FileId, String>,
    limits: &Limits,
) -> ResolveOutput {
    debug!(symbols = table.len(), "resolving program");
    let mut cx = ResolveCx {
        table,
        names,
        interner,
        file_paths,
        limits,
        out: ResolveOutput::default(),
    };

    constants::resolve_hierarchy_constants(&mut cx);
    linearize::linearize_all(&mut cx);
    annotations::resolve_signatures(&mut cx);
    overrides::check_overrides(&mut cx);

    // Everything that survived is fully resolved; cyclic classes keep
    // their flag and stay stubs.
    let ids: Vec<SymbolId> = cx.table.live_ids().collect();
    for id in ids {
        if let Some(sym) = cx.table.get_mut(id) {
            if !sym.has_flag(symbol_flags::CYCLIC_ANCESTRY) {
                sym.set_flag(symbol_flags::RESOLVED);
            }
        }
    }

    cx.out
}
