//! The versioned global model.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tyc_ast::SourceFile;
use tyc_binder::{MethodBinding, SymbolId, SymbolTable};
use tyc_common::diagnostics::Diagnostic;
use tyc_common::interner::NameTable;
use tyc_common::FileId;
use tyc_solver::{SignatureStore, TypeInterner};

use crate::dependency_graph::DependencyGraph;

/// Monotonically increasing version of the global state. A new epoch is
/// published atomically when (and only when) an analysis path completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }
}

/// Diagnostics for one file, bucketed by the stage that produced them so
/// the fast path can replace only the checking bucket. Early-stage
/// diagnostics never suppress later ones.
#[derive(Clone, Debug, Default)]
pub struct FileDiagnostics {
    pub naming: Vec<Diagnostic>,
    pub resolving: Vec<Diagnostic>,
    pub checking: Vec<Diagnostic>,
}

impl FileDiagnostics {
    pub fn all(&self) -> impl Iterator<Item = &Diagnostic> {
        self.naming
            .iter()
            .chain(self.resolving.iter())
            .chain(self.checking.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.naming.is_empty() && self.resolving.is_empty() && self.checking.is_empty()
    }
}

/// Everything known about one analyzed file.
///
/// Replaced wholesale when the file is edited; never mutated in place
/// except for the re-check bookkeeping the fast path performs.
#[derive(Clone, Debug)]
pub struct FileRecord {
    pub path: String,
    /// Fingerprint of the current tree; used to skip no-op edits.
    pub fingerprint: u64,
    /// Declaration digest; unchanged digest means fast-path eligible.
    pub decl_digest: u64,
    pub tree: Arc<SourceFile>,
    /// Symbols this file declares or contributes to.
    pub defines: FxHashSet<SymbolId>,
    pub methods: Vec<MethodBinding>,
    /// Symbols referenced by declarations and annotations (resolver
    /// output). Replaced on every slow path.
    pub decl_refs: FxHashSet<SymbolId>,
    /// Symbols referenced from method bodies (checker output). Replaced
    /// whenever the file is re-checked.
    pub body_refs: FxHashSet<SymbolId>,
    /// The upstream parser could not produce a tree: the file contributes
    /// no symbols and exactly one parse-failure diagnostic.
    pub failed: bool,
}

/// The aggregate the driver versions and publishes.
///
/// The name table and type interner are append-only and shared across
/// epochs; everything else is cloned for speculative work and swapped in
/// atomically on success.
#[derive(Clone)]
pub struct GlobalState {
    pub epoch: Epoch,
    pub names: Arc<NameTable>,
    pub types: Arc<TypeInterner>,
    pub table: SymbolTable,
    pub store: SignatureStore,
    pub files: FxHashMap<FileId, FileRecord>,
    pub paths: FxHashMap<String, FileId>,
    pub deps: DependencyGraph,
    pub diagnostics: FxHashMap<FileId, FileDiagnostics>,
}

impl GlobalState {
    pub fn new() -> Self {
        let names = Arc::new(NameTable::new());
        let table = SymbolTable::new(&names);
        GlobalState {
            epoch: Epoch(0),
            names,
            types: Arc::new(TypeInterner::new()),
            table,
            store: SignatureStore::new(),
            files: FxHashMap::default(),
            paths: FxHashMap::default(),
            deps: DependencyGraph::new(),
            diagnostics: FxHashMap::default(),
        }
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.paths.get(path).copied()
    }

    /// All diagnostics, in stable output order.
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        let mut out: Vec<Diagnostic> = self
            .diagnostics
            .values()
            .flat_map(|d| d.all().cloned())
            .collect();
        tyc_common::diagnostics::sort_diagnostics(&mut out);
        out
    }

    /// Diagnostics for a specific set of files, in stable output order.
    pub fn diagnostics_for(&self, files: &[FileId]) -> Vec<Diagnostic> {
        let mut out: Vec<Diagnostic> = files
            .iter()
            .filter_map(|f| self.diagnostics.get(f))
            .flat_map(|d| d.all().cloned())
            .collect();
        tyc_common::diagnostics::sort_diagnostics(&mut out);
        out
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new()
    }
}
