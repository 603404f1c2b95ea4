//! The analyzer: full builds plus the fast/slow incremental paths.
//!
//! Per-file work (declaration collection, lowering, inference) fans out
//! on the rayon pool producing immutable artifacts; the coordinating
//! task applies them to the global model sequentially, so the symbol
//! table only ever has a single writer. All work happens on a clone of
//! the current state; the clone is published atomically at the end of a
//! successful path, and discarded on cancellation or failure.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, info};
use tyc_ast::SourceFile;
use tyc_binder::{CollectedFile, SymbolId, apply_file, collect_file, remove_file_symbols};
use tyc_checker::{FileCheckResult, check_file};
use tyc_common::diagnostics::{Diagnostic, diagnostic_codes, message_for};
use tyc_common::{Cancelled, CancellationToken, FileId, Limits, Span};
use tyc_resolver::{ResolveOutput, reset_resolution, resolve_program};

use crate::state::{Epoch, FileDiagnostics, FileRecord, GlobalState};

#[derive(Clone, Debug, Default)]
pub struct AnalyzerOptions {
    pub limits: Limits,
    /// Debug/verification knob: classify every batch as slow-path. The
    /// fast path must be indistinguishable from this except in cost.
    pub force_slow_path: bool,
}

/// One file's contribution to an edit batch.
#[derive(Clone, Debug)]
pub enum FileInput {
    /// A new or replaced desugared tree.
    Tree { path: String, tree: Arc<SourceFile> },
    /// The upstream parser failed: the file contributes no symbols and a
    /// single parse-failure diagnostic, isolated from other files.
    ParseFailed { path: String },
    /// The file is gone.
    Removed { path: String },
}

impl FileInput {
    pub fn path(&self) -> &str {
        match self {
            FileInput::Tree { path, .. }
            | FileInput::ParseFailed { path }
            | FileInput::Removed { path } => path,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathTaken {
    /// Whole-program build (first batch, or an empty analyzer).
    Full,
    /// Bodies-only edit: re-lower and re-infer the edited files against
    /// the untouched symbol table.
    Fast,
    /// Declarations changed: re-name the edited files, re-resolve the
    /// whole program, re-check edited files and transitive dependents.
    Slow,
    /// Every edit in the batch was a no-op (identical fingerprints).
    NoChange,
}

/// What one batch produced: the new epoch and the diagnostics scoped to
/// the files re-analyzed by that batch.
#[derive(Clone, Debug)]
pub struct AnalysisResult {
    pub epoch: Epoch,
    pub path: PathTaken,
    pub analyzed: Vec<FileId>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Analyzer {
    current: Arc<GlobalState>,
    options: AnalyzerOptions,
    /// File ids are never reused, even across discarded runs.
    next_file_id: u32,
}

impl Analyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Analyzer {
            current: Arc::new(GlobalState::new()),
            options,
            next_file_id: 0,
        }
    }

    /// Snapshot of the currently published state.
    pub fn state(&self) -> Arc<GlobalState> {
        Arc::clone(&self.current)
    }

    pub fn epoch(&self) -> Epoch {
        self.current.epoch
    }

    /// Process one edit batch, choosing the cheapest sound path.
    pub fn apply_edits(
        &mut self,
        inputs: Vec<FileInput>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, Cancelled> {
        if self.current.files.is_empty() {
            return self.full_build(inputs, cancel);
        }

        // Classify the batch. Any structural change anywhere forces the
        // slow path for the whole batch.
        let mut fast_edits: Vec<(FileId, Arc<SourceFile>, CollectedFile)> = Vec::new();
        let mut structural = false;
        let mut live_inputs: Vec<FileInput> = Vec::new();

        for input in inputs {
            match &input {
                FileInput::ParseFailed { .. } => {
                    structural = true;
                    live_inputs.push(input);
                }
                FileInput::Removed { path } => {
                    // Removing a file nobody ever loaded is a no-op.
                    if self.current.file_id(path).is_some() {
                        structural = true;
                        live_inputs.push(input);
                    }
                }
                FileInput::Tree { path, tree } => {
                    let existing = self
                        .current
                        .file_id(path)
                        .and_then(|id| self.current.files.get(&id).map(|r| (id, r)));
                    match existing {
                        Some((id, record)) if !record.failed => {
                            let collected = collect_file(id, tree);
                            if collected.fingerprint == record.fingerprint {
                                continue; // no-op edit
                            }
                            if collected.decl_digest == record.decl_digest {
                                fast_edits.push((id, Arc::clone(tree), collected));
                            } else {
                                structural = true;
                            }
                            live_inputs.push(input);
                        }
                        _ => {
                            structural = true;
                            live_inputs.push(input);
                        }
                    }
                }
            }
        }

        if live_inputs.is_empty() {
            return Ok(AnalysisResult {
                epoch: self.current.epoch,
                path: PathTaken::NoChange,
                analyzed: Vec::new(),
                diagnostics: Vec::new(),
            });
        }

        if structural || self.options.force_slow_path {
            self.slow_path(live_inputs, cancel)
        } else {
            self.fast_path(fast_edits, cancel)
        }
    }

    // =========================================================================
    // Full build
    // =========================================================================

    fn full_build(
        &mut self,
        mut inputs: Vec<FileInput>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, Cancelled> {
        // Deterministic file order regardless of how the batch arrived.
        inputs.sort_by(|a, b| a.path().cmp(b.path()));
        inputs.retain(|i| !matches!(i, FileInput::Removed { .. }));
        info!(files = inputs.len(), "full build");

        let mut st = GlobalState::new();
        st.names = Arc::clone(&self.current.names);
        st.types = Arc::clone(&self.current.types);
        st.table = tyc_binder::SymbolTable::new(&st.names);
        st.epoch = self.current.epoch.next();

        let mut ids = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let id = self.alloc_file_id();
            st.paths.insert(input.path().to_string(), id);
            ids.push(id);
        }
        cancel.check()?;

        // Parallel collect of per-file declaration artifacts.
        let collected: Vec<Option<CollectedFile>> = inputs
            .par_iter()
            .zip(ids.par_iter())
            .map(|(input, &id)| match input {
                FileInput::Tree { tree, .. } if !cancel.is_cancelled() => {
                    Some(collect_file(id, tree))
                }
                _ => None,
            })
            .collect();
        cancel.check()?;

        // Sequential single-writer merge into the symbol table.
        for ((input, &id), collected) in inputs.iter().zip(ids.iter()).zip(collected.into_iter())
        {
            match (input, collected) {
                (FileInput::Tree { path, tree }, Some(collected)) => {
                    let named = apply_file(&mut st.table, &st.names, id, tree);
                    st.diagnostics.insert(
                        id,
                        FileDiagnostics {
                            naming: named.diagnostics.clone(),
                            ..Default::default()
                        },
                    );
                    st.files.insert(
                        id,
                        FileRecord {
                            path: path.clone(),
                            fingerprint: collected.fingerprint,
                            decl_digest: collected.decl_digest,
                            tree: Arc::clone(tree),
                            defines: named.defines,
                            methods: named.methods,
                            decl_refs: FxHashSet::default(),
                            body_refs: FxHashSet::default(),
                            failed: false,
                        },
                    );
                }
                (FileInput::ParseFailed { path }, _) => {
                    self.insert_failed_record(&mut st, id, path.clone());
                }
                _ => {}
            }
        }
        cancel.check()?;

        let resolve_out = self.run_resolver(&mut st);
        cancel.check()?;

        let check_targets: Vec<FileId> = st
            .files
            .iter()
            .filter(|(_, r)| !r.failed)
            .map(|(&id, _)| id)
            .collect();
        let checked = check_files_parallel(&st, &self.options.limits, &check_targets, cancel)?;
        merge_check_results(&mut st, checked);
        self.apply_resolver_refs(&mut st, &resolve_out);
        cancel.check()?;

        let analyzed = ids.clone();
        let diagnostics = st.diagnostics_for(&analyzed);
        let epoch = st.epoch;
        self.current = Arc::new(st);
        Ok(AnalysisResult {
            epoch,
            path: PathTaken::Full,
            analyzed,
            diagnostics,
        })
    }

    // =========================================================================
    // Fast path
    // =========================================================================

    fn fast_path(
        &mut self,
        edits: Vec<(FileId, Arc<SourceFile>, CollectedFile)>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, Cancelled> {
        debug!(files = edits.len(), "fast path");
        let mut st = (*self.current).clone();
        st.epoch = st.epoch.next();

        for (id, tree, collected) in &edits {
            if let Some(record) = st.files.get_mut(id) {
                // Same declarations, new bodies: the existing symbol ids
                // and method bindings stay valid.
                record.tree = Arc::clone(tree);
                record.fingerprint = collected.fingerprint;
            }
        }
        cancel.check()?;

        let targets: Vec<FileId> = edits.iter().map(|(id, _, _)| *id).collect();
        let checked = check_files_parallel(&st, &self.options.limits, &targets, cancel)?;
        merge_check_results(&mut st, checked);
        cancel.check()?;

        let diagnostics = st.diagnostics_for(&targets);
        let epoch = st.epoch;
        self.current = Arc::new(st);
        Ok(AnalysisResult {
            epoch,
            path: PathTaken::Fast,
            analyzed: targets,
            diagnostics,
        })
    }

    // =========================================================================
    // Slow path
    // =========================================================================

    fn slow_path(
        &mut self,
        inputs: Vec<FileInput>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, Cancelled> {
        debug!(files = inputs.len(), "slow path");
        let mut st = (*self.current).clone();
        st.epoch = st.epoch.next();

        // Symbols whose declarations this batch touches; seeds for the
        // dependency closure.
        let mut changed_symbols: FxHashSet<SymbolId> = FxHashSet::default();
        let mut edited: FxHashSet<FileId> = FxHashSet::default();
        let mut rechecked_edits: Vec<FileId> = Vec::new();

        for input in &inputs {
            match input {
                FileInput::Removed { path } => {
                    let Some(id) = st.paths.remove(path) else { continue };
                    edited.insert(id);
                    if let Some(record) = st.files.remove(&id) {
                        changed_symbols.extend(record.defines.iter().copied());
                        remove_file_symbols(&mut st.table, id, &record.defines);
                    }
                    st.deps.remove_file(id);
                    st.diagnostics.remove(&id);
                }
                FileInput::ParseFailed { path } => {
                    let id = self.id_for_path(&mut st, path);
                    edited.insert(id);
                    if let Some(record) = st.files.get(&id) {
                        let defines = record.defines.clone();
                        changed_symbols.extend(defines.iter().copied());
                        remove_file_symbols(&mut st.table, id, &defines);
                    }
                    self.insert_failed_record(&mut st, id, path.clone());
                    st.deps.remove_file(id);
                }
                FileInput::Tree { path, tree } => {
                    let id = self.id_for_path(&mut st, path);
                    edited.insert(id);
                    rechecked_edits.push(id);
                    if let Some(record) = st.files.get(&id) {
                        let defines = record.defines.clone();
                        changed_symbols.extend(defines.iter().copied());
                        remove_file_symbols(&mut st.table, id, &defines);
                    }
                    let collected = collect_file(id, tree);
                    let named = apply_file(&mut st.table, &st.names, id, tree);
                    changed_symbols.extend(named.defines.iter().copied());
                    st.diagnostics.entry(id).or_default().naming = named.diagnostics.clone();
                    st.files.insert(
                        id,
                        FileRecord {
                            path: path.clone(),
                            fingerprint: collected.fingerprint,
                            decl_digest: collected.decl_digest,
                            tree: Arc::clone(tree),
                            defines: named.defines,
                            methods: named.methods,
                            decl_refs: FxHashSet::default(),
                            body_refs: FxHashSet::default(),
                            failed: false,
                        },
                    );
                }
            }
        }
        cancel.check()?;

        // Impact analysis against the previous epoch's edges: files whose
        // reference edges touch a changed symbol, to a fixed point.
        let affected = self
            .current
            .deps
            .affected_files(changed_symbols.iter().copied(), &edited);
        cancel.check()?;

        // Ancestry and constant resolution are whole-program facts.
        reset_resolution(&mut st.table);
        let resolve_out = self.run_resolver(&mut st);
        cancel.check()?;

        let mut targets: Vec<FileId> = rechecked_edits;
        targets.extend(
            affected
                .iter()
                .copied()
                .filter(|id| st.files.get(id).map(|r| !r.failed).unwrap_or(false)),
        );
        targets.sort();
        targets.dedup();

        let checked = check_files_parallel(&st, &self.options.limits, &targets, cancel)?;
        merge_check_results(&mut st, checked);
        self.apply_resolver_refs(&mut st, &resolve_out);
        cancel.check()?;

        let mut analyzed: Vec<FileId> = edited.iter().copied().collect();
        analyzed.extend(affected.iter().copied());
        analyzed.sort();
        analyzed.dedup();
        analyzed.retain(|id| st.files.contains_key(id));

        let diagnostics = st.diagnostics_for(&analyzed);
        let epoch = st.epoch;
        self.current = Arc::new(st);
        Ok(AnalysisResult {
            epoch,
            path: PathTaken::Slow,
            analyzed,
            diagnostics,
        })
    }

    // =========================================================================
    // Shared pieces
    // =========================================================================

    fn alloc_file_id(&mut self) -> FileId {
        let id = FileId(self.next_file_id);
        self.next_file_id += 1;
        id
    }

    fn id_for_path(&mut self, st: &mut GlobalState, path: &str) -> FileId {
        if let Some(id) = st.paths.get(path) {
            return *id;
        }
        let id = self.alloc_file_id();
        st.paths.insert(path.to_string(), id);
        id
    }

    fn insert_failed_record(&self, st: &mut GlobalState, id: FileId, path: String) {
        let diag = Diagnostic::error(
            path.clone(),
            Span::ZERO,
            message_for(diagnostic_codes::PARSE_FAILURE, &[]),
            diagnostic_codes::PARSE_FAILURE,
        );
        st.diagnostics.insert(
            id,
            FileDiagnostics {
                naming: vec![diag],
                ..Default::default()
            },
        );
        st.files.insert(
            id,
            FileRecord {
                path: path.clone(),
                fingerprint: 0,
                decl_digest: 0,
                tree: Arc::new(SourceFile {
                    path,
                    decls: Vec::new(),
                }),
                defines: FxHashSet::default(),
                methods: Vec::new(),
                decl_refs: FxHashSet::default(),
                body_refs: FxHashSet::default(),
                failed: true,
            },
        );
    }

    /// Run the resolver single-threaded and distribute its diagnostics
    /// into per-file buckets (replacing every file's resolution bucket:
    /// resolution is a whole-program fact).
    fn run_resolver(&self, st: &mut GlobalState) -> ResolveOutput {
        let file_paths: FxHashMap<FileId, String> = st
            .files
            .iter()
            .map(|(&id, r)| (id, r.path.clone()))
            .collect();
        let out = resolve_program(
            &mut st.table,
            &st.names,
            &st.types,
            &file_paths,
            &self.options.limits,
        );
        st.store = out.store.clone();

        for bucket in st.diagnostics.values_mut() {
            bucket.resolving.clear();
        }
        for diag in &out.diagnostics {
            if let Some(&id) = st.paths.get(&diag.file) {
                st.diagnostics.entry(id).or_default().resolving.push(diag.clone());
            }
        }
        out
    }

    /// Merge the resolver's per-file declaration references and refresh
    /// the dependency graph's edges.
    fn apply_resolver_refs(&self, st: &mut GlobalState, out: &ResolveOutput) {
        let ids: Vec<FileId> = st.files.keys().copied().collect();
        for id in ids {
            let decl_refs = out.references.get(&id).cloned().unwrap_or_default();
            if let Some(record) = st.files.get_mut(&id) {
                record.decl_refs = decl_refs;
            }
            let (all_refs, defines) = match st.files.get(&id) {
                Some(record) => (
                    record
                        .decl_refs
                        .union(&record.body_refs)
                        .copied()
                        .collect::<FxHashSet<SymbolId>>(),
                    record.defines.clone(),
                ),
                None => continue,
            };
            st.deps.update_references(id, all_refs);
            st.deps.update_defines(id, defines);
        }
    }
}

/// Check files in parallel against the (read-only) state. Respects the
/// cancellation token per file; a cancelled run yields `Err` and the
/// caller discards everything.
fn check_files_parallel(
    st: &GlobalState,
    limits: &Limits,
    targets: &[FileId],
    cancel: &CancellationToken,
) -> Result<Vec<(FileId, FileCheckResult)>, Cancelled> {
    let work: Vec<(FileId, &FileRecord)> = targets
        .iter()
        .filter_map(|&id| st.files.get(&id).map(|r| (id, r)))
        .filter(|(_, r)| !r.failed)
        .collect();

    // Internal invariant: every method binding must point inside the
    // table. A handle outside the arena means the model itself is
    // corrupt; abort loudly instead of deriving diagnostics from it.
    for (_, record) in &work {
        for binding in &record.methods {
            assert!(
                st.table.get(binding.symbol).is_some(),
                "method symbol handle out of range: {:?}",
                binding.symbol
            );
        }
    }

    let results: Vec<Option<(FileId, FileCheckResult)>> = work
        .par_iter()
        .map(|(id, record)| {
            if cancel.is_cancelled() {
                return None;
            }
            let result = check_file(
                &st.table,
                &st.names,
                &st.types,
                &st.store,
                limits,
                &record.tree,
                &record.methods,
            );
            Some((*id, result))
        })
        .collect();

    cancel.check()?;
    Ok(results.into_iter().flatten().collect())
}

/// Single-writer merge of per-file checking artifacts.
fn merge_check_results(st: &mut GlobalState, results: Vec<(FileId, FileCheckResult)>) {
    for (id, result) in results {
        if let Some(record) = st.files.get_mut(&id) {
            record.body_refs = result.references.iter().copied().collect();
        }
        st.diagnostics.entry(id).or_default().checking = result.diagnostics;
        let (all_refs, defines) = match st.files.get(&id) {
            Some(record) => (
                record
                    .decl_refs
                    .union(&record.body_refs)
                    .copied()
                    .collect::<FxHashSet<SymbolId>>(),
                record.defines.clone(),
            ),
            None => continue,
        };
        st.deps.update_references(id, all_refs);
        st.deps.update_defines(id, defines);
    }
}
