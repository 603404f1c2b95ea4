//! Bidirectional dependency graph for incremental impact analysis.
//!
//! Tracks, per file, which symbols it defines and which it references,
//! in both directions:
//! - `references` / `referencers`: file → symbols it uses, symbol → files
//!   using it
//! - `defines` / `definers`: file → symbols it declares, symbol → files
//!   declaring it
//!
//! When a slow-path edit changes a set of symbols, the reverse maps give
//! the transitive closure of files that must be re-analyzed. Edges are
//! updated per file in place, never rebuilt from scratch.

use rustc_hash::{FxHashMap, FxHashSet};
use tyc_binder::SymbolId;
use tyc_common::FileId;

#[derive(Default, Debug, Clone)]
pub struct DependencyGraph {
    /// Forward: file -> symbols it references.
    references: FxHashMap<FileId, FxHashSet<SymbolId>>,
    /// Reverse: symbol -> files that reference it.
    referencers: FxHashMap<SymbolId, FxHashSet<FileId>>,
    /// Forward: file -> symbols it defines.
    defines: FxHashMap<FileId, FxHashSet<SymbolId>>,
    /// Reverse: symbol -> files that define it.
    definers: FxHashMap<SymbolId, FxHashSet<FileId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a file's reference edges with a new set.
    ///
    /// Atomically removes stale reverse edges and adds new ones; shared
    /// references are handled without churn.
    pub fn update_references(&mut self, file: FileId, symbols: FxHashSet<SymbolId>) {
        if let Some(old) = self.references.get(&file) {
            for sym in old.iter() {
                if !symbols.contains(sym) {
                    if let Some(rev) = self.referencers.get_mut(sym) {
                        rev.remove(&file);
                        if rev.is_empty() {
                            self.referencers.remove(sym);
                        }
                    }
                }
            }
        }
        for &sym in &symbols {
            self.referencers.entry(sym).or_default().insert(file);
        }
        if symbols.is_empty() {
            self.references.remove(&file);
        } else {
            self.references.insert(file, symbols);
        }
    }

    /// Replace a file's definition edges with a new set.
    pub fn update_defines(&mut self, file: FileId, symbols: FxHashSet<SymbolId>) {
        if let Some(old) = self.defines.get(&file) {
            for sym in old.iter() {
                if !symbols.contains(sym) {
                    if let Some(rev) = self.definers.get_mut(sym) {
                        rev.remove(&file);
                        if rev.is_empty() {
                            self.definers.remove(sym);
                        }
                    }
                }
            }
        }
        for &sym in &symbols {
            self.definers.entry(sym).or_default().insert(file);
        }
        if symbols.is_empty() {
            self.defines.remove(&file);
        } else {
            self.defines.insert(file, symbols);
        }
    }

    /// Remove a file entirely (both edge directions).
    pub fn remove_file(&mut self, file: FileId) {
        self.update_references(file, FxHashSet::default());
        self.update_defines(file, FxHashSet::default());
    }

    pub fn references_of(&self, file: FileId) -> Option<&FxHashSet<SymbolId>> {
        self.references.get(&file)
    }

    pub fn files_referencing(&self, symbol: SymbolId) -> Option<&FxHashSet<FileId>> {
        self.referencers.get(&symbol)
    }

    /// All files transitively affected by a change to `seed_symbols`.
    ///
    /// Follows reference edges to a fixed point: a file referencing a
    /// changed symbol is affected, and the symbols *it* defines count as
    /// changed in turn (global re-resolution may alter their resolved
    /// signatures). The result does not include files from `exclude`
    /// (the edited files themselves, which are re-analyzed regardless).
    pub fn affected_files(
        &self,
        seed_symbols: impl IntoIterator<Item = SymbolId>,
        exclude: &FxHashSet<FileId>,
    ) -> FxHashSet<FileId> {
        let mut affected: FxHashSet<FileId> = FxHashSet::default();
        let mut seen_symbols: FxHashSet<SymbolId> = FxHashSet::default();
        let mut stack: Vec<SymbolId> = seed_symbols.into_iter().collect();
        seen_symbols.extend(stack.iter().copied());

        while let Some(symbol) = stack.pop() {
            let Some(files) = self.referencers.get(&symbol) else {
                continue;
            };
            for &file in files {
                if exclude.contains(&file) || !affected.insert(file) {
                    continue;
                }
                if let Some(defined) = self.defines.get(&file) {
                    for &def in defined {
                        if seen_symbols.insert(def) {
                            stack.push(def);
                        }
                    }
                }
            }
        }
        affected
    }

    pub fn file_count(&self) -> usize {
        let mut files: FxHashSet<FileId> = FxHashSet::default();
        files.extend(self.references.keys().copied());
        files.extend(self.defines.keys().copied());
        files.len()
    }
}
