//! Tests for the bidirectional dependency graph.

use rustc_hash::FxHashSet;
use tyc_binder::SymbolId;
use tyc_common::FileId;
use tyc_driver::DependencyGraph;

fn set(ids: &[u32]) -> FxHashSet<SymbolId> {
    ids.iter().map(|&i| SymbolId(i)).collect()
}

#[test]
fn update_references_maintains_reverse_edges() {
    let mut graph = DependencyGraph::new();
    graph.update_references(FileId(0), set(&[10, 11]));
    graph.update_references(FileId(1), set(&[11]));

    assert!(graph.files_referencing(SymbolId(10)).unwrap().contains(&FileId(0)));
    let refs_11 = graph.files_referencing(SymbolId(11)).unwrap();
    assert_eq!(refs_11.len(), 2);

    // Re-pointing file 0 away from symbol 10 drops the stale edge.
    graph.update_references(FileId(0), set(&[11]));
    assert!(graph.files_referencing(SymbolId(10)).is_none());
}

#[test]
fn remove_file_clears_both_directions() {
    let mut graph = DependencyGraph::new();
    graph.update_references(FileId(0), set(&[10]));
    graph.update_defines(FileId(0), set(&[20]));

    graph.remove_file(FileId(0));
    assert!(graph.files_referencing(SymbolId(10)).is_none());
    assert_eq!(graph.file_count(), 0);
}

#[test]
fn affected_files_follows_edges_to_fixed_point() {
    let mut graph = DependencyGraph::new();
    // File 0 defines symbol 20. File 1 references 20 and defines 21.
    // File 2 references 21. Changing 20 must reach file 2 transitively.
    graph.update_defines(FileId(0), set(&[20]));
    graph.update_references(FileId(1), set(&[20]));
    graph.update_defines(FileId(1), set(&[21]));
    graph.update_references(FileId(2), set(&[21]));

    let edited: FxHashSet<tyc_common::FileId> = [FileId(0)].into_iter().collect();
    let affected = graph.affected_files([SymbolId(20)], &edited);
    assert!(affected.contains(&FileId(1)));
    assert!(affected.contains(&FileId(2)));
    assert!(!affected.contains(&FileId(0)));
}

#[test]
fn affected_files_handles_reference_cycles() {
    let mut graph = DependencyGraph::new();
    // Two files referencing each other's symbols must not loop forever.
    graph.update_defines(FileId(0), set(&[20]));
    graph.update_references(FileId(0), set(&[21]));
    graph.update_defines(FileId(1), set(&[21]));
    graph.update_references(FileId(1), set(&[20]));

    let exclude = FxHashSet::default();
    let affected = graph.affected_files([SymbolId(20)], &exclude);
    assert_eq!(affected.len(), 2);
}
