//! Ancestor linearization and cycle detection.
//!
//! The linearization of a class is: the class itself, then each included
//! module's linearization in reverse inclusion order (the most recently
//! included module wins lookups), then the superclass's linearization.
//! Duplicates keep their first (most derived) occurrence; the resulting
//! order is the tie-break for method lookup.
//!
//! A class reachable from itself through superclass/include edges is
//! cyclic: fatal for that class only. It is flagged, reported once, and
//! left with a self-only ancestry; its methods check against `Untyped`
//! receivers downstream.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::debug;
use tyc_binder::{SymbolId, symbol_flags};
use tyc_common::diagnostics::{Diagnostic, diagnostic_codes, message_for};

use crate::ResolveCx;

pub(crate) fn linearize_all(cx: &mut ResolveCx<'_>) {
    let ids: Vec<SymbolId> = cx
        .table
        .live_ids()
        .filter(|&id| {
            cx.table
                .get(id)
                .map(|s| s.is_namespace())
                .unwrap_or(false)
        })
        .collect();

    // Cycle membership first, so memoized linearization never recurses
    // into a cycle.
    let cyclic: FxHashSet<SymbolId> = ids
        .iter()
        .copied()
        .filter(|&id| reaches_itself(cx, id))
        .collect();

    for &id in &cyclic {
        let (name, span, file) = {
            let Some(sym) = cx.table.get(id) else { continue };
            (
                cx.names.resolve(sym.name).to_string(),
                sym.span,
                sym.files.first().copied(),
            )
        };
        let file_path = file.map(|f| cx.file_path(f)).unwrap_or_default();
        cx.out.diagnostics.push(Diagnostic::error(
            file_path,
            span,
            message_for(diagnostic_codes::CYCLIC_ANCESTRY, &[&name]),
            diagnostic_codes::CYCLIC_ANCESTRY,
        ));
        if let Some(sym) = cx.table.get_mut(id) {
            sym.set_flag(symbol_flags::CYCLIC_ANCESTRY);
            sym.ancestry = Some(Arc::from(vec![id]));
        }
        debug!(?id, "cyclic ancestry");
    }

    let mut memo: FxHashMap<SymbolId, Arc<[SymbolId]>> = FxHashMap::default();
    for id in ids {
        if cyclic.contains(&id) {
            continue;
        }
        let chain = linearize(cx, id, &cyclic, &mut memo);
        if let Some(sym) = cx.table.get_mut(id) {
            sym.ancestry = Some(chain);
        }
    }
}

/// Can `start` reach itself through at least one hierarchy edge?
fn reaches_itself(cx: &ResolveCx<'_>, start: SymbolId) -> bool {
    let mut visited = FxHashSet::default();
    let mut stack: Vec<SymbolId> = hierarchy_edges(cx, start);
    while let Some(current) = stack.pop() {
        if current == start {
            return true;
        }
        if visited.insert(current) {
            stack.extend(hierarchy_edges(cx, current));
        }
    }
    false
}

fn hierarchy_edges(cx: &ResolveCx<'_>, id: SymbolId) -> Vec<SymbolId> {
    let Some(sym) = cx.table.get(id) else {
        return Vec::new();
    };
    let mut edges: Vec<SymbolId> = sym.includes.iter().copied().collect();
    if let Some(sup) = sym.superclass {
        edges.push(sup);
    }
    edges
}

fn linearize(
    cx: &ResolveCx<'_>,
    id: SymbolId,
    cyclic: &FxHashSet<SymbolId>,
    memo: &mut FxHashMap<SymbolId, Arc<[SymbolId]>>,
) -> Arc<[SymbolId]> {
    if let Some(chain) = memo.get(&id) {
        return chain.clone();
    }
    let mut out: Vec<SymbolId> = vec![id];
    let (includes, superclass, is_class) = match cx.table.get(id) {
        Some(sym) => (
            sym.includes.clone(),
            sym.superclass,
            sym.kind == tyc_binder::SymbolKind::Class,
        ),
        None => (Default::default(), None, false),
    };

    // Reverse inclusion order: the last include is searched first.
    for &module in includes.iter().rev() {
        append_chain(cx, module, cyclic, memo, &mut out);
    }
    if let Some(sup) = superclass {
        append_chain(cx, sup, cyclic, memo, &mut out);
    } else if is_class && id != cx.table.core().object {
        // A class whose superclass edge is missing (unresolved constant)
        // still answers Object's methods.
        append_chain(cx, cx.table.core().object, cyclic, memo, &mut out);
    }

    let chain: Arc<[SymbolId]> = out.into();
    memo.insert(id, chain.clone());
    chain
}

fn append_chain(
    cx: &ResolveCx<'_>,
    ancestor: SymbolId,
    cyclic: &FxHashSet<SymbolId>,
    memo: &mut FxHashMap<SymbolId, Arc<[SymbolId]>>,
    out: &mut Vec<SymbolId>,
) {
    if cyclic.contains(&ancestor) {
        // A cyclic ancestor contributes only itself: its own chain is
        // untrustworthy, but lookups on the direct ancestor still work.
        if !out.contains(&ancestor) {
            out.push(ancestor);
        }
        return;
    }
    for &entry in linearize(cx, ancestor, cyclic, memo).iter() {
        if !out.contains(&entry) {
            out.push(entry);
        }
    }
}
