//! Constant resolution for superclass and mixin references.
//!
//! Lookup is lexical-first: the first path segment is searched in the
//! declaring scope and its owners up to the root, then through already
//! resolved superclass edges. Because a reference may point at a class
//! whose own superclass has not resolved yet, resolution runs in passes
//! until a pass makes no progress; leftovers are reported once and the
//! affected edges default away (`Object` superclass, no mixin).

use tracing::trace;
use tyc_ast::ConstPath;
use tyc_binder::{MixinKind, SymbolId, SymbolKind, symbol_flags};
use tyc_common::FileId;
use tyc_common::diagnostics::{Diagnostic, diagnostic_codes, message_for};

use crate::ResolveCx;

pub(crate) fn resolve_hierarchy_constants(cx: &mut ResolveCx<'_>) {
    default_superclasses(cx);
    let mut pass = 0u32;
    loop {
        pass += 1;
        let progressed = run_pass(cx);
        if !progressed || pass >= cx.limits.resolver_max_passes {
            break;
        }
    }
    report_unresolved(cx);
    derive_includes(cx);
}

/// A class with no written superclass extends `Object` implicitly.
/// A class whose written superclass never resolves keeps `None`: its
/// instances still answer `Object`'s methods, but the unresolved edge is
/// already reported and must not silently become `Object`.
fn default_superclasses(cx: &mut ResolveCx<'_>) {
    let object = cx.table.core().object;
    let ids: Vec<SymbolId> = cx.table.live_ids().collect();
    for id in ids {
        if id == object {
            continue;
        }
        let Some(sym) = cx.table.get_mut(id) else { continue };
        if sym.kind == SymbolKind::Class
            && !sym.has_flag(symbol_flags::CORE)
            && sym.superclass.is_none()
            && sym.superclass_expr.is_none()
        {
            sym.superclass = Some(object);
        }
    }
}

/// One resolution pass. Returns whether anything new resolved.
fn run_pass(cx: &mut ResolveCx<'_>) -> bool {
    let mut progressed = false;
    let ids: Vec<SymbolId> = cx.table.live_ids().collect();

    for id in ids {
        let Some(sym) = cx.table.get(id) else { continue };
        if sym.has_flag(symbol_flags::CORE) {
            continue;
        }

        // Superclass edge.
        if sym.superclass.is_none() {
            if let Some((path, file)) = sym.superclass_expr.clone() {
                if let Some(target) = resolve_path(cx, id, &path) {
                    progressed = true;
                    let target_kind = cx.table.get(target).map(|s| s.kind);
                    if target_kind == Some(SymbolKind::Class) {
                        if let Some(sym) = cx.table.get_mut(id) {
                            sym.superclass = Some(target);
                        }
                        cx.record_reference(file, target);
                        trace!(?id, ?target, "resolved superclass");
                    } else {
                        report_superclass_not_class(cx, id, &path, file);
                        // Keep the class functional under Object.
                        if let Some(sym) = cx.table.get_mut(id) {
                            sym.superclass_expr = None;
                        }
                    }
                }
            }
        }

        // Mixin edges.
        let pending: Vec<(usize, MixinKind, ConstPath, FileId)> = cx
            .table
            .get(id)
            .map(|s| {
                s.mixin_exprs
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.target.is_none())
                    .map(|(i, m)| (i, m.kind, m.path.clone(), m.file))
                    .collect()
            })
            .unwrap_or_default();

        for (idx, kind, path, file) in pending {
            let Some(target) = resolve_path(cx, id, &path) else {
                continue;
            };
            progressed = true;
            if let Some(sym) = cx.table.get_mut(id) {
                if let Some(entry) = sym.mixin_exprs.get_mut(idx) {
                    entry.target = Some(target);
                }
            }
            cx.record_reference(file, target);
            let target_kind = cx.table.get(target).map(|s| s.kind);
            if target_kind != Some(SymbolKind::Module) {
                let verb = match kind {
                    MixinKind::Include => "include",
                    MixinKind::Extend => "extend",
                };
                let name = path_to_string(cx, &path);
                let file_path = cx.file_path(file);
                cx.out.diagnostics.push(Diagnostic::error(
                    file_path,
                    path.span,
                    message_for(diagnostic_codes::MIXIN_NOT_MODULE, &[verb, &name]),
                    diagnostic_codes::MIXIN_NOT_MODULE,
                ));
            }
        }
    }
    progressed
}

fn report_superclass_not_class(
    cx: &mut ResolveCx<'_>,
    id: SymbolId,
    path: &ConstPath,
    file: FileId,
) {
    let name = path_to_string(cx, path);
    let file_path = cx.file_path(file);
    let class_name = cx
        .table
        .get(id)
        .map(|s| cx.names.resolve(s.name).to_string())
        .unwrap_or_default();
    cx.out.diagnostics.push(Diagnostic::error(
        file_path,
        path.span,
        message_for(
            diagnostic_codes::SUPERCLASS_NOT_CLASS,
            &[&class_name, &name],
        ),
        diagnostic_codes::SUPERCLASS_NOT_CLASS,
    ));
}

/// After the fixed point: anything still dangling is an unresolved
/// constant. Reported once; the edge defaults away so later stages see a
/// consistent (if weaker) hierarchy.
fn report_unresolved(cx: &mut ResolveCx<'_>) {
    let ids: Vec<SymbolId> = cx.table.live_ids().collect();
    for id in ids {
        let Some(sym) = cx.table.get(id) else { continue };
        if sym.has_flag(symbol_flags::CORE) {
            continue;
        }
        let mut reports: Vec<(ConstPath, FileId)> = Vec::new();
        if sym.superclass.is_none() {
            if let Some((path, file)) = &sym.superclass_expr {
                reports.push((path.clone(), *file));
            }
        }
        for m in sym.mixin_exprs.iter().filter(|m| m.target.is_none()) {
            reports.push((m.path.clone(), m.file));
        }
        for (path, file) in reports {
            let name = path_to_string(cx, &path);
            let file_path = cx.file_path(file);
            cx.out.diagnostics.push(Diagnostic::error(
                file_path,
                path.span,
                message_for(diagnostic_codes::UNRESOLVED_CONSTANT, &[&name]),
                diagnostic_codes::UNRESOLVED_CONSTANT,
            ));
        }
    }
}

/// Cache the resolved `include` targets (modules only, source order) on
/// each symbol for the linearizer and the subtype fallback walk.
fn derive_includes(cx: &mut ResolveCx<'_>) {
    let ids: Vec<SymbolId> = cx.table.live_ids().collect();
    for id in ids {
        let includes: Vec<SymbolId> = cx
            .table
            .get(id)
            .map(|sym| {
                sym.mixin_exprs
                    .iter()
                    .filter(|m| m.kind == MixinKind::Include)
                    .filter_map(|m| m.target)
                    .filter(|&t| {
                        cx.table.get(t).map(|s| s.kind) == Some(SymbolKind::Module)
                    })
                    .collect()
            })
            .unwrap_or_default();
        if let Some(sym) = cx.table.get_mut(id) {
            sym.includes = includes.into_iter().collect();
        }
    }
}

pub(crate) fn resolve_path(
    cx: &ResolveCx<'_>,
    from: SymbolId,
    path: &ConstPath,
) -> Option<SymbolId> {
    resolve_constant(cx.table, from, path)
}

/// Resolve a constant path from the scope of `from`.
///
/// The head segment is searched lexically (the declaring scope and its
/// owners up to the root), consulting resolved superclass edges at each
/// level; remaining segments are plain member lookups. Also used by the
/// checker for constant reads in method bodies.
pub fn resolve_constant(
    table: &tyc_binder::SymbolTable,
    from: SymbolId,
    path: &ConstPath,
) -> Option<SymbolId> {
    let (&head, rest) = path.segments.split_first()?;

    let mut scope = Some(from);
    let mut found = None;
    'outer: while let Some(s) = scope {
        if let Some(hit) = table.child(s, head) {
            found = Some(hit);
            break;
        }
        // Resolved ancestors of this scope also expose their members.
        let mut sup = table.get(s).and_then(|sym| sym.superclass);
        let mut steps = 0usize;
        while let Some(cur) = sup {
            if let Some(hit) = table.child(cur, head) {
                found = Some(hit);
                break 'outer;
            }
            steps += 1;
            if steps > 256 {
                break;
            }
            sup = table.get(cur).and_then(|sym| sym.superclass);
        }
        if s == SymbolId::ROOT {
            break;
        }
        scope = table.get(s).map(|sym| sym.owner);
    }

    let mut current = found?;
    for &segment in rest {
        current = table.child(current, segment)?;
    }
    Some(current)
}

pub(crate) fn path_to_string(cx: &ResolveCx<'_>, path: &ConstPath) -> String {
    path.segments
        .iter()
        .map(|&a| cx.names.resolve(a).to_string())
        .collect::<Vec<_>>()
        .join("::")
}
