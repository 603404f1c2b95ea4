//! Annotation lowering: declared type trees become lattice types.
//!
//! Every method, field, and constant symbol gets its resolved signature
//! recorded in the signature store. Unwritten annotations default to
//! `Untyped`; so do annotations naming constants that never resolved
//! (reported here, once per annotation).

use tracing::trace;
use tyc_ast::TypeExpr;
use tyc_binder::{SymbolId, SymbolKind};
use tyc_common::FileId;
use tyc_common::diagnostics::{Diagnostic, diagnostic_codes, message_for};
use tyc_solver::{MethodSig, ParamSig, TypeId};

use crate::ResolveCx;
use crate::constants::{path_to_string, resolve_path};

pub(crate) fn resolve_signatures(cx: &mut ResolveCx<'_>) {
    let ids: Vec<SymbolId> = cx.table.live_ids().collect();
    for id in ids {
        let Some(sym) = cx.table.get(id) else { continue };
        let file = sym.files.first().copied();
        match sym.kind {
            SymbolKind::Method => {
                let owner = sym.owner;
                let params = sym.params.clone();
                let ret_ann = sym.ret_ann.clone();
                let sig = MethodSig {
                    params: params
                        .into_iter()
                        .map(|p| ParamSig {
                            name: p.name,
                            ty: resolve_opt(cx, owner, p.ann.as_ref(), file),
                            span: p.span,
                        })
                        .collect(),
                    ret: resolve_opt(cx, owner, ret_ann.as_ref(), file),
                };
                trace!(?id, "resolved method signature");
                cx.out.store.set_method(id, sig);
            }
            SymbolKind::Field => {
                let owner = sym.owner;
                let ann = sym.ann.clone();
                let ty = resolve_opt(cx, owner, ann.as_ref(), file);
                cx.out.store.set_field(id, ty);
            }
            SymbolKind::Const => {
                let owner = sym.owner;
                let ann = sym.ann.clone();
                let value = sym.const_value.clone();
                let ty = match ann {
                    Some(ann) => resolve_expr(cx, owner, &ann, file, 0),
                    None => infer_const_type(cx, value.as_ref()),
                };
                cx.out.store.set_const(id, ty);
            }
            _ => {}
        }
    }
}

fn resolve_opt(
    cx: &mut ResolveCx<'_>,
    scope: SymbolId,
    ann: Option<&TypeExpr>,
    file: Option<FileId>,
) -> TypeId {
    match ann {
        Some(expr) => resolve_expr(cx, scope, expr, file, 0),
        None => TypeId::UNTYPED,
    }
}

/// Lower one annotation tree from the given scope.
pub(crate) fn resolve_expr(
    cx: &mut ResolveCx<'_>,
    scope: SymbolId,
    expr: &TypeExpr,
    file: Option<FileId>,
    depth: u32,
) -> TypeId {
    if depth > cx.limits.max_annotation_depth {
        return TypeId::UNTYPED;
    }
    match expr {
        TypeExpr::Named { path, args, span } => {
            // A bare single-segment name may be a type parameter of an
            // enclosing generic class.
            if args.is_empty() && path.segments.len() == 1 {
                if let Some(tp) = lookup_type_param(cx, scope, path.segments[0]) {
                    return cx.interner.type_var(tp, TypeId::UNTYPED);
                }
            }
            let target = resolve_path(cx, scope, path);
            let is_type = target
                .and_then(|t| cx.table.get(t))
                .map(|s| {
                    matches!(
                        s.kind,
                        SymbolKind::Class | SymbolKind::Module | SymbolKind::TypeMember
                    )
                })
                .unwrap_or(false);
            match target {
                Some(t) if is_type => {
                    if let Some(f) = file {
                        cx.record_reference(f, t);
                    }
                    if cx.table.get(t).map(|s| s.kind) == Some(SymbolKind::TypeMember) {
                        return cx.interner.type_var(t, TypeId::UNTYPED);
                    }
                    let args: smallvec::SmallVec<[TypeId; 2]> = args
                        .iter()
                        .map(|a| resolve_expr(cx, scope, a, file, depth + 1))
                        .collect();
                    cx.interner.class_with_args(t, args)
                }
                _ => {
                    let name = path_to_string(cx, path);
                    let file_path = file.map(|f| cx.file_path(f)).unwrap_or_default();
                    cx.out.diagnostics.push(Diagnostic::error(
                        file_path,
                        *span,
                        message_for(diagnostic_codes::UNRESOLVED_CONSTANT, &[&name]),
                        diagnostic_codes::UNRESOLVED_CONSTANT,
                    ));
                    TypeId::UNTYPED
                }
            }
        }
        TypeExpr::Nilable { inner, .. } => {
            let inner = resolve_expr(cx, scope, inner, file, depth + 1);
            cx.interner.nilable(inner)
        }
        TypeExpr::Union { members, .. } => {
            let members: Vec<TypeId> = members
                .iter()
                .map(|m| resolve_expr(cx, scope, m, file, depth + 1))
                .collect();
            cx.interner.union(members)
        }
        TypeExpr::Intersection { members, .. } => {
            let members: Vec<TypeId> = members
                .iter()
                .map(|m| resolve_expr(cx, scope, m, file, depth + 1))
                .collect();
            cx.interner.intersection(members)
        }
        TypeExpr::Untyped { .. } => TypeId::UNTYPED,
    }
}

/// Search enclosing scopes for a type parameter named `name`.
fn lookup_type_param(
    cx: &ResolveCx<'_>,
    scope: SymbolId,
    name: tyc_common::Atom,
) -> Option<SymbolId> {
    let mut current = Some(scope);
    while let Some(s) = current {
        if let Some(sym) = cx.table.get(s) {
            if sym.type_params.contains(&name) {
                if let Some(tp) = cx.table.child(s, name) {
                    if cx.table.get(tp).map(|t| t.kind) == Some(SymbolKind::TypeMember) {
                        return Some(tp);
                    }
                }
            }
            if s == SymbolId::ROOT {
                break;
            }
            current = Some(sym.owner);
        } else {
            break;
        }
    }
    None
}

/// Type of an unannotated constant, inferred from its initializer when it
/// is a literal; anything else stays untyped.
fn infer_const_type(cx: &ResolveCx<'_>, value: Option<&tyc_ast::Expr>) -> TypeId {
    let core = cx.table.core();
    match value {
        Some(tyc_ast::Expr::IntLit { .. }) => cx.interner.class(core.integer),
        Some(tyc_ast::Expr::FloatLit { .. }) => cx.interner.class(core.float),
        Some(tyc_ast::Expr::StrLit { .. }) => cx.interner.class(core.string),
        Some(tyc_ast::Expr::SymLit { .. }) => cx.interner.class(core.symbol),
        Some(tyc_ast::Expr::True { .. }) | Some(tyc_ast::Expr::False { .. }) => {
            cx.interner.class(core.boolean)
        }
        Some(tyc_ast::Expr::Nil { .. }) => cx.interner.class(core.nil_class),
        _ => TypeId::UNTYPED,
    }
}
