//! Override compatibility checking.
//!
//! After linearization and signature resolution, every method that
//! shadows a definition further up its class's ancestry is checked
//! against it: the override's return type must be a subtype of the
//! overridden return (covariance), and each parameter must accept at
//! least what the overridden parameter accepted (contravariance).
//! `Untyped` on either side of a comparison waives it.

use tyc_binder::{SymbolId, symbol_flags};
use tyc_common::diagnostics::{Diagnostic, diagnostic_codes, message_for};
use tyc_solver::{TypeId, is_subtype, type_to_string};

use crate::ResolveCx;

pub(crate) fn check_overrides(cx: &mut ResolveCx<'_>) {
    let class_ids: Vec<SymbolId> = cx
        .table
        .live_ids()
        .filter(|&id| {
            cx.table
                .get(id)
                .map(|s| s.is_namespace() && !s.has_flag(symbol_flags::CORE))
                .unwrap_or(false)
        })
        .collect();

    for class_id in class_ids {
        let Some(class) = cx.table.get(class_id) else {
            continue;
        };
        let Some(ancestry) = class.ancestry.clone() else {
            continue;
        };
        let methods: Vec<(tyc_common::Atom, SymbolId)> = class
            .methods
            .iter()
            .map(|(&name, &id)| (name, id))
            .collect();

        for (name, method_id) in methods {
            // First definition above this class in linearization order is
            // the overridden method.
            let overridden = ancestry
                .iter()
                .skip(1)
                .find_map(|&anc| cx.table.member(anc, name, tyc_binder::SymbolKind::Method));
            let Some(overridden_id) = overridden else {
                continue;
            };
            check_pair(cx, class_id, name, method_id, overridden_id);
        }
    }
}

fn check_pair(
    cx: &mut ResolveCx<'_>,
    class_id: SymbolId,
    name: tyc_common::Atom,
    method_id: SymbolId,
    overridden_id: SymbolId,
) {
    let Some(sub_sig) = cx.out.store.method(method_id).cloned() else {
        return;
    };
    let Some(super_sig) = cx.out.store.method(overridden_id).cloned() else {
        return;
    };

    let (span, file) = match cx.table.get(method_id) {
        Some(sym) => (sym.span, sym.files.first().copied()),
        None => return,
    };
    let file_path = file.map(|f| cx.file_path(f)).unwrap_or_default();
    let qualified = qualified_name(cx, class_id, name);

    // Return covariance.
    if sub_sig.ret != TypeId::UNTYPED
        && super_sig.ret != TypeId::UNTYPED
        && !is_subtype(cx.interner, cx.table, sub_sig.ret, super_sig.ret)
    {
        let sub_ret = type_to_string(cx.interner, cx.table, cx.names, sub_sig.ret);
        let super_ret = type_to_string(cx.interner, cx.table, cx.names, super_sig.ret);
        cx.out.diagnostics.push(Diagnostic::error(
            file_path.clone(),
            span,
            message_for(
                diagnostic_codes::OVERRIDE_RETURN_MISMATCH,
                &[&sub_ret, &qualified, &super_ret],
            ),
            diagnostic_codes::OVERRIDE_RETURN_MISMATCH,
        ));
    }

    // Parameter contravariance, positionally.
    for (sub_param, super_param) in sub_sig.params.iter().zip(super_sig.params.iter()) {
        if sub_param.ty == TypeId::UNTYPED || super_param.ty == TypeId::UNTYPED {
            continue;
        }
        if !is_subtype(cx.interner, cx.table, super_param.ty, sub_param.ty) {
            let pname = cx.names.resolve(sub_param.name).to_string();
            let sub_ty = type_to_string(cx.interner, cx.table, cx.names, sub_param.ty);
            let super_ty = type_to_string(cx.interner, cx.table, cx.names, super_param.ty);
            cx.out.diagnostics.push(Diagnostic::error(
                file_path.clone(),
                sub_param.span,
                message_for(
                    diagnostic_codes::OVERRIDE_PARAM_MISMATCH,
                    &[&pname, &qualified, &sub_ty, &super_ty],
                ),
                diagnostic_codes::OVERRIDE_PARAM_MISMATCH,
            ));
        }
    }
}

fn qualified_name(cx: &ResolveCx<'_>, class_id: SymbolId, name: tyc_common::Atom) -> String {
    let class_name = cx
        .table
        .get(class_id)
        .map(|s| cx.names.resolve(s.name).to_string())
        .unwrap_or_default();
    format!("{}#{}", class_name, cx.names.resolve(name))
}
