//! Forward abstract interpretation over the control-flow graph.
//!
//! Each block's input environment (local → type) is the join of its
//! predecessors' outputs; blocks are processed in reverse postorder and
//! loops iterate to a fixed point bounded by the configured iteration
//! limit. Past the bound, still-changing variables widen to `Untyped`:
//! termination is bought with precision.
//!
//! The fixed point runs silently; diagnostics and reference edges are
//! collected in one final pass over the stable environments, so a loop
//! analyzed three times reports each problem once.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::trace;
use tyc_binder::{SymbolId, SymbolKind, SymbolTable, symbol_flags};
use tyc_common::diagnostics::{Diagnostic, diagnostic_codes, message_for};
use tyc_common::interner::NameTable;
use tyc_common::{Atom, Limits, Span};
use tyc_resolver::resolve_constant;
use tyc_solver::{SignatureStore, TypeId, TypeInterner, is_subtype, type_to_string};

use crate::cfg::{Binding, BlockId, Cfg, LocalId, Op, Terminator};

pub struct InferCx<'a> {
    pub table: &'a SymbolTable,
    pub names: &'a NameTable,
    pub interner: &'a TypeInterner,
    pub store: &'a SignatureStore,
    pub limits: &'a Limits,
    pub file_path: &'a str,
    /// The method being checked.
    pub method: SymbolId,
    /// Its lexical owner (the receiver's class).
    pub owner: SymbolId,
}

#[derive(Debug)]
pub struct MethodCheckResult {
    pub diagnostics: Vec<Diagnostic>,
    pub references: FxHashSet<SymbolId>,
    /// Join of all reachable return values.
    pub return_type: TypeId,
}

/// Collector used only during the reporting pass; the fixed point runs
/// with `None` so nothing is double-reported.
#[derive(Default)]
struct TypeSink {
    diagnostics: Vec<Diagnostic>,
    references: FxHashSet<SymbolId>,
}

pub fn check_method(cx: &InferCx<'_>, cfg: &Cfg) -> MethodCheckResult {
    let n_locals = cfg.locals.len();
    let order = cfg.reverse_postorder();
    let bottom_env = vec![TypeId::BOTTOM; n_locals];

    let mut out_envs: Vec<Option<Vec<TypeId>>> = vec![None; cfg.blocks.len()];
    let mut in_envs: Vec<Option<Vec<TypeId>>> = vec![None; cfg.blocks.len()];
    let mut sweeps = 0u32;
    let mut widen = false;
    loop {
        sweeps += 1;
        if sweeps > cx.limits.loop_fixpoint_iterations {
            widen = true;
        }
        let mut changed = false;
        for &block_id in &order {
            let mut input = join_inputs(cx, cfg, block_id, &out_envs, &bottom_env);
            if widen {
                // Anything still oscillating at the bound goes to the top.
                if let Some(prev) = &in_envs[block_id.index()] {
                    for (slot, prev_ty) in input.iter_mut().zip(prev.iter()) {
                        if *slot != *prev_ty {
                            *slot = TypeId::UNTYPED;
                        }
                    }
                }
            }
            in_envs[block_id.index()] = Some(input.clone());
            let output = transfer(cx, cfg, block_id, input, None);
            if out_envs[block_id.index()].as_ref() != Some(&output) {
                out_envs[block_id.index()] = Some(output);
                changed = true;
            }
        }
        if !changed {
            break;
        }
        if widen && sweeps > cx.limits.loop_fixpoint_iterations + 2 {
            // Widening converges in one extra sweep; this is the backstop.
            break;
        }
    }
    trace!(sweeps, widened = widen, "inference fixed point");

    // Reporting pass over the stable environments.
    let mut sink = TypeSink::default();
    let mut return_type = TypeId::BOTTOM;
    for &block_id in &order {
        let input = join_inputs(cx, cfg, block_id, &out_envs, &bottom_env);
        let output = transfer(cx, cfg, block_id, input, Some(&mut sink));
        if let Terminator::Return(local) = cfg.block(block_id).term {
            return_type = cx.interner.join(return_type, output[local.index()]);
        }
    }

    check_declared_return(cx, return_type, &mut sink);

    MethodCheckResult {
        diagnostics: sink.diagnostics,
        references: sink.references,
        return_type,
    }
}

/// Input environment of a block: elementwise join over predecessor
/// outputs (predecessors not yet computed contribute nothing).
fn join_inputs(
    cx: &InferCx<'_>,
    cfg: &Cfg,
    block: BlockId,
    out_envs: &[Option<Vec<TypeId>>],
    bottom_env: &[TypeId],
) -> Vec<TypeId> {
    let preds = &cfg.preds[block.index()];
    let mut acc: Option<Vec<TypeId>> = None;
    for pred in preds {
        let Some(out) = &out_envs[pred.index()] else {
            continue;
        };
        match &mut acc {
            None => acc = Some(out.clone()),
            Some(acc) => {
                for (slot, &ty) in acc.iter_mut().zip(out.iter()) {
                    *slot = cx.interner.join(*slot, ty);
                }
            }
        }
    }
    acc.unwrap_or_else(|| bottom_env.to_vec())
}

/// Run one block's bindings over an environment.
fn transfer(
    cx: &InferCx<'_>,
    cfg: &Cfg,
    block: BlockId,
    mut env: Vec<TypeId>,
    mut sink: Option<&mut TypeSink>,
) -> Vec<TypeId> {
    // Class objects flowing into constructor calls, tracked per block.
    let mut const_classes: FxHashMap<LocalId, SymbolId> = FxHashMap::default();
    for binding in &cfg.block(block).bindings {
        let ty = type_binding(cx, binding, &env, &mut const_classes, &mut sink);
        env[binding.target.index()] = ty;
    }
    env
}

fn type_binding(
    cx: &InferCx<'_>,
    binding: &Binding,
    env: &[TypeId],
    const_classes: &mut FxHashMap<LocalId, SymbolId>,
    sink: &mut Option<&mut TypeSink>,
) -> TypeId {
    let core = cx.table.core();
    match &binding.op {
        Op::Param(i) => cx
            .store
            .method(cx.method)
            .and_then(|sig| sig.params.get(*i as usize))
            .map(|p| p.ty)
            .unwrap_or(TypeId::UNTYPED),
        Op::SelfRef => self_type(cx),
        Op::LitInt(_) => cx.interner.class(core.integer),
        Op::LitFloat(_) => cx.interner.class(core.float),
        Op::LitStr => cx.interner.class(core.string),
        Op::LitSym(_) => cx.interner.class(core.symbol),
        Op::LitTrue | Op::LitFalse => cx.interner.class(core.boolean),
        Op::LitNil => cx.interner.class(core.nil_class),
        Op::Read(local) => env[local.index()],
        Op::ReadField(name) => {
            let Some(field) = lookup_field(cx, cx.owner, *name) else {
                return TypeId::UNTYPED;
            };
            if let Some(sink) = sink {
                sink.references.insert(field);
            }
            cx.store.field(field)
        }
        Op::WriteField { name, value } => {
            let value_ty = env[value.index()];
            if let Some(field) = lookup_field(cx, cx.owner, *name) {
                let field_ty = cx.store.field(field);
                if let Some(sink) = sink {
                    sink.references.insert(field);
                    if value_ty != TypeId::UNTYPED
                        && field_ty != TypeId::UNTYPED
                        && !is_subtype(cx.interner, cx.table, value_ty, field_ty)
                    {
                        let found = render(cx, value_ty);
                        let expected = render(cx, field_ty);
                        let fname = cx.names.resolve(*name);
                        sink.diagnostics.push(Diagnostic::error(
                            cx.file_path,
                            binding.span,
                            message_for(
                                diagnostic_codes::FIELD_TYPE_MISMATCH,
                                &[&found, &fname, &expected],
                            ),
                            diagnostic_codes::FIELD_TYPE_MISMATCH,
                        ));
                    }
                }
            }
            value_ty
        }
        Op::ReadConst(path) => {
            let Some(target) = resolve_constant(cx.table, cx.owner, path) else {
                if let Some(sink) = sink {
                    let name = path
                        .segments
                        .iter()
                        .map(|&a| cx.names.resolve(a).to_string())
                        .collect::<Vec<_>>()
                        .join("::");
                    sink.diagnostics.push(Diagnostic::error(
                        cx.file_path,
                        path.span,
                        message_for(diagnostic_codes::UNRESOLVED_CONSTANT, &[&name]),
                        diagnostic_codes::UNRESOLVED_CONSTANT,
                    ));
                }
                return TypeId::UNTYPED;
            };
            if let Some(sink) = sink {
                sink.references.insert(target);
            }
            match cx.table.get(target).map(|s| s.kind) {
                Some(SymbolKind::Class) | Some(SymbolKind::Module) => {
                    // The class object itself: dynamic except for `new`.
                    const_classes.insert(binding.target, target);
                    TypeId::UNTYPED
                }
                Some(SymbolKind::Const) => cx.store.const_ty(target),
                _ => TypeId::UNTYPED,
            }
        }
        Op::Call { recv, method, args } => {
            let arg_tys: SmallVec<[TypeId; 4]> =
                args.iter().map(|a| env[a.index()]).collect();
            if let Some(&class_sym) = const_classes.get(recv) {
                return type_constructor_call(
                    cx, class_sym, *method, &arg_tys, binding.span, sink,
                );
            }
            let recv_ty = env[recv.index()];
            dispatch(cx, recv_ty, *method, &arg_tys, binding.span, sink)
        }
    }
}

/// The receiver type inside the checked method.
fn self_type(cx: &InferCx<'_>) -> TypeId {
    let Some(owner) = cx.table.get(cx.owner) else {
        return TypeId::UNTYPED;
    };
    // A class caught in an ancestry cycle is unresolved: its methods
    // type-check against an untyped receiver.
    if owner.has_flag(symbol_flags::CYCLIC_ANCESTRY) {
        return TypeId::UNTYPED;
    }
    if cx.owner == SymbolId::ROOT {
        return cx.interner.class(cx.table.core().object);
    }
    let args: SmallVec<[TypeId; 2]> = owner
        .type_params
        .iter()
        .filter_map(|&tp| cx.table.child(cx.owner, tp))
        .map(|tm| cx.interner.type_var(tm, TypeId::UNTYPED))
        .collect();
    cx.interner.class_with_args(cx.owner, args)
}

fn lookup_field(cx: &InferCx<'_>, class_sym: SymbolId, name: Atom) -> Option<SymbolId> {
    for anc in ancestry_of(cx.table, class_sym) {
        if let Some(field) = cx.table.member(anc, name, SymbolKind::Field) {
            return Some(field);
        }
    }
    None
}

fn ancestry_of(table: &SymbolTable, class_sym: SymbolId) -> Vec<SymbolId> {
    table
        .get(class_sym)
        .and_then(|s| s.ancestry.clone())
        .map(|a| a.to_vec())
        .unwrap_or_else(|| vec![class_sym])
}

/// Find the method along the linearized ancestry; the linearization order
/// is the lookup tie-break.
fn lookup_method(table: &SymbolTable, class_sym: SymbolId, name: Atom) -> Option<SymbolId> {
    for anc in ancestry_of(table, class_sym) {
        if let Some(method) = table.member(anc, name, SymbolKind::Method) {
            return Some(method);
        }
    }
    None
}

/// `Konst.new(...)`: type the construction, checking `initialize` if the
/// class declares one. Any other method on a class object stays dynamic.
fn type_constructor_call(
    cx: &InferCx<'_>,
    class_sym: SymbolId,
    method: Atom,
    arg_tys: &[TypeId],
    span: Span,
    sink: &mut Option<&mut TypeSink>,
) -> TypeId {
    if method != cx.names.intern("new") {
        return TypeId::UNTYPED;
    }
    let instance = instance_type(cx, class_sym);
    if let Some(init) = lookup_method(cx.table, class_sym, cx.names.intern("initialize")) {
        if let Some(sink) = sink {
            sink.references.insert(init);
        }
        check_args(cx, init, method, arg_tys, &FxHashMap::default(), span, sink);
    }
    instance
}

fn instance_type(cx: &InferCx<'_>, class_sym: SymbolId) -> TypeId {
    let param_count = cx
        .table
        .get(class_sym)
        .map(|s| s.type_params.len())
        .unwrap_or(0);
    // Constructor arguments do not flow into generic parameters; they
    // start dynamic.
    let args: SmallVec<[TypeId; 2]> = (0..param_count).map(|_| TypeId::UNTYPED).collect();
    cx.interner.class_with_args(class_sym, args)
}

/// Dispatch a call over the receiver's type.
fn dispatch(
    cx: &InferCx<'_>,
    recv_ty: TypeId,
    method: Atom,
    arg_tys: &[TypeId],
    span: Span,
    sink: &mut Option<&mut TypeSink>,
) -> TypeId {
    use tyc_solver::TypeData;

    if recv_ty == TypeId::UNTYPED {
        return TypeId::UNTYPED;
    }
    if recv_ty == TypeId::BOTTOM {
        return TypeId::BOTTOM;
    }

    match cx.interner.data(recv_ty) {
        TypeData::Class { symbol, args } => {
            class_dispatch(cx, recv_ty, symbol, &args, method, arg_tys, span, sink)
        }
        TypeData::Nilable { inner } => {
            let nil = cx.interner.class(cx.table.core().nil_class);
            let as_union = cx.interner.union([inner, nil]);
            dispatch(cx, as_union, method, arg_tys, span, sink)
        }
        TypeData::Union { members } => {
            let mut missing = false;
            let mut result = TypeId::BOTTOM;
            for &member in members.iter() {
                if member_has_method(cx, member, method) {
                    // Member dispatch reports its own argument mismatches.
                    let member_result = dispatch(cx, member, method, arg_tys, span, sink);
                    result = cx.interner.join(result, member_result);
                } else {
                    missing = true;
                }
            }
            if missing {
                report_undefined(cx, recv_ty, method, span, sink);
                return TypeId::UNTYPED;
            }
            result
        }
        TypeData::Intersection { members } => {
            // First member that answers the method wins.
            for &member in members.iter() {
                if member_has_method(cx, member, method) {
                    return dispatch(cx, member, method, arg_tys, span, sink);
                }
            }
            report_undefined(cx, recv_ty, method, span, sink);
            TypeId::UNTYPED
        }
        TypeData::TypeVar { upper, .. } => dispatch(cx, upper, method, arg_tys, span, sink),
        _ => TypeId::UNTYPED,
    }
}

fn member_has_method(cx: &InferCx<'_>, member: TypeId, method: Atom) -> bool {
    use tyc_solver::TypeData;
    match cx.interner.data(member) {
        TypeData::Class { symbol, .. } => {
            let cyclic = cx
                .table
                .get(symbol)
                .map(|s| s.has_flag(symbol_flags::CYCLIC_ANCESTRY))
                .unwrap_or(false);
            cyclic || lookup_method(cx.table, symbol, method).is_some()
        }
        TypeData::Untyped => true,
        _ => true,
    }
}

fn class_dispatch(
    cx: &InferCx<'_>,
    recv_ty: TypeId,
    class_sym: SymbolId,
    type_args: &[TypeId],
    method: Atom,
    arg_tys: &[TypeId],
    span: Span,
    sink: &mut Option<&mut TypeSink>,
) -> TypeId {
    let cyclic = cx
        .table
        .get(class_sym)
        .map(|s| s.has_flag(symbol_flags::CYCLIC_ANCESTRY))
        .unwrap_or(false);
    if cyclic {
        return TypeId::UNTYPED;
    }

    let Some(method_sym) = lookup_method(cx.table, class_sym, method) else {
        report_undefined(cx, recv_ty, method, span, sink);
        return TypeId::UNTYPED;
    };
    if let Some(sink) = sink {
        sink.references.insert(method_sym);
    }

    let subst = type_param_substitution(cx, class_sym, type_args);
    check_args(cx, method_sym, method, arg_tys, &subst, span, sink);

    let ret = cx
        .store
        .method(method_sym)
        .map(|sig| sig.ret)
        .unwrap_or(TypeId::UNTYPED);
    cx.interner.substitute(ret, &subst)
}

/// Map a receiver's type-member symbols to the concrete type arguments.
fn type_param_substitution(
    cx: &InferCx<'_>,
    class_sym: SymbolId,
    type_args: &[TypeId],
) -> FxHashMap<SymbolId, TypeId> {
    let mut map = FxHashMap::default();
    let Some(class) = cx.table.get(class_sym) else {
        return map;
    };
    for (i, &tp) in class.type_params.iter().enumerate() {
        if let Some(tm) = cx.table.child(class_sym, tp) {
            map.insert(tm, type_args.get(i).copied().unwrap_or(TypeId::UNTYPED));
        }
    }
    map
}

fn check_args(
    cx: &InferCx<'_>,
    method_sym: SymbolId,
    method: Atom,
    arg_tys: &[TypeId],
    subst: &FxHashMap<SymbolId, TypeId>,
    span: Span,
    sink: &mut Option<&mut TypeSink>,
) {
    let Some(sink) = sink else { return };
    let Some(sig) = cx.store.method(method_sym) else {
        return;
    };

    if arg_tys.len() != sig.params.len() {
        let name = cx.names.resolve(method);
        sink.diagnostics.push(Diagnostic::error(
            cx.file_path,
            span,
            message_for(
                diagnostic_codes::ARGUMENT_COUNT_MISMATCH,
                &[
                    &name,
                    &sig.params.len().to_string(),
                    &arg_tys.len().to_string(),
                ],
            ),
            diagnostic_codes::ARGUMENT_COUNT_MISMATCH,
        ));
        return;
    }

    for (arg_ty, param) in arg_tys.iter().zip(sig.params.iter()) {
        let param_ty = cx.interner.substitute(param.ty, subst);
        // Untyped on either side widens trivially.
        if *arg_ty == TypeId::UNTYPED || param_ty == TypeId::UNTYPED {
            continue;
        }
        if !is_subtype(cx.interner, cx.table, *arg_ty, param_ty) {
            let expected = render(cx, param_ty);
            let found = render(cx, *arg_ty);
            let pname = cx.names.resolve(param.name);
            sink.diagnostics.push(Diagnostic::error(
                cx.file_path,
                span,
                message_for(
                    diagnostic_codes::ARGUMENT_TYPE_MISMATCH,
                    &[&expected, &found, &pname],
                ),
                diagnostic_codes::ARGUMENT_TYPE_MISMATCH,
            ));
        }
    }
}

fn report_undefined(
    cx: &InferCx<'_>,
    recv_ty: TypeId,
    method: Atom,
    span: Span,
    sink: &mut Option<&mut TypeSink>,
) {
    if let Some(sink) = sink {
        let name = cx.names.resolve(method);
        let recv = render(cx, recv_ty);
        sink.diagnostics.push(Diagnostic::error(
            cx.file_path,
            span,
            message_for(diagnostic_codes::UNDEFINED_METHOD, &[&name, &recv]),
            diagnostic_codes::UNDEFINED_METHOD,
        ));
    }
}

fn check_declared_return(cx: &InferCx<'_>, inferred: TypeId, sink: &mut TypeSink) {
    let Some(sig) = cx.store.method(cx.method) else {
        return;
    };
    if sig.ret == TypeId::UNTYPED || inferred == TypeId::UNTYPED || inferred == TypeId::BOTTOM {
        return;
    }
    if !is_subtype(cx.interner, cx.table, inferred, sig.ret) {
        let span = cx
            .table
            .get(cx.method)
            .map(|s| s.span)
            .unwrap_or(Span::ZERO);
        let expected = render(cx, sig.ret);
        let found = render(cx, inferred);
        sink.diagnostics.push(Diagnostic::error(
            cx.file_path,
            span,
            message_for(
                diagnostic_codes::RETURN_TYPE_MISMATCH,
                &[&expected, &found],
            ),
            diagnostic_codes::RETURN_TYPE_MISMATCH,
        ));
    }
}

fn render(cx: &InferCx<'_>, ty: TypeId) -> String {
    type_to_string(cx.interner, cx.table, cx.names, ty)
}
