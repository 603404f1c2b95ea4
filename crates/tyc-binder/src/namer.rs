//! The namer: materializes symbol-table entries for one file's declarations.
//!
//! Naming is split to fit the single-writer merge model: [`collect_file`]
//! is a pure per-file step safe to run on the worker pool (declaration
//! digest, method discovery), and [`apply_file`] merges a file's
//! declarations into the shared table on the coordinating task.
//!
//! Naming is idempotent: applying the same unchanged tree twice yields the
//! same `SymbolId`s and byte-identical symbol contents. A declaration that
//! conflicts with an existing symbol of incompatible kind is a diagnostic,
//! never a fatal error; the table stays usable with the first declaration
//! kept.

use rustc_hash::{FxHashSet, FxHasher};
use std::hash::{Hash, Hasher};
use tracing::debug;
use tyc_ast::{ConstPath, Decl, DeclPath, SourceFile, TypeExpr};
use tyc_common::diagnostics::{Diagnostic, diagnostic_codes, message_for};
use tyc_common::interner::NameTable;
use tyc_common::{FileId, Span};

use crate::symbol::{MixinExpr, MixinKind, ParamDef, Symbol, SymbolId, SymbolKind, symbol_flags};
use crate::table::SymbolTable;

// =============================================================================
// Collect (parallel, pure)
// =============================================================================

/// Immutable per-file artifact of the parallel naming step.
#[derive(Clone, Debug)]
pub struct CollectedFile {
    pub file: FileId,
    /// Fingerprint of the whole tree (bodies included).
    pub fingerprint: u64,
    /// Digest of the declaration structure only (bodies excluded).
    /// Two trees with equal digests declare the same symbols with the
    /// same signatures, which is exactly fast-path eligibility.
    pub decl_digest: u64,
    /// Paths to every method declaration, for the checker.
    pub methods: Vec<DeclPath>,
}

/// Walk one file's tree without touching shared state.
pub fn collect_file(file: FileId, tree: &SourceFile) -> CollectedFile {
    let mut hasher = FxHasher::default();
    let mut methods = Vec::new();
    let mut path = Vec::new();
    digest_decls(&tree.decls, &mut hasher, &mut methods, &mut path);
    CollectedFile {
        file,
        fingerprint: tree.fingerprint(),
        decl_digest: hasher.finish(),
        methods,
    }
}

fn digest_decls(
    decls: &[Decl],
    hasher: &mut FxHasher,
    methods: &mut Vec<DeclPath>,
    path: &mut Vec<u32>,
) {
    for (i, decl) in decls.iter().enumerate() {
        path.push(i as u32);
        match decl {
            Decl::Class(c) => {
                hasher.write_u8(0);
                c.name.hash(hasher);
                c.type_params.hash(hasher);
                digest_opt_path(c.superclass.as_ref(), hasher);
                digest_decls(&c.body, hasher, methods, path);
                hasher.write_u8(0xff);
            }
            Decl::Module(m) => {
                hasher.write_u8(1);
                m.name.hash(hasher);
                digest_decls(&m.body, hasher, methods, path);
                hasher.write_u8(0xff);
            }
            Decl::Method(m) => {
                // Signature only: a body edit must not change the digest.
                hasher.write_u8(2);
                m.name.hash(hasher);
                for p in &m.params {
                    p.name.hash(hasher);
                    digest_opt_ann(p.ann.as_ref(), hasher);
                }
                digest_opt_ann(m.ret.as_ref(), hasher);
                methods.push(DeclPath(path.clone()));
            }
            Decl::Field(f) => {
                hasher.write_u8(3);
                f.name.hash(hasher);
                digest_ann(&f.ann, hasher);
            }
            Decl::Const(c) => {
                hasher.write_u8(4);
                c.name.hash(hasher);
                digest_opt_ann(c.ann.as_ref(), hasher);
                // The initializer participates: an unannotated constant's
                // type is inferred from it, so changing it is a
                // declaration-level change.
                c.value.hash(hasher);
            }
            Decl::Include(m) => {
                hasher.write_u8(5);
                digest_path(&m.path, hasher);
            }
            Decl::Extend(m) => {
                hasher.write_u8(6);
                digest_path(&m.path, hasher);
            }
        }
        path.pop();
    }
}

fn digest_path(path: &ConstPath, hasher: &mut FxHasher) {
    path.segments.hash(hasher);
}

fn digest_opt_path(path: Option<&ConstPath>, hasher: &mut FxHasher) {
    match path {
        Some(p) => {
            hasher.write_u8(1);
            digest_path(p, hasher);
        }
        None => hasher.write_u8(0),
    }
}

fn digest_ann(ann: &TypeExpr, hasher: &mut FxHasher) {
    match ann {
        TypeExpr::Named { path, args, .. } => {
            hasher.write_u8(0);
            digest_path(path, hasher);
            for arg in args {
                digest_ann(arg, hasher);
            }
            hasher.write_u8(0xff);
        }
        TypeExpr::Nilable { inner, .. } => {
            hasher.write_u8(1);
            digest_ann(inner, hasher);
        }
        TypeExpr::Union { members, .. } => {
            hasher.write_u8(2);
            for m in members {
                digest_ann(m, hasher);
            }
            hasher.write_u8(0xff);
        }
        TypeExpr::Intersection { members, .. } => {
            hasher.write_u8(3);
            for m in members {
                digest_ann(m, hasher);
            }
            hasher.write_u8(0xff);
        }
        TypeExpr::Untyped { .. } => hasher.write_u8(4),
    }
}

fn digest_opt_ann(ann: Option<&TypeExpr>, hasher: &mut FxHasher) {
    match ann {
        Some(a) => {
            hasher.write_u8(1);
            digest_ann(a, hasher);
        }
        None => hasher.write_u8(0),
    }
}

// =============================================================================
// Apply (sequential, single writer)
// =============================================================================

/// One bound method: its symbol, owner, and where its body lives.
#[derive(Clone, Debug)]
pub struct MethodBinding {
    pub symbol: SymbolId,
    pub owner: SymbolId,
    pub path: DeclPath,
}

/// Result of applying one file's declarations to the table.
#[derive(Clone, Debug, Default)]
pub struct NamedFile {
    /// Every symbol this file declares or contributes to.
    pub defines: FxHashSet<SymbolId>,
    pub methods: Vec<MethodBinding>,
    pub diagnostics: Vec<Diagnostic>,
}

struct ApplyCx<'a> {
    table: &'a mut SymbolTable,
    names: &'a NameTable,
    file: FileId,
    file_path: &'a str,
    out: NamedFile,
    path: Vec<u32>,
}

/// Merge one file's declarations into the table.
///
/// Call [`remove_file_symbols`] first when re-naming an edited file, so
/// stale contributions from the previous tree are stripped.
pub fn apply_file(
    table: &mut SymbolTable,
    names: &NameTable,
    file: FileId,
    tree: &SourceFile,
) -> NamedFile {
    debug!(file = tree.path, "naming file");
    let mut cx = ApplyCx {
        table,
        names,
        file,
        file_path: &tree.path,
        out: NamedFile::default(),
        path: Vec::new(),
    };
    apply_decls(&mut cx, SymbolId::ROOT, &tree.decls);
    cx.out
}

fn apply_decls(cx: &mut ApplyCx<'_>, owner: SymbolId, decls: &[Decl]) {
    for (i, decl) in decls.iter().enumerate() {
        cx.path.push(i as u32);
        apply_decl(cx, owner, decl);
        cx.path.pop();
    }
}

fn apply_decl(cx: &mut ApplyCx<'_>, owner: SymbolId, decl: &Decl) {
    match decl {
        Decl::Class(c) => {
            let Some(id) = declare(cx, owner, c.name, SymbolKind::Class, c.span) else {
                return;
            };
            if let Some(sup) = &c.superclass {
                if let Some(sym) = cx.table.get_mut(id) {
                    if sym.superclass_expr.is_none() {
                        sym.superclass_expr = Some((sup.clone(), cx.file));
                    }
                }
            }
            for &tp in &c.type_params {
                if let Some(tp_id) = declare(cx, id, tp, SymbolKind::TypeMember, c.span) {
                    if let Some(class) = cx.table.get_mut(id) {
                        if !class.type_params.contains(&tp) {
                            class.type_params.push(tp);
                        }
                    }
                    cx.out.defines.insert(tp_id);
                }
            }
            apply_decls(cx, id, &c.body);
        }
        Decl::Module(m) => {
            let Some(id) = declare(cx, owner, m.name, SymbolKind::Module, m.span) else {
                return;
            };
            apply_decls(cx, id, &m.body);
        }
        Decl::Method(m) => {
            let Some(id) = declare(cx, owner, m.name, SymbolKind::Method, m.span) else {
                return;
            };
            if let Some(sym) = cx.table.get_mut(id) {
                // Latest declaration wins for the signature; files are
                // applied in a deterministic order so reruns agree.
                sym.params = m
                    .params
                    .iter()
                    .map(|p| ParamDef {
                        name: p.name,
                        ann: p.ann.clone(),
                        span: p.span,
                    })
                    .collect();
                sym.ret_ann = m.ret.clone();
            }
            cx.out.methods.push(MethodBinding {
                symbol: id,
                owner,
                path: DeclPath(cx.path.clone()),
            });
        }
        Decl::Field(f) => {
            let Some(id) = declare(cx, owner, f.name, SymbolKind::Field, f.span) else {
                return;
            };
            if let Some(sym) = cx.table.get_mut(id) {
                sym.ann = Some(f.ann.clone());
            }
        }
        Decl::Const(c) => {
            let Some(id) = declare(cx, owner, c.name, SymbolKind::Const, c.span) else {
                return;
            };
            if let Some(sym) = cx.table.get_mut(id) {
                sym.ann = c.ann.clone();
                sym.const_value = Some(c.value.clone());
            }
        }
        Decl::Include(m) => add_mixin(cx, owner, MixinKind::Include, &m.path),
        Decl::Extend(m) => add_mixin(cx, owner, MixinKind::Extend, &m.path),
    }
}

fn add_mixin(cx: &mut ApplyCx<'_>, owner: SymbolId, kind: MixinKind, path: &ConstPath) {
    let Some(sym) = cx.table.get_mut(owner) else {
        return;
    };
    let entry = MixinExpr {
        kind,
        path: path.clone(),
        file: cx.file,
        target: None,
    };
    let already = sym
        .mixin_exprs
        .iter()
        .any(|m| m.kind == entry.kind && m.path == entry.path && m.file == entry.file);
    if !already {
        sym.mixin_exprs.push(entry);
    }
    cx.out.defines.insert(owner);
}

/// Find-or-create a member of `owner`, merging reopened declarations and
/// reporting kind conflicts. Returns `None` when the declaration could not
/// be bound at all (conflict with an incompatible existing symbol).
fn declare(
    cx: &mut ApplyCx<'_>,
    owner: SymbolId,
    name: tyc_common::Atom,
    kind: SymbolKind,
    span: Span,
) -> Option<SymbolId> {
    // Same-namespace lookup first: a match of equal kind is a reopening.
    if let Some(existing) = cx.table.member(owner, name, kind) {
        let sym = cx.table.get_mut(existing)?;
        let existing_kind = sym.kind;
        if existing_kind == kind {
            sym.add_file(cx.file);
            cx.out.defines.insert(existing);
            return Some(existing);
        }
        report_conflict(cx, name, kind, existing_kind, span);
        cx.table.get_mut(existing)?.set_flag(symbol_flags::KIND_CONFLICT);
        return None;
    }

    // Cross-namespace clash: e.g. a method name redeclared as a class.
    // Fields live behind their own sigil and never clash with either.
    let clashing = match kind {
        SymbolKind::Method => cx.table.member(owner, name, SymbolKind::Class),
        SymbolKind::Field => None,
        _ => cx.table.member(owner, name, SymbolKind::Method),
    };
    if let Some(existing) = clashing {
        let existing_kind = cx.table.get(existing)?.kind;
        report_conflict(cx, name, kind, existing_kind, span);
        cx.table.get_mut(existing)?.set_flag(symbol_flags::KIND_CONFLICT);
        return None;
    }

    let mut sym = Symbol::new(name, kind, owner, span);
    sym.add_file(cx.file);
    let id = cx.table.alloc(sym);
    cx.out.defines.insert(id);
    Some(id)
}

fn report_conflict(
    cx: &mut ApplyCx<'_>,
    name: tyc_common::Atom,
    new_kind: SymbolKind,
    old_kind: SymbolKind,
    span: Span,
) {
    let name_str = cx.names.resolve(name);
    cx.out.diagnostics.push(Diagnostic::error(
        cx.file_path,
        span,
        message_for(
            diagnostic_codes::REDECLARATION_KIND_CONFLICT,
            &[&name_str, new_kind.describe(), old_kind.describe()],
        ),
        diagnostic_codes::REDECLARATION_KIND_CONFLICT,
    ));
}

// =============================================================================
// Incremental removal
// =============================================================================

/// Strip one file's contributions before re-applying its new tree.
///
/// Symbols declared solely by `file` are tombstoned; symbols shared with
/// other files lose this file's superclass/mixin contributions and drop
/// `file` from their declaring set.
pub fn remove_file_symbols(
    table: &mut SymbolTable,
    file: FileId,
    old_defines: &FxHashSet<SymbolId>,
) {
    let mut doomed = Vec::new();
    for &id in old_defines {
        let Some(sym) = table.get_mut(id) else {
            continue;
        };
        if sym.has_flag(symbol_flags::CORE) {
            continue;
        }
        sym.files.retain(|f| *f != file);
        sym.mixin_exprs.retain(|m| m.file != file);
        if matches!(&sym.superclass_expr, Some((_, f)) if *f == file) {
            sym.superclass_expr = None;
            sym.superclass = None;
        }
        if sym.files.is_empty() {
            doomed.push(id);
        }
    }
    // Deterministic order so reruns tombstone identically.
    doomed.sort();
    for id in doomed {
        table.tombstone(id);
    }
}
