//! Symbols and their stable handles.
//!
//! Every named program entity (class, module, method, field, type member)
//! is one [`Symbol`] owned by the [`SymbolTable`](crate::table::SymbolTable)
//! arena. Everything else refers to symbols only by [`SymbolId`]; handles
//! are never reused, so a reference held across an incremental update of
//! some other file stays valid (a deleted symbol is tombstoned in place).

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tyc_ast::{ConstPath, Expr, TypeExpr};
use tyc_common::{Atom, FileId, Span};

/// Stable handle into the symbol table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// The root scope: the implicit top-level module every file's
    /// declarations hang off.
    pub const ROOT: SymbolId = SymbolId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Symbol flag bits.
pub mod symbol_flags {
    /// Fully resolved by the resolver (ancestry + annotations done).
    pub const RESOLVED: u32 = 1 << 0;
    /// Deleted symbol: the slot stays allocated so stale handles keep
    /// pointing at a tombstone instead of a recycled entity.
    pub const TOMBSTONE: u32 = 1 << 1;
    /// The resolver found this class inside its own ancestor chain.
    /// Its methods type-check against `Untyped` receivers.
    pub const CYCLIC_ANCESTRY: u32 = 1 << 2;
    /// Seeded core-library symbol (not declared by any analyzed file).
    pub const CORE: u32 = 1 << 3;
    /// Naming found a conflicting redeclaration; the symbol kept the
    /// first declaration and is best-effort from then on.
    pub const KIND_CONFLICT: u32 = 1 << 4;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Module,
    Class,
    Method,
    Field,
    /// Type parameter declared on a generic class (`class Box[T]`).
    TypeMember,
    /// Value constant, `NAME = expr`.
    Const,
}

impl SymbolKind {
    pub fn describe(self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Field => "field",
            SymbolKind::TypeMember => "type member",
            SymbolKind::Const => "constant",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MixinKind {
    Include,
    Extend,
}

/// One declared `include`/`extend`, with the declaring file.
/// `target` starts out `None`; the resolver fills it in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixinExpr {
    pub kind: MixinKind,
    pub path: ConstPath,
    pub file: FileId,
    pub target: Option<SymbolId>,
}

/// A method parameter as declared: name, position, annotation tree.
/// The resolver turns the annotation into a lattice type later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDef {
    pub name: Atom,
    pub ann: Option<TypeExpr>,
    pub span: Span,
}

/// One named program entity.
///
/// Exclusively owned by the symbol table; everything else holds
/// [`SymbolId`]s. Superclass/mixin edges are handle adjacency, never
/// owning pointers, so a cyclic hierarchy cannot leak ownership.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Atom,
    pub kind: SymbolKind,
    pub owner: SymbolId,
    pub flags: u32,
    pub span: Span,
    /// Files contributing declarations of this symbol (reopened classes
    /// may have several).
    pub files: SmallVec<[FileId; 1]>,

    /// Namespace members: nested classes/modules/constants/type members.
    /// Insertion-ordered so iteration (and thus resolution) is
    /// deterministic across runs.
    pub children: IndexMap<Atom, SymbolId>,
    /// Instance methods, keyed by name.
    pub methods: IndexMap<Atom, SymbolId>,
    /// Declared fields, keyed by name (without the `@`).
    pub fields: IndexMap<Atom, SymbolId>,

    /// Declared (unresolved) superclass reference, if written, tagged with
    /// the file that wrote it so incremental re-naming can strip it.
    pub superclass_expr: Option<(ConstPath, FileId)>,
    /// Declared mixins in source order, tagged like `superclass_expr`.
    pub mixin_exprs: Vec<MixinExpr>,
    /// Declared type parameters for generic classes.
    pub type_params: Vec<Atom>,

    /// Resolved superclass edge (resolver output).
    pub superclass: Option<SymbolId>,
    /// Resolved `include` targets in source order (resolver output).
    pub includes: SmallVec<[SymbolId; 4]>,
    /// Linearized ancestry, most-derived first, self included
    /// (resolver output; empty until resolved).
    pub ancestry: Option<Arc<[SymbolId]>>,

    /// Method-only: declared parameters.
    pub params: Vec<ParamDef>,
    /// Method-only: declared return annotation tree.
    pub ret_ann: Option<TypeExpr>,

    /// Field/constant-only: declared annotation tree.
    pub ann: Option<TypeExpr>,
    /// Constant-only: the initializer expression (used to infer a type
    /// when no annotation is written).
    pub const_value: Option<Expr>,
}

impl Symbol {
    pub fn new(name: Atom, kind: SymbolKind, owner: SymbolId, span: Span) -> Self {
        Symbol {
            name,
            kind,
            owner,
            flags: 0,
            span,
            files: SmallVec::new(),
            children: IndexMap::new(),
            methods: IndexMap::new(),
            fields: IndexMap::new(),
            superclass_expr: None,
            mixin_exprs: Vec::new(),
            type_params: Vec::new(),
            superclass: None,
            includes: SmallVec::new(),
            ancestry: None,
            params: Vec::new(),
            ret_ann: None,
            ann: None,
            const_value: None,
        }
    }

    #[inline]
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: u32) {
        self.flags |= flag;
    }

    #[inline]
    pub fn clear_flag(&mut self, flag: u32) {
        self.flags &= !flag;
    }

    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.has_flag(symbol_flags::TOMBSTONE)
    }

    /// A namespace can own nested declarations; methods cannot.
    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, SymbolKind::Module | SymbolKind::Class)
    }

    pub fn add_file(&mut self, file: FileId) {
        if !self.files.contains(&file) {
            self.files.push(file);
        }
    }
}
