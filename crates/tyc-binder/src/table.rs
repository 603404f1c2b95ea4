//! The whole-program symbol table.
//!
//! An append-only arena of [`Symbol`]s. Slots are never reused: deleting
//! a symbol tombstones its slot and unlinks it from its owner, which keeps
//! every previously handed out [`SymbolId`] valid across incremental
//! updates. The driver clones the table wholesale for speculative work and
//! publishes the clone only when a run completes.

use tyc_ast::TypeExpr;
use tyc_common::interner::NameTable;
use tyc_common::{Atom, FileId, Span};

use crate::symbol::{ParamDef, Symbol, SymbolId, SymbolKind, symbol_flags};

/// Well-known symbols seeded into every table, standing in for the
/// packaged standard-library tables the full product ships.
#[derive(Clone, Copy, Debug)]
pub struct CoreClasses {
    pub object: SymbolId,
    pub integer: SymbolId,
    pub float: SymbolId,
    pub string: SymbolId,
    pub symbol: SymbolId,
    pub boolean: SymbolId,
    pub nil_class: SymbolId,
}

#[derive(Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    core: CoreClasses,
}

impl SymbolTable {
    /// Create a table containing the root scope and the core classes.
    pub fn new(names: &NameTable) -> Self {
        let mut table = SymbolTable {
            symbols: Vec::with_capacity(64),
            core: CoreClasses {
                object: SymbolId::ROOT,
                integer: SymbolId::ROOT,
                float: SymbolId::ROOT,
                string: SymbolId::ROOT,
                symbol: SymbolId::ROOT,
                boolean: SymbolId::ROOT,
                nil_class: SymbolId::ROOT,
            },
        };

        let mut root = Symbol::new(Atom::NONE, SymbolKind::Module, SymbolId::ROOT, Span::ZERO);
        root.set_flag(symbol_flags::CORE | symbol_flags::RESOLVED);
        table.symbols.push(root);

        table.seed_core_classes(names);
        table
    }

    pub fn core(&self) -> CoreClasses {
        self.core
    }

    /// Number of allocated slots, tombstones included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    #[inline]
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id.index())
    }

    /// Iterate all live (non-tombstoned) symbol ids.
    pub fn live_ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_tombstone())
            .map(|(i, _)| SymbolId(i as u32))
    }

    /// Append a fresh symbol and link it under its owner.
    /// The caller has already checked for an existing member of the same
    /// name; this is the allocation half of `declare`.
    pub fn alloc(&mut self, sym: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        let owner = sym.owner;
        let name = sym.name;
        let kind = sym.kind;
        self.symbols.push(sym);
        if id != SymbolId::ROOT {
            if let Some(owner_sym) = self.symbols.get_mut(owner.index()) {
                Self::member_map_for(owner_sym, kind).insert(name, id);
            }
        }
        id
    }

    /// Look up a member of `owner` in the namespace `kind` lives in.
    pub fn member(&self, owner: SymbolId, name: Atom, kind: SymbolKind) -> Option<SymbolId> {
        let owner_sym = self.get(owner)?;
        let map = match kind {
            SymbolKind::Method => &owner_sym.methods,
            SymbolKind::Field => &owner_sym.fields,
            _ => &owner_sym.children,
        };
        map.get(&name).copied()
    }

    /// Look up a namespace member (class/module/constant/type member).
    pub fn child(&self, owner: SymbolId, name: Atom) -> Option<SymbolId> {
        self.member(owner, name, SymbolKind::Class)
    }

    /// Tombstone a symbol: unlink it from its owner and mark the slot.
    /// The slot itself stays allocated forever.
    pub fn tombstone(&mut self, id: SymbolId) {
        if id == SymbolId::ROOT {
            return;
        }
        let Some(sym) = self.symbols.get(id.index()) else {
            return;
        };
        let owner = sym.owner;
        let name = sym.name;
        let kind = sym.kind;
        if let Some(owner_sym) = self.symbols.get_mut(owner.index()) {
            let map = Self::member_map_for(owner_sym, kind);
            if map.get(&name) == Some(&id) {
                map.shift_remove(&name);
            }
        }
        if let Some(sym) = self.symbols.get_mut(id.index()) {
            sym.set_flag(symbol_flags::TOMBSTONE);
        }
    }

    fn member_map_for(
        owner: &mut Symbol,
        kind: SymbolKind,
    ) -> &mut indexmap::IndexMap<Atom, SymbolId> {
        match kind {
            SymbolKind::Method => &mut owner.methods,
            SymbolKind::Field => &mut owner.fields,
            _ => &mut owner.children,
        }
    }

    // =========================================================================
    // Core classes
    // =========================================================================

    fn seed_core_classes(&mut self, names: &NameTable) {
        let object = self.seed_class(names, "Object", None);
        let integer = self.seed_class(names, "Integer", Some(object));
        let float = self.seed_class(names, "Float", Some(object));
        let string = self.seed_class(names, "String", Some(object));
        let symbol = self.seed_class(names, "Symbol", Some(object));
        let boolean = self.seed_class(names, "Boolean", Some(object));
        let nil_class = self.seed_class(names, "NilClass", Some(object));

        self.core = CoreClasses {
            object,
            integer,
            float,
            string,
            symbol,
            boolean,
            nil_class,
        };

        // A minimal method surface so inference has something to resolve
        // against. Annotations are ordinary trees; the resolver turns them
        // into lattice types exactly as it does for user code.
        for op in ["+", "-", "*", "/"] {
            self.seed_method(names, integer, op, &[("other", "Integer")], "Integer");
            self.seed_method(names, float, op, &[("other", "Float")], "Float");
        }
        for op in ["<", ">", "<=", ">="] {
            self.seed_method(names, integer, op, &[("other", "Integer")], "Boolean");
            self.seed_method(names, float, op, &[("other", "Float")], "Boolean");
        }
        self.seed_method(names, integer, "to_s", &[], "String");
        self.seed_method(names, float, "to_s", &[], "String");
        self.seed_method(names, string, "length", &[], "Integer");
        self.seed_method(names, string, "+", &[("other", "String")], "String");
        self.seed_method(names, object, "==", &[("other", "Object")], "Boolean");
        self.seed_method(names, object, "to_s", &[], "String");
        self.seed_method(names, nil_class, "to_s", &[], "String");
    }

    fn seed_class(
        &mut self,
        names: &NameTable,
        name: &str,
        superclass: Option<SymbolId>,
    ) -> SymbolId {
        let atom = names.intern(name);
        let mut sym = Symbol::new(atom, SymbolKind::Class, SymbolId::ROOT, Span::ZERO);
        sym.set_flag(symbol_flags::CORE);
        // Core superclass edges are born resolved; the resolver only
        // linearizes them.
        sym.superclass = superclass;
        self.alloc(sym)
    }

    fn seed_method(
        &mut self,
        names: &NameTable,
        owner: SymbolId,
        name: &str,
        params: &[(&str, &str)],
        ret: &str,
    ) {
        let atom = names.intern(name);
        let mut sym = Symbol::new(atom, SymbolKind::Method, owner, Span::ZERO);
        sym.set_flag(symbol_flags::CORE);
        sym.params = params
            .iter()
            .map(|(pname, pty)| ParamDef {
                name: names.intern(pname),
                ann: Some(named_ann(names, pty)),
                span: Span::ZERO,
            })
            .collect();
        sym.ret_ann = Some(named_ann(names, ret));
        self.alloc(sym);
    }
}

fn named_ann(names: &NameTable, class_name: &str) -> TypeExpr {
    TypeExpr::Named {
        path: tyc_ast::ConstPath::single(names.intern(class_name), Span::ZERO),
        args: Vec::new(),
        span: Span::ZERO,
    }
}
