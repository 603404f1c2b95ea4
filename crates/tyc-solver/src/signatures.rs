//! Resolved signatures, keyed by symbol handle.
//!
//! The binder's symbols carry annotation *trees*; the resolver lowers
//! them into lattice types and records the results here. Keeping the
//! store on the solver side (rather than inside `Symbol`) keeps the
//! binder independent of the type lattice; the driver replaces the store
//! together with the table on slow-path rebuilds so the pair stays
//! consistent.

use rustc_hash::FxHashMap;
use tyc_binder::SymbolId;
use tyc_common::{Atom, Span};

use crate::types::TypeId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSig {
    pub name: Atom,
    pub ty: TypeId,
    pub span: Span,
}

/// Ordered parameter types plus the return type of one method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSig {
    pub params: Vec<ParamSig>,
    pub ret: TypeId,
}

impl MethodSig {
    /// The signature every unannotated or unresolved method falls back to.
    pub fn untyped(param_names: impl IntoIterator<Item = (Atom, Span)>) -> Self {
        MethodSig {
            params: param_names
                .into_iter()
                .map(|(name, span)| ParamSig {
                    name,
                    ty: TypeId::UNTYPED,
                    span,
                })
                .collect(),
            ret: TypeId::UNTYPED,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SignatureStore {
    methods: FxHashMap<SymbolId, MethodSig>,
    fields: FxHashMap<SymbolId, TypeId>,
    consts: FxHashMap<SymbolId, TypeId>,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_method(&mut self, id: SymbolId, sig: MethodSig) {
        self.methods.insert(id, sig);
    }

    pub fn method(&self, id: SymbolId) -> Option<&MethodSig> {
        self.methods.get(&id)
    }

    pub fn set_field(&mut self, id: SymbolId, ty: TypeId) {
        self.fields.insert(id, ty);
    }

    pub fn field(&self, id: SymbolId) -> TypeId {
        self.fields.get(&id).copied().unwrap_or(TypeId::UNTYPED)
    }

    pub fn set_const(&mut self, id: SymbolId, ty: TypeId) {
        self.consts.insert(id, ty);
    }

    pub fn const_ty(&self, id: SymbolId) -> TypeId {
        self.consts.get(&id).copied().unwrap_or(TypeId::UNTYPED)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn clear(&mut self) {
        self.methods.clear();
        self.fields.clear();
        self.consts.clear();
    }
}
