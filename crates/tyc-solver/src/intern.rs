//! Type interning and normalization.
//!
//! The interner is shared read-mostly between parallel per-file checkers,
//! so the forward map is a concurrent hash map and the id-to-data arena
//! sits behind an RwLock taken only on insertion of a new structure.
//!
//! All lattice constructors live here so that normalization cannot be
//! bypassed: `union`/`intersection` flatten, deduplicate, sort, and
//! collapse singletons before interning, and `join` is union construction.

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::sync::RwLock;
use tracing::trace;
use tyc_binder::SymbolId;
use tyc_common::limits;

use crate::types::{TypeData, TypeFlags, TypeId};

pub struct TypeInterner {
    map: DashMap<TypeData, TypeId, FxBuildHasher>,
    types: RwLock<Vec<(TypeData, TypeFlags)>>,
}

impl TypeInterner {
    pub fn new() -> Self {
        let interner = TypeInterner {
            map: DashMap::with_hasher(FxBuildHasher),
            types: RwLock::new(Vec::with_capacity(256)),
        };
        // Pre-intern the lattice poles at their well-known ids.
        let untyped = interner.intern(TypeData::Untyped);
        let bottom = interner.intern(TypeData::Bottom);
        debug_assert_eq!(untyped, TypeId::UNTYPED);
        debug_assert_eq!(bottom, TypeId::BOTTOM);
        interner
    }

    /// Intern a structure, returning its id. Idempotent.
    pub fn intern(&self, data: TypeData) -> TypeId {
        if let Some(id) = self.map.get(&data) {
            return *id;
        }
        let Ok(mut types) = self.types.write() else {
            return TypeId::UNTYPED;
        };
        // Double-check under the write lock: another thread may have won.
        if let Some(id) = self.map.get(&data) {
            return *id;
        }
        let id = TypeId(types.len() as u32);
        let flags = self.flags_for(&data, &types);
        types.push((data.clone(), flags));
        self.map.insert(data, id);
        trace!(?id, "interned type");
        id
    }

    /// Fetch the structure behind an id. Cheap: members are `Arc` slices.
    pub fn data(&self, id: TypeId) -> TypeData {
        self.types
            .read()
            .ok()
            .and_then(|types| types.get(id.index()).map(|(d, _)| d.clone()))
            .unwrap_or(TypeData::Untyped)
    }

    /// Structural facts recorded at interning time.
    pub fn flags(&self, id: TypeId) -> TypeFlags {
        self.types
            .read()
            .ok()
            .and_then(|types| types.get(id.index()).map(|(_, f)| *f))
            .unwrap_or(TypeFlags::CONTAINS_UNTYPED)
    }

    pub fn len(&self) -> usize {
        self.types.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn flags_for(&self, data: &TypeData, types: &[(TypeData, TypeFlags)]) -> TypeFlags {
        let of = |id: TypeId| {
            types
                .get(id.index())
                .map(|(_, f)| *f)
                .unwrap_or(TypeFlags::empty())
        };
        match data {
            TypeData::Untyped => TypeFlags::CONTAINS_UNTYPED,
            TypeData::Bottom => TypeFlags::empty(),
            TypeData::Class { args, .. } => args
                .iter()
                .fold(TypeFlags::empty(), |acc, &a| acc | of(a)),
            TypeData::Union { members } | TypeData::Intersection { members } => members
                .iter()
                .fold(TypeFlags::empty(), |acc, &m| acc | of(m)),
            TypeData::Nilable { inner } => of(*inner) | TypeFlags::CONTAINS_NIL,
            TypeData::TypeVar { upper, .. } => of(*upper) | TypeFlags::CONTAINS_TYPEVAR,
        }
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn class(&self, symbol: SymbolId) -> TypeId {
        self.intern(TypeData::Class {
            symbol,
            args: SmallVec::new(),
        })
    }

    pub fn class_with_args(&self, symbol: SymbolId, args: SmallVec<[TypeId; 2]>) -> TypeId {
        self.intern(TypeData::Class { symbol, args })
    }

    pub fn type_var(&self, symbol: SymbolId, upper: TypeId) -> TypeId {
        self.intern(TypeData::TypeVar { symbol, upper })
    }

    /// `T?`. Normalizes `Untyped? == Untyped` and `T?? == T?`.
    pub fn nilable(&self, inner: TypeId) -> TypeId {
        if inner == TypeId::UNTYPED {
            return TypeId::UNTYPED;
        }
        if matches!(self.data(inner), TypeData::Nilable { .. }) {
            return inner;
        }
        self.intern(TypeData::Nilable { inner })
    }

    /// Normalized union of arbitrarily many members.
    ///
    /// Flattens nested unions, drops `Bottom`, deduplicates, sorts by id.
    /// `Untyped` absorbs the whole union; an empty union is `Bottom`; a
    /// singleton is the member itself. Unions past the configured size
    /// collapse to `Untyped` (precision is gone at that point anyway).
    pub fn union(&self, members: impl IntoIterator<Item = TypeId>) -> TypeId {
        let mut flat: SmallVec<[TypeId; 8]> = SmallVec::new();
        for member in members {
            if member == TypeId::UNTYPED {
                return TypeId::UNTYPED;
            }
            if member == TypeId::BOTTOM {
                continue;
            }
            match self.data(member) {
                TypeData::Union { members: inner } => {
                    for &m in inner.iter() {
                        if !flat.contains(&m) {
                            flat.push(m);
                        }
                    }
                }
                _ => {
                    if !flat.contains(&member) {
                        flat.push(member);
                    }
                }
            }
        }
        match flat.len() {
            0 => TypeId::BOTTOM,
            1 => flat[0],
            n if n > limits::MAX_UNION_MEMBERS => TypeId::UNTYPED,
            _ => {
                flat.sort();
                self.intern(TypeData::Union {
                    members: flat.to_vec().into(),
                })
            }
        }
    }

    /// Normalized intersection; dual rules to [`union`](Self::union).
    pub fn intersection(&self, members: impl IntoIterator<Item = TypeId>) -> TypeId {
        let mut flat: SmallVec<[TypeId; 8]> = SmallVec::new();
        for member in members {
            if member == TypeId::BOTTOM {
                return TypeId::BOTTOM;
            }
            if member == TypeId::UNTYPED {
                continue;
            }
            match self.data(member) {
                TypeData::Intersection { members: inner } => {
                    for &m in inner.iter() {
                        if !flat.contains(&m) {
                            flat.push(m);
                        }
                    }
                }
                _ => {
                    if !flat.contains(&member) {
                        flat.push(member);
                    }
                }
            }
        }
        match flat.len() {
            0 => TypeId::UNTYPED,
            1 => flat[0],
            _ => {
                flat.sort();
                self.intern(TypeData::Intersection {
                    members: flat.to_vec().into(),
                })
            }
        }
    }

    /// Least upper bound: the join used wherever control-flow paths merge.
    pub fn join(&self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        self.union([a, b])
    }

    /// Replace type variables according to `map`. Types without variables
    /// return unchanged without walking (the flags know).
    pub fn substitute(
        &self,
        ty: TypeId,
        map: &rustc_hash::FxHashMap<SymbolId, TypeId>,
    ) -> TypeId {
        if map.is_empty() || !self.flags(ty).contains(TypeFlags::CONTAINS_TYPEVAR) {
            return ty;
        }
        match self.data(ty) {
            TypeData::TypeVar { symbol, .. } => map.get(&symbol).copied().unwrap_or(ty),
            TypeData::Class { symbol, args } => {
                let args = args.iter().map(|&a| self.substitute(a, map)).collect();
                self.class_with_args(symbol, args)
            }
            TypeData::Union { members } => {
                let members: Vec<TypeId> =
                    members.iter().map(|&m| self.substitute(m, map)).collect();
                self.union(members)
            }
            TypeData::Intersection { members } => {
                let members: Vec<TypeId> =
                    members.iter().map(|&m| self.substitute(m, map)).collect();
                self.intersection(members)
            }
            TypeData::Nilable { inner } => {
                let inner = self.substitute(inner, map);
                self.nilable(inner)
            }
            _ => ty,
        }
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}
