//! Type representation.

use bitflags::bitflags;
use smallvec::SmallVec;
use std::sync::Arc;
use tyc_binder::SymbolId;

/// Interned type handle. Equality is identity: two structurally equal
/// types always intern to the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Top: absorbs everything; the model of dynamic behavior the
    /// analyzer cannot resolve.
    pub const UNTYPED: TypeId = TypeId(0);
    /// Bottom: uninhabited, the result type of unreachable code.
    pub const BOTTOM: TypeId = TypeId(1);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_untyped(self) -> bool {
        self == TypeId::UNTYPED
    }
}

/// The closed, recursive sum of type structures.
///
/// Members of `Union`/`Intersection` are held behind `Arc` slices so the
/// interner key stays cheap to clone and hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Untyped,
    Bottom,
    /// An instance of a class or module, with generic arguments.
    Class {
        symbol: SymbolId,
        args: SmallVec<[TypeId; 2]>,
    },
    /// Normalized: flattened, deduplicated, sorted, at least two members.
    Union { members: Arc<[TypeId]> },
    /// Normalized like `Union`.
    Intersection { members: Arc<[TypeId]> },
    /// `T?`: `T` or nil.
    Nilable { inner: TypeId },
    /// Reference to a class type parameter, bounded above.
    TypeVar { symbol: SymbolId, upper: TypeId },
}

bitflags! {
    /// Structural facts computed once at interning time, so later stages
    /// can ask "does this type mention a type variable" without walking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct TypeFlags: u8 {
        const CONTAINS_UNTYPED = 1 << 0;
        const CONTAINS_TYPEVAR = 1 << 1;
        const CONTAINS_NIL = 1 << 2;
    }
}
