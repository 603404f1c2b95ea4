//! The type lattice.
//!
//! Types are interned: every distinct structure is stored once and named
//! by a [`TypeId`], so equality is an integer comparison and unions can be
//! deduplicated by id. `Union`/`Intersection` are normalized at interning
//! time (flattened, deduplicated, sorted, never singleton), which makes
//! the join of two types a plain union construction.
//!
//! The lattice is closed: `Untyped` is the top (absorbs everything, the
//! model of unresolvable dynamic behavior), `Bottom` the uninhabited
//! result of unreachable code, and subtyping is structural over the
//! remaining variants.

mod display;
mod intern;
mod signatures;
mod subtype;
pub mod types;

pub use display::type_to_string;
pub use intern::TypeInterner;
pub use signatures::{MethodSig, ParamSig, SignatureStore};
pub use subtype::is_subtype;
pub use types::{TypeData, TypeFlags, TypeId};
