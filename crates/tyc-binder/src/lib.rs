//! Symbol table and namer.
//!
//! The binder turns desugared trees into the whole-program symbol model:
//! [`symbol`] defines the arena of [`Symbol`]s addressed by stable
//! [`SymbolId`] handles, and [`namer`] materializes/refreshes the symbols
//! each file declares. Resolution of superclasses, mixins, and type
//! annotations happens later, in `tyc-resolver`; the binder only records
//! what was written.

pub mod namer;
pub mod symbol;
pub mod table;

pub use namer::{CollectedFile, MethodBinding, NamedFile, apply_file, collect_file, remove_file_symbols};
pub use symbol::{MixinExpr, MixinKind, ParamDef, Symbol, SymbolId, SymbolKind, symbol_flags};
pub use table::{CoreClasses, SymbolTable};
