//! Common types and utilities shared by every stage of the tyc pipeline.
//!
//! This crate is dependency-free within the workspace: the interner, spans,
//! diagnostics, centralized limits, and the cancellation token live here so
//! that every later stage can use them without cycles.

pub mod cancellation;
pub mod diagnostics;
pub mod interner;
pub mod limits;
pub mod span;

pub use cancellation::{Cancelled, CancellationToken};
pub use diagnostics::{Diagnostic, DiagnosticCategory, diagnostic_codes};
pub use interner::{Atom, Interner, NameTable};
pub use limits::Limits;
pub use span::{FileId, LineCol, LineIndex, Span};
