//! Centralized limits and thresholds for the analyzer.
//!
//! Every bounded fixed point in the pipeline takes its bound from here.
//! Centralizing these values prevents duplicate definitions with
//! inconsistent values and documents the rationale for each limit.

/// Maximum abstract-interpretation iterations per loop.
///
/// Loop bodies are re-analyzed until their type environments stop changing.
/// A pathological program (or a genuinely oscillating one, e.g. a variable
/// alternating between ever-larger union types) could iterate forever, so
/// after this many passes the engine widens every still-changing variable
/// to `Untyped` and moves on. Termination is bought with precision: the
/// widened variables simply stop participating in inference.
pub const LOOP_FIXPOINT_ITERATIONS: u32 = 10;

/// Maximum resolver passes over unresolved constants.
///
/// Constant resolution retries in passes until a pass resolves nothing new
/// (the usual exit), so this cap only matters if the fixed-point test is
/// broken. Exceeding it is an internal invariant violation, not a user
/// diagnostic.
pub const RESOLVER_MAX_PASSES: u32 = 64;

/// Maximum nesting depth of a type annotation expression.
///
/// Annotation trees come from the outside world; a hostile input could nest
/// `A[A[A[...]]]` deep enough to overflow the stack during resolution.
/// Beyond this depth the annotation resolves to `Untyped`.
pub const MAX_ANNOTATION_DEPTH: u32 = 64;

/// Maximum members tracked in a single union before collapsing to `Untyped`.
///
/// Joins at merge points grow unions; a loop accumulating distinct literal
/// receivers could grow one without bound. Past this size the union stops
/// being useful for method lookup anyway.
pub const MAX_UNION_MEMBERS: usize = 64;

/// Tunable copy of the limits, carried by `AnalyzerOptions`.
///
/// The constants above are the documented defaults; embedders (tests, the
/// editor backend) override individual bounds without recompiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub loop_fixpoint_iterations: u32,
    pub resolver_max_passes: u32,
    pub max_annotation_depth: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            loop_fixpoint_iterations: LOOP_FIXPOINT_ITERATIONS,
            resolver_max_passes: RESOLVER_MAX_PASSES,
            max_annotation_depth: MAX_ANNOTATION_DEPTH,
        }
    }
}
