//! String interner for identifier and constant-name deduplication.
//!
//! Intern strings into a process-wide pool and pass around u32 handles
//! (Atoms). Equality between names becomes an integer comparison, and the
//! same identifier appearing in a thousand files is stored once.
//!
//! Two flavours are provided: [`Interner`] for single-threaded use (tests,
//! one-shot tools) and the sharded [`NameTable`] used by the analyzer, which
//! supports concurrent reads with a per-shard append lock.

use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

/// An interned string identifier.
///
/// Atoms are cheap to copy (just a u32) and can be compared with == in O(1).
/// To get the actual string, resolve it through the interner that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    /// A sentinel value representing no atom / empty string.
    pub const NONE: Atom = Atom(0);

    /// Check if this is the empty/none atom.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Get the raw index value.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

const SHARD_BITS: u32 = 6;
const SHARD_COUNT: usize = 1 << SHARD_BITS;
const SHARD_MASK: u32 = (SHARD_COUNT as u32) - 1;

const COMMON_STRINGS: &[&str] = &[
    // Keywords of the analyzed language
    "class",
    "module",
    "def",
    "end",
    "if",
    "else",
    "elsif",
    "while",
    "until",
    "begin",
    "rescue",
    "ensure",
    "return",
    "break",
    "next",
    "self",
    "nil",
    "true",
    "false",
    "include",
    "extend",
    "new",
    // Core classes seeded into every symbol table
    "Object",
    "BasicObject",
    "Integer",
    "Float",
    "String",
    "Symbol",
    "Boolean",
    "NilClass",
    "Array",
    "Hash",
    "Kernel",
    "Comparable",
    // Common identifiers and methods
    "initialize",
    "name",
    "value",
    "length",
    "size",
    "each",
    "map",
    "to_s",
    "to_i",
    "==",
    "+",
    "-",
    "*",
    "/",
    "<",
    ">",
    "<=",
    ">=",
    "x",
    "y",
    "id",
    "key",
    "item",
    "result",
];

/// String interner that deduplicates strings and returns Atom handles.
///
/// # Example
/// ```
/// use tyc_common::interner::Interner;
/// let mut interner = Interner::new();
/// let a1 = interner.intern("greet");
/// let a2 = interner.intern("greet");
/// assert_eq!(a1, a2); // Same atom for same string
/// assert_eq!(interner.resolve(a1), "greet");
/// ```
#[derive(Default)]
pub struct Interner {
    /// Map from string to atom index
    map: FxHashMap<Arc<str>, Atom>,
    /// Vector of all interned strings (index 0 is empty string)
    strings: Vec<Arc<str>>,
}

impl Interner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut interner = Interner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(1024),
        };
        // Index 0 is reserved for empty/none
        let empty: Arc<str> = Arc::from("");
        interner.strings.push(empty.clone());
        interner.map.insert(empty, Atom::NONE);
        interner
    }

    /// Intern a string, returning its Atom handle.
    /// If the string was already interned, returns the existing Atom.
    #[inline]
    pub fn intern(&mut self, s: &str) -> Atom {
        if let Some(&atom) = self.map.get(s) {
            return atom;
        }
        let atom = Atom(self.strings.len() as u32);
        let owned: Arc<str> = Arc::from(s);
        self.strings.push(owned.clone());
        self.map.insert(owned, atom);
        atom
    }

    /// Resolve an Atom back to its string value.
    /// Returns empty string if atom is out of bounds (safety for error recovery).
    #[inline]
    pub fn resolve(&self, atom: Atom) -> &str {
        self.strings
            .get(atom.0 as usize)
            .map(|s| s.as_ref())
            .unwrap_or("")
    }

    /// Get the number of interned strings.
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the interner is empty (only has the empty string).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

#[derive(Default)]
struct ShardState {
    map: FxHashMap<Arc<str>, Atom>,
    strings: Vec<Arc<str>>,
}

struct NameShard {
    state: RwLock<ShardState>,
}

impl NameShard {
    fn new() -> Self {
        NameShard {
            state: RwLock::new(ShardState::default()),
        }
    }
}

/// Sharded, append-only name table for concurrent use.
///
/// The analyzer shares one `Arc<NameTable>` between all worker threads.
/// Resolution takes a shard read lock; interning takes the single shard
/// write lock, so appends serialize per shard while reads stay parallel.
/// Atoms are never invalidated once handed out.
pub struct NameTable {
    shards: [NameShard; SHARD_COUNT],
}

impl NameTable {
    /// Create a new name table with the empty string pre-interned at index 0
    /// and the language's common strings warmed up.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|_| NameShard::new());

        if let Ok(mut state) = shards[0].state.write() {
            let empty: Arc<str> = Arc::from("");
            state.strings.push(empty.clone());
            state.map.insert(empty, Atom::NONE);
        }

        let table = NameTable { shards };
        for s in COMMON_STRINGS {
            table.intern(s);
        }
        table
    }

    /// Intern a string, returning its Atom handle.
    /// If the string was already interned, returns the existing Atom.
    #[inline]
    pub fn intern(&self, s: &str) -> Atom {
        if s.is_empty() {
            return Atom::NONE;
        }

        let shard_idx = Self::shard_for(s);
        let shard = &self.shards[shard_idx];
        let Ok(mut state) = shard.state.write() else {
            // Poisoned lock: keep the process available, hand out the
            // empty atom rather than propagating the panic.
            return Atom::NONE;
        };

        if let Some(&atom) = state.map.get(s) {
            return atom;
        }

        let local_index = state.strings.len() as u32;
        if local_index > (u32::MAX >> SHARD_BITS) {
            return Atom::NONE;
        }

        let atom = Self::make_atom(local_index, shard_idx as u32);
        let owned: Arc<str> = Arc::from(s);
        state.strings.push(owned.clone());
        state.map.insert(owned, atom);
        atom
    }

    /// Resolve an Atom back to its string value.
    /// Returns empty string if atom is out of bounds (safety for error recovery).
    #[inline]
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        self.try_resolve(atom).unwrap_or_else(|| Arc::from(""))
    }

    /// Try to resolve an Atom, returning None if invalid.
    #[inline]
    pub fn try_resolve(&self, atom: Atom) -> Option<Arc<str>> {
        let (shard_idx, local_index) = Self::split_atom(atom);
        let shard = self.shards.get(shard_idx)?;
        let state = shard.state.read().ok()?;
        state.strings.get(local_index).cloned()
    }

    /// Get the number of interned strings.
    #[inline]
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .state
                    .read()
                    .map(|state| state.strings.len())
                    .unwrap_or(0)
            })
            .sum()
    }

    /// Check if the table is empty (only has the empty string).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        let mut hasher = FxHasher::default();
        s.hash(&mut hasher);
        (hasher.finish() as usize) & (SHARD_COUNT - 1)
    }

    #[inline]
    fn make_atom(local_index: u32, shard_idx: u32) -> Atom {
        Atom((local_index << SHARD_BITS) | (shard_idx & SHARD_MASK))
    }

    #[inline]
    fn split_atom(atom: Atom) -> (usize, usize) {
        if atom == Atom::NONE {
            return (0, 0);
        }
        let raw = atom.0;
        ((raw & SHARD_MASK) as usize, (raw >> SHARD_BITS) as usize)
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}
