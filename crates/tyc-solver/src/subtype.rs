//! Structural subtyping over the lattice.
//!
//! The rules, in the order they are tried:
//! - reflexivity (`a == b`, an id comparison thanks to interning)
//! - `Bottom` is a subtype of everything
//! - everything is a subtype of `Untyped`
//! - a `Union` is a subtype of `T` iff every member is
//! - `T` is a subtype of a `Union` iff some member admits it
//! - `T` is a subtype of an `Intersection` iff it is a subtype of every
//!   member; an `Intersection` is a subtype of `T` iff some member is
//! - `T?` unwraps to `T ∪ nil` on either side
//! - classes check the linearized ancestry; generic arguments are
//!   covariant when the classes coincide
//! - a type variable is a subtype of whatever its upper bound admits

use tyc_binder::{SymbolId, SymbolTable};

use crate::intern::TypeInterner;
use crate::types::{TypeData, TypeId};

pub fn is_subtype(
    interner: &TypeInterner,
    table: &SymbolTable,
    sub: TypeId,
    sup: TypeId,
) -> bool {
    if sub == sup {
        return true;
    }
    if sub == TypeId::BOTTOM || sup == TypeId::UNTYPED {
        return true;
    }
    if sub == TypeId::UNTYPED || sup == TypeId::BOTTOM {
        return false;
    }

    let sub_data = interner.data(sub);
    let sup_data = interner.data(sup);

    // Union on the left: all members must fit.
    if let TypeData::Union { members } = &sub_data {
        return members.iter().all(|&m| is_subtype(interner, table, m, sup));
    }
    // Intersection on the right: all members must admit.
    if let TypeData::Intersection { members } = &sup_data {
        return members.iter().all(|&m| is_subtype(interner, table, sub, m));
    }
    // Nilable on the left behaves as `inner ∪ nil`.
    if let TypeData::Nilable { inner } = &sub_data {
        let nil = interner.class(table.core().nil_class);
        return is_subtype(interner, table, *inner, sup)
            && is_subtype(interner, table, nil, sup);
    }
    // Nilable on the right admits its inner type and nil.
    if let TypeData::Nilable { inner } = &sup_data {
        if is_subtype(interner, table, sub, *inner) {
            return true;
        }
        if let TypeData::Class { symbol, .. } = &sub_data {
            if *symbol == table.core().nil_class {
                return true;
            }
        }
        // fall through: sub may still fit via a union member on the right
    }
    // Union on the right: some member must admit.
    if let TypeData::Union { members } = &sup_data {
        return members.iter().any(|&m| is_subtype(interner, table, sub, m));
    }
    // Intersection on the left: some member suffices.
    if let TypeData::Intersection { members } = &sub_data {
        return members.iter().any(|&m| is_subtype(interner, table, m, sup));
    }

    match (&sub_data, &sup_data) {
        (
            TypeData::Class {
                symbol: c1,
                args: a1,
            },
            TypeData::Class {
                symbol: c2,
                args: a2,
            },
        ) => {
            if c1 == c2 {
                // Covariant generic arguments; arity mismatches fail.
                return a1.len() == a2.len()
                    && a1
                        .iter()
                        .zip(a2.iter())
                        .all(|(&x, &y)| is_subtype(interner, table, x, y));
            }
            is_ancestor(table, *c1, *c2)
        }
        (TypeData::TypeVar { symbol: s1, .. }, TypeData::TypeVar { symbol: s2, .. }) => s1 == s2,
        (TypeData::TypeVar { upper, .. }, _) => is_subtype(interner, table, *upper, sup),
        _ => false,
    }
}

/// Is `ancestor` in `class_sym`'s ancestor chain?
///
/// Prefers the resolver's linearization; falls back to walking the
/// superclass edges (with a cycle guard) when the class has not been
/// linearized yet.
fn is_ancestor(table: &SymbolTable, class_sym: SymbolId, ancestor: SymbolId) -> bool {
    if let Some(sym) = table.get(class_sym) {
        if let Some(ancestry) = &sym.ancestry {
            return ancestry.contains(&ancestor);
        }
    }
    // Unlinearized: follow superclass links only.
    let mut current = class_sym;
    let mut steps = 0usize;
    while let Some(sym) = table.get(current) {
        if current == ancestor {
            return true;
        }
        if sym.includes.contains(&ancestor) {
            return true;
        }
        match sym.superclass {
            Some(next) if steps < 256 => {
                steps += 1;
                current = next;
            }
            _ => break,
        }
    }
    current == ancestor
}
