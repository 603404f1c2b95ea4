//! Lattice law tests: normalization, join, and subtyping.

use smallvec::smallvec;
use tyc_binder::table::SymbolTable;
use tyc_common::interner::NameTable;
use tyc_solver::{TypeData, TypeId, TypeInterner, is_subtype, type_to_string};

fn setup() -> (NameTable, SymbolTable, TypeInterner) {
    let names = NameTable::new();
    let table = SymbolTable::new(&names);
    let interner = TypeInterner::new();
    (names, table, interner)
}

// =============================================================================
// Normalization
// =============================================================================

#[test]
fn union_flattens_and_deduplicates() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let int = interner.class(core.integer);
    let string = interner.class(core.string);
    let float = interner.class(core.float);

    let ab = interner.union([int, string]);
    let nested = interner.union([ab, float, int]);

    match interner.data(nested) {
        TypeData::Union { members } => {
            assert_eq!(members.len(), 3);
            let mut sorted = members.to_vec();
            sorted.sort();
            assert_eq!(sorted.as_slice(), members.as_ref());
        }
        other => panic!("expected union, got {other:?}"),
    }
}

#[test]
fn union_is_order_insensitive() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let int = interner.class(core.integer);
    let string = interner.class(core.string);

    assert_eq!(
        interner.union([int, string]),
        interner.union([string, int])
    );
}

#[test]
fn union_never_singleton() {
    let (_names, table, interner) = setup();
    let int = interner.class(table.core().integer);
    assert_eq!(interner.union([int, int]), int);
    assert_eq!(interner.union([int]), int);
}

#[test]
fn union_absorbs_untyped_drops_bottom() {
    let (_names, table, interner) = setup();
    let int = interner.class(table.core().integer);
    assert_eq!(interner.union([int, TypeId::UNTYPED]), TypeId::UNTYPED);
    assert_eq!(interner.union([int, TypeId::BOTTOM]), int);
    assert_eq!(interner.union(std::iter::empty()), TypeId::BOTTOM);
}

#[test]
fn intersection_dual_rules() {
    let (_names, table, interner) = setup();
    let int = interner.class(table.core().integer);
    assert_eq!(interner.intersection([int, TypeId::BOTTOM]), TypeId::BOTTOM);
    assert_eq!(interner.intersection([int, TypeId::UNTYPED]), int);
    assert_eq!(interner.intersection(std::iter::empty()), TypeId::UNTYPED);
}

#[test]
fn nilable_normalizes() {
    let (_names, table, interner) = setup();
    let int = interner.class(table.core().integer);
    let opt = interner.nilable(int);
    assert_eq!(interner.nilable(opt), opt);
    assert_eq!(interner.nilable(TypeId::UNTYPED), TypeId::UNTYPED);
}

// =============================================================================
// Join laws
// =============================================================================

#[test]
fn join_is_commutative_and_associative() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let a = interner.class(core.integer);
    let b = interner.class(core.string);
    let c = interner.class(core.float);

    assert_eq!(interner.join(a, b), interner.join(b, a));
    assert_eq!(
        interner.join(interner.join(a, b), c),
        interner.join(a, interner.join(b, c))
    );
}

#[test]
fn join_operands_are_subtypes_of_join() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let a = interner.class(core.integer);
    let b = interner.class(core.string);
    let joined = interner.join(a, b);

    assert!(is_subtype(&interner, &table, a, joined));
    assert!(is_subtype(&interner, &table, b, joined));
}

#[test]
fn join_with_self_is_identity() {
    let (_names, table, interner) = setup();
    let a = interner.class(table.core().integer);
    assert_eq!(interner.join(a, a), a);
}

// =============================================================================
// Subtyping
// =============================================================================

#[test]
fn bottom_below_everything_untyped_above_everything() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let samples = [
        interner.class(core.integer),
        interner.nilable(interner.class(core.string)),
        interner.union([interner.class(core.integer), interner.class(core.float)]),
        TypeId::UNTYPED,
        TypeId::BOTTOM,
    ];
    for ty in samples {
        assert!(is_subtype(&interner, &table, TypeId::BOTTOM, ty));
        assert!(is_subtype(&interner, &table, ty, TypeId::UNTYPED));
    }
    // Untyped is top, not bottom: it only fits under itself.
    assert!(!is_subtype(
        &interner,
        &table,
        TypeId::UNTYPED,
        interner.class(core.integer)
    ));
}

#[test]
fn class_subtype_follows_ancestry() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let int = interner.class(core.integer);
    let obj = interner.class(core.object);
    assert!(is_subtype(&interner, &table, int, obj));
    assert!(!is_subtype(&interner, &table, obj, int));
}

#[test]
fn union_left_requires_all_members() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let int = interner.class(core.integer);
    let string = interner.class(core.string);
    let obj = interner.class(core.object);
    let both = interner.union([int, string]);

    assert!(is_subtype(&interner, &table, both, obj));
    assert!(!is_subtype(&interner, &table, both, int));
    // Member into its own union.
    assert!(is_subtype(&interner, &table, int, both));
}

#[test]
fn intersection_right_requires_all_members() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let int = interner.class(core.integer);
    let obj = interner.class(core.object);
    let meet = interner.intersection([int, obj]);

    assert!(is_subtype(&interner, &table, int, meet));
    assert!(is_subtype(&interner, &table, meet, int));
    assert!(is_subtype(&interner, &table, meet, obj));
}

#[test]
fn nilable_admits_inner_and_nil() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let int = interner.class(core.integer);
    let nil = interner.class(core.nil_class);
    let opt = interner.nilable(int);

    assert!(is_subtype(&interner, &table, int, opt));
    assert!(is_subtype(&interner, &table, nil, opt));
    assert!(!is_subtype(&interner, &table, opt, int));
    // T? into Object works because nil is an Object too.
    assert!(is_subtype(
        &interner,
        &table,
        opt,
        interner.class(core.object)
    ));
}

#[test]
fn generic_args_are_covariant() {
    let (_names, table, interner) = setup();
    let core = table.core();
    let int = interner.class(core.integer);
    let obj = interner.class(core.object);
    // Using String's symbol as a stand-in generic container class.
    let box_int = interner.class_with_args(core.string, smallvec![int]);
    let box_obj = interner.class_with_args(core.string, smallvec![obj]);

    assert!(is_subtype(&interner, &table, box_int, box_obj));
    assert!(!is_subtype(&interner, &table, box_obj, box_int));
}

// =============================================================================
// Display
// =============================================================================

#[test]
fn display_renders_lattice_shapes() {
    let (names, table, interner) = setup();
    let core = table.core();
    let int = interner.class(core.integer);
    let string = interner.class(core.string);

    assert_eq!(type_to_string(&interner, &table, &names, int), "Integer");
    assert_eq!(
        type_to_string(&interner, &table, &names, TypeId::UNTYPED),
        "untyped"
    );
    let both = interner.union([int, string]);
    let rendered = type_to_string(&interner, &table, &names, both);
    assert!(rendered.contains("Integer") && rendered.contains("String"));
    assert_eq!(
        type_to_string(&interner, &table, &names, interner.nilable(int)),
        "Integer?"
    );
}
