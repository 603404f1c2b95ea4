//! Tests for constant resolution, linearization, cycles, annotations,
//! and override checking.

use rustc_hash::FxHashMap;
use tyc_ast::SourceFile;
use tyc_ast::build::TreeBuilder;
use tyc_binder::table::SymbolTable;
use tyc_binder::{SymbolId, SymbolKind, apply_file, symbol_flags};
use tyc_common::diagnostic_codes;
use tyc_common::interner::NameTable;
use tyc_common::{FileId, Limits};
use tyc_resolver::{ResolveOutput, resolve_program};
use tyc_solver::{TypeData, TypeInterner};

fn analyze(names: &NameTable, files: &[SourceFile]) -> (SymbolTable, TypeInterner, ResolveOutput) {
    let mut table = SymbolTable::new(names);
    let mut paths = FxHashMap::default();
    for (i, file) in files.iter().enumerate() {
        paths.insert(FileId(i as u32), file.path.clone());
        apply_file(&mut table, names, FileId(i as u32), file);
    }
    let interner = TypeInterner::new();
    let out = resolve_program(&mut table, names, &interner, &paths, &Limits::default());
    (table, interner, out)
}

// =============================================================================
// Constant resolution
// =============================================================================

#[test]
fn resolves_superclass_across_files() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let base = b.file("base.tyc", vec![b.class("Base", None, vec![])]);
    let derived = b.file("derived.tyc", vec![b.class("Derived", Some("Base"), vec![])]);

    let (table, _interner, out) = analyze(&names, &[base, derived]);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);

    let base_id = table.child(SymbolId::ROOT, names.intern("Base")).unwrap();
    let derived_id = table.child(SymbolId::ROOT, names.intern("Derived")).unwrap();
    assert_eq!(table.get(derived_id).unwrap().superclass, Some(base_id));
    // The derived file now depends on Base.
    assert!(out.references[&FileId(1)].contains(&base_id));
}

#[test]
fn resolves_nested_path_lexically() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "net.tyc",
        vec![
            b.module("Net", vec![b.class("Client", None, vec![])]),
            b.class("Fetcher", Some("Net::Client"), vec![]),
        ],
    );

    let (table, _interner, out) = analyze(&names, &[tree]);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let net = table.child(SymbolId::ROOT, names.intern("Net")).unwrap();
    let client = table.child(net, names.intern("Client")).unwrap();
    let fetcher = table.child(SymbolId::ROOT, names.intern("Fetcher")).unwrap();
    assert_eq!(table.get(fetcher).unwrap().superclass, Some(client));
}

#[test]
fn unresolved_constant_reported_defaults_untyped() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "bad.tyc",
        vec![b.class("Orphan", Some("NoSuchThing"), vec![])],
    );

    let (table, _interner, out) = analyze(&names, &[tree]);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, diagnostic_codes::UNRESOLVED_CONSTANT);

    // The class stays usable: no superclass edge, ancestry still built.
    let orphan = table.child(SymbolId::ROOT, names.intern("Orphan")).unwrap();
    let sym = table.get(orphan).unwrap();
    assert!(sym.superclass.is_none());
    assert!(sym.ancestry.is_some());
}

#[test]
fn include_of_class_is_diagnostic() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "mix.tyc",
        vec![
            b.class("NotAModule", None, vec![]),
            b.class("Host", None, vec![b.include("NotAModule")]),
        ],
    );

    let (_table, _interner, out) = analyze(&names, &[tree]);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, diagnostic_codes::MIXIN_NOT_MODULE);
}

// =============================================================================
// Linearization
// =============================================================================

#[test]
fn linearization_is_most_derived_first() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "chain.tyc",
        vec![
            b.module("Walkable", vec![]),
            b.module("Swimmable", vec![]),
            b.class("Animal", None, vec![]),
            b.class(
                "Duck",
                Some("Animal"),
                vec![b.include("Walkable"), b.include("Swimmable")],
            ),
        ],
    );

    let (table, _interner, out) = analyze(&names, &[tree]);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);

    let duck = table.child(SymbolId::ROOT, names.intern("Duck")).unwrap();
    let animal = table.child(SymbolId::ROOT, names.intern("Animal")).unwrap();
    let walkable = table.child(SymbolId::ROOT, names.intern("Walkable")).unwrap();
    let swimmable = table.child(SymbolId::ROOT, names.intern("Swimmable")).unwrap();
    let object = table.core().object;

    let ancestry = table.get(duck).unwrap().ancestry.clone().unwrap();
    // Self first, then the most recently included module, then earlier
    // includes, then the superclass chain.
    assert_eq!(
        ancestry.as_ref(),
        &[duck, swimmable, walkable, animal, object]
    );
}

#[test]
fn linearization_deduplicates_keeping_most_derived() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "dedup.tyc",
        vec![
            b.module("Shared", vec![]),
            b.class("Base", None, vec![b.include("Shared")]),
            b.class("Derived", Some("Base"), vec![b.include("Shared")]),
        ],
    );

    let (table, _interner, _out) = analyze(&names, &[tree]);
    let derived = table.child(SymbolId::ROOT, names.intern("Derived")).unwrap();
    let shared = table.child(SymbolId::ROOT, names.intern("Shared")).unwrap();
    let ancestry = table.get(derived).unwrap().ancestry.clone().unwrap();

    let occurrences = ancestry.iter().filter(|&&id| id == shared).count();
    assert_eq!(occurrences, 1);
    // Kept at its most-derived position: directly after Derived itself.
    assert_eq!(ancestry[1], shared);
}

#[test]
fn mutual_superclass_cycle_flags_both() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "cycle.tyc",
        vec![
            b.class("Yin", Some("Yang"), vec![]),
            b.class("Yang", Some("Yin"), vec![]),
        ],
    );

    let (table, _interner, out) = analyze(&names, &[tree]);
    let cyclic: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| d.code == diagnostic_codes::CYCLIC_ANCESTRY)
        .collect();
    assert_eq!(cyclic.len(), 2);

    for name in ["Yin", "Yang"] {
        let id = table.child(SymbolId::ROOT, names.intern(name)).unwrap();
        let sym = table.get(id).unwrap();
        assert!(sym.has_flag(symbol_flags::CYCLIC_ANCESTRY));
        assert!(!sym.has_flag(symbol_flags::RESOLVED));
        assert_eq!(sym.ancestry.clone().unwrap().as_ref(), &[id]);
    }
}

#[test]
fn self_superclass_cycle_is_fatal_for_that_class_only() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "selfcycle.tyc",
        vec![
            b.class("Ouroboros", Some("Ouroboros"), vec![]),
            b.class("Bystander", None, vec![]),
        ],
    );

    let (table, _interner, out) = analyze(&names, &[tree]);
    assert!(
        out.diagnostics
            .iter()
            .any(|d| d.code == diagnostic_codes::CYCLIC_ANCESTRY)
    );
    let bystander = table.child(SymbolId::ROOT, names.intern("Bystander")).unwrap();
    assert!(table.get(bystander).unwrap().has_flag(symbol_flags::RESOLVED));
}

// =============================================================================
// Annotations and signatures
// =============================================================================

#[test]
fn method_signature_resolves_to_lattice_types() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "sig.tyc",
        vec![b.class(
            "Calc",
            None,
            vec![b.method(
                "add",
                vec![
                    b.param("a", Some(b.ty("Integer"))),
                    b.param("b", Some(b.ty_nilable(b.ty("Integer")))),
                ],
                Some(b.ty_union(vec![b.ty("Integer"), b.ty("String")])),
                vec![],
            )],
        )],
    );

    let (table, interner, out) = analyze(&names, &[tree]);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);

    let calc = table.child(SymbolId::ROOT, names.intern("Calc")).unwrap();
    let add = table.member(calc, names.intern("add"), SymbolKind::Method).unwrap();
    let sig = out.store.method(add).unwrap();

    let int = interner.class(table.core().integer);
    assert_eq!(sig.params[0].ty, int);
    assert_eq!(sig.params[1].ty, interner.nilable(int));
    match interner.data(sig.ret) {
        TypeData::Union { members } => assert_eq!(members.len(), 2),
        other => panic!("expected union return, got {other:?}"),
    }
}

#[test]
fn generic_type_param_resolves_to_type_var() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "box.tyc",
        vec![b.generic_class(
            "Box",
            &["T"],
            None,
            vec![b.method("unwrap", vec![], Some(b.ty("T")), vec![])],
        )],
    );

    let (table, interner, out) = analyze(&names, &[tree]);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);

    let box_id = table.child(SymbolId::ROOT, names.intern("Box")).unwrap();
    let unwrap_id = table
        .member(box_id, names.intern("unwrap"), SymbolKind::Method)
        .unwrap();
    let sig = out.store.method(unwrap_id).unwrap();
    assert!(matches!(interner.data(sig.ret), TypeData::TypeVar { .. }));
}

#[test]
fn unannotated_const_infers_from_literal() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "consts.tyc",
        vec![
            b.const_decl("ANSWER", None, b.int(42)),
            b.const_decl("GREETING", None, b.str_("hi")),
        ],
    );

    let (table, interner, out) = analyze(&names, &[tree]);
    let answer = table.child(SymbolId::ROOT, names.intern("ANSWER")).unwrap();
    let greeting = table.child(SymbolId::ROOT, names.intern("GREETING")).unwrap();
    assert_eq!(out.store.const_ty(answer), interner.class(table.core().integer));
    assert_eq!(out.store.const_ty(greeting), interner.class(table.core().string));
}

// =============================================================================
// Override checking
// =============================================================================

#[test]
fn override_return_mismatch_is_flagged() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "override.tyc",
        vec![
            b.class(
                "A",
                None,
                vec![b.method(
                    "m",
                    vec![b.param("x", Some(b.ty("Integer")))],
                    Some(b.ty("Integer")),
                    vec![],
                )],
            ),
            b.class(
                "B",
                Some("A"),
                vec![b.method(
                    "m",
                    vec![b.param("x", Some(b.ty("Integer")))],
                    Some(b.ty("String")),
                    vec![],
                )],
            ),
        ],
    );

    let (_table, _interner, out) = analyze(&names, &[tree]);
    let mismatches: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| d.code == diagnostic_codes::OVERRIDE_RETURN_MISMATCH)
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert!(mismatches[0].message_text.contains("String"));
    assert!(mismatches[0].message_text.contains("Integer"));
}

#[test]
fn covariant_override_return_is_allowed() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "override_ok.tyc",
        vec![
            b.class(
                "A",
                None,
                vec![b.method("m", vec![], Some(b.ty("Object")), vec![])],
            ),
            b.class(
                "B",
                Some("A"),
                vec![b.method("m", vec![], Some(b.ty("Integer")), vec![])],
            ),
        ],
    );

    let (_table, _interner, out) = analyze(&names, &[tree]);
    assert!(
        !out.diagnostics
            .iter()
            .any(|d| d.code == diagnostic_codes::OVERRIDE_RETURN_MISMATCH),
        "{:?}",
        out.diagnostics
    );
}

#[test]
fn override_param_narrowing_is_flagged() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let tree = b.file(
        "narrow.tyc",
        vec![
            b.class(
                "A",
                None,
                vec![b.method(
                    "m",
                    vec![b.param("x", Some(b.ty("Object")))],
                    None,
                    vec![],
                )],
            ),
            b.class(
                "B",
                Some("A"),
                vec![b.method(
                    "m",
                    vec![b.param("x", Some(b.ty("Integer")))],
                    None,
                    vec![],
                )],
            ),
        ],
    );

    let (_table, _interner, out) = analyze(&names, &[tree]);
    assert!(
        out.diagnostics
            .iter()
            .any(|d| d.code == diagnostic_codes::OVERRIDE_PARAM_MISMATCH)
    );
}
