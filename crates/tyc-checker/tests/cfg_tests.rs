//! CFG construction tests: block shape, terminators, loops, exception
//! regions, dead tagging, and definite assignment.

use tyc_ast::build::TreeBuilder;
use tyc_ast::{Decl, MethodDecl};
use tyc_checker::cfg::{self, Terminator};
use tyc_common::diagnostic_codes;
use tyc_common::interner::NameTable;

fn method_of(decl: Decl) -> MethodDecl {
    match decl {
        Decl::Method(m) => m,
        other => panic!("expected method, got {other:?}"),
    }
}

// =============================================================================
// Well-formedness
// =============================================================================

#[test]
fn every_block_has_exactly_one_terminator() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let method = method_of(b.method(
        "busy",
        vec![b.param("flag", None)],
        None,
        vec![
            b.assign("x", b.int(1)),
            b.if_(
                b.local("flag"),
                vec![b.assign("x", b.int(2))],
                vec![b.assign("x", b.int(3))],
            ),
            b.while_(b.local("flag"), vec![b.assign("x", b.int(4))]),
            b.ret(Some(b.local("x"))),
        ],
    ));

    let graph = cfg::lower_method(&method);
    // Construction never leaves a block without a terminator; spot-check
    // the shape too.
    assert!(graph.blocks.len() >= 6);
    let branches = graph
        .blocks
        .iter()
        .filter(|blk| matches!(blk.term, Terminator::Branch { .. }))
        .count();
    assert_eq!(branches, 2); // one if, one while condition
}

#[test]
fn while_loop_has_back_edge_to_condition_join() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let method = method_of(b.method(
        "spin",
        vec![b.param("go", None)],
        None,
        vec![b.while_(b.local("go"), vec![b.assign("n", b.int(1))])],
    ));

    let graph = cfg::lower_method(&method);
    // A back edge: some block jumps to a block with a smaller id that
    // ends in the loop's conditional branch.
    let mut found_back_edge = false;
    for (i, blk) in graph.blocks.iter().enumerate() {
        if let Terminator::Jump(target) = blk.term {
            if target.index() < i
                && matches!(
                    graph.block(target).term,
                    Terminator::Branch { .. }
                )
            {
                found_back_edge = true;
            }
        }
    }
    assert!(found_back_edge, "loop body must jump back to the join");
}

#[test]
fn code_after_return_is_tagged_dead() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let method = method_of(b.method(
        "early",
        vec![],
        None,
        vec![
            b.ret(Some(b.int(1))),
            b.assign("never", b.int(2)),
        ],
    ));

    let graph = cfg::lower_method(&method);
    let dead_with_code = graph
        .blocks
        .iter()
        .any(|blk| blk.dead && !blk.bindings.is_empty());
    assert!(dead_with_code, "unreachable code stays in the graph, dead");
    // And the entry block is live.
    assert!(!graph.block(graph.entry).dead);
}

// =============================================================================
// Exception regions
// =============================================================================

#[test]
fn begin_rescue_emits_protected_terminator() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let method = method_of(b.method(
        "guarded",
        vec![],
        None,
        vec![b.begin_rescue(
            vec![b.assign("x", b.int(1))],
            vec![b.assign("x", b.int(2))],
        )],
    ));

    let graph = cfg::lower_method(&method);
    let protected: Vec<_> = graph
        .blocks
        .iter()
        .filter_map(|blk| match blk.term {
            Terminator::Protected { normal, handler } => Some((normal, handler)),
            _ => None,
        })
        .collect();
    assert_eq!(protected.len(), 1);
    let (_, handler) = protected[0];
    assert_ne!(handler, graph.exception_exit);
    // The handler is reachable (not dead): the exceptional edge counts.
    assert!(!graph.block(handler).dead);
}

#[test]
fn begin_without_rescue_targets_unhandled_exit() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let method = method_of(b.method(
        "unguarded",
        vec![],
        None,
        vec![b.begin_rescue(vec![b.assign("x", b.int(1))], vec![])],
    ));

    let graph = cfg::lower_method(&method);
    let handler = graph.blocks.iter().find_map(|blk| match blk.term {
        Terminator::Protected { handler, .. } => Some(handler),
        _ => None,
    });
    assert_eq!(handler, Some(graph.exception_exit));
    assert!(matches!(
        graph.block(graph.exception_exit).term,
        Terminator::UnhandledException
    ));
}

// =============================================================================
// Definite assignment
// =============================================================================

fn assignment_diagnostics(method: &MethodDecl, names: &NameTable) -> Vec<u32> {
    let graph = cfg::lower_method(method);
    let mut diagnostics = Vec::new();
    cfg::check_definite_assignment(&graph, names, "test.tyc", &mut diagnostics);
    diagnostics.iter().map(|d| d.code).collect()
}

#[test]
fn read_before_write_is_flagged() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let method = method_of(b.method(
        "oops",
        vec![],
        None,
        vec![b.assign("y", b.local("x"))],
    ));

    let codes = assignment_diagnostics(&method, &names);
    assert_eq!(codes, vec![diagnostic_codes::READ_BEFORE_WRITE]);
}

#[test]
fn parameters_are_assigned_on_entry() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let method = method_of(b.method(
        "fine",
        vec![b.param("x", None)],
        None,
        vec![b.assign("y", b.local("x")), b.ret(Some(b.local("y")))],
    ));

    assert!(assignment_diagnostics(&method, &names).is_empty());
}

#[test]
fn assignment_on_one_branch_only_is_flagged() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let method = method_of(b.method(
        "maybe",
        vec![b.param("flag", None)],
        None,
        vec![
            b.if_(b.local("flag"), vec![b.assign("x", b.int(1))], vec![]),
            b.assign("y", b.local("x")),
        ],
    ));

    let codes = assignment_diagnostics(&method, &names);
    assert_eq!(codes, vec![diagnostic_codes::READ_BEFORE_WRITE]);
}

#[test]
fn assignment_on_both_branches_is_fine() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    let method = method_of(b.method(
        "both",
        vec![b.param("flag", None)],
        None,
        vec![
            b.if_(
                b.local("flag"),
                vec![b.assign("x", b.int(1))],
                vec![b.assign("x", b.int(2))],
            ),
            b.assign("y", b.local("x")),
        ],
    ));

    assert!(assignment_diagnostics(&method, &names).is_empty());
}

#[test]
fn loop_body_assignment_does_not_leak_past_loop() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    // `x` is only assigned if the loop body ran at least once.
    let method = method_of(b.method(
        "leaky",
        vec![b.param("go", None)],
        None,
        vec![
            b.while_(b.local("go"), vec![b.assign("x", b.int(1))]),
            b.assign("y", b.local("x")),
        ],
    ));

    let codes = assignment_diagnostics(&method, &names);
    assert_eq!(codes, vec![diagnostic_codes::READ_BEFORE_WRITE]);
}

#[test]
fn rescue_handler_only_sees_pre_region_assignments() {
    let names = NameTable::new();
    let b = TreeBuilder::new(&names);
    // `x` is bound inside the protected body; the handler cannot rely on it.
    let method = method_of(b.method(
        "partial",
        vec![],
        None,
        vec![
            b.assign("safe", b.int(0)),
            b.begin_rescue(
                vec![b.assign("x", b.int(1))],
                vec![
                    b.assign("a", b.local("safe")),
                    b.assign("b", b.local("x")),
                ],
            ),
        ],
    ));

    let codes = assignment_diagnostics(&method, &names);
    assert_eq!(codes, vec![diagnostic_codes::READ_BEFORE_WRITE]);
}
