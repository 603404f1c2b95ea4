//! Incremental driver tests: full builds, fast/slow path selection and
//! equivalence, impact analysis, cancellation, and epoch publication.

use std::sync::Arc;
use tyc_ast::SourceFile;
use tyc_ast::build::TreeBuilder;
use tyc_common::diagnostic_codes;
use tyc_common::diagnostics::Diagnostic;
use tyc_common::CancellationToken;
use tyc_driver::{AnalysisResult, Analyzer, AnalyzerOptions, FileInput, PathTaken};

fn tree_input(file: SourceFile) -> FileInput {
    FileInput::Tree {
        path: file.path.clone(),
        tree: Arc::new(file),
    }
}

/// Widget with one method whose body returns `value`.
fn widget_file(names: &tyc_common::interner::NameTable, value: i64) -> SourceFile {
    let b = TreeBuilder::new(names);
    b.file(
        "widget.tyc",
        vec![b.class(
            "Widget",
            None,
            vec![b.method(
                "poke",
                vec![],
                Some(b.ty("Integer")),
                vec![b.ret(Some(b.int(value)))],
            )],
        )],
    )
}

/// A consumer file whose `run` calls Widget#poke and returns its result.
fn consumer_file(names: &tyc_common::interner::NameTable) -> SourceFile {
    let b = TreeBuilder::new(names);
    b.file(
        "consumer.tyc",
        vec![b.class(
            "Consumer",
            None,
            vec![b.method(
                "run",
                vec![b.param("w", Some(b.ty("Widget")))],
                Some(b.ty("Integer")),
                vec![b.ret(Some(b.call(Some(b.local("w")), "poke", vec![])))],
            )],
        )],
    )
}

fn codes(diagnostics: &[Diagnostic]) -> Vec<u32> {
    diagnostics.iter().map(|d| d.code).collect()
}

fn build(analyzer: &mut Analyzer, inputs: Vec<FileInput>) -> AnalysisResult {
    analyzer
        .apply_edits(inputs, &CancellationToken::new())
        .expect("not cancelled")
}

// =============================================================================
// Full build
// =============================================================================

#[test]
fn full_build_publishes_first_epoch() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();

    let result = build(
        &mut analyzer,
        vec![
            tree_input(widget_file(&names, 1)),
            tree_input(consumer_file(&names)),
        ],
    );

    assert_eq!(result.path, PathTaken::Full);
    assert_eq!(result.epoch.0, 1);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(analyzer.state().files.len(), 2);
}

#[test]
fn parse_failure_isolates_to_one_file() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();

    let result = build(
        &mut analyzer,
        vec![
            tree_input(widget_file(&names, 1)),
            FileInput::ParseFailed {
                path: "broken.tyc".to_string(),
            },
        ],
    );

    assert_eq!(codes(&result.diagnostics), vec![diagnostic_codes::PARSE_FAILURE]);
    assert_eq!(result.diagnostics[0].file, "broken.tyc");
}

// =============================================================================
// Fast path
// =============================================================================

#[test]
fn body_only_edit_takes_fast_path_and_rechecks_one_file() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();
    build(
        &mut analyzer,
        vec![
            tree_input(widget_file(&names, 1)),
            tree_input(consumer_file(&names)),
        ],
    );

    // Same declarations, different body literal.
    let result = build(&mut analyzer, vec![tree_input(widget_file(&names, 2))]);

    assert_eq!(result.path, PathTaken::Fast);
    assert_eq!(result.epoch.0, 2);
    let widget_id = analyzer.state().file_id("widget.tyc").unwrap();
    assert_eq!(result.analyzed, vec![widget_id]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn body_edit_introducing_error_is_caught_on_fast_path() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();
    build(&mut analyzer, vec![tree_input(widget_file(&names, 1))]);

    // poke still declares `: Integer` but now returns a string.
    let b = TreeBuilder::new(&names);
    let bad = b.file(
        "widget.tyc",
        vec![b.class(
            "Widget",
            None,
            vec![b.method(
                "poke",
                vec![],
                Some(b.ty("Integer")),
                vec![b.ret(Some(b.str_("nope")))],
            )],
        )],
    );
    let result = build(&mut analyzer, vec![tree_input(bad)]);

    assert_eq!(result.path, PathTaken::Fast);
    assert_eq!(codes(&result.diagnostics), vec![diagnostic_codes::RETURN_TYPE_MISMATCH]);
}

#[test]
fn identical_edit_is_no_change() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();
    build(&mut analyzer, vec![tree_input(widget_file(&names, 1))]);
    let epoch_before = analyzer.epoch();

    let result = build(&mut analyzer, vec![tree_input(widget_file(&names, 1))]);
    assert_eq!(result.path, PathTaken::NoChange);
    assert_eq!(analyzer.epoch(), epoch_before);
}

// =============================================================================
// Slow path
// =============================================================================

#[test]
fn signature_change_takes_slow_path_and_rechecks_dependents() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();
    build(
        &mut analyzer,
        vec![
            tree_input(widget_file(&names, 1)),
            tree_input(consumer_file(&names)),
        ],
    );

    // poke now returns String: Consumer#run's declared Integer no longer
    // matches what the call produces.
    let b = TreeBuilder::new(&names);
    let changed = b.file(
        "widget.tyc",
        vec![b.class(
            "Widget",
            None,
            vec![b.method(
                "poke",
                vec![],
                Some(b.ty("String")),
                vec![b.ret(Some(b.str_("s")))],
            )],
        )],
    );
    let result = build(&mut analyzer, vec![tree_input(changed)]);

    assert_eq!(result.path, PathTaken::Slow);
    let consumer_id = analyzer.state().file_id("consumer.tyc").unwrap();
    assert!(result.analyzed.contains(&consumer_id), "dependent re-analyzed");
    let consumer_diags: Vec<&Diagnostic> = result
        .diagnostics
        .iter()
        .filter(|d| d.file == "consumer.tyc")
        .collect();
    assert_eq!(consumer_diags.len(), 1);
    assert_eq!(consumer_diags[0].code, diagnostic_codes::RETURN_TYPE_MISMATCH);
}

#[test]
fn removing_a_file_surfaces_unresolved_references() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();

    let b = TreeBuilder::new(&names);
    let base = b.file("base.tyc", vec![b.class("Base", None, vec![])]);
    let b2 = TreeBuilder::new(&names);
    let derived = b2.file(
        "derived.tyc",
        vec![b2.class("Derived", Some("Base"), vec![])],
    );
    build(&mut analyzer, vec![tree_input(base), tree_input(derived)]);
    assert!(analyzer.state().all_diagnostics().is_empty());

    let result = build(
        &mut analyzer,
        vec![FileInput::Removed {
            path: "base.tyc".to_string(),
        }],
    );

    assert_eq!(result.path, PathTaken::Slow);
    let diags = analyzer.state().all_diagnostics();
    assert_eq!(codes(&diags), vec![diagnostic_codes::UNRESOLVED_CONSTANT]);
    assert_eq!(diags[0].file, "derived.tyc");
}

#[test]
fn new_file_resolves_previously_missing_constant() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();

    let b = TreeBuilder::new(&names);
    let derived = b.file(
        "derived.tyc",
        vec![b.class("Derived", Some("Base"), vec![])],
    );
    let first = build(&mut analyzer, vec![tree_input(derived)]);
    assert_eq!(codes(&first.diagnostics), vec![diagnostic_codes::UNRESOLVED_CONSTANT]);

    let b2 = TreeBuilder::new(&names);
    let base = b2.file("base.tyc", vec![b2.class("Base", None, vec![])]);
    build(&mut analyzer, vec![tree_input(base)]);

    assert!(analyzer.state().all_diagnostics().is_empty());
}

// =============================================================================
// Fast/slow equivalence
// =============================================================================

#[test]
fn fast_path_and_forced_slow_path_agree() {
    let run = |force_slow: bool| -> Vec<Diagnostic> {
        let mut analyzer = Analyzer::new(AnalyzerOptions {
            force_slow_path: force_slow,
            ..Default::default()
        });
        let names = analyzer.state().names.clone();
        build(
            &mut analyzer,
            vec![
                tree_input(widget_file(&names, 1)),
                tree_input(consumer_file(&names)),
            ],
        );

        // Fast-eligible edit: body statement only, now returning a string
        // against the declared Integer.
        let b = TreeBuilder::new(&names);
        let edited = b.file(
            "widget.tyc",
            vec![b.class(
                "Widget",
                None,
                vec![b.method(
                    "poke",
                    vec![],
                    Some(b.ty("Integer")),
                    vec![b.ret(Some(b.str_("oops")))],
                )],
            )],
        );
        let result = build(&mut analyzer, vec![tree_input(edited)]);
        assert_eq!(
            result.path,
            if force_slow { PathTaken::Slow } else { PathTaken::Fast }
        );
        analyzer.state().all_diagnostics()
    };

    let fast = run(false);
    let slow = run(true);
    assert_eq!(fast, slow, "fast and slow paths must agree on diagnostics");
}

// =============================================================================
// Cancellation and publication
// =============================================================================

#[test]
fn cancelled_batch_leaves_previous_epoch_visible() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();
    build(&mut analyzer, vec![tree_input(widget_file(&names, 1))]);
    let epoch_before = analyzer.epoch();
    let state_before = analyzer.state();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = analyzer.apply_edits(vec![tree_input(widget_file(&names, 99))], &cancel);

    assert!(result.is_err(), "superseded work reports cancellation");
    assert_eq!(analyzer.epoch(), epoch_before);
    // The published state is untouched, not partially updated.
    let widget_id = state_before.file_id("widget.tyc").unwrap();
    assert_eq!(
        analyzer.state().files[&widget_id].fingerprint,
        state_before.files[&widget_id].fingerprint
    );
}

#[test]
fn epochs_increase_monotonically_per_published_batch() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();

    build(&mut analyzer, vec![tree_input(widget_file(&names, 1))]);
    assert_eq!(analyzer.epoch().0, 1);
    build(&mut analyzer, vec![tree_input(widget_file(&names, 2))]);
    assert_eq!(analyzer.epoch().0, 2);
    build(&mut analyzer, vec![tree_input(widget_file(&names, 3))]);
    assert_eq!(analyzer.epoch().0, 3);
}

#[test]
fn stale_symbol_handles_survive_other_files_edits() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();
    build(
        &mut analyzer,
        vec![
            tree_input(widget_file(&names, 1)),
            tree_input(consumer_file(&names)),
        ],
    );

    let consumer_id = analyzer.state().file_id("consumer.tyc").unwrap();
    let consumer_defines = analyzer.state().files[&consumer_id].defines.clone();

    // Structural edit to widget.tyc: add a method.
    let b = TreeBuilder::new(&names);
    let widget2 = b.file(
        "widget.tyc",
        vec![b.class(
            "Widget",
            None,
            vec![
                b.method("poke", vec![], Some(b.ty("Integer")), vec![
                    b.ret(Some(b.int(1))),
                ]),
                b.method("extra", vec![], None, vec![]),
            ],
        )],
    );
    build(&mut analyzer, vec![tree_input(widget2)]);

    // Consumer's symbols kept their handles; the slots were not recycled.
    let state = analyzer.state();
    for id in &consumer_defines {
        let sym = state.table.get(*id).expect("handle still valid");
        assert!(!sym.is_tombstone());
    }
    assert_eq!(state.files[&consumer_id].defines, consumer_defines);
}

#[test]
fn analyzed_set_is_scoped_to_the_batch() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default());
    let names = analyzer.state().names.clone();

    // Third file, unrelated to Widget.
    let b = TreeBuilder::new(&names);
    let loner = b.file("loner.tyc", vec![b.class("Loner", None, vec![])]);
    build(
        &mut analyzer,
        vec![
            tree_input(widget_file(&names, 1)),
            tree_input(consumer_file(&names)),
            tree_input(loner),
        ],
    );

    // Structural edit to widget: slow path, but the unrelated file is
    // not re-analyzed.
    let b2 = TreeBuilder::new(&names);
    let widget2 = b2.file(
        "widget.tyc",
        vec![b2.class(
            "Widget",
            None,
            vec![
                b2.method("poke", vec![], Some(b2.ty("Integer")), vec![
                    b2.ret(Some(b2.int(1))),
                ]),
                b2.method("other", vec![], None, vec![]),
            ],
        )],
    );
    let result = build(&mut analyzer, vec![tree_input(widget2)]);

    assert_eq!(result.path, PathTaken::Slow);
    let loner_id = analyzer.state().file_id("loner.tyc").unwrap();
    assert!(!result.analyzed.contains(&loner_id));
}
