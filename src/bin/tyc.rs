//! Batch-mode entry point.
//!
//! Reads serialized desugared trees (one JSON file per source file, as
//! produced by the external parser/rewriter), runs the full pipeline
//! once, and prints the ordered diagnostic list. Exit status is non-zero
//! iff any error-severity diagnostic was emitted.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tyc_ast::raw::{self, RawFile};
use tyc_common::diagnostics::{Diagnostic, DiagnosticCategory};
use tyc_common::{CancellationToken, LineIndex};
use tyc_driver::{Analyzer, AnalyzerOptions, FileInput};

#[derive(Parser, Debug)]
#[command(name = "tyc", version, about = "Type checker for desugared scripting-language trees")]
struct Args {
    /// Serialized tree files (JSON) to analyze.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Emit diagnostics as JSON instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Maximum abstract-interpretation iterations per loop.
    #[arg(long)]
    loop_limit: Option<u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut options = AnalyzerOptions::default();
    if let Some(limit) = args.loop_limit {
        options.limits.loop_fixpoint_iterations = limit;
    }
    let mut analyzer = Analyzer::new(options);
    let names = analyzer.state().names.clone();

    // Load inputs; a file that fails to deserialize is reported as a
    // parse failure for that file only.
    let mut inputs = Vec::with_capacity(args.inputs.len());
    let mut line_indexes: FxHashMap<String, LineIndex> = FxHashMap::default();
    for path in &args.inputs {
        let display_path = path.display().to_string();
        let input = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<RawFile>(&content) {
                Ok(raw_file) => {
                    if let Some(text) = &raw_file.text {
                        line_indexes.insert(raw_file.path.clone(), LineIndex::new(text));
                    }
                    let file = raw::intern_file(raw_file, &names);
                    FileInput::Tree {
                        path: file.path.clone(),
                        tree: Arc::new(file),
                    }
                }
                Err(_) => FileInput::ParseFailed { path: display_path },
            },
            Err(err) => {
                return Err(err).context(format!("reading {}", path.display()));
            }
        };
        inputs.push(input);
    }

    let result = analyzer
        .apply_edits(inputs, &CancellationToken::new())
        .context("analysis cancelled")?;

    let diagnostics = analyzer.state().all_diagnostics();
    if args.json {
        print_json(&diagnostics, &line_indexes)?;
    } else {
        print_human(&diagnostics, &line_indexes);
        if !diagnostics.is_empty() {
            eprintln!(
                "{} diagnostic(s) across {} file(s)",
                diagnostics.len(),
                result.analyzed.len()
            );
        }
    }

    let has_errors = diagnostics
        .iter()
        .any(|d| d.category == DiagnosticCategory::Error);
    if has_errors {
        std::process::exit(1);
    }
    Ok(())
}

fn position(diag: &Diagnostic, line_indexes: &FxHashMap<String, LineIndex>) -> (u32, u32) {
    match line_indexes.get(&diag.file) {
        Some(index) => {
            let pos = index.line_col(diag.span.start);
            (pos.line, pos.col)
        }
        // No source text shipped: fall back to a flat offset as column.
        None => (1, diag.span.start + 1),
    }
}

fn print_human(diagnostics: &[Diagnostic], line_indexes: &FxHashMap<String, LineIndex>) {
    for diag in diagnostics {
        let (line, col) = position(diag, line_indexes);
        let severity = match diag.category {
            DiagnosticCategory::Error => "error".red().bold(),
            DiagnosticCategory::Warning => "warning".yellow().bold(),
        };
        println!(
            "{}:{}:{}: {}[{}]: {}",
            diag.file, line, col, severity, diag.code, diag.message_text
        );
        for related in &diag.related_information {
            println!("    note: {}: {}", related.file, related.message_text);
        }
    }
}

fn print_json(
    diagnostics: &[Diagnostic],
    line_indexes: &FxHashMap<String, LineIndex>,
) -> Result<()> {
    let rows: Vec<serde_json::Value> = diagnostics
        .iter()
        .map(|diag| {
            let (line, col) = position(diag, line_indexes);
            serde_json::json!({
                "file": diag.file,
                "line": line,
                "col": col,
                "length": diag.span.len,
                "severity": match diag.category {
                    DiagnosticCategory::Error => "error",
                    DiagnosticCategory::Warning => "warning",
                },
                "code": diag.code,
                "message": diag.message_text,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
