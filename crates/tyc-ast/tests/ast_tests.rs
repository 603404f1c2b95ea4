//! Tests for tree fingerprints and the raw serde mirror.

use tyc_ast::raw::{self, RawFile};
use tyc_ast::{ClassDecl, Decl, Expr, MethodDecl, SourceFile, Stmt};
use tyc_common::interner::NameTable;
use tyc_common::Span;

fn sample_file(names: &NameTable) -> SourceFile {
    SourceFile {
        path: "widget.tyc".to_string(),
        decls: vec![Decl::Class(ClassDecl {
            name: names.intern("Widget"),
            type_params: vec![],
            superclass: None,
            body: vec![Decl::Method(MethodDecl {
                name: names.intern("poke"),
                params: vec![],
                ret: None,
                body: vec![Stmt::Return {
                    value: Some(Expr::IntLit {
                        value: 1,
                        span: Span::new(30, 1),
                    }),
                    span: Span::new(23, 8),
                }],
                span: Span::new(14, 20),
            })],
            span: Span::new(0, 40),
        })],
    }
}

#[test]
fn fingerprint_is_stable() {
    let names = NameTable::new();
    let a = sample_file(&names);
    let b = sample_file(&names);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn fingerprint_changes_with_body() {
    let names = NameTable::new();
    let a = sample_file(&names);
    let mut b = sample_file(&names);
    if let Decl::Class(class) = &mut b.decls[0] {
        if let Decl::Method(method) = &mut class.body[0] {
            method.body.clear();
        }
    }
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn raw_json_interns_to_tree() {
    let json = r#"{
        "path": "point.tyc",
        "decls": [
            {
                "kind": "class",
                "name": "Point",
                "superclass": null,
                "body": [
                    {
                        "kind": "method",
                        "name": "norm",
                        "params": [
                            {"name": "scale", "ann": {"kind": "named", "path": {"segments": ["Integer"]}}}
                        ],
                        "ret": {"kind": "named", "path": {"segments": ["Integer"]}},
                        "body": [
                            {"kind": "return", "value": {"kind": "local", "name": "scale"}}
                        ]
                    }
                ]
            }
        ]
    }"#;

    let raw_file: RawFile = serde_json::from_str(json).expect("raw tree parses");
    let names = NameTable::new();
    let file = raw::intern_file(raw_file, &names);

    assert_eq!(file.path, "point.tyc");
    let Decl::Class(class) = &file.decls[0] else {
        panic!("expected class");
    };
    assert_eq!(names.resolve(class.name).as_ref(), "Point");
    let Decl::Method(method) = &class.body[0] else {
        panic!("expected method");
    };
    assert_eq!(names.resolve(method.name).as_ref(), "norm");
    assert_eq!(method.params.len(), 1);
    assert!(method.ret.is_some());
}
