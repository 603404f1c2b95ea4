//! Serde-facing mirror of the desugared tree.
//!
//! External producers (the parser/rewriter pipeline lives in another
//! process) serialize trees with plain string names; [`intern_file`]
//! converts one into the atom-based [`SourceFile`](crate::SourceFile)
//! against the analyzer's name table.

use serde::{Deserialize, Serialize};
use tyc_common::interner::NameTable;
use tyc_common::{Atom, Span};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawFile {
    pub path: String,
    /// Original source text, when the producer includes it. Only used to
    /// map diagnostic byte offsets to line/column at the output boundary.
    #[serde(default)]
    pub text: Option<String>,
    pub decls: Vec<RawDecl>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawConstPath {
    pub segments: Vec<String>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawDecl {
    Class {
        name: String,
        #[serde(default)]
        type_params: Vec<String>,
        superclass: Option<RawConstPath>,
        #[serde(default)]
        body: Vec<RawDecl>,
        #[serde(default)]
        span: Span,
    },
    Module {
        name: String,
        #[serde(default)]
        body: Vec<RawDecl>,
        #[serde(default)]
        span: Span,
    },
    Method {
        name: String,
        #[serde(default)]
        params: Vec<RawParam>,
        ret: Option<RawTypeExpr>,
        #[serde(default)]
        body: Vec<RawStmt>,
        #[serde(default)]
        span: Span,
    },
    Field {
        name: String,
        ann: RawTypeExpr,
        #[serde(default)]
        span: Span,
    },
    Const {
        name: String,
        ann: Option<RawTypeExpr>,
        value: RawExpr,
        #[serde(default)]
        span: Span,
    },
    Include {
        path: RawConstPath,
        #[serde(default)]
        span: Span,
    },
    Extend {
        path: RawConstPath,
        #[serde(default)]
        span: Span,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawParam {
    pub name: String,
    pub ann: Option<RawTypeExpr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawTypeExpr {
    Named {
        path: RawConstPath,
        #[serde(default)]
        args: Vec<RawTypeExpr>,
        #[serde(default)]
        span: Span,
    },
    Nilable {
        inner: Box<RawTypeExpr>,
        #[serde(default)]
        span: Span,
    },
    Union {
        members: Vec<RawTypeExpr>,
        #[serde(default)]
        span: Span,
    },
    Intersection {
        members: Vec<RawTypeExpr>,
        #[serde(default)]
        span: Span,
    },
    Untyped {
        #[serde(default)]
        span: Span,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawStmt {
    Expr {
        expr: RawExpr,
    },
    Assign {
        name: String,
        value: RawExpr,
        #[serde(default)]
        span: Span,
    },
    FieldAssign {
        name: String,
        value: RawExpr,
        #[serde(default)]
        span: Span,
    },
    If {
        cond: RawExpr,
        #[serde(default)]
        then_body: Vec<RawStmt>,
        #[serde(default)]
        else_body: Vec<RawStmt>,
        #[serde(default)]
        span: Span,
    },
    While {
        cond: RawExpr,
        #[serde(default)]
        body: Vec<RawStmt>,
        #[serde(default)]
        span: Span,
    },
    Break {
        #[serde(default)]
        span: Span,
    },
    Next {
        #[serde(default)]
        span: Span,
    },
    Return {
        value: Option<RawExpr>,
        #[serde(default)]
        span: Span,
    },
    Begin {
        #[serde(default)]
        body: Vec<RawStmt>,
        #[serde(default)]
        rescue_body: Vec<RawStmt>,
        #[serde(default)]
        span: Span,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawExpr {
    Int {
        value: i64,
        #[serde(default)]
        span: Span,
    },
    Float {
        value: f64,
        #[serde(default)]
        span: Span,
    },
    Str {
        value: String,
        #[serde(default)]
        span: Span,
    },
    Sym {
        name: String,
        #[serde(default)]
        span: Span,
    },
    True {
        #[serde(default)]
        span: Span,
    },
    False {
        #[serde(default)]
        span: Span,
    },
    Nil {
        #[serde(default)]
        span: Span,
    },
    SelfRef {
        #[serde(default)]
        span: Span,
    },
    Local {
        name: String,
        #[serde(default)]
        span: Span,
    },
    FieldRead {
        name: String,
        #[serde(default)]
        span: Span,
    },
    ConstRead {
        path: RawConstPath,
    },
    Call {
        recv: Option<Box<RawExpr>>,
        name: String,
        #[serde(default)]
        args: Vec<RawExpr>,
        #[serde(default)]
        span: Span,
    },
}

// =============================================================================
// Interning conversion
// =============================================================================

pub fn intern_file(raw: RawFile, names: &NameTable) -> crate::SourceFile {
    crate::SourceFile {
        path: raw.path,
        decls: raw.decls.into_iter().map(|d| intern_decl(d, names)).collect(),
    }
}

fn atom(names: &NameTable, s: &str) -> Atom {
    names.intern(s)
}

fn intern_path(raw: RawConstPath, names: &NameTable) -> crate::ConstPath {
    crate::ConstPath {
        segments: raw.segments.iter().map(|s| atom(names, s)).collect(),
        span: raw.span,
    }
}

fn intern_decl(raw: RawDecl, names: &NameTable) -> crate::Decl {
    match raw {
        RawDecl::Class {
            name,
            type_params,
            superclass,
            body,
            span,
        } => crate::Decl::Class(crate::ClassDecl {
            name: atom(names, &name),
            type_params: type_params.iter().map(|p| atom(names, p)).collect(),
            superclass: superclass.map(|p| intern_path(p, names)),
            body: body.into_iter().map(|d| intern_decl(d, names)).collect(),
            span,
        }),
        RawDecl::Module { name, body, span } => crate::Decl::Module(crate::ModuleDecl {
            name: atom(names, &name),
            body: body.into_iter().map(|d| intern_decl(d, names)).collect(),
            span,
        }),
        RawDecl::Method {
            name,
            params,
            ret,
            body,
            span,
        } => crate::Decl::Method(crate::MethodDecl {
            name: atom(names, &name),
            params: params
                .into_iter()
                .map(|p| crate::Param {
                    name: atom(names, &p.name),
                    ann: p.ann.map(|a| intern_type_expr(a, names)),
                    span: p.span,
                })
                .collect(),
            ret: ret.map(|a| intern_type_expr(a, names)),
            body: body.into_iter().map(|s| intern_stmt(s, names)).collect(),
            span,
        }),
        RawDecl::Field { name, ann, span } => crate::Decl::Field(crate::FieldDecl {
            name: atom(names, &name),
            ann: intern_type_expr(ann, names),
            span,
        }),
        RawDecl::Const {
            name,
            ann,
            value,
            span,
        } => crate::Decl::Const(crate::ConstDecl {
            name: atom(names, &name),
            ann: ann.map(|a| intern_type_expr(a, names)),
            value: intern_expr(value, names),
            span,
        }),
        RawDecl::Include { path, span } => crate::Decl::Include(crate::MixinDecl {
            path: intern_path(path, names),
            span,
        }),
        RawDecl::Extend { path, span } => crate::Decl::Extend(crate::MixinDecl {
            path: intern_path(path, names),
            span,
        }),
    }
}

fn intern_type_expr(raw: RawTypeExpr, names: &NameTable) -> crate::TypeExpr {
    match raw {
        RawTypeExpr::Named { path, args, span } => crate::TypeExpr::Named {
            path: intern_path(path, names),
            args: args
                .into_iter()
                .map(|a| intern_type_expr(a, names))
                .collect(),
            span,
        },
        RawTypeExpr::Nilable { inner, span } => crate::TypeExpr::Nilable {
            inner: Box::new(intern_type_expr(*inner, names)),
            span,
        },
        RawTypeExpr::Union { members, span } => crate::TypeExpr::Union {
            members: members
                .into_iter()
                .map(|m| intern_type_expr(m, names))
                .collect(),
            span,
        },
        RawTypeExpr::Intersection { members, span } => crate::TypeExpr::Intersection {
            members: members
                .into_iter()
                .map(|m| intern_type_expr(m, names))
                .collect(),
            span,
        },
        RawTypeExpr::Untyped { span } => crate::TypeExpr::Untyped { span },
    }
}

fn intern_stmt(raw: RawStmt, names: &NameTable) -> crate::Stmt {
    match raw {
        RawStmt::Expr { expr } => crate::Stmt::Expr(intern_expr(expr, names)),
        RawStmt::Assign { name, value, span } => crate::Stmt::Assign {
            name: atom(names, &name),
            value: intern_expr(value, names),
            span,
        },
        RawStmt::FieldAssign { name, value, span } => crate::Stmt::FieldAssign {
            name: atom(names, &name),
            value: intern_expr(value, names),
            span,
        },
        RawStmt::If {
            cond,
            then_body,
            else_body,
            span,
        } => crate::Stmt::If {
            cond: intern_expr(cond, names),
            then_body: then_body.into_iter().map(|s| intern_stmt(s, names)).collect(),
            else_body: else_body.into_iter().map(|s| intern_stmt(s, names)).collect(),
            span,
        },
        RawStmt::While { cond, body, span } => crate::Stmt::While {
            cond: intern_expr(cond, names),
            body: body.into_iter().map(|s| intern_stmt(s, names)).collect(),
            span,
        },
        RawStmt::Break { span } => crate::Stmt::Break { span },
        RawStmt::Next { span } => crate::Stmt::Next { span },
        RawStmt::Return { value, span } => crate::Stmt::Return {
            value: value.map(|v| intern_expr(v, names)),
            span,
        },
        RawStmt::Begin {
            body,
            rescue_body,
            span,
        } => crate::Stmt::Begin {
            body: body.into_iter().map(|s| intern_stmt(s, names)).collect(),
            rescue_body: rescue_body
                .into_iter()
                .map(|s| intern_stmt(s, names))
                .collect(),
            span,
        },
    }
}

fn intern_expr(raw: RawExpr, names: &NameTable) -> crate::Expr {
    match raw {
        RawExpr::Int { value, span } => crate::Expr::IntLit { value, span },
        RawExpr::Float { value, span } => crate::Expr::float(value, span),
        RawExpr::Str { value, span } => crate::Expr::StrLit { value, span },
        RawExpr::Sym { name, span } => crate::Expr::SymLit {
            name: atom(names, &name),
            span,
        },
        RawExpr::True { span } => crate::Expr::True { span },
        RawExpr::False { span } => crate::Expr::False { span },
        RawExpr::Nil { span } => crate::Expr::Nil { span },
        RawExpr::SelfRef { span } => crate::Expr::SelfRef { span },
        RawExpr::Local { name, span } => crate::Expr::Local {
            name: atom(names, &name),
            span,
        },
        RawExpr::FieldRead { name, span } => crate::Expr::FieldRead {
            name: atom(names, &name),
            span,
        },
        RawExpr::ConstRead { path } => crate::Expr::ConstRead {
            path: intern_path(path, names),
        },
        RawExpr::Call {
            recv,
            name,
            args,
            span,
        } => crate::Expr::Call {
            recv: recv.map(|r| Box::new(intern_expr(*r, names))),
            name: atom(names, &name),
            args: args.into_iter().map(|a| intern_expr(a, names)).collect(),
            span,
        },
    }
}
