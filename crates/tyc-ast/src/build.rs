//! Programmatic tree construction.
//!
//! In-process producers (and the test suites of every downstream crate)
//! build desugared trees through this builder instead of hand-writing
//! struct literals. Spans are synthesized from a running counter so that
//! identical build sequences produce identical trees, which keeps
//! fingerprints and digests deterministic in tests.

use std::cell::Cell;
use tyc_common::interner::NameTable;
use tyc_common::{Atom, Span};

use crate::{
    ClassDecl, ConstDecl, ConstPath, Decl, Expr, FieldDecl, MethodDecl, MixinDecl, ModuleDecl,
    Param, SourceFile, Stmt, TypeExpr,
};

pub struct TreeBuilder<'a> {
    names: &'a NameTable,
    next_offset: Cell<u32>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(names: &'a NameTable) -> Self {
        TreeBuilder {
            names,
            next_offset: Cell::new(0),
        }
    }

    pub fn atom(&self, s: &str) -> Atom {
        self.names.intern(s)
    }

    fn span(&self) -> Span {
        let start = self.next_offset.get();
        self.next_offset.set(start + 10);
        Span::new(start, 8)
    }

    // =========================================================================
    // Files and declarations
    // =========================================================================

    pub fn file(&self, path: &str, decls: Vec<Decl>) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            decls,
        }
    }

    pub fn class(&self, name: &str, superclass: Option<&str>, body: Vec<Decl>) -> Decl {
        Decl::Class(ClassDecl {
            name: self.atom(name),
            type_params: Vec::new(),
            superclass: superclass.map(|s| self.const_path(s)),
            body,
            span: self.span(),
        })
    }

    pub fn generic_class(
        &self,
        name: &str,
        type_params: &[&str],
        superclass: Option<&str>,
        body: Vec<Decl>,
    ) -> Decl {
        Decl::Class(ClassDecl {
            name: self.atom(name),
            type_params: type_params.iter().map(|p| self.atom(p)).collect(),
            superclass: superclass.map(|s| self.const_path(s)),
            body,
            span: self.span(),
        })
    }

    pub fn module(&self, name: &str, body: Vec<Decl>) -> Decl {
        Decl::Module(ModuleDecl {
            name: self.atom(name),
            body,
            span: self.span(),
        })
    }

    pub fn method(
        &self,
        name: &str,
        params: Vec<Param>,
        ret: Option<TypeExpr>,
        body: Vec<Stmt>,
    ) -> Decl {
        Decl::Method(MethodDecl {
            name: self.atom(name),
            params,
            ret,
            body,
            span: self.span(),
        })
    }

    pub fn param(&self, name: &str, ann: Option<TypeExpr>) -> Param {
        Param {
            name: self.atom(name),
            ann,
            span: self.span(),
        }
    }

    pub fn field_decl(&self, name: &str, ann: TypeExpr) -> Decl {
        Decl::Field(FieldDecl {
            name: self.atom(name),
            ann,
            span: self.span(),
        })
    }

    pub fn const_decl(&self, name: &str, ann: Option<TypeExpr>, value: Expr) -> Decl {
        Decl::Const(ConstDecl {
            name: self.atom(name),
            ann,
            value,
            span: self.span(),
        })
    }

    pub fn include(&self, path: &str) -> Decl {
        Decl::Include(MixinDecl {
            path: self.const_path(path),
            span: self.span(),
        })
    }

    pub fn extend(&self, path: &str) -> Decl {
        Decl::Extend(MixinDecl {
            path: self.const_path(path),
            span: self.span(),
        })
    }

    /// Build a `ConstPath` from a `::`-separated string.
    pub fn const_path(&self, dotted: &str) -> ConstPath {
        ConstPath {
            segments: dotted.split("::").map(|s| self.atom(s)).collect(),
            span: self.span(),
        }
    }

    // =========================================================================
    // Type annotations
    // =========================================================================

    pub fn ty(&self, name: &str) -> TypeExpr {
        TypeExpr::Named {
            path: self.const_path(name),
            args: Vec::new(),
            span: self.span(),
        }
    }

    pub fn ty_applied(&self, name: &str, args: Vec<TypeExpr>) -> TypeExpr {
        TypeExpr::Named {
            path: self.const_path(name),
            args,
            span: self.span(),
        }
    }

    pub fn ty_nilable(&self, inner: TypeExpr) -> TypeExpr {
        TypeExpr::Nilable {
            inner: Box::new(inner),
            span: self.span(),
        }
    }

    pub fn ty_union(&self, members: Vec<TypeExpr>) -> TypeExpr {
        TypeExpr::Union {
            members,
            span: self.span(),
        }
    }

    pub fn ty_untyped(&self) -> TypeExpr {
        TypeExpr::Untyped { span: self.span() }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn assign(&self, name: &str, value: Expr) -> Stmt {
        Stmt::Assign {
            name: self.atom(name),
            value,
            span: self.span(),
        }
    }

    pub fn field_assign(&self, name: &str, value: Expr) -> Stmt {
        Stmt::FieldAssign {
            name: self.atom(name),
            value,
            span: self.span(),
        }
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        Stmt::Expr(expr)
    }

    pub fn if_(&self, cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Stmt {
        Stmt::If {
            cond,
            then_body,
            else_body,
            span: self.span(),
        }
    }

    pub fn while_(&self, cond: Expr, body: Vec<Stmt>) -> Stmt {
        Stmt::While {
            cond,
            body,
            span: self.span(),
        }
    }

    pub fn break_(&self) -> Stmt {
        Stmt::Break { span: self.span() }
    }

    pub fn ret(&self, value: Option<Expr>) -> Stmt {
        Stmt::Return {
            value,
            span: self.span(),
        }
    }

    pub fn begin_rescue(&self, body: Vec<Stmt>, rescue_body: Vec<Stmt>) -> Stmt {
        Stmt::Begin {
            body,
            rescue_body,
            span: self.span(),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn int(&self, value: i64) -> Expr {
        Expr::IntLit {
            value,
            span: self.span(),
        }
    }

    pub fn str_(&self, value: &str) -> Expr {
        Expr::StrLit {
            value: value.to_string(),
            span: self.span(),
        }
    }

    pub fn sym(&self, name: &str) -> Expr {
        Expr::SymLit {
            name: self.atom(name),
            span: self.span(),
        }
    }

    pub fn nil(&self) -> Expr {
        Expr::Nil { span: self.span() }
    }

    pub fn true_(&self) -> Expr {
        Expr::True { span: self.span() }
    }

    pub fn false_(&self) -> Expr {
        Expr::False { span: self.span() }
    }

    pub fn self_(&self) -> Expr {
        Expr::SelfRef { span: self.span() }
    }

    pub fn local(&self, name: &str) -> Expr {
        Expr::Local {
            name: self.atom(name),
            span: self.span(),
        }
    }

    pub fn field_read(&self, name: &str) -> Expr {
        Expr::FieldRead {
            name: self.atom(name),
            span: self.span(),
        }
    }

    pub fn const_read(&self, path: &str) -> Expr {
        Expr::ConstRead {
            path: self.const_path(path),
        }
    }

    pub fn call(&self, recv: Option<Expr>, name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            recv: recv.map(Box::new),
            name: self.atom(name),
            args,
            span: self.span(),
        }
    }
}
