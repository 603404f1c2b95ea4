//! Desugared syntax trees.
//!
//! The concrete parser and the metaprogramming rewriter are external
//! collaborators: by the time a tree reaches this crate it is fully
//! desugared (all loops are `while`, all rescue clauses are `begin`
//! blocks, every name is an interned [`Atom`]). The analyzer treats the
//! tree as immutable input; on edit a file's tree is replaced wholesale.
//!
//! The [`raw`] module is the serde-facing mirror of these types with
//! plain strings instead of atoms, for producers living in another
//! process.

use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use tyc_common::{Atom, Span};

pub mod build;
pub mod raw;

// =============================================================================
// Files
// =============================================================================

/// One file's desugared tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceFile {
    pub path: String,
    pub decls: Vec<Decl>,
}

impl SourceFile {
    /// Content fingerprint over the whole tree. Two structurally identical
    /// trees fingerprint identically; the driver uses this to skip files
    /// whose content did not actually change.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Index path from a file's root to one nested declaration.
///
/// Trees are immutable once loaded, so a path of child indices is a
/// stable, cheap reference into them (the same role NodeIndex plays in
/// arena-based front ends). Element `i` selects a declaration inside the
/// body at depth `i`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DeclPath(pub Vec<u32>);

impl SourceFile {
    /// Resolve a [`DeclPath`] back to its declaration.
    pub fn decl_at(&self, path: &DeclPath) -> Option<&Decl> {
        let mut decls = &self.decls;
        let mut found: Option<&Decl> = None;
        for &idx in &path.0 {
            let decl = decls.get(idx as usize)?;
            found = Some(decl);
            decls = match decl {
                Decl::Class(c) => &c.body,
                Decl::Module(m) => &m.body,
                // Leaf declaration: valid only as the last path element.
                _ => &EMPTY_DECLS,
            };
        }
        found
    }

    /// Resolve a [`DeclPath`] expected to point at a method.
    pub fn method_at(&self, path: &DeclPath) -> Option<&MethodDecl> {
        match self.decl_at(path)? {
            Decl::Method(m) => Some(m),
            _ => None,
        }
    }
}

static EMPTY_DECLS: Vec<Decl> = Vec::new();

/// A `::`-separated constant reference, e.g. `Net::HTTP`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConstPath {
    pub segments: Vec<Atom>,
    pub span: Span,
}

impl ConstPath {
    pub fn single(name: Atom, span: Span) -> Self {
        ConstPath {
            segments: vec![name],
            span,
        }
    }
}

// =============================================================================
// Declarations
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Decl {
    Class(ClassDecl),
    Module(ModuleDecl),
    Method(MethodDecl),
    Field(FieldDecl),
    Const(ConstDecl),
    Include(MixinDecl),
    Extend(MixinDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Class(d) => d.span,
            Decl::Module(d) => d.span,
            Decl::Method(d) => d.span,
            Decl::Field(d) => d.span,
            Decl::Const(d) => d.span,
            Decl::Include(d) | Decl::Extend(d) => d.span,
        }
    }
}

/// `class C < Super ... end`. Classes may be reopened in any file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassDecl {
    pub name: Atom,
    /// Declared type parameters for generic classes (`class Box[T]`).
    pub type_params: Vec<Atom>,
    pub superclass: Option<ConstPath>,
    pub body: Vec<Decl>,
    pub span: Span,
}

/// `module M ... end`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleDecl {
    pub name: Atom,
    pub body: Vec<Decl>,
    pub span: Span,
}

/// `def m(x: Integer): String ... end`. Annotations are optional;
/// an unannotated parameter or return defaults to untyped.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDecl {
    pub name: Atom,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: Atom,
    pub ann: Option<TypeExpr>,
    pub span: Span,
}

/// Field (instance variable) declaration with its annotation, `@name: T`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDecl {
    pub name: Atom,
    pub ann: TypeExpr,
    pub span: Span,
}

/// Constant assignment, `NAME = expr`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConstDecl {
    pub name: Atom,
    pub ann: Option<TypeExpr>,
    pub value: Expr,
    pub span: Span,
}

/// `include M` / `extend M`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MixinDecl {
    pub path: ConstPath,
    pub span: Span,
}

// =============================================================================
// Type annotations
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// A named constant application: `Integer`, `Array[Integer]`.
    /// A single-segment path may also name a type parameter in scope.
    Named {
        path: ConstPath,
        args: Vec<TypeExpr>,
        span: Span,
    },
    /// `T?`
    Nilable { inner: Box<TypeExpr>, span: Span },
    /// `A | B`
    Union { members: Vec<TypeExpr>, span: Span },
    /// `A & B`
    Intersection { members: Vec<TypeExpr>, span: Span },
    /// `untyped`
    Untyped { span: Span },
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named { span, .. }
            | TypeExpr::Nilable { span, .. }
            | TypeExpr::Union { span, .. }
            | TypeExpr::Intersection { span, .. }
            | TypeExpr::Untyped { span } => *span,
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stmt {
    Expr(Expr),
    /// `x = expr`
    Assign { name: Atom, value: Expr, span: Span },
    /// `@x = expr`
    FieldAssign { name: Atom, value: Expr, span: Span },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    Break { span: Span },
    Next { span: Span },
    Return { value: Option<Expr>, span: Span },
    /// `begin ... rescue ... end`: the body runs under an exception region
    /// whose handler is `rescue_body`.
    Begin {
        body: Vec<Stmt>,
        rescue_body: Vec<Stmt>,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(e) => e.span(),
            Stmt::Assign { span, .. }
            | Stmt::FieldAssign { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Break { span }
            | Stmt::Next { span }
            | Stmt::Return { span, .. }
            | Stmt::Begin { span, .. } => *span,
        }
    }
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    IntLit { value: i64, span: Span },
    /// Float payload stored as bits so the tree stays `Eq + Hash`.
    FloatLit { bits: u64, span: Span },
    StrLit { value: String, span: Span },
    SymLit { name: Atom, span: Span },
    True { span: Span },
    False { span: Span },
    Nil { span: Span },
    SelfRef { span: Span },
    /// Local variable read.
    Local { name: Atom, span: Span },
    /// Instance variable read, `@x`.
    FieldRead { name: Atom, span: Span },
    ConstRead { path: ConstPath },
    Call {
        recv: Option<Box<Expr>>,
        name: Atom,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit { span, .. }
            | Expr::FloatLit { span, .. }
            | Expr::StrLit { span, .. }
            | Expr::SymLit { span, .. }
            | Expr::True { span }
            | Expr::False { span }
            | Expr::Nil { span }
            | Expr::SelfRef { span }
            | Expr::Local { span, .. }
            | Expr::FieldRead { span, .. }
            | Expr::Call { span, .. } => *span,
            Expr::ConstRead { path } => path.span,
        }
    }

    pub fn float(value: f64, span: Span) -> Expr {
        Expr::FloatLit {
            bits: value.to_bits(),
            span,
        }
    }
}
