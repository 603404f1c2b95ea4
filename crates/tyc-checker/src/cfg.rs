//! Control-flow graph construction.
//!
//! Each method body lowers to a graph of basic blocks. Nested expressions
//! flatten into bindings over synthetic temporaries, so every operand of
//! an operation is a previously bound local. Structured constructs lower
//! to explicit edges:
//!
//! - `if` branches to two blocks that meet at a join block;
//! - `while` places its condition in a join block that the body's back
//!   edge returns to;
//! - `begin/rescue` emits a region-entry block whose terminator carries
//!   both the normal edge and the exceptional edge into the handler (or
//!   the method's unhandled-exception exit when the rescue body is
//!   absent).
//!
//! Every block ends in exactly one terminator. Code after an unconditional
//! terminator lands in a fresh block that reachability tagging marks dead;
//! later stages skip dead blocks without re-deriving reachability.

use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tyc_ast::{ConstPath, Expr, MethodDecl, Stmt};
use tyc_common::diagnostics::{Diagnostic, diagnostic_codes, message_for};
use tyc_common::interner::NameTable;
use tyc_common::{Atom, Span};

// =============================================================================
// Graph data
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into a method's local table (named variables and temporaries).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalId(pub u32);

impl LocalId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub enum LocalKind {
    /// A user-written variable or parameter.
    Named(Atom),
    /// Synthetic temporary introduced by expression flattening.
    Temp,
}

#[derive(Clone, Debug)]
pub struct LocalInfo {
    pub kind: LocalKind,
}

/// One operation; operands are locals bound earlier on every path here.
#[derive(Clone, Debug)]
pub enum Op {
    /// Parameter at the given position, definitely assigned on entry.
    Param(u32),
    SelfRef,
    LitInt(i64),
    LitFloat(u64),
    LitStr,
    LitSym(Atom),
    LitTrue,
    LitFalse,
    LitNil,
    /// Copy of another local (`x = y` keeps the named binding explicit).
    Read(LocalId),
    ReadField(Atom),
    WriteField { name: Atom, value: LocalId },
    ReadConst(ConstPath),
    Call {
        recv: LocalId,
        method: Atom,
        args: SmallVec<[LocalId; 4]>,
    },
}

impl Op {
    /// Locals this operation reads.
    pub fn operands(&self) -> SmallVec<[LocalId; 4]> {
        match self {
            Op::Read(l) => SmallVec::from_slice(&[*l]),
            Op::WriteField { value, .. } => SmallVec::from_slice(&[*value]),
            Op::Call { recv, args, .. } => {
                let mut out = SmallVec::from_slice(&[*recv]);
                out.extend(args.iter().copied());
                out
            }
            _ => SmallVec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Binding {
    pub target: LocalId,
    pub op: Op,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Terminator {
    Jump(BlockId),
    Branch {
        cond: LocalId,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return(LocalId),
    /// Exception-region entry: control either proceeds normally or takes
    /// the exceptional edge into the handler.
    Protected { normal: BlockId, handler: BlockId },
    /// The method's single unhandled-exception exit.
    UnhandledException,
}

impl Terminator {
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Terminator::Jump(t) => SmallVec::from_slice(&[*t]),
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => SmallVec::from_slice(&[*then_block, *else_block]),
            Terminator::Protected { normal, handler } => {
                SmallVec::from_slice(&[*normal, *handler])
            }
            Terminator::Return(_) | Terminator::UnhandledException => SmallVec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BasicBlock {
    pub bindings: Vec<Binding>,
    pub term: Terminator,
    /// Unreachable from entry; later stages skip it.
    pub dead: bool,
}

#[derive(Clone, Debug)]
pub struct Cfg {
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
    /// Target of exceptional edges with no enclosing handler.
    pub exception_exit: BlockId,
    pub locals: Vec<LocalInfo>,
    /// Predecessors, computed when the graph is sealed.
    pub preds: Vec<SmallVec<[BlockId; 2]>>,
    /// Declared parameter count (leading named locals).
    pub param_count: u32,
}

impl Cfg {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn local_name(&self, id: LocalId) -> Option<Atom> {
        match self.locals.get(id.index())?.kind {
            LocalKind::Named(name) => Some(name),
            LocalKind::Temp => None,
        }
    }

    /// Reverse postorder over live blocks, entry first.
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut visited = FixedBitSet::with_capacity(self.blocks.len());
        let mut order = Vec::with_capacity(self.blocks.len());
        self.postorder(self.entry, &mut visited, &mut order);
        order.reverse();
        order
    }

    fn postorder(&self, at: BlockId, visited: &mut FixedBitSet, out: &mut Vec<BlockId>) {
        if visited.contains(at.index()) {
            return;
        }
        visited.insert(at.index());
        for succ in self.block(at).term.successors() {
            self.postorder(succ, visited, out);
        }
        out.push(at);
    }
}

// =============================================================================
// Lowering
// =============================================================================

struct Builder {
    blocks: Vec<(Vec<Binding>, Option<Terminator>)>,
    locals: Vec<LocalInfo>,
    named: FxHashMap<Atom, LocalId>,
    current: BlockId,
    /// Innermost loop targets: (join-with-condition, after-loop).
    loop_stack: Vec<(BlockId, BlockId)>,
    exception_exit: BlockId,
    nil_of_method: Option<LocalId>,
}

/// Lower one method body to its control-flow graph.
pub fn lower_method(decl: &MethodDecl) -> Cfg {
    let mut b = Builder {
        blocks: vec![(Vec::new(), None)],
        locals: Vec::new(),
        named: FxHashMap::default(),
        current: BlockId(0),
        loop_stack: Vec::new(),
        exception_exit: BlockId(0), // patched below
        nil_of_method: None,
    };

    // Parameters are definitely assigned at entry.
    for (i, param) in decl.params.iter().enumerate() {
        let local = b.named_local(param.name);
        b.push(local, Op::Param(i as u32), param.span);
    }

    // The unhandled-exception exit lives at a fixed block right after
    // entry so nested regions can all target it.
    let exit = b.new_block();
    b.set_term(exit, Terminator::UnhandledException);
    b.exception_exit = exit;

    for stmt in &decl.body {
        b.lower_stmt(stmt);
    }

    // Falling off the end returns nil.
    if b.blocks[b.current.index()].1.is_none() {
        let nil = b.temp();
        b.push(nil, Op::LitNil, decl.span);
        b.set_term(b.current, Terminator::Return(nil));
    }

    b.seal(decl.params.len() as u32)
}

impl Builder {
    fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push((Vec::new(), None));
        id
    }

    fn temp(&mut self) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalInfo {
            kind: LocalKind::Temp,
        });
        id
    }

    fn named_local(&mut self, name: Atom) -> LocalId {
        if let Some(&id) = self.named.get(&name) {
            return id;
        }
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalInfo {
            kind: LocalKind::Named(name),
        });
        self.named.insert(name, id);
        id
    }

    fn push(&mut self, target: LocalId, op: Op, span: Span) {
        self.blocks[self.current.index()]
            .0
            .push(Binding { target, op, span });
    }

    fn set_term(&mut self, block: BlockId, term: Terminator) {
        let slot = &mut self.blocks[block.index()].1;
        if slot.is_none() {
            *slot = Some(term);
        }
    }

    /// Terminate the current block (if still open) and continue in `next`.
    fn finish_into(&mut self, term: Terminator, next: BlockId) {
        self.set_term(self.current, term);
        self.current = next;
    }

    fn lower_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.lower_expr(expr);
            }
            Stmt::Assign { name, value, span } => {
                let value = self.lower_expr(value);
                let target = self.named_local(*name);
                self.push(target, Op::Read(value), *span);
            }
            Stmt::FieldAssign { name, value, span } => {
                let value = self.lower_expr(value);
                let target = self.temp();
                self.push(
                    target,
                    Op::WriteField {
                        name: *name,
                        value,
                    },
                    *span,
                );
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                let cond = self.lower_operand(cond);
                let then_block = self.new_block();
                let else_block = self.new_block();
                let join = self.new_block();
                self.finish_into(
                    Terminator::Branch {
                        cond,
                        then_block,
                        else_block,
                    },
                    then_block,
                );
                for s in then_body {
                    self.lower_stmt(s);
                }
                self.finish_into(Terminator::Jump(join), else_block);
                for s in else_body {
                    self.lower_stmt(s);
                }
                self.finish_into(Terminator::Jump(join), join);
            }
            Stmt::While { cond, body, .. } => {
                // Join block holds the condition test; the body's back edge
                // returns to it.
                let head = self.new_block();
                let body_block = self.new_block();
                let after = self.new_block();
                self.finish_into(Terminator::Jump(head), head);
                let cond = self.lower_operand(cond);
                self.finish_into(
                    Terminator::Branch {
                        cond,
                        then_block: body_block,
                        else_block: after,
                    },
                    body_block,
                );
                self.loop_stack.push((head, after));
                for s in body {
                    self.lower_stmt(s);
                }
                self.loop_stack.pop();
                self.finish_into(Terminator::Jump(head), after);
            }
            Stmt::Break { .. } => {
                let target = self.loop_stack.last().map(|&(_, after)| after);
                if let Some(after) = target {
                    let dead = self.new_block();
                    self.finish_into(Terminator::Jump(after), dead);
                }
            }
            Stmt::Next { .. } => {
                let target = self.loop_stack.last().map(|&(head, _)| head);
                if let Some(head) = target {
                    let dead = self.new_block();
                    self.finish_into(Terminator::Jump(head), dead);
                }
            }
            Stmt::Return { value, span } => {
                let local = match value {
                    Some(expr) => self.lower_operand(expr),
                    None => {
                        let nil = self.temp();
                        self.push(nil, Op::LitNil, *span);
                        nil
                    }
                };
                let dead = self.new_block();
                self.finish_into(Terminator::Return(local), dead);
            }
            Stmt::Begin {
                body, rescue_body, ..
            } => {
                let body_block = self.new_block();
                let join = self.new_block();
                // Absent a rescue body there is no enclosing handler: the
                // exceptional edge falls through to the method exit.
                let handler = if rescue_body.is_empty() {
                    self.exception_exit
                } else {
                    self.new_block()
                };
                self.finish_into(
                    Terminator::Protected {
                        normal: body_block,
                        handler,
                    },
                    body_block,
                );
                for s in body {
                    self.lower_stmt(s);
                }
                self.finish_into(Terminator::Jump(join), join);
                if !rescue_body.is_empty() {
                    self.current = handler;
                    for s in rescue_body {
                        self.lower_stmt(s);
                    }
                    self.finish_into(Terminator::Jump(join), join);
                }
            }
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> LocalId {
        let span = expr.span();
        match expr {
            Expr::IntLit { value, .. } => self.emit_temp(Op::LitInt(*value), span),
            Expr::FloatLit { bits, .. } => self.emit_temp(Op::LitFloat(*bits), span),
            Expr::StrLit { .. } => self.emit_temp(Op::LitStr, span),
            Expr::SymLit { name, .. } => self.emit_temp(Op::LitSym(*name), span),
            Expr::True { .. } => self.emit_temp(Op::LitTrue, span),
            Expr::False { .. } => self.emit_temp(Op::LitFalse, span),
            Expr::Nil { .. } => self.emit_temp(Op::LitNil, span),
            Expr::SelfRef { .. } => self.emit_temp(Op::SelfRef, span),
            Expr::Local { name, .. } => {
                // Reads reference the nearest binding directly; a read
                // with no dominating write is caught by the assignment
                // analysis below.
                self.named_local(*name)
            }
            Expr::FieldRead { name, .. } => self.emit_temp(Op::ReadField(*name), span),
            Expr::ConstRead { path } => self.emit_temp(Op::ReadConst(path.clone()), span),
            Expr::Call {
                recv, name, args, ..
            } => {
                let recv = match recv {
                    Some(r) => self.lower_expr(r),
                    None => self.emit_temp(Op::SelfRef, span),
                };
                let args: SmallVec<[LocalId; 4]> =
                    args.iter().map(|a| self.lower_expr(a)).collect();
                self.emit_temp(
                    Op::Call {
                        recv,
                        method: *name,
                        args,
                    },
                    span,
                )
            }
        }
    }

    fn emit_temp(&mut self, op: Op, span: Span) -> LocalId {
        let target = self.temp();
        self.push(target, op, span);
        target
    }

    /// Like [`lower_expr`](Self::lower_expr), but guarantees the result
    /// is a temporary. Terminators consume their operand through a
    /// binding, so a read of an unassigned named local still surfaces in
    /// the assignment analysis.
    fn lower_operand(&mut self, expr: &Expr) -> LocalId {
        let local = self.lower_expr(expr);
        match self.locals[local.index()].kind {
            LocalKind::Temp => local,
            LocalKind::Named(_) => self.emit_temp(Op::Read(local), expr.span()),
        }
    }

    fn seal(mut self, param_count: u32) -> Cfg {
        // Close any still-open block: only synthetically created
        // continuation blocks can be open, and they are unreachable.
        for (_, term) in self.blocks.iter_mut() {
            if term.is_none() {
                *term = Some(Terminator::UnhandledException);
            }
        }

        let blocks: Vec<BasicBlock> = self
            .blocks
            .into_iter()
            .map(|(bindings, term)| BasicBlock {
                bindings,
                term: term.unwrap_or(Terminator::UnhandledException),
                dead: true,
            })
            .collect();

        let mut cfg = Cfg {
            preds: vec![SmallVec::new(); blocks.len()],
            blocks,
            entry: BlockId(0),
            exception_exit: self.exception_exit,
            locals: self.locals,
            param_count,
        };

        // Reachability from entry; everything else stays tagged dead.
        let mut stack = vec![cfg.entry];
        let mut seen = FixedBitSet::with_capacity(cfg.blocks.len());
        seen.insert(cfg.entry.index());
        while let Some(at) = stack.pop() {
            cfg.blocks[at.index()].dead = false;
            for succ in cfg.blocks[at.index()].term.successors() {
                cfg.preds[succ.index()].push(at);
                if !seen.contains(succ.index()) {
                    seen.insert(succ.index());
                    stack.push(succ);
                }
            }
        }
        cfg
    }
}

// =============================================================================
// Definite assignment
// =============================================================================

/// Flag reads of named locals with no dominating write.
///
/// Forward must-assigned dataflow: a local counts as assigned at a use
/// only if every path from entry binds it first. Temporaries are bound by
/// construction and skipped.
pub fn check_definite_assignment(
    cfg: &Cfg,
    names: &NameTable,
    file_path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let n_locals = cfg.locals.len();
    let n_blocks = cfg.blocks.len();
    if n_blocks == 0 {
        return;
    }

    let full = {
        let mut s = FixedBitSet::with_capacity(n_locals);
        s.insert_range(..);
        s
    };
    // Start from "everything assigned" and narrow to the fixed point.
    let mut out_sets: Vec<FixedBitSet> = vec![full.clone(); n_blocks];
    let order = cfg.reverse_postorder();

    let mut changed = true;
    while changed {
        changed = false;
        for &block_id in &order {
            let mut live_in = match cfg.preds[block_id.index()].as_slice() {
                [] => FixedBitSet::with_capacity(n_locals),
                preds => {
                    let mut acc = full.clone();
                    for p in preds {
                        acc.intersect_with(&out_sets[p.index()]);
                    }
                    acc
                }
            };
            for binding in &cfg.block(block_id).bindings {
                live_in.insert(binding.target.index());
            }
            if live_in != out_sets[block_id.index()] {
                out_sets[block_id.index()] = live_in;
                changed = true;
            }
        }
    }

    // Report each offending read once, in block order.
    let mut reported = FixedBitSet::with_capacity(n_locals);
    for &block_id in &order {
        let mut assigned = match cfg.preds[block_id.index()].as_slice() {
            [] => FixedBitSet::with_capacity(n_locals),
            preds => {
                let mut acc = full.clone();
                for p in preds {
                    acc.intersect_with(&out_sets[p.index()]);
                }
                acc
            }
        };
        for binding in &cfg.block(block_id).bindings {
            for operand in binding.op.operands() {
                if assigned.contains(operand.index()) || reported.contains(operand.index()) {
                    continue;
                }
                if let Some(name) = cfg.local_name(operand) {
                    let name_str = names.resolve(name);
                    diagnostics.push(Diagnostic::error(
                        file_path,
                        binding.span,
                        message_for(diagnostic_codes::READ_BEFORE_WRITE, &[&name_str]),
                        diagnostic_codes::READ_BEFORE_WRITE,
                    ));
                    reported.insert(operand.index());
                }
            }
            assigned.insert(binding.target.index());
        }
    }
}
