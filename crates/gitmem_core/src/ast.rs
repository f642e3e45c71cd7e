use std::{
    fmt::{self, Display, Formatter},
    rc::Rc,
};

/// The left-hand side of an assignment: a thread-local register or a
/// versioned global variable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LVal {
    Reg(String),
    Var(String),
}

/// An expression node. Expressions are reference-counted so that a block
/// and the threads executing it share one tree, and so that every node has
/// a stable identity (see [`Expr::id`]) for the join-result cache.
#[derive(Clone, Debug)]
pub struct Expr(Rc<ExprKind>);

#[derive(Debug)]
pub enum ExprKind {
    /// Thread-local register read, e.g. `$t`.
    Reg(String),
    /// Versioned global read.
    Var(String),
    /// Decimal integer literal.
    Const(u64),
    /// Spawns a thread running the block; evaluates to the new thread id.
    Spawn(Block),
    /// Equality, yielding 1 or 0.
    Eq(Expr, Expr),
    /// Inequality, yielding 1 or 0.
    Neq(Expr, Expr),
    /// N-ary sum, evaluated left to right with wrapping arithmetic.
    Add(Vec<Expr>),
}

/// Stable identity of an expression node, valid for as long as any clone of
/// the owning tree is alive. Two `ExprId`s are equal exactly when they name
/// the same node.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ExprId(usize);

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr(Rc::new(kind))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0
    }

    pub fn id(&self) -> ExprId {
        ExprId(Rc::as_ptr(&self.0) as *const () as usize)
    }
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Self {
        Expr::new(kind)
    }
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Nop,
    Assign(LVal, Expr),
    Join(Expr),
    Lock(String),
    Unlock(String),
    Assert(Expr),
    /// Advance the pc by 1 when the expression is non-zero, by the given
    /// (forward) delta otherwise. Produced by lowering `if`/`else`.
    Cond(Expr, usize),
    /// Unconditionally advance the pc by the given (forward) delta.
    Jump(usize),
}

impl Stmt {
    /// Sync statements are the scheduling granularity: a step stops before
    /// one, and only one of them can be the first statement of a step.
    pub fn is_sync(&self) -> bool {
        matches!(self, Stmt::Join(_) | Stmt::Lock(_) | Stmt::Unlock(_))
    }
}

/// A non-empty, ordered statement sequence. Blocks are shared between the
/// AST and the threads executing them; [`Block::ptr_eq`] is the block
/// identity used when deduplicating final states.
#[derive(Clone, Debug)]
pub struct Block(Rc<[Stmt]>);

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block(stmts.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, pc: usize) -> Option<&Stmt> {
        self.0.get(pc)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stmt> {
        self.0.iter()
    }

    pub fn ptr_eq(&self, other: &Block) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::ops::Index<usize> for Block {
    type Output = Stmt;
    fn index(&self, pc: usize) -> &Stmt {
        &self.0[pc]
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Reg(name) => write!(f, "${name}"),
            ExprKind::Var(name) => f.write_str(name),
            ExprKind::Const(n) => write!(f, "{n}"),
            ExprKind::Spawn(block) => write!(f, "spawn {block}"),
            ExprKind::Eq(lhs, rhs) => write!(f, "{lhs} == {rhs}"),
            ExprKind::Neq(lhs, rhs) => write!(f, "{lhs} != {rhs}"),
            ExprKind::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    write!(f, "{term}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for LVal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LVal::Reg(name) => write!(f, "${name}"),
            LVal::Var(name) => f.write_str(name),
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Nop => f.write_str("nop"),
            Stmt::Assign(lval, expr) => write!(f, "{lval} = {expr}"),
            Stmt::Join(expr) => write!(f, "join {expr}"),
            Stmt::Lock(name) => write!(f, "lock {name}"),
            Stmt::Unlock(name) => write!(f, "unlock {name}"),
            Stmt::Assert(expr) => write!(f, "assert {expr}"),
            Stmt::Cond(expr, delta) => write!(f, "if ({expr}) jump {delta}"),
            Stmt::Jump(delta) => write!(f, "jump {delta}"),
        }
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for stmt in self.iter() {
            write!(f, "{stmt}; ")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::new(ExprKind::Var(name.into()))
    }

    #[test]
    fn expr_identity_is_per_node() {
        let a = Expr::new(ExprKind::Const(1));
        let b = Expr::new(ExprKind::Const(1));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }

    #[test]
    fn block_identity_survives_clone() {
        let block = Block::new(vec![Stmt::Nop]);
        assert!(block.ptr_eq(&block.clone()));
        assert!(!block.ptr_eq(&Block::new(vec![Stmt::Nop])));
    }

    #[test]
    fn statements_display_as_source() {
        let stmt = Stmt::Assign(
            LVal::Reg("t".into()),
            Expr::new(ExprKind::Spawn(Block::new(vec![
                Stmt::Lock("l".into()),
                Stmt::Assign(LVal::Var("x".into()), Expr::new(ExprKind::Const(1))),
                Stmt::Unlock("l".into()),
            ]))),
        );
        assert_eq!(stmt.to_string(), "$t = spawn { lock l; x = 1; unlock l; }");
        let assert_stmt = Stmt::Assert(Expr::new(ExprKind::Neq(var("x"), var("y"))));
        assert_eq!(assert_stmt.to_string(), "assert x != y");
    }
}
