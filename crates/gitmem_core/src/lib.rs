//! Core types for the gitmem language: the statement/expression tree,
//! thread identifiers, and the versioned-memory primitives that give the
//! language its git-like semantics.
//!
//! A gitmem program has no shared store. Every synchronising object (a
//! thread or a lock) carries its own view of the global variables, and each
//! view pairs the current value with an append-only history of commit ids.
//! Synchronising actions reconcile two views: either one history is a
//! prefix of the other and the shorter side fast-forwards, or the histories
//! diverge and the divergence is a data race. The reconciliation logic
//! lives in [`memory`]; everything else in this crate is the vocabulary the
//! interpreter and model checker share.

#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod ast;
mod id;
pub mod memory;

pub use ast::Block;

pub use ast::Expr;

pub use ast::ExprId;

pub use ast::ExprKind;

pub use ast::LVal;

pub use ast::Stmt;

pub use id::ThreadId;

/// How a thread ended, surfaced to the scheduler and the reporters. Errors
/// are per-thread: a faulted thread stays faulted and never unblocks its
/// joiners.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TerminationStatus {
    /// Ran off the end of its block.
    Completed,
    /// A pull at a join or lock found divergent commit histories.
    DataRace,
    /// Unlocked a lock it did not hold.
    UnownedUnlock,
    /// An `assert` evaluated to zero.
    AssertionFailure,
    /// Read a register or global that was never written.
    UnboundRead,
}

impl TerminationStatus {
    pub fn is_fault(self) -> bool {
        self != TerminationStatus::Completed
    }
}

impl std::fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TerminationStatus::Completed => "completed",
            TerminationStatus::DataRace => "data race",
            TerminationStatus::UnownedUnlock => "unlock of an unowned lock",
            TerminationStatus::AssertionFailure => "assertion failure",
            TerminationStatus::UnboundRead => "read of an unassigned variable",
        };
        f.write_str(text)
    }
}

/// Result of driving one thread for one scheduler step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StepOutcome {
    /// Executed at least one statement and stopped at the next sync point.
    Progress,
    /// The first statement of the step is a sync that cannot fire yet.
    NoProgress,
    /// The thread reached a terminal state during this step.
    Terminated(TerminationStatus),
}

impl StepOutcome {
    pub fn made_progress(self) -> bool {
        !matches!(self, StepOutcome::NoProgress)
    }
}
