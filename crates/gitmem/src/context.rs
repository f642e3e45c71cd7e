use {
    crate::graph::{EventGraph, EventIx, EventKind},
    gitmem_core::{
        memory::{Commit, Globals},
        Block, ExprId, Stmt, TerminationStatus, ThreadId,
    },
    std::collections::{BTreeMap, HashMap},
};

/// One language-level thread: its registers, its view of the globals, the
/// block it executes with a program counter into it, and the tail of its
/// event chain.
#[derive(Clone, Debug)]
pub struct Thread {
    pub locals: BTreeMap<String, u64>,
    pub globals: Globals,
    pub block: Block,
    pub pc: usize,
    pub terminated: Option<TerminationStatus>,
    pub start: EventIx,
    pub tail: EventIx,
}

impl Thread {
    pub(crate) fn new(block: Block, globals: Globals, start: EventIx) -> Self {
        Thread {
            locals: BTreeMap::new(),
            globals,
            block,
            pc: 0,
            terminated: None,
            start,
            tail: start,
        }
    }

    /// The statement at the current pc, if the thread has not run off the
    /// end of its block.
    pub fn current_stmt(&self) -> Option<&Stmt> {
        self.block.get(self.pc)
    }

    /// Whether the thread sits at a sync statement it has yet to execute.
    pub fn parked_at_sync(&self) -> bool {
        self.terminated.is_none() && self.current_stmt().is_some_and(Stmt::is_sync)
    }
}

/// Final-state equivalence: same block identity and position, same
/// termination, same registers, and the same globals *by value*. Commit
/// histories are deliberately not compared; only observable values matter
/// when deduplicating final states.
impl PartialEq for Thread {
    fn eq(&self, other: &Self) -> bool {
        self.globals.len() == other.globals.len()
            && self
                .globals
                .iter()
                .all(|(var, g)| other.globals.get(var).is_some_and(|o| o.val == g.val))
            && self.locals == other.locals
            && self.block.ptr_eq(&other.block)
            && self.pc == other.pc
            && self.terminated == other.terminated
    }
}

/// A lock: the view of the globals it published at its last release, its
/// current owner, and the `Unlock` node that released it last (the target
/// of the next acquisition's ordered-after edge). Locks are created on
/// first mention.
#[derive(Clone, Debug, Default)]
pub struct Lock {
    pub globals: Globals,
    pub owner: Option<ThreadId>,
    pub last_unlock: Option<EventIx>,
}

/// Everything one execution owns: the threads (index 0 is the main
/// thread), the locks, the event-graph arena, the commit counter, and the
/// two bookkeeping maps the interpreter needs (write commit to event node,
/// and the join-expression result cache).
///
/// The commit counter lives here rather than in any ambient state so that
/// every replay of a schedule starts from the same counter and mints the
/// same ids; final-state deduplication depends on this.
#[derive(Clone, Debug)]
pub struct GlobalContext {
    pub threads: Vec<Thread>,
    pub locks: BTreeMap<String, Lock>,
    pub graph: EventGraph,
    pub(crate) commit_map: BTreeMap<Commit, EventIx>,
    pub(crate) join_cache: HashMap<ExprId, u64>,
    next_commit: Commit,
}

impl GlobalContext {
    /// A fresh context for the given program, with the main thread parked
    /// at its first statement.
    pub fn new(program: Block) -> Self {
        let mut graph = EventGraph::default();
        let start = graph.push(EventKind::Start {
            tid: ThreadId::from(0),
        });
        GlobalContext {
            threads: vec![Thread::new(program, Globals::new(), start)],
            locks: BTreeMap::new(),
            graph,
            commit_map: BTreeMap::new(),
            join_cache: HashMap::new(),
            next_commit: 0,
        }
    }

    pub(crate) fn mint_commit(&mut self) -> Commit {
        let commit = self.next_commit;
        self.next_commit += 1;
        commit
    }

    /// Append an event to a thread's chain and advance its tail. This
    /// overwrites any pending marker hanging off the old tail.
    pub(crate) fn append_event(&mut self, tid: ThreadId, kind: EventKind) -> EventIx {
        let ix = self.graph.push(kind);
        let tail = self.threads[tid].tail;
        self.graph.set_next(tail, Some(ix));
        self.threads[tid].tail = ix;
        ix
    }

    /// Attach a pending marker for the statement the thread is parked at,
    /// without advancing the tail.
    pub(crate) fn park_at(&mut self, tid: ThreadId, stmt: &Stmt) {
        let ix = self.graph.push(EventKind::Pending {
            stmt: stmt.to_string(),
        });
        let tail = self.threads[tid].tail;
        self.graph.set_next(tail, Some(ix));
    }

    pub fn all_completed(&self) -> bool {
        self.threads
            .iter()
            .all(|t| t.terminated == Some(TerminationStatus::Completed))
    }

    pub fn any_faulted(&self) -> bool {
        self.threads
            .iter()
            .any(|t| t.terminated.is_some_and(TerminationStatus::is_fault))
    }
}

/// Final-state equivalence over whole contexts: thread multisets are
/// matched up by block identity (spawn order may differ between
/// schedules), locks by name and owner.
impl PartialEq for GlobalContext {
    fn eq(&self, other: &Self) -> bool {
        if self.threads.len() != other.threads.len() || self.locks.len() != other.locks.len() {
            return false;
        }
        self.threads
            .iter()
            .all(|t| other.threads.iter().any(|u| t == u))
            && self
                .locks
                .iter()
                .all(|(name, lock)| other.locks.get(name).is_some_and(|o| o.owner == lock.owner))
    }
}
