use {
    crate::{trace_tree::TraceTree, Visitor},
    gitmem::{progress_thread, GlobalContext},
    gitmem_core::{Block, StepOutcome, ThreadId},
    tracing::{debug, trace},
};

/// How one explored schedule ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Every thread completed normally.
    Passed,
    /// Some thread terminated with an error.
    Failing,
    /// No thread crashed, yet the remaining threads cannot advance.
    Deadlocked,
}

/// One distinct final state: the schedule that reached it, the full
/// context snapshot, and its classification.
#[derive(Clone, Debug)]
pub struct FinalState {
    pub schedule: Vec<ThreadId>,
    pub context: GlobalContext,
    pub verdict: Verdict,
}

/// Everything the exploration found, deduplicated by final-state
/// equivalence.
#[derive(Debug, Default)]
pub struct Exploration {
    pub states: Vec<FinalState>,
}

impl Exploration {
    pub fn passed(&self) -> impl Iterator<Item = &FinalState> {
        self.with_verdict(Verdict::Passed)
    }

    pub fn failing(&self) -> impl Iterator<Item = &FinalState> {
        self.with_verdict(Verdict::Failing)
    }

    pub fn deadlocked(&self) -> impl Iterator<Item = &FinalState> {
        self.with_verdict(Verdict::Deadlocked)
    }

    pub fn any_fault(&self) -> bool {
        self.states.iter().any(|s| s.verdict != Verdict::Passed)
    }

    fn with_verdict(&self, verdict: Verdict) -> impl Iterator<Item = &FinalState> {
        self.states.iter().filter(move |s| s.verdict == verdict)
    }
}

/// A stateless model checker for one program.
///
/// # Purpose
///
/// A single run of the sequential driver exercises one schedule of the
/// program's sync points. When the program's outcome depends on the order
/// in which threads reach their joins and locks, a single schedule proves
/// nothing. The explorer enumerates every schedule that is distinguishable
/// at sync-point granularity and reports each distinct final state it can
/// reach, classified as passed, failing, or deadlocked.
///
/// # Internal implementation details
///
/// Exploration is *stateless*: no mid-execution snapshots are kept.
/// Schedules live in a tree whose nodes name the thread scheduled at that
/// step, children ordered by strictly increasing thread id. Each round
/// replays the path to the deepest unexplored node from a fresh
/// [`GlobalContext`] (replay is deterministic, so the path reproduces the
/// exact context), extends it with the first runnable thread the ordering
/// permits, and marks subtrees complete as they are exhausted. A schedule
/// is accepted when all threads completed, a thread crashed, or nothing
/// can advance (deadlock); its final context is recorded if no equivalent
/// state was seen before.
pub struct Explorer {
    program: Block,
    visitors: Vec<Box<dyn Visitor>>,
}

impl Explorer {
    pub fn new(program: Block) -> Self {
        Explorer {
            program,
            visitors: Vec::new(),
        }
    }

    /// Register a visitor notified of each distinct final state as it is
    /// found.
    pub fn visitor(mut self, visitor: impl Visitor + 'static) -> Self {
        self.visitors.push(Box::new(visitor));
        self
    }

    /// Explore the whole schedule space and collect the distinct final
    /// states. Terminates because programs have no backward jumps and each
    /// completed subtree strictly grows the set of schedules tried.
    pub fn run(&mut self) -> Exploration {
        let main = ThreadId::from(0);
        let mut tree = TraceTree::new();
        let mut exploration = Exploration::default();

        let mut gctx = GlobalContext::new(self.program.clone());
        let mut schedule = vec![main];
        let _ = progress_thread(&mut gctx, main);

        while !tree.root_complete() {
            // Replay: descend to the deepest unexplored node, re-running
            // each step against the fresh context.
            while let Some(tid) = tree.descend_rightmost_incomplete() {
                trace!(thread = %tid, "replaying");
                schedule.push(tid);
                let _ = progress_thread(&mut gctx, tid);
            }

            // Extend with the first thread at or after the ordering
            // cut-off that can act.
            let mut made_progress = false;
            let thread_count = gctx.threads.len();
            let mut i = usize::from(tree.next_tid_to_try());
            while i < thread_count && !made_progress {
                let tid = ThreadId::from(i);
                if gctx.threads[tid].terminated.is_none() {
                    trace!(thread = %tid, "scheduling");
                    match progress_thread(&mut gctx, tid) {
                        StepOutcome::NoProgress => {}
                        StepOutcome::Progress => {
                            made_progress = true;
                            tree.extend(tid);
                            schedule.push(tid);
                        }
                        StepOutcome::Terminated(status) => {
                            made_progress = true;
                            tree.extend(tid);
                            schedule.push(tid);
                            if status.is_fault() {
                                // The crash cuts this subtree off.
                                tree.mark_cursor_complete();
                            }
                        }
                    }
                }
                i += 1;
            }
            if !made_progress {
                tree.mark_cursor_complete();
            }

            let all_completed = gctx.all_completed();
            let any_crashed = gctx.any_faulted();
            let is_deadlock = !all_completed && !made_progress && tree.cursor_is_leaf();

            if all_completed || any_crashed || is_deadlock {
                if !exploration.states.iter().any(|s| s.context == gctx) {
                    let verdict = if any_crashed {
                        Verdict::Failing
                    } else if is_deadlock {
                        Verdict::Deadlocked
                    } else {
                        Verdict::Passed
                    };
                    debug!(?verdict, schedule = ?schedule, "distinct final state");
                    let state = FinalState {
                        schedule: schedule.clone(),
                        context: gctx.clone(),
                        verdict,
                    };
                    for visitor in &mut self.visitors {
                        visitor.on_final(&state);
                    }
                    exploration.states.push(state);
                }
                tree.mark_cursor_complete();
            }

            if tree.cursor_complete() && !tree.root_complete() {
                trace!("restarting trace");
                gctx = GlobalContext::new(self.program.clone());
                tree.rewind();
                schedule.clear();
                schedule.push(main);
                let _ = progress_thread(&mut gctx, main);
            }
        }

        exploration
    }
}
