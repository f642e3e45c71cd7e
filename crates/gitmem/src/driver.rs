//! The straight-line driver: a fair round-robin scheduler with no choice
//! points, used by the plain interpreter mode and the debugger's finish
//! command.

use {
    crate::{
        context::GlobalContext,
        graph::EventKind,
        interp::run_to_sync,
    },
    gitmem_core::{StepOutcome, TerminationStatus, ThreadId},
    tracing::debug,
};

enum Round {
    AllTerminated,
    Progress,
    NoProgress,
}

/// One pass over every live thread, each driven to its next sync point.
/// Threads spawned mid-round are picked up by the same round.
fn run_round(gctx: &mut GlobalContext) -> Round {
    let mut all_terminated = true;
    let mut any_progress = false;
    let mut i = 0;
    while i < gctx.threads.len() {
        let tid = ThreadId::from(i);
        if gctx.threads[tid].terminated.is_none() {
            debug!(thread = %tid, "scheduling");
            match run_to_sync(gctx, tid) {
                StepOutcome::NoProgress => {}
                StepOutcome::Progress | StepOutcome::Terminated(_) => any_progress = true,
            }
            all_terminated &= gctx.threads[tid].terminated.is_some();
        }
        i += 1;
    }
    if all_terminated {
        Round::AllTerminated
    } else if any_progress {
        Round::Progress
    } else {
        Round::NoProgress
    }
}

/// Run every thread until all have terminated or a round makes no
/// progress (a stuck configuration). Returns whether any thread faulted
/// or is stuck.
///
/// Stuck threads get their chains capped with an `End` node so the graph
/// renders cleanly.
pub fn run_threads(gctx: &mut GlobalContext) -> bool {
    loop {
        match run_round(gctx) {
            Round::Progress => continue,
            Round::AllTerminated | Round::NoProgress => break,
        }
    }

    let mut fault_detected = false;
    for i in 0..gctx.threads.len() {
        let tid = ThreadId::from(i);
        match gctx.threads[tid].terminated {
            Some(TerminationStatus::Completed) => {
                debug!(thread = %tid, "terminated normally");
            }
            Some(status) => {
                debug!(thread = %tid, %status, "terminated with an error");
                fault_detected = true;
            }
            None => {
                debug!(thread = %tid, "stuck");
                gctx.append_event(tid, EventKind::End);
                fault_detected = true;
            }
        }
    }
    fault_detected
}
