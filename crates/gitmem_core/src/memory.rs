//! Versioned-memory primitives: the per-object view of the global
//! variables and the commit/pull reconciliation that defines the memory
//! model.
//!
//! Each synchronising object keeps, per variable, the current value, an
//! optional pending commit (a write performed since the object last
//! synchronised), and the append-only history of commits it has observed.
//! Reconciliation treats histories like git branches: one view can be
//! fast-forwarded to another exactly when its history is a prefix of the
//! other's, and any divergence is a data race witnessed by the two commits
//! at the first differing position.

use std::collections::BTreeMap;
use tracing::trace;

/// A globally unique, monotonically increasing write id, minted by the
/// owning context at the moment a global is assigned.
pub type Commit = u64;

/// The ordered sequence of writes to one variable as observed by one
/// synchronising object. Grows only by appends.
pub type CommitHistory = Vec<Commit>;

/// One synchronising object's view of a single global variable.
///
/// If `pending` is set, `val` is the value of that uncommitted write and
/// the pending id is not yet in `history`; otherwise `val` corresponds to
/// the last history entry.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Global {
    pub val: u64,
    pub pending: Option<Commit>,
    pub history: CommitHistory,
}

impl Global {
    /// The commit backing the currently visible value: the pending write if
    /// any, the newest history entry otherwise.
    ///
    /// # Panics
    ///
    /// Panics when the view has neither, which no reachable interpreter
    /// state produces.
    pub fn visible_commit(&self) -> Commit {
        self.pending
            .or_else(|| self.history.last().copied())
            .expect("global with neither pending write nor history")
    }
}

/// A synchronising object's full view of the globals, keyed by variable
/// name. Ordered so that reconciliation and logging are deterministic
/// under replay.
pub type Globals = BTreeMap<String, Global>;

/// A detected data race: the variable whose histories diverge and the two
/// commits at the first differing position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Conflict {
    pub var: String,
    pub commits: (Commit, Commit),
}

/// Append every pending commit to its variable's history and clear the
/// pending slot. Idempotent.
pub fn commit(globals: &mut Globals) {
    for (var, global) in globals.iter_mut() {
        if let Some(id) = global.pending.take() {
            global.history.push(id);
            trace!(%var, id, "committed global");
        }
    }
}

/// Reconcile `dst` with `src`: copy variables `dst` does not know about,
/// fast-forward those where `src` is strictly ahead, and report the first
/// divergence found. On a conflict `dst` is left with every variable before
/// the conflicting one already reconciled.
pub fn pull(dst: &mut Globals, src: &Globals) -> Option<Conflict> {
    for (var, src_var) in src {
        match dst.get_mut(var) {
            None => {
                dst.insert(var.clone(), src_var.clone());
            }
            Some(dst_var) => {
                if let Some(commits) = first_divergence(&src_var.history, &dst_var.history) {
                    trace!(%var, from = commits.0, to = commits.1, "data race detected");
                    return Some(Conflict {
                        var: var.clone(),
                        commits,
                    });
                }
                if src_var.history.len() > dst_var.history.len() {
                    trace!(%var, val = src_var.val, "fast-forward");
                    dst_var.val = src_var.val;
                    dst_var.history = src_var.history.clone();
                }
            }
        }
    }
    None
}

/// The two commits at the first position where the histories differ, if
/// any. Comparison runs over the common prefix only; a strict prefix is
/// not a divergence.
fn first_divergence(h1: &[Commit], h2: &[Commit]) -> Option<(Commit, Commit)> {
    h1.iter()
        .zip(h2)
        .find(|(a, b)| a != b)
        .map(|(a, b)| (*a, *b))
}

#[cfg(test)]
mod test {
    use super::*;

    fn global(val: u64, pending: Option<Commit>, history: &[Commit]) -> Global {
        Global {
            val,
            pending,
            history: history.to_vec(),
        }
    }

    #[test]
    fn commit_appends_pending_and_clears_slot() {
        let mut globals = Globals::new();
        globals.insert("x".into(), global(3, Some(7), &[1, 2]));
        globals.insert("y".into(), global(9, None, &[4]));
        commit(&mut globals);
        assert_eq!(globals["x"], global(3, None, &[1, 2, 7]));
        assert_eq!(globals["y"], global(9, None, &[4]));
        commit(&mut globals); // idempotent
        assert_eq!(globals["x"], global(3, None, &[1, 2, 7]));
    }

    #[test]
    fn pull_copies_unknown_variables() {
        let mut dst = Globals::new();
        let mut src = Globals::new();
        src.insert("x".into(), global(5, None, &[1, 2]));
        assert_eq!(pull(&mut dst, &src), None);
        assert_eq!(dst["x"], global(5, None, &[1, 2]));
    }

    #[test]
    fn pull_fast_forwards_strict_prefix() {
        let mut dst = Globals::new();
        dst.insert("x".into(), global(1, None, &[1]));
        let mut src = Globals::new();
        src.insert("x".into(), global(8, None, &[1, 2, 3]));
        assert_eq!(pull(&mut dst, &src), None);
        assert_eq!(dst["x"], global(8, None, &[1, 2, 3]));
    }

    #[test]
    fn pull_ignores_src_behind_dst() {
        let mut dst = Globals::new();
        dst.insert("x".into(), global(8, None, &[1, 2, 3]));
        let mut src = Globals::new();
        src.insert("x".into(), global(1, None, &[1]));
        assert_eq!(pull(&mut dst, &src), None);
        assert_eq!(dst["x"], global(8, None, &[1, 2, 3]));
    }

    #[test]
    fn pull_reports_first_divergence() {
        let mut dst = Globals::new();
        dst.insert("x".into(), global(1, None, &[1, 5]));
        let mut src = Globals::new();
        src.insert("x".into(), global(2, None, &[1, 6, 7]));
        let conflict = pull(&mut dst, &src).expect("divergent histories");
        assert_eq!(conflict.var, "x");
        assert_eq!(conflict.commits, (6, 5));
        // dst untouched for the conflicting variable
        assert_eq!(dst["x"], global(1, None, &[1, 5]));
    }

    #[test]
    fn pull_conflicts_even_when_values_agree() {
        // Two writes of the same value are still a race: the histories
        // differ by commit id.
        let mut dst = Globals::new();
        dst.insert("x".into(), global(1, None, &[0, 1]));
        let mut src = Globals::new();
        src.insert("x".into(), global(1, None, &[0, 2]));
        assert!(pull(&mut dst, &src).is_some());
    }

    #[test]
    fn pull_reports_first_conflicting_variable_in_name_order() {
        let mut dst = Globals::new();
        dst.insert("a".into(), global(0, None, &[1]));
        dst.insert("b".into(), global(0, None, &[2]));
        let mut src = Globals::new();
        src.insert("a".into(), global(0, None, &[3]));
        src.insert("b".into(), global(0, None, &[4]));
        let conflict = pull(&mut dst, &src).expect("both variables diverge");
        assert_eq!(conflict.var, "a");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_history() -> impl Strategy<Value = CommitHistory> {
            proptest::collection::vec(0u64..16, 0..6)
        }

        proptest! {
            #[test]
            fn pull_never_shrinks_histories(h1 in arb_history(), h2 in arb_history()) {
                let mut dst = Globals::new();
                dst.insert("x".into(), Global { val: 0, pending: None, history: h1.clone() });
                let mut src = Globals::new();
                src.insert("x".into(), Global { val: 1, pending: None, history: h2 });
                let _ = pull(&mut dst, &src);
                let after = &dst["x"].history;
                prop_assert!(after.len() >= h1.len());
            }

            #[test]
            fn successful_pull_leaves_prefix_relation(h1 in arb_history(), h2 in arb_history()) {
                let mut dst = Globals::new();
                dst.insert("x".into(), Global { val: 0, pending: None, history: h1 });
                let mut src = Globals::new();
                src.insert("x".into(), Global { val: 1, pending: None, history: h2.clone() });
                if pull(&mut dst, &src).is_none() {
                    let after = &dst["x"].history;
                    let shorter = after.len().min(h2.len());
                    prop_assert_eq!(&after[..shorter], &h2[..shorter]);
                }
            }

            #[test]
            fn conflict_commits_come_from_both_histories(
                h1 in arb_history(),
                h2 in arb_history(),
            ) {
                let mut dst = Globals::new();
                dst.insert("x".into(), Global { val: 0, pending: None, history: h1.clone() });
                let mut src = Globals::new();
                src.insert("x".into(), Global { val: 1, pending: None, history: h2.clone() });
                if let Some(conflict) = pull(&mut dst, &src) {
                    prop_assert!(h2.contains(&conflict.commits.0));
                    prop_assert!(h1.contains(&conflict.commits.1));
                }
            }
        }
    }
}
