//! Programs where divergent commit histories are (or are not) detected,
//! depending on the schedule.

use {
    gitmem_core::TerminationStatus,
    gitmem_lang::parse,
    gitmem_verifier::{Explorer, Verdict},
};

#[test]
fn unprotected_write_races_only_when_it_trails_the_locked_one() {
    let program = parse(
        "$t1 = spawn { lock l; x = 1; unlock l; }; \
         $t2 = spawn { x = 2; lock l; unlock l; }; \
         join $t1; \
         assert x == 1; \
         join $t2; \
         assert x == 2;",
    )
    .unwrap();
    let exploration = Explorer::new(program).run();

    // Schedules where t2 acquires the lock after t1 released it see t2's
    // unsynchronised write diverge from the one the lock published.
    let races: Vec<_> = exploration
        .states
        .iter()
        .filter(|s| {
            s.context.threads[2].terminated == Some(TerminationStatus::DataRace)
        })
        .collect();
    assert!(!races.is_empty());
    for state in &races {
        assert_eq!(state.verdict, Verdict::Failing);
    }

    // In the reverse order t1 fast-forwards over t2's write and there is
    // no race; main then observes x == 1 and fails its second assertion.
    let reverses: Vec<_> = exploration
        .states
        .iter()
        .filter(|s| {
            s.context.threads[0].terminated == Some(TerminationStatus::AssertionFailure)
        })
        .collect();
    assert!(!reverses.is_empty());
    for state in &reverses {
        assert!(!state
            .context
            .threads
            .iter()
            .any(|t| t.terminated == Some(TerminationStatus::DataRace)));
        assert_eq!(state.context.threads[0].globals["x"].val, 1);
    }

    // Every state is one of the two shapes; nothing passes or deadlocks.
    assert_eq!(exploration.passed().count(), 0);
    assert_eq!(exploration.deadlocked().count(), 0);
    assert_eq!(races.len() + reverses.len(), exploration.states.len());
}

#[test]
fn same_value_writes_still_race() {
    // Both threads write the same value, but the histories differ by
    // commit id, which is what the reconciliation compares.
    let program = parse(
        "x = 0; \
         assert x == 0; \
         $t1 = spawn { x = 1; }; \
         $t2 = spawn { x = 1; }; \
         join $t1; \
         join $t2;",
    )
    .unwrap();
    let exploration = Explorer::new(program).run();
    assert_eq!(exploration.states.len(), 1);
    let state = &exploration.states[0];
    assert_eq!(state.verdict, Verdict::Failing);
    assert_eq!(
        state.context.threads[0].terminated,
        Some(TerminationStatus::DataRace)
    );
    // Both writers completed normally; the race surfaces at the joiner.
    assert_eq!(
        state.context.threads[1].terminated,
        Some(TerminationStatus::Completed)
    );
    assert_eq!(
        state.context.threads[2].terminated,
        Some(TerminationStatus::Completed)
    );
}

#[test]
fn the_conflicting_commits_are_reported_in_the_event_graph() {
    use gitmem::graph::EventKind;

    let program = parse(
        "x = 0; \
         $t1 = spawn { x = 1; }; \
         $t2 = spawn { x = 1; }; \
         join $t1; \
         join $t2;",
    )
    .unwrap();
    let exploration = Explorer::new(program).run();
    let state = &exploration.states[0];
    let graph = &state.context.graph;
    let main = &state.context.threads[0];

    let conflict = graph
        .chain(main.start)
        .find_map(|ix| match graph.kind(ix) {
            EventKind::Join {
                conflict: Some(conflict),
                ..
            } => Some(conflict.clone()),
            _ => None,
        })
        .expect("the second join carries the conflict");
    assert_eq!(conflict.var, "x");
    // Both witnesses are writes of x.
    for source in [conflict.sources.0, conflict.sources.1] {
        assert!(matches!(
            graph.kind(source),
            EventKind::Write { var, .. } if var == "x"
        ));
    }
}
