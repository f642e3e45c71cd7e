use {
    crate::FinalState,
    std::sync::{Arc, Mutex},
};

/// Observes each distinct final state as the explorer finds it.
pub trait Visitor {
    fn on_final(&mut self, state: &FinalState);
}

impl<F> Visitor for F
where
    F: FnMut(&FinalState),
{
    fn on_final(&mut self, state: &FinalState) {
        self(state);
    }
}

/// A visitor that records every final state for inspection after the run.
pub struct RecordingVisitor(Arc<Mutex<Vec<FinalState>>>);

impl RecordingVisitor {
    /// Returns the visitor and a closure yielding everything recorded so
    /// far.
    pub fn new_with_replay() -> (Self, impl Fn() -> Vec<FinalState>) {
        let visitor = RecordingVisitor(Arc::new(Mutex::new(Vec::new())));
        let states = Arc::clone(&visitor.0);
        let replay = move || states.lock().unwrap().clone();
        (visitor, replay)
    }
}

impl Visitor for RecordingVisitor {
    fn on_final(&mut self, state: &FinalState) {
        self.0.lock().unwrap().push(state.clone());
    }
}
