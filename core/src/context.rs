use std::sync::Arc;

use futures::{Stream, StreamExt, TryStreamExt};
use mergeflow_signals::Mut;
use tracing::trace;

use crate::generation::GenerationGate;

/// The capability a producer factory receives: folding values into the container's state.
///
/// A context belongs to one generation of the merged producer task. Once that generation
/// has been stopped (or the container disposed) its writes are dropped, even if an emission
/// was already in flight.
pub struct StateContext<S> {
    state: Mut<S>,
    gate: Arc<GenerationGate>,
    generation: u64,
}

impl<S> Clone for StateContext<S> {
    fn clone(&self) -> Self { Self { state: self.state.clone(), gate: self.gate.clone(), generation: self.generation } }
}

impl<S: Clone + Send + Sync + 'static> StateContext<S> {
    pub(crate) fn new(state: Mut<S>, gate: Arc<GenerationGate>, generation: u64) -> Self { Self { state, gate, generation } }

    pub fn generation(&self) -> u64 { self.generation }

    /// Whether writes through this context are still accepted
    pub fn is_current(&self) -> bool { self.gate.run(self.generation, || ()).is_some() }

    /// Snapshot of the container's state
    pub fn state(&self) -> S { self.state.peek() }

    /// Atomically applies `transform` to the state on behalf of this generation.
    /// Returns the committed state, or `None` if the generation has been stopped.
    pub fn update<F>(&self, transform: F) -> Option<S>
    where F: FnOnce(&S) -> S {
        let committed = self.gate.run(self.generation, || self.state.update(transform));
        if committed.is_none() {
            trace!("dropped write from stopped generation {}", self.generation);
        }
        committed
    }

    /// Folds every item of `source` into the state, then passes the item through unchanged.
    ///
    /// The state update for an item is committed before the item is yielded downstream.
    pub fn on_each_to_state<St, F>(&self, source: St, fold: F) -> impl Stream<Item = St::Item> + Send + use<S, St, F>
    where
        St: Stream + Send + 'static,
        F: Fn(&St::Item, &S) -> S + Send + Sync + 'static,
    {
        let context = self.clone();
        source.inspect(move |item| {
            context.update(|state| fold(item, state));
        })
    }

    /// Like [`StateContext::on_each_to_state`] for fallible sources: `Ok` items are folded,
    /// errors pass through untouched.
    pub fn try_on_each_to_state<St, T, E, F>(&self, source: St, fold: F) -> impl Stream<Item = Result<T, E>> + Send + use<S, St, T, E, F>
    where
        St: Stream<Item = Result<T, E>> + Send + 'static,
        F: Fn(&T, &S) -> S + Send + Sync + 'static,
    {
        let context = self.clone();
        source.inspect_ok(move |item| {
            context.update(|state| fold(item, state));
        })
    }
}

impl<S> std::fmt::Debug for StateContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("StateContext").field("generation", &self.generation).finish() }
}
