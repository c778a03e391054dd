use std::sync::RwLock;

/// Generation token guarding producer writes to the state.
///
/// Each activation of the producers runs under a fresh generation. A write is only
/// committed if its generation is still current, and the check happens under the same
/// lock [`GenerationGate::advance`] takes, so once `advance` returns no write from an
/// older generation can land.
pub(crate) struct GenerationGate(RwLock<Gate>);

struct Gate {
    current: u64,
    closed: bool,
}

impl GenerationGate {
    pub(crate) fn new() -> Self { Self(RwLock::new(Gate { current: 0, closed: false })) }

    pub(crate) fn current(&self) -> u64 { self.0.read().expect("generation lock poisoned").current }

    /// Starts a new generation, waiting out writes in flight for the old one
    pub(crate) fn advance(&self) -> u64 {
        let mut gate = self.0.write().expect("generation lock poisoned");
        gate.current += 1;
        gate.current
    }

    /// Refuses writes from every generation, forever
    pub(crate) fn close(&self) {
        let mut gate = self.0.write().expect("generation lock poisoned");
        gate.current += 1;
        gate.closed = true;
    }

    /// Runs `write` if `generation` is still current
    pub(crate) fn run<R>(&self, generation: u64, write: impl FnOnce() -> R) -> Option<R> {
        let gate = self.0.read().expect("generation lock poisoned");
        if gate.closed || gate.current != generation {
            return None;
        }
        Some(write())
    }
}
