use std::sync::{Arc, Mutex};

use crate::{
    broadcast::Broadcast,
    signal::{Read, Versioned},
    stream::ValueStream,
    value::ValueCell,
};

/// Mutable (stateful) signal holding a value that is replaced wholesale on every change.
///
/// All writes go through one exclusive lock, so concurrent [`Mut::update`] calls are
/// linearizable: each transform sees the result of the previous one and no update is lost.
/// Commits and their notifications are serialized by a second lock that is held until
/// every listener has run, which gives every stream the same commit order. The value lock
/// itself is released before listeners run, so a listener may read the signal.
///
/// Cloning a `Mut` shares the underlying value.
pub struct Mut<T> {
    value: ValueCell<Versioned<T>>,
    broadcast: Broadcast<T>,
    sends: Arc<Mutex<()>>,
}

impl<T> Clone for Mut<T> {
    fn clone(&self) -> Self { Self { value: self.value.clone(), broadcast: self.broadcast.clone(), sends: self.sends.clone() } }
}

impl<T: Clone + Send + 'static> Mut<T> {
    pub fn new(value: T) -> Self {
        Self { value: ValueCell::new(Versioned { value, version: 0 }), broadcast: Broadcast::new(), sends: Arc::new(Mutex::new(())) }
    }

    pub fn set(&self, value: T) { self.update(move |_| value); }

    /// Applies `transform` to the current value and commits the result atomically.
    /// Returns the committed value.
    ///
    /// Listeners are called on this thread before `update` returns. They may read this
    /// signal but must not write to it.
    pub fn update<F>(&self, transform: F) -> T
    where F: FnOnce(&T) -> T {
        let _sending = self.sends.lock().expect("send lock poisoned");
        let next = self.value.with_mut(|current| {
            current.value = transform(&current.value);
            current.version += 1;
            current.value.clone()
        });
        self.broadcast.send(next.clone());
        next
    }

    /// Returns a clone of the current value
    pub fn peek(&self) -> T { self.value.with(|current| current.value.clone()) }

    /// Number of commits since construction
    pub fn version(&self) -> u64 { self.value.with(|current| current.version) }

    /// Calls a closure with a borrow of the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { self.value.with(|current| f(&current.value)) }

    /// Replay-latest stream of this signal's values
    pub fn stream(&self) -> ValueStream<T> {
        // no commit can be waiting on its notification while the send lock is held
        let _sending = self.sends.lock().expect("send lock poisoned");
        ValueStream::attach(&self.broadcast, self.peek())
    }

    /// Read-only view downstream of this mutable signal
    pub fn read(&self) -> Read<T> { Read { value: self.value.clone(), broadcast: self.broadcast.clone(), sends: self.sends.clone() } }
}

impl<T: Clone + Send + Default + 'static> Default for Mut<T> {
    fn default() -> Self { Self::new(T::default()) }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Mut<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.with(|current| f.debug_struct("Mut").field("value", &current.value).field("version", &current.version).finish())
    }
}
