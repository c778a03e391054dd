use std::sync::{Arc, RwLock};

/// Shared storage for a value. Clones share the same slot.
///
/// Readers borrow the value through a closure; writers get exclusive access for
/// the duration of their closure, which is what makes read-modify-write atomic.
pub struct ValueCell<T>(Arc<RwLock<T>>);

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> ValueCell<T> {
    pub fn new(value: T) -> Self { Self(Arc::new(RwLock::new(value))) }

    /// Calls `f` with a borrow of the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.0.read().expect("value lock poisoned");
        f(&guard)
    }

    /// Calls `f` with exclusive access to the value. No reader or writer can interleave.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.0.write().expect("value lock poisoned");
        f(&mut guard)
    }
}
