use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::{broadcast::Broadcast, stream::ValueStream};

/// Counts the observers currently attached to something.
///
/// Every change is published on one broadcast while the count lock is held, so all
/// readers of [`SubscriberCount::changes`] see the same sequence of counts.
#[derive(Clone)]
pub struct SubscriberCount(Arc<Inner>);

struct Inner {
    count: Mutex<usize>,
    broadcast: Broadcast<usize>,
}

/// Keeps one observer attached. Detaches on drop.
#[must_use = "the observer detaches as soon as the handle is dropped"]
pub struct ObserverHandle {
    inner: Option<Weak<Inner>>,
}

impl Default for SubscriberCount {
    fn default() -> Self { Self::new() }
}

impl SubscriberCount {
    pub fn new() -> Self { Self(Arc::new(Inner { count: Mutex::new(0), broadcast: Broadcast::new() })) }

    /// Registers an observer
    pub fn attach(&self) -> ObserverHandle {
        let mut count = self.0.count.lock().expect("count lock poisoned");
        *count += 1;
        trace!("observer attached, {} attached", *count);
        self.0.broadcast.send(*count);
        ObserverHandle { inner: Some(Arc::downgrade(&self.0)) }
    }

    pub fn count(&self) -> usize { *self.0.count.lock().expect("count lock poisoned") }

    /// Live stream of counts, starting with the current one
    pub fn changes(&self) -> ValueStream<usize> {
        let count = self.0.count.lock().expect("count lock poisoned");
        ValueStream::attach(&self.0.broadcast, *count)
    }
}

impl std::fmt::Debug for SubscriberCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_tuple("SubscriberCount").field(&self.count()).finish() }
}

impl Inner {
    fn detach(&self) {
        let mut count = self.count.lock().expect("count lock poisoned");
        // a handle only exists for a prior attach, so this never underflows
        *count -= 1;
        trace!("observer detached, {} attached", *count);
        self.broadcast.send(*count);
    }
}

impl ObserverHandle {
    /// Detaches the observer. Calling this more than once is a no-op.
    pub fn detach(&mut self) {
        if let Some(inner) = self.inner.take().and_then(|weak| weak.upgrade()) {
            inner.detach();
        }
    }

    pub fn is_attached(&self) -> bool { self.inner.is_some() }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) { self.detach(); }
}
