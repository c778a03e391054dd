use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// A listener invoked synchronously for every value sent on a broadcast
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Trait for types that can be converted into broadcast listeners.
pub trait IntoListener<T> {
    fn into_listener(self) -> Listener<T>;
}

/// Synchronous fan-out of values to every registered listener.
///
/// Listeners run on the sending thread, in registration order. Callers that need
/// a total order across senders must serialize their calls to [`Broadcast::send`].
pub struct Broadcast<T>(Arc<Inner<T>>);

struct Inner<T> {
    listeners: RwLock<BTreeMap<usize, Listener<T>>>,
    next_id: AtomicUsize,
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> std::fmt::Debug for Broadcast<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast").field("listeners", &self.listener_count()).finish()
    }
}

impl<T: Clone> Default for Broadcast<T> {
    fn default() -> Self { Self::new() }
}

/// Unregisters its listener when dropped
#[must_use = "the listener is removed as soon as the guard is dropped"]
pub struct ListenerGuard<T> {
    inner: Weak<Inner<T>>,
    id: usize,
}

impl<T: Clone> Broadcast<T> {
    pub fn new() -> Self { Self(Arc::new(Inner { listeners: RwLock::new(BTreeMap::new()), next_id: AtomicUsize::new(0) })) }

    /// Delivers `value` to all listeners registered at the time of the call
    pub fn send(&self, value: T) {
        // Snapshot so listeners may register or drop guards without deadlocking
        let listeners: Vec<Listener<T>> = self.0.listeners.read().expect("listeners lock poisoned").values().cloned().collect();

        if let Some((last, rest)) = listeners.split_last() {
            for listener in rest {
                listener(value.clone());
            }
            last(value);
        }
    }
}

impl<T> Broadcast<T> {
    pub fn listen<L>(&self, listener: L) -> ListenerGuard<T>
    where L: IntoListener<T> {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0.listeners.write().expect("listeners lock poisoned").insert(id, listener.into_listener());
        ListenerGuard { inner: Arc::downgrade(&self.0), id }
    }

    pub fn listener_count(&self) -> usize { self.0.listeners.read().expect("listeners lock poisoned").len() }
}

impl<T> Drop for ListenerGuard<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.write().expect("listeners lock poisoned").remove(&self.id);
        }
    }
}

impl<F, T> IntoListener<T> for F
where F: Fn(T) + Send + Sync + 'static
{
    fn into_listener(self) -> Listener<T> { Arc::new(self) }
}

// Receivers that went away are simply skipped
impl<T> IntoListener<T> for tokio::sync::mpsc::UnboundedSender<T>
where T: Send + 'static
{
    fn into_listener(self) -> Listener<T> {
        Arc::new(move |value| {
            let _ = self.send(value);
        })
    }
}
