use crate::Read;

/// Boxed listener used by [`Subscribe`] implementations
pub type SubscribeListener<T> = Box<dyn Fn(T) + Send + Sync + 'static>;

/// Trait for types that can be converted into subscribe listeners
pub trait IntoSubscribeListener<T> {
    fn into_subscribe_listener(self) -> SubscribeListener<T>;
}

/// Trait for subscribing to changes with a listener that receives each new value.
///
/// Implementors document whether the current value is delivered before the first change.
pub trait Subscribe<T: 'static> {
    fn subscribe<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<T>;
}

/// Keeps a subscription alive. Unsubscribes on drop.
#[must_use = "the subscription ends as soon as the guard is dropped"]
pub struct SubscriptionGuard {
    _guard: Box<dyn std::any::Any + Send + Sync>,
}

impl SubscriptionGuard {
    pub fn new<G: Send + Sync + 'static>(guard: G) -> Self { Self { _guard: Box::new(guard) } }
}

/// Listeners are called synchronously on the writing thread and only for changes made
/// after subscribing. A listener may read the signal it is subscribed to but must not
/// write to it or open a stream on it.
impl<T: Clone + Send + Sync + 'static> Subscribe<T> for Read<T> {
    fn subscribe<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<T> {
        let listener = listener.into_subscribe_listener();
        SubscriptionGuard::new(self.broadcast.listen(move |value| listener(value)))
    }
}

impl<T: Send + 'static> IntoSubscribeListener<T> for std::sync::mpsc::Sender<T> {
    fn into_subscribe_listener(self) -> SubscribeListener<T> {
        Box::new(move |value| {
            let _ = self.send(value);
        })
    }
}

impl<T: Send + 'static> IntoSubscribeListener<T> for tokio::sync::mpsc::UnboundedSender<T> {
    fn into_subscribe_listener(self) -> SubscribeListener<T> {
        Box::new(move |value| {
            let _ = self.send(value);
        })
    }
}

impl<F, T> IntoSubscribeListener<T> for F
where F: Fn(T) + Send + Sync + 'static
{
    fn into_subscribe_listener(self) -> SubscribeListener<T> { Box::new(self) }
}
