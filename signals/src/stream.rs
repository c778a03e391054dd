use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::broadcast::{Broadcast, ListenerGuard};

/// A live stream of values: the value current at attach time, then every value
/// sent afterwards, in send order. Dropping the stream unregisters it.
///
/// Nothing is conflated. Values sent faster than the stream is polled are queued without
/// bound, so a stream that is kept but never polled holds every value sent since attach.
pub struct ValueStream<T> {
    rx: UnboundedReceiver<T>,
    _guard: ListenerGuard<T>,
}

impl<T: Send + 'static> ValueStream<T> {
    /// Registers on `broadcast` with `current` queued as the first item.
    ///
    /// The caller must hold whatever lock serializes sends on `broadcast` while
    /// calling this, otherwise a concurrent send could land before `current`.
    pub fn attach(broadcast: &Broadcast<T>, current: T) -> Self {
        let (tx, rx): (UnboundedSender<T>, _) = unbounded_channel();
        // the receiver is alive, so this cannot fail
        let _ = tx.send(current);
        let _guard = broadcast.listen(tx);
        Self { rx, _guard }
    }
}

impl<T> Stream for ValueStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> { self.rx.poll_recv(cx) }
}

impl<T> std::fmt::Debug for ValueStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("ValueStream").finish_non_exhaustive() }
}
