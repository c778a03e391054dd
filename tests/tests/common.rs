use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{Stream, StreamExt, stream};
use tokio::sync::Notify;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().try_init(); }

/// Lets spawned tasks (the activation driver, merged producers) catch up with the test
#[allow(unused)]
pub async fn settle() { tokio::time::sleep(Duration::from_millis(1)).await }

/// Emits `items` one at a time, sleeping `every` before each
#[allow(unused)]
pub fn paced<I>(items: I, every: Duration) -> impl Stream<Item = I::Item> + Send + 'static
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    stream::iter(items).then(move |item| async move {
        tokio::time::sleep(every).await;
        item
    })
}

/// Never ends: 0, 1, 2, ... with `every` between ticks
#[allow(unused)]
pub fn ticker(every: Duration) -> impl Stream<Item = u64> + Send + 'static {
    stream::unfold(0u64, move |tick| async move {
        tokio::time::sleep(every).await;
        Some((tick, tick + 1))
    })
}

/// Collects the values handed to a listener
#[derive(Clone)]
pub struct StateWatcher<T> {
    values: Arc<Mutex<Vec<T>>>,
    notify: Arc<Notify>,
}

#[allow(unused)]
impl<T: Clone + Send + 'static> StateWatcher<T> {
    pub fn new() -> Self { Self { values: Arc::new(Mutex::new(Vec::new())), notify: Arc::new(Notify::new()) } }

    /// A listener suitable for `subscribe`
    pub fn listener(&self) -> impl Fn(T) + Send + Sync + use<T> {
        let watcher = self.clone();
        move |value| watcher.notify(value)
    }

    pub fn notify(&self, value: T) {
        self.values.lock().unwrap().push(value);
        self.notify.notify_waiters();
    }

    pub fn count(&self) -> usize { self.values.lock().unwrap().len() }

    /// Takes (empties and returns) all accumulated values
    pub fn drain(&self) -> Vec<T> { self.values.lock().unwrap().drain(..).collect() }

    /// Wait for at least `count` values to accumulate, then drain and return all of them
    pub async fn take_when(&self, count: usize) -> Vec<T> {
        self.wait_for_count(count, Duration::from_secs(10)).await;
        self.drain()
    }

    /// Waits 100ms for any additional values, then returns the count (useful for asserting quiescence)
    pub async fn quiesce(&self) -> usize {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.count()
    }

    pub async fn wait_for_count(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                // registered before checking, so a notify between the check and the await is not lost
                notified.as_mut().enable();
                if self.count() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}
