use futures::StreamExt;

use super::Observe;

/// Trait for waiting on signal values asynchronously
pub trait Wait<T: 'static> {
    /// Wait for the value to equal `target`
    fn wait_value(&self, target: T) -> impl std::future::Future<Output = ()> + Send
    where T: PartialEq + Send + Sync;

    /// Wait for the value to satisfy `predicate`
    fn wait_for<F, R>(&self, predicate: F) -> impl std::future::Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync,
        R: WaitResult,
        R::Output: Send;
}

/// Helper trait for `wait_for` to allow flexible predicate return types.
///
/// ## Semantics
/// - `result()` returns `Some(output)` to stop waiting and return `output`
/// - `result()` returns `None` to continue waiting for the next value
pub trait WaitResult {
    type Output;
    fn result(self) -> Option<Self::Output>;
}

impl WaitResult for bool {
    type Output = ();
    fn result(self) -> Option<()> { if self { Some(()) } else { None } }
}

impl<T> WaitResult for Option<T> {
    type Output = T;
    fn result(self) -> Option<T> { self }
}

/// Waiting observes the source, so it counts as an observer for as long as it is pending.
/// If the source's stream ends without a match the future never resolves.
impl<T, S> Wait<T> for S
where
    S: Observe<T> + Sync,
    T: Send + 'static,
{
    fn wait_value(&self, target: T) -> impl std::future::Future<Output = ()> + Send
    where T: PartialEq + Send + Sync {
        self.wait_for(move |value| *value == target)
    }

    fn wait_for<F, R>(&self, predicate: F) -> impl std::future::Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync,
        R: WaitResult,
        R::Output: Send,
    {
        let mut stream = self.observe();
        async move {
            while let Some(value) = stream.next().await {
                if let Some(output) = predicate(&value).result() {
                    return output;
                }
            }
            std::future::pending().await
        }
    }
}
