use std::future::Future;
use std::sync::{
    Arc, Mutex, Weak,
    atomic::{AtomicBool, Ordering},
};

use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

use crate::error::ScopeError;

/// Something owned by a scope that must be torn down with it
pub(crate) trait Dispose: Send + Sync {
    fn dispose(&self);
}

/// The owning scope containers submit their background work to.
///
/// Wraps a tokio runtime handle. Every task spawned through the scope is tracked, and
/// [`Scope::cancel`] aborts all of them and disposes every container built on the scope.
/// Once cancelled, further spawns fail with [`ScopeError::Cancelled`].
///
/// Cloning a `Scope` shares the same task set.
#[derive(Clone)]
pub struct Scope(Arc<Inner>);

struct Inner {
    handle: Handle,
    cancelled: AtomicBool,
    tasks: Mutex<Vec<AbortHandle>>,
    owned: Mutex<Vec<Weak<dyn Dispose>>>,
}

/// Handle to a task spawned on a [`Scope`]. Aborts the task when dropped.
#[must_use = "the task is aborted as soon as the handle is dropped"]
pub struct TaskHandle(JoinHandle<()>);

impl Scope {
    pub fn new(handle: Handle) -> Self {
        Self(Arc::new(Inner { handle, cancelled: AtomicBool::new(false), tasks: Mutex::new(Vec::new()), owned: Mutex::new(Vec::new()) }))
    }

    /// A scope on the runtime the caller is running in
    pub fn current() -> Result<Self, ScopeError> { Handle::try_current().map(Self::new).map_err(|_| ScopeError::NoRuntime) }

    pub fn spawn<F>(&self, future: F) -> Result<TaskHandle, ScopeError>
    where F: Future<Output = ()> + Send + 'static {
        let mut tasks = self.0.tasks.lock().expect("tasks lock poisoned");
        // checked under the lock so a concurrent cancel cannot miss this task
        if self.is_cancelled() {
            return Err(ScopeError::Cancelled);
        }
        tasks.retain(|task| !task.is_finished());
        let handle = self.0.handle.spawn(future);
        tasks.push(handle.abort_handle());
        Ok(TaskHandle(handle))
    }

    /// Aborts every task spawned on this scope and disposes the containers it owns.
    /// Idempotent.
    pub fn cancel(&self) {
        let tasks = {
            let mut tasks = self.0.tasks.lock().expect("tasks lock poisoned");
            if self.0.cancelled.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *tasks)
        };
        let owned = std::mem::take(&mut *self.0.owned.lock().expect("owned lock poisoned"));
        debug!("scope cancelled, aborting {} tasks and disposing {} containers", tasks.len(), owned.len());

        for owned in owned {
            if let Some(owned) = owned.upgrade() {
                owned.dispose();
            }
        }
        for task in tasks {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::SeqCst) }

    /// Number of spawned tasks that have not finished yet
    pub fn running_tasks(&self) -> usize { self.0.tasks.lock().expect("tasks lock poisoned").iter().filter(|task| !task.is_finished()).count() }

    /// Registers something to dispose when the scope is cancelled
    pub(crate) fn adopt(&self, owned: Weak<dyn Dispose>) -> Result<(), ScopeError> {
        let mut all = self.0.owned.lock().expect("owned lock poisoned");
        if self.is_cancelled() {
            return Err(ScopeError::Cancelled);
        }
        all.retain(|owned| owned.strong_count() > 0);
        all.push(owned);
        Ok(())
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("cancelled", &self.is_cancelled()).field("running_tasks", &self.running_tasks()).finish()
    }
}

impl TaskHandle {
    pub fn abort(&self) { self.0.abort(); }

    pub fn is_finished(&self) -> bool { self.0.is_finished() }
}

impl Drop for TaskHandle {
    fn drop(&mut self) { self.0.abort(); }
}
