use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use mergeflow_signals::{IntoSubscribeListener, Mut, Observe, ObserverHandle, Read, Subscribe, SubscriberCount, SubscriptionGuard, ValueStream};
use tracing::{debug, warn};

use crate::{
    context::StateContext,
    controller::{ActivationController, Phase},
    error::{BoxError, ContainerError, ProducerError},
    policy::{ActivationPolicy, ContainerConfig},
    producer::ProducerFactory,
    scope::{Dispose, Scope},
};

const DEFAULT_NAME: &str = "container";

/// A reactive state container whose producers run according to an [`ActivationPolicy`].
///
/// The container owns a state value, a set of producers that fold their emissions into
/// that state, and an activation controller that starts and stops the producers based on
/// how many observers are attached. Every [`Container::observe`] stream (and every
/// [`Subscribe::subscribe`] or [`mergeflow_signals::Wait`] call) counts as one observer
/// for as long as it lives.
///
/// Cloning a `Container` shares it. The container is disposed when it is explicitly
/// disposed, when its [`Scope`] is cancelled, or when the last clone is dropped.
pub struct Container<S>(Arc<Inner<S>>);

struct Inner<S> {
    name: Arc<str>,
    state: Mut<S>,
    observers: SubscriberCount,
    controller: Arc<ActivationController<S>>,
    scope: Scope,
}

impl<S> Clone for Container<S> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<S: Clone + Send + Sync + 'static> Container<S> {
    /// Creates a container and starts its activation controller on `scope`.
    /// With [`ActivationPolicy::Eager`] the producers start before this returns.
    pub fn new(initial: S, policy: ActivationPolicy, producers: Vec<ProducerFactory<S>>, scope: &Scope) -> Result<Self, ContainerError> {
        Self::build(DEFAULT_NAME.into(), initial, policy, producers, scope)
    }

    pub fn builder(initial: S) -> ContainerBuilder<S> { ContainerBuilder::new(initial) }

    fn build(name: Arc<str>, initial: S, policy: ActivationPolicy, producers: Vec<ProducerFactory<S>>, scope: &Scope) -> Result<Self, ContainerError> {
        let state = Mut::new(initial);
        let observers = SubscriberCount::new();
        debug!("{}: created with {} producers, policy {:?}", name, producers.len(), policy);
        let controller = ActivationController::new(name.clone(), policy, producers, state.clone(), scope.clone());

        let owned: Weak<dyn Dispose> = Arc::downgrade(&controller) as Weak<dyn Dispose>;
        scope.adopt(owned)?;
        if let Err(e) = controller.start(observers.changes()) {
            controller.dispose();
            return Err(e.into());
        }

        Ok(Self(Arc::new(Inner { name, state, observers, controller, scope: scope.clone() })))
    }

    pub fn name(&self) -> &str { &self.0.name }

    /// Snapshot of the current state
    pub fn state(&self) -> S { self.0.state.peek() }

    /// Number of state commits since construction
    pub fn version(&self) -> u64 { self.0.state.version() }

    /// Attaches an observer and returns its stream of states: the current state first,
    /// then every committed state in commit order. The observer detaches when the stream
    /// is dropped.
    ///
    /// States are never conflated. A slow consumer's stream buffers every commit it has not
    /// yet read, without bound, and a stream that is held but not polled still counts as an
    /// observer (keeping the producers running). Drop streams you stop reading, or read
    /// [`Container::state`] for the latest value only.
    pub fn observe(&self) -> StateStream<S> {
        let observer = self.0.observers.attach();
        StateStream { values: self.0.state.stream(), _observer: observer }
    }

    /// Atomically applies `transform` to the state and returns the committed state.
    ///
    /// Usable from any thread at any time, including while producers run or after disposal.
    pub fn update<F>(&self, transform: F) -> S
    where F: FnOnce(&S) -> S {
        self.0.state.update(transform)
    }

    pub fn subscriber_count(&self) -> usize { self.0.observers.count() }

    /// Where the producers are in their lifecycle
    pub fn phase(&self) -> Phase { self.0.controller.phase() }

    /// Observable view of [`Container::phase`]
    pub fn activation(&self) -> Read<Phase> { self.0.controller.activation() }

    /// The producer failure that ended activation, if any
    pub fn failure(&self) -> Option<Arc<ProducerError>> { self.0.controller.failure().peek() }

    /// Observable view of [`Container::failure`]
    pub fn failures(&self) -> Read<Option<Arc<ProducerError>>> { self.0.controller.failure() }

    /// Stops the producers for good. The state stays readable and writable through
    /// [`Container::update`]. Idempotent.
    pub fn dispose(&self) { self.0.controller.dispose() }

    pub fn is_disposed(&self) -> bool { self.phase() == Phase::Disposed }
}

impl<S> Drop for Inner<S> {
    fn drop(&mut self) { self.controller.dispose() }
}

impl<S: std::fmt::Debug + Clone + Send + Sync + 'static> std::fmt::Debug for Container<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.0.name)
            .field("state", &self.state())
            .field("phase", &self.phase())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A container's state stream. Holds one observer slot until dropped.
pub struct StateStream<S> {
    values: ValueStream<S>,
    _observer: ObserverHandle,
}

impl<S> Stream for StateStream<S> {
    type Item = S;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S>> { self.values.poll_next_unpin(cx) }
}

impl<S> std::fmt::Debug for StateStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("StateStream").finish_non_exhaustive() }
}

impl<S: Clone + Send + Sync + 'static> Observe<S> for Container<S> {
    type Stream = StateStream<S>;
    fn observe(&self) -> StateStream<S> { Container::observe(self) }
}

/// The listener receives the current state first, then every change, on a task spawned
/// on the container's scope. The subscription counts as an observer until the guard drops.
impl<S: Clone + Send + Sync + 'static> Subscribe<S> for Container<S> {
    fn subscribe<F>(&self, listener: F) -> SubscriptionGuard
    where F: IntoSubscribeListener<S> {
        let listener = listener.into_subscribe_listener();
        let mut states = self.observe();
        let spawned = self.0.scope.spawn(async move {
            while let Some(state) = states.next().await {
                listener(state);
            }
        });

        match spawned {
            Ok(task) => SubscriptionGuard::new(task),
            Err(e) => {
                warn!("{}: subscription not started: {}", self.0.name, e);
                SubscriptionGuard::new(())
            }
        }
    }
}

/// Assembles a [`Container`] step by step
pub struct ContainerBuilder<S> {
    initial: S,
    name: Option<String>,
    policy: ActivationPolicy,
    producers: Vec<ProducerFactory<S>>,
}

impl<S: Clone + Send + Sync + 'static> ContainerBuilder<S> {
    fn new(initial: S) -> Self { Self { initial, name: None, policy: ActivationPolicy::default(), producers: Vec::new() } }

    pub fn policy(mut self, policy: ActivationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Applies a loaded [`ContainerConfig`]. A config without a name keeps the current one.
    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.policy = config.policy;
        if config.name.is_some() {
            self.name = config.name;
        }
        self
    }

    /// Adds an infallible producer
    pub fn producer<F, St>(self, factory: F) -> Self
    where
        F: Fn(StateContext<S>) -> St + Send + Sync + 'static,
        St: Stream + Send + 'static,
    {
        self.factory(ProducerFactory::new(factory))
    }

    /// Adds a producer whose errors end activation
    pub fn try_producer<F, St, T, E>(self, factory: F) -> Self
    where
        F: Fn(StateContext<S>) -> St + Send + Sync + 'static,
        St: Stream<Item = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.factory(ProducerFactory::fallible(factory))
    }

    pub fn factory(mut self, factory: ProducerFactory<S>) -> Self {
        self.producers.push(factory);
        self
    }

    pub fn build(self, scope: &Scope) -> Result<Container<S>, ContainerError> {
        let name: Arc<str> = self.name.as_deref().unwrap_or(DEFAULT_NAME).into();
        Container::build(name, self.initial, self.policy, self.producers, scope)
    }
}
