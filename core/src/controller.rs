use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::StreamExt;
use mergeflow_signals::{Mut, Read, ValueStream};
use tracing::{debug, error, warn};

use crate::{
    context::StateContext,
    error::{ProducerError, ScopeError},
    generation::GenerationGate,
    policy::ActivationPolicy,
    producer::{self, ProducerFactory},
    scope::{Dispose, Scope, TaskHandle},
};

/// Where a container's producers are in their lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No merged task is running
    Idle,
    /// The merged task is running.
    ///
    /// Under [`ActivationPolicy::WhileSubscribed`] this also covers a generation that drained
    /// by itself while subscribers remain: the phase stays `Active` without a running task
    /// until the last subscriber leaves, and the usual stop path then returns it to `Idle`.
    Active,
    /// The last subscriber left; the task keeps running until the stop delay elapses
    PendingStop,
    /// An eager or lazy activation drained all of its producers
    Completed,
    /// A producer failed. Producers are never restarted after this.
    Failed,
    /// The container was disposed
    Disposed,
}

impl Phase {
    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool { matches!(self, Phase::Completed | Phase::Failed | Phase::Disposed) }
}

/// Starts and stops the merged producer task according to an [`ActivationPolicy`],
/// driven by subscriber count changes.
///
/// All transitions happen under one lock, so the machine below is the only place that
/// decides whether producers run. At most one merged task exists at any time.
///
/// The phase and failure signals are published after the lock is released, in transition
/// order, so their listeners may call back into the controller (for example to dispose it).
pub(crate) struct ActivationController<S> {
    name: Arc<str>,
    policy: ActivationPolicy,
    producers: Arc<[ProducerFactory<S>]>,
    state: Mut<S>,
    gate: Arc<GenerationGate>,
    scope: Scope,
    phase: Mut<Phase>,
    failure: Mut<Option<Arc<ProducerError>>>,
    machine: Mutex<Machine>,
}

struct Machine {
    phase: Phase,
    subscribed: bool,
    task: Option<MergedTask>,
    stop_timer: Option<StopTimer>,
    // bumped on every arm and disarm so a timer that fires late is recognised as stale
    timer_epoch: u64,
    driver: Option<TaskHandle>,
    // transitions not yet published to the phase and failure signals
    outbox: Vec<Publish>,
    flushing: bool,
}

enum Publish {
    Phase(Phase),
    Failure(Arc<ProducerError>),
}

struct MergedTask {
    generation: u64,
    _handle: TaskHandle,
}

struct StopTimer {
    epoch: u64,
    _handle: TaskHandle,
}

impl<S: Clone + Send + Sync + 'static> ActivationController<S> {
    pub(crate) fn new(name: Arc<str>, policy: ActivationPolicy, producers: Vec<ProducerFactory<S>>, state: Mut<S>, scope: Scope) -> Arc<Self> {
        Arc::new(Self {
            name,
            policy,
            producers: producers.into(),
            state,
            gate: Arc::new(GenerationGate::new()),
            scope,
            phase: Mut::new(Phase::Idle),
            failure: Mut::new(None),
            machine: Mutex::new(Machine {
                phase: Phase::Idle,
                subscribed: false,
                task: None,
                stop_timer: None,
                timer_epoch: 0,
                driver: None,
                outbox: Vec::new(),
                flushing: false,
            }),
        })
    }

    /// Eager policies activate right away. The others start a driver that feeds
    /// subscriber counts into the machine.
    pub(crate) fn start(self: &Arc<Self>, mut counts: ValueStream<usize>) -> Result<(), ScopeError> {
        if let ActivationPolicy::Eager = self.policy {
            let mut machine = self.lock();
            self.activate(&mut machine);
            self.release(machine);
            return Ok(());
        }

        let controller = Arc::downgrade(self);
        let driver = self.scope.spawn(async move {
            while let Some(count) = counts.next().await {
                match controller.upgrade() {
                    Some(controller) => controller.on_count(count),
                    None => break,
                }
            }
        })?;

        let mut machine = self.lock();
        if machine.phase != Phase::Disposed {
            machine.driver = Some(driver);
        }
        Ok(())
    }

    /// Feeds one subscriber count snapshot into the machine
    pub(crate) fn on_count(self: &Arc<Self>, count: usize) {
        let mut machine = self.lock();
        let subscribed = count > 0;
        if subscribed == machine.subscribed {
            return;
        }
        machine.subscribed = subscribed;

        match (self.policy, machine.phase, subscribed) {
            (_, phase, _) if phase.is_terminal() => {}
            (ActivationPolicy::Eager, _, _) => {}
            (ActivationPolicy::Lazy, Phase::Idle, true) => {
                debug!("{}: first subscriber arrived", self.name);
                self.activate(&mut machine);
            }
            // once a lazy container is active it runs to completion
            (ActivationPolicy::Lazy, _, _) => {}
            (ActivationPolicy::WhileSubscribed { .. }, Phase::Idle, true) => self.activate(&mut machine),
            (ActivationPolicy::WhileSubscribed { stop_delay }, Phase::Active, false) => self.arm_stop(&mut machine, stop_delay),
            (ActivationPolicy::WhileSubscribed { .. }, Phase::PendingStop, true) => {
                machine.timer_epoch += 1;
                machine.stop_timer = None;
                debug!("{}: subscriber returned within the stop delay, generation {} keeps running", self.name, self.gate.current());
                self.set_phase(&mut machine, Phase::Active);
            }
            _ => {}
        }
        self.release(machine);
    }

    fn activate(self: &Arc<Self>, machine: &mut Machine) {
        let generation = self.gate.advance();
        let context = StateContext::new(self.state.clone(), self.gate.clone(), generation);
        let work = producer::merge(self.producers.clone(), context);
        let controller = Arc::downgrade(self);

        let spawned = self.scope.spawn(async move {
            let result = work.await;
            if let Some(controller) = controller.upgrade() {
                controller.on_drained(generation, result);
            }
        });

        match spawned {
            Ok(handle) => {
                debug!("{}: generation {} started with {} producers", self.name, generation, self.producers.len());
                machine.task = Some(MergedTask { generation, _handle: handle });
                self.set_phase(machine, Phase::Active);
            }
            Err(e) => {
                warn!("{}: could not start generation {}: {}", self.name, generation, e);
                self.gate.advance();
                self.set_phase(machine, Phase::Idle);
            }
        }
    }

    fn arm_stop(self: &Arc<Self>, machine: &mut Machine, stop_delay: Duration) {
        machine.timer_epoch += 1;
        let epoch = machine.timer_epoch;
        let controller = Arc::downgrade(self);

        let spawned = self.scope.spawn(async move {
            tokio::time::sleep(stop_delay).await;
            if let Some(controller) = controller.upgrade() {
                controller.on_stop_timer(epoch);
            }
        });

        match spawned {
            Ok(handle) => {
                debug!("{}: last subscriber left, stopping in {:?}", self.name, stop_delay);
                machine.stop_timer = Some(StopTimer { epoch, _handle: handle });
                self.set_phase(machine, Phase::PendingStop);
            }
            Err(e) => {
                warn!("{}: could not arm stop timer, stopping now: {}", self.name, e);
                self.stop(machine);
            }
        }
    }

    fn on_stop_timer(&self, epoch: u64) {
        let mut machine = self.lock();
        let armed = machine.stop_timer.as_ref().map(|timer| timer.epoch);
        if machine.phase != Phase::PendingStop || armed != Some(epoch) {
            return;
        }
        machine.stop_timer = None;
        self.stop(&mut machine);
        self.release(machine);
    }

    fn stop(&self, machine: &mut Machine) {
        let stopped = self.gate.current();
        self.gate.advance();
        machine.task = None;
        debug!("{}: generation {} stopped", self.name, stopped);
        self.set_phase(machine, Phase::Idle);
    }

    fn on_drained(&self, generation: u64, result: Result<(), ProducerError>) {
        let mut machine = self.lock();
        if machine.task.as_ref().map(|task| task.generation) != Some(generation) {
            return;
        }
        machine.task = None;

        match result {
            Ok(()) => {
                debug!("{}: generation {} drained", self.name, generation);
                if !matches!(self.policy, ActivationPolicy::WhileSubscribed { .. }) {
                    self.set_phase(&mut machine, Phase::Completed);
                }
            }
            Err(failure) => {
                error!("{}: generation {} failed: {}", self.name, generation, failure);
                self.gate.advance();
                machine.timer_epoch += 1;
                machine.stop_timer = None;
                machine.outbox.push(Publish::Failure(Arc::new(failure)));
                self.set_phase(&mut machine, Phase::Failed);
            }
        }
        self.release(machine);
    }
}

impl<S> ActivationController<S> {
    pub(crate) fn phase(&self) -> Phase { self.lock().phase }

    pub(crate) fn activation(&self) -> Read<Phase> { self.phase.read() }

    pub(crate) fn failure(&self) -> Read<Option<Arc<ProducerError>>> { self.failure.read() }

    /// Cancels the merged task and the stop timer. Idempotent and synchronous: no producer
    /// write is committed after this returns.
    pub(crate) fn dispose(&self) {
        let mut machine = self.lock();
        if machine.phase == Phase::Disposed {
            return;
        }
        self.gate.close();
        machine.task = None;
        machine.stop_timer = None;
        machine.driver = None;
        debug!("{}: disposed", self.name);
        self.set_phase(&mut machine, Phase::Disposed);
        self.release(machine);
    }

    fn set_phase(&self, machine: &mut Machine, phase: Phase) {
        if machine.phase != phase {
            machine.phase = phase;
            machine.outbox.push(Publish::Phase(phase));
        }
    }

    /// Unlocks the machine and publishes its pending transitions.
    ///
    /// Only one caller publishes at a time. A transition made while another caller is
    /// publishing (including one made by a listener on this thread) is left in the outbox
    /// for that caller, which keeps going until the outbox is empty.
    fn release<'a>(&'a self, mut machine: MutexGuard<'a, Machine>) {
        if machine.flushing {
            return;
        }
        machine.flushing = true;
        loop {
            let pending = std::mem::take(&mut machine.outbox);
            if pending.is_empty() {
                machine.flushing = false;
                return;
            }
            drop(machine);
            for publish in pending {
                match publish {
                    Publish::Phase(phase) => self.phase.set(phase),
                    Publish::Failure(failure) => self.failure.set(Some(failure)),
                }
            }
            machine = self.lock();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Machine> { self.machine.lock().expect("activation lock poisoned") }
}

impl<S: Send + Sync> Dispose for ActivationController<S> {
    fn dispose(&self) { ActivationController::dispose(self) }
}
