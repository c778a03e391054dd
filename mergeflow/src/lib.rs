//! # Mergeflow
//!
//! Reactive state containers whose background producers run only as long as somebody is
//! looking at the state.
//!
//! ## Core Concepts
//!
//! - **Container**: holds a state value and publishes every change to its observers
//! - **Producer**: a stream factory whose emissions are folded into the state
//! - **Activation policy**: decides when producers start and stop (eager, lazy, or while subscribed)
//! - **Scope**: owns the background tasks; cancelling it disposes every container built on it
//! - **Phase**: where a container's producers are in their lifecycle, itself observable
//!
//! ## Example: a clock that only ticks while watched
//!
//! ```rust
//! # use std::time::Duration;
//! # use futures::{StreamExt, stream};
//! use mergeflow::{ActivationPolicy, Container, Phase, Scope, StateContext, Wait};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scope = Scope::current()?;
//! let clock = Container::builder(0u64)
//!     .name("clock")
//!     .policy(ActivationPolicy::while_subscribed(Duration::from_millis(500)))
//!     .producer(|cx: StateContext<u64>| {
//!         let ticks = stream::unfold((), |()| async {
//!             tokio::time::sleep(Duration::from_millis(100)).await;
//!             Some(((), ()))
//!         });
//!         cx.on_each_to_state(ticks, |_, seconds| seconds + 1)
//!     })
//!     .build(&scope)?;
//!
//! // nothing runs until someone observes
//! assert_eq!(clock.phase(), Phase::Idle);
//!
//! // waiting observes the clock, which starts the producer
//! clock.wait_for(|ticks: &u64| *ticks >= 3).await;
//!
//! // once nobody is watching, the producer stops after the grace period
//! let activation = clock.activation();
//! activation.wait_value(Phase::Idle).await;
//! # Ok(())
//! # }
//! ```

pub use mergeflow_core as core;
pub use mergeflow_signals as signals;

// Re-export commonly used types
pub use mergeflow_core::{
    ActivationPolicy, BoxError, Container, ContainerBuilder, ContainerConfig, ContainerError, DEFAULT_STOP_DELAY, Phase, ProducerError,
    ProducerFactory, Scope, ScopeError, StateContext, StateStream, TaskHandle,
};
pub use mergeflow_signals::{Mut, Observe, Read, Subscribe, SubscriptionGuard, Wait, WaitResult};
