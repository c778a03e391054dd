//! Lifecycle-aware state containers.
//!
//! A [`Container`] holds a state value and a set of producers. Each producer is a stream
//! factory whose emissions are folded into the state through a [`StateContext`]. When the
//! producers run is decided by the container's [`ActivationPolicy`]:
//!
//! * [`ActivationPolicy::Eager`] starts them at construction.
//! * [`ActivationPolicy::Lazy`] starts them on the first observer and lets them run to completion.
//! * [`ActivationPolicy::WhileSubscribed`] runs them while anyone observes the state, and stops
//!   them once the last observer has been gone for the stop delay. An observer that returns
//!   within the delay keeps the running producers; nothing restarts.
//!
//! All producers of one activation run merged in a single task on the container's [`Scope`].
//! Every state change, whether it comes from a producer or from [`Container::update`], is an
//! atomic read-modify-write, and all observers see changes in one commit order.

pub mod container;
pub mod context;
pub mod controller;
pub mod error;
mod generation;
pub mod policy;
pub mod producer;
pub mod scope;

pub use container::{Container, ContainerBuilder, StateStream};
pub use context::StateContext;
pub use controller::Phase;
pub use error::{BoxError, ContainerError, ProducerError, ScopeError};
pub use policy::{ActivationPolicy, ContainerConfig, DEFAULT_STOP_DELAY};
pub use producer::ProducerFactory;
pub use scope::{Scope, TaskHandle};
