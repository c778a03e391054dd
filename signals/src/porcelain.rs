pub mod subscribe;
pub mod wait;

pub use subscribe::*;
pub use wait::*;

use futures::Stream;

use crate::{Mut, Read, stream::ValueStream};

/// Anything that hands out a replay-latest stream of its values
pub trait Observe<T> {
    type Stream: Stream<Item = T> + Unpin + Send + 'static;

    /// A stream whose first item is the current value, followed by every later value
    fn observe(&self) -> Self::Stream;
}

impl<T: Clone + Send + 'static> Observe<T> for Mut<T> {
    type Stream = ValueStream<T>;
    fn observe(&self) -> ValueStream<T> { self.stream() }
}

impl<T: Clone + Send + 'static> Observe<T> for Read<T> {
    type Stream = ValueStream<T>;
    fn observe(&self) -> ValueStream<T> { self.stream() }
}
