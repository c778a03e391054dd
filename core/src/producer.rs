use std::sync::Arc;

use futures::{Stream, StreamExt, TryStreamExt, stream::BoxStream};

use crate::{
    context::StateContext,
    error::{BoxError, ProducerError},
};

type ProducerStream = BoxStream<'static, Result<(), BoxError>>;

/// Builds one producer stream per activation.
///
/// The factory is called each time the container's producers start, with a context for
/// that generation, so a restarted producer begins again from its own initial position.
/// Items the stream yields are discarded after the state folds have run; the stream's
/// job is to drive those folds.
pub struct ProducerFactory<S>(Box<dyn Fn(StateContext<S>) -> ProducerStream + Send + Sync>);

impl<S: Clone + Send + Sync + 'static> ProducerFactory<S> {
    /// A producer that cannot fail
    pub fn new<F, St>(factory: F) -> Self
    where
        F: Fn(StateContext<S>) -> St + Send + Sync + 'static,
        St: Stream + Send + 'static,
    {
        Self(Box::new(move |context: StateContext<S>| factory(context).map(|_| Ok::<(), BoxError>(())).boxed()))
    }

    /// A producer whose stream may end with an error, which stops the container's producers
    pub fn fallible<F, St, T, E>(factory: F) -> Self
    where
        F: Fn(StateContext<S>) -> St + Send + Sync + 'static,
        St: Stream<Item = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self(Box::new(move |context: StateContext<S>| factory(context).map(|item| item.map(|_| ()).map_err(Into::<BoxError>::into)).boxed()))
    }
}

impl<S> std::fmt::Debug for ProducerFactory<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("ProducerFactory") }
}

/// Runs one generation: starts every producer and merges them into a single task.
///
/// Resolves with `Ok` once every source has drained, or with the first failure, which
/// drops (cancels) the remaining sources.
pub(crate) async fn merge<S>(producers: Arc<[ProducerFactory<S>]>, context: StateContext<S>) -> Result<(), ProducerError>
where S: Clone + Send + Sync + 'static {
    let sources = producers.iter().enumerate().map(|(index, producer)| (producer.0)(context.clone()).map_err(move |source| ProducerError { index, source }));
    let mut merged = futures::stream::select_all(sources);
    drop(context);

    while let Some(item) = merged.next().await {
        item?;
    }
    Ok(())
}
