use thiserror::Error;

/// Error type producers may fail with
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A producer's stream ended with an error.
///
/// Fatal to the generation it happened in: the merged task ends and the container's
/// controller stops for good. Retrying is up to the producer itself.
#[derive(Debug, Error)]
#[error("producer {index} failed: {source}")]
pub struct ProducerError {
    /// Position of the failed producer in registration order
    pub index: usize,
    pub source: BoxError,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    #[error("scope has been cancelled")]
    Cancelled,
    #[error("no tokio runtime is running on this thread")]
    NoRuntime,
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("failed to start activation controller: {0}")]
    Scope(#[from] ScopeError),
}
