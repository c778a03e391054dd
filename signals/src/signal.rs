pub mod mutable;
pub mod read;

pub use mutable::*;
pub use read::*;

/// A value together with the number of commits that produced it
pub(crate) struct Versioned<T> {
    pub(crate) value: T,
    pub(crate) version: u64,
}
