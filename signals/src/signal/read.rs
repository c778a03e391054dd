use std::sync::{Arc, Mutex};

use crate::{broadcast::Broadcast, signal::Versioned, stream::ValueStream, value::ValueCell};

/// Read-only signal sharing storage with a [`crate::Mut`]
pub struct Read<T> {
    pub(crate) value: ValueCell<Versioned<T>>,
    pub(crate) broadcast: Broadcast<T>,
    pub(crate) sends: Arc<Mutex<()>>,
}

impl<T> Clone for Read<T> {
    fn clone(&self) -> Self { Self { value: self.value.clone(), broadcast: self.broadcast.clone(), sends: self.sends.clone() } }
}

impl<T: Clone + Send + 'static> Read<T> {
    pub fn peek(&self) -> T { self.value.with(|current| current.value.clone()) }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { self.value.with(|current| f(&current.value)) }

    pub fn version(&self) -> u64 { self.value.with(|current| current.version) }

    pub fn stream(&self) -> ValueStream<T> {
        let _sending = self.sends.lock().expect("send lock poisoned");
        ValueStream::attach(&self.broadcast, self.peek())
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Read<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.value.with(|current| write!(f, "{}", current.value)) }
}
