/*!
Reactive primitives for mergeflow.

# Design requirements:
- Writers and readers are different types: [`Mut`] writes, [`Read`] only reads.
- A value is replaced wholesale on every change, never mutated in place by readers.
- All writes to one value are linearizable; listeners observe commits in commit order.
- Streams are replay-latest: the first item is the value at attach time.
- Observer presence is countable ([`SubscriberCount`]), so owners can react to it.

# Nomenclature:
- `observe` / `stream` - replay-latest async stream of values
- `subscribe` - closure listener; each implementor documents whether the current value is delivered first
- `attach` / `detach` - register or release one observer on a [`SubscriberCount`]

# Basic usage

```rust
use mergeflow_signals::*;

let counter = Mut::new(0);
let read = counter.read();
let _guard = read.subscribe(|value: i32| println!("changed to {value}"));

assert_eq!(counter.update(|v| v + 1), 1);
assert_eq!(read.peek(), 1);
assert_eq!(read.version(), 1);
```

# Observer counting

```rust
use mergeflow_signals::*;

let observers = SubscriberCount::new();
let first = observers.attach();
let mut second = observers.attach();
assert_eq!(observers.count(), 2);

second.detach();
second.detach(); // idempotent
drop(first);
assert_eq!(observers.count(), 0);
```
*/

pub mod broadcast;
pub mod porcelain;
pub mod signal;
pub mod stream;
pub mod subscription;
pub mod value;

pub use porcelain::*;
pub use signal::*;
pub use stream::ValueStream;
pub use subscription::*;
