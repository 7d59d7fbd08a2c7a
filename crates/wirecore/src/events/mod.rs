// crates/wirecore/src/events/mod.rs

mod bus;
mod observer;

pub use bus::{EventBus, ExecutionEvent};
pub use observer::{ExecutionObserver, FnObserver};
