//! Lifecycle events and the bus that distributes them

mod bus;
mod record;

pub use bus::EventBus;
pub use record::{EventKind, EventRecord, EventScope};
