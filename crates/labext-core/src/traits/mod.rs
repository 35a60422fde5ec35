//! Contracts shared between the core and the hook engine.

pub mod event;

pub use event::{Event, EventArgs, EventType};
