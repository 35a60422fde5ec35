//! # labext-core
//!
//! Core crate for LabExtended. Contains the event-argument contract that
//! replaces runtime reflection, the built-in game event types, configuration
//! schemas, typed identifiers, and the unified error system.
//!
//! This crate has **no** internal dependencies on other LabExtended crates.

pub mod config;
pub mod error;
pub mod events;
pub mod macros;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
pub use traits::event::{Event, EventArgs, EventType};
