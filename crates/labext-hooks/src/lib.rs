//! # labext-hooks
//!
//! Hook dispatch core for LabExtended. Provides:
//!
//! - Handler descriptors with priority, argument binder, and runner
//! - Event-type resolution from explicit overrides, signatures, or the event catalog
//! - A priority-ordered registry with duplicate and extreme-slot guards
//! - A dispatcher with failure isolation and permit/deny aggregation
//! - A cooperative tick scheduler for coroutine handlers
//! - Module discovery and lifecycle management

pub mod catalog;
pub mod coroutine;
pub mod delegate;
pub mod discovery;
pub mod error;
pub mod hooks;
pub mod instance;
pub mod manager;
pub mod module;
pub mod prelude;

pub use catalog::EventCatalog;
pub use coroutine::{CoroutineHandle, Routine, Step, TickReport, TickScheduler};
pub use delegate::Delegate;
pub use error::{DiscoveryError, InvocationError, RegistrationError};
pub use hooks::callable::{Callable, CallableId, Cancellation};
pub use hooks::dispatcher::{DispatchResult, HookDispatcher};
pub use hooks::marker::HookMarker;
pub use hooks::priority::HookPriority;
pub use hooks::registry::{HookRegistry, RegistrationReport};
pub use instance::InstanceToken;
pub use manager::ModuleManager;
pub use module::{HookModule, ModuleInfo};
