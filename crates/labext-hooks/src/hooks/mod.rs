//! Hook system: descriptors, resolution, binding, running, registry, dispatch.

pub mod binder;
pub mod callable;
pub mod descriptor;
pub mod dispatcher;
pub mod marker;
pub mod priority;
pub mod registry;
pub mod resolver;
pub mod runner;

pub use binder::{Binder, EventRef};
pub use callable::{Arguments, Callable, CallableId, Cancellation, HookReturn, IntoHookReturn};
pub use descriptor::{HandlerInfo, HandlerSource, HookDescriptor, RegistrationRequest};
pub use dispatcher::{DispatchResult, HookDispatcher};
pub use marker::HookMarker;
pub use priority::HookPriority;
pub use registry::{HookRegistry, RegistrationReport};
pub use runner::{Outcome, Runner};
