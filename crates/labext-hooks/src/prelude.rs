//! Common imports for module authors.

pub use labext_core::{Event, EventArgs, EventType};

pub use crate::coroutine::{Routine, Step};
pub use crate::delegate::Delegate;
pub use crate::error::DiscoveryError;
pub use crate::hooks::callable::{Callable, Cancellation};
pub use crate::hooks::marker::HookMarker;
pub use crate::hooks::priority::HookPriority;
pub use crate::instance::InstanceToken;
pub use crate::module::{DelegateShape, EventDecl, HookModule, MethodDecl, ModuleInfo, TypeDecl};
pub use labext_core::event_args;
