//! Declarative hook marker attached to methods and delegate fields.

use labext_core::{Event, EventType};

use super::priority::HookPriority;

/// Registration metadata a module attaches to a handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookMarker {
    /// Event type to bind to, overriding signature-based resolution.
    pub event_override: Option<EventType>,
    /// Requested priority.
    pub priority: HookPriority,
    /// Look properties up by name on every call instead of using the index
    /// cached at registration.
    pub dynamic_lookup: bool,
}

impl HookMarker {
    /// A marker with normal priority and no override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds to event `E` regardless of the handler's parameters.
    pub fn for_event<E: Event>() -> Self {
        Self::new().with_event(EventType::of::<E>())
    }

    /// Sets the event override.
    pub fn with_event(mut self, event: EventType) -> Self {
        self.event_override = Some(event);
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: HookPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Enables per-call property lookup.
    pub fn dynamic(mut self) -> Self {
        self.dynamic_lookup = true;
        self
    }
}
