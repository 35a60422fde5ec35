//! Registered handler descriptors.

use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use labext_core::types::id::HandlerId;
use labext_core::EventType;
use serde::Serialize;

use crate::coroutine::TickScheduler;
use crate::error::{panic_message, InvocationError};
use crate::instance::InstanceToken;

use super::binder::{Binder, EventRef};
use super::callable::Callable;
use super::marker::HookMarker;
use super::priority::HookPriority;
use super::runner::{Outcome, Runner};

/// Where a handler came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerSource {
    /// A marked method.
    Method,
    /// A delegate field whose subscribers are invoked.
    Delegate {
        /// The field name.
        field: String,
    },
}

/// One registered handler.
///
/// Immutable once registered; the registry shares it with in-flight
/// dispatches through an `Arc`.
#[derive(Debug)]
pub struct HookDescriptor {
    pub(crate) id: HandlerId,
    pub(crate) callable: Callable,
    pub(crate) instance: Option<InstanceToken>,
    pub(crate) module: Option<String>,
    pub(crate) declaring_type: Option<String>,
    pub(crate) source: HandlerSource,
    pub(crate) event_type: EventType,
    pub(crate) priority: HookPriority,
    pub(crate) binder: Binder,
    pub(crate) runner: Runner,
    pub(crate) dynamic_lookup: bool,
    pub(crate) registered_at: DateTime<Utc>,
}

impl HookDescriptor {
    /// Returns the handler id.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Returns the callable.
    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    /// Returns the owning instance, if any.
    pub fn instance(&self) -> Option<&InstanceToken> {
        self.instance.as_ref()
    }

    /// Returns the id of the module that registered this handler.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Returns the declaring type name.
    pub fn declaring_type(&self) -> Option<&str> {
        self.declaring_type.as_deref()
    }

    /// Returns where this handler came from.
    pub fn source(&self) -> &HandlerSource {
        &self.source
    }

    /// Returns the subscribed event type.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Returns the effective priority, after any demotion.
    pub fn priority(&self) -> HookPriority {
        self.priority
    }

    /// Returns the argument binder.
    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Returns the runner.
    pub fn runner(&self) -> Runner {
        self.runner
    }

    /// Returns `false` once the owning instance has been disposed.
    pub fn is_live(&self) -> bool {
        self.instance.as_ref().is_none_or(InstanceToken::is_alive)
    }

    /// Binds `args` and runs the handler. A panic in the body is caught and
    /// reported as [`InvocationError::Panicked`].
    pub fn invoke(
        &self,
        args: EventRef<'_>,
        scheduler: &TickScheduler,
    ) -> Result<Outcome, InvocationError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            let bound = self.binder.bind(args, self.dynamic_lookup)?;
            self.runner.run(&self.callable, bound, scheduler)
        }))
        .unwrap_or_else(|payload| Err(InvocationError::Panicked(panic_message(&*payload))))
    }

    /// Returns a serializable summary.
    pub fn info(&self) -> HandlerInfo {
        HandlerInfo {
            id: self.id,
            callable: self.callable.id().to_string(),
            event: self.event_type.name(),
            priority: self.priority,
            source: self.source.clone(),
            module: self.module.clone(),
            declaring_type: self.declaring_type.clone(),
            binder: self.binder.name(),
            runner: self.runner.name(),
            alive: self.is_live(),
            registered_at: self.registered_at,
        }
    }
}

/// Diagnostic view of a registered handler.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerInfo {
    /// Handler id.
    pub id: HandlerId,
    /// Callable identity.
    pub callable: String,
    /// Event type name.
    pub event: &'static str,
    /// Effective priority.
    pub priority: HookPriority,
    /// Method or delegate.
    pub source: HandlerSource,
    /// Registering module.
    pub module: Option<String>,
    /// Declaring type.
    pub declaring_type: Option<String>,
    /// Binder name.
    pub binder: &'static str,
    /// Runner name.
    pub runner: &'static str,
    /// Whether the owning instance is still alive.
    pub alive: bool,
    /// Registration time.
    pub registered_at: DateTime<Utc>,
}

/// Everything the registry needs to register one handler.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub(crate) callable: Callable,
    pub(crate) instance: Option<InstanceToken>,
    pub(crate) marker: Option<HookMarker>,
    pub(crate) catalog_event: Option<String>,
    pub(crate) module: Option<String>,
    pub(crate) declaring_type: Option<String>,
    pub(crate) source: HandlerSource,
}

impl RegistrationRequest {
    /// A method registration for `callable`.
    pub fn new(callable: Callable) -> Self {
        Self {
            callable,
            instance: None,
            marker: None,
            catalog_event: None,
            module: None,
            declaring_type: None,
            source: HandlerSource::Method,
        }
    }

    /// Sets the owning instance.
    pub fn instance(mut self, instance: InstanceToken) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Sets the marker.
    pub fn marker(mut self, marker: HookMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Names the catalog entry used when the signature has no event type.
    pub fn catalog_event(mut self, name: impl Into<String>) -> Self {
        self.catalog_event = Some(name.into());
        self
    }

    /// Records the registering module.
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Records the declaring type.
    pub fn declaring_type(mut self, name: impl Into<String>) -> Self {
        self.declaring_type = Some(name.into());
        self
    }

    /// Marks this as a delegate-field registration.
    pub fn delegate(mut self, field: impl Into<String>) -> Self {
        self.source = HandlerSource::Delegate {
            field: field.into(),
        };
        self
    }

    /// Returns the callable.
    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    /// Returns the owning instance.
    pub fn owner(&self) -> Option<&InstanceToken> {
        self.instance.as_ref()
    }
}
