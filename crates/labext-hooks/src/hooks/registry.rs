//! Hook registry: event type to priority-ordered handler list.
//!
//! Lists are kept sorted on insert with a stable sort, so equal priorities
//! run in registration order. Dispatch iterates a cloned snapshot, so
//! registrations made by a running handler take effect on the next dispatch.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use labext_core::types::id::HandlerId;
use labext_core::EventType;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::EventCatalog;
use crate::discovery;
use crate::error::{DiscoveryError, RegistrationError};
use crate::instance::InstanceToken;
use crate::module::{HookModule, TypeDecl};

use super::binder::Binder;
use super::callable::{Callable, CallableId, Receiver};
use super::descriptor::{HandlerInfo, HandlerSource, HookDescriptor, RegistrationRequest};
use super::marker::HookMarker;
use super::resolver::resolve_event_type;
use super::runner::Runner;

/// Counts produced by a bulk registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationReport {
    /// Handlers added.
    pub registered: usize,
    /// Members skipped because registration failed.
    pub skipped: usize,
}

/// Registry of hook handlers organized by event type.
#[derive(Debug)]
pub struct HookRegistry {
    /// Event type → handlers sorted by priority.
    handlers: DashMap<EventType, Vec<Arc<HookDescriptor>>>,
    /// Named event types for signature-less handlers.
    catalog: Arc<EventCatalog>,
}

impl HookRegistry {
    /// Creates an empty registry resolving names through `catalog`.
    pub fn new(catalog: Arc<EventCatalog>) -> Self {
        Self {
            handlers: DashMap::new(),
            catalog,
        }
    }

    /// Returns the event catalog.
    pub fn catalog(&self) -> &Arc<EventCatalog> {
        &self.catalog
    }

    /// Registers one handler.
    ///
    /// Fails without side effects when the instance is missing or dead, the
    /// same callable is already registered for the same owner, no event
    /// type resolves, or no binder or runner fits the signature.
    pub fn register(&self, request: RegistrationRequest) -> Result<HandlerId, RegistrationError> {
        let delegate = matches!(request.source, HandlerSource::Delegate { .. });
        let result = self.try_register(request);

        match &result {
            Err(e @ RegistrationError::Duplicate { .. }) if delegate => {
                debug!(error = %e, "Delegate already registered, skipping")
            }
            Err(e) => warn!(error = %e, "Hook registration skipped"),
            Ok(_) => {}
        }

        result
    }

    fn try_register(&self, request: RegistrationRequest) -> Result<HandlerId, RegistrationError> {
        let RegistrationRequest {
            callable,
            instance,
            marker,
            catalog_event,
            module,
            declaring_type,
            source,
        } = request;
        let callable_id = callable.id().to_string();

        if callable.receiver() == Receiver::Instance && instance.is_none() {
            return Err(RegistrationError::MissingInstance {
                callable: callable_id,
            });
        }

        if instance.as_ref().is_some_and(|token| !token.is_alive()) {
            return Err(RegistrationError::DeadInstance {
                callable: callable_id,
            });
        }

        if self.contains(callable.id(), instance.as_ref()) {
            return Err(RegistrationError::Duplicate {
                callable: callable_id,
            });
        }

        let Some(event_type) = resolve_event_type(
            callable.params(),
            marker.as_ref(),
            catalog_event.as_deref(),
            &self.catalog,
        ) else {
            return Err(RegistrationError::UnresolvedEventType {
                callable: callable_id,
            });
        };

        let binder = Binder::select(&callable, event_type)?;
        let runner = Runner::select(&callable)?;
        let marker = marker.unwrap_or_default();
        let id = HandlerId::new();

        let mut entries = self.handlers.entry(event_type).or_default();

        let mut priority = marker.priority;
        // Handlers of disposed owners do not hold an exclusive slot.
        if priority.is_exclusive()
            && entries
                .iter()
                .any(|d| d.is_live() && d.priority == priority)
        {
            let demoted = priority.demoted();
            debug!(
                callable = %callable_id,
                event = %event_type,
                requested = %priority,
                assigned = %demoted,
                "Exclusive priority slot taken, demoting handler"
            );
            priority = demoted;
        }

        entries.push(Arc::new(HookDescriptor {
            id,
            callable,
            instance,
            module,
            declaring_type,
            source,
            event_type,
            priority,
            binder,
            runner,
            dynamic_lookup: marker.dynamic_lookup,
            registered_at: Utc::now(),
        }));
        entries.sort_by_key(|d| d.priority);
        drop(entries);

        debug!(
            callable = %callable_id,
            event = %event_type,
            priority = %priority,
            "Hook handler registered"
        );

        Ok(id)
    }

    /// Registers `callable` without discovery metadata.
    ///
    /// `event_override` plays the role of a marker override; without it the
    /// event type must come from the signature.
    pub fn register_callable(
        &self,
        callable: Callable,
        instance: Option<InstanceToken>,
        event_override: Option<EventType>,
    ) -> Result<HandlerId, RegistrationError> {
        let mut request = RegistrationRequest::new(callable);
        request.instance = instance;
        if let Some(event) = event_override {
            request.marker = Some(HookMarker::new().with_event(event));
        }
        self.register(request)
    }

    /// Removes every handler with this callable identity and owner.
    /// Returns how many were removed.
    pub fn unregister(&self, callable: &CallableId, instance: Option<&InstanceToken>) -> usize {
        let removed = self.remove_where(|d| {
            d.callable.id() == callable && InstanceToken::same_owner(d.instance(), instance)
        });
        if removed > 0 {
            debug!(callable = %callable, removed, "Hook handler unregistered");
        }
        removed
    }

    /// Registers every marked member of `decl`.
    pub fn register_type(&self, decl: &TypeDecl, module: Option<&str>) -> RegistrationReport {
        let requests = discovery::discover_type(decl, module, &self.catalog);
        self.register_all(requests)
    }

    /// Removes every handler declared by `type_name` for `instance`.
    pub fn unregister_type(&self, type_name: &str, instance: Option<&InstanceToken>) -> usize {
        let removed = self.remove_where(|d| {
            d.declaring_type() == Some(type_name) && InstanceToken::same_owner(d.instance(), instance)
        });
        debug!(type_name = %type_name, removed, "Type hooks unregistered");
        removed
    }

    /// Registers every marked member of every type `module` declares.
    ///
    /// Fails only when the module cannot describe its types; individual
    /// members that fail are skipped and counted.
    pub fn register_module(
        &self,
        module: &dyn HookModule,
    ) -> Result<RegistrationReport, DiscoveryError> {
        let module_id = module.info().id;
        let requests = discovery::discover_module(module, &self.catalog)?;

        let report = self.register_all(requests);
        info!(
            module_id = %module_id,
            registered = report.registered,
            skipped = report.skipped,
            "Module hooks registered"
        );
        Ok(report)
    }

    /// Removes every handler `module` registered, including ones added at
    /// runtime under its id.
    pub fn unregister_module(&self, module: &dyn HookModule) -> usize {
        let module_id = module.info().id;
        let mut removed = 0;

        if let Ok(requests) = discovery::discover_module(module, &self.catalog) {
            for request in &requests {
                removed += self.unregister(request.callable().id(), request.owner());
            }
        }
        removed += self.unregister_module_id(&module_id);

        info!(module_id = %module_id, removed, "All hooks unregistered for module");
        removed
    }

    /// Removes every handler recorded under `module_id`.
    pub fn unregister_module_id(&self, module_id: &str) -> usize {
        self.remove_where(|d| d.module() == Some(module_id))
    }

    /// Returns the handlers for `event_type` in execution order.
    pub fn snapshot(&self, event_type: EventType) -> Vec<Arc<HookDescriptor>> {
        self.handlers
            .get(&event_type)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Removes specific handlers of `event_type` by id.
    pub fn prune(&self, event_type: EventType, ids: &[HandlerId]) -> usize {
        let removed = match self.handlers.get_mut(&event_type) {
            Some(mut entries) => {
                let before = entries.len();
                entries.retain(|d| !ids.contains(&d.id));
                before - entries.len()
            }
            None => 0,
        };
        self.handlers.remove_if(&event_type, |_, entries| entries.is_empty());
        removed
    }

    /// Returns whether any handler is registered for `event_type`.
    pub fn any_registered(&self, event_type: EventType) -> bool {
        self.handlers
            .get(&event_type)
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Returns the number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers
            .get(&event_type)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Returns the total number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.iter().map(|entry| entry.value().len()).sum()
    }

    /// Returns whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all event types with at least one handler.
    pub fn registered_events(&self) -> Vec<EventType> {
        let mut events: Vec<EventType> = self.handlers.iter().map(|entry| *entry.key()).collect();
        events.sort_by_key(|event| event.name());
        events
    }

    /// Returns diagnostic summaries of the handlers for `event_type`.
    pub fn handlers(&self, event_type: EventType) -> Vec<HandlerInfo> {
        self.snapshot(event_type)
            .iter()
            .map(|d| d.info())
            .collect()
    }

    /// Removes every handler.
    pub fn clear(&self) {
        self.handlers.clear();
        info!("Hook registry cleared");
    }

    fn contains(&self, callable: &CallableId, instance: Option<&InstanceToken>) -> bool {
        self.handlers.iter().any(|entry| {
            entry.value().iter().any(|d| {
                d.callable.id() == callable && InstanceToken::same_owner(d.instance(), instance)
            })
        })
    }

    fn register_all(&self, requests: Vec<RegistrationRequest>) -> RegistrationReport {
        let mut report = RegistrationReport::default();
        for request in requests {
            match self.register(request) {
                Ok(_) => report.registered += 1,
                Err(_) => report.skipped += 1,
            }
        }
        report
    }

    fn remove_where(&self, predicate: impl Fn(&HookDescriptor) -> bool) -> usize {
        let mut removed = 0;
        for mut entry in self.handlers.iter_mut() {
            let before = entry.len();
            entry.retain(|d| !predicate(d));
            removed += before - entry.len();
        }
        self.handlers.retain(|_, entries| !entries.is_empty());
        removed
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new(Arc::new(EventCatalog::builtin()))
    }
}
