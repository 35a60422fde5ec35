//! Event-type resolution for a handler.

use labext_core::EventType;

use crate::catalog::EventCatalog;

use super::callable::Parameter;
use super::marker::HookMarker;

/// Determines which event type a handler subscribes to.
///
/// First match wins:
/// 1. the marker's explicit override,
/// 2. the type of a single whole-event parameter,
/// 3. the catalog entry named by `catalog_event`.
pub fn resolve_event_type(
    params: &[Parameter],
    marker: Option<&HookMarker>,
    catalog_event: Option<&str>,
    catalog: &EventCatalog,
) -> Option<EventType> {
    if let Some(event) = marker.and_then(|m| m.event_override) {
        return Some(event);
    }

    if let [param] = params {
        if let Some(event) = param.event_type() {
            return Some(event);
        }
    }

    catalog_event.and_then(|name| catalog.resolve(name))
}
