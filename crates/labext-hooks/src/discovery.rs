//! Member discovery: turns module declarations into registration requests.
//!
//! A member qualifies when it carries a marker or names a catalog event.
//! Members that cannot be registered are logged and skipped; one bad member
//! never stops the rest of its module.

use labext_core::EventType;
use tracing::{debug, trace, warn};

use crate::catalog::EventCatalog;
use crate::error::DiscoveryError;
use crate::hooks::callable::Receiver;
use crate::hooks::descriptor::RegistrationRequest;
use crate::module::{DelegateShape, EventDecl, HookModule, MethodDecl, TypeDecl};

/// Collects registration requests for every qualifying member of `module`.
pub fn discover_module(
    module: &dyn HookModule,
    catalog: &EventCatalog,
) -> Result<Vec<RegistrationRequest>, DiscoveryError> {
    let module_id = module.info().id;
    let decls = module.declare()?;

    Ok(decls
        .iter()
        .flat_map(|decl| discover_type(decl, Some(&module_id), catalog))
        .collect())
}

/// Collects registration requests for every qualifying member of `decl`.
pub fn discover_type(
    decl: &TypeDecl,
    module: Option<&str>,
    catalog: &EventCatalog,
) -> Vec<RegistrationRequest> {
    let mut requests = Vec::with_capacity(decl.methods.len() + decl.events.len());

    for method in &decl.methods {
        if let Some(request) = discover_method(decl, method) {
            requests.push(with_origin(request, decl, module));
        }
    }

    for event in &decl.events {
        match discover_event(decl, event, catalog) {
            Ok(Some(request)) => requests.push(with_origin(request, decl, module)),
            Ok(None) => {}
            Err(e) => warn!(type_name = %decl.name, error = %e, "Skipping delegate field"),
        }
    }

    requests
}

fn discover_method(decl: &TypeDecl, method: &MethodDecl) -> Option<RegistrationRequest> {
    if method.marker.is_none() && method.catalog_event.is_none() {
        trace!(type_name = %decl.name, callable = %method.callable.id(), "Method not marked");
        return None;
    }

    if method.callable.receiver() == Receiver::Instance && decl.instance.is_none() {
        debug!(
            type_name = %decl.name,
            callable = %method.callable.id(),
            "Instance method declared without an instance, skipping"
        );
        return None;
    }

    // The callable keeps its own id so direct registration and unregistration
    // address the same handler.
    let mut request = RegistrationRequest::new(method.callable.clone());
    request.marker = method.marker;
    request.catalog_event = method.catalog_event.clone();
    Some(request)
}

fn discover_event(
    decl: &TypeDecl,
    event: &EventDecl,
    catalog: &EventCatalog,
) -> Result<Option<RegistrationRequest>, DiscoveryError> {
    if event.marker.is_none() && event.catalog_event.is_none() {
        trace!(type_name = %decl.name, field = %event.field, "Delegate field not marked");
        return Ok(None);
    }

    let event_type = resolve_delegate(decl, event, catalog)?;

    let Some(backing) = event.backing.clone() else {
        return Err(DiscoveryError::MissingBackingField {
            type_name: decl.name.clone(),
            field: event.field.clone(),
        });
    };

    let marker = event.marker.unwrap_or_default().with_event(event_type);
    let id = format!("{}.{}", decl.name, event.field);
    Ok(Some(
        RegistrationRequest::new(backing.renamed(id))
            .marker(marker)
            .delegate(event.field.clone()),
    ))
}

fn resolve_delegate(
    decl: &TypeDecl,
    event: &EventDecl,
    catalog: &EventCatalog,
) -> Result<EventType, DiscoveryError> {
    match event.shape {
        DelegateShape::Event(event_type) => Ok(event_type),
        DelegateShape::Unit => event
            .marker
            .and_then(|m| m.event_override)
            .or_else(|| event.catalog_event.as_deref().and_then(|name| catalog.resolve(name)))
            .ok_or_else(|| DiscoveryError::UnresolvedDelegate {
                type_name: decl.name.clone(),
                field: event.field.clone(),
            }),
        DelegateShape::Unsupported(signature) => Err(DiscoveryError::UnsupportedDelegate {
            type_name: decl.name.clone(),
            field: event.field.clone(),
            signature: signature.to_string(),
        }),
    }
}

fn with_origin(
    mut request: RegistrationRequest,
    decl: &TypeDecl,
    module: Option<&str>,
) -> RegistrationRequest {
    request.instance = decl.instance.clone();
    request.module = module.map(str::to_string);
    request.declaring_type = Some(decl.name.clone());
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::Delegate;
    use crate::hooks::callable::Callable;
    use crate::hooks::descriptor::HandlerSource;
    use crate::hooks::marker::HookMarker;
    use crate::instance::InstanceToken;
    use labext_core::events::{PlayerJoinedArgs, RoundStartedArgs};

    #[test]
    fn test_only_marked_members_qualify() {
        let decl = TypeDecl::new("Greeter")
            .method(MethodDecl::new(Callable::nullary("idle", || {})))
            .method(MethodDecl::hook(
                Callable::for_event::<PlayerJoinedArgs, _, _>("on_joined", |_ev| {}),
                HookMarker::new(),
            ))
            .method(MethodDecl::new(Callable::nullary("on_round", || {})).on("round_started"));

        let requests = discover_type(&decl, Some("greeter"), &EventCatalog::builtin());
        let ids: Vec<String> = requests.iter().map(|r| r.callable().id().to_string()).collect();
        assert_eq!(ids, vec!["on_joined", "on_round"]);
        assert!(requests.iter().all(|r| r.module.as_deref() == Some("greeter")));
    }

    #[test]
    fn test_instance_method_without_instance_is_skipped() {
        let method = Callable::nullary("tick", || {}).on_instance();
        let decl = TypeDecl::new("Round").method(MethodDecl::new(method.clone()).on("round_started"));
        assert!(discover_type(&decl, None, &EventCatalog::builtin()).is_empty());

        let owner = InstanceToken::new();
        let decl = TypeDecl::instance("Round", owner.clone())
            .method(MethodDecl::new(method).on("round_started"));
        let requests = discover_type(&decl, None, &EventCatalog::builtin());
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].owner(), Some(&owner));
    }

    #[test]
    fn test_delegate_fields() {
        let started: Delegate<()> = Delegate::new();
        let joined: Delegate<PlayerJoinedArgs> = Delegate::new();
        let decl = TypeDecl::new("RoundEvents")
            .event(EventDecl::action("on_started", &started).on("round_started"))
            .event(EventDecl::of("on_joined", &joined).marked(HookMarker::new()))
            .event(EventDecl::action("on_unknown", &started).marked(HookMarker::new()))
            .event(EventDecl::unbacked("on_missing", DelegateShape::Unit).on("round_started"))
            .event(
                EventDecl::unbacked("on_tuple", DelegateShape::Unsupported("(u32, u32)"))
                    .marked(HookMarker::new()),
            );

        let requests = discover_type(&decl, None, &EventCatalog::builtin());
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].callable().id().as_str(), "RoundEvents.on_started");
        assert_eq!(
            requests[0].marker.and_then(|m| m.event_override),
            Some(EventType::of::<RoundStartedArgs>())
        );
        assert_eq!(
            requests[1].source,
            HandlerSource::Delegate {
                field: "on_joined".to_string()
            }
        );
    }
}
