//! Hook dispatcher: runs every handler of an event and aggregates the result.
//!
//! - Handlers run synchronously on the caller's thread in priority order.
//! - Every handler runs. A deny does not stop later handlers.
//! - The result is the AND of all permit values; no handlers means permit.
//! - Errors and panics are logged and count as a permit.
//! - Handlers whose owner has been disposed are skipped and pruned.
//! - Handlers taking `&mut E` only run when the event is fired mutably, and
//!   later handlers see their writes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use labext_core::config::HookConfig;
use labext_core::types::id::HandlerId;
use labext_core::{Event, EventArgs, EventType};
use tracing::{debug, error, warn};

use crate::coroutine::{CoroutineHandle, TickScheduler};

use super::binder::{Binder, EventRef};
use super::registry::HookRegistry;
use super::runner::Outcome;

/// Aggregated result of dispatching one event.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    /// Event type name.
    pub event: &'static str,
    /// Whether every handler permitted the action.
    pub permitted: bool,
    /// Number of handlers invoked.
    pub invoked: usize,
    /// Callables that denied.
    pub denied_by: Vec<String>,
    /// First reason given by a denying handler.
    pub deny_reason: Option<String>,
    /// Callables that failed or panicked.
    pub failed: Vec<String>,
    /// Coroutines started by handlers.
    pub scheduled: Vec<CoroutineHandle>,
    /// Dead handlers removed during this dispatch.
    pub pruned: usize,
}

impl DispatchResult {
    fn empty(event: EventType) -> Self {
        Self {
            event: event.name(),
            permitted: true,
            invoked: 0,
            denied_by: Vec::new(),
            deny_reason: None,
            failed: Vec::new(),
            scheduled: Vec::new(),
            pruned: 0,
        }
    }
}

/// Dispatches events to registered handlers.
#[derive(Debug)]
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
    /// Scheduler receiving coroutine handlers.
    scheduler: Arc<TickScheduler>,
    /// Dispatch settings.
    config: HookConfig,
}

impl HookDispatcher {
    /// Creates a new dispatcher.
    pub fn new(registry: Arc<HookRegistry>, scheduler: Arc<TickScheduler>, config: HookConfig) -> Self {
        Self {
            registry,
            scheduler,
            config,
        }
    }

    /// Dispatches `args` to every handler of `event_type`.
    /// Returns `true` unless some handler denied.
    pub fn dispatch(&self, event_type: EventType, args: &dyn EventArgs) -> bool {
        self.dispatch_report(event_type, args).permitted
    }

    /// Dispatches a typed event.
    pub fn fire<E: Event>(&self, args: &E) -> bool {
        self.dispatch(EventType::of::<E>(), args)
    }

    /// Dispatches `args` mutably so handlers can write results back.
    /// Returns `true` unless some handler denied.
    pub fn dispatch_mut(&self, event_type: EventType, args: &mut dyn EventArgs) -> bool {
        self.dispatch_mut_report(event_type, args).permitted
    }

    /// Dispatches a typed event mutably. The caller reads handler writes
    /// from `args` afterwards.
    pub fn fire_mut<E: Event>(&self, args: &mut E) -> bool {
        self.dispatch_mut(EventType::of::<E>(), args)
    }

    /// Dispatches and returns the full result.
    pub fn dispatch_report(&self, event_type: EventType, args: &dyn EventArgs) -> DispatchResult {
        self.run(event_type, EventRef::Shared(args))
    }

    /// Dispatches mutably and returns the full result.
    pub fn dispatch_mut_report(
        &self,
        event_type: EventType,
        args: &mut dyn EventArgs,
    ) -> DispatchResult {
        self.run(event_type, EventRef::Exclusive(args))
    }

    fn run(&self, event_type: EventType, mut args: EventRef<'_>) -> DispatchResult {
        let mut result = DispatchResult::empty(event_type);

        if !event_type.describes(args.get()) {
            error!(
                event = %event_type,
                received = %args.get().event_type(),
                "Event value does not match dispatched type, skipping dispatch"
            );
            return result;
        }

        let handlers = self.registry.snapshot(event_type);
        if handlers.is_empty() {
            return result;
        }

        debug!(event = %event_type, handler_count = handlers.len(), "Dispatching event");

        let slow_threshold = Duration::from_millis(self.config.slow_handler_warn_ms);
        let mut dead: Vec<HandlerId> = Vec::new();

        for handler in &handlers {
            if !handler.is_live() {
                dead.push(handler.id());
                continue;
            }

            if *handler.binder() == Binder::DirectMut && !args.is_exclusive() {
                debug!(
                    event = %event_type,
                    callable = %handler.callable().id(),
                    "Skipping mutable handler on read-only dispatch"
                );
                continue;
            }

            let started = Instant::now();
            let outcome = handler.invoke(args.reborrow(), &self.scheduler);
            let elapsed = started.elapsed();
            result.invoked += 1;

            match outcome {
                Ok(Outcome::Permit) => {}
                Ok(Outcome::Deny(reason)) => {
                    debug!(
                        event = %event_type,
                        callable = %handler.callable().id(),
                        reason = reason.as_deref().unwrap_or(""),
                        "Handler denied event"
                    );
                    result.permitted = false;
                    result.denied_by.push(handler.callable().id().to_string());
                    if result.deny_reason.is_none() {
                        result.deny_reason = reason;
                    }
                }
                Ok(Outcome::Scheduled(handle)) => result.scheduled.push(handle),
                Err(e) => {
                    error!(
                        event = %event_type,
                        callable = %handler.callable().id(),
                        error = %e,
                        "Hook handler failed"
                    );
                    result.failed.push(handler.callable().id().to_string());
                }
            }

            if self.config.slow_handler_warn_ms > 0 && elapsed > slow_threshold {
                warn!(
                    event = %event_type,
                    callable = %handler.callable().id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Slow hook handler"
                );
            }
        }

        if !dead.is_empty() {
            if self.config.prune_dead_handlers {
                result.pruned = self.registry.prune(event_type, &dead);
                debug!(event = %event_type, pruned = result.pruned, "Pruned handlers of disposed owners");
            } else {
                debug!(event = %event_type, skipped = dead.len(), "Skipped handlers of disposed owners");
            }
        }

        result
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Returns a reference to the tick scheduler.
    pub fn scheduler(&self) -> &Arc<TickScheduler> {
        &self.scheduler
    }

    /// Returns the dispatch settings.
    pub fn config(&self) -> &HookConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::callable::{Callable, Cancellation};
    use crate::instance::InstanceToken;
    use labext_core::events::{PlayerJoinedArgs, PlayerLeftArgs, PlayerUsingItemArgs};

    fn dispatcher() -> HookDispatcher {
        HookDispatcher::new(
            Arc::new(HookRegistry::default()),
            Arc::new(TickScheduler::default()),
            HookConfig::default(),
        )
    }

    fn joined() -> PlayerJoinedArgs {
        PlayerJoinedArgs {
            player_id: 3,
            nickname: "Dr. Bright".to_string(),
            user_id: "local".to_string(),
        }
    }

    #[test]
    fn test_no_handlers_permits() {
        let dispatcher = dispatcher();
        let result = dispatcher.dispatch_report(EventType::of::<PlayerJoinedArgs>(), &joined());
        assert!(result.permitted);
        assert_eq!(result.invoked, 0);
    }

    #[test]
    fn test_deny_does_not_stop_later_handlers() {
        let dispatcher = dispatcher();
        let registry = dispatcher.registry();
        registry
            .register_callable(
                Callable::for_event::<PlayerJoinedArgs, _, _>("t::deny", |_ev| {
                    Cancellation::deny("banned")
                }),
                None,
                None,
            )
            .unwrap();
        registry
            .register_callable(
                Callable::for_event::<PlayerJoinedArgs, _, _>("t::after", |_ev| true),
                None,
                None,
            )
            .unwrap();

        let result = dispatcher.dispatch_report(EventType::of::<PlayerJoinedArgs>(), &joined());
        assert!(!result.permitted);
        assert_eq!(result.invoked, 2);
        assert_eq!(result.denied_by, vec!["t::deny".to_string()]);
        assert_eq!(result.deny_reason.as_deref(), Some("banned"));
    }

    #[test]
    fn test_mismatched_value_permits() {
        let dispatcher = dispatcher();
        dispatcher
            .registry()
            .register_callable(
                Callable::for_event::<PlayerJoinedArgs, _, _>("t::deny", |_ev| false),
                None,
                None,
            )
            .unwrap();

        let wrong = PlayerLeftArgs { player_id: 1 };
        let result = dispatcher.dispatch_report(EventType::of::<PlayerJoinedArgs>(), &wrong);
        assert!(result.permitted);
        assert_eq!(result.invoked, 0);
    }

    #[test]
    fn test_dead_owner_is_pruned() {
        let dispatcher = dispatcher();
        let owner = InstanceToken::new();
        dispatcher
            .registry()
            .register_callable(
                Callable::for_event::<PlayerJoinedArgs, _, _>("t::owned", |_ev| false)
                    .on_instance(),
                Some(owner.clone()),
                None,
            )
            .unwrap();

        owner.dispose();
        let result = dispatcher.dispatch_report(EventType::of::<PlayerJoinedArgs>(), &joined());
        assert!(result.permitted);
        assert_eq!(result.invoked, 0);
        assert_eq!(result.pruned, 1);
        assert!(!dispatcher.registry().any_registered(EventType::of::<PlayerJoinedArgs>()));
    }

    fn using_item() -> PlayerUsingItemArgs {
        PlayerUsingItemArgs {
            player_id: 3,
            item: "medkit".to_string(),
            item_serial: 42,
            remaining_cooldown: 0.0,
            speed_multiplier: 1.0,
        }
    }

    #[test]
    fn test_mutable_writes_are_seen_by_later_handlers() {
        let dispatcher = dispatcher();
        let registry = dispatcher.registry();
        registry
            .register_callable(
                Callable::for_event_mut::<PlayerUsingItemArgs, _, _>("t::slow", |ev| {
                    ev.speed_multiplier = 0.5;
                }),
                Some(crate::hooks::HookPriority::Highest),
                None,
            )
            .unwrap();
        registry
            .register_callable(
                Callable::for_event::<PlayerUsingItemArgs, _, _>("t::check", |ev| {
                    ev.speed_multiplier < 1.0
                }),
                None,
                None,
            )
            .unwrap();

        let mut args = using_item();
        let result =
            dispatcher.dispatch_mut_report(EventType::of::<PlayerUsingItemArgs>(), &mut args);
        assert!(result.permitted);
        assert_eq!(result.invoked, 2);
        assert_eq!(args.speed_multiplier, 0.5);
    }

    #[test]
    fn test_read_only_dispatch_skips_mutable_handlers() {
        let dispatcher = dispatcher();
        dispatcher
            .registry()
            .register_callable(
                Callable::for_event_mut::<PlayerUsingItemArgs, _, _>("t::cooldown", |ev| {
                    ev.remaining_cooldown = 5.0;
                    false
                }),
                None,
                None,
            )
            .unwrap();

        let args = using_item();
        let result = dispatcher.dispatch_report(EventType::of::<PlayerUsingItemArgs>(), &args);
        assert!(result.permitted);
        assert_eq!(result.invoked, 0);
        assert!(result.failed.is_empty());
    }
}
