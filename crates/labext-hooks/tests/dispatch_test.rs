//! Integration tests for registration order and dispatch aggregation.

mod helpers;

use std::sync::{Arc, Mutex};

use labext_core::events::PlayerUsingItemArgs;
use labext_hooks::prelude::*;
use labext_hooks::{CallableId, RegistrationError};
use serde_json::{json, Value};

use helpers::{dispatcher, ping, recording, register, PingArgs, Recorder};

#[test]
fn test_priority_then_registration_order() {
    let dispatcher = dispatcher();
    let recorder = Recorder::new();

    register(&dispatcher, recording(&recorder, "low", ()), HookPriority::Lowest);
    register(&dispatcher, recording(&recorder, "normal_1", ()), HookPriority::Normal);
    register(&dispatcher, recording(&recorder, "first", ()), HookPriority::AlwaysFirst);
    register(&dispatcher, recording(&recorder, "normal_2", ()), HookPriority::Normal);
    register(&dispatcher, recording(&recorder, "above", ()), HookPriority::AboveNormal);

    assert!(dispatcher.fire(&ping()));
    assert_eq!(
        recorder.calls(),
        vec!["first", "above", "normal_1", "normal_2", "low"]
    );
}

#[test]
fn test_example_scenario() {
    let dispatcher = dispatcher();
    let recorder = Recorder::new();

    register(&dispatcher, recording(&recorder, "H1", true), HookPriority::Highest);
    register(&dispatcher, recording(&recorder, "H2", false), HookPriority::Normal);
    register(&dispatcher, recording(&recorder, "H3", true), HookPriority::Lowest);

    let permitted = dispatcher.dispatch(EventType::of::<PingArgs>(), &ping());

    assert!(!permitted);
    assert_eq!(recorder.calls(), vec!["H1", "H2", "H3"]);
}

#[test]
fn test_second_exclusive_claimant_is_demoted() {
    let dispatcher = dispatcher();
    let recorder = Recorder::new();

    register(&dispatcher, recording(&recorder, "highest", ()), HookPriority::Highest);
    register(&dispatcher, recording(&recorder, "last_1", ()), HookPriority::AlwaysLast);
    register(&dispatcher, recording(&recorder, "first_1", ()), HookPriority::AlwaysFirst);
    register(&dispatcher, recording(&recorder, "first_2", ()), HookPriority::AlwaysFirst);
    register(&dispatcher, recording(&recorder, "last_2", ()), HookPriority::AlwaysLast);

    dispatcher.fire(&ping());
    assert_eq!(
        recorder.calls(),
        vec!["first_1", "highest", "first_2", "last_2", "last_1"]
    );

    let priorities: Vec<HookPriority> = dispatcher
        .registry()
        .handlers(EventType::of::<PingArgs>())
        .iter()
        .map(|info| info.priority)
        .collect();
    assert_eq!(
        priorities
            .iter()
            .filter(|p| **p == HookPriority::AlwaysFirst)
            .count(),
        1
    );
    assert_eq!(
        priorities
            .iter()
            .filter(|p| **p == HookPriority::AlwaysLast)
            .count(),
        1
    );
}

#[test]
fn test_exclusive_slot_survives_disposed_claimant() {
    let dispatcher = dispatcher();
    let recorder = Recorder::new();
    let owner = InstanceToken::new();

    dispatcher
        .registry()
        .register(
            labext_hooks::hooks::RegistrationRequest::new(
                recording(&recorder, "dead_first", ()).on_instance(),
            )
            .instance(owner.clone())
            .marker(HookMarker::new().with_priority(HookPriority::AlwaysFirst)),
        )
        .unwrap();
    owner.dispose();

    register(&dispatcher, recording(&recorder, "highest", ()), HookPriority::Highest);
    register(&dispatcher, recording(&recorder, "live_first", ()), HookPriority::AlwaysFirst);

    let result = dispatcher.dispatch_report(EventType::of::<PingArgs>(), &ping());
    assert_eq!(result.pruned, 1);
    assert_eq!(recorder.calls(), vec!["live_first", "highest"]);

    let first: Vec<String> = dispatcher
        .registry()
        .handlers(EventType::of::<PingArgs>())
        .into_iter()
        .filter(|info| info.priority == HookPriority::AlwaysFirst)
        .map(|info| info.callable)
        .collect();
    assert_eq!(first, vec!["live_first"]);
}

#[test]
fn test_duplicate_registration_keeps_one() {
    let dispatcher = dispatcher();
    let recorder = Recorder::new();
    let owner = InstanceToken::new();
    let hook = recording(&recorder, "Ping::on_ping", ()).on_instance();

    let registry = dispatcher.registry();
    registry
        .register_callable(hook.clone(), Some(owner.clone()), None)
        .unwrap();
    let err = registry
        .register_callable(hook, Some(owner), None)
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Duplicate { .. }));

    dispatcher.fire(&ping());
    assert_eq!(recorder.calls(), vec!["Ping::on_ping"]);
}

#[test]
fn test_failing_handlers_do_not_stop_dispatch() {
    let dispatcher = dispatcher();
    let recorder = Recorder::new();

    register(
        &dispatcher,
        Callable::for_event::<PingArgs, _, _>("panics", |_ev| -> bool {
            panic!("handler exploded")
        }),
        HookPriority::Highest,
    );
    register(
        &dispatcher,
        Callable::for_event::<PingArgs, _, _>("errors", |_ev| -> Result<bool, String> {
            Err("no database".to_string())
        }),
        HookPriority::Normal,
    );
    register(&dispatcher, recording(&recorder, "after", ()), HookPriority::Lowest);

    let result = dispatcher.dispatch_report(EventType::of::<PingArgs>(), &ping());

    assert!(result.permitted);
    assert_eq!(result.invoked, 3);
    assert_eq!(result.failed, vec!["panics", "errors"]);
    assert_eq!(recorder.calls(), vec!["after"]);
}

#[test]
fn test_any_deny_wins_and_empty_permits() {
    let dispatcher = dispatcher();
    assert!(dispatcher.fire(&ping()));

    let recorder = Recorder::new();
    register(&dispatcher, recording(&recorder, "allow", true), HookPriority::Normal);
    register(
        &dispatcher,
        recording(&recorder, "deny", Cancellation::deny("closed")),
        HookPriority::Lowest,
    );

    let result = dispatcher.dispatch_report(EventType::of::<PingArgs>(), &ping());
    assert!(!result.permitted);
    assert_eq!(result.denied_by, vec!["deny"]);
    assert_eq!(result.deny_reason.as_deref(), Some("closed"));
}

#[test]
fn test_mutation_during_dispatch_uses_snapshot() {
    let dispatcher = dispatcher();
    let recorder = Recorder::new();

    let registry = Arc::clone(dispatcher.registry());
    let late = recording(&recorder, "late", ());
    let mutating = {
        let recorder = recorder.clone();
        Callable::for_event::<PingArgs, _, _>("mutator", move |_ev| {
            recorder.record("mutator");
            registry.unregister(&CallableId::new("victim"), None);
            let _ = registry.register_callable(late.clone(), None, None);
        })
    };

    register(&dispatcher, mutating, HookPriority::Highest);
    register(&dispatcher, recording(&recorder, "victim", ()), HookPriority::Lowest);

    dispatcher.fire(&ping());
    assert_eq!(recorder.calls(), vec!["mutator", "victim"]);

    recorder.clear();
    dispatcher.fire(&ping());
    assert_eq!(recorder.calls(), vec!["mutator", "late"]);
}

#[test]
fn test_property_binding_order() {
    let dispatcher = dispatcher();
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();

    let sink = Arc::clone(&seen);
    let callable = Callable::from_properties("Ping::on_values", &["A", "B"], move |values| {
        sink.lock().unwrap().extend_from_slice(values);
    });
    dispatcher
        .registry()
        .register_callable(callable, None, Some(EventType::of::<PingArgs>()))
        .unwrap();

    let sink = Arc::clone(&seen);
    let reversed = Callable::from_properties("Ping::on_reversed", &["b", "a"], move |values| {
        sink.lock().unwrap().extend_from_slice(values);
    });
    dispatcher
        .registry()
        .register(
            labext_hooks::hooks::RegistrationRequest::new(reversed)
                .marker(HookMarker::for_event::<PingArgs>().dynamic())
                .module("ping-module"),
        )
        .unwrap();

    dispatcher.fire(&ping());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![json!(7), json!("seven"), json!("seven"), json!(7)]
    );
}

#[test]
fn test_coroutine_handler_permits_and_runs_on_tick() {
    let dispatcher = dispatcher();
    let recorder = Recorder::new();

    let steps = recorder.clone();
    register(
        &dispatcher,
        Callable::for_event::<PingArgs, _, _>("Ping::countdown", move |_ev| {
            let steps = steps.clone();
            let mut remaining = 2;
            Routine::from_fn(move || {
                steps.record(format!("step {remaining}"));
                if remaining == 0 {
                    Step::Done
                } else {
                    remaining -= 1;
                    Step::Yield
                }
            })
        }),
        HookPriority::Normal,
    );

    let result = dispatcher.dispatch_report(EventType::of::<PingArgs>(), &ping());
    assert!(result.permitted);
    assert_eq!(result.scheduled.len(), 1);
    assert!(recorder.calls().is_empty());

    let scheduler = dispatcher.scheduler();
    scheduler.tick();
    scheduler.tick();
    scheduler.tick();
    assert_eq!(recorder.calls(), vec!["step 2", "step 1", "step 0"]);
    assert!(result.scheduled[0].is_finished());
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn test_handlers_write_results_back_to_caller() {
    let dispatcher = dispatcher();
    let registry = dispatcher.registry();

    registry
        .register_callable(
            Callable::for_event_mut::<PlayerUsingItemArgs, _, _>("Medical::cooldown", |ev| {
                if ev.item == "medkit" {
                    ev.remaining_cooldown = 4.5;
                }
            }),
            None,
            None,
        )
        .unwrap();
    registry
        .register_callable(
            Callable::for_event_mut::<PlayerUsingItemArgs, _, _>("Medical::pace", |ev| {
                ev.speed_multiplier *= 0.5;
                ev.remaining_cooldown <= 0.0
            }),
            None,
            None,
        )
        .unwrap();

    let mut args = PlayerUsingItemArgs {
        player_id: 9,
        item: "medkit".to_string(),
        item_serial: 12,
        remaining_cooldown: 0.0,
        speed_multiplier: 1.0,
    };
    assert!(!dispatcher.fire_mut(&mut args));
    assert_eq!(args.remaining_cooldown, 4.5);
    assert_eq!(args.speed_multiplier, 0.5);

    // Read-only dispatch leaves the value alone and skips writers.
    let untouched = PlayerUsingItemArgs {
        player_id: 9,
        item: "medkit".to_string(),
        item_serial: 13,
        remaining_cooldown: 0.0,
        speed_multiplier: 1.0,
    };
    let result = dispatcher.dispatch_report(EventType::of::<PlayerUsingItemArgs>(), &untouched);
    assert!(result.permitted);
    assert_eq!(result.invoked, 0);
}
