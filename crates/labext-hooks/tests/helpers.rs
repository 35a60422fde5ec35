//! Shared fixtures for hook integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use labext_core::config::HookConfig;
use labext_hooks::prelude::*;
use labext_hooks::{EventCatalog, HookDispatcher, HookRegistry, TickScheduler};

event_args! {
    /// Test event with two plain properties.
    pub struct PingArgs as "ping" {
        pub a: i32,
        pub b: String,
    }
}

/// Records handler invocations in order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: impl Into<String>) {
        self.calls.lock().unwrap().push(name.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

/// A dispatcher over a fresh registry with the built-in catalog plus `ping`.
pub fn dispatcher() -> HookDispatcher {
    let catalog = EventCatalog::builtin();
    catalog.register::<PingArgs>();
    HookDispatcher::new(
        Arc::new(HookRegistry::new(Arc::new(catalog))),
        Arc::new(TickScheduler::default()),
        HookConfig::default(),
    )
}

pub fn ping() -> PingArgs {
    PingArgs {
        a: 7,
        b: "seven".to_string(),
    }
}

/// A ping handler that records `name` and returns `result`.
pub fn recording<R>(recorder: &Recorder, name: &'static str, result: R) -> Callable
where
    R: labext_hooks::hooks::IntoHookReturn + Clone + Send + Sync + 'static,
{
    let recorder = recorder.clone();
    Callable::for_event::<PingArgs, _, _>(name, move |_ev| {
        recorder.record(name);
        result.clone()
    })
}

/// Registers `callable` on `ping` with `priority`.
pub fn register(dispatcher: &HookDispatcher, callable: Callable, priority: HookPriority) {
    use labext_hooks::hooks::RegistrationRequest;

    dispatcher
        .registry()
        .register(RegistrationRequest::new(callable).marker(HookMarker::new().with_priority(priority)))
        .unwrap();
}
