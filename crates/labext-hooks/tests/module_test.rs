//! Integration tests for module lifecycle, delegates, and instance liveness.

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use labext_core::config::{HookConfig, ModuleConfig};
use labext_core::events::{PlayerJoinedArgs, RoundStartedArgs};
use labext_hooks::prelude::*;
use labext_hooks::{EventCatalog, ModuleManager, RegistrationError};

use helpers::Recorder;

/// A module with one static method, one instance method, and two delegates.
#[derive(Debug)]
struct LobbyModule {
    recorder: Recorder,
    lobby: InstanceToken,
    round_started: Delegate<()>,
    player_joined: Delegate<PlayerJoinedArgs>,
}

impl LobbyModule {
    fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            lobby: InstanceToken::new(),
            round_started: Delegate::new(),
            player_joined: Delegate::new(),
        }
    }
}

#[async_trait]
impl HookModule for LobbyModule {
    fn info(&self) -> ModuleInfo {
        ModuleInfo {
            id: "lobby".to_string(),
            name: "Lobby".to_string(),
            version: "0.3.0".to_string(),
            author: "tests".to_string(),
            description: "Lobby bookkeeping".to_string(),
        }
    }

    fn declare(&self) -> Result<Vec<TypeDecl>, DiscoveryError> {
        let on_joined = {
            let recorder = self.recorder.clone();
            Callable::for_event::<PlayerJoinedArgs, _, _>("on_joined", move |ev| {
                recorder.record(format!("joined {}", ev.nickname));
            })
        };
        let greet = {
            let recorder = self.recorder.clone();
            Callable::from_properties("greet", &["nickname"], move |values| {
                recorder.record(format!("greet {}", values[0]));
            })
            .on_instance()
        };

        Ok(vec![
            TypeDecl::new("LobbyModule")
                .method(MethodDecl::hook(on_joined, HookMarker::new()))
                .event(EventDecl::action("round_started", &self.round_started).on("round_started"))
                .event(
                    EventDecl::of("player_joined", &self.player_joined)
                        .marked(HookMarker::new().with_priority(HookPriority::Lowest)),
                ),
            TypeDecl::instance("Lobby", self.lobby.clone()).method(MethodDecl::hook(
                greet,
                HookMarker::for_event::<PlayerJoinedArgs>().with_priority(HookPriority::Highest),
            )),
        ])
    }
}

fn joined(nickname: &str) -> PlayerJoinedArgs {
    PlayerJoinedArgs {
        player_id: 1,
        nickname: nickname.to_string(),
        user_id: format!("{nickname}@northwood"),
    }
}

#[tokio::test]
async fn test_module_hooks_and_delegates_fire() {
    let manager = ModuleManager::default();
    let recorder = Recorder::new();
    let module = Arc::new(LobbyModule::new(recorder.clone()));

    let subscriber = recorder.clone();
    module
        .player_joined
        .subscribe(move |ev| subscriber.record(format!("delegate {}", ev.player_id)));
    let started = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&started);
    module.round_started.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let report = manager.load_module(module.clone()).await.unwrap();
    assert_eq!(report.registered, 4);
    assert_eq!(report.skipped, 0);

    let dispatcher = manager.dispatcher();
    assert!(dispatcher.fire(&joined("Tau")));
    assert!(dispatcher.fire(&RoundStartedArgs {}));

    assert_eq!(
        recorder.calls(),
        vec!["greet \"Tau\"", "joined Tau", "delegate 1"]
    );
    assert_eq!(started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unload_removes_every_handler() {
    let manager = ModuleManager::default();
    let recorder = Recorder::new();
    let module = Arc::new(LobbyModule::new(recorder.clone()));
    manager.load_module(module.clone()).await.unwrap();

    let registry = manager.hook_registry();
    registry
        .register(
            labext_hooks::hooks::RegistrationRequest::new(Callable::nullary("late", || {}))
                .marker(HookMarker::for_event::<RoundStartedArgs>())
                .module("lobby"),
        )
        .unwrap();

    let removed = manager.unload_module("lobby").await.unwrap();
    assert_eq!(removed, 5);
    assert!(registry.is_empty());
    assert!(manager.list_modules().await.is_empty());

    assert!(manager.dispatcher().fire(&joined("Kappa")));
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn test_unload_all() {
    let manager = ModuleManager::default();
    manager
        .load_module(Arc::new(LobbyModule::new(Recorder::new())))
        .await
        .unwrap();
    assert_eq!(manager.list_modules().await.len(), 1);

    manager.unload_all().await.unwrap();
    assert!(manager.list_modules().await.is_empty());
    assert!(manager.hook_registry().is_empty());
}

#[tokio::test]
async fn test_disposed_instance_is_pruned() {
    let manager = ModuleManager::new(
        Arc::new(EventCatalog::builtin()),
        HookConfig::default(),
        ModuleConfig::default(),
    );
    let recorder = Recorder::new();
    let module = Arc::new(LobbyModule::new(recorder.clone()));
    manager.load_module(module.clone()).await.unwrap();

    module.lobby.dispose();
    let result = manager
        .dispatcher()
        .dispatch_report(EventType::of::<PlayerJoinedArgs>(), &joined("Zeta"));

    assert!(result.permitted);
    assert_eq!(result.pruned, 1);
    assert_eq!(recorder.calls(), vec!["joined Zeta"]);
    assert_eq!(
        manager
            .hook_registry()
            .handler_count(EventType::of::<PlayerJoinedArgs>()),
        2
    );
}

#[test]
fn test_register_type_at_runtime() {
    let dispatcher = helpers::dispatcher();
    let recorder = Recorder::new();
    let owner = InstanceToken::new();

    let on_ping = {
        let recorder = recorder.clone();
        Callable::nullary("on_ping", move || recorder.record("door"))
    };
    let decl = TypeDecl::instance("Door", owner.clone())
        .method(MethodDecl::new(on_ping.on_instance()).on("ping"));

    let registry = dispatcher.registry();
    let report = registry.register_type(&decl, None);
    assert_eq!(report.registered, 1);

    dispatcher.fire(&helpers::ping());
    assert_eq!(recorder.calls(), vec!["door"]);

    assert_eq!(registry.unregister_type("Door", Some(&owner)), 1);
    assert!(registry.is_empty());
}

#[test]
fn test_discovered_handler_keeps_callable_identity() {
    let dispatcher = helpers::dispatcher();
    let recorder = Recorder::new();
    let owner = InstanceToken::new();

    let on_ping = {
        let recorder = recorder.clone();
        Callable::nullary("Door::on_ping", move || recorder.record("door")).on_instance()
    };
    let decl = TypeDecl::instance("Door", owner.clone())
        .method(MethodDecl::new(on_ping.clone()).on("ping"));

    let registry = dispatcher.registry();
    assert_eq!(registry.register_type(&decl, None).registered, 1);

    let err = registry
        .register_callable(
            on_ping.clone(),
            Some(owner.clone()),
            Some(EventType::of::<helpers::PingArgs>()),
        )
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Duplicate { .. }));

    dispatcher.fire(&helpers::ping());
    assert_eq!(recorder.calls(), vec!["door"]);

    assert_eq!(registry.unregister(on_ping.id(), Some(&owner)), 1);
    assert!(registry.is_empty());
}
