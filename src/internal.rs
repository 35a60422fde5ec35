//! Built-in module tracking round state and connected players.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use labext_core::events::{PlayerJoinedArgs, PlayerLeftArgs, PlayerUsingItemArgs, RoundEndedArgs};
use labext_hooks::prelude::*;
use tracing::{debug, info};

/// Round lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoundPhase {
    #[default]
    WaitingForPlayers,
    InProgress,
    Ended,
    Restarting,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WaitingForPlayers => "waiting_for_players",
            Self::InProgress => "in_progress",
            Self::Ended => "ended",
            Self::Restarting => "restarting",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Default)]
struct State {
    phase: RoundPhase,
    players: HashSet<u32>,
}

/// Round and player bookkeeping shared by the internal hooks.
#[derive(Debug, Clone, Default)]
pub struct RoundTracker {
    state: Arc<Mutex<State>>,
}

impl RoundTracker {
    /// Returns the current phase.
    pub fn phase(&self) -> RoundPhase {
        self.lock().phase
    }

    /// Returns the number of connected players.
    pub fn player_count(&self) -> usize {
        self.lock().players.len()
    }

    fn set_phase(&self, phase: RoundPhase) {
        let mut state = self.lock();
        if state.phase != phase {
            info!(from = %state.phase, to = %phase, "Round phase changed");
            state.phase = phase;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Round events re-published as delegate fields, plus the player tracker.
#[derive(Debug)]
pub struct InternalModule {
    tracker: RoundTracker,
    players: InstanceToken,
    pub on_waiting_for_players: Delegate<()>,
    pub on_round_started: Delegate<()>,
    pub on_round_ended: Delegate<RoundEndedArgs>,
    pub on_round_restarting: Delegate<()>,
}

impl InternalModule {
    pub fn new() -> Self {
        let module = Self {
            tracker: RoundTracker::default(),
            players: InstanceToken::new(),
            on_waiting_for_players: Delegate::new(),
            on_round_started: Delegate::new(),
            on_round_ended: Delegate::new(),
            on_round_restarting: Delegate::new(),
        };

        let tracker = module.tracker.clone();
        module
            .on_waiting_for_players
            .subscribe(move |_| tracker.set_phase(RoundPhase::WaitingForPlayers));
        let tracker = module.tracker.clone();
        module
            .on_round_started
            .subscribe(move |_| tracker.set_phase(RoundPhase::InProgress));
        let tracker = module.tracker.clone();
        module.on_round_ended.subscribe(move |ev| {
            info!(leading_team = %ev.leading_team, "Round ended");
            tracker.set_phase(RoundPhase::Ended);
        });
        let tracker = module.tracker.clone();
        module.on_round_restarting.subscribe(move |_| {
            let mut state = tracker.lock();
            state.players.clear();
            drop(state);
            tracker.set_phase(RoundPhase::Restarting);
        });

        module
    }

    /// Returns the shared tracker.
    pub fn tracker(&self) -> &RoundTracker {
        &self.tracker
    }

    fn round_type(&self) -> TypeDecl {
        TypeDecl::new("ExRound")
            .event(
                EventDecl::action("on_waiting_for_players", &self.on_waiting_for_players)
                    .marked(HookMarker::new().with_priority(HookPriority::AlwaysFirst))
                    .on("waiting_for_players"),
            )
            .event(
                EventDecl::action("on_round_started", &self.on_round_started)
                    .marked(HookMarker::new().with_priority(HookPriority::AlwaysFirst))
                    .on("round_started"),
            )
            .event(
                EventDecl::of("on_round_ended", &self.on_round_ended)
                    .marked(HookMarker::new().with_priority(HookPriority::AlwaysLast)),
            )
            .event(
                EventDecl::action("on_round_restarting", &self.on_round_restarting)
                    .marked(HookMarker::new().with_priority(HookPriority::AlwaysFirst))
                    .on("round_restarting"),
            )
    }

    fn players_type(&self) -> TypeDecl {
        let joined = {
            let tracker = self.tracker.clone();
            Callable::for_event::<PlayerJoinedArgs, _, _>("PlayerTracker::on_joined", move |ev| {
                tracker.lock().players.insert(ev.player_id);
                debug!(player_id = ev.player_id, nickname = %ev.nickname, "Player tracked");
            })
            .on_instance()
        };

        let left = {
            let tracker = self.tracker.clone();
            Callable::for_event::<PlayerLeftArgs, _, _>("PlayerTracker::on_left", move |ev| {
                tracker.lock().players.remove(&ev.player_id);
            })
            .on_instance()
        };

        let using_item = {
            let tracker = self.tracker.clone();
            Callable::from_properties("PlayerTracker::on_using_item", &["player_id", "item"], move |values| {
                if tracker.phase() == RoundPhase::InProgress {
                    Cancellation::allow()
                } else {
                    Cancellation::deny(format!(
                        "player {} cannot use {} before the round starts",
                        values[0], values[1]
                    ))
                }
            })
            .on_instance()
        };

        let item_pace = {
            let tracker = self.tracker.clone();
            Callable::for_event_mut::<PlayerUsingItemArgs, _, _>(
                "PlayerTracker::on_item_pace",
                move |ev| {
                    // Untracked players cannot start using items.
                    if !tracker.lock().players.contains(&ev.player_id) {
                        ev.speed_multiplier = 0.0;
                    }
                },
            )
            .on_instance()
        };

        let round_timer = Callable::nullary("PlayerTracker::round_timer", || {
            let mut elapsed = 0u32;
            Routine::from_fn(move || {
                elapsed += 1;
                debug!(seconds = elapsed, "Round timer");
                if elapsed >= 3 {
                    Step::Done
                } else {
                    Step::Wait(59)
                }
            })
        });

        TypeDecl::instance("PlayerTracker", self.players.clone())
            .method(MethodDecl::hook(joined, HookMarker::new()))
            .method(MethodDecl::hook(left, HookMarker::new()))
            .method(MethodDecl::new(using_item).on("player_using_item"))
            .method(MethodDecl::hook(item_pace, HookMarker::new()))
            .method(MethodDecl::new(round_timer).on("round_started"))
    }
}

impl Default for InternalModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HookModule for InternalModule {
    fn info(&self) -> ModuleInfo {
        ModuleInfo {
            id: "labext.internal".to_string(),
            name: "LabExtended Internal".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: "LabExtended Team".to_string(),
            description: "Round state and player tracking".to_string(),
        }
    }

    fn declare(&self) -> Result<Vec<TypeDecl>, DiscoveryError> {
        Ok(vec![self.round_type(), self.players_type()])
    }

    async fn on_unload(&self) -> Result<(), String> {
        self.players.dispose();
        Ok(())
    }
}
