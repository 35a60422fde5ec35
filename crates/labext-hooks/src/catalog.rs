//! Named catalog of event types.
//!
//! Handlers that take no parameters, or only property parameters, have no
//! event type in their signature. They name a catalog entry instead.

use dashmap::DashMap;
use labext_core::events::{
    PlayerJoinedArgs, PlayerLeftArgs, PlayerSpawningArgs, PlayerUsingItemArgs, RoundEndedArgs,
    RoundRestartingArgs, RoundStartedArgs, WaitingForPlayersArgs,
};
use labext_core::{Event, EventType};
use tracing::debug;

/// Maps catalog names to event types.
#[derive(Debug, Default)]
pub struct EventCatalog {
    events: DashMap<String, EventType>,
}

impl EventCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in server events.
    pub fn builtin() -> Self {
        let catalog = Self::new();
        catalog.register::<WaitingForPlayersArgs>();
        catalog.register::<RoundStartedArgs>();
        catalog.register::<RoundEndedArgs>();
        catalog.register::<RoundRestartingArgs>();
        catalog.register::<PlayerJoinedArgs>();
        catalog.register::<PlayerLeftArgs>();
        catalog.register::<PlayerSpawningArgs>();
        catalog.register::<PlayerUsingItemArgs>();
        catalog
    }

    /// Registers `E` under its own name.
    pub fn register<E: Event>(&self) {
        self.register_as::<E>(E::NAME);
    }

    /// Registers `E` under `name`. A previous entry with the same name is
    /// replaced.
    pub fn register_as<E: Event>(&self, name: impl Into<String>) {
        let name = name.into();
        let event = EventType::of::<E>();
        if let Some(previous) = self.events.insert(name.clone(), event) {
            if previous != event {
                debug!(name = %name, previous = %previous, event = %event, "Catalog entry replaced");
            }
        }
    }

    /// Looks up an entry by name.
    pub fn resolve(&self, name: &str) -> Option<EventType> {
        self.events.get(name).map(|entry| *entry.value())
    }

    /// Returns all registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.events.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
