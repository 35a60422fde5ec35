//! Player events.

use crate::event_args;

event_args! {
    /// A player finished authenticating and joined the server.
    pub struct PlayerJoinedArgs as "player_joined" {
        pub player_id: u32,
        pub nickname: String,
        pub user_id: String,
    }
}

event_args! {
    /// A player disconnected.
    pub struct PlayerLeftArgs as "player_left" {
        pub player_id: u32,
    }
}

event_args! {
    /// A player is about to spawn as a role. Cancellable.
    pub struct PlayerSpawningArgs as "player_spawning" {
        pub player_id: u32,
        pub role: String,
        pub position: [f32; 3],
    }
}

event_args! {
    /// A player started using an item. Cancellable.
    ///
    /// Handlers may rewrite the cooldown and speed multiplier when the event is
    /// fired mutably. A positive `remaining_cooldown` rejects the use; a
    /// non-positive `speed_multiplier` stops it from starting.
    pub struct PlayerUsingItemArgs as "player_using_item" {
        pub player_id: u32,
        pub item: String,
        pub item_serial: u16,
        /// Seconds left before the item may be used again.
        pub remaining_cooldown: f32,
        /// Use speed multiplier.
        pub speed_multiplier: f32,
    }
}
