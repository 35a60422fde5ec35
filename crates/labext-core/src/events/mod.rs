//! Built-in game events fired by the host.
//!
//! Each type here is an event-argument shape that handlers subscribe to.
//! Catalog names match [`Event::NAME`](crate::traits::event::Event::NAME).

pub mod player;
pub mod round;

pub use player::{PlayerJoinedArgs, PlayerLeftArgs, PlayerSpawningArgs, PlayerUsingItemArgs};
pub use round::{RoundEndedArgs, RoundRestartingArgs, RoundStartedArgs, WaitingForPlayersArgs};
