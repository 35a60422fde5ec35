//! Round lifecycle events.

use crate::event_args;

event_args! {
    /// The server is idle and waiting for players before a round.
    pub struct WaitingForPlayersArgs as "waiting_for_players" {}
}

event_args! {
    /// A round has started.
    pub struct RoundStartedArgs as "round_started" {}
}

event_args! {
    /// A round has ended.
    pub struct RoundEndedArgs as "round_ended" {
        /// Team that won the round.
        pub leading_team: String,
    }
}

event_args! {
    /// The round is restarting.
    pub struct RoundRestartingArgs as "round_restarting" {}
}
