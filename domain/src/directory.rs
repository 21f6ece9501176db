use crate::{PlayerId, Position};

/// Lookup of live player state owned by the world simulation.
///
/// Lookups never fail loudly: an offline or unknown player simply yields `false` / `None`.
pub trait PlayerDirectory: Send + Sync {
    fn is_online(
        &self,
        player_id: PlayerId,
    ) -> bool;

    fn is_alive(
        &self,
        player_id: PlayerId,
    ) -> bool;

    fn position(
        &self,
        player_id: PlayerId,
    ) -> Option<Position>;
}
