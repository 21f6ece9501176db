pub mod ports;

pub use ports::in_::BattlegroundService;
pub use ports::out_::BattlegroundServiceError;
