mod battleground_service;

pub use battleground_service::BattlegroundService;
