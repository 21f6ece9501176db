use std::sync::Arc;

use application::BattlegroundService;

use super::websocket::WebSocketNotifier;
use crate::InMemoryPlayerDirectory;

pub struct AppState {
    pub service: Arc<BattlegroundService>,
    pub notifier: Arc<WebSocketNotifier>,
    /// Connection-backed presence. A socket marks its player online for as long as it stays open.
    pub directory: Arc<InMemoryPlayerDirectory>,
}

impl AppState {
    pub fn new(
        service: Arc<BattlegroundService>,
        notifier: Arc<WebSocketNotifier>,
        directory: Arc<InMemoryPlayerDirectory>,
    ) -> Self {
        Self {
            service,
            notifier,
            directory,
        }
    }
}
