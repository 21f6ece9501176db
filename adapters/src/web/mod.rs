mod http;
mod state;
mod websocket;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

pub use http::get_queues;
pub use state::AppState;
pub use websocket::{IncomingMessage, WebSocketNotifier, handle_connection};

/// Routes of the client-facing server: the game socket and the queue listing.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(handle_connection))
        .route("/queues", get(get_queues))
        .with_state(state)
}
