mod handler;
mod notifier;

pub use handler::{IncomingMessage, handle_connection};
pub use notifier::WebSocketNotifier;
