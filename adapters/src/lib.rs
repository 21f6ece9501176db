mod in_memory;
mod ticker;
pub mod web;

pub use in_memory::{InMemory, InMemoryPlayerDirectory};
pub use ticker::{TickDriver, TokioTimer};
pub use web::{AppState, IncomingMessage, WebSocketNotifier, router};
