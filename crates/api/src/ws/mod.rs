//! WebSocket infrastructure for live unread counts.
//!
//! Provides connection management, heartbeat pings, the HTTP upgrade
//! handler, and [`WsBroadcaster`], the engine's `Broadcaster` over these
//! connections.

mod broadcaster;
mod handler;
mod heartbeat;
pub mod manager;

pub use broadcaster::{unread_count_message, WsBroadcaster};
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
