//!
//! gompet notification client
//! --------------------------
//! Client side of the per-user notification socket.
//!
//! Responsibilities:
//! - Hold at most one live socket connection and release it before opening another.
//! - Decode pushed payloads and render them as display messages with optional detail links.
//! - Synthesize lifecycle messages for open/close/error and keep the last 20 messages.

pub mod client;
pub mod display;
pub mod payload;
pub mod transport;

pub use client::{socket_url, ConnectionStatus, NotificationClient, TokenEncoding};
pub use display::{
    render_frame, Catalog, DisplayLog, DisplayMessage, LifecycleEvent, MessageKind, Rendered, MAX_DISPLAY_MESSAGES,
};
pub use payload::{Actor, NotificationPayload, ObjectId, Origin, TargetKind};
pub use transport::{
    ConnectionId, SocketConnection, SocketConnector, TransportEvent, TransportEventKind, TungsteniteConnector,
};
