//! Notification socket client.
//!
//! Holds at most one live connection. `connect` always releases the previous
//! connection before the next one is constructed, and events tagged with a
//! superseded connection id are dropped. Transport failures end up in the
//! status and the display log; nothing is raised to the caller. There is no
//! automatic reconnect: after a close the caller has to `connect` again.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::display::{render_frame, render_lifecycle, Catalog, DisplayLog, DisplayMessage, LifecycleEvent};
use super::transport::{
    ConnectionId, EventReceiver, EventSender, SocketConnection, SocketConnector, TransportEvent, TransportEventKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn label<'a>(&self, catalog: &'a Catalog) -> &'a str {
        match self {
            ConnectionStatus::Disconnected => &catalog.status_disconnected,
            ConnectionStatus::Connecting => &catalog.status_connecting,
            ConnectionStatus::Connected => &catalog.status_connected,
            ConnectionStatus::Error => &catalog.status_error,
        }
    }
}

/// How the token is appended to the socket base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenEncoding {
    /// Plain concatenation, byte for byte.
    #[default]
    Raw,
    Percent,
}

pub fn socket_url(base: &str, token: &str, encoding: TokenEncoding) -> String {
    match encoding {
        TokenEncoding::Raw => format!("{base}{token}"),
        TokenEncoding::Percent => format!("{base}{}", urlencoding::encode(token)),
    }
}

struct LiveConnection {
    id: ConnectionId,
    handle: Box<dyn SocketConnection>,
}

pub struct NotificationClient<C: SocketConnector> {
    connector: C,
    catalog: Catalog,
    encoding: TokenEncoding,
    slot: Option<LiveConnection>,
    /// Connection whose events are still honoured; survives `disconnect` so its close is logged.
    current: Option<ConnectionId>,
    last_id: ConnectionId,
    status: ConnectionStatus,
    log: DisplayLog,
    events_tx: EventSender,
    events_rx: EventReceiver,
}

impl<C: SocketConnector> NotificationClient<C> {
    pub fn new(connector: C) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            catalog: Catalog::default(),
            encoding: TokenEncoding::default(),
            slot: None,
            current: None,
            last_id: 0,
            status: ConnectionStatus::Disconnected,
            log: DisplayLog::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_token_encoding(mut self, encoding: TokenEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn status(&self) -> ConnectionStatus { self.status }

    pub fn status_label(&self) -> &str { self.status.label(&self.catalog) }

    pub fn catalog(&self) -> &Catalog { &self.catalog }

    /// Display messages, most recent first.
    pub fn messages(&self) -> impl Iterator<Item = &DisplayMessage> { self.log.iter() }

    pub fn latest(&self) -> Option<&DisplayMessage> { self.log.latest() }

    pub fn message_count(&self) -> usize { self.log.len() }

    pub fn has_connection(&self) -> bool { self.slot.is_some() }

    pub fn connection_id(&self) -> Option<ConnectionId> { self.slot.as_ref().map(|l| l.id) }

    pub fn connector(&self) -> &C { &self.connector }

    pub fn connect(&mut self, base_url: &str, token: &str) {
        // release first so two connections never coexist
        self.disconnect();
        self.last_id += 1;
        let id = self.last_id;
        self.current = Some(id);
        let url = socket_url(base_url, token, self.encoding);
        self.status = ConnectionStatus::Connecting;
        debug!(target: "notify", connection = id, "connecting");
        match self.connector.open(&url, id, self.events_tx.clone()) {
            Ok(handle) => self.slot = Some(LiveConnection { id, handle }),
            Err(e) => {
                warn!(target: "notify", connection = id, "could not start connection: {e}");
                self.current = None;
                self.status = ConnectionStatus::Error;
                self.log.push(render_lifecycle(LifecycleEvent::Error, &self.catalog));
            }
        }
    }

    /// Idempotent; the matching `Close` event still arrives and is logged.
    pub fn disconnect(&mut self) {
        if let Some(mut live) = self.slot.take() {
            debug!(target: "notify", connection = live.id, "closing");
            live.handle.close();
        }
    }

    /// Apply one transport event. Returns false when the event was stale and ignored.
    pub fn handle_event(&mut self, event: TransportEvent) -> bool {
        if self.current != Some(event.connection) {
            debug!(target: "notify", connection = event.connection, "ignoring event from superseded connection");
            return false;
        }
        match event.kind {
            TransportEventKind::Open => {
                info!(target: "notify", connection = event.connection, "connected");
                self.status = ConnectionStatus::Connected;
                self.log.push(render_lifecycle(LifecycleEvent::Connected, &self.catalog));
            }
            TransportEventKind::Message(frame) => {
                self.log.push(render_frame(&frame, &self.catalog));
            }
            TransportEventKind::Close => {
                info!(target: "notify", connection = event.connection, "connection closed");
                self.status = ConnectionStatus::Disconnected;
                self.log.push(render_lifecycle(LifecycleEvent::Closed, &self.catalog));
                if self.slot.as_ref().is_some_and(|l| l.id == event.connection) {
                    self.slot = None;
                }
                self.current = None;
            }
            TransportEventKind::Error(reason) => {
                warn!(target: "notify", connection = event.connection, "transport error: {reason}");
                self.status = ConnectionStatus::Error;
                self.log.push(render_lifecycle(LifecycleEvent::Error, &self.catalog));
            }
        }
        true
    }

    /// Wait for the next transport event and apply it.
    pub async fn pump(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.handle_event(event),
            None => false,
        }
    }

    /// Apply every event already queued without waiting. Returns how many were applied.
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.handle_event(event) { applied += 1; }
        }
        applied
    }
}

impl<C: SocketConnector> Drop for NotificationClient<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
