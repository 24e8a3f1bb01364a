//! Socket transport seam for the notification client.
//!
//! A connector opens one connection per call and reports everything that
//! happens to it as [`TransportEvent`]s tagged with the connection id it was
//! given, so the client can discard events from superseded connections.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

pub type ConnectionId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    Open,
    Message(String),
    Close,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub connection: ConnectionId,
    pub kind: TransportEventKind,
}

pub type EventSender = mpsc::UnboundedSender<TransportEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Handle to one open or opening connection.
pub trait SocketConnection: Send {
    /// Request the connection to close. Must not block; the `Close` event follows asynchronously.
    fn close(&mut self);
}

pub trait SocketConnector: Send {
    fn open(&mut self, url: &str, id: ConnectionId, events: EventSender) -> AppResult<Box<dyn SocketConnection>>;
}

/// WebSocket transport on tokio-tungstenite. `open` must be called inside a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

struct TungsteniteConnection {
    close_tx: Option<oneshot::Sender<()>>,
}

impl SocketConnection for TungsteniteConnection {
    fn close(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl SocketConnector for TungsteniteConnector {
    fn open(&mut self, url: &str, id: ConnectionId, events: EventSender) -> AppResult<Box<dyn SocketConnection>> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::Transport { code: "no_runtime".into(), message: e.to_string() })?;
        let (close_tx, close_rx) = oneshot::channel();
        handle.spawn(drive(url.to_string(), id, events, close_rx));
        Ok(Box::new(TungsteniteConnection { close_tx: Some(close_tx) }))
    }
}

fn emit(events: &EventSender, connection: ConnectionId, kind: TransportEventKind) {
    // receiver gone means the client was dropped
    let _ = events.send(TransportEvent { connection, kind });
}

// A dropped close sender counts as a close request.
async fn drive(url: String, id: ConnectionId, events: EventSender, mut close_rx: oneshot::Receiver<()>) {
    let stream = tokio::select! {
        res = tokio_tungstenite::connect_async(url.as_str()) => match res {
            Ok((stream, _resp)) => stream,
            Err(e) => {
                warn!(target: "notify", connection = id, "connect failed: {e}");
                emit(&events, id, TransportEventKind::Error(e.to_string()));
                emit(&events, id, TransportEventKind::Close);
                return;
            }
        },
        _ = &mut close_rx => {
            debug!(target: "notify", connection = id, "closed before open");
            emit(&events, id, TransportEventKind::Close);
            return;
        }
    };
    emit(&events, id, TransportEventKind::Open);
    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            _ = &mut close_rx => {
                let _ = sink.send(Message::Close(None)).await;
                emit(&events, id, TransportEventKind::Close);
                break;
            }
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => emit(&events, id, TransportEventKind::Message(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    emit(&events, id, TransportEventKind::Message(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Some(Ok(Message::Close(_))) | None => {
                    emit(&events, id, TransportEventKind::Close);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(target: "notify", connection = id, "socket error: {e}");
                    emit(&events, id, TransportEventKind::Error(e.to_string()));
                    emit(&events, id, TransportEventKind::Close);
                    break;
                }
            }
        }
    }
    debug!(target: "notify", connection = id, "transport task finished");
}
