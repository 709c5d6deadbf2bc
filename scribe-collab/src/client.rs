//! WebSocket session scope for one room.
//!
//! Provides:
//! - [`RoomBackend`], the [`Backend`] that opens a [`RoomClient`] per room
//! - Connection lifecycle reported through [`ScopeStatus`]
//! - Shared text storage backed by a yrs document
//! - Throttled presence updates
//!
//! The connection runs on a background task. [`RoomClient`] methods never
//! block on the network: outgoing frames go through a bounded channel and
//! fail with [`ProtocolError::Backpressure`] when it is full.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use scribe_session::{
    Backend, InitialState, RoomSelector, ScopeError, ScopeStatus, SessionScope, StateMap,
    UserIdentity, ValidCredential,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use uuid::Uuid;
use yrs::updates::decoder::Decode;
use yrs::{Doc, GetString, ReadTxn, Text, Transact, Update, WriteTxn};

use crate::presence::{identity_presence, PresenceTable, PresenceThrottle, DEFAULT_THROTTLE};
use crate::protocol::{EnterRequest, MessageType, ProtocolError, RoomMessage};

/// Name of the shared text in the room document.
pub const TEXT_NAME: &str = "content";

/// Time a dropped client gets to flush its queue and close the socket.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base WebSocket URL; the room id is appended as a path segment
    pub endpoint: String,
    /// Minimum interval between presence updates
    pub throttle: Duration,
    /// Give up if the WebSocket handshake takes longer than this
    pub connect_timeout: Duration,
    /// Outgoing frames buffered before sends fail
    pub outgoing_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:9090".to_string(),
            throttle: DEFAULT_THROTTLE,
            connect_timeout: Duration::from_secs(10),
            outgoing_capacity: 256,
        }
    }
}

/// Opens [`RoomClient`]s on the current tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct RoomBackend {
    config: ClientConfig,
}

impl RoomBackend {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl Backend for RoomBackend {
    type Scope = RoomClient;

    fn enter(
        &self,
        credential: &ValidCredential,
        room: &RoomSelector,
        initial: InitialState,
    ) -> Result<RoomClient, ScopeError> {
        let runtime = Handle::try_current().map_err(|e| ScopeError::Runtime(e.to_string()))?;
        let url = room_url(&self.config.endpoint, room.room_id())?;
        let request = EnterRequest {
            public_key: credential.expose().to_owned(),
            initial,
        };
        RoomClient::spawn(&runtime, &self.config, url, room.room_id(), &request)
    }
}

/// `{endpoint}/{room_id}`, with the room id percent-encoded as one segment.
pub fn room_url(endpoint: &str, room_id: &str) -> Result<String, ScopeError> {
    let invalid = |reason: &str| ScopeError::Endpoint(format!("{endpoint}: {reason}"));

    let mut url = Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(invalid("expected a ws:// or wss:// URL"));
    }
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot have a path"))?
        .pop_if_empty()
        .push(room_id);
    Ok(url.into())
}

/// State shared between the client handle and its connection task.
struct Shared {
    doc: Mutex<Doc>,
    presence: Mutex<PresenceTable>,
}

impl Shared {
    fn new() -> Self {
        Self {
            doc: Mutex::new(Doc::new()),
            presence: Mutex::new(PresenceTable::default()),
        }
    }

    fn doc(&self) -> Result<MutexGuard<'_, Doc>, ProtocolError> {
        self.doc.lock().map_err(|_| ProtocolError::Poisoned)
    }

    fn presence(&self) -> Result<MutexGuard<'_, PresenceTable>, ProtocolError> {
        self.presence.lock().map_err(|_| ProtocolError::Poisoned)
    }

    fn apply_update(&self, bytes: &[u8]) -> Result<(), ProtocolError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let update =
            Update::decode_v1(bytes).map_err(|e| ProtocolError::InvalidUpdate(e.to_string()))?;
        let doc = self.doc()?;
        let mut txn = doc.transact_mut();
        let applied = txn.apply_update(update);
        applied.map_err(|e| ProtocolError::InvalidUpdate(e.to_string()))
    }

    fn read_text(&self) -> Result<String, ProtocolError> {
        let doc = self.doc()?;
        let txn = doc.transact();
        let text = txn.get_text(TEXT_NAME).map(|text| text.get_string(&txn));
        Ok(text.unwrap_or_default())
    }

    /// Append `chunk` and return the encoded update.
    fn append_text(&self, chunk: &str) -> Result<Vec<u8>, ProtocolError> {
        let doc = self.doc()?;
        let mut txn = doc.transact_mut();
        let text = txn.get_or_insert_text(TEXT_NAME);
        let len = text.len(&txn);
        text.insert(&mut txn, len, chunk);
        Ok(txn.encode_update_v1())
    }
}

/// Background half of a [`RoomClient`].
struct Connection {
    connection_id: Uuid,
    url: String,
    connect_timeout: Duration,
    status: Arc<watch::Sender<ScopeStatus>>,
    shared: Arc<Shared>,
}

impl Connection {
    async fn run(self, enter: Vec<u8>, outgoing: mpsc::Receiver<Vec<u8>>) {
        match self.serve(enter, outgoing).await {
            Ok(()) => log::debug!("Connection {} to {} shut down", self.connection_id, self.url),
            Err(e) => {
                log::error!("Room connection to {} failed: {e}", self.url);
                self.status.send_replace(ScopeStatus::Failed(e.to_string()));
            }
        }
    }

    async fn serve(
        &self,
        enter: Vec<u8>,
        mut outgoing: mpsc::Receiver<Vec<u8>>,
    ) -> Result<(), ProtocolError> {
        let (ws_stream, _) = tokio::time::timeout(
            self.connect_timeout,
            tokio_tungstenite::connect_async(self.url.as_str()),
        )
        .await
        .map_err(|_| ProtocolError::Timeout(self.url.clone()))??;

        let (mut writer, mut reader) = ws_stream.split();
        writer.send(Message::Binary(enter.into())).await?;
        log::debug!("Sent enter request for {}", self.url);

        loop {
            tokio::select! {
                outbound = outgoing.recv() => match outbound {
                    Some(data) => writer.send(Message::Binary(data.into())).await?,
                    None => {
                        // Client handle dropped.
                        if let Err(e) = writer.send(Message::Close(None)).await {
                            log::debug!("Close handshake with {} failed: {e}", self.url);
                        }
                        return Ok(());
                    }
                },

                inbound = reader.next() => match inbound {
                    Some(Ok(Message::Binary(data))) => {
                        if let Some(reply) = self.handle_frame(&data)? {
                            writer.send(Message::Binary(reply.encode()?.into())).await?;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => writer.send(Message::Pong(data)).await?,
                    Some(Ok(Message::Close(_))) | None => return Err(ProtocolError::ConnectionClosed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }

    /// Apply one incoming frame; returns a reply to send, if any.
    fn handle_frame(&self, data: &[u8]) -> Result<Option<RoomMessage>, ProtocolError> {
        let msg = match RoomMessage::decode(data) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Failed to decode frame from {}: {e}", self.url);
                return Ok(None);
            }
        };
        if msg.connection_id == self.connection_id {
            return Ok(None);
        }

        match msg.msg_type {
            MessageType::RoomState => {
                self.shared.apply_update(&msg.payload)?;
                self.status.send_replace(ScopeStatus::Connected);
                log::info!("Room {} ready", msg.room_id);
            }
            MessageType::StorageUpdate => {
                self.shared.apply_update(&msg.payload)?;
                log::trace!("Applied storage update {} from {}", msg.clock, msg.connection_id);
            }
            MessageType::Presence => match msg.presence_state() {
                Ok(presence) => self.shared.presence()?.apply(msg.connection_id, presence),
                Err(e) => log::warn!("Bad presence from {}: {e}", msg.connection_id),
            },
            MessageType::Leave => {
                let mut presence = self.shared.presence()?;
                presence.remove(&msg.connection_id);
                log::debug!("Peer {} left room {}", msg.connection_id, msg.room_id);
                if presence.is_empty() {
                    log::debug!("No other participants left in room {}", msg.room_id);
                }
            }
            MessageType::Rejected => {
                return Err(ProtocolError::Rejected(msg.rejection_reason()?));
            }
            MessageType::Ping => return Ok(Some(RoomMessage::pong(self.connection_id))),
            MessageType::Pong | MessageType::Enter => {
                log::debug!("Ignoring {:?} message", msg.msg_type);
            }
        }
        Ok(None)
    }
}

/// Session scope for one room, connected over WebSocket.
pub struct RoomClient {
    connection_id: Uuid,
    room_id: String,
    url: String,
    status: Arc<watch::Sender<ScopeStatus>>,
    shared: Arc<Shared>,
    outgoing: mpsc::Sender<Vec<u8>>,
    throttle: Mutex<PresenceThrottle>,
    clock: AtomicU64,
    task: JoinHandle<()>,
}

impl RoomClient {
    fn spawn(
        runtime: &Handle,
        config: &ClientConfig,
        url: String,
        room_id: &str,
        request: &EnterRequest,
    ) -> Result<Self, ScopeError> {
        let connection_id = Uuid::new_v4();
        let enter = RoomMessage::enter(connection_id, room_id, request)
            .and_then(|msg| msg.encode())
            .map_err(|e| ScopeError::Backend(e.to_string()))?;

        let (status, _) = watch::channel(ScopeStatus::Connecting);
        let status = Arc::new(status);
        let shared = Arc::new(Shared::new());
        let (outgoing, outgoing_rx) = mpsc::channel(config.outgoing_capacity.max(1));

        let connection = Connection {
            connection_id,
            url: url.clone(),
            connect_timeout: config.connect_timeout,
            status: status.clone(),
            shared: shared.clone(),
        };
        let task = runtime.spawn(connection.run(enter, outgoing_rx));
        log::info!("Connecting to room {room_id} at {url}");

        Ok(Self {
            connection_id,
            room_id: room_id.to_owned(),
            url,
            status,
            shared,
            outgoing,
            throttle: Mutex::new(PresenceThrottle::new(config.throttle)),
            clock: AtomicU64::new(0),
            task,
        })
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current contents of the shared text.
    pub fn document_text(&self) -> Result<String, ProtocolError> {
        self.shared.read_text()
    }

    /// Append `chunk` to the shared text and broadcast the update.
    pub fn edit_text(&self, chunk: &str) -> Result<(), ProtocolError> {
        self.require_connected()?;
        let update = self.shared.append_text(chunk)?;
        let msg = RoomMessage::storage_update(self.connection_id, &self.room_id, self.next_clock(), update);
        self.send(&msg)
    }

    /// Send `presence` unless throttled or offline.
    ///
    /// Returns whether the update was sent.
    pub fn update_presence(&self, presence: &StateMap) -> Result<bool, ProtocolError> {
        if self.status() != ScopeStatus::Connected {
            return Ok(false);
        }
        if !self.throttle()?.try_acquire() {
            return Ok(false);
        }
        let msg = RoomMessage::presence(self.connection_id, &self.room_id, self.next_clock(), presence)?;
        self.send(&msg)?;
        Ok(true)
    }

    /// Announce `user` to the room, bypassing the throttle.
    pub fn announce(&self, user: &UserIdentity) -> Result<(), ProtocolError> {
        self.require_connected()?;
        let msg = RoomMessage::presence(
            self.connection_id,
            &self.room_id,
            self.next_clock(),
            &identity_presence(user),
        )?;
        self.send(&msg)?;
        self.throttle()?.mark_sent();
        Ok(())
    }

    /// Display names of the other participants that announced themselves.
    pub fn peer_names(&self) -> Result<Vec<String>, ProtocolError> {
        Ok(self.shared.presence()?.display_names())
    }

    pub fn peer_count(&self) -> Result<usize, ProtocolError> {
        Ok(self.shared.presence()?.len())
    }

    fn require_connected(&self) -> Result<(), ProtocolError> {
        match self.status() {
            ScopeStatus::Connected => Ok(()),
            _ => Err(ProtocolError::NotConnected),
        }
    }

    fn throttle(&self) -> Result<MutexGuard<'_, PresenceThrottle>, ProtocolError> {
        self.throttle.lock().map_err(|_| ProtocolError::Poisoned)
    }

    fn next_clock(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn send(&self, msg: &RoomMessage) -> Result<(), ProtocolError> {
        let encoded = msg.encode()?;
        self.outgoing.try_send(encoded).map_err(|e| match e {
            TrySendError::Full(_) => ProtocolError::Backpressure,
            TrySendError::Closed(_) => ProtocolError::ConnectionClosed,
        })
    }
}

impl SessionScope for RoomClient {
    fn room_id(&self) -> &str {
        &self.room_id
    }

    fn status(&self) -> ScopeStatus {
        self.status.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<ScopeStatus> {
        self.status.subscribe()
    }
}

impl Drop for RoomClient {
    /// Announces the leave and lets the connection task close the socket
    /// once the outgoing queue drains, aborting it after [`CLOSE_GRACE`].
    fn drop(&mut self) {
        if self.status() == ScopeStatus::Connected {
            if let Err(e) = self.send(&RoomMessage::leave(self.connection_id, &self.room_id)) {
                log::debug!("Could not announce leave from room {}: {e}", self.room_id);
            }
        }

        let abort = self.task.abort_handle();
        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(CLOSE_GRACE).await;
                    abort.abort();
                });
            }
            Err(_) => abort.abort(),
        }
    }
}
