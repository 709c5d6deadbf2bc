//! # scribe-collab: WebSocket room backend for Scribe sessions
//!
//! Implements the `scribe-session` backend and editor contracts on top of a
//! binary WebSocket protocol and a yrs document.
//!
//! ## Architecture
//!
//! ```text
//! SessionBootstrap ──► RoomBackend::enter ──► RoomClient ◄── SharedTextEditor
//!                                                 │
//!                                    watch<ScopeStatus>, Arc<Mutex<Doc>>
//!                                                 │
//!                                         connection task
//!                                                 │  WebSocket, bincode
//!                                                 ▼
//!                                           room server
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: wire messages (bincode-encoded RoomMessage)
//! - [`presence`]: presence throttle and peer table
//! - [`client`]: the room connection and session scope
//! - [`editor`]: shared text editor

pub mod client;
pub mod editor;
pub mod presence;
pub mod protocol;

// Re-exports for convenience
pub use client::{room_url, ClientConfig, RoomBackend, RoomClient, TEXT_NAME};
pub use editor::SharedTextEditor;
pub use presence::{identity_presence, PeerPresence, PresenceTable, PresenceThrottle, DEFAULT_THROTTLE};
pub use protocol::{EnterRequest, MessageType, ProtocolError, RoomMessage};
