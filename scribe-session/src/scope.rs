//! Collaboration backend contracts.
//!
//! A [`Backend`] opens a [`SessionScope`] for one room. The scope owns
//! presence and storage for that room and reports its readiness through a
//! [`tokio::sync::watch`] channel, which is the suspension point the
//! bootstrap renders `Loading` behind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::credential::ValidCredential;
use crate::room::RoomSelector;

/// String key/value state shared through a session scope.
pub type StateMap = BTreeMap<String, String>;

/// Initial presence and storage handed to the backend on enter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialState {
    pub presence: StateMap,
    pub storage: StateMap,
}

/// Readiness of a session scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeStatus {
    /// Connection in progress; render stays suspended.
    Connecting,
    /// Backend reported the room as ready.
    Connected,
    /// Backend signalled an error after the scope was created.
    Failed(String),
}

impl ScopeStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Connecting)
    }
}

/// Errors constructing a session scope.
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("No async runtime available: {0}")]
    Runtime(String),
    #[error("Invalid backend endpoint: {0}")]
    Endpoint(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Presence/storage for one room, as provided by the collaboration backend.
pub trait SessionScope {
    fn room_id(&self) -> &str;

    /// Current readiness, without waiting.
    fn status(&self) -> ScopeStatus;

    /// Receiver that observes every readiness change.
    fn subscribe(&self) -> watch::Receiver<ScopeStatus>;
}

/// Factory for session scopes.
pub trait Backend {
    type Scope: SessionScope;

    /// Open a scope for `room`. Must not block; connection proceeds in the
    /// background and is observed through [`SessionScope::subscribe`].
    fn enter(
        &self,
        credential: &ValidCredential,
        room: &RoomSelector,
        initial: InitialState,
    ) -> Result<Self::Scope, ScopeError>;
}

/// Wait until `readiness` leaves [`ScopeStatus::Connecting`].
///
/// A dropped sender is reported as a failure.
pub async fn wait_settled(readiness: &mut watch::Receiver<ScopeStatus>) -> ScopeStatus {
    match readiness.wait_for(ScopeStatus::is_settled).await {
        Ok(status) => status.clone(),
        Err(_) => ScopeStatus::Failed("session scope closed".into()),
    }
}
