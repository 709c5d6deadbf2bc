//! Presence bookkeeping for a room connection.
//!
//! Outgoing presence is throttled to one update per interval (100ms by
//! default). Incoming presence is kept per remote connection until that
//! connection leaves.

use scribe_session::{StateMap, UserIdentity};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Presence keys used to announce the local user.
pub const PRESENCE_ID: &str = "id";
pub const PRESENCE_NAME: &str = "name";
pub const PRESENCE_AVATAR: &str = "avatar";
pub const PRESENCE_COLOR: &str = "color";

/// Default minimum interval between outgoing presence updates.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);

/// Rate limiter for outgoing presence.
#[derive(Debug, Clone)]
pub struct PresenceThrottle {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl PresenceThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// Returns `true` and records the send if the interval has elapsed.
    pub fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        match self.last_sent {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_sent = Some(now);
                true
            }
        }
    }

    /// Record a send that bypassed the limiter.
    pub fn mark_sent(&mut self) {
        self.last_sent = Some(Instant::now());
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PresenceThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE)
    }
}

/// Presence map announcing `user` to the room.
pub fn identity_presence(user: &UserIdentity) -> StateMap {
    StateMap::from([
        (PRESENCE_ID.to_owned(), user.id().to_owned()),
        (PRESENCE_NAME.to_owned(), user.display_name().to_owned()),
        (PRESENCE_AVATAR.to_owned(), user.avatar_url().to_owned()),
        (PRESENCE_COLOR.to_owned(), user.color().to_owned()),
    ])
}

#[derive(Debug, Clone)]
pub struct PeerPresence {
    pub presence: StateMap,
    pub last_update: Instant,
}

impl PeerPresence {
    pub fn display_name(&self) -> Option<&str> {
        self.presence.get(PRESENCE_NAME).map(String::as_str)
    }
}

/// Latest presence of every remote connection in the room.
#[derive(Debug, Default)]
pub struct PresenceTable {
    peers: HashMap<Uuid, PeerPresence>,
}

impl PresenceTable {
    /// Replace a peer's presence with `presence`.
    pub fn apply(&mut self, connection_id: Uuid, presence: StateMap) {
        self.peers.insert(
            connection_id,
            PeerPresence {
                presence,
                last_update: Instant::now(),
            },
        );
    }

    pub fn remove(&mut self, connection_id: &Uuid) -> Option<PeerPresence> {
        self.peers.remove(connection_id)
    }

    pub fn get(&self, connection_id: &Uuid) -> Option<&PeerPresence> {
        self.peers.get(connection_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Display names of all peers that announced one, sorted.
    pub fn display_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .peers
            .values()
            .filter_map(|p| p.display_name().map(str::to_owned))
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_acquire_succeeds() {
        let mut throttle = PresenceThrottle::new(Duration::from_secs(60));
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
    }

    #[test]
    fn test_acquire_after_interval() {
        let mut throttle = PresenceThrottle::new(Duration::from_millis(5));
        assert!(throttle.try_acquire());
        std::thread::sleep(Duration::from_millis(10));
        assert!(throttle.try_acquire());
    }

    #[test]
    fn test_mark_sent_blocks_next_acquire() {
        let mut throttle = PresenceThrottle::new(Duration::from_secs(60));
        throttle.mark_sent();
        assert!(!throttle.try_acquire());
    }

    #[test]
    fn test_default_interval() {
        assert_eq!(PresenceThrottle::default().interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_identity_presence() {
        let user = UserIdentity::resolve(Some("alice"));
        let presence = identity_presence(&user);
        assert_eq!(presence.get(PRESENCE_ID).map(String::as_str), Some("alice"));
        assert_eq!(presence.get(PRESENCE_NAME).map(String::as_str), Some("alice"));
        assert_eq!(presence.get(PRESENCE_AVATAR).map(String::as_str), Some(""));
        assert_eq!(presence.get(PRESENCE_COLOR).map(String::as_str), Some("#5371F7"));
    }

    #[test]
    fn test_table_apply_and_remove() {
        let mut table = PresenceTable::default();
        let bob = Uuid::new_v4();
        let eve = Uuid::new_v4();

        table.apply(bob, identity_presence(&UserIdentity::resolve(Some("bob"))));
        table.apply(eve, StateMap::new());
        assert_eq!(table.len(), 2);
        assert_eq!(table.display_names(), vec!["bob".to_owned()]);

        assert!(table.remove(&bob).is_some());
        assert!(table.get(&bob).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_apply_replaces() {
        let mut table = PresenceTable::default();
        let peer = Uuid::new_v4();
        table.apply(peer, StateMap::from([(PRESENCE_NAME.to_owned(), "old".to_owned())]));
        table.apply(peer, StateMap::from([(PRESENCE_NAME.to_owned(), "new".to_owned())]));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&peer).and_then(PeerPresence::display_name), Some("new"));
    }
}
