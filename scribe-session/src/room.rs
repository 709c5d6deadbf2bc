//! Room selection.

use std::fmt;

/// Room joined when the query string does not name one.
pub const DEFAULT_ROOM_ID: &str = "my-room";

/// The room a session scope is opened for.
///
/// Any non-empty string is accepted; what counts as a valid room is the
/// collaboration backend's decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomSelector {
    room_id: String,
}

impl RoomSelector {
    pub fn resolve(room_id: Option<&str>) -> Self {
        match room_id.filter(|id| !id.is_empty()) {
            Some(id) => Self { room_id: id.to_owned() },
            None => Self::default(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }
}

impl Default for RoomSelector {
    fn default() -> Self {
        Self {
            room_id: DEFAULT_ROOM_ID.to_owned(),
        }
    }
}

impl fmt::Display for RoomSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_room() {
        assert_eq!(RoomSelector::resolve(None).room_id(), "my-room");
        assert_eq!(RoomSelector::resolve(Some("")).room_id(), "my-room");
    }

    #[test]
    fn test_override_is_verbatim() {
        assert_eq!(RoomSelector::resolve(Some("team-42")).room_id(), "team-42");
        assert_eq!(
            RoomSelector::resolve(Some("../../etc/passwd")).room_id(),
            "../../etc/passwd"
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let first = RoomSelector::resolve(Some("design"));
        let second = RoomSelector::resolve(Some("design"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_display() {
        assert_eq!(RoomSelector::resolve(Some("alpha")).to_string(), "alpha");
    }
}
