//! Plain-text editor over the room's shared text.

use std::fmt::Write as _;

use scribe_session::{Editor, EditorError, ScopeStatus, SessionScope, UserIdentity};

use crate::client::RoomClient;

/// Renders the shared text with a banner naming the local user.
///
/// The first successful render announces the user to the room.
#[derive(Debug, Default)]
pub struct SharedTextEditor {
    announced: bool,
}

impl SharedTextEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_announced(&self) -> bool {
        self.announced
    }
}

impl Editor<RoomClient> for SharedTextEditor {
    fn render(&mut self, user: &UserIdentity, scope: &RoomClient) -> Result<String, EditorError> {
        if let ScopeStatus::Failed(reason) = scope.status() {
            return Err(EditorError::Backend(reason));
        }
        if !self.announced {
            scope
                .announce(user)
                .map_err(|e| EditorError::Backend(e.to_string()))?;
            self.announced = true;
        }

        let text = scope
            .document_text()
            .map_err(|e| EditorError::Render(e.to_string()))?;
        let peers = scope
            .peer_names()
            .map_err(|e| EditorError::Render(e.to_string()))?;

        let mut view = String::new();
        let _ = writeln!(
            view,
            "{} | editing as {} ({})",
            scope.room_id(),
            user.display_name(),
            user.color()
        );
        match peers.len() {
            0 => view.push_str("No one else is here\n"),
            n => {
                let _ = writeln!(view, "{n} other participant(s): {}", peers.join(", "));
            }
        }
        view.push('\n');
        view.push_str(&text);
        Ok(view)
    }
}
