//! Editor contract.

use thiserror::Error;

use crate::identity::UserIdentity;
use crate::scope::SessionScope;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Failed to render document: {0}")]
    Render(String),
}

/// Collaborative document surface rendered inside a connected scope.
pub trait Editor<S: SessionScope> {
    /// Produce the editor's current view for `user`.
    fn render(&mut self, user: &UserIdentity, scope: &S) -> Result<String, EditorError>;
}
