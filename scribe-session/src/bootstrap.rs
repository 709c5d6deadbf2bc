//! Session bootstrap state machine.
//!
//! Every [`SessionBootstrap::render`] re-derives the [`BootstrapState`] from
//! the credential and the resolved context, in this order:
//!
//! ```text
//! credential missing?    ──► ConfigError      (terminal for this render)
//! credential malformed?  ──► CredentialError  (terminal for this render)
//! context unresolved?    ──► Loading
//! otherwise              ──► Ready(identity, room_id)
//! ```
//!
//! Failures after `Ready` are handled in two layers that sit outside the
//! state machine:
//!
//! - the editor boundary catches editor errors, editor panics and a scope
//!   that reports `Failed`;
//! - the outer boundary catches scope construction errors and any panic
//!   from the rest of the render.
//!
//! Both produce [`Surface::Failure`]; neither changes [`SessionBootstrap::state`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rand::Rng;
use thiserror::Error;
use tokio::sync::watch;

use crate::credential::{Credential, CredentialCheck, INVALID_FORMAT, MISSING_CREDENTIAL};
use crate::editor::{Editor, EditorError};
use crate::identity::UserIdentity;
use crate::query::QueryParams;
use crate::room::RoomSelector;
use crate::scope::{Backend, InitialState, ScopeError, ScopeStatus, SessionScope};
use crate::surface::Surface;

/// The four mutually exclusive bootstrap states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    ConfigError { reason: String },
    CredentialError { reason: String, observed_prefix: String },
    Loading,
    Ready { identity: UserIdentity, room_id: String },
}

/// Identity and room, resolved once after mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub identity: UserIdentity,
    pub room: RoomSelector,
}

impl SessionContext {
    pub fn resolve<R: Rng + ?Sized>(query: &QueryParams, rng: &mut R) -> Self {
        Self {
            identity: UserIdentity::resolve_with(query.user_name(), rng),
            room: RoomSelector::resolve(query.room_id()),
        }
    }
}

/// Failures caught at a render boundary.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("Session scope failed: {0}")]
    ScopeFailed(String),
    #[error("Render panicked: {0}")]
    Panicked(String),
}

/// Bootstraps one collaborative editing session.
pub struct SessionBootstrap<B: Backend, E: Editor<B::Scope>> {
    credential: Credential,
    query: QueryParams,
    backend: B,
    editor: E,
    /// Written once by `mount`.
    context: Option<SessionContext>,
    /// Constructed on the first `Ready` render.
    scope: Option<B::Scope>,
    /// Set when constructing the scope failed; never retried.
    scope_error: Option<String>,
}

impl<B: Backend, E: Editor<B::Scope>> SessionBootstrap<B, E> {
    pub fn new(credential: Credential, query: QueryParams, backend: B, editor: E) -> Self {
        Self {
            credential,
            query,
            backend,
            editor,
            context: None,
            scope: None,
            scope_error: None,
        }
    }

    /// Resolve identity and room. Runs once; later calls return the
    /// memoized context.
    pub fn mount(&mut self) -> &SessionContext {
        self.mount_with(&mut rand::thread_rng())
    }

    pub fn mount_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &SessionContext {
        let query = &self.query;
        let credential = &self.credential;
        self.context.get_or_insert_with(|| {
            let context = SessionContext::resolve(query, rng);
            log::info!(
                "Bootstrapping session: room={}, key={}..., user={}",
                context.room,
                credential.observed_prefix(),
                context.identity.display_name()
            );
            context
        })
    }

    pub fn is_mounted(&self) -> bool {
        self.context.is_some()
    }

    /// Current bootstrap state, derived from inputs without side effects.
    pub fn state(&self) -> BootstrapState {
        match self.credential.validate() {
            CredentialCheck::Missing => BootstrapState::ConfigError {
                reason: MISSING_CREDENTIAL.into(),
            },
            CredentialCheck::Malformed { observed_prefix } => BootstrapState::CredentialError {
                reason: INVALID_FORMAT.into(),
                observed_prefix,
            },
            CredentialCheck::Valid(_) => match &self.context {
                None => BootstrapState::Loading,
                Some(context) => BootstrapState::Ready {
                    identity: context.identity.clone(),
                    room_id: context.room.room_id().to_owned(),
                },
            },
        }
    }

    /// Render one frame. Never panics and never returns an error: every
    /// failure ends up as a [`Surface`].
    pub fn render(&mut self) -> Surface {
        match panic::catch_unwind(AssertUnwindSafe(|| self.render_inner())) {
            Ok(Ok(surface)) => surface,
            Ok(Err(e)) => self.bootstrap_failed(&e),
            Err(payload) => {
                let e = RenderError::Panicked(panic_message(payload.as_ref()));
                self.bootstrap_failed(&e)
            }
        }
    }

    /// Outer boundary. A failure before the scope exists happened while
    /// constructing it and is kept, so later renders do not enter again.
    fn bootstrap_failed(&mut self, e: &RenderError) -> Surface {
        log::error!("Error in session bootstrap: {e}");
        if self.scope.is_none() {
            self.scope_error = Some(e.to_string());
        }
        Surface::failure(e)
    }

    fn render_inner(&mut self) -> Result<Surface, RenderError> {
        let credential = match self.credential.validate() {
            CredentialCheck::Missing => return Ok(Surface::ConfigError),
            CredentialCheck::Malformed { observed_prefix } => {
                return Ok(Surface::CredentialError { observed_prefix })
            }
            CredentialCheck::Valid(credential) => credential,
        };

        let Some(context) = &self.context else {
            return Ok(Surface::Loading);
        };

        if let Some(message) = &self.scope_error {
            return Ok(Surface::Failure {
                message: message.clone(),
            });
        }
        if self.scope.is_none() {
            let scope = self
                .backend
                .enter(&credential, &context.room, InitialState::default())?;
            log::debug!("Entered room {} with key {}", context.room, credential.hint());
            self.scope = Some(scope);
        }
        let Some(scope) = &self.scope else {
            return Ok(Surface::Loading);
        };

        let status = scope.status();
        if status == ScopeStatus::Connecting {
            return Ok(Surface::Loading);
        }

        let editor = &mut self.editor;
        let identity = &context.identity;
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| match status {
            ScopeStatus::Failed(reason) => Err(RenderError::ScopeFailed(reason)),
            _ => editor.render(identity, scope).map_err(RenderError::from),
        }));

        Ok(match rendered {
            Ok(Ok(view)) => Surface::Ready(view),
            Ok(Err(e)) => {
                log::error!("Error rendering editor: {e}");
                Surface::failure(&e)
            }
            Err(payload) => {
                let e = RenderError::Panicked(panic_message(payload.as_ref()));
                log::error!("Error rendering editor: {e}");
                Surface::failure(&e)
            }
        })
    }

    /// Readiness of the session scope, once one has been constructed.
    pub fn readiness(&self) -> Option<watch::Receiver<ScopeStatus>> {
        self.scope.as_ref().map(SessionScope::subscribe)
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub fn scope(&self) -> Option<&B::Scope> {
        self.scope.as_ref()
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

// ===================================================================
// Tests
// ===================================================================
