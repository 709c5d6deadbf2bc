//! # scribe-session: Session bootstrap for Scribe collaborative editing
//!
//! Decides what a collaborative editing session shows before, during and
//! after it connects to the collaboration backend.
//!
//! ## Architecture
//!
//! ```text
//! query string ──► QueryParams ──┬──► UserIdentity (IdentityResolver)
//!                                └──► RoomSelector (RoomResolver)
//!                                            │
//! public key ────► Credential ───────────────┤
//!                  (validate)                ▼
//!                                   ┌──────────────────┐
//!                                   │ SessionBootstrap │  BootstrapState
//!                                   └────────┬─────────┘
//!                                            │ Ready
//!                                            ▼
//!                               Backend::enter(ValidCredential)
//!                                            │
//!                                            ▼
//!                                SessionScope ──► Editor ──► Surface
//! ```
//!
//! ## Modules
//!
//! - [`credential`]: public key presence and format checks
//! - [`identity`]: named or anonymous user identity
//! - [`room`]: room selection with default fallback
//! - [`query`]: query string parsing
//! - [`scope`]: collaboration backend contracts
//! - [`editor`]: editor contract
//! - [`bootstrap`]: the state machine and its failure boundaries
//! - [`surface`]: user-visible output of a render

pub mod bootstrap;
pub mod credential;
pub mod editor;
pub mod identity;
pub mod query;
pub mod room;
pub mod scope;
pub mod surface;

pub use bootstrap::{BootstrapState, RenderError, SessionBootstrap, SessionContext};
pub use credential::{Credential, CredentialCheck, ValidCredential};
pub use editor::{Editor, EditorError};
pub use identity::UserIdentity;
pub use query::QueryParams;
pub use room::RoomSelector;
pub use scope::{wait_settled, Backend, InitialState, ScopeError, ScopeStatus, SessionScope, StateMap};
pub use surface::Surface;
