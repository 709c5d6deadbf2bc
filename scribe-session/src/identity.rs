//! User identity derivation.
//!
//! A caller-supplied name becomes both the id and the display name.
//! Without one, an anonymous identity is generated. The anonymous suffix is
//! a best-effort session label, not a secret; two anonymous users can in
//! principle collide and nothing here detects it.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prefix of every generated anonymous id.
pub const ANONYMOUS_PREFIX: &str = "anonymous-";

/// Display name used when no user name was supplied.
pub const ANONYMOUS_DISPLAY_NAME: &str = "Anonymous User";

/// Display color assigned to every identity.
pub const DEFAULT_COLOR: &str = "#5371F7";

const SUFFIX_LEN: usize = 9;
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identity of the local participant.
///
/// Immutable once resolved; `id` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    id: String,
    display_name: String,
    avatar_url: String,
    color: String,
}

impl UserIdentity {
    /// Resolve using the thread-local RNG for anonymous ids.
    pub fn resolve(user_name: Option<&str>) -> Self {
        Self::resolve_with(user_name, &mut rand::thread_rng())
    }

    /// Resolve with an explicit random source.
    pub fn resolve_with<R: Rng + ?Sized>(user_name: Option<&str>, rng: &mut R) -> Self {
        match user_name.filter(|name| !name.is_empty()) {
            Some(name) => Self::with_name(name.to_owned(), name.to_owned()),
            None => Self::with_name(anonymous_id(rng), ANONYMOUS_DISPLAY_NAME.to_owned()),
        }
    }

    fn with_name(id: String, display_name: String) -> Self {
        Self {
            id,
            display_name,
            avatar_url: String::new(),
            color: DEFAULT_COLOR.to_owned(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn avatar_url(&self) -> &str {
        &self.avatar_url
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

fn anonymous_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())]))
        .collect();
    format!("{ANONYMOUS_PREFIX}{suffix}")
}
