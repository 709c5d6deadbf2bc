//! Query string parsing.
//!
//! Accepts a full URL (`https://host/app?roomId=a`), a bare query with or
//! without the leading `?`, or an empty string. Values are
//! percent-decoded and `+` is read as a space.

use url::{form_urlencoded, Url};

/// Query parameter overriding the default room.
pub const ROOM_ID_PARAM: &str = "roomId";

/// Query parameter overriding the generated identity.
pub const USER_NAME_PARAM: &str = "userName";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let pairs = if input.contains("://") {
            match Url::parse(input) {
                Ok(url) => url.query_pairs().into_owned().collect(),
                Err(e) => {
                    log::warn!("Ignoring unparseable URL: {e}");
                    Vec::new()
                }
            }
        } else {
            let query = input.strip_prefix('?').unwrap_or(input);
            let query = query.split_once('#').map_or(query, |(q, _)| q);
            form_urlencoded::parse(query.as_bytes()).into_owned().collect()
        };
        Self { pairs }
    }

    /// First value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn room_id(&self) -> Option<&str> {
        self.get(ROOM_ID_PARAM)
    }

    pub fn user_name(&self) -> Option<&str> {
        self.get(USER_NAME_PARAM)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
