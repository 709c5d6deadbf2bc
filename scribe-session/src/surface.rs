//! User-visible output of a bootstrap render.

use std::fmt;

/// Exactly one of these is produced per render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    /// No credential configured.
    ConfigError,
    /// Credential present but malformed; only a truncated prefix is kept.
    CredentialError { observed_prefix: String },
    /// Identity unresolved or scope still connecting.
    Loading,
    /// The editor's view.
    Ready(String),
    /// Generic fallback for any failure after bootstrap succeeded.
    Failure { message: String },
}

impl Surface {
    pub fn failure(error: &impl fmt::Display) -> Self {
        Self::Failure {
            message: error.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError | Self::CredentialError { .. } | Self::Failure { .. }
        )
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError => write!(
                f,
                "Error: Public API key is required.\n\
                 Please set your public API key (starts with pk_) in the environment."
            ),
            Self::CredentialError { observed_prefix } => write!(
                f,
                "Error: Invalid API key format. Public keys should start with \"pk_\"\n\
                 Current key: {observed_prefix}..."
            ),
            Self::Loading => write!(f, "Loading collaborative editor..."),
            Self::Ready(view) => f.write_str(view),
            Self::Failure { message } => write!(f, "Collaboration error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_error_echoes_prefix() {
        let surface = Surface::CredentialError {
            observed_prefix: "sk_live_xx".into(),
        };
        assert!(surface.to_string().contains("Current key: sk_live_xx..."));
    }

    #[test]
    fn test_config_error_mentions_prefix_hint() {
        assert!(Surface::ConfigError.to_string().contains("starts with pk_"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Surface::ConfigError.is_error());
        assert!(Surface::failure(&"boom").is_error());
        assert!(!Surface::Loading.is_error());
        assert!(!Surface::Ready(String::new()).is_error());
    }

    #[test]
    fn test_failure_message() {
        let surface = Surface::failure(&"socket closed");
        assert_eq!(surface.to_string(), "Collaboration error: socket closed");
    }
}
