//! Public key validation.
//!
//! A [`Credential`] wraps whatever the environment supplied. Only
//! [`Credential::validate`] can produce a [`ValidCredential`], and a
//! [`Backend`](crate::scope::Backend) accepts nothing else, so a missing or
//! malformed key never reaches a session scope.

use std::fmt;

/// Prefix every public key starts with.
pub const PUBLIC_KEY_PREFIX: &str = "pk_";

/// Number of characters echoed back when a key is rejected.
pub const OBSERVED_PREFIX_LEN: usize = 10;

/// Reason reported for an empty or whitespace-only key.
pub const MISSING_CREDENTIAL: &str = "missing credential";

/// Reason reported for a key without the public prefix.
pub const INVALID_FORMAT: &str = "invalid format";

/// Raw service credential as read from configuration.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    raw: String,
}

/// Outcome of [`Credential::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    /// Empty or whitespace-only.
    Missing,
    /// Present but without the `pk_` prefix.
    Malformed { observed_prefix: String },
    /// Present and well formed.
    Valid(ValidCredential),
}

/// A credential that passed validation.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidCredential {
    raw: String,
}

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// True iff the value is non-empty after trimming.
    pub fn is_present(&self) -> bool {
        !self.raw.trim().is_empty()
    }

    /// True iff the untrimmed value starts with [`PUBLIC_KEY_PREFIX`].
    pub fn is_well_formed(&self) -> bool {
        self.raw.starts_with(PUBLIC_KEY_PREFIX)
    }

    /// First [`OBSERVED_PREFIX_LEN`] characters of the raw value.
    pub fn observed_prefix(&self) -> String {
        self.raw.chars().take(OBSERVED_PREFIX_LEN).collect()
    }

    /// Presence is checked before format.
    pub fn validate(&self) -> CredentialCheck {
        if !self.is_present() {
            return CredentialCheck::Missing;
        }
        if !self.is_well_formed() {
            return CredentialCheck::Malformed {
                observed_prefix: self.observed_prefix(),
            };
        }
        CredentialCheck::Valid(ValidCredential {
            raw: self.raw.clone(),
        })
    }
}

impl ValidCredential {
    /// The full key, for handing to the collaboration backend.
    pub fn expose(&self) -> &str {
        &self.raw
    }

    /// Truncated form safe to log.
    pub fn hint(&self) -> String {
        let prefix: String = self.raw.chars().take(OBSERVED_PREFIX_LEN).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("prefix", &self.observed_prefix())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ValidCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValidCredential").field(&self.hint()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_is_missing() {
        assert_eq!(Credential::new("").validate(), CredentialCheck::Missing);
    }

    #[test]
    fn test_whitespace_is_missing() {
        let cred = Credential::new(" \t\n ");
        assert!(!cred.is_present());
        assert_eq!(cred.validate(), CredentialCheck::Missing);
    }

    #[test]
    fn test_secret_key_is_malformed() {
        let check = Credential::new("sk_live_xxx").validate();
        assert_eq!(
            check,
            CredentialCheck::Malformed {
                observed_prefix: "sk_live_xx".into()
            }
        );
    }

    #[test]
    fn test_short_malformed_key_echoes_whole_value() {
        let check = Credential::new("abc").validate();
        assert_eq!(
            check,
            CredentialCheck::Malformed {
                observed_prefix: "abc".into()
            }
        );
    }

    #[test]
    fn test_leading_whitespace_is_malformed() {
        // Format is checked on the untrimmed value.
        let cred = Credential::new("  pk_test_abc");
        assert!(cred.is_present());
        assert!(!cred.is_well_formed());
    }

    #[test]
    fn test_observed_prefix_respects_char_boundaries() {
        let cred = Credential::new("ключ_не_публичный");
        assert_eq!(cred.observed_prefix().chars().count(), OBSERVED_PREFIX_LEN);
        assert_eq!(cred.observed_prefix(), "ключ_не_пу");
    }

    #[test]
    fn test_valid_key() {
        match Credential::new("pk_test_abc").validate() {
            CredentialCheck::Valid(valid) => {
                assert_eq!(valid.expose(), "pk_test_abc");
                assert_eq!(valid.hint(), "pk_test_ab...");
            }
            other => panic!("Expected Valid, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let cred = Credential::new("pk_live_0123456789abcdef");
        let printed = format!("{cred:?}");
        assert!(!printed.contains("abcdef"));

        let CredentialCheck::Valid(valid) = cred.validate() else {
            panic!("Expected Valid");
        };
        assert!(!format!("{valid:?}").contains("abcdef"));
    }

    proptest! {
        #[test]
        fn prop_blank_values_are_missing(raw in "[ \t\r\n]*") {
            prop_assert_eq!(Credential::new(raw).validate(), CredentialCheck::Missing);
        }

        #[test]
        fn prop_unprefixed_values_echo_ten_chars(raw in "[a-oq-z0-9][a-zA-Z0-9_ ]{0,30}") {
            let expected: String = raw.chars().take(10).collect();
            prop_assert_eq!(
                Credential::new(raw).validate(),
                CredentialCheck::Malformed { observed_prefix: expected }
            );
        }

        #[test]
        fn prop_prefixed_values_are_valid(rest in "[a-zA-Z0-9_]{0,40}") {
            let raw = format!("pk_{rest}");
            let is_valid = matches!(Credential::new(raw).validate(), CredentialCheck::Valid(_));
            prop_assert!(is_valid);
        }

        #[test]
        fn prop_hint_is_bounded(rest in "[a-zA-Z0-9_]{0,40}") {
            let raw = format!("pk_{rest}");
            if let CredentialCheck::Valid(valid) = Credential::new(raw).validate() {
                prop_assert!(valid.hint().chars().count() <= OBSERVED_PREFIX_LEN + 3);
            }
        }
    }
}
