//! Credential discovery and the immutable credential pool.
//!
//! The pool is built once from configuration at process start and never
//! mutated afterwards. Which entries are currently usable is not tracked
//! here; that lives in the shared cooldown store.

use crate::error::{Result, RouterError};
use std::fmt;

/// Highest numeric suffix probed during discovery.
const MAX_SUFFIX: u32 = 64;

/// An opaque API secret bound to one quota allotment with the upstream
/// provider.
///
/// Identity is the secret value itself. `Debug` redacts it; use
/// [`fingerprint`](Credential::fingerprint) in log lines.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, used only when issuing a request.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// A short stable prefix of the secret, safe for log lines only, never
    /// for authorization.
    pub fn fingerprint(&self) -> &str {
        let mut end = self.0.len().min(8);
        while !self.0.is_char_boundary(end) {
            end -= 1;
        }
        &self.0[..end]
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({}…)", self.fingerprint())
    }
}

/// Ordered, deduplicated set of credentials, fixed at startup.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    /// Discover credentials from the process environment.
    ///
    /// The bare `{prefix}` value, when present, is tried first; numbered
    /// `{prefix}_1` through `{prefix}_64` follow in ascending order. Gaps in
    /// the numbering are allowed. An empty result is a fatal configuration
    /// error.
    pub fn discover(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |name| std::env::var(name).ok())
    }

    /// Discovery against an arbitrary lookup, so tests never touch the
    /// process environment.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut secrets = Vec::new();
        if let Some(value) = lookup(prefix) {
            secrets.push(value);
        }
        for n in 1..=MAX_SUFFIX {
            if let Some(value) = lookup(&format!("{prefix}_{n}")) {
                secrets.push(value);
            }
        }

        Self::from_secrets(secrets).map_err(|_| {
            RouterError::Config(format!("no credentials found for prefix {prefix}"))
        })
    }

    /// Build a pool from explicit secrets, preserving order and dropping
    /// blanks and duplicates.
    pub fn from_secrets<I, S>(secrets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut credentials: Vec<Credential> = Vec::new();
        for secret in secrets {
            let secret = secret.into();
            let trimmed = secret.trim();
            if trimmed.is_empty() {
                continue;
            }
            let credential = Credential::new(trimmed);
            if !credentials.contains(&credential) {
                credentials.push(credential);
            }
        }

        if credentials.is_empty() {
            return Err(RouterError::config("credential pool is empty"));
        }

        Ok(Self { credentials })
    }

    /// Number of credentials in the pool. Always at least 1.
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Defensive copy of the pool contents, in discovery order.
    pub fn snapshot(&self) -> Vec<Credential> {
        self.credentials.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_discovery_order_bare_key_first() {
        let pool = CredentialPool::from_lookup(
            "GEMINI_API_KEY",
            lookup_from(&[
                ("GEMINI_API_KEY_2", "key-two"),
                ("GEMINI_API_KEY", "key-main"),
                ("GEMINI_API_KEY_1", "key-one"),
            ]),
        )
        .unwrap();

        let secrets: Vec<_> = pool.snapshot().iter().map(|c| c.secret().to_string()).collect();
        assert_eq!(secrets, vec!["key-main", "key-one", "key-two"]);
    }

    #[test]
    fn test_discovery_allows_gaps() {
        let pool = CredentialPool::from_lookup(
            "GEMINI_API_KEY",
            lookup_from(&[
                ("GEMINI_API_KEY_1", "key-one"),
                ("GEMINI_API_KEY_5", "key-five"),
            ]),
        )
        .unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_discovery_deduplicates() {
        let pool = CredentialPool::from_lookup(
            "GEMINI_API_KEY",
            lookup_from(&[
                ("GEMINI_API_KEY", "same"),
                ("GEMINI_API_KEY_1", "same"),
                ("GEMINI_API_KEY_2", "other"),
            ]),
        )
        .unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_empty_pool_is_a_config_error() {
        let err = CredentialPool::from_lookup("GEMINI_API_KEY", |_| None).unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
    }

    #[test]
    fn test_blank_values_are_dropped() {
        let err =
            CredentialPool::from_lookup("K", lookup_from(&[("K", "  ")])).unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cred = Credential::new("super-secret-value");
        let rendered = format!("{:?}", cred);
        assert!(rendered.contains("super-se"));
        assert!(!rendered.contains("secret-value"));
    }

    #[test]
    fn test_fingerprint_of_short_secret() {
        assert_eq!(Credential::new("abc").fingerprint(), "abc");
        assert_eq!(Credential::new("abcdefghij").fingerprint(), "abcdefgh");
    }

    #[test]
    fn test_fingerprint_truncates_at_char_boundary() {
        // Byte 8 lands inside the two-byte 'é'; the cut must back off to the
        // previous boundary rather than fall through to the whole secret.
        let cred = Credential::new("abcdefgé-rest-of-secret");
        assert_eq!(cred.fingerprint(), "abcdefg");

        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains("rest-of-secret"));
    }
}
