//! Read-only username → password-hash mapping.

use std::collections::HashMap;
use std::path::Path;

use crate::config::loader::{read_file, ConfigError};

/// Immutable account table, loaded once at startup.
///
/// Shared between sessions behind an `Arc`; it is never written after
/// construction, so no lock is needed.
#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    accounts: HashMap<String, String>,
}

impl AccountStore {
    /// Load accounts from a file of `<username><whitespace><hash>` lines.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        let store = Self::parse(&content);
        tracing::info!(path = %path.display(), accounts = store.len(), "Accounts loaded");
        Ok(store)
    }

    /// Build a store from file contents.
    ///
    /// Lines that do not split into exactly two tokens are skipped. A later
    /// line for the same username replaces an earlier one.
    pub fn parse(content: &str) -> Self {
        let mut accounts = HashMap::new();
        for (lineno, line) in content.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(username), Some(hash), None) => {
                    accounts.insert(username.to_string(), hash.to_string());
                }
                (None, ..) => {}
                _ => tracing::trace!(line = lineno + 1, "Skipping malformed account line"),
            }
        }
        Self { accounts }
    }

    /// True iff `username` exists and its stored hash equals `password_hash`.
    pub fn is_authorized(&self, username: &str, password_hash: &str) -> bool {
        self.accounts
            .get(username)
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), password_hash.as_bytes()))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl<U: Into<String>, H: Into<String>> FromIterator<(U, H)> for AccountStore {
    fn from_iter<I: IntoIterator<Item = (U, H)>>(iter: I) -> Self {
        Self {
            accounts: iter.into_iter().map(|(u, h)| (u.into(), h.into())).collect(),
        }
    }
}

/// Timing-safe byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
