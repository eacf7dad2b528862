// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{LinkError, Result};

/// Random bytes per token; hex encoding doubles the length.
pub const TOKEN_BYTES: usize = 32;

pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

const FINGERPRINT_CHARS: usize = 8;

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    bytes.zeroize();
    token
}

/// Informational binding of an email to a token. Not a security boundary.
pub fn binding_hash(email: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short prefix of a token, safe for logs.
pub fn fingerprint(token: &str) -> String {
    token.chars().take(FINGERPRINT_CHARS).collect()
}

#[derive(Clone, PartialEq, Eq, Serialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionToken {
    pub token: String,
    pub email: String,
    pub private_key_hash: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl ConnectionToken {
    pub fn new(token: String, email: String, created_at: i64, ttl_millis: i64) -> Self {
        let private_key_hash = binding_hash(&email, &token);
        Self {
            token,
            email,
            private_key_hash,
            created_at,
            expires_at: created_at + ttl_millis,
        }
    }

    /// Expired from `expires_at` onwards.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at
    }
}

impl fmt::Debug for ConnectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionToken")
            .field("token", &fingerprint(&self.token))
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Ephemeral storage for issued tokens, keyed by token value.
pub trait TokenStore: Send + Sync {
    fn put(&self, token: ConnectionToken) -> Result<()>;
    fn get(&self, token: &str) -> Result<Option<ConnectionToken>>;
    fn remove(&self, token: &str) -> Result<bool>;
    /// Removes every entry expired at `now_millis`. Returns how many went.
    fn delete_expired(&self, now_millis: i64) -> Result<usize>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MemoryTokenStore {
    entries: RwLock<HashMap<String, ConnectionToken>>,
    max_entries: usize,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryTokenStore {
    fn put(&self, token: ConnectionToken) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.len() >= self.max_entries && !entries.contains_key(&token.token) {
            let now = token.created_at;
            let before = entries.len();
            entries.retain(|_, t| !t.is_expired_at(now));
            debug!(pruned = before - entries.len(), "pruned token store");

            if entries.len() >= self.max_entries {
                warn!(max = self.max_entries, "token store full");
                return Err(LinkError::Store("token store is full".into()));
            }
        }
        entries.insert(token.token.clone(), token);
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<ConnectionToken>> {
        Ok(self.entries.read().get(token).cloned())
    }

    fn remove(&self, token: &str) -> Result<bool> {
        Ok(self.entries.write().remove(token).is_some())
    }

    fn delete_expired(&self, now_millis: i64) -> Result<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, t| !t.is_expired_at(now_millis));
        Ok(before - entries.len())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: i64 = 30 * 60 * 1000;

    fn token_at(created_at: i64) -> ConnectionToken {
        ConnectionToken::new(generate_token(), "alice@example.com".into(), created_at, TTL)
    }

    #[test]
    fn test_generate_token_shape() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_binding_hash() {
        let h1 = binding_hash("a@example.com", "00ff");
        assert_eq!(h1.len(), 64);
        assert_eq!(h1, binding_hash("a@example.com", "00ff"));
        assert_ne!(h1, binding_hash("b@example.com", "00ff"));
    }

    #[test]
    fn test_expiry_boundary() {
        let t = token_at(1_000);
        assert!(!t.is_expired_at(1_000));
        assert!(!t.is_expired_at(1_000 + TTL - 1));
        assert!(t.is_expired_at(1_000 + TTL));
    }

    #[test]
    fn test_debug_shows_fingerprint_only() {
        let t = token_at(0);
        let dbg = format!("{t:?}");
        assert!(dbg.contains(&fingerprint(&t.token)));
        assert!(!dbg.contains(&t.token));
    }

    #[test]
    fn test_fingerprint_handles_short_and_multibyte_input() {
        assert_eq!(fingerprint("abc"), "abc");
        assert_eq!(fingerprint("ééééééééé"), "éééééééé");
    }

    #[test]
    fn test_memory_store_operations() {
        let store = MemoryTokenStore::new();
        let t = token_at(0);
        let key = t.token.clone();

        store.put(t.clone()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key).unwrap(), Some(t));

        assert!(store.remove(&key).unwrap());
        assert!(!store.remove(&key).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_expired() {
        let store = MemoryTokenStore::new();
        store.put(token_at(0)).unwrap();
        store.put(token_at(0)).unwrap();
        let fresh = token_at(TTL);
        let fresh_key = fresh.token.clone();
        store.put(fresh).unwrap();

        assert_eq!(store.delete_expired(TTL).unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&fresh_key).unwrap().is_some());
    }

    #[test]
    fn test_full_store_prunes_then_rejects() {
        let store = MemoryTokenStore::with_max_entries(2);
        store.put(token_at(0)).unwrap();
        store.put(token_at(0)).unwrap();

        // Both old entries are expired by the time this one is issued.
        store.put(token_at(TTL)).unwrap();
        assert_eq!(store.len(), 1);

        store.put(token_at(TTL)).unwrap();
        assert!(matches!(
            store.put(token_at(TTL)),
            Err(LinkError::Store(_))
        ));
    }
}
