// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{IV_SIZE, SALT_SIZE};
use crate::error::{Result, WalletError};

/// Schema version written by this build.
pub const CURRENT_RECORD_VERSION: &str = "2.0";

/// The persisted, encrypted wallet. Only `address` and `label` are readable
/// without the passphrase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedWalletRecord {
    pub encrypted_mnemonic: String,
    pub encrypted_private_key: String,
    pub address: String,
    pub label: String,
    pub salt: String,
    pub iv: String,
    pub created_at: i64,
    pub last_accessed: i64,
    pub version: String,
    pub kdf_iterations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

fn decode_fixed<const N: usize>(value: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(value).map_err(|_| WalletError::DecryptionFailed)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| WalletError::DecryptionFailed)
}

fn decode_ciphertext(value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|_| WalletError::DecryptionFailed)
}

pub(crate) fn encode_ciphertext(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

impl EncryptedWalletRecord {
    // Malformed encodings are treated like any other corruption.
    pub fn salt_bytes(&self) -> Result<[u8; SALT_SIZE]> {
        decode_fixed(&self.salt)
    }

    pub fn iv_bytes(&self) -> Result<[u8; IV_SIZE]> {
        decode_fixed(&self.iv)
    }

    pub fn mnemonic_ciphertext(&self) -> Result<Vec<u8>> {
        decode_ciphertext(&self.encrypted_mnemonic)
    }

    pub fn private_key_ciphertext(&self) -> Result<Vec<u8>> {
        decode_ciphertext(&self.encrypted_private_key)
    }

    /// Fields covered by the record MAC, in order.
    pub(crate) fn mac_parts(&self) -> [&[u8]; 7] {
        [
            self.version.as_bytes(),
            self.address.as_bytes(),
            self.label.as_bytes(),
            self.salt.as_bytes(),
            self.iv.as_bytes(),
            self.encrypted_mnemonic.as_bytes(),
            self.encrypted_private_key.as_bytes(),
        ]
    }
}

/// Plaintext wallet material. Exists only in memory and is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WalletData {
    pub mnemonic: String,
    pub private_key: String,
    pub address: String,
    pub label: String,
}

impl WalletData {
    pub fn new(
        mnemonic: impl Into<String>,
        private_key: impl Into<String>,
        address: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            private_key: private_key.into(),
            address: address.into(),
            label: label.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mnemonic.trim().is_empty() {
            return Err(WalletError::InvalidWalletData("mnemonic is empty".into()));
        }
        if self.private_key.is_empty() || hex::decode(&self.private_key).is_err() {
            return Err(WalletError::InvalidWalletData(
                "private key must be hex encoded".into(),
            ));
        }
        if self.address.trim().is_empty() {
            return Err(WalletError::InvalidWalletData("address is empty".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for WalletData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletData")
            .field("mnemonic", &"[REDACTED]")
            .field("private_key", &"[REDACTED]")
            .field("address", &self.address)
            .field("label", &self.label)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Minutes of inactivity before the session should lock.
    pub session_timeout: u32,
    pub auto_lock: bool,
    pub require_passphrase_on_transaction: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout: 30,
            auto_lock: true,
            require_passphrase_on_transaction: true,
        }
    }
}

impl SessionConfig {
    pub fn with_session_timeout(mut self, minutes: u32) -> Self {
        self.session_timeout = minutes;
        self
    }

    pub fn with_auto_lock(mut self, enabled: bool) -> Self {
        self.auto_lock = enabled;
        self
    }

    pub fn with_require_passphrase_on_transaction(mut self, required: bool) -> Self {
        self.require_passphrase_on_transaction = required;
        self
    }
}

/// Public facts about the stored wallet, readable without the passphrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub address: String,
    pub label: String,
    pub created_at: i64,
    pub last_accessed: i64,
    pub version: String,
    /// The stored record uses an older schema and is upgraded on next unlock.
    pub upgrade_pending: bool,
    pub locked: bool,
}
