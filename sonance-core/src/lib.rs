// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sonance Core - client-side encrypted wallet storage
//!
//! This crate provides the wallet half of Sonance:
//! - PBKDF2-HMAC-SHA256 key derivation and AES-256-CBC record encryption
//! - Passphrase strength scoring
//! - A single-record encrypted wallet store with lock and auto-lock state
//! - BIP-39/BIP-32 mnemonic and address derivation

#![forbid(unsafe_code)]

pub mod backend;
pub mod clock;
pub mod crypto;
pub mod derivation;
pub mod error;
pub mod events;
pub mod migration;
pub mod record;
pub mod strength;
pub mod wallet;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use crate::error::{ErrorKind, Result, WalletError};
pub use crate::record::{SessionConfig, WalletData, WalletSummary};
pub use crate::wallet::{ExpiryPolicy, StoreConfig, WalletState, WalletStore};

use crate::backend::RedbStorage;
use crate::clock::SystemClock;

/// Open a wallet store backed by a redb file at `path`.
pub fn open_store(path: &Path, config: StoreConfig) -> Result<WalletStore> {
    let storage = RedbStorage::open(path)?;
    Ok(WalletStore::new(
        Arc::new(storage),
        Arc::new(SystemClock),
        config,
    ))
}

/// Get the default path for wallet storage (~/.sonance/wallet.db).
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sonance")
        .join("wallet.db")
}
