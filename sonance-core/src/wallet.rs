// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The encrypted wallet store.
//!
//! One encrypted record per namespace, plus a lock flag and a session config,
//! all kept in an injected [`WalletStorage`].

#![forbid(unsafe_code)]

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::backend::{StorageOp, WalletStorage};
use crate::clock::Clock;
use crate::crypto::{
    decrypt, derive_key, derive_subkey, encrypt, random_bytes, record_mac, verify_record_mac,
    KdfParams, SecretKey, IV_SIZE, SALT_SIZE,
};
use crate::derivation::KeyDerivation;
use crate::error::{Result, WalletError};
use crate::events::WalletEvent;
use crate::migration::{load_record, needs_migration};
use crate::record::{
    encode_ciphertext, EncryptedWalletRecord, SessionConfig, WalletData, WalletSummary,
    CURRENT_RECORD_VERSION,
};
use crate::strength::ensure_strong;

pub const DEFAULT_NAMESPACE: &str = "sonance";

/// Inactivity window under [`ExpiryPolicy::Fixed`].
pub const FIXED_EXPIRY_MINUTES: i64 = 60;

const LOCKED_VALUE: &str = "true";
const MAC_CONTEXT: &[u8] = b"sonance-record-mac-v2";
const EVENT_CAPACITY: usize = 64;

/// How the inactivity window used by [`WalletStore::is_expired`] is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryPolicy {
    /// Always [`FIXED_EXPIRY_MINUTES`], whatever the session config says.
    #[default]
    Fixed,
    /// The configured `sessionTimeout`.
    SessionTimeout,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub namespace: String,
    pub kdf: KdfParams,
    pub expiry_policy: ExpiryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.into(),
            kdf: KdfParams::DEFAULT,
            expiry_policy: ExpiryPolicy::Fixed,
        }
    }
}

impl StoreConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = policy;
        self
    }
}

#[derive(Debug, Clone)]
struct StorageKeys {
    record: String,
    config: String,
    locked: String,
}

impl StorageKeys {
    fn new(namespace: &str) -> Self {
        Self {
            record: format!("{namespace}_encrypted_session"),
            config: format!("{namespace}_session_config"),
            locked: format!("{namespace}_session_locked"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletState {
    NoWallet,
    /// A record exists and the lock flag is clear.
    Unlocked,
    Locked,
}

pub struct WalletStore {
    storage: Arc<dyn WalletStorage>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
    keys: StorageKeys,
    event_tx: broadcast::Sender<WalletEvent>,
}

fn mac_key(key: &SecretKey) -> SecretKey {
    derive_subkey(key, MAC_CONTEXT)
}

fn seal(record: &mut EncryptedWalletRecord, key: &SecretKey) -> Result<()> {
    let tag = record_mac(&mac_key(key), &record.mac_parts())?;
    record.mac = Some(hex::encode(tag));
    Ok(())
}

fn decrypt_text(ciphertext: &[u8], key: &SecretKey, iv: &[u8; IV_SIZE]) -> Result<Zeroizing<String>> {
    let bytes = decrypt(ciphertext, key, iv)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| WalletError::DecryptionFailed)?;
    Ok(Zeroizing::new(text.to_owned()))
}

impl WalletStore {
    pub fn new(storage: Arc<dyn WalletStorage>, clock: Arc<dyn Clock>, config: StoreConfig) -> Self {
        let keys = StorageKeys::new(&config.namespace);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            clock,
            config,
            keys,
            event_tx,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: WalletEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Encrypts `data` under `passphrase` and replaces any existing wallet.
    ///
    /// The lock flag is cleared and the session config reset to defaults in
    /// the same batch.
    pub fn store(&self, data: &WalletData, passphrase: &str) -> Result<()> {
        ensure_strong(passphrase)?;
        data.validate()?;

        let salt: [u8; SALT_SIZE] = random_bytes();
        let iv: [u8; IV_SIZE] = random_bytes();
        let key = derive_key(passphrase.as_bytes(), &salt, self.config.kdf)?;

        let encrypted_mnemonic = encrypt(data.mnemonic.as_bytes(), &key, &iv)?;
        let encrypted_private_key = encrypt(data.private_key.as_bytes(), &key, &iv)?;

        let now = self.clock.now_millis();
        let mut record = EncryptedWalletRecord {
            encrypted_mnemonic: encode_ciphertext(&encrypted_mnemonic),
            encrypted_private_key: encode_ciphertext(&encrypted_private_key),
            address: data.address.clone(),
            label: data.label.clone(),
            salt: hex::encode(salt),
            iv: hex::encode(iv),
            created_at: now,
            last_accessed: now,
            version: CURRENT_RECORD_VERSION.into(),
            kdf_iterations: self.config.kdf.iterations,
            mac: None,
        };
        seal(&mut record, &key)?;

        let record_json = serde_json::to_string(&record)?;
        let config_json = serde_json::to_string(&SessionConfig::default())?;

        self.storage.apply(&[
            StorageOp::remove(&self.keys.record),
            StorageOp::remove(&self.keys.locked),
            StorageOp::put(&self.keys.record, record_json),
            StorageOp::put(&self.keys.config, config_json),
        ])?;

        info!(address = %record.address, "wallet stored");
        self.emit(WalletEvent::Created {
            address: record.address,
            label: record.label,
        });
        Ok(())
    }

    /// Decrypts the stored wallet. `Ok(None)` when no wallet exists.
    ///
    /// A wrong passphrase and a tampered record are indistinguishable and
    /// both yield [`WalletError::DecryptionFailed`].
    pub fn retrieve(&self, passphrase: &str) -> Result<Option<WalletData>> {
        let Some(raw) = self.storage.get(&self.keys.record)? else {
            debug!("no wallet record");
            return Ok(None);
        };
        let (mut record, migration) = load_record(&raw)?;

        let salt = record.salt_bytes()?;
        let iv = record.iv_bytes()?;
        let kdf = KdfParams::from_stored(record.kdf_iterations).inspect_err(|_| {
            warn!(iterations = record.kdf_iterations, "wallet record has an unsupported KDF cost");
        })?;
        let key = derive_key(passphrase.as_bytes(), &salt, kdf)?;

        match &record.mac {
            Some(mac) => {
                let expected = hex::decode(mac).map_err(|_| WalletError::DecryptionFailed)?;
                if !verify_record_mac(&mac_key(&key), &record.mac_parts(), &expected)? {
                    warn!("wallet record failed authentication");
                    return Err(WalletError::DecryptionFailed);
                }
            }
            // Only records migrated from 1.0 may lack a MAC.
            None if !migration.migrated() => {
                warn!("wallet record is missing its MAC");
                return Err(WalletError::DecryptionFailed);
            }
            None => {}
        }

        let decrypted = decrypt_text(&record.mnemonic_ciphertext()?, &key, &iv).and_then(|m| {
            let k = decrypt_text(&record.private_key_ciphertext()?, &key, &iv)?;
            Ok((m, k))
        });
        let (mnemonic, private_key) = match decrypted {
            Ok(pair) => pair,
            Err(e) => {
                warn!("wallet record could not be decrypted");
                return Err(e);
            }
        };

        let data = WalletData::new(
            mnemonic.as_str(),
            private_key.as_str(),
            record.address.clone(),
            record.label.clone(),
        );
        if data.validate().is_err() {
            warn!("decrypted wallet failed validation");
            return Err(WalletError::DecryptionFailed);
        }

        record.last_accessed = self.clock.now_millis();
        if record.mac.is_none() {
            seal(&mut record, &key)?;
        }
        self.storage
            .set(&self.keys.record, &serde_json::to_string(&record)?)?;

        if migration.migrated() {
            info!(
                from = %migration.from_version,
                to = %migration.to_version,
                "wallet record upgraded"
            );
            self.emit(WalletEvent::Migrated {
                from_version: migration.from_version,
                to_version: migration.to_version,
            });
        }
        debug!(address = %record.address, "wallet accessed");
        self.emit(WalletEvent::Accessed {
            address: record.address,
        });
        Ok(Some(data))
    }

    pub fn lock(&self) -> Result<()> {
        self.storage.set(&self.keys.locked, LOCKED_VALUE)?;
        debug!("session locked");
        self.emit(WalletEvent::Locked { auto: false });
        Ok(())
    }

    /// Clears the lock flag. Does not check the passphrase.
    pub fn unlock(&self) -> Result<()> {
        self.storage.remove(&self.keys.locked)?;
        debug!("session unlocked");
        self.emit(WalletEvent::Unlocked);
        Ok(())
    }

    pub fn is_locked(&self) -> Result<bool> {
        Ok(self.storage.get(&self.keys.locked)?.as_deref() == Some(LOCKED_VALUE))
    }

    pub fn has_wallet(&self) -> Result<bool> {
        Ok(self.storage.get(&self.keys.record)?.is_some())
    }

    pub fn state(&self) -> Result<WalletState> {
        if !self.has_wallet()? {
            return Ok(WalletState::NoWallet);
        }
        if self.is_locked()? {
            Ok(WalletState::Locked)
        } else {
            Ok(WalletState::Unlocked)
        }
    }

    fn load(&self) -> Result<Option<EncryptedWalletRecord>> {
        match self.storage.get(&self.keys.record)? {
            Some(raw) => Ok(Some(load_record(&raw)?.0)),
            None => Ok(None),
        }
    }

    /// Public metadata of the stored wallet, without decrypting it.
    pub fn summary(&self) -> Result<Option<WalletSummary>> {
        let Some(raw) = self.storage.get(&self.keys.record)? else {
            return Ok(None);
        };
        let upgrade_pending = needs_migration(&raw)?;
        let (record, _) = load_record(&raw)?;
        Ok(Some(WalletSummary {
            address: record.address,
            label: record.label,
            created_at: record.created_at,
            last_accessed: record.last_accessed,
            version: record.version,
            upgrade_pending,
            locked: self.is_locked()?,
        }))
    }

    pub fn session_config(&self) -> Result<Option<SessionConfig>> {
        match self.storage.get(&self.keys.config)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn update_session_config(&self, config: SessionConfig) -> Result<()> {
        if config.session_timeout == 0 {
            return Err(WalletError::InvalidConfig(
                "session timeout must be at least 1 minute".into(),
            ));
        }
        self.storage
            .set(&self.keys.config, &serde_json::to_string(&config)?)?;
        debug!(
            timeout = config.session_timeout,
            auto_lock = config.auto_lock,
            "session config updated"
        );
        self.emit(WalletEvent::SessionConfigChanged(config));
        Ok(())
    }

    pub fn reset_session_config(&self) -> Result<()> {
        self.update_session_config(SessionConfig::default())
    }

    fn expiry_window(&self, config: &SessionConfig) -> Duration {
        match self.config.expiry_policy {
            ExpiryPolicy::Fixed => Duration::minutes(FIXED_EXPIRY_MINUTES),
            ExpiryPolicy::SessionTimeout => Duration::minutes(i64::from(config.session_timeout)),
        }
    }

    /// True when auto-lock is on and the wallet has been idle longer than
    /// the expiry window.
    pub fn is_expired(&self) -> Result<bool> {
        let Some(config) = self.session_config()? else {
            return Ok(false);
        };
        if !config.auto_lock {
            return Ok(false);
        }
        let Some(record) = self.load()? else {
            return Ok(false);
        };

        let idle = self.clock.now_millis() - record.last_accessed;
        Ok(idle > self.expiry_window(&config).num_milliseconds())
    }

    /// Locks the session if it has expired. Returns true if it locked now.
    pub fn auto_lock_if_expired(&self) -> Result<bool> {
        if !self.is_expired()? || self.is_locked()? {
            return Ok(false);
        }
        self.storage.set(&self.keys.locked, LOCKED_VALUE)?;
        info!("session auto-locked after inactivity");
        self.emit(WalletEvent::Locked { auto: true });
        Ok(true)
    }

    /// Auto-locks an expired session and reports it as
    /// [`WalletError::SessionExpired`].
    pub fn ensure_session_active(&self) -> Result<()> {
        if self.auto_lock_if_expired()? {
            return Err(WalletError::SessionExpired);
        }
        Ok(())
    }

    /// Removes the wallet, its lock flag and its config.
    ///
    /// `address` must match the stored wallet. Returns false when there is
    /// nothing to delete.
    pub fn delete_wallet(&self, address: &str) -> Result<bool> {
        let Some(record) = self.load()? else {
            return Ok(false);
        };
        if record.address != address {
            return Err(WalletError::AddressMismatch(address.to_string()));
        }

        self.storage.apply(&[
            StorageOp::remove(&self.keys.record),
            StorageOp::remove(&self.keys.locked),
            StorageOp::remove(&self.keys.config),
        ])?;

        info!(address = %record.address, "wallet deleted");
        self.emit(WalletEvent::Deleted {
            address: record.address,
        });
        Ok(true)
    }

    pub fn change_passphrase(&self, old: &str, new: &str) -> Result<()> {
        ensure_strong(new)?;
        let data = self.retrieve(old)?.ok_or(WalletError::NotFound)?;
        self.store(&data, new)?;
        info!(address = %data.address, "passphrase changed");
        Ok(())
    }

    /// Generates a mnemonic, derives its keys and stores the wallet.
    ///
    /// The returned data holds the mnemonic for the user to back up.
    pub fn create_new(
        &self,
        label: &str,
        passphrase: &str,
        deriver: &dyn KeyDerivation,
    ) -> Result<WalletData> {
        ensure_strong(passphrase)?;
        let phrase = deriver.generate_mnemonic()?;
        let data = deriver.wallet_data(&phrase, label)?;
        self.store(&data, passphrase)?;
        Ok(data)
    }

    /// Stores a wallet derived from an existing mnemonic.
    pub fn restore(
        &self,
        phrase: &str,
        label: &str,
        passphrase: &str,
        deriver: &dyn KeyDerivation,
    ) -> Result<WalletData> {
        ensure_strong(passphrase)?;
        let data = deriver.wallet_data(phrase.trim(), label)?;
        self.store(&data, passphrase)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStorage;
    use crate::clock::ManualClock;

    const PASS: &str = "C0rrect-Horse!";

    fn sample() -> WalletData {
        WalletData::new(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
            "aa".repeat(32),
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu",
            "Main",
        )
    }

    fn store_with(storage: Arc<MemoryStorage>, clock: Arc<ManualClock>) -> WalletStore {
        WalletStore::new(
            storage,
            clock,
            StoreConfig::default().with_kdf(KdfParams::TESTING),
        )
    }

    fn setup() -> (WalletStore, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        (store_with(storage.clone(), clock.clone()), storage, clock)
    }

    #[test]
    fn test_storage_keys_use_namespace() {
        let keys = StorageKeys::new("nft");
        assert_eq!(keys.record, "nft_encrypted_session");
        assert_eq!(keys.config, "nft_session_config");
        assert_eq!(keys.locked, "nft_session_locked");
    }

    #[test]
    fn test_store_writes_three_keys() {
        let (store, storage, _) = setup();
        store.lock().unwrap();
        store.store(&sample(), PASS).unwrap();

        // Record and config, lock flag cleared.
        assert_eq!(storage.len(), 2);
        assert_eq!(store.state().unwrap(), WalletState::Unlocked);
        assert_eq!(store.session_config().unwrap(), Some(SessionConfig::default()));
    }

    #[test]
    fn test_retrieve_updates_last_accessed() {
        let (store, _, clock) = setup();
        store.store(&sample(), PASS).unwrap();
        let created = store.summary().unwrap().unwrap().created_at;

        clock.advance(Duration::minutes(5));
        store.retrieve(PASS).unwrap().unwrap();

        let summary = store.summary().unwrap().unwrap();
        assert_eq!(summary.created_at, created);
        assert_eq!(summary.last_accessed, created + 5 * 60_000);
    }

    #[test]
    fn test_failed_retrieve_leaves_record_untouched() {
        let (store, storage, clock) = setup();
        store.store(&sample(), PASS).unwrap();
        let before = storage.get("sonance_encrypted_session").unwrap();

        clock.advance(Duration::minutes(5));
        assert!(store.retrieve("Wr0ng-Passphrase!").is_err());
        assert_eq!(storage.get("sonance_encrypted_session").unwrap(), before);
    }

    #[test]
    fn test_session_config_update_and_reset() {
        let (store, _, _) = setup();
        store.store(&sample(), PASS).unwrap();

        let custom = SessionConfig::default()
            .with_session_timeout(5)
            .with_auto_lock(false);
        store.update_session_config(custom).unwrap();
        assert_eq!(store.session_config().unwrap(), Some(custom));

        store.reset_session_config().unwrap();
        assert_eq!(store.session_config().unwrap(), Some(SessionConfig::default()));

        let zero = SessionConfig::default().with_session_timeout(0);
        assert!(matches!(
            store.update_session_config(zero),
            Err(WalletError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_expiry_respects_auto_lock_flag() {
        let (store, _, clock) = setup();
        store.store(&sample(), PASS).unwrap();
        store
            .update_session_config(SessionConfig::default().with_auto_lock(false))
            .unwrap();

        clock.advance(Duration::hours(5));
        assert!(!store.is_expired().unwrap());
        assert!(!store.auto_lock_if_expired().unwrap());
    }

    #[test]
    fn test_session_timeout_policy() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(0));
        let store = WalletStore::new(
            storage,
            clock.clone(),
            StoreConfig::default()
                .with_kdf(KdfParams::TESTING)
                .with_expiry_policy(ExpiryPolicy::SessionTimeout),
        );
        store.store(&sample(), PASS).unwrap();
        store
            .update_session_config(SessionConfig::default().with_session_timeout(10))
            .unwrap();

        clock.advance(Duration::minutes(10));
        assert!(!store.is_expired().unwrap());
        clock.advance(Duration::milliseconds(1));
        assert!(store.is_expired().unwrap());
    }

    #[test]
    fn test_events_published() {
        let (store, _, _) = setup();
        let mut rx = store.subscribe();

        store.store(&sample(), PASS).unwrap();
        store.lock().unwrap();
        store.unlock().unwrap();
        store.retrieve(PASS).unwrap();
        store.delete_wallet(&sample().address).unwrap();

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(matches!(events[0], WalletEvent::Created { .. }));
        assert_eq!(events[1], WalletEvent::Locked { auto: false });
        assert_eq!(events[2], WalletEvent::Unlocked);
        assert!(matches!(events[3], WalletEvent::Accessed { .. }));
        assert!(matches!(events[4], WalletEvent::Deleted { .. }));
    }

    #[test]
    fn test_delete_requires_matching_address() {
        let (store, _, _) = setup();
        assert!(!store.delete_wallet("bc1qnothing").unwrap());

        store.store(&sample(), PASS).unwrap();
        assert!(matches!(
            store.delete_wallet("bc1qsomeoneelse"),
            Err(WalletError::AddressMismatch(_))
        ));
        assert!(store.has_wallet().unwrap());
    }

    #[test]
    fn test_change_passphrase_rejects_weak_before_decrypting() {
        let (store, _, _) = setup();
        store.store(&sample(), PASS).unwrap();
        assert!(matches!(
            store.change_passphrase("anything", "weak"),
            Err(WalletError::WeakPassphrase { .. })
        ));
    }

    #[test]
    fn test_change_passphrase_without_wallet() {
        let (store, _, _) = setup();
        assert!(matches!(
            store.change_passphrase(PASS, "An0ther-Strong!"),
            Err(WalletError::NotFound)
        ));
    }
}
