// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wallet record schema versioning and migrations.
//!
//! Records are migrated on read as raw JSON, before they are parsed into
//! [`EncryptedWalletRecord`]. Migrations never touch ciphertext.
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::crypto::KdfParams;
use crate::error::{Result, WalletError};
use crate::record::{EncryptedWalletRecord, CURRENT_RECORD_VERSION};

const VERSION_FIELD: &str = "version";

/// Version assumed for records that predate the version field.
pub const INITIAL_RECORD_VERSION: &str = "1.0";

const KNOWN_VERSIONS: [&str; 2] = [INITIAL_RECORD_VERSION, CURRENT_RECORD_VERSION];

/// A migration function that rewrites a record object in place.
pub type MigrationFn = fn(&mut Map<String, Value>) -> Result<()>;

/// A single migration step.
pub struct Migration {
    pub from_version: &'static str,
    pub to_version: &'static str,
    pub migrate: MigrationFn,
}

// 1.0 records were always derived with the legacy iteration count and carry
// no MAC. Any stored count is overwritten so a 2.0 record relabelled as 1.0
// derives the wrong key.
fn migrate_v1_to_v2(record: &mut Map<String, Value>) -> Result<()> {
    record.insert(
        "kdfIterations".into(),
        Value::from(KdfParams::LEGACY.iterations),
    );
    record.remove("mac");
    Ok(())
}

fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        from_version: INITIAL_RECORD_VERSION,
        to_version: CURRENT_RECORD_VERSION,
        migrate: migrate_v1_to_v2,
    }]
}

/// Result of running migrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    pub from_version: String,
    pub to_version: String,
    pub migrations_run: u32,
}

impl MigrationResult {
    pub fn migrated(&self) -> bool {
        self.migrations_run > 0
    }
}

fn version_rank(version: &str) -> Option<usize> {
    KNOWN_VERSIONS.iter().position(|v| *v == version)
}

fn read_version(record: &Map<String, Value>) -> Result<String> {
    match record.get(VERSION_FIELD) {
        None | Some(Value::Null) => Ok(INITIAL_RECORD_VERSION.to_string()),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(WalletError::Migration("corrupted record version".into())),
    }
}

/// Run all pending migrations on a record object.
pub fn run_migrations(record: &mut Map<String, Value>) -> Result<MigrationResult> {
    let current_version = read_version(record)?;

    if current_version == CURRENT_RECORD_VERSION {
        debug!(version = %current_version, "record schema is current");
        return Ok(MigrationResult {
            from_version: current_version.clone(),
            to_version: current_version,
            migrations_run: 0,
        });
    }

    if version_rank(&current_version).is_none() {
        return Err(WalletError::Migration(format!(
            "unsupported record version {current_version}"
        )));
    }

    let migrations = get_migrations();
    let mut version = current_version.clone();
    let mut migrations_run = 0;

    while version != CURRENT_RECORD_VERSION {
        let migration = migrations
            .iter()
            .find(|m| m.from_version == version)
            .ok_or_else(|| {
                WalletError::Migration("unable to migrate record to current version".into())
            })?;

        info!(
            from = migration.from_version,
            to = migration.to_version,
            "migrating wallet record"
        );

        (migration.migrate)(record)?;
        record.insert(VERSION_FIELD.into(), Value::from(migration.to_version));
        version = migration.to_version.to_string();
        migrations_run += 1;
    }

    Ok(MigrationResult {
        from_version: current_version,
        to_version: version,
        migrations_run,
    })
}

/// Parse a stored record, migrating older schemas first.
pub fn load_record(raw: &str) -> Result<(EncryptedWalletRecord, MigrationResult)> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(mut object) = value else {
        return Err(WalletError::Migration("wallet record is not an object".into()));
    };

    let result = run_migrations(&mut object)?;
    let record: EncryptedWalletRecord = serde_json::from_value(Value::Object(object))?;
    Ok((record, result))
}

/// Check if a stored record needs migrating.
pub fn needs_migration(raw: &str) -> Result<bool> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(object) = value else {
        return Err(WalletError::Migration("wallet record is not an object".into()));
    };
    Ok(read_version(&object)? != CURRENT_RECORD_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v1_record() -> Value {
        json!({
            "encryptedMnemonic": "AAAA",
            "encryptedPrivateKey": "AAAA",
            "address": "bc1qlegacy",
            "label": "Old wallet",
            "salt": "00112233445566778899aabbccddeeff",
            "iv": "ffeeddccbbaa99887766554433221100",
            "createdAt": 1_600_000_000_000i64,
            "lastAccessed": 1_600_000_000_000i64,
            "version": "1.0"
        })
    }

    #[test]
    fn test_v1_record_migrates() {
        let raw = v1_record().to_string();
        assert!(needs_migration(&raw).unwrap());

        let (record, result) = load_record(&raw).unwrap();
        assert_eq!(record.version, CURRENT_RECORD_VERSION);
        assert_eq!(record.kdf_iterations, KdfParams::LEGACY.iterations);
        assert!(record.mac.is_none());
        assert_eq!(record.address, "bc1qlegacy");
        assert_eq!(result.from_version, "1.0");
        assert_eq!(result.migrations_run, 1);
        assert!(result.migrated());
    }

    #[test]
    fn test_missing_version_treated_as_initial() {
        let mut value = v1_record();
        value.as_object_mut().unwrap().remove("version");
        let (record, result) = load_record(&value.to_string()).unwrap();
        assert_eq!(result.from_version, INITIAL_RECORD_VERSION);
        assert_eq!(record.version, CURRENT_RECORD_VERSION);
    }

    #[test]
    fn test_current_record_untouched() {
        let mut value = v1_record();
        let obj = value.as_object_mut().unwrap();
        obj.insert("version".into(), json!("2.0"));
        obj.insert("kdfIterations".into(), json!(100_000));
        obj.insert("mac".into(), json!("ab"));

        let raw = value.to_string();
        assert!(!needs_migration(&raw).unwrap());
        let (record, result) = load_record(&raw).unwrap();
        assert!(!result.migrated());
        assert_eq!(record.kdf_iterations, 100_000);
        assert_eq!(record.mac.as_deref(), Some("ab"));
    }

    #[test]
    fn test_v1_iteration_count_is_always_legacy() {
        let mut value = v1_record();
        let obj = value.as_object_mut().unwrap();
        obj.insert("kdfIterations".into(), json!(KdfParams::TESTING.iterations));
        obj.insert("mac".into(), json!("ab"));

        let (record, result) = load_record(&value.to_string()).unwrap();
        assert!(result.migrated());
        assert_eq!(record.kdf_iterations, KdfParams::LEGACY.iterations);
        assert!(record.mac.is_none());
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut value = v1_record();
        value["version"] = json!("9.0");
        let err = load_record(&value.to_string()).unwrap_err();
        assert!(matches!(err, WalletError::Migration(_)));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(load_record("[1,2,3]").is_err());
        assert!(load_record("not json").is_err());
        let mut value = v1_record();
        value["version"] = json!(2);
        assert!(load_record(&value.to_string()).is_err());
    }
}
