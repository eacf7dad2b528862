// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::fmt;

use crate::record::SessionConfig;

/// Lifecycle notifications published by the wallet store.
///
/// Events carry only public data; nothing here is secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    Created {
        address: String,
        label: String,
    },
    Accessed {
        address: String,
    },
    Migrated {
        from_version: String,
        to_version: String,
    },
    Locked {
        auto: bool,
    },
    Unlocked,
    SessionConfigChanged(SessionConfig),
    Deleted {
        address: String,
    },
}

impl fmt::Display for WalletEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { address, .. } => write!(f, "wallet {address} created"),
            Self::Accessed { address } => write!(f, "wallet {address} accessed"),
            Self::Migrated {
                from_version,
                to_version,
            } => write!(f, "record migrated {from_version} -> {to_version}"),
            Self::Locked { auto: true } => f.write_str("session auto-locked"),
            Self::Locked { auto: false } => f.write_str("session locked"),
            Self::Unlocked => f.write_str("session unlocked"),
            Self::SessionConfigChanged(_) => f.write_str("session config changed"),
            Self::Deleted { address } => write!(f, "wallet {address} deleted"),
        }
    }
}
