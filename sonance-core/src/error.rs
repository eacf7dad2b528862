// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use thiserror::Error;

use crate::strength::Feedback;

/// Coarse classification used by callers to route failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input: weak passphrase, mismatched confirmation, bad config.
    Validation,
    /// Wrong passphrase or tampered ciphertext.
    Authentication,
    /// No wallet record.
    NotFound,
    /// Session past its auto-lock window.
    Expired,
    /// Retryable failure in an external collaborator.
    Transient,
    /// Storage, serialization or programming errors.
    Internal,
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Passphrase too weak: {}", join_feedback(.feedback))]
    WeakPassphrase { feedback: Vec<Feedback> },

    #[error("Passphrases do not match")]
    PassphraseMismatch,

    #[error("Invalid passphrase or corrupted data")]
    DecryptionFailed,

    #[error("No wallet found")]
    NotFound,

    #[error("Wallet address mismatch: {0}")]
    AddressMismatch(String),

    #[error("Session expired after inactivity, unlock the wallet to continue")]
    SessionExpired,

    #[error("Invalid wallet data: {0}")]
    InvalidWalletData(String),

    #[error("Key derivation error: {0}")]
    Derivation(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

fn join_feedback(feedback: &[Feedback]) -> String {
    feedback
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl WalletError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WeakPassphrase { .. }
            | Self::PassphraseMismatch
            | Self::InvalidWalletData(_)
            | Self::InvalidConfig(_) => ErrorKind::Validation,
            Self::DecryptionFailed => ErrorKind::Authentication,
            Self::NotFound | Self::AddressMismatch(_) => ErrorKind::NotFound,
            Self::SessionExpired => ErrorKind::Expired,
            Self::Derivation(_)
            | Self::Encryption(_)
            | Self::Migration(_)
            | Self::Storage(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show an end user. Internal details stay in logs.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Something went wrong while accessing the wallet".into(),
            _ => self.to_string(),
        }
    }
}

impl From<redb::DatabaseError> for WalletError {
    fn from(e: redb::DatabaseError) -> Self {
        WalletError::Storage(e.to_string())
    }
}

impl From<redb::TransactionError> for WalletError {
    fn from(e: redb::TransactionError) -> Self {
        WalletError::Storage(e.to_string())
    }
}

impl From<redb::TableError> for WalletError {
    fn from(e: redb::TableError) -> Self {
        WalletError::Storage(e.to_string())
    }
}

impl From<redb::StorageError> for WalletError {
    fn from(e: redb::StorageError) -> Self {
        WalletError::Storage(e.to_string())
    }
}

impl From<redb::CommitError> for WalletError {
    fn from(e: redb::CommitError) -> Self {
        WalletError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_passphrase_lists_feedback() {
        let err = WalletError::WeakPassphrase {
            feedback: vec![Feedback::TooShort, Feedback::AddDigit],
        };
        let msg = err.to_string();
        assert!(msg.contains("at least 8 characters"));
        assert!(msg.contains("number"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_internal_errors_hidden_from_users() {
        let err = WalletError::storage("table locked by pid 4242");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.user_message().contains("4242"));

        let err = WalletError::DecryptionFailed;
        assert_eq!(err.user_message(), "Invalid passphrase or corrupted data");
    }
}
