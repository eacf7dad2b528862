// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Passphrase strength scoring.

#![forbid(unsafe_code)]

use std::fmt;

use serde::Serialize;

use crate::error::{Result, WalletError};

pub const MIN_LENGTH: usize = 8;
pub const STRONG_LENGTH: usize = 12;
pub const BONUS_LENGTH: usize = 16;
pub const MIN_VALID_SCORE: u8 = 4;
pub const MAX_SCORE: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    TooShort,
    AddUppercase,
    AddLowercase,
    AddDigit,
    AddSpecial,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TooShort => "use at least 8 characters",
            Self::AddUppercase => "add an uppercase letter",
            Self::AddLowercase => "add a lowercase letter",
            Self::AddDigit => "add a number",
            Self::AddSpecial => "add a special character",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrengthReport {
    pub is_valid: bool,
    pub score: u8,
    pub feedback: Vec<Feedback>,
}

pub fn evaluate(passphrase: &str) -> StrengthReport {
    let length = passphrase.chars().count();
    let mut score = 0u8;
    let mut feedback = Vec::new();

    if length >= STRONG_LENGTH {
        score += 2;
    } else if length >= MIN_LENGTH {
        score += 1;
    } else {
        feedback.push(Feedback::TooShort);
    }

    let classes = [
        (passphrase.chars().any(|c| c.is_ascii_uppercase()), Feedback::AddUppercase),
        (passphrase.chars().any(|c| c.is_ascii_lowercase()), Feedback::AddLowercase),
        (passphrase.chars().any(|c| c.is_ascii_digit()), Feedback::AddDigit),
        (passphrase.chars().any(|c| !c.is_ascii_alphanumeric()), Feedback::AddSpecial),
    ];
    for (present, missing) in classes {
        if present {
            score += 1;
        } else {
            feedback.push(missing);
        }
    }

    if length >= BONUS_LENGTH {
        score += 1;
    }

    StrengthReport {
        is_valid: score >= MIN_VALID_SCORE && length >= MIN_LENGTH,
        score,
        feedback,
    }
}

/// Rejects passphrases that may not encrypt a wallet record.
pub fn ensure_strong(passphrase: &str) -> Result<()> {
    let report = evaluate(passphrase);
    if report.is_valid {
        Ok(())
    } else {
        Err(WalletError::WeakPassphrase {
            feedback: report.feedback,
        })
    }
}

/// Checks a new passphrase and its confirmation entry.
pub fn validate_new_passphrase(passphrase: &str, confirmation: &str) -> Result<()> {
    if passphrase != confirmation {
        return Err(WalletError::PassphraseMismatch);
    }
    ensure_strong(passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_passphrase() {
        let report = evaluate("Str0ng!Passphrase123");
        assert!(report.is_valid);
        assert_eq!(report.score, MAX_SCORE);
        assert!(report.feedback.is_empty());
    }

    #[test]
    fn test_short_passphrase_never_valid() {
        for p in ["", "a", "Ab1!", "Ab1!xyz", "ÄÖÜ1!aB"] {
            let report = evaluate(p);
            assert!(!report.is_valid, "{p:?} should be invalid");
            assert!(report.feedback.contains(&Feedback::TooShort));
        }
    }

    #[test]
    fn test_medium_length_scoring() {
        // 8..=11 chars give one length point.
        let report = evaluate("abcdefgh");
        assert_eq!(report.score, 2);
        assert!(!report.is_valid);
        assert_eq!(
            report.feedback,
            vec![Feedback::AddUppercase, Feedback::AddDigit, Feedback::AddSpecial]
        );

        let report = evaluate("Abcdefg1");
        assert_eq!(report.score, 4);
        assert!(report.is_valid);
        assert_eq!(report.feedback, vec![Feedback::AddSpecial]);
    }

    #[test]
    fn test_long_length_scoring() {
        let report = evaluate("abcdefghijkl");
        assert_eq!(report.score, 3);
        assert!(!report.is_valid);

        let report = evaluate("abcdefghijklmnop");
        assert_eq!(report.score, 4);
        assert!(report.is_valid);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // Seven multibyte characters are still too short.
        let report = evaluate("éééééé1");
        assert!(report.feedback.contains(&Feedback::TooShort));
    }

    #[test]
    fn test_non_ascii_counts_as_special() {
        let report = evaluate("Passw0rdé");
        assert!(!report.feedback.contains(&Feedback::AddSpecial));
        assert!(report.is_valid);
    }

    #[test]
    fn test_ensure_strong() {
        assert!(ensure_strong("Tr0ub4dor&3!").is_ok());
        match ensure_strong("password") {
            Err(WalletError::WeakPassphrase { feedback }) => {
                assert!(feedback.contains(&Feedback::AddUppercase));
            }
            other => panic!("expected weak passphrase, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_new_passphrase() {
        assert!(validate_new_passphrase("Tr0ub4dor&3!", "Tr0ub4dor&3!").is_ok());
        assert!(matches!(
            validate_new_passphrase("Tr0ub4dor&3!", "Tr0ub4dor&3?"),
            Err(WalletError::PassphraseMismatch)
        ));
        assert!(matches!(
            validate_new_passphrase("weak", "weak"),
            Err(WalletError::WeakPassphrase { .. })
        ));
    }
}
