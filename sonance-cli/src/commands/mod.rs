// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod serve;
pub mod wallet;

use std::path::Path;

use dialoguer::{theme::ColorfulTheme, Confirm, Password};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use sonance_core::error::{Result, WalletError};
use sonance_core::strength;
use sonance_core::{open_store, StoreConfig, WalletStore};

use crate::output::Output;

fn warn_env_secret(var_name: &str) {
    tracing::warn!(
        "Using secret from {} environment variable. \
         Environment variables may be visible to other processes via /proc on Linux.",
        var_name
    );
}

fn secret_from_env(var_name: &str) -> Option<SecretString> {
    std::env::var(var_name).ok().map(|value| {
        debug!("using secret from {} env var", var_name);
        warn_env_secret(var_name);
        SecretString::from(value)
    })
}

fn read_secret(prompt: &str) -> Result<SecretString> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()
        .map(SecretString::from)
        .map_err(|e| WalletError::Other(format!("Failed to read passphrase: {}", e)))
}

pub fn get_passphrase(prompt: &str) -> Result<SecretString> {
    if let Some(pw) = secret_from_env("SONANCE_PASSPHRASE") {
        return Ok(pw);
    }
    read_secret(prompt)
}

/// Reads a passphrase that is about to protect a wallet. Prompts twice.
///
/// `env_var` lets scripts supply it; the confirmation is skipped then.
pub fn get_new_passphrase(env_var: &str, prompt: &str, confirm: &str) -> Result<SecretString> {
    if let Some(pw) = secret_from_env(env_var) {
        return Ok(pw);
    }
    let pw = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .with_confirmation(confirm, "Passphrases don't match")
        .interact()
        .map_err(|e| WalletError::Other(format!("Failed to read passphrase: {}", e)))?;
    Ok(SecretString::from(pw))
}

pub fn get_mnemonic(prompt: &str) -> Result<SecretString> {
    if let Some(phrase) = secret_from_env("SONANCE_MNEMONIC") {
        return Ok(phrase);
    }
    read_secret(prompt)
}

pub fn get_confirm(prompt: &str) -> Result<bool> {
    if std::env::var("SONANCE_YES").is_ok() {
        return Ok(true);
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| WalletError::Other(format!("Failed to read confirmation: {}", e)))
}

pub fn open(path: &Path, config: StoreConfig) -> Result<WalletStore> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    open_store(path, config)
}

/// Prints the score and feedback, then fails if the passphrase is too weak.
pub fn report_strength(out: &Output, passphrase: &SecretString) -> Result<()> {
    let report = strength::evaluate(passphrase.expose_secret());
    out.field(
        "Strength",
        &format!("{}/{}", report.score, strength::MAX_SCORE),
    );
    for hint in &report.feedback {
        out.field("Hint", &hint.to_string());
    }
    if !report.is_valid {
        return Err(WalletError::WeakPassphrase {
            feedback: report.feedback,
        });
    }
    Ok(())
}

pub fn cmd_check_passphrase(out: &Output) -> Result<()> {
    let passphrase = get_passphrase("Passphrase to check")?;
    out.header("Passphrase strength");
    report_strength(out, &passphrase)?;
    out.success("Passphrase is strong enough to protect a wallet");
    Ok(())
}
