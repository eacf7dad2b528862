// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use chrono::DateTime;
use secrecy::ExposeSecret;
use tracing::debug;

use sonance_core::derivation::{parse_network, Bip32Derivation, WordCount};
use sonance_core::error::{Result, WalletError};
use sonance_core::wallet::FIXED_EXPIRY_MINUTES;
use sonance_core::{ExpiryPolicy, SessionConfig, WalletStore};

use crate::cli::Words;
use crate::config::Config;
use crate::output::Output;

use super::{get_confirm, get_mnemonic, get_new_passphrase, get_passphrase, open, report_strength};

fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn open_existing(path: &Path, cfg: &Config) -> Result<WalletStore> {
    let store = open(path, cfg.store_config())?;
    if !store.has_wallet()? {
        return Err(WalletError::NotFound);
    }
    Ok(store)
}

fn print_session(out: &Output, session: &SessionConfig, policy: ExpiryPolicy) {
    out.field("Timeout", &format!("{} min", session.session_timeout));
    out.field("Auto-lock", yes_no(session.auto_lock));
    out.field(
        "Passphrase for transactions",
        yes_no(session.require_passphrase_on_transaction),
    );
    let window = match policy {
        ExpiryPolicy::Fixed => format!("fixed, {FIXED_EXPIRY_MINUTES} min"),
        ExpiryPolicy::SessionTimeout => format!("session timeout, {} min", session.session_timeout),
    };
    out.field("Expiry window", &window);
}

pub fn cmd_wallet_create(
    out: &Output,
    path: &Path,
    cfg: &Config,
    label: &str,
    restore: bool,
    network: &str,
    words: Words,
) -> Result<()> {
    let store = open(path, cfg.store_config())?;
    if store.has_wallet()? {
        out.warn("A wallet already exists here. Continuing replaces it.");
        if !get_confirm("Replace the existing wallet?")? {
            out.info("Aborted.");
            return Ok(());
        }
    }

    let word_count = match words {
        Words::Twelve => WordCount::Twelve,
        Words::TwentyFour => WordCount::TwentyFour,
    };
    let deriver = Bip32Derivation::new(parse_network(network)?).with_word_count(word_count);

    let phrase = if restore {
        Some(get_mnemonic("Enter recovery phrase")?)
    } else {
        None
    };
    let passphrase = get_new_passphrase(
        "SONANCE_PASSPHRASE",
        "Choose a passphrase",
        "Confirm passphrase",
    )?;
    report_strength(out, &passphrase)?;

    debug!(restore, network, "creating wallet");
    let spinner = out.spinner("Encrypting wallet...");
    let result = match &phrase {
        Some(phrase) => store.restore(
            phrase.expose_secret(),
            label,
            passphrase.expose_secret(),
            &deriver,
        ),
        None => store.create_new(label, passphrase.expose_secret(), &deriver),
    };
    spinner.finish();
    let data = result?;

    out.newline();
    out.success(if restore {
        "Wallet restored"
    } else {
        "Wallet created"
    });
    out.field("Label", &data.label);
    out.field("Network", &deriver.network().to_string());
    out.key_field("Address", &data.address);

    if phrase.is_none() {
        out.header("Recovery phrase");
        out.mnemonic(&data.mnemonic);
        out.secret_warning();
        out.newline();
        out.create_notes();
    }
    Ok(())
}

pub fn cmd_wallet_unlock(out: &Output, path: &Path, cfg: &Config, show_secrets: bool) -> Result<()> {
    let store = open_existing(path, cfg)?;
    let passphrase = get_passphrase("Enter passphrase")?;

    let spinner = out.spinner("Unlocking wallet...");
    let result = store.retrieve(passphrase.expose_secret());
    spinner.finish();
    let data = result?.ok_or(WalletError::NotFound)?;
    store.unlock()?;

    out.success("Wallet unlocked");
    out.field("Label", &data.label);
    out.key_field("Address", &data.address);

    if show_secrets && get_confirm("Display the recovery phrase and private key?")? {
        out.header("Recovery phrase");
        out.mnemonic(&data.mnemonic);
        out.key_field("Private key", &data.private_key);
        out.secret_warning();
    }
    Ok(())
}

pub fn cmd_wallet_lock(out: &Output, path: &Path, cfg: &Config) -> Result<()> {
    let store = open_existing(path, cfg)?;
    store.lock()?;
    out.success("Wallet locked");
    Ok(())
}

pub fn cmd_wallet_status(out: &Output, path: &Path, cfg: &Config) -> Result<()> {
    let store = open(path, cfg.store_config())?;
    let auto_locked = store.auto_lock_if_expired()?;

    let Some(summary) = store.summary()? else {
        out.newline();
        out.info("No wallet found. Use 'sonance wallet create' to create one.");
        return Ok(());
    };

    out.header("Wallet");
    out.field("Label", &summary.label);
    out.key_field("Address", &summary.address);
    out.field("State", if summary.locked { "locked" } else { "unlocked" });
    out.field("Created", &format_millis(summary.created_at));
    out.field("Last accessed", &format_millis(summary.last_accessed));
    if summary.upgrade_pending {
        out.field("Record version", "1.0 (upgraded on next unlock)");
    } else {
        out.field("Record version", &summary.version);
    }

    let session = store.session_config()?.unwrap_or_default();
    out.header("Session");
    print_session(out, &session, cfg.expiry_policy);

    if auto_locked {
        out.newline();
        out.warn("Session expired after inactivity and has been locked");
    }
    Ok(())
}

pub fn cmd_wallet_change_passphrase(out: &Output, path: &Path, cfg: &Config) -> Result<()> {
    let store = open_existing(path, cfg)?;
    store.ensure_session_active()?;
    let current = get_passphrase("Current passphrase")?;
    let new = get_new_passphrase(
        "SONANCE_NEW_PASSPHRASE",
        "New passphrase",
        "Confirm new passphrase",
    )?;
    report_strength(out, &new)?;

    let spinner = out.spinner("Re-encrypting wallet...");
    let result = store.change_passphrase(current.expose_secret(), new.expose_secret());
    spinner.finish();
    result?;

    out.success("Passphrase changed");
    out.info("Session settings were reset to their defaults.");
    Ok(())
}

pub fn cmd_wallet_delete(
    out: &Output,
    path: &Path,
    cfg: &Config,
    address: Option<&str>,
) -> Result<()> {
    let store = open(path, cfg.store_config())?;
    let summary = store.summary()?.ok_or(WalletError::NotFound)?;
    let address = address.unwrap_or(&summary.address);
    if address != summary.address {
        return Err(WalletError::AddressMismatch(address.to_string()));
    }

    let passphrase = get_passphrase("Enter passphrase")?;
    let spinner = out.spinner("Verifying passphrase...");
    let verified = store.retrieve(passphrase.expose_secret());
    spinner.finish();
    verified?.ok_or(WalletError::NotFound)?;

    out.warn(&format!(
        "This permanently deletes wallet {address}. Only its recovery phrase can bring it back."
    ));
    if !get_confirm("Delete the wallet?")? {
        out.info("Aborted.");
        return Ok(());
    }

    store.delete_wallet(address)?;
    out.success("Wallet deleted");
    Ok(())
}

pub fn cmd_session_show(out: &Output, path: &Path, cfg: &Config) -> Result<()> {
    let store = open_existing(path, cfg)?;
    let session = store.session_config()?.unwrap_or_default();
    out.header("Session");
    print_session(out, &session, cfg.expiry_policy);
    Ok(())
}

pub fn cmd_session_set(
    out: &Output,
    path: &Path,
    cfg: &Config,
    timeout: Option<u32>,
    auto_lock: Option<bool>,
    require_passphrase: Option<bool>,
) -> Result<()> {
    let store = open_existing(path, cfg)?;
    store.ensure_session_active()?;
    let mut session = store.session_config()?.unwrap_or_default();
    if let Some(minutes) = timeout {
        session = session.with_session_timeout(minutes);
    }
    if let Some(enabled) = auto_lock {
        session = session.with_auto_lock(enabled);
    }
    if let Some(required) = require_passphrase {
        session = session.with_require_passphrase_on_transaction(required);
    }

    store.update_session_config(session)?;
    out.success("Session settings updated");
    print_session(out, &session, cfg.expiry_policy);
    Ok(())
}

pub fn cmd_session_reset(out: &Output, path: &Path, cfg: &Config) -> Result<()> {
    let store = open_existing(path, cfg)?;
    store.ensure_session_active()?;
    store.reset_session_config()?;
    out.success("Session settings reset");
    print_session(out, &SessionConfig::default(), cfg.expiry_policy);
    Ok(())
}
