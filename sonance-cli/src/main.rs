// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

mod cli;
mod commands;
mod config;
mod output;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use sonance_core::error::Result;

use crate::cli::*;
use crate::config::{Config, LogLevel};
use crate::output::Output;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_request_id() -> String {
    let id = REQUEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("req-{id:08x}")
}

fn init_logging(level: Option<LogLevel>) {
    let use_json = std::env::var("SONANCE_LOG_JSON").is_ok();
    let filter = match level {
        Some(level) => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
        }
        None => EnvFilter::from_default_env(),
    };

    if use_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_span_events(FmtSpan::CLOSE)
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    let out = Output::new();

    let cfg = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            out.error(&e.to_string());
            std::process::exit(2);
        }
    };
    init_logging(cfg.log_level);

    if let Err(e) = run(&out, cli, &cfg) {
        debug!(error = %e, kind = ?e.kind(), "command failed");
        out.error(&e.user_message());
        std::process::exit(1);
    }
}

#[tracing::instrument(skip_all, fields(request_id = %next_request_id()))]
fn run(out: &Output, cli: Cli, cfg: &Config) -> Result<()> {
    let path = cli.path.unwrap_or_else(|| cfg.store_path());
    debug!(path = %path.display(), "starting command");

    match cli.command {
        Commands::Wallet { command } => dispatch_wallet(out, &path, cfg, command),
        Commands::CheckPassphrase => commands::cmd_check_passphrase(out),
        Commands::Serve { bind } => commands::serve::cmd_serve(out, cfg, bind),
    }
}

fn dispatch_wallet(out: &Output, path: &Path, cfg: &Config, command: WalletCommands) -> Result<()> {
    match command {
        WalletCommands::Create {
            label,
            restore,
            network,
            words,
        } => commands::wallet::cmd_wallet_create(out, path, cfg, &label, restore, &network, words),
        WalletCommands::Unlock { show_secrets } => {
            commands::wallet::cmd_wallet_unlock(out, path, cfg, show_secrets)
        }
        WalletCommands::Lock => commands::wallet::cmd_wallet_lock(out, path, cfg),
        WalletCommands::Status => commands::wallet::cmd_wallet_status(out, path, cfg),
        WalletCommands::ChangePassphrase => {
            commands::wallet::cmd_wallet_change_passphrase(out, path, cfg)
        }
        WalletCommands::Delete { address } => {
            commands::wallet::cmd_wallet_delete(out, path, cfg, address.as_deref())
        }
        WalletCommands::Config { command } => dispatch_session(out, path, cfg, command),
    }
}

fn dispatch_session(
    out: &Output,
    path: &Path,
    cfg: &Config,
    command: SessionConfigCommands,
) -> Result<()> {
    match command {
        SessionConfigCommands::Show => commands::wallet::cmd_session_show(out, path, cfg),
        SessionConfigCommands::Set {
            timeout,
            auto_lock,
            require_passphrase,
        } => commands::wallet::cmd_session_set(
            out,
            path,
            cfg,
            timeout,
            auto_lock,
            require_passphrase,
        ),
        SessionConfigCommands::Reset => commands::wallet::cmd_session_reset(out, path, cfg),
    }
}
