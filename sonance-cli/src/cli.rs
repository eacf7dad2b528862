// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sonance")]
#[command(about = "Encrypted wallet storage and recovery links for Sonance")]
#[command(version)]
pub(crate) struct Cli {
    /// Wallet database file
    #[arg(short, long, global = true)]
    pub path: Option<PathBuf>,

    /// Config file (defaults to ~/.config/sonance/config.toml)
    #[arg(long, global = true, env = "SONANCE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },
    /// Score a passphrase without storing anything
    CheckPassphrase,
    /// Run the recovery link HTTP service
    Serve {
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
}

#[derive(Subcommand)]
pub(crate) enum WalletCommands {
    /// Generate a new wallet, or restore one from a recovery phrase
    Create {
        #[arg(short, long, default_value = "Main")]
        label: String,
        #[arg(long)]
        restore: bool,
        #[arg(long, default_value = "bitcoin")]
        network: String,
        #[arg(long, value_enum, default_value_t = Words::Twelve)]
        words: Words,
    },
    /// Check the passphrase and clear the lock flag
    Unlock {
        #[arg(long)]
        show_secrets: bool,
    },
    Lock,
    Status,
    ChangePassphrase,
    Delete {
        /// Address of the wallet to delete (defaults to the stored one)
        #[arg(short, long)]
        address: Option<String>,
    },
    Config {
        #[command(subcommand)]
        command: SessionConfigCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum SessionConfigCommands {
    Show,
    Set {
        /// Inactivity timeout in minutes
        #[arg(long)]
        timeout: Option<u32>,
        #[arg(long)]
        auto_lock: Option<bool>,
        #[arg(long)]
        require_passphrase: Option<bool>,
    },
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Words {
    #[value(name = "12")]
    Twelve,
    #[value(name = "24")]
    TwentyFour,
}
