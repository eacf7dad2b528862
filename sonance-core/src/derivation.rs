// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Mnemonic generation and HD key derivation.

#![forbid(unsafe_code)]

use std::str::FromStr;

use bip39::{Language, Mnemonic};
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::key::Secp256k1;
use bitcoin::{Address, CompressedPublicKey, Network};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::random_bytes;
use crate::error::{Result, WalletError};
use crate::record::WalletData;

/// Output of deriving one account key from a mnemonic.
pub struct DerivedKeys {
    pub address: String,
    /// Hex-encoded 32-byte secret key.
    pub private_key: Zeroizing<String>,
    pub path: DerivationPath,
}

pub trait KeyDerivation: Send + Sync {
    fn generate_mnemonic(&self) -> Result<Zeroizing<String>>;

    /// Derives the key at `path`, or at the default account path when `None`.
    fn derive(&self, phrase: &str, path: Option<&DerivationPath>) -> Result<DerivedKeys>;

    fn wallet_data(&self, phrase: &str, label: &str) -> Result<WalletData> {
        let keys = self.derive(phrase, None)?;
        Ok(WalletData::new(
            phrase,
            keys.private_key.as_str(),
            keys.address,
            label,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    Twelve,
    TwentyFour,
}

impl WordCount {
    fn entropy_len(self) -> usize {
        match self {
            Self::Twelve => 16,
            Self::TwentyFour => 32,
        }
    }
}

/// BIP-39 mnemonics with BIP-32 derivation of native segwit addresses.
#[derive(Debug, Clone)]
pub struct Bip32Derivation {
    network: Network,
    word_count: WordCount,
}

impl Bip32Derivation {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            word_count: WordCount::Twelve,
        }
    }

    pub fn with_word_count(mut self, word_count: WordCount) -> Self {
        self.word_count = word_count;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn default_path(&self) -> Result<DerivationPath> {
        let coin_type = if self.network == Network::Bitcoin {
            0
        } else {
            1
        };
        DerivationPath::from_str(&format!("m/84'/{coin_type}'/0'/0/0"))
            .map_err(|e| WalletError::Derivation(format!("invalid path: {e}")))
    }
}

impl Default for Bip32Derivation {
    fn default() -> Self {
        Self::new(Network::Bitcoin)
    }
}

pub fn parse_network(name: &str) -> Result<Network> {
    Network::from_str(name)
        .map_err(|_| WalletError::InvalidConfig(format!("unknown network {name}")))
}

impl KeyDerivation for Bip32Derivation {
    fn generate_mnemonic(&self) -> Result<Zeroizing<String>> {
        let mut entropy: [u8; 32] = random_bytes();
        let mnemonic = Mnemonic::from_entropy_in(
            Language::English,
            &entropy[..self.word_count.entropy_len()],
        );
        entropy.zeroize();

        let mnemonic = mnemonic.map_err(|e| WalletError::Derivation(e.to_string()))?;
        Ok(Zeroizing::new(mnemonic.to_string()))
    }

    fn derive(&self, phrase: &str, path: Option<&DerivationPath>) -> Result<DerivedKeys> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
            .map_err(|e| WalletError::Derivation(format!("invalid mnemonic: {e}")))?;
        let seed = Zeroizing::new(mnemonic.to_seed(""));

        let secp = Secp256k1::new();
        let master = Xpriv::new_master(self.network, seed.as_slice())
            .map_err(|e| WalletError::Derivation(format!("failed to create master key: {e}")))?;

        let path = match path {
            Some(p) => p.clone(),
            None => self.default_path()?,
        };
        let child = master
            .derive_priv(&secp, &path)
            .map_err(|e| WalletError::Derivation(format!("derivation failed: {e}")))?;

        let public_key = CompressedPublicKey(child.private_key.public_key(&secp));
        let address = Address::p2wpkh(&public_key, self.network);

        let mut secret = child.private_key.secret_bytes();
        let private_key = Zeroizing::new(hex::encode(secret));
        secret.zeroize();

        Ok(DerivedKeys {
            address: address.to_string(),
            private_key,
            path,
        })
    }
}
