// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Passphrase key derivation and the record cipher.
//!
//! Keys come from PBKDF2-HMAC-SHA256 over a per-record salt. Secrets are
//! encrypted with AES-256-CBC (PKCS#7) under a per-record IV, and the record
//! as a whole is authenticated with HMAC-SHA256 under a subkey.

#![forbid(unsafe_code)]

use std::fmt;

use aes::Aes256;
use blake2::{Blake2b512, Digest};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Result, WalletError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const SALT_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;
pub const KEY_SIZE: usize = 32;
pub const MAC_SIZE: usize = 32;
pub const BLOCK_SIZE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfParams {
    pub iterations: u32,
}

impl KdfParams {
    pub const TESTING: Self = Self { iterations: 1_000 };

    /// Iteration count of records written before schema 2.0.
    pub const LEGACY: Self = Self { iterations: 10_000 };

    pub const DEFAULT: Self = Self {
        iterations: 100_000,
    };

    pub const HIGH: Self = Self {
        iterations: 600_000,
    };

    /// Parameters read back from a stored record.
    ///
    /// Counts outside the presets this build writes are treated as a
    /// corrupted record.
    pub fn from_stored(iterations: u32) -> Result<Self> {
        if !(Self::TESTING.iterations..=Self::HIGH.iterations).contains(&iterations) {
            return Err(WalletError::DecryptionFailed);
        }
        Ok(Self { iterations })
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A 256-bit symmetric key, wiped on drop.
pub struct SecretKey(Zeroizing<[u8; KEY_SIZE]>);

impl SecretKey {
    pub fn new(mut bytes: [u8; KEY_SIZE]) -> Self {
        let key = Self(Zeroizing::new(bytes));
        bytes.zeroize();
        key
    }

    pub fn generate() -> Self {
        Self::new(random_bytes())
    }

    pub fn expose(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

pub fn derive_key(passphrase: &[u8], salt: &[u8; SALT_SIZE], params: KdfParams) -> Result<SecretKey> {
    if params.iterations == 0 {
        return Err(WalletError::InvalidConfig(
            "KDF iteration count must be greater than 0".into(),
        ));
    }

    let mut output = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, params.iterations, &mut output);
    let key = SecretKey::new(output);
    output.zeroize();
    Ok(key)
}

pub fn derive_subkey(key: &SecretKey, context: &[u8]) -> SecretKey {
    let mut hasher = Blake2b512::new();
    hasher.update(key.expose());
    hasher.update(context);
    let result = hasher.finalize();

    let mut output = [0u8; KEY_SIZE];
    output.copy_from_slice(&result[..KEY_SIZE]);
    SecretKey::new(output)
}

pub fn encrypt(plaintext: &[u8], key: &SecretKey, iv: &[u8; IV_SIZE]) -> Result<Vec<u8>> {
    let cipher = Aes256CbcEnc::new_from_slices(key.expose(), iv)
        .map_err(|e| WalletError::Encryption(format!("cipher init: {e}")))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypts `ciphertext`. Bad padding, a ragged length or an empty result are
/// all reported as [`WalletError::DecryptionFailed`].
pub fn decrypt(ciphertext: &[u8], key: &SecretKey, iv: &[u8; IV_SIZE]) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(WalletError::DecryptionFailed);
    }

    let cipher = Aes256CbcDec::new_from_slices(key.expose(), iv)
        .map_err(|e| WalletError::Encryption(format!("cipher init: {e}")))?;
    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| WalletError::DecryptionFailed)?;

    if plaintext.is_empty() {
        return Err(WalletError::DecryptionFailed);
    }
    Ok(plaintext)
}

fn record_hmac(key: &SecretKey, parts: &[&[u8]]) -> Result<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.expose())
        .map_err(|e| WalletError::Encryption(format!("mac init: {e}")))?;
    for part in parts {
        mac.update(&(part.len() as u64).to_le_bytes());
        mac.update(part);
    }
    Ok(mac)
}

/// HMAC-SHA256 over length-prefixed `parts`.
pub fn record_mac(key: &SecretKey, parts: &[&[u8]]) -> Result<[u8; MAC_SIZE]> {
    let tag = record_hmac(key, parts)?.finalize().into_bytes();
    let mut out = [0u8; MAC_SIZE];
    out.copy_from_slice(&tag);
    Ok(out)
}

pub fn verify_record_mac(key: &SecretKey, parts: &[&[u8]], expected: &[u8]) -> Result<bool> {
    let computed = record_mac(key, parts)?;
    if expected.len() != MAC_SIZE {
        return Ok(false);
    }
    Ok(bool::from(computed.ct_eq(expected)))
}

pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}
