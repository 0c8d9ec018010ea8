//! AES-256-GCM envelope encryption of individual values.
//!
//! Every call draws a fresh random nonce and prepends it to the sealed
//! output, so the stored encoding is `hex(nonce || ciphertext || tag)`.
//! The same key encrypts every value; there is no per-value derivation.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use envkeep_core::SecretString;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, VaultError};

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
pub const KEY_SIZE: usize = 32;

/// A 256-bit symmetric key, zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Parse a hex-encoded 32-byte key (`openssl rand -hex 32`).
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let mut bytes = hex::decode(hex_key.trim())
            .map_err(|e| VaultError::InvalidKey(format!("not valid hex: {e}")))?;

        if bytes.len() != KEY_SIZE {
            let len = bytes.len();
            bytes.zeroize();
            return Err(VaultError::InvalidKey(format!(
                "must decode to exactly {KEY_SIZE} bytes, got {len}"
            )));
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    /// Hex encoding of the key, for handing to an operator.
    pub fn to_hex(&self) -> SecretString {
        SecretString::new(hex::encode(self.0))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl TryFrom<&SecretString> for EncryptionKey {
    type Error = VaultError;

    fn try_from(value: &SecretString) -> Result<Self> {
        Self::from_hex(value.expose_secret())
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Encrypt `plaintext` under `key`, returning the hex storage encoding.
pub fn encrypt(key: &EncryptionKey, plaintext: &str) -> Result<String> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let sealed = key
        .cipher()
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&sealed);

    Ok(hex::encode(out))
}

/// Decrypt a value produced by [`encrypt`].
///
/// A wrong key, tampered bytes, or a truncated encoding all fail tag
/// verification and surface as [`VaultError::Decryption`].
pub fn decrypt(key: &EncryptionKey, encoded: &str) -> Result<SecretString> {
    let raw = hex::decode(encoded)
        .map_err(|e| VaultError::Decryption(format!("hex decode failed: {e}")))?;

    if raw.len() < NONCE_SIZE + TAG_SIZE {
        return Err(VaultError::Decryption("ciphertext too short".to_string()));
    }

    let (nonce_bytes, sealed) = raw.split_at(NONCE_SIZE);
    let mut plaintext = key
        .cipher()
        .decrypt(Nonce::from_slice(nonce_bytes), sealed)
        .map_err(|_| VaultError::Decryption("authentication tag mismatch".to_string()))?;

    let value = String::from_utf8(std::mem::take(&mut plaintext)).map_err(|e| {
        let mut bytes = e.into_bytes();
        bytes.zeroize();
        VaultError::Decryption("plaintext is not valid UTF-8".to_string())
    })?;

    Ok(SecretString::new(value))
}
