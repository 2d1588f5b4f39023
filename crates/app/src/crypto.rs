//! Passphrase encryption of secret bits before they are hidden.
//!
//! Ciphertext is close to uniformly random, so encrypting a message first
//! also makes the cover text less predictable.
//!
//! - HKDF-SHA256 derives the key from the passphrase
//! - ChaCha20-Poly1305 encrypts and authenticates
//!
//! Output layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

use stegano_core::BitString;

const HKDF_INFO: &[u8] = b"stegano-bits-v1";
const HKDF_SALT: &[u8] = b"stegano-salt-v1";

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

/// Bytes of randomness in a generated passphrase.
const GENERATED_KEY_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: wrong key or corrupted ciphertext")]
    DecryptionFailed,

    #[error("ciphertext is too short ({0} bytes)")]
    CiphertextTooShort(usize),

    #[error("input is {0} bits, not a whole number of bytes")]
    PartialByte(usize),

    #[error("passphrase is empty")]
    EmptyPassphrase,

    #[error("key derivation failed")]
    KeyDerivationFailed,
}

fn derive_key(passphrase: &str) -> Result<[u8; 32], CryptoError> {
    if passphrase.is_empty() {
        return Err(CryptoError::EmptyPassphrase);
    }
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), passphrase.as_bytes());
    let mut key = [0u8; 32];
    hk.expand(HKDF_INFO, &mut key)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(key)
}

pub fn encrypt_bytes(plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    let key = derive_key(passphrase)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt_bytes(data: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::CiphertextTooShort(data.len()));
    }
    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);

    let key = derive_key(passphrase)?;
    let cipher =
        ChaCha20Poly1305::new_from_slice(&key).map_err(|_| CryptoError::DecryptionFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypt a bitstring of whole bytes.
///
/// A bitstring whose length is not a multiple of 8 is rejected, since
/// padding it would change the message that [`decrypt_bits`] returns.
pub fn encrypt_bits(bits: &BitString, passphrase: &str) -> Result<BitString, CryptoError> {
    if bits.len() % 8 != 0 {
        return Err(CryptoError::PartialByte(bits.len()));
    }
    let ciphertext = encrypt_bytes(&bits.to_bytes(), passphrase)?;
    Ok(BitString::from_bytes(&ciphertext))
}

/// Decrypt a bitstring produced by [`encrypt_bits`].
pub fn decrypt_bits(bits: &BitString, passphrase: &str) -> Result<BitString, CryptoError> {
    if bits.len() % 8 != 0 {
        return Err(CryptoError::PartialByte(bits.len()));
    }
    let plaintext = decrypt_bytes(&bits.to_bytes(), passphrase)?;
    Ok(BitString::from_bytes(&plaintext))
}

/// A fresh random passphrase, URL-safe base64.
pub fn generate_key() -> String {
    let mut bytes = [0u8; GENERATED_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
