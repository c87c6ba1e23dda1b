//! AES-256-GCM sealing for token values at rest.
//!
//! Each value is sealed with its own random nonce; the master key comes
//! from the environment and never touches disk.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Master key size in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// GCM nonce size in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// A sealed value ready for storage: both fields base64-encoded.
#[derive(Clone, Debug)]
pub struct Sealed {
    pub ciphertext: String,
    pub nonce: String,
}

/// Decode and validate a base64 master key.
///
/// Returns the raw 32 key bytes, or an error if the input is not valid
/// base64 or the wrong length.
pub fn decode_key(key_base64: &str) -> Result<Vec<u8>> {
    let key = BASE64
        .decode(key_base64)
        .context("Encryption key is not valid base64")?;

    if key.len() != KEY_SIZE {
        return Err(anyhow!(
            "Encryption key must be {} bytes, got {}",
            KEY_SIZE,
            key.len()
        ));
    }

    Ok(key)
}

/// Seal a plaintext token value under the master key.
///
/// A fresh random nonce is drawn for every call; sealing the same value
/// twice produces different ciphertexts.
pub fn seal(plaintext: &str, key: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| anyhow!("Bad encryption key: {}", e))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    Ok(Sealed {
        ciphertext: BASE64.encode(&ciphertext),
        nonce: BASE64.encode(&nonce),
    })
}

/// Open a sealed value. Fails on a wrong key, wrong nonce, or any
/// tampering with the ciphertext (GCM is authenticated).
pub fn open(sealed: &Sealed, key: &[u8]) -> Result<String> {
    let ciphertext = BASE64
        .decode(&sealed.ciphertext)
        .context("Stored ciphertext is not valid base64")?;
    let nonce_bytes = BASE64
        .decode(&sealed.nonce)
        .context("Stored nonce is not valid base64")?;

    if nonce_bytes.len() != NONCE_SIZE {
        return Err(anyhow!(
            "Invalid nonce size: expected {}, got {}",
            NONCE_SIZE,
            nonce_bytes.len()
        ));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| anyhow!("Bad encryption key: {}", e))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| anyhow!("Decryption failed (wrong key or corrupted data)"))?;

    String::from_utf8(plaintext).context("Decrypted token is not valid UTF-8")
}
