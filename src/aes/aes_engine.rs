//! AES Engine and Backend Dispatch
//!
//! This module exposes the [`Aes`] engine, the public face of the crate. An
//! engine is constructed from a cipher key, runs the key expansion once, and
//! then encrypts and decrypts 16-byte blocks with no further key work.
//!
//! At construction time the engine picks a backend and keeps it for its
//! whole lifetime: the hardware engine when the CPU reports AES-NI support,
//! the software T-table engine otherwise. Both backends produce bit-for-bit
//! identical output for the same key and block.
//!
//! # Usage
//!
//! Basic usage for encrypting and decrypting a single block with AES-128
//! (the FIPS 197 Appendix C.1 example vector):
//!
//! ```
//! use block_aes::aes::Aes;
//!
//! let key: [u8; 16] = [
//!     0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
//!     0x0e, 0x0f,
//! ];
//! let plaintext: [u8; 16] = [
//!     0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
//!     0xee, 0xff,
//! ];
//! let expected: [u8; 16] = [
//!     0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30, 0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4,
//!     0xc5, 0x5a,
//! ];
//!
//! let cipher = Aes::new(&key).expect("Key setup failed");
//! let ciphertext = cipher.encrypt_block(&plaintext);
//! assert_eq!(ciphertext, expected);
//! assert_eq!(cipher.decrypt_block(&ciphertext), plaintext);
//! ```
//!
//! # Note
//!
//! Block operations take `&self` and the engine holds no interior
//! mutability, so a keyed engine may be shared across threads freely.
//! Changing the key with [`Aes::set_key`] requires exclusive access.

use std::error::Error;
use std::fmt;

use super::aes_core::{SoftAes, AES_BLOCK_SIZE};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use super::aes_ni::{self, AesNi};

/// Report whether the CPU executing this process supports hardware AES
/// round instructions (AES-NI on x86/x86_64).
///
/// Always `false` on other architectures. The result is stable for the
/// process lifetime and is consulted once per engine construction.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn cpu_supports_aes() -> bool {
    aes_ni::cpu_has_aes()
}

/// Report whether the CPU executing this process supports hardware AES
/// round instructions (AES-NI on x86/x86_64).
///
/// Always `false` on other architectures.
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn cpu_supports_aes() -> bool {
    false
}

enum Backend {
    Soft(SoftAes),
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Ni(AesNi),
}

/// An AES block cipher engine keyed with a 128-, 192-, or 256-bit key.
///
/// The engine owns its round-key schedules and the backend chosen at
/// construction. [`Aes::encrypt_block`] and [`Aes::decrypt_block`] are pure
/// block transformations; callers that need a mode of operation (CBC, CTR,
/// GCM, ...) build it on top of this primitive.
pub struct Aes {
    backend: Backend,
    key_len: usize,
}

impl Aes {
    /// Build an engine from `key`, expanding the round-key schedules.
    ///
    /// The backend is fixed here: hardware if [`cpu_supports_aes`] reports
    /// support, software otherwise.
    ///
    /// # Parameters
    ///
    /// * `key`: The cipher key. The length determines the AES variant:
    ///          16 bytes for AES-128, 24 for AES-192, and 32 for AES-256.
    ///
    /// # Returns
    ///
    /// * `Ok(Aes)` - A keyed engine ready for block operations.
    /// * `Err(Box<dyn Error>)` - If the key length is invalid.
    pub fn new(key: &[u8]) -> Result<Self, Box<dyn Error>> {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            if cpu_supports_aes() {
                return Ok(Aes {
                    backend: Backend::Ni(AesNi::new(key)?),
                    key_len: key.len(),
                });
            }
        }

        Ok(Aes {
            backend: Backend::Soft(SoftAes::new(key)?),
            key_len: key.len(),
        })
    }

    /// Replace the engine's key, re-running the key expansion.
    ///
    /// The backend chosen at construction is kept. On error the engine is
    /// left unchanged and remains usable with its previous key. After a
    /// successful call the engine state is indistinguishable from a fresh
    /// construction with the same key.
    pub fn set_key(&mut self, key: &[u8]) -> Result<(), Box<dyn Error>> {
        self.backend = match &self.backend {
            Backend::Soft(_) => Backend::Soft(SoftAes::new(key)?),
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Ni(_) => Backend::Ni(AesNi::new(key)?),
        };
        self.key_len = key.len();

        Ok(())
    }

    /// Encrypt one 16-byte block, returning the ciphertext block.
    pub fn encrypt_block(&self, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        match &self.backend {
            Backend::Soft(engine) => engine.encrypt_block(block),
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Ni(engine) => engine.encrypt_block(block),
        }
    }

    /// Decrypt one 16-byte block, returning the plaintext block.
    pub fn decrypt_block(&self, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        match &self.backend {
            Backend::Soft(engine) => engine.decrypt_block(block),
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Ni(engine) => engine.decrypt_block(block),
        }
    }

    /// The key length in bytes: 16, 24, or 32.
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// The block length in bytes, always 16.
    pub fn block_len(&self) -> usize {
        AES_BLOCK_SIZE
    }

    fn backend_name(&self) -> &'static str {
        match &self.backend {
            Backend::Soft(_) => "software",
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Ni(_) => "aes-ni",
        }
    }
}

// Round-key material never appears in Debug output.
impl fmt::Debug for Aes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes")
            .field("key_len", &self.key_len)
            .field("backend", &self.backend_name())
            .finish()
    }
}

/// Encrypt a single block using the AES algorithm.
///
/// One-shot convenience over [`Aes`]: the key is expanded, the block is
/// encrypted, and the schedule is discarded. Callers processing more than
/// one block should construct an [`Aes`] engine once instead.
///
/// # Parameters
///
/// * `block`: A reference to a 16-byte array representing the plaintext
///            block to be encrypted.
/// * `key`: A reference to a byte slice representing the encryption key. The
///          length of this slice determines the key size: 16 bytes for
///          AES-128, 24 bytes for AES-192, and 32 bytes for AES-256.
///
/// # Returns
///
/// * `Ok([u8; AES_BLOCK_SIZE])` - A 16-byte array representing the encrypted
///    ciphertext block.
/// * `Err(Box<dyn Error>)` - If the key length is invalid.
pub fn aes_enc_block(
    block: &[u8; AES_BLOCK_SIZE],
    key: &[u8],
) -> Result<[u8; AES_BLOCK_SIZE], Box<dyn Error>> {
    Ok(Aes::new(key)?.encrypt_block(block))
}

/// Decrypt a single block using the AES algorithm.
///
/// One-shot convenience over [`Aes`]; see [`aes_enc_block`].
///
/// # Parameters
///
/// * `block`: A reference to a 16-byte array representing the ciphertext
///            block to be decrypted.
/// * `key`: A reference to a byte slice representing the decryption key.
///
/// # Returns
///
/// * `Ok([u8; AES_BLOCK_SIZE])` - A 16-byte array representing the decrypted
///    plaintext block.
/// * `Err(Box<dyn Error>)` - If the key length is invalid.
pub fn aes_dec_block(
    block: &[u8; AES_BLOCK_SIZE],
    key: &[u8],
) -> Result<[u8; AES_BLOCK_SIZE], Box<dyn Error>> {
    Ok(Aes::new(key)?.decrypt_block(block))
}
