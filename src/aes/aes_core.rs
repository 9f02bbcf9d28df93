//! AES Core Implementation
//!
//! This module provides the software implementation of the AES (Advanced
//! Encryption Standard) block cipher. It contains the word-level primitive
//! operations, the key expansion routine for both the encryption and the
//! decryption direction, and the [`SoftAes`] engine performing single-block
//! encryption and decryption.
//!
//! The implementation uses the classic T-table formulation: four precomputed
//! 256-entry tables per direction fold the SubBytes, ShiftRows and MixColumns
//! steps into one 32-bit lookup and three XORs per output column. The state
//! is held as four 32-bit words, one per column, each word big-endian within
//! its column.
//!
//! # Features
//!
//! - Supports AES-128, AES-192, and AES-256 key sizes.
//! - Expands the cipher key once into a forward round-key schedule and a
//!   derived inverse schedule; both are stored by the engine so that block
//!   operations perform no further key work.
//! - The inverse schedule carries InvMixColumns-transformed middle round
//!   keys, which is what allows the decryption rounds to use the fused
//!   decryption tables throughout (the equivalent inverse cipher of
//!   FIPS 197, Section 5.3.5).
//!
//! # Note
//!
//! Table-driven AES is not constant-time with respect to cache behavior.
//! Deployments that need resistance against cache-timing observers should
//! rely on the hardware engine, which is selected automatically on CPUs
//! with AES-NI support.

use std::error::Error;

use super::aes_tables::{INV_S_BOX, RCON, S_BOX, TD0, TD1, TD2, TD3, TE0, TE1, TE2, TE3};

// AES block size is fixed at 16 bytes
pub const AES_BLOCK_SIZE: usize = 16;

/// AES key size constants define the key sizes used in the AES algorithm for
/// the three standard variations of AES.
pub const AES_128_KEY_SIZE: usize = 16;
pub const AES_192_KEY_SIZE: usize = 24;
pub const AES_256_KEY_SIZE: usize = 32;

// The number of columns comprising a state in AES.
const NB: usize = 4;

// Largest schedule any variant needs: (14 + 1) rounds * 4 words for AES-256.
pub(crate) const MAX_EXPANSION_WORDS: usize = 60;

/// Load column `c` of a byte buffer as a big-endian 32-bit word.
#[inline]
fn load_word(buf: &[u8], c: usize) -> u32 {
    u32::from_be_bytes([buf[4 * c], buf[4 * c + 1], buf[4 * c + 2], buf[4 * c + 3]])
}

/// Store a 32-bit word into column `c` of a byte buffer, MSB first.
#[inline]
fn store_word(word: u32, c: usize, out: &mut [u8]) {
    out[4 * c..4 * c + 4].copy_from_slice(&word.to_be_bytes());
}

/// Apply the S-box to each byte of a word (the SubWord function of the key
/// expansion routine).
#[inline]
fn sub_word(w: u32) -> u32 {
    u32::from_be_bytes([
        S_BOX[(w >> 24) as usize],
        S_BOX[((w >> 16) & 0xff) as usize],
        S_BOX[((w >> 8) & 0xff) as usize],
        S_BOX[(w & 0xff) as usize],
    ])
}

/// Compute output column `c` of one full encryption round.
///
/// The table lookups realize SubBytes, ShiftRows and MixColumns in a single
/// expression: the source column offsets `c, c+1, c+2, c+3` are the row
/// shifts, and the table entries carry the substituted and column-mixed
/// contribution of each byte.
#[inline]
fn mix_col_shift_row(c: usize, s: &[u32; 4]) -> u32 {
    TE0[(s[c] >> 24) as usize]
        ^ TE1[((s[(c + 1) & 3] >> 16) & 0xff) as usize]
        ^ TE2[((s[(c + 2) & 3] >> 8) & 0xff) as usize]
        ^ TE3[(s[(c + 3) & 3] & 0xff) as usize]
}

/// Compute output column `c` of one full decryption round. The source column
/// offsets `c, c+3, c+2, c+1` implement InvShiftRows.
#[inline]
fn inv_mix_col_shift_row(c: usize, s: &[u32; 4]) -> u32 {
    TD0[(s[c] >> 24) as usize]
        ^ TD1[((s[(c + 3) & 3] >> 16) & 0xff) as usize]
        ^ TD2[((s[(c + 2) & 3] >> 8) & 0xff) as usize]
        ^ TD3[(s[(c + 1) & 3] & 0xff) as usize]
}

/// Compute output column `c` of the final encryption round, which applies
/// SubBytes and ShiftRows but no MixColumns.
#[inline]
fn sub_bytes_shift_rows(c: usize, s: &[u32; 4]) -> u32 {
    u32::from_be_bytes([
        S_BOX[(s[c] >> 24) as usize],
        S_BOX[((s[(c + 1) & 3] >> 16) & 0xff) as usize],
        S_BOX[((s[(c + 2) & 3] >> 8) & 0xff) as usize],
        S_BOX[(s[(c + 3) & 3] & 0xff) as usize],
    ])
}

/// Compute output column `c` of the final decryption round (InvSubBytes and
/// InvShiftRows, no InvMixColumns).
#[inline]
fn inv_sub_bytes_shift_rows(c: usize, s: &[u32; 4]) -> u32 {
    u32::from_be_bytes([
        INV_S_BOX[(s[c] >> 24) as usize],
        INV_S_BOX[((s[(c + 3) & 3] >> 16) & 0xff) as usize],
        INV_S_BOX[((s[(c + 2) & 3] >> 8) & 0xff) as usize],
        INV_S_BOX[(s[(c + 1) & 3] & 0xff) as usize],
    ])
}

/// Apply InvMixColumns to a raw round-key word.
///
/// The decryption tables expect bytes that will still pass through
/// InvSubBytes, so a word that has not been substituted is pre-indexed
/// through the forward S-box; the substitutions cancel and only the
/// InvMixColumns part of the table entries remains.
#[inline]
fn inv_mix_column(w: u32) -> u32 {
    TD0[S_BOX[(w >> 24) as usize] as usize]
        ^ TD1[S_BOX[((w >> 16) & 0xff) as usize] as usize]
        ^ TD2[S_BOX[((w >> 8) & 0xff) as usize] as usize]
        ^ TD3[S_BOX[(w & 0xff) as usize] as usize]
}

/// Expand an AES key into the forward round-key schedule.
///
/// This is the KeyExpansion routine of FIPS 197, Section 5.2, producing
/// `4 * (nr + 1)` words. The schedule is returned in a fixed buffer sized
/// for the largest variant; only the first `4 * (nr + 1)` words are
/// significant.
///
/// # Parameters
///
/// * `key`: A slice containing the initial AES key. Its length must be
///          16, 24, or 32 bytes and must match `nk` (validated by the
///          caller).
/// * `nk`: The number of 4-byte words in the original key. This is 4 for
///         AES-128, 6 for AES-192, and 8 for AES-256.
/// * `nr`: The number of rounds in the AES cipher, which depends on the key
///         size. This is 10 for AES-128, 12 for AES-192, and 14 for AES-256.
///
/// # Returns
///
/// A `[u32; 60]` array containing the expanded key words, big-endian per
/// column, round `r` occupying words `4r..4r+4`.
pub(crate) fn expand_key(key: &[u8], nk: usize, nr: usize) -> [u32; MAX_EXPANSION_WORDS] {
    let mut w = [0u32; MAX_EXPANSION_WORDS];

    // Copy the initial key as the first `nk` schedule words
    for i in 0..nk {
        w[i] = load_word(key, i);
    }

    for i in nk..NB * (nr + 1) {
        let mut temp = w[i - 1];

        if i % nk == 0 {
            // RotWord, SubWord and the round constant for the first word of
            // each new key group
            temp = sub_word(temp.rotate_left(8)) ^ RCON[i / nk - 1];
        } else if nk > 6 && i % nk == 4 {
            // For AES-256, apply SubWord to every fourth word as well
            temp = sub_word(temp);
        }

        w[i] = w[i - nk] ^ temp;
    }

    w
}

/// Derive the inverse round-key schedule from a forward schedule.
///
/// Middle-round words (rounds `1..nr`) are passed through InvMixColumns so
/// that the decryption rounds can XOR them directly after the fused
/// decryption-table lookups. The words of round 0 and round `nr` are carried
/// over unchanged; those two rounds do not mix columns.
pub(crate) fn expand_key_inv(
    w: &[u32; MAX_EXPANSION_WORDS],
    nr: usize,
) -> [u32; MAX_EXPANSION_WORDS] {
    let mut wi = *w;

    for r in 1..nr {
        for c in 0..NB {
            wi[NB * r + c] = inv_mix_column(w[NB * r + c]);
        }
    }

    wi
}

/// Calculate the number of 32-bit words in the key and the number of
/// encryption rounds based on the key length.
///
/// # Panics
///
/// Panics if the key length is not one of the valid AES key lengths; callers
/// reject such keys with [`validate_key_len`] first.
pub(crate) fn calculate_parameters(key_length_bytes: usize) -> (usize, usize) {
    let words_in_key = key_length_bytes / 4; // 1 word = 4 bytes
    let encryption_rounds = match words_in_key {
        4 => 10, // 128-bit key
        6 => 12, // 192-bit key
        8 => 14, // 256-bit key
        _ => panic!(
            "AES CORE PANIC: Invalid AES key length: {}",
            key_length_bytes
        ),
    };

    (words_in_key, encryption_rounds)
}

/// Validate the key length for AES encryption or decryption.
///
/// This function checks if the provided key length is suitable for AES. It
/// must be one of the standard AES key sizes: 128 bits (16 bytes), 192 bits
/// (24 bytes), or 256 bits (32 bytes).
///
/// # Parameters
///
/// * `key_len`: Length of the cipher key in bytes.
///
/// # Returns
///
/// * `Ok(())` - If the key is of valid length.
/// * `Err(Box<dyn Error>)` - If the key length is invalid.
pub(crate) fn validate_key_len(key_len: usize) -> Result<(), Box<dyn Error>> {
    match key_len {
        AES_128_KEY_SIZE | AES_192_KEY_SIZE | AES_256_KEY_SIZE => Ok(()),
        _ => Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "AES CORE ERROR: Invalid key length. Expected 16, 24, or 32 bytes, got {} bytes",
                key_len,
            ),
        ))),
    }
}

/// Software AES block engine.
///
/// Holds the forward and inverse round-key schedules expanded from one
/// cipher key. The engine is immutable after construction; block operations
/// take `&self` and may run concurrently from multiple threads.
#[derive(Clone)]
pub(crate) struct SoftAes {
    enc_ks: [u32; MAX_EXPANSION_WORDS],
    dec_ks: [u32; MAX_EXPANSION_WORDS],
    nr: usize,
}

impl SoftAes {
    /// Expand `key` and build an engine. Fails if the key is not 16, 24, or
    /// 32 bytes long.
    pub(crate) fn new(key: &[u8]) -> Result<Self, Box<dyn Error>> {
        validate_key_len(key.len())?;
        let (nk, nr) = calculate_parameters(key.len());

        let enc_ks = expand_key(key, nk, nr);
        let dec_ks = expand_key_inv(&enc_ks, nr);

        Ok(SoftAes { enc_ks, dec_ks, nr })
    }

    /// Encrypt a single 16-byte block.
    pub(crate) fn encrypt_block(&self, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        let w = &self.enc_ks;

        // Load the state column words and add the round 0 key
        let mut s = [0u32; NB];
        for c in 0..NB {
            s[c] = load_word(block, c) ^ w[c];
        }

        // Full rounds: fused SubBytes/ShiftRows/MixColumns plus round key
        for r in 1..self.nr {
            let mut t = [0u32; NB];
            for c in 0..NB {
                t[c] = mix_col_shift_row(c, &s) ^ w[NB * r + c];
            }
            s = t;
        }

        // Final round without MixColumns
        let mut out = [0u8; AES_BLOCK_SIZE];
        for c in 0..NB {
            store_word(sub_bytes_shift_rows(c, &s) ^ w[NB * self.nr + c], c, &mut out);
        }

        out
    }

    /// Decrypt a single 16-byte block.
    ///
    /// Runs the equivalent inverse cipher: the same round shape as
    /// encryption, against the inverse schedule. Round 0 adds the last
    /// forward round key (unmodified in the inverse schedule), the middle
    /// rounds walk the InvMixColumns-transformed words backwards, and the
    /// final round adds the first forward round key.
    pub(crate) fn decrypt_block(&self, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        let w = &self.dec_ks;

        let mut s = [0u32; NB];
        for c in 0..NB {
            s[c] = load_word(block, c) ^ w[NB * self.nr + c];
        }

        for r in (1..self.nr).rev() {
            let mut t = [0u32; NB];
            for c in 0..NB {
                t[c] = inv_mix_col_shift_row(c, &s) ^ w[NB * r + c];
            }
            s = t;
        }

        let mut out = [0u8; AES_BLOCK_SIZE];
        for c in 0..NB {
            store_word(inv_sub_bytes_shift_rows(c, &s) ^ w[c], c, &mut out);
        }

        out
    }
}
