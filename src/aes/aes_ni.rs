//! Hardware AES engine backed by the AES-NI instruction set.
//!
//! This module is only compiled on x86 and x86_64. The [`AesNi`] engine
//! mirrors the software engine's external behavior exactly: it expands the
//! same forward round-key schedule (reusing the portable key expansion, so
//! the schedules are identical by construction) and then performs the round
//! function with the native `AESENC`/`AESDEC` instructions.
//!
//! Decryption uses the equivalent inverse cipher of FIPS 197, Section 5.3.5:
//! the encryption round keys are reversed and the middle ones are passed
//! through `AESIMC` (InvMixColumns) once at key-setup time, which lets every
//! middle round be a single `AESDEC`.
//!
//! All functions touching AES intrinsics are `unsafe fn` annotated with
//! `#[target_feature(enable = "aes")]`; they are reachable only through
//! engines constructed after [`cpu_has_aes`] reported support.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use std::error::Error;

use super::aes_core::{
    calculate_parameters, expand_key, validate_key_len, AES_BLOCK_SIZE, MAX_EXPANSION_WORDS,
};

// One round key per round plus the whitening key; 15 for AES-256.
const MAX_ROUND_KEYS: usize = 15;

/// Report whether the CPU executing this process supports the AES
/// instruction extensions.
///
/// The standard library macro performs the CPUID query (leaf 1, ECX bit 25,
/// guarded by the maximum supported leaf) and caches the answer for the
/// process lifetime.
pub(crate) fn cpu_has_aes() -> bool {
    is_x86_feature_detected!("aes")
}

/// AES block engine using the AES-NI round instructions.
///
/// Construction must be gated on [`cpu_has_aes`]; the engine dispatcher
/// upholds this.
#[derive(Clone, Copy)]
pub(crate) struct AesNi {
    enc_ks: [__m128i; MAX_ROUND_KEYS],
    dec_ks: [__m128i; MAX_ROUND_KEYS],
    nr: usize,
}

impl AesNi {
    /// Expand `key` and build a hardware engine. Fails if the key is not
    /// 16, 24, or 32 bytes long.
    pub(crate) fn new(key: &[u8]) -> Result<Self, Box<dyn Error>> {
        debug_assert!(cpu_has_aes());

        validate_key_len(key.len())?;
        let (nk, nr) = calculate_parameters(key.len());

        let words = expand_key(key, nk, nr);
        // Safety: the dispatcher only constructs AesNi after cpu_has_aes()
        // returned true.
        let (enc_ks, dec_ks) = unsafe { load_schedule(&words, nr) };

        Ok(AesNi { enc_ks, dec_ks, nr })
    }

    /// Encrypt a single 16-byte block.
    pub(crate) fn encrypt_block(&self, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        // Safety: construction was gated on cpu_has_aes().
        unsafe { encrypt_rounds(&self.enc_ks, self.nr, block) }
    }

    /// Decrypt a single 16-byte block.
    pub(crate) fn decrypt_block(&self, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        // Safety: construction was gated on cpu_has_aes().
        unsafe { decrypt_rounds(&self.dec_ks, self.nr, block) }
    }
}

/// Load the expanded schedule words into round-key vectors and derive the
/// equivalent-inverse-cipher decryption keys.
///
/// `dec[0]` is the last encryption round key and `dec[nr]` the first; the
/// middle keys are InvMixColumns-transformed with `AESIMC` so that the
/// decryption rounds can use `AESDEC` directly.
#[target_feature(enable = "aes")]
unsafe fn load_schedule(
    words: &[u32; MAX_EXPANSION_WORDS],
    nr: usize,
) -> ([__m128i; MAX_ROUND_KEYS], [__m128i; MAX_ROUND_KEYS]) {
    let mut enc = [_mm_setzero_si128(); MAX_ROUND_KEYS];
    let mut dec = [_mm_setzero_si128(); MAX_ROUND_KEYS];

    let mut bytes = [0u8; AES_BLOCK_SIZE];
    for r in 0..=nr {
        for c in 0..4 {
            bytes[4 * c..4 * c + 4].copy_from_slice(&words[4 * r + c].to_be_bytes());
        }
        enc[r] = _mm_loadu_si128(bytes.as_ptr().cast());
    }

    dec[0] = enc[nr];
    for r in 1..nr {
        dec[r] = _mm_aesimc_si128(enc[nr - r]);
    }
    dec[nr] = enc[0];

    (enc, dec)
}

#[target_feature(enable = "aes")]
unsafe fn encrypt_rounds(
    ks: &[__m128i; MAX_ROUND_KEYS],
    nr: usize,
    block: &[u8; AES_BLOCK_SIZE],
) -> [u8; AES_BLOCK_SIZE] {
    let mut state = _mm_loadu_si128(block.as_ptr().cast());

    state = _mm_xor_si128(state, ks[0]);
    for r in 1..nr {
        state = _mm_aesenc_si128(state, ks[r]);
    }
    state = _mm_aesenclast_si128(state, ks[nr]);

    let mut out = [0u8; AES_BLOCK_SIZE];
    _mm_storeu_si128(out.as_mut_ptr().cast(), state);
    out
}

#[target_feature(enable = "aes")]
unsafe fn decrypt_rounds(
    ks: &[__m128i; MAX_ROUND_KEYS],
    nr: usize,
    block: &[u8; AES_BLOCK_SIZE],
) -> [u8; AES_BLOCK_SIZE] {
    let mut state = _mm_loadu_si128(block.as_ptr().cast());

    state = _mm_xor_si128(state, ks[0]);
    for r in 1..nr {
        state = _mm_aesdec_si128(state, ks[r]);
    }
    state = _mm_aesdeclast_si128(state, ks[nr]);

    let mut out = [0u8; AES_BLOCK_SIZE];
    _mm_storeu_si128(out.as_mut_ptr().cast(), state);
    out
}
