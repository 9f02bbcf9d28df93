//! A Rust library providing the AES block cipher primitive.
//!
//! The crate implements single-block AES-128/192/256 encryption and
//! decryption per FIPS 197, with a table-driven software engine and an
//! AES-NI hardware engine selected automatically at key setup. Modes of
//! operation, padding, and key management are left to the caller.

pub mod aes;
