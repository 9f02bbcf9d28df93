//! Engine-level behavior tests: rekeying, queries, randomized round trips,
//! diffusion, and concurrent use of a shared engine.

use super::super::*;

use hex::decode as hex_decode;
use rand::Rng;

const FIPS_128_KEY: &str = "000102030405060708090a0b0c0d0e0f";
const FIPS_PLAINTEXT: &str = "00112233445566778899aabbccddeeff";
const FIPS_128_CIPHERTEXT: &str = "69c4e0d86a7b0430d8cdb78070b4c55a";

fn block16(hex: &str) -> [u8; AES_BLOCK_SIZE] {
    hex_decode(hex).unwrap().try_into().unwrap()
}

#[test]
fn test_key_and_block_length_queries() {
    for key_len in [AES_128_KEY_SIZE, AES_192_KEY_SIZE, AES_256_KEY_SIZE] {
        let cipher = Aes::new(&vec![0u8; key_len]).expect("Key setup failed");
        assert_eq!(cipher.key_len(), key_len, "key_len query is wrong");
        assert_eq!(cipher.block_len(), AES_BLOCK_SIZE, "block_len query is wrong");
    }
}

#[test]
fn test_set_key_matches_fresh_construction() {
    let other_key = vec![0xab; AES_256_KEY_SIZE];
    let key = hex_decode(FIPS_128_KEY).unwrap();
    let plaintext = block16(FIPS_PLAINTEXT);

    // Rekeying an engine (even across key sizes) must be indistinguishable
    // from constructing a fresh one with the final key.
    let mut cipher = Aes::new(&other_key).expect("Key setup failed");
    cipher.set_key(&key).expect("Rekey failed");

    assert_eq!(cipher.key_len(), AES_128_KEY_SIZE);
    assert_eq!(
        cipher.encrypt_block(&plaintext),
        block16(FIPS_128_CIPHERTEXT),
        "Rekeyed engine does not match the FIPS vector"
    );
    assert_eq!(
        cipher.encrypt_block(&plaintext),
        Aes::new(&key).unwrap().encrypt_block(&plaintext),
        "Rekeyed engine differs from a freshly constructed one"
    );
}

#[test]
fn test_failed_set_key_keeps_previous_key() {
    let key = hex_decode(FIPS_128_KEY).unwrap();
    let plaintext = block16(FIPS_PLAINTEXT);

    let mut cipher = Aes::new(&key).expect("Key setup failed");
    assert!(cipher.set_key(&[0u8; 15]).is_err(), "15 byte key must fail");
    assert!(cipher.set_key(&[0u8; 33]).is_err(), "33 byte key must fail");

    // The engine must still be keyed with the original key.
    assert_eq!(cipher.key_len(), AES_128_KEY_SIZE);
    assert_eq!(
        cipher.encrypt_block(&plaintext),
        block16(FIPS_128_CIPHERTEXT),
        "Engine lost its key after a rejected rekey"
    );
}

#[test]
fn test_debug_reports_backend_and_hides_keys() {
    let cipher = Aes::new(&hex_decode(FIPS_128_KEY).unwrap()).unwrap();
    let rendered = format!("{:?}", cipher);

    if cpu_supports_aes() {
        assert!(rendered.contains("aes-ni"), "Debug output: {}", rendered);
    } else {
        assert!(rendered.contains("software"), "Debug output: {}", rendered);
    }
    // No round-key material: the whole output stays short.
    assert!(rendered.len() < 80, "Debug output too long: {}", rendered);
}

#[test]
fn test_round_trip_random_keys_and_blocks() {
    let mut rng = rand::thread_rng();

    for key_len in [AES_128_KEY_SIZE, AES_192_KEY_SIZE, AES_256_KEY_SIZE] {
        for _ in 0..1000 {
            let key: Vec<u8> = (0..key_len).map(|_| rng.gen()).collect();
            let block: [u8; AES_BLOCK_SIZE] = rng.gen();

            let cipher = Aes::new(&key).expect("Key setup failed");
            assert_eq!(
                cipher.decrypt_block(&cipher.encrypt_block(&block)),
                block,
                "decrypt(encrypt(block)) failed for key {:02x?}",
                key
            );
            assert_eq!(
                cipher.encrypt_block(&cipher.decrypt_block(&block)),
                block,
                "encrypt(decrypt(block)) failed for key {:02x?}",
                key
            );
        }
    }
}

/// Count the output bits that change when one input bit flips, averaged
/// over all 128 positions. A healthy block cipher diffuses every flip to
/// about half the 128 output bits.
fn mean_flipped_bits(flip_key: bool) -> f64 {
    let key = hex_decode(FIPS_128_KEY).unwrap();
    let plaintext = block16(FIPS_PLAINTEXT);
    let baseline = Aes::new(&key).unwrap().encrypt_block(&plaintext);

    let mut total = 0u32;
    for bit in 0..128 {
        let mut key = key.clone();
        let mut plaintext = plaintext;
        if flip_key {
            key[bit / 8] ^= 1 << (bit % 8);
        } else {
            plaintext[bit / 8] ^= 1 << (bit % 8);
        }

        let output = Aes::new(&key).unwrap().encrypt_block(&plaintext);
        total += (u128::from_be_bytes(baseline) ^ u128::from_be_bytes(output)).count_ones();
    }

    f64::from(total) / 128.0
}

#[test]
fn test_avalanche_on_plaintext_bits() {
    let mean = mean_flipped_bits(false);
    assert!(
        (48.0..=80.0).contains(&mean),
        "Mean output bit flips per plaintext bit flip out of range: {}",
        mean
    );
}

#[test]
fn test_avalanche_on_key_bits() {
    let mean = mean_flipped_bits(true);
    assert!(
        (48.0..=80.0).contains(&mean),
        "Mean output bit flips per key bit flip out of range: {}",
        mean
    );
}

#[test]
fn test_concurrent_encrypt_on_shared_engine() {
    let key = hex_decode(FIPS_128_KEY).unwrap();
    let cipher = Aes::new(&key).expect("Key setup failed");

    let fips_plaintext = block16(FIPS_PLAINTEXT);
    let fips_ciphertext = block16(FIPS_128_CIPHERTEXT);
    // Second deterministic input pair under the same key.
    let zero_plaintext = [0u8; AES_BLOCK_SIZE];
    let zero_ciphertext = block16("c6a13b37878f5b826f4f8162a1c8d879");

    std::thread::scope(|scope| {
        let engine = &cipher;
        scope.spawn(move || {
            for _ in 0..1000 {
                assert_eq!(
                    engine.encrypt_block(&fips_plaintext),
                    fips_ciphertext,
                    "Concurrent encryption produced a wrong block"
                );
            }
        });
        scope.spawn(move || {
            for _ in 0..1000 {
                assert_eq!(
                    engine.encrypt_block(&zero_plaintext),
                    zero_ciphertext,
                    "Concurrent encryption produced a wrong block"
                );
                assert_eq!(
                    engine.decrypt_block(&zero_ciphertext),
                    zero_plaintext,
                    "Concurrent decryption produced a wrong block"
                );
            }
        });
    });
}
