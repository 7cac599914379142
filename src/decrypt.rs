//! RIPEMD-128-keyed byte-rotation decryptor used on keyword-index blocks
//! when the header's `Encrypted` bit 1 is set.

use ripemd::{Digest, Ripemd128};

/// The constant appended to the 4 checksum bytes to derive the 8-byte
/// passkey before hashing: `95 36 00 00`.
const PASSKEY_SUFFIX: [u8; 4] = [0x95, 0x36, 0x00, 0x00];

pub struct Decryptor {
    key: [u8; 16],
}

impl Decryptor {
    /// Derives the 16-byte RIPEMD-128 key from the block's 4-byte
    /// checksum field.
    pub fn from_checksum(checksum_bytes: &[u8; 4]) -> Self {
        let mut passkey = Vec::with_capacity(8);
        passkey.extend_from_slice(checksum_bytes);
        passkey.extend_from_slice(&PASSKEY_SUFFIX);

        let mut hasher = Ripemd128::new();
        hasher.update(&passkey);
        let digest = hasher.finalize();

        let mut key = [0u8; 16];
        key.copy_from_slice(&digest);
        Decryptor { key }
    }

    /// Reverses the nibble-swap/XOR cipher in place. The transform is
    /// its own inverse's mirror image: decrypting an
    /// encrypted buffer and encrypting a plaintext buffer run the same
    /// steps, only the intermediate `prev` state differs in meaning.
    pub fn decrypt(&self, data: &mut [u8]) {
        let mut prev: u8 = 0x36;
        for (i, byte) in data.iter_mut().enumerate() {
            let original = *byte;
            let swapped = (original >> 4) | (original << 4);
            let out = swapped ^ prev ^ (i as u8) ^ self.key[i % 16];
            prev = original;
            *byte = out;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Exposes the derived key for a checksum, so other modules' tests
    /// can build encrypted fixtures without duplicating the RIPEMD-128
    /// derivation.
    pub(crate) fn derive_key_for_test(checksum: &[u8; 4]) -> [u8; 16] {
        Decryptor::from_checksum(checksum).key
    }

    /// Inverse of `Decryptor::decrypt`, used only to build encrypted
    /// fixtures for tests (the crate itself never needs to encrypt).
    pub(crate) fn test_encrypt(data: &[u8], key: &[u8; 16]) -> Vec<u8> {
        let mut prev: u8 = 0x36;
        let mut out = Vec::with_capacity(data.len());
        for (i, &plain) in data.iter().enumerate() {
            let c = (plain ^ prev ^ (i as u8) ^ key[i % 16]).rotate_left(4);
            prev = c;
            out.push(c);
        }
        out
    }

    #[test]
    fn decrypt_is_deterministic_and_keyed() {
        let checksum = [1u8, 2, 3, 4];
        let dec = Decryptor::from_checksum(&checksum);
        let mut data = vec![0xAAu8, 0xBB, 0xCC, 0xDD, 0xEE];
        let original = data.clone();
        dec.decrypt(&mut data);
        assert_ne!(data, original);

        let checksum2 = [4u8, 3, 2, 1];
        let dec2 = Decryptor::from_checksum(&checksum2);
        let mut data2 = original.clone();
        dec2.decrypt(&mut data2);
        assert_ne!(data, data2);
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let checksum = [9u8, 8, 7, 6];
        let dec = Decryptor::from_checksum(&checksum);
        let plain = b"the quick brown fox jumps".to_vec();
        let mut cipher = test_encrypt(&plain, &dec.key);
        dec.decrypt(&mut cipher);
        assert_eq!(cipher, plain);
    }
}
