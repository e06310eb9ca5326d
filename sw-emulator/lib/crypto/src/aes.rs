/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains the AES block cipher keyed with a 128, 192 or 256 bit key.

--*/

use crate::AES_BLOCK_SIZE;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};

/// AES block cipher
#[derive(Clone)]
pub enum Aes {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl Aes {
    /// Create a new AES instance
    ///
    /// # Arguments
    ///
    /// * `key` - 16, 24 or 32 byte key
    ///
    /// # Returns
    ///
    /// * `None` if the key size is not supported
    pub fn new(key: &[u8]) -> Option<Self> {
        match key.len() {
            16 => Aes128::new_from_slice(key).ok().map(Self::Aes128),
            24 => Aes192::new_from_slice(key).ok().map(Self::Aes192),
            32 => Aes256::new_from_slice(key).ok().map(Self::Aes256),
            _ => None,
        }
    }

    /// Encrypt a block in place
    pub fn encrypt_block(&self, block: &mut [u8; AES_BLOCK_SIZE]) {
        match self {
            Self::Aes128(c) => c.encrypt_block(block.into()),
            Self::Aes192(c) => c.encrypt_block(block.into()),
            Self::Aes256(c) => c.encrypt_block(block.into()),
        }
    }

    /// Decrypt a block in place
    pub fn decrypt_block(&self, block: &mut [u8; AES_BLOCK_SIZE]) {
        match self {
            Self::Aes128(c) => c.decrypt_block(block.into()),
            Self::Aes192(c) => c.decrypt_block(block.into()),
            Self::Aes256(c) => c.decrypt_block(block.into()),
        }
    }

    /// Encrypt a copy of `block` and return it
    pub fn encrypted(&self, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        let mut out = *block;
        self.encrypt_block(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // FIPS-197 appendix C
    #[test]
    fn test_fips197_vectors() {
        let pt: [u8; 16] = hex::decode("00112233445566778899aabbccddeeff")
            .unwrap()
            .try_into()
            .unwrap();
        let key = hex::decode("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f")
            .unwrap();

        let cases = [
            (16, "69c4e0d86a7b0430d8cdb78070b4c55a"),
            (24, "dda97ca4864cdfe06eaf70a0ec0d7191"),
            (32, "8ea2b7ca516745bfeafc49904b496089"),
        ];
        for (key_len, expected) in cases {
            let aes = Aes::new(&key[..key_len]).unwrap();
            let mut block = pt;
            aes.encrypt_block(&mut block);
            assert_eq!(hex::encode(block), expected);
            aes.decrypt_block(&mut block);
            assert_eq!(block, pt);
        }
    }

    #[test]
    fn test_invalid_key_size() {
        assert!(Aes::new(&[0u8; 15]).is_none());
        assert!(Aes::new(&[0u8; 33]).is_none());
        assert!(Aes::new(&[]).is_none());
    }
}
