/*++

Licensed under the Apache-2.0 license.

File Name:

    aes_ctr.rs

Abstract:

    File contains implementation of AES CTR with a 128-bit big-endian counter

--*/

use crate::AES_BLOCK_SIZE;
use aes::{Aes128, Aes192, Aes256};
use cipher::{KeyIvInit, StreamCipherCore};

type Ctr<C> = ctr::CtrCore<C, ctr::flavors::Ctr128BE>;

pub enum AesCtr {
    Aes128(Ctr<Aes128>),
    Aes192(Ctr<Aes192>),
    Aes256(Ctr<Aes256>),
}

impl AesCtr {
    /// Create a new CTR cryptor
    ///
    /// # Arguments
    ///
    /// * `key` - 16, 24 or 32 byte key
    /// * `iv` - Initial counter block
    pub fn new(key: &[u8], iv: &[u8; AES_BLOCK_SIZE]) -> Option<Self> {
        let cryptor = match key.len() {
            16 => Self::Aes128(Ctr::new_from_slices(key, iv).ok()?),
            24 => Self::Aes192(Ctr::new_from_slices(key, iv).ok()?),
            32 => Self::Aes256(Ctr::new_from_slices(key, iv).ok()?),
            _ => return None,
        };
        Some(cryptor)
    }

    /// Streaming mode: encrypt or decrypt a single block and return the output.
    pub fn crypt_block(&mut self, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        let mut out_block = [(*block).into()];
        match self {
            Self::Aes128(c) => c.apply_keystream_blocks(&mut out_block),
            Self::Aes192(c) => c.apply_keystream_blocks(&mut out_block),
            Self::Aes256(c) => c.apply_keystream_blocks(&mut out_block),
        }
        out_block[0].into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(s: &str) -> [u8; AES_BLOCK_SIZE] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    // NIST SP 800-38A F.5.1
    #[test]
    fn test_sp800_38a_ctr_aes128() {
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let mut ctr = AesCtr::new(&key, &block("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff")).unwrap();

        assert_eq!(
            ctr.crypt_block(&block("6bc1bee22e409f96e93d7e117393172a")),
            block("874d6191b620e3261bef6864990db6ce")
        );
        assert_eq!(
            ctr.crypt_block(&block("ae2d8a571e03ac9c9eb76fac45af8e51")),
            block("9806f66b7970fdff8617187bb9fffdff")
        );
    }

    #[test]
    fn test_counter_wraps_all_128_bits() {
        let key = [0u8; 16];
        let mut wrapped = AesCtr::new(&key, &[0xff; 16]).unwrap();
        let mut zero = AesCtr::new(&key, &[0u8; 16]).unwrap();

        wrapped.crypt_block(&[0u8; 16]);
        assert_eq!(wrapped.crypt_block(&[0u8; 16]), zero.crypt_block(&[0u8; 16]));
    }
}
