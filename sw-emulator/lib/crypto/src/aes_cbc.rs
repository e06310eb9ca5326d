/*++

Licensed under the Apache-2.0 license.

File Name:

    aes_cbc.rs

Abstract:

    File contains streaming AES-CBC for 128, 192 and 256 bit keys.

--*/

use crate::AES_BLOCK_SIZE;
use aes::{Aes128, Aes192, Aes256};
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

/// Streaming AES-CBC. The chaining value is carried across `crypt_block` calls.
pub enum AesCbc {
    Encrypt128(cbc::Encryptor<Aes128>),
    Encrypt192(cbc::Encryptor<Aes192>),
    Encrypt256(cbc::Encryptor<Aes256>),
    Decrypt128(cbc::Decryptor<Aes128>),
    Decrypt192(cbc::Decryptor<Aes192>),
    Decrypt256(cbc::Decryptor<Aes256>),
}

impl AesCbc {
    /// Create a new CBC cryptor
    ///
    /// # Arguments
    ///
    /// * `key` - 16, 24 or 32 byte key
    /// * `iv` - Initial chaining value
    /// * `encrypt` - Direction
    pub fn new(key: &[u8], iv: &[u8; AES_BLOCK_SIZE], encrypt: bool) -> Option<Self> {
        let cryptor = match (key.len(), encrypt) {
            (16, true) => Self::Encrypt128(cbc::Encryptor::new_from_slices(key, iv).ok()?),
            (24, true) => Self::Encrypt192(cbc::Encryptor::new_from_slices(key, iv).ok()?),
            (32, true) => Self::Encrypt256(cbc::Encryptor::new_from_slices(key, iv).ok()?),
            (16, false) => Self::Decrypt128(cbc::Decryptor::new_from_slices(key, iv).ok()?),
            (24, false) => Self::Decrypt192(cbc::Decryptor::new_from_slices(key, iv).ok()?),
            (32, false) => Self::Decrypt256(cbc::Decryptor::new_from_slices(key, iv).ok()?),
            _ => return None,
        };
        Some(cryptor)
    }

    /// Encrypt or decrypt a single block and return the output.
    pub fn crypt_block(&mut self, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        let mut out = *block;
        match self {
            Self::Encrypt128(c) => c.encrypt_block_mut((&mut out).into()),
            Self::Encrypt192(c) => c.encrypt_block_mut((&mut out).into()),
            Self::Encrypt256(c) => c.encrypt_block_mut((&mut out).into()),
            Self::Decrypt128(c) => c.decrypt_block_mut((&mut out).into()),
            Self::Decrypt192(c) => c.decrypt_block_mut((&mut out).into()),
            Self::Decrypt256(c) => c.decrypt_block_mut((&mut out).into()),
        }
        out
    }
}
