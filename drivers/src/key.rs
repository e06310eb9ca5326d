/*++

Licensed under the Apache-2.0 license.

File Name:

    key.rs

Abstract:

    File contains the key material handed to the drivers by the caller
    and the wiped copy an operation context keeps.

--*/

use crate::{AesflowError, AesflowResult};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Largest AES key in bytes
pub const AES_MAX_KEY_SIZE: usize = 32;

/// Declared key kind
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyKind {
    Aes128,
    Aes192,
    Aes256,

    /// Symmetric key of any length, used by HMAC
    Generic,
}

impl KeyKind {
    /// Key size in bytes for AES kinds
    pub fn aes_size(self) -> Option<usize> {
        match self {
            KeyKind::Aes128 => Some(16),
            KeyKind::Aes192 => Some(24),
            KeyKind::Aes256 => Some(32),
            KeyKind::Generic => None,
        }
    }
}

/// Caller owned key bytes with their declared kind
#[derive(Debug, Copy, Clone)]
pub struct KeyMaterial<'a> {
    kind: KeyKind,
    bytes: &'a [u8],
}

impl<'a> KeyMaterial<'a> {
    /// Key of a declared kind. AES kinds must carry the matching number of
    /// bytes.
    pub fn new(kind: KeyKind, bytes: &'a [u8]) -> AesflowResult<Self> {
        if let Some(size) = kind.aes_size() {
            if bytes.len() != size {
                Err(AesflowError::DRIVER_AES_INVALID_KEY_SIZE)?;
            }
        }
        Ok(Self { kind, bytes })
    }

    /// AES key whose kind follows from its length
    pub fn aes(bytes: &'a [u8]) -> AesflowResult<Self> {
        let kind = match bytes.len() {
            16 => KeyKind::Aes128,
            24 => KeyKind::Aes192,
            32 => KeyKind::Aes256,
            _ => Err(AesflowError::DRIVER_AES_INVALID_KEY_SIZE)?,
        };
        Ok(Self { kind, bytes })
    }

    pub fn generic(bytes: &'a [u8]) -> Self {
        Self {
            kind: KeyKind::Generic,
            bytes,
        }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn is_aes(&self) -> bool {
        self.kind.aes_size().is_some()
    }
}

/// AES key copied into an operation context. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyBuf {
    bytes: [u8; AES_MAX_KEY_SIZE],
    len: usize,
}

impl Default for KeyBuf {
    fn default() -> Self {
        Self {
            bytes: [0; AES_MAX_KEY_SIZE],
            len: 0,
        }
    }
}

impl KeyBuf {
    /// Copy an AES key. Generic keys are rejected.
    pub fn from_aes(key: &KeyMaterial) -> AesflowResult<Self> {
        let size = key
            .kind()
            .aes_size()
            .ok_or(AesflowError::DRIVER_AES_INVALID_KEY_SIZE)?;
        let mut buf = Self::default();
        buf.bytes
            .get_mut(..size)
            .ok_or(AesflowError::DRIVER_AES_INVALID_KEY_SIZE)?
            .copy_from_slice(key.bytes());
        buf.len = size;
        Ok(buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Wipe the copy
    pub fn clear(&mut self) {
        self.zeroize();
    }
}
