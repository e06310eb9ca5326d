/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the library for error handling

--*/
#![cfg_attr(not(any(feature = "std", test)), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Aesflow Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AesflowError(pub NonZeroU32);

/// Error class an error code belongs to.
///
/// Encoded in bits 8..16 of every error code.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Bad length, key size, or algorithm combination. Detected before the
    /// engine is touched.
    InvalidArgument,

    /// Call issued out of the required sequence.
    BadState,

    /// Caller-provided output or tag buffer is too short.
    BufferTooSmall,

    /// The engine reported an unexpected status.
    HardwareFailure,

    /// Tag mismatch.
    AuthenticationFailed,
}

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: AesflowError = AesflowError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl AesflowError {
    /// Create an aesflow error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get an AesflowError from a u32 is to
    /// use `AesflowError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("AesflowError cannot be 0"),
        }
    }

    /// Error class of this code.
    ///
    /// Codes that carry no known class are reported as hardware failures.
    pub fn kind(self) -> ErrorKind {
        match (self.0.get() >> 8) & 0xff {
            0x01 => ErrorKind::InvalidArgument,
            0x02 => ErrorKind::BadState,
            0x03 => ErrorKind::BufferTooSmall,
            0x05 => ErrorKind::AuthenticationFailed,
            _ => ErrorKind::HardwareFailure,
        }
    }

    // Codes are laid out as 0xCCCC_KKDD: component, kind, detail.
    define_error_constants![
        (
            DRIVER_AES_INVALID_KEY_SIZE,
            0x0001_0101,
            "AES key is not 16, 24 or 32 bytes or does not match its declared kind"
        ),
        (
            DRIVER_AES_INVALID_LENGTH,
            0x0001_0102,
            "AES ECB/CBC data is not a positive multiple of the block size"
        ),
        (
            DRIVER_AES_INVALID_SLICE,
            0x0001_0301,
            "AES output buffer is shorter than the transfer"
        ),
        (
            DRIVER_AES_ENGINE_TIMEOUT,
            0x0001_0401,
            "AES engine did not become ready"
        ),
        (
            DRIVER_AES_ENGINE_FAULT,
            0x0001_0402,
            "AES engine reported a fault"
        ),
        (
            DRIVER_ENGINE_BUSY,
            0x0001_0403,
            "Engine lock could not be acquired"
        ),
        (
            DRIVER_AES_AUTH_FAILED,
            0x0001_0501,
            "AES engine reported an authentication error"
        ),
        (
            DRIVER_AEAD_INVALID_STATE,
            0x0002_0201,
            "AEAD operation used before setup"
        ),
        (
            DRIVER_CCM_INVALID_NONCE_SIZE,
            0x0003_0101,
            "CCM nonce is not 7 to 13 bytes"
        ),
        (
            DRIVER_CCM_INVALID_TAG_SIZE,
            0x0003_0102,
            "CCM tag is not 0, 4, 8 or 16 bytes"
        ),
        (
            DRIVER_CCM_INVALID_DATA_LENGTH,
            0x0003_0103,
            "CCM payload or AAD length is out of range or differs from the declared length"
        ),
        (
            DRIVER_CCM_INVALID_STATE,
            0x0003_0201,
            "CCM operation called out of sequence"
        ),
        (
            DRIVER_CCM_BUFFER_TOO_SMALL,
            0x0003_0301,
            "CCM output or tag buffer too small"
        ),
        (
            DRIVER_CCM_AUTH_FAILED,
            0x0003_0501,
            "CCM tag mismatch"
        ),
        (
            DRIVER_GCM_INVALID_NONCE_SIZE,
            0x0004_0101,
            "GCM nonce is empty"
        ),
        (
            DRIVER_GCM_INVALID_TAG_SIZE,
            0x0004_0102,
            "GCM tag is not 4 to 16 bytes"
        ),
        (
            DRIVER_GCM_INVALID_DATA_LENGTH,
            0x0004_0103,
            "GCM AAD or payload length differs from the declared length"
        ),
        (
            DRIVER_GCM_INVALID_STATE,
            0x0004_0201,
            "GCM operation called out of sequence"
        ),
        (
            DRIVER_GCM_BUFFER_TOO_SMALL,
            0x0004_0301,
            "GCM output or tag buffer too small"
        ),
        (
            DRIVER_GCM_AUTH_FAILED,
            0x0004_0501,
            "GCM tag mismatch"
        ),
        (
            DRIVER_CIPHER_INVALID_IV_SIZE,
            0x0005_0101,
            "Cipher IV has the wrong size or is not accepted by the mode"
        ),
        (
            DRIVER_CIPHER_INVALID_DATA_LENGTH,
            0x0005_0102,
            "Cipher data length is not a multiple of the block size"
        ),
        (
            DRIVER_CIPHER_INVALID_PADDING,
            0x0005_0103,
            "Cipher PKCS#7 padding of the final block is malformed"
        ),
        (
            DRIVER_CIPHER_INVALID_STATE,
            0x0005_0201,
            "Cipher operation called out of sequence"
        ),
        (
            DRIVER_CIPHER_BUFFER_TOO_SMALL,
            0x0005_0301,
            "Cipher output buffer too small"
        ),
        (
            DRIVER_MAC_INVALID_KEY_SIZE,
            0x0006_0101,
            "MAC key has the wrong size for the algorithm"
        ),
        (
            DRIVER_MAC_INVALID_TAG_SIZE,
            0x0006_0102,
            "MAC tag length is out of range for the algorithm"
        ),
        (
            DRIVER_MAC_INVALID_STATE,
            0x0006_0201,
            "MAC operation called out of sequence"
        ),
        (
            DRIVER_MAC_INVALID_DATA_LENGTH,
            0x0006_0202,
            "CBC-MAC input is not a positive multiple of the block size"
        ),
        (
            DRIVER_MAC_BUFFER_TOO_SMALL,
            0x0006_0301,
            "MAC tag buffer too small"
        ),
        (
            DRIVER_MAC_VERIFY_FAILED,
            0x0006_0501,
            "MAC tag mismatch"
        ),
        (
            DRIVER_SHA256_MAX_DATA,
            0x0007_0101,
            "SHA256 max data exceeded"
        ),
        (
            DRIVER_SHA256_INVALID_STATE,
            0x0007_0201,
            "SHA256 invalid state"
        ),
        (
            DRIVER_SHA256_BUFFER_TOO_SMALL,
            0x0007_0301,
            "SHA256 digest buffer too small"
        ),
        (
            DRIVER_SHA256_ENGINE_TIMEOUT,
            0x0007_0401,
            "SHA256 engine did not become ready"
        ),
        (
            DRIVER_SHA256_ENGINE_FAULT,
            0x0007_0402,
            "SHA256 engine reported a fault"
        ),
        (
            KAT_AES_GCM_CIPHERTEXT_MISMATCH,
            0x0008_0401,
            "KAT Error: AES-GCM ciphertext mismatch"
        ),
        (
            KAT_AES_GCM_TAG_MISMATCH,
            0x0008_0402,
            "KAT Error: AES-GCM tag mismatch"
        ),
        (
            KAT_AES_GCM_PLAINTEXT_MISMATCH,
            0x0008_0403,
            "KAT Error: AES-GCM plaintext mismatch"
        ),
        (
            KAT_AES_CCM_CIPHERTEXT_MISMATCH,
            0x0008_0404,
            "KAT Error: AES-CCM ciphertext mismatch"
        ),
        (
            KAT_AES_CCM_TAG_MISMATCH,
            0x0008_0405,
            "KAT Error: AES-CCM tag mismatch"
        ),
        (
            KAT_AES_CCM_PLAINTEXT_MISMATCH,
            0x0008_0406,
            "KAT Error: AES-CCM plaintext mismatch"
        ),
        (
            KAT_AES_CMAC_TAG_MISMATCH,
            0x0008_0407,
            "KAT Error: AES-CMAC tag mismatch"
        ),
        (
            KAT_HMAC_SHA256_TAG_MISMATCH,
            0x0008_0408,
            "KAT Error: HMAC-SHA256 tag mismatch"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::AesflowError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::AesflowError(val)
    }
}

impl From<AesflowError> for core::num::NonZeroU32 {
    fn from(val: AesflowError) -> Self {
        val.0
    }
}

impl From<AesflowError> for u32 {
    fn from(val: AesflowError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for AesflowError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(AesflowError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type AesflowResult<T> = Result<T, AesflowError>;
