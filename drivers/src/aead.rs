/*++

Licensed under the Apache-2.0 license.

File Name:

    aead.rs

Abstract:

    File contains the AEAD entry points over GCM and CCM.

--*/

use crate::aes::Aes;
use crate::ccm::{aes_ccm_decrypt, aes_ccm_encrypt, AesCcmOperation};
use crate::engine::{AesEngine, EngineLock};
use crate::gcm::AesGcmOperation;
use crate::key::KeyMaterial;
use crate::{AesflowError, AesflowResult};
use aesflow_error::ErrorKind;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AeadAlgorithm {
    Gcm,
    Ccm,
}

impl AeadAlgorithm {
    fn buffer_too_small(self) -> AesflowError {
        match self {
            AeadAlgorithm::Gcm => AesflowError::DRIVER_GCM_BUFFER_TOO_SMALL,
            AeadAlgorithm::Ccm => AesflowError::DRIVER_CCM_BUFFER_TOO_SMALL,
        }
    }
}

/// Ciphertext length of a one-shot encryption, tag excluded
pub fn aead_encrypt_output_size(_alg: AeadAlgorithm, plaintext_len: usize) -> usize {
    plaintext_len
}

/// Plaintext length of a one-shot decryption
pub fn aead_decrypt_output_size(_alg: AeadAlgorithm, ciphertext_len: usize) -> usize {
    ciphertext_len
}

/// Encrypt and authenticate in one call. The tag length is `tag.len()`.
///
/// # Returns
///
/// * `usize` - Ciphertext bytes written
#[allow(clippy::too_many_arguments)]
pub fn aead_encrypt_tag<E: AesEngine, L: EngineLock>(
    aes: &mut Aes<E, L>,
    key: &KeyMaterial,
    alg: AeadAlgorithm,
    nonce: &[u8],
    aad: &[u8],
    input: &[u8],
    output: &mut [u8],
    tag: &mut [u8],
) -> AesflowResult<usize> {
    let output = output
        .get_mut(..aead_encrypt_output_size(alg, input.len()))
        .ok_or(alg.buffer_too_small())?;

    match alg {
        AeadAlgorithm::Ccm => aes_ccm_encrypt(aes, key, nonce, aad, input, output, tag)?,
        AeadAlgorithm::Gcm => {
            let mut op = AesGcmOperation::new();
            op.encrypt_setup(key, tag.len())?;
            op.set_nonce(aes, nonce)?;
            op.set_lengths(aad.len() as u64, input.len() as u64)?;
            op.update_ad(aes, aad)?;
            let written = op.update(aes, input, output)?;
            op.finish(aes, &mut output[written..], tag)?;
        }
    }
    Ok(input.len())
}

/// Decrypt and check the tag in one call.
///
/// On an authentication failure `output` may already hold plaintext; it
/// must be discarded.
#[allow(clippy::too_many_arguments)]
pub fn aead_decrypt_verify<E: AesEngine, L: EngineLock>(
    aes: &mut Aes<E, L>,
    key: &KeyMaterial,
    alg: AeadAlgorithm,
    nonce: &[u8],
    aad: &[u8],
    input: &[u8],
    tag: &[u8],
    output: &mut [u8],
) -> AesflowResult<usize> {
    let output = output
        .get_mut(..aead_decrypt_output_size(alg, input.len()))
        .ok_or(alg.buffer_too_small())?;

    match alg {
        AeadAlgorithm::Ccm => aes_ccm_decrypt(aes, key, nonce, aad, input, tag, output)?,
        AeadAlgorithm::Gcm => {
            let mut op = AesGcmOperation::new();
            op.decrypt_setup(key, tag.len())?;
            op.set_nonce(aes, nonce)?;
            op.set_lengths(aad.len() as u64, input.len() as u64)?;
            op.update_ad(aes, aad)?;
            let written = op.update(aes, input, output)?;
            op.verify(aes, &mut output[written..], tag)?;
        }
    }
    Ok(input.len())
}

/// Multipart AEAD over either mode
#[derive(Clone, Default)]
pub enum AeadOperation {
    #[default]
    Inactive,
    Gcm(AesGcmOperation),
    Ccm(AesCcmOperation),
}

impl AeadOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn algorithm(&self) -> Option<AeadAlgorithm> {
        match self {
            AeadOperation::Inactive => None,
            AeadOperation::Gcm(_) => Some(AeadAlgorithm::Gcm),
            AeadOperation::Ccm(_) => Some(AeadAlgorithm::Ccm),
        }
    }

    pub fn encrypt_setup(
        &mut self,
        key: &KeyMaterial,
        alg: AeadAlgorithm,
        tag_len: usize,
    ) -> AesflowResult<()> {
        self.setup(key, alg, tag_len, true)
    }

    pub fn decrypt_setup(
        &mut self,
        key: &KeyMaterial,
        alg: AeadAlgorithm,
        tag_len: usize,
    ) -> AesflowResult<()> {
        self.setup(key, alg, tag_len, false)
    }

    fn setup(
        &mut self,
        key: &KeyMaterial,
        alg: AeadAlgorithm,
        tag_len: usize,
        encrypt: bool,
    ) -> AesflowResult<()> {
        if !matches!(self, AeadOperation::Inactive) {
            Err(AesflowError::DRIVER_AEAD_INVALID_STATE)?;
        }
        *self = match alg {
            AeadAlgorithm::Gcm => {
                let mut op = AesGcmOperation::new();
                if encrypt {
                    op.encrypt_setup(key, tag_len)?;
                } else {
                    op.decrypt_setup(key, tag_len)?;
                }
                AeadOperation::Gcm(op)
            }
            AeadAlgorithm::Ccm => {
                let mut op = AesCcmOperation::new();
                if encrypt {
                    op.encrypt_setup(key, tag_len)?;
                } else {
                    op.decrypt_setup(key, tag_len)?;
                }
                AeadOperation::Ccm(op)
            }
        };
        Ok(())
    }

    pub fn set_nonce<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        nonce: &[u8],
    ) -> AesflowResult<()> {
        match self {
            AeadOperation::Gcm(op) => op.set_nonce(aes, nonce),
            AeadOperation::Ccm(op) => op.set_nonce(nonce),
            AeadOperation::Inactive => Err(AesflowError::DRIVER_AEAD_INVALID_STATE),
        }
    }

    pub fn set_lengths(&mut self, aad_len: u64, payload_len: u64) -> AesflowResult<()> {
        match self {
            AeadOperation::Gcm(op) => op.set_lengths(aad_len, payload_len),
            AeadOperation::Ccm(op) => op.set_lengths(aad_len, payload_len),
            AeadOperation::Inactive => Err(AesflowError::DRIVER_AEAD_INVALID_STATE),
        }
    }

    pub fn update_ad<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        aad: &[u8],
    ) -> AesflowResult<()> {
        match self {
            AeadOperation::Gcm(op) => op.update_ad(aes, aad),
            AeadOperation::Ccm(op) => op.update_ad(aes, aad),
            AeadOperation::Inactive => Err(AesflowError::DRIVER_AEAD_INVALID_STATE),
        }
    }

    /// Bytes [`AeadOperation::update`] writes for `input_len` input bytes
    pub fn update_output_size(&self, input_len: usize) -> usize {
        match self {
            AeadOperation::Gcm(op) => op.update_output_size(input_len),
            _ => input_len,
        }
    }

    /// Bytes [`AeadOperation::finish`] and [`AeadOperation::verify`] write
    /// besides the tag
    pub fn finish_output_size(&self) -> usize {
        match self {
            AeadOperation::Gcm(op) => op.finish_output_size(),
            _ => 0,
        }
    }

    pub fn update<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        input: &[u8],
        output: &mut [u8],
    ) -> AesflowResult<usize> {
        match self {
            AeadOperation::Gcm(op) => op.update(aes, input, output),
            AeadOperation::Ccm(op) => op.update(aes, input, output),
            AeadOperation::Inactive => Err(AesflowError::DRIVER_AEAD_INVALID_STATE),
        }
    }

    /// Finish encryption; returns the output and tag lengths
    pub fn finish<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        output: &mut [u8],
        tag: &mut [u8],
    ) -> AesflowResult<(usize, usize)> {
        let result = match self {
            AeadOperation::Gcm(op) => op.finish(aes, output, tag),
            AeadOperation::Ccm(op) => op.finish(aes, tag).map(|tag_len| (0, tag_len)),
            AeadOperation::Inactive => return Err(AesflowError::DRIVER_AEAD_INVALID_STATE),
        };
        self.settle(&result);
        result
    }

    /// Finish decryption and check the tag; returns the output length
    pub fn verify<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        output: &mut [u8],
        tag: &[u8],
    ) -> AesflowResult<usize> {
        let result = match self {
            AeadOperation::Gcm(op) => op.verify(aes, output, tag),
            AeadOperation::Ccm(op) => op.verify(aes, tag).map(|()| 0),
            AeadOperation::Inactive => return Err(AesflowError::DRIVER_AEAD_INVALID_STATE),
        };
        self.settle(&result);
        result
    }

    pub fn abort(&mut self) {
        *self = AeadOperation::Inactive;
    }

    /// End the operation unless the caller can retry with a larger buffer
    fn settle<T>(&mut self, result: &AesflowResult<T>) {
        if !matches!(result, Err(err) if err.kind() == ErrorKind::BufferTooSmall) {
            self.abort();
        }
    }
}
