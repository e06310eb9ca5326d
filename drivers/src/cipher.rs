/*++

Licensed under the Apache-2.0 license.

File Name:

    cipher.rs

Abstract:

    File contains the unauthenticated AES cipher operations: ECB and CBC
    without padding, CBC with PKCS#7 padding, CFB-128, OFB, CTR, and CCM*
    with no tag.

--*/

use crate::aes::{Aes, BlockMode, AES_BLOCK_SIZE_BYTES};
use crate::ctr::{ctr_crypt, AesCtrCursor};
use crate::engine::{AesEngine, AesOperation, EngineLock};
use crate::key::{KeyBuf, KeyMaterial};
use crate::{AesflowError, AesflowResult};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

/// Nonce length of CCM* with no tag
pub const CCM_STAR_NONCE_SIZE: usize = 13;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CipherAlgorithm {
    EcbNoPadding,
    CbcNoPadding,

    /// CBC with PKCS#7 padding; encryption always adds 1 to 16 bytes
    CbcPkcs7,

    /// 128-bit cipher feedback
    Cfb,
    Ofb,
    Ctr,

    /// CCM* encryption without authentication: counter mode starting at
    /// counter 1 of the CCM counter blocks
    CcmStarNoTag,
}

impl CipherAlgorithm {
    /// IV or nonce length the algorithm takes
    pub fn iv_len(self) -> usize {
        match self {
            CipherAlgorithm::EcbNoPadding => 0,
            CipherAlgorithm::CbcNoPadding
            | CipherAlgorithm::CbcPkcs7
            | CipherAlgorithm::Cfb
            | CipherAlgorithm::Ofb
            | CipherAlgorithm::Ctr => AES_BLOCK_SIZE_BYTES,
            CipherAlgorithm::CcmStarNoTag => CCM_STAR_NONCE_SIZE,
        }
    }

    /// Whole blocks go through the engine, the rest is staged
    fn is_block_mode(self) -> bool {
        matches!(
            self,
            CipherAlgorithm::EcbNoPadding
                | CipherAlgorithm::CbcNoPadding
                | CipherAlgorithm::CbcPkcs7
        )
    }

    /// Total input must be a multiple of the block size
    fn needs_whole_blocks(self) -> bool {
        matches!(
            self,
            CipherAlgorithm::EcbNoPadding | CipherAlgorithm::CbcNoPadding
        )
    }
}

/// Length of the message in a decrypted final PKCS#7 block, or `None` if
/// the padding is malformed. Every byte is inspected whatever the pad.
fn pkcs7_unpadded_len(block: &[u8; AES_BLOCK_SIZE_BYTES]) -> Option<usize> {
    let pad = block[AES_BLOCK_SIZE_BYTES - 1];
    let pad_len = usize::from(pad);
    let mut valid = !pad.ct_eq(&0) & Choice::from(u8::from(pad_len <= AES_BLOCK_SIZE_BYTES));
    for (idx, byte) in block.iter().enumerate() {
        let in_pad = Choice::from(u8::from(idx + pad_len >= AES_BLOCK_SIZE_BYTES));
        valid &= !in_pad | byte.ct_eq(&pad);
    }
    if bool::from(valid) {
        Some(AES_BLOCK_SIZE_BYTES - pad_len)
    } else {
        None
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
enum CipherState {
    #[default]
    Inactive,
    New,
    Active,
}

/// Multipart cipher operation
#[derive(Clone, Default)]
pub struct AesCipherOperation {
    state: CipherState,
    op: Option<AesOperation>,
    alg: Option<CipherAlgorithm>,
    key: KeyBuf,

    /// CBC chaining value, CFB and OFB feedback register
    iv: [u8; AES_BLOCK_SIZE_BYTES],
    iv_set: bool,

    /// CFB and OFB bytes of the encrypted register already used
    feedback_offset: usize,

    /// CTR and CCM* keystream position
    cursor: AesCtrCursor,

    /// ECB and CBC partial block
    staging: [u8; AES_BLOCK_SIZE_BYTES],
    staging_len: usize,
}

impl AesCipherOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encrypt_setup(&mut self, key: &KeyMaterial, alg: CipherAlgorithm) -> AesflowResult<()> {
        self.setup(key, alg, AesOperation::Encrypt)
    }

    pub fn decrypt_setup(&mut self, key: &KeyMaterial, alg: CipherAlgorithm) -> AesflowResult<()> {
        self.setup(key, alg, AesOperation::Decrypt)
    }

    fn setup(
        &mut self,
        key: &KeyMaterial,
        alg: CipherAlgorithm,
        op: AesOperation,
    ) -> AesflowResult<()> {
        if self.state != CipherState::Inactive {
            Err(AesflowError::DRIVER_CIPHER_INVALID_STATE)?;
        }
        *self = Self {
            state: CipherState::New,
            op: Some(op),
            alg: Some(alg),
            key: KeyBuf::from_aes(key)?,
            ..Self::default()
        };
        Ok(())
    }

    pub fn algorithm(&self) -> Option<CipherAlgorithm> {
        self.alg
    }

    /// Set the IV (CBC, CTR) or nonce (CCM*). ECB takes none.
    pub fn set_iv(&mut self, iv: &[u8]) -> AesflowResult<()> {
        if self.state != CipherState::New || self.iv_set {
            Err(AesflowError::DRIVER_CIPHER_INVALID_STATE)?;
        }
        let alg = self.alg.ok_or(AesflowError::DRIVER_CIPHER_INVALID_STATE)?;
        if alg.iv_len() == 0 || iv.len() != alg.iv_len() {
            Err(AesflowError::DRIVER_CIPHER_INVALID_IV_SIZE)?;
        }

        match alg {
            CipherAlgorithm::CbcNoPadding
            | CipherAlgorithm::CbcPkcs7
            | CipherAlgorithm::Cfb
            | CipherAlgorithm::Ofb => self.iv.copy_from_slice(iv),
            CipherAlgorithm::Ctr => {
                let mut block = [0u8; AES_BLOCK_SIZE_BYTES];
                block.copy_from_slice(iv);
                self.cursor = AesCtrCursor::new(block);
            }
            CipherAlgorithm::CcmStarNoTag => {
                // Flags L - 1 with L = 2, counter 1
                let mut block = [0u8; AES_BLOCK_SIZE_BYTES];
                block[0] = 1;
                block[1..=CCM_STAR_NONCE_SIZE].copy_from_slice(iv);
                block[AES_BLOCK_SIZE_BYTES - 1] = 1;
                self.cursor = AesCtrCursor::new(block);
            }
            CipherAlgorithm::EcbNoPadding => {}
        }
        self.iv_set = true;
        Ok(())
    }

    /// Bytes [`AesCipherOperation::update`] writes for `input_len` input
    /// bytes
    pub fn update_output_size(&self, input_len: usize) -> usize {
        match self.alg {
            Some(alg) if alg.is_block_mode() => {
                let available = self.staging_len + input_len;
                if self.holds_last_block() {
                    available.saturating_sub(1) / AES_BLOCK_SIZE_BYTES * AES_BLOCK_SIZE_BYTES
                } else {
                    available - available % AES_BLOCK_SIZE_BYTES
                }
            }
            _ => input_len,
        }
    }

    /// Most bytes [`AesCipherOperation::finish`] writes. PKCS#7 decryption
    /// writes at most 15; the exact count is known once the padding is read.
    pub fn finish_output_size(&self) -> usize {
        match (self.alg, self.op) {
            (Some(CipherAlgorithm::CbcPkcs7), Some(AesOperation::Encrypt)) => AES_BLOCK_SIZE_BYTES,
            (Some(CipherAlgorithm::CbcPkcs7), Some(AesOperation::Decrypt)) => {
                AES_BLOCK_SIZE_BYTES - 1
            }
            _ => 0,
        }
    }

    /// PKCS#7 decryption keeps the last full block back for `finish`
    fn holds_last_block(&self) -> bool {
        self.alg == Some(CipherAlgorithm::CbcPkcs7) && self.op == Some(AesOperation::Decrypt)
    }

    /// Process the next chunk. Returns the number of bytes written.
    pub fn update<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        input: &[u8],
        output: &mut [u8],
    ) -> AesflowResult<usize> {
        let alg = match (self.state, self.alg) {
            (CipherState::New | CipherState::Active, Some(alg)) => alg,
            _ => Err(AesflowError::DRIVER_CIPHER_INVALID_STATE)?,
        };
        if alg.iv_len() != 0 && !self.iv_set {
            Err(AesflowError::DRIVER_CIPHER_INVALID_STATE)?;
        }
        let out_len = self.update_output_size(input.len());
        let output = output
            .get_mut(..out_len)
            .ok_or(AesflowError::DRIVER_CIPHER_BUFFER_TOO_SMALL)?;

        let result = match alg {
            CipherAlgorithm::Cfb | CipherAlgorithm::Ofb => {
                self.feedback_update(aes, alg, input, output)
            }
            _ if alg.is_block_mode() => self.block_update(aes, alg, input, output),
            _ => ctr_crypt(aes, self.key.as_bytes(), &mut self.cursor, input, output),
        };
        if let Err(err) = result {
            self.abort();
            return Err(err);
        }
        self.state = CipherState::Active;
        Ok(out_len)
    }

    fn block_mode(&self, alg: CipherAlgorithm) -> AesflowResult<BlockMode> {
        let encrypt = self.op == Some(AesOperation::Encrypt);
        let mode = match (alg, encrypt) {
            (CipherAlgorithm::EcbNoPadding, true) => BlockMode::EcbEncrypt,
            (CipherAlgorithm::EcbNoPadding, false) => BlockMode::EcbDecrypt,
            (CipherAlgorithm::CbcNoPadding | CipherAlgorithm::CbcPkcs7, true) => {
                BlockMode::CbcEncrypt
            }
            (CipherAlgorithm::CbcNoPadding | CipherAlgorithm::CbcPkcs7, false) => {
                BlockMode::CbcDecrypt
            }
            _ => Err(AesflowError::DRIVER_CIPHER_INVALID_STATE)?,
        };
        Ok(mode)
    }

    /// `output` is exactly [`AesCipherOperation::update_output_size`] bytes
    fn block_update<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        alg: CipherAlgorithm,
        mut input: &[u8],
        output: &mut [u8],
    ) -> AesflowResult<()> {
        let mode = self.block_mode(alg)?;
        let key = self.key.as_bytes();
        let process = output.len();

        if process == 0 {
            let end = self.staging_len + input.len();
            self.staging[self.staging_len..end].copy_from_slice(input);
            self.staging_len = end;
            return Ok(());
        }

        // Complete the staged block
        let mut written = 0;
        if self.staging_len > 0 {
            let take = AES_BLOCK_SIZE_BYTES - self.staging_len;
            self.staging[self.staging_len..].copy_from_slice(&input[..take]);
            input = &input[take..];
            aes.transform(
                mode,
                key,
                &mut self.iv,
                &self.staging,
                &mut output[..AES_BLOCK_SIZE_BYTES],
            )?;
            self.staging_len = 0;
            written = AES_BLOCK_SIZE_BYTES;
        }

        let whole = process - written;
        if whole > 0 {
            aes.transform(mode, key, &mut self.iv, &input[..whole], &mut output[written..])?;
        }

        let rest = &input[whole..];
        self.staging[..rest.len()].copy_from_slice(rest);
        self.staging_len = rest.len();
        Ok(())
    }

    /// CFB and OFB: one block encryption of the feedback register per 16
    /// bytes, resumable at any byte offset.
    fn feedback_update<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        alg: CipherAlgorithm,
        input: &[u8],
        output: &mut [u8],
    ) -> AesflowResult<()> {
        let encrypt = self.op == Some(AesOperation::Encrypt);
        let key = self.key.as_bytes();
        for (byte_in, byte_out) in input.iter().zip(output.iter_mut()) {
            if self.feedback_offset == 0 {
                self.iv = aes.ecb_encrypt_block(key, &self.iv)?;
            }
            let register = &mut self.iv[self.feedback_offset];
            *byte_out = *byte_in ^ *register;
            if alg == CipherAlgorithm::Cfb {
                *register = if encrypt { *byte_out } else { *byte_in };
            }
            self.feedback_offset = (self.feedback_offset + 1) % AES_BLOCK_SIZE_BYTES;
        }
        Ok(())
    }

    /// Pad the staged bytes and encrypt the final block
    fn pad_final<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        output: &mut [u8],
    ) -> AesflowResult<usize> {
        let output = output
            .get_mut(..AES_BLOCK_SIZE_BYTES)
            .ok_or(AesflowError::DRIVER_CIPHER_BUFFER_TOO_SMALL)?;
        let pad = (AES_BLOCK_SIZE_BYTES - self.staging_len) as u8;
        self.staging[self.staging_len..].fill(pad);
        aes.transform(
            BlockMode::CbcEncrypt,
            self.key.as_bytes(),
            &mut self.iv,
            &self.staging,
            output,
        )?;
        Ok(AES_BLOCK_SIZE_BYTES)
    }

    /// Decrypt the held-back block and strip its padding. Nothing changes
    /// if `output` cannot take the message bytes.
    fn unpad_final<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        output: &mut [u8],
    ) -> AesflowResult<usize> {
        if self.staging_len != AES_BLOCK_SIZE_BYTES {
            Err(AesflowError::DRIVER_CIPHER_INVALID_DATA_LENGTH)?;
        }
        let mut iv = self.iv;
        let mut block = [0u8; AES_BLOCK_SIZE_BYTES];
        aes.transform(
            BlockMode::CbcDecrypt,
            self.key.as_bytes(),
            &mut iv,
            &self.staging,
            &mut block,
        )?;

        let result = match pkcs7_unpadded_len(&block) {
            Some(len) => match output.get_mut(..len) {
                Some(out) => {
                    out.copy_from_slice(&block[..len]);
                    Ok(len)
                }
                None => Err(AesflowError::DRIVER_CIPHER_BUFFER_TOO_SMALL),
            },
            None => Err(AesflowError::DRIVER_CIPHER_INVALID_PADDING),
        };
        block.zeroize();
        result
    }

    /// End the operation. Returns the number of bytes written to
    /// `output`, which only PKCS#7 padding produces.
    ///
    /// ECB and CBC without padding fail if a partial block is left. A
    /// short `output` leaves the operation active for a retry.
    pub fn finish<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        output: &mut [u8],
    ) -> AesflowResult<usize> {
        let alg = match (self.state, self.alg) {
            (CipherState::New | CipherState::Active, Some(alg)) => alg,
            _ => Err(AesflowError::DRIVER_CIPHER_INVALID_STATE)?,
        };
        let result = if alg.iv_len() != 0 && !self.iv_set {
            Err(AesflowError::DRIVER_CIPHER_INVALID_STATE)
        } else if alg == CipherAlgorithm::CbcPkcs7 {
            if self.op == Some(AesOperation::Encrypt) {
                self.pad_final(aes, output)
            } else {
                self.unpad_final(aes, output)
            }
        } else if self.staging_len != 0 {
            Err(AesflowError::DRIVER_CIPHER_INVALID_DATA_LENGTH)
        } else {
            Ok(0)
        };
        if result != Err(AesflowError::DRIVER_CIPHER_BUFFER_TOO_SMALL) {
            self.abort();
        }
        result
    }

    /// Drop all state and wipe the key copy
    pub fn abort(&mut self) {
        *self = Self::default();
    }
}

/// Output a one-shot encryption produces for `input_len` bytes
pub fn cipher_encrypt_output_size(alg: CipherAlgorithm, input_len: usize) -> usize {
    match alg {
        CipherAlgorithm::CbcPkcs7 => {
            input_len - input_len % AES_BLOCK_SIZE_BYTES + AES_BLOCK_SIZE_BYTES
        }
        _ => input_len,
    }
}

/// Output a one-shot decryption needs for `input_len` bytes. For PKCS#7
/// this is an upper bound; the call writes and returns the unpadded length.
pub fn cipher_decrypt_output_size(alg: CipherAlgorithm, input_len: usize) -> usize {
    match alg {
        CipherAlgorithm::CbcPkcs7 => input_len.saturating_sub(1),
        _ => input_len,
    }
}

fn cipher_oneshot<E: AesEngine, L: EngineLock>(
    aes: &mut Aes<E, L>,
    key: &KeyMaterial,
    alg: CipherAlgorithm,
    op: AesOperation,
    iv: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> AesflowResult<usize> {
    let unaligned = input.len() % AES_BLOCK_SIZE_BYTES != 0;
    let padded_decrypt = alg == CipherAlgorithm::CbcPkcs7 && op == AesOperation::Decrypt;
    if (alg.needs_whole_blocks() && unaligned)
        || (padded_decrypt && (unaligned || input.is_empty()))
    {
        Err(AesflowError::DRIVER_CIPHER_INVALID_DATA_LENGTH)?;
    }
    let mut operation = AesCipherOperation::new();
    operation.setup(key, alg, op)?;
    if alg.iv_len() != 0 {
        operation.set_iv(iv)?;
    } else if !iv.is_empty() {
        Err(AesflowError::DRIVER_CIPHER_INVALID_IV_SIZE)?;
    }
    let written = operation.update(aes, input, output)?;
    let tail = output
        .get_mut(written..)
        .ok_or(AesflowError::DRIVER_CIPHER_BUFFER_TOO_SMALL)?;
    let finished = operation.finish(aes, tail)?;
    Ok(written + finished)
}

/// Encrypt `input` in one call
///
/// # Arguments
///
/// * `iv` - IV or nonce; empty for ECB
/// * `output` - At least [`cipher_encrypt_output_size`] bytes
///
/// # Returns
///
/// * `usize` - Bytes written
pub fn cipher_encrypt<E: AesEngine, L: EngineLock>(
    aes: &mut Aes<E, L>,
    key: &KeyMaterial,
    alg: CipherAlgorithm,
    iv: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> AesflowResult<usize> {
    cipher_oneshot(aes, key, alg, AesOperation::Encrypt, iv, input, output)
}

/// Decrypt `input` in one call
pub fn cipher_decrypt<E: AesEngine, L: EngineLock>(
    aes: &mut Aes<E, L>,
    key: &KeyMaterial,
    alg: CipherAlgorithm,
    iv: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> AesflowResult<usize> {
    cipher_oneshot(aes, key, alg, AesOperation::Decrypt, iv, input, output)
}
