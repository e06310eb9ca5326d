/*++

Licensed under the Apache-2.0 license.

File Name:

    ccm.rs

Abstract:

    File contains AES-CCM: a one-shot request streamed through the engine
    in a single pass, and a multipart operation built from CBC-MAC and the
    counter mode cursor.

--*/

use crate::aes::{Aes, AES_BLOCK_SIZE_BYTES};
use crate::ctr::{ctr_crypt, AesCtrCursor};
use crate::engine::{AesEngine, AesOperation, EngineLock};
use crate::key::{KeyBuf, KeyMaterial};
use crate::mac::CbcMac;
use crate::{cprintln, AesflowError, AesflowResult};
use subtle::ConstantTimeEq;

pub const CCM_MIN_NONCE_SIZE: usize = 7;
pub const CCM_MAX_NONCE_SIZE: usize = 13;
pub const CCM_MAX_TAG_SIZE: usize = 16;

/// Tag lengths the engine produces
fn check_tag_len(tag_len: usize) -> AesflowResult<()> {
    match tag_len {
        0 | 4 | 8 | 16 => Ok(()),
        _ => Err(AesflowError::DRIVER_CCM_INVALID_TAG_SIZE),
    }
}

fn check_nonce_len(nonce_len: usize) -> AesflowResult<()> {
    if !(CCM_MIN_NONCE_SIZE..=CCM_MAX_NONCE_SIZE).contains(&nonce_len) {
        Err(AesflowError::DRIVER_CCM_INVALID_NONCE_SIZE)?;
    }
    Ok(())
}

/// Counter block `flags(L - 1) || nonce || counter`, `L = 15 - nonce.len()`
fn counter_block(nonce: &[u8], counter: u8) -> [u8; AES_BLOCK_SIZE_BYTES] {
    let l = AES_BLOCK_SIZE_BYTES - 1 - nonce.len();
    let mut block = [0u8; AES_BLOCK_SIZE_BYTES];
    block[0] = (l - 1) as u8;
    block[1..1 + nonce.len()].copy_from_slice(nonce);
    block[AES_BLOCK_SIZE_BYTES - 1] = counter;
    block
}

/// Payload length must fit in the `L` byte length field
fn check_payload_len(nonce_len: usize, payload_len: u64) -> AesflowResult<()> {
    let l = AES_BLOCK_SIZE_BYTES - 1 - nonce_len;
    if l < 8 && payload_len >> (8 * l) != 0 {
        Err(AesflowError::DRIVER_CCM_INVALID_DATA_LENGTH)?;
    }
    Ok(())
}

/// Validated one-shot CCM request
struct CcmRequest {
    a0: [u8; AES_BLOCK_SIZE_BYTES],
    tag_len: usize,
}

impl CcmRequest {
    fn prepare(nonce: &[u8], tag_len: usize, aad_len: usize, payload_len: usize) -> AesflowResult<Self> {
        check_nonce_len(nonce.len())?;
        check_tag_len(tag_len)?;
        check_payload_len(nonce.len(), payload_len as u64)?;
        if u32::try_from(aad_len).is_err() || u32::try_from(payload_len).is_err() {
            Err(AesflowError::DRIVER_CCM_INVALID_DATA_LENGTH)?;
        }
        Ok(Self {
            a0: counter_block(nonce, 0),
            tag_len,
        })
    }
}

fn engine_error(err: AesflowError) -> AesflowError {
    if err == AesflowError::DRIVER_AES_AUTH_FAILED {
        AesflowError::DRIVER_CCM_AUTH_FAILED
    } else {
        err
    }
}

/// Encrypt and authenticate in one engine pass.
///
/// # Arguments
///
/// * `tag` - Receives a tag of `tag.len()` bytes: 0, 4, 8 or 16
pub fn aes_ccm_encrypt<E: AesEngine, L: EngineLock>(
    aes: &mut Aes<E, L>,
    key: &KeyMaterial,
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
    ciphertext: &mut [u8],
    tag: &mut [u8],
) -> AesflowResult<()> {
    let request = CcmRequest::prepare(nonce, tag.len(), aad.len(), plaintext.len())?;
    let key = KeyBuf::from_aes(key)?;
    if ciphertext.len() < plaintext.len() {
        Err(AesflowError::DRIVER_CCM_BUFFER_TOO_SMALL)?;
    }
    aes.ccm_encrypt(
        key.as_bytes(),
        &request.a0,
        aad,
        plaintext,
        ciphertext,
        &mut tag[..request.tag_len],
    )
}

/// Decrypt and check the tag in one engine pass.
///
/// On `DRIVER_CCM_AUTH_FAILED` the engine stops early; plaintext already
/// written must not be used.
pub fn aes_ccm_decrypt<E: AesEngine, L: EngineLock>(
    aes: &mut Aes<E, L>,
    key: &KeyMaterial,
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    plaintext: &mut [u8],
) -> AesflowResult<()> {
    let request = CcmRequest::prepare(nonce, tag.len(), aad.len(), ciphertext.len())?;
    let key = KeyBuf::from_aes(key)?;
    if plaintext.len() < ciphertext.len() {
        Err(AesflowError::DRIVER_CCM_BUFFER_TOO_SMALL)?;
    }
    aes.ccm_decrypt(
        key.as_bytes(),
        &request.a0,
        aad,
        ciphertext,
        tag,
        plaintext,
    )
    .map_err(|err| {
        if err == AesflowError::DRIVER_AES_AUTH_FAILED {
            cprintln!("[ccm] Tag mismatch");
        }
        engine_error(err)
    })
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
enum CcmState {
    #[default]
    Inactive,
    New,
    Aad,
    Payload,
}

/// Multipart CCM.
///
/// Nonce and lengths must both be set before any data flows.
#[derive(Clone, Default)]
pub struct AesCcmOperation {
    state: CcmState,
    op: Option<AesOperation>,
    key: KeyBuf,
    tag_len: usize,

    nonce: [u8; CCM_MAX_NONCE_SIZE],
    nonce_len: usize,

    /// Declared AAD and payload lengths
    lengths: Option<(u64, u64)>,

    mac: CbcMac,
    cursor: AesCtrCursor,
    aad_done: u64,
    payload_done: u64,
}

impl AesCcmOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encrypt_setup(&mut self, key: &KeyMaterial, tag_len: usize) -> AesflowResult<()> {
        self.setup(key, tag_len, AesOperation::Encrypt)
    }

    pub fn decrypt_setup(&mut self, key: &KeyMaterial, tag_len: usize) -> AesflowResult<()> {
        self.setup(key, tag_len, AesOperation::Decrypt)
    }

    fn setup(&mut self, key: &KeyMaterial, tag_len: usize, op: AesOperation) -> AesflowResult<()> {
        if self.state != CcmState::Inactive {
            Err(AesflowError::DRIVER_CCM_INVALID_STATE)?;
        }
        check_tag_len(tag_len)?;
        *self = Self {
            state: CcmState::New,
            op: Some(op),
            key: KeyBuf::from_aes(key)?,
            tag_len,
            ..Self::default()
        };
        Ok(())
    }

    pub fn set_nonce(&mut self, nonce: &[u8]) -> AesflowResult<()> {
        if self.state != CcmState::New || self.nonce_len != 0 {
            Err(AesflowError::DRIVER_CCM_INVALID_STATE)?;
        }
        check_nonce_len(nonce.len())?;
        if let Some((_, payload_len)) = self.lengths {
            check_payload_len(nonce.len(), payload_len)?;
        }
        self.nonce[..nonce.len()].copy_from_slice(nonce);
        self.nonce_len = nonce.len();
        Ok(())
    }

    pub fn set_lengths(&mut self, aad_len: u64, payload_len: u64) -> AesflowResult<()> {
        if self.state != CcmState::New || self.lengths.is_some() {
            Err(AesflowError::DRIVER_CCM_INVALID_STATE)?;
        }
        if self.nonce_len != 0 {
            check_payload_len(self.nonce_len, payload_len)?;
        }
        self.lengths = Some((aad_len, payload_len));
        Ok(())
    }

    fn nonce(&self) -> &[u8] {
        &self.nonce[..self.nonce_len]
    }

    /// Build B0 and the length-prefixed AAD header on the first byte
    fn start<E: AesEngine, L: EngineLock>(&mut self, aes: &mut Aes<E, L>) -> AesflowResult<()> {
        let Some((aad_len, payload_len)) = self.lengths else {
            return Err(AesflowError::DRIVER_CCM_INVALID_STATE);
        };
        if self.nonce_len == 0 {
            Err(AesflowError::DRIVER_CCM_INVALID_STATE)?;
        }

        let l = AES_BLOCK_SIZE_BYTES - 1 - self.nonce_len;
        let mut b0 = counter_block(self.nonce(), 0);
        if aad_len > 0 {
            b0[0] |= 0x40;
        }
        if self.tag_len > 0 {
            b0[0] |= (((self.tag_len - 2) / 2) as u8) << 3;
        }
        let len_bytes = payload_len.to_be_bytes();
        let n = l.min(len_bytes.len());
        b0[AES_BLOCK_SIZE_BYTES - n..].copy_from_slice(&len_bytes[len_bytes.len() - n..]);

        let mut header = [0u8; 10];
        let header_len = if aad_len == 0 {
            0
        } else if aad_len < 0xff00 {
            header[..2].copy_from_slice(&(aad_len as u16).to_be_bytes());
            2
        } else if let Ok(len) = u32::try_from(aad_len) {
            header[..2].copy_from_slice(&[0xff, 0xfe]);
            header[2..6].copy_from_slice(&len.to_be_bytes());
            6
        } else {
            header[..2].copy_from_slice(&[0xff, 0xff]);
            header[2..10].copy_from_slice(&aad_len.to_be_bytes());
            10
        };

        self.mac = CbcMac::default();
        let key = self.key.as_bytes();
        self.mac.update(aes, key, &b0)?;
        self.mac.update(aes, key, &header[..header_len])?;
        self.cursor = AesCtrCursor::new(counter_block(self.nonce(), 1));
        self.state = CcmState::Aad;
        if aad_len == 0 {
            self.state = CcmState::Payload;
        }
        Ok(())
    }

    /// Absorb associated data
    pub fn update_ad<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        aad: &[u8],
    ) -> AesflowResult<()> {
        if self.state == CcmState::New {
            self.run(aes, |op, aes| op.start(aes))?;
        }
        match self.state {
            CcmState::Aad => (),
            CcmState::Payload if self.payload_done == 0 => {
                if aad.is_empty() {
                    return Ok(());
                }
                Err(AesflowError::DRIVER_CCM_INVALID_DATA_LENGTH)?
            }
            _ => Err(AesflowError::DRIVER_CCM_INVALID_STATE)?,
        }
        let (aad_len, _) = self.lengths.unwrap_or_default();
        if self.aad_done + aad.len() as u64 > aad_len {
            Err(AesflowError::DRIVER_CCM_INVALID_DATA_LENGTH)?;
        }

        self.run(aes, |op, aes| {
            op.mac.update(aes, op.key.as_bytes(), aad)?;
            op.aad_done += aad.len() as u64;
            if op.aad_done == aad_len {
                op.mac.pad(aes, op.key.as_bytes())?;
                op.state = CcmState::Payload;
            }
            Ok(())
        })
    }

    /// Encrypt or decrypt the next payload chunk. Output length equals input
    /// length.
    pub fn update<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        input: &[u8],
        output: &mut [u8],
    ) -> AesflowResult<usize> {
        if self.state == CcmState::New {
            self.run(aes, |op, aes| op.start(aes))?;
        }
        match self.state {
            CcmState::Payload => (),
            CcmState::Aad => Err(AesflowError::DRIVER_CCM_INVALID_DATA_LENGTH)?,
            _ => Err(AesflowError::DRIVER_CCM_INVALID_STATE)?,
        }
        let (_, payload_len) = self.lengths.unwrap_or_default();
        if self.payload_done + input.len() as u64 > payload_len {
            Err(AesflowError::DRIVER_CCM_INVALID_DATA_LENGTH)?;
        }
        let output = output
            .get_mut(..input.len())
            .ok_or(AesflowError::DRIVER_CCM_BUFFER_TOO_SMALL)?;

        self.run(aes, |op, aes| {
            let key = op.key.as_bytes();
            if op.op == Some(AesOperation::Encrypt) {
                op.mac.update(aes, key, input)?;
                ctr_crypt(aes, key, &mut op.cursor, input, output)?;
            } else {
                ctr_crypt(aes, key, &mut op.cursor, input, output)?;
                op.mac.update(aes, key, output)?;
            }
            op.payload_done += input.len() as u64;
            Ok(())
        })?;
        Ok(input.len())
    }

    /// Finish encryption and write the tag. Returns the tag length.
    pub fn finish<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        tag: &mut [u8],
    ) -> AesflowResult<usize> {
        if self.op != Some(AesOperation::Encrypt) {
            Err(AesflowError::DRIVER_CCM_INVALID_STATE)?;
        }
        let tag = tag
            .get_mut(..self.tag_len)
            .ok_or(AesflowError::DRIVER_CCM_BUFFER_TOO_SMALL)?;
        let computed = self.compute_tag(aes)?;
        tag.copy_from_slice(&computed[..tag.len()]);
        Ok(tag.len())
    }

    /// Finish decryption and check `tag` in constant time
    pub fn verify<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        tag: &[u8],
    ) -> AesflowResult<()> {
        if self.op != Some(AesOperation::Decrypt) {
            Err(AesflowError::DRIVER_CCM_INVALID_STATE)?;
        }
        let tag_len = self.tag_len;
        let computed = self.compute_tag(aes)?;
        if tag.len() != tag_len || !bool::from(computed[..tag_len].ct_eq(tag)) {
            cprintln!("[ccm] Tag mismatch");
            Err(AesflowError::DRIVER_CCM_AUTH_FAILED)?;
        }
        Ok(())
    }

    /// Drop all state and wipe the key copy
    pub fn abort(&mut self) {
        *self = Self::default();
    }

    fn compute_tag<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
    ) -> AesflowResult<[u8; CCM_MAX_TAG_SIZE]> {
        if self.state == CcmState::New {
            self.run(aes, |op, aes| op.start(aes))?;
        }
        if self.state == CcmState::Inactive {
            Err(AesflowError::DRIVER_CCM_INVALID_STATE)?;
        }
        let (aad_len, payload_len) = self.lengths.unwrap_or_default();
        if self.aad_done != aad_len || self.payload_done != payload_len {
            self.abort();
            Err(AesflowError::DRIVER_CCM_INVALID_DATA_LENGTH)?;
        }

        let result = self.masked_tag(aes);
        self.abort();
        result
    }

    /// `CBC-MAC ^ E(K, A0)`
    fn masked_tag<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
    ) -> AesflowResult<[u8; CCM_MAX_TAG_SIZE]> {
        let key = self.key.as_bytes();
        self.mac.pad(aes, key)?;
        let a0 = counter_block(&self.nonce[..self.nonce_len], 0);
        let mask = aes.ecb_encrypt_block(key, &a0)?;
        let mut tag = self.mac.mac();
        for (t, m) in tag.iter_mut().zip(mask.iter()) {
            *t ^= m;
        }
        Ok(tag)
    }

    /// Run `f` and abort the operation if it fails
    fn run<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        f: impl FnOnce(&mut Self, &mut Aes<E, L>) -> AesflowResult<()>,
    ) -> AesflowResult<()> {
        let result = f(self, aes).map_err(engine_error);
        if result.is_err() {
            self.abort();
        }
        result
    }
}

/// Ciphertext length of a CCM encryption
pub fn ccm_encrypt_output_size(plaintext_len: usize) -> usize {
    plaintext_len
}
