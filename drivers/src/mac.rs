/*++

Licensed under the Apache-2.0 license.

File Name:

    mac.rs

Abstract:

    File contains the multipart MAC operation: CBC-MAC and CMAC over the
    AES engine, HMAC-SHA224/256 over the SHA-256 engine.

--*/

use crate::aes::{Aes, EngineSession, AES_BLOCK_SIZE_BYTES};
use crate::engine::{
    AesEngine, AesMode, AesOperation, EngineConfig, EngineLock, EnginePhase, HashEngine, HashMode,
};
use crate::key::{KeyBuf, KeyMaterial};
use crate::sha256::{Sha256, Sha256Context, SHA256_BLOCK_BYTE_SIZE, SHA256_DIGEST_BYTE_SIZE};
use crate::word_channel::Sink;
use crate::{cprintln, AesflowError, AesflowResult};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Size of the CMAC state saved between engine sessions
pub const CMAC_STATE_SIZE: usize = 36;

const HMAC_IPAD: u8 = 0x36;
const HMAC_OPAD: u8 = 0x5c;

/// Largest tag of any MAC algorithm
pub const MAC_MAX_TAG_SIZE: usize = SHA256_DIGEST_BYTE_SIZE;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MacAlgorithm {
    CbcMac,
    Cmac,
    HmacSha224,
    HmacSha256,
}

impl MacAlgorithm {
    /// Untruncated tag length
    pub fn full_tag_len(self) -> usize {
        match self {
            MacAlgorithm::CbcMac | MacAlgorithm::Cmac => AES_BLOCK_SIZE_BYTES,
            MacAlgorithm::HmacSha224 => HashMode::Sha224.digest_len(),
            MacAlgorithm::HmacSha256 => HashMode::Sha256.digest_len(),
        }
    }

    fn hash_mode(self) -> Option<HashMode> {
        match self {
            MacAlgorithm::HmacSha224 => Some(HashMode::Sha224),
            MacAlgorithm::HmacSha256 => Some(HashMode::Sha256),
            _ => None,
        }
    }
}

/// Running CBC-MAC: chaining value and a partial block
#[derive(Clone, Default, Zeroize)]
pub struct CbcMac {
    iv: [u8; AES_BLOCK_SIZE_BYTES],
    buf: [u8; AES_BLOCK_SIZE_BYTES],
    buf_len: usize,
    total: u64,
}

impl CbcMac {
    pub fn new(iv: [u8; AES_BLOCK_SIZE_BYTES]) -> Self {
        Self {
            iv,
            ..Default::default()
        }
    }

    /// Absorb `data`; whole blocks go to the engine in one CBC call.
    pub fn update<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        key: &[u8],
        data: &[u8],
    ) -> AesflowResult<()> {
        let available = self.buf_len + data.len();
        let take = available - available % AES_BLOCK_SIZE_BYTES;
        if take == 0 {
            self.buf[self.buf_len..available].copy_from_slice(data);
            self.buf_len = available;
        } else {
            let (head, rest) = data.split_at(take - self.buf_len);
            aes.cbc_mac(key, &mut self.iv, &[&self.buf[..self.buf_len], head])?;
            self.buf[..rest.len()].copy_from_slice(rest);
            self.buf_len = rest.len();
        }
        self.total += data.len() as u64;
        Ok(())
    }

    /// Zero pad and absorb a partial block
    pub fn pad<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        key: &[u8],
    ) -> AesflowResult<()> {
        if self.buf_len > 0 {
            self.buf[self.buf_len..].fill(0);
            aes.cbc_mac(key, &mut self.iv, &[&self.buf[..]])?;
            self.buf_len = 0;
        }
        Ok(())
    }

    /// Bytes absorbed so far, padding excluded
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_block_aligned(&self) -> bool {
        self.buf_len == 0
    }

    /// Current chaining value
    pub fn mac(&self) -> [u8; AES_BLOCK_SIZE_BYTES] {
        self.iv
    }
}

/// CMAC over the engine. The engine holds back the last full block, so
/// only a partial block is staged here.
#[derive(Clone, Zeroize)]
struct CmacStream {
    state: [u8; CMAC_STATE_SIZE],
    saved: bool,
    buf: [u8; AES_BLOCK_SIZE_BYTES],
    buf_len: usize,
}

impl Default for CmacStream {
    fn default() -> Self {
        Self {
            state: [0; CMAC_STATE_SIZE],
            saved: false,
            buf: [0; AES_BLOCK_SIZE_BYTES],
            buf_len: 0,
        }
    }
}

impl CmacStream {
    fn config(key: &[u8]) -> EngineConfig<'_> {
        EngineConfig::new(AesMode::Cmac, AesOperation::Encrypt, key, [0; 16])
    }

    fn update<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        key: &[u8],
        data: &[u8],
    ) -> AesflowResult<()> {
        let available = self.buf_len + data.len();
        let take = available - available % AES_BLOCK_SIZE_BYTES;
        if take == 0 {
            self.buf[self.buf_len..available].copy_from_slice(data);
            self.buf_len = available;
            return Ok(());
        }

        let (head, rest) = data.split_at(take - self.buf_len);
        let mut state = [0u8; CMAC_STATE_SIZE];
        aes.with_engine(&Self::config(key), |session| {
            Self::resume(session, self.saved, &self.state)?;
            session.transfer(EnginePhase::Text, &[&self.buf[..self.buf_len], head], &mut [])?;
            session.transfer(EnginePhase::Save, &[], &mut [Sink::Buffer(&mut state)])
        })?;
        self.state = state;
        self.saved = true;
        self.buf[..rest.len()].copy_from_slice(rest);
        self.buf_len = rest.len();
        Ok(())
    }

    fn finish<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        key: &[u8],
    ) -> AesflowResult<[u8; AES_BLOCK_SIZE_BYTES]> {
        let mut tag = [0u8; AES_BLOCK_SIZE_BYTES];
        aes.with_engine(&Self::config(key), |session| {
            Self::resume(session, self.saved, &self.state)?;
            session.transfer(
                EnginePhase::Tag,
                &[&self.buf[..self.buf_len]],
                &mut [Sink::Buffer(&mut tag)],
            )
        })?;
        Ok(tag)
    }

    fn resume<E: AesEngine>(
        session: &mut EngineSession<'_, E>,
        saved: bool,
        state: &[u8; CMAC_STATE_SIZE],
    ) -> AesflowResult<()> {
        if saved {
            session.transfer(EnginePhase::Restore, &[&state[..]], &mut [])
        } else {
            session.transfer(EnginePhase::Init, &[], &mut [])
        }
    }
}

/// HMAC by composition: inner and outer digests keyed with the pads
#[derive(Clone)]
struct Hmac {
    inner: Sha256Context,
    outer: Sha256Context,
}

impl Hmac {
    fn new<H: HashEngine, L: EngineLock>(
        sha: &mut Sha256<H, L>,
        mode: HashMode,
        key: &[u8],
    ) -> AesflowResult<Self> {
        let mut key_block = [0u8; SHA256_BLOCK_BYTE_SIZE];
        if key.len() > SHA256_BLOCK_BYTE_SIZE {
            sha.digest(mode, key, &mut key_block[..mode.digest_len()])?;
        } else {
            key_block[..key.len()].copy_from_slice(key);
        }

        let mut pad = [0u8; SHA256_BLOCK_BYTE_SIZE];
        let mut keyed = |fill: u8| -> AesflowResult<Sha256Context> {
            for (p, k) in pad.iter_mut().zip(key_block.iter()) {
                *p = k ^ fill;
            }
            let mut ctx = Sha256Context::new(mode);
            sha.update(&mut ctx, &pad)?;
            Ok(ctx)
        };
        let hmac = Self {
            inner: keyed(HMAC_IPAD)?,
            outer: keyed(HMAC_OPAD)?,
        };
        key_block.zeroize();
        pad.zeroize();
        Ok(hmac)
    }

    fn finish<H: HashEngine, L: EngineLock>(
        &mut self,
        sha: &mut Sha256<H, L>,
    ) -> AesflowResult<[u8; SHA256_DIGEST_BYTE_SIZE]> {
        let len = self.inner.digest_len();
        let mut digest = [0u8; SHA256_DIGEST_BYTE_SIZE];
        sha.finalize(&mut self.inner, &mut digest)?;
        sha.update(&mut self.outer, &digest[..len])?;
        sha.finalize(&mut self.outer, &mut digest)?;
        Ok(digest)
    }
}

#[derive(Clone, Default)]
enum MacInner {
    #[default]
    None,
    CbcMac(CbcMac),
    Cmac(CmacStream),
    Hmac(Hmac),
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
enum MacState {
    #[default]
    Inactive,
    Sign,
    Verify,
}

/// Multipart MAC computation or verification
#[derive(Clone, Default)]
pub struct MacOperation {
    state: MacState,
    alg: Option<MacAlgorithm>,
    tag_len: usize,
    key: KeyBuf,
    inner: MacInner,
}

impl MacOperation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start computing a MAC of `tag_len` bytes. HMAC keys are absorbed
    /// into the pads here.
    pub fn sign_setup<H: HashEngine, M: EngineLock>(
        &mut self,
        sha: &mut Sha256<H, M>,
        key: &KeyMaterial,
        alg: MacAlgorithm,
        tag_len: usize,
    ) -> AesflowResult<()> {
        self.setup(sha, key, alg, tag_len, MacState::Sign)
    }

    /// Start verifying a MAC of `tag_len` bytes
    pub fn verify_setup<H: HashEngine, M: EngineLock>(
        &mut self,
        sha: &mut Sha256<H, M>,
        key: &KeyMaterial,
        alg: MacAlgorithm,
        tag_len: usize,
    ) -> AesflowResult<()> {
        self.setup(sha, key, alg, tag_len, MacState::Verify)
    }

    fn setup<H: HashEngine, M: EngineLock>(
        &mut self,
        sha: &mut Sha256<H, M>,
        key: &KeyMaterial,
        alg: MacAlgorithm,
        tag_len: usize,
        state: MacState,
    ) -> AesflowResult<()> {
        if self.state != MacState::Inactive {
            Err(AesflowError::DRIVER_MAC_INVALID_STATE)?;
        }
        if tag_len == 0 || tag_len > alg.full_tag_len() {
            Err(AesflowError::DRIVER_MAC_INVALID_TAG_SIZE)?;
        }

        let (key_buf, inner) = match alg.hash_mode() {
            Some(mode) => (
                KeyBuf::default(),
                MacInner::Hmac(Hmac::new(sha, mode, key.bytes())?),
            ),
            None => {
                let key_buf =
                    KeyBuf::from_aes(key).map_err(|_| AesflowError::DRIVER_MAC_INVALID_KEY_SIZE)?;
                let inner = match alg {
                    MacAlgorithm::CbcMac => MacInner::CbcMac(CbcMac::default()),
                    _ => MacInner::Cmac(CmacStream::default()),
                };
                (key_buf, inner)
            }
        };

        *self = Self {
            state,
            alg: Some(alg),
            tag_len,
            key: key_buf,
            inner,
        };
        Ok(())
    }

    pub fn algorithm(&self) -> Option<MacAlgorithm> {
        self.alg
    }

    pub fn tag_len(&self) -> usize {
        self.tag_len
    }

    /// Absorb message bytes
    pub fn update<E: AesEngine, L: EngineLock, H: HashEngine, M: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        sha: &mut Sha256<H, M>,
        data: &[u8],
    ) -> AesflowResult<()> {
        if self.state == MacState::Inactive {
            Err(AesflowError::DRIVER_MAC_INVALID_STATE)?;
        }
        let key = self.key.as_bytes();
        let result = match &mut self.inner {
            MacInner::CbcMac(mac) => mac.update(aes, key, data),
            MacInner::Cmac(mac) => mac.update(aes, key, data),
            MacInner::Hmac(mac) => sha.update(&mut mac.inner, data),
            MacInner::None => Err(AesflowError::DRIVER_MAC_INVALID_STATE),
        };
        if result.is_err() {
            self.abort();
        }
        result
    }

    /// Produce the tag. Returns the number of bytes written.
    pub fn sign_finish<E: AesEngine, L: EngineLock, H: HashEngine, M: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        sha: &mut Sha256<H, M>,
        tag: &mut [u8],
    ) -> AesflowResult<usize> {
        if self.state != MacState::Sign {
            Err(AesflowError::DRIVER_MAC_INVALID_STATE)?;
        }
        let tag = tag
            .get_mut(..self.tag_len)
            .ok_or(AesflowError::DRIVER_MAC_BUFFER_TOO_SMALL)?;

        let result = self.compute(aes, sha);
        self.abort();
        let mac = result?;
        tag.copy_from_slice(&mac[..tag.len()]);
        Ok(tag.len())
    }

    /// Compare the computed tag with `tag` in constant time
    pub fn verify_finish<E: AesEngine, L: EngineLock, H: HashEngine, M: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        sha: &mut Sha256<H, M>,
        tag: &[u8],
    ) -> AesflowResult<()> {
        if self.state != MacState::Verify {
            Err(AesflowError::DRIVER_MAC_INVALID_STATE)?;
        }
        let tag_len = self.tag_len;
        let result = self.compute(aes, sha);
        self.abort();
        let mac = result?;

        if tag.len() != tag_len || !bool::from(mac[..tag_len].ct_eq(tag)) {
            cprintln!("[mac] Tag mismatch");
            Err(AesflowError::DRIVER_MAC_VERIFY_FAILED)?;
        }
        Ok(())
    }

    /// Drop all state and wipe the key copy
    pub fn abort(&mut self) {
        *self = Self::default();
    }

    fn compute<E: AesEngine, L: EngineLock, H: HashEngine, M: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        sha: &mut Sha256<H, M>,
    ) -> AesflowResult<[u8; MAC_MAX_TAG_SIZE]> {
        let mut out = [0u8; MAC_MAX_TAG_SIZE];
        let key = self.key.as_bytes();
        match &mut self.inner {
            MacInner::CbcMac(mac) => {
                if mac.total() == 0 || !mac.is_block_aligned() {
                    Err(AesflowError::DRIVER_MAC_INVALID_DATA_LENGTH)?;
                }
                out[..AES_BLOCK_SIZE_BYTES].copy_from_slice(&mac.mac());
            }
            MacInner::Cmac(mac) => {
                out[..AES_BLOCK_SIZE_BYTES].copy_from_slice(&mac.finish(aes, key)?);
            }
            MacInner::Hmac(mac) => out = mac.finish(sha)?,
            MacInner::None => Err(AesflowError::DRIVER_MAC_INVALID_STATE)?,
        }
        Ok(out)
    }
}

/// Output size of [`mac_compute`]
pub fn mac_output_size(alg: MacAlgorithm) -> usize {
    alg.full_tag_len()
}

/// Compute the full-length MAC of `input`. Returns the tag length.
pub fn mac_compute<E: AesEngine, L: EngineLock, H: HashEngine, M: EngineLock>(
    aes: &mut Aes<E, L>,
    sha: &mut Sha256<H, M>,
    key: &KeyMaterial,
    alg: MacAlgorithm,
    input: &[u8],
    tag: &mut [u8],
) -> AesflowResult<usize> {
    if tag.len() < mac_output_size(alg) {
        Err(AesflowError::DRIVER_MAC_BUFFER_TOO_SMALL)?;
    }
    let mut op = MacOperation::new();
    op.sign_setup(sha, key, alg, alg.full_tag_len())?;
    op.update(aes, sha, input)?;
    op.sign_finish(aes, sha, tag)
}

/// Verify `tag`, which may be a truncated MAC, over `input`
pub fn mac_verify<E: AesEngine, L: EngineLock, H: HashEngine, M: EngineLock>(
    aes: &mut Aes<E, L>,
    sha: &mut Sha256<H, M>,
    key: &KeyMaterial,
    alg: MacAlgorithm,
    input: &[u8],
    tag: &[u8],
) -> AesflowResult<()> {
    let mut op = MacOperation::new();
    op.verify_setup(sha, key, alg, tag.len())?;
    op.update(aes, sha, input)?;
    op.verify_finish(aes, sha, tag)
}
