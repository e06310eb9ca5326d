/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    Driver for the AES engine.

    Every engine call runs in a session bracketed by the engine lock. Data
    is pumped through the word channel: input words are written while
    `INPUT_READY` is set, output words are read as soon as
    `OUTPUT_VALID` is set, and the engine's fault and auth-error bits are
    checked before every transfer.

--*/

use crate::engine::{
    AesEngine, AesMode, AesOperation, EngineConfig, EngineLock, EnginePhase, EngineStatus, NoLock,
};
use crate::word_channel::{sink_len, source_len, word_count, Sink, WordReader, WordWriter};
use crate::{cprintln, wait, AesflowError, AesflowResult};

pub const AES_BLOCK_SIZE_BYTES: usize = 16;

/// Largest single engine phase
const AES_MAX_DATA_SIZE: usize = u32::MAX as usize;

/// Block transforms offered by [`Aes::transform`]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockMode {
    EcbEncrypt,
    EcbDecrypt,
    CbcEncrypt,
    CbcDecrypt,

    /// Keystream XOR; the IV is a big-endian 128-bit counter block
    Ctr,
}

impl BlockMode {
    fn engine_mode(self) -> (AesMode, AesOperation) {
        match self {
            BlockMode::EcbEncrypt => (AesMode::Ecb, AesOperation::Encrypt),
            BlockMode::EcbDecrypt => (AesMode::Ecb, AesOperation::Decrypt),
            BlockMode::CbcEncrypt => (AesMode::Cbc, AesOperation::Encrypt),
            BlockMode::CbcDecrypt => (AesMode::Cbc, AesOperation::Decrypt),
            BlockMode::Ctr => (AesMode::Ctr, AesOperation::Encrypt),
        }
    }

    fn block_aligned(self) -> bool {
        !matches!(self, BlockMode::Ctr)
    }
}

fn check_key(key: &[u8]) -> AesflowResult<()> {
    match key.len() {
        16 | 24 | 32 => Ok(()),
        _ => Err(AesflowError::DRIVER_AES_INVALID_KEY_SIZE),
    }
}

fn phase_len(len: usize) -> AesflowResult<u32> {
    if len > AES_MAX_DATA_SIZE {
        Err(AesflowError::DRIVER_AES_INVALID_LENGTH)?;
    }
    Ok(len as u32)
}

/// AES cryptographic engine driver.
pub struct Aes<E: AesEngine, L: EngineLock = NoLock> {
    engine: E,
    lock: L,
}

impl<E: AesEngine> Aes<E, NoLock> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            lock: NoLock,
        }
    }
}

impl<E: AesEngine, L: EngineLock> Aes<E, L> {
    /// Create a driver for an engine shared behind `lock`
    pub fn with_lock(engine: E, lock: L) -> Self {
        Self { engine, lock }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Run `f` in an engine session programmed with `config`.
    ///
    /// The lock is held for the whole session and released on every exit
    /// path; the engine is stopped (key, IV and data registers cleared)
    /// before the lock is released.
    pub fn with_engine<T>(
        &mut self,
        config: &EngineConfig,
        f: impl FnOnce(&mut EngineSession<'_, E>) -> AesflowResult<T>,
    ) -> AesflowResult<T> {
        check_key(config.key)?;
        self.lock.acquire()?;

        self.engine.reset();
        self.engine.start(config);
        let status = self.engine.status();
        let result = if status.contains(EngineStatus::FAULT) {
            cprintln!("[aes] Engine rejected configuration, status 0x{:x}", status.bits());
            Err(AesflowError::DRIVER_AES_ENGINE_FAULT)
        } else {
            f(&mut EngineSession {
                engine: &mut self.engine,
            })
        };

        self.engine.stop();
        self.lock.release();
        result
    }

    /// Run a block transform over `input`.
    ///
    /// # Arguments
    ///
    /// * `mode` - Transform
    /// * `key` - 16, 24 or 32 byte key
    /// * `iv` - CBC chaining value or CTR counter block, updated in place
    /// * `input` - Input; ECB and CBC need a positive multiple of 16 bytes
    /// * `output` - At least `input.len()` bytes
    pub fn transform(
        &mut self,
        mode: BlockMode,
        key: &[u8],
        iv: &mut [u8; AES_BLOCK_SIZE_BYTES],
        input: &[u8],
        output: &mut [u8],
    ) -> AesflowResult<()> {
        check_key(key)?;
        if mode.block_aligned() && (input.is_empty() || input.len() % AES_BLOCK_SIZE_BYTES != 0) {
            Err(AesflowError::DRIVER_AES_INVALID_LENGTH)?;
        }
        let output = output
            .get_mut(..input.len())
            .ok_or(AesflowError::DRIVER_AES_INVALID_SLICE)?;
        if input.is_empty() {
            return Ok(());
        }

        let (engine_mode, op) = mode.engine_mode();
        let config = EngineConfig::new(engine_mode, op, key, *iv);
        *iv = self.with_engine(&config, |session| {
            session.transfer(EnginePhase::Text, &[input], &mut [Sink::Buffer(output)])?;
            Ok(session.iv())
        })?;
        Ok(())
    }

    /// Encrypt a single block
    pub fn ecb_encrypt_block(
        &mut self,
        key: &[u8],
        block: &[u8; AES_BLOCK_SIZE_BYTES],
    ) -> AesflowResult<[u8; AES_BLOCK_SIZE_BYTES]> {
        let mut out = [0u8; AES_BLOCK_SIZE_BYTES];
        self.transform(BlockMode::EcbEncrypt, key, &mut [0; 16], block, &mut out)?;
        Ok(out)
    }

    /// Run CBC encryption over the concatenation of `sources` keeping only
    /// the last ciphertext block, which becomes the new `iv`.
    pub fn cbc_mac(
        &mut self,
        key: &[u8],
        iv: &mut [u8; AES_BLOCK_SIZE_BYTES],
        sources: &[&[u8]],
    ) -> AesflowResult<()> {
        let len = source_len(sources);
        if len == 0 || len % AES_BLOCK_SIZE_BYTES != 0 {
            Err(AesflowError::DRIVER_AES_INVALID_LENGTH)?;
        }

        let mut last = [0u8; AES_BLOCK_SIZE_BYTES];
        let config = EngineConfig::new(AesMode::Cbc, AesOperation::Encrypt, key, *iv);
        self.with_engine(&config, |session| {
            session.transfer(
                EnginePhase::Text,
                sources,
                &mut [
                    Sink::Discard(len - AES_BLOCK_SIZE_BYTES),
                    Sink::Buffer(&mut last),
                ],
            )
        })?;
        *iv = last;
        Ok(())
    }

    /// CCM encrypt in one pass.
    ///
    /// The engine echoes the AAD, which is discarded, then emits the
    /// ciphertext and `tag.len()` tag bytes.
    ///
    /// # Arguments
    ///
    /// * `a0` - Formatted counter block: flags `L - 1`, nonce, zero counter
    pub fn ccm_encrypt(
        &mut self,
        key: &[u8],
        a0: &[u8; AES_BLOCK_SIZE_BYTES],
        aad: &[u8],
        plaintext: &[u8],
        ciphertext: &mut [u8],
        tag: &mut [u8],
    ) -> AesflowResult<()> {
        let ciphertext = ciphertext
            .get_mut(..plaintext.len())
            .ok_or(AesflowError::DRIVER_AES_INVALID_SLICE)?;
        let config = EngineConfig {
            aad_len: phase_len(aad.len())?,
            data_len: phase_len(plaintext.len())?,
            tag_len: phase_len(tag.len())?,
            ..EngineConfig::new(AesMode::Ccm, AesOperation::Encrypt, key, *a0)
        };
        self.with_engine(&config, |session| {
            session.transfer(
                EnginePhase::Text,
                &[aad, plaintext],
                &mut [
                    Sink::Discard(aad.len()),
                    Sink::Buffer(ciphertext),
                    Sink::Buffer(tag),
                ],
            )
        })
    }

    /// CCM decrypt in one pass. The engine compares the tag itself and
    /// raises its auth-error status on mismatch.
    pub fn ccm_decrypt(
        &mut self,
        key: &[u8],
        a0: &[u8; AES_BLOCK_SIZE_BYTES],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        plaintext: &mut [u8],
    ) -> AesflowResult<()> {
        let plaintext = plaintext
            .get_mut(..ciphertext.len())
            .ok_or(AesflowError::DRIVER_AES_INVALID_SLICE)?;
        let config = EngineConfig {
            aad_len: phase_len(aad.len())?,
            data_len: phase_len(ciphertext.len())?,
            tag_len: phase_len(tag.len())?,
            ..EngineConfig::new(AesMode::Ccm, AesOperation::Decrypt, key, *a0)
        };
        self.with_engine(&config, |session| {
            session.transfer(
                EnginePhase::Text,
                &[aad, ciphertext, tag],
                &mut [Sink::Discard(aad.len()), Sink::Buffer(plaintext)],
            )
        })
    }
}

/// A running engine session, handed out by [`Aes::with_engine`]
pub struct EngineSession<'e, E: AesEngine> {
    engine: &'e mut E,
}

impl<E: AesEngine> EngineSession<'_, E> {
    /// Run one phase: feed the concatenation of `sources` and scatter the
    /// engine's output across `sinks`.
    ///
    /// The sink lengths must add up to what the engine produces for the
    /// phase.
    pub fn transfer(
        &mut self,
        phase: EnginePhase,
        sources: &[&[u8]],
        sinks: &mut [Sink<'_>],
    ) -> AesflowResult<()> {
        let in_len = source_len(sources);
        let mut words_in = word_count(in_len);
        let mut words_out = word_count(sink_len(sinks));

        self.engine.set_phase(phase, phase_len(in_len)?);

        let mut reader = WordReader::new(sources);
        let mut writer = WordWriter::new(sinks);
        while words_in > 0 || words_out > 0 {
            let status = self.wait_for(|status| {
                status.intersects(EngineStatus::FAULT | EngineStatus::AUTH_ERROR)
                    || (words_out > 0 && status.contains(EngineStatus::OUTPUT_VALID))
                    || (words_in > 0 && status.contains(EngineStatus::INPUT_READY))
            })?;
            Self::check(status)?;

            if words_out > 0 && status.contains(EngineStatus::OUTPUT_VALID) {
                writer.write_word(self.engine.read_word());
                words_out -= 1;
            } else if let Some(word) = reader.next_word() {
                self.engine.write_word(word);
                words_in -= 1;
            } else {
                words_in = 0;
            }
        }

        Self::check(self.engine.status())
    }

    /// Current IV register
    pub fn iv(&self) -> [u8; AES_BLOCK_SIZE_BYTES] {
        self.engine.iv()
    }

    fn wait_for(
        &self,
        mut predicate: impl FnMut(EngineStatus) -> bool,
    ) -> AesflowResult<EngineStatus> {
        let engine = &*self.engine;
        if !wait::until(|| predicate(engine.status())) {
            cprintln!(
                "[aes] Engine timeout, status 0x{:x}",
                engine.status().bits()
            );
            Err(AesflowError::DRIVER_AES_ENGINE_TIMEOUT)?;
        }
        Ok(engine.status())
    }

    fn check(status: EngineStatus) -> AesflowResult<()> {
        if status.contains(EngineStatus::FAULT) {
            cprintln!("[aes] Engine fault, status 0x{:x}", status.bits());
            Err(AesflowError::DRIVER_AES_ENGINE_FAULT)?;
        }
        if status.contains(EngineStatus::AUTH_ERROR) {
            cprintln!("[aes] Engine reported auth error");
            Err(AesflowError::DRIVER_AES_AUTH_FAILED)?;
        }
        Ok(())
    }
}
