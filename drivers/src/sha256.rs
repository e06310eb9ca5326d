/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256.rs

Abstract:

    File contains API for SHA-224 and SHA-256 digests over the hash
    compression engine.

--*/

use crate::engine::{EngineLock, HashEngine, HashMode, HashStatus, NoLock};
use crate::{cprintln, wait, AesflowError, AesflowResult};
use zeroize::Zeroize;

pub const SHA256_BLOCK_BYTE_SIZE: usize = 64;
pub const SHA256_DIGEST_BYTE_SIZE: usize = 32;
const SHA256_BLOCK_LEN_OFFSET: usize = 56;
const SHA256_MAX_DATA_SIZE: u64 = u64::MAX >> 3;

/// SHA-256 Digest state
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Sha256DigestState {
    /// Initial state
    Init,

    /// Pending state
    Pending,

    /// Final state
    Final,
}

/// Resumable digest held by the caller between calls
#[derive(Clone)]
pub struct Sha256Context {
    mode: HashMode,

    state: Sha256DigestState,

    /// Chaining value after the last compressed block
    chain: [u32; 8],

    /// Staging buffer
    buf: [u8; SHA256_BLOCK_BYTE_SIZE],

    /// Current staging buffer index
    buf_idx: usize,

    /// Data size
    data_size: u64,
}

impl Sha256Context {
    pub fn new(mode: HashMode) -> Self {
        Self {
            mode,
            state: Sha256DigestState::Init,
            chain: [0; 8],
            buf: [0; SHA256_BLOCK_BYTE_SIZE],
            buf_idx: 0,
            data_size: 0,
        }
    }

    pub fn mode(&self) -> HashMode {
        self.mode
    }

    pub fn digest_len(&self) -> usize {
        self.mode.digest_len()
    }

    /// Wipe buffered data and chaining value
    fn wipe(&mut self) {
        self.chain.zeroize();
        self.buf.zeroize();
        self.buf_idx = 0;
        self.data_size = 0;
    }
}

impl Drop for Sha256Context {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// SHA-256 engine driver
pub struct Sha256<H: HashEngine, L: EngineLock = NoLock> {
    engine: H,
    lock: L,
}

impl<H: HashEngine> Sha256<H, NoLock> {
    pub fn new(engine: H) -> Self {
        Self {
            engine,
            lock: NoLock,
        }
    }
}

impl<H: HashEngine, L: EngineLock> Sha256<H, L> {
    /// Create a driver for an engine shared behind `lock`
    pub fn with_lock(engine: H, lock: L) -> Self {
        Self { engine, lock }
    }

    pub fn engine(&self) -> &H {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut H {
        &mut self.engine
    }

    /// Calculate the digest of the buffer
    ///
    /// # Arguments
    ///
    /// * `mode` - SHA-224 or SHA-256
    /// * `buf` - Buffer to calculate the digest over
    /// * `digest` - Receives `mode.digest_len()` bytes
    pub fn digest(&mut self, mode: HashMode, buf: &[u8], digest: &mut [u8]) -> AesflowResult<()> {
        let mut ctx = Sha256Context::new(mode);
        self.update(&mut ctx, buf)?;
        self.finalize(&mut ctx, digest)
    }

    /// Update the digest with data
    pub fn update(&mut self, ctx: &mut Sha256Context, data: &[u8]) -> AesflowResult<()> {
        if ctx.state == Sha256DigestState::Final {
            return Err(AesflowError::DRIVER_SHA256_INVALID_STATE);
        }
        let data_size = ctx
            .data_size
            .checked_add(data.len() as u64)
            .filter(|size| *size <= SHA256_MAX_DATA_SIZE)
            .ok_or(AesflowError::DRIVER_SHA256_MAX_DATA)?;

        self.with_engine(|sha| {
            for byte in data {
                ctx.buf[ctx.buf_idx] = *byte;
                ctx.buf_idx += 1;

                // If the buffer is full calculate the digest of accumulated data
                if ctx.buf_idx == SHA256_BLOCK_BYTE_SIZE {
                    let block = ctx.buf;
                    Self::digest_block(sha, ctx, &block)?;
                    ctx.buf.fill(0);
                    ctx.buf_idx = 0;
                }
            }
            Ok(())
        })?;

        ctx.data_size = data_size;
        Ok(())
    }

    /// Finalize the digest operation
    ///
    /// # Arguments
    ///
    /// * `digest` - Receives the first `digest.len()` digest bytes; must hold
    ///   the whole digest
    pub fn finalize(&mut self, ctx: &mut Sha256Context, digest: &mut [u8]) -> AesflowResult<()> {
        if ctx.state == Sha256DigestState::Final {
            return Err(AesflowError::DRIVER_SHA256_INVALID_STATE);
        }
        let digest = digest
            .get_mut(..ctx.digest_len())
            .ok_or(AesflowError::DRIVER_SHA256_BUFFER_TOO_SMALL)?;

        // Construct the last block
        let mut block = [0u8; SHA256_BLOCK_BYTE_SIZE];
        let used = ctx.buf_idx;
        block[..used].copy_from_slice(&ctx.buf[..used]);
        block[used] = 0b1000_0000;
        let bit_len = (ctx.data_size << 3).to_be_bytes();

        self.with_engine(|sha| {
            if used < SHA256_BLOCK_LEN_OFFSET {
                block[SHA256_BLOCK_LEN_OFFSET..].copy_from_slice(&bit_len);
                Self::digest_block(sha, ctx, &block)
            } else {
                // Add a padding block
                Self::digest_block(sha, ctx, &block)?;
                block.fill(0);
                block[SHA256_BLOCK_LEN_OFFSET..].copy_from_slice(&bit_len);
                Self::digest_block(sha, ctx, &block)
            }
        })?;

        for (chunk, word) in digest.chunks_mut(4).zip(ctx.chain.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes()[..chunk.len()]);
        }
        ctx.wipe();
        ctx.state = Sha256DigestState::Final;
        Ok(())
    }

    fn with_engine<T>(&mut self, f: impl FnOnce(&mut H) -> AesflowResult<T>) -> AesflowResult<T> {
        self.lock.acquire()?;
        let result = f(&mut self.engine);
        self.engine.reset();
        self.lock.release();
        result
    }

    /// Calculate digest of the full block
    fn digest_block(
        sha: &mut H,
        ctx: &mut Sha256Context,
        block: &[u8; SHA256_BLOCK_BYTE_SIZE],
    ) -> AesflowResult<()> {
        let chain = match ctx.state {
            Sha256DigestState::Init => None,
            _ => Some(&ctx.chain),
        };

        // Wait for the hardware to be ready
        if !wait::until(|| sha.status().contains(HashStatus::READY)) {
            cprintln!("[sha256] Engine not ready");
            Err(AesflowError::DRIVER_SHA256_ENGINE_TIMEOUT)?;
        }
        sha.start(ctx.mode, chain);
        for chunk in block.chunks_exact(4) {
            sha.write_word(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }

        // Wait for the digest operation to finish
        if !wait::until(|| {
            sha.status()
                .intersects(HashStatus::VALID | HashStatus::FAULT)
        }) {
            cprintln!("[sha256] Engine timeout");
            Err(AesflowError::DRIVER_SHA256_ENGINE_TIMEOUT)?;
        }
        if sha.status().contains(HashStatus::FAULT) {
            cprintln!("[sha256] Engine fault");
            Err(AesflowError::DRIVER_SHA256_ENGINE_FAULT)?;
        }

        ctx.chain = sha.state();
        ctx.state = Sha256DigestState::Pending;
        Ok(())
    }
}
