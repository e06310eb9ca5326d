/*++

Licensed under the Apache-2.0 license.

File Name:

    engine.rs

Abstract:

    File contains the interfaces the drivers expect from the AES and
    SHA-256 engines and from the lock guarding them.

--*/

use crate::{wait, AesflowError, AesflowResult};
use bitflags::bitflags;
use core::sync::atomic::{AtomicBool, Ordering};

bitflags! {
    /// AES engine status bits
    pub struct EngineStatus: u32 {
        const IDLE = 1 << 0;
        const OUTPUT_VALID = 1 << 3;
        const INPUT_READY = 1 << 4;
        const AUTH_ERROR = 1 << 5;
        const FAULT = 1 << 6;
    }
}

bitflags! {
    /// Hash engine status bits
    pub struct HashStatus: u32 {
        const READY = 1 << 0;
        const VALID = 1 << 1;
        const FAULT = 1 << 2;
    }
}

/// AES engine mode
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AesMode {
    Ecb,
    Cbc,
    Ctr,
    Ccm,
    Gcm,
    Cmac,
}

/// AES direction
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AesOperation {
    Encrypt,
    Decrypt,
}

/// Engine phase. Single pass modes use `Text` only.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EnginePhase {
    /// Clear the running authenticator
    Init,
    /// Load a saved authenticator
    Restore,
    Aad,
    Text,
    /// Emit the running authenticator
    Save,
    Tag,
}

/// SHA-256 family variant
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HashMode {
    Sha224,
    Sha256,
}

impl HashMode {
    /// Digest length in bytes
    pub fn digest_len(self) -> usize {
        match self {
            HashMode::Sha224 => 28,
            HashMode::Sha256 => 32,
        }
    }
}

/// Parameters programmed when an AES session starts
pub struct EngineConfig<'a> {
    pub mode: AesMode,
    pub op: AesOperation,

    /// 16, 24 or 32 bytes
    pub key: &'a [u8],

    /// IV, counter block, or CCM formatted counter block A0
    pub iv: [u8; 16],

    /// CCM AAD length
    pub aad_len: u32,

    /// CCM payload length
    pub data_len: u32,

    /// CCM tag length
    pub tag_len: u32,
}

impl<'a> EngineConfig<'a> {
    pub fn new(mode: AesMode, op: AesOperation, key: &'a [u8], iv: [u8; 16]) -> Self {
        Self {
            mode,
            op,
            key,
            iv,
            aad_len: 0,
            data_len: 0,
            tag_len: 0,
        }
    }
}

/// A word-oriented AES engine.
///
/// A session is `reset`, `start`, one or more phases, `stop`. Each phase
/// is announced with its input byte count and then fed through
/// `write_word` while results are drained through `read_word`, honouring
/// the `INPUT_READY` and `OUTPUT_VALID` status bits.
pub trait AesEngine {
    /// Bring the engine to a clean idle state
    fn reset(&mut self);

    /// Program key, IV and lengths and start a session
    fn start(&mut self, config: &EngineConfig);

    /// Start a phase carrying `len` input bytes
    fn set_phase(&mut self, phase: EnginePhase, len: u32);

    fn status(&self) -> EngineStatus;

    fn write_word(&mut self, word: u32);

    fn read_word(&mut self) -> u32;

    /// Current IV register: CBC chaining value or next counter block
    fn iv(&self) -> [u8; 16];

    /// End the session and clear key, IV and data registers
    fn stop(&mut self);
}

/// A SHA-256 compression engine fed 16 words per block
pub trait HashEngine {
    /// Clear the engine
    fn reset(&mut self);

    /// Start a chain from the mode's initial value or from `state`
    fn start(&mut self, mode: HashMode, state: Option<&[u32; 8]>);

    fn status(&self) -> HashStatus;

    /// Feed a block word; the sixteenth word of a block runs the compression
    fn write_word(&mut self, word: u32);

    /// Current chaining value
    fn state(&self) -> [u32; 8];
}

/// Mutual exclusion around a shared engine.
///
/// `acquire` is called before every engine session and `release` after it,
/// also when the session failed.
pub trait EngineLock {
    fn acquire(&self) -> AesflowResult<()>;
    fn release(&self);
}

impl<L: EngineLock + ?Sized> EngineLock for &L {
    fn acquire(&self) -> AesflowResult<()> {
        (**self).acquire()
    }

    fn release(&self) {
        (**self).release()
    }
}

/// Lock for an engine with a single owner
#[derive(Debug, Default, Copy, Clone)]
pub struct NoLock;

impl EngineLock for NoLock {
    fn acquire(&self) -> AesflowResult<()> {
        Ok(())
    }

    fn release(&self) {}
}

/// Busy-waiting lock for an engine shared between drivers
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl EngineLock for SpinLock {
    fn acquire(&self) -> AesflowResult<()> {
        let acquired = wait::until(|| {
            self.locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        });
        if !acquired {
            return Err(AesflowError::DRIVER_ENGINE_BUSY);
        }
        Ok(())
    }

    fn release(&self) {
        self.locked.store(false, Ordering::Release);
    }
}
