/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256.rs

Abstract:

    File contains the SHA-256 / SHA-224 compression model backing the
    emulated hash engine.

--*/

use sha2::digest::block_buffer::Block;
use sha2::digest::consts::U64;

/// SHA-256 Mode
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Sha256Mode {
    Sha224,
    Sha256,
}

impl Sha256Mode {
    /// Digest length in bytes
    pub fn digest_len(self) -> usize {
        match self {
            Sha256Mode::Sha224 => 28,
            Sha256Mode::Sha256 => 32,
        }
    }

    /// Initial chaining value
    pub fn initial_state(self) -> [u32; 8] {
        match self {
            Sha256Mode::Sha224 => Sha256::HASH_IV_224,
            Sha256Mode::Sha256 => Sha256::HASH_IV_256,
        }
    }
}

/// SHA-256 compression function with a resumable chaining value.
///
/// Padding is the caller's job; only whole 64 byte blocks are accepted.
pub struct Sha256 {
    hash: [u32; 8],
    mode: Sha256Mode,
}

impl Sha256 {
    /// SHA-256 Block Size
    pub const BLOCK_SIZE: usize = 64;

    /// SHA-256 Hash Size
    pub const HASH_SIZE: usize = 32;

    #[cfg_attr(rustfmt, rustfmt_skip)]
    const HASH_IV_224: [u32; 8] = [
        0xc1059ed8, 0x367cd507, 0x3070dd17, 0xf70e5939,
        0xffc00b31, 0x68581511, 0x64f98fa7, 0xbefa4fa4,
    ];

    #[cfg_attr(rustfmt, rustfmt_skip)]
    const HASH_IV_256: [u32; 8] = [
        0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
        0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
    ];

    /// Create a new instance starting from the mode's initial value
    ///
    /// # Arguments
    ///
    /// * `mode` - Mode of the SHA Operation
    pub fn new(mode: Sha256Mode) -> Self {
        Self {
            hash: mode.initial_state(),
            mode,
        }
    }

    /// Restart from the mode's initial value
    pub fn reset(&mut self, mode: Sha256Mode) {
        self.restore(mode, &mode.initial_state());
    }

    /// Resume from a chaining value saved by [`Sha256::state`]
    pub fn restore(&mut self, mode: Sha256Mode, hash: &[u32; 8]) {
        self.mode = mode;
        self.hash = *hash;
    }

    /// Current chaining value
    pub fn state(&self) -> [u32; 8] {
        self.hash
    }

    /// Compress one block
    pub fn update(&mut self, block: &[u8; Self::BLOCK_SIZE]) {
        let block = *Block::<U64>::from_slice(block);
        sha2::compress256(&mut self.hash, &[block]);
    }

    /// Copy the digest, truncated to the mode's length, into `hash`
    pub fn hash(&self, hash: &mut [u8]) {
        self.hash
            .iter()
            .flat_map(|i| i.to_be_bytes())
            .take(self.hash_len())
            .zip(hash)
            .for_each(|(src, dest)| *dest = src);
    }

    /// Get the length of the hash
    pub fn hash_len(&self) -> usize {
        self.mode.digest_len()
    }
}
