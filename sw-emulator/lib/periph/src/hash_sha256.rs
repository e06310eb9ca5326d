/*++

Licensed under the Apache-2.0 license.

File Name:

    hash_sha256.rs

Abstract:

    File contains the emulated SHA-256 compression engine.

--*/

use aesflow_emu_crypto::{Sha256, Sha256Mode};
use rand::Rng;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;
use tock_registers::registers::InMemoryRegister;

register_bitfields! [
    u32,

    /// Control Register Fields
    pub Control [
        INIT OFFSET(0) NUMBITS(1) [],
        NEXT OFFSET(1) NUMBITS(1) [],
        MODE OFFSET(2) NUMBITS(1) [
            SHA256_224 = 0b00,
            SHA256 = 0b01,
        ],
        ZEROIZE OFFSET(3) NUMBITS(1) [],
        RSVD OFFSET(4) NUMBITS(28) [],
    ],

    /// Status Register Fields
    pub Status [
        READY OFFSET(0) NUMBITS(1) [],
        VALID OFFSET(1) NUMBITS(1) [],
        FAULT OFFSET(2) NUMBITS(1) [],
    ],
];

/// Number of 32-bit words in a block
const BLOCK_WORDS: usize = Sha256::BLOCK_SIZE / 4;

/// SHA-256 Peripheral
///
/// `INIT` compresses the block register from the mode's initial value,
/// `NEXT` compresses it on top of the digest register, which software may
/// overwrite to resume a saved chain.
pub struct HashSha256 {
    control: InMemoryRegister<u32, Control::Register>,
    status: InMemoryRegister<u32, Status::Register>,

    /// Block registers, bytes in little-endian word order
    block: [u32; BLOCK_WORDS],

    /// Digest registers, raw chaining value
    digest: [u32; 8],

    sha256: Sha256,
}

impl Default for HashSha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl HashSha256 {
    /// Create a new SHA-256 engine
    pub fn new() -> Self {
        Self {
            control: InMemoryRegister::new(0),
            status: InMemoryRegister::new(Status::READY::SET.value),
            block: [0; BLOCK_WORDS],
            digest: [0; 8],
            sha256: Sha256::new(Sha256Mode::Sha256),
        }
    }

    /// Write a block register
    pub fn write_block(&mut self, idx: usize, val: u32) {
        match self.block.get_mut(idx) {
            Some(word) => *word = val,
            None => self.status.modify(Status::FAULT::SET),
        }
    }

    /// Write a digest register
    pub fn write_digest(&mut self, idx: usize, val: u32) {
        match self.digest.get_mut(idx) {
            Some(word) => *word = val,
            None => self.status.modify(Status::FAULT::SET),
        }
    }

    /// Read a digest register
    pub fn read_digest(&self, idx: usize) -> u32 {
        self.digest.get(idx).copied().unwrap_or(0)
    }

    /// Status register value
    pub fn status(&self) -> u32 {
        self.status.get()
    }

    /// Write the control register
    pub fn write_control(&mut self, val: u32) {
        self.control.set(val);

        if self.control.is_set(Control::ZEROIZE) {
            self.zeroize();
            return;
        }

        let mode = match self.control.read_as_enum(Control::MODE) {
            Some(Control::MODE::Value::SHA256_224) => Sha256Mode::Sha224,
            Some(Control::MODE::Value::SHA256) => Sha256Mode::Sha256,
            None => {
                self.status.modify(Status::FAULT::SET);
                return;
            }
        };

        self.status
            .modify(Status::READY::CLEAR + Status::VALID::CLEAR);

        if self.control.is_set(Control::INIT) {
            self.sha256.reset(mode);
        } else if self.control.is_set(Control::NEXT) {
            self.sha256.restore(mode, &self.digest);
        } else {
            self.status.modify(Status::READY::SET);
            return;
        }

        let mut block = [0u8; Sha256::BLOCK_SIZE];
        for (chunk, word) in block.chunks_exact_mut(4).zip(self.block.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        self.sha256.update(&block);
        self.digest = self.sha256.state();

        self.status
            .modify(Status::READY::SET + Status::VALID::SET);
    }

    /// Clear every register with random data
    fn zeroize(&mut self) {
        rand::thread_rng().fill(&mut self.block[..]);
        rand::thread_rng().fill(&mut self.digest[..]);
        self.sha256.reset(Sha256Mode::Sha256);
        self.control.set(0);
        self.status.set(Status::READY::SET.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(sha: &mut HashSha256, block: &[u8; 64]) {
        for (idx, chunk) in block.chunks_exact(4).enumerate() {
            sha.write_block(idx, u32::from_le_bytes(chunk.try_into().unwrap()));
        }
    }

    fn digest(sha: &HashSha256, len: usize) -> String {
        let bytes: Vec<u8> = (0..8)
            .flat_map(|i| sha.read_digest(i).to_be_bytes())
            .take(len)
            .collect();
        hex::encode(bytes)
    }

    fn abc_block() -> [u8; 64] {
        let mut block = [0u8; 64];
        block[..3].copy_from_slice(b"abc");
        block[3] = 0x80;
        block[63] = 0x18;
        block
    }

    #[test]
    fn test_sha256_abc() {
        let mut sha = HashSha256::new();
        load(&mut sha, &abc_block());
        sha.write_control((Control::INIT::SET + Control::MODE::SHA256).value);

        assert!(Status::VALID.is_set(sha.status()));
        assert_eq!(
            digest(&sha, 32),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha224_abc() {
        let mut sha = HashSha256::new();
        load(&mut sha, &abc_block());
        sha.write_control((Control::INIT::SET + Control::MODE::SHA256_224).value);

        assert_eq!(
            digest(&sha, 28),
            "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"
        );
    }

    #[test]
    fn test_resume_from_written_digest() {
        let mut whole = HashSha256::new();
        load(&mut whole, &[0x61; 64]);
        whole.write_control((Control::INIT::SET + Control::MODE::SHA256).value);
        load(&mut whole, &abc_block());
        whole.write_control((Control::NEXT::SET + Control::MODE::SHA256).value);

        let mut first = HashSha256::new();
        load(&mut first, &[0x61; 64]);
        first.write_control((Control::INIT::SET + Control::MODE::SHA256).value);
        let saved: Vec<u32> = (0..8).map(|i| first.read_digest(i)).collect();

        let mut second = HashSha256::new();
        for (i, word) in saved.iter().enumerate() {
            second.write_digest(i, *word);
        }
        load(&mut second, &abc_block());
        second.write_control((Control::NEXT::SET + Control::MODE::SHA256).value);

        assert_eq!(digest(&whole, 32), digest(&second, 32));
    }

    #[test]
    fn test_zeroize() {
        let mut sha = HashSha256::new();
        load(&mut sha, &abc_block());
        sha.write_control((Control::INIT::SET + Control::MODE::SHA256).value);
        sha.write_control(Control::ZEROIZE::SET.value);

        assert!(Status::READY.is_set(sha.status()));
        assert!(!Status::VALID.is_set(sha.status()));
    }

    #[test]
    fn test_out_of_range_register_faults() {
        let mut sha = HashSha256::new();
        sha.write_block(16, 0);
        assert!(Status::FAULT.is_set(sha.status()));
    }
}
