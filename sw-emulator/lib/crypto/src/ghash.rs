/*++

Licensed under the Apache-2.0 license.

File Name:

    ghash.rs

Abstract:

    File contains a bit-serial GHASH used by the emulated GCM engine.

--*/

use crate::AES_BLOCK_SIZE;

/// GF(2^128) reduction constant in GCM bit order
const R: u128 = 0xe1 << 120;

/// GHASH accumulator keyed with the hash subkey H
#[derive(Clone)]
pub struct GHash {
    h: u128,
    acc: u128,
}

impl GHash {
    /// Create a new GHASH instance with a zero accumulator
    ///
    /// # Arguments
    ///
    /// * `h` - Hash subkey, E(K, 0^128)
    pub fn new(h: &[u8; AES_BLOCK_SIZE]) -> Self {
        Self {
            h: u128::from_be_bytes(*h),
            acc: 0,
        }
    }

    /// Absorb one block. Partial blocks must be zero padded by the caller.
    pub fn update(&mut self, block: &[u8; AES_BLOCK_SIZE]) {
        self.acc = gf_mul(self.acc ^ u128::from_be_bytes(*block), self.h);
    }

    /// Current accumulator
    pub fn state(&self) -> [u8; AES_BLOCK_SIZE] {
        self.acc.to_be_bytes()
    }

    /// Replace the accumulator with a previously saved one
    pub fn restore(&mut self, state: &[u8; AES_BLOCK_SIZE]) {
        self.acc = u128::from_be_bytes(*state);
    }

    /// Accumulator XOR `mask`
    pub fn finalize(&self, mask: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        (self.acc ^ u128::from_be_bytes(*mask)).to_be_bytes()
    }
}

/// Multiply two field elements. Bit 0 of the GCM polynomial is the most
/// significant bit of the big-endian integer.
fn gf_mul(x: u128, y: u128) -> u128 {
    let mut z = 0u128;
    let mut v = y;
    for i in 0..128 {
        if (x >> (127 - i)) & 1 == 1 {
            z ^= v;
        }
        v = if v & 1 == 1 { (v >> 1) ^ R } else { v >> 1 };
    }
    z
}
