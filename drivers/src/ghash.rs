/*++

Licensed under the Apache-2.0 license.

File Name:

    ghash.rs

Abstract:

    File contains the software GHASH used by GCM when the engine cannot
    take the nonce. Multiplication by H uses 4-bit tables (Shoup's method).

--*/

use crate::aes::AES_BLOCK_SIZE_BYTES;
use zeroize::Zeroize;

/// Reduction constants for the four bits shifted out per step
const LAST4: [u64; 16] = [
    0x0000, 0x1c20, 0x3840, 0x2460, 0x7080, 0x6ca0, 0x48c0, 0x54e0, 0xe100, 0xfd20, 0xd940, 0xc560,
    0x9180, 0x8da0, 0xa9c0, 0xb5e0,
];

/// Multiples of H for every 4-bit value, split into high and low halves
#[derive(Clone, Default, Zeroize)]
pub struct GhashTables {
    hl: [u64; 16],
    hh: [u64; 16],
}

impl GhashTables {
    pub fn new(h: &[u8; AES_BLOCK_SIZE_BYTES]) -> Self {
        let mut tables = Self::default();
        let mut word = [0u8; 8];
        word.copy_from_slice(&h[..8]);
        let mut vh = u64::from_be_bytes(word);
        word.copy_from_slice(&h[8..]);
        let mut vl = u64::from_be_bytes(word);

        tables.hl[8] = vl;
        tables.hh[8] = vh;

        // H * x^i for the single bit entries
        let mut i = 4;
        while i > 0 {
            let t = (vl & 1) * 0xe100_0000;
            vl = (vh << 63) | (vl >> 1);
            vh = (vh >> 1) ^ (t << 32);
            tables.hl[i] = vl;
            tables.hh[i] = vh;
            i >>= 1;
        }

        // Remaining entries by linearity
        let mut i = 2;
        while i <= 8 {
            let (vh, vl) = (tables.hh[i], tables.hl[i]);
            for j in 1..i {
                tables.hh[i + j] = vh ^ tables.hh[j];
                tables.hl[i + j] = vl ^ tables.hl[j];
            }
            i *= 2;
        }
        tables
    }

    /// `x * H` in GF(2^128)
    pub fn mult(&self, x: &[u8; AES_BLOCK_SIZE_BYTES]) -> [u8; AES_BLOCK_SIZE_BYTES] {
        let lo = usize::from(x[15] & 0xf);
        let mut zh = self.hh[lo];
        let mut zl = self.hl[lo];

        for i in (0..AES_BLOCK_SIZE_BYTES).rev() {
            let lo = usize::from(x[i] & 0xf);
            let hi = usize::from(x[i] >> 4);

            if i != 15 {
                let rem = (zl & 0xf) as usize;
                zl = (zh << 60) | (zl >> 4);
                zh >>= 4;
                zh ^= LAST4[rem] << 48;
                zh ^= self.hh[lo];
                zl ^= self.hl[lo];
            }

            let rem = (zl & 0xf) as usize;
            zl = (zh << 60) | (zl >> 4);
            zh >>= 4;
            zh ^= LAST4[rem] << 48;
            zh ^= self.hh[hi];
            zl ^= self.hl[hi];
        }

        let mut out = [0u8; AES_BLOCK_SIZE_BYTES];
        out[..8].copy_from_slice(&zh.to_be_bytes());
        out[8..].copy_from_slice(&zl.to_be_bytes());
        out
    }
}

/// Running GHASH with a staging buffer for partial blocks
#[derive(Clone, Default, Zeroize)]
pub struct Ghash {
    tables: GhashTables,
    acc: [u8; AES_BLOCK_SIZE_BYTES],
    buf: [u8; AES_BLOCK_SIZE_BYTES],
    buf_len: usize,
}

impl Ghash {
    pub fn new(h: &[u8; AES_BLOCK_SIZE_BYTES]) -> Self {
        Self {
            tables: GhashTables::new(h),
            ..Default::default()
        }
    }

    fn absorb(&mut self, block: &[u8; AES_BLOCK_SIZE_BYTES]) {
        for (a, b) in self.acc.iter_mut().zip(block) {
            *a ^= b;
        }
        self.acc = self.tables.mult(&self.acc);
    }

    /// Absorb `data`. A trailing partial block is staged until more data
    /// arrives or [`Ghash::pad`] is called.
    pub fn update(&mut self, mut data: &[u8]) {
        if self.buf_len > 0 {
            let take = data.len().min(AES_BLOCK_SIZE_BYTES - self.buf_len);
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&data[..take]);
            self.buf_len += take;
            data = &data[take..];
            if self.buf_len < AES_BLOCK_SIZE_BYTES {
                return;
            }
            let block = self.buf;
            self.absorb(&block);
            self.buf_len = 0;
        }

        let mut blocks = data.chunks_exact(AES_BLOCK_SIZE_BYTES);
        for chunk in &mut blocks {
            let mut block = [0u8; AES_BLOCK_SIZE_BYTES];
            block.copy_from_slice(chunk);
            self.absorb(&block);
        }
        let rest = blocks.remainder();
        self.buf[..rest.len()].copy_from_slice(rest);
        self.buf_len = rest.len();
    }

    /// Zero pad and absorb a staged partial block
    pub fn pad(&mut self) {
        if self.buf_len > 0 {
            let mut block = [0u8; AES_BLOCK_SIZE_BYTES];
            block[..self.buf_len].copy_from_slice(&self.buf[..self.buf_len]);
            self.absorb(&block);
            self.buf_len = 0;
        }
    }

    /// Pad and return the accumulator
    pub fn digest(&mut self) -> [u8; AES_BLOCK_SIZE_BYTES] {
        self.pad();
        self.acc
    }
}

