/*++

Licensed under the Apache-2.0 license.

File Name:

    ccm.rs

Abstract:

    File contains a streaming AES-CCM model used by the emulated engine.

--*/

use crate::{Aes, AES_BLOCK_SIZE};

/// Streaming AES-CCM.
///
/// AAD is absorbed first, then the payload in 16 byte chunks (the last
/// chunk may be shorter).
pub struct AesCcm {
    cipher: Aes,

    /// CBC-MAC chaining value
    mac: [u8; AES_BLOCK_SIZE],

    /// CBC-MAC staging block
    buf: [u8; AES_BLOCK_SIZE],
    buf_len: usize,

    /// Counter block A_i
    ctr: [u8; AES_BLOCK_SIZE],

    /// Size of the length field
    l: usize,

    /// E(K, A_0)
    s0: [u8; AES_BLOCK_SIZE],
}

impl AesCcm {
    /// Create a new CCM instance
    ///
    /// # Arguments
    ///
    /// * `cipher` - Keyed block cipher
    /// * `a0` - Formatted counter block: flags `L - 1`, nonce, zero counter
    /// * `aad_len` - Total AAD length
    /// * `payload_len` - Total payload length
    /// * `tag_len` - Tag length, 0 or an even value from 4 to 16
    ///
    /// # Returns
    ///
    /// * `None` if the parameters cannot be formatted
    pub fn new(
        cipher: Aes,
        a0: &[u8; AES_BLOCK_SIZE],
        aad_len: u64,
        payload_len: u64,
        tag_len: usize,
    ) -> Option<Self> {
        let l = usize::from(a0[0] & 0x07) + 1;
        if !(2..=8).contains(&l) || !matches!(tag_len, 0 | 4 | 6 | 8 | 10 | 12 | 14 | 16) {
            return None;
        }
        if l < 8 && payload_len >> (8 * l) != 0 {
            return None;
        }

        let m = if tag_len == 0 { 0 } else { (tag_len as u8 - 2) / 2 };
        let mut b0 = *a0;
        b0[0] = (u8::from(aad_len > 0) << 6) | (m << 3) | (l as u8 - 1);
        b0[AES_BLOCK_SIZE - l..].copy_from_slice(&payload_len.to_be_bytes()[8 - l..]);

        let mut ctr = *a0;
        ctr[AES_BLOCK_SIZE - l..].fill(0);

        let mut ccm = Self {
            mac: cipher.encrypted(&b0),
            s0: cipher.encrypted(&ctr),
            cipher,
            buf: [0u8; AES_BLOCK_SIZE],
            buf_len: 0,
            ctr,
            l,
        };
        ccm.increment();

        if aad_len > 0 {
            if aad_len < 0xff00 {
                ccm.absorb(&(aad_len as u16).to_be_bytes());
            } else if aad_len <= u64::from(u32::MAX) {
                ccm.absorb(&[0xff, 0xfe]);
                ccm.absorb(&(aad_len as u32).to_be_bytes());
            } else {
                ccm.absorb(&[0xff, 0xff]);
                ccm.absorb(&aad_len.to_be_bytes());
            }
        }
        Some(ccm)
    }

    /// Absorb AAD bytes
    pub fn aad(&mut self, data: &[u8]) {
        self.absorb(data);
    }

    /// Close the AAD with zero padding
    pub fn end_aad(&mut self) {
        self.pad();
    }

    /// Encrypt up to one block of payload in place
    pub fn encrypt(&mut self, data: &mut [u8]) {
        self.absorb(data);
        self.apply_keystream(data);
    }

    /// Decrypt up to one block of payload in place
    pub fn decrypt(&mut self, data: &mut [u8]) {
        self.apply_keystream(data);
        self.absorb(data);
    }

    /// Finish the MAC and return the full 16 byte tag; callers truncate.
    pub fn tag(&mut self) -> [u8; AES_BLOCK_SIZE] {
        self.pad();
        let mut tag = self.mac;
        tag.iter_mut().zip(self.s0.iter()).for_each(|(t, s)| *t ^= s);
        tag
    }

    fn absorb(&mut self, data: &[u8]) {
        for &byte in data {
            self.buf[self.buf_len] = byte;
            self.buf_len += 1;
            if self.buf_len == AES_BLOCK_SIZE {
                self.mac_block();
            }
        }
    }

    fn pad(&mut self) {
        if self.buf_len > 0 {
            self.buf[self.buf_len..].fill(0);
            self.mac_block();
        }
    }

    fn mac_block(&mut self) {
        self.mac
            .iter_mut()
            .zip(self.buf.iter())
            .for_each(|(m, b)| *m ^= b);
        self.cipher.encrypt_block(&mut self.mac);
        self.buf_len = 0;
    }

    fn apply_keystream(&mut self, data: &mut [u8]) {
        let stream = self.cipher.encrypted(&self.ctr);
        self.increment();
        data.iter_mut().zip(stream.iter()).for_each(|(d, s)| *d ^= s);
    }

    fn increment(&mut self) {
        for byte in self.ctr[AES_BLOCK_SIZE - self.l..].iter_mut().rev() {
            *byte = byte.wrapping_add(1);
            if *byte != 0 {
                break;
            }
        }
    }
}
