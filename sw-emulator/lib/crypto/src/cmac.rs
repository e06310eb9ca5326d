/*++

Licensed under the Apache-2.0 license.

File Name:

    cmac.rs

Abstract:

    File contains a streaming AES-CMAC (NIST SP 800-38B) model.

--*/

use crate::{Aes, AES_BLOCK_SIZE};

/// Resumable CMAC state
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct CmacState {
    /// CBC-MAC chaining value over every block before `pending`
    pub mac: [u8; AES_BLOCK_SIZE],

    /// Last full block seen; it is only processed once more data arrives
    pub pending: [u8; AES_BLOCK_SIZE],

    /// `pending` holds a block
    pub pending_valid: bool,
}

/// Streaming AES-CMAC
pub struct AesCmac {
    cipher: Aes,
    k1: [u8; AES_BLOCK_SIZE],
    k2: [u8; AES_BLOCK_SIZE],
    state: CmacState,
}

impl AesCmac {
    /// Create a new CMAC instance and derive the subkeys
    pub fn new(cipher: Aes) -> Self {
        let l = cipher.encrypted(&[0u8; AES_BLOCK_SIZE]);
        let k1 = dbl(&l);
        let k2 = dbl(&k1);
        Self {
            cipher,
            k1,
            k2,
            state: CmacState::default(),
        }
    }

    /// Absorb a full block that is known not to be the final one once more
    /// data follows. The last full block is held back.
    pub fn update_block(&mut self, block: &[u8; AES_BLOCK_SIZE]) {
        if self.state.pending_valid {
            let pending = self.state.pending;
            self.chain(&pending);
        }
        self.state.pending = *block;
        self.state.pending_valid = true;
    }

    /// Finish with a tail of 0 to 16 bytes and return the tag
    pub fn finalize(&mut self, tail: &[u8]) -> [u8; AES_BLOCK_SIZE] {
        let mut last = [0u8; AES_BLOCK_SIZE];
        let subkey = if tail.is_empty() && self.state.pending_valid {
            last = self.state.pending;
            self.k1
        } else {
            if self.state.pending_valid {
                let pending = self.state.pending;
                self.chain(&pending);
            }
            let n = tail.len().min(AES_BLOCK_SIZE);
            last[..n].copy_from_slice(&tail[..n]);
            if n == AES_BLOCK_SIZE {
                self.k1
            } else {
                last[n] = 0x80;
                self.k2
            }
        };
        last.iter_mut().zip(subkey.iter()).for_each(|(l, k)| *l ^= k);
        self.state.pending_valid = false;
        self.chain(&last);
        self.state.mac
    }

    /// Current state
    pub fn state(&self) -> CmacState {
        self.state
    }

    /// Replace the state with a previously saved one
    pub fn restore(&mut self, state: &CmacState) {
        self.state = *state;
    }

    fn chain(&mut self, block: &[u8; AES_BLOCK_SIZE]) {
        self.state
            .mac
            .iter_mut()
            .zip(block.iter())
            .for_each(|(m, b)| *m ^= b);
        self.cipher.encrypt_block(&mut self.state.mac);
    }
}

/// Multiply by x in GF(2^128) with the CMAC polynomial
fn dbl(block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
    let v = u128::from_be_bytes(*block);
    let mut out = v << 1;
    if v >> 127 == 1 {
        out ^= 0x87;
    }
    out.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
    const MSG: &str = "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51\
                       30c81c46a35ce411e5fbc1191a0a52eff69f2445df4f9b17ad2b417be66c3710";

    fn cmac(len: usize) -> String {
        let key = hex::decode(KEY).unwrap();
        let msg = hex::decode(MSG).unwrap();
        let msg = &msg[..len];
        let mut cmac = AesCmac::new(Aes::new(&key).unwrap());

        let full = if len % 16 == 0 { len } else { len - len % 16 };
        for block in msg[..full].chunks_exact(AES_BLOCK_SIZE) {
            cmac.update_block(block.try_into().unwrap());
        }
        hex::encode(cmac.finalize(&msg[full..]))
    }

    // RFC 4493 section 4
    #[test]
    fn test_rfc4493_vectors() {
        assert_eq!(cmac(0), "bb1d6929e95937287fa37d129b756746");
        assert_eq!(cmac(16), "070a16b46b4d4144f79bdd9dd04a287c");
        assert_eq!(cmac(40), "dfa66747de9ae63030ca32611497c827");
        assert_eq!(cmac(64), "51f0bebf7e3b9d92fc49741779363cfe");
    }

    #[test]
    fn test_subkeys() {
        let key = hex::decode(KEY).unwrap();
        let cmac = AesCmac::new(Aes::new(&key).unwrap());
        assert_eq!(hex::encode(cmac.k1), "fbeed618357133667c85e08f7236a8de");
        assert_eq!(hex::encode(cmac.k2), "f7ddac306ae266ccf90bc11ee46d513b");
    }

    #[test]
    fn test_save_restore() {
        let key = hex::decode(KEY).unwrap();
        let msg = hex::decode(MSG).unwrap();

        let mut first = AesCmac::new(Aes::new(&key).unwrap());
        first.update_block(msg[..16].try_into().unwrap());
        first.update_block(msg[16..32].try_into().unwrap());
        let saved = first.state();

        let mut second = AesCmac::new(Aes::new(&key).unwrap());
        second.restore(&saved);
        second.update_block(msg[32..48].try_into().unwrap());
        second.update_block(msg[48..64].try_into().unwrap());
        assert_eq!(
            hex::encode(second.finalize(&[])),
            "51f0bebf7e3b9d92fc49741779363cfe"
        );
    }
}
