/*++

Licensed under the Apache-2.0 license.

File Name:

    aes_ccm_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for AES-128-CCM cryptography operations.

--*/

use aesflow_drivers::{
    aes_ccm_decrypt, aes_ccm_encrypt, cprintln, Aes, AesEngine, AesflowError, AesflowResult,
    EngineLock, KeyMaterial,
};

// NIST SP 800-38C, Appendix C, Example 1
//
// K = 404142434445464748494a4b4c4d4e4f
// N = 10111213141516
// A = 0001020304050607
// P = 20212223
// C = 7162015b4dac255d

const KEY: [u8; 16] = [
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x4b, 0x4c, 0x4d, 0x4e, 0x4f,
];
const NONCE: [u8; 7] = [0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16];
const AAD: [u8; 8] = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
const PT: [u8; 4] = [0x20, 0x21, 0x22, 0x23];
const CT: [u8; 4] = [0x71, 0x62, 0x01, 0x5b];
const TAG: [u8; 4] = [0x4d, 0xac, 0x25, 0x5d];

#[derive(Default, Debug)]
pub struct AesCcmKat {}

impl AesCcmKat {
    /// This function executes the Known Answer Tests (aka KAT) for AES-CCM.
    ///
    /// # Arguments
    ///
    /// * `aes` - AES driver
    ///
    /// # Returns
    ///
    /// * `AesflowResult` - Result denoting the KAT outcome.
    pub fn execute<E: AesEngine, L: EngineLock>(&self, aes: &mut Aes<E, L>) -> AesflowResult<()> {
        let key = KeyMaterial::aes(&KEY)?;

        let mut ciphertext = [0u8; 4];
        let mut tag = [0u8; 4];
        aes_ccm_encrypt(aes, &key, &NONCE, &AAD, &PT, &mut ciphertext, &mut tag)?;
        if ciphertext != CT {
            cprintln!("[kat] AES-CCM ciphertext mismatch");
            Err(AesflowError::KAT_AES_CCM_CIPHERTEXT_MISMATCH)?;
        }
        if tag != TAG {
            cprintln!("[kat] AES-CCM tag mismatch");
            Err(AesflowError::KAT_AES_CCM_TAG_MISMATCH)?;
        }

        let mut plaintext = [0u8; 4];
        aes_ccm_decrypt(aes, &key, &NONCE, &AAD, &CT, &TAG, &mut plaintext)?;
        if plaintext != PT {
            cprintln!("[kat] AES-CCM plaintext mismatch");
            Err(AesflowError::KAT_AES_CCM_PLAINTEXT_MISMATCH)?;
        }
        Ok(())
    }
}
