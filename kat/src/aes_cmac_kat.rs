/*++

Licensed under the Apache-2.0 license.

File Name:

    aes_cmac_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for AES-128-CMAC cryptography operations.

--*/

use aesflow_drivers::printer::HexBytes;
use aesflow_drivers::{
    cprintln, mac_compute, Aes, AesEngine, AesflowError, AesflowResult, EngineLock, HashEngine,
    KeyMaterial, MacAlgorithm, Sha256,
};

// RFC 4493, Section 4, Example 2
//
// K = 2b7e151628aed2a6abf7158809cf4f3c
// M = 6bc1bee22e409f96e93d7e117393172a
// T = 070a16b46b4d4144f79bdd9dd04a287c

const KEY: [u8; 16] = [
    0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
];
const MSG: [u8; 16] = [
    0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93, 0x17, 0x2a,
];
const EXPECTED_MAC: [u8; 16] = [
    0x07, 0x0a, 0x16, 0xb4, 0x6b, 0x4d, 0x41, 0x44, 0xf7, 0x9b, 0xdd, 0x9d, 0xd0, 0x4a, 0x28, 0x7c,
];

#[derive(Default, Debug)]
pub struct AesCmacKat {}

impl AesCmacKat {
    /// This function executes the Known Answer Tests (aka KAT) for AES-CMAC.
    ///
    /// # Arguments
    ///
    /// * `aes` - AES driver
    /// * `sha256` - SHA-256 driver
    ///
    /// # Returns
    ///
    /// * `AesflowResult` - Result denoting the KAT outcome.
    pub fn execute<E: AesEngine, L: EngineLock, H: HashEngine, M: EngineLock>(
        &self,
        aes: &mut Aes<E, L>,
        sha256: &mut Sha256<H, M>,
    ) -> AesflowResult<()> {
        let key = KeyMaterial::aes(&KEY)?;
        let mut mac = [0u8; 16];
        mac_compute(aes, sha256, &key, MacAlgorithm::Cmac, &MSG, &mut mac)?;
        if mac != EXPECTED_MAC {
            cprintln!("[kat] AES-CMAC tag mismatch: {}", HexBytes(&mac));
            Err(AesflowError::KAT_AES_CMAC_TAG_MISMATCH)?;
        }
        Ok(())
    }
}
