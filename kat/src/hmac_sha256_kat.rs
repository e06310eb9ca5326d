/*++

Licensed under the Apache-2.0 license.

File Name:

    hmac_sha256_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for HMAC-SHA-256 cryptography operations.

--*/

use aesflow_drivers::{
    cprintln, Aes, AesEngine, AesflowError, AesflowResult, EngineLock, HashEngine, KeyMaterial,
    MacAlgorithm, MacOperation, Sha256,
};

const KEY: &[u8] = b"key";
const MSG: &[u8] = b"The quick brown fox jumps over the lazy dog";
const EXPECTED_MAC: [u8; 32] = [
    0xf7, 0xbc, 0x83, 0xf4, 0x30, 0x53, 0x84, 0x24, 0xb1, 0x32, 0x98, 0xe6, 0xaa, 0x6f, 0xb1, 0x43,
    0xef, 0x4d, 0x59, 0xa1, 0x49, 0x46, 0x17, 0x59, 0x97, 0x47, 0x9d, 0xbc, 0x2d, 0x1a, 0x3c, 0xd8,
];

#[derive(Default, Debug)]
pub struct HmacSha256Kat {}

impl HmacSha256Kat {
    /// This function executes the Known Answer Tests (aka KAT) for HMAC-SHA-256.
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
        let key = KeyMaterial::generic(KEY);
        let mut op = MacOperation::new();
        op.verify_setup(sha256, &key, MacAlgorithm::HmacSha256, EXPECTED_MAC.len())?;

        // Fed in two parts
        let (head, tail) = MSG.split_at(20);
        op.update(aes, sha256, head)?;
        op.update(aes, sha256, tail)?;
        if op.verify_finish(aes, sha256, &EXPECTED_MAC).is_err() {
            cprintln!("[kat] HMAC-SHA256 tag mismatch");
            Err(AesflowError::KAT_HMAC_SHA256_TAG_MISMATCH)?;
        }
        Ok(())
    }
}
