/*++

Licensed under the Apache-2.0 license.

File Name:

    crypto_kat.rs

Abstract:

    File contains function to execute all the Known Answer Tests (KAT) for cryptography operations.

--*/

use crate::{AesCcmKat, AesCmacKat, AesGcmKat, HmacSha256Kat, KatsEnv};
use aesflow_drivers::{AesEngine, AesflowResult, EngineLock, HashEngine};

#[derive(Default, Debug)]
pub struct CryptoKat {}

impl CryptoKat {
    /// This function executes all the Known Answer Tests (aka KAT).
    ///
    /// # Arguments
    ///
    /// * `env` - Drivers to test
    ///
    /// # Returns
    ///
    /// * `AesflowResult` - Result denoting the KAT outcome.
    pub fn execute<E: AesEngine, L: EngineLock, H: HashEngine, M: EngineLock>(
        &self,
        env: &mut KatsEnv<E, L, H, M>,
    ) -> AesflowResult<()> {
        AesGcmKat::default().execute(env.aes)?;
        AesCcmKat::default().execute(env.aes)?;
        AesCmacKat::default().execute(env.aes, env.sha256)?;
        HmacSha256Kat::default().execute(env.aes, env.sha256)?;
        Ok(())
    }
}
