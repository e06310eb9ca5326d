/*++

Licensed under the Apache-2.0 license.

File Name:

    kats_env.rs

Abstract:

    File contains the drivers the Known Answer Tests run against.

--*/

use aesflow_drivers::{Aes, AesEngine, EngineLock, HashEngine, Sha256};

pub struct KatsEnv<'a, E: AesEngine, L: EngineLock, H: HashEngine, M: EngineLock> {
    /// AES Engine
    pub aes: &'a mut Aes<E, L>,

    /// SHA-256 Engine, used for HMAC
    pub sha256: &'a mut Sha256<H, M>,
}
