/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Aesflow Emulator Peripheral library.

--*/

mod aes;
mod hash_sha256;

pub use aes::{Aes, Ctrl as AesCtrl, PhaseCtrl as AesPhaseCtrl, Status as AesStatus};
pub use aes::{Trigger as AesTrigger, CMAC_STATE_SIZE, GCM_STATE_SIZE};
pub use hash_sha256::{Control as Sha256Control, HashSha256, Status as Sha256Status};
