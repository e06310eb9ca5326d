/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Aesflow Emulator Crypto library.

--*/

mod aes;
mod aes_cbc;
mod aes_ctr;
mod ccm;
mod cmac;
mod ghash;
mod sha256;

pub use crate::aes::Aes;
pub use aes_cbc::AesCbc;
pub use aes_ctr::AesCtr;
pub use ccm::AesCcm;
pub use cmac::{AesCmac, CmacState};
pub use ghash::GHash;
pub use sha256::Sha256;
pub use sha256::Sha256Mode;

/// AES block size in bytes
pub const AES_BLOCK_SIZE: usize = 16;

/// Valid AES key sizes in bytes
pub const AES_KEY_SIZES: [usize; 3] = [16, 24, 32];
