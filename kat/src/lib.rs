/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Aesflow Known Answer Tests.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod aes_ccm_kat;
mod aes_cmac_kat;
mod aes_gcm_kat;
mod crypto_kat;
mod hmac_sha256_kat;
mod kats_env;

pub use aes_ccm_kat::AesCcmKat;
pub use aes_cmac_kat::AesCmacKat;
pub use aes_gcm_kat::AesGcmKat;
pub use aesflow_drivers::{AesflowError, AesflowResult};
pub use crypto_kat::CryptoKat;
pub use hmac_sha256_kat::HmacSha256Kat;
pub use kats_env::KatsEnv;
