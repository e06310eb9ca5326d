/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Aesflow driver library.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod aead;
mod aes;
mod ccm;
mod cipher;
mod ctr;
mod engine;
mod gcm;
mod ghash;
mod key;
mod mac;
mod sha256;

pub mod printer;
pub mod wait;
pub mod word_channel;

pub use aead::{
    aead_decrypt_output_size, aead_decrypt_verify, aead_encrypt_output_size, aead_encrypt_tag,
    AeadAlgorithm, AeadOperation,
};
pub use aes::{Aes, BlockMode, EngineSession, AES_BLOCK_SIZE_BYTES};
pub use aesflow_error::{AesflowError, AesflowResult, ErrorKind};
pub use ccm::{
    aes_ccm_decrypt, aes_ccm_encrypt, ccm_encrypt_output_size, AesCcmOperation,
    CCM_MAX_NONCE_SIZE, CCM_MAX_TAG_SIZE, CCM_MIN_NONCE_SIZE,
};
pub use cipher::{
    cipher_decrypt, cipher_decrypt_output_size, cipher_encrypt, cipher_encrypt_output_size,
    AesCipherOperation, CipherAlgorithm, CCM_STAR_NONCE_SIZE,
};
pub use ctr::{ctr_crypt, AesCtrCursor};
pub use engine::{
    AesEngine, AesMode, AesOperation, EngineConfig, EngineLock, EnginePhase, EngineStatus,
    HashEngine, HashMode, HashStatus, NoLock, SpinLock,
};
pub use gcm::{
    gcm_encrypt_output_size, AesGcmOperation, GCM_ENGINE_NONCE_SIZE, GCM_MAX_TAG_SIZE,
    GCM_MIN_TAG_SIZE,
};
pub use ghash::{Ghash, GhashTables};
pub use key::{KeyBuf, KeyKind, KeyMaterial, AES_MAX_KEY_SIZE};
pub use mac::{
    mac_compute, mac_output_size, mac_verify, CbcMac, MacAlgorithm, MacOperation,
    MAC_MAX_TAG_SIZE,
};
pub use sha256::{Sha256, Sha256Context, SHA256_BLOCK_BYTE_SIZE, SHA256_DIGEST_BYTE_SIZE};

cfg_if::cfg_if! {
    if #[cfg(feature = "emu")] {
        mod emu;

        pub use emu::{EmuAes, EmuSha256};
    }
}
