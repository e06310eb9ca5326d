// Licensed under the Apache-2.0 license

use aesflow_drivers::{Aes, EmuAes, EmuSha256, Sha256, SpinLock};
use aesflow_kat::{AesCcmKat, AesCmacKat, AesGcmKat, CryptoKat, HmacSha256Kat, KatsEnv};

#[test]
fn test_aes_gcm_kat() {
    let mut aes = Aes::new(EmuAes::new());
    AesGcmKat::default().execute(&mut aes).unwrap();
}

#[test]
fn test_aes_ccm_kat() {
    let mut aes = Aes::new(EmuAes::new());
    AesCcmKat::default().execute(&mut aes).unwrap();
}

#[test]
fn test_aes_cmac_kat() {
    let mut aes = Aes::new(EmuAes::new());
    let mut sha256 = Sha256::new(EmuSha256::new());
    AesCmacKat::default().execute(&mut aes, &mut sha256).unwrap();
}

#[test]
fn test_hmac_sha256_kat() {
    let mut aes = Aes::new(EmuAes::new());
    let mut sha256 = Sha256::new(EmuSha256::new());
    HmacSha256Kat::default()
        .execute(&mut aes, &mut sha256)
        .unwrap();
}

#[test]
fn test_all_kats_behind_shared_lock() {
    let lock = SpinLock::new();
    let mut aes = Aes::with_lock(EmuAes::new(), &lock);
    let mut sha256 = Sha256::with_lock(EmuSha256::new(), &lock);
    let mut env = KatsEnv {
        aes: &mut aes,
        sha256: &mut sha256,
    };
    CryptoKat::default().execute(&mut env).unwrap();
    assert!(!lock.is_locked());
}
