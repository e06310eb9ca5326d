// Licensed under the Apache-2.0 license

use aesflow_drivers::{
    aes_ccm_decrypt, cipher_encrypt, mac_compute, Aes, AesflowError, CipherAlgorithm, EmuAes,
    EmuSha256, EngineLock, ErrorKind, HashMode, KeyMaterial, MacAlgorithm, Sha256, SpinLock,
};

const KEY: [u8; 16] = [0x42; 16];

#[test]
fn test_busy_engine() {
    let lock = SpinLock::new();
    let mut aes = Aes::with_lock(EmuAes::new(), &lock);
    let mut sha = Sha256::with_lock(EmuSha256::new(), &lock);
    let key = KeyMaterial::aes(&KEY).unwrap();
    let mut out = [0u8; 16];

    lock.acquire().unwrap();
    let err = cipher_encrypt(&mut aes, &key, CipherAlgorithm::EcbNoPadding, &[], &[0; 16], &mut out)
        .unwrap_err();
    assert_eq!(err, AesflowError::DRIVER_ENGINE_BUSY);
    assert_eq!(err.kind(), ErrorKind::HardwareFailure);

    let mut digest = [0u8; 32];
    assert_eq!(
        sha.digest(HashMode::Sha256, b"abc", &mut digest),
        Err(AesflowError::DRIVER_ENGINE_BUSY)
    );

    lock.release();
    cipher_encrypt(&mut aes, &key, CipherAlgorithm::EcbNoPadding, &[], &[0; 16], &mut out).unwrap();
    assert!(!lock.is_locked());
}

#[test]
fn test_lock_released_after_failure() {
    let lock = SpinLock::new();
    let mut aes = Aes::with_lock(EmuAes::new(), &lock);
    let key = KeyMaterial::aes(&KEY).unwrap();
    let nonce = [0x01u8; 13];

    let mut pt = [0u8; 20];
    assert_eq!(
        aes_ccm_decrypt(&mut aes, &key, &nonce, &[], &[0x55; 20], &[0; 8], &mut pt),
        Err(AesflowError::DRIVER_CCM_AUTH_FAILED)
    );
    assert!(!lock.is_locked());
}

#[test]
fn test_lock_shared_between_drivers() {
    let lock = SpinLock::new();
    let mut aes = Aes::with_lock(EmuAes::new(), &lock);
    let mut sha = Sha256::with_lock(EmuSha256::new(), &lock);
    let msg = [0x17u8; 100];

    let mut cmac = [0u8; 16];
    let key = KeyMaterial::aes(&KEY).unwrap();
    mac_compute(&mut aes, &mut sha, &key, MacAlgorithm::Cmac, &msg, &mut cmac).unwrap();
    assert!(!lock.is_locked());

    let mut hmac = [0u8; 32];
    let key = KeyMaterial::generic(&KEY);
    mac_compute(&mut aes, &mut sha, &key, MacAlgorithm::HmacSha256, &msg, &mut hmac).unwrap();
    assert!(!lock.is_locked());

    // Same results as unshared drivers
    let mut plain_aes = Aes::new(EmuAes::new());
    let mut plain_sha = Sha256::new(EmuSha256::new());
    let mut expected = [0u8; 32];
    mac_compute(
        &mut plain_aes,
        &mut plain_sha,
        &KeyMaterial::generic(&KEY),
        MacAlgorithm::HmacSha256,
        &msg,
        &mut expected,
    )
    .unwrap();
    assert_eq!(hmac, expected);
}
