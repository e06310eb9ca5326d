// Licensed under the Apache-2.0 license

use aesflow_drivers::{AesflowError, EmuSha256, HashMode, Sha256, Sha256Context};
use sha2::Digest;

fn h(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

#[test]
fn test_digest_abc() {
    let mut sha = Sha256::new(EmuSha256::new());

    let mut digest = [0u8; 32];
    sha.digest(HashMode::Sha256, b"abc", &mut digest).unwrap();
    assert_eq!(
        digest.to_vec(),
        h("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );

    let mut digest = [0u8; 28];
    sha.digest(HashMode::Sha224, b"abc", &mut digest).unwrap();
    assert_eq!(
        digest.to_vec(),
        h("23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7")
    );
}

#[test]
fn test_digest_empty() {
    let mut sha = Sha256::new(EmuSha256::new());
    let mut digest = [0u8; 32];
    sha.digest(HashMode::Sha256, &[], &mut digest).unwrap();
    assert_eq!(
        digest.to_vec(),
        h("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
    );
}

#[test]
fn test_padding_boundaries() {
    let mut sha = Sha256::new(EmuSha256::new());
    let data: Vec<u8> = (0..1000u32).map(|i| (i * 13 + 7) as u8).collect();

    for len in [1, 55, 56, 63, 64, 65, 119, 120, 128, 1000] {
        let mut digest = [0u8; 32];
        sha.digest(HashMode::Sha256, &data[..len], &mut digest).unwrap();
        assert_eq!(digest[..], sha2::Sha256::digest(&data[..len])[..], "len {len}");

        let mut digest = [0u8; 28];
        sha.digest(HashMode::Sha224, &data[..len], &mut digest).unwrap();
        assert_eq!(digest[..], sha2::Sha224::digest(&data[..len])[..], "len {len}");
    }
}

#[test]
fn test_multipart_update() {
    let mut sha = Sha256::new(EmuSha256::new());
    let data: Vec<u8> = (0..300u32).map(|i| (i * 5) as u8).collect();
    let expected = sha2::Sha256::digest(&data);

    for chunk in [1, 3, 63, 64, 100] {
        let mut ctx = Sha256Context::new(HashMode::Sha256);
        for part in data.chunks(chunk) {
            sha.update(&mut ctx, part).unwrap();
        }
        let mut digest = [0u8; 32];
        sha.finalize(&mut ctx, &mut digest).unwrap();
        assert_eq!(digest[..], expected[..]);
    }
}

#[test]
fn test_interleaved_contexts() {
    let mut sha = Sha256::new(EmuSha256::new());
    let a: Vec<u8> = (0..150u8).collect();
    let b: Vec<u8> = (0..150u8).rev().collect();

    let mut ctx_a = Sha256Context::new(HashMode::Sha256);
    let mut ctx_b = Sha256Context::new(HashMode::Sha224);
    for (part_a, part_b) in a.chunks(70).zip(b.chunks(70)) {
        sha.update(&mut ctx_a, part_a).unwrap();
        sha.update(&mut ctx_b, part_b).unwrap();
    }

    let mut digest_a = [0u8; 32];
    let mut digest_b = [0u8; 28];
    sha.finalize(&mut ctx_a, &mut digest_a).unwrap();
    sha.finalize(&mut ctx_b, &mut digest_b).unwrap();
    assert_eq!(digest_a[..], sha2::Sha256::digest(&a)[..]);
    assert_eq!(digest_b[..], sha2::Sha224::digest(&b)[..]);
}

#[test]
fn test_context_errors() {
    let mut sha = Sha256::new(EmuSha256::new());
    let mut ctx = Sha256Context::new(HashMode::Sha256);
    sha.update(&mut ctx, b"abc").unwrap();

    let mut short = [0u8; 31];
    assert_eq!(
        sha.finalize(&mut ctx, &mut short),
        Err(AesflowError::DRIVER_SHA256_BUFFER_TOO_SMALL)
    );

    let mut digest = [0u8; 32];
    sha.finalize(&mut ctx, &mut digest).unwrap();
    assert_eq!(
        sha.update(&mut ctx, b"more"),
        Err(AesflowError::DRIVER_SHA256_INVALID_STATE)
    );
    assert_eq!(
        sha.finalize(&mut ctx, &mut digest),
        Err(AesflowError::DRIVER_SHA256_INVALID_STATE)
    );
}
