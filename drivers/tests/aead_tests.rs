// Licensed under the Apache-2.0 license

use aesflow_drivers::{
    aead_decrypt_output_size, aead_decrypt_verify, aead_encrypt_output_size, aead_encrypt_tag,
    AeadAlgorithm, AeadOperation, Aes, AesflowError, EmuAes, KeyMaterial,
};

fn h(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

// RFC 3610, Packet Vector #1
const CCM_KEY: &str = "c0c1c2c3c4c5c6c7c8c9cacbcccdcecf";
const CCM_NONCE: &str = "00000003020100a0a1a2a3a4a5";
const CCM_AAD: &str = "0001020304050607";
const CCM_PT: &str = "08090a0b0c0d0e0f101112131415161718191a1b1c1d1e";
const CCM_CT: &str = "588c979a61c663d2f066d0c2c0f989806d5f6b61dac384";
const CCM_TAG: &str = "17e8d12cfdf926e0";

// NIST CAVP gcmEncryptExtIV256
const GCM_KEY: &str = "f0eaf7b41b42f4500635bc05d9cede11a5363d59a6288870f527bcffeb4d6e04";
const GCM_IV: &str = "18f316781077a595c72d4c07";
const GCM_AAD: &str = "42cade3a19204b7d4843628c425c2375";
const GCM_PT: &str = "400fb5ef32083b3abea957c4f068abad50c8d86bbf9351fa72e7da5171df38f9";
const GCM_CT: &str = "7a1b61009dce6b7cd4d1ea0203b179f1219dd5ce7407e12ea0a4c56c71bb791b";
const GCM_TAG: &str = "4419180b0b963b7289a4fa3f45c535a3";

struct Vector {
    alg: AeadAlgorithm,
    key: Vec<u8>,
    nonce: Vec<u8>,
    aad: Vec<u8>,
    pt: Vec<u8>,
    ct: Vec<u8>,
    tag: Vec<u8>,
}

fn vectors() -> [Vector; 2] {
    [
        Vector {
            alg: AeadAlgorithm::Ccm,
            key: h(CCM_KEY),
            nonce: h(CCM_NONCE),
            aad: h(CCM_AAD),
            pt: h(CCM_PT),
            ct: h(CCM_CT),
            tag: h(CCM_TAG),
        },
        Vector {
            alg: AeadAlgorithm::Gcm,
            key: h(GCM_KEY),
            nonce: h(GCM_IV),
            aad: h(GCM_AAD),
            pt: h(GCM_PT),
            ct: h(GCM_CT),
            tag: h(GCM_TAG),
        },
    ]
}

#[test]
fn test_oneshot() {
    let mut aes = Aes::new(EmuAes::new());
    for v in vectors() {
        let key = KeyMaterial::aes(&v.key).unwrap();

        let mut ct = vec![0u8; aead_encrypt_output_size(v.alg, v.pt.len())];
        let mut tag = vec![0u8; v.tag.len()];
        let written = aead_encrypt_tag(
            &mut aes, &key, v.alg, &v.nonce, &v.aad, &v.pt, &mut ct, &mut tag,
        )
        .unwrap();
        assert_eq!(written, v.pt.len());
        assert_eq!(ct, v.ct);
        assert_eq!(tag, v.tag);

        let mut pt = vec![0u8; aead_decrypt_output_size(v.alg, v.ct.len())];
        let written = aead_decrypt_verify(
            &mut aes, &key, v.alg, &v.nonce, &v.aad, &v.ct, &v.tag, &mut pt,
        )
        .unwrap();
        assert_eq!(written, v.ct.len());
        assert_eq!(pt, v.pt);
    }
}

#[test]
fn test_oneshot_buffer_too_small() {
    let mut aes = Aes::new(EmuAes::new());
    for v in vectors() {
        let key = KeyMaterial::aes(&v.key).unwrap();
        let mut short = vec![0u8; v.pt.len() - 1];
        let mut tag = vec![0u8; v.tag.len()];
        let expected = match v.alg {
            AeadAlgorithm::Gcm => AesflowError::DRIVER_GCM_BUFFER_TOO_SMALL,
            AeadAlgorithm::Ccm => AesflowError::DRIVER_CCM_BUFFER_TOO_SMALL,
        };
        assert_eq!(
            aead_encrypt_tag(&mut aes, &key, v.alg, &v.nonce, &v.aad, &v.pt, &mut short, &mut tag),
            Err(expected)
        );
    }
}

fn multipart_encrypt(aes: &mut Aes<EmuAes>, v: &Vector, chunk: usize) -> (Vec<u8>, Vec<u8>) {
    let key = KeyMaterial::aes(&v.key).unwrap();
    let mut op = AeadOperation::new();
    op.encrypt_setup(&key, v.alg, v.tag.len()).unwrap();
    assert_eq!(op.algorithm(), Some(v.alg));
    op.set_nonce(aes, &v.nonce).unwrap();
    op.set_lengths(v.aad.len() as u64, v.pt.len() as u64).unwrap();
    for part in v.aad.chunks(chunk) {
        op.update_ad(aes, part).unwrap();
    }

    let mut ct = Vec::new();
    for part in v.pt.chunks(chunk) {
        let mut buf = vec![0u8; op.update_output_size(part.len())];
        let written = op.update(aes, part, &mut buf).unwrap();
        ct.extend_from_slice(&buf[..written]);
    }
    let mut buf = vec![0u8; op.finish_output_size()];
    let mut tag = vec![0u8; v.tag.len()];
    let (written, tag_len) = op.finish(aes, &mut buf, &mut tag).unwrap();
    ct.extend_from_slice(&buf[..written]);
    assert_eq!(tag_len, v.tag.len());
    assert_eq!(op.algorithm(), None);
    (ct, tag)
}

#[test]
fn test_multipart() {
    let mut aes = Aes::new(EmuAes::new());
    for v in vectors() {
        for chunk in [1, 6, 16, 50] {
            let (ct, tag) = multipart_encrypt(&mut aes, &v, chunk);
            assert_eq!(ct, v.ct);
            assert_eq!(tag, v.tag);
        }

        let key = KeyMaterial::aes(&v.key).unwrap();
        let mut op = AeadOperation::new();
        op.decrypt_setup(&key, v.alg, v.tag.len()).unwrap();
        op.set_nonce(&mut aes, &v.nonce).unwrap();
        op.set_lengths(v.aad.len() as u64, v.ct.len() as u64).unwrap();
        op.update_ad(&mut aes, &v.aad).unwrap();
        let mut pt = vec![0u8; v.ct.len()];
        let written = op.update(&mut aes, &v.ct, &mut pt).unwrap();
        op.verify(&mut aes, &mut pt[written..], &v.tag).unwrap();
        assert_eq!(pt, v.pt);
    }
}

#[test]
fn test_multipart_tamper() {
    let mut aes = Aes::new(EmuAes::new());
    for v in vectors() {
        let key = KeyMaterial::aes(&v.key).unwrap();
        let mut tag = v.tag.clone();
        tag[0] ^= 0x01;

        let mut op = AeadOperation::new();
        op.decrypt_setup(&key, v.alg, v.tag.len()).unwrap();
        op.set_nonce(&mut aes, &v.nonce).unwrap();
        op.set_lengths(v.aad.len() as u64, v.ct.len() as u64).unwrap();
        op.update_ad(&mut aes, &v.aad).unwrap();
        let mut pt = vec![0u8; v.ct.len()];
        let written = op.update(&mut aes, &v.ct, &mut pt).unwrap();
        let expected = match v.alg {
            AeadAlgorithm::Gcm => AesflowError::DRIVER_GCM_AUTH_FAILED,
            AeadAlgorithm::Ccm => AesflowError::DRIVER_CCM_AUTH_FAILED,
        };
        assert_eq!(op.verify(&mut aes, &mut pt[written..], &tag), Err(expected));
        assert_eq!(op.algorithm(), None);
    }
}

#[test]
fn test_finish_retry_after_short_tag_buffer() {
    let mut aes = Aes::new(EmuAes::new());
    for v in vectors() {
        let key = KeyMaterial::aes(&v.key).unwrap();
        let mut op = AeadOperation::new();
        op.encrypt_setup(&key, v.alg, v.tag.len()).unwrap();
        op.set_nonce(&mut aes, &v.nonce).unwrap();
        op.set_lengths(v.aad.len() as u64, v.pt.len() as u64).unwrap();
        op.update_ad(&mut aes, &v.aad).unwrap();
        let mut ct = vec![0u8; v.pt.len()];
        let written = op.update(&mut aes, &v.pt, &mut ct).unwrap();

        let mut short = vec![0u8; v.tag.len() - 1];
        let err = op.finish(&mut aes, &mut ct[written..], &mut short).unwrap_err();
        assert!(matches!(
            err,
            AesflowError::DRIVER_GCM_BUFFER_TOO_SMALL | AesflowError::DRIVER_CCM_BUFFER_TOO_SMALL
        ));
        assert_eq!(op.algorithm(), Some(v.alg));

        let mut tag = vec![0u8; v.tag.len()];
        op.finish(&mut aes, &mut ct[written..], &mut tag).unwrap();
        assert_eq!(ct, v.ct);
        assert_eq!(tag, v.tag);
    }
}

#[test]
fn test_inactive_operation() {
    let mut aes = Aes::new(EmuAes::new());
    let key_bytes = h(GCM_KEY);
    let key = KeyMaterial::aes(&key_bytes).unwrap();
    let mut op = AeadOperation::new();
    let mut out = [0u8; 16];
    let mut tag = [0u8; 16];

    assert_eq!(op.algorithm(), None);
    assert_eq!(
        op.set_nonce(&mut aes, &[0; 12]),
        Err(AesflowError::DRIVER_AEAD_INVALID_STATE)
    );
    assert_eq!(
        op.set_lengths(0, 0),
        Err(AesflowError::DRIVER_AEAD_INVALID_STATE)
    );
    assert_eq!(
        op.update_ad(&mut aes, &[0; 4]),
        Err(AesflowError::DRIVER_AEAD_INVALID_STATE)
    );
    assert_eq!(
        op.update(&mut aes, &[0; 16], &mut out),
        Err(AesflowError::DRIVER_AEAD_INVALID_STATE)
    );
    assert_eq!(
        op.finish(&mut aes, &mut out, &mut tag),
        Err(AesflowError::DRIVER_AEAD_INVALID_STATE)
    );
    assert_eq!(
        op.verify(&mut aes, &mut out, &tag),
        Err(AesflowError::DRIVER_AEAD_INVALID_STATE)
    );

    op.encrypt_setup(&key, AeadAlgorithm::Gcm, 16).unwrap();
    assert_eq!(
        op.encrypt_setup(&key, AeadAlgorithm::Ccm, 16),
        Err(AesflowError::DRIVER_AEAD_INVALID_STATE)
    );
    op.abort();
    op.encrypt_setup(&key, AeadAlgorithm::Ccm, 16).unwrap();
    assert_eq!(op.algorithm(), Some(AeadAlgorithm::Ccm));
}
