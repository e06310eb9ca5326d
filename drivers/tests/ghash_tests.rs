// Licensed under the Apache-2.0 license

use aesflow_drivers::{Ghash, GhashTables};

fn block(s: &str) -> [u8; 16] {
    hex::decode(s).unwrap().try_into().unwrap()
}

const H: &str = "66e94bd4ef8a2c3b884cfa59ca342b2e";

#[test]
fn test_mult_by_one() {
    let h = block(H);
    let mut one = [0u8; 16];
    one[0] = 0x80;
    assert_eq!(GhashTables::new(&h).mult(&one), h);
}

#[test]
fn test_mult_by_zero() {
    let tables = GhashTables::new(&block(H));
    assert_eq!(tables.mult(&[0; 16]), [0; 16]);
}

#[test]
fn test_ghash_gcm_test_case_2() {
    // Key 0^128, IV 0^96, P 0^128
    let mut ghash = Ghash::new(&block(H));
    ghash.update(&block("0388dace60b6a392f328c2b971b2fe78"));
    ghash.update(&block("00000000000000000000000000000080"));
    assert_eq!(ghash.digest(), block("f38cbb1ad69223dcc3457ae5b6b0f885"));
}

#[test]
fn test_chunked_update_matches_whole() {
    let h = block(H);
    let data: Vec<u8> = (0..45u8).collect();

    let mut whole = Ghash::new(&h);
    whole.update(&data);

    let mut chunked = Ghash::new(&h);
    for chunk in data.chunks(7) {
        chunked.update(chunk);
    }
    assert_eq!(chunked.digest(), whole.digest());
}

#[test]
fn test_pad_separates_fields() {
    let h = block(H);

    let mut padded = Ghash::new(&h);
    padded.update(&[1, 2, 3]);
    padded.pad();
    padded.update(&[4]);

    let mut explicit = Ghash::new(&h);
    let mut first = [0u8; 16];
    first[..3].copy_from_slice(&[1, 2, 3]);
    explicit.update(&first);
    explicit.update(&[4]);

    assert_eq!(padded.digest(), explicit.digest());
}
