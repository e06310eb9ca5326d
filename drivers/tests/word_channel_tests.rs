// Licensed under the Apache-2.0 license

use aesflow_drivers::word_channel::{
    sink_len, source_len, word_count, Sink, WordReader, WordWriter,
};

#[test]
fn test_reader_spans_regions() {
    let sources: [&[u8]; 4] = [&[1, 2, 3], &[], &[4, 5], &[6]];
    let mut reader = WordReader::new(&sources);
    assert_eq!(reader.next_word(), Some(0x0403_0201));
    assert_eq!(reader.next_word(), Some(0x0000_0605));
    assert_eq!(reader.next_word(), None);
}

#[test]
fn test_reader_empty() {
    let sources: [&[u8]; 2] = [&[], &[]];
    let mut reader = WordReader::new(&sources);
    assert_eq!(reader.next_word(), None);
    assert_eq!(source_len(&sources), 0);
}

#[test]
fn test_reader_aligned_regions() {
    let sources: [&[u8]; 2] = [&[0xaa; 4], &[0xbb; 4]];
    let mut reader = WordReader::new(&sources);
    assert_eq!(reader.next_word(), Some(0xaaaa_aaaa));
    assert_eq!(reader.next_word(), Some(0xbbbb_bbbb));
    assert_eq!(reader.next_word(), None);
}

#[test]
fn test_writer_scatters_and_discards() {
    let mut a = [0u8; 3];
    let mut b = [0u8; 3];
    let mut sinks = [Sink::Buffer(&mut a), Sink::Discard(2), Sink::Buffer(&mut b)];
    assert_eq!(sink_len(&sinks), 8);
    let mut writer = WordWriter::new(&mut sinks);
    writer.write_word(0x0403_0201);
    writer.write_word(0x0807_0605);
    assert_eq!(a, [1, 2, 3]);
    assert_eq!(b, [6, 7, 8]);
}

#[test]
fn test_writer_drops_padding() {
    let mut a = [0u8; 5];
    let mut sinks = [Sink::Buffer(&mut a), Sink::Buffer(&mut [])];
    let mut writer = WordWriter::new(&mut sinks);
    writer.write_word(0x0403_0201);
    writer.write_word(0x0807_0605);
    assert_eq!(a, [1, 2, 3, 4, 5]);
}

#[test]
fn test_word_count() {
    assert_eq!(word_count(0), 0);
    assert_eq!(word_count(1), 1);
    assert_eq!(word_count(4), 1);
    assert_eq!(word_count(5), 2);
    assert_eq!(word_count(23), 6);
}
