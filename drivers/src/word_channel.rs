/*++

Licensed under the Apache-2.0 license.

File Name:

    word_channel.rs

Abstract:

    File contains the adapter that moves ordered lists of byte regions
    through a 32-bit word channel. Words are packed little-endian and may
    span region boundaries.

--*/

/// Output region
pub enum Sink<'a> {
    /// Bytes are written here
    Buffer(&'a mut [u8]),

    /// Bytes are dropped
    Discard(usize),
}

impl Sink<'_> {
    pub fn len(&self) -> usize {
        match self {
            Sink::Buffer(buf) => buf.len(),
            Sink::Discard(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Total length of a source region list
pub fn source_len(sources: &[&[u8]]) -> usize {
    sources.iter().map(|s| s.len()).sum()
}

/// Total length of a sink region list
pub fn sink_len(sinks: &[Sink<'_>]) -> usize {
    sinks.iter().map(|s| s.len()).sum()
}

/// Number of words needed to carry `len` bytes
pub fn word_count(len: usize) -> usize {
    len.div_ceil(4)
}

/// Gathers words from a list of source regions
pub struct WordReader<'s, 'a> {
    sources: &'s [&'a [u8]],
    region: usize,
    offset: usize,
}

impl<'s, 'a> WordReader<'s, 'a> {
    pub fn new(sources: &'s [&'a [u8]]) -> Self {
        Self {
            sources,
            region: 0,
            offset: 0,
        }
    }

    /// Produce the next word.
    ///
    /// Only the final word of the stream is zero padded; `None` once every
    /// byte has been delivered.
    pub fn next_word(&mut self) -> Option<u32> {
        let mut word = [0u8; 4];
        let mut filled = 0;
        while filled < word.len() {
            let Some(region) = self.sources.get(self.region) else {
                break;
            };
            match region.get(self.offset) {
                Some(&byte) => {
                    word[filled] = byte;
                    filled += 1;
                    self.offset += 1;
                }
                None => {
                    self.region += 1;
                    self.offset = 0;
                }
            }
        }
        (filled > 0).then(|| u32::from_le_bytes(word))
    }
}

/// Scatters words across a list of sink regions
pub struct WordWriter<'s, 'a> {
    sinks: &'s mut [Sink<'a>],
    region: usize,
    offset: usize,
}

impl<'s, 'a> WordWriter<'s, 'a> {
    pub fn new(sinks: &'s mut [Sink<'a>]) -> Self {
        Self {
            sinks,
            region: 0,
            offset: 0,
        }
    }

    /// Scatter one word. Bytes past the end of the last region are dropped.
    pub fn write_word(&mut self, word: u32) {
        for byte in word.to_le_bytes() {
            loop {
                let Some(sink) = self.sinks.get_mut(self.region) else {
                    return;
                };
                if self.offset < sink.len() {
                    if let Sink::Buffer(buf) = sink {
                        buf[self.offset] = byte;
                    }
                    self.offset += 1;
                    break;
                }
                self.region += 1;
                self.offset = 0;
            }
        }
    }
}
