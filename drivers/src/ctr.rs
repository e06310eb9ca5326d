/*++

Licensed under the Apache-2.0 license.

File Name:

    ctr.rs

Abstract:

    File contains the resumable counter mode cursor. Chunks of any size
    can be fed in turn and the output matches one call over the whole
    message.

--*/

use crate::aes::{Aes, BlockMode, AES_BLOCK_SIZE_BYTES};
use crate::engine::{AesEngine, EngineLock};
use crate::{AesflowError, AesflowResult};
use zeroize::Zeroize;

/// Counter block, cached keystream and the number of cached keystream
/// bytes already used.
#[derive(Clone, Default, Zeroize)]
pub struct AesCtrCursor {
    nonce_counter: [u8; AES_BLOCK_SIZE_BYTES],
    stream_block: [u8; AES_BLOCK_SIZE_BYTES],

    /// 0 when no keystream is cached
    offset: usize,

    /// Only the low 32 bits of the counter advance
    inc32: bool,
}

impl AesCtrCursor {
    /// Cursor over a full 128-bit big-endian counter
    pub fn new(counter_block: [u8; AES_BLOCK_SIZE_BYTES]) -> Self {
        Self {
            nonce_counter: counter_block,
            ..Default::default()
        }
    }

    /// Cursor whose counter wraps within the last 32 bits of the block
    pub fn new_inc32(counter_block: [u8; AES_BLOCK_SIZE_BYTES]) -> Self {
        Self {
            inc32: true,
            ..Self::new(counter_block)
        }
    }

    /// Next counter block to be encrypted
    pub fn counter(&self) -> &[u8; AES_BLOCK_SIZE_BYTES] {
        &self.nonce_counter
    }

    /// Keystream bytes of the cached block already consumed
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Blocks that can be generated before the counter wraps
    fn blocks_before_wrap(&self) -> usize {
        if !self.inc32 {
            return usize::MAX;
        }
        let mut low = [0u8; 4];
        low.copy_from_slice(&self.nonce_counter[12..]);
        let remaining = (1u64 << 32) - u64::from(u32::from_be_bytes(low));
        usize::try_from(remaining).unwrap_or(usize::MAX)
    }

    fn keystream<E: AesEngine, L: EngineLock>(
        &mut self,
        aes: &mut Aes<E, L>,
        key: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> AesflowResult<()> {
        let mut upper = [0u8; 12];
        upper.copy_from_slice(&self.nonce_counter[..12]);
        aes.transform(BlockMode::Ctr, key, &mut self.nonce_counter, input, output)?;
        if self.inc32 {
            // Undo the carry out of the low word
            self.nonce_counter[..12].copy_from_slice(&upper);
        }
        Ok(())
    }
}

/// Encrypt or decrypt `input` into `output` continuing from `cursor`.
pub fn ctr_crypt<E: AesEngine, L: EngineLock>(
    aes: &mut Aes<E, L>,
    key: &[u8],
    cursor: &mut AesCtrCursor,
    input: &[u8],
    output: &mut [u8],
) -> AesflowResult<()> {
    let output = output
        .get_mut(..input.len())
        .ok_or(AesflowError::DRIVER_AES_INVALID_SLICE)?;

    // n1: leftover keystream
    let n1 = if cursor.offset == 0 {
        0
    } else {
        input.len().min(AES_BLOCK_SIZE_BYTES - cursor.offset)
    };
    let (head_in, input) = input.split_at(n1);
    let (head_out, output) = output.split_at_mut(n1);
    for ((o, i), k) in head_out
        .iter_mut()
        .zip(head_in)
        .zip(&cursor.stream_block[cursor.offset..])
    {
        *o = i ^ k;
    }
    cursor.offset = (cursor.offset + n1) % AES_BLOCK_SIZE_BYTES;

    // n2: whole blocks
    let n2 = input.len() - input.len() % AES_BLOCK_SIZE_BYTES;
    let (mut body_in, tail_in) = input.split_at(n2);
    let (mut body_out, tail_out) = output.split_at_mut(n2);
    while !body_in.is_empty() {
        let blocks = (body_in.len() / AES_BLOCK_SIZE_BYTES).min(cursor.blocks_before_wrap());
        let chunk = blocks * AES_BLOCK_SIZE_BYTES;
        let (chunk_in, rest_in) = body_in.split_at(chunk);
        let (chunk_out, rest_out) = core::mem::take(&mut body_out).split_at_mut(chunk);
        cursor.keystream(aes, key, chunk_in, chunk_out)?;
        body_in = rest_in;
        body_out = rest_out;
    }

    // n3: one more keystream block, cached for the next call
    if !tail_in.is_empty() {
        let mut stream = [0u8; AES_BLOCK_SIZE_BYTES];
        cursor.keystream(aes, key, &[0; AES_BLOCK_SIZE_BYTES], &mut stream)?;
        cursor.stream_block = stream;
        for ((o, i), k) in tail_out.iter_mut().zip(tail_in).zip(&stream) {
            *o = i ^ k;
        }
        cursor.offset = tail_in.len();
    }
    Ok(())
}
